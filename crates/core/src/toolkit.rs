//! ScaleFS toolkit integration
//!
//! The cluster mutations are performed by the external `scalectl` binary at
//! its fixed, versioned installation path. This module provides typed
//! command builders for each toolkit operation (never raw string
//! concatenation) and the idempotent registration wrappers that downgrade
//! "already exists" conflicts to non-fatal skips.

use crate::config::NsdEntry;
use crate::errors::{Result, ToolkitError};
use crate::remote::{CommandLine, ExecOutput};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, instrument, warn};

/// Name of the toolkit control binary inside the installation directory.
pub const CONTROL_BINARY: &str = "scalectl";

/// Role flags passed to node registration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeRoles {
    pub quorum: bool,
    pub manager: bool,
    pub gui: bool,
}

/// Outcome of an idempotent registration call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The toolkit accepted the registration.
    Registered,
    /// The toolkit refused; treated as "already registered or non-fatal
    /// conflict" and skipped.
    AlreadyPresent,
}

/// Handle on the toolkit installation.
#[derive(Debug, Clone)]
pub struct Toolkit {
    bin_dir: PathBuf,
}

impl Toolkit {
    pub fn new(bin_dir: impl Into<PathBuf>) -> Self {
        Self {
            bin_dir: bin_dir.into(),
        }
    }

    /// Absolute path of the control binary.
    pub fn control_path(&self) -> PathBuf {
        self.bin_dir.join(CONTROL_BINARY)
    }

    fn control(&self) -> CommandLine {
        CommandLine::new(self.control_path().to_string_lossy())
    }

    fn cluster_create_command(&self, management_address: &str, name: Option<&str>) -> CommandLine {
        let mut cmd = self
            .control()
            .arg("cluster")
            .arg("create")
            .arg("--management-node")
            .arg(management_address);
        if let Some(name) = name {
            cmd = cmd.arg("--name").arg(name);
        }
        cmd
    }

    fn node_add_command(&self, host: &str, roles: NodeRoles) -> CommandLine {
        let mut cmd = self.control().arg("node").arg("add").arg(host);
        if roles.quorum {
            cmd = cmd.arg("--quorum");
        }
        if roles.manager {
            cmd = cmd.arg("--manager");
        }
        if roles.gui {
            cmd = cmd.arg("--gui");
        }
        cmd
    }

    fn nsd_add_command(&self, entry: &NsdEntry) -> CommandLine {
        self.control()
            .arg("nsd")
            .arg("add")
            .arg(&entry.host)
            .arg("--device")
            .arg(entry.device.to_string_lossy())
            .arg("--failure-group")
            .arg(entry.failure_group.to_string())
    }

    /// Initialize the cluster. Required mutating step: any failure is fatal.
    #[instrument(skip(self))]
    pub fn create_cluster(&self, management_address: &str, name: Option<&str>) -> Result<()> {
        let cmd = self.cluster_create_command(management_address, name);
        self.run_expect_success(&cmd, "cluster create")?;
        Ok(())
    }

    /// Register a node, tolerating duplicate registrations.
    ///
    /// Single attempt, no retry: the toolkit is authoritative on duplicate
    /// detection and is a no-op on duplicates, so only the exit code is
    /// masked. The underlying error text is logged for operator diagnosis
    /// without changing the non-fatal classification.
    #[instrument(skip(self), fields(host = %host))]
    pub fn register_node(&self, host: &str, roles: NodeRoles) -> Result<Registration> {
        let cmd = self.node_add_command(host, roles);
        let output = self.run(&cmd)?;
        if output.success() {
            debug!(host = host, "node registered");
            Ok(Registration::Registered)
        } else {
            warn!(
                host = host,
                detail = %output.failure_summary(),
                "node registration skipped (already registered or non-fatal conflict)"
            );
            Ok(Registration::AlreadyPresent)
        }
    }

    /// Register a storage resource, tolerating duplicates. Same skip policy
    /// as [`Toolkit::register_node`].
    #[instrument(skip(self, entry), fields(host = %entry.host))]
    pub fn register_storage(&self, entry: &NsdEntry) -> Result<Registration> {
        let cmd = self.nsd_add_command(entry);
        let output = self.run(&cmd)?;
        if output.success() {
            debug!(host = %entry.host, device = %entry.device.display(), "storage resource registered");
            Ok(Registration::Registered)
        } else {
            warn!(
                host = %entry.host,
                device = %entry.device.display(),
                detail = %output.failure_summary(),
                "storage registration skipped (already registered or non-fatal conflict)"
            );
            Ok(Registration::AlreadyPresent)
        }
    }

    /// List the registered nodes and return the toolkit's report.
    pub fn list_nodes(&self) -> Result<String> {
        let cmd = self.control().arg("node").arg("list");
        let output = self.run_expect_success(&cmd, "node list")?;
        Ok(output.stdout)
    }

    /// Toggle the call-home integration. The caller decides how to treat a
    /// refusal; this is not one of the required mutating steps.
    pub fn set_callhome(&self, enabled: bool) -> Result<ExecOutput> {
        let state = if enabled { "enable" } else { "disable" };
        let cmd = self.control().arg("callhome").arg(state);
        self.run(&cmd)
    }

    /// First stage of the cluster-wide install. Fatal on failure.
    pub fn install_precheck(&self) -> Result<()> {
        let cmd = self.control().arg("install").arg("--precheck");
        self.run_expect_success(&cmd, "install precheck")?;
        Ok(())
    }

    /// Second stage of the cluster-wide install. Fatal on failure.
    pub fn install_apply(&self) -> Result<()> {
        let cmd = self.control().arg("install").arg("--apply");
        self.run_expect_success(&cmd, "install apply")?;
        Ok(())
    }

    /// Run a toolkit command, failing only when the binary itself cannot be
    /// started. Non-zero exits are returned for the caller to interpret.
    fn run(&self, command: &CommandLine) -> Result<ExecOutput> {
        debug!(command = %command, "toolkit exec");
        let output = Command::new(command.program())
            .args(command.argv())
            .output()
            .map_err(|_| ToolkitError::NotInstalled {
                path: self.control_path().display().to_string(),
            })?;
        Ok(ExecOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn run_expect_success(&self, command: &CommandLine, operation: &str) -> Result<ExecOutput> {
        let output = self.run(command)?;
        if !output.success() {
            return Err(ToolkitError::OperationFailed {
                operation: operation.to_string(),
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            }
            .into());
        }
        Ok(output)
    }
}

/// Handle on the standalone installer binary.
#[derive(Debug, Clone)]
pub struct Installer {
    path: PathBuf,
}

impl Installer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run the installer's self-verification locally. Fatal on failure.
    #[instrument(skip(self))]
    pub fn verify(&self) -> Result<()> {
        let output = Command::new(&self.path).arg("--verify").output().map_err(|e| {
            ToolkitError::InstallerFailed {
                step: "verify".to_string(),
                code: -1,
                stderr: e.to_string(),
            }
        })?;
        if !output.status.success() {
            return Err(ToolkitError::InstallerFailed {
                step: "verify".to_string(),
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// The silent-install command broadcast to every node in phase C.
    pub fn silent_install_command(&self) -> CommandLine {
        CommandLine::new(self.path.to_string_lossy()).arg("--silent")
    }
}
