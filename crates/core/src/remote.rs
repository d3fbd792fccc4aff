//! Remote command execution over SSH
//!
//! This module wraps the `ssh`/`scp` transports: single-target execution,
//! concurrent broadcast to the full node set, artifact copy, and the
//! resolution chain used to locate read-only diagnostic commands across
//! several candidate execution sites.
//!
//! The transport program names are injectable so tests can substitute stub
//! transports for the real binaries.

use crate::errors::{RemoteError, Result};
use futures::future::join_all;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, instrument, warn};

/// Options passed to every ssh/scp invocation. BatchMode keeps the run
/// non-interactive: a node that demands a password fails instead of hanging
/// on a prompt nobody will answer.
const TRANSPORT_OPTIONS: &[&str] = &["-o", "BatchMode=yes"];

/// A command as an explicit program + argument list.
///
/// Commands are always carried as argv vectors and only rendered to a
/// single shell string at the remote boundary, with full quoting.
#[derive(Debug, Clone)]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn argv(&self) -> &[String] {
        &self.args
    }

    /// Render the command as a single, fully quoted shell string suitable
    /// for execution through a remote shell.
    pub fn shell_form(&self) -> String {
        let mut words = Vec::with_capacity(self.args.len() + 1);
        words.push(self.program.clone());
        words.extend(self.args.iter().cloned());
        shell_words::join(&words)
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.shell_form())
    }
}

/// Captured result of one command execution, local or remote.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    /// Process exit code (-1 if terminated by signal).
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    fn from_output(output: std::process::Output) -> Self {
        Self {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }

    /// One-line failure description for warnings and chain reporting.
    pub fn failure_summary(&self) -> String {
        let detail = if !self.stderr.trim().is_empty() {
            self.stderr.trim()
        } else {
            self.stdout.trim()
        };
        if detail.is_empty() {
            format!("exit code {}", self.code)
        } else {
            format!("exit code {}: {}", self.code, detail)
        }
    }
}

/// Result of a broadcast for a single node.
#[derive(Debug)]
pub struct BroadcastOutcome {
    pub host: String,
    pub output: ExecOutput,
}

/// The ssh/scp transport pair used to reach cluster nodes.
#[derive(Debug, Clone)]
pub struct RemoteShell {
    ssh_program: String,
    scp_program: String,
}

impl Default for RemoteShell {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteShell {
    pub fn new() -> Self {
        Self::with_programs("ssh", "scp")
    }

    /// Build a shell around alternative transport programs.
    pub fn with_programs(ssh_program: impl Into<String>, scp_program: impl Into<String>) -> Self {
        Self {
            ssh_program: ssh_program.into(),
            scp_program: scp_program.into(),
        }
    }

    /// Run a typed command on one node and capture its output.
    ///
    /// A non-zero remote exit is returned in the output, not as an error;
    /// only a failure to start the transport itself is an error.
    #[instrument(skip(self, command), fields(host = %host, command = %command))]
    pub async fn run_one(&self, host: &str, command: &CommandLine) -> Result<ExecOutput> {
        self.run_shell(host, &command.shell_form()).await
    }

    /// Run a raw shell string on one node.
    ///
    /// Used by the resolution chain, which needs to augment the remote
    /// search path. Everything else goes through [`RemoteShell::run_one`].
    pub async fn run_shell(&self, host: &str, command: &str) -> Result<ExecOutput> {
        debug!(host = host, command = command, "remote exec");
        let mut cmd = Command::new(&self.ssh_program);
        cmd.args(TRANSPORT_OPTIONS).arg(host).arg(command);
        self.capture(cmd, &self.ssh_program).await
    }

    /// Broadcast one command to every node concurrently and wait for all
    /// of them (fan-out/join barrier).
    ///
    /// Per-node command failures surface in the outcomes and are the
    /// caller's responsibility to interpret; only an unreachable transport
    /// fails the call as a whole.
    #[instrument(skip(self, hosts, command), fields(nodes = hosts.len(), command = %command))]
    pub async fn broadcast(
        &self,
        hosts: &[String],
        command: &CommandLine,
    ) -> Result<Vec<BroadcastOutcome>> {
        let dispatches = hosts.iter().map(|host| async move {
            let output = self.run_one(host, command).await;
            (host.clone(), output)
        });

        let mut outcomes = Vec::with_capacity(hosts.len());
        for (host, output) in join_all(dispatches).await {
            outcomes.push(BroadcastOutcome {
                host,
                output: output?,
            });
        }
        Ok(outcomes)
    }

    /// Copy a local file to a path on a remote node.
    #[instrument(skip(self, local), fields(host = %host, remote = %remote_path))]
    pub async fn copy_to(&self, host: &str, local: &Path, remote_path: &str) -> Result<ExecOutput> {
        let mut cmd = Command::new(&self.scp_program);
        cmd.args(TRANSPORT_OPTIONS)
            .arg(local)
            .arg(format!("{}:{}", host, remote_path));
        self.capture(cmd, &self.scp_program).await
    }

    async fn capture(&self, mut cmd: Command, program: &str) -> Result<ExecOutput> {
        let output = cmd.output().await.map_err(|e| {
            RemoteError::TransportUnavailable {
                program: program.to_string(),
                message: e.to_string(),
            }
        })?;
        Ok(ExecOutput::from_output(output))
    }
}

/// One candidate execution site for a read-only diagnostic command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// The local default search path.
    LocalName,
    /// The fixed local installation directory.
    LocalPath,
    /// The diagnostic node, with the remote search path augmented by the
    /// installation directory.
    RemoteName,
    /// The diagnostic node, addressing the installation path directly.
    RemotePath,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::LocalName => "local name",
            Strategy::LocalPath => "local install path",
            Strategy::RemoteName => "remote name",
            Strategy::RemotePath => "remote install path",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Successful resolution of a diagnostic command.
#[derive(Debug)]
pub struct Resolved {
    pub output: ExecOutput,
    /// The strategy that produced the result.
    pub strategy: Strategy,
    /// Every strategy attempted, in order, including the successful one.
    pub tried: Vec<Strategy>,
}

/// First-match resolution chain for read-only diagnostic commands.
///
/// Strategies are attempted in a fixed order; the first success wins and
/// no later strategy is attempted after a success. The chain is recomputed
/// for every invocation and never persisted.
#[derive(Debug)]
pub struct ResolutionChain<'a> {
    shell: &'a RemoteShell,
    install_dir: PathBuf,
    diagnostic_node: Option<String>,
}

impl<'a> ResolutionChain<'a> {
    pub fn new(
        shell: &'a RemoteShell,
        install_dir: impl Into<PathBuf>,
        diagnostic_node: Option<String>,
    ) -> Self {
        Self {
            shell,
            install_dir: install_dir.into(),
            diagnostic_node,
        }
    }

    /// Resolve `program` across the candidate sites and run it with `args`.
    ///
    /// Returns the first successful result, or a [`RemoteError::ResolutionFailed`]
    /// carrying the last failure verbatim once every strategy has failed.
    #[instrument(skip(self, args), fields(program = %program))]
    pub async fn resolve_and_run(&self, program: &str, args: &[&str]) -> Result<Resolved> {
        let mut tried = Vec::new();
        let mut last_failure = String::new();

        // (a) local, resolved through the default search path
        tried.push(Strategy::LocalName);
        match self.run_local(program, args).await {
            Ok(output) if output.success() => {
                return Ok(Resolved {
                    output,
                    strategy: Strategy::LocalName,
                    tried,
                });
            }
            Ok(output) => last_failure = output.failure_summary(),
            Err(message) => last_failure = message,
        }
        debug!(program = program, strategy = %Strategy::LocalName, failure = %last_failure, "strategy failed");

        // (b) local, at the fixed installation path
        tried.push(Strategy::LocalPath);
        let fixed = self.install_dir.join(program);
        if fixed.exists() {
            match self.run_local(&fixed.to_string_lossy(), args).await {
                Ok(output) if output.success() => {
                    return Ok(Resolved {
                        output,
                        strategy: Strategy::LocalPath,
                        tried,
                    });
                }
                Ok(output) => last_failure = output.failure_summary(),
                Err(message) => last_failure = message,
            }
        } else {
            last_failure = format!("{} does not exist", fixed.display());
        }
        debug!(program = program, strategy = %Strategy::LocalPath, failure = %last_failure, "strategy failed");

        // (c)/(d) the diagnostic node over the remote shell
        if let Some(node) = &self.diagnostic_node {
            let quoted_args = shell_words::join(args.iter().copied());

            tried.push(Strategy::RemoteName);
            let augmented = format!(
                "PATH=\"$PATH:{}\" {} {}",
                self.install_dir.display(),
                shell_words::quote(program),
                quoted_args
            );
            match self.shell.run_shell(node, augmented.trim()).await {
                Ok(output) if output.success() => {
                    return Ok(Resolved {
                        output,
                        strategy: Strategy::RemoteName,
                        tried,
                    });
                }
                Ok(output) => last_failure = output.failure_summary(),
                Err(e) => last_failure = e.to_string(),
            }
            debug!(program = program, strategy = %Strategy::RemoteName, failure = %last_failure, "strategy failed");

            tried.push(Strategy::RemotePath);
            let direct = format!(
                "{} {}",
                shell_words::quote(&fixed.to_string_lossy()),
                quoted_args
            );
            match self.shell.run_shell(node, direct.trim()).await {
                Ok(output) if output.success() => {
                    return Ok(Resolved {
                        output,
                        strategy: Strategy::RemotePath,
                        tried,
                    });
                }
                Ok(output) => last_failure = output.failure_summary(),
                Err(e) => last_failure = e.to_string(),
            }
            debug!(program = program, strategy = %Strategy::RemotePath, failure = %last_failure, "strategy failed");
        }

        warn!(
            program = program,
            failure = %last_failure,
            "command failed at every resolution strategy"
        );
        Err(RemoteError::ResolutionFailed {
            command: program.to_string(),
            tried: tried
                .iter()
                .map(Strategy::as_str)
                .collect::<Vec<_>>()
                .join(", "),
            last: last_failure,
        }
        .into())
    }

    /// Run a local candidate, mapping a spawn failure (typically "not
    /// found") into a strategy-failure description instead of an error.
    async fn run_local(
        &self,
        program: &str,
        args: &[&str],
    ) -> std::result::Result<ExecOutput, String> {
        let mut cmd = Command::new(program);
        cmd.args(args);
        match cmd.output().await {
            Ok(output) => Ok(ExecOutput::from_output(output)),
            Err(e) => Err(format!("{}: {}", program, e)),
        }
    }
}
