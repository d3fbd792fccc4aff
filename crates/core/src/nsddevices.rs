//! Device-discovery script generation and distribution
//!
//! Each storage node receives a small executable script whose entire
//! behavior is to print that node's configured device path; the toolkit
//! picks it up from a well-known path during device discovery. Scripts are
//! staged in a scoped temporary directory that is removed on every exit
//! path of the phase, whether or not individual node copies failed.

use crate::config::NsdEntry;
use crate::errors::{ProvostError, Result};
use crate::remote::{CommandLine, RemoteShell};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// One generated script, staged locally and destined for one node.
#[derive(Debug)]
pub struct DeviceScript {
    pub host: String,
    pub path: PathBuf,
}

/// The staged script set. Dropping the set removes the staging directory.
#[derive(Debug)]
pub struct DeviceScriptSet {
    dir: tempfile::TempDir,
    scripts: Vec<DeviceScript>,
}

impl DeviceScriptSet {
    /// Generate one script per storage node into a fresh staging directory.
    #[instrument(skip(entries), fields(nodes = entries.len()))]
    pub fn generate(entries: &[NsdEntry]) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("provost-nsddevices-")
            .tempdir()
            .map_err(|e| ProvostError::Artifact(format!("failed to create staging dir: {}", e)))?;

        let mut scripts = Vec::with_capacity(entries.len());
        for entry in entries {
            let path = dir.path().join(format!("nsddevices-{}", entry.host));
            std::fs::write(&path, script_body(entry)).map_err(|e| {
                ProvostError::Artifact(format!(
                    "failed to write device script for {}: {}",
                    entry.host, e
                ))
            })?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).map_err(
                    |e| {
                        ProvostError::Artifact(format!(
                            "failed to mark device script executable for {}: {}",
                            entry.host, e
                        ))
                    },
                )?;
            }
            debug!(host = %entry.host, path = %path.display(), "device script staged");
            scripts.push(DeviceScript {
                host: entry.host.clone(),
                path,
            });
        }

        Ok(Self { dir, scripts })
    }

    pub fn scripts(&self) -> &[DeviceScript] {
        &self.scripts
    }

    /// The staging directory; exists only while the set is alive.
    pub fn staging_dir(&self) -> &Path {
        self.dir.path()
    }

    /// Copy each script to its node at `target_path` and mark it executable
    /// there. Per-node failures are reported and skipped; only an
    /// unreachable transport aborts. Returns the number of nodes
    /// successfully provisioned.
    #[instrument(skip(self, shell), fields(target = %target_path))]
    pub async fn distribute(&self, shell: &RemoteShell, target_path: &str) -> Result<usize> {
        let mut provisioned = 0;
        for script in &self.scripts {
            let copied = shell.copy_to(&script.host, &script.path, target_path).await?;
            if !copied.success() {
                warn!(
                    host = %script.host,
                    detail = %copied.failure_summary(),
                    "device script copy failed; node skipped"
                );
                continue;
            }

            let chmod = CommandLine::new("chmod").arg("+x").arg(target_path);
            let marked = shell.run_one(&script.host, &chmod).await?;
            if !marked.success() {
                warn!(
                    host = %script.host,
                    detail = %marked.failure_summary(),
                    "failed to mark device script executable; node skipped"
                );
                continue;
            }

            info!(host = %script.host, "device script installed");
            provisioned += 1;
        }
        Ok(provisioned)
    }
}

fn script_body(entry: &NsdEntry) -> String {
    format!(
        "#!/bin/sh\n# Device discovery for {host}: print the device contributed by this node.\necho '{device}'\nexit 0\n",
        host = entry.host,
        device = entry.device.display()
    )
}
