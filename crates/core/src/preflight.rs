//! Preflight precondition checks
//!
//! Run before any phase: privilege check, required local tooling, and the
//! fixed toolkit/installer paths. Any failure here aborts the run before
//! phase A with a non-zero exit.

use crate::config::DeployConfig;
use crate::errors::{PreflightError, Result};
use tracing::{debug, info};

/// Run every precondition check against the loaded configuration.
pub fn run(config: &DeployConfig) -> Result<()> {
    check_root()?;
    check_tool("ssh")?;
    check_tool("scp")?;

    if !config.toolkit.bin_dir.is_dir() {
        return Err(PreflightError::ToolkitMissing {
            path: config.toolkit.bin_dir.display().to_string(),
        }
        .into());
    }
    if !config.toolkit.installer.is_file() {
        return Err(PreflightError::InstallerMissing {
            path: config.toolkit.installer.display().to_string(),
        }
        .into());
    }

    info!("preflight checks passed");
    Ok(())
}

/// The deployment mutates system state on every node; require root.
fn check_root() -> Result<()> {
    #[cfg(unix)]
    {
        let euid = nix::unistd::geteuid();
        if !euid.is_root() {
            return Err(PreflightError::NotRoot {
                uid: euid.as_raw(),
            }
            .into());
        }
    }
    Ok(())
}

/// Look for a required tool on the default search path.
fn check_tool(tool: &str) -> Result<()> {
    let found = std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(tool).is_file()))
        .unwrap_or(false);
    if !found {
        return Err(PreflightError::MissingTool {
            tool: tool.to_string(),
        }
        .into());
    }
    debug!(tool = tool, "required tool present");
    Ok(())
}
