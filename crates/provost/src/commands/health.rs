//! Health command implementation
//!
//! Runs the standalone health-check query path. This entry point bypasses
//! the phase sequence entirely and never issues a cluster-mutating call.

use anyhow::Result;
use provost_core::config::DeployConfig;
use provost_core::health;
use provost_core::remote::RemoteShell;
use std::path::PathBuf;
use tracing::instrument;

/// Health command arguments
#[derive(Debug, Clone)]
pub struct HealthArgs {
    /// Configuration file path
    pub config: PathBuf,
    /// ssh transport program
    pub ssh_command: String,
}

/// Execute the health command
#[instrument(skip(args))]
pub async fn execute_health(args: HealthArgs) -> Result<()> {
    let config = DeployConfig::load(&args.config)?;
    let shell = RemoteShell::with_programs(&args.ssh_command, "scp");
    health::run(&shell, &config).await?;
    println!("health check complete");
    Ok(())
}
