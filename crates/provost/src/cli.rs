//! CLI argument parsing and dispatch
//!
//! The two entry points are mutually exclusive by construction: `deploy`
//! drives the phase sequence A..J, `health` runs only the read-only
//! diagnostic path. The resume selector is validated against the fixed
//! phase alphabet at parse time.

use crate::commands;
use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use provost_core::phase::DeployPhase;
use std::path::PathBuf;

/// Log format options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    Text,
    /// JSON structured format
    Json,
}

impl LogFormat {
    fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Text => "text",
            LogFormat::Json => "json",
        }
    }
}

/// Guided deployment orchestrator for ScaleFS clusters
#[derive(Debug, Parser)]
#[command(name = "provost", version, about)]
pub struct Cli {
    /// Log format (text or json)
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// provost subcommands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the deployment phase sequence (phases A..J)
    Deploy {
        /// Run unattended: no confirmation prompts
        #[arg(long)]
        yes: bool,

        /// Override the configured cluster name during cluster initialization
        #[arg(long)]
        cluster_name: Option<String>,

        /// Resume from a phase letter (A..J), skipping earlier phases
        #[arg(long, value_name = "PHASE")]
        resume_phase: Option<DeployPhase>,

        /// Deployment configuration file
        #[arg(long, default_value = "provost.toml")]
        config: PathBuf,

        /// Skip privilege and tooling preflight checks (hidden testing flag)
        #[arg(long, hide = true)]
        skip_preflight: bool,

        /// Alternative ssh transport program (hidden testing flag)
        #[arg(long, hide = true, default_value = "ssh")]
        ssh_command: String,

        /// Alternative scp transport program (hidden testing flag)
        #[arg(long, hide = true, default_value = "scp")]
        scp_command: String,
    },

    /// Run the standalone health-check queries and exit
    Health {
        /// Deployment configuration file
        #[arg(long, default_value = "provost.toml")]
        config: PathBuf,

        /// Alternative ssh transport program (hidden testing flag)
        #[arg(long, hide = true, default_value = "ssh")]
        ssh_command: String,
    },
}

impl Cli {
    /// Initialize logging and run the selected command.
    pub async fn dispatch(self) -> Result<()> {
        provost_core::logging::init(Some(self.log_format.as_str()))?;

        match self.command {
            Commands::Deploy {
                yes,
                cluster_name,
                resume_phase,
                config,
                skip_preflight,
                ssh_command,
                scp_command,
            } => {
                commands::deploy::execute_deploy(commands::deploy::DeployArgs {
                    yes,
                    cluster_name,
                    resume_phase,
                    config,
                    skip_preflight,
                    ssh_command,
                    scp_command,
                })
                .await
            }
            Commands::Health {
                config,
                ssh_command,
            } => {
                commands::health::execute_health(commands::health::HealthArgs {
                    config,
                    ssh_command,
                })
                .await
            }
        }
    }
}
