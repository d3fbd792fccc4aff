//! Standalone health-check query path
//!
//! Runs a fixed ordered sequence of read-only diagnostic queries through
//! the resolution chain, bypassing the phase sequence entirely. Two of the
//! five queries are best-effort: their failures are reported inline and do
//! not affect the remaining queries or the process exit code.

use crate::config::DeployConfig;
use crate::errors::Result;
use crate::remote::{RemoteShell, ResolutionChain};
use crate::toolkit::CONTROL_BINARY;
use tracing::{info, instrument, warn};

/// One diagnostic query in the fixed health-check sequence.
#[derive(Debug)]
pub struct HealthQuery {
    pub label: &'static str,
    pub args: &'static [&'static str],
    /// Required queries abort the health check on failure; best-effort
    /// queries only report it.
    pub required: bool,
}

/// The five queries, in execution order.
pub const QUERIES: &[HealthQuery] = &[
    HealthQuery {
        label: "cluster listing",
        args: &["cluster", "list"],
        required: true,
    },
    HealthQuery {
        label: "cluster state",
        args: &["cluster", "state"],
        required: true,
    },
    HealthQuery {
        label: "node health summary",
        args: &["health", "nodes"],
        required: false,
    },
    HealthQuery {
        label: "recent health events",
        args: &["health", "events"],
        required: false,
    },
    HealthQuery {
        label: "storage device listing",
        args: &["nsd", "list"],
        required: true,
    },
];

/// Run the health-check sequence. Issues no cluster-mutating call.
#[instrument(skip(shell, config))]
pub async fn run(shell: &RemoteShell, config: &DeployConfig) -> Result<()> {
    let chain = ResolutionChain::new(
        shell,
        &config.toolkit.bin_dir,
        Some(config.management_node.clone()),
    );

    for query in QUERIES {
        info!(query = query.label, "running diagnostic query");
        match chain.resolve_and_run(CONTROL_BINARY, query.args).await {
            Ok(resolved) => {
                println!("=== {} (via {})", query.label, resolved.strategy);
                let report = resolved.output.stdout.trim_end();
                if report.is_empty() {
                    println!("(no output)");
                } else {
                    println!("{}", report);
                }
            }
            Err(e) if !query.required => {
                warn!(query = query.label, error = %e, "best-effort diagnostic failed");
                println!("=== {} — WARNING: {}", query.label, e);
            }
            Err(e) => return Err(e),
        }
    }

    Ok(())
}
