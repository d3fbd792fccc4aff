//! Deploy command implementation
//!
//! Drives the ordered phase sequence A..J. Every phase consults the gate
//! before acting: a resume cursor skips earlier phases exactly once, and in
//! interactive mode the operator confirms before each phase and again
//! before moving on. Declining either prompt ends the whole run as a
//! success, not an error.

use crate::ui::prompt;
use anyhow::Result;
use provost_core::config::DeployConfig;
use provost_core::errors::ToolkitError;
use provost_core::nsddevices::DeviceScriptSet;
use provost_core::phase::{DeployPhase, GateDecision, RunState};
use provost_core::preflight;
use provost_core::remote::{BroadcastOutcome, CommandLine, RemoteShell, ResolutionChain};
use provost_core::toolkit::{Installer, NodeRoles, Registration, Toolkit, CONTROL_BINARY};
use std::path::PathBuf;
use tracing::{info, instrument, warn};

/// Deploy command arguments
#[derive(Debug, Clone)]
pub struct DeployArgs {
    /// Run unattended (no confirmation prompts)
    pub yes: bool,
    /// Cluster name override for cluster initialization
    pub cluster_name: Option<String>,
    /// Phase to resume from, skipping earlier phases once
    pub resume_phase: Option<DeployPhase>,
    /// Configuration file path
    pub config: PathBuf,
    /// Skip preflight checks (testing)
    pub skip_preflight: bool,
    /// ssh transport program
    pub ssh_command: String,
    /// scp transport program
    pub scp_command: String,
}

/// Everything a phase body needs, borrowed for the duration of the run.
struct PhaseContext<'a> {
    config: &'a DeployConfig,
    shell: &'a RemoteShell,
    toolkit: &'a Toolkit,
    installer: &'a Installer,
    cluster_name: &'a str,
}

/// Execute the deploy command
#[instrument(skip(args))]
pub async fn execute_deploy(args: DeployArgs) -> Result<()> {
    let config = DeployConfig::load(&args.config)?;

    if args.skip_preflight {
        warn!("preflight checks skipped");
    } else {
        preflight::run(&config)?;
    }

    let shell = RemoteShell::with_programs(&args.ssh_command, &args.scp_command);
    let toolkit = Toolkit::new(&config.toolkit.bin_dir);
    let installer = Installer::new(&config.toolkit.installer);

    let mut state = RunState::new(args.resume_phase, args.yes, args.cluster_name);
    let cluster_name = state
        .cluster_name_override()
        .unwrap_or(config.cluster_name.as_str())
        .to_string();

    let ctx = PhaseContext {
        config: &config,
        shell: &shell,
        toolkit: &toolkit,
        installer: &installer,
        cluster_name: &cluster_name,
    };

    let sequence = DeployPhase::sequence();
    for (index, &phase) in sequence.iter().enumerate() {
        match state.evaluate(phase) {
            GateDecision::Skip => {
                info!(phase = %phase, "phase skipped by resume cursor");
                println!("--- phase {}: skipped (resume)", phase);
                continue;
            }
            GateDecision::ProceedAfterConfirmation => {
                let question = format!("Phase {}: {}. Run this phase?", phase, phase.describe());
                if !prompt::confirm(&question)? {
                    println!("Deployment aborted at operator request before phase {}.", phase);
                    return Ok(());
                }
            }
            GateDecision::ProceedUnattended => {}
        }

        println!("=== phase {}: {}", phase, phase.describe());
        run_phase(phase, &ctx).await?;

        if !state.unattended() && index + 1 < sequence.len() {
            if !prompt::confirm("Proceed to the next phase?")? {
                println!("Deployment stopped at operator request after phase {}.", phase);
                return Ok(());
            }
        }
    }

    println!("Deployment sequence complete for cluster '{}'.", cluster_name);
    Ok(())
}

async fn run_phase(phase: DeployPhase, ctx: &PhaseContext<'_>) -> Result<()> {
    match phase {
        DeployPhase::Packages => phase_packages(ctx).await,
        DeployPhase::VerifyInstaller => phase_verify_installer(ctx),
        DeployPhase::InstallToolkit => phase_install_toolkit(ctx).await,
        DeployPhase::CreateCluster => phase_create_cluster(ctx),
        DeployPhase::RegisterNodes => phase_register_nodes(ctx),
        DeployPhase::DefineStorage => phase_define_storage(ctx),
        DeployPhase::DeviceScripts => phase_device_scripts(ctx).await,
        DeployPhase::ClusterInstall => phase_cluster_install(ctx),
        DeployPhase::GuiUsers => phase_gui_users(ctx).await,
        DeployPhase::VerifyCluster => phase_verify_cluster(ctx).await,
    }
}

/// Report a broadcast's per-node outcomes. Individual failures are warned
/// about, never aggregated into a hard error; interpretation is left to the
/// operator reading the output.
fn report_broadcast(outcomes: &[BroadcastOutcome], action: &str) {
    for outcome in outcomes {
        if outcome.output.success() {
            info!(host = %outcome.host, action = action, "ok");
        } else {
            warn!(
                host = %outcome.host,
                action = action,
                detail = %outcome.output.failure_summary(),
                "node reported a failure"
            );
            println!(
                "WARNING: {} failed on {}: {}",
                action,
                outcome.host,
                outcome.output.failure_summary()
            );
        }
    }
}

/// Phase A: repository subscription and package install on every node.
async fn phase_packages(ctx: &PhaseContext<'_>) -> Result<()> {
    let hosts: Vec<String> = ctx.config.hosts().iter().map(|h| h.to_string()).collect();

    let subscribe = CommandLine::new("subscription-manager")
        .arg("repos")
        .arg(format!("--enable={}", ctx.config.packages.repo));
    let outcomes = ctx.shell.broadcast(&hosts, &subscribe).await?;
    report_broadcast(&outcomes, "repository subscription");

    let install = CommandLine::new("dnf")
        .arg("install")
        .arg("-y")
        .args(ctx.config.packages.names.iter().cloned());
    let outcomes = ctx.shell.broadcast(&hosts, &install).await?;
    report_broadcast(&outcomes, "package install");

    Ok(())
}

/// Phase B: verify the installer binary locally. Fatal on failure.
fn phase_verify_installer(ctx: &PhaseContext<'_>) -> Result<()> {
    ctx.installer.verify()?;
    println!("installer verified: {}", ctx.installer.path().display());
    Ok(())
}

/// Phase C: silent toolkit install on every node. Unlike the package
/// broadcast, a failure on any node is fatal: the install is a required
/// step and later phases assume the toolkit is present cluster-wide.
async fn phase_install_toolkit(ctx: &PhaseContext<'_>) -> Result<()> {
    let hosts: Vec<String> = ctx.config.hosts().iter().map(|h| h.to_string()).collect();
    let outcomes = ctx
        .shell
        .broadcast(&hosts, &ctx.installer.silent_install_command())
        .await?;
    report_broadcast(&outcomes, "silent install");

    let failed: Vec<&BroadcastOutcome> =
        outcomes.iter().filter(|o| !o.output.success()).collect();
    if let Some(first) = failed.first() {
        return Err(ToolkitError::InstallerFailed {
            step: "silent install".to_string(),
            code: first.output.code,
            stderr: format!(
                "failed on {}",
                failed
                    .iter()
                    .map(|o| o.host.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
        .into());
    }

    println!("toolkit installed on {} nodes", hosts.len());
    Ok(())
}

/// Phase D: cluster initialization. Fatal on failure.
fn phase_create_cluster(ctx: &PhaseContext<'_>) -> Result<()> {
    ctx.toolkit
        .create_cluster(&ctx.config.management_node, Some(ctx.cluster_name))?;
    println!(
        "cluster '{}' initialized with management node {}",
        ctx.cluster_name, ctx.config.management_node
    );
    Ok(())
}

/// Phase E: register every node, tolerating duplicates, then list them.
fn phase_register_nodes(ctx: &PhaseContext<'_>) -> Result<()> {
    for node in &ctx.config.nodes {
        let roles = NodeRoles {
            quorum: node.quorum,
            manager: node.manager,
            gui: node.gui,
        };
        match ctx.toolkit.register_node(&node.host, roles)? {
            Registration::Registered => println!("registered node {}", node.host),
            Registration::AlreadyPresent => {
                println!("WARNING: node {} skipped (already registered)", node.host)
            }
        }
    }

    let report = ctx.toolkit.list_nodes()?;
    println!("{}", report.trim_end());
    Ok(())
}

/// Phase F: define one storage resource per NSD mapping entry.
fn phase_define_storage(ctx: &PhaseContext<'_>) -> Result<()> {
    for entry in ctx.config.nsd_entries() {
        match ctx.toolkit.register_storage(&entry)? {
            Registration::Registered => println!(
                "defined storage {} on {} (failure group {})",
                entry.device.display(),
                entry.host,
                entry.failure_group
            ),
            Registration::AlreadyPresent => println!(
                "WARNING: storage {} on {} skipped (already defined)",
                entry.device.display(),
                entry.host
            ),
        }
    }
    Ok(())
}

/// Phase G: generate the per-node device-discovery scripts, copy each to
/// its node and mark it executable there. The staging directory is scoped
/// to this function, so it is removed on every exit path regardless of
/// per-node copy failures.
async fn phase_device_scripts(ctx: &PhaseContext<'_>) -> Result<()> {
    let entries = ctx.config.nsd_entries();
    if entries.is_empty() {
        println!("no storage nodes configured; nothing to distribute");
        return Ok(());
    }

    let set = DeviceScriptSet::generate(&entries)?;
    let provisioned = set
        .distribute(ctx.shell, &ctx.config.toolkit.nsddevices_path)
        .await?;
    println!(
        "device scripts installed on {}/{} storage nodes",
        provisioned,
        entries.len()
    );
    Ok(())
}

/// Phase H: disable call home, then the two-stage cluster-wide install.
/// The call-home toggle is advisory; both install stages are fatal.
fn phase_cluster_install(ctx: &PhaseContext<'_>) -> Result<()> {
    let callhome = ctx.toolkit.set_callhome(false)?;
    if callhome.success() {
        println!("call home disabled");
    } else {
        warn!(detail = %callhome.failure_summary(), "call home toggle refused");
        println!(
            "WARNING: call home could not be disabled: {}",
            callhome.failure_summary()
        );
    }

    ctx.toolkit.install_precheck()?;
    println!("install precheck passed");

    ctx.toolkit.install_apply()?;
    println!("cluster-wide install applied");
    Ok(())
}

/// Phase I: create the GUI administrative user on the GUI node. A missing
/// GUI node or GUI CLI is reported and tolerated.
async fn phase_gui_users(ctx: &PhaseContext<'_>) -> Result<()> {
    let Some(gui_node) = ctx.config.gui_node() else {
        println!("WARNING: no GUI node configured; skipping GUI user setup");
        return Ok(());
    };

    let cli_path = ctx.config.toolkit.gui_cli.to_string_lossy().into_owned();
    let probe = CommandLine::new("test").arg("-x").arg(&cli_path);
    let probed = ctx.shell.run_one(&gui_node.host, &probe).await?;
    if !probed.success() {
        warn!(host = %gui_node.host, path = %cli_path, "GUI CLI not found");
        println!(
            "WARNING: GUI CLI not found at {} on {}; skipping GUI user setup",
            cli_path, gui_node.host
        );
        return Ok(());
    }

    let mkuser = CommandLine::new(&cli_path)
        .arg("mkuser")
        .arg(&ctx.config.gui.admin_user)
        .arg("-g")
        .arg(&ctx.config.gui.admin_group);
    let output = ctx.shell.run_one(&gui_node.host, &mkuser).await?;
    if output.success() {
        println!(
            "GUI user '{}' created in group '{}' on {}",
            ctx.config.gui.admin_user, ctx.config.gui.admin_group, gui_node.host
        );
    } else {
        warn!(
            host = %gui_node.host,
            detail = %output.failure_summary(),
            "GUI user creation failed"
        );
        println!(
            "WARNING: GUI user creation failed on {}: {}",
            gui_node.host,
            output.failure_summary()
        );
    }
    Ok(())
}

/// Phase J: final read-only verification through the resolution chain.
async fn phase_verify_cluster(ctx: &PhaseContext<'_>) -> Result<()> {
    let chain = ResolutionChain::new(
        ctx.shell,
        &ctx.config.toolkit.bin_dir,
        Some(ctx.config.management_node.clone()),
    );

    for (label, args) in [
        ("node listing", ["node", "list"]),
        ("cluster state", ["cluster", "state"]),
    ] {
        let resolved = chain.resolve_and_run(CONTROL_BINARY, &args).await?;
        println!("=== {} (via {})", label, resolved.strategy);
        let report = resolved.output.stdout.trim_end();
        if report.is_empty() {
            println!("(no output)");
        } else {
            println!("{}", report);
        }
    }
    Ok(())
}
