//! Deployment phases and the resume state machine
//!
//! The deployment is a fixed ordered sequence of ten phases, each identified
//! by an ordinal letter A..J. A run may be resumed from an arbitrary phase:
//! the resume cursor skips every phase that sorts strictly before it and is
//! cleared the first time a phase at or after it is admitted, so later
//! phases are governed purely by the confirmation policy.

use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// One phase of the deployment sequence, in execution order.
///
/// The discriminant order is the total order: `Packages` is phase A,
/// `VerifyCluster` is phase J.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DeployPhase {
    /// A: repository subscription and package install on all nodes
    Packages,
    /// B: local installer binary verification
    VerifyInstaller,
    /// C: silent toolkit install on all nodes
    InstallToolkit,
    /// D: cluster initialization
    CreateCluster,
    /// E: node registration
    RegisterNodes,
    /// F: storage resource definition
    DefineStorage,
    /// G: device-discovery script generation and distribution
    DeviceScripts,
    /// H: call-home disable and two-stage cluster install
    ClusterInstall,
    /// I: GUI administrative user setup
    GuiUsers,
    /// J: final cluster verification
    VerifyCluster,
}

impl DeployPhase {
    /// All phases in execution order.
    pub fn sequence() -> &'static [DeployPhase] {
        &[
            DeployPhase::Packages,
            DeployPhase::VerifyInstaller,
            DeployPhase::InstallToolkit,
            DeployPhase::CreateCluster,
            DeployPhase::RegisterNodes,
            DeployPhase::DefineStorage,
            DeployPhase::DeviceScripts,
            DeployPhase::ClusterInstall,
            DeployPhase::GuiUsers,
            DeployPhase::VerifyCluster,
        ]
    }

    /// The ordinal letter identifying this phase.
    pub fn letter(&self) -> char {
        match self {
            DeployPhase::Packages => 'A',
            DeployPhase::VerifyInstaller => 'B',
            DeployPhase::InstallToolkit => 'C',
            DeployPhase::CreateCluster => 'D',
            DeployPhase::RegisterNodes => 'E',
            DeployPhase::DefineStorage => 'F',
            DeployPhase::DeviceScripts => 'G',
            DeployPhase::ClusterInstall => 'H',
            DeployPhase::GuiUsers => 'I',
            DeployPhase::VerifyCluster => 'J',
        }
    }

    /// Short human-readable description shown in prompts and logs.
    pub fn describe(&self) -> &'static str {
        match self {
            DeployPhase::Packages => "subscribe package repository and install packages on all nodes",
            DeployPhase::VerifyInstaller => "verify the toolkit installer binary",
            DeployPhase::InstallToolkit => "silently install the toolkit on all nodes",
            DeployPhase::CreateCluster => "initialize the cluster",
            DeployPhase::RegisterNodes => "register cluster nodes",
            DeployPhase::DefineStorage => "define storage resources",
            DeployPhase::DeviceScripts => "generate and distribute device-discovery scripts",
            DeployPhase::ClusterInstall => "disable call home and run the cluster-wide install",
            DeployPhase::GuiUsers => "create the GUI administrative user",
            DeployPhase::VerifyCluster => "verify cluster state",
        }
    }
}

impl fmt::Display for DeployPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl FromStr for DeployPhase {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        let (first, rest) = (chars.next(), chars.next());
        match (first, rest) {
            (Some(c), None) => {
                let upper = c.to_ascii_uppercase();
                DeployPhase::sequence()
                    .iter()
                    .find(|p| p.letter() == upper)
                    .copied()
                    .ok_or_else(|| format!("invalid phase '{}': expected a letter A..J", trimmed))
            }
            _ => Err(format!("invalid phase '{}': expected a letter A..J", trimmed)),
        }
    }
}

/// Gate decision for a single phase evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// The phase sorts before the resume cursor; its body must not run and
    /// no confirmation prompt is shown.
    Skip,
    /// The phase may run once the operator confirms.
    ProceedAfterConfirmation,
    /// The phase runs without prompting (unattended mode).
    ProceedUnattended,
}

/// Mutable run state threaded through every phase evaluation.
///
/// This is the only mutable shared entity in a run. The resume cursor has
/// one-shot semantics: it is cleared as a side effect of the first
/// evaluation that admits a phase at or after it.
#[derive(Debug)]
pub struct RunState {
    resume_from: Option<DeployPhase>,
    unattended: bool,
    cluster_name: Option<String>,
}

impl RunState {
    /// Create run state from the invocation options.
    pub fn new(
        resume_from: Option<DeployPhase>,
        unattended: bool,
        cluster_name: Option<String>,
    ) -> Self {
        Self {
            resume_from,
            unattended,
            cluster_name,
        }
    }

    /// Whether the run is unattended (no confirmation prompts).
    pub fn unattended(&self) -> bool {
        self.unattended
    }

    /// Explicit cluster-name override, if any.
    pub fn cluster_name_override(&self) -> Option<&str> {
        self.cluster_name.as_deref()
    }

    /// The resume cursor, if it has not yet been consumed.
    pub fn resume_cursor(&self) -> Option<DeployPhase> {
        self.resume_from
    }

    /// Evaluate the gate for `phase`.
    ///
    /// If the resume cursor is set and `phase` sorts strictly before it the
    /// result is [`GateDecision::Skip`]. Otherwise the cursor (if set) is
    /// cleared, and the decision is governed by the unattended flag alone.
    pub fn evaluate(&mut self, phase: DeployPhase) -> GateDecision {
        if let Some(cursor) = self.resume_from {
            if phase < cursor {
                debug!(phase = %phase, cursor = %cursor, "phase skipped by resume cursor");
                return GateDecision::Skip;
            }
            // One-shot: resume applies only to the first phase reached at or
            // after the cursor point.
            self.resume_from = None;
        }

        if self.unattended {
            GateDecision::ProceedUnattended
        } else {
            GateDecision::ProceedAfterConfirmation
        }
    }
}
