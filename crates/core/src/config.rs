//! Deployment configuration
//!
//! The orchestrator reads a single TOML file at startup describing the
//! cluster: its name, the node set with role flags, the storage device
//! mapping, and the fixed installation paths of the external toolkit.
//! The configuration is immutable after loading; validation failures are
//! startup-time fatal errors.

use crate::errors::{ConfigError, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

fn default_bin_dir() -> PathBuf {
    PathBuf::from("/opt/scalefs/5.2/bin")
}

fn default_installer() -> PathBuf {
    PathBuf::from("/opt/scalefs/installer/scalefs-install")
}

fn default_gui_cli() -> PathBuf {
    PathBuf::from("/opt/scalefs/gui/bin/guicli")
}

fn default_nsddevices_path() -> String {
    "/var/lib/scalefs/nsddevices".to_string()
}

fn default_repo() -> String {
    "scalefs-5.2".to_string()
}

fn default_package_names() -> Vec<String> {
    vec!["scalefs-server".to_string(), "scalefs-gui".to_string()]
}

fn default_admin_user() -> String {
    "admin".to_string()
}

fn default_admin_group() -> String {
    "SecurityAdmin".to_string()
}

/// Fixed installation paths of the external toolkit.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ToolkitPaths {
    /// Directory holding the versioned toolkit binaries.
    #[serde(default = "default_bin_dir")]
    pub bin_dir: PathBuf,
    /// The installer binary used for verification and silent install.
    #[serde(default = "default_installer")]
    pub installer: PathBuf,
    /// The GUI user-management CLI on the GUI node.
    #[serde(default = "default_gui_cli")]
    pub gui_cli: PathBuf,
    /// Well-known path on each storage node where the toolkit looks for
    /// the device-discovery script.
    #[serde(default = "default_nsddevices_path")]
    pub nsddevices_path: String,
}

impl Default for ToolkitPaths {
    fn default() -> Self {
        Self {
            bin_dir: default_bin_dir(),
            installer: default_installer(),
            gui_cli: default_gui_cli(),
            nsddevices_path: default_nsddevices_path(),
        }
    }
}

/// Package repository subscription and package set for phase A.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct PackageConfig {
    /// Repository id passed to the subscription mechanism.
    #[serde(default = "default_repo")]
    pub repo: String,
    /// Packages installed on every node.
    #[serde(default = "default_package_names")]
    pub names: Vec<String>,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            repo: default_repo(),
            names: default_package_names(),
        }
    }
}

/// GUI administrative user created in phase I.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct GuiConfig {
    #[serde(default = "default_admin_user")]
    pub admin_user: String,
    #[serde(default = "default_admin_group")]
    pub admin_group: String,
}

impl Default for GuiConfig {
    fn default() -> Self {
        Self {
            admin_user: default_admin_user(),
            admin_group: default_admin_group(),
        }
    }
}

/// One cluster node with its role flags and optional storage device.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct NodeConfig {
    /// Hostname or address reachable over the remote shell.
    pub host: String,
    #[serde(default)]
    pub quorum: bool,
    #[serde(default)]
    pub manager: bool,
    #[serde(default)]
    pub gui: bool,
    /// Block device contributed by this node, if it is a storage node.
    #[serde(default)]
    pub device: Option<PathBuf>,
    /// Failure group the device belongs to. Required iff `device` is set.
    #[serde(default)]
    pub failure_group: Option<u32>,
}

/// One entry of the node -> (device, failure group) mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NsdEntry {
    pub host: String,
    pub device: PathBuf,
    pub failure_group: u32,
}

/// The full deployment configuration, loaded once at startup.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct DeployConfig {
    /// Default cluster name; a CLI override takes precedence in phase D.
    pub cluster_name: String,
    /// Node used as the management address for cluster initialization and
    /// as the diagnostic node for remote command resolution.
    pub management_node: String,
    pub nodes: Vec<NodeConfig>,
    #[serde(default)]
    pub toolkit: ToolkitPaths,
    #[serde(default)]
    pub packages: PackageConfig,
    #[serde(default)]
    pub gui: GuiConfig,
}

impl DeployConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            }
            .into());
        }

        let raw = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        let config: DeployConfig = toml::from_str(&raw).map_err(|e| ConfigError::Parsing {
            message: e.to_string(),
        })?;
        config.validate()?;
        debug!(
            path = %path.display(),
            nodes = config.nodes.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Validate cross-field invariants.
    pub fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(validation("at least one node must be configured"));
        }

        let mut seen = HashSet::new();
        for node in &self.nodes {
            if node.host.trim().is_empty() {
                return Err(validation("node host must not be empty"));
            }
            if !seen.insert(node.host.as_str()) {
                return Err(validation(&format!(
                    "node '{}' is listed more than once",
                    node.host
                )));
            }
            match (&node.device, node.failure_group) {
                (Some(_), None) => {
                    return Err(validation(&format!(
                        "storage node '{}' has a device but no failure-group",
                        node.host
                    )));
                }
                (None, Some(_)) => {
                    return Err(validation(&format!(
                        "node '{}' has a failure-group but no device",
                        node.host
                    )));
                }
                (Some(_), Some(0)) => {
                    return Err(validation(&format!(
                        "storage node '{}': failure-group must be a positive integer",
                        node.host
                    )));
                }
                _ => {}
            }
        }

        if !self.nodes.iter().any(|n| n.host == self.management_node) {
            return Err(validation(&format!(
                "management-node '{}' is not in the node list",
                self.management_node
            )));
        }

        if !self.nodes.iter().any(|n| n.quorum) {
            return Err(validation("at least one node must carry the quorum role"));
        }

        Ok(())
    }

    /// All node hostnames in configuration order.
    pub fn hosts(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.host.as_str()).collect()
    }

    /// The node -> (device, failure group) mapping, one entry per storage
    /// node. Validation guarantees each storage node appears exactly once.
    pub fn nsd_entries(&self) -> Vec<NsdEntry> {
        self.nodes
            .iter()
            .filter_map(|n| match (&n.device, n.failure_group) {
                (Some(device), Some(failure_group)) => Some(NsdEntry {
                    host: n.host.clone(),
                    device: device.clone(),
                    failure_group,
                }),
                _ => None,
            })
            .collect()
    }

    /// The GUI node, if one is configured.
    pub fn gui_node(&self) -> Option<&NodeConfig> {
        self.nodes.iter().find(|n| n.gui)
    }
}

fn validation(message: &str) -> crate::errors::ProvostError {
    ConfigError::Validation {
        message: message.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
cluster-name = "scale-lab"
management-node = "node01"

[toolkit]
bin-dir = "/opt/scalefs/5.2/bin"

[packages]
repo = "scalefs-5.2-rhel9"
names = ["scalefs-server"]

[[nodes]]
host = "node01"
quorum = true
manager = true
device = "/dev/sdb"
failure-group = 1

[[nodes]]
host = "node02"
quorum = true
device = "/dev/sdb"
failure-group = 2

[[nodes]]
host = "node03"
gui = true
"#;

    fn parse(raw: &str) -> DeployConfig {
        toml::from_str(raw).expect("sample config must parse")
    }

    #[test]
    fn sample_config_parses_and_validates() {
        let config = parse(SAMPLE);
        config.validate().unwrap();
        assert_eq!(config.cluster_name, "scale-lab");
        assert_eq!(config.hosts(), vec!["node01", "node02", "node03"]);
        assert_eq!(config.gui_node().unwrap().host, "node03");
    }

    #[test]
    fn nsd_mapping_has_one_entry_per_storage_node() {
        let config = parse(SAMPLE);
        let entries = config.nsd_entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].host, "node01");
        assert_eq!(entries[0].device, PathBuf::from("/dev/sdb"));
        assert_eq!(entries[0].failure_group, 1);
        assert_eq!(entries[1].failure_group, 2);
    }

    #[test]
    fn defaults_fill_in_toolkit_paths() {
        let config = parse(
            r#"
cluster-name = "c"
management-node = "n1"
[[nodes]]
host = "n1"
quorum = true
"#,
        );
        assert_eq!(config.toolkit.bin_dir, PathBuf::from("/opt/scalefs/5.2/bin"));
        assert_eq!(config.toolkit.nsddevices_path, "/var/lib/scalefs/nsddevices");
        assert_eq!(config.gui.admin_user, "admin");
    }

    #[test]
    fn device_without_failure_group_is_rejected() {
        let config = parse(
            r#"
cluster-name = "c"
management-node = "n1"
[[nodes]]
host = "n1"
quorum = true
device = "/dev/sdc"
"#,
        );
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("no failure-group"));
    }

    #[test]
    fn zero_failure_group_is_rejected() {
        let config = parse(
            r#"
cluster-name = "c"
management-node = "n1"
[[nodes]]
host = "n1"
quorum = true
device = "/dev/sdc"
failure-group = 0
"#,
        );
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("positive integer"));
    }

    #[test]
    fn duplicate_hosts_are_rejected() {
        let config = parse(
            r#"
cluster-name = "c"
management-node = "n1"
[[nodes]]
host = "n1"
quorum = true
[[nodes]]
host = "n1"
"#,
        );
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn management_node_must_be_listed() {
        let config = parse(
            r#"
cluster-name = "c"
management-node = "elsewhere"
[[nodes]]
host = "n1"
quorum = true
"#,
        );
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("not in the node list"));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = DeployConfig::load(Path::new("/nonexistent/provost.toml")).unwrap_err();
        assert!(err.to_string().contains("Configuration error"));
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("provost.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = DeployConfig::load(&path).unwrap();
        assert_eq!(config.management_node, "node01");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = toml::from_str::<DeployConfig>(
            r#"
cluster-name = "c"
management-node = "n1"
surprise = true
[[nodes]]
host = "n1"
"#,
        );
        assert!(err.is_err());
    }
}
