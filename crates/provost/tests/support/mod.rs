//! Shared helpers for provost integration tests.
//!
//! Tests drive the real binary against stub `scalectl` / transport scripts
//! staged in a temporary directory. Each stub appends its argv to a log
//! file so tests can assert exactly which external invocations happened.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub fn write_executable(path: &Path, body: &str) {
    use std::os::unix::fs::PermissionsExt;
    std::fs::write(path, body).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

pub struct TestEnv {
    pub dir: TempDir,
    pub bin: PathBuf,
    pub config_path: PathBuf,
    pub toolkit_log: PathBuf,
    pub remote_log: PathBuf,
    pub ssh: PathBuf,
    pub scp: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("bin");
        std::fs::create_dir(&bin).unwrap();

        let env = Self {
            config_path: dir.path().join("provost.toml"),
            toolkit_log: dir.path().join("toolkit.log"),
            remote_log: dir.path().join("remote.log"),
            ssh: bin.join("fake-ssh"),
            scp: bin.join("fake-scp"),
            bin,
            dir,
        };

        env.write_scalectl(&env.default_scalectl_body());
        env.write_installer(&format!(
            "#!/bin/sh\necho \"scalefs-install $*\" >> '{}'\nexit 0\n",
            env.toolkit_log.display()
        ));
        env.write_ssh_stub(&format!(
            "#!/bin/sh\nwhile [ \"$1\" = \"-o\" ]; do shift 2; done\necho \"ssh $*\" >> '{}'\nexit 0\n",
            env.remote_log.display()
        ));
        env.write_scp_stub(&format!(
            "#!/bin/sh\nwhile [ \"$1\" = \"-o\" ]; do shift 2; done\necho \"scp $*\" >> '{}'\nexit 0\n",
            env.remote_log.display()
        ));
        env.write_config();
        env
    }

    /// A scalectl stand-in that logs every invocation and succeeds.
    pub fn default_scalectl_body(&self) -> String {
        format!(
            "#!/bin/sh\necho \"scalectl $*\" >> '{}'\necho report\nexit 0\n",
            self.toolkit_log.display()
        )
    }

    pub fn write_scalectl(&self, body: &str) {
        write_executable(&self.bin.join("scalectl"), body);
    }

    pub fn write_installer(&self, body: &str) {
        write_executable(&self.bin.join("scalefs-install"), body);
    }

    pub fn write_ssh_stub(&self, body: &str) {
        write_executable(&self.ssh, body);
    }

    pub fn write_scp_stub(&self, body: &str) {
        write_executable(&self.scp, body);
    }

    fn write_config(&self) {
        let config = format!(
            r#"
cluster-name = "testclu"
management-node = "n1"

[toolkit]
bin-dir = "{bin}"
installer = "{bin}/scalefs-install"

[[nodes]]
host = "n1"
quorum = true
manager = true
device = "/dev/sdb"
failure-group = 1

[[nodes]]
host = "n2"
gui = true
device = "/dev/sdc"
failure-group = 2
"#,
            bin = self.bin.display()
        );
        std::fs::write(&self.config_path, config).unwrap();
    }

    /// A deploy invocation wired to the stub transports.
    pub fn deploy_cmd(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::Command::cargo_bin("provost").unwrap();
        cmd.arg("deploy")
            .arg("--config")
            .arg(&self.config_path)
            .arg("--skip-preflight")
            .arg("--ssh-command")
            .arg(&self.ssh)
            .arg("--scp-command")
            .arg(&self.scp);
        cmd
    }

    /// A health invocation wired to the stub ssh transport.
    pub fn health_cmd(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::Command::cargo_bin("provost").unwrap();
        cmd.arg("health")
            .arg("--config")
            .arg(&self.config_path)
            .arg("--ssh-command")
            .arg(&self.ssh);
        cmd
    }

    /// A health invocation whose remote strategies always fail.
    pub fn health_cmd_without_transport(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::Command::cargo_bin("provost").unwrap();
        cmd.arg("health")
            .arg("--config")
            .arg(&self.config_path)
            .arg("--ssh-command")
            .arg(self.dir.path().join("no-such-ssh"));
        cmd
    }

    pub fn toolkit_log(&self) -> String {
        std::fs::read_to_string(&self.toolkit_log).unwrap_or_default()
    }

    pub fn remote_log(&self) -> String {
        std::fs::read_to_string(&self.remote_log).unwrap_or_default()
    }
}
