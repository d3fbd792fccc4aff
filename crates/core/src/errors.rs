//! Error types and handling
//!
//! This module provides domain-specific error types for the orchestrator.
//! The error taxonomy is structured with specific error enums for each domain
//! (Configuration, Preflight, Remote, Toolkit) that are then wrapped in the
//! main ProvostError enum for unified error handling.

use thiserror::Error;

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file parsing error
    #[error("Failed to parse configuration file: {message}")]
    Parsing { message: String },

    /// Configuration validation error
    #[error("Configuration validation error: {message}")]
    Validation { message: String },

    /// Configuration file I/O error
    #[error("Failed to read configuration file")]
    Io(#[from] std::io::Error),

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: String },
}

/// Precondition failures detected before any phase runs
#[derive(Error, Debug)]
pub enum PreflightError {
    /// The orchestrator must run with root privileges
    #[error("This command must be run as root (effective uid {uid})")]
    NotRoot { uid: u32 },

    /// A required local tool is missing from PATH
    #[error("Required local tool not found on PATH: {tool}")]
    MissingTool { tool: String },

    /// The toolkit installation directory is missing
    #[error("Toolkit installation not found at {path}")]
    ToolkitMissing { path: String },

    /// The installer binary is missing
    #[error("Installer binary not found at {path}")]
    InstallerMissing { path: String },
}

/// Remote transport errors (ssh, scp, broadcast fan-out)
#[derive(Error, Debug)]
pub enum RemoteError {
    /// The transport program itself could not be spawned
    #[error("Remote transport '{program}' could not be started: {message}")]
    TransportUnavailable { program: String, message: String },

    /// A file copy to a remote node failed
    #[error("Copy to {host} failed: {message}")]
    CopyFailed { host: String, message: String },

    /// Every strategy in a resolution chain failed
    #[error("Command '{command}' failed at every resolution strategy ({tried}); last failure: {last}")]
    ResolutionFailed {
        command: String,
        tried: String,
        last: String,
    },
}

/// ScaleFS toolkit invocation errors
#[derive(Error, Debug)]
pub enum ToolkitError {
    /// The toolkit binary is not installed or not accessible
    #[error("Toolkit binary not found at {path}")]
    NotInstalled { path: String },

    /// A required toolkit operation exited non-zero
    #[error("Toolkit operation '{operation}' failed with exit code {code}: {stderr}")]
    OperationFailed {
        operation: String,
        code: i32,
        stderr: String,
    },

    /// The installer binary rejected verification or installation
    #[error("Installer step '{step}' failed with exit code {code}: {stderr}")]
    InstallerFailed {
        step: String,
        code: i32,
        stderr: String,
    },
}

/// Main error enum wrapping all domain-specific errors
#[derive(Error, Debug)]
pub enum ProvostError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Precondition failures
    #[error("Preflight error: {0}")]
    Preflight(#[from] PreflightError),

    /// Remote transport errors
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Toolkit invocation errors
    #[error("Toolkit error: {0}")]
    Toolkit(#[from] ToolkitError),

    /// Artifact generation errors
    #[error("Artifact error: {0}")]
    Artifact(String),
}

/// Convenience type alias for Results with ProvostError
pub type Result<T> = std::result::Result<T, ProvostError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_config_error_display() {
        let error = ConfigError::Parsing {
            message: "Invalid TOML".to_string(),
        };
        assert_eq!(
            format!("{}", error),
            "Failed to parse configuration file: Invalid TOML"
        );

        let error = ConfigError::NotFound {
            path: "/path/to/file".to_string(),
        };
        assert_eq!(
            format!("{}", error),
            "Configuration file not found: /path/to/file"
        );
    }

    #[test]
    fn test_preflight_error_display() {
        let error = PreflightError::NotRoot { uid: 1000 };
        assert_eq!(
            format!("{}", error),
            "This command must be run as root (effective uid 1000)"
        );

        let error = PreflightError::MissingTool {
            tool: "ssh".to_string(),
        };
        assert_eq!(
            format!("{}", error),
            "Required local tool not found on PATH: ssh"
        );
    }

    #[test]
    fn test_toolkit_error_display() {
        let error = ToolkitError::OperationFailed {
            operation: "cluster create".to_string(),
            code: 1,
            stderr: "cluster already defined".to_string(),
        };
        assert_eq!(
            format!("{}", error),
            "Toolkit operation 'cluster create' failed with exit code 1: cluster already defined"
        );
    }

    #[test]
    fn test_provost_error_from_domain_errors() {
        let config_error = ConfigError::Parsing {
            message: "Test".to_string(),
        };
        let provost_error: ProvostError = config_error.into();
        assert!(matches!(provost_error, ProvostError::Config(_)));

        let preflight_error = PreflightError::NotRoot { uid: 42 };
        let provost_error: ProvostError = preflight_error.into();
        assert!(matches!(provost_error, ProvostError::Preflight(_)));

        let remote_error = RemoteError::TransportUnavailable {
            program: "ssh".to_string(),
            message: "No such file or directory".to_string(),
        };
        let provost_error: ProvostError = remote_error.into();
        assert!(matches!(provost_error, ProvostError::Remote(_)));

        let toolkit_error = ToolkitError::NotInstalled {
            path: "/opt/scalefs/5.2/bin/scalectl".to_string(),
        };
        let provost_error: ProvostError = toolkit_error.into();
        assert!(matches!(provost_error, ProvostError::Toolkit(_)));
    }

    #[test]
    fn test_anyhow_conversions() {
        let preflight_error = PreflightError::MissingTool {
            tool: "ssh".to_string(),
        };
        let anyhow_error = anyhow::Error::from(preflight_error);
        assert!(anyhow_error
            .to_string()
            .contains("Required local tool not found"));

        let provost_error = ProvostError::Toolkit(ToolkitError::NotInstalled {
            path: "/opt/scalefs/5.2/bin/scalectl".to_string(),
        });
        let anyhow_error = anyhow::Error::from(provost_error);
        assert!(anyhow_error.to_string().contains("Toolkit error"));
    }

    #[test]
    fn test_error_source_chain() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let config_error = ConfigError::Io(io_error);
        let provost_error = ProvostError::Config(config_error);

        assert!(provost_error.source().is_some());
        if let Some(source) = provost_error.source() {
            assert!(source.source().is_some());
        }
    }
}
