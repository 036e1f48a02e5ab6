//! Error types for the ltfw-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for ltfw operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while sampling listeners or installing rules.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to execute a system command.
    #[error("Command execution failed: {0}")]
    CommandFailed(String),

    /// Failed to parse command output or a kernel table.
    #[error("Failed to parse output: {0}")]
    ParseError(String),

    /// The firewall tool ran but reported a failure.
    #[error("Firewall error: {message}")]
    Firewall {
        message: String,
        exit_code: Option<i32>,
    },

    /// A firewall command did not finish in time.
    #[error("Command `{command}` timed out after {secs}s")]
    Timeout { command: String, secs: u64 },

    /// The firewall is missing its base chain.
    #[error("Firewall not ready: {0}")]
    NotReady(String),

    /// Failed to read a configuration file.
    #[error("Failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse a TOML configuration file.
    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The background reconciliation task ended abnormally.
    #[error("Background task failed: {0}")]
    Task(String),

    /// Platform not supported.
    #[error("Platform not supported: {0}")]
    UnsupportedPlatform(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message() {
        let err = Error::Timeout {
            command: "iptables -S".to_string(),
            secs: 10,
        };
        assert_eq!(err.to_string(), "Command `iptables -S` timed out after 10s");
    }

    #[test]
    fn test_config_read_mentions_path() {
        let err = Error::ConfigRead {
            path: PathBuf::from("/etc/ltfw/config.toml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.to_string().contains("/etc/ltfw/config.toml"));
    }
}
