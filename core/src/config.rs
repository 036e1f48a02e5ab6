//! Configuration loading.
//!
//! The configuration is a small TOML file read once at startup:
//!
//! ```toml
//! every = 30
//! dropOrReject = "drop"
//! closeips = ["127.0.0.1", "::1"]
//! protectedports = ["22"]
//! ```
//!
//! It is never written back and never reloaded.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};

use crate::domain::Verdict;
use crate::error::{Error, Result};

/// Default config file, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Directory name under the user config dir.
pub const CONFIG_DIR_NAME: &str = "ltfw";

/// System-wide configuration path.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/ltfw/config.toml";

/// Immutable daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Polling interval in seconds.
    #[serde(alias = "Every")]
    pub every: u64,

    /// Verdict for installed block rules.
    #[serde(rename = "dropOrReject", alias = "droporreject", alias = "DropOrReject")]
    pub drop_or_reject: Verdict,

    /// Addresses whose listeners are never monitored.
    #[serde(
        default,
        rename = "closeips",
        alias = "closeIPs",
        alias = "closeIps",
        alias = "Closeips",
        alias = "CloseIPs"
    )]
    pub close_ips: Vec<String>,

    /// Ports that are collected but never blocked.
    #[serde(
        default,
        rename = "protectedports",
        alias = "protectedPorts",
        alias = "Protectedports",
        alias = "ProtectedPorts"
    )]
    pub protected_ports: Vec<String>,

    /// Upper bound for a single firewall command, in seconds.
    #[serde(
        default = "default_command_timeout",
        rename = "commandtimeout",
        alias = "commandTimeout",
        alias = "CommandTimeout"
    )]
    pub command_timeout: u64,
}

fn default_command_timeout() -> u64 {
    10
}

impl Config {
    /// Parse and validate TOML text. `path` is only used in error messages.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the daemon misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.every == 0 {
            return Err(Error::Config(
                "every must be a positive number of seconds".to_string(),
            ));
        }
        if self.command_timeout == 0 {
            return Err(Error::Config(
                "commandtimeout must be a positive number of seconds".to_string(),
            ));
        }

        for port in &self.protected_ports {
            if port.parse::<u16>().map(|p| p.to_string() != *port).unwrap_or(true) {
                warn!(
                    "Protected port {:?} is not a canonical port number and will never match",
                    port
                );
            }
        }
        for ip in &self.close_ips {
            let canonical = ip
                .parse::<std::net::IpAddr>()
                .map(|addr| addr.to_canonical().to_string() == *ip)
                .unwrap_or(false);
            if !canonical {
                warn!("Close IP {:?} is not a canonical address and will never match", ip);
            }
        }

        Ok(())
    }

    /// Interval between reconciliation cycles.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.every)
    }

    /// Timeout for a single firewall command.
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout)
    }
}

/// Locates and reads the configuration file.
pub struct ConfigLoader {
    /// Explicit path from the command line, if any.
    explicit: Option<PathBuf>,
    /// Paths tried in order when no explicit path is given.
    search_paths: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Create a loader using the default search order:
    /// `./config.toml`, `<user config dir>/ltfw/config.toml`, `/etc/ltfw/config.toml`.
    pub fn new() -> Self {
        let mut search_paths = vec![PathBuf::from(DEFAULT_CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            search_paths.push(dir.join(CONFIG_DIR_NAME).join(DEFAULT_CONFIG_FILE));
        }
        search_paths.push(PathBuf::from(SYSTEM_CONFIG_PATH));

        Self {
            explicit: None,
            search_paths,
        }
    }

    /// Create a loader bound to one path. A missing file is an error.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            explicit: Some(path.into()),
            search_paths: Vec::new(),
        }
    }

    /// Create a loader with a custom search order (for testing).
    pub fn with_search_paths(search_paths: Vec<PathBuf>) -> Self {
        Self {
            explicit: None,
            search_paths,
        }
    }

    /// Resolve which file would be loaded.
    pub fn resolve(&self) -> Result<PathBuf> {
        if let Some(path) = &self.explicit {
            return Ok(path.clone());
        }

        for path in &self.search_paths {
            if path.exists() {
                return Ok(path.clone());
            }
            debug!("No config found at {:?}", path);
        }

        Err(Error::Config(format!(
            "Could not find config file (searched: {})",
            self.search_paths
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        )))
    }

    /// Load and validate the configuration.
    pub async fn load(&self) -> Result<Config> {
        let path = self.resolve()?;
        let content = fs::read_to_string(&path)
            .await
            .map_err(|source| Error::ConfigRead {
                path: path.clone(),
                source,
            })?;

        let config = Config::parse(&content, &path)?;
        debug!("Loaded config from {:?}", path);
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
