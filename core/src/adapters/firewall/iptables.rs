//! `iptables` / `ip6tables` implementation of the firewall control port.

use std::process::{Output, Stdio};
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tokio::process::Command;
use tracing::{debug, trace};

use crate::domain::{AddressFamily, BlockRule};
use crate::error::{Error, Result};
use crate::ports::{FirewallControlPort, FirewallHandle};

/// Matches policy (`-P`) and user chain (`-N`) lines of `iptables -S`.
static CHAIN_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-[PN]\s+(\S+)").expect("chain regex is valid"));

/// Default upper bound for a single command.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Firewall control backed by the legacy/nft `iptables` frontends.
#[derive(Debug, Clone)]
pub struct Iptables {
    ipv4_binary: String,
    ipv6_binary: String,
    timeout: Duration,
}

impl Iptables {
    pub fn new(timeout: Duration) -> Self {
        Self::with_binaries("iptables", "ip6tables", timeout)
    }

    /// Use custom executables (for testing or non-standard installs).
    pub fn with_binaries(
        ipv4_binary: impl Into<String>,
        ipv6_binary: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            ipv4_binary: ipv4_binary.into(),
            ipv6_binary: ipv6_binary.into(),
            timeout,
        }
    }

    fn binary(&self, family: AddressFamily) -> &str {
        match family {
            AddressFamily::V4 => &self.ipv4_binary,
            AddressFamily::V6 => &self.ipv6_binary,
        }
    }
}

impl Default for Iptables {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND_TIMEOUT)
    }
}

impl FirewallControlPort for Iptables {
    type Handle = IptablesHandle;

    async fn open(&self, family: AddressFamily) -> Result<IptablesHandle> {
        let handle = IptablesHandle {
            binary: self.binary(family).to_string(),
            timeout: self.timeout,
        };

        let output = handle.run(&["--version"]).await?;
        if !output.status.success() {
            return Err(IptablesHandle::failure(&output));
        }
        debug!(
            "Opened {} firewall handle: {}",
            family,
            String::from_utf8_lossy(&output.stdout).trim()
        );

        Ok(handle)
    }
}

/// A handle bound to one `iptables` executable.
#[derive(Debug, Clone)]
pub struct IptablesHandle {
    binary: String,
    timeout: Duration,
}

impl IptablesHandle {
    async fn run(&self, args: &[&str]) -> Result<Output> {
        let command_line = format!("{} {}", self.binary, args.join(" "));
        trace!("Running {}", command_line);

        let child = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(self.timeout, child).await {
            Ok(output) => output
                .map_err(|e| Error::CommandFailed(format!("Failed to run {}: {}", self.binary, e))),
            Err(_) => Err(Error::Timeout {
                command: command_line,
                secs: self.timeout.as_secs(),
            }),
        }
    }

    fn failure(output: &Output) -> Error {
        Error::Firewall {
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            exit_code: output.status.code(),
        }
    }

    /// Extract chain names from `iptables -S` output.
    pub fn parse_chains(output: &str) -> Vec<String> {
        output
            .lines()
            .filter_map(|line| CHAIN_LINE.captures(line.trim()))
            .map(|caps| caps[1].to_string())
            .collect()
    }

    /// `iptables -C` exits 0 when the rule exists and 1 when it does not.
    fn rule_exists(output: &Output) -> Result<bool> {
        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(Self::failure(output)),
        }
    }
}

impl FirewallHandle for IptablesHandle {
    async fn list_chains(&self, table: &str) -> Result<Vec<String>> {
        let output = self.run(&["-w", "-t", table, "-S"]).await?;
        if !output.status.success() {
            return Err(Self::failure(&output));
        }
        Ok(Self::parse_chains(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn append_unique(&self, table: &str, chain: &str, rule: &BlockRule) -> Result<()> {
        let spec = rule.to_spec();

        let mut check: Vec<&str> = vec!["-w", "-t", table, "-C", chain];
        check.extend(spec.iter().map(String::as_str));
        if Self::rule_exists(&self.run(&check).await?)? {
            trace!("Rule already present in {}/{}: {}", table, chain, rule);
            return Ok(());
        }

        let mut append: Vec<&str> = vec!["-w", "-t", table, "-A", chain];
        append.extend(spec.iter().map(String::as_str));
        let output = self.run(&append).await?;
        if !output.status.success() {
            return Err(Self::failure(&output));
        }
        Ok(())
    }
}
