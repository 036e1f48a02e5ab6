//! Block rule and verdict models.

use serde::{Deserialize, Serialize};

use super::Transport;

/// Table every block rule is appended to.
pub const FILTER_TABLE: &str = "filter";

/// Chain every block rule is appended to.
pub const INPUT_CHAIN: &str = "INPUT";

// ============================================================================
// Verdict
// ============================================================================

/// Terminal action applied by an installed rule.
///
/// Configured as `drop` or `reject`; anything else fails to deserialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Drop,
    Reject,
}

impl Verdict {
    /// Jump target understood by the firewall.
    pub fn target(&self) -> &'static str {
        match self {
            Verdict::Drop => "DROP",
            Verdict::Reject => "REJECT",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.target())
    }
}

// ============================================================================
// BlockRule
// ============================================================================

/// A rule blocking inbound traffic to one destination port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockRule {
    pub transport: Transport,
    pub destination_port: u16,
    pub verdict: Verdict,
}

impl BlockRule {
    pub fn new(transport: Transport, destination_port: u16, verdict: Verdict) -> Self {
        Self {
            transport,
            destination_port,
            verdict,
        }
    }

    /// Render the match and target arguments of the rule.
    pub fn to_spec(&self) -> Vec<String> {
        vec![
            "-p".to_string(),
            self.transport.protocol().to_string(),
            "--destination-port".to_string(),
            self.destination_port.to_string(),
            "-j".to_string(),
            self.verdict.target().to_string(),
        ]
    }
}

impl std::fmt::Display for BlockRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_spec().join(" "))
    }
}
