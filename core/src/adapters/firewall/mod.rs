//! Firewall control adapters.

mod iptables;

pub use iptables::{Iptables, IptablesHandle, DEFAULT_COMMAND_TIMEOUT};
