//! Adapters layer - External system implementations.
//!
//! This module contains implementations of the port traits defined in `ports`.
//! Each adapter handles communication with external systems.

pub mod firewall;
pub mod socket_table;

// Re-export main types for convenience
pub use firewall::Iptables;
pub use socket_table::SocketTable;
