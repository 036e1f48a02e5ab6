//! Ports layer - Trait definitions (interfaces).
//!
//! This module defines the interfaces that the application layer uses
//! to interact with external systems. Implementations live in `adapters`.

mod firewall;
mod socket_table;

pub use firewall::{FirewallControlPort, FirewallHandle};
pub use socket_table::{ListenerFilter, SocketTablePort};
