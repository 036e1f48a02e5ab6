//! ltfw Core Library
//!
//! Host-local listener reconciliation for the Light Touch Firewall.
//! Provides functionality to:
//! - Read the TCP/UDP, IPv4/IPv6 socket tables
//! - Classify listeners against configured exemptions
//! - Append block rules for every unexpected listener
//! - Run the whole thing on a fixed interval as a stoppable service
//!
//! # Architecture
//! This library follows hexagonal architecture (ports & adapters):
//! - `domain`: Pure business logic and data models
//! - `ports`: Trait definitions (interfaces)
//! - `adapters`: External system implementations
//! - `application`: Use case services
//!
//! # Platform Support
//! - Linux: Reads `/proc/net/*` and drives `iptables` / `ip6tables`
//! - Other platforms: socket table queries report `UnsupportedPlatform`

// Hexagonal architecture layers
pub mod domain;
pub mod ports;
pub mod adapters;
pub mod application;

pub mod config;
pub mod error;

// Re-export domain types (primary API)
pub use domain::{
    AddressFamily, BlockRule, ClassifiedListener, ExemptionClassifier, ListenerRecord,
    SocketState, Transport, Verdict,
};

// Re-export other commonly used types
pub use adapters::{Iptables, SocketTable};
pub use application::{
    CycleReport, FirewallService, Reconciler, RuleSynchronizer, RunningService, SnapshotBuilder,
};
pub use config::{Config, ConfigLoader};
pub use error::{Error, Result};
