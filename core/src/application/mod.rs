//! Application layer - Use case services.
//!
//! This module contains application services that orchestrate
//! domain logic and adapter interactions.
//!
//! Services are designed to be thin orchestrators that:
//! - Accept domain types as inputs
//! - Use ports (traits) for external dependencies
//! - Return domain types as outputs

mod reconciler;
mod service;
mod snapshot;
mod synchronizer;

#[cfg(test)]
mod test_helpers;

pub use reconciler::{CycleReport, Reconciler, ReportSlot};
pub use service::{FirewallService, RunningService, SERVICE_NAME};
pub use snapshot::{Snapshot, SnapshotBuilder, COMBINATIONS};
pub use synchronizer::{partition, RuleSynchronizer, SyncReport};
