//! Domain layer - Pure business logic and data models.
//!
//! This module contains domain entities that represent core business concepts.
//! These types have no I/O dependencies and can be tested in isolation.

mod classifier;
mod listener;
mod rule;

// Re-export all domain types
pub use classifier::ExemptionClassifier;
pub use listener::{AddressFamily, ClassifiedListener, ListenerRecord, SocketState, Transport};
pub use rule::{BlockRule, Verdict, FILTER_TABLE, INPUT_CHAIN};
