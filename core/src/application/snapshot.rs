//! Listener snapshot building.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::{AddressFamily, ClassifiedListener, ExemptionClassifier, Transport};
use crate::ports::SocketTablePort;

/// Every table queried per cycle, in snapshot order.
pub const COMBINATIONS: [(Transport, AddressFamily); 4] = [
    (Transport::Tcp, AddressFamily::V4),
    (Transport::Udp, AddressFamily::V4),
    (Transport::Tcp, AddressFamily::V6),
    (Transport::Udp, AddressFamily::V6),
];

/// Candidate listeners seen in one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Candidates in `COMBINATIONS` order.
    pub listeners: Vec<ClassifiedListener>,
    /// Tables that could not be read this cycle.
    pub failed: Vec<(Transport, AddressFamily)>,
}

impl Snapshot {
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Reads the four socket tables and merges their candidates.
pub struct SnapshotBuilder<S: SocketTablePort> {
    table: S,
    classifier: Arc<ExemptionClassifier>,
}

impl<S: SocketTablePort> SnapshotBuilder<S> {
    pub fn new(table: S, classifier: Arc<ExemptionClassifier>) -> Self {
        Self { table, classifier }
    }

    /// Query every table with its transport's candidate filter.
    ///
    /// A failing table is logged and contributes nothing.
    pub async fn build(&self) -> Snapshot {
        let mut snapshot = Snapshot::default();

        for (transport, family) in COMBINATIONS {
            let filter = self.classifier.candidate_filter(transport);
            match self.table.query(transport, family, &filter).await {
                Ok(records) => {
                    debug!("{} {} candidates: {}", transport, family, records.len());
                    snapshot.listeners.extend(
                        records
                            .into_iter()
                            .map(|record| ClassifiedListener::new(transport, family, record)),
                    );
                }
                Err(e) => {
                    warn!("Unable to retrieve {} {} listeners: {}", transport, family, e);
                    snapshot.failed.push((transport, family));
                }
            }
        }

        snapshot
    }
}
