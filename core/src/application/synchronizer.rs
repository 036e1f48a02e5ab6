//! Block rule synchronization.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::{
    AddressFamily, BlockRule, ClassifiedListener, ExemptionClassifier, Verdict, FILTER_TABLE,
    INPUT_CHAIN,
};
use crate::ports::{FirewallControlPort, FirewallHandle};

/// Outcome of one synchronization pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Append-unique calls that succeeded (new or already present).
    pub appended: usize,
    /// Candidates skipped because their port is protected.
    pub protected: usize,
    /// Append-unique calls that failed.
    pub failed: usize,
    /// Families whose handle could not be opened.
    pub skipped_families: Vec<AddressFamily>,
}

impl SyncReport {
    pub fn is_partial(&self) -> bool {
        self.failed > 0 || !self.skipped_families.is_empty()
    }
}

/// Split a snapshot into its IPv4 and IPv6 listeners, preserving order.
pub fn partition(
    snapshot: &[ClassifiedListener],
) -> (Vec<&ClassifiedListener>, Vec<&ClassifiedListener>) {
    snapshot
        .iter()
        .partition(|listener| listener.family == AddressFamily::V4)
}

/// Appends a block rule for every unprotected candidate.
pub struct RuleSynchronizer<F: FirewallControlPort> {
    firewall: F,
    classifier: Arc<ExemptionClassifier>,
    verdict: Verdict,
}

impl<F: FirewallControlPort> RuleSynchronizer<F> {
    pub fn new(firewall: F, classifier: Arc<ExemptionClassifier>, verdict: Verdict) -> Self {
        Self {
            firewall,
            classifier,
            verdict,
        }
    }

    pub fn firewall(&self) -> &F {
        &self.firewall
    }

    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    /// Converge the firewall toward blocking every candidate in `snapshot`.
    ///
    /// Failures only skip the affected family or listener.
    pub async fn synchronize(&self, snapshot: &[ClassifiedListener]) -> SyncReport {
        let mut report = SyncReport::default();
        let (v4, v6) = partition(snapshot);

        for (family, listeners) in [(AddressFamily::V4, v4), (AddressFamily::V6, v6)] {
            if listeners.is_empty() {
                continue;
            }

            let handle = match self.firewall.open(family).await {
                Ok(handle) => handle,
                Err(e) => {
                    warn!("Skipping {} rules, firewall unavailable: {}", family, e);
                    report.skipped_families.push(family);
                    continue;
                }
            };

            self.synchronize_family(&handle, &listeners, &mut report).await;
        }

        report
    }

    async fn synchronize_family(
        &self,
        handle: &F::Handle,
        listeners: &[&ClassifiedListener],
        report: &mut SyncReport,
    ) {
        for listener in listeners {
            if self.classifier.is_protected(&listener.record) {
                report.protected += 1;
                continue;
            }

            debug!(
                "blocking: {} {} {}",
                listener.transport, listener.record.local_addr, listener.record.local_port
            );

            let rule = BlockRule::new(listener.transport, listener.record.local_port, self.verdict);
            match handle.append_unique(FILTER_TABLE, INPUT_CHAIN, &rule).await {
                Ok(()) => report.appended += 1,
                Err(e) => {
                    warn!("Failed to append rule for {}: {}", listener.record, e);
                    report.failed += 1;
                }
            }
        }
    }
}
