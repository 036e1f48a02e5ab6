//! The reconciliation loop.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::snapshot::{Snapshot, SnapshotBuilder};
use super::synchronizer::{RuleSynchronizer, SyncReport};
use crate::config::Config;
use crate::domain::{AddressFamily, ExemptionClassifier, Transport, FILTER_TABLE, INPUT_CHAIN};
use crate::error::{Error, Result};
use crate::ports::{FirewallControlPort, FirewallHandle, SocketTablePort};

/// Summary of one reconciliation cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Candidates found in the snapshot.
    pub candidates: usize,
    /// Socket tables that could not be read.
    pub failed_queries: Vec<(Transport, AddressFamily)>,
    /// What the synchronizer did with the candidates.
    pub sync: SyncReport,
}

impl CycleReport {
    fn new(snapshot: &Snapshot, sync: SyncReport) -> Self {
        Self {
            candidates: snapshot.listeners.len(),
            failed_queries: snapshot.failed.clone(),
            sync,
        }
    }

    /// True if any part of the cycle failed.
    pub fn is_partial(&self) -> bool {
        !self.failed_queries.is_empty() || self.sync.is_partial()
    }
}

/// Shared slot holding the latest cycle report.
pub type ReportSlot = Arc<RwLock<Option<CycleReport>>>;

/// Drives snapshot + synchronize on a fixed interval.
pub struct Reconciler<S: SocketTablePort, F: FirewallControlPort> {
    builder: SnapshotBuilder<S>,
    synchronizer: RuleSynchronizer<F>,
    interval: Duration,
    last_report: ReportSlot,
}

impl<S: SocketTablePort, F: FirewallControlPort> Reconciler<S, F> {
    pub fn new(
        builder: SnapshotBuilder<S>,
        synchronizer: RuleSynchronizer<F>,
        interval: Duration,
    ) -> Self {
        Self {
            builder,
            synchronizer,
            interval,
            last_report: Arc::new(RwLock::new(None)),
        }
    }

    /// Wire the classifier, builder and synchronizer from one configuration.
    pub fn from_config(config: &Config, table: S, firewall: F) -> Self {
        let classifier = Arc::new(ExemptionClassifier::from_config(config));
        Self::new(
            SnapshotBuilder::new(table, Arc::clone(&classifier)),
            RuleSynchronizer::new(firewall, classifier, config.drop_or_reject),
            config.interval(),
        )
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Handle to the latest cycle report, readable from other tasks.
    pub fn report_slot(&self) -> ReportSlot {
        Arc::clone(&self.last_report)
    }

    /// Check that the IPv4 filter table has its base input chain.
    pub async fn check_ready(&self) -> Result<()> {
        let handle = self
            .synchronizer
            .firewall()
            .open(AddressFamily::V4)
            .await
            .map_err(|e| Error::NotReady(format!("cannot open ipv4 firewall: {}", e)))?;

        let chains = handle
            .list_chains(FILTER_TABLE)
            .await
            .map_err(|e| Error::NotReady(format!("cannot list {} chains: {}", FILTER_TABLE, e)))?;

        if chains.iter().any(|c| c == INPUT_CHAIN) {
            Ok(())
        } else {
            Err(Error::NotReady(format!(
                "chain {} not found in table {}",
                INPUT_CHAIN, FILTER_TABLE
            )))
        }
    }

    /// Run a single cycle and record its report.
    pub async fn run_cycle(&self) -> CycleReport {
        let snapshot = self.builder.build().await;
        let sync = self.synchronizer.synchronize(&snapshot.listeners).await;
        self.finish_cycle(&snapshot, sync)
    }

    fn finish_cycle(&self, snapshot: &Snapshot, sync: SyncReport) -> CycleReport {
        let report = CycleReport::new(snapshot, sync);
        if report.is_partial() {
            warn!("Cycle completed with failures: {:?}", report);
        } else {
            debug!(
                "Cycle complete: {} candidates, {} rules ensured, {} protected",
                report.candidates, report.sync.appended, report.sync.protected
            );
        }
        *self.last_report.write() = Some(report.clone());
        report
    }

    /// Loop until `shutdown` flips to `true` or its sender is dropped.
    ///
    /// The first cycle runs immediately. Shutdown is observed during the
    /// sleep and between the snapshot and synchronize steps.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                break;
            }

            info!("checking");
            let snapshot = self.builder.build().await;
            if *shutdown.borrow() {
                debug!("Shutdown requested, abandoning cycle before synchronization");
                break;
            }
            let sync = self.synchronizer.synchronize(&snapshot.listeners).await;
            self.finish_cycle(&snapshot, sync);

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        debug!("Reconciliation loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_helpers::{record, MockSocketTable, RecordingFirewall};
    use crate::domain::{BlockRule, SocketState, Verdict};

    fn reconciler(
        table: MockSocketTable,
        firewall: RecordingFirewall,
        classifier: ExemptionClassifier,
        verdict: Verdict,
    ) -> Reconciler<MockSocketTable, RecordingFirewall> {
        let classifier = Arc::new(classifier);
        Reconciler::new(
            SnapshotBuilder::new(table, Arc::clone(&classifier)),
            RuleSynchronizer::new(firewall, classifier, verdict),
            Duration::from_secs(30),
        )
    }

    #[tokio::test]
    async fn test_scenario_exempt_protected_and_blocked() {
        let table = MockSocketTable::new()
            .with(record("127.0.0.1", 8080, Transport::Tcp, SocketState::Listen))
            .with(record("0.0.0.0", 22, Transport::Tcp, SocketState::Listen))
            .with(record("0.0.0.0", 53, Transport::Udp, SocketState::Close));
        let firewall = RecordingFirewall::new();
        let r = reconciler(
            table,
            firewall.clone(),
            ExemptionClassifier::new(["127.0.0.1"], ["22"]),
            Verdict::Drop,
        );

        let report = r.run_cycle().await;

        assert_eq!(report.candidates, 2);
        assert_eq!(report.sync.protected, 1);
        assert_eq!(report.sync.appended, 1);
        let rules = firewall.rules();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].rule, BlockRule::new(Transport::Udp, 53, Verdict::Drop));
        assert_eq!(r.report_slot().read().clone(), Some(report));
    }

    #[tokio::test]
    async fn test_from_config_reject_scenario() {
        let config = Config::parse(
            "every = 30\ndropOrReject = \"reject\"\ncloseips = [\"127.0.0.1\"]\nprotectedports = [\"22\"]\n",
            std::path::Path::new("scenario.toml"),
        )
        .unwrap();
        let table = MockSocketTable::new()
            .with(record("10.0.0.7", 9000, Transport::Tcp, SocketState::Listen));
        let firewall = RecordingFirewall::new();
        let r = Reconciler::from_config(&config, table, firewall.clone());

        assert_eq!(r.interval(), Duration::from_secs(30));
        r.run_cycle().await;

        let rules = firewall.rules();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].rule, BlockRule::new(Transport::Tcp, 9000, Verdict::Reject));
    }

    #[tokio::test]
    async fn test_v6_query_failure_still_blocks_v4() {
        let table = MockSocketTable::new()
            .with(record("0.0.0.0", 9000, Transport::Tcp, SocketState::Listen))
            .with(record("0.0.0.0", 5000, Transport::Udp, SocketState::Close))
            .failing(Transport::Tcp, AddressFamily::V6)
            .failing(Transport::Udp, AddressFamily::V6);
        let firewall = RecordingFirewall::new();
        let r = reconciler(
            table,
            firewall.clone(),
            ExemptionClassifier::default(),
            Verdict::Reject,
        );

        let report = r.run_cycle().await;

        assert!(report.is_partial());
        assert_eq!(report.failed_queries.len(), 2);
        assert_eq!(firewall.rules().len(), 2);
        assert!(firewall.rules().iter().all(|r| r.family == AddressFamily::V4));
    }

    #[tokio::test]
    async fn test_check_ready() {
        let r = reconciler(
            MockSocketTable::new(),
            RecordingFirewall::new(),
            ExemptionClassifier::default(),
            Verdict::Drop,
        );
        tokio_test::assert_ok!(r.check_ready().await);
    }

    #[tokio::test]
    async fn test_check_ready_missing_chain() {
        let r = reconciler(
            MockSocketTable::new(),
            RecordingFirewall::new().with_chains(&["FORWARD", "OUTPUT"]),
            ExemptionClassifier::default(),
            Verdict::Drop,
        );
        assert!(matches!(r.check_ready().await, Err(Error::NotReady(_))));
    }

    #[tokio::test]
    async fn test_check_ready_without_ipv4_firewall() {
        let r = reconciler(
            MockSocketTable::new(),
            RecordingFirewall::new().unavailable(AddressFamily::V4),
            ExemptionClassifier::default(),
            Verdict::Drop,
        );
        assert!(matches!(r.check_ready().await, Err(Error::NotReady(_))));
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown_during_sleep() {
        let table = MockSocketTable::new()
            .with(record("0.0.0.0", 80, Transport::Tcp, SocketState::Listen));
        let firewall = RecordingFirewall::new();
        let r = Arc::new(reconciler(
            table,
            firewall.clone(),
            ExemptionClassifier::default(),
            Verdict::Drop,
        ));
        let (tx, rx) = watch::channel(false);

        let runner = Arc::clone(&r);
        let task = tokio::spawn(async move { runner.run(rx).await });

        // Wait for the first cycle, then interrupt the 30s sleep.
        tokio::time::timeout(Duration::from_secs(5), async {
            while r.report_slot().read().is_none() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(firewall.rules().len(), 1);
    }

    #[tokio::test]
    async fn test_run_does_nothing_when_already_stopped() {
        let firewall = RecordingFirewall::new();
        let r = reconciler(
            MockSocketTable::new().with(record("0.0.0.0", 80, Transport::Tcp, SocketState::Listen)),
            firewall.clone(),
            ExemptionClassifier::default(),
            Verdict::Drop,
        );
        let (_tx, rx) = watch::channel(true);

        r.run(rx).await;
        assert_eq!(firewall.append_calls(), 0);
        assert!(r.report_slot().read().is_none());
    }
}
