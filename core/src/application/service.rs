//! Service lifecycle hosting the reconciliation loop.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use super::reconciler::{CycleReport, Reconciler, ReportSlot};
use crate::error::{Error, Result};
use crate::ports::{FirewallControlPort, SocketTablePort};

/// Display name used in lifecycle messages.
pub const SERVICE_NAME: &str = "Light Touch Firewall";

/// A configured but not yet started service.
pub struct FirewallService<S: SocketTablePort, F: FirewallControlPort> {
    name: String,
    reconciler: Reconciler<S, F>,
}

impl<S, F> FirewallService<S, F>
where
    S: SocketTablePort + 'static,
    F: FirewallControlPort + 'static,
{
    pub fn new(reconciler: Reconciler<S, F>) -> Self {
        Self::with_name(SERVICE_NAME, reconciler)
    }

    pub fn with_name(name: impl Into<String>, reconciler: Reconciler<S, F>) -> Self {
        Self {
            name: name.into(),
            reconciler,
        }
    }

    /// Start hook: verify the firewall is ready, then spawn the loop.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn start(self) -> Result<RunningService> {
        self.reconciler.check_ready().await?;

        info!(
            "{} started, checking every {} seconds...",
            self.name,
            self.reconciler.interval().as_secs()
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let last_report = self.reconciler.report_slot();
        let reconciler = Arc::new(self.reconciler);
        let task = tokio::spawn(async move { reconciler.run(shutdown_rx).await });

        Ok(RunningService {
            name: self.name,
            shutdown: shutdown_tx,
            task: Some(task),
            last_report,
        })
    }
}

/// Handle to a started service. Dropping it without `stop` leaves the loop
/// running until its shutdown sender is dropped, which ends it at the next
/// suspension point.
pub struct RunningService {
    name: String,
    shutdown: watch::Sender<bool>,
    /// `None` once the loop has been joined.
    task: Option<JoinHandle<()>>,
    last_report: ReportSlot,
}

impl RunningService {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Report of the most recent completed cycle, if any.
    pub fn last_report(&self) -> Option<CycleReport> {
        self.last_report.read().clone()
    }

    /// True if the loop has exited.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Resolve when the loop exits without being stopped, which only happens
    /// if it panicked or was aborted. Cancel-safe, so it can race a stop
    /// signal in `select!`.
    pub async fn exited(&mut self) -> Result<()> {
        let Some(task) = self.task.as_mut() else {
            return Ok(());
        };
        let result = task.await;
        self.task = None;
        result.map_err(|e| Error::Task(e.to_string()))
    }

    /// Stop hook: interrupt the loop and wait for it to exit.
    pub async fn stop(self) -> Result<()> {
        // The loop may already be gone; that is fine.
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task {
            task.await.map_err(|e| Error::Task(e.to_string()))?;
        }
        info!("{} stopped", self.name);
        Ok(())
    }
}
