use crate::commands::{MonitorCommand, MonitorStatus};
use crate::cycle::CycleReport;
use anyhow::Result;
use tokio::sync::{mpsc, oneshot, watch};

#[derive(Clone)]
pub struct MonitorHandle {
    tx: mpsc::Sender<MonitorCommand>,
    status_rx: watch::Receiver<MonitorStatus>,
}

impl MonitorHandle {
    /// Creates a new monitor handle from the actor's command sender and
    /// status receiver.
    #[must_use]
    pub const fn new(
        tx: mpsc::Sender<MonitorCommand>,
        status_rx: watch::Receiver<MonitorStatus>,
    ) -> Self {
        Self { tx, status_rx }
    }

    /// Runs a polling cycle out of schedule and waits for its report.
    ///
    /// Queued behind any cycle already in progress.
    ///
    /// # Errors
    /// Returns an error if the monitor has stopped.
    pub async fn poll_once(&self) -> Result<CycleReport> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(MonitorCommand::PollOnce(tx)).await?;
        let report = rx.await?;
        Ok(report)
    }

    /// Status as of the last completed cycle, without waiting on the actor.
    ///
    /// Returns `None` once the actor has stopped.
    #[must_use]
    pub fn latest_status(&self) -> Option<MonitorStatus> {
        if self.status_rx.has_changed().is_err() {
            return None;
        }
        Some(self.status_rx.borrow().clone())
    }

    /// Asks the actor for its current status. Waits behind a running cycle.
    ///
    /// # Errors
    /// Returns an error if the command cannot be sent or the response cannot be received.
    pub async fn status(&self) -> Result<MonitorStatus> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(MonitorCommand::GetStatus(tx)).await?;
        let status = rx.await?;
        Ok(status)
    }

    /// Shuts down the monitor.
    ///
    /// # Errors
    /// Returns an error if the command cannot be sent to the monitor actor.
    pub async fn shutdown(&self) -> Result<()> {
        self.tx.send(MonitorCommand::Shutdown).await?;
        Ok(())
    }
}
