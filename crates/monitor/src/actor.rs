use crate::commands::{MonitorCommand, MonitorStatus};
use crate::cycle::{CycleReport, PollingCycle};
use crate::handle::MonitorHandle;
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};

/// Owns the polling cycle and runs it on schedule or on request.
///
/// Commands are handled strictly one at a time, so two cycles never run
/// concurrently and the dedup cache has a single writer. A status snapshot
/// is published after every cycle so readers never wait on the mailbox.
pub struct MonitorActor {
    cycle: PollingCycle,
    rx: mpsc::Receiver<MonitorCommand>,
    status_tx: watch::Sender<MonitorStatus>,
    poll_interval: Option<Duration>,
    cycles_run: u64,
    alerts_fired: u64,
    last_cycle_at: Option<DateTime<Utc>>,
}

impl MonitorActor {
    /// With `poll_interval` of `None` the actor only polls on request.
    #[must_use]
    pub fn new(
        cycle: PollingCycle,
        rx: mpsc::Receiver<MonitorCommand>,
        poll_interval: Option<Duration>,
    ) -> Self {
        let initial = MonitorStatus {
            symbols: cycle.symbols().to_vec(),
            poll_interval_secs: poll_interval.map(|d| d.as_secs()),
            market_hours_only: cycle.gate().is_enabled(),
            cycles_run: 0,
            last_cycle_at: None,
            alerts_fired: 0,
            dedup_keys: cycle.dedup().len(),
            last_heartbeat: Utc::now(),
        };
        let (status_tx, _) = watch::channel(initial);

        Self {
            cycle,
            rx,
            status_tx,
            poll_interval,
            cycles_run: 0,
            alerts_fired: 0,
            last_cycle_at: None,
        }
    }

    /// Receiver of the status published after each cycle. It reports the
    /// sender as closed once the actor has stopped.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<MonitorStatus> {
        self.status_tx.subscribe()
    }

    /// Runs until a shutdown command arrives or every handle is dropped.
    ///
    /// # Errors
    /// Currently never fails; the result leaves room for fatal conditions.
    pub async fn run(mut self) -> Result<()> {
        tracing::info!(
            "Monitor starting for {} symbol(s): {}",
            self.cycle.symbols().len(),
            self.cycle.symbols().join(", ")
        );

        let mut schedule = self.poll_interval.map(|period| {
            // First tick completes immediately: poll once at startup.
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        loop {
            tokio::select! {
                () = next_tick(schedule.as_mut()) => {
                    self.run_cycle().await;
                }
                cmd = self.rx.recv() => {
                    match cmd {
                        Some(MonitorCommand::PollOnce(reply)) => {
                            tracing::info!("On-demand poll requested");
                            let report = self.run_cycle().await;
                            if reply.send(report).is_err() {
                                tracing::debug!("Poll requester went away before the report");
                            }
                        }
                        Some(MonitorCommand::GetStatus(reply)) => {
                            let _ = reply.send(self.status());
                        }
                        Some(MonitorCommand::Shutdown) => {
                            tracing::info!("Monitor received shutdown command");
                            break;
                        }
                        None => {
                            tracing::info!("All monitor handles dropped, stopping");
                            break;
                        }
                    }
                }
            }
        }

        tracing::info!("Monitor stopped after {} cycle(s)", self.cycles_run);
        Ok(())
    }

    async fn run_cycle(&mut self) -> CycleReport {
        let report = self.cycle.run(Utc::now()).await;

        self.cycles_run += 1;
        self.last_cycle_at = Some(report.started_at);

        if report.in_session {
            let fired = report.alerts().count();
            self.alerts_fired += fired as u64;
            tracing::info!(
                "Cycle {} done: {} symbol(s), {} skipped, {} alert(s)",
                self.cycles_run,
                report.symbols.len(),
                report.skipped(),
                fired
            );
        }

        self.status_tx.send_replace(self.status());
        report
    }

    fn status(&self) -> MonitorStatus {
        MonitorStatus {
            symbols: self.cycle.symbols().to_vec(),
            poll_interval_secs: self.poll_interval.map(|d| d.as_secs()),
            market_hours_only: self.cycle.gate().is_enabled(),
            cycles_run: self.cycles_run,
            last_cycle_at: self.last_cycle_at,
            alerts_fired: self.alerts_fired,
            dedup_keys: self.cycle.dedup().len(),
            last_heartbeat: Utc::now(),
        }
    }
}

async fn next_tick(schedule: Option<&mut Interval>) {
    match schedule {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Spawns the monitor actor and returns a handle to it along with the task.
#[must_use]
pub fn spawn_monitor(
    cycle: PollingCycle,
    poll_interval: Option<Duration>,
) -> (MonitorHandle, JoinHandle<Result<()>>) {
    let (tx, rx) = mpsc::channel(32);
    let actor = MonitorActor::new(cycle, rx, poll_interval);
    let status_rx = actor.subscribe();
    let task = tokio::spawn(async move {
        let result = actor.run().await;
        if let Err(e) = &result {
            tracing::error!("Monitor error: {:#}", e);
        }
        result
    });
    (MonitorHandle::new(tx, status_rx), task)
}
