use crate::cycle::CycleReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

#[derive(Debug)]
pub enum MonitorCommand {
    /// Run one polling cycle now and reply with its report.
    PollOnce(oneshot::Sender<CycleReport>),
    GetStatus(oneshot::Sender<MonitorStatus>),
    Shutdown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorStatus {
    pub symbols: Vec<String>,
    /// `None` when the monitor only polls on demand.
    pub poll_interval_secs: Option<u64>,
    pub market_hours_only: bool,
    pub cycles_run: u64,
    pub last_cycle_at: Option<DateTime<Utc>>,
    pub alerts_fired: u64,
    pub dedup_keys: usize,
    pub last_heartbeat: DateTime<Utc>,
}
