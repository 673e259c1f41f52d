//! Price monitoring: the per-symbol polling cycle and the actor that owns it.
//!
//! The actor is the only writer of price history and the only owner of the
//! alert dedup cache. Scheduled polls and on-demand polls (from the HTTP
//! surface) both go through its command channel, so they never overlap.

pub mod actor;
pub mod commands;
pub mod cycle;
pub mod handle;

pub use actor::{spawn_monitor, MonitorActor};
pub use commands::{MonitorCommand, MonitorStatus};
pub use cycle::{CycleReport, FiredAlert, PollingCycle, SymbolOutcome, SymbolReport};
pub use handle::MonitorHandle;
