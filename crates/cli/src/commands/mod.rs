//! One-shot CLI commands. The long-running service lives in `service`.

pub mod check_config;
pub mod history;
pub mod poll_once;

pub use check_config::{run_check_config, CheckConfigArgs};
pub use history::{run_history, HistoryArgs};
pub use poll_once::{run_poll_once, PollOnceArgs};
