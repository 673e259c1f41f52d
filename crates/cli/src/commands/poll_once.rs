//! Single polling cycle, for checking a deployment without starting the service.

use crate::service::build_cycle;
use anyhow::Result;
use chrono::Utc;
use clap::Args;
use price_alert_core::{AlertSink, ConfigLoader, PriceHistoryStore, SessionGate, ThresholdResolver};
use price_alert_data::Database;
use price_alert_notifier::Notifier;
use std::sync::Arc;

/// Arguments for the poll-once command.
#[derive(Args, Debug, Clone)]
pub struct PollOnceArgs {
    /// Poll even when the trading-session gate is closed
    #[arg(long)]
    pub ignore_session: bool,
}

/// Runs one cycle against the configured store and prints the report as JSON.
///
/// # Errors
/// Returns an error if configuration or storage cannot be set up.
pub async fn run_poll_once(config_path: &str, args: PollOnceArgs) -> Result<()> {
    let config = ConfigLoader::load_from(config_path)?;
    let database = Database::connect(&config.database).await?;
    let store: Arc<dyn PriceHistoryStore> = Arc::new(database.prices());
    let sink: Arc<dyn AlertSink> = Arc::new(Notifier::from_config(&config)?);

    let gate = if args.ignore_session {
        SessionGate::always_open()
    } else {
        SessionGate::from_config(&config.session)?
    };

    let mut cycle = build_cycle(
        &config,
        store,
        sink,
        ThresholdResolver::fixed(config.alerts.clone()),
        gate,
    )?;
    let report = cycle.run(Utc::now()).await;

    if !report.in_session {
        tracing::info!("Trading session is closed; pass --ignore-session to poll anyway");
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
