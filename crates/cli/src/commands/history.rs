//! Prints stored price history.

use anyhow::Result;
use clap::Args;
use price_alert_core::{canonical_symbol, ConfigLoader, PriceObservation};
use price_alert_data::Database;

/// Arguments for the history command.
#[derive(Args, Debug, Clone)]
pub struct HistoryArgs {
    /// Ticker symbol (e.g., "AAPL", "RELIANCE.NS")
    pub symbol: String,

    /// Number of most recent observations to show
    #[arg(short, long, default_value_t = 20)]
    pub n: usize,
}

/// # Errors
/// Returns an error if the database cannot be opened or queried.
pub async fn run_history(config_path: &str, args: HistoryArgs) -> Result<()> {
    let config = ConfigLoader::load_from(config_path)?;
    let database = Database::connect(&config.database).await?;
    let symbol = canonical_symbol(&args.symbol);

    let history = database.prices().query_recent(&symbol, args.n).await?;
    if history.is_empty() {
        println!("No data for {symbol}");
        return Ok(());
    }

    println!("{symbol}: {} observation(s), oldest first", history.len());
    for line in format_history(&history) {
        println!("{line}");
    }
    Ok(())
}

fn format_history(history: &[PriceObservation]) -> Vec<String> {
    history
        .iter()
        .map(|obs| {
            format!(
                "  {}  {:>12}",
                obs.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
                obs.price.to_string()
            )
        })
        .collect()
}
