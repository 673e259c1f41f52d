//! Configuration check: loads, validates, and prints the effective settings.

use anyhow::Result;
use clap::Args;
use price_alert_core::{AppConfig, ConfigLoader, ThresholdResolver};

/// Arguments for the check-config command.
#[derive(Args, Debug, Clone)]
pub struct CheckConfigArgs {
    /// Read only the file, ignoring `PRICE_ALERT_*` environment overrides
    #[arg(long)]
    pub file_only: bool,
}

/// # Errors
/// Returns an error if the configuration is missing required values or is invalid.
pub fn run_check_config(config_path: &str, args: &CheckConfigArgs) -> Result<()> {
    let config = if args.file_only {
        ConfigLoader::load_file(config_path)?
    } else {
        ConfigLoader::load_from(config_path)?
    };

    println!("Configuration OK ({config_path})");
    for line in describe(&config) {
        println!("{line}");
    }
    Ok(())
}

fn describe(config: &AppConfig) -> Vec<String> {
    let thresholds = ThresholdResolver::fixed(config.alerts.clone());
    let mut lines = vec![format!(
        "Polling {} symbol(s) every {}s",
        config.monitor.symbols.len(),
        config.monitor.poll_interval_secs
    )];

    for symbol in &config.monitor.symbols {
        let threshold = thresholds
            .resolve(symbol)
            .map_or_else(|| "disabled".to_string(), |t| t.to_string());
        lines.push(format!("  {symbol}: threshold {threshold}"));
    }

    if config.alerts.jump_enabled() {
        lines.push(format!(
            "Jump alerts: +{}% over {} observation(s)",
            config.alerts.jump_pct,
            config.alerts.detection_window_len()
        ));
    } else {
        lines.push("Jump alerts: disabled".to_string());
    }

    if config.session.market_hours_only {
        lines.push(format!(
            "Session: Mon-Fri {}-{} {}",
            config.session.open, config.session.close, config.session.timezone
        ));
    } else {
        lines.push("Session: always open".to_string());
    }

    lines.push(if config.sms_credentials().is_some() {
        "SMS: enabled".to_string()
    } else {
        "SMS: not configured".to_string()
    });
    lines
}
