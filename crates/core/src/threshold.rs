use crate::config::{AlertConfig, DISABLED_THRESHOLD};
use crate::events::canonical_symbol;
use rust_decimal::Decimal;
use tokio::sync::watch;

/// Resolves the absolute alert threshold for a symbol.
///
/// Reads the current alert configuration on every lookup, so thresholds
/// published by the config watcher take effect on the next poll.
#[derive(Debug, Clone)]
pub struct ThresholdResolver {
    alerts: watch::Receiver<AlertConfig>,
}

impl ThresholdResolver {
    #[must_use]
    pub const fn new(alerts: watch::Receiver<AlertConfig>) -> Self {
        Self { alerts }
    }

    /// Resolver over a configuration that never changes.
    #[must_use]
    pub fn fixed(alerts: AlertConfig) -> Self {
        let (tx, rx) = watch::channel(alerts);
        // Receivers keep the last value after the sender is gone.
        drop(tx);
        Self::new(rx)
    }

    /// Per-symbol override, falling back to the default. `None` when the
    /// resolved value is at or above the disabled sentinel.
    #[must_use]
    pub fn resolve(&self, symbol: &str) -> Option<Decimal> {
        Self::resolve_in(&self.alerts.borrow(), symbol)
    }

    /// Same lookup against an explicit snapshot, for callers that hold one
    /// configuration for a whole polling cycle.
    #[must_use]
    pub fn resolve_in(alerts: &AlertConfig, symbol: &str) -> Option<Decimal> {
        let threshold = alerts
            .thresholds
            .get(&canonical_symbol(symbol))
            .copied()
            .unwrap_or(alerts.default_threshold);

        (threshold < DISABLED_THRESHOLD).then_some(threshold)
    }

    /// Snapshot of the alert configuration currently in effect.
    #[must_use]
    pub fn current(&self) -> AlertConfig {
        self.alerts.borrow().clone()
    }
}
