use price_alert_core::{AlertSink, PriceHistoryStore};
use price_alert_monitor::MonitorHandle;
use std::sync::Arc;

/// Shared state behind every route.
///
/// Routes only read price history; writes go through the monitor.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PriceHistoryStore>,
    pub sink: Arc<dyn AlertSink>,
    pub monitor: MonitorHandle,
    pub symbols: Arc<[String]>,
    pub market_hours_only: bool,
}

impl AppState {
    #[must_use]
    pub fn new(
        store: Arc<dyn PriceHistoryStore>,
        sink: Arc<dyn AlertSink>,
        monitor: MonitorHandle,
        symbols: &[String],
        market_hours_only: bool,
    ) -> Self {
        Self {
            store,
            sink,
            monitor,
            symbols: symbols.into(),
            market_hours_only,
        }
    }
}
