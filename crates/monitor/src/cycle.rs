use chrono::{DateTime, SecondsFormat, Utc};
use price_alert_core::{
    detect_crossing, detect_jump, jump_baseline, previous_price, AlertConfig, AlertDedupCache,
    AlertKey, AlertKind, AlertSink, Delivery, MarketDataSource, PriceHistoryStore,
    PriceObservation, SessionGate, ThresholdResolver,
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;

/// An alert delivered during a cycle.
#[derive(Debug, Clone, Serialize)]
pub struct FiredAlert {
    pub key: AlertKey,
    pub message: String,
    pub delivery: Delivery,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SymbolOutcome {
    /// Nothing stored or evaluated for the symbol this cycle.
    Skipped { reason: String },
    /// Observation stored and evaluated; `alerts` holds what fired.
    Recorded {
        #[serde(with = "rust_decimal::serde::float")]
        price: Decimal,
        timestamp: DateTime<Utc>,
        alerts: Vec<FiredAlert>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct SymbolReport {
    pub symbol: String,
    #[serde(flatten)]
    pub outcome: SymbolOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    /// False when the trading-session gate was closed and nothing ran.
    pub in_session: bool,
    pub symbols: Vec<SymbolReport>,
}

impl CycleReport {
    pub fn alerts(&self) -> impl Iterator<Item = &FiredAlert> {
        self.symbols.iter().flat_map(|s| {
            let alerts: &[FiredAlert] = match &s.outcome {
                SymbolOutcome::Recorded { alerts, .. } => alerts,
                SymbolOutcome::Skipped { .. } => &[],
            };
            alerts
        })
    }

    #[must_use]
    pub fn skipped(&self) -> usize {
        self.symbols
            .iter()
            .filter(|s| matches!(s.outcome, SymbolOutcome::Skipped { .. }))
            .count()
    }
}

/// One pass over the configured symbols: fetch, persist, detect, alert.
///
/// Owns the dedup cache; everything else is a shared collaborator.
pub struct PollingCycle {
    symbols: Vec<String>,
    source: Arc<dyn MarketDataSource>,
    store: Arc<dyn PriceHistoryStore>,
    sink: Arc<dyn AlertSink>,
    thresholds: ThresholdResolver,
    gate: SessionGate,
    dedup: AlertDedupCache,
}

impl PollingCycle {
    #[must_use]
    pub fn new(
        symbols: Vec<String>,
        source: Arc<dyn MarketDataSource>,
        store: Arc<dyn PriceHistoryStore>,
        sink: Arc<dyn AlertSink>,
        thresholds: ThresholdResolver,
        gate: SessionGate,
        dedup: AlertDedupCache,
    ) -> Self {
        Self {
            symbols,
            source,
            store,
            sink,
            thresholds,
            gate,
            dedup,
        }
    }

    #[must_use]
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    #[must_use]
    pub const fn gate(&self) -> &SessionGate {
        &self.gate
    }

    #[must_use]
    pub const fn dedup(&self) -> &AlertDedupCache {
        &self.dedup
    }

    /// Runs the cycle as of `now`. Symbols are processed one after another;
    /// a failing symbol never stops the rest.
    pub async fn run(&mut self, now: DateTime<Utc>) -> CycleReport {
        if !self.gate.is_open(now) {
            tracing::debug!("Outside trading session at {}, skipping cycle", now);
            return CycleReport {
                started_at: now,
                in_session: false,
                symbols: Vec::new(),
            };
        }

        // Alert rules are read once per cycle so a reload never splits one.
        let rules = self.thresholds.current();
        let mut reports = Vec::with_capacity(self.symbols.len());

        for symbol in self.symbols.clone() {
            let outcome = self.process_symbol(&symbol, &rules).await;
            reports.push(SymbolReport { symbol, outcome });
        }

        CycleReport {
            started_at: now,
            in_session: true,
            symbols: reports,
        }
    }

    async fn process_symbol(&mut self, symbol: &str, rules: &AlertConfig) -> SymbolOutcome {
        let quote = match self.source.fetch(symbol).await {
            Ok(quote) => quote,
            Err(e) => {
                tracing::warn!("Skipping {} this cycle: {}", symbol, e);
                return SymbolOutcome::Skipped {
                    reason: e.to_string(),
                };
            }
        };

        let observation = PriceObservation::from_quote(symbol, quote);
        if let Err(e) = self.store.append(&observation).await {
            tracing::error!("Failed to store price for {}: {:#}", symbol, e);
            return SymbolOutcome::Skipped {
                reason: format!("failed to store price: {e}"),
            };
        }
        tracing::debug!(
            "Recorded {} = {} at {}",
            observation.symbol,
            observation.price,
            observation.timestamp
        );

        let mut alerts = Vec::new();
        if let Some(alert) = self.check_threshold(&observation, rules).await {
            alerts.push(alert);
        }
        if let Some(alert) = self.check_jump(&observation, rules).await {
            alerts.push(alert);
        }

        SymbolOutcome::Recorded {
            price: observation.price,
            timestamp: observation.timestamp,
            alerts,
        }
    }

    async fn check_threshold(
        &mut self,
        observation: &PriceObservation,
        rules: &AlertConfig,
    ) -> Option<FiredAlert> {
        let threshold = ThresholdResolver::resolve_in(rules, &observation.symbol)?;

        let recent = match self.store.most_recent(&observation.symbol, 2).await {
            Ok(recent) => recent,
            Err(e) => {
                tracing::error!(
                    "Failed to load recent prices for {}: {:#}",
                    observation.symbol,
                    e
                );
                return None;
            }
        };

        if !detect_crossing(observation.price, previous_price(&recent), Some(threshold)) {
            return None;
        }

        let message = format!(
            "{} crossed {:.2}: {:.2} at {}",
            observation.symbol,
            threshold,
            observation.price,
            format_timestamp(observation.timestamp)
        );
        self.fire(AlertKey::for_observation(observation, AlertKind::Absolute), message)
            .await
    }

    async fn check_jump(
        &mut self,
        observation: &PriceObservation,
        rules: &AlertConfig,
    ) -> Option<FiredAlert> {
        if !rules.jump_enabled() {
            return None;
        }

        let window = match self
            .store
            .most_recent(&observation.symbol, rules.detection_window_len())
            .await
        {
            Ok(window) => window,
            Err(e) => {
                tracing::error!(
                    "Failed to load detection window for {}: {:#}",
                    observation.symbol,
                    e
                );
                return None;
            }
        };

        let baseline = jump_baseline(&window)?;
        if !detect_jump(baseline, observation.price, rules.jump_pct) {
            return None;
        }

        let message = format!(
            "{} +{}% in ~{}m → {:.2} at {}",
            observation.symbol,
            format_pct(rules.jump_pct),
            rules.jump_window_minutes,
            observation.price,
            format_timestamp(observation.timestamp)
        );
        self.fire(AlertKey::for_observation(observation, AlertKind::Percent), message)
            .await
    }

    async fn fire(&mut self, key: AlertKey, message: String) -> Option<FiredAlert> {
        if self.dedup.seen(&key) {
            tracing::debug!("Alert {} already fired, not repeating", key);
            return None;
        }

        let delivery = self.sink.notify(&message).await;
        self.dedup.mark(key.clone());

        Some(FiredAlert {
            key,
            message,
            delivery,
        })
    }
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

/// Percentages always carry a fractional digit: `5.0`, `2.5`.
fn format_pct(pct: Decimal) -> String {
    let pct = pct.normalize();
    if pct.scale() == 0 {
        format!("{pct}.0")
    } else {
        pct.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use price_alert_core::{FetchError, Quote, SessionConfig};
    use price_alert_data::Database;
    use rust_decimal_macros::dec;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Market data source that replays scripted quotes per symbol.
    #[derive(Default)]
    struct ScriptedSource {
        quotes: Mutex<HashMap<String, VecDeque<Result<Quote, FetchError>>>>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn push(&self, symbol: &str, price: Decimal, minute: u32) {
            self.push_result(
                symbol,
                Ok(Quote {
                    price,
                    timestamp: ts(minute),
                }),
            );
        }

        fn push_result(&self, symbol: &str, result: Result<Quote, FetchError>) {
            self.quotes
                .lock()
                .unwrap()
                .entry(symbol.to_string())
                .or_default()
                .push_back(result);
        }
    }

    #[async_trait]
    impl MarketDataSource for ScriptedSource {
        async fn fetch(&self, symbol: &str) -> Result<Quote, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.quotes
                .lock()
                .unwrap()
                .get_mut(symbol)
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| {
                    Err(FetchError::NoData {
                        symbol: symbol.to_string(),
                    })
                })
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        messages: Mutex<Vec<String>>,
    }

    impl RecordingSink {
        fn messages(&self) -> Vec<String> {
            self.messages.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AlertSink for RecordingSink {
        async fn notify(&self, message: &str) -> Delivery {
            self.messages.lock().unwrap().push(message.to_string());
            Delivery::RecordedLocally {
                reason: "test".to_string(),
            }
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl PriceHistoryStore for BrokenStore {
        async fn append(&self, _observation: &PriceObservation) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }

        async fn most_recent(
            &self,
            _symbol: &str,
            _limit: usize,
        ) -> anyhow::Result<Vec<PriceObservation>> {
            Ok(Vec::new())
        }

        async fn latest(&self, _symbol: &str) -> anyhow::Result<Option<PriceObservation>> {
            Ok(None)
        }
    }

    fn ts(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, 15, minute, 0).unwrap()
    }

    fn rules(overrides: &[(&str, Decimal)], jump_pct: Decimal, window: u32) -> AlertConfig {
        AlertConfig {
            thresholds: overrides
                .iter()
                .map(|(s, t)| ((*s).to_string(), *t))
                .collect(),
            jump_pct,
            jump_window_minutes: window,
            ..AlertConfig::default()
        }
    }

    struct Harness {
        cycle: PollingCycle,
        source: Arc<ScriptedSource>,
        sink: Arc<RecordingSink>,
        store: Arc<dyn PriceHistoryStore>,
    }

    async fn harness(symbols: &[&str], rules: AlertConfig) -> Harness {
        let store: Arc<dyn PriceHistoryStore> =
            Arc::new(Database::in_memory().await.unwrap().prices());
        harness_with_store(symbols, rules, store, AlertDedupCache::new())
    }

    fn harness_with_store(
        symbols: &[&str],
        rules: AlertConfig,
        store: Arc<dyn PriceHistoryStore>,
        dedup: AlertDedupCache,
    ) -> Harness {
        let source = Arc::new(ScriptedSource::default());
        let sink = Arc::new(RecordingSink::default());
        let cycle = PollingCycle::new(
            symbols.iter().map(|s| (*s).to_string()).collect(),
            source.clone(),
            store.clone(),
            sink.clone(),
            ThresholdResolver::fixed(rules),
            SessionGate::always_open(),
            dedup,
        );
        Harness {
            cycle,
            source,
            sink,
            store,
        }
    }

    #[tokio::test]
    async fn test_threshold_crossing_fires_once() {
        let mut h = harness(&["AAPL"], rules(&[("AAPL", dec!(150))], dec!(0), 5)).await;
        h.source.push("AAPL", dec!(148), 1);
        h.source.push("AAPL", dec!(152), 2);
        h.source.push("AAPL", dec!(153), 3);

        let first = h.cycle.run(ts(1)).await;
        assert_eq!(first.alerts().count(), 0);

        let second = h.cycle.run(ts(2)).await;
        let fired: Vec<_> = second.alerts().collect();
        assert_eq!(fired.len(), 1);
        assert_eq!(
            fired[0].key,
            AlertKey::new("AAPL", ts(2), AlertKind::Absolute)
        );
        assert_eq!(
            fired[0].message,
            "AAPL crossed 150.00: 152.00 at 2025-03-03T15:02:00+00:00"
        );

        let third = h.cycle.run(ts(3)).await;
        assert_eq!(third.alerts().count(), 0);
        assert_eq!(h.sink.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_first_observation_above_threshold_fires() {
        let mut h = harness(&["AAPL"], rules(&[("AAPL", dec!(150))], dec!(0), 5)).await;
        h.source.push("AAPL", dec!(160), 1);

        let report = h.cycle.run(ts(1)).await;
        assert_eq!(report.alerts().count(), 1);
    }

    #[tokio::test]
    async fn test_no_threshold_configured_never_alerts() {
        let mut h = harness(&["AAPL"], AlertConfig::default()).await;
        h.source.push("AAPL", dec!(148), 1);
        h.source.push("AAPL", dec!(1_000_000), 2);

        h.cycle.run(ts(1)).await;
        h.cycle.run(ts(2)).await;
        assert!(h.sink.messages().is_empty());
    }

    #[tokio::test]
    async fn test_percent_jump_against_oldest_in_window() {
        let mut h = harness(&["AAPL"], rules(&[], dec!(5), 3)).await;
        h.source.push("AAPL", dec!(100), 1);
        h.source.push("AAPL", dec!(100), 2);
        h.source.push("AAPL", dec!(106), 3);

        assert_eq!(h.cycle.run(ts(1)).await.alerts().count(), 0);
        assert_eq!(h.cycle.run(ts(2)).await.alerts().count(), 0);

        let report = h.cycle.run(ts(3)).await;
        let fired: Vec<_> = report.alerts().collect();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].key, AlertKey::new("AAPL", ts(3), AlertKind::Percent));
        assert_eq!(
            fired[0].message,
            "AAPL +5.0% in ~3m → 106.00 at 2025-03-03T15:03:00+00:00"
        );
    }

    #[test]
    fn test_format_pct_keeps_one_fractional_digit() {
        assert_eq!(format_pct(dec!(5)), "5.0");
        assert_eq!(format_pct(dec!(5.00)), "5.0");
        assert_eq!(format_pct(dec!(2.5)), "2.5");
        assert_eq!(format_pct(dec!(0.25)), "0.25");
    }

    #[tokio::test]
    async fn test_jump_needs_two_observations() {
        let mut h = harness(&["AAPL"], rules(&[], dec!(5), 3)).await;
        h.source.push("AAPL", dec!(100), 1);

        assert_eq!(h.cycle.run(ts(1)).await.alerts().count(), 0);
    }

    #[tokio::test]
    async fn test_jump_disabled_with_zero_pct() {
        let mut h = harness(&["AAPL"], rules(&[], dec!(0), 3)).await;
        h.source.push("AAPL", dec!(100), 1);
        h.source.push("AAPL", dec!(300), 2);

        h.cycle.run(ts(1)).await;
        assert_eq!(h.cycle.run(ts(2)).await.alerts().count(), 0);
    }

    #[tokio::test]
    async fn test_repeated_bar_is_not_realerted() {
        // Same 1m bar returned on two polls: the second jump check sees the
        // same triggering timestamp and is suppressed.
        let mut h = harness(&["AAPL"], rules(&[], dec!(5), 3)).await;
        h.source.push("AAPL", dec!(100), 1);
        h.source.push("AAPL", dec!(106), 2);
        h.source.push("AAPL", dec!(106), 2);

        h.cycle.run(ts(1)).await;
        assert_eq!(h.cycle.run(ts(2)).await.alerts().count(), 1);
        assert_eq!(h.cycle.run(ts(3)).await.alerts().count(), 0);
        assert_eq!(h.sink.messages().len(), 1);
        assert_eq!(h.cycle.dedup().len(), 1);
    }

    #[tokio::test]
    async fn test_injected_dedup_cache_suppresses_known_keys() {
        let mut dedup = AlertDedupCache::new();
        dedup.mark(AlertKey::new("AAPL", ts(1), AlertKind::Absolute));

        let store: Arc<dyn PriceHistoryStore> =
            Arc::new(Database::in_memory().await.unwrap().prices());
        let mut h = harness_with_store(
            &["AAPL"],
            rules(&[("AAPL", dec!(150))], dec!(0), 5),
            store,
            dedup,
        );
        h.source.push("AAPL", dec!(155), 1);

        let report = h.cycle.run(ts(1)).await;
        assert_eq!(report.alerts().count(), 0);
        assert!(h.sink.messages().is_empty());
    }

    #[tokio::test]
    async fn test_both_alerts_can_fire_on_one_observation() {
        let mut h = harness(&["AAPL"], rules(&[("AAPL", dec!(150))], dec!(5), 2)).await;
        h.source.push("AAPL", dec!(140), 1);
        h.source.push("AAPL", dec!(151), 2);

        h.cycle.run(ts(1)).await;
        let report = h.cycle.run(ts(2)).await;
        let kinds: Vec<_> = report.alerts().map(|a| a.key.kind).collect();
        assert_eq!(kinds, vec![AlertKind::Absolute, AlertKind::Percent]);
    }

    #[tokio::test]
    async fn test_fetch_failure_skips_symbol_and_continues() {
        let mut h = harness(
            &["AAPL", "MSFT"],
            rules(&[("MSFT", dec!(400))], dec!(0), 5),
        )
        .await;
        h.source
            .push_result("AAPL", Err(FetchError::Transport("timeout".to_string())));
        h.source.push("MSFT", dec!(410), 1);

        let report = h.cycle.run(ts(1)).await;
        assert_eq!(report.skipped(), 1);
        assert!(matches!(
            report.symbols[0].outcome,
            SymbolOutcome::Skipped { .. }
        ));
        assert_eq!(report.alerts().count(), 1);

        assert!(h.store.latest("AAPL").await.unwrap().is_none());
        assert_eq!(
            h.store.latest("MSFT").await.unwrap().unwrap().price,
            dec!(410)
        );
    }

    #[tokio::test]
    async fn test_store_failure_skips_detection() {
        let mut h = harness_with_store(
            &["AAPL"],
            rules(&[("AAPL", dec!(150))], dec!(0), 5),
            Arc::new(BrokenStore),
            AlertDedupCache::new(),
        );
        h.source.push("AAPL", dec!(155), 1);

        let report = h.cycle.run(ts(1)).await;
        assert_eq!(report.skipped(), 1);
        assert!(h.sink.messages().is_empty());
    }

    #[tokio::test]
    async fn test_closed_session_skips_everything() {
        let store: Arc<dyn PriceHistoryStore> =
            Arc::new(Database::in_memory().await.unwrap().prices());
        let source = Arc::new(ScriptedSource::default());
        source.push("AAPL", dec!(155), 1);
        let gate = SessionGate::from_config(&SessionConfig {
            market_hours_only: true,
            ..SessionConfig::default()
        })
        .unwrap();
        let mut cycle = PollingCycle::new(
            vec!["AAPL".to_string()],
            source.clone(),
            store.clone(),
            Arc::new(RecordingSink::default()),
            ThresholdResolver::fixed(rules(&[("AAPL", dec!(150))], dec!(0), 5)),
            gate,
            AlertDedupCache::new(),
        );

        // Sunday
        let report = cycle.run(Utc.with_ymd_and_hms(2025, 3, 2, 6, 0, 0).unwrap()).await;
        assert!(!report.in_session);
        assert!(report.symbols.is_empty());
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        assert!(store.latest("AAPL").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_report_serializes_outcomes() {
        let mut h = harness(&["AAPL"], rules(&[("AAPL", dec!(150))], dec!(0), 5)).await;
        h.source.push("AAPL", dec!(151.5), 1);

        let report = h.cycle.run(ts(1)).await;
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["symbols"][0]["symbol"], "AAPL");
        assert_eq!(json["symbols"][0]["outcome"], "recorded");
        assert_eq!(json["symbols"][0]["price"], serde_json::json!(151.5));
        assert_eq!(json["symbols"][0]["alerts"][0]["key"]["kind"], "ABSOLUTE");
    }
}
