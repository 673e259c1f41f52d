use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use price_alert_core::{
    AlertConfig, AlertDedupCache, FetchError, MarketDataSource, PriceHistoryStore,
    PriceObservation, Quote, SessionGate, ThresholdResolver,
};
use price_alert_data::Database;
use price_alert_monitor::{spawn_monitor, PollingCycle, SymbolOutcome};
use price_alert_notifier::Notifier;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

/// Source that walks through a fixed price path, one new minute bar per call.
struct PricePath {
    prices: Vec<Decimal>,
    calls: AtomicUsize,
}

impl PricePath {
    fn new(prices: Vec<Decimal>) -> Arc<Self> {
        Arc::new(Self {
            prices,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataSource for PricePath {
    async fn fetch(&self, _symbol: &str) -> Result<Quote, FetchError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let price = *self
            .prices
            .get(n)
            .or_else(|| self.prices.last())
            .expect("price path must not be empty");
        let minutes = i64::try_from(n).expect("small call count");
        Ok(Quote {
            price,
            timestamp: Utc::now() + ChronoDuration::minutes(minutes),
        })
    }
}

/// In-memory store for tests that don't need SQLite.
#[derive(Default)]
struct VecStore {
    rows: Mutex<Vec<PriceObservation>>,
}

#[async_trait]
impl PriceHistoryStore for VecStore {
    async fn append(&self, observation: &PriceObservation) -> anyhow::Result<()> {
        self.rows.lock().unwrap().push(observation.clone());
        Ok(())
    }

    async fn most_recent(
        &self,
        symbol: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<PriceObservation>> {
        let rows = self.rows.lock().unwrap();
        let matching: Vec<_> = rows.iter().filter(|o| o.symbol == symbol).cloned().collect();
        let skip = matching.len().saturating_sub(limit);
        Ok(matching.into_iter().skip(skip).collect())
    }

    async fn latest(&self, symbol: &str) -> anyhow::Result<Option<PriceObservation>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|o| o.symbol == symbol)
            .cloned())
    }
}

fn threshold_rules(symbol: &str, threshold: Decimal) -> AlertConfig {
    let mut rules = AlertConfig::default();
    rules.thresholds.insert(symbol.to_string(), threshold);
    rules
}

#[tokio::test]
async fn test_on_demand_polls_alert_and_persist() {
    let db = Database::in_memory().await.unwrap();
    let repo = db.prices();
    let notifier = Notifier::local_only();
    let source = PricePath::new(vec![dec!(148), dec!(152), dec!(153)]);

    let cycle = PollingCycle::new(
        vec!["AAPL".to_string()],
        source.clone(),
        Arc::new(repo.clone()),
        Arc::new(notifier.clone()),
        ThresholdResolver::fixed(threshold_rules("AAPL", dec!(150))),
        SessionGate::always_open(),
        AlertDedupCache::new(),
    );
    let (handle, task) = spawn_monitor(cycle, None);

    let mut fired = 0;
    for _ in 0..3 {
        let report = handle.poll_once().await.unwrap();
        assert!(report.in_session);
        assert!(matches!(
            report.symbols[0].outcome,
            SymbolOutcome::Recorded { .. }
        ));
        fired += report.alerts().count();
    }
    assert_eq!(fired, 1);

    let history = repo.query_recent("AAPL", 10).await.unwrap();
    let prices: Vec<_> = history.iter().map(|o| o.price).collect();
    assert_eq!(prices, vec![dec!(148), dec!(152), dec!(153)]);

    let alerts = notifier.log().recent();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].message.starts_with("AAPL crossed 150.00: 152.00 at "));
    assert!(!alerts[0].delivery.is_sent());

    let status = handle.status().await.unwrap();
    assert_eq!(status.cycles_run, 3);
    assert_eq!(status.alerts_fired, 1);
    assert_eq!(status.dedup_keys, 1);
    assert_eq!(status.poll_interval_secs, None);
    assert!(status.last_cycle_at.is_some());

    let published = handle.latest_status().unwrap();
    assert_eq!(published.cycles_run, 3);
    assert_eq!(published.alerts_fired, 1);

    handle.shutdown().await.unwrap();
    task.await.unwrap().unwrap();
    assert_eq!(source.calls(), 3);
    assert!(handle.latest_status().is_none());
}

#[tokio::test]
async fn test_threshold_reload_applies_on_next_poll() {
    let (tx, rx) = watch::channel(AlertConfig::default());
    let source = PricePath::new(vec![dec!(100), dec!(120)]);
    let notifier = Notifier::local_only();

    let cycle = PollingCycle::new(
        vec!["AAPL".to_string()],
        source,
        Arc::new(VecStore::default()),
        Arc::new(notifier.clone()),
        ThresholdResolver::new(rx),
        SessionGate::always_open(),
        AlertDedupCache::new(),
    );
    let (handle, _task) = spawn_monitor(cycle, None);

    assert_eq!(handle.poll_once().await.unwrap().alerts().count(), 0);

    tx.send(threshold_rules("AAPL", dec!(110))).unwrap();
    assert_eq!(handle.poll_once().await.unwrap().alerts().count(), 1);
    assert_eq!(notifier.log().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_scheduled_polling_runs_on_interval() {
    let source = PricePath::new(vec![dec!(100)]);
    let cycle = PollingCycle::new(
        vec!["AAPL".to_string()],
        source.clone(),
        Arc::new(VecStore::default()),
        Arc::new(Notifier::local_only()),
        ThresholdResolver::fixed(AlertConfig::default()),
        SessionGate::always_open(),
        AlertDedupCache::new(),
    );
    let (handle, task) = spawn_monitor(cycle, Some(Duration::from_secs(60)));

    // Startup poll plus two scheduled ones.
    tokio::time::sleep(Duration::from_secs(125)).await;
    let status = handle.status().await.unwrap();
    assert_eq!(status.cycles_run, 3);
    assert_eq!(status.poll_interval_secs, Some(60));
    assert_eq!(source.calls(), 3);

    drop(handle);
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_dropping_all_handles_stops_monitor() {
    let cycle = PollingCycle::new(
        vec!["AAPL".to_string()],
        PricePath::new(vec![dec!(1)]),
        Arc::new(VecStore::default()),
        Arc::new(Notifier::local_only()),
        ThresholdResolver::fixed(AlertConfig::default()),
        SessionGate::always_open(),
        AlertDedupCache::new(),
    );
    let (handle, task) = spawn_monitor(cycle, None);
    drop(handle);

    assert!(task.await.unwrap().is_ok());
}
