use crate::error::{FetchError, NotifyError};
use crate::events::{Delivery, PriceObservation, Quote};
use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Fetches the latest quote for `symbol`. Every failure is reported as a
    /// `FetchError`; implementations must not panic.
    async fn fetch(&self, symbol: &str) -> Result<Quote, FetchError>;
}

/// Append-only price history, one series per symbol.
#[async_trait]
pub trait PriceHistoryStore: Send + Sync {
    async fn append(&self, observation: &PriceObservation) -> Result<()>;

    /// The most recent `limit` observations for `symbol`, oldest first.
    async fn most_recent(&self, symbol: &str, limit: usize) -> Result<Vec<PriceObservation>>;

    async fn latest(&self, symbol: &str) -> Result<Option<PriceObservation>>;
}

/// Outbound channel for alert messages (SMS, chat, ...).
#[async_trait]
pub trait AlertTransport: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, message: &str) -> Result<(), NotifyError>;
}

/// Best-effort alert delivery. Never fails: when no transport is available
/// the message is still recorded locally.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn notify(&self, message: &str) -> Delivery;
}
