use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical form of a ticker symbol: trimmed and uppercased.
#[must_use]
pub fn canonical_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// A price as reported by the market data source, before it is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// A stored price for one symbol at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub symbol: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl PriceObservation {
    #[must_use]
    pub fn new(symbol: &str, price: Decimal, timestamp: DateTime<Utc>) -> Self {
        Self {
            symbol: canonical_symbol(symbol),
            price,
            timestamp,
        }
    }

    #[must_use]
    pub fn from_quote(symbol: &str, quote: Quote) -> Self {
        Self::new(symbol, quote.price, quote.timestamp)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertKind {
    /// Price crossed the configured absolute threshold.
    Absolute,
    /// Price rose by at least the configured percentage within the window.
    Percent,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absolute => f.write_str("ABSOLUTE"),
            Self::Percent => f.write_str("PERCENT"),
        }
    }
}

/// Identity of a fired alert: one per (symbol, triggering observation, kind).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlertKey {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub kind: AlertKind,
}

impl AlertKey {
    #[must_use]
    pub fn new(symbol: &str, timestamp: DateTime<Utc>, kind: AlertKind) -> Self {
        Self {
            symbol: canonical_symbol(symbol),
            timestamp,
            kind,
        }
    }

    #[must_use]
    pub fn for_observation(observation: &PriceObservation, kind: AlertKind) -> Self {
        Self::new(&observation.symbol, observation.timestamp, kind)
    }
}

impl fmt::Display for AlertKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.symbol,
            self.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            self.kind
        )
    }
}

/// How an alert message was handled by the sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Delivery {
    /// Delivered through the configured transport (and recorded locally).
    Sent,
    /// Only recorded locally, either because no transport is configured or
    /// because the transport failed.
    RecordedLocally { reason: String },
}

impl Delivery {
    #[must_use]
    pub const fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }
}
