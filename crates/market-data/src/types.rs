//! Response types for the Yahoo Finance chart endpoint.
//!
//! Only the fields needed to extract the latest close are modelled.

use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ChartResponse {
    pub chart: Chart,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chart {
    #[serde(default)]
    pub result: Option<Vec<ChartResult>>,
    #[serde(default)]
    pub error: Option<ChartError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartError {
    pub code: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartResult {
    /// Bar open times, seconds since the epoch.
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: Indicators,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Indicators {
    #[serde(default)]
    pub quote: Vec<QuoteIndicator>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuoteIndicator {
    /// Close per bar; `null` for bars without trades.
    #[serde(default)]
    pub close: Vec<Option<f64>>,
}

impl ChartResult {
    /// The last bar with a close price, with its bar time.
    #[must_use]
    pub fn last_close(&self) -> Option<(f64, Option<DateTime<Utc>>)> {
        let closes = &self.indicators.quote.first()?.close;
        closes
            .iter()
            .enumerate()
            .rev()
            .find_map(|(i, close)| close.map(|c| (i, c)))
            .map(|(i, close)| {
                let ts = self
                    .timestamp
                    .get(i)
                    .and_then(|secs| DateTime::from_timestamp(*secs, 0));
                (close, ts)
            })
    }
}
