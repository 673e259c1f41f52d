//! Stored price row.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use price_alert_core::PriceObservation;
use rust_decimal::Decimal;
use std::str::FromStr;

/// A row of the `prices` table.
///
/// Prices are stored as decimal text so they round-trip exactly.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PriceRecord {
    pub id: i64,
    pub symbol: String,
    pub price: String,
    pub observed_at: DateTime<Utc>,
}

impl PriceRecord {
    /// Converts the row back into a domain observation.
    ///
    /// # Errors
    /// Returns an error if the stored price is not a valid decimal.
    pub fn into_observation(self) -> Result<PriceObservation> {
        let price = Decimal::from_str(&self.price)
            .with_context(|| format!("Corrupt price '{}' in row {}", self.price, self.id))?;
        Ok(PriceObservation::new(&self.symbol, price, self.observed_at))
    }
}
