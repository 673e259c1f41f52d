//! Price history repository.
//!
//! Append-only storage of observed prices with most-recent-N queries.

use anyhow::Result;
use async_trait::async_trait;
use price_alert_core::{canonical_symbol, PriceHistoryStore, PriceObservation};
use sqlx::SqlitePool;

use crate::models::PriceRecord;

/// Repository for price observations.
#[derive(Debug, Clone)]
pub struct PriceRepository {
    pool: SqlitePool,
}

impl PriceRepository {
    /// Creates a new repository instance.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts a single observation.
    ///
    /// # Errors
    /// Returns an error if the database operation fails.
    pub async fn insert(&self, observation: &PriceObservation) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO prices (symbol, price, observed_at)
            VALUES (?1, ?2, ?3)
            ",
        )
        .bind(canonical_symbol(&observation.symbol))
        .bind(observation.price.to_string())
        .bind(observation.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Queries the most recent `limit` observations for a symbol, returned
    /// oldest first.
    ///
    /// # Errors
    /// Returns an error if the query fails or a row holds a corrupt price.
    pub async fn query_recent(&self, symbol: &str, limit: usize) -> Result<Vec<PriceObservation>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let records = sqlx::query_as::<_, PriceRecord>(
            r"
            SELECT id, symbol, price, observed_at
            FROM prices
            WHERE symbol = ?1
            ORDER BY observed_at DESC, id DESC
            LIMIT ?2
            ",
        )
        .bind(canonical_symbol(symbol))
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        records
            .into_iter()
            .rev()
            .map(PriceRecord::into_observation)
            .collect()
    }

    /// Gets the latest observation for a symbol.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn get_latest(&self, symbol: &str) -> Result<Option<PriceObservation>> {
        let record = sqlx::query_as::<_, PriceRecord>(
            r"
            SELECT id, symbol, price, observed_at
            FROM prices
            WHERE symbol = ?1
            ORDER BY observed_at DESC, id DESC
            LIMIT 1
            ",
        )
        .bind(canonical_symbol(symbol))
        .fetch_optional(&self.pool)
        .await?;

        record.map(PriceRecord::into_observation).transpose()
    }

    /// Counts stored observations for a symbol.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn count(&self, symbol: &str) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM prices WHERE symbol = ?1")
            .bind(canonical_symbol(symbol))
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[async_trait]
impl PriceHistoryStore for PriceRepository {
    async fn append(&self, observation: &PriceObservation) -> Result<()> {
        self.insert(observation).await
    }

    async fn most_recent(&self, symbol: &str, limit: usize) -> Result<Vec<PriceObservation>> {
        self.query_recent(symbol, limit).await
    }

    async fn latest(&self, symbol: &str) -> Result<Option<PriceObservation>> {
        self.get_latest(symbol).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use chrono::{DateTime, TimeZone, Utc};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn ts(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, 14, minute, 0).unwrap()
    }

    async fn repo_with(prices: &[(&str, Decimal, u32)]) -> PriceRepository {
        let repo = Database::in_memory().await.unwrap().prices();
        for (symbol, price, minute) in prices {
            repo.append(&PriceObservation::new(symbol, *price, ts(*minute)))
                .await
                .unwrap();
        }
        repo
    }

    #[tokio::test]
    async fn test_most_recent_is_oldest_first_and_truncated() {
        let repo = repo_with(&[
            ("AAPL", dec!(148), 1),
            ("AAPL", dec!(152), 2),
            ("AAPL", dec!(153), 3),
            ("MSFT", dec!(400), 3),
        ])
        .await;

        let recent = repo.most_recent("AAPL", 2).await.unwrap();
        let prices: Vec<_> = recent.iter().map(|o| o.price).collect();
        assert_eq!(prices, vec![dec!(152), dec!(153)]);
        assert_eq!(recent[1].timestamp, ts(3));

        let all = repo.most_recent("AAPL", 10).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].price, dec!(148));
    }

    #[tokio::test]
    async fn test_symbol_lookup_is_case_insensitive() {
        let repo = repo_with(&[("aapl", dec!(150.25), 1)]).await;

        let latest = repo.latest("Aapl").await.unwrap().unwrap();
        assert_eq!(latest.symbol, "AAPL");
        assert_eq!(latest.price, dec!(150.25));
        assert_eq!(latest.timestamp, ts(1));
    }

    #[tokio::test]
    async fn test_unknown_symbol_has_no_history() {
        let repo = repo_with(&[("AAPL", dec!(150), 1)]).await;

        assert!(repo.latest("ZZZZ").await.unwrap().is_none());
        assert!(repo.most_recent("ZZZZ", 5).await.unwrap().is_empty());
        assert_eq!(repo.count("ZZZZ").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_zero_limit_returns_nothing() {
        let repo = repo_with(&[("AAPL", dec!(150), 1)]).await;
        assert!(repo.most_recent("AAPL", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_prices_round_trip_exactly() {
        let repo = repo_with(&[("AAPL", dec!(104.90), 1), ("AAPL", dec!(0.0001), 2)]).await;

        let recent = repo.most_recent("AAPL", 2).await.unwrap();
        assert_eq!(recent[0].price, dec!(104.9));
        assert_eq!(recent[1].price, dec!(0.0001));
        assert_eq!(repo.count("AAPL").await.unwrap(), 2);
    }
}
