use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use governor::{clock::DefaultClock, state::InMemoryState, Quota, RateLimiter};
use price_alert_core::{canonical_symbol, FetchError, MarketDataConfig, MarketDataSource, Quote};
use reqwest::Client;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use crate::types::{ChartResponse, ChartResult};

const USER_AGENT: &str = concat!("price-alert/", env!("CARGO_PKG_VERSION"));

/// Decimal places kept when converting provider floats.
const PRICE_SCALE: u32 = 6;

pub struct YahooFinanceClient {
    http_client: Client,
    base_url: String,
    rate_limiter: Arc<RateLimiter<governor::state::direct::NotKeyed, InMemoryState, DefaultClock>>,
}

impl YahooFinanceClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &MarketDataConfig) -> Result<Self> {
        let quota = Quota::per_second(
            NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN),
        );
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build market data HTTP client")?;

        Ok(Self {
            http_client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            rate_limiter,
        })
    }

    /// Latest price for `symbol`.
    ///
    /// Uses the last 1-minute bar of the day and its bar time. When the
    /// market has no intraday bars (closed, holiday) falls back to the last
    /// daily close, stamped with the current time.
    ///
    /// # Errors
    /// Returns a `FetchError` if a request fails, the response is malformed,
    /// or no usable price exists.
    pub async fn latest_quote(&self, symbol: &str) -> Result<Quote, FetchError> {
        let symbol = canonical_symbol(symbol);

        let intraday = self.fetch_chart(&symbol, "1m", "1d").await?;
        if let Some((close, ts)) = intraday.as_ref().and_then(ChartResult::last_close) {
            let timestamp = ts.unwrap_or_else(Utc::now);
            return Ok(Quote {
                price: to_price(&symbol, close)?,
                timestamp,
            });
        }

        tracing::debug!("No intraday bars for {}, falling back to daily close", symbol);
        let daily = self.fetch_chart(&symbol, "1d", "5d").await?;
        match daily.as_ref().and_then(ChartResult::last_close) {
            Some((close, _)) => Ok(Quote {
                price: to_price(&symbol, close)?,
                timestamp: Utc::now(),
            }),
            None => Err(FetchError::NoData { symbol }),
        }
    }

    async fn fetch_chart(
        &self,
        symbol: &str,
        interval: &str,
        range: &str,
    ) -> Result<Option<ChartResult>, FetchError> {
        self.rate_limiter.until_ready().await;

        let url = format!(
            "{}/v8/finance/chart/{}",
            self.base_url,
            urlencoding::encode(symbol)
        );
        let response = self
            .http_client
            .get(&url)
            .query(&[("interval", interval), ("range", range)])
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: ChartResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Malformed(e.to_string()))?;

        if let Some(error) = body.chart.error {
            return Err(FetchError::Malformed(format!(
                "{}: {}",
                error.code, error.description
            )));
        }

        Ok(body.chart.result.and_then(|results| results.into_iter().next()))
    }
}

fn to_price(symbol: &str, close: f64) -> Result<Decimal, FetchError> {
    let price = Decimal::from_f64(close)
        .map(|p| p.round_dp(PRICE_SCALE).normalize())
        .ok_or_else(|| FetchError::Malformed(format!("unrepresentable price {close}")))?;

    if price <= Decimal::ZERO {
        return Err(FetchError::InvalidPrice {
            symbol: symbol.to_string(),
            price: price.to_string(),
        });
    }
    Ok(price)
}

#[async_trait]
impl MarketDataSource for YahooFinanceClient {
    async fn fetch(&self, symbol: &str) -> Result<Quote, FetchError> {
        let quote = self.latest_quote(symbol).await?;
        tracing::debug!(
            "Fetched {} = {} at {}",
            symbol,
            quote.price,
            quote.timestamp
        );
        Ok(quote)
    }
}
