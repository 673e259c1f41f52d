use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use price_alert_core::{canonical_symbol, Delivery, PriceObservation};
use price_alert_monitor::{CycleReport, MonitorStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const DEFAULT_HISTORY_LEN: i64 = 100;
pub const MAX_HISTORY_LEN: i64 = 1000;
pub const DEFAULT_TEST_MESSAGE: &str = "Test alert from price-alert";

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

fn no_data() -> ApiError {
    api_error(StatusCode::NOT_FOUND, "No data")
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub symbols: Vec<String>,
    pub market_hours_only: bool,
    /// `None` when the monitor has stopped.
    pub monitor: Option<MonitorStatus>,
}

#[derive(Debug, Serialize)]
pub struct PriceResponse {
    pub symbol: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PricePoint {
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl From<PriceObservation> for PricePoint {
    fn from(observation: PriceObservation) -> Self {
        Self {
            price: observation.price,
            timestamp: observation.timestamp,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub symbol: String,
    pub data: Vec<PricePoint>,
}

/// `n` is kept as text so integers of any size reach the clamp.
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub n: Option<String>,
}

impl HistoryParams {
    /// Requested length clamped to `1..=MAX_HISTORY_LEN`, or `None` if `n`
    /// is not an integer.
    #[must_use]
    pub fn limit(&self) -> Option<usize> {
        let n = match self.n.as_deref() {
            Some(raw) => parse_saturating(raw)?,
            None => DEFAULT_HISTORY_LEN,
        };
        usize::try_from(n.clamp(1, MAX_HISTORY_LEN)).ok()
    }
}

/// Parses a decimal integer, saturating at the `i64` bounds.
fn parse_saturating(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    let (negative, digits) = match raw.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    Some(match (digits.parse::<i64>(), negative) {
        (Ok(value), true) => -value,
        (Ok(value), false) => value,
        (Err(_), true) => i64::MIN,
        (Err(_), false) => i64::MAX,
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct TestAlertRequest {
    pub msg: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TestAlertResponse {
    pub sent: bool,
    pub delivery: Delivery,
}

#[derive(Debug, Serialize)]
pub struct PollResponse {
    pub ran: bool,
    pub at: DateTime<Utc>,
    pub report: CycleReport,
}

/// Service liveness plus monitor statistics.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let monitor = state.monitor.latest_status();
    if monitor.is_none() {
        tracing::warn!("Monitor status unavailable: monitor has stopped");
    }

    Json(HealthResponse {
        status: if monitor.is_some() { "ok" } else { "degraded" },
        symbols: state.symbols.to_vec(),
        market_hours_only: state.market_hours_only,
        monitor,
    })
}

/// Most recent stored price for a symbol.
///
/// # Errors
/// `404` when the symbol has no stored prices, `500` if the store fails.
pub async fn latest_price(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<PriceResponse>, ApiError> {
    let symbol = canonical_symbol(&symbol);
    let latest = state.store.latest(&symbol).await.map_err(|e| {
        tracing::error!("Failed to load latest price for {}: {:#}", symbol, e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load price")
    })?;

    let observation = latest.ok_or_else(no_data)?;
    Ok(Json(PriceResponse {
        symbol: observation.symbol,
        price: observation.price,
        timestamp: observation.timestamp,
    }))
}

/// Up to `n` most recent prices, oldest first.
///
/// # Errors
/// `400` when `n` is not an integer, `404` when the symbol has no stored
/// prices, `500` if the store fails.
pub async fn price_history(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let limit = params
        .limit()
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "n must be an integer"))?;

    let symbol = canonical_symbol(&symbol);
    let history = state
        .store
        .most_recent(&symbol, limit)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load history for {}: {:#}", symbol, e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load history")
        })?;

    if history.is_empty() {
        return Err(no_data());
    }

    Ok(Json(HistoryResponse {
        symbol,
        data: history.into_iter().map(PricePoint::from).collect(),
    }))
}

/// Sends a message through the alert sink. The body is optional.
pub async fn test_alert(
    State(state): State<AppState>,
    body: Option<Json<TestAlertRequest>>,
) -> Json<TestAlertResponse> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let message = request
        .msg
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_TEST_MESSAGE.to_string());

    let delivery = state.sink.notify(&message).await;
    Json(TestAlertResponse {
        sent: true,
        delivery,
    })
}

/// Runs one polling cycle through the monitor and returns its report.
///
/// # Errors
/// `503` if the monitor has stopped.
pub async fn debug_poll(State(state): State<AppState>) -> Result<Json<PollResponse>, ApiError> {
    let report = state.monitor.poll_once().await.map_err(|e| {
        tracing::error!("On-demand poll failed: {}", e);
        api_error(StatusCode::SERVICE_UNAVAILABLE, "Monitor is not running")
    })?;

    Ok(Json(PollResponse {
        ran: true,
        at: report.started_at,
        report,
    }))
}
