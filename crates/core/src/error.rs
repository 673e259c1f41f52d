//! Failure types returned across collaborator boundaries.
//!
//! These are the failures the polling cycle branches on, so they are typed
//! rather than `anyhow` errors.

use thiserror::Error;

/// Why a quote could not be obtained for a symbol.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("market data request failed: {0}")]
    Transport(String),

    #[error("market data source returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed market data response: {0}")]
    Malformed(String),

    #[error("no price available for {symbol}")]
    NoData { symbol: String },

    #[error("rejected non-positive price {price} for {symbol}")]
    InvalidPrice { symbol: String, price: String },
}

/// Why an alert transport could not deliver a message.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("alert transport request failed: {0}")]
    Transport(String),

    #[error("alert transport rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}
