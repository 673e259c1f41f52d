//! Market data source for the price alert service.
//!
//! Fetches the latest price for a ticker from the Yahoo Finance chart API.

pub mod client;
pub mod types;

pub use client::YahooFinanceClient;
