//! Data models for stored price history.

pub mod price;

pub use price::PriceRecord;
