//! Price history storage for the price alert service.
//!
//! This crate provides:
//! - `SQLite` database setup with bundled migrations
//! - The stored price row model
//! - `PriceRepository`, the `PriceHistoryStore` implementation

pub mod database;
pub mod models;
pub mod repositories;

pub use database::Database;
pub use models::PriceRecord;
pub use repositories::PriceRepository;
