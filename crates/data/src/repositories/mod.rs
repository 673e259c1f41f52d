//! Database repositories for the price alert service.

pub mod price_repo;

pub use price_repo::PriceRepository;
