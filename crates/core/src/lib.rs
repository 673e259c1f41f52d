//! Core of the price alert service: domain types, collaborator traits, the
//! alert detectors and their supporting state, and configuration.

pub mod config;
pub mod config_loader;
pub mod config_watcher;
pub mod dedup;
pub mod detection;
pub mod error;
pub mod events;
pub mod session;
pub mod threshold;
pub mod traits;

pub use config::{
    AlertConfig, AppConfig, DatabaseConfig, MarketDataConfig, MonitorConfig, ServerConfig,
    SessionConfig, SmsConfig, DISABLED_THRESHOLD,
};
pub use config_loader::ConfigLoader;
pub use config_watcher::ConfigWatcher;
pub use dedup::AlertDedupCache;
pub use detection::{detect_crossing, detect_jump, jump_baseline, previous_price};
pub use error::{FetchError, NotifyError};
pub use events::{canonical_symbol, AlertKey, AlertKind, Delivery, PriceObservation, Quote};
pub use session::SessionGate;
pub use threshold::ThresholdResolver;
pub use traits::{AlertSink, AlertTransport, MarketDataSource, PriceHistoryStore};
