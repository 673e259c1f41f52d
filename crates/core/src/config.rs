use anyhow::{bail, Context, Result};
use chrono::NaiveTime;
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Threshold value that means "no absolute alert for this symbol".
///
/// Anything at or above this value is treated as disabled, which is also the
/// default so that an unconfigured symbol never produces threshold alerts.
pub const DISABLED_THRESHOLD: Decimal = Decimal::from_parts(999_999, 0, 0, false, 0);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub alerts: AlertConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub market_data: MarketDataConfig,
    #[serde(default)]
    pub sms: Option<SmsConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub symbols: Vec<String>,
    pub poll_interval_secs: u64,
}

/// Alerting rules. This is the section the threshold resolver re-reads on
/// every lookup, so it is also what the config watcher republishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertConfig {
    #[serde(default = "default_threshold")]
    pub default_threshold: Decimal,
    /// Per-symbol absolute thresholds, keyed by canonical (uppercase) symbol.
    #[serde(default)]
    pub thresholds: BTreeMap<String, Decimal>,
    /// Minimum percentage rise that raises a jump alert. Zero or less disables.
    #[serde(default)]
    pub jump_pct: Decimal,
    #[serde(default = "default_jump_window")]
    pub jump_window_minutes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub market_hours_only: bool,
    pub timezone: String,
    /// Session open, `HH:MM` local time.
    pub open: String,
    /// Session close, `HH:MM` local time, inclusive.
    pub close: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketDataConfig {
    pub api_url: String,
    pub requests_per_second: u32,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from: String,
    pub to: String,
    #[serde(default = "default_sms_api_url")]
    pub api_url: String,
}

fn default_threshold() -> Decimal {
    DISABLED_THRESHOLD
}

const fn default_jump_window() -> u32 {
    5
}

fn default_sms_api_url() -> String {
    "https://api.twilio.com".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://data/prices.db".to_string(),
            max_connections: 5,
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            symbols: vec!["AAPL".to_string()],
            poll_interval_secs: 60,
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            default_threshold: DISABLED_THRESHOLD,
            thresholds: BTreeMap::new(),
            jump_pct: Decimal::ZERO,
            jump_window_minutes: default_jump_window(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            market_hours_only: false,
            timezone: "Asia/Kolkata".to_string(),
            open: "09:15".to_string(),
            close: "15:30".to_string(),
        }
    }
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            api_url: "https://query1.finance.yahoo.com".to_string(),
            requests_per_second: 5,
            request_timeout_secs: 10,
        }
    }
}

impl AppConfig {
    /// Canonicalizes symbols: trimmed, uppercased, empty entries and
    /// duplicates dropped (first occurrence wins).
    pub fn normalize(&mut self) {
        let mut seen = HashSet::new();
        self.monitor.symbols = self
            .monitor
            .symbols
            .iter()
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty() && seen.insert(s.clone()))
            .collect();
        self.alerts.normalize();
    }

    /// Rejects configurations the service cannot run with.
    ///
    /// # Errors
    /// Returns an error describing the first invalid setting found.
    pub fn validate(&self) -> Result<()> {
        if self.monitor.symbols.is_empty() {
            bail!("monitor.symbols must list at least one symbol");
        }
        if self.monitor.poll_interval_secs == 0 {
            bail!("monitor.poll_interval_secs must be greater than zero");
        }
        if self.database.max_connections == 0 {
            bail!("database.max_connections must be greater than zero");
        }
        if self.market_data.requests_per_second == 0 {
            bail!("market_data.requests_per_second must be greater than zero");
        }
        self.alerts.validate()?;
        self.session.validate()?;
        Ok(())
    }

    /// Returns the SMS settings only when every credential is present.
    #[must_use]
    pub fn sms_credentials(&self) -> Option<&SmsConfig> {
        self.sms.as_ref().filter(|sms| sms.is_complete())
    }
}

impl AlertConfig {
    pub fn normalize(&mut self) {
        self.thresholds = std::mem::take(&mut self.thresholds)
            .into_iter()
            .map(|(symbol, threshold)| (symbol.trim().to_uppercase(), threshold))
            .collect();
    }

    /// # Errors
    /// Returns an error when a threshold is zero or negative.
    pub fn validate(&self) -> Result<()> {
        if self.default_threshold <= Decimal::ZERO {
            bail!(
                "alerts.default_threshold must be positive, got {}",
                self.default_threshold
            );
        }
        for (symbol, threshold) in &self.thresholds {
            if *threshold <= Decimal::ZERO {
                bail!("alerts.thresholds.{symbol} must be positive, got {threshold}");
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn jump_enabled(&self) -> bool {
        self.jump_pct > Decimal::ZERO && self.jump_window_minutes > 0
    }

    /// Number of observations making up the jump detection window.
    #[must_use]
    pub fn detection_window_len(&self) -> usize {
        usize::try_from(self.jump_window_minutes.max(2)).unwrap_or(usize::MAX)
    }
}

impl SessionConfig {
    /// # Errors
    /// Returns an error if the timezone is unknown or the times don't parse.
    pub fn timezone(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("session.timezone '{}': {e}", self.timezone))
    }

    /// # Errors
    /// Returns an error if `open` or `close` is not `HH:MM`.
    pub fn window(&self) -> Result<(NaiveTime, NaiveTime)> {
        let open = NaiveTime::parse_from_str(&self.open, "%H:%M")
            .with_context(|| format!("session.open '{}' is not HH:MM", self.open))?;
        let close = NaiveTime::parse_from_str(&self.close, "%H:%M")
            .with_context(|| format!("session.close '{}' is not HH:MM", self.close))?;
        Ok((open, close))
    }

    /// # Errors
    /// Returns an error if the session settings are unusable.
    pub fn validate(&self) -> Result<()> {
        self.timezone()?;
        let (open, close) = self.window()?;
        if open >= close {
            bail!(
                "session.open ({}) must be earlier than session.close ({})",
                self.open,
                self.close
            );
        }
        Ok(())
    }
}

impl SmsConfig {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        [&self.account_sid, &self.auth_token, &self.from, &self.to]
            .iter()
            .all(|v| !v.trim().is_empty())
    }
}
