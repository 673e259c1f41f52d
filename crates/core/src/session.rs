use crate::config::SessionConfig;
use anyhow::Result;
use chrono::{DateTime, Datelike, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;

/// Decides whether the polling cycle runs at a given instant.
///
/// When the gate is disabled every instant is inside the session. Otherwise
/// only Monday to Friday between `open` and `close` (both inclusive) in the
/// configured exchange timezone.
#[derive(Debug, Clone)]
pub struct SessionGate {
    enabled: bool,
    timezone: Tz,
    open: NaiveTime,
    close: NaiveTime,
}

impl SessionGate {
    /// # Errors
    /// Returns an error if the timezone or session times are invalid.
    pub fn from_config(config: &SessionConfig) -> Result<Self> {
        let (open, close) = config.window()?;
        Ok(Self {
            enabled: config.market_hours_only,
            timezone: config.timezone()?,
            open,
            close,
        })
    }

    /// A gate that never closes.
    #[must_use]
    pub fn always_open() -> Self {
        Self {
            enabled: false,
            timezone: Tz::UTC,
            open: NaiveTime::MIN,
            close: NaiveTime::MIN,
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        if !self.enabled {
            return true;
        }

        let local = now.with_timezone(&self.timezone);
        if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
            return false;
        }

        let time = local.time();
        self.open <= time && time <= self.close
    }
}
