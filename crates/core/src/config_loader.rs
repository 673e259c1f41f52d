use crate::config::AppConfig;
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "config/Config.toml";
pub const ENV_PREFIX: &str = "PRICE_ALERT_";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration from the default path and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be parsed or is invalid.
    pub fn load() -> Result<AppConfig> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Loads application configuration by merging a TOML file (optional) with
    /// `PRICE_ALERT_`-prefixed environment variables, then normalizes and
    /// validates it.
    ///
    /// # Errors
    ///
    /// Returns an error if a value has the wrong type (for example a
    /// non-numeric threshold) or fails validation.
    pub fn load_from(path: impl AsRef<Path>) -> Result<AppConfig> {
        let path = path.as_ref();
        Self::extract(
            Figment::new()
                .merge(Toml::file(path))
                .merge(Env::prefixed(ENV_PREFIX).split("__")),
        )
        .with_context(|| format!("invalid configuration (file: {})", path.display()))
    }

    /// Loads configuration from the TOML file only, ignoring the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or is invalid.
    pub fn load_file(path: impl AsRef<Path>) -> Result<AppConfig> {
        Self::extract(Figment::new().merge(Toml::file(path.as_ref())))
    }

    fn extract(figment: Figment) -> Result<AppConfig> {
        let mut config: AppConfig = figment.extract()?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }
}
