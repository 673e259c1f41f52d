use crate::config::AlertConfig;
use crate::config_loader::ConfigLoader;
use anyhow::Result;
use notify::{Event, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::watch;

/// Republishes the alert section of the config file whenever it changes.
///
/// Only alert rules are hot-reloaded; everything else (symbols, server,
/// database) still needs a restart.
pub struct ConfigWatcher {
    tx: watch::Sender<AlertConfig>,
}

impl ConfigWatcher {
    /// Creates a new configuration watcher with the initial alert rules.
    ///
    /// Returns a tuple of the watcher and a receiver for alert rule updates.
    #[must_use]
    pub fn new(initial: AlertConfig) -> (Self, watch::Receiver<AlertConfig>) {
        let (tx, rx) = watch::channel(initial);
        (Self { tx }, rx)
    }

    /// Reloads `config_path` and publishes its alert rules if they differ
    /// from the current ones. Returns whether anything was published.
    ///
    /// # Errors
    ///
    /// Returns an error if the file no longer parses or validates; the
    /// previously published rules stay in effect.
    pub fn reload(&self, config_path: &Path) -> Result<bool> {
        let alerts = ConfigLoader::load_from(config_path)?.alerts;
        Ok(self.tx.send_if_modified(|current| {
            if *current == alerts {
                false
            } else {
                *current = alerts;
                true
            }
        }))
    }

    /// Watches the configuration file for changes and broadcasts updates.
    ///
    /// # Errors
    ///
    /// Returns an error if file watching cannot be initiated or if the watcher task fails.
    pub async fn watch(self, config_path: impl Into<PathBuf>) -> Result<()> {
        let config_path = config_path.into();

        tokio::task::spawn_blocking(move || {
            let (notify_tx, notify_rx) = std::sync::mpsc::channel();

            let mut watcher = notify::recommended_watcher(move |res: Result<Event, _>| {
                if let Ok(event) = res {
                    let _ = notify_tx.send(event);
                }
            })?;

            watcher.watch(&config_path, RecursiveMode::NonRecursive)?;
            tracing::info!("Watching {} for alert rule changes", config_path.display());

            for event in notify_rx {
                if event.kind.is_modify() {
                    tracing::info!("Config file changed, reloading alert rules...");
                    match self.reload(&config_path) {
                        Ok(true) => tracing::info!("Alert rules reloaded"),
                        Ok(false) => tracing::debug!("Alert rules unchanged"),
                        Err(e) => {
                            tracing::error!("Failed to reload config, keeping previous rules: {e:#}");
                        }
                    }
                }
            }

            Ok::<_, anyhow::Error>(())
        })
        .await??;

        Ok(())
    }
}
