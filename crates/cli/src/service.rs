//! Wiring for the long-running service.

use anyhow::{Context, Result};
use price_alert_core::{
    AlertDedupCache, AlertSink, AppConfig, ConfigLoader, ConfigWatcher, PriceHistoryStore,
    SessionGate, ThresholdResolver,
};
use price_alert_data::Database;
use price_alert_market_data::YahooFinanceClient;
use price_alert_monitor::{spawn_monitor, PollingCycle};
use price_alert_notifier::Notifier;
use price_alert_web_api::{ApiServer, AppState};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// Builds a polling cycle from configuration.
///
/// # Errors
/// Returns an error if the market data client or session gate cannot be built.
pub fn build_cycle(
    config: &AppConfig,
    store: Arc<dyn PriceHistoryStore>,
    sink: Arc<dyn AlertSink>,
    thresholds: ThresholdResolver,
    gate: SessionGate,
) -> Result<PollingCycle> {
    let source = Arc::new(YahooFinanceClient::new(&config.market_data)?);
    Ok(PollingCycle::new(
        config.monitor.symbols.clone(),
        source,
        store,
        sink,
        thresholds,
        gate,
        AlertDedupCache::new(),
    ))
}

/// Runs the monitor and HTTP API until SIGINT or SIGTERM.
///
/// # Errors
/// Returns an error if configuration, storage, or the HTTP listener fail at
/// startup, or if the server stops unexpectedly.
pub async fn run_service(config_path: &str) -> Result<()> {
    tracing::info!("Starting price alert service with config: {}", config_path);

    let config = ConfigLoader::load_from(config_path)?;
    let database = Database::connect(&config.database).await?;
    let notifier = Notifier::from_config(&config)?;
    let store: Arc<dyn PriceHistoryStore> = Arc::new(database.prices());
    let sink: Arc<dyn AlertSink> = Arc::new(notifier);

    let (watcher, alerts_rx) = ConfigWatcher::new(config.alerts.clone());
    let watcher_handle = if Path::new(config_path).exists() {
        let path = config_path.to_string();
        Some(tokio::spawn(async move {
            if let Err(e) = watcher.watch(path).await {
                tracing::error!("Config watcher stopped: {:#}", e);
            }
        }))
    } else {
        tracing::warn!(
            "Config file {} not found, threshold hot reload disabled",
            config_path
        );
        None
    };

    let cycle = build_cycle(
        &config,
        store.clone(),
        sink.clone(),
        ThresholdResolver::new(alerts_rx),
        SessionGate::from_config(&config.session)?,
    )?;
    let poll_interval = Duration::from_secs(config.monitor.poll_interval_secs);
    let (monitor, monitor_task) = spawn_monitor(cycle, Some(poll_interval));

    let state = AppState::new(
        store,
        sink,
        monitor.clone(),
        &config.monitor.symbols,
        config.session.market_hours_only,
    );
    let server = ApiServer::new(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let mut server_handle = tokio::spawn(async move {
        server
            .serve_with_shutdown(&addr, async {
                let _ = stop_rx.await;
            })
            .await
    });

    tokio::select! {
        () = shutdown_signal() => {}
        result = &mut server_handle => {
            monitor.shutdown().await.ok();
            return match result.context("Web API task panicked")? {
                Ok(()) => Err(anyhow::anyhow!("Web API stopped unexpectedly")),
                Err(e) => Err(e.context("Web API failed")),
            };
        }
    }

    tracing::info!("Stopping monitor...");
    if let Err(e) = monitor.shutdown().await {
        tracing::error!("Error during monitor shutdown: {}", e);
    }
    match monitor_task.await {
        Ok(Err(e)) => tracing::error!("Monitor error: {:#}", e),
        Err(e) => tracing::error!("Monitor task failed: {}", e),
        Ok(Ok(())) => {}
    }

    let _ = stop_tx.send(());
    match server_handle.await {
        Ok(Err(e)) => tracing::error!("Server error: {:#}", e),
        Err(e) => tracing::error!("Server task failed: {}", e),
        Ok(Ok(())) => {}
    }

    if let Some(handle) = watcher_handle {
        handle.abort();
    }

    tracing::info!("Price alert service stopped");
    Ok(())
}

async fn shutdown_signal() {
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .expect("Failed to create SIGTERM handler");

    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
        .expect("Failed to create SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
        }
    }
}
