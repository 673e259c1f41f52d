use crate::alert_log::AlertLog;
use crate::twilio::TwilioTransport;
use anyhow::Result;
use async_trait::async_trait;
use price_alert_core::{AlertSink, AlertTransport, AppConfig, Delivery};
use std::sync::Arc;

/// The service's alert sink.
///
/// Always records the message locally; additionally forwards it to the
/// transport when one is configured.
#[derive(Clone)]
pub struct Notifier {
    transport: Option<Arc<dyn AlertTransport>>,
    log: AlertLog,
}

impl Notifier {
    #[must_use]
    pub fn new(transport: Option<Arc<dyn AlertTransport>>, log: AlertLog) -> Self {
        Self { transport, log }
    }

    /// A notifier that only records locally.
    #[must_use]
    pub fn local_only() -> Self {
        Self::new(None, AlertLog::default())
    }

    /// Builds the notifier from configuration, with SMS delivery when all
    /// credentials are present.
    ///
    /// # Errors
    /// Returns an error if the SMS client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let transport: Option<Arc<dyn AlertTransport>> = match config.sms_credentials() {
            Some(sms) => {
                tracing::info!("SMS alerts enabled");
                Some(Arc::new(TwilioTransport::new(sms)?))
            }
            None => {
                tracing::info!("SMS alerts not configured, alerts are recorded locally only");
                None
            }
        };
        Ok(Self::new(transport, AlertLog::default()))
    }

    #[must_use]
    pub const fn log(&self) -> &AlertLog {
        &self.log
    }

    #[must_use]
    pub fn transport_name(&self) -> Option<&str> {
        self.transport.as_deref().map(|t| t.name())
    }
}

#[async_trait]
impl AlertSink for Notifier {
    async fn notify(&self, message: &str) -> Delivery {
        tracing::info!("[ALERT] {}", message);

        let delivery = match &self.transport {
            Some(transport) => match transport.send(message).await {
                Ok(()) => Delivery::Sent,
                Err(e) => {
                    tracing::warn!(
                        "Alert transport {} failed, recorded locally only: {}",
                        transport.name(),
                        e
                    );
                    Delivery::RecordedLocally {
                        reason: e.to_string(),
                    }
                }
            },
            None => Delivery::RecordedLocally {
                reason: "no alert transport configured".to_string(),
            },
        };

        self.log.record(message, delivery.clone());
        delivery
    }
}
