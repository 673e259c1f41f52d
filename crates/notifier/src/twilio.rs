use anyhow::{Context, Result};
use async_trait::async_trait;
use price_alert_core::{AlertTransport, NotifyError, SmsConfig};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

/// SMS delivery through the Twilio Messages API.
pub struct TwilioTransport {
    http_client: Client,
    api_url: String,
    account_sid: String,
    auth_token: SecretString,
    from: String,
    to: String,
}

impl TwilioTransport {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &SmsConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build SMS HTTP client")?;

        Ok(Self {
            http_client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            account_sid: config.account_sid.clone(),
            auth_token: SecretString::from(config.auth_token.clone()),
            from: config.from.clone(),
            to: config.to.clone(),
        })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_url, self.account_sid
        )
    }
}

#[async_trait]
impl AlertTransport for TwilioTransport {
    fn name(&self) -> &str {
        "twilio-sms"
    }

    async fn send(&self, message: &str) -> Result<(), NotifyError> {
        let response = self
            .http_client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()))
            .form(&[
                ("To", self.to.as_str()),
                ("From", self.from.as_str()),
                ("Body", message),
            ])
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!("SMS alert accepted by Twilio ({})", status);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport_for(server: &MockServer) -> TwilioTransport {
        TwilioTransport::new(&SmsConfig {
            account_sid: "AC123".to_string(),
            auth_token: "token".to_string(),
            from: "+15550000000".to_string(),
            to: "+15551111111".to_string(),
            api_url: server.uri(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_send_posts_form_with_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2010-04-01/Accounts/AC123/Messages.json"))
            .and(header_exists("authorization"))
            .and(body_string_contains("Body=AAPL+crossed+150.00"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"sid": "SM1"})))
            .expect(1)
            .mount(&server)
            .await;

        transport_for(&server)
            .send("AAPL crossed 150.00")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_rejected_message_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
            .mount(&server)
            .await;

        let err = transport_for(&server).send("hi").await.unwrap_err();
        match err {
            NotifyError::Rejected { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "bad credentials");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
