// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound messaging through the WhatsApp Cloud API.
//!
//! Handles request construction, authentication, and transient error retry.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::json;
use tracing::{debug, warn};

use fixline_config::model::WhatsAppConfig;
use fixline_core::{AdapterType, FixlineError, HealthStatus, MessagingGateway, PluginAdapter};

/// Default Cloud API base; the send endpoint is `{base}/{phone_number_id}/messages`.
const API_BASE_URL: &str = "https://graph.facebook.com/v21.0";

/// WhatsApp Cloud API sender.
///
/// Retries once after a 1-second delay on transient errors (429, 5xx).
#[derive(Debug)]
pub struct WhatsAppSender {
    client: reqwest::Client,
    base_url: String,
    phone_number_id: String,
    max_retries: u32,
}

impl WhatsAppSender {
    /// Builds a sender from configuration. Requires `access_token` and
    /// `phone_number_id` to be set.
    pub fn from_config(config: &WhatsAppConfig) -> Result<Self, FixlineError> {
        let access_token = config.access_token.as_deref().ok_or_else(|| {
            FixlineError::Config("whatsapp.access_token is required for sending".into())
        })?;
        let phone_number_id = config.phone_number_id.clone().ok_or_else(|| {
            FixlineError::Config("whatsapp.phone_number_id is required for sending".into())
        })?;

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {access_token}"))
            .map_err(|e| FixlineError::Config(format!("invalid access token: {e}")))?;
        auth.set_sensitive(true);
        headers.insert("authorization", auth);
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| FixlineError::Channel {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: config
                .api_base
                .clone()
                .unwrap_or_else(|| API_BASE_URL.to_string()),
            phone_number_id,
            max_retries: 1,
        })
    }

    async fn post_message(&self, body: &serde_json::Value) -> Result<(), FixlineError> {
        let url = format!("{}/{}/messages", self.base_url, self.phone_number_id);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying send after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self
                .client
                .post(&url)
                .json(body)
                .send()
                .await
                .map_err(|e| FixlineError::Channel {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, "send response received");

            if status.is_success() {
                return Ok(());
            }

            let text = response.text().await.unwrap_or_default();
            if is_transient_error(status) && attempt < self.max_retries {
                warn!(status = %status, body = %text, "transient send error, will retry");
                last_error = Some(FixlineError::Channel {
                    message: format!("Cloud API returned {status}: {text}"),
                    source: None,
                });
                continue;
            }

            return Err(FixlineError::Channel {
                message: format!("Cloud API returned {status}: {text}"),
                source: None,
            });
        }

        Err(last_error.unwrap_or_else(|| FixlineError::Channel {
            message: "send failed after retries".into(),
            source: None,
        }))
    }
}

fn is_transient_error(status: reqwest::StatusCode) -> bool {
    status.as_u16() == 429 || status.is_server_error()
}

#[async_trait]
impl PluginAdapter for WhatsAppSender {
    fn name(&self) -> &str {
        "whatsapp"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Messaging
    }

    async fn health_check(&self) -> Result<HealthStatus, FixlineError> {
        // No cheap ping endpoint; a constructed sender is considered healthy.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), FixlineError> {
        Ok(())
    }
}

#[async_trait]
impl MessagingGateway for WhatsAppSender {
    async fn send_text(&self, phone: &str, text: &str) -> Result<(), FixlineError> {
        self.post_message(&json!({
            "messaging_product": "whatsapp",
            "to": phone,
            "type": "text",
            "text": {"body": text}
        }))
        .await
    }

    async fn send_image(
        &self,
        phone: &str,
        url: &str,
        caption: Option<&str>,
    ) -> Result<(), FixlineError> {
        let mut image = json!({"link": url});
        if let Some(caption) = caption {
            image["caption"] = json!(caption);
        }
        self.post_message(&json!({
            "messaging_product": "whatsapp",
            "to": phone,
            "type": "image",
            "image": image
        }))
        .await
    }

    async fn send_template(
        &self,
        phone: &str,
        template_id: &str,
        params: &[String],
    ) -> Result<(), FixlineError> {
        let parameters: Vec<serde_json::Value> = params
            .iter()
            .map(|p| json!({"type": "text", "text": p}))
            .collect();
        self.post_message(&json!({
            "messaging_product": "whatsapp",
            "to": phone,
            "type": "template",
            "template": {
                "name": template_id,
                "language": {"code": "en"},
                "components": [{"type": "body", "parameters": parameters}]
            }
        }))
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sender_for(server: &MockServer) -> WhatsAppSender {
        WhatsAppSender::from_config(&WhatsAppConfig {
            access_token: Some("test-token".into()),
            phone_number_id: Some("10001".into()),
            verify_token: None,
            app_secret: None,
            api_base: Some(server.uri()),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn sends_text_with_bearer_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/10001/messages"))
            .and(header("authorization", "Bearer test-token"))
            .and(body_partial_json(serde_json::json!({
                "messaging_product": "whatsapp",
                "to": "263771234567",
                "type": "text",
                "text": {"body": "hello"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messages": [{"id": "wamid.1"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        sender_for(&server)
            .send_text("263771234567", "hello")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn retries_once_on_500_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/10001/messages"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/10001/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messages": [{"id": "wamid.2"}]
            })))
            .mount(&server)
            .await;

        sender_for(&server).send_text("1", "retry me").await.unwrap();
    }

    #[tokio::test]
    async fn gives_up_on_client_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/10001/messages"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
            .expect(1)
            .mount(&server)
            .await;

        let err = sender_for(&server)
            .send_text("1", "nope")
            .await
            .unwrap_err();
        assert!(matches!(err, FixlineError::Channel { .. }));
        assert!(err.to_string().contains("400"));
    }

    #[tokio::test]
    async fn from_config_requires_credentials() {
        let err = WhatsAppSender::from_config(&WhatsAppConfig::default()).unwrap_err();
        assert!(matches!(err, FixlineError::Config(_)));
    }
}
