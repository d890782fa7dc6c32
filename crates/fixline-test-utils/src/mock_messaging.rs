// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recording mock for the messaging gateway.

use std::sync::Mutex;

use async_trait::async_trait;

use fixline_core::{AdapterType, FixlineError, HealthStatus, MessagingGateway, PluginAdapter};

/// One recorded outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentMessage {
    Text {
        phone: String,
        text: String,
    },
    Image {
        phone: String,
        url: String,
        caption: Option<String>,
    },
    Template {
        phone: String,
        template_id: String,
        params: Vec<String>,
    },
}

/// Messaging gateway that records sends instead of delivering them.
#[derive(Default)]
pub struct MockMessaging {
    sent: Mutex<Vec<SentMessage>>,
    fail_sends: Mutex<bool>,
}

impl MockMessaging {
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages sent so far, in order.
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().expect("mock lock poisoned").clone()
    }

    /// Text bodies sent to a specific phone, in order.
    pub fn texts_to(&self, phone: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|m| match m {
                SentMessage::Text { phone: p, text } if p == phone => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Make every subsequent send fail with a channel error.
    pub fn fail_next_sends(&self, fail: bool) {
        *self.fail_sends.lock().expect("mock lock poisoned") = fail;
    }

    fn record(&self, message: SentMessage) -> Result<(), FixlineError> {
        if *self.fail_sends.lock().expect("mock lock poisoned") {
            return Err(FixlineError::Channel {
                message: "mock send failure".into(),
                source: None,
            });
        }
        self.sent.lock().expect("mock lock poisoned").push(message);
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for MockMessaging {
    fn name(&self) -> &str {
        "mock-messaging"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Messaging
    }

    async fn health_check(&self) -> Result<HealthStatus, FixlineError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), FixlineError> {
        Ok(())
    }
}

#[async_trait]
impl MessagingGateway for MockMessaging {
    async fn send_text(&self, phone: &str, text: &str) -> Result<(), FixlineError> {
        self.record(SentMessage::Text {
            phone: phone.to_string(),
            text: text.to_string(),
        })
    }

    async fn send_image(
        &self,
        phone: &str,
        url: &str,
        caption: Option<&str>,
    ) -> Result<(), FixlineError> {
        self.record(SentMessage::Image {
            phone: phone.to_string(),
            url: url.to_string(),
            caption: caption.map(str::to_string),
        })
    }

    async fn send_template(
        &self,
        phone: &str,
        template_id: &str,
        params: &[String],
    ) -> Result<(), FixlineError> {
        self.record(SentMessage::Template {
            phone: phone.to_string(),
            template_id: template_id.to_string(),
            params: params.to_vec(),
        })
    }
}
