// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messaging gateway trait for the chat transport (WhatsApp-style).
//!
//! All sends are fire-and-forget from the core's perspective: delivery is
//! at-least-once and no acknowledgement is processed.

use async_trait::async_trait;

use crate::error::FixlineError;
use crate::traits::adapter::PluginAdapter;

/// Outbound side of the chat transport.
#[async_trait]
pub trait MessagingGateway: PluginAdapter {
    /// Sends a plain text message to the given phone number.
    async fn send_text(&self, phone: &str, text: &str) -> Result<(), FixlineError>;

    /// Sends an image by URL with an optional caption.
    async fn send_image(
        &self,
        phone: &str,
        url: &str,
        caption: Option<&str>,
    ) -> Result<(), FixlineError>;

    /// Sends a pre-approved message template with positional parameters.
    async fn send_template(
        &self,
        phone: &str,
        template_id: &str,
        params: &[String],
    ) -> Result<(), FixlineError>;
}
