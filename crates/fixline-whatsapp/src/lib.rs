// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp Cloud API channel adapter.
//!
//! Inbound: an axum webhook server that verifies Meta's handshake and
//! payload signatures, normalizes messages to plain text, and hands them to
//! an [`InboundHandler`]. Outbound: [`WhatsAppSender`] implements the
//! messaging gateway over the Cloud API send endpoint.

pub mod sender;
pub mod signature;
pub mod types;
pub mod webhook;

pub use sender::WhatsAppSender;
pub use webhook::{InboundHandler, WebhookState, router, serve};
