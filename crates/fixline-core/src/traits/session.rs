// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session store trait: ephemeral key-value storage with expiry.
//!
//! One session per phone; writes are last-write-wins. A `get` after the TTL
//! elapses returns `None`, and callers fall back to the recovery engine.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::FixlineError;
use crate::traits::adapter::PluginAdapter;
use crate::types::Session;

/// Ephemeral phone -> session mapping, TTL-bound.
#[async_trait]
pub trait SessionStore: PluginAdapter {
    /// Returns the live session for a phone, or `None` if absent or expired.
    async fn get(&self, phone: &str) -> Result<Option<Session>, FixlineError>;

    /// Writes a session with the given TTL, replacing any existing one.
    async fn set(
        &self,
        phone: &str,
        session: &Session,
        ttl: Duration,
    ) -> Result<(), FixlineError>;

    /// Removes a session if present.
    async fn del(&self, phone: &str) -> Result<(), FixlineError>;
}
