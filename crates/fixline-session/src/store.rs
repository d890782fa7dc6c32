// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory session store with per-entry TTL.
//!
//! Expiry is checked lazily on `get`; an expired entry is removed and
//! reported as absent, which sends the caller through the recovery engine.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use fixline_core::types::Session;
use fixline_core::{AdapterType, FixlineError, HealthStatus, PluginAdapter, SessionStore};

struct Entry {
    session: Session,
    expires_at: Instant,
}

/// Process-local phone -> session map. Writes are last-write-wins.
#[derive(Default)]
pub struct InMemorySessionStore {
    entries: DashMap<String, Entry>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (possibly stale) entries, for diagnostics.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl PluginAdapter for InMemorySessionStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::SessionStore
    }

    async fn health_check(&self) -> Result<HealthStatus, FixlineError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), FixlineError> {
        self.entries.clear();
        Ok(())
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, phone: &str) -> Result<Option<Session>, FixlineError> {
        if let Some(entry) = self.entries.get(phone) {
            if entry.expires_at > Instant::now() {
                return Ok(Some(entry.session.clone()));
            }
        } else {
            return Ok(None);
        }
        // Entry exists but is stale; drop it outside the read guard.
        self.entries.remove(phone);
        Ok(None)
    }

    async fn set(&self, phone: &str, session: &Session, ttl: Duration) -> Result<(), FixlineError> {
        self.entries.insert(
            phone.to_string(),
            Entry {
                session: session.clone(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn del(&self, phone: &str) -> Result<(), FixlineError> {
        self.entries.remove(phone);
        Ok(())
    }
}
