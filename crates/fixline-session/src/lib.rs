// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ephemeral conversation sessions and durable-state recovery.
//!
//! Sessions live in process memory with a TTL; they are a cache over the
//! durable entities, never the source of truth. When a session is missing
//! or expired, the [`RecoveryEngine`] rebuilds the conversation step from
//! whatever the durable store has already collected, so a restart or cache
//! loss costs the user at most one re-prompt, never a restart of onboarding.

pub mod recovery;
pub mod store;

pub use recovery::{derive_step, Recovered, RecoveryEngine};
pub use store::InMemorySessionStore;

/// Current time as an RFC 3339 string with millisecond precision, matching
/// the storage layer's `strftime` format.
pub fn now_rfc3339() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}
