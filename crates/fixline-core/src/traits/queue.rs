// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Job queue trait: an at-least-once background task primitive.
//!
//! `enqueue` is fire-and-forget from the caller's perspective. Workers poll
//! `dequeue`, then `ack` on success or `fail` to trigger queue-level retry
//! (bounded by `max_attempts`). Delayed entries become visible once their
//! `available_at` passes.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::FixlineError;
use crate::traits::adapter::PluginAdapter;
use crate::types::QueueEntry;

/// Durable at-least-once job queue.
#[async_trait]
pub trait JobQueue: PluginAdapter {
    /// Enqueues a payload, optionally delayed. Returns the queue entry id.
    async fn enqueue(
        &self,
        queue_name: &str,
        payload: &str,
        delay: Option<Duration>,
    ) -> Result<i64, FixlineError>;

    /// Atomically claims the next available pending entry, or `None`.
    async fn dequeue(&self, queue_name: &str) -> Result<Option<QueueEntry>, FixlineError>;

    /// Acknowledges successful processing.
    async fn ack(&self, id: i64) -> Result<(), FixlineError>;

    /// Marks an entry failed; re-pends it unless `max_attempts` is reached.
    async fn fail(&self, id: i64) -> Result<(), FixlineError>;
}
