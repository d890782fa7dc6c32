// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Fixline service-matching agent.
//!
//! Every catch boundary in the workspace converts lower-level failures into
//! one of these variants. `Validation`, `NotFound`, and `ToolExecution` are
//! recoverable and carry user-facing messages; `Transient` failures are
//! retried only by the job queue's own backoff; everything else surfaces as
//! a generic "try again" reply without mutating conversation state.

use thiserror::Error;

/// The primary error type used across all Fixline adapter traits and core operations.
#[derive(Debug, Error)]
pub enum FixlineError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed or out-of-range user input. Recoverable: re-prompt on the same step.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A referenced durable entity is missing. Recoverable: user-facing message, no state advance.
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// A domain operation behind a tool call failed. Reported per-call; sibling calls unaffected.
    #[error("tool '{tool}' failed: {message}")]
    ToolExecution { tool: String, message: String },

    /// A store, queue, or model call failed transiently. Retried by queue backoff
    /// for background work; surfaced as a generic retry for synchronous paths.
    #[error("transient error: {message}")]
    Transient {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Messaging gateway errors (send failure, webhook format, rate limiting).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Language model service errors (API failure, malformed reply).
    #[error("model error: {message}")]
    Model {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors (contract violations, corrupted entities).
    #[error("internal error: {0}")]
    Internal(String),
}

impl FixlineError {
    /// Shorthand for a validation failure with a user-facing message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Returns true if this error should re-prompt the user on the same step.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. } | Self::NotFound { .. } | Self::ToolExecution { .. }
        )
    }
}
