// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The conversation state engine.
//!
//! Every inbound message resolves to a session (live or rebuilt from durable
//! entities), runs the handler for its step, and produces exactly one reply.
//! The two main-menu steps delegate to the tool-call dispatcher through the
//! [`MenuDelegate`] seam.

pub mod engine;
pub mod handlers;
pub mod prompts;
pub mod validate;

pub use engine::{ConversationEngine, MenuDelegate};
pub use handlers::HandlerOutcome;
