// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Language model trait: a single blocking completion call.
//!
//! The model is a black box: prompt, history, and tool catalog in; either
//! plain text or a list of structured tool invocations out. No streaming
//! semantics are required by the core.

use async_trait::async_trait;

use crate::error::FixlineError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ModelReply, ModelRequest};

/// The language model collaborator.
#[async_trait]
pub trait LanguageModel: PluginAdapter {
    /// Sends the prompt, bounded history, and tool catalog; returns the
    /// model's text and/or tool invocations.
    async fn complete(&self, request: ModelRequest) -> Result<ModelReply, FixlineError>;
}
