// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted mock for the language model.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use fixline_core::types::{ModelReply, ModelRequest, ToolCall};
use fixline_core::{AdapterType, FixlineError, HealthStatus, LanguageModel, PluginAdapter};

/// Language model that replays a scripted sequence of replies.
///
/// An exhausted script yields an empty text reply rather than an error, so
/// trailing turns in a test do not need explicit scripting.
#[derive(Default)]
pub struct MockModel {
    script: Mutex<VecDeque<ModelReply>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl MockModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a plain text reply.
    pub fn push_text(&self, text: &str) {
        self.script
            .lock()
            .expect("mock lock poisoned")
            .push_back(ModelReply {
                text: Some(text.to_string()),
                tool_calls: Vec::new(),
            });
    }

    /// Queue a reply consisting of tool invocations (optionally with text).
    pub fn push_tool_calls(&self, text: Option<&str>, calls: Vec<(&str, serde_json::Value)>) {
        let tool_calls = calls
            .into_iter()
            .enumerate()
            .map(|(i, (name, arguments))| ToolCall {
                id: format!("toolu_{i}"),
                name: name.to_string(),
                arguments,
            })
            .collect();
        self.script
            .lock()
            .expect("mock lock poisoned")
            .push_back(ModelReply {
                text: text.map(str::to_string),
                tool_calls,
            });
    }

    /// Every request seen so far, for asserting on history windows and tool
    /// catalogs.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().expect("mock lock poisoned").clone()
    }
}

#[async_trait]
impl PluginAdapter for MockModel {
    fn name(&self) -> &str {
        "mock-model"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Model
    }

    async fn health_check(&self) -> Result<HealthStatus, FixlineError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), FixlineError> {
        Ok(())
    }
}

#[async_trait]
impl LanguageModel for MockModel {
    async fn complete(&self, request: ModelRequest) -> Result<ModelReply, FixlineError> {
        self.requests
            .lock()
            .expect("mock lock poisoned")
            .push(request);
        let reply = self
            .script
            .lock()
            .expect("mock lock poisoned")
            .pop_front()
            .unwrap_or_default();
        Ok(reply)
    }
}
