// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `LanguageModel` implementation backed by [`AnthropicClient`].

use async_trait::async_trait;
use tracing::debug;

use fixline_config::model::ModelConfig;
use fixline_core::types::{ModelReply, ModelRequest, ToolCall};
use fixline_core::{AdapterType, FixlineError, HealthStatus, LanguageModel, PluginAdapter};

use crate::client::AnthropicClient;
use crate::types::{ApiMessage, MessageRequest, ResponseContentBlock, ToolDefinition};

/// Messages API version header value.
const API_VERSION: &str = "2023-06-01";

/// Language model adapter for Anthropic Claude.
pub struct AnthropicModel {
    client: AnthropicClient,
    model: String,
    max_tokens: u32,
}

impl AnthropicModel {
    /// Build from configuration. The API key comes from config or, failing
    /// that, the `ANTHROPIC_API_KEY` environment variable.
    pub fn from_config(config: &ModelConfig) -> Result<Self, FixlineError> {
        let api_key = match &config.api_key {
            Some(key) => key.clone(),
            None => std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
                FixlineError::Config(
                    "model.api_key not set and ANTHROPIC_API_KEY is absent".to_string(),
                )
            })?,
        };
        let client = AnthropicClient::new(&api_key, API_VERSION)?;
        Ok(Self {
            client,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    /// Build around an existing client (used by tests with wiremock).
    pub fn with_client(client: AnthropicClient, model: String, max_tokens: u32) -> Self {
        Self {
            client,
            model,
            max_tokens,
        }
    }
}

#[async_trait]
impl PluginAdapter for AnthropicModel {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Model
    }

    async fn health_check(&self) -> Result<HealthStatus, FixlineError> {
        // No cheap ping endpoint; a constructed client is considered healthy.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), FixlineError> {
        Ok(())
    }
}

#[async_trait]
impl LanguageModel for AnthropicModel {
    async fn complete(&self, request: ModelRequest) -> Result<ModelReply, FixlineError> {
        let messages = request
            .history
            .into_iter()
            .map(|m| ApiMessage {
                role: m.role,
                content: m.content,
            })
            .collect();

        let tools = if request.tools.is_empty() {
            None
        } else {
            Some(
                request
                    .tools
                    .into_iter()
                    .map(|t| ToolDefinition {
                        name: t.name,
                        description: t.description,
                        input_schema: t.input_schema,
                    })
                    .collect(),
            )
        };

        let api_request = MessageRequest {
            model: self.model.clone(),
            messages,
            system: Some(request.system_prompt),
            max_tokens: self.max_tokens,
            tools,
        };

        let response = self.client.complete_message(&api_request).await?;
        debug!(
            model = %response.model,
            stop_reason = ?response.stop_reason,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "completion finished"
        );

        let mut reply = ModelReply::default();
        let mut text_parts: Vec<String> = Vec::new();
        for block in response.content {
            match block {
                ResponseContentBlock::Text { text } => text_parts.push(text),
                ResponseContentBlock::ToolUse { id, name, input } => {
                    reply.tool_calls.push(ToolCall {
                        id,
                        name,
                        arguments: input,
                    });
                }
            }
        }
        if !text_parts.is_empty() {
            reply.text = Some(text_parts.join("\n"));
        }
        Ok(reply)
    }
}
