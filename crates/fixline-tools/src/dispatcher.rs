// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The tool-call dispatcher behind the main-menu steps.
//!
//! One inbound message becomes one model completion over a bounded history
//! window plus the account-specific tool catalog. Tool invocations execute
//! independently; a failed call is reported in its own section of the reply
//! and never aborts its siblings. The full turn (user message and final
//! reply) is appended to durable history on every path, including failures.

use std::sync::Arc;

use tracing::{error, warn};
use uuid::Uuid;

use fixline_core::types::{ModelMessage, ModelRequest, ModelReply, SessionContext, Turn, User};
use fixline_core::{AccountType, EntityGateway, FixlineError, LanguageModel};

use crate::catalog::tool_catalog;
use crate::executor::{ToolExecutor, now_rfc3339};

/// Reply used when the model or an unrecoverable backend fails mid-turn.
pub const GENERIC_RETRY: &str =
    "Sorry, something went wrong on our side. Please try again in a moment.";

/// Reply when the model returns neither text nor tool calls.
const EMPTY_REPLY_FALLBACK: &str =
    "I'm not sure how to help with that. You can ask to see your bookings or \
     request a service.";

const DEFAULT_SYSTEM_PROMPT: &str = "You are Fixline, a service-matching assistant on a chat \
     transport. Use the provided tools for anything involving categories, services, bookings, \
     candidates, profiles, or account deletion. Never invent category or service codes; look \
     them up. Keep replies short and plain text, suitable for a phone chat.";

/// Routes main-menu messages through the language model and tool executors.
pub struct ToolDispatcher {
    entities: Arc<dyn EntityGateway>,
    model: Arc<dyn LanguageModel>,
    executor: ToolExecutor,
    system_prompt: String,
    history_window: i64,
}

impl ToolDispatcher {
    pub fn new(
        entities: Arc<dyn EntityGateway>,
        model: Arc<dyn LanguageModel>,
        executor: ToolExecutor,
        system_prompt: Option<String>,
        history_window: i64,
    ) -> Self {
        Self {
            entities,
            model,
            executor,
            system_prompt: system_prompt.unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            history_window,
        }
    }

    /// Handles one main-menu message and returns the reply text.
    ///
    /// `ctx` is the caller's session context; executors may update it but the
    /// conversation step itself is owned by the caller.
    pub async fn process_message(
        &self,
        user: &User,
        text: &str,
        ctx: &mut SessionContext,
    ) -> Result<String, FixlineError> {
        let turns = self
            .entities
            .recent_turns(&user.phone, self.history_window)
            .await?;
        let mut history: Vec<ModelMessage> = turns
            .into_iter()
            .map(|t| ModelMessage {
                role: t.role,
                content: t.content,
            })
            .collect();
        history.push(ModelMessage {
            role: "user".to_string(),
            content: text.to_string(),
        });

        let account_type = user.account_type.unwrap_or(AccountType::Client);
        let request = ModelRequest {
            system_prompt: self.system_prompt.clone(),
            history,
            tools: tool_catalog(account_type),
        };

        let reply_text = match self.model.complete(request).await {
            Ok(reply) => self.resolve(user, reply, ctx).await,
            Err(e) => {
                warn!(phone = %user.phone, error = %e, "model completion failed");
                GENERIC_RETRY.to_string()
            }
        };

        // The tools above have already committed their writes; a history
        // failure must not turn a delivered outcome into a retry prompt.
        if let Err(e) = self.record_history(&user.phone, text, &reply_text).await {
            warn!(phone = %user.phone, error = %e, "history append failed, replying anyway");
        }

        Ok(reply_text)
    }

    async fn record_history(
        &self,
        phone: &str,
        text: &str,
        reply_text: &str,
    ) -> Result<(), FixlineError> {
        self.record_turn(phone, "user", text).await?;
        self.record_turn(phone, "assistant", reply_text).await?;
        self.entities.trim_turns(phone, self.history_window).await
    }

    /// Executes tool calls independently and assembles the reply sections.
    /// When every invocation fails, the reply is the error lines alone.
    async fn resolve(&self, user: &User, reply: ModelReply, ctx: &mut SessionContext) -> String {
        if reply.tool_calls.is_empty() {
            return reply
                .text
                .unwrap_or_else(|| EMPTY_REPLY_FALLBACK.to_string());
        }

        let mut sections: Vec<String> = Vec::new();
        let mut failures: Vec<String> = Vec::new();
        for call in &reply.tool_calls {
            match self.executor.execute(user, call, ctx).await {
                Ok(outcome) => sections.push(outcome.text),
                Err(e) if e.is_recoverable() => failures.push(user_message(&e)),
                Err(e) => {
                    error!(phone = %user.phone, tool = %call.name, error = %e, "tool failed");
                    failures.push(format!(
                        "Something went wrong handling {}. Please try again.",
                        call.name
                    ));
                }
            }
        }

        if sections.is_empty() {
            return failures.join("\n");
        }
        let mut parts: Vec<String> = Vec::new();
        if let Some(text) = reply.text {
            if !text.trim().is_empty() {
                parts.push(text);
            }
        }
        parts.extend(sections);
        parts.extend(failures);
        parts.join("\n\n")
    }

    async fn record_turn(
        &self,
        phone: &str,
        role: &str,
        content: &str,
    ) -> Result<(), FixlineError> {
        let turn = Turn {
            id: Uuid::new_v4().to_string(),
            phone: phone.to_string(),
            role: role.to_string(),
            content: content.to_string(),
            created_at: now_rfc3339(),
        };
        self.entities.append_turn(&turn).await
    }
}

/// User-facing line for a recoverable per-call failure.
fn user_message(error: &FixlineError) -> String {
    match error {
        FixlineError::Validation { message } => message.clone(),
        FixlineError::ToolExecution { message, .. } => message.clone(),
        FixlineError::NotFound { entity, key } => {
            format!("We could not find that {entity} ({key}).")
        }
        other => other.to_string(),
    }
}
