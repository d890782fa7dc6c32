// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The conversation engine: session lookup, recovery fallback, step handler
//! routing, and delegation of the menu steps to the tool-call dispatcher.
//!
//! Sessions advance only on handler success. A validation failure replies
//! with its corrective message and leaves the step alone; an unrecoverable
//! handler error replies with a generic retry and leaves the session
//! entirely untouched.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, warn};

use fixline_core::types::{Session, SessionContext, User};
use fixline_core::{AccountStatus, EntityGateway, FixlineError, SessionStore, Step};
use fixline_session::{RecoveryEngine, now_rfc3339};
use fixline_tools::{GENERIC_RETRY, ToolDispatcher};

use crate::handlers::handle_step;
use crate::prompts::{INACTIVE_MESSAGE, SUSPENDED_MESSAGE, step_prompt};

/// Handles messages for users at a main-menu step.
///
/// A seam rather than a direct dependency so the engine can be tested with a
/// scripted delegate.
#[async_trait]
pub trait MenuDelegate: Send + Sync {
    async fn process_message(
        &self,
        user: &User,
        text: &str,
        ctx: &mut SessionContext,
    ) -> Result<String, FixlineError>;
}

#[async_trait]
impl MenuDelegate for ToolDispatcher {
    async fn process_message(
        &self,
        user: &User,
        text: &str,
        ctx: &mut SessionContext,
    ) -> Result<String, FixlineError> {
        ToolDispatcher::process_message(self, user, text, ctx).await
    }
}

/// Entry point for every inbound message.
pub struct ConversationEngine {
    entities: Arc<dyn EntityGateway>,
    sessions: Arc<dyn SessionStore>,
    recovery: RecoveryEngine,
    menu: Arc<dyn MenuDelegate>,
    ttl: Duration,
}

impl ConversationEngine {
    pub fn new(
        entities: Arc<dyn EntityGateway>,
        sessions: Arc<dyn SessionStore>,
        menu: Arc<dyn MenuDelegate>,
        ttl: Duration,
    ) -> Self {
        let recovery = RecoveryEngine::new(entities.clone(), sessions.clone(), ttl);
        Self {
            entities,
            sessions,
            recovery,
            menu,
            ttl,
        }
    }

    /// Processes one inbound message and returns the reply to send.
    pub async fn handle_message(&self, phone: &str, text: &str) -> Result<String, FixlineError> {
        let (mut session, rebuilt) = match self.sessions.get(phone).await? {
            Some(session) => (session, false),
            None => (self.recovery.rebuild(phone).await?, true),
        };

        let Some(user) = self.entities.get_user(phone).await? else {
            // The session outlived the account. Drop it and start over.
            self.sessions.del(phone).await?;
            let mut session = self.recovery.rebuild(phone).await?;
            let user = self.entities.get_user(phone).await?.ok_or_else(|| {
                FixlineError::Internal("recovery did not create the user".into())
            })?;
            let reply = step_prompt(self.entities.as_ref(), &user, session.step).await?;
            self.touch(phone, &mut session, text).await?;
            return Ok(reply);
        };

        if rebuilt && !session.step.is_menu() {
            // Re-orient the user at the recovered step instead of
            // interpreting their message against a question they never saw.
            let reply = step_prompt(self.entities.as_ref(), &user, session.step).await?;
            self.touch(phone, &mut session, text).await?;
            return Ok(reply);
        }

        if session.step.is_menu() {
            return self.handle_menu(phone, &user, &mut session, text).await;
        }

        match handle_step(self.entities.as_ref(), &user, session.step, text).await {
            Ok(outcome) => {
                session.step = outcome.next;
                self.touch(phone, &mut session, text).await?;
                // Re-read the user so the next prompt renders fields the
                // handler just wrote.
                let user = self.entities.get_user(phone).await?.unwrap_or(user);
                let prompt =
                    step_prompt(self.entities.as_ref(), &user, outcome.next).await?;
                Ok(match outcome.ack {
                    Some(ack) => format!("{ack}\n\n{prompt}"),
                    None => prompt,
                })
            }
            Err(e) if e.is_recoverable() => {
                // Same step, corrective prompt. Keep the session warm.
                self.touch(phone, &mut session, text).await?;
                Ok(corrective_message(&e))
            }
            Err(e) => {
                error!(phone, step = %session.step, error = %e, "step handler failed");
                Ok(GENERIC_RETRY.to_string())
            }
        }
    }

    async fn handle_menu(
        &self,
        phone: &str,
        user: &User,
        session: &mut Session,
        text: &str,
    ) -> Result<String, FixlineError> {
        // A durable suspension overrides a stale menu session.
        if user.status != AccountStatus::Active {
            let (step, message) = match user.status {
                AccountStatus::Suspended => (Step::Suspended, SUSPENDED_MESSAGE),
                _ => (Step::Inactive, INACTIVE_MESSAGE),
            };
            session.step = step;
            self.touch(phone, session, text).await?;
            return Ok(message.to_string());
        }

        let mut ctx = session.context.clone();
        match self.menu.process_message(user, text, &mut ctx).await {
            Ok(reply) => {
                if self.entities.get_user(phone).await?.is_none() {
                    // Account deleted during this turn; the next message
                    // starts onboarding from scratch.
                    self.sessions.del(phone).await?;
                } else {
                    session.context = ctx;
                    self.touch(phone, session, text).await?;
                }
                Ok(reply)
            }
            Err(e) => {
                warn!(phone, error = %e, "menu dispatch failed");
                Ok(GENERIC_RETRY.to_string())
            }
        }
    }

    async fn touch(
        &self,
        phone: &str,
        session: &mut Session,
        text: &str,
    ) -> Result<(), FixlineError> {
        session.message = text.to_string();
        session.last_activity = now_rfc3339();
        self.sessions.set(phone, session, self.ttl).await
    }
}

/// User-facing line for a recoverable handler failure.
fn corrective_message(error: &FixlineError) -> String {
    match error {
        FixlineError::Validation { message } => message.clone(),
        FixlineError::NotFound { entity, key } => {
            format!("We could not find that {entity} ({key}).")
        }
        other => other.to_string(),
    }
}
