// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `fixline serve` command implementation.
//!
//! Wires the full agent together: SQLite entities and queue, in-memory
//! sessions with durable-state recovery, the Anthropic model behind the
//! tool-call dispatcher, the matching worker pool, and the WhatsApp webhook
//! server. Supports graceful shutdown via signal handlers.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use fixline_anthropic::AnthropicModel;
use fixline_config::model::FixlineConfig;
use fixline_core::{EntityGateway, FixlineError, LanguageModel, PluginAdapter};
use fixline_flow::ConversationEngine;
use fixline_match::{MatchPool, MatchWorker};
use fixline_session::InMemorySessionStore;
use fixline_storage::SqliteEntities;
use fixline_tools::{ToolDispatcher, ToolExecutor};
use fixline_whatsapp::{InboundHandler, WebhookState, WhatsAppSender};

/// Bridges the webhook's inbound seam onto the conversation engine.
struct EngineHandler {
    engine: Arc<ConversationEngine>,
}

#[async_trait]
impl InboundHandler for EngineHandler {
    async fn handle(&self, phone: &str, text: &str) -> Result<String, FixlineError> {
        self.engine.handle_message(phone, text).await
    }
}

/// Runs the `fixline serve` command.
pub async fn run_serve(config: FixlineConfig) -> Result<(), FixlineError> {
    init_tracing(&config.agent.log_level);
    info!("starting fixline serve");

    let entities = Arc::new(SqliteEntities::new(config.storage.clone()));
    entities.initialize().await?;
    info!(path = %config.storage.database_path, "entity store initialized");

    let sessions = Arc::new(InMemorySessionStore::new());
    let model = Arc::new(AnthropicModel::from_config(&config.model)?);
    let sender = Arc::new(WhatsAppSender::from_config(&config.whatsapp)?);

    let executor = ToolExecutor::new(
        entities.clone(),
        entities.clone(),
        sender.clone(),
        config.matching.clone(),
    );
    let dispatcher = Arc::new(ToolDispatcher::new(
        entities.clone(),
        model.clone() as Arc<dyn LanguageModel>,
        executor,
        config.agent.system_prompt.clone(),
        config.model.history_window,
    ));
    let engine = Arc::new(ConversationEngine::new(
        entities.clone(),
        sessions.clone(),
        dispatcher,
        Duration::from_secs(config.session.ttl_secs),
    ));

    let worker = Arc::new(MatchWorker::new(
        entities.clone(),
        entities.clone(),
        sender.clone(),
        config.matching.clone(),
    ));
    let pool = MatchPool::spawn(
        worker,
        entities.clone(),
        config.matching.concurrency,
        Duration::from_secs(config.matching.poll_interval_secs),
    );

    let cancel = crate::shutdown::install_signal_handler();

    let state = WebhookState {
        verify_token: config.whatsapp.verify_token.clone(),
        app_secret: config.whatsapp.app_secret.clone(),
        handler: Arc::new(EngineHandler { engine }),
        sender: sender.clone(),
        adapters: vec![
            entities.clone() as Arc<dyn PluginAdapter>,
            sessions as Arc<dyn PluginAdapter>,
            model as Arc<dyn PluginAdapter>,
            sender as Arc<dyn PluginAdapter>,
        ],
    };

    let shutdown = {
        let cancel = cancel.clone();
        async move { cancel.cancelled().await }
    };
    let served = fixline_whatsapp::serve(
        &config.server.host,
        config.server.port,
        state,
        shutdown,
    )
    .await;

    // Drain the pool and flush the store regardless of how serving ended.
    pool.shutdown().await;
    entities.close().await?;
    info!("fixline serve shutdown complete");
    served
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("fixline={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
