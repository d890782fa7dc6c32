// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook HTTP server built on axum.
//!
//! Three routes: the GET verification handshake Meta performs when the
//! webhook is registered, the POST endpoint inbound messages arrive on, and
//! an unauthenticated health endpoint for process supervisors.
//!
//! The POST handler always returns 200 for well-signed payloads, even when
//! processing fails, so the platform does not re-deliver a message the
//! conversation engine already answered with a retry prompt.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use tracing::{debug, error, info, warn};

use fixline_core::{FixlineError, HealthStatus, MessagingGateway, PluginAdapter};

use crate::signature::verify_signature;
use crate::types::WebhookPayload;

/// Consumes one normalized inbound message and produces the reply text.
///
/// Implemented by the conversation engine; a seam so the webhook can be
/// tested with a scripted handler.
#[async_trait]
pub trait InboundHandler: Send + Sync {
    async fn handle(&self, phone: &str, text: &str) -> Result<String, FixlineError>;
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct WebhookState {
    /// Token expected during the GET verification handshake.
    pub verify_token: Option<String>,
    /// App secret for `X-Hub-Signature-256` verification. `None` disables
    /// signature checks (local development only).
    pub app_secret: Option<String>,
    /// The conversation engine behind the channel.
    pub handler: Arc<dyn InboundHandler>,
    /// Outbound sender for replies.
    pub sender: Arc<dyn MessagingGateway>,
    /// Adapters reported by the health endpoint.
    pub adapters: Vec<Arc<dyn PluginAdapter>>,
}

/// Builds the webhook router.
pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/webhook", get(verify_webhook).post(receive_webhook))
        .route("/health", get(get_health))
        .with_state(state)
}

/// Binds and serves the router until the shutdown future resolves.
pub async fn serve(
    host: &str,
    port: u16,
    state: WebhookState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), FixlineError> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| FixlineError::Channel {
            message: format!("failed to bind webhook server to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;
    info!("webhook server listening on {addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| FixlineError::Channel {
            message: format!("webhook server error: {e}"),
            source: Some(Box::new(e)),
        })
}

/// GET handshake: echo `hub.challenge` when the verify token matches.
async fn verify_webhook(
    State(state): State<WebhookState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let mode = params.get("hub.mode").map(String::as_str);
    let token = params.get("hub.verify_token").map(String::as_str);
    let challenge = params.get("hub.challenge").cloned().unwrap_or_default();

    if mode == Some("subscribe") && token.is_some() && token == state.verify_token.as_deref() {
        info!("webhook verification handshake succeeded");
        (StatusCode::OK, challenge)
    } else {
        warn!(?mode, "webhook verification handshake rejected");
        (StatusCode::FORBIDDEN, String::new())
    }
}

/// POST endpoint: authenticate, parse, and run each message through the
/// conversation engine.
async fn receive_webhook(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    if let Some(app_secret) = &state.app_secret {
        let signature = headers
            .get("x-hub-signature-256")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !verify_signature(app_secret, &body, signature) {
            warn!("webhook payload failed signature verification");
            return StatusCode::UNAUTHORIZED;
        }
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "unparseable webhook payload, acknowledging anyway");
            return StatusCode::OK;
        }
    };

    for entry in &payload.entry {
        for change in &entry.changes {
            for message in &change.value.messages {
                let Some(text) = message.as_text() else {
                    debug!(kind = %message.kind, "ignoring unsupported message type");
                    continue;
                };
                dispatch(&state, &message.from, &text).await;
            }
        }
    }

    StatusCode::OK
}

async fn dispatch(state: &WebhookState, phone: &str, text: &str) {
    match state.handler.handle(phone, text).await {
        Ok(reply) => {
            if let Err(e) = state.sender.send_text(phone, &reply).await {
                error!(phone, error = %e, "failed to send reply");
            }
        }
        Err(e) => {
            error!(phone, error = %e, "inbound message handling failed");
        }
    }
}

async fn get_health(State(state): State<WebhookState>) -> impl IntoResponse {
    let mut adapters = serde_json::Map::new();
    let mut all_healthy = true;
    for adapter in &state.adapters {
        let status = match adapter.health_check().await {
            Ok(HealthStatus::Healthy) => "healthy".to_string(),
            Ok(HealthStatus::Degraded(reason)) => {
                all_healthy = false;
                format!("degraded: {reason}")
            }
            Ok(HealthStatus::Unhealthy(reason)) => {
                all_healthy = false;
                format!("unhealthy: {reason}")
            }
            Err(e) => {
                all_healthy = false;
                format!("unhealthy: {e}")
            }
        };
        adapters.insert(adapter.name().to_string(), status.into());
    }

    let code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let body = serde_json::json!({
        "status": if all_healthy { "ok" } else { "degraded" },
        "adapters": adapters,
    });
    (code, Json(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use axum::body::Body;
    use http::Request;
    use tower::util::ServiceExt;

    use crate::signature::sign;
    use fixline_test_utils::MockMessaging;

    struct ScriptedHandler {
        calls: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedHandler {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(String, String)> {
            self.calls.lock().expect("mock lock poisoned").clone()
        }
    }

    #[async_trait]
    impl InboundHandler for ScriptedHandler {
        async fn handle(&self, phone: &str, text: &str) -> Result<String, FixlineError> {
            self.calls
                .lock()
                .expect("mock lock poisoned")
                .push((phone.to_string(), text.to_string()));
            Ok(format!("echo: {text}"))
        }
    }

    fn test_state() -> (WebhookState, Arc<ScriptedHandler>, Arc<MockMessaging>) {
        let handler = Arc::new(ScriptedHandler::new());
        let sender = Arc::new(MockMessaging::new());
        let state = WebhookState {
            verify_token: Some("verify-me".into()),
            app_secret: Some("topsecret".into()),
            handler: handler.clone(),
            sender: sender.clone(),
            adapters: vec![sender.clone() as Arc<dyn PluginAdapter>],
        };
        (state, handler, sender)
    }

    fn message_payload(text: &str) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "changes": [{
                    "field": "messages",
                    "value": {
                        "messages": [{
                            "from": "263771234567",
                            "id": "wamid.1",
                            "type": "text",
                            "text": {"body": text}
                        }]
                    }
                }]
            }]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn handshake_echoes_challenge_for_the_right_token() {
        let (state, _, _) = test_state();
        let app = router(state);

        let response = app
            .oneshot(
                Request::get(
                    "/webhook?hub.mode=subscribe&hub.verify_token=verify-me&hub.challenge=12345",
                )
                .body(Body::empty())
                .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"12345");
    }

    #[tokio::test]
    async fn handshake_rejects_a_wrong_token() {
        let (state, _, _) = test_state();
        let app = router(state);

        let response = app
            .oneshot(
                Request::get(
                    "/webhook?hub.mode=subscribe&hub.verify_token=wrong&hub.challenge=12345",
                )
                .body(Body::empty())
                .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn signed_message_reaches_the_handler_and_gets_a_reply() {
        let (state, handler, sender) = test_state();
        let app = router(state);

        let body = message_payload("I need a plumber");
        let signature = sign("topsecret", &body);
        let response = app
            .oneshot(
                Request::post("/webhook")
                    .header("x-hub-signature-256", signature)
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        assert_eq!(
            handler.calls(),
            vec![("263771234567".to_string(), "I need a plumber".to_string())]
        );
        assert_eq!(
            sender.texts_to("263771234567"),
            vec!["echo: I need a plumber".to_string()]
        );
    }

    #[tokio::test]
    async fn unsigned_message_is_rejected_before_processing() {
        let (state, handler, _) = test_state();
        let app = router(state);

        let body = message_payload("forged");
        let response = app
            .oneshot(
                Request::post("/webhook")
                    .header("x-hub-signature-256", "sha256=deadbeef")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(handler.calls().is_empty());
    }

    #[tokio::test]
    async fn status_events_are_acknowledged_without_dispatch() {
        let (state, handler, _) = test_state();
        let app = router(state);

        let body = serde_json::to_vec(&serde_json::json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "changes": [{
                    "field": "messages",
                    "value": {"statuses": [{"status": "delivered"}]}
                }]
            }]
        }))
        .unwrap();
        let signature = sign("topsecret", &body);
        let response = app
            .oneshot(
                Request::post("/webhook")
                    .header("x-hub-signature-256", signature)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(handler.calls().is_empty());
    }

    #[tokio::test]
    async fn health_reports_adapters() {
        let (state, _, _) = test_state();
        let app = router(state);

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 4096).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["adapters"]["mock-messaging"], "healthy");
    }
}
