// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end scenarios across the conversation engine, tool dispatcher,
//! storage, and matching worker, with the model and channel mocked.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tempfile::tempdir;

use fixline_config::model::{MatchingConfig, StorageConfig};
use fixline_core::types::{MATCH_QUEUE, MatchJob, ProviderProfile, User};
use fixline_core::{
    AccountType, EntityGateway, JobQueue, RequestStatus, SessionStore, Step,
};
use fixline_flow::ConversationEngine;
use fixline_match::{MatchVerdict, MatchWorker};
use fixline_session::{InMemorySessionStore, now_rfc3339};
use fixline_storage::SqliteEntities;
use fixline_test_utils::{MockMessaging, MockModel};
use fixline_tools::{ToolDispatcher, ToolExecutor};

const CLIENT: &str = "263771234567";

struct World {
    engine: ConversationEngine,
    worker: MatchWorker,
    entities: Arc<SqliteEntities>,
    sessions: Arc<InMemorySessionStore>,
    model: Arc<MockModel>,
    messaging: Arc<MockMessaging>,
    _dir: tempfile::TempDir,
}

async fn world() -> World {
    let dir = tempdir().unwrap();
    let path = dir.path().join("e2e.db");
    let entities = Arc::new(SqliteEntities::new(StorageConfig {
        database_path: path.to_str().unwrap().to_string(),
    }));
    entities.initialize().await.unwrap();
    let sessions = Arc::new(InMemorySessionStore::new());
    let model = Arc::new(MockModel::new());
    let messaging = Arc::new(MockMessaging::new());
    let matching = MatchingConfig::default();

    let executor = ToolExecutor::new(
        entities.clone(),
        entities.clone(),
        messaging.clone(),
        matching.clone(),
    );
    let dispatcher = Arc::new(ToolDispatcher::new(
        entities.clone(),
        model.clone(),
        executor,
        None,
        10,
    ));
    let engine = ConversationEngine::new(
        entities.clone(),
        sessions.clone(),
        dispatcher,
        Duration::from_secs(3600),
    );
    let worker = MatchWorker::new(
        entities.clone(),
        entities.clone(),
        messaging.clone(),
        matching,
    );
    World {
        engine,
        worker,
        entities,
        sessions,
        model,
        messaging,
        _dir: dir,
    }
}

async fn say(w: &World, text: &str) -> String {
    w.engine.handle_message(CLIENT, text).await.unwrap()
}

async fn onboard_client(w: &World) {
    say(w, "hi").await;
    say(w, "accept").await;
    say(w, "1").await;
    say(w, "Tendai Moyo").await;
    say(w, "63-1234567-A-42").await;
    say(w, "Harare").await;
    say(w, "12 Samora Machel Ave").await;
    say(w, "-17.8252, 31.0335").await;
}

async fn seed_provider(w: &World, phone: &str, rate: f64) {
    let mut user = User::new(phone, now_rfc3339());
    user.name = Some(format!("Provider {rate}"));
    user.account_type = Some(AccountType::ServiceProvider);
    user.terms_accepted = true;
    user.verified = true;
    user.city = Some("Harare".into());
    w.entities.create_user(&user).await.unwrap();
    let mut profile = ProviderProfile::new(phone);
    profile.category_id = Some(2);
    profile.service_id = Some(5);
    profile.hourly_rate = Some(rate);
    profile.description = Some("Wash, dry, iron".into());
    profile.profile_completed = true;
    w.entities.upsert_provider_profile(&profile).await.unwrap();
}

/// Claims the next visible match job, acking the queue entry.
async fn next_job(w: &World) -> Option<MatchJob> {
    let entry = w.entities.dequeue(MATCH_QUEUE).await.unwrap()?;
    let job = serde_json::from_str(&entry.payload).unwrap();
    w.entities.ack(entry.id).await.unwrap();
    Some(job)
}

#[tokio::test]
async fn happy_path_booking_from_chat_to_accepted() {
    let w = world().await;
    onboard_client(&w).await;
    seed_provider(&w, "263779990001", 12.5).await;

    // The model turns the chat message into a create_booking call for the
    // seeded Cleaning / Laundry pair.
    w.model.push_tool_calls(
        None,
        vec![("create_booking", json!({"category_id": 2, "service_id": 5}))],
    );
    let reply = say(&w, "I need my laundry done").await;
    assert!(reply.contains("searching"));

    // The background worker finds and assigns the provider.
    let job = next_job(&w).await.unwrap();
    assert_eq!(job.attempt, 1);
    let verdict = w.worker.process(&job).await.unwrap();
    assert_eq!(
        verdict,
        MatchVerdict::Assigned {
            provider: "263779990001".into()
        }
    );
    let candidate_note = w.messaging.texts_to(CLIENT).pop().unwrap();
    assert!(candidate_note.contains("$12.50"));

    // The client accepts; the provider is notified.
    w.model.push_tool_calls(
        None,
        vec![("respond_to_candidate", json!({"decision": "accept"}))],
    );
    let reply = say(&w, "accept").await;
    assert!(reply.contains("booked"));

    let request = w
        .entities
        .list_requests_for_client(CLIENT, 1)
        .await
        .unwrap()
        .remove(0);
    assert_eq!(request.status, RequestStatus::Accepted);
    assert_eq!(request.provider_phone.as_deref(), Some("263779990001"));
    assert_eq!(w.messaging.texts_to("263779990001").len(), 1);
}

#[tokio::test]
async fn exhausted_search_terminates_with_exactly_one_message() {
    let w = world().await;
    onboard_client(&w).await;
    // No providers seeded at all.

    w.model.push_tool_calls(
        None,
        vec![("create_booking", json!({"category_id": 2, "service_id": 5}))],
    );
    say(&w, "laundry please").await;

    let job = next_job(&w).await.unwrap();
    assert_eq!(
        w.worker.process(&job).await.unwrap(),
        MatchVerdict::Retried { next_attempt: 2 }
    );
    // Retries are delay-queued; drive the remaining attempts directly.
    let job2 = MatchJob { attempt: 2, ..job.clone() };
    assert_eq!(
        w.worker.process(&job2).await.unwrap(),
        MatchVerdict::Retried { next_attempt: 3 }
    );
    let job3 = MatchJob { attempt: 3, ..job.clone() };
    assert_eq!(w.worker.process(&job3).await.unwrap(), MatchVerdict::Exhausted);

    let request = w
        .entities
        .list_requests_for_client(CLIENT, 1)
        .await
        .unwrap()
        .remove(0);
    assert_eq!(request.status, RequestStatus::NoProviderFound);
    assert_eq!(request.attempt_count, 3);

    let terminal: Vec<String> = w
        .messaging
        .texts_to(CLIENT)
        .into_iter()
        .filter(|t| t.contains("no provider is available"))
        .collect();
    assert_eq!(terminal.len(), 1);
}

#[tokio::test]
async fn decline_excludes_the_candidate_and_finds_the_next_one() {
    let w = world().await;
    onboard_client(&w).await;
    seed_provider(&w, "263779990001", 10.0).await;
    seed_provider(&w, "263779990002", 20.0).await;

    w.model.push_tool_calls(
        None,
        vec![("create_booking", json!({"category_id": 2, "service_id": 5}))],
    );
    say(&w, "laundry").await;
    let job = next_job(&w).await.unwrap();
    w.worker.process(&job).await.unwrap();

    // Cheapest provider was assigned first; the client declines them.
    w.model.push_tool_calls(
        None,
        vec![("respond_to_candidate", json!({"decision": "decline"}))],
    );
    say(&w, "someone else please").await;

    // The fresh cycle has its own budget and excludes the declined provider.
    let job = next_job(&w).await.unwrap();
    assert_eq!(job.attempt, 1);
    assert_eq!(job.exclude_providers, vec!["263779990001".to_string()]);

    let verdict = w.worker.process(&job).await.unwrap();
    assert_eq!(
        verdict,
        MatchVerdict::Assigned {
            provider: "263779990002".into()
        }
    );
}

#[tokio::test]
async fn session_expiry_at_the_menu_recovers_without_losing_context() {
    let w = world().await;
    onboard_client(&w).await;
    assert_eq!(
        w.sessions.get(CLIENT).await.unwrap().unwrap().step,
        Step::ClientMenu
    );

    // TTL expiry drops the session; the durable record still says the
    // client finished onboarding, so the menu keeps working.
    w.sessions.del(CLIENT).await.unwrap();
    w.model.push_text("Welcome back! How can I help?");
    let reply = say(&w, "hello again").await;
    assert_eq!(reply, "Welcome back! How can I help?");
    assert_eq!(
        w.sessions.get(CLIENT).await.unwrap().unwrap().step,
        Step::ClientMenu
    );
}

#[tokio::test]
async fn cancelling_makes_inflight_search_results_moot() {
    let w = world().await;
    onboard_client(&w).await;
    seed_provider(&w, "263779990001", 15.0).await;

    w.model.push_tool_calls(
        None,
        vec![("create_booking", json!({"category_id": 2, "service_id": 5}))],
    );
    say(&w, "laundry").await;
    let request = w
        .entities
        .list_requests_for_client(CLIENT, 1)
        .await
        .unwrap()
        .remove(0);
    let job = next_job(&w).await.unwrap();

    // The client cancels while the job is still queued.
    w.model.push_tool_calls(
        None,
        vec![("cancel_booking", json!({"code": request.code}))],
    );
    let reply = say(&w, "actually cancel that").await;
    assert!(reply.contains("cancelled"));

    // The worker drops the job without touching the request or the client.
    let sent_before = w.messaging.sent().len();
    assert_eq!(w.worker.process(&job).await.unwrap(), MatchVerdict::Stale);
    assert_eq!(w.messaging.sent().len(), sent_before);
    let after = w.entities.get_request(&request.id).await.unwrap().unwrap();
    assert_eq!(after.status, RequestStatus::Cancelled);
}
