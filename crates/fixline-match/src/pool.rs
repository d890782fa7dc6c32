// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The worker pool: a fixed number of tasks polling the match queue.
//!
//! Each worker claims one entry at a time, so concurrency is bounded by the
//! configured pool size. A processed job is acked on any verdict; only a
//! worker error (storage, queue) triggers the queue's own bounded retry via
//! `fail`. Malformed payloads are acked and dropped so they cannot wedge the
//! queue.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use fixline_core::types::{MATCH_QUEUE, MatchJob};
use fixline_core::JobQueue;

use crate::worker::MatchWorker;

/// A running pool of match workers.
pub struct MatchPool {
    handles: Vec<JoinHandle<()>>,
    shutdown: CancellationToken,
}

impl MatchPool {
    /// Spawns `concurrency` workers polling every `poll_interval`.
    pub fn spawn(
        worker: Arc<MatchWorker>,
        queue: Arc<dyn JobQueue>,
        concurrency: usize,
        poll_interval: Duration,
    ) -> Self {
        let shutdown = CancellationToken::new();
        let handles = (0..concurrency.max(1))
            .map(|id| {
                let worker = worker.clone();
                let queue = queue.clone();
                let token = shutdown.clone();
                tokio::spawn(async move {
                    run_worker(id, worker, queue, poll_interval, token).await;
                })
            })
            .collect();
        info!(workers = concurrency.max(1), "match pool started");
        Self { handles, shutdown }
    }

    /// Signals shutdown and waits for every worker to finish its current job.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "match worker join failed");
            }
        }
        info!("match pool stopped");
    }
}

async fn run_worker(
    id: usize,
    worker: Arc<MatchWorker>,
    queue: Arc<dyn JobQueue>,
    poll_interval: Duration,
    token: CancellationToken,
) {
    debug!(worker = id, "match worker running");
    loop {
        if token.is_cancelled() {
            break;
        }
        match queue.dequeue(MATCH_QUEUE).await {
            Ok(Some(entry)) => {
                process_entry(&worker, queue.as_ref(), entry.id, &entry.payload).await;
            }
            Ok(None) => {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(poll_interval) => {}
                }
            }
            Err(e) => {
                warn!(worker = id, error = %e, "dequeue failed");
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(poll_interval) => {}
                }
            }
        }
    }
    debug!(worker = id, "match worker stopped");
}

async fn process_entry(worker: &MatchWorker, queue: &dyn JobQueue, entry_id: i64, payload: &str) {
    let job: MatchJob = match serde_json::from_str(payload) {
        Ok(job) => job,
        Err(e) => {
            error!(entry_id, error = %e, "malformed match payload, dropping");
            ack_or_warn(queue, entry_id).await;
            return;
        }
    };
    match worker.process(&job).await {
        Ok(verdict) => {
            debug!(entry_id, request_id = %job.request_id, ?verdict, "job processed");
            ack_or_warn(queue, entry_id).await;
        }
        Err(e) => {
            warn!(entry_id, request_id = %job.request_id, error = %e, "job failed");
            if let Err(e) = queue.fail(entry_id).await {
                error!(entry_id, error = %e, "queue fail() failed");
            }
        }
    }
}

async fn ack_or_warn(queue: &dyn JobQueue, entry_id: i64) {
    if let Err(e) = queue.ack(entry_id).await {
        warn!(entry_id, error = %e, "queue ack failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use fixline_config::model::{MatchingConfig, StorageConfig};
    use fixline_core::types::{ProviderProfile, ServiceRequest, User};
    use fixline_core::{AccountType, EntityGateway, RequestStatus};
    use fixline_storage::SqliteEntities;
    use fixline_test_utils::MockMessaging;
    use tempfile::tempdir;
    use uuid::Uuid;

    fn now_plus(secs: i64) -> String {
        (chrono::Utc::now() + chrono::Duration::seconds(secs))
            .format("%Y-%m-%dT%H:%M:%S%.3fZ")
            .to_string()
    }

    #[tokio::test]
    async fn pool_drains_the_queue_and_shuts_down() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pool.db");
        let entities = Arc::new(SqliteEntities::new(StorageConfig {
            database_path: path.to_str().unwrap().to_string(),
        }));
        entities.initialize().await.unwrap();
        let messaging = Arc::new(MockMessaging::new());

        // One eligible provider for the seeded Laundry service.
        let mut user = User::new("263779990001", now_plus(0));
        user.name = Some("Blessing".into());
        user.account_type = Some(AccountType::ServiceProvider);
        user.verified = true;
        user.city = Some("Harare".into());
        entities.create_user(&user).await.unwrap();
        let mut profile = ProviderProfile::new("263779990001");
        profile.category_id = Some(2);
        profile.service_id = Some(5);
        profile.hourly_rate = Some(15.0);
        profile.profile_completed = true;
        entities.upsert_provider_profile(&profile).await.unwrap();

        let request = ServiceRequest {
            id: Uuid::new_v4().to_string(),
            code: "FX-POOL01".into(),
            client_phone: "263771111111".into(),
            category_id: 2,
            service_id: 5,
            provider_phone: None,
            rejected_providers: Vec::new(),
            status: RequestStatus::Pending,
            address: None,
            latitude: None,
            longitude: None,
            attempt_count: 0,
            search_deadline: now_plus(3600),
            created_at: now_plus(0),
            updated_at: now_plus(0),
        };
        entities.create_request(&request).await.unwrap();

        let job = MatchJob {
            phone: request.client_phone.clone(),
            request_id: request.id.clone(),
            service_id: 5,
            category_id: 2,
            city: Some("Harare".into()),
            attempt: 1,
            max_attempts: 3,
            exclude_providers: Vec::new(),
        };
        entities
            .enqueue(MATCH_QUEUE, &serde_json::to_string(&job).unwrap(), None)
            .await
            .unwrap();

        let worker = Arc::new(MatchWorker::new(
            entities.clone(),
            entities.clone(),
            messaging.clone(),
            MatchingConfig::default(),
        ));
        let pool = MatchPool::spawn(
            worker,
            entities.clone(),
            2,
            Duration::from_millis(10),
        );

        // Give the pool a moment to pick the job up.
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let current = entities.get_request(&request.id).await.unwrap().unwrap();
            if current.status == RequestStatus::ProviderFound {
                break;
            }
        }
        pool.shutdown().await;

        let after = entities.get_request(&request.id).await.unwrap().unwrap();
        assert_eq!(after.status, RequestStatus::ProviderFound);
        assert_eq!(after.provider_phone.as_deref(), Some("263779990001"));
        assert_eq!(messaging.texts_to("263771111111").len(), 1);

        // The entry was acked, not left pending.
        assert!(entities.dequeue(MATCH_QUEUE).await.unwrap().is_none());
    }
}
