// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One cycle of the provider search.
//!
//! A job is processed against the current durable state of its request, never
//! against what the enqueuer believed: a request that moved off `Pending`
//! (cancelled, already assigned, expired by a sibling worker) makes the job
//! stale and it is dropped without a message. All status writes go through
//! the compare-and-set transition, so a lost race is discarded silently too.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use fixline_config::model::MatchingConfig;
use fixline_core::types::{MATCH_QUEUE, MatchJob, ProviderCandidate, ServiceRequest};
use fixline_core::{EntityGateway, FixlineError, JobQueue, MessagingGateway, RequestStatus};

/// What one processed job amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchVerdict {
    /// The request moved on without us; nothing was changed or sent.
    Stale,
    /// A worker or user changed the status between our read and our write.
    LostRace,
    /// The global search timeout elapsed; the request is now `Expired`.
    Expired,
    /// A candidate was assigned and the client notified.
    Assigned { provider: String },
    /// Empty search with budget left; the next attempt is queued.
    Retried { next_attempt: u32 },
    /// Empty search on the final attempt; the request is `NoProviderFound`.
    Exhausted,
}

/// Processes match jobs against the durable stores.
pub struct MatchWorker {
    entities: Arc<dyn EntityGateway>,
    queue: Arc<dyn JobQueue>,
    messaging: Arc<dyn MessagingGateway>,
    matching: MatchingConfig,
}

impl MatchWorker {
    pub fn new(
        entities: Arc<dyn EntityGateway>,
        queue: Arc<dyn JobQueue>,
        messaging: Arc<dyn MessagingGateway>,
        matching: MatchingConfig,
    ) -> Self {
        Self {
            entities,
            queue,
            messaging,
            matching,
        }
    }

    /// Runs one search cycle for a job.
    pub async fn process(&self, job: &MatchJob) -> Result<MatchVerdict, FixlineError> {
        let Some(request) = self.entities.get_request(&job.request_id).await? else {
            warn!(request_id = %job.request_id, "match job for unknown request");
            return Ok(MatchVerdict::Stale);
        };
        if request.status != RequestStatus::Pending {
            debug!(
                request_id = %request.id,
                status = %request.status,
                "request no longer pending, dropping job"
            );
            return Ok(MatchVerdict::Stale);
        }

        if deadline_passed(&request)? {
            return self.expire(&request).await;
        }

        // The durable rejection list is authoritative; the job's own exclude
        // set may predate declines recorded after it was enqueued.
        let mut exclude = job.exclude_providers.clone();
        for phone in &request.rejected_providers {
            if !exclude.contains(phone) {
                exclude.push(phone.clone());
            }
        }
        let candidates = self
            .entities
            .find_available_providers(
                job.service_id,
                job.category_id,
                job.city.as_deref(),
                &exclude,
            )
            .await?;

        self.entities
            .record_search_attempt(&request.id, request.attempt_count + 1)
            .await?;

        match candidates.into_iter().next() {
            Some(candidate) => self.assign(&request, candidate).await,
            None if job.attempt < job.max_attempts => self.retry(job).await,
            None => self.exhaust(&request).await,
        }
    }

    async fn expire(&self, request: &ServiceRequest) -> Result<MatchVerdict, FixlineError> {
        let won = self
            .entities
            .transition_request(
                &request.id,
                RequestStatus::Pending,
                RequestStatus::Expired,
                None,
            )
            .await?;
        if !won {
            return Ok(MatchVerdict::LostRace);
        }
        info!(request_id = %request.id, "search deadline elapsed, request expired");
        self.notify(
            &request.client_phone,
            &format!(
                "We're sorry — the search for request {} timed out before a \
                 provider could be found. You can create a new request any time.",
                request.code
            ),
            request,
        )
        .await;
        Ok(MatchVerdict::Expired)
    }

    async fn assign(
        &self,
        request: &ServiceRequest,
        candidate: ProviderCandidate,
    ) -> Result<MatchVerdict, FixlineError> {
        let won = self
            .entities
            .transition_request(
                &request.id,
                RequestStatus::Pending,
                RequestStatus::ProviderFound,
                Some(&candidate.phone),
            )
            .await?;
        if !won {
            debug!(request_id = %request.id, "lost assignment race, discarding candidate");
            return Ok(MatchVerdict::LostRace);
        }
        info!(
            request_id = %request.id,
            provider = %candidate.phone,
            rate = candidate.hourly_rate,
            "candidate assigned"
        );
        let mut note = format!(
            "Good news! We found a provider for request {}: {} at ${:.2}/hr.",
            request.code, candidate.name, candidate.hourly_rate
        );
        if let Some(description) = &candidate.description {
            note.push_str(&format!(" \"{description}\""));
        }
        note.push_str(" Reply to accept or decline.");
        self.notify(&request.client_phone, &note, request).await;
        Ok(MatchVerdict::Assigned {
            provider: candidate.phone,
        })
    }

    async fn retry(&self, job: &MatchJob) -> Result<MatchVerdict, FixlineError> {
        let next = MatchJob {
            attempt: job.attempt + 1,
            ..job.clone()
        };
        let payload = serde_json::to_string(&next)
            .map_err(|e| FixlineError::Internal(format!("match job serialization: {e}")))?;
        let delay = Duration::from_secs(self.matching.retry_interval_secs);
        self.queue.enqueue(MATCH_QUEUE, &payload, Some(delay)).await?;
        debug!(
            request_id = %job.request_id,
            attempt = job.attempt,
            next_attempt = next.attempt,
            "empty search, retry queued"
        );
        Ok(MatchVerdict::Retried {
            next_attempt: next.attempt,
        })
    }

    async fn exhaust(&self, request: &ServiceRequest) -> Result<MatchVerdict, FixlineError> {
        let won = self
            .entities
            .transition_request(
                &request.id,
                RequestStatus::Pending,
                RequestStatus::NoProviderFound,
                None,
            )
            .await?;
        if !won {
            return Ok(MatchVerdict::LostRace);
        }
        info!(request_id = %request.id, "search budget exhausted");
        // The CAS guard guarantees this terminal message goes out once even
        // if a duplicate job is processed concurrently.
        self.notify(
            &request.client_phone,
            &format!(
                "We're sorry — no provider is available for request {} right \
                 now. Please try again later.",
                request.code
            ),
            request,
        )
        .await;
        Ok(MatchVerdict::Exhausted)
    }

    async fn notify(&self, phone: &str, text: &str, request: &ServiceRequest) {
        if let Err(e) = self.messaging.send_text(phone, text).await {
            warn!(request_id = %request.id, error = %e, "client notification failed");
        }
    }
}

fn deadline_passed(request: &ServiceRequest) -> Result<bool, FixlineError> {
    let deadline = DateTime::parse_from_rfc3339(&request.search_deadline).map_err(|e| {
        FixlineError::Internal(format!(
            "request {} has a malformed search deadline: {e}",
            request.id
        ))
    })?;
    Ok(Utc::now() > deadline)
}
