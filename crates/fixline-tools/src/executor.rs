// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Executors behind each tool in the catalog.
//!
//! Every executor validates its arguments against durable state, performs its
//! writes, and returns a rendered text section for the reply. Failures are
//! recoverable [`FixlineError`] variants carrying user-facing messages; the
//! dispatcher reports them per-call without aborting sibling calls.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use tracing::{info, warn};
use uuid::Uuid;

use fixline_config::model::MatchingConfig;
use fixline_core::types::{
    MATCH_QUEUE, MatchJob, PaymentRecord, PaymentStatus, ServiceRequest, SessionContext,
    ToolCall, User,
};
use fixline_core::{
    AccountType, EntityGateway, FixlineError, JobQueue, MessagingGateway, RequestStatus,
};

use crate::args::{
    CancelBookingArgs, CompleteBookingArgs, CreateBookingArgs, Decision, ListServicesArgs,
    ProfileField, RespondToCandidateArgs, UpdateProfileArgs, parse_args,
};

/// Flat platform fee recorded against a provider per completed job.
const PLATFORM_FEE: f64 = 5.0;

/// Days a provider has to settle a platform fee.
const PAYMENT_DUE_DAYS: i64 = 7;

/// One executed tool call's contribution to the reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutcome {
    /// Stable template tag, useful for tests and logs.
    pub tag: &'static str,
    /// Rendered user-facing section.
    pub text: String,
}

impl ToolOutcome {
    fn new(tag: &'static str, text: impl Into<String>) -> Self {
        Self {
            tag,
            text: text.into(),
        }
    }
}

pub(crate) fn now_rfc3339() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

fn rfc3339_in(duration: chrono::Duration) -> String {
    (Utc::now() + duration)
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

fn deadline_passed(request: &ServiceRequest) -> Result<bool, FixlineError> {
    let deadline = chrono::DateTime::parse_from_rfc3339(&request.search_deadline).map_err(|e| {
        FixlineError::Internal(format!(
            "request {} has a malformed search deadline: {e}",
            request.id
        ))
    })?;
    Ok(Utc::now() > deadline)
}

/// Generates a human-readable request code. Ambiguous characters (0/O, 1/I/L)
/// are excluded since users read these back over chat.
fn request_code() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..6)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect();
    format!("FX-{suffix}")
}

/// Executes validated tool calls against the durable stores.
pub struct ToolExecutor {
    entities: Arc<dyn EntityGateway>,
    queue: Arc<dyn JobQueue>,
    messaging: Arc<dyn MessagingGateway>,
    matching: MatchingConfig,
}

impl ToolExecutor {
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

    /// Runs one tool call. `ctx` is the caller's session context; executors
    /// may update it (candidate exclusions, delete confirmation) but never
    /// advance the conversation step.
    pub async fn execute(
        &self,
        user: &User,
        call: &ToolCall,
        ctx: &mut SessionContext,
    ) -> Result<ToolOutcome, FixlineError> {
        match call.name.as_str() {
            "list_categories" => self.list_categories().await,
            "list_services" => {
                let args: ListServicesArgs = parse_args(&call.name, &call.arguments)?;
                self.list_services(args).await
            }
            "create_booking" => {
                let args: CreateBookingArgs = parse_args(&call.name, &call.arguments)?;
                self.create_booking(user, args).await
            }
            "view_bookings" => self.view_bookings(user).await,
            "cancel_booking" => {
                let args: CancelBookingArgs = parse_args(&call.name, &call.arguments)?;
                self.cancel_booking(user, args).await
            }
            "respond_to_candidate" => {
                let args: RespondToCandidateArgs = parse_args(&call.name, &call.arguments)?;
                self.respond_to_candidate(user, args, ctx).await
            }
            "update_profile" => {
                let args: UpdateProfileArgs = parse_args(&call.name, &call.arguments)?;
                self.update_profile(user, args).await
            }
            "complete_booking" => {
                let args: CompleteBookingArgs = parse_args(&call.name, &call.arguments)?;
                self.complete_booking(user, args).await
            }
            "delete_account" => self.delete_account(user, ctx).await,
            other => Err(FixlineError::ToolExecution {
                tool: other.to_string(),
                message: "unknown tool".to_string(),
            }),
        }
    }

    async fn list_categories(&self) -> Result<ToolOutcome, FixlineError> {
        let categories = self.entities.list_categories().await?;
        let mut lines = vec!["Service categories:".to_string()];
        for c in &categories {
            lines.push(format!("{}. {}", c.id, c.name));
        }
        Ok(ToolOutcome::new("categories", lines.join("\n")))
    }

    async fn list_services(&self, args: ListServicesArgs) -> Result<ToolOutcome, FixlineError> {
        let services = self.entities.list_services(args.category_id).await?;
        if services.is_empty() {
            return Err(FixlineError::validation(format!(
                "no services found for category {}; use list_categories for valid codes",
                args.category_id
            )));
        }
        let mut lines = vec!["Available services:".to_string()];
        for s in &services {
            lines.push(format!("{}. {}", s.id, s.name));
        }
        Ok(ToolOutcome::new("services", lines.join("\n")))
    }

    async fn create_booking(
        &self,
        user: &User,
        args: CreateBookingArgs,
    ) -> Result<ToolOutcome, FixlineError> {
        if user.account_type != Some(AccountType::Client) {
            return Err(FixlineError::validation(
                "only client accounts can create bookings",
            ));
        }
        let services = self.entities.list_services(args.category_id).await?;
        let Some(service) = services.iter().find(|s| s.id == args.service_id) else {
            return Err(FixlineError::validation(format!(
                "service {} does not exist in category {}",
                args.service_id, args.category_id
            )));
        };

        let now = now_rfc3339();
        let timeout = chrono::Duration::seconds(self.matching.search_timeout_secs as i64);
        let request = ServiceRequest {
            id: Uuid::new_v4().to_string(),
            code: request_code(),
            client_phone: user.phone.clone(),
            category_id: args.category_id,
            service_id: args.service_id,
            provider_phone: None,
            rejected_providers: Vec::new(),
            status: RequestStatus::Pending,
            address: user.address.clone(),
            latitude: user.latitude,
            longitude: user.longitude,
            attempt_count: 0,
            search_deadline: rfc3339_in(timeout),
            created_at: now.clone(),
            updated_at: now,
        };
        self.entities.create_request(&request).await?;

        let job = MatchJob {
            phone: user.phone.clone(),
            request_id: request.id.clone(),
            service_id: request.service_id,
            category_id: request.category_id,
            city: user.city.clone(),
            attempt: 1,
            max_attempts: self.matching.max_attempts,
            exclude_providers: Vec::new(),
        };
        let payload = serde_json::to_string(&job)
            .map_err(|e| FixlineError::Internal(format!("match job serialization: {e}")))?;
        self.queue.enqueue(MATCH_QUEUE, &payload, None).await?;

        info!(
            request_id = %request.id,
            code = %request.code,
            service_id = request.service_id,
            "booking created, search enqueued"
        );
        Ok(ToolOutcome::new(
            "booking_created",
            format!(
                "Your request {} for {} has been created. We are searching for \
                 a provider and will message you as soon as one is found.",
                request.code, service.name
            ),
        ))
    }

    async fn view_bookings(&self, user: &User) -> Result<ToolOutcome, FixlineError> {
        let mut requests = match user.account_type {
            Some(AccountType::ServiceProvider) => {
                self.entities
                    .list_requests_for_provider(&user.phone, 10)
                    .await?
            }
            _ => {
                self.entities
                    .list_requests_for_client(&user.phone, 10)
                    .await?
            }
        };
        if requests.is_empty() {
            return Ok(ToolOutcome::new(
                "bookings_empty",
                "You have no bookings yet.",
            ));
        }
        let mut lines = vec!["Your bookings:".to_string()];
        for r in &mut requests {
            // Lazy expiry: a candidate offer the client never answered is
            // swept to Expired the next time anyone looks at it.
            if r.status == RequestStatus::ProviderFound && deadline_passed(r)? {
                let won = self
                    .entities
                    .transition_request(
                        &r.id,
                        RequestStatus::ProviderFound,
                        RequestStatus::Expired,
                        None,
                    )
                    .await?;
                if won {
                    info!(request_id = %r.id, "stale candidate offer expired on view");
                    r.status = RequestStatus::Expired;
                }
            }
            lines.push(format!("{} — {}", r.code, status_label(r.status)));
        }
        Ok(ToolOutcome::new("bookings", lines.join("\n")))
    }

    async fn cancel_booking(
        &self,
        user: &User,
        args: CancelBookingArgs,
    ) -> Result<ToolOutcome, FixlineError> {
        let request = self.find_client_request(user, &args.code).await?;

        // Cancellable while unresolved; the pipeline's own CAS discards any
        // in-flight search result once the status moves off Pending.
        let cancelled = self
            .entities
            .transition_request(
                &request.id,
                RequestStatus::Pending,
                RequestStatus::Cancelled,
                None,
            )
            .await?
            || self
                .entities
                .transition_request(
                    &request.id,
                    RequestStatus::ProviderFound,
                    RequestStatus::Cancelled,
                    None,
                )
                .await?;
        if !cancelled {
            return Err(FixlineError::validation(format!(
                "request {} is {} and can no longer be cancelled",
                request.code,
                status_label(request.status)
            )));
        }
        info!(request_id = %request.id, "booking cancelled");
        Ok(ToolOutcome::new(
            "booking_cancelled",
            format!("Request {} has been cancelled.", request.code),
        ))
    }

    async fn respond_to_candidate(
        &self,
        user: &User,
        args: RespondToCandidateArgs,
        ctx: &mut SessionContext,
    ) -> Result<ToolOutcome, FixlineError> {
        let requests = self.entities.list_requests_for_client(&user.phone, 10).await?;
        let Some(request) = requests
            .into_iter()
            .find(|r| r.status == RequestStatus::ProviderFound)
        else {
            return Err(FixlineError::validation(
                "there is no provider candidate awaiting your response",
            ));
        };

        // An assigned candidate does not stop the global timeout clock.
        if deadline_passed(&request)? {
            self.entities
                .transition_request(
                    &request.id,
                    RequestStatus::ProviderFound,
                    RequestStatus::Expired,
                    None,
                )
                .await?;
            ctx.pending_request_id = None;
            info!(request_id = %request.id, "candidate offer lapsed, request expired");
            return Ok(ToolOutcome::new(
                "request_expired",
                format!(
                    "Request {} timed out before a response. You can create a \
                     new booking any time.",
                    request.code
                ),
            ));
        }

        match args.decision {
            Decision::Accept => {
                let won = self
                    .entities
                    .transition_request(
                        &request.id,
                        RequestStatus::ProviderFound,
                        RequestStatus::Accepted,
                        None,
                    )
                    .await?;
                if !won {
                    return Err(FixlineError::validation(format!(
                        "request {} changed state before your reply; check your bookings",
                        request.code
                    )));
                }
                if let Some(provider) = &request.provider_phone {
                    let note = format!(
                        "You have been booked. The client for request {} accepted \
                         your profile and will be in touch.",
                        request.code
                    );
                    if let Err(e) = self.messaging.send_text(provider, &note).await {
                        warn!(request_id = %request.id, error = %e, "provider notify failed");
                    }
                }
                ctx.pending_request_id = None;
                info!(request_id = %request.id, "candidate accepted");
                Ok(ToolOutcome::new(
                    "candidate_accepted",
                    format!(
                        "Great — the provider for request {} has been booked and notified.",
                        request.code
                    ),
                ))
            }
            Decision::Decline => {
                let won = self
                    .entities
                    .transition_request(
                        &request.id,
                        RequestStatus::ProviderFound,
                        RequestStatus::ProviderRejected,
                        None,
                    )
                    .await?;
                if !won {
                    return Err(FixlineError::validation(format!(
                        "request {} changed state before your reply; check your bookings",
                        request.code
                    )));
                }
                // The rejection outlives the session: it is written to the
                // request before the new search cycle can start.
                let mut exclude = request.rejected_providers.clone();
                if let Some(provider) = request.provider_phone.clone() {
                    self.entities.record_rejection(&request.id, &provider).await?;
                    if !exclude.contains(&provider) {
                        exclude.push(provider.clone());
                    }
                    if !ctx.shown_providers.contains(&provider) {
                        ctx.shown_providers.push(provider);
                    }
                }
                // Moving back to Pending clears the assignment and opens a
                // fresh search cycle with its own attempt budget.
                self.entities
                    .transition_request(
                        &request.id,
                        RequestStatus::ProviderRejected,
                        RequestStatus::Pending,
                        None,
                    )
                    .await?;

                let job = MatchJob {
                    phone: user.phone.clone(),
                    request_id: request.id.clone(),
                    service_id: request.service_id,
                    category_id: request.category_id,
                    city: user.city.clone(),
                    attempt: 1,
                    max_attempts: self.matching.max_attempts,
                    exclude_providers: exclude,
                };
                let payload = serde_json::to_string(&job).map_err(|e| {
                    FixlineError::Internal(format!("match job serialization: {e}"))
                })?;
                self.queue.enqueue(MATCH_QUEUE, &payload, None).await?;

                ctx.pending_request_id = None;
                info!(request_id = %request.id, "candidate declined, search restarted");
                Ok(ToolOutcome::new(
                    "candidate_declined",
                    format!(
                        "Understood — we will keep searching for another provider \
                         for request {}.",
                        request.code
                    ),
                ))
            }
        }
    }

    async fn update_profile(
        &self,
        user: &User,
        args: UpdateProfileArgs,
    ) -> Result<ToolOutcome, FixlineError> {
        let value = args.value.trim();
        if value.is_empty() {
            return Err(FixlineError::validation("the new value cannot be empty"));
        }

        match args.field {
            ProfileField::Name => {
                if value.len() < 2 || value.len() > 100 {
                    return Err(FixlineError::validation(
                        "name must be between 2 and 100 characters",
                    ));
                }
                let mut updated = user.clone();
                updated.name = Some(value.to_string());
                updated.updated_at = now_rfc3339();
                self.entities.update_user(&updated).await?;
            }
            ProfileField::City => {
                let mut updated = user.clone();
                updated.city = Some(value.to_string());
                updated.updated_at = now_rfc3339();
                self.entities.update_user(&updated).await?;
            }
            ProfileField::Address => {
                let mut updated = user.clone();
                updated.address = Some(value.to_string());
                updated.updated_at = now_rfc3339();
                self.entities.update_user(&updated).await?;
            }
            ProfileField::Description => {
                let mut profile = self.require_profile(user).await?;
                profile.description = Some(value.to_string());
                self.entities.upsert_provider_profile(&profile).await?;
            }
            ProfileField::HourlyRate => {
                let rate: f64 = value.parse().map_err(|_| {
                    FixlineError::validation("hourly rate must be a number, e.g. 25 or 17.50")
                })?;
                if rate <= 0.0 {
                    return Err(FixlineError::validation("hourly rate must be positive"));
                }
                let mut profile = self.require_profile(user).await?;
                profile.hourly_rate = Some(rate);
                self.entities.upsert_provider_profile(&profile).await?;
            }
        }
        Ok(ToolOutcome::new(
            "profile_updated",
            "Your profile has been updated.",
        ))
    }

    async fn complete_booking(
        &self,
        user: &User,
        args: CompleteBookingArgs,
    ) -> Result<ToolOutcome, FixlineError> {
        if user.account_type != Some(AccountType::ServiceProvider) {
            return Err(FixlineError::validation(
                "only provider accounts can complete bookings",
            ));
        }
        let code = args.code.trim().to_uppercase();
        let requests = self
            .entities
            .list_requests_for_provider(&user.phone, 50)
            .await?;
        let Some(request) = requests.into_iter().find(|r| r.code == code) else {
            return Err(FixlineError::NotFound {
                entity: "request",
                key: code,
            });
        };

        let won = self
            .entities
            .transition_request(
                &request.id,
                RequestStatus::Accepted,
                RequestStatus::Completed,
                None,
            )
            .await?;
        if !won {
            return Err(FixlineError::validation(format!(
                "request {} is {} and cannot be completed",
                request.code,
                status_label(request.status)
            )));
        }

        let payment = PaymentRecord {
            id: Uuid::new_v4().to_string(),
            request_id: request.id.clone(),
            provider_phone: user.phone.clone(),
            amount: PLATFORM_FEE,
            status: PaymentStatus::Pending,
            due_at: rfc3339_in(chrono::Duration::days(PAYMENT_DUE_DAYS)),
            created_at: now_rfc3339(),
        };
        self.entities.record_payment(&payment).await?;

        // Standings refresh whenever a new fee accrues.
        let overdue = self.entities.sweep_overdue_payments(&now_rfc3339()).await?;
        if overdue > 0 {
            info!(overdue, "payments flipped to overdue during sweep");
        }

        let note = format!(
            "Your provider marked request {} as completed. Thank you for using Fixline!",
            request.code
        );
        if let Err(e) = self.messaging.send_text(&request.client_phone, &note).await {
            warn!(request_id = %request.id, error = %e, "client notify failed");
        }

        info!(request_id = %request.id, "booking completed, platform fee recorded");
        Ok(ToolOutcome::new(
            "booking_completed",
            format!(
                "Request {} is marked completed. A platform fee of ${:.2} is due \
                 within {} days.",
                request.code, PLATFORM_FEE, PAYMENT_DUE_DAYS
            ),
        ))
    }

    /// Two-phase delete. The first call only arms the confirmation flag in
    /// the session context; nothing durable changes until the second call.
    async fn delete_account(
        &self,
        user: &User,
        ctx: &mut SessionContext,
    ) -> Result<ToolOutcome, FixlineError> {
        if !ctx.confirming_delete {
            ctx.confirming_delete = true;
            return Ok(ToolOutcome::new(
                "delete_confirm",
                "This will permanently delete your account and profile. Reply \
                 again asking to delete your account if you are sure.",
            ));
        }
        self.entities.delete_user(&user.phone).await?;
        *ctx = SessionContext::default();
        info!(phone = %user.phone, "account deleted");
        Ok(ToolOutcome::new(
            "account_deleted",
            "Your account has been deleted. Message us any time to start over.",
        ))
    }

    async fn find_client_request(
        &self,
        user: &User,
        code: &str,
    ) -> Result<ServiceRequest, FixlineError> {
        let code = code.trim().to_uppercase();
        let requests = self.entities.list_requests_for_client(&user.phone, 50).await?;
        requests
            .into_iter()
            .find(|r| r.code == code)
            .ok_or(FixlineError::NotFound {
                entity: "request",
                key: code,
            })
    }

    async fn require_profile(
        &self,
        user: &User,
    ) -> Result<fixline_core::types::ProviderProfile, FixlineError> {
        if user.account_type != Some(AccountType::ServiceProvider) {
            return Err(FixlineError::validation(
                "only provider accounts have that profile field",
            ));
        }
        self.entities
            .get_provider_profile(&user.phone)
            .await?
            .ok_or(FixlineError::NotFound {
                entity: "provider profile",
                key: user.phone.clone(),
            })
    }
}

/// Human-readable form of a request status for replies.
fn status_label(status: RequestStatus) -> &'static str {
    match status {
        RequestStatus::Pending => "searching for a provider",
        RequestStatus::ProviderFound => "awaiting your response to a candidate",
        RequestStatus::Accepted => "booked",
        RequestStatus::Completed => "completed",
        RequestStatus::Cancelled => "cancelled",
        RequestStatus::ProviderRejected => "restarting the search",
        RequestStatus::NoProviderFound => "closed, no provider found",
        RequestStatus::Expired => "expired",
    }
}
