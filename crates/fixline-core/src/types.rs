// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain entities and common types used across adapter traits.
//!
//! Timestamps are RFC 3339 strings throughout; the storage layer generates
//! them with SQLite's `strftime` and the rest of the workspace with `chrono`.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::steps::Step;

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter behind a collaborator trait.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Messaging,
    Entities,
    SessionStore,
    Model,
    Queue,
}

// --- Account enums ---

/// Whether a user requests services or provides them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Client,
    ServiceProvider,
}

/// Durable account status. `Suspended` and `Inactive` map to the
/// terminal-ish conversation steps of the same names.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Suspended,
    Inactive,
}

/// A provider's standing with respect to platform fees.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStanding {
    GoodStanding,
    PaymentDue,
    Restricted,
}

/// Lifecycle status of a service request.
///
/// Transitions are one-directional except for reassignment after a decline:
/// `ProviderFound -> ProviderRejected -> Pending` starts a fresh search cycle
/// with the rejecting provider excluded.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Created; a background search is (or will be) running.
    Pending,
    /// A candidate was assigned; waiting on the client's accept/decline.
    ProviderFound,
    /// Client accepted; the provider has been notified.
    Accepted,
    /// Work finished; a payment record is owed by the provider.
    Completed,
    /// Client cancelled before resolution.
    Cancelled,
    /// Client declined the assigned candidate; a fresh search cycle follows.
    ProviderRejected,
    /// Search budget exhausted with no candidate. Terminal for this cycle.
    NoProviderFound,
    /// Global search timeout elapsed before resolution. Terminal.
    Expired,
}

/// Status of a platform fee owed by a provider after a completed job.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Overdue,
}

// --- Durable entities ---

/// Durable user identity, keyed by phone number.
///
/// Onboarding handlers fill the optional fields one step at a time; the
/// recovery engine derives the resume step from which fields are present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub phone: String,
    pub name: Option<String>,
    pub account_type: Option<AccountType>,
    pub terms_accepted: bool,
    pub verified: bool,
    pub national_id: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub status: AccountStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    /// A fresh user record with nothing collected yet.
    pub fn new(phone: impl Into<String>, now: impl Into<String>) -> Self {
        let now = now.into();
        Self {
            phone: phone.into(),
            name: None,
            account_type: None,
            terms_accepted: false,
            verified: false,
            national_id: None,
            city: None,
            address: None,
            latitude: None,
            longitude: None,
            status: AccountStatus::Active,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// Provider profile, 1:1 with a `User` of type `ServiceProvider`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderProfile {
    pub phone: String,
    pub category_id: Option<i64>,
    pub service_id: Option<i64>,
    pub description: Option<String>,
    pub hourly_rate: Option<f64>,
    pub id_image_ref: Option<String>,
    pub profile_completed: bool,
    pub payment_standing: PaymentStanding,
    pub outstanding_payments: i64,
}

impl ProviderProfile {
    /// An empty profile for a provider who just chose their account type.
    pub fn new(phone: impl Into<String>) -> Self {
        Self {
            phone: phone.into(),
            category_id: None,
            service_id: None,
            description: None,
            hourly_rate: None,
            id_image_ref: None,
            profile_completed: false,
            payment_standing: PaymentStanding::GoodStanding,
            outstanding_payments: 0,
        }
    }
}

/// A service category (e.g. "Home Repair").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// A concrete service within a category (e.g. "Plumbing").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
}

/// A booking created when a client confirms category, service, and location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRequest {
    /// Internal identifier (UUID).
    pub id: String,
    /// Human-readable request code shown to users (`FX-XXXXXX`).
    pub code: String,
    pub client_phone: String,
    pub category_id: i64,
    pub service_id: i64,
    /// Assigned candidate, present from `ProviderFound` onward.
    pub provider_phone: Option<String>,
    /// Providers the client has declined. Excluded from every later search
    /// cycle, outliving the session that declined them.
    #[serde(default)]
    pub rejected_providers: Vec<String>,
    pub status: RequestStatus,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Search attempts recorded so far, across cycles.
    pub attempt_count: i64,
    /// Global search timeout deadline (RFC 3339). Independent of attempt count.
    pub search_deadline: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A provider candidate returned by an availability search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCandidate {
    pub phone: String,
    pub name: String,
    pub service_id: i64,
    pub hourly_rate: f64,
    pub description: Option<String>,
    pub city: Option<String>,
}

/// Queue name the matching pipeline listens on.
pub const MATCH_QUEUE: &str = "provider_match";

/// One cycle of the background provider search, carried as a queue payload.
///
/// Not persisted independently; its outcome is reflected onto the
/// `ServiceRequest` it targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchJob {
    pub phone: String,
    pub request_id: String,
    pub service_id: i64,
    pub category_id: i64,
    pub city: Option<String>,
    pub attempt: u32,
    pub max_attempts: u32,
    #[serde(default)]
    pub exclude_providers: Vec<String>,
}

/// A platform fee owed by a provider after a completed job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: String,
    pub request_id: String,
    pub provider_phone: String,
    pub amount: f64,
    pub status: PaymentStatus,
    pub due_at: String,
    pub created_at: String,
}

// --- Conversation history ---

/// One half of a conversation turn, persisted for the bounded model window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub id: String,
    pub phone: String,
    /// "user" or "assistant".
    pub role: String,
    pub content: String,
    pub created_at: String,
}

// --- Session ---

/// Short-term per-user context carried inside a session.
///
/// Each flow gets its own field rather than sharing one slot, so a pending
/// candidate decision and a pending delete confirmation cannot clobber
/// each other.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    /// Category chosen mid-booking (before the request exists).
    pub category_id: Option<i64>,
    /// Service chosen mid-booking.
    pub service_id: Option<i64>,
    /// Request awaiting the client's accept/decline of a found candidate.
    pub pending_request_id: Option<String>,
    /// Provider phones last shown to the user, addressable by 1-based index.
    #[serde(default)]
    pub shown_providers: Vec<String>,
    /// Set by the first `delete_account` call; required for the second.
    #[serde(default)]
    pub confirming_delete: bool,
}

/// Ephemeral per-user conversation record, keyed by phone.
///
/// Overwritten on every transition; expires after a fixed TTL, after which
/// the recovery engine must rebuild it from durable entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub step: Step,
    /// Last raw inbound text, kept for idempotent re-entry.
    pub message: String,
    /// RFC 3339 timestamp of the last activity.
    pub last_activity: String,
    pub context: SessionContext,
}

impl Session {
    /// A session at the given step with empty context.
    pub fn at(step: Step, now: impl Into<String>) -> Self {
        Self {
            step,
            message: String::new(),
            last_activity: now.into(),
            context: SessionContext::default(),
        }
    }
}

// --- Queue ---

/// A row in the durable job queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: i64,
    pub queue_name: String,
    pub payload: String,
    pub status: String,
    pub attempts: i32,
    pub max_attempts: i32,
    /// Entries with `available_at` in the future are skipped by `dequeue`.
    pub available_at: String,
    pub created_at: String,
    pub updated_at: String,
    pub locked_until: Option<String>,
}

// --- Language model ---

/// One message in the bounded conversation window sent to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMessage {
    /// "user" or "assistant".
    pub role: String,
    pub content: String,
}

/// A tool definition advertised to the language model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema describing the tool's input parameters.
    pub input_schema: serde_json::Value,
}

/// A request to the language model collaborator. Single blocking call,
/// no streaming semantics required by the core.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub system_prompt: String,
    pub history: Vec<ModelMessage>,
    pub tools: Vec<ToolDefinition>,
}

/// A structured tool invocation returned by the model in place of plain text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// The model's reply: plain text, one-or-more tool invocations, or both.
#[derive(Debug, Clone, Default)]
pub struct ModelReply {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}
