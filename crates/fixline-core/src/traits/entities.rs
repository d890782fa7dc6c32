// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable entity gateway trait: typed CRUD and query operations for the
//! canonical User, ProviderProfile, ServiceRequest, and Payment records,
//! plus the compare-and-set primitive for ServiceRequest status transitions.

use async_trait::async_trait;

use crate::error::FixlineError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    Category, PaymentRecord, ProviderCandidate, ProviderProfile, RequestStatus, Service,
    ServiceRequest, Turn, User,
};

/// Typed access to the durable entity store.
///
/// Ordinary writes are last-write-wins; ServiceRequest status transitions
/// must go through [`transition_request`](EntityGateway::transition_request),
/// the single compare-and-set primitive.
#[async_trait]
pub trait EntityGateway: PluginAdapter {
    /// Initializes the backend (migrations, connections).
    async fn initialize(&self) -> Result<(), FixlineError>;

    /// Closes the backend, flushing pending writes.
    async fn close(&self) -> Result<(), FixlineError>;

    // --- Users ---

    async fn get_user(&self, phone: &str) -> Result<Option<User>, FixlineError>;

    async fn create_user(&self, user: &User) -> Result<(), FixlineError>;

    async fn update_user(&self, user: &User) -> Result<(), FixlineError>;

    /// Deletes a user and, in the same transaction, their provider profile.
    async fn delete_user(&self, phone: &str) -> Result<(), FixlineError>;

    // --- Provider profiles ---

    async fn get_provider_profile(
        &self,
        phone: &str,
    ) -> Result<Option<ProviderProfile>, FixlineError>;

    async fn upsert_provider_profile(
        &self,
        profile: &ProviderProfile,
    ) -> Result<(), FixlineError>;

    /// Finds eligible, verified, non-restricted providers for a service,
    /// excluding the given phones. Optionally narrowed to a city.
    async fn find_available_providers(
        &self,
        service_id: i64,
        category_id: i64,
        city: Option<&str>,
        exclude: &[String],
    ) -> Result<Vec<ProviderCandidate>, FixlineError>;

    // --- Service catalog ---

    async fn list_categories(&self) -> Result<Vec<Category>, FixlineError>;

    async fn list_services(&self, category_id: i64) -> Result<Vec<Service>, FixlineError>;

    // --- Service requests ---

    async fn create_request(&self, request: &ServiceRequest) -> Result<(), FixlineError>;

    async fn get_request(&self, id: &str) -> Result<Option<ServiceRequest>, FixlineError>;

    async fn list_requests_for_client(
        &self,
        phone: &str,
        limit: i64,
    ) -> Result<Vec<ServiceRequest>, FixlineError>;

    async fn list_requests_for_provider(
        &self,
        phone: &str,
        limit: i64,
    ) -> Result<Vec<ServiceRequest>, FixlineError>;

    /// Compare-and-set status transition.
    ///
    /// Advances the request to `next` (optionally assigning a provider) only
    /// if its current status equals `expected`. Returns `false` when the
    /// guard fails — the caller lost the race and must discard its result.
    async fn transition_request(
        &self,
        id: &str,
        expected: RequestStatus,
        next: RequestStatus,
        provider_phone: Option<&str>,
    ) -> Result<bool, FixlineError>;

    /// Records the latest search attempt number on the request. Max-guarded
    /// so duplicate job deliveries cannot regress the count.
    async fn record_search_attempt(
        &self,
        id: &str,
        attempt: i64,
    ) -> Result<(), FixlineError>;

    /// Appends a declined provider to the request's durable rejection list.
    /// Later search cycles must exclude everyone in it, even if the session
    /// that declined them is gone.
    async fn record_rejection(&self, id: &str, provider: &str) -> Result<(), FixlineError>;

    // --- Conversation history ---

    async fn append_turn(&self, turn: &Turn) -> Result<(), FixlineError>;

    /// Returns the most recent turns for a phone, oldest first.
    async fn recent_turns(&self, phone: &str, limit: i64) -> Result<Vec<Turn>, FixlineError>;

    /// Deletes all but the newest `keep` turns for a phone.
    async fn trim_turns(&self, phone: &str, keep: i64) -> Result<(), FixlineError>;

    // --- Payments (peripheral) ---

    async fn record_payment(&self, payment: &PaymentRecord) -> Result<(), FixlineError>;

    async fn list_payments_for_provider(
        &self,
        phone: &str,
    ) -> Result<Vec<PaymentRecord>, FixlineError>;

    /// Marks pending payments past their due date as overdue and refreshes
    /// each provider's payment standing from their overdue count. Returns
    /// the number of payments flipped.
    async fn sweep_overdue_payments(&self, now: &str) -> Result<u64, FixlineError>;
}
