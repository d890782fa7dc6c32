// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the EntityGateway and JobQueue traits.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use fixline_config::model::StorageConfig;
use fixline_core::types::{
    Category, PaymentRecord, ProviderCandidate, ProviderProfile, QueueEntry, RequestStatus,
    Service, ServiceRequest, Turn, User,
};
use fixline_core::{
    AdapterType, EntityGateway, FixlineError, HealthStatus, JobQueue, PluginAdapter,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed entity gateway and job queue.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily initialized on the first
/// call to [`EntityGateway::initialize`].
pub struct SqliteEntities {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteEntities {
    /// Create a new SqliteEntities with the given configuration.
    ///
    /// The database connection is not opened until [`initialize`] is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, FixlineError> {
        self.db.get().ok_or_else(|| FixlineError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteEntities {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Entities
    }

    async fn health_check(&self) -> Result<HealthStatus, FixlineError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| {
                conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), FixlineError> {
        if let Some(db) = self.db.get() {
            db.close().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl EntityGateway for SqliteEntities {
    async fn initialize(&self) -> Result<(), FixlineError> {
        let db = Database::open(&self.config.database_path).await?;
        self.db.set(db).map_err(|_| FixlineError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), FixlineError> {
        self.db()?.close().await
    }

    // --- Users ---

    async fn get_user(&self, phone: &str) -> Result<Option<User>, FixlineError> {
        queries::users::get_user(self.db()?, phone).await
    }

    async fn create_user(&self, user: &User) -> Result<(), FixlineError> {
        queries::users::create_user(self.db()?, user).await
    }

    async fn update_user(&self, user: &User) -> Result<(), FixlineError> {
        queries::users::update_user(self.db()?, user).await
    }

    async fn delete_user(&self, phone: &str) -> Result<(), FixlineError> {
        queries::users::delete_user(self.db()?, phone).await
    }

    // --- Provider profiles ---

    async fn get_provider_profile(
        &self,
        phone: &str,
    ) -> Result<Option<ProviderProfile>, FixlineError> {
        queries::providers::get_provider_profile(self.db()?, phone).await
    }

    async fn upsert_provider_profile(
        &self,
        profile: &ProviderProfile,
    ) -> Result<(), FixlineError> {
        queries::providers::upsert_provider_profile(self.db()?, profile).await
    }

    async fn find_available_providers(
        &self,
        service_id: i64,
        category_id: i64,
        city: Option<&str>,
        exclude: &[String],
    ) -> Result<Vec<ProviderCandidate>, FixlineError> {
        queries::providers::find_available_providers(self.db()?, service_id, category_id, city, exclude)
            .await
    }

    // --- Service catalog ---

    async fn list_categories(&self) -> Result<Vec<Category>, FixlineError> {
        queries::catalog::list_categories(self.db()?).await
    }

    async fn list_services(&self, category_id: i64) -> Result<Vec<Service>, FixlineError> {
        queries::catalog::list_services(self.db()?, category_id).await
    }

    // --- Service requests ---

    async fn create_request(&self, request: &ServiceRequest) -> Result<(), FixlineError> {
        queries::requests::create_request(self.db()?, request).await
    }

    async fn get_request(&self, id: &str) -> Result<Option<ServiceRequest>, FixlineError> {
        queries::requests::get_request(self.db()?, id).await
    }

    async fn list_requests_for_client(
        &self,
        phone: &str,
        limit: i64,
    ) -> Result<Vec<ServiceRequest>, FixlineError> {
        queries::requests::list_requests_for_client(self.db()?, phone, limit).await
    }

    async fn list_requests_for_provider(
        &self,
        phone: &str,
        limit: i64,
    ) -> Result<Vec<ServiceRequest>, FixlineError> {
        queries::requests::list_requests_for_provider(self.db()?, phone, limit).await
    }

    async fn transition_request(
        &self,
        id: &str,
        expected: RequestStatus,
        next: RequestStatus,
        provider_phone: Option<&str>,
    ) -> Result<bool, FixlineError> {
        queries::requests::transition_request(self.db()?, id, expected, next, provider_phone).await
    }

    async fn record_search_attempt(&self, id: &str, attempt: i64) -> Result<(), FixlineError> {
        queries::requests::record_search_attempt(self.db()?, id, attempt).await
    }

    async fn record_rejection(&self, id: &str, provider: &str) -> Result<(), FixlineError> {
        queries::requests::record_rejection(self.db()?, id, provider).await
    }

    // --- Conversation history ---

    async fn append_turn(&self, turn: &Turn) -> Result<(), FixlineError> {
        queries::turns::append_turn(self.db()?, turn).await
    }

    async fn recent_turns(&self, phone: &str, limit: i64) -> Result<Vec<Turn>, FixlineError> {
        queries::turns::recent_turns(self.db()?, phone, limit).await
    }

    async fn trim_turns(&self, phone: &str, keep: i64) -> Result<(), FixlineError> {
        queries::turns::trim_turns(self.db()?, phone, keep).await
    }

    // --- Payments ---

    async fn record_payment(&self, payment: &PaymentRecord) -> Result<(), FixlineError> {
        queries::payments::record_payment(self.db()?, payment).await
    }

    async fn list_payments_for_provider(
        &self,
        phone: &str,
    ) -> Result<Vec<PaymentRecord>, FixlineError> {
        queries::payments::list_payments_for_provider(self.db()?, phone).await
    }

    async fn sweep_overdue_payments(&self, now: &str) -> Result<u64, FixlineError> {
        queries::payments::sweep_overdue(self.db()?, now).await
    }
}

#[async_trait]
impl JobQueue for SqliteEntities {
    async fn enqueue(
        &self,
        queue_name: &str,
        payload: &str,
        delay: Option<Duration>,
    ) -> Result<i64, FixlineError> {
        queries::queue::enqueue(self.db()?, queue_name, payload, delay).await
    }

    async fn dequeue(&self, queue_name: &str) -> Result<Option<QueueEntry>, FixlineError> {
        queries::queue::dequeue(self.db()?, queue_name).await
    }

    async fn ack(&self, id: i64) -> Result<(), FixlineError> {
        queries::queue::ack(self.db()?, id).await
    }

    async fn fail(&self, id: i64) -> Result<(), FixlineError> {
        queries::queue::fail(self.db()?, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
        }
    }

    #[tokio::test]
    async fn sqlite_entities_implements_plugin_adapter() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let storage = SqliteEntities::new(make_config(db_path.to_str().unwrap()));

        assert_eq!(storage.name(), "sqlite");
        assert_eq!(storage.version(), semver::Version::new(0, 1, 0));
        assert_eq!(storage.adapter_type(), AdapterType::Entities);
    }

    #[tokio::test]
    async fn initialize_opens_database_at_configured_path() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("init_test.db");
        let storage = SqliteEntities::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert!(db_path.exists(), "database file should be created");
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("double_init.db");
        let storage = SqliteEntities::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        let result = storage.initialize().await;
        assert!(result.is_err(), "second initialize should fail");
    }

    #[tokio::test]
    async fn health_check_fails_when_not_initialized() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("no_init.db");
        let storage = SqliteEntities::new(make_config(db_path.to_str().unwrap()));

        let result = storage.health_check().await;
        assert!(result.is_err(), "health_check should fail before initialize");
    }

    #[tokio::test]
    async fn full_booking_lifecycle_through_adapter() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("lifecycle.db");
        let storage = SqliteEntities::new(make_config(db_path.to_str().unwrap()));
        storage.initialize().await.unwrap();

        // Onboard a client.
        let mut client = User::new("263771234567", "2026-01-01T00:00:00.000Z");
        client.name = Some("Tendai".into());
        client.terms_accepted = true;
        client.verified = true;
        storage.create_user(&client).await.unwrap();

        // Create a pending request and walk it to accepted.
        let request = ServiceRequest {
            id: "req-1".into(),
            code: "FX-A1B2C3".into(),
            client_phone: client.phone.clone(),
            category_id: 2,
            service_id: 5,
            provider_phone: None,
            rejected_providers: Vec::new(),
            status: RequestStatus::Pending,
            address: Some("12 Samora Machel Ave".into()),
            latitude: None,
            longitude: None,
            attempt_count: 0,
            search_deadline: "2026-01-01T01:00:00.000Z".into(),
            created_at: "2026-01-01T00:00:00.000Z".into(),
            updated_at: "2026-01-01T00:00:00.000Z".into(),
        };
        storage.create_request(&request).await.unwrap();

        assert!(storage
            .transition_request(
                "req-1",
                RequestStatus::Pending,
                RequestStatus::ProviderFound,
                Some("263779999999"),
            )
            .await
            .unwrap());
        assert!(storage
            .transition_request("req-1", RequestStatus::ProviderFound, RequestStatus::Accepted, None)
            .await
            .unwrap());

        let listed = storage.list_requests_for_client(&client.phone, 10).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].status, RequestStatus::Accepted);
        assert_eq!(listed[0].provider_phone.as_deref(), Some("263779999999"));

        let by_provider = storage
            .list_requests_for_provider("263779999999", 10)
            .await
            .unwrap();
        assert_eq!(by_provider.len(), 1);

        storage.close().await.unwrap();
    }

    #[tokio::test]
    async fn queue_operations_through_adapter() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("queue_adapter.db");
        let storage = SqliteEntities::new(make_config(db_path.to_str().unwrap()));
        storage.initialize().await.unwrap();

        let id = storage
            .enqueue("match", r#"{"request_id":"req-1"}"#, None)
            .await
            .unwrap();
        assert!(id > 0);

        let entry = storage.dequeue("match").await.unwrap();
        assert!(entry.is_some());
        let entry = entry.unwrap();
        assert_eq!(entry.status, "processing");

        storage.ack(entry.id).await.unwrap();

        storage.close().await.unwrap();
    }
}
