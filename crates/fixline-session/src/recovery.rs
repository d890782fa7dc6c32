// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable-state recovery.
//!
//! When a session is missing or expired, the conversation step is derived
//! from the durable user record alone. The derivation walks the onboarding
//! fields in collection order and resumes at the first gap; a fully
//! onboarded user lands on their main menu (or a terminal-ish account
//! state). Session loss therefore costs at most one re-prompt.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use fixline_core::types::{ProviderProfile, Session, User};
use fixline_core::{AccountStatus, AccountType, EntityGateway, FixlineError, SessionStore, Step};

/// Outcome of deriving a conversation step from durable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovered {
    /// No durable record exists; the caller starts onboarding from scratch.
    NewUser,
    /// Resume at this step.
    Resume(Step),
}

/// Derive the conversation step from durable state.
///
/// Pure over its inputs: same records, same step. The predicate order
/// mirrors the order onboarding collects fields, so the user resumes at
/// exactly the first question they never answered. A provider whose profile
/// row is missing entirely resumes at the first provider question.
pub fn derive_step(user: Option<&User>, profile: Option<&ProviderProfile>) -> Recovered {
    let Some(user) = user else {
        return Recovered::NewUser;
    };

    if !user.terms_accepted {
        return Recovered::Resume(Step::AwaitingTerms);
    }
    let Some(account_type) = user.account_type else {
        return Recovered::Resume(Step::AwaitingAccountType);
    };
    if user.name.is_none() {
        return Recovered::Resume(Step::AwaitingName);
    }
    if user.national_id.is_none() {
        return Recovered::Resume(Step::AwaitingNationalId);
    }
    if user.city.is_none() {
        return Recovered::Resume(Step::AwaitingCity);
    }
    if user.address.is_none() {
        return Recovered::Resume(Step::AwaitingAddress);
    }
    if user.latitude.is_none() || user.longitude.is_none() {
        return Recovered::Resume(Step::AwaitingLocation);
    }

    if account_type == AccountType::ServiceProvider {
        if profile.and_then(|p| p.category_id).is_none() {
            return Recovered::Resume(Step::AwaitingCategory);
        }
        if profile.and_then(|p| p.service_id).is_none() {
            return Recovered::Resume(Step::AwaitingService);
        }
        if profile.and_then(|p| p.description.as_deref()).is_none() {
            return Recovered::Resume(Step::AwaitingDescription);
        }
        if profile.and_then(|p| p.hourly_rate).is_none() {
            return Recovered::Resume(Step::AwaitingRate);
        }
        if profile.and_then(|p| p.id_image_ref.as_deref()).is_none() {
            return Recovered::Resume(Step::AwaitingIdPhoto);
        }
        if !user.verified {
            return Recovered::Resume(Step::AwaitingVerification);
        }
    }

    match user.status {
        AccountStatus::Suspended => Recovered::Resume(Step::Suspended),
        AccountStatus::Inactive => Recovered::Resume(Step::Inactive),
        AccountStatus::Active => Recovered::Resume(match account_type {
            AccountType::Client => Step::ClientMenu,
            AccountType::ServiceProvider => Step::ProviderMenu,
        }),
    }
}

/// Rebuilds sessions from durable entities and re-seeds the session store.
pub struct RecoveryEngine {
    entities: Arc<dyn EntityGateway>,
    sessions: Arc<dyn SessionStore>,
    ttl: Duration,
}

impl RecoveryEngine {
    pub fn new(
        entities: Arc<dyn EntityGateway>,
        sessions: Arc<dyn SessionStore>,
        ttl: Duration,
    ) -> Self {
        Self {
            entities,
            sessions,
            ttl,
        }
    }

    /// Rebuild the session for a phone from durable state and write it back
    /// to the store.
    ///
    /// A phone with no durable record gets a fresh user row and a session at
    /// [`Step::AwaitingTerms`].
    pub async fn rebuild(&self, phone: &str) -> Result<Session, FixlineError> {
        let user = self.entities.get_user(phone).await?;
        let profile = match user.as_ref().and_then(|u| u.account_type) {
            Some(AccountType::ServiceProvider) => {
                self.entities.get_provider_profile(phone).await?
            }
            _ => None,
        };

        let now = crate::now_rfc3339();
        let session = match derive_step(user.as_ref(), profile.as_ref()) {
            Recovered::NewUser => {
                let user = User::new(phone, now.clone());
                self.entities.create_user(&user).await?;
                info!(phone, "new user, starting onboarding");
                Session::at(Step::AwaitingTerms, now)
            }
            Recovered::Resume(step) => {
                debug!(phone, %step, "session rebuilt from durable state");
                Session::at(step, now)
            }
        };

        self.sessions.set(phone, &session, self.ttl).await?;
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn onboarded_client() -> User {
        let mut user = User::new("263771234567", "2026-01-01T00:00:00.000Z");
        user.terms_accepted = true;
        user.account_type = Some(AccountType::Client);
        user.name = Some("Tendai".into());
        user.national_id = Some("63-1234567-A-13".into());
        user.city = Some("Harare".into());
        user.address = Some("12 Samora Machel Ave".into());
        user.latitude = Some(-17.83);
        user.longitude = Some(31.05);
        user
    }

    fn onboarded_provider() -> (User, ProviderProfile) {
        let mut user = onboarded_client();
        user.account_type = Some(AccountType::ServiceProvider);
        user.verified = true;
        let mut profile = ProviderProfile::new(&user.phone);
        profile.category_id = Some(2);
        profile.service_id = Some(5);
        profile.description = Some("Laundry done right".into());
        profile.hourly_rate = Some(15.0);
        profile.id_image_ref = Some("media/abc123".into());
        profile.profile_completed = true;
        (user, profile)
    }

    #[test]
    fn absent_user_is_new() {
        assert_eq!(derive_step(None, None), Recovered::NewUser);
    }

    #[test]
    fn resumes_at_first_missing_field_in_order() {
        let mut user = User::new("263771234567", "2026-01-01T00:00:00.000Z");
        assert_eq!(
            derive_step(Some(&user), None),
            Recovered::Resume(Step::AwaitingTerms)
        );

        user.terms_accepted = true;
        assert_eq!(
            derive_step(Some(&user), None),
            Recovered::Resume(Step::AwaitingAccountType)
        );

        user.account_type = Some(AccountType::Client);
        assert_eq!(
            derive_step(Some(&user), None),
            Recovered::Resume(Step::AwaitingName)
        );

        user.name = Some("Tendai".into());
        assert_eq!(
            derive_step(Some(&user), None),
            Recovered::Resume(Step::AwaitingNationalId)
        );

        user.national_id = Some("63-1234567-A-13".into());
        assert_eq!(
            derive_step(Some(&user), None),
            Recovered::Resume(Step::AwaitingCity)
        );

        user.city = Some("Harare".into());
        assert_eq!(
            derive_step(Some(&user), None),
            Recovered::Resume(Step::AwaitingAddress)
        );

        user.address = Some("12 Samora Machel Ave".into());
        assert_eq!(
            derive_step(Some(&user), None),
            Recovered::Resume(Step::AwaitingLocation)
        );

        user.latitude = Some(-17.83);
        user.longitude = Some(31.05);
        assert_eq!(
            derive_step(Some(&user), None),
            Recovered::Resume(Step::ClientMenu)
        );
    }

    #[test]
    fn provider_resumes_through_profile_fields() {
        let (user, full) = onboarded_provider();

        // Missing profile row entirely: first provider question.
        assert_eq!(
            derive_step(Some(&user), None),
            Recovered::Resume(Step::AwaitingCategory)
        );

        let mut profile = ProviderProfile::new(&user.phone);
        profile.category_id = full.category_id;
        assert_eq!(
            derive_step(Some(&user), Some(&profile)),
            Recovered::Resume(Step::AwaitingService)
        );

        profile.service_id = full.service_id;
        assert_eq!(
            derive_step(Some(&user), Some(&profile)),
            Recovered::Resume(Step::AwaitingDescription)
        );

        profile.description = full.description.clone();
        assert_eq!(
            derive_step(Some(&user), Some(&profile)),
            Recovered::Resume(Step::AwaitingRate)
        );

        profile.hourly_rate = full.hourly_rate;
        assert_eq!(
            derive_step(Some(&user), Some(&profile)),
            Recovered::Resume(Step::AwaitingIdPhoto)
        );

        profile.id_image_ref = full.id_image_ref.clone();
        assert_eq!(
            derive_step(Some(&user), Some(&profile)),
            Recovered::Resume(Step::ProviderMenu)
        );
    }

    #[test]
    fn unverified_provider_waits_for_verification() {
        let (mut user, profile) = onboarded_provider();
        user.verified = false;
        assert_eq!(
            derive_step(Some(&user), Some(&profile)),
            Recovered::Resume(Step::AwaitingVerification)
        );
    }

    #[test]
    fn account_status_overrides_menu() {
        let mut user = onboarded_client();
        user.status = AccountStatus::Suspended;
        assert_eq!(
            derive_step(Some(&user), None),
            Recovered::Resume(Step::Suspended)
        );

        user.status = AccountStatus::Inactive;
        assert_eq!(
            derive_step(Some(&user), None),
            Recovered::Resume(Step::Inactive)
        );
    }

    mod engine {
        use super::*;
        use crate::InMemorySessionStore;
        use fixline_storage::SqliteEntities;
        use tempfile::tempdir;

        async fn setup() -> (Arc<SqliteEntities>, Arc<InMemorySessionStore>, tempfile::TempDir)
        {
            let dir = tempdir().unwrap();
            let path = dir.path().join("recovery.db");
            let config = fixline_config::model::StorageConfig {
                database_path: path.to_str().unwrap().to_string(),
            };
            let entities = Arc::new(SqliteEntities::new(config));
            entities.initialize().await.unwrap();
            (entities, Arc::new(InMemorySessionStore::new()), dir)
        }

        #[tokio::test]
        async fn rebuild_creates_user_and_session_for_unknown_phone() {
            let (entities, sessions, _dir) = setup().await;
            let engine = RecoveryEngine::new(
                entities.clone(),
                sessions.clone(),
                Duration::from_secs(60),
            );

            let session = engine.rebuild("263771234567").await.unwrap();
            assert_eq!(session.step, Step::AwaitingTerms);

            // User row now exists and the session store is seeded.
            assert!(entities.get_user("263771234567").await.unwrap().is_some());
            let cached = sessions.get("263771234567").await.unwrap().unwrap();
            assert_eq!(cached.step, Step::AwaitingTerms);
        }

        #[tokio::test]
        async fn rebuild_resumes_partial_onboarding() {
            let (entities, sessions, _dir) = setup().await;

            let mut user = User::new("263771234567", "2026-01-01T00:00:00.000Z");
            user.terms_accepted = true;
            user.account_type = Some(AccountType::Client);
            user.name = Some("Tendai".into());
            entities.create_user(&user).await.unwrap();

            let engine =
                RecoveryEngine::new(entities, sessions, Duration::from_secs(60));
            let session = engine.rebuild("263771234567").await.unwrap();
            assert_eq!(session.step, Step::AwaitingNationalId);
        }
    }
}
