// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider profile operations, including the availability search used by
//! the matching pipeline.

use fixline_core::types::{ProviderCandidate, ProviderProfile};
use fixline_core::FixlineError;
use rusqlite::params;
use rusqlite::types::Value;

use crate::database::Database;

fn profile_from_row(row: &rusqlite::Row<'_>) -> Result<ProviderProfile, rusqlite::Error> {
    let standing: String = row.get(7)?;
    Ok(ProviderProfile {
        phone: row.get(0)?,
        category_id: row.get(1)?,
        service_id: row.get(2)?,
        description: row.get(3)?,
        hourly_rate: row.get(4)?,
        id_image_ref: row.get(5)?,
        profile_completed: row.get(6)?,
        payment_standing: super::parse_enum(7, &standing)?,
        outstanding_payments: row.get(8)?,
    })
}

pub async fn get_provider_profile(
    db: &Database,
    phone: &str,
) -> Result<Option<ProviderProfile>, FixlineError> {
    let phone = phone.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT phone, category_id, service_id, description, hourly_rate,
                        id_image_ref, profile_completed, payment_standing, outstanding_payments
                 FROM provider_profiles WHERE phone = ?1",
                params![phone],
                profile_from_row,
            );
            match result {
                Ok(profile) => Ok(Some(profile)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn upsert_provider_profile(
    db: &Database,
    profile: &ProviderProfile,
) -> Result<(), FixlineError> {
    let profile = profile.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO provider_profiles
                     (phone, category_id, service_id, description, hourly_rate,
                      id_image_ref, profile_completed, payment_standing, outstanding_payments)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(phone) DO UPDATE SET
                     category_id = excluded.category_id,
                     service_id = excluded.service_id,
                     description = excluded.description,
                     hourly_rate = excluded.hourly_rate,
                     id_image_ref = excluded.id_image_ref,
                     profile_completed = excluded.profile_completed,
                     payment_standing = excluded.payment_standing,
                     outstanding_payments = excluded.outstanding_payments",
                params![
                    profile.phone,
                    profile.category_id,
                    profile.service_id,
                    profile.description,
                    profile.hourly_rate,
                    profile.id_image_ref,
                    profile.profile_completed,
                    profile.payment_standing.to_string(),
                    profile.outstanding_payments,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Eligible providers for a service: verified, active, profile complete, not
/// payment-restricted, and not in the exclusion list. Cheapest rate first so
/// retries walk the candidate pool in a stable order.
pub async fn find_available_providers(
    db: &Database,
    service_id: i64,
    category_id: i64,
    city: Option<&str>,
    exclude: &[String],
) -> Result<Vec<ProviderCandidate>, FixlineError> {
    let city = city.map(str::to_string);
    let exclude = exclude.to_vec();
    db.connection()
        .call(move |conn| {
            let mut sql = String::from(
                "SELECT u.phone, u.name, p.service_id, p.hourly_rate, p.description, u.city
                 FROM provider_profiles p
                 JOIN users u ON u.phone = p.phone
                 WHERE p.service_id = ?1
                   AND p.category_id = ?2
                   AND p.profile_completed = 1
                   AND p.payment_standing != 'restricted'
                   AND u.verified = 1
                   AND u.status = 'active'",
            );
            let mut bindings: Vec<Value> =
                vec![Value::Integer(service_id), Value::Integer(category_id)];
            if let Some(c) = city {
                bindings.push(Value::Text(c));
                sql.push_str(&format!(" AND u.city = ?{}", bindings.len()));
            }
            for phone in exclude {
                bindings.push(Value::Text(phone));
                sql.push_str(&format!(" AND u.phone != ?{}", bindings.len()));
            }
            sql.push_str(" ORDER BY p.hourly_rate ASC, u.phone ASC");

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(rusqlite::params_from_iter(bindings), |row| {
                Ok(ProviderCandidate {
                    phone: row.get(0)?,
                    name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    service_id: row.get(2)?,
                    hourly_rate: row.get::<_, Option<f64>>(3)?.unwrap_or(0.0),
                    description: row.get(4)?,
                    city: row.get(5)?,
                })
            })?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixline_core::types::{AccountType, PaymentStanding, User};
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    async fn seed_provider(db: &Database, phone: &str, city: &str, rate: f64) {
        let mut user = User::new(phone, "2026-01-01T00:00:00.000Z");
        user.name = Some(format!("Provider {phone}"));
        user.account_type = Some(AccountType::ServiceProvider);
        user.terms_accepted = true;
        user.verified = true;
        user.city = Some(city.to_string());
        crate::queries::users::create_user(db, &user).await.unwrap();

        let mut profile = ProviderProfile::new(phone);
        profile.category_id = Some(2);
        profile.service_id = Some(5);
        profile.hourly_rate = Some(rate);
        profile.profile_completed = true;
        upsert_provider_profile(db, &profile).await.unwrap();
    }

    #[tokio::test]
    async fn upsert_is_idempotent_on_phone() {
        let (db, _dir) = setup_db().await;

        let user = User::new("263771111111", "2026-01-01T00:00:00.000Z");
        crate::queries::users::create_user(&db, &user).await.unwrap();

        let mut profile = ProviderProfile::new("263771111111");
        upsert_provider_profile(&db, &profile).await.unwrap();
        profile.hourly_rate = Some(25.0);
        profile.profile_completed = true;
        upsert_provider_profile(&db, &profile).await.unwrap();

        let back = get_provider_profile(&db, "263771111111")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(back.hourly_rate, Some(25.0));
        assert!(back.profile_completed);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn search_filters_eligibility_and_exclusions() {
        let (db, _dir) = setup_db().await;

        seed_provider(&db, "263771111111", "Harare", 20.0).await;
        seed_provider(&db, "263772222222", "Harare", 15.0).await;
        seed_provider(&db, "263773333333", "Bulawayo", 10.0).await;

        // Unverified provider must never match.
        let mut hidden = User::new("263774444444", "2026-01-01T00:00:00.000Z");
        hidden.account_type = Some(AccountType::ServiceProvider);
        crate::queries::users::create_user(&db, &hidden).await.unwrap();
        let mut hidden_profile = ProviderProfile::new("263774444444");
        hidden_profile.category_id = Some(2);
        hidden_profile.service_id = Some(5);
        hidden_profile.profile_completed = true;
        upsert_provider_profile(&db, &hidden_profile).await.unwrap();

        let all = find_available_providers(&db, 5, 2, None, &[]).await.unwrap();
        assert_eq!(all.len(), 3);
        // Cheapest first.
        assert_eq!(all[0].phone, "263773333333");

        let harare = find_available_providers(&db, 5, 2, Some("Harare"), &[])
            .await
            .unwrap();
        assert_eq!(harare.len(), 2);

        let excluded = find_available_providers(&db, 5, 2, None, &["263773333333".into()])
            .await
            .unwrap();
        assert_eq!(excluded.len(), 2);
        assert!(excluded.iter().all(|c| c.phone != "263773333333"));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn restricted_providers_are_hidden() {
        let (db, _dir) = setup_db().await;

        seed_provider(&db, "263771111111", "Harare", 20.0).await;
        let mut profile = get_provider_profile(&db, "263771111111")
            .await
            .unwrap()
            .unwrap();
        profile.payment_standing = PaymentStanding::Restricted;
        upsert_provider_profile(&db, &profile).await.unwrap();

        let found = find_available_providers(&db, 5, 2, None, &[]).await.unwrap();
        assert!(found.is_empty());

        db.close().await.unwrap();
    }
}
