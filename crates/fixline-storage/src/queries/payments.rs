// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Platform fee records owed by providers after completed jobs.

use fixline_core::types::PaymentRecord;
use fixline_core::FixlineError;
use rusqlite::params;

use crate::database::Database;

pub async fn record_payment(db: &Database, payment: &PaymentRecord) -> Result<(), FixlineError> {
    let payment = payment.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO payments (id, request_id, provider_phone, amount, status, due_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    payment.id,
                    payment.request_id,
                    payment.provider_phone,
                    payment.amount,
                    payment.status.to_string(),
                    payment.due_at,
                    payment.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn list_payments_for_provider(
    db: &Database,
    phone: &str,
) -> Result<Vec<PaymentRecord>, FixlineError> {
    let phone = phone.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, request_id, provider_phone, amount, status, due_at, created_at
                 FROM payments WHERE provider_phone = ?1 ORDER BY created_at DESC",
            )?;
            let rows = stmt.query_map(params![phone], |row| {
                let status: String = row.get(4)?;
                Ok(PaymentRecord {
                    id: row.get(0)?,
                    request_id: row.get(1)?,
                    provider_phone: row.get(2)?,
                    amount: row.get(3)?,
                    status: super::parse_enum(4, &status)?,
                    due_at: row.get(5)?,
                    created_at: row.get(6)?,
                })
            })?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Flips pending payments past their due date to overdue, then recomputes
/// every provider's standing from their overdue count: 3+ restricts, 1+
/// flags payment due. Standing never improves here since nothing in the
/// system marks payments paid.
pub async fn sweep_overdue(db: &Database, now: &str) -> Result<u64, FixlineError> {
    let now = now.to_string();
    db.connection()
        .call(move |conn| {
            let flipped = conn.execute(
                "UPDATE payments SET status = 'overdue'
                 WHERE status = 'pending' AND due_at < ?1",
                params![now],
            )?;
            if flipped > 0 {
                conn.execute(
                    "UPDATE provider_profiles SET
                         outstanding_payments = (
                             SELECT COUNT(*) FROM payments p
                             WHERE p.provider_phone = provider_profiles.phone
                               AND p.status = 'overdue'),
                         payment_standing = CASE
                             WHEN (SELECT COUNT(*) FROM payments p
                                   WHERE p.provider_phone = provider_profiles.phone
                                     AND p.status = 'overdue') >= 3 THEN 'restricted'
                             WHEN (SELECT COUNT(*) FROM payments p
                                   WHERE p.provider_phone = provider_profiles.phone
                                     AND p.status = 'overdue') >= 1 THEN 'payment_due'
                             ELSE payment_standing
                         END",
                    [],
                )?;
            }
            Ok(flipped as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fixline_core::types::PaymentStatus;
    use tempfile::tempdir;

    #[tokio::test]
    async fn record_and_list_for_provider() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("payments.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        let payment = PaymentRecord {
            id: "pay-1".into(),
            request_id: "req-1".into(),
            provider_phone: "263779999999".into(),
            amount: 5.0,
            status: PaymentStatus::Pending,
            due_at: "2026-01-08T00:00:00.000Z".into(),
            created_at: "2026-01-01T00:00:00.000Z".into(),
        };
        record_payment(&db, &payment).await.unwrap();

        let listed = list_payments_for_provider(&db, "263779999999").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].status, PaymentStatus::Pending);
        assert_eq!(listed[0].amount, 5.0);

        assert!(list_payments_for_provider(&db, "263770000000")
            .await
            .unwrap()
            .is_empty());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn sweep_flips_overdue_and_restricts_repeat_offenders() {
        use fixline_core::types::{PaymentStanding, ProviderProfile, User};

        let dir = tempdir().unwrap();
        let db_path = dir.path().join("sweep.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        let phone = "263779999999";
        let user = User::new(phone, "2026-01-01T00:00:00.000Z");
        crate::queries::users::create_user(&db, &user).await.unwrap();
        let profile = ProviderProfile::new(phone);
        crate::queries::providers::upsert_provider_profile(&db, &profile)
            .await
            .unwrap();

        for (i, due) in [
            "2026-01-08T00:00:00.000Z",
            "2026-01-15T00:00:00.000Z",
            "2026-01-22T00:00:00.000Z",
            "2026-09-01T00:00:00.000Z", // not yet due
        ]
        .iter()
        .enumerate()
        {
            let payment = PaymentRecord {
                id: format!("pay-{i}"),
                request_id: format!("req-{i}"),
                provider_phone: phone.into(),
                amount: 5.0,
                status: PaymentStatus::Pending,
                due_at: (*due).into(),
                created_at: "2026-01-01T00:00:00.000Z".into(),
            };
            record_payment(&db, &payment).await.unwrap();
        }

        let flipped = sweep_overdue(&db, "2026-02-01T00:00:00.000Z").await.unwrap();
        assert_eq!(flipped, 3);

        let listed = list_payments_for_provider(&db, phone).await.unwrap();
        assert_eq!(
            listed.iter().filter(|p| p.status == PaymentStatus::Overdue).count(),
            3
        );
        assert_eq!(
            listed.iter().filter(|p| p.status == PaymentStatus::Pending).count(),
            1
        );

        let profile = crate::queries::providers::get_provider_profile(&db, phone)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(profile.payment_standing, PaymentStanding::Restricted);
        assert_eq!(profile.outstanding_payments, 3);

        // Nothing left to flip; the sweep is idempotent.
        let again = sweep_overdue(&db, "2026-02-01T00:00:00.000Z").await.unwrap();
        assert_eq!(again, 0);

        db.close().await.unwrap();
    }
}
