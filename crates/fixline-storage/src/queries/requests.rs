// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Service request operations.
//!
//! All status changes go through [`transition_request`], a compare-and-set
//! over the status column. Concurrent actors (booking tools, the matching
//! pipeline, the timeout path) race freely; the single serialized writer
//! plus the status guard guarantees exactly one of them wins.

use fixline_core::types::{RequestStatus, ServiceRequest};
use fixline_core::FixlineError;
use rusqlite::params;

use crate::database::Database;

const REQUEST_COLUMNS: &str = "id, code, client_phone, category_id, service_id, provider_phone,
     status, address, latitude, longitude, attempt_count, search_deadline,
     created_at, updated_at, rejected_providers";

fn request_from_row(row: &rusqlite::Row<'_>) -> Result<ServiceRequest, rusqlite::Error> {
    let status: String = row.get(6)?;
    let rejected: String = row.get(14)?;
    Ok(ServiceRequest {
        id: row.get(0)?,
        code: row.get(1)?,
        client_phone: row.get(2)?,
        category_id: row.get(3)?,
        service_id: row.get(4)?,
        provider_phone: row.get(5)?,
        rejected_providers: parse_phone_list(14, &rejected)?,
        status: super::parse_enum(6, &status)?,
        address: row.get(7)?,
        latitude: row.get(8)?,
        longitude: row.get(9)?,
        attempt_count: row.get(10)?,
        search_deadline: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

fn parse_phone_list(idx: usize, value: &str) -> Result<Vec<String>, rusqlite::Error> {
    serde_json::from_str(value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub async fn create_request(db: &Database, request: &ServiceRequest) -> Result<(), FixlineError> {
    let request = request.clone();
    let rejected = serde_json::to_string(&request.rejected_providers)
        .map_err(|e| FixlineError::Internal(format!("rejection list serialization: {e}")))?;
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO service_requests
                     (id, code, client_phone, category_id, service_id, provider_phone,
                      status, address, latitude, longitude, attempt_count, search_deadline,
                      created_at, updated_at, rejected_providers)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    request.id,
                    request.code,
                    request.client_phone,
                    request.category_id,
                    request.service_id,
                    request.provider_phone,
                    request.status.to_string(),
                    request.address,
                    request.latitude,
                    request.longitude,
                    request.attempt_count,
                    request.search_deadline,
                    request.created_at,
                    request.updated_at,
                    rejected,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn get_request(db: &Database, id: &str) -> Result<Option<ServiceRequest>, FixlineError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {REQUEST_COLUMNS} FROM service_requests WHERE id = ?1"),
                params![id],
                request_from_row,
            );
            match result {
                Ok(request) => Ok(Some(request)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn list_requests_for_client(
    db: &Database,
    phone: &str,
    limit: i64,
) -> Result<Vec<ServiceRequest>, FixlineError> {
    let phone = phone.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {REQUEST_COLUMNS} FROM service_requests
                 WHERE client_phone = ?1 ORDER BY created_at DESC LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![phone, limit], request_from_row)?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn list_requests_for_provider(
    db: &Database,
    phone: &str,
    limit: i64,
) -> Result<Vec<ServiceRequest>, FixlineError> {
    let phone = phone.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {REQUEST_COLUMNS} FROM service_requests
                 WHERE provider_phone = ?1 ORDER BY created_at DESC LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![phone, limit], request_from_row)?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Compare-and-set status transition.
///
/// Returns `true` iff exactly one row changed, i.e. the request was still in
/// `expected` when the update ran. Transitions back to `Pending` clear the
/// assigned provider so the next search cycle starts clean.
pub async fn transition_request(
    db: &Database,
    id: &str,
    expected: RequestStatus,
    next: RequestStatus,
    provider_phone: Option<&str>,
) -> Result<bool, FixlineError> {
    let id = id.to_string();
    let provider = provider_phone.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let changed = match (&provider, next) {
                (Some(p), _) => conn.execute(
                    "UPDATE service_requests
                     SET status = ?1, provider_phone = ?2,
                         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?3 AND status = ?4",
                    params![next.to_string(), p, id, expected.to_string()],
                )?,
                (None, RequestStatus::Pending) => conn.execute(
                    "UPDATE service_requests
                     SET status = ?1, provider_phone = NULL,
                         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?2 AND status = ?3",
                    params![next.to_string(), id, expected.to_string()],
                )?,
                (None, _) => conn.execute(
                    "UPDATE service_requests
                     SET status = ?1, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?2 AND status = ?3",
                    params![next.to_string(), id, expected.to_string()],
                )?,
            };
            Ok(changed == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Records a search attempt. The count is max-guarded so a duplicate
/// at-least-once delivery of an earlier job cannot regress it.
pub async fn record_search_attempt(
    db: &Database,
    id: &str,
    attempt: i64,
) -> Result<(), FixlineError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE service_requests
                 SET attempt_count = MAX(attempt_count, ?2),
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id, attempt],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Appends a declined provider to the request's durable rejection list.
/// Duplicates are dropped; the single serialized writer makes the
/// read-modify-write atomic.
pub async fn record_rejection(
    db: &Database,
    id: &str,
    provider: &str,
) -> Result<(), FixlineError> {
    let id = id.to_string();
    let provider = provider.to_string();
    db.connection()
        .call(move |conn| {
            let current: String = conn.query_row(
                "SELECT rejected_providers FROM service_requests WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )?;
            let mut list = parse_phone_list(0, &current)?;
            if list.contains(&provider) {
                return Ok(());
            }
            list.push(provider);
            let updated = serde_json::to_string(&list).map_err(|e| {
                rusqlite::Error::ToSqlConversionFailure(Box::new(e))
            })?;
            conn.execute(
                "UPDATE service_requests
                 SET rejected_providers = ?2,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id, updated],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
