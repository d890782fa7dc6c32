// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User record operations.

use fixline_core::types::User;
use fixline_core::FixlineError;
use rusqlite::params;

use crate::database::Database;

const USER_COLUMNS: &str = "phone, name, account_type, terms_accepted, verified, national_id,
     city, address, latitude, longitude, status, created_at, updated_at";

fn user_from_row(row: &rusqlite::Row<'_>) -> Result<User, rusqlite::Error> {
    let account_type: Option<String> = row.get(2)?;
    let account_type = match account_type {
        Some(s) => Some(super::parse_enum(2, &s)?),
        None => None,
    };
    let status: String = row.get(10)?;
    Ok(User {
        phone: row.get(0)?,
        name: row.get(1)?,
        account_type,
        terms_accepted: row.get(3)?,
        verified: row.get(4)?,
        national_id: row.get(5)?,
        city: row.get(6)?,
        address: row.get(7)?,
        latitude: row.get(8)?,
        longitude: row.get(9)?,
        status: super::parse_enum(10, &status)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

pub async fn get_user(db: &Database, phone: &str) -> Result<Option<User>, FixlineError> {
    let phone = phone.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE phone = ?1"),
                params![phone],
                user_from_row,
            );
            match result {
                Ok(user) => Ok(Some(user)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn create_user(db: &Database, user: &User) -> Result<(), FixlineError> {
    let user = user.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO users (phone, name, account_type, terms_accepted, verified,
                                    national_id, city, address, latitude, longitude, status,
                                    created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    user.phone,
                    user.name,
                    user.account_type.map(|t| t.to_string()),
                    user.terms_accepted,
                    user.verified,
                    user.national_id,
                    user.city,
                    user.address,
                    user.latitude,
                    user.longitude,
                    user.status.to_string(),
                    user.created_at,
                    user.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Last-write-wins full-record update, keyed by phone.
pub async fn update_user(db: &Database, user: &User) -> Result<(), FixlineError> {
    let user = user.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE users SET name = ?2, account_type = ?3, terms_accepted = ?4,
                     verified = ?5, national_id = ?6, city = ?7, address = ?8,
                     latitude = ?9, longitude = ?10, status = ?11,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE phone = ?1",
                params![
                    user.phone,
                    user.name,
                    user.account_type.map(|t| t.to_string()),
                    user.terms_accepted,
                    user.verified,
                    user.national_id,
                    user.city,
                    user.address,
                    user.latitude,
                    user.longitude,
                    user.status.to_string(),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete a user and their provider profile in one transaction.
pub async fn delete_user(db: &Database, phone: &str) -> Result<(), FixlineError> {
    let phone = phone.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM provider_profiles WHERE phone = ?1",
                params![phone],
            )?;
            tx.execute("DELETE FROM users WHERE phone = ?1", params![phone])?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
