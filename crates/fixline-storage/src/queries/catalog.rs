// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Service catalog reads. The catalog is seeded by migration and read-only
//! at runtime.

use fixline_core::types::{Category, Service};
use fixline_core::FixlineError;
use rusqlite::params;

use crate::database::Database;

pub async fn list_categories(db: &Database) -> Result<Vec<Category>, FixlineError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare("SELECT id, name FROM categories ORDER BY id")?;
            let rows = stmt.query_map([], |row| {
                Ok(Category {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn list_services(db: &Database, category_id: i64) -> Result<Vec<Service>, FixlineError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, category_id, name FROM services WHERE category_id = ?1 ORDER BY id",
            )?;
            let rows = stmt.query_map(params![category_id], |row| {
                Ok(Service {
                    id: row.get(0)?,
                    category_id: row.get(1)?,
                    name: row.get(2)?,
                })
            })?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
