// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation turn history, the durable source of the bounded model window.

use fixline_core::types::Turn;
use fixline_core::FixlineError;
use rusqlite::params;

use crate::database::Database;

pub async fn append_turn(db: &Database, turn: &Turn) -> Result<(), FixlineError> {
    let turn = turn.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO turns (id, phone, role, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![turn.id, turn.phone, turn.role, turn.content, turn.created_at],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The most recent `limit` turns for a phone, oldest first so they can be
/// handed to the model as-is.
pub async fn recent_turns(db: &Database, phone: &str, limit: i64) -> Result<Vec<Turn>, FixlineError> {
    let phone = phone.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, phone, role, content, created_at FROM turns
                 WHERE phone = ?1 ORDER BY rowid DESC LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![phone, limit], |row| {
                Ok(Turn {
                    id: row.get(0)?,
                    phone: row.get(1)?,
                    role: row.get(2)?,
                    content: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })?;
            let mut turns = rows.collect::<Result<Vec<_>, _>>()?;
            turns.reverse();
            Ok(turns)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete all but the newest `keep` turns for a phone.
pub async fn trim_turns(db: &Database, phone: &str, keep: i64) -> Result<(), FixlineError> {
    let phone = phone.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM turns WHERE phone = ?1 AND rowid NOT IN
                     (SELECT rowid FROM turns WHERE phone = ?1
                      ORDER BY rowid DESC LIMIT ?2)",
                params![phone, keep],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
