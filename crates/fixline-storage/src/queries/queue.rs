// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue operations for crash-safe background jobs.
//!
//! Entries may carry a future `available_at`, which is how the matching
//! pipeline implements its retry interval: a rescheduled search cycle is a
//! fresh entry that only becomes visible once the interval elapses.

use std::time::Duration;

use fixline_core::types::QueueEntry;
use fixline_core::FixlineError;
use rusqlite::params;

use crate::database::Database;

/// Enqueue a new item, optionally delayed. Returns the auto-generated queue
/// entry ID.
pub async fn enqueue(
    db: &Database,
    queue_name: &str,
    payload: &str,
    delay: Option<Duration>,
) -> Result<i64, FixlineError> {
    let queue_name = queue_name.to_string();
    let payload = payload.to_string();
    let available_at = delay.map(|d| {
        let delta = chrono::Duration::from_std(d).unwrap_or_else(|_| chrono::Duration::zero());
        (chrono::Utc::now() + delta)
            .format("%Y-%m-%dT%H:%M:%S%.3fZ")
            .to_string()
    });
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO queue (queue_name, payload, available_at)
                 VALUES (?1, ?2, COALESCE(?3, strftime('%Y-%m-%dT%H:%M:%fZ', 'now')))",
                params![queue_name, payload, available_at],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Dequeue the next available pending entry from the named queue.
///
/// Atomically selects the oldest pending entry whose `available_at` has
/// passed and marks it "processing" with a 5-minute lock timeout. Returns
/// `None` if nothing is due.
pub async fn dequeue(db: &Database, queue_name: &str) -> Result<Option<QueueEntry>, FixlineError> {
    let queue_name = queue_name.to_string();
    db.connection()
        .call(move |conn| {
            // Transaction to atomically find + claim the next entry.
            let tx = conn.transaction()?;

            let result = {
                let mut stmt = tx.prepare(
                    "SELECT id, queue_name, payload, status, attempts, max_attempts,
                            available_at, created_at, updated_at, locked_until
                     FROM queue
                     WHERE queue_name = ?1 AND status = 'pending'
                       AND available_at <= strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     ORDER BY id ASC
                     LIMIT 1",
                )?;
                stmt.query_row(params![queue_name], |row| {
                    Ok(QueueEntry {
                        id: row.get(0)?,
                        queue_name: row.get(1)?,
                        payload: row.get(2)?,
                        status: row.get(3)?,
                        attempts: row.get(4)?,
                        max_attempts: row.get(5)?,
                        available_at: row.get(6)?,
                        created_at: row.get(7)?,
                        updated_at: row.get(8)?,
                        locked_until: row.get(9)?,
                    })
                })
            };

            match result {
                Ok(entry) => {
                    tx.execute(
                        "UPDATE queue SET status = 'processing',
                         locked_until = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', '+5 minutes'),
                         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                         WHERE id = ?1",
                        params![entry.id],
                    )?;
                    tx.commit()?;

                    Ok(Some(QueueEntry {
                        status: "processing".to_string(),
                        ..entry
                    }))
                }
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    tx.commit()?;
                    Ok(None)
                }
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Acknowledge successful processing: marks the entry "completed".
pub async fn ack(db: &Database, id: i64) -> Result<(), FixlineError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE queue SET status = 'completed',
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mark a queue entry as failed.
///
/// Increments attempts. If attempts >= max_attempts, sets status to "failed".
/// Otherwise resets to "pending" for retry and clears the lock.
pub async fn fail(db: &Database, id: i64) -> Result<(), FixlineError> {
    db.connection()
        .call(move |conn| {
            let (attempts, max_attempts): (i32, i32) = conn.query_row(
                "SELECT attempts, max_attempts FROM queue WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            let new_attempts = attempts + 1;
            if new_attempts >= max_attempts {
                conn.execute(
                    "UPDATE queue SET status = 'failed', attempts = ?1,
                     locked_until = NULL,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?2",
                    params![new_attempts, id],
                )?;
            } else {
                conn.execute(
                    "UPDATE queue SET status = 'pending', attempts = ?1,
                     locked_until = NULL,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?2",
                    params![new_attempts, id],
                )?;
            }
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn enqueue_and_dequeue_lifecycle() {
        let (db, _dir) = setup_db().await;

        let id = enqueue(&db, "match", r#"{"request_id":"req-1"}"#, None)
            .await
            .unwrap();
        assert!(id > 0);

        let entry = dequeue(&db, "match").await.unwrap();
        assert!(entry.is_some());
        let entry = entry.unwrap();
        assert_eq!(entry.id, id);
        assert_eq!(entry.status, "processing");
        assert_eq!(entry.queue_name, "match");
        assert_eq!(entry.payload, r#"{"request_id":"req-1"}"#);

        // Queue should be empty now (no more pending).
        let next = dequeue(&db, "match").await.unwrap();
        assert!(next.is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn delayed_entries_are_invisible_until_due() {
        let (db, _dir) = setup_db().await;

        enqueue(&db, "match", "later", Some(Duration::from_secs(3600)))
            .await
            .unwrap();
        assert!(dequeue(&db, "match").await.unwrap().is_none());

        // An immediate entry is still claimable past the delayed one.
        let now_id = enqueue(&db, "match", "now", None).await.unwrap();
        let entry = dequeue(&db, "match").await.unwrap().unwrap();
        assert_eq!(entry.id, now_id);
        assert_eq!(entry.payload, "now");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn ack_marks_completed() {
        let (db, _dir) = setup_db().await;

        let id = enqueue(&db, "test", "payload", None).await.unwrap();
        let _entry = dequeue(&db, "test").await.unwrap().unwrap();

        ack(&db, id).await.unwrap();

        let status: String = db
            .connection()
            .call(move |conn| -> Result<String, rusqlite::Error> {
                conn.query_row(
                    "SELECT status FROM queue WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();
        assert_eq!(status, "completed");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn fail_increments_attempts_and_retries() {
        let (db, _dir) = setup_db().await;

        let id = enqueue(&db, "test", "payload", None).await.unwrap();
        let _entry = dequeue(&db, "test").await.unwrap().unwrap();

        // Default max_attempts is 3. First fail: attempts=1, back to pending.
        fail(&db, id).await.unwrap();

        let (status, attempts): (String, i32) = db
            .connection()
            .call(move |conn| -> Result<(String, i32), rusqlite::Error> {
                conn.query_row(
                    "SELECT status, attempts FROM queue WHERE id = ?1",
                    params![id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
            })
            .await
            .unwrap();
        assert_eq!(status, "pending");
        assert_eq!(attempts, 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn fail_marks_permanently_failed_at_max_attempts() {
        let (db, _dir) = setup_db().await;

        let id = enqueue(&db, "test", "payload", None).await.unwrap();

        for _ in 0..3 {
            let _entry = dequeue(&db, "test").await.unwrap().unwrap();
            fail(&db, id).await.unwrap();
        }

        let status: String = db
            .connection()
            .call(move |conn| -> Result<String, rusqlite::Error> {
                conn.query_row(
                    "SELECT status FROM queue WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();
        assert_eq!(status, "failed");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_writers_no_sqlite_busy() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("concurrent_test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..10 {
            let conn = db.connection().clone();
            let handle = tokio::spawn(async move {
                conn.call(move |conn| -> Result<(), rusqlite::Error> {
                    conn.execute(
                        "INSERT INTO queue (queue_name, payload) VALUES (?1, ?2)",
                        params![format!("q-{i}"), format!(r#"{{"n":{i}}}"#)],
                    )?;
                    Ok(())
                })
                .await
            });
            handles.push(handle);
        }

        for handle in handles {
            let result = handle.await.unwrap();
            assert!(result.is_ok(), "concurrent write failed: {result:?}");
        }

        let count: i64 = db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT COUNT(*) FROM queue", [], |row| row.get(0))
            })
            .await
            .unwrap();
        assert_eq!(count, 10);

        db.close().await.unwrap();
    }
}
