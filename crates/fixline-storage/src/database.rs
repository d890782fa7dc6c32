// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management.
//!
//! A [`Database`] wraps a single `tokio_rusqlite` connection whose worker
//! thread serializes all reads and writes. Opening a database runs the
//! embedded migrations and configures WAL mode before the async handle is
//! handed out.

use fixline_core::FixlineError;

/// Convert a `tokio_rusqlite` error into the workspace storage error.
pub fn map_tr_err(e: tokio_rusqlite::Error) -> FixlineError {
    FixlineError::Storage {
        source: Box::new(e),
    }
}

fn map_sql_err(e: rusqlite::Error) -> FixlineError {
    FixlineError::Storage {
        source: Box::new(e),
    }
}

/// A handle to the SQLite database.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path`, run pending migrations, and
    /// configure WAL mode with a busy timeout.
    pub async fn open(path: &str) -> Result<Self, FixlineError> {
        // Migrations use a short-lived blocking connection; refinery needs
        // exclusive `&mut rusqlite::Connection` access.
        let migrate_path = path.to_string();
        tokio::task::spawn_blocking(move || -> Result<(), FixlineError> {
            let mut conn = rusqlite::Connection::open(&migrate_path).map_err(map_sql_err)?;
            conn.pragma_update(None, "journal_mode", "WAL")
                .map_err(map_sql_err)?;
            crate::migrations::run_migrations(&mut conn)
        })
        .await
        .map_err(|e| FixlineError::Internal(format!("migration task failed: {e}")))??;

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(map_sql_err)?;
        conn.call(|conn| {
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.busy_timeout(std::time::Duration::from_secs(5))?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        Ok(Self { conn })
    }

    /// The underlying serialized connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL ahead of shutdown.
    pub async fn close(&self) -> Result<(), FixlineError> {
        self.conn
            .call(|conn| {
                conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_schema() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("open.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();

        // All tables from the initial migration should exist.
        let count: i64 = db
            .connection()
            .call(|conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                     AND name IN ('users', 'provider_profiles', 'categories', 'services',
                                  'service_requests', 'turns', 'queue', 'payments')",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();
        assert_eq!(count, 8);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn open_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reopen.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        db.close().await.unwrap();
        drop(db);

        // Re-opening must not re-run applied migrations.
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn catalog_is_seeded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("seed.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();

        let (categories, services): (i64, i64) = db
            .connection()
            .call(|conn| {
                let c = conn.query_row("SELECT COUNT(*) FROM categories", [], |r| r.get(0))?;
                let s = conn.query_row("SELECT COUNT(*) FROM services", [], |r| r.get(0))?;
                Ok::<_, rusqlite::Error>((c, s))
            })
            .await
            .unwrap();
        assert!(categories >= 4);
        assert!(services >= 9);

        db.close().await.unwrap();
    }
}
