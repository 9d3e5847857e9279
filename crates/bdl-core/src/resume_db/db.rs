//! SQLite-backed resume store implementation.
//!
//! One database file per job. Writes use `synchronous=FULL` so a `put` is on
//! stable storage by the time it returns.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;
use std::time::Duration;

use super::types::ResumeEntry;

/// Handle to a job's resume store.
///
/// Only the job controller writes to it, so a single connection is enough and
/// keeps reads and writes strictly ordered.
#[derive(Clone)]
pub struct ResumeDb {
    pub(crate) pool: Pool<Sqlite>,
}

impl ResumeDb {
    /// Open (or create) the store at `path`. Creates parent dirs if needed.
    pub async fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Full)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .with_context(|| format!("open resume store {}", path.display()))?;
        let db = ResumeDb { pool };
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> Result<()> {
        // Key is the raw bytes of the local absolute path.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS resume (
                path BLOB PRIMARY KEY NOT NULL,
                value TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Look up the entry for a local path. Undecodable values count as absent.
    pub async fn get(&self, path: &Path) -> Result<Option<ResumeEntry>> {
        let row = sqlx::query("SELECT value FROM resume WHERE path = ?1")
            .bind(path_key(path))
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let value: String = row.get("value");
        let entry = ResumeEntry::decode(&value);
        if entry.is_none() {
            tracing::warn!(path = %path.display(), value = %value, "ignoring malformed resume entry");
        }
        Ok(entry)
    }

    /// Insert or overwrite the entry for a local path.
    pub async fn put(&self, path: &Path, entry: ResumeEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO resume (path, value) VALUES (?1, ?2)
            ON CONFLICT(path) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(path_key(path))
        .bind(entry.encode())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Number of recorded paths.
    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM resume")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    /// All entries ordered by key.
    pub async fn entries(&self) -> Result<Vec<(Vec<u8>, String)>> {
        let rows = sqlx::query("SELECT path, value FROM resume ORDER BY path ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| (row.get("path"), row.get("value")))
            .collect())
    }

    /// Flush and close the underlying connection.
    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[cfg(unix)]
fn path_key(path: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    path.as_os_str().as_bytes().to_vec()
}

#[cfg(not(unix))]
fn path_key(path: &Path) -> Vec<u8> {
    path.to_string_lossy().as_bytes().to_vec()
}

#[cfg(test)]
/// Open an in-memory store for tests (no disk I/O).
pub(crate) async fn open_memory() -> Result<ResumeDb> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    let db = ResumeDb { pool };
    db.migrate().await?;
    Ok(db)
}
