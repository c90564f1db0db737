//! SQLite storage backend
//!
//! # Usage
//!
//! ```no_run
//! use vietfood_core::storage::SqliteStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteStore::new("data/vietfood.db").await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, Result};
use crate::profile::{ProfileStore, ProfileSummary};
use crate::stream::{MessageLog, Role, StreamMessage};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// SQLite-backed message log and profile store
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database at `path`
    ///
    /// # Errors
    ///
    /// Returns error if database creation or schema setup fails.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Store(format!("Failed to create database directory: {}", e))
            })?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(|e| Error::Store(format!("Invalid SQLite path: {}", e)))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| Error::Store(format!("Failed to connect to SQLite: {}", e)))?;

        let store = Self { pool };
        store.init_schema().await?;

        info!(path = %path.display(), "SQLite store initialized");
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                stream_id TEXT NOT NULL UNIQUE,
                user_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Store(format!("Failed to create messages table: {}", e)))?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_messages_user ON messages(user_id, id)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Store(format!("Failed to create index: {}", e)))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS profiles (
                user_id TEXT PRIMARY KEY,
                summary TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Store(format!("Failed to create profiles table: {}", e)))?;

        debug!("SQLite schema initialized");
        Ok(())
    }

    /// Check database health
    pub async fn health_check(&self) -> Result<bool> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::Store(format!("Health check failed: {}", e)))?;
        Ok(true)
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw).map_or_else(
        |e| {
            warn!(value = %raw, error = %e, "Unparseable stored timestamp");
            DateTime::<Utc>::UNIX_EPOCH
        },
        |t| t.with_timezone(&Utc),
    )
}

#[async_trait]
impl MessageLog for SqliteStore {
    async fn persist(&self, entry_id: &str, message: &StreamMessage) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO messages (stream_id, user_id, role, content, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry_id)
        .bind(&message.user_id)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(message.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Store(format!("Failed to persist message: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn history(&self, user_id: &str, limit: usize) -> Result<Vec<StreamMessage>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows: Vec<(String, String, String, String)> = sqlx::query_as(
            r#"
            SELECT user_id, role, content, created_at FROM messages
            WHERE user_id = ?
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Store(format!("Failed to load history: {}", e)))?;

        Ok(rows
            .into_iter()
            .filter_map(|(user_id, role, content, created_at)| {
                let role = Role::parse(&role)?;
                Some(StreamMessage {
                    user_id,
                    content,
                    role,
                    timestamp: parse_timestamp(&created_at),
                })
            })
            .collect())
    }
}

#[async_trait]
impl ProfileStore for SqliteStore {
    async fn load(&self, user_id: &str) -> Result<Option<ProfileSummary>> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT summary, updated_at FROM profiles WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| Error::Store(format!("Failed to load profile: {}", e)))?;

        Ok(row.map(|(text, updated_at)| ProfileSummary {
            user_id: user_id.to_string(),
            text,
            updated_at: parse_timestamp(&updated_at),
        }))
    }

    async fn save(&self, user_id: &str, text: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO profiles (user_id, summary, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                summary = excluded.summary,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(text)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Store(format!("Failed to save profile: {}", e)))?;

        debug!(user_id = %user_id, "Profile saved to SQLite");
        Ok(())
    }
}
