//! Conversation log: one row per answered webhook message.
//!
//! Rows are only ever inserted; the server never updates or deletes them.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS conversations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    sender TEXT NOT NULL,
    message TEXT NOT NULL,
    response TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#;

const MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A stored exchange.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Conversation {
    pub id: i64,
    pub sender: String,
    pub message: String,
    pub response: String,
    pub created_at: NaiveDateTime,
}

/// The fields the handler supplies; `id` and `created_at` are assigned by the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewConversation {
    pub sender: String,
    pub message: String,
    pub response: String,
}

/// Persistence for conversation rows.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Insert one row inside its own transaction. On failure nothing is written.
    async fn insert(&self, conversation: &NewConversation) -> Result<Conversation, StoreError>;
    /// Most recent rows first.
    async fn recent(&self, limit: u32) -> Result<Vec<Conversation>, StoreError>;
}

/// SQLite-backed store.
#[derive(Clone)]
pub struct SqliteConversationStore {
    pool: SqlitePool,
}

impl SqliteConversationStore {
    /// Open (creating the file if needed) and ensure the schema exists.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await?;
        Self::from_pool(pool).await
    }

    /// Open an existing database without touching its schema. Fails instead of creating a file
    /// when `url` points nowhere.
    pub async fn open_existing(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(false);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    /// Single-connection in-memory database. Every pooled connection to `:memory:` would
    /// otherwise see its own empty database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::query(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl ConversationStore for SqliteConversationStore {
    async fn insert(&self, conversation: &NewConversation) -> Result<Conversation, StoreError> {
        let mut tx = self.pool.begin().await?;
        let inserted = sqlx::query_as::<_, Conversation>(
            r#"
            INSERT INTO conversations (sender, message, response)
            VALUES (?1, ?2, ?3)
            RETURNING id, sender, message, response, created_at
            "#,
        )
        .bind(&conversation.sender)
        .bind(&conversation.message)
        .bind(&conversation.response)
        .fetch_one(&mut *tx)
        .await;
        match inserted {
            Ok(row) => {
                tx.commit().await?;
                Ok(row)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    log::debug!("store: rollback after failed insert: {}", rollback);
                }
                Err(e.into())
            }
        }
    }

    async fn recent(&self, limit: u32) -> Result<Vec<Conversation>, StoreError> {
        let rows = sqlx::query_as::<_, Conversation>(
            "SELECT id, sender, message, response, created_at FROM conversations ORDER BY id DESC LIMIT ?1",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
