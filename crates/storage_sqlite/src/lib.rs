use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_types::{ChatId, ConversationTurn, TranscriptStore};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

pub const CURRENT_DB_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub chat_id: ChatId,
    pub turn_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SqliteTranscriptStore {
    pool: SqlitePool,
}

impl SqliteTranscriptStore {
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&format!(
            "sqlite://{}",
            path.as_ref().to_string_lossy()
        ))?
        .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS metadata (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS conversations (
                chat_id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS turns (
                id TEXT PRIMARY KEY,
                seq INTEGER NOT NULL,
                chat_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY(chat_id) REFERENCES conversations(chat_id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO metadata(key, value)
            VALUES ('schema_version', ?1)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(CURRENT_DB_SCHEMA_VERSION.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn schema_version(&self) -> Result<u32> {
        let row = sqlx::query("SELECT value FROM metadata WHERE key = 'schema_version'")
            .fetch_one(&self.pool)
            .await?;
        let version = row.get::<String, _>("value").parse::<u32>()?;
        Ok(version)
    }

    pub async fn list_conversations(&self) -> Result<Vec<ConversationSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT c.chat_id, c.created_at, c.updated_at, COUNT(t.id) AS turn_count
            FROM conversations c
            LEFT JOIN turns t ON t.chat_id = c.chat_id
            GROUP BY c.chat_id
            ORDER BY c.updated_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(map_conversation_row).collect()
    }
}

#[async_trait]
impl TranscriptStore for SqliteTranscriptStore {
    async fn append_turn(&self, turn: &ConversationTurn) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO conversations(chat_id, created_at, updated_at)
            VALUES (?1, ?2, ?2)
            ON CONFLICT(chat_id) DO UPDATE SET updated_at = excluded.updated_at
            "#,
        )
        .bind(&turn.chat_id)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO turns(id, seq, chat_id, role, content, status, created_at)
            VALUES (
                ?1,
                (SELECT COALESCE(MAX(seq), 0) + 1 FROM turns WHERE chat_id = ?2),
                ?2, ?3, ?4, ?5, ?6
            )
            "#,
        )
        .bind(turn.id.to_string())
        .bind(&turn.chat_id)
        .bind(serde_json::to_string(&turn.role)?)
        .bind(&turn.content)
        .bind(serde_json::to_string(&turn.status)?)
        .bind(turn.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn list_turns(&self, chat_id: &str) -> Result<Vec<ConversationTurn>> {
        let rows = sqlx::query(
            r#"
            SELECT id, chat_id, role, content, status, created_at
            FROM turns
            WHERE chat_id = ?1
            ORDER BY seq ASC
            "#,
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(map_turn_row).collect()
    }
}

fn map_conversation_row(row: sqlx::sqlite::SqliteRow) -> Result<ConversationSummary> {
    Ok(ConversationSummary {
        chat_id: row.get("chat_id"),
        turn_count: row.get::<i64, _>("turn_count").try_into()?,
        created_at: parse_rfc3339(row.get::<String, _>("created_at"))?,
        updated_at: parse_rfc3339(row.get::<String, _>("updated_at"))?,
    })
}

fn map_turn_row(row: sqlx::sqlite::SqliteRow) -> Result<ConversationTurn> {
    let role_str: String = row.get("role");
    let status_str: String = row.get("status");
    Ok(ConversationTurn {
        id: Uuid::parse_str(row.get::<String, _>("id").as_str())?,
        chat_id: row.get("chat_id"),
        role: serde_json::from_str(&role_str).context("invalid role in database")?,
        content: row.get("content"),
        status: serde_json::from_str(&status_str).context("invalid status in database")?,
        created_at: parse_rfc3339(row.get::<String, _>("created_at"))?,
    })
}

fn parse_rfc3339(value: String) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(&value)?.with_timezone(&Utc))
}
