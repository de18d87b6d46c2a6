use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub type ChatId = String;
pub type TurnId = Uuid;
pub type TableRow = IndexMap<String, Value>;

/// Body of `POST /assistant/conversation`.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRequest {
    pub chat_id: ChatId,
    pub content: String,
}

impl ConversationRequest {
    pub fn new(chat_id: impl Into<ChatId>, content: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            content: content.into(),
        }
    }

    /// Rejects a blank chat id or a blank message.
    pub fn validate(&self) -> Result<()> {
        if self.chat_id.trim().is_empty() {
            bail!("chat id is required");
        }
        if self.content.trim().is_empty() {
            bail!("message content is required");
        }
        Ok(())
    }
}

/// One newline-delimited JSON line of the conversation stream.
///
/// Only the `response` shape is modelled; any other `type` fails to
/// deserialize and the line is dropped by the reader.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamChunk {
    Response { content: String },
}

/// Reply text owned by the caller while a stream is in flight.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct AssembledMessage {
    text: String,
    sealed: bool,
}

impl AssembledMessage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a delta. Ignored once the message has been sealed.
    pub fn append(&mut self, delta: &str) {
        if !self.sealed {
            self.text.push_str(delta);
        }
    }

    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum StreamOutcome {
    Completed,
    Aborted,
}

#[async_trait]
pub trait ConversationStream: Send + Sync {
    /// Streams the assistant reply for `request` into `message`, calling
    /// `on_delta` with coalesced text increments in arrival order.
    async fn stream_reply(
        &self,
        request: &ConversationRequest,
        message: &mut AssembledMessage,
        cancel: &CancellationToken,
        on_delta: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<StreamOutcome>;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Text,
    Number,
    Date,
    Boolean,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub key: String,
    pub original_key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TableModel {
    pub columns: Vec<Column>,
    pub rows: Vec<TableRow>,
}

impl TableModel {
    /// A table is only worth showing with at least one column and one row.
    pub fn is_renderable(&self) -> bool {
        !self.columns.is_empty() && !self.rows.is_empty()
    }

    pub fn column(&self, key: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.key == key)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Hash)]
pub enum SessionRole {
    Owner,
    Admin,
    Member,
    Other(String),
}

impl SessionRole {
    pub fn as_str(&self) -> &str {
        match self {
            SessionRole::Owner => "Owner",
            SessionRole::Admin => "Admin",
            SessionRole::Member => "Member",
            SessionRole::Other(raw) => raw,
        }
    }

    pub fn is_owner(&self) -> bool {
        matches!(self, SessionRole::Owner)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    Completed,
    Errored,
    Aborted,
}

impl From<StreamOutcome> for TurnStatus {
    fn from(value: StreamOutcome) -> Self {
        match value {
            StreamOutcome::Completed => TurnStatus::Completed,
            StreamOutcome::Aborted => TurnStatus::Aborted,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: TurnId,
    pub chat_id: ChatId,
    pub role: TurnRole,
    pub content: String,
    pub status: TurnStatus,
    pub created_at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn user(chat_id: impl Into<ChatId>, content: impl Into<String>) -> Self {
        Self {
            id: TurnId::new_v4(),
            chat_id: chat_id.into(),
            role: TurnRole::User,
            content: content.into(),
            status: TurnStatus::Completed,
            created_at: Utc::now(),
        }
    }

    pub fn assistant(
        chat_id: impl Into<ChatId>,
        content: impl Into<String>,
        status: TurnStatus,
    ) -> Self {
        Self {
            id: TurnId::new_v4(),
            chat_id: chat_id.into(),
            role: TurnRole::Assistant,
            content: content.into(),
            status,
            created_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait TranscriptStore: Send + Sync {
    async fn append_turn(&self, turn: &ConversationTurn) -> Result<()>;
    async fn list_turns(&self, chat_id: &str) -> Result<Vec<ConversationTurn>>;
}
