//! Conversation store trait: durable chat history.
//!
//! The orchestration loop reads a bounded window of prior turns before a run
//! and writes the user text plus the final response after a successful one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Identifier of a persisted conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub String);

impl ConversationId {
    /// A fresh random id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Who wrote a stored turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Ai => "ai",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "ai" => Some(Self::Ai),
            _ => None,
        }
    }
}

/// One persisted turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredTurn {
    pub sender: Sender,
    /// User text, or the serialized StructuredResponse for AI turns
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Summary row for listing a user's conversations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: ConversationId,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub message_count: usize,
}

/// The conversation store trait.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Create a conversation, optionally owned by a user.
    async fn create_conversation(&self, user_id: Option<&str>) -> std::result::Result<ConversationId, StoreError>;

    /// Whether a conversation exists.
    async fn conversation_exists(&self, id: &ConversationId) -> std::result::Result<bool, StoreError>;

    /// The most recent `limit` turns, oldest first.
    async fn load_recent_turns(
        &self,
        id: &ConversationId,
        limit: usize,
    ) -> std::result::Result<Vec<StoredTurn>, StoreError>;

    /// Append one turn.
    async fn append_turn(&self, id: &ConversationId, sender: Sender, text: &str) -> std::result::Result<(), StoreError>;

    /// Append the user text and the AI response of one run.
    ///
    /// The default implementation appends two turns; stores with
    /// transactions should override it to write both or neither.
    async fn append_exchange(
        &self,
        id: &ConversationId,
        user_text: &str,
        ai_text: &str,
    ) -> std::result::Result<(), StoreError> {
        self.append_turn(id, Sender::User, user_text).await?;
        self.append_turn(id, Sender::Ai, ai_text).await
    }

    /// Conversations owned by `user_id`, newest first.
    async fn list_conversations(&self, user_id: &str) -> std::result::Result<Vec<ConversationSummary>, StoreError>;

    /// Human-readable name of the backend.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_round_trips_through_str() {
        for s in [Sender::User, Sender::Ai] {
            assert_eq!(Sender::parse(s.as_str()), Some(s));
        }
        assert_eq!(Sender::parse("bot"), None);
    }

    #[test]
    fn conversation_id_is_transparent() {
        let id = ConversationId::from("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
    }
}
