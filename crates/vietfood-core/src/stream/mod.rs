//! Conversation audit stream
//!
//! Every turn is appended twice: the user's message before the model is
//! called, the assistant's reply once the tool loop settles. Entries are
//! immutable. Per-user order follows turn order because a user's turns are
//! serialized by the session lock; nothing is promised across users.
//!
//! - [`InMemoryMessageStream`]: tests and development
//! - [`RedisMessageStream`]: `XADD` onto a Redis stream
//! - [`MessageWorker`]: drains the Redis stream into a [`MessageLog`]

mod redis_stream;
mod worker;

pub use redis_stream::RedisMessageStream;
pub use worker::{MessageLog, MessageWorker, WorkerConfig};

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Who wrote a logged message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The customer
    User,
    /// The sales agent
    Assistant,
}

impl Role {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Parse a stored role
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One logged message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamMessage {
    /// Owner of the conversation
    pub user_id: String,
    /// Message text
    pub content: String,
    /// Author
    pub role: Role,
    /// When the message was appended
    pub timestamp: DateTime<Utc>,
}

impl StreamMessage {
    /// A customer message
    #[must_use]
    pub fn user(user_id: impl Into<String>, content: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            content: content.into(),
            role: Role::User,
            timestamp: at,
        }
    }

    /// An agent reply
    #[must_use]
    pub fn assistant(
        user_id: impl Into<String>,
        content: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            role: Role::Assistant,
            ..Self::user(user_id, content, at)
        }
    }
}

/// Append-only audit log of turns
#[async_trait]
pub trait MessageStream: Send + Sync {
    /// Append one message; returns the entry id
    async fn append(&self, message: &StreamMessage) -> Result<String>;
}

/// Stream held in process memory
#[derive(Debug, Default)]
pub struct InMemoryMessageStream {
    entries: Mutex<Vec<(String, StreamMessage)>>,
    seq: AtomicU64,
}

impl InMemoryMessageStream {
    /// Create an empty stream
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries in append order
    #[must_use]
    pub fn entries(&self) -> Vec<StreamMessage> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, m)| m.clone())
            .collect()
    }

    /// Entries of one user in append order
    #[must_use]
    pub fn for_user(&self, user_id: &str) -> Vec<StreamMessage> {
        self.entries()
            .into_iter()
            .filter(|m| m.user_id == user_id)
            .collect()
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether nothing was appended yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MessageStream for InMemoryMessageStream {
    async fn append(&self, message: &StreamMessage) -> Result<String> {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let id = format!("{}-{}", message.timestamp.timestamp_millis(), seq);
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((id.clone(), message.clone()));
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_append_order() {
        let stream = InMemoryMessageStream::new();
        let now = Utc::now();
        let a = stream.append(&StreamMessage::user("u1", "chào", now)).await.unwrap();
        stream.append(&StreamMessage::user("u2", "hi", now)).await.unwrap();
        let b = stream
            .append(&StreamMessage::assistant("u1", "Dạ chào anh", now))
            .await
            .unwrap();
        assert_ne!(a, b);

        let u1 = stream.for_user("u1");
        assert_eq!(u1.len(), 2);
        assert_eq!(u1[0].role, Role::User);
        assert_eq!(u1[1].role, Role::Assistant);
        assert_eq!(stream.len(), 3);
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("assistant"), Some(Role::Assistant));
        assert_eq!(Role::parse("system"), None);
        assert_eq!(Role::User.to_string(), "user");
    }
}
