//! Redis stream writer

use super::{MessageStream, StreamMessage};
use crate::error::{Error, Result};
use async_trait::async_trait;
use tracing::debug;

/// Appends turns to a Redis stream with `XADD`
///
/// Fields per entry: `userId`, `content`, `role`, `timestamp` (RFC 3339).
pub struct RedisMessageStream {
    client: redis::Client,
    stream_key: String,
}

impl RedisMessageStream {
    /// Create a writer for one stream key
    ///
    /// # Errors
    ///
    /// Returns error if the Redis URL is invalid
    pub fn new(redis_url: &str, stream_key: impl Into<String>) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| Error::Stream(format!("Invalid Redis URL: {}", e)))?;
        Ok(Self {
            client,
            stream_key: stream_key.into(),
        })
    }

    /// Stream key entries are written to
    #[must_use]
    pub fn stream_key(&self) -> &str {
        &self.stream_key
    }

    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| Error::Stream(format!("Redis connection failed: {}", e)))
    }
}

#[async_trait]
impl MessageStream for RedisMessageStream {
    async fn append(&self, message: &StreamMessage) -> Result<String> {
        let mut conn = self.get_connection().await?;

        let id: String = redis::cmd("XADD")
            .arg(&self.stream_key)
            .arg("*")
            .arg("userId")
            .arg(&message.user_id)
            .arg("content")
            .arg(&message.content)
            .arg("role")
            .arg(message.role.as_str())
            .arg("timestamp")
            .arg(message.timestamp.to_rfc3339())
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Stream(format!("Redis XADD failed: {}", e)))?;

        debug!(stream = %self.stream_key, entry_id = %id, role = %message.role, "Message appended");
        Ok(id)
    }
}

#[cfg(all(test, feature = "redis-tests"))]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_xadd_returns_entry_id() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
        let key = format!("vietfood:test:{}", uuid::Uuid::new_v4());
        let stream = RedisMessageStream::new(&url, &key).unwrap();

        let first = stream
            .append(&StreamMessage::user("u1", "xin chào", Utc::now()))
            .await
            .unwrap();
        let second = stream
            .append(&StreamMessage::assistant("u1", "Dạ!", Utc::now()))
            .await
            .unwrap();
        assert_ne!(first, second);

        let mut conn = stream.get_connection().await.unwrap();
        let len: i64 = redis::cmd("XLEN").arg(&key).query_async(&mut conn).await.unwrap();
        assert_eq!(len, 2);
        let _: i64 = redis::cmd("DEL").arg(&key).query_async(&mut conn).await.unwrap();
    }
}
