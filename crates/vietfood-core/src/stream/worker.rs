//! Stream persistence worker
//!
//! Reads the audit stream through a consumer group and writes each entry to a
//! [`MessageLog`]. An entry is acknowledged only after it was persisted (or
//! found to be malformed). Unacknowledged entries stay in the consumer's
//! pending list, and every (re)connect replays that list before reading new
//! entries, so a failed or crashed batch is redelivered; the log ignores
//! entry ids it has already stored.

use super::{Role, StreamMessage};
use crate::config::StreamConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Field map is nil for pending entries trimmed from the stream
type ReadGroupReply = Option<Vec<(String, Vec<(String, Option<HashMap<String, String>>)>)>>;

/// Start id for entries never delivered to any consumer
const NEW_ENTRIES: &str = ">";
/// Start id for this consumer's delivered but unacknowledged entries
const PENDING_ENTRIES: &str = "0";

/// Durable message history
#[async_trait]
pub trait MessageLog: Send + Sync {
    /// Store one stream entry; returns false if the entry id was already stored
    async fn persist(&self, entry_id: &str, message: &StreamMessage) -> Result<bool>;

    /// Most recent messages of a user, newest first
    async fn history(&self, user_id: &str, limit: usize) -> Result<Vec<StreamMessage>>;
}

/// Worker settings
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Stream to drain
    pub stream_key: String,
    /// Consumer group
    pub group_name: String,
    /// Consumer name inside the group
    pub consumer_name: String,
    /// Entries per read
    pub batch_size: usize,
    /// Pause after an empty read
    pub poll_interval: Duration,
    /// Pause after a failed cycle
    pub retry_delay: Duration,
}

impl From<&StreamConfig> for WorkerConfig {
    fn from(config: &StreamConfig) -> Self {
        Self {
            stream_key: config.stream_key.clone(),
            group_name: config.group_name.clone(),
            consumer_name: config.consumer_name.clone(),
            batch_size: config.batch_size,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            retry_delay: Duration::from_secs(5),
        }
    }
}

/// Drains the audit stream into a [`MessageLog`]
pub struct MessageWorker {
    client: redis::Client,
    config: WorkerConfig,
    log: Arc<dyn MessageLog>,
}

impl MessageWorker {
    /// Create a worker
    ///
    /// # Errors
    ///
    /// Returns error if the Redis URL is invalid
    pub fn new(redis_url: &str, config: WorkerConfig, log: Arc<dyn MessageLog>) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| Error::Stream(format!("Invalid Redis URL: {}", e)))?;
        Ok(Self {
            client,
            config,
            log,
        })
    }

    async fn connect(&self) -> Result<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| Error::Stream(format!("Redis connection failed: {}", e)))
    }

    /// Create the consumer group (and the stream) if missing
    pub async fn ensure_group(&self, conn: &mut redis::aio::MultiplexedConnection) -> Result<()> {
        let created: redis::RedisResult<()> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.stream_key)
            .arg(&self.config.group_name)
            .arg("0")
            .arg("MKSTREAM")
            .query_async(conn)
            .await;

        match created {
            Ok(()) => {
                info!(stream = %self.config.stream_key, group = %self.config.group_name, "Consumer group created");
                Ok(())
            }
            Err(e) if e.code() == Some("BUSYGROUP") => Ok(()),
            Err(e) => Err(Error::Stream(format!("XGROUP CREATE failed: {}", e))),
        }
    }

    /// Read, persist and acknowledge one batch of new entries; returns entries handled
    #[instrument(skip(self, conn), fields(stream = %self.config.stream_key))]
    pub async fn poll_once(&self, conn: &mut redis::aio::MultiplexedConnection) -> Result<usize> {
        self.process_batch(conn, NEW_ENTRIES).await
    }

    /// Replay this consumer's pending entries until none are left
    ///
    /// Returns the number of entries handled.
    #[instrument(skip(self, conn), fields(stream = %self.config.stream_key))]
    pub async fn recover_pending(&self, conn: &mut redis::aio::MultiplexedConnection) -> Result<usize> {
        let mut total = 0;
        loop {
            let handled = self.process_batch(conn, PENDING_ENTRIES).await?;
            if handled == 0 {
                break;
            }
            total += handled;
        }
        if total > 0 {
            info!(entries = total, "Recovered pending stream entries");
        }
        Ok(total)
    }

    async fn process_batch(
        &self,
        conn: &mut redis::aio::MultiplexedConnection,
        start_id: &str,
    ) -> Result<usize> {
        let reply: ReadGroupReply = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.config.group_name)
            .arg(&self.config.consumer_name)
            .arg("COUNT")
            .arg(self.config.batch_size)
            .arg("STREAMS")
            .arg(&self.config.stream_key)
            .arg(start_id)
            .query_async(conn)
            .await
            .map_err(|e| Error::Stream(format!("XREADGROUP failed: {}", e)))?;

        let entries: Vec<_> = reply
            .unwrap_or_default()
            .into_iter()
            .flat_map(|(_, entries)| entries)
            .collect();

        for (entry_id, fields) in &entries {
            match fields.as_ref().and_then(decode_entry) {
                Some(message) => {
                    let stored = self.log.persist(entry_id, &message).await?;
                    debug!(entry_id = %entry_id, user_id = %message.user_id, stored, "Entry persisted");
                }
                None => warn!(entry_id = %entry_id, "Dropping malformed stream entry"),
            }

            let _: i64 = redis::cmd("XACK")
                .arg(&self.config.stream_key)
                .arg(&self.config.group_name)
                .arg(entry_id)
                .query_async(conn)
                .await
                .map_err(|e| Error::Stream(format!("XACK failed: {}", e)))?;
        }

        Ok(entries.len())
    }

    /// Run until cancelled; failed cycles are logged and retried
    pub async fn run(&self, token: CancellationToken) {
        info!(
            stream = %self.config.stream_key,
            group = %self.config.group_name,
            consumer = %self.config.consumer_name,
            "Message worker started"
        );

        let mut conn: Option<redis::aio::MultiplexedConnection> = None;
        loop {
            let cycle = async {
                if conn.is_none() {
                    let mut fresh = self.connect().await?;
                    self.ensure_group(&mut fresh).await?;
                    self.recover_pending(&mut fresh).await?;
                    conn = Some(fresh);
                }
                match conn.as_mut() {
                    Some(c) => self.poll_once(c).await,
                    None => Ok(0),
                }
            };

            let result = tokio::select! {
                _ = token.cancelled() => break,
                result = cycle => result,
            };

            let pause = match result {
                Ok(0) => self.config.poll_interval,
                Ok(_) => Duration::ZERO,
                Err(e) => {
                    warn!(error = %e, retry_in = ?self.config.retry_delay, "Message worker cycle failed");
                    conn = None;
                    self.config.retry_delay
                }
            };

            if !pause.is_zero() {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(pause) => {}
                }
            }
        }

        info!("Message worker stopped");
    }
}

fn decode_entry(fields: &HashMap<String, String>) -> Option<StreamMessage> {
    let user_id = fields.get("userId").filter(|u| !u.is_empty())?;
    let role = Role::parse(fields.get("role")?)?;
    let timestamp = fields
        .get("timestamp")
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .map_or_else(Utc::now, |t| t.with_timezone(&Utc));

    Some(StreamMessage {
        user_id: user_id.clone(),
        content: fields.get("content").cloned().unwrap_or_default(),
        role,
        timestamp,
    })
}


#[cfg(all(test, feature = "redis-tests"))]
mod redis_tests {
    use super::*;
    use crate::stream::{MessageStream, RedisMessageStream};
    use crate::storage::SqliteStore;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn test_worker_drains_stream_into_log() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
        let key = format!("vietfood:test:{}", uuid::Uuid::new_v4());
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::new(dir.path().join("log.db")).await.unwrap());

        let writer = RedisMessageStream::new(&url, &key).unwrap();
        writer
            .append(&StreamMessage::user("u1", "một tô phở", Utc::now()))
            .await
            .unwrap();
        writer
            .append(&StreamMessage::assistant("u1", "Dạ có ngay!", Utc::now()))
            .await
            .unwrap();

        let config = WorkerConfig {
            stream_key: key.clone(),
            ..WorkerConfig::from(&StreamConfig::default())
        };
        let worker = MessageWorker::new(&url, config, store.clone()).unwrap();
        let mut conn = worker.connect().await.unwrap();
        worker.ensure_group(&mut conn).await.unwrap();
        worker.ensure_group(&mut conn).await.unwrap();

        assert_eq!(worker.poll_once(&mut conn).await.unwrap(), 2);
        assert_eq!(worker.poll_once(&mut conn).await.unwrap(), 0);

        let history = store.history("u1", 10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::Assistant);

        let _: i64 = redis::cmd("DEL").arg(&key).query_async(&mut conn).await.unwrap();
    }

    /// Log whose first write fails
    struct FlakyLog {
        inner: SqliteStore,
        failed: AtomicBool,
    }

    #[async_trait]
    impl MessageLog for FlakyLog {
        async fn persist(&self, entry_id: &str, message: &StreamMessage) -> Result<bool> {
            if !self.failed.swap(true, Ordering::SeqCst) {
                return Err(Error::Store("disk full".into()));
            }
            self.inner.persist(entry_id, message).await
        }

        async fn history(&self, user_id: &str, limit: usize) -> Result<Vec<StreamMessage>> {
            self.inner.history(user_id, limit).await
        }
    }

    #[tokio::test]
    async fn test_failed_persist_is_replayed_on_reconnect() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
        let key = format!("vietfood:test:{}", uuid::Uuid::new_v4());
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(FlakyLog {
            inner: SqliteStore::new(dir.path().join("log.db")).await.unwrap(),
            failed: AtomicBool::new(false),
        });

        let writer = RedisMessageStream::new(&url, &key).unwrap();
        writer
            .append(&StreamMessage::user("u1", "hai ly trà đá", Utc::now()))
            .await
            .unwrap();
        writer
            .append(&StreamMessage::assistant("u1", "Dạ vâng", Utc::now()))
            .await
            .unwrap();

        let config = WorkerConfig {
            stream_key: key.clone(),
            ..WorkerConfig::from(&StreamConfig::default())
        };
        let worker = MessageWorker::new(&url, config, log.clone()).unwrap();
        let mut conn = worker.connect().await.unwrap();
        worker.ensure_group(&mut conn).await.unwrap();

        assert!(worker.poll_once(&mut conn).await.is_err());
        assert_eq!(worker.poll_once(&mut conn).await.unwrap(), 0);
        assert!(log.history("u1", 10).await.unwrap().is_empty());

        let mut conn = worker.connect().await.unwrap();
        assert_eq!(worker.recover_pending(&mut conn).await.unwrap(), 2);
        assert_eq!(worker.recover_pending(&mut conn).await.unwrap(), 0);

        let history = log.history("u1", 10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].content, "hai ly trà đá");

        let _: i64 = redis::cmd("DEL").arg(&key).query_async(&mut conn).await.unwrap();
    }
}
