//! Engine configuration
//!
//! Deserialized from the layered configuration the binary assembles
//! (`config/default.toml`, optional per-environment files, `VIETFOOD_*`
//! variables). Every field has a serde default so partial files work.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use vietfood_llm::ChatConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Conversation settings
    #[serde(default)]
    pub agent: AgentConfig,
    /// Session lifecycle settings
    #[serde(default)]
    pub sessions: SessionsConfig,
    /// Audit stream settings
    #[serde(default)]
    pub stream: StreamConfig,
    /// Local storage settings
    #[serde(default)]
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        self.agent.validate()?;
        self.sessions.validate()?;
        if self.stream.stream_key.trim().is_empty() {
            return Err(Error::Configuration("stream.stream_key must not be empty".to_string()));
        }
        if self.stream.batch_size == 0 {
            return Err(Error::Configuration("stream.batch_size must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn default_store_name() -> String {
    "Việt Food".to_string()
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_max_output_tokens() -> u32 {
    1000
}

fn default_top_p() -> Option<f32> {
    Some(0.5)
}

fn default_model_timeout_secs() -> u64 {
    50
}

fn default_tool_timeout_secs() -> u64 {
    10
}

fn default_max_tool_rounds() -> usize {
    5
}

fn default_popular_dishes_in_prompt() -> usize {
    6
}

/// Conversation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Shop name used in the system instruction
    #[serde(default = "default_store_name")]
    pub store_name: String,
    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,
    /// Output token cap per round
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    /// Sampling temperature (provider default when unset)
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Nucleus sampling
    #[serde(default = "default_top_p")]
    pub top_p: Option<f32>,
    /// Deadline for one model call
    #[serde(default = "default_model_timeout_secs")]
    pub model_timeout_secs: u64,
    /// Deadline for one tool call
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
    /// Tool batches allowed per turn
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,
    /// Popular dishes listed in a new session's instruction
    #[serde(default = "default_popular_dishes_in_prompt")]
    pub popular_dishes_in_prompt: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            store_name: default_store_name(),
            model: default_model(),
            max_output_tokens: default_max_output_tokens(),
            temperature: None,
            top_p: default_top_p(),
            model_timeout_secs: default_model_timeout_secs(),
            tool_timeout_secs: default_tool_timeout_secs(),
            max_tool_rounds: default_max_tool_rounds(),
            popular_dishes_in_prompt: default_popular_dishes_in_prompt(),
        }
    }
}

impl AgentConfig {
    fn validate(&self) -> Result<()> {
        if self.max_tool_rounds == 0 {
            return Err(Error::Configuration("agent.max_tool_rounds must be at least 1".to_string()));
        }
        if self.model_timeout_secs == 0 || self.tool_timeout_secs == 0 {
            return Err(Error::Configuration("agent timeouts must be positive".to_string()));
        }
        if self.model.trim().is_empty() {
            return Err(Error::Configuration("agent.model must not be empty".to_string()));
        }
        Ok(())
    }

    /// Per-call model deadline
    #[must_use]
    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }

    /// Per-call tool deadline
    #[must_use]
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    /// Generation settings for new chats
    #[must_use]
    pub fn chat_config(&self) -> ChatConfig {
        ChatConfig {
            model: self.model.clone(),
            max_tokens: Some(self.max_output_tokens),
            temperature: self.temperature,
            top_p: self.top_p,
            timeout: self.model_timeout(),
        }
    }
}

fn default_idle_timeout_secs() -> u64 {
    60 * 60
}

fn default_cleanup_interval_secs() -> u64 {
    10 * 60
}

/// Session lifecycle settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Idle time after which a session is evicted
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Time between eviction sweeps
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

impl SessionsConfig {
    fn validate(&self) -> Result<()> {
        if self.idle_timeout_secs == 0 || self.cleanup_interval_secs == 0 {
            return Err(Error::Configuration(
                "sessions.idle_timeout_secs and sessions.cleanup_interval_secs must be positive"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Idle threshold
    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Sweep period
    #[must_use]
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_stream_key() -> String {
    "message_stream".to_string()
}

fn default_group_name() -> String {
    "message_group".to_string()
}

fn default_consumer_name() -> String {
    "message_consumer".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_batch_size() -> usize {
    10
}

/// Audit stream settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    /// Stream key turns are appended to
    #[serde(default = "default_stream_key")]
    pub stream_key: String,
    /// Consumer group of the persistence worker
    #[serde(default = "default_group_name")]
    pub group_name: String,
    /// Consumer name of the persistence worker
    #[serde(default = "default_consumer_name")]
    pub consumer_name: String,
    /// Worker pause after a read that returned nothing
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Entries fetched per worker read
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            redis_url: default_redis_url(),
            stream_key: default_stream_key(),
            group_name: default_group_name(),
            consumer_name: default_consumer_name(),
            poll_interval_ms: default_poll_interval_ms(),
            batch_size: default_batch_size(),
        }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("data/vietfood.db")
}

/// Local storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite file holding profiles and the message log
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.agent.max_tool_rounds, 5);
        assert_eq!(config.agent.model_timeout(), Duration::from_secs(50));
        assert_eq!(config.sessions.idle_timeout(), Duration::from_secs(3600));
        assert_eq!(config.sessions.cleanup_interval(), Duration::from_secs(600));
        assert_eq!(config.stream.group_name, "message_group");
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AppConfig = serde_json::from_value(serde_json::json!({
            "agent": {"max_tool_rounds": 3},
            "sessions": {"idle_timeout_secs": 120}
        }))
        .unwrap();
        assert_eq!(config.agent.max_tool_rounds, 3);
        assert_eq!(config.agent.model, "gemini-2.0-flash");
        assert_eq!(config.sessions.idle_timeout_secs, 120);
        assert_eq!(config.sessions.cleanup_interval_secs, 600);
    }

    #[test]
    fn test_validate_rejects_zero_rounds() {
        let mut config = AppConfig::default();
        config.agent.max_tool_rounds = 0;
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));

        let mut config = AppConfig::default();
        config.sessions.idle_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_chat_config() {
        let agent = AgentConfig {
            temperature: Some(0.4),
            ..Default::default()
        };
        let chat = agent.chat_config();
        assert_eq!(chat.max_tokens, Some(1000));
        assert_eq!(chat.temperature, Some(0.4));
        assert_eq!(chat.timeout, Duration::from_secs(50));
    }
}
