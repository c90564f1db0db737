//! Error types for vietfood-core
//!
//! Only model/transport failures, session creation failures and the tool-loop
//! bound escape a turn. Tool failures never reach this type: the executor
//! folds them into tool results.

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Model provider failure or timeout
    #[error("llm error: {0}")]
    Llm(#[from] vietfood_llm::Error),

    /// Tool registry could not be built
    #[error("tool error: {0}")]
    Tool(#[from] vietfood_tools::Error),

    /// Snapshot fetch failed while opening a session
    #[error("session creation failed: {0}")]
    SessionCreation(String),

    /// Eviction-time summary failed
    #[error("summarization failed: {0}")]
    Summarization(String),

    /// The model kept requesting tools past the round cap
    #[error("tool loop exceeded {rounds} rounds")]
    ToolLoopExceeded {
        /// Rounds executed before giving up
        rounds: usize,
    },

    /// Audit stream failure
    #[error("stream error: {0}")]
    Stream(String),

    /// Profile or message log storage failure
    #[error("store error: {0}")]
    Store(String),

    /// Configuration error (invalid settings)
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for user-friendly error messages
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Whether the caller may simply resend the same message
    fn is_retryable(&self) -> bool;
}

impl UserFriendlyError for Error {
    fn user_message(&self) -> String {
        match self {
            Error::Llm(e) if e.is_timeout() => {
                "⏳ The assistant is taking too long to answer. Please try again.".to_string()
            }
            Error::Llm(vietfood_llm::Error::RateLimit) => {
                "⏳ The assistant is busy right now. Please try again in a moment.".to_string()
            }
            Error::Llm(_) | Error::ToolLoopExceeded { .. } => {
                "🤖 The assistant could not answer this message. Please try again.".to_string()
            }
            Error::SessionCreation(_) => {
                "🍜 The menu is unavailable at the moment. Please try again later.".to_string()
            }
            Error::Configuration(msg) => format!("⚙️ Configuration error: {}", msg),
            Error::Tool(_) | Error::Summarization(_) | Error::Stream(_) | Error::Store(_) => {
                "❌ Something went wrong on our side. Please try again later.".to_string()
            }
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Llm(_) | Error::ToolLoopExceeded { .. } | Error::SessionCreation(_) | Error::Stream(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_error_conversion() {
        let err: Error = vietfood_llm::Error::Timeout(50_000).into();
        assert!(matches!(err, Error::Llm(_)));
        assert!(err.user_message().contains("too long"));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_loop_exceeded_message() {
        let err = Error::ToolLoopExceeded { rounds: 5 };
        assert_eq!(err.to_string(), "tool loop exceeded 5 rounds");
        assert!(!err.user_message().is_empty());
    }

    #[test]
    fn test_configuration_not_retryable() {
        let err = Error::Configuration("max_tool_rounds must be at least 1".to_string());
        assert!(!err.is_retryable());
        assert!(err.user_message().contains("max_tool_rounds"));
    }
}
