//! Error types for vietfood-tools

use thiserror::Error;

/// Tool error type
#[derive(Debug, Error)]
pub enum Error {
    /// Tool not declared to the model
    #[error("tool not found: {0}")]
    NotFound(String),

    /// Declared tool set and handlers disagree
    #[error("registry mismatch: {0}")]
    Registry(String),

    /// Tool execution failed
    #[error("execution failed: {0}")]
    Execution(String),

    /// Invalid input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Referenced dish or category does not exist
    #[error("not in catalog: {0}")]
    Missing(String),

    /// Catalog backend failure
    #[error("catalog error: {0}")]
    Catalog(String),

    /// Timeout
    #[error("timeout after {0}ms")]
    Timeout(u64),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
