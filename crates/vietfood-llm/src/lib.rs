//! VietFood LLM - Model Provider Abstraction
//!
//! This crate provides the model-facing half of the sales agent:
//! - Provider: the [`LlmProvider`] trait any backend implements
//! - Chat: [`ChatSession`], one user's conversational context
//! - Tools: tool schema, tool calls and the per-round [`ToolChoice`] hint
//! - Mock: a scripted provider for tests

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod chat;
pub mod completion;
pub mod error;
pub mod message;
pub mod mock;
pub mod provider;
pub mod tools;

pub use chat::{ChatConfig, ChatSession};
pub use completion::{
    CompletionRequest, TokenUsage, ToolCompletionRequest, ToolCompletionResponse,
};
pub use error::{Error, Result};
pub use message::{Message, MessageRole};
pub use mock::MockProvider;
pub use provider::LlmProvider;
pub use tools::{ToolCall, ToolChoice, ToolDefinition};
