//! Chat sessions
//!
//! A [`ChatSession`] is the long-lived conversational context handed out to
//! one user. It owns the system instruction, the declared tool set and the
//! running history, and sends each round through an [`LlmProvider`] under a
//! fixed deadline.
//!
//! History only grows when a round succeeds: a failed or timed-out call
//! leaves the session exactly as it was before the call. Callers running
//! several rounds as one unit take a checkpoint with [`ChatSession::history_len`]
//! and restore it with [`ChatSession::rollback_to`] when the unit fails.

use crate::completion::{CompletionRequest, ToolCompletionRequest, ToolCompletionResponse};
use crate::error::{Error, Result};
use crate::message::Message;
use crate::provider::LlmProvider;
use crate::tools::{ToolChoice, ToolDefinition};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Generation settings shared by every round of a chat
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Model identifier passed to the provider
    pub model: String,
    /// Output token cap
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Nucleus sampling
    pub top_p: Option<f32>,
    /// Deadline for one provider call
    pub timeout: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            max_tokens: Some(1000),
            temperature: None,
            top_p: Some(0.5),
            timeout: Duration::from_secs(50),
        }
    }
}

impl ChatConfig {
    /// Set the per-call timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn apply(&self, mut request: CompletionRequest) -> CompletionRequest {
        if let Some(max_tokens) = self.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(top_p) = self.top_p {
            request = request.with_top_p(top_p);
        }
        request
    }
}

/// Conversational context for one user
pub struct ChatSession {
    provider: Arc<dyn LlmProvider>,
    config: ChatConfig,
    tools: Vec<ToolDefinition>,
    history: Vec<Message>,
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("provider", &self.provider.name())
            .field("model", &self.config.model)
            .field("tools", &self.tools.len())
            .field("history", &self.history.len())
            .finish()
    }
}

impl ChatSession {
    /// Open a chat seeded with a system instruction and the declared tools
    #[must_use]
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        system_instruction: impl Into<String>,
        tools: Vec<ToolDefinition>,
        config: ChatConfig,
    ) -> Self {
        Self {
            provider,
            config,
            tools,
            history: vec![Message::system(system_instruction)],
        }
    }

    /// Full history including the system instruction
    #[must_use]
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Number of messages in the history
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Drop every message recorded after `len`
    ///
    /// The system instruction is never dropped.
    pub fn rollback_to(&mut self, len: usize) {
        let len = len.max(1);
        if len < self.history.len() {
            debug!(from = self.history.len(), to = len, "Rolling back chat history");
            self.history.truncate(len);
        }
    }

    /// The system instruction the chat was opened with
    #[must_use]
    pub fn system_instruction(&self) -> &str {
        self.history
            .first()
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }

    /// Tools declared to the model
    #[must_use]
    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    /// Send a user message
    pub async fn send_message(
        &mut self,
        text: impl Into<String>,
        tool_choice: ToolChoice,
    ) -> Result<ToolCompletionResponse> {
        self.send(vec![Message::user(text)], tool_choice).await
    }

    /// Answer the tool calls of the previous round
    pub async fn send_tool_results(
        &mut self,
        results: Vec<Message>,
        tool_choice: ToolChoice,
    ) -> Result<ToolCompletionResponse> {
        self.send(results, tool_choice).await
    }

    async fn send(
        &mut self,
        pending: Vec<Message>,
        tool_choice: ToolChoice,
    ) -> Result<ToolCompletionResponse> {
        let mut messages = self.history.clone();
        messages.extend(pending.iter().cloned());

        let request = self
            .config
            .apply(CompletionRequest::new(&self.config.model).with_messages(messages));

        let tools = if tool_choice == ToolChoice::None {
            Vec::new()
        } else {
            self.tools.clone()
        };
        let request = ToolCompletionRequest::new(request, tools).with_tool_choice(tool_choice);

        debug!(
            provider = %self.provider.name(),
            model = %self.config.model,
            tool_choice = %tool_choice,
            history = self.history.len(),
            "Sending chat round"
        );

        let timeout_ms = u64::try_from(self.config.timeout.as_millis()).unwrap_or(u64::MAX);
        let response =
            match tokio::time::timeout(self.config.timeout, self.provider.complete_with_tools(request))
                .await
            {
                Ok(result) => result?,
                Err(_) => {
                    warn!(provider = %self.provider.name(), timeout_ms, "Model call timed out");
                    return Err(Error::Timeout(timeout_ms));
                }
            };

        self.history.extend(pending);
        self.history.push(Message::assistant_with_tool_calls(
            response.content_text(),
            response.tool_calls.clone(),
        ));
        Ok(response)
    }
}
