//! Mock LLM Provider for testing
//!
//! Replies are scripted up front and handed out in order. Every request is
//! recorded so tests can count model invocations and inspect the calling-mode
//! hint of each round.

use crate::completion::{ToolCompletionRequest, ToolCompletionResponse};
use crate::error::{Error, Result};
use crate::provider::LlmProvider;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct Scripted {
    delay: Option<Duration>,
    outcome: Result<ToolCompletionResponse>,
}

/// A mock LLM provider that returns queued responses or default text ones.
#[derive(Clone)]
pub struct MockProvider {
    responses: Arc<Mutex<VecDeque<Scripted>>>,
    requests: Arc<Mutex<Vec<ToolCompletionRequest>>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    /// Create a new mock provider.
    #[must_use]
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn push(&self, scripted: Scripted) {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(scripted);
    }

    /// Add a response to the queue.
    pub fn add_tool_response(&self, response: ToolCompletionResponse) {
        self.push(Scripted {
            delay: None,
            outcome: Ok(response),
        });
    }

    /// Add a response that is only returned after `delay`.
    pub fn add_delayed_response(&self, response: ToolCompletionResponse, delay: Duration) {
        self.push(Scripted {
            delay: Some(delay),
            outcome: Ok(response),
        });
    }

    /// Add a failure to the queue.
    pub fn add_error(&self, error: Error) {
        self.push(Scripted {
            delay: None,
            outcome: Err(error),
        });
    }

    /// Number of `complete_with_tools` calls seen so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Snapshot of every request received, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<ToolCompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Responses still waiting in the queue.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.responses.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait::async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn default_model(&self) -> &str {
        "mock-model"
    }

    async fn complete_with_tools(
        &self,
        request: ToolCompletionRequest,
    ) -> Result<ToolCompletionResponse> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        let scripted = self
            .responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();

        match scripted {
            Some(Scripted { delay, outcome }) => {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                outcome.map(|mut resp| {
                    if resp.model.is_empty() {
                        resp.model = "mock-model".to_string();
                    }
                    resp
                })
            }
            None => Ok(ToolCompletionResponse {
                model: "mock-model".to_string(),
                ..ToolCompletionResponse::text("mock response")
            }),
        }
    }
}
