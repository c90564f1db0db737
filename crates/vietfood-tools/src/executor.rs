//! Executor - runs a batch of model-requested tool calls
//!
//! The executor never fails. Unknown tools, malformed arguments, handler
//! errors, timeouts and panics all come back as an error-kind
//! [`ToolResult`], so the conversation loop always receives exactly one
//! result per call.

use crate::error::Error;
use crate::registry::{ToolContext, ToolRegistry, ToolResult};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, error, instrument, warn};
use vietfood_llm::ToolCall;

/// Configuration for the executor
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Deadline for one tool call
    pub timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }
}

impl ExecutorConfig {
    /// Set the per-call timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Runs tool calls against a validated registry
#[derive(Clone)]
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    config: ExecutorConfig,
}

impl ToolExecutor {
    /// Create a new executor
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>, config: ExecutorConfig) -> Self {
        Self { registry, config }
    }

    /// Create with default configuration
    #[must_use]
    pub fn with_defaults(registry: Arc<ToolRegistry>) -> Self {
        Self::new(registry, ExecutorConfig::default())
    }

    /// Get the registry
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Execute one call
    #[instrument(skip(self, call, ctx), fields(tool = %call.name, user_id = %ctx.user_id))]
    pub async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> ToolResult {
        let Some(tool) = self.registry.get(&call.name) else {
            warn!("Model requested an unknown tool");
            return ToolResult::failure(&call.name, Error::NotFound(call.name.clone()).to_string())
                .with_call_id(&call.id);
        };

        let args = if call.arguments.trim().is_empty() {
            Ok(serde_json::Value::Object(serde_json::Map::new()))
        } else {
            serde_json::from_str::<serde_json::Value>(&call.arguments)
        };
        let args = match args {
            Ok(args) => args,
            Err(e) => {
                warn!(error = %e, "Tool arguments are not valid JSON");
                return ToolResult::failure(&call.name, Error::InvalidInput(e.to_string()).to_string())
                    .with_call_id(&call.id);
            }
        };

        let start = Instant::now();
        let outcome = timeout(
            self.config.timeout,
            AssertUnwindSafe(tool.execute(args, ctx)).catch_unwind(),
        )
        .await;
        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        let result = match outcome {
            Ok(Ok(Ok(result))) => result,
            Ok(Ok(Err(e))) => {
                debug!(error = %e, duration_ms, "Tool returned an error");
                ToolResult::failure(&call.name, e.to_string())
            }
            Ok(Err(_)) => {
                error!(duration_ms, "Tool panicked");
                ToolResult::failure(&call.name, Error::Execution("tool panicked".to_string()).to_string())
            }
            Err(_) => {
                let timeout_ms =
                    u64::try_from(self.config.timeout.as_millis()).unwrap_or(u64::MAX);
                warn!(timeout_ms, "Tool execution timed out");
                ToolResult::failure(&call.name, Error::Timeout(timeout_ms).to_string())
            }
        };

        debug!(kind = ?result.kind, duration_ms, "Tool execution completed");
        ToolResult {
            name: call.name.clone(),
            ..result
        }
        .with_call_id(&call.id)
    }

    /// Execute every call of one round concurrently, results in call order
    #[instrument(skip(self, calls, ctx), fields(batch = calls.len()))]
    pub async fn execute_batch(&self, calls: &[ToolCall], ctx: &ToolContext) -> Vec<ToolResult> {
        let futures = calls.iter().map(|call| self.execute(call, ctx));
        futures::future::join_all(futures).await
    }
}
