//! Orchestrator - one customer turn
//!
//! ```text
//! AwaitingModel ──▶ ModelResponded ──▶ Done
//!       ▲                 │ tool calls
//!       │                 ▼
//!       └────────── ExecutingTools
//! ```
//!
//! The turn holds the session's chat lock from resolution to the recorded
//! reply. Each round executes every requested call concurrently and feeds
//! all results back in one message batch. The number of tool rounds is
//! capped; a model that keeps asking for tools fails the turn.


use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::session::{SessionRegistry, UserIdentity};
use crate::stream::{MessageStream, StreamMessage};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use vietfood_llm::{ChatSession, Message, ToolCall, ToolChoice, ToolCompletionResponse};
use vietfood_tools::{ToolContext, ToolExecutor, ToolResult};

/// What a turn returns to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnReply {
    /// Session that served the turn
    pub session_id: Uuid,
    /// Assistant text
    pub text: String,
    /// Results of the last executed tool batch; empty when no tool ran
    pub tool_results: Vec<ToolResult>,
    /// Tool rounds executed
    pub rounds: usize,
}

enum TurnState {
    /// Next model call: the user's message, or the previous round's results
    AwaitingModel {
        results: Option<Vec<Message>>,
        choice: ToolChoice,
    },
    ModelResponded(ToolCompletionResponse),
    ExecutingTools(Vec<ToolCall>),
    Done(ToolCompletionResponse),
}

/// Hint for the round after a tool batch
///
/// When a batch already put dishes or categories in front of the customer
/// the model may answer freely; otherwise it is pushed to keep using tools.
#[must_use]
pub fn next_tool_choice(results: &[ToolResult]) -> ToolChoice {
    if results.iter().any(ToolResult::shows_catalog_items) {
        ToolChoice::Auto
    } else {
        ToolChoice::Required
    }
}

/// Runs turns against the session registry
pub struct Orchestrator {
    registry: Arc<SessionRegistry>,
    executor: ToolExecutor,
    stream: Arc<dyn MessageStream>,
    clock: Arc<dyn Clock>,
    max_tool_rounds: usize,
}

impl Orchestrator {
    /// Create an orchestrator
    #[must_use]
    pub fn new(
        registry: Arc<SessionRegistry>,
        executor: ToolExecutor,
        stream: Arc<dyn MessageStream>,
        clock: Arc<dyn Clock>,
        max_tool_rounds: usize,
    ) -> Self {
        Self {
            registry,
            executor,
            stream,
            clock,
            max_tool_rounds,
        }
    }

    /// Handle one customer message
    ///
    /// # Errors
    ///
    /// Fails on session creation errors, stream errors, model errors
    /// (timeouts included) and [`Error::ToolLoopExceeded`]. A failed turn
    /// records the user's message but no assistant reply, and the chat
    /// history is restored to where the turn started.
    #[instrument(skip(self, user, text), fields(user_id = %user.id))]
    pub async fn handle_user_message(&self, user: &UserIdentity, text: &str) -> Result<TurnReply> {
        let (session, mut chat) = loop {
            let session = self.registry.get_or_create(user).await?;
            let chat = session.chat().lock_owned().await;
            if !session.is_evicted() {
                break (session, chat);
            }
            debug!(session_id = %session.id(), "Session evicted while waiting, resolving again");
        };

        self.stream
            .append(&StreamMessage::user(&user.id, text, self.clock.now()))
            .await?;

        let checkpoint = chat.history_len();
        let outcome: Result<_> = async {
            let (response, rounds, last_batch) = self.run_rounds(&mut chat, &user.id, text).await?;
            let reply = response.content_text().to_string();
            self.stream
                .append(&StreamMessage::assistant(&user.id, &reply, self.clock.now()))
                .await?;
            Ok((reply, rounds, last_batch))
        }
        .await;
        let (reply, rounds, last_batch) = match outcome {
            Ok(done) => done,
            Err(e) => {
                // A half-finished turn would leave tool calls without answers.
                chat.rollback_to(checkpoint);
                warn!(session_id = %session.id(), error = %e, "Turn failed, chat history restored");
                return Err(e);
            }
        };
        session.touch(self.clock.now_millis());
        drop(chat);

        info!(session_id = %session.id(), rounds, tool_results = last_batch.len(), "Turn completed");
        Ok(TurnReply {
            session_id: session.id(),
            text: reply,
            tool_results: last_batch,
            rounds,
        })
    }

    async fn run_rounds(
        &self,
        chat: &mut ChatSession,
        user_id: &str,
        text: &str,
    ) -> Result<(ToolCompletionResponse, usize, Vec<ToolResult>)> {
        let ctx = ToolContext::new(user_id);
        let mut rounds = 0;
        let mut last_batch = Vec::new();
        let mut state = TurnState::AwaitingModel {
            results: None,
            choice: ToolChoice::Auto,
        };

        loop {
            state = match state {
                TurnState::AwaitingModel { results: None, choice } => {
                    TurnState::ModelResponded(chat.send_message(text, choice).await?)
                }
                TurnState::AwaitingModel {
                    results: Some(results),
                    choice,
                } => TurnState::ModelResponded(chat.send_tool_results(results, choice).await?),
                TurnState::ModelResponded(response) if response.has_tool_calls() => {
                    if rounds >= self.max_tool_rounds {
                        return Err(Error::ToolLoopExceeded { rounds });
                    }
                    TurnState::ExecutingTools(response.tool_calls)
                }
                TurnState::ModelResponded(response) => TurnState::Done(response),
                TurnState::ExecutingTools(calls) => {
                    rounds += 1;
                    let results = self.executor.execute_batch(&calls, &ctx).await;
                    let choice = next_tool_choice(&results);
                    debug!(
                        round = rounds,
                        calls = calls.len(),
                        failed = results.iter().filter(|r| r.is_error()).count(),
                        next_choice = %choice,
                        "Tool round finished"
                    );
                    let messages = results.iter().map(ToolResult::to_message).collect();
                    last_batch = results;
                    TurnState::AwaitingModel {
                        results: Some(messages),
                        choice,
                    }
                }
                TurnState::Done(response) => return Ok((response, rounds, last_batch)),
            };
        }
    }
}
