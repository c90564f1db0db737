//! VietFood Core - Sales Agent Engine
//!
//! This crate provides the conversational engine:
//! - Sessions: one chat per customer, created lazily from a catalog snapshot
//! - Orchestrator: the model ⇄ tool loop of a single turn
//! - Reaper and summarizer: idle eviction with profile write-back
//! - Stream: append-only audit log of turns, plus its persistence worker
//! - Storage: SQLite message log and profile store

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod profile;
pub mod reaper;
pub mod session;
pub mod storage;
pub mod stream;
pub mod summarizer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AgentConfig, AppConfig, SessionsConfig, StorageConfig, StreamConfig};
pub use engine::{SalesAgent, SalesAgentBuilder};
pub use error::{Error, Result, UserFriendlyError};
pub use orchestrator::{next_tool_choice, Orchestrator, TurnReply};
pub use profile::{InMemoryProfileStore, ProfileStore, ProfileSummary};
pub use reaper::{ReaperConfig, SessionReaper, SweepReport};
pub use session::{InMemorySessionStore, Session, SessionRegistry, SessionStore, UserIdentity};
pub use storage::SqliteStore;
pub use stream::{
    InMemoryMessageStream, MessageLog, MessageStream, MessageWorker, RedisMessageStream, Role,
    StreamMessage, WorkerConfig,
};
pub use summarizer::Summarizer;
