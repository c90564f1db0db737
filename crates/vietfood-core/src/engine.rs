//! SalesAgent - the assembled engine
//!
//! Every collaborator is injected through [`SalesAgentBuilder`]; nothing is
//! global, so several independently configured agents can live in one
//! process.
//!
//! ```no_run
//! use std::sync::Arc;
//! use vietfood_core::{SalesAgent, UserIdentity};
//! use vietfood_llm::MockProvider;
//! use vietfood_tools::InMemoryCatalog;
//!
//! # async fn example() -> vietfood_core::Result<()> {
//! let agent = SalesAgent::builder(Arc::new(MockProvider::new()), Arc::new(InMemoryCatalog::sample()))
//!     .build()?;
//! let reply = agent
//!     .handle_user_message(&UserIdentity::new("u1", "Lan"), "Có món gì cay không?")
//!     .await?;
//! println!("{}", reply.text);
//! # Ok(())
//! # }
//! ```

use crate::clock::{Clock, SystemClock};
use crate::config::{AgentConfig, SessionsConfig};
use crate::error::Result;
use crate::orchestrator::{Orchestrator, TurnReply};
use crate::profile::{InMemoryProfileStore, ProfileStore};
use crate::reaper::{ReaperConfig, SessionReaper, SweepReport};
use crate::session::{InMemorySessionStore, Session, SessionRegistry, SessionStore, UserIdentity};
use crate::stream::{InMemoryMessageStream, MessageStream};
use crate::summarizer::Summarizer;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;
use vietfood_llm::LlmProvider;
use vietfood_tools::{
    builtin_registry, CartStore, CatalogProvider, ExecutorConfig, InMemoryCartStore, ToolExecutor,
};

/// Builder for [`SalesAgent`]
pub struct SalesAgentBuilder {
    provider: Arc<dyn LlmProvider>,
    catalog: Arc<dyn CatalogProvider>,
    profiles: Arc<dyn ProfileStore>,
    stream: Arc<dyn MessageStream>,
    carts: Arc<dyn CartStore>,
    sessions: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    agent: AgentConfig,
    lifecycle: SessionsConfig,
}

impl SalesAgentBuilder {
    /// Start with in-memory stores and the system clock
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>, catalog: Arc<dyn CatalogProvider>) -> Self {
        Self {
            provider,
            catalog,
            profiles: Arc::new(InMemoryProfileStore::new()),
            stream: Arc::new(InMemoryMessageStream::new()),
            carts: Arc::new(InMemoryCartStore::new()),
            sessions: Arc::new(InMemorySessionStore::new()),
            clock: Arc::new(SystemClock),
            agent: AgentConfig::default(),
            lifecycle: SessionsConfig::default(),
        }
    }

    /// Profile store
    #[must_use]
    pub fn with_profiles(mut self, profiles: Arc<dyn ProfileStore>) -> Self {
        self.profiles = profiles;
        self
    }

    /// Audit stream
    #[must_use]
    pub fn with_stream(mut self, stream: Arc<dyn MessageStream>) -> Self {
        self.stream = stream;
        self
    }

    /// Cart store
    #[must_use]
    pub fn with_carts(mut self, carts: Arc<dyn CartStore>) -> Self {
        self.carts = carts;
        self
    }

    /// Session store
    #[must_use]
    pub fn with_sessions(mut self, sessions: Arc<dyn SessionStore>) -> Self {
        self.sessions = sessions;
        self
    }

    /// Time source
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Conversation and lifecycle settings
    #[must_use]
    pub fn with_config(mut self, agent: AgentConfig, lifecycle: SessionsConfig) -> Self {
        self.agent = agent;
        self.lifecycle = lifecycle;
        self
    }

    /// Validate the tool set and assemble the agent
    ///
    /// # Errors
    ///
    /// Returns error if the tool registry does not match its declarations.
    pub fn build(self) -> Result<SalesAgent> {
        let tools = Arc::new(builtin_registry(Arc::clone(&self.catalog), Arc::clone(&self.carts))?);
        let executor = ToolExecutor::new(
            Arc::clone(&tools),
            ExecutorConfig::default().with_timeout(self.agent.tool_timeout()),
        );

        let registry = Arc::new(SessionRegistry::new(
            self.sessions,
            self.catalog,
            Arc::clone(&self.profiles),
            self.provider,
            tools.to_llm_tools(),
            Arc::clone(&self.clock),
            self.agent.clone(),
        ));

        let orchestrator = Orchestrator::new(
            Arc::clone(&registry),
            executor,
            self.stream,
            Arc::clone(&self.clock),
            self.agent.max_tool_rounds,
        );

        let reaper = Arc::new(SessionReaper::new(
            Arc::clone(&registry),
            Summarizer::new(self.profiles),
            Arc::clone(&self.carts),
            self.clock,
            ReaperConfig::from(&self.lifecycle),
        ));

        info!(
            tools = tools.len(),
            max_tool_rounds = self.agent.max_tool_rounds,
            idle_timeout_secs = self.lifecycle.idle_timeout_secs,
            "Sales agent ready"
        );

        Ok(SalesAgent {
            registry,
            orchestrator,
            reaper,
            carts: self.carts,
        })
    }
}

/// The conversational sales agent
pub struct SalesAgent {
    registry: Arc<SessionRegistry>,
    orchestrator: Orchestrator,
    reaper: Arc<SessionReaper>,
    carts: Arc<dyn CartStore>,
}

impl SalesAgent {
    /// Start building an agent
    #[must_use]
    pub fn builder(
        provider: Arc<dyn LlmProvider>,
        catalog: Arc<dyn CatalogProvider>,
    ) -> SalesAgentBuilder {
        SalesAgentBuilder::new(provider, catalog)
    }

    /// Handle one customer message
    ///
    /// # Errors
    ///
    /// See [`Orchestrator::handle_user_message`].
    pub async fn handle_user_message(&self, user: &UserIdentity, text: &str) -> Result<TurnReply> {
        self.orchestrator.handle_user_message(user, text).await
    }

    /// Start periodic eviction on a background task
    pub fn start_reaper(&self, token: CancellationToken) -> JoinHandle<()> {
        Arc::clone(&self.reaper).spawn(token)
    }

    /// Run one eviction sweep now
    pub async fn sweep_idle_sessions(&self) -> SweepReport {
        self.reaper.sweep_once().await
    }

    /// Number of live sessions
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.registry.len()
    }

    /// Live session of a user, if any
    #[must_use]
    pub fn session(&self, user_id: &str) -> Option<Arc<Session>> {
        self.registry.get(user_id)
    }

    /// Drop every live session and its cart without summarizing
    pub async fn shutdown(&self) -> usize {
        let drained = self.registry.clear();
        for session in &drained {
            self.carts.clear(session.user_id()).await;
        }
        info!(dropped = drained.len(), "Sales agent shut down");
        drained.len()
    }
}
