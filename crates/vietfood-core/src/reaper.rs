//! Session reaper
//!
//! Periodically evicts sessions idle for at least the configured timeout.
//! A session is only taken if its turn lock is free; the idle check is
//! repeated under the lock, and the lock is held through summarization,
//! the evicted flag, removal and dropping the user's cart. A turn queued on
//! that lock wakes up, sees the flag and opens a fresh session with an empty
//! cart.

use crate::clock::Clock;
use crate::config::SessionsConfig;
use crate::session::{Session, SessionRegistry};
use crate::summarizer::Summarizer;
use std::sync::Arc;
use vietfood_tools::CartStore;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Reaper timing
#[derive(Debug, Clone)]
pub struct ReaperConfig {
    /// Idle time after which a session is evicted
    pub idle_timeout: Duration,
    /// Time between sweeps
    pub cleanup_interval: Duration,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self::from(&SessionsConfig::default())
    }
}

impl From<&SessionsConfig> for ReaperConfig {
    fn from(config: &SessionsConfig) -> Self {
        Self {
            idle_timeout: config.idle_timeout(),
            cleanup_interval: config.cleanup_interval(),
        }
    }
}

/// Outcome of one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Sessions looked at
    pub examined: usize,
    /// Sessions removed
    pub evicted: usize,
    /// Idle sessions skipped because a turn was running
    pub skipped_busy: usize,
    /// Evictions whose summary could not be written
    pub summarize_failures: usize,
}

/// Evicts idle sessions
pub struct SessionReaper {
    registry: Arc<SessionRegistry>,
    summarizer: Summarizer,
    carts: Arc<dyn CartStore>,
    clock: Arc<dyn Clock>,
    config: ReaperConfig,
}

impl SessionReaper {
    /// Create a reaper
    #[must_use]
    pub fn new(
        registry: Arc<SessionRegistry>,
        summarizer: Summarizer,
        carts: Arc<dyn CartStore>,
        clock: Arc<dyn Clock>,
        config: ReaperConfig,
    ) -> Self {
        Self {
            registry,
            summarizer,
            carts,
            clock,
            config,
        }
    }

    fn is_idle(&self, session: &Session) -> bool {
        let threshold = i64::try_from(self.config.idle_timeout.as_millis()).unwrap_or(i64::MAX);
        self.clock.now_millis() - session.last_accessed_millis() >= threshold
    }

    /// Run one sweep over every registered session
    #[instrument(skip(self))]
    pub async fn sweep_once(&self) -> SweepReport {
        let mut report = SweepReport::default();

        for session in self.registry.snapshot() {
            report.examined += 1;
            if !self.is_idle(&session) {
                continue;
            }

            let handle = session.chat();
            let Ok(mut chat) = handle.try_lock() else {
                debug!(user_id = %session.user_id(), "Idle session busy, skipping");
                report.skipped_busy += 1;
                continue;
            };
            if session.is_evicted() || !self.is_idle(&session) {
                continue;
            }

            if let Err(e) = self.summarizer.summarize(session.user_id(), &mut chat).await {
                warn!(user_id = %session.user_id(), error = %e, "Profile summary failed, evicting anyway");
                report.summarize_failures += 1;
            }

            session.mark_evicted();
            self.registry.remove(&session);
            self.carts.clear(session.user_id()).await;
            drop(chat);

            info!(user_id = %session.user_id(), session_id = %session.id(), "Idle session evicted");
            report.evicted += 1;
        }

        report
    }

    /// Sweep every `cleanup_interval` until cancelled
    pub async fn run(&self, token: CancellationToken) {
        info!(
            idle_timeout = ?self.config.idle_timeout,
            cleanup_interval = ?self.config.cleanup_interval,
            "Session reaper started"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.config.cleanup_interval) => {
                    let report = self.sweep_once().await;
                    if report.evicted > 0 || report.skipped_busy > 0 {
                        info!(
                            evicted = report.evicted,
                            skipped_busy = report.skipped_busy,
                            summarize_failures = report.summarize_failures,
                            remaining = self.registry.len(),
                            "Sweep finished"
                        );
                    }
                }
                _ = token.cancelled() => {
                    info!("Session reaper shutting down");
                    break;
                }
            }
        }
    }

    /// Run on a background task
    pub fn spawn(self: Arc<Self>, token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(token).await })
    }
}
