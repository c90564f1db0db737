//! Session registry
//!
//! Creates sessions lazily. A miss fetches the snapshot, builds the system
//! instruction and opens a chat; concurrent misses for one user are
//! serialized by a per-user creation gate and the store's atomic
//! `insert_if_absent`, so exactly one session goes live.

use super::prompt::{build_system_instruction, SessionSnapshot};
use super::{Session, SessionStore, UserIdentity};
use crate::clock::Clock;
use crate::config::AgentConfig;
use crate::error::{Error, Result};
use crate::profile::ProfileStore;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};
use vietfood_llm::{ChatSession, LlmProvider, ToolDefinition};
use vietfood_tools::CatalogProvider;

/// Owns the user → session map
pub struct SessionRegistry {
    store: Arc<dyn SessionStore>,
    catalog: Arc<dyn CatalogProvider>,
    profiles: Arc<dyn ProfileStore>,
    provider: Arc<dyn LlmProvider>,
    tools: Vec<ToolDefinition>,
    clock: Arc<dyn Clock>,
    config: AgentConfig,
    creating: DashMap<String, Arc<Mutex<()>>>,
}

impl SessionRegistry {
    /// Create a registry
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        store: Arc<dyn SessionStore>,
        catalog: Arc<dyn CatalogProvider>,
        profiles: Arc<dyn ProfileStore>,
        provider: Arc<dyn LlmProvider>,
        tools: Vec<ToolDefinition>,
        clock: Arc<dyn Clock>,
        config: AgentConfig,
    ) -> Self {
        Self {
            store,
            catalog,
            profiles,
            provider,
            tools,
            clock,
            config,
            creating: DashMap::new(),
        }
    }

    /// Live session of a user, creating it on a miss
    ///
    /// A hit returns the existing session without refreshing its access time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionCreation`] if the snapshot cannot be fetched;
    /// nothing is registered in that case.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn get_or_create(&self, user: &UserIdentity) -> Result<Arc<Session>> {
        if let Some(session) = self.store.get(&user.id) {
            return Ok(session);
        }

        let gate = Arc::clone(self.creating.entry(user.id.clone()).or_default().value());
        let result = {
            let _guard = gate.lock().await;
            match self.store.get(&user.id) {
                Some(session) => Ok(session),
                None => self.create(user).await,
            }
        };
        drop(gate);
        self.creating
            .remove_if(&user.id, |_, g| Arc::strong_count(g) == 1);

        result
    }

    async fn create(&self, user: &UserIdentity) -> Result<Arc<Session>> {
        let snapshot = self.fetch_snapshot(&user.id).await?;
        let instruction =
            build_system_instruction(&self.config.store_name, &user.display_name, &snapshot);

        let chat = ChatSession::new(
            Arc::clone(&self.provider),
            instruction,
            self.tools.clone(),
            self.config.chat_config(),
        );
        let session = Arc::new(Session::new(&user.id, chat, self.clock.now()));
        let live = self.store.insert_if_absent(Arc::clone(&session));

        if Arc::ptr_eq(&live, &session) {
            info!(
                session_id = %live.id(),
                categories = snapshot.categories.len(),
                has_profile = snapshot.profile.is_some(),
                "Session created"
            );
        } else {
            debug!(session_id = %live.id(), "Lost creation race, using existing session");
        }
        Ok(live)
    }

    async fn fetch_snapshot(&self, user_id: &str) -> Result<SessionSnapshot> {
        let (categories, popular_dishes, profile) = tokio::try_join!(
            async {
                self.catalog
                    .categories()
                    .await
                    .map_err(|e| Error::SessionCreation(format!("categories: {}", e)))
            },
            async {
                self.catalog
                    .popular_dishes(self.config.popular_dishes_in_prompt)
                    .await
                    .map_err(|e| Error::SessionCreation(format!("popular dishes: {}", e)))
            },
            async {
                self.profiles
                    .load(user_id)
                    .await
                    .map_err(|e| Error::SessionCreation(format!("profile: {}", e)))
            },
        )?;

        Ok(SessionSnapshot {
            categories,
            popular_dishes,
            profile,
        })
    }

    /// Live session of a user, if any
    #[must_use]
    pub fn get(&self, user_id: &str) -> Option<Arc<Session>> {
        self.store.get(user_id)
    }

    /// All registered sessions
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<Session>> {
        self.store.snapshot()
    }

    /// Remove exactly this session instance
    pub fn remove(&self, session: &Arc<Session>) -> bool {
        self.store.remove_if_same(session)
    }

    /// Number of registered sessions
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether no session is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Retire and drop every session without summarizing; returns them
    pub fn clear(&self) -> Vec<Arc<Session>> {
        let drained = self.store.drain();
        for session in &drained {
            session.mark_evicted();
        }
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::profile::InMemoryProfileStore;
    use crate::session::InMemorySessionStore;
    use mockall::mock;
    use vietfood_llm::MockProvider;
    use vietfood_tools::{Category, Dish, DishQuery, InMemoryCatalog};

    mock! {
        pub Catalog {}

        #[async_trait::async_trait]
        impl CatalogProvider for Catalog {
            async fn categories(&self) -> vietfood_tools::Result<Vec<Category>>;
            async fn search_dishes(&self, query: &DishQuery) -> vietfood_tools::Result<Vec<Dish>>;
            async fn dish(&self, id: &str) -> vietfood_tools::Result<Option<Dish>>;
            async fn dishes(&self, ids: &[String]) -> vietfood_tools::Result<Vec<Dish>>;
            async fn popular_dishes(&self, limit: usize) -> vietfood_tools::Result<Vec<Dish>>;
        }
    }

    fn registry(catalog: Arc<dyn CatalogProvider>) -> SessionRegistry {
        SessionRegistry::new(
            Arc::new(InMemorySessionStore::new()),
            catalog,
            Arc::new(InMemoryProfileStore::new().with_profile("u1", "Thích món nước")),
            Arc::new(MockProvider::new()),
            Vec::new(),
            Arc::new(SystemClock),
            AgentConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_concurrent_get_or_create_yields_one_session() {
        let registry = Arc::new(registry(Arc::new(InMemoryCatalog::sample())));
        let user = UserIdentity::new("u1", "Lan");

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let user = user.clone();
                tokio::spawn(async move { registry.get_or_create(&user).await.unwrap() })
            })
            .collect();

        let sessions: Vec<Arc<Session>> = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(registry.len(), 1);
        assert!(sessions.iter().all(|s| Arc::ptr_eq(s, &sessions[0])));
        assert!(registry.creating.is_empty());
    }

    #[tokio::test]
    async fn test_instruction_seeded_from_snapshot() {
        let registry = registry(Arc::new(InMemoryCatalog::sample()));
        let session = registry
            .get_or_create(&UserIdentity::new("u1", "Lan"))
            .await
            .unwrap();

        let chat = session.chat();
        let chat = chat.lock().await;
        assert!(chat.system_instruction().contains("Lan"));
        assert!(chat.system_instruction().contains("Thích món nước"));
        assert!(chat.system_instruction().contains("Phở bò"));
    }

    #[tokio::test]
    async fn test_hit_does_not_refresh_access_time() {
        let registry = registry(Arc::new(InMemoryCatalog::sample()));
        let user = UserIdentity::new("u2", "Minh");
        let first = registry.get_or_create(&user).await.unwrap();
        let before = first.last_accessed_millis();

        let again = registry.get_or_create(&user).await.unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(again.last_accessed_millis(), before);
    }

    #[tokio::test]
    async fn test_snapshot_failure_registers_nothing() {
        let mut catalog = MockCatalog::new();
        catalog
            .expect_categories()
            .returning(|| Err(vietfood_tools::Error::Catalog("menu service down".into())));
        catalog.expect_popular_dishes().returning(|_| Ok(Vec::new()));

        let registry = registry(Arc::new(catalog));
        let err = registry
            .get_or_create(&UserIdentity::new("u1", "Lan"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::SessionCreation(msg) if msg.contains("menu service down")));
        assert!(registry.is_empty());
        assert!(registry.get("u1").is_none());
    }

    #[tokio::test]
    async fn test_clear_marks_sessions_evicted() {
        let registry = registry(Arc::new(InMemoryCatalog::sample()));
        let session = registry
            .get_or_create(&UserIdentity::new("u1", "Lan"))
            .await
            .unwrap();

        assert_eq!(registry.clear().len(), 1);
        assert!(session.is_evicted());
        assert!(registry.is_empty());
    }
}
