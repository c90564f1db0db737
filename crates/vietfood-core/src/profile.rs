//! Customer profile summaries
//!
//! A profile is the one-paragraph summary written when a session is evicted.
//! The next session of the same user starts with it in the system
//! instruction. Saving replaces the previous summary.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Stored summary of a past conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    /// Owner
    pub user_id: String,
    /// Summary text
    pub text: String,
    /// Last write
    pub updated_at: DateTime<Utc>,
}

/// Persistent per-user summaries
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Load the summary of a user, if any
    async fn load(&self, user_id: &str) -> Result<Option<ProfileSummary>>;

    /// Replace the summary of a user
    async fn save(&self, user_id: &str, text: &str) -> Result<()>;
}

/// Profiles held in process memory
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    profiles: DashMap<String, ProfileSummary>,
}

impl InMemoryProfileStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a summary
    #[must_use]
    pub fn with_profile(self, user_id: impl Into<String>, text: impl Into<String>) -> Self {
        let user_id = user_id.into();
        self.profiles.insert(
            user_id.clone(),
            ProfileSummary {
                user_id,
                text: text.into(),
                updated_at: Utc::now(),
            },
        );
        self
    }

    /// Number of stored profiles
    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Whether no profile was stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn load(&self, user_id: &str) -> Result<Option<ProfileSummary>> {
        Ok(self.profiles.get(user_id).map(|p| p.value().clone()))
    }

    async fn save(&self, user_id: &str, text: &str) -> Result<()> {
        self.profiles.insert(
            user_id.to_string(),
            ProfileSummary {
                user_id: user_id.to_string(),
                text: text.to_string(),
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_replaces() {
        let store = InMemoryProfileStore::new().with_profile("u1", "Thích phở");
        assert_eq!(store.load("u1").await.unwrap().unwrap().text, "Thích phở");

        store.save("u1", "Thích bún bò, không ăn cay").await.unwrap();
        let profile = store.load("u1").await.unwrap().unwrap();
        assert_eq!(profile.text, "Thích bún bò, không ăn cay");
        assert_eq!(store.len(), 1);
        assert!(store.load("u2").await.unwrap().is_none());
    }
}
