//! Ephemeral carts
//!
//! A cart is a per-user scratch list of dish snapshots that the model builds
//! up during a conversation. Nothing here is persisted: carts live in process
//! memory and vanish on restart. The [`CartStore`] trait is the seam for
//! moving them into a shared cache later.

use crate::catalog::Dish;
use async_trait::async_trait;
use dashmap::DashMap;

/// Per-user cart storage
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Append dishes in order; returns the cart after the append
    async fn add(&self, user_id: &str, dishes: Vec<Dish>) -> Vec<Dish>;

    /// Remove the first entry with this dish id; returns it if present
    async fn remove(&self, user_id: &str, dish_id: &str) -> Option<Dish>;

    /// Current cart contents, oldest first
    async fn list(&self, user_id: &str) -> Vec<Dish>;

    /// Sum of prices in the cart
    async fn total(&self, user_id: &str) -> f64 {
        self.list(user_id).await.iter().map(|d| d.price).sum()
    }

    /// Drop the cart entirely
    async fn clear(&self, user_id: &str);
}

/// Process-local cart store
#[derive(Debug, Default)]
pub struct InMemoryCartStore {
    carts: DashMap<String, Vec<Dish>>,
}

impl InMemoryCartStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of users holding a cart
    #[must_use]
    pub fn len(&self) -> usize {
        self.carts.len()
    }

    /// Whether no user holds a cart
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.carts.is_empty()
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn add(&self, user_id: &str, dishes: Vec<Dish>) -> Vec<Dish> {
        let mut cart = self.carts.entry(user_id.to_string()).or_default();
        cart.extend(dishes);
        cart.clone()
    }

    async fn remove(&self, user_id: &str, dish_id: &str) -> Option<Dish> {
        let mut cart = self.carts.get_mut(user_id)?;
        let pos = cart.iter().position(|d| d.id == dish_id)?;
        Some(cart.remove(pos))
    }

    async fn list(&self, user_id: &str) -> Vec<Dish> {
        self.carts
            .get(user_id)
            .map(|cart| cart.clone())
            .unwrap_or_default()
    }

    async fn clear(&self, user_id: &str) {
        self.carts.remove(user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogProvider, InMemoryCatalog};

    async fn dishes(ids: &[&str]) -> Vec<Dish> {
        let ids: Vec<String> = ids.iter().map(|s| s.to_string()).collect();
        InMemoryCatalog::sample().dishes(&ids).await.unwrap()
    }

    #[tokio::test]
    async fn test_add_list_total() {
        let store = InMemoryCartStore::new();
        let cart = store.add("u1", dishes(&["pho-bo", "goi-cuon"]).await).await;
        assert_eq!(cart.len(), 2);
        store.add("u1", dishes(&["pho-bo"]).await).await;

        assert_eq!(store.list("u1").await.len(), 3);
        assert_eq!(store.total("u1").await, 170.0);
        assert!(store.list("u2").await.is_empty());
        assert_eq!(store.total("u2").await, 0.0);
    }

    #[tokio::test]
    async fn test_remove_first_match_only() {
        let store = InMemoryCartStore::new();
        store
            .add("u1", dishes(&["pho-bo", "goi-cuon", "pho-bo"]).await)
            .await;

        let removed = store.remove("u1", "pho-bo").await.unwrap();
        assert_eq!(removed.id, "pho-bo");
        let ids: Vec<_> = store.list("u1").await.into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["goi-cuon", "pho-bo"]);

        assert!(store.remove("u1", "com-tam").await.is_none());
        assert!(store.remove("nobody", "pho-bo").await.is_none());
    }

    #[tokio::test]
    async fn test_carts_are_per_user() {
        let store = InMemoryCartStore::new();
        store.add("u1", dishes(&["pho-bo"]).await).await;
        store.add("u2", dishes(&["com-tam"]).await).await;
        assert_eq!(store.len(), 2);

        store.clear("u1").await;
        assert!(store.list("u1").await.is_empty());
        assert_eq!(store.list("u2").await[0].id, "com-tam");
    }
}
