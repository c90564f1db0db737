//! Catalog access
//!
//! The catalog is owned by another service; the agent only reads it through
//! [`CatalogProvider`]. [`InMemoryCatalog`] evaluates [`DishQuery`] filters
//! locally and backs tests and demos.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Default and maximum number of dishes one search may return
pub const MAX_SEARCH_LIMIT: usize = 10;

/// Upper bound of the rating scale
pub const MAX_RATING: f64 = 5.0;

/// A dish on the menu
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dish {
    /// Catalog identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Free-text description
    pub description: String,
    /// Unit price
    pub price: f64,
    /// Image location
    #[serde(default)]
    pub image_url: String,
    /// Owning category id
    pub category: String,
    /// Whether the kitchen currently serves it
    pub is_available: bool,
    /// Average rating, 0..=5
    pub rating: f64,
    /// Units sold so far
    pub sold_count: u32,
    /// Flagged as popular
    #[serde(default)]
    pub is_popular: bool,
    /// Flagged as new
    #[serde(default)]
    pub is_new_dish: bool,
    /// Flagged as a special
    #[serde(default)]
    pub is_special: bool,
}

/// A top-level menu category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// Catalog identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// URL slug
    pub slug: String,
    /// Free-text description
    #[serde(default)]
    pub description: String,
    /// Image location
    #[serde(default)]
    pub image_url: String,
}

/// Filter criteria accepted by `searchDishes`
///
/// Every field is optional; an empty query returns the first
/// [`MAX_SEARCH_LIMIT`] dishes in catalog order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DishQuery {
    /// Result cap, clamped to 1..=10
    pub limit: Option<u32>,
    /// Comma separated sort keys, `-` prefix for descending
    pub sort_by: Option<String>,
    /// Only popular dishes
    pub is_popular: Option<bool>,
    /// Only new dishes
    pub is_new_dish: Option<bool>,
    /// Only specials
    pub is_special: Option<bool>,
    /// Inclusive lower price bound
    pub min_price: Option<f64>,
    /// Inclusive upper price bound
    pub max_price: Option<f64>,
    /// Inclusive lower rating bound
    pub min_rating: Option<f64>,
    /// Inclusive upper rating bound
    pub max_rating: Option<f64>,
    /// Case-insensitive match on name or description
    pub search_term: Option<String>,
    /// Category id
    pub category: Option<String>,
}

impl DishQuery {
    /// Effective result cap
    #[must_use]
    pub fn effective_limit(&self) -> usize {
        self.limit
            .map_or(MAX_SEARCH_LIMIT, |l| (l as usize).clamp(1, MAX_SEARCH_LIMIT))
    }

    /// Whether a dish passes every filter in this query
    #[must_use]
    pub fn matches(&self, dish: &Dish) -> bool {
        let flag = |want: Option<bool>, have: bool| want.map_or(true, |w| w == have);

        if let Some(category) = self.category.as_deref().filter(|c| !c.is_empty()) {
            if dish.category != category {
                return false;
            }
        }
        if let Some(term) = self.search_term.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let term = term.to_lowercase();
            if !dish.name.to_lowercase().contains(&term)
                && !dish.description.to_lowercase().contains(&term)
            {
                return false;
            }
        }

        flag(self.is_popular, dish.is_popular)
            && flag(self.is_new_dish, dish.is_new_dish)
            && flag(self.is_special, dish.is_special)
            && dish.price >= self.min_price.unwrap_or(0.0)
            && dish.price <= self.max_price.unwrap_or(f64::MAX)
            && dish.rating >= self.min_rating.unwrap_or(0.0)
            && dish.rating <= self.max_rating.unwrap_or(MAX_RATING)
    }

    /// Parsed sort keys as `(field, descending)` pairs
    #[must_use]
    pub fn sort_keys(&self) -> Vec<(SortField, bool)> {
        self.sort_by
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .filter_map(|f| {
                let (desc, key) = match f.strip_prefix('-') {
                    Some(rest) => (true, rest),
                    None => (false, f),
                };
                SortField::parse(key).map(|field| (field, desc))
            })
            .collect()
    }

    /// Apply filters, ordering and the limit to a slice of dishes
    #[must_use]
    pub fn apply(&self, dishes: &[Dish]) -> Vec<Dish> {
        let mut hits: Vec<Dish> = dishes.iter().filter(|d| self.matches(d)).cloned().collect();

        let keys = self.sort_keys();
        if !keys.is_empty() {
            hits.sort_by(|a, b| {
                keys.iter()
                    .map(|(field, desc)| {
                        let ord = field.compare(a, b);
                        if *desc {
                            ord.reverse()
                        } else {
                            ord
                        }
                    })
                    .find(|ord| *ord != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }

        hits.truncate(self.effective_limit());
        hits
    }
}

/// Dish attributes a search can be ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    /// Unit price
    Price,
    /// Average rating
    Rating,
    /// Units sold
    SoldCount,
    /// Display name
    Name,
}

impl SortField {
    /// Parse a sort key; unknown keys are ignored by callers
    #[must_use]
    pub fn parse(key: &str) -> Option<Self> {
        match key {
            "price" => Some(Self::Price),
            "rating" => Some(Self::Rating),
            "soldCount" => Some(Self::SoldCount),
            "name" => Some(Self::Name),
            _ => None,
        }
    }

    fn compare(&self, a: &Dish, b: &Dish) -> Ordering {
        match self {
            Self::Price => a.price.total_cmp(&b.price),
            Self::Rating => a.rating.total_cmp(&b.rating),
            Self::SoldCount => a.sold_count.cmp(&b.sold_count),
            Self::Name => a.name.cmp(&b.name),
        }
    }
}

/// Read-only access to the menu
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// All top-level categories
    async fn categories(&self) -> Result<Vec<Category>>;

    /// Dishes matching a query
    async fn search_dishes(&self, query: &DishQuery) -> Result<Vec<Dish>>;

    /// One dish by id
    async fn dish(&self, id: &str) -> Result<Option<Dish>>;

    /// Dishes by id, in request order, silently skipping unknown ids
    async fn dishes(&self, ids: &[String]) -> Result<Vec<Dish>>;

    /// Available dishes flagged popular, best sellers first
    async fn popular_dishes(&self, limit: usize) -> Result<Vec<Dish>>;
}

/// Catalog held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    categories: Vec<Category>,
    dishes: Vec<Dish>,
}

impl InMemoryCatalog {
    /// Create a catalog from fixed data
    #[must_use]
    pub fn new(categories: Vec<Category>, dishes: Vec<Dish>) -> Self {
        Self { categories, dishes }
    }

    /// A small Vietnamese menu for demos and tests
    #[must_use]
    pub fn sample() -> Self {
        let category = |id: &str, name: &str, slug: &str| Category {
            id: id.to_string(),
            name: name.to_string(),
            slug: slug.to_string(),
            description: String::new(),
            image_url: String::new(),
        };
        let dish = |id: &str, name: &str, description: &str, price: f64, cat: &str, rating: f64, sold: u32| Dish {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            price,
            image_url: format!("/images/{id}.jpg"),
            category: cat.to_string(),
            is_available: true,
            rating,
            sold_count: sold,
            is_popular: false,
            is_new_dish: false,
            is_special: false,
        };

        let mut dishes = vec![
            dish("pho-bo", "Phở bò", "Beef noodle soup with fresh herbs", 65.0, "noodles", 4.8, 320),
            dish("bun-bo-hue", "Bún bò Huế", "Spicy lemongrass beef noodle soup", 70.0, "noodles", 4.7, 210),
            dish("mi-cay", "Mì cay", "Korean style spicy noodles, five heat levels", 55.0, "noodles", 4.2, 150),
            dish("goi-cuon", "Gỏi cuốn", "Fresh spring rolls with shrimp and pork", 40.0, "starters", 4.5, 260),
            dish("ga-xao-sa-ot", "Gà xào sả ớt", "Spicy chicken stir-fried with lemongrass and chili", 85.0, "rice", 4.4, 120),
            dish("com-tam", "Cơm tấm", "Broken rice with grilled pork chop", 60.0, "rice", 4.6, 400),
            dish("lau-thai", "Lẩu Thái", "Spicy and sour Thai hotpot for two", 250.0, "hotpot", 4.3, 80),
            dish("che-ba-mau", "Chè ba màu", "Three colour bean dessert", 30.0, "desserts", 4.1, 90),
        ];
        for d in &mut dishes {
            d.is_popular = matches!(d.id.as_str(), "pho-bo" | "com-tam" | "goi-cuon");
            d.is_new_dish = matches!(d.id.as_str(), "mi-cay" | "lau-thai");
            d.is_special = d.id == "bun-bo-hue";
        }

        Self::new(
            vec![
                category("noodles", "Món nước", "mon-nuoc"),
                category("rice", "Cơm", "com"),
                category("starters", "Khai vị", "khai-vi"),
                category("hotpot", "Lẩu", "lau"),
                category("desserts", "Tráng miệng", "trang-mieng"),
            ],
            dishes,
        )
    }
}

#[async_trait]
impl CatalogProvider for InMemoryCatalog {
    async fn categories(&self) -> Result<Vec<Category>> {
        Ok(self.categories.clone())
    }

    async fn search_dishes(&self, query: &DishQuery) -> Result<Vec<Dish>> {
        Ok(query.apply(&self.dishes))
    }

    async fn dish(&self, id: &str) -> Result<Option<Dish>> {
        Ok(self.dishes.iter().find(|d| d.id == id).cloned())
    }

    async fn dishes(&self, ids: &[String]) -> Result<Vec<Dish>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.dishes.iter().find(|d| &d.id == id))
            .cloned()
            .collect())
    }

    async fn popular_dishes(&self, limit: usize) -> Result<Vec<Dish>> {
        let mut popular: Vec<Dish> = self
            .dishes
            .iter()
            .filter(|d| d.is_available && d.is_popular)
            .cloned()
            .collect();
        popular.sort_by(|a, b| b.sold_count.cmp(&a.sold_count));
        popular.truncate(limit);
        Ok(popular)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(dishes: &[Dish]) -> Vec<&str> {
        dishes.iter().map(|d| d.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_search_term_and_price() {
        let catalog = InMemoryCatalog::sample();
        let query = DishQuery {
            search_term: Some("SPICY".to_string()),
            max_price: Some(100.0),
            ..Default::default()
        };
        let hits = catalog.search_dishes(&query).await.unwrap();
        assert_eq!(names(&hits), vec!["bun-bo-hue", "mi-cay", "ga-xao-sa-ot"]);
    }

    #[tokio::test]
    async fn test_sort_and_limit() {
        let catalog = InMemoryCatalog::sample();
        let query = DishQuery {
            sort_by: Some("-soldCount,price".to_string()),
            limit: Some(2),
            ..Default::default()
        };
        let hits = catalog.search_dishes(&query).await.unwrap();
        assert_eq!(names(&hits), vec!["com-tam", "pho-bo"]);
    }

    #[test]
    fn test_limit_clamped() {
        let mut query = DishQuery::default();
        assert_eq!(query.effective_limit(), MAX_SEARCH_LIMIT);
        query.limit = Some(0);
        assert_eq!(query.effective_limit(), 1);
        query.limit = Some(50);
        assert_eq!(query.effective_limit(), MAX_SEARCH_LIMIT);
    }

    #[test]
    fn test_unknown_sort_keys_ignored() {
        let query = DishQuery {
            sort_by: Some("colour, -rating ,".to_string()),
            ..Default::default()
        };
        assert_eq!(query.sort_keys(), vec![(SortField::Rating, true)]);
    }

    #[tokio::test]
    async fn test_flags_category_and_rating() {
        let catalog = InMemoryCatalog::sample();
        let query = DishQuery {
            category: Some("noodles".to_string()),
            is_new_dish: Some(false),
            min_rating: Some(4.5),
            ..Default::default()
        };
        let hits = catalog.search_dishes(&query).await.unwrap();
        assert_eq!(names(&hits), vec!["pho-bo", "bun-bo-hue"]);
    }

    #[tokio::test]
    async fn test_lookup_by_ids_keeps_order() {
        let catalog = InMemoryCatalog::sample();
        let ids = vec!["com-tam".to_string(), "nope".to_string(), "pho-bo".to_string()];
        let hits = catalog.dishes(&ids).await.unwrap();
        assert_eq!(names(&hits), vec!["com-tam", "pho-bo"]);
        assert!(catalog.dish("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_popular_dishes() {
        let catalog = InMemoryCatalog::sample();
        let popular = catalog.popular_dishes(2).await.unwrap();
        assert_eq!(names(&popular), vec!["com-tam", "pho-bo"]);
    }

    #[test]
    fn test_query_deserializes_camel_case() {
        let query: DishQuery = serde_json::from_value(serde_json::json!({
            "searchTerm": "phở",
            "maxPrice": 100,
            "isPopular": true
        }))
        .unwrap();
        assert_eq!(query.search_term.as_deref(), Some("phở"));
        assert_eq!(query.max_price, Some(100.0));
        assert_eq!(query.is_popular, Some(true));
    }
}
