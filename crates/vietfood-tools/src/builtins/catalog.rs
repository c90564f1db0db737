//! Catalog tools

use super::parse_args;
use crate::catalog::{CatalogProvider, DishQuery};
use crate::error::{Error, Result};
use crate::registry::{PayloadKind, Tool, ToolContext, ToolName, ToolResult};
use std::sync::Arc;
use tracing::debug;

/// Filtered dish search
pub struct SearchDishesTool {
    catalog: Arc<dyn CatalogProvider>,
}

impl SearchDishesTool {
    /// Create the tool
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogProvider>) -> Self {
        Self { catalog }
    }
}

#[async_trait::async_trait]
impl Tool for SearchDishesTool {
    fn name(&self) -> ToolName {
        ToolName::SearchDishes
    }

    async fn execute(&self, args: serde_json::Value, _ctx: &ToolContext) -> Result<ToolResult> {
        let query: DishQuery = parse_args(args)?;
        if let (Some(min), Some(max)) = (query.min_price, query.max_price) {
            if min > max {
                return Err(Error::InvalidInput(format!(
                    "minPrice {min} is greater than maxPrice {max}"
                )));
            }
        }

        let dishes = self.catalog.search_dishes(&query).await?;
        debug!(hits = dishes.len(), "Dish search finished");

        let message = if dishes.is_empty() {
            "No dishes match these criteria".to_string()
        } else {
            format!("Found {} dishes", dishes.len())
        };
        let payload = serde_json::to_value(&dishes).map_err(|e| Error::Execution(e.to_string()))?;
        Ok(ToolResult::success(self.name(), PayloadKind::Dishes, message, payload))
    }
}

/// Category listing
pub struct GetAllCategoriesTool {
    catalog: Arc<dyn CatalogProvider>,
}

impl GetAllCategoriesTool {
    /// Create the tool
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogProvider>) -> Self {
        Self { catalog }
    }
}

#[async_trait::async_trait]
impl Tool for GetAllCategoriesTool {
    fn name(&self) -> ToolName {
        ToolName::GetAllCategories
    }

    async fn execute(&self, _args: serde_json::Value, _ctx: &ToolContext) -> Result<ToolResult> {
        let categories = self.catalog.categories().await?;
        let payload =
            serde_json::to_value(&categories).map_err(|e| Error::Execution(e.to_string()))?;
        Ok(ToolResult::success(
            self.name(),
            PayloadKind::Categories,
            format!("{} categories", categories.len()),
            payload,
        ))
    }
}
