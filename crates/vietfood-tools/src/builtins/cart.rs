//! Cart tools
//!
//! These only ever touch the [`CartStore`]; the catalog is consulted to turn
//! ids into dish snapshots.

use super::parse_args;
use crate::cart::CartStore;
use crate::catalog::{CatalogProvider, Dish};
use crate::error::{Error, Result};
use crate::registry::{PayloadKind, Tool, ToolContext, ToolName, ToolResult};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DishIdArgs {
    dish_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DishIdsArgs {
    dish_ids: Vec<String>,
}

fn dishes_payload(dishes: &[Dish]) -> Result<serde_json::Value> {
    serde_json::to_value(dishes).map_err(|e| Error::Execution(e.to_string()))
}

/// Add one dish to the cart
pub struct AddToCartTool {
    catalog: Arc<dyn CatalogProvider>,
    carts: Arc<dyn CartStore>,
}

impl AddToCartTool {
    /// Create the tool
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogProvider>, carts: Arc<dyn CartStore>) -> Self {
        Self { catalog, carts }
    }
}

#[async_trait::async_trait]
impl Tool for AddToCartTool {
    fn name(&self) -> ToolName {
        ToolName::AddToCart
    }

    async fn execute(&self, args: serde_json::Value, ctx: &ToolContext) -> Result<ToolResult> {
        let DishIdArgs { dish_id } = parse_args(args)?;
        let dish = self
            .catalog
            .dish(&dish_id)
            .await?
            .ok_or_else(|| Error::Missing(format!("dish '{dish_id}'")))?;

        let name = dish.name.clone();
        let cart = self.carts.add(&ctx.user_id, vec![dish]).await;
        debug!(user_id = %ctx.user_id, dish_id = %dish_id, cart_size = cart.len(), "Dish added to cart");

        let message = format!("Added {name} to the cart");
        Ok(ToolResult::success(
            self.name(),
            PayloadKind::Cart,
            message.clone(),
            serde_json::Value::String(message),
        ))
    }
}

/// Add several dishes to the cart
pub struct AddListDishToCartTool {
    catalog: Arc<dyn CatalogProvider>,
    carts: Arc<dyn CartStore>,
}

impl AddListDishToCartTool {
    /// Create the tool
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogProvider>, carts: Arc<dyn CartStore>) -> Self {
        Self { catalog, carts }
    }
}

#[async_trait::async_trait]
impl Tool for AddListDishToCartTool {
    fn name(&self) -> ToolName {
        ToolName::AddListDishToCart
    }

    async fn execute(&self, args: serde_json::Value, ctx: &ToolContext) -> Result<ToolResult> {
        let DishIdsArgs { dish_ids } = parse_args(args)?;
        if dish_ids.is_empty() {
            return Err(Error::InvalidInput("dishIds must not be empty".to_string()));
        }

        let dishes = self.catalog.dishes(&dish_ids).await?;
        if dishes.is_empty() {
            return Err(Error::Missing(format!("dishes {}", dish_ids.join(", "))));
        }

        let added = dishes.len();
        let cart = self.carts.add(&ctx.user_id, dishes).await;
        let message = if added < dish_ids.len() {
            format!(
                "Added {added} of {} dishes to the cart; the rest are not on the menu",
                dish_ids.len()
            )
        } else {
            format!("Added {added} dishes to the cart")
        };

        Ok(ToolResult::success(
            self.name(),
            PayloadKind::Dishes,
            message,
            dishes_payload(&cart)?,
        ))
    }
}

/// Remove one dish from the cart
pub struct RemoveFromCartTool {
    catalog: Arc<dyn CatalogProvider>,
    carts: Arc<dyn CartStore>,
}

impl RemoveFromCartTool {
    /// Create the tool
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogProvider>, carts: Arc<dyn CartStore>) -> Self {
        Self { catalog, carts }
    }
}

#[async_trait::async_trait]
impl Tool for RemoveFromCartTool {
    fn name(&self) -> ToolName {
        ToolName::RemoveFromCart
    }

    async fn execute(&self, args: serde_json::Value, ctx: &ToolContext) -> Result<ToolResult> {
        let DishIdArgs { dish_id } = parse_args(args)?;
        if self.catalog.dish(&dish_id).await?.is_none() {
            return Err(Error::Missing(format!("dish '{dish_id}'")));
        }

        let removed = self
            .carts
            .remove(&ctx.user_id, &dish_id)
            .await
            .ok_or_else(|| Error::Missing(format!("dish '{dish_id}' is not in the cart")))?;

        let message = format!("Removed {} from the cart", removed.name);
        Ok(ToolResult::success(
            self.name(),
            PayloadKind::Cart,
            message.clone(),
            serde_json::Value::String(message),
        ))
    }
}

/// Show cart contents
pub struct DisplayCartTool {
    carts: Arc<dyn CartStore>,
}

impl DisplayCartTool {
    /// Create the tool
    #[must_use]
    pub fn new(carts: Arc<dyn CartStore>) -> Self {
        Self { carts }
    }
}

#[async_trait::async_trait]
impl Tool for DisplayCartTool {
    fn name(&self) -> ToolName {
        ToolName::DisplayCart
    }

    async fn execute(&self, _args: serde_json::Value, ctx: &ToolContext) -> Result<ToolResult> {
        let cart = self.carts.list(&ctx.user_id).await;
        let message = if cart.is_empty() {
            "The cart is empty".to_string()
        } else {
            format!("The cart holds {} dishes", cart.len())
        };
        Ok(ToolResult::success(
            self.name(),
            PayloadKind::Dishes,
            message,
            dishes_payload(&cart)?,
        ))
    }
}

/// Sum cart prices
pub struct CalculateCartTotalTool {
    carts: Arc<dyn CartStore>,
}

impl CalculateCartTotalTool {
    /// Create the tool
    #[must_use]
    pub fn new(carts: Arc<dyn CartStore>) -> Self {
        Self { carts }
    }
}

#[async_trait::async_trait]
impl Tool for CalculateCartTotalTool {
    fn name(&self) -> ToolName {
        ToolName::CalculateCartTotal
    }

    async fn execute(&self, _args: serde_json::Value, ctx: &ToolContext) -> Result<ToolResult> {
        let total = self.carts.total(&ctx.user_id).await;
        Ok(ToolResult::success(
            self.name(),
            PayloadKind::Cart,
            format!("Cart total is {total}"),
            serde_json::json!(total),
        ))
    }
}
