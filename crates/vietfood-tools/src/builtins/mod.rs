//! Builtins - the sales tools
//!
//! - Catalog tools: searchDishes, getAllCategories
//! - Cart tools: addToCart, addListDishToCart, removeFromCart, displayCart,
//!   calculateCartTotal

mod cart;
mod catalog;

pub use cart::{
    AddListDishToCartTool, AddToCartTool, CalculateCartTotalTool, DisplayCartTool,
    RemoveFromCartTool,
};
pub use catalog::{GetAllCategoriesTool, SearchDishesTool};

use crate::cart::CartStore;
use crate::catalog::CatalogProvider;
use crate::error::{Error, Result};
use crate::registry::{Tool, ToolName, ToolRegistry};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// One handler for every tool in [`ToolName::ALL`]
#[must_use]
pub fn builtin_tools(
    catalog: Arc<dyn CatalogProvider>,
    carts: Arc<dyn CartStore>,
) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(SearchDishesTool::new(catalog.clone())),
        Arc::new(GetAllCategoriesTool::new(catalog.clone())),
        Arc::new(AddToCartTool::new(catalog.clone(), carts.clone())),
        Arc::new(AddListDishToCartTool::new(catalog.clone(), carts.clone())),
        Arc::new(RemoveFromCartTool::new(catalog, carts.clone())),
        Arc::new(DisplayCartTool::new(carts.clone())),
        Arc::new(CalculateCartTotalTool::new(carts)),
    ]
}

/// Registry with every builtin tool declared and handled
pub fn builtin_registry(
    catalog: Arc<dyn CatalogProvider>,
    carts: Arc<dyn CartStore>,
) -> Result<ToolRegistry> {
    ToolRegistry::new(&ToolName::ALL, builtin_tools(catalog, carts))
}

/// Decode tool arguments; a missing argument object counts as `{}`
pub(crate) fn parse_args<T: DeserializeOwned>(args: serde_json::Value) -> Result<T> {
    let args = if args.is_null() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        args
    };
    serde_json::from_value(args).map_err(|e| Error::InvalidInput(e.to_string()))
}
