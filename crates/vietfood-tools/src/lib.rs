//! VietFood Tools - Sales Tools and Execution
//!
//! This crate provides everything the model can act on:
//! - Catalog: read-only menu access ([`CatalogProvider`])
//! - Cart: per-user ephemeral carts ([`CartStore`])
//! - Registry: the closed set of tools, validated against their declarations
//! - Builtins: the seven sales tools
//! - Executor: concurrent, failure-containing batch execution

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod builtins;
pub mod cart;
pub mod catalog;
pub mod declarations;
pub mod error;
pub mod executor;
pub mod registry;

pub use builtins::{builtin_registry, builtin_tools};
pub use cart::{CartStore, InMemoryCartStore};
pub use catalog::{CatalogProvider, Category, Dish, DishQuery, InMemoryCatalog, SortField};
pub use error::{Error, Result};
pub use executor::{ExecutorConfig, ToolExecutor};
pub use registry::{PayloadKind, Tool, ToolContext, ToolName, ToolRegistry, ToolResult};
