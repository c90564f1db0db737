//! Registry - the closed set of sales tools
//!
//! Tool names are a closed enum rather than free strings. The registry is
//! built once from the declared tool set plus one handler per tool, and
//! refuses to build if the two disagree, so an undeclared or unhandled tool
//! can never reach a conversation.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;
use vietfood_llm::Message;

/// Every tool the model may call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToolName {
    /// Filtered dish search
    SearchDishes,
    /// Add one dish to the cart
    AddToCart,
    /// Add several dishes to the cart
    AddListDishToCart,
    /// Remove one dish from the cart
    RemoveFromCart,
    /// Show cart contents
    DisplayCart,
    /// Sum cart prices
    CalculateCartTotal,
    /// List menu categories
    GetAllCategories,
}

impl ToolName {
    /// All tools, in declaration order
    pub const ALL: [ToolName; 7] = [
        Self::SearchDishes,
        Self::AddToCart,
        Self::RemoveFromCart,
        Self::DisplayCart,
        Self::GetAllCategories,
        Self::AddListDishToCart,
        Self::CalculateCartTotal,
    ];

    /// Model-visible identifier
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SearchDishes => "searchDishes",
            Self::AddToCart => "addToCart",
            Self::AddListDishToCart => "addListDishToCart",
            Self::RemoveFromCart => "removeFromCart",
            Self::DisplayCart => "displayCart",
            Self::CalculateCartTotal => "calculateCartTotal",
            Self::GetAllCategories => "getAllCategories",
        }
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| Error::NotFound(s.to_string()))
    }
}

/// What a tool result carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadKind {
    /// A list of dishes
    Dishes,
    /// A cart acknowledgement or total
    Cart,
    /// A list of categories
    Categories,
    /// The call failed; `message` says why
    Error,
}

impl PayloadKind {
    /// Kinds the client renders as catalog listings
    #[must_use]
    pub fn is_catalog_display(&self) -> bool {
        matches!(self, Self::Dishes | Self::Categories)
    }
}

/// Outcome of one tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    /// Id of the call this answers
    pub call_id: String,
    /// Tool name as the model called it
    pub name: String,
    /// Short human-readable outcome
    pub message: String,
    /// Structured data
    pub payload: serde_json::Value,
    /// Payload kind
    pub kind: PayloadKind,
}

impl ToolResult {
    /// Create a successful result
    #[must_use]
    pub fn success(
        name: ToolName,
        kind: PayloadKind,
        message: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            call_id: String::new(),
            name: name.as_str().to_string(),
            message: message.into(),
            payload,
            kind,
        }
    }

    /// Create a failed result
    #[must_use]
    pub fn failure(name: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            call_id: String::new(),
            name: name.into(),
            message: if message.is_empty() {
                "tool call failed".to_string()
            } else {
                message
            },
            payload: serde_json::Value::Array(Vec::new()),
            kind: PayloadKind::Error,
        }
    }

    /// Attach the id of the call this result answers
    #[must_use]
    pub fn with_call_id(mut self, call_id: impl Into<String>) -> Self {
        self.call_id = call_id.into();
        self
    }

    /// Whether the call failed
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.kind == PayloadKind::Error
    }

    /// Whether this is a catalog listing with at least one entry
    #[must_use]
    pub fn shows_catalog_items(&self) -> bool {
        self.kind.is_catalog_display()
            && self.payload.as_array().is_some_and(|items| !items.is_empty())
    }

    /// Tool-response message fed back to the model
    #[must_use]
    pub fn to_message(&self) -> Message {
        let content = serde_json::json!({
            "message": self.message,
            "responseType": self.kind,
            "response": self.payload,
        });
        Message::tool_response(&self.call_id, &self.name, content.to_string())
    }
}

/// Per-call context handed to handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolContext {
    /// User the conversation belongs to
    pub user_id: String,
}

impl ToolContext {
    /// Create a context for a user
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

/// Trait for tool implementations
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Which declared tool this handles
    fn name(&self) -> ToolName;

    /// Execute the tool with given arguments
    async fn execute(&self, args: serde_json::Value, ctx: &ToolContext) -> Result<ToolResult>;
}

/// Registry mapping every declared tool to exactly one handler
pub struct ToolRegistry {
    declared: Vec<ToolName>,
    tools: HashMap<ToolName, Arc<dyn Tool>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("declared", &self.declared)
            .finish()
    }
}

impl ToolRegistry {
    /// Build a registry, checking handlers against the declared tool set
    ///
    /// # Errors
    ///
    /// Returns [`Error::Registry`] if a declared tool has no handler, a tool
    /// has two handlers, or a handler serves an undeclared tool.
    pub fn new(declared: &[ToolName], handlers: Vec<Arc<dyn Tool>>) -> Result<Self> {
        let mut tools: HashMap<ToolName, Arc<dyn Tool>> = HashMap::new();
        for handler in handlers {
            let name = handler.name();
            if !declared.contains(&name) {
                return Err(Error::Registry(format!("handler for undeclared tool '{name}'")));
            }
            if tools.insert(name, handler).is_some() {
                return Err(Error::Registry(format!("duplicate handler for '{name}'")));
            }
            debug!(tool = %name, "Registering tool");
        }

        if let Some(missing) = declared.iter().find(|name| !tools.contains_key(name)) {
            return Err(Error::Registry(format!("no handler for declared tool '{missing}'")));
        }

        let mut unique = Vec::with_capacity(declared.len());
        for name in declared {
            if !unique.contains(name) {
                unique.push(*name);
            }
        }

        Ok(Self {
            declared: unique,
            tools,
        })
    }

    /// Get a tool by model-visible name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        let name = ToolName::from_str(name).ok()?;
        self.tools.get(&name).cloned()
    }

    /// Declared tools, in declaration order
    #[must_use]
    pub fn names(&self) -> &[ToolName] {
        &self.declared
    }

    /// Get tool count
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Convert declarations to the model's tool schema
    #[must_use]
    pub fn to_llm_tools(&self) -> Vec<vietfood_llm::ToolDefinition> {
        self.declared
            .iter()
            .map(|name| crate::declarations::declaration(*name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop(ToolName);

    #[async_trait::async_trait]
    impl Tool for Noop {
        fn name(&self) -> ToolName {
            self.0
        }

        async fn execute(&self, _args: serde_json::Value, _ctx: &ToolContext) -> Result<ToolResult> {
            Ok(ToolResult::success(self.0, PayloadKind::Cart, "ok", serde_json::Value::Null))
        }
    }

    fn handlers(names: &[ToolName]) -> Vec<Arc<dyn Tool>> {
        names
            .iter()
            .map(|n| Arc::new(Noop(*n)) as Arc<dyn Tool>)
            .collect()
    }

    #[test]
    fn test_tool_name_round_trip() {
        for name in ToolName::ALL {
            assert_eq!(name.as_str().parse::<ToolName>().unwrap(), name);
        }
        assert!(matches!("getAllDishes".parse::<ToolName>(), Err(Error::NotFound(_))));
        assert_eq!(
            serde_json::to_value(ToolName::AddListDishToCart).unwrap(),
            "addListDishToCart"
        );
    }

    #[test]
    fn test_registry_complete() {
        let registry = ToolRegistry::new(&ToolName::ALL, handlers(&ToolName::ALL)).unwrap();
        assert_eq!(registry.len(), 7);
        assert!(registry.get("displayCart").is_some());
        assert!(registry.get("display_cart").is_none());

        let tools = registry.to_llm_tools();
        let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names[0], "searchDishes");
        assert_eq!(names.len(), 7);
    }

    #[test]
    fn test_registry_rejects_missing_handler() {
        let err = ToolRegistry::new(&ToolName::ALL, handlers(&ToolName::ALL[..6])).unwrap_err();
        assert!(matches!(err, Error::Registry(msg) if msg.contains("calculateCartTotal")));
    }

    #[test]
    fn test_registry_rejects_undeclared_and_duplicate() {
        let declared = [ToolName::DisplayCart];
        let err = ToolRegistry::new(&declared, handlers(&[ToolName::DisplayCart, ToolName::AddToCart]))
            .unwrap_err();
        assert!(matches!(err, Error::Registry(msg) if msg.contains("undeclared")));

        let err = ToolRegistry::new(&declared, handlers(&[ToolName::DisplayCart, ToolName::DisplayCart]))
            .unwrap_err();
        assert!(matches!(err, Error::Registry(msg) if msg.contains("duplicate")));
    }

    #[test]
    fn test_tool_result_catalog_items() {
        let dishes = ToolResult::success(
            ToolName::SearchDishes,
            PayloadKind::Dishes,
            "found",
            serde_json::json!([{"id": "pho-bo"}]),
        );
        assert!(dishes.shows_catalog_items());

        let empty = ToolResult::success(
            ToolName::SearchDishes,
            PayloadKind::Dishes,
            "none",
            serde_json::json!([]),
        );
        assert!(!empty.shows_catalog_items());

        let cart = ToolResult::success(
            ToolName::CalculateCartTotal,
            PayloadKind::Cart,
            "total",
            serde_json::json!(120.0),
        );
        assert!(!cart.shows_catalog_items());

        let failed = ToolResult::failure("searchDishes", "");
        assert!(failed.is_error());
        assert!(!failed.message.is_empty());
    }

    #[test]
    fn test_tool_result_message() {
        let result = ToolResult::failure("addToCart", "dish not found").with_call_id("call_9");
        let msg = result.to_message();
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_9"));
        let body: serde_json::Value = serde_json::from_str(&msg.content).unwrap();
        assert_eq!(body["responseType"], "error");
        assert_eq!(body["message"], "dish not found");
    }
}
