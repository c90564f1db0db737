//! Tool schemas declared to the model

use crate::catalog::MAX_SEARCH_LIMIT;
use crate::registry::ToolName;
use serde_json::json;
use vietfood_llm::ToolDefinition;

fn no_params() -> serde_json::Value {
    json!({"type": "object", "properties": {}})
}

/// Schema for one tool
#[must_use]
pub fn declaration(name: ToolName) -> ToolDefinition {
    let (description, parameters) = match name {
        ToolName::SearchDishes => (
            "Search the menu and return dishes matching the given criteria. \
             `category` is a category id. With no criteria, returns the first dishes on the menu. \
             `sortBy` is a comma separated list of price, rating, soldCount or name; \
             prefix a field with '-' to sort descending.",
            json!({
                "type": "object",
                "properties": {
                    "limit": {"type": "integer", "minimum": 1, "maximum": MAX_SEARCH_LIMIT},
                    "sortBy": {"type": "string"},
                    "isPopular": {"type": "boolean"},
                    "isNewDish": {"type": "boolean"},
                    "isSpecial": {"type": "boolean"},
                    "minPrice": {"type": "number"},
                    "maxPrice": {"type": "number"},
                    "minRating": {"type": "number", "minimum": 0, "maximum": 5},
                    "maxRating": {"type": "number", "minimum": 0, "maximum": 5},
                    "searchTerm": {"type": "string"},
                    "category": {"type": "string"}
                }
            }),
        ),
        ToolName::AddToCart => (
            "Add one dish to the customer's temporary cart.",
            json!({
                "type": "object",
                "properties": {"dishId": {"type": "string"}},
                "required": ["dishId"]
            }),
        ),
        ToolName::AddListDishToCart => (
            "Add several dishes to the customer's temporary cart at once.",
            json!({
                "type": "object",
                "properties": {
                    "dishIds": {"type": "array", "items": {"type": "string"}}
                },
                "required": ["dishIds"]
            }),
        ),
        ToolName::RemoveFromCart => (
            "Remove one dish from the customer's temporary cart.",
            json!({
                "type": "object",
                "properties": {"dishId": {"type": "string"}},
                "required": ["dishId"]
            }),
        ),
        ToolName::DisplayCart => (
            "Return the dishes currently in the customer's temporary cart.",
            no_params(),
        ),
        ToolName::CalculateCartTotal => (
            "Compute the total price of the customer's temporary cart.",
            no_params(),
        ),
        ToolName::GetAllCategories => (
            "List every menu category with its id, name, slug, description and image.",
            no_params(),
        ),
    };

    ToolDefinition::new(name.as_str(), description, parameters)
}
