//! Integration tests for VietFood
//!
//! These tests drive the assembled engine across crates:
//! - vietfood-llm: chat sessions and the provider seam
//! - vietfood-tools: catalog, carts and the builtin tools
//! - vietfood-core: sessions, the turn loop, eviction and storage

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use vietfood_core::{
    InMemoryMessageStream, InMemoryProfileStore, ManualClock, ProfileStore, Role, SalesAgent,
    UserIdentity,
};
use vietfood_llm::{
    LlmProvider, MessageRole, ToolCall, ToolCompletionRequest, ToolCompletionResponse, ToolChoice,
};
use vietfood_tools::{CartStore, InMemoryCartStore, InMemoryCatalog};

/// Provider that reacts to the conversation instead of a fixed script
struct WaiterProvider;

#[async_trait]
impl LlmProvider for WaiterProvider {
    fn name(&self) -> &str {
        "waiter"
    }

    fn default_model(&self) -> &str {
        "waiter-1"
    }

    async fn complete_with_tools(
        &self,
        request: ToolCompletionRequest,
    ) -> vietfood_llm::Result<ToolCompletionResponse> {
        let last = request
            .request
            .messages
            .last()
            .ok_or_else(|| vietfood_llm::Error::InvalidResponse("empty request".into()))?;

        if request.tool_choice == ToolChoice::None {
            return Ok(ToolCompletionResponse::text("Khách thích món cay, hay gọi bún bò."));
        }

        let reply = match last.role {
            MessageRole::User if last.content.contains("cay") => {
                ToolCompletionResponse::calls(vec![ToolCall::new(
                    "searchDishes",
                    serde_json::json!({"searchTerm": "spicy", "maxPrice": 100, "sortBy": "price"}),
                )])
            }
            MessageRole::User if last.content.contains("thêm") => {
                ToolCompletionResponse::calls(vec![
                    ToolCall::new("addListDishToCart", serde_json::json!({"dishIds": ["bun-bo-hue", "goi-cuon"]})),
                    ToolCall::new("calculateCartTotal", serde_json::json!({})),
                ])
            }
            MessageRole::Tool => ToolCompletionResponse::text("Dạ, mình xem giúp em bên dưới nhé 😋"),
            _ => ToolCompletionResponse::text("Dạ, em có thể giúp gì ạ?"),
        };
        Ok(reply)
    }
}

// ============================================================================
// Turn Loop Integration Tests
// ============================================================================

#[tokio::test]
async fn test_search_then_order_flow() {
    let stream = Arc::new(InMemoryMessageStream::new());
    let carts = Arc::new(InMemoryCartStore::new());
    let agent = SalesAgent::builder(Arc::new(WaiterProvider), Arc::new(InMemoryCatalog::sample()))
        .with_stream(stream.clone())
        .with_carts(carts.clone())
        .build()
        .unwrap();
    let user = UserIdentity::new("u-42", "Hùng");

    let reply = tokio_test::assert_ok!(agent.handle_user_message(&user, "có món cay nào không?").await);
    let ids: Vec<_> = reply.tool_results[0]
        .payload
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["mi-cay", "bun-bo-hue", "ga-xao-sa-ot"]);

    let reply = tokio_test::assert_ok!(agent.handle_user_message(&user, "thêm bún bò và gỏi cuốn").await);
    assert_eq!(reply.tool_results.len(), 2);
    assert_eq!(reply.tool_results[1].name, "calculateCartTotal");
    assert_eq!(carts.list("u-42").await.len(), 2);
    assert_eq!(carts.total("u-42").await, 110.0);

    let roles: Vec<_> = stream.for_user("u-42").iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User, Role::Assistant]);
    assert_eq!(agent.session_count(), 1);
}

#[tokio::test]
async fn test_agents_are_independent() {
    let a = SalesAgent::builder(Arc::new(WaiterProvider), Arc::new(InMemoryCatalog::sample()))
        .build()
        .unwrap();
    let b = SalesAgent::builder(Arc::new(WaiterProvider), Arc::new(InMemoryCatalog::sample()))
        .build()
        .unwrap();

    a.handle_user_message(&UserIdentity::new("u1", "Lan"), "chào").await.unwrap();
    assert_eq!(a.session_count(), 1);
    assert_eq!(b.session_count(), 0);
}

// ============================================================================
// Eviction Integration Tests
// ============================================================================

#[tokio::test]
async fn test_idle_session_summary_seeds_next_session() {
    let profiles = Arc::new(InMemoryProfileStore::new());
    let clock = Arc::new(ManualClock::new());
    let agent = SalesAgent::builder(Arc::new(WaiterProvider), Arc::new(InMemoryCatalog::sample()))
        .with_profiles(profiles.clone())
        .with_clock(clock.clone())
        .build()
        .unwrap();
    let user = UserIdentity::new("u7", "Mai");

    agent.handle_user_message(&user, "món cay dưới 100k").await.unwrap();
    clock.advance(Duration::from_secs(61 * 60));

    let report = agent.sweep_idle_sessions().await;
    assert_eq!(report.evicted, 1);
    assert_eq!(agent.session_count(), 0);

    let profile = profiles.load("u7").await.unwrap().unwrap();
    assert!(profile.text.contains("món cay"));

    let reply = agent.handle_user_message(&user, "chào lại").await.unwrap();
    let session = agent.session("u7").unwrap();
    assert_eq!(session.id(), reply.session_id);
}
