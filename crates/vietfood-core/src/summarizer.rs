//! Eviction-time profile summaries
//!
//! Before a session is dropped its chat is asked, with tools disabled, to
//! condense what it learned about the customer. The answer replaces the
//! stored profile; empty answers are not written.

use crate::error::{Error, Result};
use crate::profile::ProfileStore;
use std::sync::Arc;
use tracing::{debug, instrument};
use vietfood_llm::{ChatSession, ToolChoice};

/// Meta-instruction sent to the chat being evicted
pub const SUMMARY_INSTRUCTION: &str = "Tóm tắt trong một đoạn văn tất cả những gì bạn biết về khách hàng này: \
sở thích ăn uống, món đã hỏi hoặc đã thêm vào giỏ, khẩu vị, ngân sách và mọi thông tin hữu ích \
cho lần trò chuyện sau. Chỉ trả về đoạn tóm tắt.";

/// Writes profile summaries from evicted chats
pub struct Summarizer {
    profiles: Arc<dyn ProfileStore>,
}

impl Summarizer {
    /// Create a summarizer writing to `profiles`
    #[must_use]
    pub fn new(profiles: Arc<dyn ProfileStore>) -> Self {
        Self { profiles }
    }

    /// Summarize `chat` and overwrite the profile of `user_id`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Summarization`] if the model call fails, the answer
    /// is empty, or the profile cannot be saved. The stored profile is left
    /// untouched in every failure case.
    #[instrument(skip(self, chat), fields(user_id = %user_id))]
    pub async fn summarize(&self, user_id: &str, chat: &mut ChatSession) -> Result<String> {
        let response = chat
            .send_message(SUMMARY_INSTRUCTION, ToolChoice::None)
            .await
            .map_err(|e| Error::Summarization(e.to_string()))?;

        let text = response.content_text().trim();
        if text.is_empty() {
            return Err(Error::Summarization("model returned an empty summary".to_string()));
        }

        self.profiles
            .save(user_id, text)
            .await
            .map_err(|e| Error::Summarization(e.to_string()))?;

        debug!(chars = text.chars().count(), "Profile summary saved");
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::InMemoryProfileStore;
    use vietfood_llm::{ChatConfig, LlmProvider, MockProvider, ToolCompletionResponse, ToolDefinition};

    fn chat(provider: &MockProvider) -> ChatSession {
        let tool = ToolDefinition::new("displayCart", "Show the cart", serde_json::json!({"type": "object"}));
        ChatSession::new(
            Arc::new(provider.clone()) as Arc<dyn LlmProvider>,
            "system",
            vec![tool],
            ChatConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_summary_overwrites_profile() {
        let provider = MockProvider::new();
        provider.add_tool_response(ToolCompletionResponse::text("  Thích phở, ít cay.  "));
        let profiles = Arc::new(InMemoryProfileStore::new().with_profile("u1", "cũ"));
        let summarizer = Summarizer::new(profiles.clone());

        let text = summarizer.summarize("u1", &mut chat(&provider)).await.unwrap();
        assert_eq!(text, "Thích phở, ít cay.");
        assert_eq!(profiles.load("u1").await.unwrap().unwrap().text, "Thích phở, ít cay.");

        let request = &provider.requests()[0];
        assert_eq!(request.tool_choice, ToolChoice::None);
        assert!(request.tools.is_empty());
    }

    #[tokio::test]
    async fn test_empty_summary_keeps_old_profile() {
        let provider = MockProvider::new();
        provider.add_tool_response(ToolCompletionResponse::text("   "));
        let profiles = Arc::new(InMemoryProfileStore::new().with_profile("u1", "cũ"));
        let summarizer = Summarizer::new(profiles.clone());

        let err = summarizer.summarize("u1", &mut chat(&provider)).await.unwrap_err();
        assert!(matches!(err, Error::Summarization(_)));
        assert_eq!(profiles.load("u1").await.unwrap().unwrap().text, "cũ");
    }

    #[tokio::test]
    async fn test_model_failure_is_summarization_error() {
        let provider = MockProvider::new();
        provider.add_error(vietfood_llm::Error::Api("quota".into()));
        let summarizer = Summarizer::new(Arc::new(InMemoryProfileStore::new()));

        let err = summarizer.summarize("u1", &mut chat(&provider)).await.unwrap_err();
        assert!(matches!(err, Error::Summarization(msg) if msg.contains("quota")));
    }
}
