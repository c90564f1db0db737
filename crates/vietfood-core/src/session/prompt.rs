//! System instruction for new sessions

use crate::profile::ProfileSummary;
use vietfood_tools::{Category, Dish};

/// Point-in-time data a session is seeded with
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    /// Menu categories
    pub categories: Vec<Category>,
    /// Best sellers
    pub popular_dishes: Vec<Dish>,
    /// Summary left by the previous session, if any
    pub profile: Option<ProfileSummary>,
}

/// Build the system instruction for a customer
#[must_use]
pub fn build_system_instruction(
    store_name: &str,
    display_name: &str,
    snapshot: &SessionSnapshot,
) -> String {
    let mut prompt = format!(
        "Bạn là nhân viên bán món ăn của cửa hàng {store_name}, đang trò chuyện với {display_name}. \
         Trả lời vui vẻ, thân thiện, có emoji, và giúp khách dễ chọn món. \
         Luôn dùng công cụ để tra cứu món ăn và giỏ hàng thay vì tự đoán. \
         Món ăn tìm được đã hiển thị bên dưới cho khách, nên chỉ cần tóm tắt ngắn gọn. \
         Nếu không có công cụ phù hợp, hãy thử kết hợp các công cụ hiện có."
    );

    if !snapshot.categories.is_empty() {
        prompt.push_str("\n\nDanh mục: ");
        let names: Vec<&str> = snapshot.categories.iter().map(|c| c.name.as_str()).collect();
        prompt.push_str(&names.join(", "));
    }

    if !snapshot.popular_dishes.is_empty() {
        prompt.push_str("\n\nMón bán chạy:");
        for dish in &snapshot.popular_dishes {
            prompt.push_str(&format!("\n- {} ({}): {}k", dish.name, dish.id, dish.price));
        }
    }

    if let Some(profile) = snapshot.profile.as_ref().filter(|p| !p.text.trim().is_empty()) {
        prompt.push_str("\n\nNhững gì đã biết về khách: ");
        prompt.push_str(profile.text.trim());
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use vietfood_tools::{CatalogProvider, InMemoryCatalog};

    #[tokio::test]
    async fn test_instruction_includes_snapshot() {
        let catalog = InMemoryCatalog::sample();
        let snapshot = SessionSnapshot {
            categories: catalog.categories().await.unwrap(),
            popular_dishes: catalog.popular_dishes(2).await.unwrap(),
            profile: Some(ProfileSummary {
                user_id: "u1".into(),
                text: "Không ăn hành".into(),
                updated_at: Utc::now(),
            }),
        };

        let prompt = build_system_instruction("Việt Food", "Lan", &snapshot);
        assert!(prompt.contains("Việt Food"));
        assert!(prompt.contains("Lan"));
        assert!(prompt.contains(&snapshot.categories[0].name));
        assert!(prompt.contains(&snapshot.popular_dishes[0].id));
        assert!(prompt.contains("Không ăn hành"));
    }

    #[test]
    fn test_instruction_without_profile() {
        let prompt = build_system_instruction("Việt Food", "Minh", &SessionSnapshot::default());
        assert!(!prompt.contains("Những gì đã biết"));
        assert!(!prompt.contains("Danh mục"));
    }
}
