//! `vietfood history <user>`

use anyhow::{Context, Result};
use vietfood_core::{MessageLog, SqliteStore, StreamMessage};

/// Print the most recent messages of a user, oldest first
pub async fn run(user_id: &str, limit: usize) -> Result<()> {
    let config = crate::loader::load_config()?;
    let store = SqliteStore::new(&config.storage.database_path)
        .await
        .context("Failed to open message log")?;

    let mut messages = store.history(user_id, limit).await?;
    if messages.is_empty() {
        println!("No messages for {user_id}");
        return Ok(());
    }

    messages.reverse();
    for message in &messages {
        println!("{}", format_line(message));
    }
    Ok(())
}

fn format_line(message: &StreamMessage) -> String {
    format!(
        "[{}] {:>9}: {}",
        message.timestamp.format("%Y-%m-%d %H:%M"),
        message.role.as_str(),
        message.content
    )
}
