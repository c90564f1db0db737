//! `vietfood worker`

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use vietfood_core::{MessageWorker, SqliteStore, WorkerConfig};

/// Run the stream worker until Ctrl-C
pub async fn run() -> Result<()> {
    let config = crate::loader::load_config()?;

    let store = SqliteStore::new(&config.storage.database_path)
        .await
        .context("Failed to open message log")?;
    let worker = MessageWorker::new(
        &config.stream.redis_url,
        WorkerConfig::from(&config.stream),
        Arc::new(store),
    )?;

    let token = CancellationToken::new();
    let shutdown = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
        }
        shutdown.cancel();
    });

    worker.run(token).await;
    Ok(())
}
