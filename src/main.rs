//! VietFood - conversational sales agent
//!
//! CLI entry point: configuration checks, the audit stream worker and
//! message history lookups.

#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod loader;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let (writer, _guard) = tracing_appender::non_blocking(std::io::stdout());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vietfood=info,vietfood_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(writer))
        .init();

    let cli = cli::Cli::parse();
    if cli.command.is_some() {
        info!("Starting VietFood v{}", env!("CARGO_PKG_VERSION"));
    }

    cli::run(cli).await
}
