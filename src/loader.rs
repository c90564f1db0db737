//! Configuration loading
//!
//! Embedded defaults, then optional files, then environment variables.

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use vietfood_core::AppConfig;

/// Embedded default configuration (compiled into binary)
pub const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Load and validate configuration
pub fn load_config() -> Result<AppConfig> {
    let config = Config::builder()
        .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            File::with_name(&format!(
                "config/{}",
                std::env::var("VIETFOOD_ENV").unwrap_or_else(|_| "development".to_string())
            ))
            .required(false),
        )
        .add_source(File::with_name("config/local").required(false))
        // VIETFOOD_AGENT__MAX_TOOL_ROUNDS, single underscore after the prefix
        .add_source(
            Environment::with_prefix("VIETFOOD")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let app: AppConfig = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;
    app.validate().context("Invalid configuration")?;
    Ok(app)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_defaults_parse() {
        let config: AppConfig = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        config.validate().unwrap();
        assert_eq!(config.agent.max_tool_rounds, 5);
        assert_eq!(config.sessions.idle_timeout_secs, 3600);
        assert_eq!(config.stream.stream_key, "message_stream");
    }
}
