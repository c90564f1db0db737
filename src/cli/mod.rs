//! CLI module for VietFood
//!
//! - `check-config`: load, validate and print the effective configuration
//! - `worker`: drain the audit stream into the SQLite message log
//! - `history`: print the stored messages of a user

use clap::{Parser, Subcommand};

pub mod history;
pub mod worker;

/// VietFood sales agent CLI
#[derive(Parser, Debug)]
#[command(name = "vietfood")]
#[command(about = "Conversational sales agent for Việt Food")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate configuration and print it as JSON
    CheckConfig,
    /// Persist the audit stream into the message log
    Worker,
    /// Show recent messages of a user
    History {
        /// User id
        user: String,
        /// Maximum messages to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

/// Run the CLI command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::CheckConfig) => {
            let config = crate::loader::load_config()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Some(Commands::Worker) => worker::run().await,
        Some(Commands::History { user, limit }) => history::run(&user, limit).await,
        None => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            cmd.print_help()?;
            println!();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_history() {
        let cli = Cli::try_parse_from(["vietfood", "history", "u1", "--limit", "5"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::History { ref user, limit: 5 }) if user == "u1"
        ));
    }

    #[test]
    fn test_parse_defaults() {
        let cli = Cli::try_parse_from(["vietfood", "history", "u1"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::History { limit: 20, .. })));

        let cli = Cli::try_parse_from(["vietfood", "check-config"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::CheckConfig)));
    }
}
