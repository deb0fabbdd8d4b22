//! Coachbot CLI
//!
//! Main entry point for the coachbot command-line tool.
//! Turns questions about 1. Bundesliga coaches into grounded prompts.

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use coachbot_core::{config::AppConfig, logging};
use commands::{AskCommand, ChatCommand, ClubsCommand};
use std::path::PathBuf;

/// Coachbot - grounded prompts for questions about 1. Bundesliga coaches
#[derive(Parser, Debug)]
#[command(name = "coachbot")]
#[command(about = "Grounded prompts for questions about 1. Bundesliga coaches", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "COACHBOT_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "COACHBOT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Per-request timeout for the graph and document sources, in seconds
    #[arg(short, long, global = true, env = "COACHBOT_TIMEOUT_SECS")]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactive question loop (default)
    Chat(ChatCommand),

    /// Answer one or more questions and exit
    Ask(AskCommand),

    /// List the clubs in the roster
    Clubs(ClubsCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Load configuration for the selected workspace
    let config = AppConfig::load_from(cli.workspace, cli.config)
        .context("Failed to load configuration")?;

    // Apply CLI overrides
    let config = config.with_overrides(
        None,
        None,
        cli.timeout,
        cli.log_level,
        cli.log_json,
        cli.verbose,
        cli.no_color,
    );

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color, config.log_json)?;

    config.validate().context("Invalid configuration")?;

    tracing::info!("Coachbot CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Graph endpoint: {}", config.graph.endpoint);
    tracing::debug!("Document endpoint: {}", config.document.endpoint);

    let command = cli
        .command
        .unwrap_or_else(|| Commands::Chat(ChatCommand::default()));

    // Emit command span
    let command_name = match &command {
        Commands::Chat(_) => "chat",
        Commands::Ask(_) => "ask",
        Commands::Clubs(_) => "clubs",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    // Route to command handlers
    let result = match command {
        Commands::Chat(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Clubs(cmd) => cmd.execute(&config).await,
    };

    // Log completion
    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result.with_context(|| format!("coachbot {} failed", command_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_command_is_chat() {
        let cli = Cli::try_parse_from(["coachbot"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_parse_ask_with_global_flags() {
        let cli = Cli::try_parse_from([
            "coachbot",
            "ask",
            "--json",
            "Who is coaching Berlin?",
            "What about munich?",
            "--timeout",
            "5",
        ])
        .unwrap();

        assert_eq!(cli.timeout, Some(5));
        match cli.command {
            Some(Commands::Ask(cmd)) => {
                assert!(cmd.json);
                assert_eq!(cmd.questions.len(), 2);
            }
            other => panic!("Expected ask command, got {:?}", other),
        }
    }

    #[test]
    fn test_ask_requires_a_question() {
        assert!(Cli::try_parse_from(["coachbot", "ask"]).is_err());
    }
}
