//! Chat command handler.
//!
//! Interactive loop: one question per line, one prompt (or error) per answer.

use super::build_pipeline;
use clap::Args;
use coachbot_core::{config::AppConfig, AppResult};
use coachbot_pipeline::orchestrator::EXAMPLE_QUESTIONS;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Words that end the loop.
const EXIT_WORDS: &[&str] = &["quit", "exit", "q"];

/// Interactive question loop
#[derive(Args, Debug, Default)]
pub struct ChatCommand {
    /// Do not print the welcome banner
    #[arg(long)]
    pub no_banner: bool,
}

impl ChatCommand {
    /// Execute the chat command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command");

        println!("Initializing system... loading 1. Bundesliga clubs");

        let pipeline = match build_pipeline(config).await {
            Ok(pipeline) => pipeline,
            Err(e) => {
                println!(
                    "ERROR: Failed to initialize system. Please check your internet connection and try again."
                );
                return Err(e);
            }
        };

        println!("System ready! {} clubs loaded.", pipeline.roster().len());
        println!();

        if !self.no_banner {
            print_banner();
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            print!("Your question: ");
            std::io::stdout().flush().ok();

            let Some(line) = lines.next_line().await? else {
                tracing::debug!("End of input");
                println!();
                break;
            };

            let question = line.trim();
            if question.is_empty() {
                continue;
            }

            if is_exit(question) {
                break;
            }

            let outcome = pipeline.answer(question).await;

            println!();
            println!("{}", outcome.display_text());
            println!();
        }

        println!("Goodbye!");
        Ok(())
    }
}

fn is_exit(input: &str) -> bool {
    EXIT_WORDS.contains(&input.to_lowercase().as_str())
}

fn print_banner() {
    println!("Coach information for Germany's 1. Bundesliga");
    println!();
    println!("Ask about the current coach of a club (type 'quit' or 'exit' to leave).");
    println!("Examples:");
    for question in EXAMPLE_QUESTIONS {
        println!("  - {}", question);
    }
    println!();
}
