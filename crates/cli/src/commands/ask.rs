//! Ask command handler.
//!
//! Answers the given questions concurrently and prints one prompt (or error
//! message) per question.

use super::build_pipeline;
use clap::Args;
use coachbot_core::{config::AppConfig, AppError, AppResult};
use coachbot_pipeline::QuestionOutcome;
use futures::future::join_all;

/// Answer one or more questions and exit
#[derive(Args, Debug)]
pub struct AskCommand {
    /// Questions to answer
    #[arg(required = true, num_args = 1..)]
    pub questions: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let pipeline = build_pipeline(config).await?;

        let outcomes: Vec<QuestionOutcome> =
            join_all(self.questions.iter().map(|q| pipeline.answer(q))).await;

        if self.json {
            let json = serde_json::to_string_pretty(&outcomes)
                .map_err(|e| AppError::Serialization(e.to_string()))?;
            println!("{}", json);
        } else {
            let many = outcomes.len() > 1;
            for (question, outcome) in self.questions.iter().zip(&outcomes) {
                if many {
                    println!("=== {} ===", question);
                }
                println!("{}", outcome.display_text());
                if many {
                    println!();
                }
            }
        }

        let rejected = outcomes.iter().filter(|o| !o.is_delivered()).count();
        if rejected > 0 {
            return Err(AppError::Other(format!(
                "{} of {} questions could not be answered",
                rejected,
                outcomes.len()
            )));
        }

        Ok(())
    }
}
