//! Command handlers for the coachbot CLI.

pub mod ask;
pub mod chat;
pub mod clubs;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use clubs::ClubsCommand;

use coachbot_core::{config::AppConfig, AppResult};
use coachbot_pipeline::Pipeline;
use coachbot_sources::create_clients;

/// Create the source clients, populate the roster and load the prompt.
pub async fn build_pipeline(config: &AppConfig) -> AppResult<Pipeline> {
    let clients = create_clients(config)?;
    Pipeline::bootstrap(config, clients).await
}
