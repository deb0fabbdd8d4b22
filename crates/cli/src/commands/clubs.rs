//! Clubs command handler.
//!
//! Populates the roster and lists each club with the aliases it answers to.

use clap::Args;
use coachbot_core::{config::AppConfig, AppError, AppResult};
use coachbot_pipeline::{ClubResolver, ClubRoster};
use coachbot_sources::create_clients;

/// List the clubs in the roster
#[derive(Args, Debug)]
pub struct ClubsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ClubsCommand {
    /// Execute the clubs command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing clubs command");

        let clients = create_clients(config)?;
        let roster = ClubRoster::populate(clients.graph.as_ref(), config.roster_retries).await?;
        let resolver = ClubResolver::new(&roster, &config.aliases);

        if self.json {
            let clubs: Vec<serde_json::Value> = roster
                .clubs()
                .iter()
                .map(|club| {
                    serde_json::json!({
                        "id": club.id,
                        "name": club.name,
                        "cities": club.cities,
                        "rosterCoach": club.coach,
                        "aliases": club.aliases,
                        "pinnedAliases": resolver.pinned_for(&club.id).collect::<Vec<_>>(),
                    })
                })
                .collect();

            let json = serde_json::to_string_pretty(&clubs)
                .map_err(|e| AppError::Serialization(e.to_string()))?;
            println!("{}", json);
            return Ok(());
        }

        println!("{} clubs from {}:", roster.len(), clients.graph.source_name());
        println!();

        for club in roster.clubs() {
            let cities = if club.cities.is_empty() {
                "-".to_string()
            } else {
                club.cities.join(", ")
            };

            println!("{} ({})", club.name, club.id);
            println!("  City:    {}", cities);
            if let Some(coach) = &club.coach {
                println!("  Coach:   {} (at roster time)", coach);
            }

            let mut aliases: Vec<&str> = club.aliases.iter().map(String::as_str).collect();
            aliases.extend(resolver.pinned_for(&club.id));
            aliases.sort_unstable();
            aliases.dedup();
            println!("  Aliases: {}", aliases.join(", "));
        }

        Ok(())
    }
}
