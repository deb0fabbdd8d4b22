//! External data sources for coachbot.
//!
//! This crate provides the two read-only collaborators of the question
//! pipeline behind trait objects, so the pipeline can be driven by the real
//! Wikimedia services or by in-memory fakes.
//!
//! # Sources
//! - **Wikidata** (`GraphClient`): club roster and current head coach via SPARQL
//! - **Wikipedia** (`DocumentClient`): introductory biography excerpts
//!
//! # Example
//! ```no_run
//! use coachbot_core::AppConfig;
//! use coachbot_sources::create_clients;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let clients = create_clients(&AppConfig::default())?;
//! let clubs = clients.graph.fetch_all_clubs().await?;
//! println!("{} clubs", clubs.len());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{DocumentClient, GraphClient};
pub use factory::{create_clients, SourceClients};
pub use providers::{WikidataClient, WikipediaClient};
pub use types::{BiographyExcerpt, ClubRecord, CoachFact, SourceSettings};
