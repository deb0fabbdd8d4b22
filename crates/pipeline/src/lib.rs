//! Question pipeline for coachbot.
//!
//! Turns a free-text question into a `PromptArtifact`:
//! entity extraction, club resolution against the roster, coach and
//! biography retrieval, prompt composition.

pub mod extractor;
pub mod orchestrator;
pub mod resolver;
pub mod roster;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use extractor::{extract, Extraction, Strategy};
pub use orchestrator::{Delivery, Pipeline, QuestionOutcome, Rejection, Stage, StageEvent};
pub use resolver::ClubResolver;
pub use roster::{Club, ClubRoster};
