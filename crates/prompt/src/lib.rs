//! Prompt composition for coachbot.
//!
//! This crate turns retrieved club/coach facts into the final text handed to
//! a language model:
//! - YAML-based prompt definitions (system instructions + template)
//! - Handlebars template rendering
//! - An explicit structured context block that never hides missing data

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::{build_context, PromptComposer};
pub use loader::{builtin_prompt, load_prompt};
pub use types::{BiographyBlock, ClubContext, CoachStatus, PromptArtifact, PromptDefinition};
