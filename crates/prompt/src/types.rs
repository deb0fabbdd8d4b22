//! Prompt types for coachbot.
//!
//! This module defines the domain entities for prompt composition.

use serde::{Deserialize, Serialize};

/// A prompt definition loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Creator identifier
    #[serde(rename = "createdBy", default)]
    pub created_by: String,

    /// Fixed system instructions for the downstream model
    pub system: String,

    /// Template string with Handlebars syntax.
    ///
    /// Variables: `system`, `context`, `biography`, `biographySource`, `question`.
    pub template: String,
}

/// The club part of the structured context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClubContext {
    pub name: String,
    #[serde(default)]
    pub cities: Vec<String>,
}

impl ClubContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cities: Vec::new(),
        }
    }

    pub fn with_cities(mut self, cities: Vec<String>) -> Self {
        self.cities = cities;
        self
    }
}

/// What is known about the club's current coach.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "name", rename_all = "camelCase")]
pub enum CoachStatus {
    /// The graph returned a current coach
    Known(String),

    /// The graph holds no current head-coach relation
    NotRecorded,

    /// The graph could not be queried (timeout, transport, malformed reply)
    TemporarilyUnavailable,
}

impl CoachStatus {
    pub fn name(&self) -> Option<&str> {
        match self {
            CoachStatus::Known(name) => Some(name),
            _ => None,
        }
    }
}

/// Biography text plus where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiographyBlock {
    pub text: String,
    pub source: String,
}

/// The terminal output of a question: everything the downstream model sees.
///
/// Built once by `PromptComposer::compose` and never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptArtifact {
    /// Definition the artifact was rendered from
    #[serde(rename = "promptId")]
    pub prompt_id: String,

    /// System instructions
    pub system: String,

    /// Structured context block (club, city, coach)
    pub context: String,

    /// Biography block, absent when no excerpt could be retrieved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub biography: Option<BiographyBlock>,

    /// The user's question, verbatim
    pub question: String,

    /// Fully rendered prompt
    pub text: String,
}

impl std::fmt::Display for PromptArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_definition_deserialization() {
        let yaml = r#"
id: test.prompt
title: Test Prompt
apiVersion: "1.0"
createdBy: test
system: "Answer briefly."
template: "{{system}} {{question}}"
"#;

        let def: PromptDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.id, "test.prompt");
        assert_eq!(def.system, "Answer briefly.");
        assert_eq!(def.template, "{{system}} {{question}}");
    }

    #[test]
    fn test_coach_status_serialization() {
        let known = serde_json::to_value(CoachStatus::Known("Steffen Baumgart".to_string())).unwrap();
        assert_eq!(known["status"], "known");
        assert_eq!(known["name"], "Steffen Baumgart");

        let missing = serde_json::to_value(CoachStatus::TemporarilyUnavailable).unwrap();
        assert_eq!(missing["status"], "temporarilyUnavailable");
    }

    #[test]
    fn test_coach_status_name() {
        assert_eq!(CoachStatus::Known("A".to_string()).name(), Some("A"));
        assert_eq!(CoachStatus::NotRecorded.name(), None);
    }
}
