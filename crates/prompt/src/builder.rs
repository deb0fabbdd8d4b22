//! Prompt composer: renders a definition's template with retrieved context.

use crate::types::{BiographyBlock, ClubContext, CoachStatus, PromptArtifact, PromptDefinition};
use coachbot_core::{AppError, AppResult};
use handlebars::Handlebars;

const TEMPLATE_NAME: &str = "prompt";

/// Renders `PromptArtifact`s from one prompt definition.
///
/// The template is compiled once in `new`; `compose` has no I/O and no
/// mutable state, so identical inputs always give identical output.
pub struct PromptComposer {
    definition: PromptDefinition,
    registry: Handlebars<'static>,
}

impl std::fmt::Debug for PromptComposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptComposer")
            .field("prompt_id", &self.definition.id)
            .finish()
    }
}

impl PromptComposer {
    /// Compile the definition's template.
    ///
    /// # Errors
    /// `AppError::Prompt` if the template does not parse.
    pub fn new(definition: PromptDefinition) -> AppResult<Self> {
        let mut registry = Handlebars::new();

        // Plain text, not HTML
        registry.register_escape_fn(handlebars::no_escape);

        registry
            .register_template_string(TEMPLATE_NAME, &definition.template)
            .map_err(|e| {
                AppError::Prompt(format!(
                    "Failed to register template '{}': {}",
                    definition.id, e
                ))
            })?;

        Ok(Self {
            definition,
            registry,
        })
    }

    /// Id of the definition in use.
    pub fn prompt_id(&self) -> &str {
        &self.definition.id
    }

    /// Compose the final prompt for one question.
    ///
    /// # Example
    /// ```
    /// use coachbot_prompt::{builtin_prompt, ClubContext, CoachStatus, PromptComposer};
    ///
    /// let composer = PromptComposer::new(builtin_prompt().unwrap()).unwrap();
    /// let artifact = composer
    ///     .compose(
    ///         &ClubContext::new("1. FC Union Berlin"),
    ///         &CoachStatus::Known("Steffen Baumgart".to_string()),
    ///         None,
    ///         "Who is coaching Berlin?",
    ///     )
    ///     .unwrap();
    /// assert!(artifact.text.contains("Current Coach: Steffen Baumgart"));
    /// ```
    pub fn compose(
        &self,
        club: &ClubContext,
        coach: &CoachStatus,
        biography: Option<&BiographyBlock>,
        question: &str,
    ) -> AppResult<PromptArtifact> {
        tracing::debug!("Composing prompt with definition: {}", self.definition.id);

        let context = build_context(club, coach);

        let data = serde_json::json!({
            "system": self.definition.system,
            "context": context,
            "biography": biography.map(|b| b.text.as_str()),
            "biographySource": biography.map(|b| b.source.as_str()),
            "question": question,
        });

        let text = self
            .registry
            .render(TEMPLATE_NAME, &data)
            .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

        let club_line = format!("Club: {}", club.name);
        if !text.contains(&club_line) || !text.contains(question) {
            return Err(AppError::Prompt(format!(
                "Template '{}' dropped the club or the question from the rendered prompt",
                self.definition.id
            )));
        }

        tracing::debug!("Built prompt ({} chars)", text.len());
        tracing::trace!("Full prompt:\n{}", text);

        Ok(PromptArtifact {
            prompt_id: self.definition.id.clone(),
            system: self.definition.system.clone(),
            context,
            biography: biography.cloned(),
            question: question.to_string(),
            text,
        })
    }
}

/// Build the structured context block.
///
/// The club line is always present. The coach line is always present too:
/// when no name is available it says why, so the reader is never left to
/// infer that data is missing.
pub fn build_context(club: &ClubContext, coach: &CoachStatus) -> String {
    let mut lines = vec![format!("Club: {}", club.name)];

    if !club.cities.is_empty() {
        lines.push(format!("City: {}", club.cities.join(", ")));
    }

    lines.push(match coach {
        CoachStatus::Known(name) => format!("Current Coach: {}", name),
        CoachStatus::NotRecorded => {
            "Current Coach: not available (no current head coach is recorded for this club in the knowledge graph)"
                .to_string()
        }
        CoachStatus::TemporarilyUnavailable => {
            "Current Coach: temporarily unavailable (coach information is temporarily unavailable because the knowledge graph could not be reached)"
                .to_string()
        }
    });

    lines.join("\n")
}
