//! Per-question orchestration.
//!
//! Drives one question through
//! `Received -> EntityExtracted -> ClubResolved -> CoachFetched ->
//! BiographyFetched -> PromptComposed -> Delivered`. Extraction and
//! resolution failures end the question with a user-facing message; coach
//! and biography failures only thin out the prompt.

use crate::extractor::{self, Extraction};
use crate::resolver::ClubResolver;
use crate::roster::{Club, ClubRoster};
use coachbot_core::{AppConfig, AppError, AppResult};
use coachbot_prompt::{
    load_prompt, BiographyBlock, ClubContext, CoachStatus, PromptArtifact, PromptComposer,
};
use coachbot_sources::SourceClients;
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::Instant;
use tracing::{debug, info, warn, Instrument};

/// Example questions shown after every error.
pub const EXAMPLE_QUESTIONS: &[&str] = &[
    "Who is coaching Berlin?",
    "What about munich?",
    "Who is heidenheims manager?",
    "Who is it for Pauli?",
];

/// Pipeline states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    Received,
    EntityExtracted,
    ClubResolved,
    CoachFetched,
    BiographyFetched,
    PromptComposed,
    Delivered,
    Errored,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::EntityExtracted => "entity_extracted",
            Stage::ClubResolved => "club_resolved",
            Stage::CoachFetched => "coach_fetched",
            Stage::BiographyFetched => "biography_fetched",
            Stage::PromptComposed => "prompt_composed",
            Stage::Delivered => "delivered",
            Stage::Errored => "errored",
        };
        f.write_str(name)
    }
}

/// One recorded transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageEvent {
    pub stage: Stage,
    /// Milliseconds since the question was received
    pub elapsed_ms: u64,
    pub detail: String,
}

/// A question that produced a prompt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    pub question: String,
    pub extraction: Extraction,
    pub club: Club,
    pub coach: CoachStatus,
    pub artifact: PromptArtifact,
    pub trace: Vec<StageEvent>,
}

/// A question that could not be answered.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rejection {
    pub question: String,
    /// Stage at which the question failed
    pub failed_at: Stage,
    pub reason: String,
    pub retryable: bool,
    /// Full user-facing message
    pub message: String,
    pub trace: Vec<StageEvent>,
    #[serde(skip)]
    pub error: AppError,
}

/// Outcome of one question.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum QuestionOutcome {
    Delivered(Box<Delivery>),
    Rejected(Box<Rejection>),
}

impl QuestionOutcome {
    /// Text to print on the console.
    pub fn display_text(&self) -> &str {
        match self {
            QuestionOutcome::Delivered(d) => &d.artifact.text,
            QuestionOutcome::Rejected(r) => &r.message,
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, QuestionOutcome::Delivered(_))
    }

    pub fn trace(&self) -> &[StageEvent] {
        match self {
            QuestionOutcome::Delivered(d) => &d.trace,
            QuestionOutcome::Rejected(r) => &r.trace,
        }
    }
}

/// Records transitions with elapsed time.
struct Trace {
    started: Instant,
    events: Vec<StageEvent>,
}

impl Trace {
    fn start(question: &str) -> Self {
        let mut trace = Self {
            started: Instant::now(),
            events: Vec::new(),
        };
        trace.record(Stage::Received, format!("{} chars", question.chars().count()));
        trace
    }

    fn record(&mut self, stage: Stage, detail: impl Into<String>) {
        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        let detail = detail.into();
        info!(stage = %stage, elapsed_ms, "{}", detail);
        self.events.push(StageEvent {
            stage,
            elapsed_ms,
            detail,
        });
    }
}

/// The question pipeline.
///
/// Holds the roster for the whole process lifetime. `answer` takes `&self`
/// and keeps no per-question state, so questions can run concurrently.
pub struct Pipeline {
    roster: ClubRoster,
    resolver: ClubResolver,
    vocabulary: BTreeSet<String>,
    clients: SourceClients,
    composer: PromptComposer,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("clubs", &self.roster.len())
            .field("clients", &self.clients)
            .field("composer", &self.composer)
            .finish()
    }
}

impl Pipeline {
    /// Assemble a pipeline from an already populated roster.
    pub fn new(
        roster: ClubRoster,
        pinned_aliases: &std::collections::BTreeMap<String, String>,
        clients: SourceClients,
        composer: PromptComposer,
    ) -> Self {
        let resolver = ClubResolver::new(&roster, pinned_aliases);
        let vocabulary = roster.vocabulary();
        debug!(
            "Pipeline ready: {} clubs, {} pinned aliases, prompt {}",
            roster.len(),
            resolver.pinned_len(),
            composer.prompt_id()
        );
        Self {
            roster,
            resolver,
            vocabulary,
            clients,
            composer,
        }
    }

    /// Populate the roster and load the prompt definition.
    ///
    /// # Errors
    /// `AppError::RosterUnavailable` if the roster cannot be populated, or
    /// `AppError::Prompt` if the configured prompt is missing or invalid.
    pub async fn bootstrap(config: &AppConfig, clients: SourceClients) -> AppResult<Self> {
        let definition = load_prompt(&config.workspace, &config.prompt_id)?;
        let composer = PromptComposer::new(definition)?;

        info!("Populating club roster from {}", clients.graph.source_name());
        let roster = ClubRoster::populate(clients.graph.as_ref(), config.roster_retries).await?;

        Ok(Self::new(roster, &config.aliases, clients, composer))
    }

    pub fn roster(&self) -> &ClubRoster {
        &self.roster
    }

    /// Answer one question.
    pub async fn answer(&self, question: &str) -> QuestionOutcome {
        let span = tracing::info_span!("question", question = %question.trim());
        self.run(question).instrument(span).await
    }

    async fn run(&self, question: &str) -> QuestionOutcome {
        let mut trace = Trace::start(question);

        let extraction = match extractor::extract(question, &self.vocabulary) {
            Ok(extraction) => extraction,
            Err(e) => return reject(question, Stage::EntityExtracted, e, trace),
        };
        trace.record(
            Stage::EntityExtracted,
            format!("token '{}' via {}", extraction.token, extraction.strategy),
        );

        let club = match self.resolver.resolve(&self.roster, &extraction.token) {
            Ok(club) => club,
            Err(e) => return reject(question, Stage::ClubResolved, e, trace),
        };
        trace.record(Stage::ClubResolved, format!("{} ({})", club.name, club.id));

        let coach = self.fetch_coach(club).await;
        trace.record(Stage::CoachFetched, coach_detail(&coach));

        let biography = match coach.name() {
            Some(name) => self.fetch_biography(name).await,
            None => None,
        };
        trace.record(
            Stage::BiographyFetched,
            match (&coach, &biography) {
                (CoachStatus::Known(_), Some(b)) => format!("{} chars from {}", b.text.chars().count(), b.source),
                (CoachStatus::Known(_), None) => "unavailable".to_string(),
                _ => "skipped".to_string(),
            },
        );

        let context = ClubContext::new(club.name.clone()).with_cities(club.cities.clone());
        let artifact = match self
            .composer
            .compose(&context, &coach, biography.as_ref(), question)
        {
            Ok(artifact) => artifact,
            Err(e) => return reject(question, Stage::PromptComposed, e, trace),
        };
        trace.record(
            Stage::PromptComposed,
            format!("{} chars with {}", artifact.text.chars().count(), artifact.prompt_id),
        );

        trace.record(Stage::Delivered, "prompt delivered");

        QuestionOutcome::Delivered(Box::new(Delivery {
            question: question.to_string(),
            extraction,
            club: club.clone(),
            coach,
            artifact,
            trace: trace.events,
        }))
    }

    async fn fetch_coach(&self, club: &Club) -> CoachStatus {
        match self.clients.graph.fetch_current_coach(&club.id).await {
            Ok(fact) => CoachStatus::Known(fact.name),
            Err(AppError::CoachNotFound(_)) => {
                info!("No current coach recorded for {} ({})", club.name, club.id);
                CoachStatus::NotRecorded
            }
            Err(e) => {
                warn!(
                    stage = %Stage::CoachFetched,
                    club_id = %club.id,
                    "Coach lookup for {} failed: {}",
                    club.name,
                    e
                );
                CoachStatus::TemporarilyUnavailable
            }
        }
    }

    async fn fetch_biography(&self, person: &str) -> Option<BiographyBlock> {
        match self.clients.document.fetch_biography(person).await {
            Ok(excerpt) => Some(BiographyBlock {
                text: excerpt.text,
                source: excerpt.source,
            }),
            Err(e) => {
                warn!(stage = %Stage::BiographyFetched, "{}", e);
                None
            }
        }
    }
}

fn coach_detail(coach: &CoachStatus) -> String {
    match coach {
        CoachStatus::Known(name) => name.clone(),
        CoachStatus::NotRecorded => "not recorded".to_string(),
        CoachStatus::TemporarilyUnavailable => "temporarily unavailable".to_string(),
    }
}

fn reject(question: &str, failed_at: Stage, error: AppError, mut trace: Trace) -> QuestionOutcome {
    warn!(stage = %failed_at, question = %question.trim(), "{}", error);
    trace.record(Stage::Errored, format!("{} failed: {}", failed_at, error));

    QuestionOutcome::Rejected(Box::new(Rejection {
        question: question.to_string(),
        failed_at,
        reason: error.to_string(),
        retryable: error.is_retryable(),
        message: user_message(&error),
        trace: trace.events,
        error,
    }))
}

/// Render an error for the console.
///
/// Transport problems ask the user to try again; missing data says so.
pub fn user_message(error: &AppError) -> String {
    let explanation = match error {
        AppError::NoEntityFound(_) => "Dear user, I could not identify a city or club in your question. Please, use the required question format and specify which city or club you're asking about.".to_string(),
        AppError::ClubNotFound(token) => format!(
            "Dear user, I could not find a Bundesliga club for '{}'. Please, use the required question format or check the city name.",
            token
        ),
        AppError::AmbiguousEntity { token, candidates } => format!(
            "Dear user, '{}' matches more than one Bundesliga club ({}). Please, name the club you mean.",
            token,
            candidates.join(", ")
        ),
        e if e.is_retryable() => format!(
            "Dear user, a data source could not be reached ({}). Please try again in a moment.",
            e
        ),
        _ => "Dear user, an unexpected error occurred while processing your question. Please try again.".to_string(),
    };

    let examples: Vec<String> = EXAMPLE_QUESTIONS
        .iter()
        .map(|q| format!("  - {}", q))
        .collect();

    format!(
        "ERROR: {}\n\nDear user, the Germany's 1. Bundesliga coach information system was unable to retrieve the necessary information to answer your question.\nPlease check your input and try again.\n\nExamples of valid questions:\n{}",
        explanation,
        examples.join("\n")
    )
}
