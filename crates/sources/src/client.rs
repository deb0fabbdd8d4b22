//! Source client abstractions.
//!
//! The pipeline depends only on these traits. Both are read-only and
//! idempotent, so a question can be abandoned at any point without cleanup.

use crate::types::{BiographyExcerpt, ClubRecord, CoachFact};
use coachbot_core::AppResult;

/// Trait for the structured knowledge graph.
///
/// Implementations must keep transport failures (`AppError::GraphQuery`)
/// apart from legitimate absence of data (`AppError::CoachNotFound`).
#[async_trait::async_trait]
pub trait GraphClient: Send + Sync {
    /// Get the source name (e.g., "wikidata").
    fn source_name(&self) -> &str;

    /// Fetch every club currently in the league.
    ///
    /// # Errors
    /// `AppError::GraphQuery` on transport, timeout or malformed response.
    async fn fetch_all_clubs(&self) -> AppResult<Vec<ClubRecord>>;

    /// Fetch the current head coach of a club.
    ///
    /// # Arguments
    /// * `club_id` - Stable identifier from a `ClubRecord`
    ///
    /// # Errors
    /// `AppError::CoachNotFound` when the graph holds no current coach,
    /// `AppError::GraphQuery` on transport, timeout or malformed response.
    async fn fetch_current_coach(&self, club_id: &str) -> AppResult<CoachFact>;
}

/// Trait for the unstructured document source.
#[async_trait::async_trait]
pub trait DocumentClient: Send + Sync {
    /// Get the source name (e.g., "wikipedia").
    fn source_name(&self) -> &str;

    /// Fetch the introductory excerpt of a person's article.
    ///
    /// Every failure, including transport errors, is reported as
    /// `AppError::BiographyUnavailable`; callers treat it as non-fatal.
    async fn fetch_biography(&self, person: &str) -> AppResult<BiographyExcerpt>;
}
