//! Error types for coachbot.
//!
//! This module defines a unified error enum covering configuration, I/O,
//! question resolution, the two external data sources, and prompt rendering.

use thiserror::Error;

/// Unified error type for coachbot.
///
/// All fallible functions return `Result<T, AppError>`. Transport failures
/// (`GraphQuery`) and semantic absence (`CoachNotFound`, `ClubNotFound`, ...)
/// are separate variants so callers can word their messages differently.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No city or club could be recognized in the question text
    #[error("No city or club found in question: {0:?}")]
    NoEntityFound(String),

    /// The token matches more than one club and carries no distinguishing alias
    #[error("'{token}' matches several clubs: {}", candidates.join(", "))]
    AmbiguousEntity {
        token: String,
        candidates: Vec<String>,
    },

    /// The token matches no alias in the roster
    #[error("No Bundesliga club known for '{0}'")]
    ClubNotFound(String),

    /// The club roster could not be populated
    #[error("Club roster unavailable: {0}")]
    RosterUnavailable(String),

    /// Transport, timeout or malformed-response failure talking to the graph endpoint
    #[error("Knowledge graph query failed: {0}")]
    GraphQuery(String),

    /// The graph holds no current head-coach relation for the club
    #[error("No current coach recorded for club {0}")]
    CoachNotFound(String),

    /// No usable biography could be retrieved for the person
    #[error("Biography unavailable for {person}: {reason}")]
    BiographyUnavailable { person: String, reason: String },

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether asking again later may succeed.
    ///
    /// True for transport-level failures; false for data that simply does
    /// not exist.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::GraphQuery(_) | AppError::RosterUnavailable(_) | AppError::Io(_)
        )
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_errors_are_retryable() {
        assert!(AppError::GraphQuery("timed out".to_string()).is_retryable());
        assert!(AppError::RosterUnavailable("no clubs".to_string()).is_retryable());
    }

    #[test]
    fn test_semantic_absence_is_not_retryable() {
        assert!(!AppError::CoachNotFound("Q1".to_string()).is_retryable());
        assert!(!AppError::ClubNotFound("nowhereville".to_string()).is_retryable());
        assert!(!AppError::NoEntityFound("hello".to_string()).is_retryable());
    }

    #[test]
    fn test_ambiguous_entity_lists_candidates() {
        let err = AppError::AmbiguousEntity {
            token: "borussia".to_string(),
            candidates: vec![
                "Borussia Dortmund".to_string(),
                "Borussia Mönchengladbach".to_string(),
            ],
        };
        let message = err.to_string();
        assert!(message.contains("borussia"));
        assert!(message.contains("Borussia Dortmund, Borussia Mönchengladbach"));
    }

    #[test]
    fn test_serde_json_conversion() {
        let err: AppError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
