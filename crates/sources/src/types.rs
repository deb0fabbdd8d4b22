//! Records returned by the external sources.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use coachbot_core::AppConfig;

/// A club as reported by the knowledge graph, before aliases are derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClubRecord {
    /// Stable external identifier (Wikidata item id, e.g. "Q157")
    pub id: String,

    /// Canonical club name (e.g. "1. FC Union Berlin")
    pub name: String,

    /// Headquarters city labels; may be empty
    #[serde(default)]
    pub cities: Vec<String>,

    /// Head coach without an end time at roster time, informational only
    #[serde(default)]
    pub coach: Option<String>,
}

impl ClubRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            cities: Vec::new(),
            coach: None,
        }
    }

    /// Add a city label.
    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.cities.push(city.into());
        self
    }

    /// Set the roster-time coach.
    pub fn with_coach(mut self, coach: impl Into<String>) -> Self {
        self.coach = Some(coach.into());
        self
    }
}

/// The current head coach of a club, fetched fresh for every question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoachFact {
    /// Coach display name
    pub name: String,

    /// Coach's own graph identifier, when reported
    #[serde(rename = "coachId", skip_serializing_if = "Option::is_none")]
    pub coach_id: Option<String>,

    /// Identifier of the club the fact was fetched for
    #[serde(rename = "clubId")]
    pub club_id: String,

    /// When the fact was retrieved
    #[serde(rename = "retrievedAt")]
    pub retrieved_at: DateTime<Utc>,
}

impl CoachFact {
    pub fn new(name: impl Into<String>, club_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            coach_id: None,
            club_id: club_id.into(),
            retrieved_at: Utc::now(),
        }
    }

    pub fn with_coach_id(mut self, coach_id: impl Into<String>) -> Self {
        self.coach_id = Some(coach_id.into());
        self
    }
}

/// Introductory biography text for a person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiographyExcerpt {
    /// Name the lookup was made for
    pub person: String,

    /// Article title after redirects
    pub title: String,

    /// Plain-text introduction
    pub text: String,

    /// Where the text came from (article URL)
    pub source: String,
}

/// Transport settings shared by both HTTP clients.
#[derive(Debug, Clone)]
pub struct SourceSettings {
    /// Sent as `User-Agent` on every request
    pub user_agent: String,

    /// Bound on each request, connect to last byte
    pub timeout: Duration,
}

impl SourceSettings {
    pub fn new(user_agent: impl Into<String>, timeout: Duration) -> Self {
        Self {
            user_agent: user_agent.into(),
            timeout,
        }
    }

    /// Build a `reqwest` client carrying the identifying agent and timeout.
    pub fn http_client(&self) -> coachbot_core::AppResult<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(self.user_agent.clone())
            .timeout(self.timeout)
            .connect_timeout(self.timeout)
            .build()
            .map_err(|e| {
                coachbot_core::AppError::Config(format!("Failed to create HTTP client: {}", e))
            })
    }
}

impl From<&AppConfig> for SourceSettings {
    fn from(config: &AppConfig) -> Self {
        Self::new(
            config.user_agent.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_club_record_builder() {
        let club = ClubRecord::new("Q157", "1. FC Union Berlin")
            .with_city("Berlin")
            .with_city("Köpenick")
            .with_coach("Steffen Baumgart");

        assert_eq!(club.id, "Q157");
        assert_eq!(club.cities, vec!["Berlin".to_string(), "Köpenick".to_string()]);
        assert_eq!(club.coach.as_deref(), Some("Steffen Baumgart"));
    }

    #[test]
    fn test_coach_fact_serialization() {
        let fact = CoachFact::new("Steffen Baumgart", "Q157").with_coach_id("Q72195");
        let json = serde_json::to_value(&fact).unwrap();

        assert_eq!(json["name"], "Steffen Baumgart");
        assert_eq!(json["clubId"], "Q157");
        assert_eq!(json["coachId"], "Q72195");
        assert!(json["retrievedAt"].is_string());
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = AppConfig::default();
        config.timeout_secs = 3;
        let settings = SourceSettings::from(&config);

        assert_eq!(settings.timeout, Duration::from_secs(3));
        assert_eq!(settings.user_agent, config.user_agent);
        assert!(settings.http_client().is_ok());
    }
}
