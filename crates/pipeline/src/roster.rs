//! Club roster: the league's clubs and their lookup aliases.
//!
//! Built once at startup from the graph and never mutated afterwards.

use crate::extractor::words;
use coachbot_core::{AppError, AppResult};
use coachbot_sources::{ClubRecord, GraphClient};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Initial backoff between population attempts (milliseconds)
const INITIAL_BACKOFF_MS: u64 = 500;

/// Longest single wait between population attempts
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Affixes that say nothing about which club is meant.
const GENERIC_WORDS: &[&str] = &[
    "fc", "sv", "vfl", "vfb", "tsg", "sc", "sg", "bv", "ssv", "tsv", "fsv", "bsc", "ev", "e",
    "v", "club", "football", "fussball", "de", "der", "und", "von",
];

/// Distinctive words shorter than this are not aliases on their own.
const MIN_WORD_ALIAS_LEN: usize = 3;

/// One league club.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Club {
    /// Stable graph identifier
    pub id: String,

    /// Canonical name
    pub name: String,

    /// City labels reported by the graph
    pub cities: Vec<String>,

    /// Coach reported at population time. Answers use the coach fetched
    /// for the question, so this is never serialized with a delivery.
    #[serde(skip)]
    pub coach: Option<String>,

    /// Normalized lookup tokens derived from the name and cities
    pub aliases: BTreeSet<String>,
}

impl Club {
    fn from_record(record: ClubRecord) -> Self {
        let aliases = derive_aliases(&record.name, &record.cities);
        Self {
            id: record.id,
            name: record.name,
            cities: record.cities,
            coach: record.coach,
            aliases,
        }
    }
}

/// The immutable set of league clubs.
#[derive(Debug, Clone, Default)]
pub struct ClubRoster {
    clubs: Vec<Club>,
    alias_index: BTreeMap<String, Vec<usize>>,
}

impl ClubRoster {
    /// Build a roster from graph records.
    ///
    /// Records sharing an id are merged; a record reusing another club's
    /// name under a different id is dropped. Clubs are sorted by name.
    ///
    /// # Errors
    /// `AppError::RosterUnavailable` if no club remains.
    pub fn from_records(records: Vec<ClubRecord>) -> AppResult<Self> {
        let mut merged: BTreeMap<String, ClubRecord> = BTreeMap::new();

        for record in records {
            if record.name.trim().is_empty() {
                warn!("Skipping club {} without a name", record.id);
                continue;
            }

            match merged.get_mut(&record.id) {
                Some(existing) => {
                    for city in record.cities {
                        if !existing.cities.contains(&city) {
                            existing.cities.push(city);
                        }
                    }
                    if existing.coach.is_none() {
                        existing.coach = record.coach;
                    }
                }
                None => {
                    merged.insert(record.id.clone(), record);
                }
            }
        }

        let mut clubs: Vec<Club> = Vec::with_capacity(merged.len());
        let mut names: BTreeSet<String> = BTreeSet::new();

        for record in merged.into_values() {
            if !names.insert(record.name.to_lowercase()) {
                warn!(
                    "Dropping club {} ({}): name already used by another club",
                    record.id, record.name
                );
                continue;
            }
            clubs.push(Club::from_record(record));
        }

        if clubs.is_empty() {
            return Err(AppError::RosterUnavailable(
                "the knowledge graph returned no clubs".to_string(),
            ));
        }

        clubs.sort_by(|a, b| a.name.cmp(&b.name));

        let mut alias_index: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (idx, club) in clubs.iter().enumerate() {
            for alias in &club.aliases {
                alias_index.entry(alias.clone()).or_default().push(idx);
            }
        }

        Ok(Self {
            clubs,
            alias_index,
        })
    }

    /// Populate the roster from the graph, retrying transient failures.
    ///
    /// # Errors
    /// `AppError::RosterUnavailable` once every attempt has failed.
    pub async fn populate(graph: &dyn GraphClient, retries: u32) -> AppResult<Self> {
        Self::populate_with_backoff(graph, retries, Duration::from_millis(INITIAL_BACKOFF_MS))
            .await
    }

    #[instrument(skip(graph), fields(source = graph.source_name()))]
    pub(crate) async fn populate_with_backoff(
        graph: &dyn GraphClient,
        retries: u32,
        initial_backoff: Duration,
    ) -> AppResult<Self> {
        let retries = retries.max(1);
        let mut attempt = 0;
        let mut last_error = None;

        while attempt < retries {
            let result = graph
                .fetch_all_clubs()
                .await
                .and_then(Self::from_records);

            match result {
                Ok(roster) => {
                    info!("Club roster populated with {} clubs", roster.len());
                    return Ok(roster);
                }
                Err(e) => {
                    attempt += 1;

                    if !e.is_retryable() {
                        last_error = Some(e);
                        break;
                    }

                    if attempt < retries {
                        let backoff = backoff_delay(initial_backoff, attempt);
                        warn!(
                            "Roster population failed (attempt {}/{}): {}; retrying in {}ms",
                            attempt,
                            retries,
                            e,
                            backoff.as_millis()
                        );
                        tokio::time::sleep(backoff).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(match last_error {
            Some(AppError::RosterUnavailable(msg)) => AppError::RosterUnavailable(msg),
            Some(e) => AppError::RosterUnavailable(e.to_string()),
            None => AppError::RosterUnavailable("no attempt was made".to_string()),
        })
    }

    pub fn clubs(&self) -> &[Club] {
        &self.clubs
    }

    pub fn len(&self) -> usize {
        self.clubs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clubs.is_empty()
    }

    pub fn club_by_id(&self, id: &str) -> Option<&Club> {
        self.clubs.iter().find(|c| c.id == id)
    }

    /// Find a club by canonical name, ignoring case and punctuation.
    pub fn club_by_name(&self, name: &str) -> Option<&Club> {
        let wanted = words(name);
        self.clubs.iter().find(|c| words(&c.name) == wanted)
    }

    /// All clubs carrying `alias`.
    pub fn lookup(&self, alias: &str) -> Vec<&Club> {
        self.alias_index
            .get(alias)
            .map(|ids| ids.iter().map(|&idx| &self.clubs[idx]).collect())
            .unwrap_or_default()
    }

    /// Single-word aliases, used by the extractor's fallback heuristic.
    pub fn vocabulary(&self) -> BTreeSet<String> {
        self.alias_index
            .keys()
            .filter(|alias| !alias.contains(' '))
            .cloned()
            .collect()
    }
}

/// Exponential delay before retry `attempt`, clamped to `MAX_BACKOFF`.
fn backoff_delay(initial: Duration, attempt: u32) -> Duration {
    initial
        .saturating_mul(2_u32.saturating_pow(attempt))
        .min(MAX_BACKOFF)
}

/// Aliases for one club: its cities, its full name, its core name without
/// generic affixes, and each distinctive word of the core name.
fn derive_aliases(name: &str, cities: &[String]) -> BTreeSet<String> {
    let mut aliases = BTreeSet::new();

    for city in cities {
        let city = words(city).join(" ");
        if !city.is_empty() {
            aliases.insert(city);
        }
    }

    let name_words = words(name);
    if !name_words.is_empty() {
        aliases.insert(name_words.join(" "));
    }

    let core: Vec<&String> = name_words
        .iter()
        .filter(|w| !GENERIC_WORDS.contains(&w.as_str()))
        .filter(|w| !w.chars().all(|c| c.is_ascii_digit()))
        .collect();

    if !core.is_empty() {
        aliases.insert(core.iter().map(|w| w.as_str()).collect::<Vec<_>>().join(" "));
    }

    for word in core {
        if word.chars().count() >= MIN_WORD_ALIAS_LEN {
            aliases.insert(word.clone());
        }
    }

    aliases
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, name: &str, city: &str) -> ClubRecord {
        ClubRecord::new(id, name).with_city(city)
    }

    #[test]
    fn test_derived_aliases() {
        let aliases = derive_aliases("1. FC Union Berlin", &["Berlin".to_string()]);
        assert!(aliases.contains("berlin"));
        assert!(aliases.contains("1 fc union berlin"));
        assert!(aliases.contains("union berlin"));
        assert!(aliases.contains("union"));
        assert!(!aliases.contains("fc"));
        assert!(!aliases.contains("1"));

        let aliases = derive_aliases("1. FC Heidenheim 1846", &["Heidenheim an der Brenz".to_string()]);
        assert!(aliases.contains("heidenheim"));
        assert!(aliases.contains("heidenheim an der brenz"));
        assert!(!aliases.contains("1846"));

        let aliases = derive_aliases("FC St. Pauli", &["Hamburg".to_string()]);
        assert!(aliases.contains("st pauli"));
        assert!(aliases.contains("pauli"));
        assert!(aliases.contains("hamburg"));
        assert!(!aliases.contains("st"));
    }

    #[test]
    fn test_umlauts_are_folded() {
        let aliases = derive_aliases("1. FC Köln", &["Cologne".to_string()]);
        assert!(aliases.contains("koln"));
        assert!(aliases.contains("cologne"));
    }

    #[test]
    fn test_from_records_sorts_and_indexes() {
        let roster = ClubRoster::from_records(vec![
            record("Q2", "Werder Bremen", "Bremen"),
            record("Q1", "FC Augsburg", "Augsburg"),
        ])
        .unwrap();

        assert_eq!(roster.len(), 2);
        assert_eq!(roster.clubs()[0].name, "FC Augsburg");
        assert_eq!(roster.lookup("bremen")[0].id, "Q2");
        assert!(roster.lookup("nowhereville").is_empty());
        assert!(roster.vocabulary().contains("augsburg"));
        assert!(!roster.vocabulary().contains("werder bremen"));
    }

    #[test]
    fn test_from_records_merges_by_id() {
        let roster = ClubRoster::from_records(vec![
            record("Q1", "FC Bayern Munich", "Munich"),
            record("Q1", "FC Bayern Munich", "München").with_coach("Vincent Kompany"),
        ])
        .unwrap();

        assert_eq!(roster.len(), 1);
        assert_eq!(roster.clubs()[0].cities, vec!["Munich", "München"]);
        assert_eq!(roster.clubs()[0].coach.as_deref(), Some("Vincent Kompany"));
        assert_eq!(roster.lookup("munchen").len(), 1);
    }

    #[test]
    fn test_duplicate_name_is_dropped() {
        let roster = ClubRoster::from_records(vec![
            record("Q1", "SC Freiburg", "Freiburg"),
            record("Q9", "SC Freiburg", "Freiburg im Breisgau"),
        ])
        .unwrap();

        assert_eq!(roster.len(), 1);
        assert_eq!(roster.clubs()[0].id, "Q1");
    }

    #[test]
    fn test_shared_city_maps_to_both_clubs() {
        let roster = ClubRoster::from_records(vec![
            record("Q1", "Hamburger SV", "Hamburg"),
            record("Q2", "FC St. Pauli", "Hamburg"),
        ])
        .unwrap();

        assert_eq!(roster.lookup("hamburg").len(), 2);
        assert_eq!(roster.lookup("pauli").len(), 1);
        assert_eq!(roster.lookup("hamburger").len(), 1);
    }

    #[test]
    fn test_empty_roster_is_unavailable() {
        let result = ClubRoster::from_records(Vec::new());
        assert!(matches!(result, Err(AppError::RosterUnavailable(_))));

        let result = ClubRoster::from_records(vec![ClubRecord::new("Q1", "  ")]);
        assert!(matches!(result, Err(AppError::RosterUnavailable(_))));
    }

    #[test]
    fn test_backoff_delay_is_clamped() {
        let initial = Duration::from_millis(INITIAL_BACKOFF_MS);
        assert_eq!(backoff_delay(initial, 1), Duration::from_millis(1000));
        assert_eq!(backoff_delay(initial, 3), Duration::from_millis(4000));
        assert_eq!(backoff_delay(initial, 10), MAX_BACKOFF);
        assert_eq!(backoff_delay(initial, 32), MAX_BACKOFF);
        assert_eq!(backoff_delay(initial, u32::MAX), MAX_BACKOFF);
        assert!(backoff_delay(Duration::from_nanos(1), 40) <= MAX_BACKOFF);
        assert_eq!(backoff_delay(Duration::ZERO, 40), Duration::ZERO);
    }

    #[test]
    fn test_club_by_name() {
        let roster = ClubRoster::from_records(vec![record("Q1", "FC St. Pauli", "Hamburg")]).unwrap();
        assert!(roster.club_by_name("fc st pauli").is_some());
        assert!(roster.club_by_name("FC St. Pauli").is_some());
        assert!(roster.club_by_name("St. Pauli").is_none());
    }
}
