//! Club resolution: map an extracted token to exactly one roster club.

use crate::extractor::words;
use crate::roster::{Club, ClubRoster};
use coachbot_core::{AppError, AppResult};
use std::collections::BTreeMap;

/// Resolves tokens against a roster.
///
/// Pinned aliases (from configuration) are consulted before the roster's
/// derived aliases, so a city shared by two clubs can still point at one.
/// Matching is exact on accent-folded words; there is no fuzzy matching.
#[derive(Debug, Clone, Default)]
pub struct ClubResolver {
    /// Normalized alias -> club id
    pinned: BTreeMap<String, String>,
}

impl ClubResolver {
    /// Build a resolver from `alias -> canonical club name` pairs.
    ///
    /// Pairs naming a club the roster does not contain are skipped.
    pub fn new(roster: &ClubRoster, aliases: &BTreeMap<String, String>) -> Self {
        let mut pinned = BTreeMap::new();

        for (alias, target) in aliases {
            let key = words(alias).join(" ");
            if key.is_empty() {
                continue;
            }

            let club = roster
                .club_by_name(target)
                .or_else(|| roster.club_by_id(target));

            match club {
                Some(club) => {
                    tracing::debug!("Pinned alias '{}' -> {} ({})", key, club.name, club.id);
                    pinned.insert(key, club.id.clone());
                }
                None => {
                    tracing::warn!(
                        "Ignoring pinned alias '{}': club '{}' is not in the roster",
                        alias,
                        target
                    );
                }
            }
        }

        Self { pinned }
    }

    /// Number of pinned aliases in effect.
    pub fn pinned_len(&self) -> usize {
        self.pinned.len()
    }

    /// Pinned aliases pointing at `club_id`.
    pub fn pinned_for<'a>(&'a self, club_id: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pinned
            .iter()
            .filter(move |(_, id)| id.as_str() == club_id)
            .map(|(alias, _)| alias.as_str())
    }

    /// Resolve a token to a club.
    ///
    /// # Errors
    /// - `AppError::ClubNotFound` when nothing matches
    /// - `AppError::AmbiguousEntity` when several clubs share the alias
    pub fn resolve<'r>(&self, roster: &'r ClubRoster, token: &str) -> AppResult<&'r Club> {
        let key = words(token).join(" ");

        if let Some(club) = self.pinned.get(&key).and_then(|id| roster.club_by_id(id)) {
            tracing::debug!("Resolved '{}' to {} via pinned alias", key, club.name);
            return Ok(club);
        }

        let mut candidates = roster.lookup(&key);
        match candidates.len() {
            0 => Err(AppError::ClubNotFound(token.to_string())),
            1 => {
                let club = candidates.remove(0);
                tracing::debug!("Resolved '{}' to {}", key, club.name);
                Ok(club)
            }
            _ => Err(AppError::AmbiguousEntity {
                token: token.to_string(),
                candidates: candidates.iter().map(|c| c.name.clone()).collect(),
            }),
        }
    }
}
