//! Entity extraction: find the city or club a question is about.
//!
//! Phrasings are matched by an ordered list of strategies; the first one
//! that yields a non-empty token wins. When none match, a word-level
//! fallback looks for a capitalized word or a known alias.

use coachbot_core::{AppError, AppResult};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::LazyLock;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// The captured phrase runs until sentence punctuation or end of text.
/// Dots are allowed inside it so "St. Pauli" survives.
static COACHING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bcoach(?:ing|es)?\s+(?:(?:of|for|at|in)\s+)?([^?!,;\n]+)").unwrap()
});

static ABOUT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\babout\s+([^?!,;\n]+)").unwrap());

/// "heidenheims manager", "Bayern's coach", "Bremen trainer".
static POSSESSIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\p{L}[\p{L}\-]*?)(?:['’]s|s)?\s+(?:manager|coach|trainer)\b").unwrap()
});

static FOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bfor\s+([^?!,;\n]+)").unwrap());

static IN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bin\s+([^?!,;\n]+)").unwrap());

static AT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bat\s+([^?!,;\n]+)").unwrap());

/// Words dropped from a captured phrase: articles, role nouns, time words.
const FILLER_WORDS: &[&str] = &[
    "the", "a", "an", "of", "club", "team", "side", "at", "right", "now", "currently", "today",
    "moment", "these", "days", "this", "season", "year", "please", "pls", "actually", "then",
    "coach", "coaches", "manager", "trainer", "head", "boss", "charge",
];

/// Words never taken as an entity by the fallback heuristic.
const QUESTION_WORDS: &[&str] = &[
    "who", "whom", "whose", "what", "which", "where", "when", "why", "how", "is", "are", "it",
    "i", "tell", "me", "coach", "coaching", "manager", "trainer", "bundesliga",
];

/// How the token was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Strategy {
    /// "Who is coaching X?"
    Coaching,
    /// "What about X?"
    About,
    /// "Who is X's manager?"
    Possessive,
    /// "Who is it for X?"
    For,
    /// "Who coaches in X?"
    In,
    /// "Who is the coach at X?"
    At,
    /// Last capitalized word, or last known alias
    Fallback,
}

impl Strategy {
    /// Pattern strategies in priority order.
    pub const PATTERNS: [Strategy; 6] = [
        Strategy::Coaching,
        Strategy::About,
        Strategy::Possessive,
        Strategy::For,
        Strategy::In,
        Strategy::At,
    ];

    fn pattern(self) -> Option<&'static Regex> {
        match self {
            Strategy::Coaching => Some(&*COACHING_RE),
            Strategy::About => Some(&*ABOUT_RE),
            Strategy::Possessive => Some(&*POSSESSIVE_RE),
            Strategy::For => Some(&*FOR_RE),
            Strategy::In => Some(&*IN_RE),
            Strategy::At => Some(&*AT_RE),
            Strategy::Fallback => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Strategy::Coaching => "coaching",
            Strategy::About => "about",
            Strategy::Possessive => "possessive",
            Strategy::For => "for",
            Strategy::In => "in",
            Strategy::At => "at",
            Strategy::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of a successful extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Extraction {
    /// Normalized candidate city or club name
    pub token: String,
    pub strategy: Strategy,
}

/// Extract the candidate city or club from a question.
///
/// `vocabulary` holds single-word aliases known to the roster; it is only
/// consulted by the fallback when the question has no capitalized word.
///
/// # Errors
/// `AppError::NoEntityFound` when no strategy yields a token.
pub fn extract(question: &str, vocabulary: &BTreeSet<String>) -> AppResult<Extraction> {
    for strategy in Strategy::PATTERNS {
        let Some(pattern) = strategy.pattern() else {
            continue;
        };

        let Some(captured) = pattern.captures(question).and_then(|c| c.get(1)) else {
            continue;
        };

        let token = normalize_phrase(captured.as_str());
        if token.is_empty() {
            tracing::trace!("Strategy {} matched only filler words", strategy);
            continue;
        }

        tracing::debug!("Extracted '{}' using strategy {}", token, strategy);
        return Ok(Extraction { token, strategy });
    }

    if let Some(token) = fallback(question, vocabulary) {
        tracing::debug!("Extracted '{}' using fallback heuristic", token);
        return Ok(Extraction {
            token,
            strategy: Strategy::Fallback,
        });
    }

    Err(AppError::NoEntityFound(question.trim().to_string()))
}

/// Normalize a captured phrase into a lookup token.
pub fn normalize_phrase(phrase: &str) -> String {
    words(phrase)
        .into_iter()
        .filter(|w| !FILLER_WORDS.contains(&w.as_str()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split text into lower-cased, accent-folded words.
///
/// Diacritics are removed after canonical decomposition, and the few Latin
/// letters without a decomposition (`ß`, `ø`, `ł`, ...) are mapped by hand.
/// Possessive `'s` is stripped and punctuation other than hyphens separates
/// words. Shared with the roster so aliases and tokens compare equal.
pub fn words(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase().replace('’', "'");

    let mut cleaned = String::with_capacity(lowered.len());
    for ch in lowered.nfd().filter(|c| !is_combining_mark(*c)) {
        match ch {
            'ß' => cleaned.push_str("ss"),
            'æ' => cleaned.push_str("ae"),
            'œ' => cleaned.push_str("oe"),
            'ø' => cleaned.push('o'),
            'ł' => cleaned.push('l'),
            'đ' => cleaned.push('d'),
            'ı' => cleaned.push('i'),
            c if c.is_alphanumeric() || c == '-' || c == '\'' => cleaned.push(c),
            _ => cleaned.push(' '),
        }
    }

    cleaned
        .split_whitespace()
        .map(|w| {
            let w = w.strip_suffix("'s").unwrap_or(w);
            w.trim_matches(|c| c == '\'' || c == '-').replace('\'', "")
        })
        .filter(|w| !w.is_empty())
        .collect()
}

fn fallback(question: &str, vocabulary: &BTreeSet<String>) -> Option<String> {
    let raw: Vec<&str> = question
        .split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '’' || c == '-'))
        .filter(|w| !w.is_empty())
        .collect();

    let capitalized = raw.iter().skip(1).rev().find_map(|w| {
        if !w.chars().next().is_some_and(char::is_uppercase) {
            return None;
        }
        let token = normalize_phrase(w);
        let skip = token.is_empty() || QUESTION_WORDS.contains(&token.as_str());
        (!skip).then_some(token)
    });

    capitalized.or_else(|| {
        words(question)
            .into_iter()
            .rev()
            .find(|w| vocabulary.contains(w) && !QUESTION_WORDS.contains(&w.as_str()))
    })
}
