//! Wikipedia biography client.
//!
//! Uses the MediaWiki action API (`prop=extracts`) to fetch the plain-text
//! introduction of an article. Wikimedia rejects requests that do not carry
//! an identifying `User-Agent`; the underlying HTTP client always sends one.
//! API: https://www.mediawiki.org/wiki/Extension:TextExtracts

use crate::client::DocumentClient;
use crate::types::{BiographyExcerpt, SourceSettings};
use coachbot_core::config::DocumentSettings;
use coachbot_core::{AppError, AppResult};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Length of the excerpt preview written to debug logs.
const PREVIEW_CHARS: usize = 200;

/// MediaWiki query response (`formatversion=2`).
#[derive(Debug, Deserialize)]
struct QueryResponse {
    query: Option<QueryBody>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct QueryBody {
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    title: String,
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    invalid: bool,
    extract: Option<String>,
    #[serde(default)]
    pageprops: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    info: String,
}

/// Wikipedia client.
pub struct WikipediaClient {
    /// Action API endpoint, e.g. https://en.wikipedia.org/w/api.php
    endpoint: String,

    /// Excerpts are cut to this many characters
    max_excerpt_chars: usize,

    timeout: Duration,

    /// HTTP client
    client: reqwest::Client,
}

impl WikipediaClient {
    /// Create a client for the given endpoint and transport settings.
    pub fn new(document: &DocumentSettings, settings: &SourceSettings) -> AppResult<Self> {
        Ok(Self {
            endpoint: document.endpoint.clone(),
            max_excerpt_chars: document.max_excerpt_chars,
            timeout: settings.timeout,
            client: settings.http_client()?,
        })
    }

    /// Public URL of an article on the same wiki as the API endpoint.
    fn article_url(&self, title: &str) -> String {
        let base = self
            .endpoint
            .strip_suffix("/w/api.php")
            .unwrap_or(&self.endpoint);
        format!("{}/wiki/{}", base, title.replace(' ', "_"))
    }

    fn unavailable(person: &str, reason: impl Into<String>) -> AppError {
        AppError::BiographyUnavailable {
            person: person.to_string(),
            reason: reason.into(),
        }
    }
}

#[async_trait::async_trait]
impl DocumentClient for WikipediaClient {
    fn source_name(&self) -> &str {
        "wikipedia"
    }

    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn fetch_biography(&self, person: &str) -> AppResult<BiographyExcerpt> {
        info!("Retrieving Wikipedia introduction for {}", person);

        let params = [
            ("action", "query"),
            ("format", "json"),
            ("formatversion", "2"),
            ("prop", "extracts|pageprops"),
            ("ppprop", "disambiguation"),
            ("exintro", "1"),
            ("explaintext", "1"),
            ("redirects", "1"),
            ("titles", person),
        ];
        debug!("Wikipedia request params: {:?}", params);

        let response = self
            .client
            .get(&self.endpoint)
            .query(&params)
            .send()
            .await
            .map_err(|e| {
                let reason = if e.is_timeout() {
                    format!("request timed out after {}s", self.timeout.as_secs())
                } else {
                    format!("request failed: {}", e)
                };
                warn!("Wikipedia {} for {}", reason, person);
                Self::unavailable(person, reason)
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Self::unavailable(person, format!("failed to read response: {}", e)))?;

        debug!("Raw Wikipedia response ({}): {}", status, body);

        if !status.is_success() {
            warn!("Wikipedia returned {} for {}", status, person);
            return Err(Self::unavailable(person, format!("Wikipedia returned {}", status)));
        }

        let parsed: QueryResponse = serde_json::from_str(&body)
            .map_err(|e| Self::unavailable(person, format!("malformed response: {}", e)))?;

        if let Some(err) = parsed.error {
            return Err(Self::unavailable(
                person,
                format!("API error {}: {}", err.code, err.info),
            ));
        }

        let page = parsed
            .query
            .and_then(|q| q.pages.into_iter().next())
            .ok_or_else(|| Self::unavailable(person, "no page in response"))?;

        if page.missing || page.invalid {
            info!("No Wikipedia article for {}", person);
            return Err(Self::unavailable(person, "no article found"));
        }

        if page.pageprops.contains_key("disambiguation") {
            info!("Wikipedia title '{}' is a disambiguation page", page.title);
            return Err(Self::unavailable(
                person,
                format!("'{}' is a disambiguation page", page.title),
            ));
        }

        let text = page
            .extract
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| truncate_excerpt(t, self.max_excerpt_chars))
            .ok_or_else(|| Self::unavailable(person, "article has no introduction"))?;

        info!("Retrieved introduction for {} ({} chars)", page.title, text.chars().count());
        debug!("Introduction preview: {}", truncate_excerpt(&text, PREVIEW_CHARS));

        Ok(BiographyExcerpt {
            person: person.to_string(),
            source: self.article_url(&page.title),
            title: page.title,
            text,
        })
    }
}

/// Cut `text` to at most `max_chars` characters, preferring a word boundary.
fn truncate_excerpt(text: &str, max_chars: usize) -> String {
    let Some((cut, _)) = text.char_indices().nth(max_chars) else {
        return text.to_string();
    };

    let truncated = &text[..cut];
    match truncated.rfind(char::is_whitespace) {
        Some(last_space) => format!("{}...", truncated[..last_space].trim_end()),
        None => format!("{}...", truncated),
    }
}
