//! Wikidata knowledge-graph client.
//!
//! Queries the public SPARQL endpoint for the league roster and for a club's
//! current head coach.
//! SPARQL results format: https://www.w3.org/TR/sparql11-results-json/

use crate::client::GraphClient;
use crate::types::{ClubRecord, CoachFact, SourceSettings};
use coachbot_core::config::{is_item_id, GraphSettings};
use coachbot_core::{AppError, AppResult};
use reqwest::header::ACCEPT;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Association football club (Q476028); roster rows must be an instance of it.
const FOOTBALL_CLUB_CLASS: &str = "Q476028";

const SPARQL_JSON: &str = "application/sparql-results+json";

/// Longest slice of a raw error body kept in an error message.
const MAX_ERROR_BODY: usize = 500;

/// SPARQL JSON results document.
#[derive(Debug, Deserialize)]
struct SparqlResponse {
    results: SparqlResults,
}

#[derive(Debug, Deserialize)]
struct SparqlResults {
    bindings: Vec<HashMap<String, SparqlTerm>>,
}

#[derive(Debug, Deserialize)]
struct SparqlTerm {
    value: String,
}

/// Wikidata SPARQL client.
pub struct WikidataClient {
    /// SPARQL endpoint URL
    endpoint: String,

    /// League item id, e.g. "Q82595"
    league_id: String,

    /// Label language preference
    languages: String,

    timeout: Duration,

    /// HTTP client
    client: reqwest::Client,
}

impl WikidataClient {
    /// Create a client for the given endpoint and transport settings.
    pub fn new(graph: &GraphSettings, settings: &SourceSettings) -> AppResult<Self> {
        if !is_item_id(&graph.league_id) {
            return Err(AppError::Config(format!(
                "Invalid league id: {}",
                graph.league_id
            )));
        }

        Ok(Self {
            endpoint: graph.endpoint.clone(),
            league_id: graph.league_id.clone(),
            languages: graph.languages.clone(),
            timeout: settings.timeout,
            client: settings.http_client()?,
        })
    }

    /// SPARQL for every football club whose league is `league_id`.
    fn clubs_query(&self) -> String {
        format!(
            r#"SELECT DISTINCT ?club ?clubLabel ?cityLabel ?coachLabel WHERE {{
  ?club wdt:P118 wd:{league} .
  ?club wdt:P31/wdt:P279* wd:{class} .
  OPTIONAL {{ ?club wdt:P159 ?city . }}
  OPTIONAL {{
    ?club p:P286 ?coachStatement .
    ?coachStatement ps:P286 ?coach .
    FILTER NOT EXISTS {{ ?coachStatement pq:P582 ?coachEnd . }}
  }}
  SERVICE wikibase:label {{ bd:serviceParam wikibase:language "{languages}". }}
}}
ORDER BY ?clubLabel"#,
            league = self.league_id,
            class = FOOTBALL_CLUB_CLASS,
            languages = self.languages,
        )
    }

    /// SPARQL for the club's head-coach statement that has no end time,
    /// newest start time first.
    fn coach_query(&self, club_id: &str) -> String {
        format!(
            r#"SELECT ?coach ?coachLabel ?start WHERE {{
  wd:{club} p:P286 ?statement .
  ?statement ps:P286 ?coach .
  FILTER NOT EXISTS {{ ?statement pq:P582 ?end . }}
  FILTER NOT EXISTS {{ ?statement wikibase:rank wikibase:DeprecatedRank . }}
  OPTIONAL {{ ?statement pq:P580 ?start . }}
  SERVICE wikibase:label {{ bd:serviceParam wikibase:language "{languages}". }}
}}
ORDER BY DESC(?start)
LIMIT 1"#,
            club = club_id,
            languages = self.languages,
        )
    }

    /// Run a SELECT query and return its bindings.
    #[instrument(skip(self, query), fields(endpoint = %self.endpoint))]
    async fn select(&self, query: &str) -> AppResult<Vec<HashMap<String, SparqlTerm>>> {
        debug!("SPARQL query:\n{}", query);

        let response = self
            .client
            .get(&self.endpoint)
            .header(ACCEPT, SPARQL_JSON)
            .query(&[("query", query), ("format", "json")])
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        debug!("Raw SPARQL response ({}): {}", status, body);

        if !status.is_success() {
            return Err(AppError::GraphQuery(format!(
                "Wikidata returned {}: {}",
                status,
                truncate(&body, MAX_ERROR_BODY)
            )));
        }

        let parsed: SparqlResponse = serde_json::from_str(&body).map_err(|e| {
            AppError::GraphQuery(format!("Malformed SPARQL response: {}", e))
        })?;

        Ok(parsed.results.bindings)
    }

    fn transport_error(&self, err: reqwest::Error) -> AppError {
        if err.is_timeout() {
            AppError::GraphQuery(format!(
                "Wikidata request timed out after {}s",
                self.timeout.as_secs()
            ))
        } else {
            AppError::GraphQuery(format!("Failed to reach Wikidata: {}", err))
        }
    }
}

#[async_trait::async_trait]
impl GraphClient for WikidataClient {
    fn source_name(&self) -> &str {
        "wikidata"
    }

    #[instrument(skip(self), fields(league = %self.league_id))]
    async fn fetch_all_clubs(&self) -> AppResult<Vec<ClubRecord>> {
        info!("Querying Wikidata for league clubs");

        let bindings = self.select(&self.clubs_query()).await?;
        let clubs = clubs_from_bindings(&bindings);

        info!("Retrieved {} clubs from Wikidata", clubs.len());
        Ok(clubs)
    }

    #[instrument(skip(self))]
    async fn fetch_current_coach(&self, club_id: &str) -> AppResult<CoachFact> {
        if !is_item_id(club_id) {
            return Err(AppError::GraphQuery(format!(
                "Refusing to query with invalid club id '{}'",
                club_id
            )));
        }

        info!("Querying Wikidata for current coach of {}", club_id);

        let bindings = self.select(&self.coach_query(club_id)).await?;

        let fact = bindings.first().and_then(|row| {
            let name = label(row, "coachLabel")?;
            let mut fact = CoachFact::new(name, club_id);
            if let Some(coach_id) = row.get("coach").map(|t| entity_id(&t.value)) {
                fact = fact.with_coach_id(coach_id);
            }
            Some(fact)
        });

        match fact {
            Some(fact) => {
                info!("Current coach of {}: {}", club_id, fact.name);
                Ok(fact)
            }
            None => {
                warn!("No current coach recorded for {}", club_id);
                Err(AppError::CoachNotFound(club_id.to_string()))
            }
        }
    }
}

/// Fold roster rows into one record per club id, preserving first-seen order.
///
/// A club with several headquarters or coaches appears in several rows.
fn clubs_from_bindings(bindings: &[HashMap<String, SparqlTerm>]) -> Vec<ClubRecord> {
    let mut clubs: Vec<ClubRecord> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in bindings {
        let Some(id) = row.get("club").map(|t| entity_id(&t.value)) else {
            warn!("Skipping roster row without club: {:?}", row.keys());
            continue;
        };

        let Some(name) = label(row, "clubLabel") else {
            warn!("Skipping club {} without a label", id);
            continue;
        };

        let slot = *index.entry(id.clone()).or_insert_with(|| {
            clubs.push(ClubRecord::new(id.clone(), name));
            clubs.len() - 1
        });
        let club = &mut clubs[slot];

        if let Some(city) = label(row, "cityLabel") {
            if !club.cities.contains(&city) {
                club.cities.push(city);
            }
        }

        if club.coach.is_none() {
            club.coach = label(row, "coachLabel");
        }

        debug!("Processed club row: {:?}", club);
    }

    clubs
}

/// Label value of `key`, skipping blanks and bare item ids (the label
/// service falls back to the id when no label exists in any language).
fn label(row: &HashMap<String, SparqlTerm>, key: &str) -> Option<String> {
    let value = row.get(key)?.value.trim();
    if value.is_empty() || is_item_id(value) {
        None
    } else {
        Some(value.to_string())
    }
}

/// "http://www.wikidata.org/entity/Q157" -> "Q157"
fn entity_id(uri: &str) -> String {
    uri.rsplit('/').next().unwrap_or(uri).to_string()
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const AGENT: &str = "coachbot-test/1.0 (tests@example.org)";

    fn client_for(server: &MockServer, timeout: Duration) -> WikidataClient {
        let graph = GraphSettings {
            endpoint: format!("{}/sparql", server.uri()),
            ..GraphSettings::default()
        };
        WikidataClient::new(&graph, &SourceSettings::new(AGENT, timeout)).unwrap()
    }

    fn uri(id: &str) -> serde_json::Value {
        json!({ "type": "uri", "value": format!("http://www.wikidata.org/entity/{}", id) })
    }

    fn literal(text: &str) -> serde_json::Value {
        json!({ "type": "literal", "value": text, "xml:lang": "en" })
    }

    fn sparql_body(bindings: Vec<serde_json::Value>) -> serde_json::Value {
        json!({ "head": { "vars": [] }, "results": { "bindings": bindings } })
    }

    #[test]
    fn test_entity_id() {
        assert_eq!(entity_id("http://www.wikidata.org/entity/Q157"), "Q157");
        assert_eq!(entity_id("Q157"), "Q157");
    }

    #[test]
    fn test_coach_query_mentions_club_and_head_coach() {
        let client = WikidataClient::new(
            &GraphSettings::default(),
            &SourceSettings::new(AGENT, Duration::from_secs(1)),
        )
        .unwrap();

        let query = client.coach_query("Q157");
        assert!(query.contains("wd:Q157 p:P286 ?statement"));
        assert!(query.contains("pq:P582"));
        assert!(query.contains("LIMIT 1"));

        let roster = client.clubs_query();
        assert!(roster.contains("wd:Q82595"));
        assert!(roster.contains("wd:Q476028"));
        assert!(!roster.contains("wdt:P286"));
        assert!(roster.contains("?coachStatement pq:P582"));
    }

    #[test]
    fn test_clubs_from_bindings_merges_rows() {
        let body = sparql_body(vec![
            json!({ "club": uri("Q157"), "clubLabel": literal("1. FC Union Berlin"), "cityLabel": literal("Berlin") }),
            json!({ "club": uri("Q15789"), "clubLabel": literal("FC Bayern Munich"), "cityLabel": literal("Munich") }),
            json!({ "club": uri("Q157"), "clubLabel": literal("1. FC Union Berlin"), "cityLabel": literal("Köpenick"), "coachLabel": literal("Steffen Baumgart") }),
            json!({ "club": uri("Q999"), "clubLabel": literal("Q999") }),
        ]);
        let parsed: SparqlResponse = serde_json::from_value(body).unwrap();

        let clubs = clubs_from_bindings(&parsed.results.bindings);
        assert_eq!(clubs.len(), 2);
        assert_eq!(clubs[0].name, "1. FC Union Berlin");
        assert_eq!(clubs[0].cities, vec!["Berlin".to_string(), "Köpenick".to_string()]);
        assert_eq!(clubs[0].coach.as_deref(), Some("Steffen Baumgart"));
        assert_eq!(clubs[1].id, "Q15789");
    }

    #[tokio::test]
    async fn test_fetch_all_clubs_sends_user_agent() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sparql"))
            .and(header("user-agent", AGENT))
            .and(query_param("format", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sparql_body(vec![
                json!({ "club": uri("Q157"), "clubLabel": literal("1. FC Union Berlin"), "cityLabel": literal("Berlin") }),
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let clubs = client.fetch_all_clubs().await.unwrap();

        assert_eq!(clubs, vec![ClubRecord::new("Q157", "1. FC Union Berlin").with_city("Berlin")]);
    }

    #[tokio::test]
    async fn test_fetch_current_coach() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sparql"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sparql_body(vec![
                json!({ "coach": uri("Q72195"), "coachLabel": literal("Steffen Baumgart") }),
            ])))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let first = client.fetch_current_coach("Q157").await.unwrap();
        let second = client.fetch_current_coach("Q157").await.unwrap();

        assert_eq!(first.name, "Steffen Baumgart");
        assert_eq!(first.coach_id.as_deref(), Some("Q72195"));
        assert_eq!(first.club_id, "Q157");
        assert_eq!(first.name, second.name);
    }

    #[tokio::test]
    async fn test_empty_result_is_coach_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sparql"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sparql_body(vec![])))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let result = client.fetch_current_coach("Q157").await;

        assert!(matches!(result, Err(AppError::CoachNotFound(ref id)) if id == "Q157"));
    }

    #[tokio::test]
    async fn test_server_error_is_graph_query_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sparql"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));

        let coach = client.fetch_current_coach("Q157").await;
        assert!(matches!(coach, Err(AppError::GraphQuery(ref msg)) if msg.contains("503")));

        let clubs = client.fetch_all_clubs().await;
        assert!(matches!(clubs, Err(AppError::GraphQuery(_))));
    }

    #[tokio::test]
    async fn test_malformed_body_is_graph_query_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sparql"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let result = client.fetch_all_clubs().await;

        assert!(matches!(result, Err(AppError::GraphQuery(ref msg)) if msg.contains("Malformed")));
    }

    #[tokio::test]
    async fn test_timeout_is_graph_query_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sparql"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(sparql_body(vec![]))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(1));
        let result = client.fetch_current_coach("Q157").await;

        match result {
            Err(err @ AppError::GraphQuery(_)) => {
                assert!(err.is_retryable());
                assert!(err.to_string().contains("timed out"));
            }
            other => panic!("Expected GraphQuery timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_club_id_is_rejected_without_request() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(1));
        let result = client.fetch_current_coach("Q1 } ?x ?y").await;

        assert!(matches!(result, Err(AppError::GraphQuery(_))));
    }
}
