//! Configuration management for coachbot.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Built-in defaults (public Wikidata and Wikipedia endpoints)
//! - Config files (.coachbot/config.yaml)
//! - Environment variables
//! - Command-line flags
//!
//! The configuration is workspace-centric: prompt definitions and the config
//! file live under `.coachbot/` in the workspace.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Public Wikidata SPARQL endpoint.
pub const DEFAULT_GRAPH_ENDPOINT: &str = "https://query.wikidata.org/sparql";

/// Public English Wikipedia action API.
pub const DEFAULT_DOCUMENT_ENDPOINT: &str = "https://en.wikipedia.org/w/api.php";

/// Wikidata item for the 1. Bundesliga.
pub const DEFAULT_LEAGUE_ID: &str = "Q82595";

/// Both Wikimedia services reject requests without an identifying agent.
pub const DEFAULT_USER_AGENT: &str =
    "coachbot/0.1 (Bundesliga coach retrieval; https://github.com/coachbot/coachbot)";

/// Prompt definition used when none is configured.
pub const DEFAULT_PROMPT_ID: &str = "coach.default";

/// Upper bound on roster population attempts.
pub const MAX_ROSTER_RETRIES: u32 = 10;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .coachbot/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Knowledge-graph settings
    pub graph: GraphSettings,

    /// Encyclopedia settings
    pub document: DocumentSettings,

    /// `User-Agent` sent on every outbound request
    pub user_agent: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Attempts made to populate the club roster before giving up
    pub roster_retries: u32,

    /// Pinned `alias -> canonical club name` entries, checked before derived aliases
    pub aliases: BTreeMap<String, String>,

    /// Prompt definition id
    pub prompt_id: String,

    /// Log level override
    pub log_level: Option<String>,

    /// Emit logs as JSON objects
    pub log_json: bool,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// Knowledge-graph (SPARQL) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSettings {
    pub endpoint: String,

    /// Wikidata item id of the league whose clubs make up the roster
    #[serde(rename = "leagueId")]
    pub league_id: String,

    /// Label language preference, e.g. "en,de"
    pub languages: String,
}

/// Encyclopedia (MediaWiki) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSettings {
    pub endpoint: String,

    /// Excerpts longer than this are cut at a word boundary
    #[serde(rename = "maxExcerptChars")]
    pub max_excerpt_chars: usize,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_GRAPH_ENDPOINT.to_string(),
            league_id: DEFAULT_LEAGUE_ID.to_string(),
            languages: "en,de".to_string(),
        }
    }
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_DOCUMENT_ENDPOINT.to_string(),
            max_excerpt_chars: 1500,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    workspace: Option<WorkspaceConfig>,
    sources: Option<SourcesConfig>,
    resolver: Option<ResolverConfig>,
    prompt: Option<PromptConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SourcesConfig {
    graph: Option<GraphFileConfig>,
    document: Option<DocumentFileConfig>,
    #[serde(rename = "userAgent")]
    user_agent: Option<String>,
    #[serde(rename = "timeoutSecs")]
    timeout_secs: Option<u64>,
    #[serde(rename = "rosterRetries")]
    roster_retries: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct GraphFileConfig {
    endpoint: Option<String>,
    #[serde(rename = "leagueId")]
    league_id: Option<String>,
    languages: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct DocumentFileConfig {
    endpoint: Option<String>,
    #[serde(rename = "maxExcerptChars")]
    max_excerpt_chars: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ResolverConfig {
    /// Replaces the built-in pinned aliases when present
    aliases: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PromptConfig {
    id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    json: Option<bool>,
}

/// Built-in pinned aliases.
///
/// Hamburg hosts two clubs; "hamburg" means Hamburger SV and "pauli" means
/// FC St. Pauli.
pub fn default_aliases() -> BTreeMap<String, String> {
    let mut aliases = BTreeMap::new();
    aliases.insert("pauli".to_string(), "FC St. Pauli".to_string());
    aliases.insert("st pauli".to_string(), "FC St. Pauli".to_string());
    aliases.insert("hamburg".to_string(), "Hamburger SV".to_string());
    aliases.insert("hsv".to_string(), "Hamburger SV".to_string());
    aliases
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            graph: GraphSettings::default(),
            document: DocumentSettings::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 10,
            roster_retries: 3,
            aliases: default_aliases(),
            prompt_id: DEFAULT_PROMPT_ID.to_string(),
            log_level: None,
            log_json: false,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML config file and environment variables.
    ///
    /// Environment variables:
    /// - `COACHBOT_WORKSPACE`: Override workspace path
    /// - `COACHBOT_CONFIG`: Path to config file
    /// - `COACHBOT_GRAPH_ENDPOINT`: SPARQL endpoint
    /// - `COACHBOT_DOCUMENT_ENDPOINT`: MediaWiki API endpoint
    /// - `COACHBOT_USER_AGENT`: Outbound `User-Agent`
    /// - `COACHBOT_TIMEOUT_SECS`: Per-request timeout
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use coachbot_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Graph endpoint: {}", config.graph.endpoint);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Like `load`, but with an explicit workspace and/or config file.
    ///
    /// Explicit paths win over `COACHBOT_WORKSPACE` and `COACHBOT_CONFIG`,
    /// and decide which YAML file is merged.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        match workspace {
            Some(workspace) => config.workspace = workspace,
            None => {
                if let Ok(workspace) = std::env::var("COACHBOT_WORKSPACE") {
                    config.workspace = PathBuf::from(workspace);
                }
            }
        }

        match config_file {
            Some(config_file) => config.config_file = Some(config_file),
            None => {
                if let Ok(config_file) = std::env::var("COACHBOT_CONFIG") {
                    config.config_file = Some(PathBuf::from(config_file));
                }
            }
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config.config_path();
        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        config.apply_env()?;

        Ok(config)
    }

    /// Path of the YAML config file, explicit or `<workspace>/.coachbot/config.yaml`.
    pub fn config_path(&self) -> PathBuf {
        match self.config_file {
            Some(ref cf) => cf.clone(),
            None => self.coachbot_dir().join("config.yaml"),
        }
    }

    fn apply_env(&mut self) -> AppResult<()> {
        if let Ok(endpoint) = std::env::var("COACHBOT_GRAPH_ENDPOINT") {
            self.graph.endpoint = endpoint;
        }

        if let Ok(endpoint) = std::env::var("COACHBOT_DOCUMENT_ENDPOINT") {
            self.document.endpoint = endpoint;
        }

        if let Ok(agent) = std::env::var("COACHBOT_USER_AGENT") {
            self.user_agent = agent;
        }

        if let Ok(timeout) = std::env::var("COACHBOT_TIMEOUT_SECS") {
            self.timeout_secs = timeout.parse().map_err(|e| {
                AppError::Config(format!("Invalid COACHBOT_TIMEOUT_SECS '{}': {}", timeout, e))
            })?;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            self.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            self.no_color = true;
        }

        Ok(())
    }

    /// Merge a YAML configuration file into this config.
    pub fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(ws) = config_file.workspace {
            if let Some(path) = ws.path {
                result.workspace = PathBuf::from(path);
            }
        }

        if let Some(sources) = config_file.sources {
            if let Some(graph) = sources.graph {
                if let Some(endpoint) = graph.endpoint {
                    result.graph.endpoint = endpoint;
                }
                if let Some(league_id) = graph.league_id {
                    result.graph.league_id = league_id;
                }
                if let Some(languages) = graph.languages {
                    result.graph.languages = languages;
                }
            }
            if let Some(document) = sources.document {
                if let Some(endpoint) = document.endpoint {
                    result.document.endpoint = endpoint;
                }
                if let Some(max) = document.max_excerpt_chars {
                    result.document.max_excerpt_chars = max;
                }
            }
            if let Some(agent) = sources.user_agent {
                result.user_agent = agent;
            }
            if let Some(timeout) = sources.timeout_secs {
                result.timeout_secs = timeout;
            }
            if let Some(retries) = sources.roster_retries {
                result.roster_retries = retries;
            }
        }

        if let Some(resolver) = config_file.resolver {
            if let Some(aliases) = resolver.aliases {
                result.aliases = aliases
                    .into_iter()
                    .map(|(alias, club)| (alias.trim().to_lowercase(), club))
                    .collect();
            }
        }

        if let Some(prompt) = config_file.prompt {
            if let Some(id) = prompt.id {
                result.prompt_id = id;
            }
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(json) = logging.json {
                result.log_json = json;
            }
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        timeout_secs: Option<u64>,
        log_level: Option<String>,
        log_json: bool,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(timeout_secs) = timeout_secs {
            self.timeout_secs = timeout_secs;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if log_json {
            self.log_json = true;
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .coachbot directory.
    pub fn coachbot_dir(&self) -> PathBuf {
        self.workspace.join(".coachbot")
    }

    /// Validate the merged configuration.
    pub fn validate(&self) -> AppResult<()> {
        if self.graph.endpoint.trim().is_empty() {
            return Err(AppError::Config("Graph endpoint cannot be empty".to_string()));
        }

        if self.document.endpoint.trim().is_empty() {
            return Err(AppError::Config(
                "Document endpoint cannot be empty".to_string(),
            ));
        }

        if self.user_agent.trim().is_empty() {
            return Err(AppError::Config(
                "User agent cannot be empty; Wikimedia rejects anonymous requests".to_string(),
            ));
        }

        if self.timeout_secs == 0 {
            return Err(AppError::Config(
                "Request timeout must be at least one second".to_string(),
            ));
        }

        if self.roster_retries == 0 || self.roster_retries > MAX_ROSTER_RETRIES {
            return Err(AppError::Config(format!(
                "Roster retries must be between 1 and {}, got {}",
                MAX_ROSTER_RETRIES, self.roster_retries
            )));
        }

        if !is_item_id(&self.graph.league_id) {
            return Err(AppError::Config(format!(
                "Invalid league id: {}. Expected a Wikidata item id like Q82595",
                self.graph.league_id
            )));
        }

        Ok(())
    }
}

/// Whether `id` looks like a Wikidata item id (`Q` followed by digits).
pub fn is_item_id(id: &str) -> bool {
    id.len() > 1 && id.starts_with('Q') && id[1..].chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.graph.endpoint, DEFAULT_GRAPH_ENDPOINT);
        assert_eq!(config.graph.league_id, "Q82595");
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.roster_retries, 3);
        assert_eq!(config.prompt_id, "coach.default");
        assert_eq!(config.aliases.get("pauli").map(String::as_str), Some("FC St. Pauli"));
        assert!(!config.verbose);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_coachbot_dir() {
        let config = AppConfig::default();
        assert!(config.coachbot_dir().ends_with(".coachbot"));
        assert!(config.config_path().ends_with(".coachbot/config.yaml"));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default();
        let overridden = config.with_overrides(None, None, Some(3), None, true, true, false);

        assert_eq!(overridden.timeout_secs, 3);
        assert!(overridden.log_json);
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_merge_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        fs::write(
            &path,
            r#"
sources:
  graph:
    endpoint: http://localhost:9999/sparql
  document:
    maxExcerptChars: 200
  userAgent: test-agent/1.0
  timeoutSecs: 4
resolver:
  aliases:
    Pauli: FC St. Pauli
prompt:
  id: coach.terse
logging:
  level: debug
  color: false
"#,
        )
        .unwrap();

        let merged = AppConfig::default().merge_yaml(&path).unwrap();
        assert_eq!(merged.graph.endpoint, "http://localhost:9999/sparql");
        assert_eq!(merged.graph.league_id, DEFAULT_LEAGUE_ID);
        assert_eq!(merged.document.endpoint, DEFAULT_DOCUMENT_ENDPOINT);
        assert_eq!(merged.document.max_excerpt_chars, 200);
        assert_eq!(merged.user_agent, "test-agent/1.0");
        assert_eq!(merged.timeout_secs, 4);
        assert_eq!(merged.aliases.len(), 1);
        assert!(merged.aliases.contains_key("pauli"));
        assert_eq!(merged.prompt_id, "coach.terse");
        assert_eq!(merged.log_level, Some("debug".to_string()));
        assert!(merged.no_color);
    }

    #[test]
    fn test_load_from_workspace() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join(".coachbot")).unwrap();
        fs::write(
            temp.path().join(".coachbot/config.yaml"),
            "sources:\n  rosterRetries: 5\nprompt:\n  id: coach.terse\n",
        )
        .unwrap();

        let config = AppConfig::load_from(Some(temp.path().to_path_buf()), None).unwrap();
        assert_eq!(config.workspace, temp.path());
        assert_eq!(config.roster_retries, 5);
        assert_eq!(config.prompt_id, "coach.terse");
    }

    #[test]
    fn test_load_from_missing_workspace() {
        let temp = TempDir::new().unwrap();
        let result = AppConfig::load_from(Some(temp.path().join("missing")), None);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_merge_invalid_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        fs::write(&path, "sources: [unterminated").unwrap();

        let result = AppConfig::default().merge_yaml(&path);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_empty_user_agent() {
        let mut config = AppConfig::default();
        config.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = AppConfig::default();
        config.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bounds_roster_retries() {
        let mut config = AppConfig::default();

        config.roster_retries = 0;
        assert!(config.validate().is_err());

        config.roster_retries = MAX_ROSTER_RETRIES;
        assert!(config.validate().is_ok());

        config.roster_retries = 40;
        match config.validate() {
            Err(AppError::Config(msg)) => assert!(msg.contains("between 1 and 10")),
            other => panic!("Expected a config error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_bad_league() {
        let mut config = AppConfig::default();
        config.graph.league_id = "Bundesliga".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_is_item_id() {
        assert!(is_item_id("Q82595"));
        assert!(!is_item_id("Q"));
        assert!(!is_item_id("P286"));
        assert!(!is_item_id("Q1} . ?x ?y ?z"));
    }
}
