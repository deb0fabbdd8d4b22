//! Source client factory.
//!
//! Builds the graph and document clients from application configuration.
//! Both clients share the same identifying `User-Agent` and request timeout.

use crate::client::{DocumentClient, GraphClient};
use crate::providers::{WikidataClient, WikipediaClient};
use crate::types::SourceSettings;
use coachbot_core::{AppConfig, AppResult};
use std::sync::Arc;

/// The pair of clients one pipeline talks to.
#[derive(Clone)]
pub struct SourceClients {
    pub graph: Arc<dyn GraphClient>,
    pub document: Arc<dyn DocumentClient>,
}

impl std::fmt::Debug for SourceClients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceClients")
            .field("graph", &self.graph.source_name())
            .field("document", &self.document.source_name())
            .finish()
    }
}

/// Create the Wikidata and Wikipedia clients for a configuration.
///
/// # Errors
/// Returns `AppError::Config` if the configuration is invalid or the HTTP
/// client cannot be built.
pub fn create_clients(config: &AppConfig) -> AppResult<SourceClients> {
    config.validate()?;

    let settings = SourceSettings::from(config);

    tracing::debug!(
        "Creating source clients (graph: {}, document: {}, timeout: {:?})",
        config.graph.endpoint,
        config.document.endpoint,
        settings.timeout
    );

    let graph = WikidataClient::new(&config.graph, &settings)?;
    let document = WikipediaClient::new(&config.document, &settings)?;

    Ok(SourceClients {
        graph: Arc::new(graph),
        document: Arc::new(document),
    })
}
