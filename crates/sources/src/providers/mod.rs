//! Concrete source implementations.

pub mod wikidata;
pub mod wikipedia;

pub use wikidata::WikidataClient;
pub use wikipedia::WikipediaClient;
