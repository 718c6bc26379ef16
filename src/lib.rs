//! FaunaFinder
//!
//! Identifies an animal and presents its profile:
//! - Taxonomy resolution (Kingdom → Species) from Wikidata's parent-taxon chain
//! - Concurrent, bounded ancestor lookups with graceful degradation
//! - Wikipedia summaries and a pluggable image classifier
//! - CLI and HTTP surfaces

pub mod config;
pub mod error;
pub mod graph;
pub mod orchestrator;
pub mod server;
pub mod services;
pub mod taxonomy;
pub mod utils;

// Re-exports for convenience
pub use config::FaunaConfig;
pub use error::{GraphError, GraphResult};
pub use graph::{KnowledgeGraph, WikidataClient};
pub use orchestrator::{Profile, ProfileService};
pub use taxonomy::{Rank, TaxonomyMap, TaxonomyResolver};
