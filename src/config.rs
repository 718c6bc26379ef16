//! Runtime Configuration
//!
//! Everything is read from `FAUNA_*` environment variables (a `.env` file is
//! honoured by the binaries). Unset variables fall back to the public
//! Wikidata / Wikipedia endpoints.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_WIKIDATA_API: &str = "https://www.wikidata.org/w/api.php";
pub const DEFAULT_SUMMARY_API: &str = "https://en.wikipedia.org/api/rest_v1";

/// Configuration shared by the CLI and the server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FaunaConfig {
    /// Wikibase action API endpoint
    pub wikidata_api: String,
    /// Wikipedia REST base used for summaries
    pub summary_api: String,
    /// Site whose page titles are matched against labels
    pub site: String,
    /// Language of ancestor display labels
    pub language: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    /// Upper bound on concurrent ancestor lookups per resolution
    pub max_concurrent_lookups: usize,
    /// How many parent-taxon levels to walk above the species
    pub max_taxon_depth: usize,
    /// External image classifier; image identification is disabled without it
    pub classifier_url: Option<String>,
    pub bind_addr: String,
    /// OTLP collector for span export
    pub otlp_endpoint: Option<String>,
    /// JSON graph used instead of Wikidata (offline mode)
    pub graph_fixture: Option<PathBuf>,
}

impl Default for FaunaConfig {
    fn default() -> Self {
        Self {
            wikidata_api: DEFAULT_WIKIDATA_API.to_string(),
            summary_api: DEFAULT_SUMMARY_API.to_string(),
            site: "enwiki".to_string(),
            language: "en".to_string(),
            user_agent: format!("fauna_finder/{}", env!("CARGO_PKG_VERSION")),
            request_timeout_secs: 10,
            max_concurrent_lookups: 8,
            max_taxon_depth: 40,
            classifier_url: None,
            bind_addr: "0.0.0.0:8002".to_string(),
            otlp_endpoint: None,
            graph_fixture: None,
        }
    }
}

impl FaunaConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(v) = var("FAUNA_WIKIDATA_API") { config.wikidata_api = v; }
        if let Some(v) = var("FAUNA_SUMMARY_API") { config.summary_api = v; }
        if let Some(v) = var("FAUNA_SITE") { config.site = v; }
        if let Some(v) = var("FAUNA_LANGUAGE") { config.language = v; }
        if let Some(v) = var("FAUNA_USER_AGENT") { config.user_agent = v; }
        if let Some(v) = var("FAUNA_BIND_ADDR") { config.bind_addr = v; }

        if let Some(v) = var("FAUNA_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = v
                .parse()
                .with_context(|| format!("FAUNA_REQUEST_TIMEOUT_SECS must be a whole number of seconds, got '{}'", v))?;
            config.request_timeout_secs = secs.max(1);
        }
        if let Some(v) = var("FAUNA_MAX_CONCURRENT_LOOKUPS") {
            let limit: usize = v
                .parse()
                .with_context(|| format!("FAUNA_MAX_CONCURRENT_LOOKUPS must be a positive integer, got '{}'", v))?;
            config.max_concurrent_lookups = limit.max(1);
        }
        if let Some(v) = var("FAUNA_MAX_TAXON_DEPTH") {
            let depth: usize = v
                .parse()
                .with_context(|| format!("FAUNA_MAX_TAXON_DEPTH must be a positive integer, got '{}'", v))?;
            config.max_taxon_depth = depth.max(1);
        }

        config.classifier_url = var("FAUNA_CLASSIFIER_URL");
        config.otlp_endpoint = var("FAUNA_OTLP_ENDPOINT");
        config.graph_fixture = var("FAUNA_GRAPH_FIXTURE").map(PathBuf::from);

        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
