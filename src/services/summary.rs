//! Summary Provider
//!
//! Free-text overview of a species, fetched from the Wikipedia REST API
//! (`/page/summary/{title}`).

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::FaunaConfig;

/// Overview text plus an optional lead image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub extract: String,
    pub thumbnail: Option<String>,
}

#[async_trait]
pub trait SummaryProvider: Send + Sync {
    async fn summarize(&self, label: &str) -> Result<Summary>;
}

#[derive(Debug, Deserialize)]
struct PageSummary {
    #[serde(default)]
    extract: String,
    thumbnail: Option<PageImage>,
}

#[derive(Debug, Deserialize)]
struct PageImage {
    source: String,
}

impl From<PageSummary> for Summary {
    fn from(page: PageSummary) -> Self {
        Self {
            extract: page.extract,
            thumbnail: page.thumbnail.map(|t| t.source),
        }
    }
}

pub struct WikipediaSummaryProvider {
    client: Client,
    rest_base: String,
}

impl WikipediaSummaryProvider {
    pub fn new(config: &FaunaConfig) -> Self {
        Self {
            client: Client::builder()
                .user_agent(config.user_agent.clone())
                .timeout(config.request_timeout())
                .build()
                .unwrap_or_default(),
            rest_base: config.summary_api.trim_end_matches('/').to_string(),
        }
    }

    fn summary_url(&self, label: &str) -> String {
        let title = label.trim().replace(' ', "_");
        format!("{}/page/summary/{}", self.rest_base, urlencoding::encode(&title))
    }
}

#[async_trait]
impl SummaryProvider for WikipediaSummaryProvider {
    async fn summarize(&self, label: &str) -> Result<Summary> {
        let url = self.summary_url(label);
        debug!("Fetching summary: {}", url);

        let response = self.client
            .get(&url)
            .send()
            .await
            .context("Failed to send summary request")?
            .error_for_status()
            .with_context(|| format!("No summary available for '{}'", label))?;

        let page: PageSummary = response
            .json()
            .await
            .context("Failed to parse summary response")?;
        Ok(page.into())
    }
}
