use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::services::{Classification, ImageClassifier, ImageUpload, SummaryProvider};
use crate::taxonomy::{TaxonomyMap, TaxonomyResolver};

/// Everything shown to the user about one identified animal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub label: String,
    pub summary: String,
    pub taxonomy: TaxonomyMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// Classifier confidence, when the label came from an image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub resolved_at: DateTime<Utc>,
}

/// Composes summaries and taxonomies into profiles
pub struct ProfileService {
    resolver: TaxonomyResolver,
    summaries: Arc<dyn SummaryProvider>,
    classifier: Option<Arc<dyn ImageClassifier>>,
}

impl ProfileService {
    pub fn new(resolver: TaxonomyResolver, summaries: Arc<dyn SummaryProvider>) -> Self {
        Self { resolver, summaries, classifier: None }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn ImageClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn has_classifier(&self) -> bool {
        self.classifier.is_some()
    }

    pub fn resolver(&self) -> &TaxonomyResolver {
        &self.resolver
    }

    /// Build a profile for a known label. Summary and taxonomy are fetched
    /// concurrently; neither failing prevents a profile.
    pub async fn profile(&self, label: &str) -> Profile {
        let (summary, taxonomy) = tokio::join!(
            self.summaries.summarize(label),
            self.resolver.resolve_taxonomy(label),
        );

        let summary = summary.unwrap_or_else(|e| {
            warn!("Summary for '{}' unavailable: {:#}", label, e);
            Default::default()
        });

        Profile {
            label: label.to_string(),
            summary: summary.extract,
            taxonomy,
            thumbnail: summary.thumbnail,
            confidence: None,
            image_url: None,
            resolved_at: Utc::now(),
        }
    }

    /// Classify an image, then profile whatever it was classified as
    pub async fn identify(&self, image: &ImageUpload) -> Result<Profile> {
        let classifier = self
            .classifier
            .as_ref()
            .context("No image classifier configured")?;

        let Classification { label, confidence, image_url } = classifier.classify(image).await?;
        info!("Image classified as '{}' ({:.2})", label, confidence);

        let mut profile = self.profile(&label).await;
        profile.confidence = Some(confidence);
        profile.image_url = image_url;
        Ok(profile)
    }
}
