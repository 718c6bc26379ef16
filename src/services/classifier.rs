//! Image Classifier
//!
//! Pixels → species label is somebody else's model. This module only speaks
//! to it: the image bytes go out, `{label, confidence, imageURL}` comes back.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::FaunaConfig;

/// An uploaded image
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl ImageUpload {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes, content_type: None }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Guess the MIME type from a file extension
    pub fn content_type_for(path: &std::path::Path) -> Option<&'static str> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some("image/jpeg"),
            "png" => Some("image/png"),
            "gif" => Some("image/gif"),
            "webp" => Some("image/webp"),
            _ => None,
        }
    }
}

/// What the classifier saw
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    pub confidence: f32,
    #[serde(rename = "imageURL", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[async_trait]
pub trait ImageClassifier: Send + Sync {
    async fn classify(&self, image: &ImageUpload) -> Result<Classification>;
}

/// Classifier reached over HTTP: raw image body in, JSON classification out
pub struct RemoteClassifier {
    client: Client,
    url: String,
}

impl RemoteClassifier {
    pub fn new(url: impl Into<String>, config: &FaunaConfig) -> Self {
        Self {
            client: Client::builder()
                .user_agent(config.user_agent.clone())
                .timeout(config.request_timeout())
                .build()
                .unwrap_or_default(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl ImageClassifier for RemoteClassifier {
    async fn classify(&self, image: &ImageUpload) -> Result<Classification> {
        if image.bytes.is_empty() {
            bail!("Cannot classify an empty image");
        }
        debug!("Classifying {} byte image via {}", image.bytes.len(), self.url);

        let content_type = image.content_type.as_deref().unwrap_or("application/octet-stream");
        let classification: Classification = self.client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(image.bytes.clone())
            .send()
            .await
            .context("Failed to reach image classifier")?
            .error_for_status()
            .context("Image classifier rejected the request")?
            .json()
            .await
            .context("Failed to parse classifier response")?;

        if classification.label.trim().is_empty() {
            bail!("Image classifier returned an empty label");
        }
        Ok(classification)
    }
}
