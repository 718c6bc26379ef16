//! Knowledge Graph Errors
//!
//! Failure modes of the graph layer. None of these escape the taxonomy
//! pipeline; they only decide how much of a taxonomy survives.

use thiserror::Error;

/// Errors raised while talking to the knowledge graph
#[derive(Debug, Error)]
pub enum GraphError {
    /// No entity matches the label. Expected for mis-identified or unknown species.
    #[error("no knowledge-graph entity matches '{0}'")]
    NotFound(String),

    /// The remote call itself failed (network, timeout, non-2xx, API error object)
    #[error("knowledge-graph request failed: {0}")]
    Fetch(String),

    /// The remote answered with a shape we could not read
    #[error("unexpected knowledge-graph response: {0}")]
    Malformed(String),
}

impl GraphError {
    /// Whether a caller-side retry could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, GraphError::Fetch(_))
    }
}

impl From<reqwest::Error> for GraphError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GraphError::Malformed(err.to_string())
        } else {
            GraphError::Fetch(err.to_string())
        }
    }
}

impl From<serde_json::Error> for GraphError {
    fn from(err: serde_json::Error) -> Self {
        GraphError::Malformed(err.to_string())
    }
}

pub type GraphResult<T> = std::result::Result<T, GraphError>;
