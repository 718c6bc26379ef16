//! External Services
//!
//! Collaborators outside the taxonomy core: the summary source and the image classifier.

pub mod classifier;
pub mod summary;

pub use classifier::{Classification, ImageClassifier, ImageUpload, RemoteClassifier};
pub use summary::{Summary, SummaryProvider, WikipediaSummaryProvider};
