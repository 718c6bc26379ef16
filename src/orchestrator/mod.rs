//! Orchestrator Module
//!
//! Ties the taxonomy core to the external services into one response.

pub mod profile;

pub use profile::{Profile, ProfileService};
