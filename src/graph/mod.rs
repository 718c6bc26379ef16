//! Knowledge Graph Module
//!
//! The graph is only ever read. Three query shapes cover everything the
//! taxonomy pipeline needs: title → entity, claims of one property, and an
//! entity's label plus claims.

mod wikidata;
pub mod fixture;

pub use fixture::{FixtureEntity, FixtureGraph};
pub use wikidata::WikidataClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::GraphResult;

/// Opaque identifier of a graph node (e.g. `Q140`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityRef(String);

impl EntityRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityRef {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Identifier of a graph property (e.g. `P171`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyId(String);

impl PropertyId {
    /// "parent taxon"
    pub const PARENT_TAXON: &'static str = "P171";
    /// "taxon rank"
    pub const TAXON_RANK: &'static str = "P105";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn parent_taxon() -> Self {
        Self::new(Self::PARENT_TAXON)
    }

    pub fn taxon_rank() -> Self {
        Self::new(Self::TAXON_RANK)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Statement rank as recorded by the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimRank {
    Preferred,
    #[default]
    Normal,
    Deprecated,
}

/// One (subject, property, value) fact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    pub subject: EntityRef,
    pub property: PropertyId,
    /// `None` for "no value" / "unknown value" statements
    pub value: Option<EntityRef>,
    pub rank: ClaimRank,
}

impl Claim {
    pub fn new(subject: EntityRef, property: PropertyId, value: Option<EntityRef>) -> Self {
        Self { subject, property, value, rank: ClaimRank::Normal }
    }

    pub fn with_rank(mut self, rank: ClaimRank) -> Self {
        self.rank = rank;
        self
    }

    /// The value, unless the statement is deprecated or empty
    pub fn usable_value(&self) -> Option<&EntityRef> {
        if self.rank == ClaimRank::Deprecated {
            return None;
        }
        self.value.as_ref()
    }
}

/// Label and claims of a single entity
#[derive(Debug, Clone, Default)]
pub struct EntityDetail {
    /// Display label in the configured language
    pub label: Option<String>,
    pub claims: HashMap<String, Vec<Claim>>,
}

impl EntityDetail {
    /// Claims for one property, in graph order
    pub fn claims_for(&self, property: &PropertyId) -> &[Claim] {
        self.claims
            .get(property.as_str())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// First usable value of a property
    pub fn first_value(&self, property: &PropertyId) -> Option<&EntityRef> {
        self.claims_for(property).iter().find_map(Claim::usable_value)
    }
}

/// Read-only access to a knowledge graph
#[async_trait]
pub trait KnowledgeGraph: Send + Sync {
    /// Resolve a page title to its entity. Fails with `NotFound` when nothing matches.
    async fn resolve_entity(&self, label: &str) -> GraphResult<EntityRef>;

    /// Every claim of `property` on `entity`, in graph order. Empty is not an error.
    async fn fetch_claims(&self, entity: &EntityRef, property: &PropertyId) -> GraphResult<Vec<Claim>>;

    /// Label and claims of `entity`
    async fn entity_detail(&self, entity: &EntityRef) -> GraphResult<EntityDetail>;
}
