//! In-Memory Knowledge Graph
//!
//! A small graph held in memory, loadable from JSON. Used for offline runs
//! (`FAUNA_GRAPH_FIXTURE`) and as the simulated graph in tests, where it can
//! inject per-entity latency and failures and report call statistics.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{Claim, EntityDetail, EntityRef, KnowledgeGraph, PropertyId};
use crate::error::{GraphError, GraphResult};

/// One node of a fixture graph
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixtureEntity {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    /// Page title this entity is reachable by
    #[serde(default)]
    pub sitelink: Option<String>,
    /// property id → value entity ids, in graph order
    #[serde(default)]
    pub claims: BTreeMap<String, Vec<String>>,
}

impl FixtureEntity {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), ..Default::default() }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn sitelink(mut self, title: impl Into<String>) -> Self {
        self.sitelink = Some(title.into());
        self
    }

    pub fn claim(mut self, property: &str, value: impl Into<String>) -> Self {
        self.claims.entry(property.to_string()).or_default().push(value.into());
        self
    }

    /// Shorthand for a labelled taxon of the given rank entity
    pub fn taxon(id: &str, label: &str, rank: &str) -> Self {
        Self::new(id).label(label).claim(PropertyId::TAXON_RANK, rank)
    }

    fn claims_for(&self, property: &str) -> Vec<Claim> {
        let subject = EntityRef::new(self.id.clone());
        self.claims
            .get(property)
            .map(|values| {
                values
                    .iter()
                    .map(|v| Claim::new(subject.clone(), PropertyId::new(property), Some(EntityRef::new(v.clone()))))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Knowledge graph held entirely in memory
#[derive(Debug, Default, Deserialize)]
pub struct FixtureGraph {
    entities: Vec<FixtureEntity>,
    #[serde(skip)]
    latency: HashMap<String, Duration>,
    #[serde(skip)]
    failing: HashSet<String>,
    #[serde(skip)]
    stats: CallStats,
}

#[derive(Debug, Default)]
struct CallStats {
    resolve_calls: AtomicUsize,
    claim_calls: AtomicUsize,
    detail_calls: AtomicUsize,
    completed_details: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Keeps the in-flight counter honest even when the lookup is dropped mid-way
struct InFlight<'a>(&'a CallStats);

impl<'a> InFlight<'a> {
    fn enter(stats: &'a CallStats) -> Self {
        let now = stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        stats.max_in_flight.fetch_max(now, Ordering::SeqCst);
        Self(stats)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FixtureGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a graph from a JSON file of the form `{"entities": [...]}`
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read graph fixture {}", path.display()))?;
        let graph = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse graph fixture {}", path.display()))?;
        Ok(graph)
    }

    pub fn with_entity(mut self, entity: FixtureEntity) -> Self {
        self.entities.push(entity);
        self
    }

    /// Delay every lookup that touches `id`
    pub fn with_latency(mut self, id: &str, delay: Duration) -> Self {
        self.latency.insert(id.to_string(), delay);
        self
    }

    /// Make every lookup that touches `id` fail with a transport error
    pub fn failing(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }

    pub fn resolve_calls(&self) -> usize {
        self.stats.resolve_calls.load(Ordering::SeqCst)
    }

    pub fn claim_calls(&self) -> usize {
        self.stats.claim_calls.load(Ordering::SeqCst)
    }

    pub fn detail_calls(&self) -> usize {
        self.stats.detail_calls.load(Ordering::SeqCst)
    }

    /// Detail lookups that ran to completion (not dropped)
    pub fn completed_details(&self) -> usize {
        self.stats.completed_details.load(Ordering::SeqCst)
    }

    /// Highest number of detail lookups observed running at once
    pub fn max_in_flight(&self) -> usize {
        self.stats.max_in_flight.load(Ordering::SeqCst)
    }

    fn entity(&self, id: &str) -> Option<&FixtureEntity> {
        self.entities.iter().find(|e| e.id == id)
    }

    async fn touch(&self, id: &str) -> GraphResult<()> {
        if let Some(delay) = self.latency.get(id) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.contains(id) {
            return Err(GraphError::Fetch(format!("simulated transport failure for {}", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl KnowledgeGraph for FixtureGraph {
    async fn resolve_entity(&self, label: &str) -> GraphResult<EntityRef> {
        self.stats.resolve_calls.fetch_add(1, Ordering::SeqCst);
        self.entities
            .iter()
            .find(|e| e.sitelink.as_deref() == Some(label))
            .map(|e| EntityRef::new(e.id.clone()))
            .ok_or_else(|| GraphError::NotFound(label.to_string()))
    }

    async fn fetch_claims(&self, entity: &EntityRef, property: &PropertyId) -> GraphResult<Vec<Claim>> {
        self.stats.claim_calls.fetch_add(1, Ordering::SeqCst);
        self.touch(entity.as_str()).await?;
        Ok(self
            .entity(entity.as_str())
            .map(|e| e.claims_for(property.as_str()))
            .unwrap_or_default())
    }

    async fn entity_detail(&self, entity: &EntityRef) -> GraphResult<EntityDetail> {
        self.stats.detail_calls.fetch_add(1, Ordering::SeqCst);
        let _guard = InFlight::enter(&self.stats);
        self.touch(entity.as_str()).await?;

        let found = self
            .entity(entity.as_str())
            .ok_or_else(|| GraphError::NotFound(entity.to_string()))?;

        let claims = found
            .claims
            .keys()
            .map(|property| (property.clone(), found.claims_for(property)))
            .collect();

        self.stats.completed_details.fetch_add(1, Ordering::SeqCst);
        Ok(EntityDetail {
            label: found.label.clone(),
            claims,
        })
    }
}
