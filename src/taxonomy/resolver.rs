//! Taxonomy Resolution Pipeline
//!
//! label → entity → parent-taxon claims → (per distinct ancestor, concurrently)
//! rank claim → tracked rank → merged TaxonomyMap. The walk continues level by
//! level through each ancestor's own parents until every rank above species is
//! known, the chain ends, or the depth cap is hit. Every failure degrades the
//! result instead of escaping; the species label itself is always present.

use futures_util::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};

use super::{Rank, TaxonomyMap, RANK_TABLE};
use crate::error::{GraphError, GraphResult};
use crate::graph::{Claim, EntityRef, KnowledgeGraph, PropertyId};

pub const DEFAULT_FAN_OUT: usize = 8;
/// Wikidata chains from species to kingdom run through many unranked clades
pub const DEFAULT_MAX_DEPTH: usize = 40;

/// Resolves species labels into ranked classifications
#[derive(Clone)]
pub struct TaxonomyResolver {
    graph: Arc<dyn KnowledgeGraph>,
    fan_out: usize,
    max_depth: usize,
}

/// What one ancestor contributes: maybe a rank, and where to go next
struct AncestorInfo {
    rank: Option<(Rank, String)>,
    parents: Vec<EntityRef>,
}

impl TaxonomyResolver {
    pub fn new(graph: Arc<dyn KnowledgeGraph>) -> Self {
        Self { graph, fan_out: DEFAULT_FAN_OUT, max_depth: DEFAULT_MAX_DEPTH }
    }

    /// Cap on ancestor lookups running at once
    pub fn with_fan_out(mut self, fan_out: usize) -> Self {
        self.fan_out = fan_out.max(1);
        self
    }

    /// How many parent levels to walk; 1 inspects direct parents only
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    /// Never fails: unresolvable labels and graph errors yield `{Species: label}`
    /// plus whatever ancestors could be classified.
    pub async fn resolve_taxonomy(&self, label: &str) -> TaxonomyMap {
        let span = info_span!("resolve_taxonomy", label = %label);
        async move {
            let mut taxonomy = match self.collect_ancestors(label).await {
                Ok(taxonomy) => taxonomy,
                Err(GraphError::NotFound(_)) => {
                    info!("No knowledge-graph entity for '{}'", label);
                    TaxonomyMap::new()
                }
                Err(e) => {
                    warn!("Taxonomy lookup for '{}' degraded: {}", label, e);
                    TaxonomyMap::new()
                }
            };

            if taxonomy.is_empty() {
                debug!("No ranked ancestors found for '{}'", label);
            }

            // The identified label wins over any graph-derived species name.
            taxonomy.set(Rank::Species, label);
            debug!("Resolved {} ranks for '{}'", taxonomy.len(), label);
            taxonomy
        }
        .instrument(span)
        .await
    }

    async fn collect_ancestors(&self, label: &str) -> GraphResult<TaxonomyMap> {
        let query = label.trim();
        if query.is_empty() {
            return Err(GraphError::NotFound(label.to_string()));
        }

        let entity = self.graph.resolve_entity(query).await?;
        debug!("'{}' resolved to {}", query, entity);

        let parents = self.graph.fetch_claims(&entity, &PropertyId::parent_taxon()).await?;

        let mut visited = HashSet::from([entity.clone()]);
        let mut frontier = unvisited(parents.iter().filter_map(Claim::usable_value), &mut visited);
        if frontier.is_empty() {
            debug!("{} has no usable parent-taxon claims", entity);
        }

        let mut merge = RankMerge::default();
        let mut depth = 0;
        while !frontier.is_empty() && depth < self.max_depth && !merge.is_complete() {
            let next = self.classify_level(depth, frontier, &mut merge).await;
            frontier = unvisited(next.iter(), &mut visited);
            depth += 1;
        }

        if !frontier.is_empty() && !merge.is_complete() {
            debug!("Stopped at depth {} with {} ancestors unexplored", depth, frontier.len());
        }
        Ok(merge.finish())
    }

    /// Fan out over one level of ancestors and fold the results into `merge`.
    /// Returns the next level's candidates in claim order.
    async fn classify_level(&self, depth: usize, frontier: Vec<EntityRef>, merge: &mut RankMerge) -> Vec<EntityRef> {
        debug!("Inspecting {} ancestors at depth {}", frontier.len(), depth);

        let mut lookups = stream::iter(frontier.into_iter().enumerate())
            .map(|(index, ancestor)| async move {
                let outcome = self.inspect_ancestor(&ancestor).await;
                (index, ancestor, outcome)
            })
            .buffer_unordered(self.fan_out);

        // Single collector: completions arrive in any order, merging happens here only.
        let mut next: Vec<(usize, Vec<EntityRef>)> = Vec::new();
        while let Some((index, ancestor, outcome)) = lookups.next().await {
            match outcome {
                Ok(info) => {
                    match info.rank {
                        Some((rank, name)) => merge.offer(rank, (depth, index), name),
                        None => debug!("{} carries no tracked rank", ancestor),
                    }
                    next.push((index, info.parents));
                }
                Err(e) => warn!("Skipping ancestor {}: {}", ancestor, e),
            }
        }

        next.sort_by_key(|(index, _)| *index);
        next.into_iter().flat_map(|(_, parents)| parents).collect()
    }

    async fn inspect_ancestor(&self, ancestor: &EntityRef) -> GraphResult<AncestorInfo> {
        let detail = self.graph.entity_detail(ancestor).await?;

        let parents = detail
            .claims_for(&PropertyId::parent_taxon())
            .iter()
            .filter_map(Claim::usable_value)
            .cloned()
            .collect();

        let rank = detail
            .first_value(&PropertyId::taxon_rank())
            .and_then(|rank_entity| RANK_TABLE.classify(rank_entity));

        let rank = match (rank, detail.label) {
            (Some(rank), Some(name)) => Some((rank, name)),
            (Some(rank), None) => {
                warn!("{} is a {} without a display label", ancestor, rank);
                None
            }
            (None, _) => None,
        };

        Ok(AncestorInfo { rank, parents })
    }
}

/// Entities not seen before, in iteration order
fn unvisited<'a>(candidates: impl Iterator<Item = &'a EntityRef>, visited: &mut HashSet<EntityRef>) -> Vec<EntityRef> {
    candidates
        .filter(|candidate| visited.insert((*candidate).clone()))
        .cloned()
        .collect()
}

/// Collects classified ancestors. On a rank collision the nearer ancestor wins,
/// and within a level the one listed first in the parent claims, whatever
/// order lookups complete in.
#[derive(Default)]
struct RankMerge {
    ranks: HashMap<Rank, ((usize, usize), String)>,
}

impl RankMerge {
    fn offer(&mut self, rank: Rank, position: (usize, usize), name: String) {
        let held_earlier = matches!(self.ranks.get(&rank), Some((held, _)) if *held < position);
        if held_earlier {
            debug!("Rank {} already claimed by a nearer ancestor, ignoring '{}'", rank, name);
            return;
        }
        self.ranks.insert(rank, (position, name));
    }

    /// Every rank above species is known
    fn is_complete(&self) -> bool {
        Rank::ALL
            .iter()
            .filter(|rank| **rank != Rank::Species)
            .all(|rank| self.ranks.contains_key(rank))
    }

    fn finish(self) -> TaxonomyMap {
        self.ranks
            .into_iter()
            .map(|(rank, (_, name))| (rank, name))
            .collect()
    }
}
