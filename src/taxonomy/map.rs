use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::Rank;

/// Rank → display label. Iterates and serializes top-down (Kingdom first).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxonomyMap {
    ranks: BTreeMap<Rank, String>,
}

impl TaxonomyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The degraded result: nothing but the species itself
    pub fn species_only(label: impl Into<String>) -> Self {
        let mut map = Self::new();
        map.set(Rank::Species, label);
        map
    }

    pub fn get(&self, rank: Rank) -> Option<&str> {
        self.ranks.get(&rank).map(String::as_str)
    }

    pub fn contains(&self, rank: Rank) -> bool {
        self.ranks.contains_key(&rank)
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Rank, &str)> {
        self.ranks.iter().map(|(rank, name)| (*rank, name.as_str()))
    }

    pub(crate) fn set(&mut self, rank: Rank, name: impl Into<String>) {
        self.ranks.insert(rank, name.into());
    }
}

impl FromIterator<(Rank, String)> for TaxonomyMap {
    fn from_iter<I: IntoIterator<Item = (Rank, String)>>(iter: I) -> Self {
        Self { ranks: iter.into_iter().collect() }
    }
}

impl fmt::Display for TaxonomyMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (rank, name) in self.iter() {
            writeln!(f, "{:<8} {}", format!("{}:", rank), name)?;
        }
        Ok(())
    }
}
