use serde::{Deserialize, Serialize};
use std::fmt;

use crate::graph::EntityRef;

/// The seven tracked taxonomic ranks, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rank {
    Kingdom,
    Phylum,
    Class,
    Order,
    Family,
    Genus,
    Species,
}

impl Rank {
    /// All ranks, top-down
    pub const ALL: [Rank; 7] = [
        Rank::Kingdom,
        Rank::Phylum,
        Rank::Class,
        Rank::Order,
        Rank::Family,
        Rank::Genus,
        Rank::Species,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Rank::Kingdom => "Kingdom",
            Rank::Phylum => "Phylum",
            Rank::Class => "Class",
            Rank::Order => "Order",
            Rank::Family => "Family",
            Rank::Genus => "Genus",
            Rank::Species => "Species",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Binds each rank to the graph entity meaning "this taxon has rank R"
#[derive(Debug)]
pub struct RankTable {
    entries: [(Rank, &'static str); 7],
}

/// Wikidata's rank items
pub static RANK_TABLE: RankTable = RankTable {
    entries: [
        (Rank::Kingdom, "Q36732"),
        (Rank::Phylum, "Q37517"),
        (Rank::Class, "Q36460"),
        (Rank::Order, "Q36602"),
        (Rank::Family, "Q35409"),
        (Rank::Genus, "Q34740"),
        (Rank::Species, "Q7432"),
    ],
};

impl RankTable {
    /// Map a declared rank entity to a tracked rank. `None` means unclassified
    /// (subfamily, tribe, ...), which callers drop silently.
    pub fn classify(&self, rank_entity: &EntityRef) -> Option<Rank> {
        self.entries
            .iter()
            .find(|(_, id)| *id == rank_entity.as_str())
            .map(|(rank, _)| *rank)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Rank, &'static str)> + '_ {
        self.entries.iter().copied()
    }
}
