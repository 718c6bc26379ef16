//! Taxonomy Module
//!
//! Reconstructs Kingdom → Species classifications from a graph that only
//! knows "parent taxon" and "taxon rank".

mod map;
mod rank;
mod resolver;

pub use map::TaxonomyMap;
pub use rank::{Rank, RankTable, RANK_TABLE};
pub use resolver::{TaxonomyResolver, DEFAULT_FAN_OUT, DEFAULT_MAX_DEPTH};
