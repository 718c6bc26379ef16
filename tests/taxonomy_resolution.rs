//! Taxonomy Resolution Suite
//!
//! Drives the resolver against in-memory graphs: the lion example, the
//! degradation paths, and simulated out-of-order concurrent completions.

use fauna_finder::graph::{FixtureEntity, FixtureGraph};
use fauna_finder::{Rank, TaxonomyMap, TaxonomyResolver};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

const KINGDOM: &str = "Q36732";
const PHYLUM: &str = "Q37517";
const CLASS: &str = "Q36460";
const ORDER: &str = "Q36602";
const FAMILY: &str = "Q35409";
const GENUS: &str = "Q34740";
const SPECIES: &str = "Q7432";
const SUBFAMILY: &str = "Q164280";
const SUBORDER: &str = "Q5867959";
const DOMAIN: &str = "Q146481";

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures").join(name)
}

fn expected(pairs: &[(Rank, &str)]) -> TaxonomyMap {
    pairs.iter().map(|(rank, name)| (*rank, name.to_string())).collect()
}

fn lion_expected() -> TaxonomyMap {
    expected(&[
        (Rank::Kingdom, "Animalia"),
        (Rank::Phylum, "Chordata"),
        (Rank::Class, "Mammalia"),
        (Rank::Order, "Carnivora"),
        (Rank::Family, "Felidae"),
        (Rank::Genus, "Panthera"),
        (Rank::Species, "Panthera leo"),
    ])
}

/// Species "Testus" with one parent claim per given ancestor
fn species_with_parents(ancestors: &[&str]) -> FixtureEntity {
    ancestors
        .iter()
        .fold(FixtureEntity::new("Q1").sitelink("Testus testus"), |e, a| e.claim("P171", *a))
}

/// The lion as Wikidata actually stores it: one parent per level
fn lion_chain() -> FixtureGraph {
    FixtureGraph::new()
        .with_entity(FixtureEntity::new("Q140").label("lion").sitelink("Panthera leo").claim("P171", "Q127960"))
        .with_entity(FixtureEntity::taxon("Q127960", "Panthera", GENUS).claim("P171", "Q134006"))
        .with_entity(FixtureEntity::taxon("Q134006", "Pantherinae", SUBFAMILY).claim("P171", "Q25265"))
        .with_entity(FixtureEntity::taxon("Q25265", "Felidae", FAMILY).claim("P171", "Q2641384"))
        .with_entity(FixtureEntity::taxon("Q2641384", "Feliformia", SUBORDER).claim("P171", "Q25306"))
        .with_entity(FixtureEntity::taxon("Q25306", "Carnivora", ORDER).claim("P171", "Q7377"))
        .with_entity(FixtureEntity::taxon("Q7377", "Mammalia", CLASS).claim("P171", "Q10915"))
        .with_entity(FixtureEntity::taxon("Q10915", "Chordata", PHYLUM).claim("P171", "Q729"))
        .with_entity(FixtureEntity::taxon("Q729", "Animalia", KINGDOM).claim("P171", "Q19088"))
        .with_entity(FixtureEntity::taxon("Q19088", "Eukaryota", DOMAIN))
}

#[tokio::test]
async fn test_panthera_leo_end_to_end() {
    let graph = Arc::new(FixtureGraph::load(fixture_path("panthera_leo.json")).unwrap());
    let resolver = TaxonomyResolver::new(graph.clone());

    let taxonomy = resolver.resolve_taxonomy("Panthera leo").await;

    assert_eq!(taxonomy, lion_expected());
    let order: Vec<Rank> = taxonomy.iter().map(|(rank, _)| rank).collect();
    assert_eq!(order, Rank::ALL.to_vec());
    // Q127960 is listed twice but looked up once
    assert_eq!(graph.detail_calls(), 6);
}

#[tokio::test]
async fn test_unknown_label_yields_species_only() {
    let graph = Arc::new(FixtureGraph::load(fixture_path("panthera_leo.json")).unwrap());
    let resolver = TaxonomyResolver::new(graph.clone());

    let taxonomy = resolver.resolve_taxonomy("Unicornius mythicus").await;

    assert_eq!(taxonomy, TaxonomyMap::species_only("Unicornius mythicus"));
    assert_eq!(graph.claim_calls(), 0);
    assert_eq!(graph.detail_calls(), 0);
}

#[tokio::test]
async fn test_entity_without_parents_yields_species_only() {
    let graph = Arc::new(FixtureGraph::new().with_entity(species_with_parents(&[])));
    let taxonomy = TaxonomyResolver::new(graph.clone()).resolve_taxonomy("Testus testus").await;

    assert_eq!(taxonomy, TaxonomyMap::species_only("Testus testus"));
    assert_eq!(graph.claim_calls(), 1);
    assert_eq!(graph.detail_calls(), 0);
}

#[tokio::test]
async fn test_blank_label_skips_the_graph() {
    let graph = Arc::new(FixtureGraph::new());
    let taxonomy = TaxonomyResolver::new(graph.clone()).resolve_taxonomy("   ").await;

    assert_eq!(taxonomy, TaxonomyMap::species_only("   "));
    assert_eq!(graph.resolve_calls(), 0);
}

#[tokio::test]
async fn test_untracked_rank_adds_no_key() {
    let graph = FixtureGraph::new()
        .with_entity(species_with_parents(&["Q10", "Q11"]))
        .with_entity(FixtureEntity::taxon("Q10", "Pantherinae", SUBFAMILY))
        .with_entity(FixtureEntity::taxon("Q11", "Panthera", GENUS));

    let taxonomy = TaxonomyResolver::new(Arc::new(graph)).resolve_taxonomy("Testus testus").await;

    assert_eq!(taxonomy, expected(&[(Rank::Genus, "Panthera"), (Rank::Species, "Testus testus")]));
}

#[tokio::test]
async fn test_ancestor_without_rank_claim_adds_no_key() {
    let graph = FixtureGraph::new()
        .with_entity(species_with_parents(&["Q10"]))
        .with_entity(FixtureEntity::new("Q10").label("Felinae"));

    let taxonomy = TaxonomyResolver::new(Arc::new(graph)).resolve_taxonomy("Testus testus").await;

    assert_eq!(taxonomy, TaxonomyMap::species_only("Testus testus"));
}

#[tokio::test]
async fn test_species_label_overrides_graph_species() {
    let graph = FixtureGraph::new()
        .with_entity(species_with_parents(&["Q10", "Q11"]))
        .with_entity(FixtureEntity::taxon("Q10", "Testus", GENUS))
        .with_entity(FixtureEntity::taxon("Q11", "Testus vulgaris", SPECIES));

    let taxonomy = TaxonomyResolver::new(Arc::new(graph)).resolve_taxonomy("Testus testus").await;

    assert_eq!(taxonomy.get(Rank::Species), Some("Testus testus"));
    assert_eq!(taxonomy.get(Rank::Genus), Some("Testus"));
    assert_eq!(taxonomy.len(), 2);
}

#[tokio::test]
async fn test_repeated_resolution_is_identical() {
    let graph = Arc::new(FixtureGraph::load(fixture_path("panthera_leo.json")).unwrap());
    let resolver = TaxonomyResolver::new(graph);

    let first = resolver.resolve_taxonomy("Panthera leo").await;
    let second = resolver.resolve_taxonomy("Panthera leo").await;

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_out_of_order_completions_merge_without_loss() {
    // Earlier claims are slower, so lookups finish in reverse claim order.
    let ranks = [KINGDOM, PHYLUM, CLASS, ORDER, FAMILY, GENUS];
    let ids: Vec<String> = (0..ranks.len()).map(|i| format!("Q{}", 100 + i)).collect();
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();

    let mut graph = FixtureGraph::new().with_entity(species_with_parents(&id_refs));
    for (i, (id, rank)) in ids.iter().zip(ranks).enumerate() {
        graph = graph
            .with_entity(FixtureEntity::taxon(id, &format!("Taxon{}", i), rank))
            .with_latency(id, Duration::from_millis(10 * (ranks.len() - i) as u64));
    }
    let graph = Arc::new(graph);

    let taxonomy = TaxonomyResolver::new(graph.clone()).resolve_taxonomy("Testus testus").await;

    assert_eq!(taxonomy.len(), 7);
    for (i, rank) in Rank::ALL.iter().take(6).enumerate() {
        assert_eq!(taxonomy.get(*rank), Some(format!("Taxon{}", i).as_str()));
    }
    assert_eq!(graph.detail_calls(), 6);
    assert!(graph.max_in_flight() > 1, "ancestor lookups should overlap");
}

#[tokio::test]
async fn test_fan_out_is_bounded() {
    let ids: Vec<String> = (0..6).map(|i| format!("Q{}", 200 + i)).collect();
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();

    let mut graph = FixtureGraph::new().with_entity(species_with_parents(&id_refs));
    for id in &ids {
        graph = graph
            .with_entity(FixtureEntity::taxon(id, id, SUBFAMILY))
            .with_latency(id, Duration::from_millis(15));
    }
    let graph = Arc::new(graph);

    let resolver = TaxonomyResolver::new(graph.clone()).with_fan_out(2);
    resolver.resolve_taxonomy("Testus testus").await;

    assert_eq!(graph.detail_calls(), 6);
    assert!(graph.max_in_flight() <= 2);
}

#[tokio::test]
async fn test_rank_collision_prefers_first_listed_ancestor() {
    // The first-listed genus completes last; it must still win.
    let graph = Arc::new(
        FixtureGraph::new()
            .with_entity(species_with_parents(&["Q10", "Q11"]))
            .with_entity(FixtureEntity::taxon("Q10", "Primus", GENUS))
            .with_entity(FixtureEntity::taxon("Q11", "Secundus", GENUS))
            .with_latency("Q10", Duration::from_millis(40)),
    );
    let resolver = TaxonomyResolver::new(graph);

    for _ in 0..3 {
        let taxonomy = resolver.resolve_taxonomy("Testus testus").await;
        assert_eq!(taxonomy.get(Rank::Genus), Some("Primus"));
    }
}

#[tokio::test]
async fn test_failing_ancestor_is_dropped_alone() {
    let graph = FixtureGraph::new()
        .with_entity(species_with_parents(&["Q10", "Q11", "Q12"]))
        .with_entity(FixtureEntity::taxon("Q10", "Testus", GENUS))
        .with_entity(FixtureEntity::taxon("Q11", "Testidae", FAMILY))
        .with_entity(FixtureEntity::taxon("Q12", "Testiformes", ORDER))
        .failing("Q11");

    let taxonomy = TaxonomyResolver::new(Arc::new(graph)).resolve_taxonomy("Testus testus").await;

    assert_eq!(
        taxonomy,
        expected(&[
            (Rank::Order, "Testiformes"),
            (Rank::Genus, "Testus"),
            (Rank::Species, "Testus testus"),
        ])
    );
}

#[tokio::test]
async fn test_parent_fetch_failure_degrades_to_species() {
    let graph = FixtureGraph::new()
        .with_entity(species_with_parents(&["Q10"]))
        .with_entity(FixtureEntity::taxon("Q10", "Testus", GENUS))
        .failing("Q1");

    let taxonomy = TaxonomyResolver::new(Arc::new(graph)).resolve_taxonomy("Testus testus").await;

    assert_eq!(taxonomy, TaxonomyMap::species_only("Testus testus"));
}

#[tokio::test]
async fn test_unlabelled_ancestor_is_skipped() {
    let graph = FixtureGraph::new()
        .with_entity(species_with_parents(&["Q10", "Q11"]))
        .with_entity(FixtureEntity::new("Q10").claim("P105", GENUS))
        .with_entity(FixtureEntity::taxon("Q11", "Testidae", FAMILY));

    let taxonomy = TaxonomyResolver::new(Arc::new(graph)).resolve_taxonomy("Testus testus").await;

    assert!(!taxonomy.contains(Rank::Genus));
    assert_eq!(taxonomy.get(Rank::Family), Some("Testidae"));
}

#[tokio::test]
async fn test_walks_parent_chain_and_stops_when_complete() {
    let graph = Arc::new(lion_chain());

    let taxonomy = TaxonomyResolver::new(graph.clone()).resolve_taxonomy("Panthera leo").await;

    assert_eq!(taxonomy, lion_expected());
    // Eukaryota sits above the kingdom and is never needed
    assert_eq!(graph.detail_calls(), 8);
}

#[tokio::test]
async fn test_depth_cap_limits_the_walk() {
    let graph = Arc::new(lion_chain());

    let taxonomy = TaxonomyResolver::new(graph.clone())
        .with_max_depth(1)
        .resolve_taxonomy("Panthera leo")
        .await;

    assert_eq!(taxonomy, expected(&[(Rank::Genus, "Panthera"), (Rank::Species, "Panthera leo")]));
    assert_eq!(graph.detail_calls(), 1);
}

#[tokio::test]
async fn test_nearer_ancestor_wins_over_distant() {
    let graph = FixtureGraph::new()
        .with_entity(species_with_parents(&["Q10"]))
        .with_entity(FixtureEntity::taxon("Q10", "Near", GENUS).claim("P171", "Q11"))
        .with_entity(FixtureEntity::taxon("Q11", "Far", GENUS));

    let taxonomy = TaxonomyResolver::new(Arc::new(graph)).resolve_taxonomy("Testus testus").await;

    assert_eq!(taxonomy.get(Rank::Genus), Some("Near"));
}

#[tokio::test]
async fn test_parent_cycle_terminates() {
    let graph = Arc::new(
        FixtureGraph::new()
            .with_entity(species_with_parents(&["Q10"]))
            .with_entity(FixtureEntity::taxon("Q10", "Loopus", GENUS).claim("P171", "Q11"))
            .with_entity(FixtureEntity::taxon("Q11", "Loopidae", FAMILY).claim("P171", "Q10").claim("P171", "Q1")),
    );

    let taxonomy = TaxonomyResolver::new(graph.clone()).resolve_taxonomy("Testus testus").await;

    assert_eq!(taxonomy.len(), 3);
    assert_eq!(graph.detail_calls(), 2);
}

#[tokio::test]
async fn test_cancellation_abandons_in_flight_lookups() {
    let graph = Arc::new(
        FixtureGraph::new()
            .with_entity(species_with_parents(&["Q10", "Q11"]))
            .with_entity(FixtureEntity::taxon("Q10", "Slowus", GENUS))
            .with_entity(FixtureEntity::taxon("Q11", "Slowidae", FAMILY))
            .with_latency("Q10", Duration::from_secs(5))
            .with_latency("Q11", Duration::from_secs(5)),
    );
    let resolver = TaxonomyResolver::new(graph.clone());

    let started = Instant::now();
    let outcome = tokio::time::timeout(Duration::from_millis(50), resolver.resolve_taxonomy("Testus testus")).await;

    assert!(outcome.is_err());
    assert!(started.elapsed() < Duration::from_secs(1));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(graph.detail_calls(), 2);
    assert_eq!(graph.completed_details(), 0);
    assert_eq!(graph.max_in_flight(), 2);
}
