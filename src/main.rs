//! FaunaFinder CLI
//!
//! fauna_finder <label…>          print the profile of a species
//! fauna_finder identify <image>  classify an image, then print its profile
//! fauna_finder serve             run the HTTP API
//! fauna_finder                   interactive prompt

use anyhow::{bail, Context, Result};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use fauna_finder::graph::{FixtureGraph, KnowledgeGraph, WikidataClient};
use fauna_finder::server::{run_server, AppState};
use fauna_finder::services::{ImageUpload, RemoteClassifier, WikipediaSummaryProvider};
use fauna_finder::utils::init_telemetry;
use fauna_finder::{FaunaConfig, Profile, ProfileService, TaxonomyResolver};

// ──────────────────────────────────────────────────────────────────────────────
// WIRING
// ──────────────────────────────────────────────────────────────────────────────

fn build_service(config: &FaunaConfig) -> Result<ProfileService> {
    let graph: Arc<dyn KnowledgeGraph> = match &config.graph_fixture {
        Some(path) => {
            info!("Using offline graph fixture {}", path.display());
            Arc::new(FixtureGraph::load(path)?)
        }
        None => Arc::new(WikidataClient::new(config)),
    };

    let resolver = TaxonomyResolver::new(graph)
        .with_fan_out(config.max_concurrent_lookups)
        .with_max_depth(config.max_taxon_depth);
    let mut service = ProfileService::new(resolver, Arc::new(WikipediaSummaryProvider::new(config)));
    if let Some(url) = &config.classifier_url {
        service = service.with_classifier(Arc::new(RemoteClassifier::new(url.clone(), config)));
    }
    Ok(service)
}

fn print_profile(profile: &Profile) {
    println!("\n{}", "═".repeat(60));
    println!("🐾 {}", profile.label);
    if let Some(confidence) = profile.confidence {
        println!("   classifier confidence: {:.0}%", confidence * 100.0);
    }
    println!("{}", "═".repeat(60));

    println!("\nOverview");
    println!("{}", "─".repeat(50));
    if profile.summary.is_empty() {
        println!("No overview available.");
    } else {
        println!("{}", profile.summary);
    }
    if let Some(ref thumb) = profile.thumbnail {
        println!("Image: {}", thumb);
    }

    println!("\nScientific Classification");
    println!("{}", "─".repeat(50));
    print!("{}", profile.taxonomy);
    println!();
}

// ──────────────────────────────────────────────────────────────────────────────
// MAIN ENTRY POINT
// ──────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let config = FaunaConfig::from_env()?;
    let _telemetry = init_telemetry("fauna_finder", config.otlp_endpoint.as_deref())
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let service = build_service(&config)?;

    match args.first().map(String::as_str) {
        Some("serve") => {
            let state = AppState { profiles: Arc::new(service) };
            run_server(state, &config.bind_addr).await
        }
        Some("identify") => {
            let path = args.get(1).context("usage: fauna_finder identify <image>")?;
            identify(&service, Path::new(path)).await
        }
        Some(_) => {
            let label = args.join(" ");
            print_profile(&service.profile(&label).await);
            Ok(())
        }
        None => interactive(&service).await,
    }
}

async fn identify(service: &ProfileService, path: &Path) -> Result<()> {
    if !service.has_classifier() {
        bail!("Set FAUNA_CLASSIFIER_URL to identify images");
    }

    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read image {}", path.display()))?;
    let mut upload = ImageUpload::new(bytes);
    if let Some(content_type) = ImageUpload::content_type_for(path) {
        upload = upload.with_content_type(content_type);
    }

    let profile = service.identify(&upload).await?;
    print_profile(&profile);
    Ok(())
}

async fn interactive(service: &ProfileService) -> Result<()> {
    println!("\n{}", "═".repeat(60));
    println!("🦁 FaunaFinder: discover the world's fauna");
    println!("{}", "═".repeat(60));
    println!("💡 Commands: <species name> | 'again' | 'quit'\n");

    let mut last_label: Option<String> = None;

    loop {
        print!("🔎 Species: ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let query = input.trim();

        if query.is_empty() {
            continue;
        }

        let label = match query.to_lowercase().as_str() {
            "quit" | "exit" | "q" => {
                println!("\n👋 Goodbye!\n");
                break;
            }
            "again" => match last_label.clone() {
                Some(label) => label,
                None => {
                    println!("Nothing to recalculate yet.\n");
                    continue;
                }
            },
            _ => query.to_string(),
        };

        println!("\n⚙️  Resolving '{}'...", label);
        let profile = service.profile(&label).await;
        print_profile(&profile);
        last_label = Some(label);
    }

    Ok(())
}
