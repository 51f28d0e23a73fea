//! Tactical Map - batch map artifact builder
//!
//! One run ingests the KML overlay document plus the optional event and
//! statistics datasets, classifies everything into layers, and writes a
//! single self-contained JSON artifact for the rendering stage.

mod ingest;
mod settings;

use anyhow::{Context, Result};
use clap::Parser;
use settings::Settings;
use std::fs;
use tactical_map_lib::{
    MapPipeline, PipelineConfig, PruneConfig, events::EventCollection, output,
    stats::{CATEGORY_LIMIT, CATEGORY_MIN_USD, StatsSnapshot, StatsSummary},
};

fn main() -> Result<()> {
    // Setup logging
    tracing_subscriber::fmt::init();

    let settings = Settings::parse();
    run(&settings)
}

fn run(settings: &Settings) -> Result<()> {
    // --- Overlay document ---
    let kml_text = fs::read_to_string(&settings.kml)
        .with_context(|| format!("cannot read {}", settings.kml.display()))?;
    let document = ingest::xml::parse(&kml_text)
        .with_context(|| format!("cannot parse {}", settings.kml.display()))?;
    let (tree, styles) = ingest::kml::interpret(&document)?;

    let pipeline = MapPipeline::new(PipelineConfig {
        prune: PruneConfig {
            keep_all: settings.all_folders,
            ..Default::default()
        },
        ..Default::default()
    });
    let mut pass = pipeline
        .run(&tree, Some(&styles))
        .context("classification pass failed")?;

    // --- Border overlays ---
    if let Some(path) = &settings.borders {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        for border in ingest::borders::load(&raw, &ingest::borders::default_border_specs())? {
            pass.push_feature(border);
        }
    }

    // --- Event dataset ---
    let events = settings
        .events
        .as_ref()
        .map(|path| -> Result<EventCollection> {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            let value: serde_json::Value = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not valid JSON", path.display()))?;
            let collection = EventCollection::from_json(&value)?;
            tracing::info!("event dataset: {} events", collection.len());
            Ok(collection)
        })
        .transpose()?;

    // --- Statistics snapshot ---
    let stats = settings
        .stats
        .as_ref()
        .map(|path| -> Result<StatsSummary> {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            let snapshot: StatsSnapshot = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not a statistics snapshot", path.display()))?;
            Ok(snapshot.summarize(CATEGORY_LIMIT, CATEGORY_MIN_USD))
        })
        .transpose()?;

    // --- Assemble and write ---
    let artifact = output::assemble(&pass, events.as_ref(), stats);

    if let Some(parent) = settings.output.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("cannot create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(&artifact)?;
    fs::write(&settings.output, json)
        .with_context(|| format!("cannot write {}", settings.output.display()))?;

    // Run summary, one line per layer
    for entry in &artifact.manifest {
        tracing::info!(
            "layer {:<14} {:>5} features{}",
            entry.id,
            entry.feature_count,
            if entry.default_visible { "" } else { " (hidden)" }
        );
    }
    let audit = &pass.audit;
    if !audit.is_clean() {
        tracing::warn!(
            "{} warnings, {} folders skipped ({} placemarks)",
            audit.warnings.len(),
            audit.skipped.len(),
            audit.skipped_placemarks()
        );
        for skipped in &audit.skipped {
            tracing::debug!(
                "  skipped \"{}\" ({:?}): {:?}",
                skipped.name,
                skipped.reason,
                skipped.samples
            );
        }
    }
    tracing::info!("wrote {}", settings.output.display());

    Ok(())
}
