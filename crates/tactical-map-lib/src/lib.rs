//! Tactical Map Library - Layer Classification Pipeline
//!
//! This library turns a parsed tactical-overlay document (a nested
//! folder/placemark tree plus a shared style table) into a fixed set of
//! renderable map layers. The pipeline prunes archival branches, resolves
//! per-feature styles through style-map indirection, normalizes
//! heterogeneous geometry into a uniform 2D representation, classifies each
//! feature with ordered heuristics, and aggregates the results for the
//! rendering stage.
//!
//! # Architecture
//!
//! - **[`RawNode`]**: read-only source tree handed in by the markup parser
//! - **[`MapPipeline`]**: one configured classification pass
//! - **[`Classifier`]**: ordered-predicate layer assignment
//! - **[`Aggregator`]**: fixed layer buckets with stable feature ordering
//! - **[`output`]**: artifact assembly for the rendering/UI stage
//! - **[`events`]** / **[`stats`]**: adapters for the external event dataset
//!   and statistics snapshot
//!
//! A pass with warnings still produces complete output; the audit report
//! carries every non-fatal issue. Only fatal input corruption (missing or
//! non-folder root, absent style table with dangling references) aborts.

mod classify;
mod geometry;
mod layers;
mod node;
mod pipeline;
mod report;
mod style;
mod walker;

pub mod events;
pub mod output;
pub mod stats;

// Public API exports
pub use classify::{Allegiance, Classifier, FeatureContext, LayerTag, allegiance};
pub use geometry::{GeometryError, NormalizedGeometry, normalize};
pub use layers::{
    Aggregator, ClassifiedFeature, EVENTS_LAYER_ID, Layer, LayerSpec, default_layer_table,
    layer_id_for,
};
pub use node::{GeometryKind, RawGeometry, RawNode, RawNodeKind};
pub use pipeline::{MapPipeline, PipelineConfig, PipelineOutput};
pub use report::{AuditReport, AuditSummary, SkipReason, SkippedFolder, Warning};
pub use style::{ResolvedStyle, StyleDefinition, StyleTable, kml_color_to_html};
pub use walker::{FolderPath, PruneConfig, VisitedPlacemark, walk};

/// Error types for the pipeline
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("root node is missing or is not a folder")]
    InvalidRoot,

    #[error("style table is absent but {0} placemark(s) carry style references")]
    MissingStyleTable(usize),

    #[error("event dataset: {0}")]
    EventDataset(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        // Verify that the main entry points are accessible
        let _: fn(PipelineConfig) -> MapPipeline = MapPipeline::new;
        let _: fn() -> Vec<LayerSpec> = default_layer_table;
        let _ = Classifier::new();
    }
}
