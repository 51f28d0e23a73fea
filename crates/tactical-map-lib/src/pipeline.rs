//! The classification pipeline
//!
//! Ties the stages together for one batch pass: walk and prune the source
//! tree, resolve each surviving placemark's style, normalize its geometry,
//! classify it, and aggregate the results into layers. A pass with warnings
//! still yields complete output; only fatal input corruption (bad root,
//! missing style table) aborts.

use crate::classify::{Classifier, FeatureContext, LayerTag, allegiance};
use crate::geometry::{self, NormalizedGeometry};
use crate::layers::{Aggregator, ClassifiedFeature, Layer, LayerSpec, default_layer_table, layer_id_for};
use crate::node::{GeometryKind, RawNode, RawNodeKind};
use crate::report::{AuditReport, Warning};
use crate::style::{ResolvedStyle, StyleTable};
use crate::walker::{self, PruneConfig};
use crate::{MapError, Result};

/// Behavior knobs for one pass; explicit state, no globals
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub prune: PruneConfig,
    /// Substituted whenever a style cannot be resolved
    pub default_style: ResolvedStyle,
    /// Layer bucket table with default visibility flags
    pub layer_table: Vec<LayerSpec>,
}

impl PipelineConfig {
    fn layer_table_or_default(&self) -> Vec<LayerSpec> {
        if self.layer_table.is_empty() {
            default_layer_table()
        } else {
            self.layer_table.clone()
        }
    }
}

/// One configured pipeline; reusable across passes
#[derive(Default)]
pub struct MapPipeline {
    config: PipelineConfig,
    classifier: Classifier,
}

/// Result of one pass: the aggregated layers plus the audit trail
#[derive(Debug)]
pub struct PipelineOutput {
    pub layers: Vec<Layer>,
    pub audit: AuditReport,
}

impl PipelineOutput {
    /// Append an externally produced feature (border overlays) to its
    /// routed layer, falling back to the catch-all bucket
    pub fn push_feature(&mut self, feature: ClassifiedFeature) {
        let id = layer_id_for(feature.tag, feature.allegiance);
        let index = self
            .layers
            .iter()
            .position(|l| l.id == id)
            .or_else(|| self.layers.iter().position(|l| l.id == "other"));
        match index {
            Some(index) => self.layers[index].features.push(feature),
            None => tracing::warn!("no bucket for external feature \"{}\"", feature.name),
        }
    }

    pub fn layer(&self, id: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn feature_count(&self) -> usize {
        self.layers.iter().map(|l| l.features.len()).sum()
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl MapPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            classifier: Classifier::new(),
        }
    }

    /// Run one classification pass over an in-memory source tree
    ///
    /// `styles` may be omitted only when no placemark carries a style
    /// reference; otherwise the pass fails fast.
    pub fn run(&self, root: &RawNode, styles: Option<&StyleTable>) -> Result<PipelineOutput> {
        #[cfg(feature = "profiling")]
        profiling::scope!("pipeline::run");

        if styles.is_none() {
            let referenced = count_style_refs(root);
            if referenced > 0 {
                return Err(MapError::MissingStyleTable(referenced));
            }
        }

        let mut audit = AuditReport::default();
        let visited = walker::walk(root, &self.config.prune, &mut audit)?;

        let mut aggregator = Aggregator::new(self.config.layer_table_or_default());
        for placemark in visited {
            let RawNodeKind::Placemark {
                geometry,
                style_url,
                inline_style,
            } = &placemark.node.kind
            else {
                continue;
            };
            let name = placemark.node.display_name();

            let style = self.resolve_style(
                name,
                inline_style.as_ref(),
                style_url.as_deref(),
                styles,
                &mut audit,
            );

            let Some(raw_geometry) = geometry else {
                tracing::debug!("placemark \"{name}\" has no geometry, skipping");
                continue;
            };
            let kind = raw_geometry.kind();
            let normalized = match geometry::normalize(raw_geometry) {
                Ok(normalized) => normalized,
                Err(error) => {
                    audit.warn(Warning::MalformedGeometry {
                        feature: name.to_string(),
                        style: style_url.clone(),
                        detail: error.to_string(),
                    });
                    continue;
                }
            };

            let tag = self.classify(name, &placemark.folder_path, &style, kind, &normalized);
            aggregator.push(ClassifiedFeature {
                name: name.to_string(),
                tag,
                allegiance: allegiance(name, &placemark.folder_path),
                geometry: normalized,
                style,
            });
        }

        Ok(PipelineOutput {
            layers: aggregator.into_layers(),
            audit,
        })
    }

    fn classify(
        &self,
        name: &str,
        folder_path: &[String],
        style: &ResolvedStyle,
        kind: GeometryKind,
        normalized: &NormalizedGeometry,
    ) -> LayerTag {
        // Unknown geometry kinds never reach the heuristics
        if kind == GeometryKind::Unknown || normalized.is_empty() && kind == GeometryKind::Multi {
            return LayerTag::Other;
        }
        self.classifier.classify(&FeatureContext {
            name,
            folder_path,
            style,
            geometry: Some(kind),
        })
    }

    fn resolve_style(
        &self,
        feature: &str,
        inline: Option<&crate::style::StyleDefinition>,
        style_url: Option<&str>,
        table: Option<&StyleTable>,
        audit: &mut AuditReport,
    ) -> ResolvedStyle {
        if let Some(inline) = inline {
            return ResolvedStyle::from_definition(inline, &self.config.default_style);
        }
        let Some(url) = style_url else {
            return self.config.default_style.clone();
        };
        match table.and_then(|t| t.resolve(url)) {
            Some(def) => ResolvedStyle::from_definition(def, &self.config.default_style),
            None => {
                audit.warn(Warning::UnresolvedStyle {
                    feature: feature.to_string(),
                    style_url: url.to_string(),
                });
                self.config.default_style.clone()
            }
        }
    }
}

fn count_style_refs(node: &RawNode) -> usize {
    match &node.kind {
        RawNodeKind::Placemark { style_url, .. } => usize::from(style_url.is_some()),
        RawNodeKind::Folder { children } => children.iter().map(count_style_refs).sum(),
    }
}
