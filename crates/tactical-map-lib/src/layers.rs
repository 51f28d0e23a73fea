//! Layer buckets and feature aggregation
//!
//! Classified features are routed into a fixed set of layer buckets keyed on
//! (tag, allegiance). The bucket table is injected at construction so runs
//! with different visibility presets never interfere; features keep their
//! depth-first encounter order inside each layer, which is what makes output
//! diffs between runs meaningful.

use crate::classify::{Allegiance, LayerTag};
use crate::geometry::NormalizedGeometry;
use crate::style::ResolvedStyle;

/// Reserved identifier for the external event dataset layer; the bucket
/// table must not use it
pub const EVENTS_LAYER_ID: &str = "events";

/// An immutable classified feature: everything downstream stages need,
/// copied out of the source tree
#[derive(Debug, Clone)]
pub struct ClassifiedFeature {
    pub name: String,
    pub tag: LayerTag,
    pub allegiance: Allegiance,
    pub geometry: NormalizedGeometry,
    pub style: ResolvedStyle,
}

/// One row of the layer bucket table
#[derive(Debug, Clone)]
pub struct LayerSpec {
    pub id: String,
    pub label: String,
    pub default_visible: bool,
}

impl LayerSpec {
    pub fn new(id: impl Into<String>, label: impl Into<String>, default_visible: bool) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            default_visible,
        }
    }
}

/// A named group of features toggled as a unit in the UI
#[derive(Debug, Clone)]
pub struct Layer {
    pub id: String,
    pub label: String,
    pub default_visible: bool,
    pub features: Vec<ClassifiedFeature>,
}

/// The identifier a feature routes to, given its tag and allegiance
///
/// This is the single source of truth for bucket routing; the aggregator and
/// any post-hoc feature merging both go through it.
pub fn layer_id_for(tag: LayerTag, allegiance: Allegiance) -> &'static str {
    match (tag, allegiance) {
        (LayerTag::Frontline, _) => "frontline",
        (LayerTag::ControlArea, _) => "control-areas",
        (LayerTag::Axis, Allegiance::Historic) => "historic-axes",
        (LayerTag::Axis, _) => "axes",
        (LayerTag::UaUnit, _) => "ua-units",
        (LayerTag::RuUnit, _) => "ru-units",
        (LayerTag::Border, Allegiance::Ua) => "ua-border",
        (LayerTag::Border, Allegiance::Ru) => "ru-border",
        (LayerTag::Border, _) => "other",
        (LayerTag::Other, _) => "other",
    }
}

/// The fixed bucket table: visible tactical layers first, hidden variants
/// after, Other always last
pub fn default_layer_table() -> Vec<LayerSpec> {
    vec![
        LayerSpec::new("frontline", "Frontline", true),
        LayerSpec::new("control-areas", "Control Areas", true),
        LayerSpec::new("axes", "Axes (UA/RU)", true),
        LayerSpec::new("historic-axes", "Axes (Historic)", false),
        LayerSpec::new("ua-units", "UA Units", true),
        LayerSpec::new("ru-units", "RU Units", true),
        LayerSpec::new("ua-border", "UA Border", true),
        LayerSpec::new("ru-border", "RU Border", false),
        LayerSpec::new("other", "Unclassified", false),
    ]
}

/// Routes classified features into layer buckets, preserving insertion order
#[derive(Debug)]
pub struct Aggregator {
    specs: Vec<LayerSpec>,
    buckets: Vec<Vec<ClassifiedFeature>>,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(default_layer_table())
    }
}

impl Aggregator {
    /// Build an aggregator over an explicit bucket table
    ///
    /// A catch-all `other` bucket is appended if the table lacks one, so no
    /// feature is ever dropped silently.
    pub fn new(mut specs: Vec<LayerSpec>) -> Self {
        debug_assert!(
            specs.iter().all(|s| s.id != EVENTS_LAYER_ID),
            "bucket table must not use the reserved events id"
        );
        if !specs.iter().any(|s| s.id == "other") {
            specs.push(LayerSpec::new("other", "Unclassified", false));
        }
        let buckets = specs.iter().map(|_| Vec::new()).collect();
        Self { specs, buckets }
    }

    /// Append a feature to its bucket
    pub fn push(&mut self, feature: ClassifiedFeature) {
        let id = layer_id_for(feature.tag, feature.allegiance);
        let index = self
            .specs
            .iter()
            .position(|s| s.id == id)
            .or_else(|| self.specs.iter().position(|s| s.id == "other"))
            .expect("aggregator always has an other bucket");
        self.buckets[index].push(feature);
    }

    /// Finish the pass: emit every configured layer, empty ones included,
    /// in table order
    pub fn into_layers(self) -> Vec<Layer> {
        self.specs
            .into_iter()
            .zip(self.buckets)
            .map(|(spec, features)| Layer {
                id: spec.id,
                label: spec.label,
                default_visible: spec.default_visible,
                features,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Coord;

    fn feature(name: &str, tag: LayerTag, allegiance: Allegiance) -> ClassifiedFeature {
        ClassifiedFeature {
            name: name.to_string(),
            tag,
            allegiance,
            geometry: NormalizedGeometry::Point(Coord { x: 36.0, y: 48.5 }),
            style: ResolvedStyle::default(),
        }
    }

    #[test]
    fn test_routing_table() {
        assert_eq!(
            layer_id_for(LayerTag::Frontline, Allegiance::Neutral),
            "frontline"
        );
        assert_eq!(layer_id_for(LayerTag::Axis, Allegiance::Ua), "axes");
        assert_eq!(
            layer_id_for(LayerTag::Axis, Allegiance::Historic),
            "historic-axes"
        );
        assert_eq!(layer_id_for(LayerTag::Border, Allegiance::Ua), "ua-border");
        assert_eq!(layer_id_for(LayerTag::Border, Allegiance::Ru), "ru-border");
        assert_eq!(
            layer_id_for(LayerTag::Border, Allegiance::Neutral),
            "other"
        );
    }

    #[test]
    fn test_default_visibility_preset() {
        let table = default_layer_table();
        let visible: Vec<&str> = table
            .iter()
            .filter(|s| s.default_visible)
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(
            visible,
            vec![
                "frontline",
                "control-areas",
                "axes",
                "ua-units",
                "ru-units",
                "ua-border"
            ]
        );
    }

    #[test]
    fn test_features_keep_insertion_order_within_layer() {
        let mut aggregator = Aggregator::default();
        aggregator.push(feature("first", LayerTag::Axis, Allegiance::Ua));
        aggregator.push(feature("between", LayerTag::Frontline, Allegiance::Neutral));
        aggregator.push(feature("second", LayerTag::Axis, Allegiance::Ru));

        let layers = aggregator.into_layers();
        let axes = layers.iter().find(|l| l.id == "axes").unwrap();
        let names: Vec<&str> = axes.features.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn test_empty_layers_still_emitted() {
        let layers = Aggregator::default().into_layers();
        assert_eq!(layers.len(), default_layer_table().len());
        assert!(layers.iter().all(|l| l.features.is_empty()));
    }

    #[test]
    fn test_missing_other_bucket_is_appended() {
        let mut aggregator = Aggregator::new(vec![LayerSpec::new("frontline", "Frontline", true)]);
        aggregator.push(feature("stray", LayerTag::Other, Allegiance::Neutral));
        let layers = aggregator.into_layers();
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[1].id, "other");
        assert_eq!(layers[1].features.len(), 1);
    }
}
