//! Output assembly
//!
//! Serializes aggregated layers into the artifact structure the external
//! rendering/UI stage consumes: GeoJSON-style geometry, display styles
//! resolved against the side palette, a layer manifest for the toggle dock,
//! and the embedded event/statistics blocks. This module is the seam between
//! the pipeline core and the excluded templating stage.

use crate::classify::{Allegiance, LayerTag};
use crate::events::{EventCollection, EventsMeta};
use crate::geometry::NormalizedGeometry;
use crate::layers::{ClassifiedFeature, EVENTS_LAYER_ID, Layer};
use crate::pipeline::PipelineOutput;
use crate::report::AuditSummary;
use crate::stats::StatsSummary;
use geo::Coord;
use serde::{Deserialize, Serialize};

/// Display palette; line colors double as point-marker fallbacks
pub mod palette {
    pub const FRONT: &str = "#EDEDED";

    pub const RU_LINE: &str = "#E24A4A";
    pub const RU_FILL: &str = "#4A0A0A";

    pub const UA_LINE: &str = "#4D86FF";
    pub const UA_FILL: &str = "#0B1E4B";

    pub const HIST_LINE: &str = "#A9A9A9";
    pub const HIST_FILL: &str = "#2A2A2A";

    pub const UA_BORDER: &str = "#6AA8FF";
    pub const RU_BORDER: &str = "#804E4E";

    pub const OTHER_LINE: &str = "#888888";
    pub const OTHER_FILL: &str = "#2F2F2F";
}

/// Fallback viewport center (lon, lat) and zoom when no layer has geometry
const DEFAULT_CENTER: [f64; 2] = [36.0, 48.5];
const DEFAULT_ZOOM: u8 = 6;

/// GeoJSON-style geometry encoding; positions are `[lon, lat]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeometryOut {
    Point { coordinates: [f64; 2] },
    LineString { coordinates: Vec<[f64; 2]> },
    Polygon { coordinates: Vec<Vec<[f64; 2]>> },
    GeometryCollection { geometries: Vec<GeometryOut> },
}

impl From<&NormalizedGeometry> for GeometryOut {
    fn from(geometry: &NormalizedGeometry) -> Self {
        fn pos(c: &Coord<f64>) -> [f64; 2] {
            [c.x, c.y]
        }
        match geometry {
            NormalizedGeometry::Point(c) => GeometryOut::Point {
                coordinates: pos(c),
            },
            NormalizedGeometry::LineString(coords) => GeometryOut::LineString {
                coordinates: coords.iter().map(pos).collect(),
            },
            NormalizedGeometry::Polygon(ring) => GeometryOut::Polygon {
                coordinates: vec![ring.iter().map(pos).collect()],
            },
            NormalizedGeometry::Multi(parts) => GeometryOut::GeometryCollection {
                geometries: parts.iter().map(GeometryOut::from).collect(),
            },
        }
    }
}

impl GeometryOut {
    /// Decode back into the pipeline representation; the inverse of the
    /// encoding above for every geometry the pipeline produces
    pub fn to_normalized(&self) -> NormalizedGeometry {
        fn coord(p: &[f64; 2]) -> Coord<f64> {
            Coord { x: p[0], y: p[1] }
        }
        match self {
            GeometryOut::Point { coordinates } => NormalizedGeometry::Point(coord(coordinates)),
            GeometryOut::LineString { coordinates } => {
                NormalizedGeometry::LineString(coordinates.iter().map(coord).collect())
            }
            GeometryOut::Polygon { coordinates } => NormalizedGeometry::Polygon(
                coordinates
                    .first()
                    .map(|ring| ring.iter().map(coord).collect())
                    .unwrap_or_default(),
            ),
            GeometryOut::GeometryCollection { geometries } => NormalizedGeometry::Multi(
                geometries.iter().map(GeometryOut::to_normalized).collect(),
            ),
        }
    }
}

/// Display style for one feature, resolved against the palette
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleOut {
    pub color: String,
    pub weight: f64,
    pub opacity: f64,
    pub dashed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_opacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// One serialized feature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureOut {
    pub name: String,
    pub geometry: GeometryOut,
    pub style: StyleOut,
}

/// One serialized layer: manifest fields plus its features
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerOut {
    pub id: String,
    pub label: String,
    pub default_visible: bool,
    pub features: Vec<FeatureOut>,
}

/// Manifest entry the UI dock builds its toggle controls from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub id: String,
    pub label: String,
    pub default_visible: bool,
    pub feature_count: usize,
}

/// Initial map viewport derived from the default-visible layers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewport {
    /// `[lon, lat]`
    pub center: [f64; 2],
    pub zoom: u8,
    /// `[[min_lon, min_lat], [max_lon, max_lat]]`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<[[f64; 2]; 2]>,
}

/// Embedded event dataset block
#[derive(Debug, Clone, Serialize)]
pub struct EventsOut {
    pub id: &'static str,
    pub label: &'static str,
    pub default_visible: bool,
    pub meta: EventsMeta,
    pub feature_collection: serde_json::Value,
}

/// The complete artifact handed to the rendering stage
#[derive(Debug, Clone, Serialize)]
pub struct MapArtifact {
    pub viewport: Viewport,
    pub manifest: Vec<ManifestEntry>,
    pub layers: Vec<LayerOut>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<EventsOut>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<StatsSummary>,
    pub audit: AuditSummary,
}

/// Assemble the artifact from a finished pipeline pass
pub fn assemble(
    output: &PipelineOutput,
    events: Option<&EventCollection>,
    stats: Option<StatsSummary>,
) -> MapArtifact {
    let manifest = output
        .layers
        .iter()
        .map(|layer| ManifestEntry {
            id: layer.id.clone(),
            label: layer.label.clone(),
            default_visible: layer.default_visible,
            feature_count: layer.features.len(),
        })
        .collect();

    let layers: Vec<LayerOut> = output
        .layers
        .iter()
        .map(|layer| LayerOut {
            id: layer.id.clone(),
            label: layer.label.clone(),
            default_visible: layer.default_visible,
            features: layer
                .features
                .iter()
                .map(|feature| FeatureOut {
                    name: feature.name.clone(),
                    geometry: GeometryOut::from(&feature.geometry),
                    style: display_style(feature),
                })
                .collect(),
        })
        .collect();

    MapArtifact {
        viewport: viewport_for(&output.layers),
        manifest,
        layers,
        events: events.map(|collection| EventsOut {
            id: EVENTS_LAYER_ID,
            label: "Conflict Events",
            default_visible: false,
            meta: collection.meta(),
            feature_collection: collection.to_feature_collection(),
        }),
        stats,
        audit: output.audit.summary(),
    }
}

/// Resolve the display style for one feature
///
/// Layer role and allegiance pick the palette; the feature's resolved markup
/// style contributes the icon for point markers.
fn display_style(feature: &ClassifiedFeature) -> StyleOut {
    let side_line = match feature.allegiance {
        Allegiance::Ua => palette::UA_LINE,
        Allegiance::Ru => palette::RU_LINE,
        Allegiance::Historic => palette::HIST_LINE,
        Allegiance::Neutral => palette::OTHER_LINE,
    };
    let (side_fill, fill_opacity) = match feature.allegiance {
        Allegiance::Ua => (palette::UA_FILL, 0.22),
        Allegiance::Ru => (palette::RU_FILL, 0.28),
        Allegiance::Historic => (palette::HIST_FILL, 0.18),
        Allegiance::Neutral => (palette::OTHER_FILL, 0.18),
    };

    let mut style = match feature.tag {
        LayerTag::Frontline => StyleOut {
            color: palette::FRONT.to_string(),
            weight: 2.7,
            opacity: 0.95,
            dashed: false,
            fill_color: None,
            fill_opacity: None,
            icon: None,
        },
        LayerTag::Axis => StyleOut {
            color: side_line.to_string(),
            weight: match feature.allegiance {
                Allegiance::Ua | Allegiance::Ru => 2.5,
                Allegiance::Historic => 2.3,
                Allegiance::Neutral => 2.2,
            },
            opacity: match feature.allegiance {
                Allegiance::Ua | Allegiance::Ru => 0.9,
                _ => 0.8,
            },
            dashed: true,
            fill_color: None,
            fill_opacity: None,
            icon: None,
        },
        LayerTag::ControlArea => StyleOut {
            color: side_line.to_string(),
            weight: 2.0,
            opacity: 0.9,
            dashed: false,
            fill_color: Some(side_fill.to_string()),
            fill_opacity: Some(fill_opacity),
            icon: None,
        },
        LayerTag::UaUnit | LayerTag::RuUnit => StyleOut {
            color: if feature.tag == LayerTag::UaUnit {
                palette::UA_LINE.to_string()
            } else {
                palette::RU_LINE.to_string()
            },
            weight: 1.0,
            opacity: 0.9,
            dashed: false,
            fill_color: None,
            fill_opacity: None,
            icon: feature.style.icon.clone(),
        },
        LayerTag::Border => match feature.allegiance {
            Allegiance::Ua => StyleOut {
                color: palette::UA_BORDER.to_string(),
                weight: 3.5,
                opacity: 0.95,
                dashed: false,
                fill_color: None,
                fill_opacity: None,
                icon: None,
            },
            _ => StyleOut {
                color: palette::RU_BORDER.to_string(),
                weight: 2.2,
                opacity: 0.55,
                dashed: false,
                fill_color: None,
                fill_opacity: None,
                icon: None,
            },
        },
        LayerTag::Other => StyleOut {
            color: palette::OTHER_LINE.to_string(),
            weight: 2.2,
            opacity: 0.8,
            dashed: matches!(
                feature.geometry,
                NormalizedGeometry::LineString(_)
            ),
            fill_color: Some(palette::OTHER_FILL.to_string()),
            fill_opacity: Some(0.18),
            icon: feature.style.icon.clone(),
        },
    };

    // Explicit markup width survives for non-palette-critical layers
    if matches!(feature.tag, LayerTag::Other) && feature.style.width > 0.0 {
        style.weight = feature.style.width;
    }
    style
}

/// Bounding box and center over all default-visible layers
fn viewport_for(layers: &[Layer]) -> Viewport {
    let mut min = Coord {
        x: f64::INFINITY,
        y: f64::INFINITY,
    };
    let mut max = Coord {
        x: f64::NEG_INFINITY,
        y: f64::NEG_INFINITY,
    };
    let mut any = false;

    for layer in layers.iter().filter(|l| l.default_visible) {
        for feature in &layer.features {
            if let Some(rect) = feature.geometry.bounding_rect() {
                min.x = min.x.min(rect.min().x);
                min.y = min.y.min(rect.min().y);
                max.x = max.x.max(rect.max().x);
                max.y = max.y.max(rect.max().y);
                any = true;
            }
        }
    }

    if !any {
        return Viewport {
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
            bounds: None,
        };
    }
    Viewport {
        center: [(min.x + max.x) / 2.0, (min.y + max.y) / 2.0],
        zoom: DEFAULT_ZOOM,
        bounds: Some([[min.x, min.y], [max.x, max.y]]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::Aggregator;
    use crate::report::AuditReport;
    use crate::style::ResolvedStyle;

    fn feature(
        name: &str,
        tag: LayerTag,
        allegiance: Allegiance,
        geometry: NormalizedGeometry,
    ) -> ClassifiedFeature {
        ClassifiedFeature {
            name: name.to_string(),
            tag,
            allegiance,
            geometry,
            style: ResolvedStyle::default(),
        }
    }

    fn output_with(features: Vec<ClassifiedFeature>) -> PipelineOutput {
        let mut aggregator = Aggregator::default();
        for feature in features {
            aggregator.push(feature);
        }
        PipelineOutput {
            layers: aggregator.into_layers(),
            audit: AuditReport::default(),
        }
    }

    #[test]
    fn test_geometry_round_trip() {
        let geometry = NormalizedGeometry::Multi(vec![
            NormalizedGeometry::Point(Coord { x: 36.23, y: 49.99 }),
            NormalizedGeometry::LineString(vec![
                Coord { x: 36.0, y: 49.0 },
                Coord {
                    x: 36.123456789,
                    y: 49.987654321,
                },
            ]),
            NormalizedGeometry::Polygon(vec![
                Coord { x: 37.0, y: 47.0 },
                Coord { x: 38.0, y: 47.0 },
                Coord { x: 38.0, y: 48.0 },
                Coord { x: 37.0, y: 47.0 },
            ]),
        ]);

        let encoded = GeometryOut::from(&geometry);
        let json = serde_json::to_string(&encoded).unwrap();
        let decoded: GeometryOut = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.to_normalized(), geometry);
    }

    #[test]
    fn test_geometry_out_json_shape() {
        let point = GeometryOut::from(&NormalizedGeometry::Point(Coord { x: 36.0, y: 48.5 }));
        let json = serde_json::to_value(&point).unwrap();
        assert_eq!(json["type"], "Point");
        assert_eq!(json["coordinates"][0], 36.0);
        assert_eq!(json["coordinates"][1], 48.5);
    }

    #[test]
    fn test_frontline_palette_overrides_markup_style() {
        let f = feature(
            "North",
            LayerTag::Frontline,
            Allegiance::Neutral,
            NormalizedGeometry::LineString(vec![
                Coord { x: 36.0, y: 49.0 },
                Coord { x: 37.0, y: 49.1 },
            ]),
        );
        let style = display_style(&f);
        assert_eq!(style.color, palette::FRONT);
        assert!(!style.dashed);
    }

    #[test]
    fn test_axis_styles_by_allegiance() {
        let line = NormalizedGeometry::LineString(vec![
            Coord { x: 36.0, y: 49.0 },
            Coord { x: 37.0, y: 49.1 },
        ]);
        let ua = display_style(&feature("a", LayerTag::Axis, Allegiance::Ua, line.clone()));
        assert_eq!(ua.color, palette::UA_LINE);
        assert!(ua.dashed);

        let hist = display_style(&feature(
            "b",
            LayerTag::Axis,
            Allegiance::Historic,
            line,
        ));
        assert_eq!(hist.color, palette::HIST_LINE);
        assert!((hist.weight - 2.3).abs() < f64::EPSILON);
    }

    #[test]
    fn test_control_area_gets_fill() {
        let f = feature(
            "zone",
            LayerTag::ControlArea,
            Allegiance::Ru,
            NormalizedGeometry::Polygon(vec![
                Coord { x: 37.0, y: 47.0 },
                Coord { x: 38.0, y: 47.0 },
                Coord { x: 38.0, y: 48.0 },
                Coord { x: 37.0, y: 47.0 },
            ]),
        );
        let style = display_style(&f);
        assert_eq!(style.fill_color.as_deref(), Some(palette::RU_FILL));
        assert_eq!(style.fill_opacity, Some(0.28));
    }

    #[test]
    fn test_unit_markers_carry_icon() {
        let mut f = feature(
            "92nd",
            LayerTag::UaUnit,
            Allegiance::Ua,
            NormalizedGeometry::Point(Coord { x: 36.0, y: 48.5 }),
        );
        f.style.icon = Some("ukr_infantry.png".to_string());
        let style = display_style(&f);
        assert_eq!(style.icon.as_deref(), Some("ukr_infantry.png"));
        assert_eq!(style.color, palette::UA_LINE);
    }

    #[test]
    fn test_assemble_manifest_and_viewport() {
        let output = output_with(vec![
            feature(
                "North",
                LayerTag::Frontline,
                Allegiance::Neutral,
                NormalizedGeometry::LineString(vec![
                    Coord { x: 36.0, y: 49.0 },
                    Coord { x: 38.0, y: 50.0 },
                ]),
            ),
            // Hidden layer must not influence the viewport
            feature(
                "far away",
                LayerTag::Other,
                Allegiance::Neutral,
                NormalizedGeometry::Point(Coord { x: -120.0, y: 10.0 }),
            ),
        ]);
        let artifact = assemble(&output, None, None);

        assert_eq!(artifact.manifest.len(), artifact.layers.len());
        let frontline = artifact
            .manifest
            .iter()
            .find(|m| m.id == "frontline")
            .unwrap();
        assert_eq!(frontline.feature_count, 1);
        assert!(frontline.default_visible);

        let bounds = artifact.viewport.bounds.unwrap();
        assert_eq!(bounds, [[36.0, 49.0], [38.0, 50.0]]);
        assert_eq!(artifact.viewport.center, [37.0, 49.5]);
    }

    #[test]
    fn test_assemble_empty_output_uses_default_viewport() {
        let output = output_with(vec![]);
        let artifact = assemble(&output, None, None);
        assert_eq!(artifact.viewport.center, DEFAULT_CENTER);
        assert!(artifact.viewport.bounds.is_none());
    }

    #[test]
    fn test_artifact_serializes() {
        let output = output_with(vec![feature(
            "North",
            LayerTag::Frontline,
            Allegiance::Neutral,
            NormalizedGeometry::LineString(vec![
                Coord { x: 36.0, y: 49.0 },
                Coord { x: 37.0, y: 49.1 },
            ]),
        )]);
        let artifact = assemble(&output, None, None);
        let json = serde_json::to_value(&artifact).unwrap();
        assert!(json["manifest"].is_array());
        assert!(json["layers"].is_array());
        assert!(json.get("events").is_none());
    }
}
