//! Country border overlays
//!
//! Reads a Natural-Earth-style countries GeoJSON, selects countries by ISO-3
//! code or by name, and turns their polygon rings into border line features
//! the aggregator routes to the `ua-border` / `ru-border` layers.

use anyhow::{Context, Result};
use geojson::{Feature, GeoJson, Value as GjValue};
use tactical_map_lib::{Allegiance, ClassifiedFeature, LayerTag, NormalizedGeometry, ResolvedStyle};

/// Property keys that may carry an ISO-3 code, checked case-insensitively
const ISO_KEYS: &[&str] = &["iso_a3", "adm0_a3", "sov_a3"];
/// Property keys that may carry a country name
const NAME_KEYS: &[&str] = &["admin", "name", "sovereignt"];

/// A border overlay to extract
pub struct BorderSpec {
    /// ISO-3 code or country name fragment
    pub query: &'static str,
    /// Feature name in the output layer
    pub label: &'static str,
    pub allegiance: Allegiance,
}

/// The two borders the map always tries to draw
pub fn default_border_specs() -> Vec<BorderSpec> {
    vec![
        BorderSpec {
            query: "UKR",
            label: "Ukraine border",
            allegiance: Allegiance::Ua,
        },
        BorderSpec {
            query: "RUS",
            label: "Russia border",
            allegiance: Allegiance::Ru,
        },
    ]
}

/// Load border features for the given specs; missing countries are logged
/// and skipped, never fatal
pub fn load(raw: &str, specs: &[BorderSpec]) -> Result<Vec<ClassifiedFeature>> {
    let geojson: GeoJson = raw.parse().context("countries file is not valid GeoJSON")?;
    let GeoJson::FeatureCollection(collection) = geojson else {
        anyhow::bail!("countries file is not a FeatureCollection");
    };

    let mut borders = Vec::new();
    for spec in specs {
        let Some(feature) = select_country(&collection.features, spec.query) else {
            tracing::warn!("country \"{}\" not found in borders file", spec.query);
            continue;
        };
        let Some(geometry) = border_rings(feature) else {
            tracing::warn!("country \"{}\" has no polygon geometry", spec.query);
            continue;
        };
        borders.push(ClassifiedFeature {
            name: spec.label.to_string(),
            tag: LayerTag::Border,
            allegiance: spec.allegiance,
            geometry,
            style: ResolvedStyle::default(),
        });
    }
    Ok(borders)
}

/// Find a country by ISO-3 code (exact) or name (substring)
fn select_country<'a>(features: &'a [Feature], query: &str) -> Option<&'a Feature> {
    let is_code = query.len() == 3 && query.chars().all(|c| c.is_ascii_uppercase());
    features.iter().find(|feature| {
        if is_code {
            ISO_KEYS
                .iter()
                .any(|key| property_str(feature, key).is_some_and(|v| v == query))
        } else {
            let query = query.to_lowercase();
            NAME_KEYS.iter().any(|key| {
                property_str(feature, key).is_some_and(|v| v.to_lowercase().contains(&query))
            })
        }
    })
}

/// Case-insensitive property lookup
fn property_str<'a>(feature: &'a Feature, key: &str) -> Option<&'a str> {
    let properties = feature.properties.as_ref()?;
    properties
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .and_then(|(_, v)| v.as_str())
}

/// Every polygon ring as a closed line-string
fn border_rings(feature: &Feature) -> Option<NormalizedGeometry> {
    let geometry = feature.geometry.as_ref()?;
    let mut rings: Vec<NormalizedGeometry> = Vec::new();

    let mut push_polygon = |polygon: &Vec<Vec<Vec<f64>>>| {
        for ring in polygon {
            let coords: Vec<geo::Coord<f64>> = ring
                .iter()
                .filter(|position| position.len() >= 2)
                .map(|position| geo::Coord {
                    x: position[0],
                    y: position[1],
                })
                .collect();
            if coords.len() >= 2 {
                rings.push(NormalizedGeometry::LineString(coords));
            }
        }
    };

    match &geometry.value {
        GjValue::Polygon(polygon) => push_polygon(polygon),
        GjValue::MultiPolygon(polygons) => polygons.iter().for_each(&mut push_polygon),
        _ => return None,
    }

    (!rings.is_empty()).then_some(NormalizedGeometry::Multi(rings))
}

#[cfg(test)]
mod tests {
    use super::*;

    const COUNTRIES: &str = r#"{
      "type": "FeatureCollection",
      "features": [
        {
          "type": "Feature",
          "properties": { "ADMIN": "Ukraine", "ISO_A3": "UKR" },
          "geometry": {
            "type": "Polygon",
            "coordinates": [[[22.0,48.0],[40.0,48.0],[40.0,52.0],[22.0,48.0]]]
          }
        },
        {
          "type": "Feature",
          "properties": { "ADMIN": "Russia", "ISO_A3": "RUS" },
          "geometry": {
            "type": "MultiPolygon",
            "coordinates": [
              [[[30.0,50.0],[60.0,50.0],[60.0,70.0],[30.0,50.0]]],
              [[[20.0,54.0],[23.0,54.0],[23.0,56.0],[20.0,54.0]]]
            ]
          }
        }
      ]
    }"#;

    #[test]
    fn test_load_default_borders() {
        let borders = load(COUNTRIES, &default_border_specs()).unwrap();
        assert_eq!(borders.len(), 2);

        let ukraine = &borders[0];
        assert_eq!(ukraine.name, "Ukraine border");
        assert_eq!(ukraine.tag, LayerTag::Border);
        assert_eq!(ukraine.allegiance, Allegiance::Ua);
        let NormalizedGeometry::Multi(rings) = &ukraine.geometry else {
            panic!("expected ring collection");
        };
        assert_eq!(rings.len(), 1);

        // Both parts of the multi-polygon become rings
        let NormalizedGeometry::Multi(rings) = &borders[1].geometry else {
            panic!("expected ring collection");
        };
        assert_eq!(rings.len(), 2);
    }

    #[test]
    fn test_select_by_name_fragment() {
        let specs = [BorderSpec {
            query: "ukra",
            label: "Ukraine border",
            allegiance: Allegiance::Ua,
        }];
        let borders = load(COUNTRIES, &specs).unwrap();
        assert_eq!(borders.len(), 1);
    }

    #[test]
    fn test_missing_country_is_skipped() {
        let specs = [BorderSpec {
            query: "XYZ",
            label: "Nowhere border",
            allegiance: Allegiance::Neutral,
        }];
        let borders = load(COUNTRIES, &specs).unwrap();
        assert!(borders.is_empty());
    }

    #[test]
    fn test_not_a_feature_collection_is_an_error() {
        assert!(load(r#"{"type":"Point","coordinates":[0,0]}"#, &[]).is_err());
    }
}
