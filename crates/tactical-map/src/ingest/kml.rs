//! KML interpretation
//!
//! Turns the generic XML tree of a tactical overlay document into the
//! pipeline's inputs: the `RawNode` folder/placemark tree and the shared
//! `StyleTable`. Geometry coordinate text is passed through untouched;
//! colors are decoded from the markup's `aabbggrr` convention here so the
//! pipeline only ever sees HTML colors.

use super::xml::XmlNode;
use anyhow::{Context, Result};
use tactical_map_lib::{
    RawGeometry, RawNode, RawNodeKind, StyleDefinition, StyleTable, kml_color_to_html,
};

/// Geometry element names the pipeline understands
const GEOMETRY_TAGS: &[&str] = &["Point", "LineString", "LinearRing", "Polygon", "MultiGeometry"];
/// Geometry element names recognized but not renderable in 2D
const UNSUPPORTED_GEOMETRY_TAGS: &[&str] = &["Model", "Track", "MultiTrack"];

/// Interpret a parsed document: the folder tree plus the style table
pub fn interpret(root: &XmlNode) -> Result<(RawNode, StyleTable)> {
    let document = if root.name == "Document" {
        root
    } else {
        root.child("Document")
            .context("markup has no Document element")?
    };

    let styles = collect_styles(root);
    let tree = folder_node(document);
    Ok((tree, styles))
}

fn folder_node(xml: &XmlNode) -> RawNode {
    let children = xml
        .children
        .iter()
        .filter_map(|child| match child.name.as_str() {
            "Folder" => Some(folder_node(child)),
            "Placemark" => Some(placemark_node(child)),
            _ => None,
        })
        .collect();

    RawNode {
        name: xml.child_text("name").map(str::to_string),
        metadata: extended_data(xml),
        kind: RawNodeKind::Folder { children },
    }
}

fn placemark_node(xml: &XmlNode) -> RawNode {
    let geometry = xml.children.iter().find_map(raw_geometry);

    RawNode {
        name: xml.child_text("name").map(str::to_string),
        metadata: extended_data(xml),
        kind: RawNodeKind::Placemark {
            geometry,
            style_url: xml.child_text("styleUrl").map(str::to_string),
            inline_style: xml.child("Style").map(style_definition),
        },
    }
}

fn raw_geometry(xml: &XmlNode) -> Option<RawGeometry> {
    if UNSUPPORTED_GEOMETRY_TAGS.contains(&xml.name.as_str()) {
        return Some(RawGeometry::Unknown {
            kind: xml.name.clone(),
        });
    }
    if !GEOMETRY_TAGS.contains(&xml.name.as_str()) {
        return None;
    }
    Some(match xml.name.as_str() {
        "Point" => RawGeometry::Point {
            coordinates: coordinates_text(xml),
        },
        "LineString" => RawGeometry::LineString {
            coordinates: coordinates_text(xml),
        },
        // A bare ring renders like a polygon outline
        "LinearRing" => RawGeometry::Polygon {
            outer: coordinates_text(xml),
        },
        "Polygon" => RawGeometry::Polygon {
            outer: xml
                .child("outerBoundaryIs")
                .and_then(|outer| outer.find_first("coordinates"))
                .or_else(|| xml.find_first("coordinates"))
                .map(|c| c.text.trim().to_string())
                .unwrap_or_default(),
        },
        "MultiGeometry" => RawGeometry::Multi {
            parts: xml.children.iter().filter_map(raw_geometry).collect(),
        },
        _ => unreachable!("filtered above"),
    })
}

fn coordinates_text(xml: &XmlNode) -> String {
    xml.find_first("coordinates")
        .map(|c| c.text.trim().to_string())
        .unwrap_or_default()
}

fn extended_data(xml: &XmlNode) -> Vec<(String, String)> {
    let Some(extended) = xml.child("ExtendedData") else {
        return Vec::new();
    };
    extended
        .children_named("Data")
        .filter_map(|data| {
            let key = data.attrs.get("name")?.clone();
            let value = data.child_text("value").unwrap_or_default().to_string();
            Some((key, value))
        })
        .collect()
}

/// Collect every shared `Style` and `StyleMap` in the document
fn collect_styles(root: &XmlNode) -> StyleTable {
    let mut table = StyleTable::new();
    root.for_each_descendant(&mut |node| match node.name.as_str() {
        "Style" => {
            if let Some(id) = node.attrs.get("id") {
                table.insert_style(id.clone(), style_definition(node));
            }
        }
        "StyleMap" => {
            if let Some(id) = node.attrs.get("id") {
                if let Some(target) = style_map_normal_target(node) {
                    table.insert_map(id.clone(), target);
                }
            }
        }
        _ => {}
    });
    table
}

fn style_definition(xml: &XmlNode) -> StyleDefinition {
    let icon = xml
        .find_first("IconStyle")
        .and_then(|icon| icon.find_first("href"))
        .map(|href| basename(href.text.trim()))
        .filter(|name| !name.is_empty());

    let line = xml.child("LineStyle");
    let line_color = line
        .and_then(|l| l.child_text("color"))
        .map(kml_color_to_html);
    let width = line
        .and_then(|l| l.child_text("width"))
        .and_then(|w| w.parse().ok());

    let fill_color = xml
        .child("PolyStyle")
        .and_then(|p| p.child_text("color"))
        .map(kml_color_to_html);

    StyleDefinition {
        icon,
        line_color,
        fill_color,
        width,
    }
}

/// The `styleUrl` of a style-map's "normal" pair
fn style_map_normal_target(xml: &XmlNode) -> Option<String> {
    xml.children_named("Pair")
        .find(|pair| pair.child_text("key") == Some("normal"))
        .and_then(|pair| pair.child_text("styleUrl"))
        .map(str::to_string)
}

/// Final path segment of an icon reference
fn basename(href: &str) -> String {
    href.rsplit(['/', '\\']).next().unwrap_or(href).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::xml;
    use tactical_map_lib::GeometryKind;

    const SAMPLE: &str = r#"
    <kml xmlns="http://www.opengis.net/kml/2.2">
      <Document>
        <name>overlay</name>
        <Style id="uaUnit">
          <IconStyle><Icon><href>files/ukr_infantry.png</href></Icon></IconStyle>
        </Style>
        <Style id="frontNormal">
          <LineStyle><color>ffEDEDED</color><width>2.7</width></LineStyle>
          <PolyStyle><color>7f0a0a4a</color></PolyStyle>
        </Style>
        <StyleMap id="frontMap">
          <Pair><key>normal</key><styleUrl>#frontNormal</styleUrl></Pair>
          <Pair><key>highlight</key><styleUrl>#frontHighlight</styleUrl></Pair>
        </StyleMap>
        <Folder>
          <name>Frontline</name>
          <Placemark>
            <name>North segment</name>
            <styleUrl>#frontMap</styleUrl>
            <LineString>
              <coordinates>36.0,49.0,0 36.5,49.2,0</coordinates>
            </LineString>
          </Placemark>
          <Placemark>
            <name>Strongpoint</name>
            <Point><coordinates>36.2,49.1,0</coordinates></Point>
            <ExtendedData>
              <Data name="unit"><value>92nd</value></Data>
            </ExtendedData>
          </Placemark>
          <Placemark>
            <name>Pocket</name>
            <Polygon>
              <outerBoundaryIs><LinearRing>
                <coordinates>36.0,49.0 36.2,49.0 36.2,49.2 36.0,49.0</coordinates>
              </LinearRing></outerBoundaryIs>
              <innerBoundaryIs><LinearRing>
                <coordinates>36.1,49.05 36.15,49.05 36.15,49.1 36.1,49.05</coordinates>
              </LinearRing></innerBoundaryIs>
            </Polygon>
          </Placemark>
        </Folder>
      </Document>
    </kml>"#;

    fn interpret_sample() -> (RawNode, StyleTable) {
        let root = xml::parse(SAMPLE).unwrap();
        interpret(&root).unwrap()
    }

    #[test]
    fn test_tree_shape() {
        let (tree, _) = interpret_sample();
        assert!(tree.is_folder());
        assert_eq!(tree.name.as_deref(), Some("overlay"));
        let RawNodeKind::Folder { children } = &tree.kind else {
            unreachable!()
        };
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name.as_deref(), Some("Frontline"));
        assert_eq!(children[0].placemark_count(), 3);
    }

    #[test]
    fn test_style_table() {
        let (_, styles) = interpret_sample();
        let front = styles.resolve("#frontMap").unwrap();
        assert_eq!(front.line_color.as_deref(), Some("#EDEDED"));
        assert_eq!(front.width, Some(2.7));
        assert_eq!(front.fill_color.as_deref(), Some("#4a0a0a"));

        let unit = styles.resolve("#uaUnit").unwrap();
        assert_eq!(unit.icon.as_deref(), Some("ukr_infantry.png"));
    }

    #[test]
    fn test_polygon_uses_outer_ring_only() {
        let (tree, _) = interpret_sample();
        let RawNodeKind::Folder { children } = &tree.kind else {
            unreachable!()
        };
        let RawNodeKind::Folder { children: marks } = &children[0].kind else {
            unreachable!()
        };
        let RawNodeKind::Placemark {
            geometry: Some(geometry),
            ..
        } = &marks[2].kind
        else {
            panic!("expected polygon placemark");
        };
        assert_eq!(geometry.kind(), GeometryKind::Polygon);
        let RawGeometry::Polygon { outer } = geometry else {
            unreachable!()
        };
        assert!(outer.starts_with("36.0,49.0"));
        assert!(!outer.contains("36.15"));
    }

    #[test]
    fn test_extended_data_captured() {
        let (tree, _) = interpret_sample();
        let RawNodeKind::Folder { children } = &tree.kind else {
            unreachable!()
        };
        let RawNodeKind::Folder { children: marks } = &children[0].kind else {
            unreachable!()
        };
        assert_eq!(
            marks[1].metadata,
            vec![("unit".to_string(), "92nd".to_string())]
        );
    }

    #[test]
    fn test_unsupported_geometry_is_unknown() {
        let root = xml::parse(
            r#"<Document><Folder><name>F</name><Placemark>
                 <name>model</name><Model><Link><href>x.dae</href></Link></Model>
               </Placemark></Folder></Document>"#,
        )
        .unwrap();
        let (tree, _) = interpret(&root).unwrap();
        let RawNodeKind::Folder { children } = &tree.kind else {
            unreachable!()
        };
        let RawNodeKind::Folder { children: marks } = &children[0].kind else {
            unreachable!()
        };
        let RawNodeKind::Placemark {
            geometry: Some(RawGeometry::Unknown { kind }),
            ..
        } = &marks[0].kind
        else {
            panic!("expected unknown geometry");
        };
        assert_eq!(kind, "Model");
    }

    #[test]
    fn test_inline_style_captured() {
        let root = xml::parse(
            r#"<Document><Folder><name>F</name><Placemark>
                 <name>styled</name>
                 <Style><LineStyle><color>ff4a4ae2</color></LineStyle></Style>
                 <Point><coordinates>36.0,48.5</coordinates></Point>
               </Placemark></Folder></Document>"#,
        )
        .unwrap();
        let (tree, _) = interpret(&root).unwrap();
        let RawNodeKind::Folder { children } = &tree.kind else {
            unreachable!()
        };
        let RawNodeKind::Folder { children: marks } = &children[0].kind else {
            unreachable!()
        };
        let RawNodeKind::Placemark {
            inline_style: Some(style),
            ..
        } = &marks[0].kind
        else {
            panic!("expected inline style");
        };
        assert_eq!(style.line_color.as_deref(), Some("#e24a4a"));
    }
}
