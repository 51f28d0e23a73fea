//! Heuristic feature classification
//!
//! Every surviving feature is assigned exactly one [`LayerTag`] by an ordered
//! list of predicates; the first match wins. The ordering is a correctness
//! contract (folder path beats icon, icon beats name keywords, name keywords
//! beat the geometry-kind fallback) and is pinned by the tests below.

use crate::node::GeometryKind;
use crate::style::ResolvedStyle;

/// Semantic layer assignment for one feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerTag {
    Frontline,
    ControlArea,
    Axis,
    UaUnit,
    RuUnit,
    Border,
    Other,
}

/// Side/era marker recovered from name and folder heuristics
///
/// Orthogonal to [`LayerTag`]: it selects palettes and splits the axis and
/// border layers, it never decides which rule matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Allegiance {
    Ua,
    Ru,
    Historic,
    Neutral,
}

/// Everything the classifier is allowed to look at for one feature
#[derive(Debug, Clone, Copy)]
pub struct FeatureContext<'a> {
    pub name: &'a str,
    /// Ancestor folder names, outermost first
    pub folder_path: &'a [String],
    pub style: &'a ResolvedStyle,
    pub geometry: Option<GeometryKind>,
}

/// One predicate in the ordered rule list
struct Rule {
    name: &'static str,
    check: fn(&FeatureContext) -> Option<LayerTag>,
}

/// Ordered-predicate classifier
///
/// A pure function of the feature context: identical inputs always yield the
/// identical tag.
pub struct Classifier {
    rules: Vec<Rule>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            rules: vec![
                Rule {
                    name: "folder-path",
                    check: match_folder_path,
                },
                Rule {
                    name: "icon",
                    check: match_icon,
                },
                Rule {
                    name: "name-keyword",
                    check: match_name_keywords,
                },
                Rule {
                    name: "geometry-kind",
                    check: match_geometry_kind,
                },
            ],
        }
    }
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a layer tag; features matching no rule land in Other
    pub fn classify(&self, ctx: &FeatureContext) -> LayerTag {
        for rule in &self.rules {
            if let Some(tag) = (rule.check)(ctx) {
                tracing::trace!("\"{}\" classified {:?} by rule {}", ctx.name, tag, rule.name);
                return tag;
            }
        }
        LayerTag::Other
    }
}

/// Known layer folder names: matched against each path segment, deepest
/// ancestor first, by exact match or prefix
const FOLDER_TABLE: &[(&str, LayerTag)] = &[
    ("frontline", LayerTag::Frontline),
    ("front line", LayerTag::Frontline),
    ("ukrainian unit positions", LayerTag::UaUnit),
    ("russian unit positions", LayerTag::RuUnit),
    ("important areas", LayerTag::ControlArea),
    ("axis", LayerTag::Axis),
    ("axes", LayerTag::Axis),
    ("border", LayerTag::Border),
];

fn match_folder_path(ctx: &FeatureContext) -> Option<LayerTag> {
    for segment in ctx.folder_path.iter().rev() {
        let segment = segment.to_lowercase();
        for (pattern, tag) in FOLDER_TABLE {
            if segment == *pattern || segment.starts_with(pattern) {
                return Some(*tag);
            }
        }
    }
    None
}

/// Curated icon basename fragments implying a layer
const ICON_TABLE: &[(&str, LayerTag)] = &[
    ("ukr", LayerTag::UaUnit),
    ("ua_", LayerTag::UaUnit),
    ("ua-", LayerTag::UaUnit),
    ("rus", LayerTag::RuUnit),
    ("ru_", LayerTag::RuUnit),
    ("ru-", LayerTag::RuUnit),
    ("front", LayerTag::Frontline),
    ("axis", LayerTag::Axis),
];

fn match_icon(ctx: &FeatureContext) -> Option<LayerTag> {
    let icon = ctx.style.icon.as_deref()?.to_lowercase();
    ICON_TABLE
        .iter()
        .find(|(fragment, _)| icon.contains(fragment))
        .map(|(_, tag)| *tag)
}

fn match_name_keywords(ctx: &FeatureContext) -> Option<LayerTag> {
    let name = ctx.name.to_lowercase();
    if name.contains("front line") || name.contains("frontline") {
        return Some(LayerTag::Frontline);
    }
    if name.contains("axis") || name.contains("offensive") || name.contains("counterattack") {
        return Some(LayerTag::Axis);
    }
    if name.contains("border") {
        return Some(LayerTag::Border);
    }
    // Side markers last within this family: "Ukrainian Kherson
    // Counterattack" is an axis, not a unit
    if name.contains("ukrainian") {
        return Some(LayerTag::UaUnit);
    }
    if name.contains("russian") {
        return Some(LayerTag::RuUnit);
    }
    None
}

fn match_geometry_kind(ctx: &FeatureContext) -> Option<LayerTag> {
    match ctx.geometry {
        Some(GeometryKind::Polygon) => Some(LayerTag::ControlArea),
        Some(GeometryKind::Line) => Some(LayerTag::Axis),
        _ => None,
    }
}

/// Side/era heuristics over feature name and folder path
pub fn allegiance(name: &str, folder_path: &[String]) -> Allegiance {
    let name = name.to_lowercase();
    let in_folder = |keyword: &str| {
        folder_path
            .iter()
            .any(|segment| segment.to_lowercase().contains(keyword))
    };

    // Historic / initial-invasion era
    if name.contains("initial invasion")
        || (name.contains("initial") && name.contains("invasion"))
        || (name.contains("2022") && (name.contains("axis") || name.contains("offensive")))
    {
        return Allegiance::Historic;
    }

    if name.contains("ukrainian") || in_folder("ukrainian") || name.contains("kherson counterattack")
    {
        return Allegiance::Ua;
    }

    if name.contains("russian") || in_folder("russian") {
        return Allegiance::Ru;
    }
    // Occupied/controlled areas default to the occupying side
    if in_folder("important areas") {
        return Allegiance::Ru;
    }

    Allegiance::Neutral
}
