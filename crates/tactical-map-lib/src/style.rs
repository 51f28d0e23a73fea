//! Style definitions and resolution
//!
//! Shared styles are referenced by id; style-maps add one level of
//! indirection that selects between interaction states. Resolution always
//! lands on exactly one [`ResolvedStyle`]: inline style wins over a shared
//! reference, a style-map resolves through its "normal" state, and anything
//! unresolvable falls back to the default style with a warning.

use std::collections::HashMap;

/// Fallback color for undecodable markup colors
const FALLBACK_COLOR: &str = "#FF0000";

/// A partial style as defined in the markup (shared or inline)
///
/// Missing fields are completed from the default style at resolution time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleDefinition {
    /// Icon reference, reduced to its basename
    pub icon: Option<String>,
    /// Stroke color as `#rrggbb`
    pub line_color: Option<String>,
    /// Fill color as `#rrggbb`
    pub fill_color: Option<String>,
    pub width: Option<f64>,
}

/// A fully resolved per-feature style; every field populated
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStyle {
    pub icon: Option<String>,
    pub line_color: String,
    pub fill_color: String,
    pub width: f64,
}

impl Default for ResolvedStyle {
    fn default() -> Self {
        Self {
            icon: None,
            line_color: "#888888".to_string(),
            fill_color: "#2F2F2F".to_string(),
            width: 2.0,
        }
    }
}

impl ResolvedStyle {
    /// Complete a partial definition field-by-field from a default style
    pub fn from_definition(def: &StyleDefinition, default: &ResolvedStyle) -> Self {
        Self {
            icon: def.icon.clone().or_else(|| default.icon.clone()),
            line_color: def
                .line_color
                .clone()
                .unwrap_or_else(|| default.line_color.clone()),
            fill_color: def
                .fill_color
                .clone()
                .unwrap_or_else(|| default.fill_color.clone()),
            width: def.width.unwrap_or(default.width),
        }
    }
}

/// Shared style definitions and style-map indirections, keyed by id
///
/// Ids are stored without the `#` reference prefix; lookups accept both
/// forms.
#[derive(Debug, Clone, Default)]
pub struct StyleTable {
    styles: HashMap<String, StyleDefinition>,
    /// style-map id -> "normal" state's target id
    maps: HashMap<String, String>,
}

impl StyleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_style(&mut self, id: impl Into<String>, def: StyleDefinition) {
        self.styles.insert(strip_ref(&id.into()).to_string(), def);
    }

    /// Register a style-map's "normal" state target
    pub fn insert_map(&mut self, id: impl Into<String>, normal_target: impl Into<String>) {
        self.maps.insert(
            strip_ref(&id.into()).to_string(),
            strip_ref(&normal_target.into()).to_string(),
        );
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty() && self.maps.is_empty()
    }

    /// Follow a style reference to its terminal definition
    ///
    /// At most one style-map indirection is followed; a style-map whose
    /// normal state points at another style-map resolves to `None` (fail
    /// safe) rather than looping.
    pub fn resolve(&self, style_url: &str) -> Option<&StyleDefinition> {
        let id = strip_ref(style_url);
        let target = match self.maps.get(id) {
            Some(inner) => {
                if self.maps.contains_key(inner.as_str()) {
                    // Style-map-of-style-map: unsupported by design
                    return None;
                }
                inner.as_str()
            }
            None => id,
        };
        self.styles.get(target)
    }
}

#[inline]
fn strip_ref(style_url: &str) -> &str {
    style_url.trim().trim_start_matches('#')
}

/// Decode a markup `aabbggrr` hex color to HTML `#rrggbb`, dropping alpha
///
/// Undecodable input falls back to `#FF0000`.
pub fn kml_color_to_html(kml_color: &str) -> String {
    let clean = kml_color.trim().trim_start_matches('#');
    let clean = if clean.len() == 8 { &clean[2..] } else { clean };
    if clean.len() != 6 || !clean.bytes().all(|b| b.is_ascii_hexdigit()) {
        return FALLBACK_COLOR.to_string();
    }
    // bbggrr -> rrggbb
    format!("#{}{}{}", &clean[4..6], &clean[2..4], &clean[0..2])
}
