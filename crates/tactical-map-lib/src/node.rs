//! Source-tree node types
//!
//! `RawNode` is the in-memory form of the markup document's folder/placemark
//! hierarchy, produced by an external parser. The tree is built once per run,
//! read-only during traversal, and dropped after classification. Coordinate
//! data is carried as verbatim text so the geometry normalizer owns tuple
//! parsing and malformed-input tolerance.

use crate::style::StyleDefinition;

/// A folder or placemark from the source markup tree
#[derive(Debug, Clone)]
pub struct RawNode {
    /// Element name; absent names are common in hand-edited documents
    pub name: Option<String>,
    /// Extended key/value metadata attached to the element
    pub metadata: Vec<(String, String)>,
    pub kind: RawNodeKind,
}

/// The two node shapes the source format allows
#[derive(Debug, Clone)]
pub enum RawNodeKind {
    Folder {
        /// Ordered child nodes (folders and placemarks interleaved)
        children: Vec<RawNode>,
    },
    Placemark {
        geometry: Option<RawGeometry>,
        /// Reference to a shared style or style-map (`#id` or `id`)
        style_url: Option<String>,
        /// Style embedded directly on the placemark; wins over `style_url`
        inline_style: Option<StyleDefinition>,
    },
}

/// Geometry as it appears in the markup: a kind marker plus raw coordinate
/// text, not yet parsed into numbers
#[derive(Debug, Clone)]
pub enum RawGeometry {
    Point { coordinates: String },
    LineString { coordinates: String },
    /// Outer boundary ring only; the source's inner rings are not rendered
    Polygon { outer: String },
    Multi { parts: Vec<RawGeometry> },
    /// A geometry element the pipeline does not understand (3D models,
    /// tracks); classified as Other with empty geometry
    Unknown { kind: String },
}

/// Discriminant used by the classifier's geometry-kind fallback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    Point,
    Line,
    Polygon,
    Multi,
    Unknown,
}

impl RawNode {
    /// Create a folder node
    pub fn folder(name: impl Into<String>, children: Vec<RawNode>) -> Self {
        Self {
            name: Some(name.into()),
            metadata: Vec::new(),
            kind: RawNodeKind::Folder { children },
        }
    }

    /// Create a placemark node with a shared-style reference
    pub fn placemark(
        name: impl Into<String>,
        geometry: Option<RawGeometry>,
        style_url: Option<String>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            metadata: Vec::new(),
            kind: RawNodeKind::Placemark {
                geometry,
                style_url,
                inline_style: None,
            },
        }
    }

    #[inline]
    pub fn is_folder(&self) -> bool {
        matches!(self.kind, RawNodeKind::Folder { .. })
    }

    /// Node name, or a placeholder for unnamed elements
    #[inline]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }

    /// Total placemarks in this subtree, including this node
    pub fn placemark_count(&self) -> usize {
        match &self.kind {
            RawNodeKind::Placemark { .. } => 1,
            RawNodeKind::Folder { children } => {
                children.iter().map(RawNode::placemark_count).sum()
            }
        }
    }

    /// Collect up to `limit` placemark names from this subtree, in document
    /// order
    pub fn sample_placemark_names(&self, limit: usize) -> Vec<String> {
        let mut samples = Vec::new();
        self.collect_samples(limit, &mut samples);
        samples
    }

    fn collect_samples(&self, limit: usize, out: &mut Vec<String>) {
        if out.len() >= limit {
            return;
        }
        match &self.kind {
            RawNodeKind::Placemark { .. } => out.push(self.display_name().to_string()),
            RawNodeKind::Folder { children } => {
                for child in children {
                    child.collect_samples(limit, out);
                    if out.len() >= limit {
                        break;
                    }
                }
            }
        }
    }
}

impl RawGeometry {
    #[inline]
    pub fn kind(&self) -> GeometryKind {
        match self {
            RawGeometry::Point { .. } => GeometryKind::Point,
            RawGeometry::LineString { .. } => GeometryKind::Line,
            RawGeometry::Polygon { .. } => GeometryKind::Polygon,
            RawGeometry::Multi { .. } => GeometryKind::Multi,
            RawGeometry::Unknown { .. } => GeometryKind::Unknown,
        }
    }
}
