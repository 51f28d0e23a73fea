//! Geometry normalization
//!
//! Converts raw coordinate text blocks into [`NormalizedGeometry`], the
//! uniform 2D representation the rest of the pipeline works with. Coordinate
//! tuples are whitespace-delimited `lon,lat[,alt]` triples; altitude is
//! discarded. A malformed tuple anywhere in a feature's geometry drops that
//! feature's geometry as a whole; the caller records the warning and the
//! pass continues.

use crate::node::RawGeometry;
use geo::{Coord, Rect};

/// Why a geometry block failed normalization
///
/// These are warning-level: they never abort a pass.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("non-numeric tuple \"{0}\"")]
    BadTuple(String),

    #[error("tuple \"{0}\" has wrong arity (expected lon,lat or lon,lat,alt)")]
    BadArity(String),

    #[error("{kind} needs at least {needed} points, got {got}")]
    TooFewPoints {
        kind: &'static str,
        needed: usize,
        got: usize,
    },
}

/// Uniform 2D geometry: every leaf is an ordered sequence of
/// (longitude, latitude) coordinates, longitude first
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedGeometry {
    Point(Coord<f64>),
    /// Invariant: at least 2 coordinates
    LineString(Vec<Coord<f64>>),
    /// Outer ring only. Invariant: at least 4 coordinates, first == last
    Polygon(Vec<Coord<f64>>),
    Multi(Vec<NormalizedGeometry>),
}

impl NormalizedGeometry {
    /// An empty geometry, used for placemarks whose geometry kind is unknown
    pub fn empty() -> Self {
        NormalizedGeometry::Multi(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            NormalizedGeometry::Multi(parts) => parts.iter().all(NormalizedGeometry::is_empty),
            _ => false,
        }
    }

    /// Total number of coordinates across all leaves
    pub fn coordinate_count(&self) -> usize {
        match self {
            NormalizedGeometry::Point(_) => 1,
            NormalizedGeometry::LineString(coords) | NormalizedGeometry::Polygon(coords) => {
                coords.len()
            }
            NormalizedGeometry::Multi(parts) => {
                parts.iter().map(NormalizedGeometry::coordinate_count).sum()
            }
        }
    }

    /// Axis-aligned bounding box in (lon, lat) degrees, `None` when empty
    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        let mut min = Coord {
            x: f64::INFINITY,
            y: f64::INFINITY,
        };
        let mut max = Coord {
            x: f64::NEG_INFINITY,
            y: f64::NEG_INFINITY,
        };
        let mut any = false;
        self.fold_coords(&mut |c| {
            min.x = min.x.min(c.x);
            min.y = min.y.min(c.y);
            max.x = max.x.max(c.x);
            max.y = max.y.max(c.y);
            any = true;
        });
        any.then(|| Rect::new(min, max))
    }

    fn fold_coords(&self, f: &mut impl FnMut(Coord<f64>)) {
        match self {
            NormalizedGeometry::Point(c) => f(*c),
            NormalizedGeometry::LineString(coords) | NormalizedGeometry::Polygon(coords) => {
                coords.iter().copied().for_each(f)
            }
            NormalizedGeometry::Multi(parts) => {
                parts.iter().for_each(|p| p.fold_coords(f));
            }
        }
    }
}

/// Normalize one raw geometry block
///
/// Unknown kinds yield an empty geometry rather than an error; the classifier
/// sends those features to the Other layer.
pub fn normalize(raw: &RawGeometry) -> Result<NormalizedGeometry, GeometryError> {
    match raw {
        RawGeometry::Point { coordinates } => {
            let coords = parse_coordinates(coordinates)?;
            let first = *coords.first().ok_or(GeometryError::TooFewPoints {
                kind: "point",
                needed: 1,
                got: 0,
            })?;
            // Extra tuples in a point block are ignored
            Ok(NormalizedGeometry::Point(first))
        }
        RawGeometry::LineString { coordinates } => {
            let coords = parse_coordinates(coordinates)?;
            if coords.len() < 2 {
                return Err(GeometryError::TooFewPoints {
                    kind: "line-string",
                    needed: 2,
                    got: coords.len(),
                });
            }
            Ok(NormalizedGeometry::LineString(coords))
        }
        RawGeometry::Polygon { outer } => {
            let mut coords = parse_coordinates(outer)?;
            // Rings must close; well-formed input already repeats the first
            // coordinate, hand-edited input often does not
            if coords.first() != coords.last() {
                if let Some(first) = coords.first().copied() {
                    coords.push(first);
                }
            }
            if coords.len() < 4 {
                return Err(GeometryError::TooFewPoints {
                    kind: "polygon ring",
                    needed: 4,
                    got: coords.len(),
                });
            }
            Ok(NormalizedGeometry::Polygon(coords))
        }
        RawGeometry::Multi { parts } => {
            let normalized = parts
                .iter()
                .map(normalize)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(NormalizedGeometry::Multi(normalized))
        }
        RawGeometry::Unknown { kind } => {
            tracing::debug!("unknown geometry kind \"{kind}\", emitting empty geometry");
            Ok(NormalizedGeometry::empty())
        }
    }
}

/// Parse a whitespace-delimited block of `lon,lat[,alt]` tuples
fn parse_coordinates(text: &str) -> Result<Vec<Coord<f64>>, GeometryError> {
    text.split_whitespace()
        .map(|tuple| {
            let mut fields = tuple.split(',');
            let lon = fields.next();
            let lat = fields.next();
            let _alt = fields.next();
            if fields.next().is_some() {
                return Err(GeometryError::BadArity(tuple.to_string()));
            }
            match (lon, lat) {
                (Some(lon), Some(lat)) => {
                    let lon: f64 = lon
                        .trim()
                        .parse()
                        .map_err(|_| GeometryError::BadTuple(tuple.to_string()))?;
                    let lat: f64 = lat
                        .trim()
                        .parse()
                        .map_err(|_| GeometryError::BadTuple(tuple.to_string()))?;
                    Ok(Coord { x: lon, y: lat })
                }
                _ => Err(GeometryError::BadArity(tuple.to_string())),
            }
        })
        .collect()
}
