//! Conflict event dataset adapter
//!
//! The event dataset arrives pre-filtered from an external stage and flows
//! straight through to the UI filter panel; the classifier never touches it.
//! This module parses the shapes the dataset has been observed in (a
//! GeoJSON FeatureCollection, a bare feature list, or raw event records)
//! into typed rows, and derives the metadata block (date range, fatality
//! maxima, count) the filter panel seeds its defaults from.

use crate::{MapError, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Notes are capped well below the popup budget
const NOTES_LIMIT: usize = 600;
/// Summary reuses a shorter slice of the notes
const SUMMARY_NOTES_LIMIT: usize = 240;

/// One conflict incident record
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictEvent {
    pub lon: f64,
    pub lat: f64,
    /// ISO date (`YYYY-MM-DD`), empty when the record carries none
    pub date: String,
    /// Best estimate of total fatalities for this record
    pub best: u64,
    /// Estimated civilian fatalities (subset of `best` when available)
    pub civilian: u64,
    /// Location precision code; lower is more precise, 9 is unknown
    pub precision: u8,
    pub conflict: String,
    pub location: String,
    pub event_type: String,
    pub side_a: String,
    pub side_b: String,
    pub source: String,
    pub notes: String,
    pub summary: String,
}

/// Dataset metadata consumed by the UI filter panel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventsMeta {
    pub min_date: String,
    pub max_date: String,
    pub max_best: u64,
    pub max_civ: u64,
    pub count: usize,
}

/// All events from one dataset file, in source order
#[derive(Debug, Clone, Default)]
pub struct EventCollection {
    pub events: Vec<ConflictEvent>,
}

impl EventCollection {
    /// Parse a dataset in any of its observed shapes
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Object(obj) if obj.get("type").and_then(Value::as_str) == Some("FeatureCollection") => {
                let features = obj
                    .get("features")
                    .and_then(Value::as_array)
                    .ok_or_else(|| {
                        MapError::EventDataset("FeatureCollection without features".to_string())
                    })?;
                Ok(Self::from_features(features))
            }
            Value::Object(obj) => match obj.get("events").and_then(Value::as_array) {
                Some(raw) => Ok(Self::from_raw_events(raw)),
                None => Err(MapError::EventDataset(
                    "object is neither a FeatureCollection nor an event container".to_string(),
                )),
            },
            Value::Array(items) => {
                let looks_like_features = items.first().is_some_and(|first| {
                    first.get("type").and_then(Value::as_str) == Some("Feature")
                        || first.get("geometry").is_some()
                });
                if looks_like_features {
                    Ok(Self::from_features(items))
                } else {
                    Ok(Self::from_raw_events(items))
                }
            }
            _ => Err(MapError::EventDataset(
                "unrecognized dataset shape".to_string(),
            )),
        }
    }

    fn from_features(features: &[Value]) -> Self {
        let events = features
            .par_iter()
            .filter_map(convert_feature)
            .collect();
        Self { events }
    }

    fn from_raw_events(raw: &[Value]) -> Self {
        let events = raw.par_iter().filter_map(convert_raw_event).collect();
        Self { events }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Derive the filter panel's metadata block
    pub fn meta(&self) -> EventsMeta {
        let dates: Vec<&str> = self
            .events
            .iter()
            .map(|e| e.date.as_str())
            .filter(|d| d.len() >= 10)
            .collect();
        EventsMeta {
            min_date: dates.iter().min().copied().unwrap_or("").to_string(),
            max_date: dates.iter().max().copied().unwrap_or("").to_string(),
            max_best: self.events.iter().map(|e| e.best).max().unwrap_or(0),
            max_civ: self.events.iter().map(|e| e.civilian).max().unwrap_or(0),
            count: self.events.len(),
        }
    }

    /// Encode as a GeoJSON FeatureCollection for embedding in the artifact
    pub fn to_feature_collection(&self) -> Value {
        let features: Vec<Value> = self
            .events
            .iter()
            .map(|e| {
                json!({
                    "type": "Feature",
                    "geometry": { "type": "Point", "coordinates": [e.lon, e.lat] },
                    "properties": {
                        "date": e.date,
                        "best": e.best,
                        "civ": e.civilian,
                        "prec": e.precision,
                        "conflict": e.conflict,
                        "where": e.location,
                        "event_type": e.event_type,
                        "side_a": e.side_a,
                        "side_b": e.side_b,
                        "source": e.source,
                        "notes": e.notes,
                        "summary": e.summary,
                    }
                })
            })
            .collect();
        json!({ "type": "FeatureCollection", "features": features })
    }
}

fn convert_feature(feature: &Value) -> Option<ConflictEvent> {
    let coords = feature.get("geometry")?.get("coordinates")?.as_array()?;
    let lon = coords.first()?.as_f64()?;
    let lat = coords.get(1)?.as_f64()?;
    let props = feature.get("properties").cloned().unwrap_or(Value::Null);

    let text = |key: &str| {
        props
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string()
    };
    let number = |key: &str| {
        props
            .get(key)
            .and_then(|v| v.as_u64().or_else(|| v.as_f64().map(|f| f.max(0.0) as u64)))
            .unwrap_or(0)
    };
    // Missing precision means "unknown", the coarsest code
    let precision = props
        .get("prec")
        .and_then(Value::as_u64)
        .unwrap_or(9);

    Some(ConflictEvent {
        lon,
        lat,
        date: text("date"),
        best: number("best"),
        civilian: number("civ"),
        precision: precision.min(9) as u8,
        conflict: text("conflict"),
        location: text("where"),
        event_type: text("event_type"),
        side_a: text("side_a"),
        side_b: text("side_b"),
        source: text("source"),
        notes: text("notes"),
        summary: text("summary"),
    })
}

fn convert_raw_event(event: &Value) -> Option<ConflictEvent> {
    let lat = field_f64(event, "latitude")?;
    let lon = field_f64(event, "longitude")?;

    let date_raw = pick_first(event, &["date_start", "date_end"]);
    let date = if date_raw.len() >= 10 {
        date_raw[..10].to_string()
    } else {
        String::new()
    };

    let best = field_f64(event, "best").unwrap_or(0.0).max(0.0) as u64;
    let civilian = field_f64(event, "deaths_civilians").unwrap_or(0.0).max(0.0) as u64;
    let precision = field_f64(event, "where_prec").unwrap_or(9.0).clamp(0.0, 9.0) as u8;

    let conflict = pick_first(event, &["conflict_name"]);
    let location = pick_first(event, &["where_coordinates", "adm_1", "country"]);
    let event_type = pick_first(event, &["event_type", "type_of_violence", "event"]);
    let side_a = pick_first(event, &["side_a", "actor1", "actor_a"]);
    let side_b = pick_first(event, &["side_b", "actor2", "actor_b"]);
    let source = pick_first(
        event,
        &["source", "source_office", "source_original", "source_article"],
    );
    let notes = truncate_chars(
        &pick_first(event, &["notes", "comment", "description"]),
        NOTES_LIMIT,
    );

    let summary = build_summary(&event_type, &side_a, &side_b, &location, &notes);

    Some(ConflictEvent {
        lon,
        lat,
        date,
        best,
        civilian,
        precision,
        conflict,
        location,
        event_type,
        side_a,
        side_b,
        source,
        notes,
        summary,
    })
}

/// First present, non-empty value among `keys`; numbers stringify
fn pick_first(event: &Value, keys: &[&str]) -> String {
    for key in keys {
        match event.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return s.trim().to_string(),
            Some(Value::Number(n)) => return n.to_string(),
            _ => {}
        }
    }
    String::new()
}

fn field_f64(event: &Value, key: &str) -> Option<f64> {
    match event.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn build_summary(
    event_type: &str,
    side_a: &str,
    side_b: &str,
    location: &str,
    notes: &str,
) -> String {
    let mut bits: Vec<String> = Vec::new();
    if !event_type.is_empty() {
        bits.push(event_type.to_string());
    }
    let sides: Vec<&str> = [side_a, side_b]
        .iter()
        .copied()
        .filter(|s| !s.is_empty())
        .collect();
    if !sides.is_empty() {
        bits.push(sides.join(" vs "));
    }
    if !location.is_empty() {
        bits.push(location.to_string());
    }
    if !notes.is_empty() {
        bits.push(truncate_chars(notes, SUMMARY_NOTES_LIMIT));
    }
    bits.join(" | ")
}

/// Char-boundary-safe truncation with an ellipsis marker
fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut out: String = text.chars().take(limit).collect();
    out.push('…');
    out
}
