//! Statistics snapshot adapter
//!
//! Deserializes the periodic loss-statistics snapshot produced by the
//! external scraper and condenses it into the summary block embedded in the
//! artifact: per-side personnel figures, equipment loss totals, and the top
//! equipment categories above a dollar floor.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// At most this many categories appear per side in the summary
pub const CATEGORY_LIMIT: usize = 10;
/// Categories below this estimated value are dropped from the summary
pub const CATEGORY_MIN_USD: f64 = 50_000_000.0;

/// The scraper's snapshot file. Fields are optional throughout; partial
/// snapshots are normal mid-scrape
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatsSnapshot {
    #[serde(default)]
    pub timestamp_utc: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub russia: SideStats,
    #[serde(default)]
    pub ukraine: SideStats,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SideStats {
    #[serde(default)]
    pub personnel: Option<PersonnelStats>,
    /// Documented deaths; a different methodology than reported casualties
    #[serde(default)]
    pub personnel_dead_ualosses: Option<u64>,
    #[serde(default)]
    pub equipment_oryx: Option<EquipmentStats>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonnelStats {
    #[serde(default)]
    pub personnel: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EquipmentStats {
    #[serde(default)]
    pub total_billion_usd_estimated: Option<f64>,
    #[serde(default)]
    pub categories: HashMap<String, EquipmentCategory>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EquipmentCategory {
    #[serde(default)]
    pub usd_estimated: Option<f64>,
    #[serde(default)]
    pub count: Option<u64>,
}

/// One category row in the summary, largest losses first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryLoss {
    pub name: String,
    pub usd_estimated: f64,
}

/// Condensed per-side block for the artifact
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SideSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personnel: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equipment_total_billion_usd: Option<f64>,
    pub top_categories: Vec<CategoryLoss>,
}

/// The snapshot summary embedded in the artifact
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats_timestamp: Option<String>,
    pub russia: SideSummary,
    pub ukraine: SideSummary,
}

impl EquipmentStats {
    /// Top categories by estimated value, deterministically ordered
    /// (value descending, name ascending on ties)
    pub fn top_categories(&self, limit: usize, min_usd: f64) -> Vec<CategoryLoss> {
        let mut rows: Vec<CategoryLoss> = self
            .categories
            .iter()
            .filter_map(|(name, category)| {
                category.usd_estimated.map(|usd| CategoryLoss {
                    name: name.clone(),
                    usd_estimated: usd,
                })
            })
            .filter(|row| row.usd_estimated >= min_usd)
            .collect();
        rows.sort_by(|a, b| {
            b.usd_estimated
                .total_cmp(&a.usd_estimated)
                .then_with(|| a.name.cmp(&b.name))
        });
        rows.truncate(limit);
        rows
    }
}

impl StatsSnapshot {
    /// Snapshot timestamp under either of its historical field names
    pub fn timestamp(&self) -> Option<&str> {
        self.timestamp_utc
            .as_deref()
            .or(self.timestamp.as_deref())
    }

    /// Condense the snapshot for embedding in the artifact
    ///
    /// RU personnel are reported casualties, UA personnel are documented
    /// deaths; the two figures are not directly comparable.
    pub fn summarize(&self, limit: usize, min_usd: f64) -> StatsSummary {
        let side = |stats: &SideStats, personnel: Option<u64>| SideSummary {
            personnel,
            equipment_total_billion_usd: stats
                .equipment_oryx
                .as_ref()
                .and_then(|e| e.total_billion_usd_estimated),
            top_categories: stats
                .equipment_oryx
                .as_ref()
                .map(|e| e.top_categories(limit, min_usd))
                .unwrap_or_default(),
        };

        StatsSummary {
            stats_timestamp: self.timestamp().map(str::to_string),
            russia: side(
                &self.russia,
                self.russia.personnel.as_ref().and_then(|p| p.personnel),
            ),
            ukraine: side(&self.ukraine, self.ukraine.personnel_dead_ualosses),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_snapshot() -> StatsSnapshot {
        serde_json::from_value(json!({
            "timestamp_utc": "2024-06-01T04:00:00+00:00",
            "russia": {
                "personnel": { "personnel": 500000 },
                "equipment_oryx": {
                    "total_billion_usd_estimated": 22.51,
                    "categories": {
                        "Tanks": { "usd_estimated": 8.2e9, "count": 2900 },
                        "Artillery": { "usd_estimated": 3.1e9 },
                        "Trucks": { "usd_estimated": 4.0e7 },
                        "Unknown": {}
                    }
                }
            },
            "ukraine": {
                "personnel_dead_ualosses": 70000,
                "equipment_oryx": {
                    "total_billion_usd_estimated": 7.75,
                    "categories": {
                        "Tanks": { "usd_estimated": 2.2e9 }
                    }
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_top_categories_filter_and_order() {
        let snapshot = sample_snapshot();
        let equipment = snapshot.russia.equipment_oryx.as_ref().unwrap();
        let top = equipment.top_categories(CATEGORY_LIMIT, CATEGORY_MIN_USD);
        // Trucks below the floor, Unknown has no value
        let names: Vec<&str> = top.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Tanks", "Artillery"]);
    }

    #[test]
    fn test_top_categories_limit() {
        let snapshot = sample_snapshot();
        let equipment = snapshot.russia.equipment_oryx.as_ref().unwrap();
        let top = equipment.top_categories(1, 0.0);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].name, "Tanks");
    }

    #[test]
    fn test_top_categories_tie_break_is_deterministic() {
        let equipment: EquipmentStats = serde_json::from_value(json!({
            "categories": {
                "Bravo": { "usd_estimated": 1.0e9 },
                "Alpha": { "usd_estimated": 1.0e9 }
            }
        }))
        .unwrap();
        let top = equipment.top_categories(10, 0.0);
        let names: Vec<&str> = top.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Bravo"]);
    }

    #[test]
    fn test_summarize() {
        let summary = sample_snapshot().summarize(CATEGORY_LIMIT, CATEGORY_MIN_USD);
        assert_eq!(summary.russia.personnel, Some(500000));
        assert_eq!(summary.ukraine.personnel, Some(70000));
        assert_eq!(summary.russia.equipment_total_billion_usd, Some(22.51));
        assert_eq!(summary.ukraine.top_categories.len(), 1);
        assert_eq!(
            summary.stats_timestamp.as_deref(),
            Some("2024-06-01T04:00:00+00:00")
        );
    }

    #[test]
    fn test_partial_snapshot_deserializes() {
        let snapshot: StatsSnapshot = serde_json::from_value(json!({
            "timestamp": "2024-06-01"
        }))
        .unwrap();
        assert_eq!(snapshot.timestamp(), Some("2024-06-01"));
        let summary = snapshot.summarize(CATEGORY_LIMIT, CATEGORY_MIN_USD);
        assert_eq!(summary.russia.personnel, None);
        assert!(summary.russia.top_categories.is_empty());
    }
}
