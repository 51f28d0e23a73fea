//! Warning and audit structures for non-fatal pipeline issues
//!
//! The pipeline never aborts on per-feature problems; everything recoverable
//! lands here as a structured entry and is also emitted through `tracing`.

use serde::Serialize;

/// A non-fatal issue recorded during one pipeline pass
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Warning {
    #[error("malformed geometry on \"{feature}\": {detail}")]
    MalformedGeometry {
        /// Name of the placemark whose geometry was dropped
        feature: String,
        /// Style reference carried by the placemark, kept for the audit trail
        style: Option<String>,
        detail: String,
    },

    #[error("unresolved style \"{style_url}\" on \"{feature}\"")]
    UnresolvedStyle { feature: String, style_url: String },

    #[error("structural guard tripped at \"{folder}\" (depth {depth})")]
    StructuralGuard { folder: String, depth: usize },
}

/// Why a folder subtree was excluded from classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Name matched an archival pattern; the whole subtree was pruned
    Archived,
    /// Name matched no keep token; direct placemarks were skipped
    NotKept,
}

/// One excluded folder, recorded exactly once regardless of subtree size
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFolder {
    pub name: String,
    pub reason: SkipReason,
    /// Placemarks excluded with this folder (recursive for `Archived`,
    /// direct children only for `NotKept`)
    pub placemark_count: usize,
    /// Up to three sample placemark names for the audit report
    pub samples: Vec<String>,
}

/// Collected warnings and exclusions for one pipeline pass
#[derive(Debug, Clone, Default)]
pub struct AuditReport {
    pub warnings: Vec<Warning>,
    pub skipped: Vec<SkippedFolder>,
}

/// Compact audit figures embedded in the output artifact
#[derive(Debug, Clone, Serialize)]
pub struct AuditSummary {
    pub warning_count: usize,
    pub skipped_folder_count: usize,
    pub skipped_placemark_count: usize,
}

impl AuditReport {
    /// Record a warning, mirroring it to the log
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{warning}");
        self.warnings.push(warning);
    }

    /// Record an excluded folder
    pub fn skip(&mut self, skipped: SkippedFolder) {
        tracing::debug!(
            "skipping folder \"{}\" ({:?}, {} placemarks)",
            skipped.name,
            skipped.reason,
            skipped.placemark_count
        );
        self.skipped.push(skipped);
    }

    /// Total placemarks excluded by folder skips
    pub fn skipped_placemarks(&self) -> usize {
        self.skipped.iter().map(|s| s.placemark_count).sum()
    }

    pub fn summary(&self) -> AuditSummary {
        AuditSummary {
            warning_count: self.warnings.len(),
            skipped_folder_count: self.skipped.len(),
            skipped_placemark_count: self.skipped_placemarks(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty() && self.skipped.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let mut audit = AuditReport::default();
        assert!(audit.is_clean());

        audit.warn(Warning::UnresolvedStyle {
            feature: "A".to_string(),
            style_url: "#missing".to_string(),
        });
        audit.skip(SkippedFolder {
            name: "2023 Archive".to_string(),
            reason: SkipReason::Archived,
            placemark_count: 7,
            samples: vec!["Old front".to_string()],
        });
        audit.skip(SkippedFolder {
            name: "Notes".to_string(),
            reason: SkipReason::NotKept,
            placemark_count: 2,
            samples: vec![],
        });

        let summary = audit.summary();
        assert_eq!(summary.warning_count, 1);
        assert_eq!(summary.skipped_folder_count, 2);
        assert_eq!(summary.skipped_placemark_count, 9);
        assert!(!audit.is_clean());
    }

    #[test]
    fn test_warning_display() {
        let warning = Warning::MalformedGeometry {
            feature: "Bad line".to_string(),
            style: None,
            detail: "non-numeric tuple \"abc,def\"".to_string(),
        };
        assert!(warning.to_string().contains("Bad line"));
        assert!(warning.to_string().contains("abc,def"));
    }
}
