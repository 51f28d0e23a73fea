//! Folder-tree traversal and pruning
//!
//! Depth-first pre-order walk over the source tree, driven by an explicit
//! stack rather than recursion. Archival folders are pruned with their whole
//! subtree; folders outside the keep-list lose their direct placemarks but
//! their sub-folders are still examined on their own merits. A visited-node
//! guard plus a depth limit bounds malformed (non-tree) input.

use crate::node::{RawNode, RawNodeKind};
use crate::report::{AuditReport, SkipReason, SkippedFolder, Warning};
use crate::{MapError, Result};
use smallvec::SmallVec;
use std::collections::HashSet;

/// Ancestor folder names, outermost first; tactical documents rarely nest
/// deeper than a handful of levels
pub type FolderPath = SmallVec<[String; 8]>;

/// How many sample placemark names a skipped folder keeps for the audit
const SKIP_SAMPLE_LIMIT: usize = 3;

/// Pruning policy for one pass
#[derive(Debug, Clone)]
pub struct PruneConfig {
    /// Case-insensitive substrings marking archival folders; matches prune
    /// the whole subtree
    pub archive_patterns: Vec<String>,
    /// Case-insensitive substrings a folder name must contain for its direct
    /// placemarks to be processed
    pub keep_tokens: Vec<String>,
    /// Bypass the keep-list and process placemarks in every folder
    pub keep_all: bool,
    /// Maximum folder nesting before the structural guard trips
    pub max_depth: usize,
}

impl Default for PruneConfig {
    fn default() -> Self {
        Self {
            archive_patterns: ["archive", "old", "backup", "past", "history"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            keep_tokens: [
                "frontline",
                "important areas",
                "ukrainian unit positions",
                "russian unit positions",
                "axis",
                "events",
                "ukrainian",
                "russian",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            keep_all: false,
            max_depth: 32,
        }
    }
}

impl PruneConfig {
    pub fn is_archived(&self, folder_name: &str) -> bool {
        let name = folder_name.to_lowercase();
        self.archive_patterns.iter().any(|p| name.contains(p))
    }

    pub fn is_kept(&self, folder_name: &str) -> bool {
        if self.keep_all {
            return true;
        }
        let name = folder_name.to_lowercase();
        self.keep_tokens.iter().any(|t| name.contains(t))
    }
}

/// A placemark that survived pruning, with the folder path that led to it
#[derive(Debug)]
pub struct VisitedPlacemark<'a> {
    pub node: &'a RawNode,
    pub folder_path: FolderPath,
}

struct Frame<'a> {
    folder: &'a RawNode,
    /// Path including this folder's own name; empty for the root
    path: FolderPath,
}

/// Walk the tree, yielding surviving placemarks in depth-first encounter
/// order
///
/// The only hard failure is a root that is missing or not a folder; every
/// other irregularity lands in the audit report.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn walk<'a>(
    root: &'a RawNode,
    config: &PruneConfig,
    audit: &mut AuditReport,
) -> Result<Vec<VisitedPlacemark<'a>>> {
    if !root.is_folder() {
        return Err(MapError::InvalidRoot);
    }

    let mut visited: HashSet<*const RawNode> = HashSet::new();
    let mut result = Vec::new();
    let mut stack: Vec<Frame<'a>> = vec![Frame {
        folder: root,
        path: FolderPath::new(),
    }];

    while let Some(frame) = stack.pop() {
        let folder_name = frame.folder.display_name();

        if !visited.insert(frame.folder as *const RawNode) {
            audit.warn(Warning::StructuralGuard {
                folder: folder_name.to_string(),
                depth: frame.path.len(),
            });
            continue;
        }
        if frame.path.len() > config.max_depth {
            audit.warn(Warning::StructuralGuard {
                folder: folder_name.to_string(),
                depth: frame.path.len(),
            });
            continue;
        }

        let is_root = frame.path.is_empty();
        let (placemarks, folders) = split_children(frame.folder);

        // Document-level placemarks and placemarks in folders outside the
        // keep-list are skipped; their sub-folders still get a chance
        let keep_placemarks = !is_root && config.is_kept(folder_name);
        if keep_placemarks {
            for placemark in placemarks {
                result.push(VisitedPlacemark {
                    node: placemark,
                    folder_path: frame.path.clone(),
                });
            }
        } else if !placemarks.is_empty() {
            audit.skip(SkippedFolder {
                name: folder_name.to_string(),
                reason: SkipReason::NotKept,
                placemark_count: placemarks.len(),
                samples: placemarks
                    .iter()
                    .take(SKIP_SAMPLE_LIMIT)
                    .map(|p| p.display_name().to_string())
                    .collect(),
            });
        }

        // Prune in document order so audit entries read top to bottom
        let mut child_frames = Vec::new();
        for folder in folders {
            let name = folder.display_name();
            if config.is_archived(name) {
                // Recorded exactly once for the whole subtree
                audit.skip(SkippedFolder {
                    name: name.to_string(),
                    reason: SkipReason::Archived,
                    placemark_count: folder.placemark_count(),
                    samples: folder.sample_placemark_names(SKIP_SAMPLE_LIMIT),
                });
                continue;
            }
            let mut path = frame.path.clone();
            path.push(name.to_string());
            child_frames.push(Frame { folder, path });
        }
        // Reverse push keeps document order on the LIFO stack
        stack.extend(child_frames.into_iter().rev());
    }

    Ok(result)
}

fn split_children(folder: &RawNode) -> (Vec<&RawNode>, Vec<&RawNode>) {
    match &folder.kind {
        RawNodeKind::Folder { children } => children.iter().partition(|c| !c.is_folder()),
        RawNodeKind::Placemark { .. } => (Vec::new(), Vec::new()),
    }
}
