//! Version tracker: creation stamps, version counters and bounded history.
//!
//! DESIGN
//! ======
//! Every device node carries `created_at`, `updated_at`, a version counter
//! and an append-only history. Initialization is idempotent so the parser,
//! snapshot import and user-add paths can all call it freely. Updates always
//! bump the version by one and append exactly one entry; history keeps only
//! the newest `HISTORY_LIMIT` entries. Group nodes are never versioned.

use chrono::{DateTime, Utc};

use crate::model::{HistoryEntry, NodeSource, TreeNode};
use crate::tree::walk_all_mut;

/// Maximum history entries retained per node.
pub const HISTORY_LIMIT: usize = 20;

/// Stamp a node as created if it is not already.
///
/// Leaves `version` and `history` untouched when `created_at` is set;
/// `updated_at` is refreshed either way.
pub fn initialize_node_version(node: &mut TreeNode, source: NodeSource, now: DateTime<Utc>) {
    if node.created_at.is_none() {
        node.created_at = Some(now);
        node.version = Some(1);
        node.history = vec![HistoryEntry {
            version: 1,
            timestamp: now,
            changes: vec![format!("Node created ({})", source.as_str())],
        }];
    }
    node.updated_at = Some(now);
}

/// Record a tracked mutation: bump the version and append a history entry.
pub fn update_node_version(node: &mut TreeNode, changes: Vec<String>, now: DateTime<Utc>) {
    if node.created_at.is_none() {
        node.created_at = Some(now);
    }
    let version = node.version.unwrap_or(1) + 1;
    node.version = Some(version);
    node.updated_at = Some(now);
    node.history.push(HistoryEntry { version, timestamp: now, changes });

    if node.history.len() > HISTORY_LIMIT {
        let overflow = node.history.len() - HISTORY_LIMIT;
        node.history.drain(..overflow);
    }
}

/// Initialize every non-group node reachable from `root`.
pub fn ensure_all_nodes_versioned(root: &mut TreeNode, source: NodeSource, now: DateTime<Utc>) {
    walk_all_mut(root, |node| {
        if !node.is_group() {
            initialize_node_version(node, source, now);
        }
    });
}

#[cfg(test)]
#[path = "version_test.rs"]
mod tests;
