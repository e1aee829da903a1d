//! Saved-layout documents: export, import and position re-application.
//!
//! DESIGN
//! ======
//! A saved layout bundles a `positions` index with a full structural
//! snapshot of the tree, so reopening a network never needs the
//! scanner report. Import is a plain JSON parse: every field is optional
//! and nothing beyond syntax is validated. A parse failure is returned to
//! the caller as-is.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Position, TreeNode};
use crate::positions::PositionStore;
use crate::tree::{walk_all, walk_all_mut};

/// Document format version written by [`export_layout`].
pub const SAVED_LAYOUT_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("invalid layout JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl crate::error::ErrorCode for PersistError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Json(_) => "E_INVALID_LAYOUT_JSON",
        }
    }
}

/// Positions plus a structural snapshot, as stored per network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedLayout {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub positions: BTreeMap<String, Position>,
    #[serde(default)]
    pub root: Option<TreeNode>,
}

fn default_version() -> u32 {
    SAVED_LAYOUT_VERSION
}

/// Snapshot the tree and every known position.
///
/// A tracked manual position wins; otherwise an already-assigned `fx/fy`
/// pair is used. Nodes with neither are left out of `positions`.
#[must_use]
pub fn export_layout(root: &TreeNode, store: &PositionStore, now: DateTime<Utc>) -> SavedLayout {
    let mut positions = BTreeMap::new();
    walk_all(root, |node| {
        let fallback = match (node.fx, node.fy) {
            (Some(x), Some(y)) => Some(Position::new(x, y)),
            _ => None,
        };
        if let Some(position) = store.get(&node.id).or(fallback) {
            positions.insert(node.id.clone(), position);
        }
    });

    SavedLayout { version: SAVED_LAYOUT_VERSION, timestamp: Some(now), positions, root: Some(root.clone()) }
}

/// Pin every node named in `saved.positions` and record it in `store`.
///
/// Ids with no matching node are skipped. Returns how many nodes were pinned.
pub fn apply_saved_positions(root: &mut TreeNode, store: &mut PositionStore, saved: &SavedLayout) -> usize {
    let mut applied = 0;
    walk_all_mut(root, |node| {
        if let Some(position) = saved.positions.get(&node.id) {
            node.fx = Some(position.x);
            node.fy = Some(position.y);
            store.record(&node.id, *position);
            applied += 1;
        }
    });
    applied
}

/// Parse a saved-layout document.
///
/// # Errors
///
/// Returns `PersistError::Json` if `text` is not valid JSON for the document shape.
pub fn import_layout(text: &str) -> Result<SavedLayout, PersistError> {
    Ok(serde_json::from_str(text)?)
}

/// Serialize a saved layout for storage.
///
/// # Errors
///
/// Returns `PersistError::Json` if serialization fails.
pub fn to_json(saved: &SavedLayout) -> Result<String, PersistError> {
    Ok(serde_json::to_string_pretty(saved)?)
}

#[cfg(test)]
#[path = "persist_test.rs"]
mod tests;
