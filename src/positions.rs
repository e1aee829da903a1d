//! Session-owned index of manually placed node positions.
//!
//! Each editing session owns one store, so positions recorded in one session
//! (or one test) are never visible to another.

use std::collections::HashMap;

use crate::model::Position;

/// Manual positions keyed by node id.
#[derive(Debug, Clone, Default)]
pub struct PositionStore {
    positions: HashMap<String, Position>,
}

impl PositionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record or overwrite the position for `id`.
    pub fn record(&mut self, id: &str, position: Position) {
        self.positions.insert(id.to_owned(), position);
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<Position> {
        self.positions.get(id).copied()
    }

    pub fn remove(&mut self, id: &str) -> Option<Position> {
        self.positions.remove(id)
    }

    /// Move a tracked position to a new id after the node was re-keyed.
    pub fn rename(&mut self, old_id: &str, new_id: &str) {
        if let Some(position) = self.positions.remove(old_id) {
            self.positions.insert(new_id.to_owned(), position);
        }
    }

    pub fn clear(&mut self) {
        self.positions.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
