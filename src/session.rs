//! Editing session: one network's tree plus the state that travels with it.
//!
//! DESIGN
//! ======
//! A `NetworkSession` owns the tree, the manual `PositionStore`, the current
//! selection and a clock. Every user-facing mutation goes through here so
//! the composite flows stay atomic: a role change re-buckets the node, an ip
//! change re-keys it and repoints its dependents, and a removal reattaches
//! orphans to the root, all within one call.
//!
//! Tracked mutations bump the node's version exactly once. Edits that do not
//! change anything return early without touching the version. Dragging a
//! node (`move_node`) is a position write, not a tracked mutation.
//!
//! ERROR HANDLING
//! ==============
//! Every flow returns `TreeError` for a missing id, an attempt to edit a
//! group or remove the root, an id collision, or an invalid parent. The tree
//! is left untouched when an error is returned.

use std::sync::Arc;

use rand::Rng;
use rand::distr::Alphanumeric;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::config::LayoutConfig;
use crate::layout::{Layout, apply_layout, compute_layout};
use crate::model::{NodeSource, ParsedNetworkMap, Position, Role, TreeNode, display_name};
use crate::persist::{self, PersistError, SavedLayout};
use crate::positions::PositionStore;
use crate::tree::{
    TargetGroup, TreeError, ensure_group, find_node_by_id, find_node_by_id_mut, flatten_devices,
    remove_from_all_groups, target_group_for_role, walk_all_mut,
};
use crate::version::{ensure_all_nodes_versioned, initialize_node_version, update_node_version};

/// Prefix of ids synthesized for user-added devices.
pub const MANUAL_ID_PREFIX: &str = "manual-";

const MANUAL_SUFFIX_LEN: usize = 6;

pub struct NetworkSession {
    root: TreeNode,
    positions: PositionStore,
    selected: Option<String>,
    clock: Arc<dyn Clock>,
    config: LayoutConfig,
}

impl NetworkSession {
    #[must_use]
    pub fn new(root: TreeNode, clock: Arc<dyn Clock>, config: LayoutConfig) -> Self {
        Self { root, positions: PositionStore::new(), selected: None, clock, config }
    }

    #[must_use]
    pub fn from_parsed(parsed: ParsedNetworkMap, clock: Arc<dyn Clock>, config: LayoutConfig) -> Self {
        Self::new(parsed.root, clock, config)
    }

    /// Rebuild a session from a saved document's snapshot and pin its
    /// positions. `None` if the document carries no snapshot.
    ///
    /// Snapshots written before versioning existed get their devices stamped
    /// as scanner-produced.
    #[must_use]
    pub fn from_saved(saved: &SavedLayout, clock: Arc<dyn Clock>, config: LayoutConfig) -> Option<Self> {
        let mut root = saved.root.clone()?;
        ensure_all_nodes_versioned(&mut root, NodeSource::Mapper, clock.now());
        let mut session = Self::new(root, clock, config);
        session.apply_saved_positions(saved);
        Some(session)
    }

    // =========================================================================
    // READ ACCESS
    // =========================================================================

    #[must_use]
    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    #[must_use]
    pub fn positions(&self) -> &PositionStore {
        &self.positions
    }

    #[must_use]
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    #[must_use]
    pub fn node(&self, id: &str) -> Option<&TreeNode> {
        find_node_by_id(&self.root, id)
    }

    /// Device list for the listing panel.
    #[must_use]
    pub fn devices(&self) -> Vec<&TreeNode> {
        flatten_devices(&self.root)
    }

    /// Ips the health monitor should poll.
    #[must_use]
    pub fn monitored_ips(&self) -> Vec<String> {
        flatten_devices(&self.root).into_iter().filter_map(|node| node.ip.clone()).collect()
    }

    /// Ips whose monitoring was switched off explicitly.
    #[must_use]
    pub fn silenced_ips(&self) -> Vec<String> {
        flatten_devices(&self.root)
            .into_iter()
            .filter(|node| !node.is_monitored())
            .filter_map(|node| node.ip.clone())
            .collect()
    }

    // =========================================================================
    // SELECTION
    // =========================================================================

    /// Select a node, or clear the selection with `None`.
    ///
    /// # Errors
    ///
    /// `NotFound` if `id` names no node, `GroupNode` for a group.
    pub fn select(&mut self, id: Option<&str>) -> Result<(), TreeError> {
        if let Some(id) = id {
            self.editable(id)?;
        }
        self.selected = id.map(ToOwned::to_owned);
        Ok(())
    }

    // =========================================================================
    // STRUCTURAL FLOWS
    // =========================================================================

    /// Reassign a node's role and move it into the matching group.
    ///
    /// Gateways are placed directly under the root. The root itself keeps its
    /// place and only has its role updated.
    ///
    /// # Errors
    ///
    /// `InvalidRole` for `Role::Group`, `NotFound`, or `GroupNode`.
    pub fn change_role(&mut self, id: &str, role: Role) -> Result<(), TreeError> {
        if role == Role::Group {
            return Err(TreeError::InvalidRole(role));
        }
        let previous = self.editable(id)?.role;
        if previous == role {
            return Ok(());
        }
        let now = self.clock.now();
        let change = format!("Role changed from {previous} to {role}");

        if id == self.root.id {
            self.root.role = role;
            update_node_version(&mut self.root, vec![change], now);
            info!(node = %id, from = %previous, to = %role, "root role changed");
            return Ok(());
        }

        let mut node = remove_from_all_groups(&mut self.root, id).ok_or_else(|| TreeError::NotFound(id.to_owned()))?;
        node.role = role;
        update_node_version(&mut node, vec![change], now);

        let target = target_group_for_role(role);
        match target {
            Some(group) => ensure_group(&mut self.root, group).children.push(node),
            None => self.root.children.push(node),
        }
        info!(node = %id, from = %previous, to = %role, group = target.map_or("root", TargetGroup::key), "role changed");
        Ok(())
    }

    /// Remove a device and reattach its dependents to the root.
    ///
    /// # Errors
    ///
    /// `RootRemoval` for the root, `GroupNode` for a group, `NotFound` for an
    /// unknown id.
    pub fn remove_node(&mut self, id: &str) -> Result<TreeNode, TreeError> {
        if id == self.root.id {
            return Err(TreeError::RootRemoval);
        }
        self.editable(id)?;
        let removed = remove_from_all_groups(&mut self.root, id).ok_or_else(|| TreeError::NotFound(id.to_owned()))?;

        let now = self.clock.now();
        let root_id = self.root.id.clone();
        let mut reparented = 0usize;
        walk_all_mut(&mut self.root, |node| {
            if node.parent_id.as_deref() == Some(id) {
                node.parent_id = Some(root_id.clone());
                update_node_version(node, vec![format!("Parent changed from {id} to {root_id}")], now);
                reparented += 1;
            }
        });

        self.positions.remove(id);
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        info!(node = %id, reparented, "device removed");
        Ok(removed)
    }

    /// Add a blank device to the clients group and select it. Returns its id.
    pub fn add_node(&mut self) -> String {
        let now = self.clock.now();
        let id = loop {
            let candidate = format!("{MANUAL_ID_PREFIX}{}-{}", now.timestamp_millis(), random_suffix());
            if find_node_by_id(&self.root, &candidate).is_none() {
                break candidate;
            }
        };

        let mut node = TreeNode::new(id.clone(), display_name(None, None), Role::Unknown);
        node.parent_id = Some(self.root.id.clone());
        initialize_node_version(&mut node, NodeSource::Manual, now);
        ensure_group(&mut self.root, TargetGroup::Clients).children.push(node);

        self.selected = Some(id.clone());
        info!(node = %id, "device added");
        id
    }

    // =========================================================================
    // FIELD EDITS
    // =========================================================================

    /// Change a device's ip. The id follows the ip, and every reference to
    /// the old id (dependents, tracked position, selection) is rewritten.
    /// Clearing the ip keeps the current id. Returns the node's id afterwards.
    ///
    /// # Errors
    ///
    /// `NotFound`, `GroupNode`, or `DuplicateId` if another node already has
    /// the derived id.
    pub fn update_ip(&mut self, id: &str, ip: Option<&str>) -> Result<String, TreeError> {
        let ip = normalize(ip);
        let previous = self.editable(id)?.ip.clone();
        if previous == ip {
            return Ok(id.to_owned());
        }
        let new_id = ip.clone().unwrap_or_else(|| id.to_owned());
        if new_id != id && find_node_by_id(&self.root, &new_id).is_some() {
            return Err(TreeError::DuplicateId(new_id));
        }

        let now = self.clock.now();
        let change = format!("IP changed from {} to {}", describe(previous.as_deref()), describe(ip.as_deref()));
        let node = self.editable_mut(id)?;
        node.ip = ip;
        node.id.clone_from(&new_id);
        node.refresh_name();
        update_node_version(node, vec![change], now);

        if new_id != id {
            walk_all_mut(&mut self.root, |node| {
                if node.parent_id.as_deref() == Some(id) {
                    node.parent_id = Some(new_id.clone());
                }
            });
            self.positions.rename(id, &new_id);
            if self.selected.as_deref() == Some(id) {
                self.selected = Some(new_id.clone());
            }
        }
        info!(from = %id, to = %new_id, "device ip changed");
        Ok(new_id)
    }

    /// # Errors
    ///
    /// `NotFound` or `GroupNode`.
    pub fn update_hostname(&mut self, id: &str, hostname: Option<&str>) -> Result<(), TreeError> {
        self.edit_text(id, "Hostname", hostname, |node| &mut node.hostname)
    }

    /// # Errors
    ///
    /// `NotFound` or `GroupNode`.
    pub fn set_connection_speed(&mut self, id: &str, speed: Option<&str>) -> Result<(), TreeError> {
        self.edit_text(id, "Connection speed", speed, |node| &mut node.connection_speed)
    }

    /// # Errors
    ///
    /// `NotFound` or `GroupNode`.
    pub fn set_monitoring(&mut self, id: &str, enabled: bool) -> Result<(), TreeError> {
        if self.editable(id)?.is_monitored() == enabled {
            return Ok(());
        }
        let now = self.clock.now();
        let node = self.editable_mut(id)?;
        node.monitoring_enabled = Some(enabled);
        let change = if enabled { "Monitoring enabled" } else { "Monitoring disabled" };
        update_node_version(node, vec![change.to_owned()], now);
        debug!(node = %id, enabled, "monitoring toggled");
        Ok(())
    }

    /// Point a device's connectivity edge at another device, or detach it
    /// with `None`.
    ///
    /// # Errors
    ///
    /// `NotFound` or `GroupNode` for `id`; `InvalidParent` when the parent is
    /// unknown, a group, the node itself, or when `id` is the root.
    pub fn set_parent(&mut self, id: &str, parent: Option<&str>) -> Result<(), TreeError> {
        let previous = self.editable(id)?.parent_id.clone();
        if let Some(parent) = parent {
            let valid = id != self.root.id
                && parent != id
                && find_node_by_id(&self.root, parent).is_some_and(|node| !node.is_group());
            if !valid {
                return Err(TreeError::InvalidParent { id: id.to_owned(), parent: parent.to_owned() });
            }
        }
        if previous.as_deref() == parent {
            return Ok(());
        }

        let now = self.clock.now();
        let change = format!("Parent changed from {} to {}", describe(previous.as_deref()), describe(parent));
        let node = self.editable_mut(id)?;
        node.parent_id = parent.map(ToOwned::to_owned);
        update_node_version(node, vec![change], now);
        info!(node = %id, parent = describe(parent), "connectivity changed");
        Ok(())
    }

    /// Pin a node where the user dropped it.
    ///
    /// # Errors
    ///
    /// `NotFound` or `GroupNode`.
    pub fn move_node(&mut self, id: &str, x: f64, y: f64) -> Result<(), TreeError> {
        let node = self.editable_mut(id)?;
        node.fx = Some(x);
        node.fy = Some(y);
        self.positions.record(id, Position::new(x, y));
        Ok(())
    }

    // =========================================================================
    // LAYOUT & PERSISTENCE
    // =========================================================================

    /// Recompute every position from scratch, discarding manual placements.
    pub fn auto_layout(&mut self) -> Layout {
        let layout = compute_layout(&self.root, &self.config);
        apply_layout(&mut self.root, &mut self.positions, &layout);
        info!(nodes = layout.positions.len(), columns = layout.max_depth + 1, "auto layout applied");
        layout
    }

    #[must_use]
    pub fn export_layout(&self) -> SavedLayout {
        persist::export_layout(&self.root, &self.positions, self.clock.now())
    }

    /// Pin nodes from a saved document. Returns how many matched.
    pub fn apply_saved_positions(&mut self, saved: &SavedLayout) -> usize {
        let applied = persist::apply_saved_positions(&mut self.root, &mut self.positions, saved);
        debug!(applied, saved = saved.positions.len(), "saved positions applied");
        applied
    }

    /// Serialized state used for dirty tracking. Identical trees and
    /// positions give identical snapshots regardless of when they are taken.
    ///
    /// # Errors
    ///
    /// Returns `PersistError::Json` if serialization fails.
    pub fn snapshot(&self) -> Result<String, PersistError> {
        let mut saved = self.export_layout();
        saved.timestamp = None;
        Ok(serde_json::to_string(&saved)?)
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    fn editable(&self, id: &str) -> Result<&TreeNode, TreeError> {
        let node = find_node_by_id(&self.root, id).ok_or_else(|| TreeError::NotFound(id.to_owned()))?;
        if node.is_group() {
            return Err(TreeError::GroupNode(id.to_owned()));
        }
        Ok(node)
    }

    fn editable_mut(&mut self, id: &str) -> Result<&mut TreeNode, TreeError> {
        let node = find_node_by_id_mut(&mut self.root, id).ok_or_else(|| TreeError::NotFound(id.to_owned()))?;
        if node.is_group() {
            return Err(TreeError::GroupNode(id.to_owned()));
        }
        Ok(node)
    }

    fn edit_text(
        &mut self,
        id: &str,
        label: &str,
        value: Option<&str>,
        slot: fn(&mut TreeNode) -> &mut Option<String>,
    ) -> Result<(), TreeError> {
        let value = normalize(value);
        let now = self.clock.now();
        let node = self.editable_mut(id)?;
        let current = slot(node);
        if *current == value {
            return Ok(());
        }
        let change = format!("{label} changed from {} to {}", describe(current.as_deref()), describe(value.as_deref()));
        *current = value;
        node.refresh_name();
        update_node_version(node, vec![change], now);
        debug!(node = %id, field = label, "device field edited");
        Ok(())
    }
}

fn normalize(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(ToOwned::to_owned)
}

fn describe(value: Option<&str>) -> &str {
    value.unwrap_or("none")
}

fn random_suffix() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(MANUAL_SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
