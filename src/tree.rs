//! Tree queries: lookup, walks and group bucketing.
//!
//! DESIGN
//! ======
//! Containment is fixed at root → groups → devices, so walks are two-level:
//! the root, then each root child that is a device, then every device under
//! every group. Lookup by id uses an explicit stack and does not assume the
//! depth. All queries return `Option` on a miss; callers decide whether a
//! miss is an error.

use std::collections::HashSet;

use crate::model::{GROUP_ID_PREFIX, Role, TreeNode};

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("node not found: {0}")]
    NotFound(String),
    #[error("the root node cannot be removed")]
    RootRemoval,
    #[error("group nodes cannot be edited: {0}")]
    GroupNode(String),
    #[error("id already in use: {0}")]
    DuplicateId(String),
    #[error("role cannot be assigned to a device: {0}")]
    InvalidRole(Role),
    #[error("invalid parent {parent} for {id}")]
    InvalidParent { id: String, parent: String },
}

impl crate::error::ErrorCode for TreeError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_NODE_NOT_FOUND",
            Self::RootRemoval => "E_ROOT_REMOVAL",
            Self::GroupNode(_) => "E_GROUP_NODE",
            Self::DuplicateId(_) => "E_DUPLICATE_ID",
            Self::InvalidRole(_) => "E_INVALID_ROLE",
            Self::InvalidParent { .. } => "E_INVALID_PARENT",
        }
    }
}

// =============================================================================
// TARGET GROUPS
// =============================================================================

/// The three buckets devices are sorted into by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetGroup {
    Infrastructure,
    Servers,
    Clients,
}

impl TargetGroup {
    /// Lowercase key used for prefix matching and synthesized ids.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Infrastructure => "infrastructure",
            Self::Servers => "servers",
            Self::Clients => "clients",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Infrastructure => "Infrastructure",
            Self::Servers => "Servers",
            Self::Clients => "Clients",
        }
    }

    /// Empty group node for this bucket.
    #[must_use]
    pub fn new_group(self) -> TreeNode {
        let mut group = TreeNode::group(self.key());
        group.name = self.label().to_owned();
        group
    }
}

/// Bucket for a role. Gateways stay at the root and get `None`.
#[must_use]
pub fn target_group_for_role(role: Role) -> Option<TargetGroup> {
    match role {
        Role::Firewall | Role::Switch => Some(TargetGroup::Infrastructure),
        Role::Server | Role::Service | Role::Nas => Some(TargetGroup::Servers),
        Role::Client | Role::Unknown => Some(TargetGroup::Clients),
        Role::Gateway | Role::Group => None,
    }
}

// =============================================================================
// LOOKUP
// =============================================================================

/// Depth-first search over the whole containment tree.
#[must_use]
pub fn find_node_by_id<'a>(root: &'a TreeNode, id: &str) -> Option<&'a TreeNode> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.id == id {
            return Some(node);
        }
        stack.extend(node.children.iter().rev());
    }
    None
}

/// Mutable variant of [`find_node_by_id`].
pub fn find_node_by_id_mut<'a>(root: &'a mut TreeNode, id: &str) -> Option<&'a mut TreeNode> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.id == id {
            return Some(node);
        }
        stack.extend(node.children.iter_mut().rev());
    }
    None
}

fn group_index(root: &TreeNode, prefix: &str) -> Option<usize> {
    let wanted = format!("{GROUP_ID_PREFIX}{prefix}").to_ascii_lowercase();
    root.children
        .iter()
        .position(|child| child.is_group() && (child.id == prefix || child.id.to_ascii_lowercase().starts_with(&wanted)))
}

/// Group under `root` whose id equals `prefix` or starts with `group:<prefix>`
/// (ASCII case-insensitive).
#[must_use]
pub fn find_group_by_prefix<'a>(root: &'a TreeNode, prefix: &str) -> Option<&'a TreeNode> {
    group_index(root, prefix).map(|i| &root.children[i])
}

/// Mutable variant of [`find_group_by_prefix`].
pub fn find_group_by_prefix_mut<'a>(root: &'a mut TreeNode, prefix: &str) -> Option<&'a mut TreeNode> {
    group_index(root, prefix).map(|i| &mut root.children[i])
}

/// The group for `target`, created and appended to the root if absent.
pub fn ensure_group(root: &mut TreeNode, target: TargetGroup) -> &mut TreeNode {
    let idx = if let Some(i) = group_index(root, target.key()) {
        i
    } else {
        root.children.push(target.new_group());
        root.children.len() - 1
    };
    &mut root.children[idx]
}

// =============================================================================
// WALKS
// =============================================================================

/// Visit the root, then every device under it: direct non-group children
/// and the children of each group.
pub fn walk_all<'a>(root: &'a TreeNode, mut f: impl FnMut(&'a TreeNode)) {
    f(root);
    for child in &root.children {
        if child.is_group() {
            child.children.iter().for_each(&mut f);
        } else {
            f(child);
        }
    }
}

/// Mutable variant of [`walk_all`]. Group nodes themselves are not visited.
pub fn walk_all_mut(root: &mut TreeNode, mut f: impl FnMut(&mut TreeNode)) {
    f(root);
    for child in &mut root.children {
        if child.is_group() {
            child.children.iter_mut().for_each(&mut f);
        } else {
            f(child);
        }
    }
}

/// Every non-group node reachable from `root`, deduplicated by ip (falling
/// back to id), in encounter order.
#[must_use]
pub fn flatten_devices(root: &TreeNode) -> Vec<&TreeNode> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut devices = Vec::new();
    walk_all(root, |node| {
        if node.is_group() {
            return;
        }
        let key = node.ip.as_deref().unwrap_or(&node.id);
        if seen.insert(key) {
            devices.push(node);
        }
    });
    devices
}

// =============================================================================
// STRUCTURAL REMOVAL
// =============================================================================

/// Splice the first node with `id` out of whichever group holds it.
///
/// Also detaches a device sitting directly under the root. Does not touch
/// `parent_id` references; callers reparent dependents themselves.
pub fn remove_from_all_groups(root: &mut TreeNode, id: &str) -> Option<TreeNode> {
    for i in 0..root.children.len() {
        let child = &mut root.children[i];
        if child.is_group() {
            if let Some(pos) = child.children.iter().position(|n| n.id == id) {
                return Some(child.children.remove(pos));
            }
        } else if child.id == id {
            return Some(root.children.remove(i));
        }
    }
    None
}

#[cfg(test)]
#[path = "tree_test.rs"]
mod tests;
