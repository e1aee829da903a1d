//! Layout engine: deterministic column/row placement without simulation.
//!
//! DESIGN
//! ======
//! Nodes are placed in columns by connectivity depth (hops along
//! `parent_id` to the root) and ordered inside each column by the rank of
//! their parent in the previous column, then by numeric IPv4 value. Columns
//! are processed shallowest first, so every parent's rank is known before
//! its children are sorted. The result depends only on tree shape, the
//! `parent_id` graph and ip values.
//!
//! A `parent_id` cycle cannot recurse forever: the depth walk carries its
//! own visited set and stops counting at the first repeat. That keeps the
//! layout total; it does not repair the topology.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::debug;

use crate::config::LayoutConfig;
use crate::model::{Position, TreeNode};
use crate::positions::PositionStore;
use crate::tree::{walk_all, walk_all_mut};

/// Computed placement for every device and the root.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layout {
    pub positions: HashMap<String, Position>,
    pub depths: HashMap<String, usize>,
    pub max_depth: usize,
}

// =============================================================================
// DEPTH
// =============================================================================

/// Connectivity depth of every node reachable from `root`.
///
/// The root is 0. A node with no `parent_id`, or one naming a node outside
/// the tree, is 1. Otherwise depth is one more than the parent's.
#[must_use]
pub fn compute_depths(root: &TreeNode) -> HashMap<String, usize> {
    let nodes = index_nodes(root);
    nodes
        .keys()
        .map(|id| ((*id).to_owned(), depth_of(*id, &nodes, &root.id)))
        .collect()
}

fn index_nodes(root: &TreeNode) -> HashMap<&str, &TreeNode> {
    let mut nodes = HashMap::new();
    walk_all(root, |node| {
        nodes.entry(node.id.as_str()).or_insert(node);
    });
    nodes
}

fn depth_of<'a>(id: &'a str, nodes: &HashMap<&'a str, &'a TreeNode>, root_id: &str) -> usize {
    let mut visited: HashSet<&'a str> = HashSet::new();
    let mut current = id;
    let mut hops = 0;
    loop {
        if current == root_id {
            return hops;
        }
        // Cycle: the repeated node contributes nothing further.
        if !visited.insert(current) {
            return hops;
        }
        let parent = nodes.get(current).copied().and_then(|n| n.parent_id.as_deref());
        match parent {
            Some(p) if p == root_id || nodes.contains_key(p) => {
                hops += 1;
                current = p;
            }
            _ => return hops + 1,
        }
    }
}

// =============================================================================
// ORDERING
// =============================================================================

/// Compare two address strings as dotted-quad IPv4, octet by octet.
///
/// Parsable addresses sort before unparsable ones; two unparsable values
/// compare as plain strings.
#[must_use]
pub fn compare_ips(a: &str, b: &str) -> Ordering {
    match (parse_octets(a), parse_octets(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

fn parse_octets(text: &str) -> Option<[u32; 4]> {
    let mut octets = [0u32; 4];
    let mut parts = text.split('.');
    for slot in &mut octets {
        *slot = parts.next()?.trim().parse().ok()?;
    }
    parts.next().is_none().then_some(octets)
}

fn compare_by_address(a: &TreeNode, b: &TreeNode) -> Ordering {
    let ka = a.ip.as_deref().unwrap_or(&a.id);
    let kb = b.ip.as_deref().unwrap_or(&b.id);
    compare_ips(ka, kb).then_with(|| a.id.cmp(&b.id))
}

// =============================================================================
// PLACEMENT
// =============================================================================

/// Compute positions for the root and every device. Pure; does not touch the tree.
#[must_use]
pub fn compute_layout(root: &TreeNode, config: &LayoutConfig) -> Layout {
    let nodes = index_nodes(root);
    let mut depths: HashMap<String, usize> = HashMap::new();
    let mut buckets: BTreeMap<usize, Vec<&TreeNode>> = BTreeMap::new();

    // Encounter order makes the sort input stable across runs.
    let mut seen: HashSet<&str> = HashSet::new();
    walk_all(root, |node| {
        if node.id == root.id || !seen.insert(node.id.as_str()) {
            return;
        }
        let depth = depth_of(&node.id, &nodes, &root.id);
        depths.insert(node.id.clone(), depth);
        buckets.entry(depth).or_default().push(node);
    });
    depths.insert(root.id.clone(), 0);

    let mut ranks: HashMap<&str, usize> = HashMap::from([(root.id.as_str(), 0)]);
    let mut positions: HashMap<String, Position> = HashMap::new();
    positions.insert(root.id.clone(), Position::new(config.margin_x, config.canvas_height / 2.0));

    for (&depth, bucket) in &mut buckets {
        let parent_rank = |node: &TreeNode| match node.parent_id.as_deref() {
            Some(p) if nodes.contains_key(p) || p == root.id => ranks.get(p).copied().unwrap_or(usize::MAX),
            _ => 0,
        };
        bucket.sort_by(|a, b| parent_rank(a).cmp(&parent_rank(b)).then_with(|| compare_by_address(a, b)));

        let x = config.margin_x + as_f64(depth) * config.column_width;
        let block_height = as_f64(bucket.len().saturating_sub(1)) * config.node_gap_y;
        let start_y = (config.canvas_height - block_height) / 2.0;
        for (index, &node) in bucket.iter().enumerate() {
            ranks.insert(node.id.as_str(), index);
            positions.insert(node.id.clone(), Position::new(x, start_y + as_f64(index) * config.node_gap_y));
        }
    }

    let max_depth = buckets.keys().next_back().copied().unwrap_or(0);
    debug!(nodes = positions.len(), columns = buckets.len(), max_depth, "computed layout");

    Layout { positions, depths, max_depth }
}

/// Write a computed layout into the tree, discarding every tracked manual
/// position first. There is no partial re-layout.
pub fn apply_layout(root: &mut TreeNode, store: &mut PositionStore, layout: &Layout) {
    store.clear();
    walk_all_mut(root, |node| {
        if let Some(position) = layout.positions.get(&node.id) {
            node.fx = Some(position.x);
            node.fy = Some(position.y);
        }
    });
}

#[allow(clippy::cast_precision_loss)]
fn as_f64(n: usize) -> f64 {
    n as f64
}

#[cfg(test)]
#[path = "layout_test.rs"]
mod tests;
