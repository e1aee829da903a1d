//! Tolerant parser for the network scanner's text report.
//!
//! The report has up to three sections, any of which may be missing:
//!
//! ```text
//! Gateway: 10.0.0.1 (router.lan)
//! LAN Interface: eth0
//! Subnet: 10.0.0.0/24
//! === Devices Found ===
//! 10.0.0.5 | nas.lan | role=nas | depth=1
//! === Heuristic Topology Tree ===
//! Servers:
//!  - 10.0.0.5 (nas.lan) [server]
//! ```
//!
//! Parsing never fails. Lines that do not match are skipped one at a time.
//! When a device appears both in the table and in the heuristic section the
//! table's `role=` wins; the bracketed hint only fills in for devices the
//! table does not list.

use std::collections::{HashMap, HashSet};
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::model::{DeviceEntry, GatewayInfo, NodeSource, ParsedNetworkMap, Role, SYNTHETIC_ROOT_ID, TreeNode};
use crate::tree::{ensure_group, target_group_for_role};
use crate::version::initialize_node_version;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Devices,
    Heuristic,
    Other,
}

/// One `- <ip> (<hostname>) [<hint>]` line under a heuristic category.
#[derive(Debug)]
struct HeuristicItem {
    ip: String,
    hostname: Option<String>,
    hint: Option<String>,
}

/// A free-text category header and the items listed under it.
#[derive(Debug)]
struct Category {
    name: String,
    items: Vec<HeuristicItem>,
}

/// Parse a raw scanner report into a versioned two-level tree.
#[must_use]
pub fn parse(raw: &str, now: DateTime<Utc>) -> ParsedNetworkMap {
    let mut section = Section::Preamble;
    let mut gateway: Option<GatewayInfo> = None;
    let mut lan_interface: Option<String> = None;
    let mut subnet: Option<String> = None;
    let mut devices: Vec<DeviceEntry> = Vec::new();
    let mut categories: Vec<Category> = Vec::new();
    let mut uncategorized: Vec<HeuristicItem> = Vec::new();
    let mut skipped = 0usize;

    for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if line.starts_with("===") {
            section = section_for_header(line);
            continue;
        }

        match section {
            Section::Preamble => {
                if let Some(rest) = strip_label(line, "gateway:") {
                    match parse_address(rest) {
                        Some((ip, hostname)) => gateway = Some(GatewayInfo { ip, hostname }),
                        None => skipped += 1,
                    }
                } else if let Some(rest) = strip_label(line, "lan interface:") {
                    lan_interface = non_empty(rest);
                } else if let Some(rest) = strip_label(line, "subnet:") {
                    subnet = non_empty(rest);
                }
            }
            Section::Devices => match parse_device_row(line) {
                Some(entry) => devices.push(entry),
                None => skipped += 1,
            },
            Section::Heuristic => {
                if let Some(rest) = line.strip_prefix('-').or_else(|| line.strip_prefix('*')) {
                    match parse_heuristic_item(rest) {
                        Some(item) => match categories.last_mut() {
                            Some(category) => category.items.push(item),
                            None => uncategorized.push(item),
                        },
                        None => skipped += 1,
                    }
                } else {
                    categories.push(Category { name: line.to_owned(), items: Vec::new() });
                }
            }
            Section::Other => {}
        }
    }

    let root = build_tree(gateway.as_ref(), &devices, categories, uncategorized, now);

    debug!(
        gateway = gateway.as_ref().map_or("-", |g| g.ip.as_str()),
        devices = devices.len(),
        groups = root.children.iter().filter(|c| c.is_group()).count(),
        skipped,
        "parsed scanner report"
    );

    ParsedNetworkMap { raw: raw.to_owned(), gateway, lan_interface, subnet, devices, root }
}

/// Map a free-text role hint onto the fixed role set.
///
/// Case-insensitive substring match, checked in a fixed order so hints such
/// as `"gateway/router"` or `"switch/ap"` resolve deterministically.
#[must_use]
pub fn role_from_hint(hint: &str) -> Role {
    const TABLE: &[(&str, Role)] = &[
        ("gateway", Role::Gateway),
        ("router", Role::Gateway),
        ("switch", Role::Switch),
        ("firewall", Role::Firewall),
        ("server", Role::Server),
        ("service", Role::Service),
        ("nas", Role::Nas),
        ("client", Role::Client),
    ];
    let lower = hint.to_ascii_lowercase();
    TABLE
        .iter()
        .find(|(needle, _)| lower.contains(*needle))
        .map_or(Role::Unknown, |&(_, role)| role)
}

// =============================================================================
// TREE ASSEMBLY
// =============================================================================

fn build_tree(
    gateway: Option<&GatewayInfo>,
    devices: &[DeviceEntry],
    categories: Vec<Category>,
    uncategorized: Vec<HeuristicItem>,
    now: DateTime<Utc>,
) -> TreeNode {
    let mut root = match gateway {
        Some(gw) => {
            let mut node = TreeNode::device(&gw.ip, gw.hostname.as_deref(), Role::Gateway);
            initialize_node_version(&mut node, NodeSource::Mapper, now);
            node
        }
        None => TreeNode::new(SYNTHETIC_ROOT_ID, "Network", Role::Group),
    };
    let root_id = root.id.clone();

    let table: HashMap<&str, &DeviceEntry> = devices.iter().map(|d| (d.ip.as_str(), d)).collect();
    let mut placed: HashSet<String> = HashSet::from([root_id.clone()]);

    for category in categories {
        let mut group = TreeNode::group(&category.name);
        for item in category.items {
            if let Some(node) = device_from_item(item, &table, &root_id, &mut placed, now) {
                group.children.push(node);
            }
        }
        if group.children.is_empty() {
            continue;
        }
        // Repeated headers merge into the first group of that name.
        match root.children.iter_mut().find(|c| c.id == group.id) {
            Some(existing) => existing.children.append(&mut group.children),
            None => root.children.push(group),
        }
    }

    let leftovers = uncategorized
        .into_iter()
        .filter_map(|item| device_from_item(item, &table, &root_id, &mut placed, now))
        .collect::<Vec<_>>();
    let table_only = devices
        .iter()
        .filter_map(|entry| {
            let item = HeuristicItem { ip: entry.ip.clone(), hostname: None, hint: None };
            device_from_item(item, &table, &root_id, &mut placed, now)
        })
        .collect::<Vec<_>>();

    for node in leftovers.into_iter().chain(table_only) {
        match target_group_for_role(node.role) {
            Some(target) => ensure_group(&mut root, target).children.push(node),
            None => root.children.push(node),
        }
    }

    root
}

/// Build a versioned device node, or `None` if it is the root or already placed.
fn device_from_item(
    item: HeuristicItem,
    table: &HashMap<&str, &DeviceEntry>,
    root_id: &str,
    placed: &mut HashSet<String>,
    now: DateTime<Utc>,
) -> Option<TreeNode> {
    if !placed.insert(item.ip.clone()) {
        return None;
    }
    let row = table.get(item.ip.as_str());
    let role = match (row, item.hint.as_deref()) {
        (Some(row), _) => row.role,
        (None, Some(hint)) => role_from_hint(hint),
        (None, None) => Role::Unknown,
    };
    let hostname = item.hostname.or_else(|| row.and_then(|r| r.hostname.clone()));

    let mut node = TreeNode::device(&item.ip, hostname.as_deref(), role);
    node.parent_id = Some(root_id.to_owned());
    initialize_node_version(&mut node, NodeSource::Mapper, now);
    Some(node)
}

// =============================================================================
// LINE PARSERS
// =============================================================================

fn section_for_header(line: &str) -> Section {
    let lower = line.to_ascii_lowercase();
    if lower.contains("devices found") {
        Section::Devices
    } else if lower.contains("heuristic topology") {
        Section::Heuristic
    } else {
        Section::Other
    }
}

/// Parse `ip | hostname | role=<role> | depth=<n>`. The ip cell must be a
/// valid address; everything else is optional.
fn parse_device_row(line: &str) -> Option<DeviceEntry> {
    let mut cells = line.split('|').map(str::trim);
    let ip = valid_ip(cells.next()?)?;

    let mut hostname = None;
    let mut role = Role::Unknown;
    let mut depth = None;
    for (i, cell) in cells.enumerate() {
        if let Some((key, value)) = cell.split_once('=') {
            match key.trim().to_ascii_lowercase().as_str() {
                "role" => role = role_from_hint(value.trim()),
                "depth" => depth = value.trim().parse::<u32>().ok(),
                _ => {}
            }
        } else if i == 0 && !cell.is_empty() && cell != "-" {
            hostname = Some(cell.to_owned());
        }
    }

    Some(DeviceEntry { ip, hostname, role, depth })
}

/// Parse `<ip> (<hostname>) [<hint>]` after the list marker.
fn parse_heuristic_item(rest: &str) -> Option<HeuristicItem> {
    let hint = between(rest, '[', ']');
    let before_hint = rest.split('[').next().unwrap_or(rest);
    let (ip, hostname) = parse_address(before_hint)?;
    Some(HeuristicItem { ip, hostname, hint })
}

/// Parse `<ip> (<hostname>)` where the hostname part is optional.
fn parse_address(text: &str) -> Option<(String, Option<String>)> {
    let ip = valid_ip(text.split_whitespace().next()?)?;
    Some((ip, between(text, '(', ')')))
}

fn valid_ip(token: &str) -> Option<String> {
    token.parse::<IpAddr>().ok().map(|_| token.to_owned())
}

/// Trimmed, non-empty text between the first `open` and the next `close`.
fn between(text: &str, open: char, close: char) -> Option<String> {
    let start = text.find(open)? + open.len_utf8();
    let len = text[start..].find(close)?;
    non_empty(&text[start..start + len])
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

/// Strip a case-insensitive label prefix such as `Gateway:`.
fn strip_label<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let head = line.get(..label.len())?;
    head.eq_ignore_ascii_case(label).then(|| line[label.len()..].trim())
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod tests;
