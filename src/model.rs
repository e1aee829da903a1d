//! Topology data model: device and group nodes, roles, and parser output.
//!
//! DESIGN
//! ======
//! A `TreeNode` carries two independent relations. `children` is the
//! containment tree, fixed at root → groups → devices and used only for
//! visual bucketing. `parent_id` is a connectivity edge that may name any
//! node and drives layout depth. Groups are synthetic, never versioned and
//! never carry an `ip`.
//!
//! Field names serialize in camelCase because the same shape is embedded in
//! saved layouts read by the rendering layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix for synthetic group ids.
pub const GROUP_ID_PREFIX: &str = "group:";

/// Id of the synthetic root used when the report names no gateway.
pub const SYNTHETIC_ROOT_ID: &str = "root";

// =============================================================================
// ROLE
// =============================================================================

/// Device role. `Group` is reserved for containers. Unrecognised labels
/// read back from saved documents become `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[serde(rename = "gateway/router")]
    Gateway,
    Firewall,
    #[serde(rename = "switch/ap")]
    Switch,
    Server,
    Service,
    Nas,
    Client,
    Group,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Role {
    /// Canonical wire label, e.g. `"switch/ap"`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gateway => "gateway/router",
            Self::Firewall => "firewall",
            Self::Switch => "switch/ap",
            Self::Server => "server",
            Self::Service => "service",
            Self::Nas => "nas",
            Self::Client => "client",
            Self::Unknown => "unknown",
            Self::Group => "group",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// VERSIONING
// =============================================================================

/// Where a node came from, recorded in its creation history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeSource {
    /// Produced by the scanner report parser.
    Mapper,
    /// Added explicitly by a user.
    Manual,
}

impl NodeSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mapper => "mapper",
            Self::Manual => "manual",
        }
    }
}

/// One entry in a node's bounded change history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub version: u32,
    pub timestamp: DateTime<Utc>,
    pub changes: Vec<String>,
}

// =============================================================================
// TREE NODE
// =============================================================================

/// A device or a group container in the topology tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    /// Connectivity edge; independent of `children`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fx: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitoring_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_speed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// `None` until the node is versioned; groups stay `None`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<HistoryEntry>,
}

impl TreeNode {
    /// Bare node with the given id, name and role. Not yet versioned.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role,
            ip: None,
            hostname: None,
            parent_id: None,
            children: Vec::new(),
            fx: None,
            fy: None,
            monitoring_enabled: None,
            connection_speed: None,
            created_at: None,
            updated_at: None,
            version: None,
            history: Vec::new(),
        }
    }

    /// Device node whose id is derived from its ip.
    #[must_use]
    pub fn device(ip: &str, hostname: Option<&str>, role: Role) -> Self {
        let mut node = Self::new(ip, display_name(Some(ip), hostname), role);
        node.ip = Some(ip.to_owned());
        node.hostname = hostname.map(ToOwned::to_owned);
        node
    }

    /// Synthetic group container with id `group:<name>`.
    #[must_use]
    pub fn group(name: &str) -> Self {
        Self::new(format!("{GROUP_ID_PREFIX}{name}"), name, Role::Group)
    }

    #[must_use]
    pub fn is_group(&self) -> bool {
        self.role == Role::Group
    }

    /// Monitoring defaults to enabled when unset.
    #[must_use]
    pub fn is_monitored(&self) -> bool {
        self.monitoring_enabled.unwrap_or(true)
    }

    /// Regenerate `name` from the current `ip` and `hostname`.
    pub fn refresh_name(&mut self) {
        self.name = display_name(self.ip.as_deref(), self.hostname.as_deref());
    }
}

/// Display label for a device: hostname when known, else ip.
#[must_use]
pub fn display_name(ip: Option<&str>, hostname: Option<&str>) -> String {
    match (hostname.filter(|h| !h.is_empty()), ip.filter(|i| !i.is_empty())) {
        (Some(host), _) => host.to_owned(),
        (None, Some(ip)) => ip.to_owned(),
        (None, None) => "New device".to_owned(),
    }
}

// =============================================================================
// POSITION
// =============================================================================

/// Pixel position on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

// =============================================================================
// PARSER OUTPUT
// =============================================================================

/// Gateway line from the report preamble.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayInfo {
    pub ip: String,
    pub hostname: Option<String>,
}

/// One row of the `Devices Found` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEntry {
    pub ip: String,
    pub hostname: Option<String>,
    pub role: Role,
    pub depth: Option<u32>,
}

/// Everything extracted from one scanner report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedNetworkMap {
    pub raw: String,
    pub gateway: Option<GatewayInfo>,
    pub lan_interface: Option<String>,
    pub subnet: Option<String>,
    pub devices: Vec<DeviceEntry>,
    pub root: TreeNode,
}

#[cfg(test)]
#[path = "model_test.rs"]
mod tests;
