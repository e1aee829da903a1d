#![allow(clippy::float_cmp)]

use chrono::{DateTime, Duration, TimeZone, Utc};

use super::*;
use crate::clock::FixedClock;
use crate::error::ErrorCode;
use crate::parse::parse;
use crate::tree::find_group_by_prefix;

const REPORT: &str = "\
Gateway: 10.0.0.1 (router.lan)
=== Devices Found ===
10.0.0.2 | switch.lan | role=switch/ap | depth=1
10.0.0.5 | nas.lan | role=nas | depth=2
10.0.0.20 | laptop.lan | role=client | depth=2
=== Heuristic Topology Tree ===
Infrastructure:
 - 10.0.0.2 (switch.lan) [switch]
Servers:
 - 10.0.0.5 (nas.lan) [server]
Clients:
 - 10.0.0.20 (laptop.lan) [client]
";

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

fn t1() -> DateTime<Utc> {
    t0() + Duration::hours(1)
}

fn session() -> NetworkSession {
    NetworkSession::from_parsed(parse(REPORT, t0()), Arc::new(FixedClock(t1())), LayoutConfig::default())
}

/// Ids of every group currently holding `id`.
fn groups_holding(session: &NetworkSession, id: &str) -> Vec<String> {
    session
        .root()
        .children
        .iter()
        .filter(|child| child.is_group() && child.children.iter().any(|n| n.id == id))
        .map(|group| group.id.clone())
        .collect()
}

fn last_change(session: &NetworkSession, id: &str) -> String {
    let node = session.node(id).unwrap();
    node.history.last().unwrap().changes.join("; ")
}

// =============================================================================
// change_role
// =============================================================================

#[test]
fn role_change_to_server_moves_node_into_servers_only() {
    let mut s = session();
    s.change_role("10.0.0.20", Role::Server).unwrap();

    assert_eq!(groups_holding(&s, "10.0.0.20"), vec!["group:Servers:".to_owned()]);
    let node = s.node("10.0.0.20").unwrap();
    assert_eq!(node.role, Role::Server);
    assert_eq!(node.version, Some(2));
    assert_eq!(node.updated_at, Some(t1()));
    assert_eq!(last_change(&s, "10.0.0.20"), "Role changed from client to server");
}

#[test]
fn role_change_creates_missing_group() {
    let mut s = session();
    s.change_role("10.0.0.2", Role::Client).unwrap();
    s.change_role("10.0.0.5", Role::Firewall).unwrap();

    // Parsed header group is reused even though it is now empty of switches.
    assert_eq!(groups_holding(&s, "10.0.0.5"), vec!["group:Infrastructure:".to_owned()]);

    let mut bare = NetworkSession::new(
        {
            let mut root = TreeNode::device("10.0.0.1", None, Role::Gateway);
            let mut clients = TreeNode::group("clients");
            clients.children.push(TreeNode::device("10.0.0.9", None, Role::Client));
            root.children.push(clients);
            root
        },
        Arc::new(FixedClock(t1())),
        LayoutConfig::default(),
    );
    bare.change_role("10.0.0.9", Role::Firewall).unwrap();
    let group = find_group_by_prefix(bare.root(), "infrastructure").unwrap();
    assert_eq!(group.id, "group:infrastructure");
    assert_eq!(group.name, "Infrastructure");
    assert_eq!(group.children[0].id, "10.0.0.9");
}

#[test]
fn role_change_to_gateway_lifts_node_to_root() {
    let mut s = session();
    s.change_role("10.0.0.2", Role::Gateway).unwrap();
    assert!(groups_holding(&s, "10.0.0.2").is_empty());
    assert!(s.root().children.iter().any(|c| c.id == "10.0.0.2"));
    assert!(s.devices().iter().any(|d| d.id == "10.0.0.2"));
}

#[test]
fn unchanged_role_is_not_a_mutation() {
    let mut s = session();
    s.change_role("10.0.0.20", Role::Client).unwrap();
    assert_eq!(s.node("10.0.0.20").unwrap().version, Some(1));
}

#[test]
fn role_change_rejects_bad_input() {
    let mut s = session();
    assert_eq!(s.change_role("10.0.0.20", Role::Group), Err(TreeError::InvalidRole(Role::Group)));
    assert_eq!(s.change_role("group:Servers:", Role::Server), Err(TreeError::GroupNode("group:Servers:".into())));
    let err = s.change_role("10.9.9.9", Role::Server).unwrap_err();
    assert_eq!(err.error_code(), "E_NODE_NOT_FOUND");
}

#[test]
fn root_role_change_keeps_root_in_place() {
    let mut s = session();
    s.change_role("10.0.0.1", Role::Firewall).unwrap();
    assert_eq!(s.root().id, "10.0.0.1");
    assert_eq!(s.root().role, Role::Firewall);
    assert!(groups_holding(&s, "10.0.0.1").is_empty());
}

// =============================================================================
// remove_node
// =============================================================================

#[test]
fn remove_reattaches_dependents_to_root() {
    let mut s = session();
    s.set_parent("10.0.0.20", Some("10.0.0.5")).unwrap();
    s.move_node("10.0.0.5", 10.0, 20.0).unwrap();
    s.select(Some("10.0.0.5")).unwrap();

    let removed = s.remove_node("10.0.0.5").unwrap();
    assert_eq!(removed.id, "10.0.0.5");
    assert!(s.node("10.0.0.5").is_none());

    let orphan = s.node("10.0.0.20").unwrap();
    assert_eq!(orphan.parent_id.as_deref(), Some("10.0.0.1"));
    assert_eq!(orphan.version, Some(3));
    assert!(s.positions().get("10.0.0.5").is_none());
    assert_eq!(s.selected(), None);
}

#[test]
fn remove_keeps_unrelated_selection() {
    let mut s = session();
    s.select(Some("10.0.0.2")).unwrap();
    s.remove_node("10.0.0.20").unwrap();
    assert_eq!(s.selected(), Some("10.0.0.2"));
}

#[test]
fn remove_rejects_root_groups_and_unknown_ids() {
    let mut s = session();
    assert_eq!(s.remove_node("10.0.0.1").unwrap_err(), TreeError::RootRemoval);
    assert_eq!(s.remove_node("group:Clients:").unwrap_err(), TreeError::GroupNode("group:Clients:".into()));
    assert_eq!(s.remove_node("nope").unwrap_err(), TreeError::NotFound("nope".into()));
}

// =============================================================================
// add_node
// =============================================================================

#[test]
fn add_node_creates_selected_manual_device_in_clients() {
    let mut s = session();
    let id = s.add_node();

    assert!(id.starts_with(&format!("{MANUAL_ID_PREFIX}{}-", t1().timestamp_millis())));
    assert_eq!(groups_holding(&s, &id), vec!["group:Clients:".to_owned()]);
    assert_eq!(s.selected(), Some(id.as_str()));

    let node = s.node(&id).unwrap();
    assert_eq!(node.role, Role::Unknown);
    assert_eq!(node.name, "New device");
    assert_eq!(node.parent_id.as_deref(), Some("10.0.0.1"));
    assert_eq!(node.version, Some(1));
    assert_eq!(node.history[0].changes, vec!["Node created (manual)".to_owned()]);
}

#[test]
fn add_node_ids_are_unique_under_a_frozen_clock() {
    let mut s = session();
    let a = s.add_node();
    let b = s.add_node();
    assert_ne!(a, b);
}

// =============================================================================
// update_ip
// =============================================================================

#[test]
fn ip_change_rekeys_node_and_every_reference() {
    let mut s = session();
    s.set_parent("10.0.0.20", Some("10.0.0.5")).unwrap();
    s.move_node("10.0.0.5", 5.0, 6.0).unwrap();
    s.select(Some("10.0.0.5")).unwrap();

    let new_id = s.update_ip("10.0.0.5", Some("10.0.0.50")).unwrap();
    assert_eq!(new_id, "10.0.0.50");
    assert!(s.node("10.0.0.5").is_none());

    let node = s.node("10.0.0.50").unwrap();
    assert_eq!(node.ip.as_deref(), Some("10.0.0.50"));
    assert_eq!(node.name, "nas.lan");
    assert_eq!(node.version, Some(2));
    assert_eq!(last_change(&s, "10.0.0.50"), "IP changed from 10.0.0.5 to 10.0.0.50");

    assert_eq!(s.node("10.0.0.20").unwrap().parent_id.as_deref(), Some("10.0.0.50"));
    assert_eq!(s.positions().get("10.0.0.50"), Some(Position::new(5.0, 6.0)));
    assert!(s.positions().get("10.0.0.5").is_none());
    assert_eq!(s.selected(), Some("10.0.0.50"));
}

#[test]
fn ip_change_on_root_repoints_children() {
    let mut s = session();
    s.update_ip("10.0.0.1", Some("10.0.0.254")).unwrap();
    assert_eq!(s.root().id, "10.0.0.254");
    assert_eq!(s.node("10.0.0.2").unwrap().parent_id.as_deref(), Some("10.0.0.254"));
}

#[test]
fn ip_collision_is_rejected_without_changes() {
    let mut s = session();
    let before = s.root().clone();
    let err = s.update_ip("10.0.0.5", Some("10.0.0.20")).unwrap_err();
    assert_eq!(err, TreeError::DuplicateId("10.0.0.20".into()));
    assert_eq!(err.error_code(), "E_DUPLICATE_ID");
    assert_eq!(s.root(), &before);
}

#[test]
fn manual_device_takes_id_from_new_ip() {
    let mut s = session();
    let id = s.add_node();
    let new_id = s.update_ip(&id, Some(" 10.0.0.77 ")).unwrap();
    assert_eq!(new_id, "10.0.0.77");
    assert_eq!(s.node("10.0.0.77").unwrap().name, "10.0.0.77");
    assert_eq!(s.selected(), Some("10.0.0.77"));
}

#[test]
fn clearing_ip_keeps_id() {
    let mut s = session();
    let id = s.update_ip("10.0.0.20", None).unwrap();
    assert_eq!(id, "10.0.0.20");
    let node = s.node("10.0.0.20").unwrap();
    assert!(node.ip.is_none());
    assert_eq!(last_change(&s, "10.0.0.20"), "IP changed from 10.0.0.20 to none");
}

// =============================================================================
// other field edits
// =============================================================================

#[test]
fn hostname_edit_regenerates_name() {
    let mut s = session();
    s.update_hostname("10.0.0.20", Some("desk.lan")).unwrap();
    assert_eq!(s.node("10.0.0.20").unwrap().name, "desk.lan");
    assert_eq!(last_change(&s, "10.0.0.20"), "Hostname changed from laptop.lan to desk.lan");

    s.update_hostname("10.0.0.20", Some("  ")).unwrap();
    let node = s.node("10.0.0.20").unwrap();
    assert!(node.hostname.is_none());
    assert_eq!(node.name, "10.0.0.20");
    assert_eq!(node.version, Some(3));
}

#[test]
fn connection_speed_is_tracked() {
    let mut s = session();
    s.set_connection_speed("10.0.0.2", Some("1 Gbps")).unwrap();
    s.set_connection_speed("10.0.0.2", Some("1 Gbps")).unwrap();
    let node = s.node("10.0.0.2").unwrap();
    assert_eq!(node.connection_speed.as_deref(), Some("1 Gbps"));
    assert_eq!(node.version, Some(2));
}

#[test]
fn monitoring_toggle_feeds_ip_sets() {
    let mut s = session();
    assert_eq!(s.monitored_ips(), vec!["10.0.0.1", "10.0.0.2", "10.0.0.5", "10.0.0.20"]);
    assert!(s.silenced_ips().is_empty());

    s.set_monitoring("10.0.0.5", true).unwrap();
    assert_eq!(s.node("10.0.0.5").unwrap().version, Some(1));

    s.set_monitoring("10.0.0.5", false).unwrap();
    assert_eq!(s.silenced_ips(), vec!["10.0.0.5"]);
    assert_eq!(last_change(&s, "10.0.0.5"), "Monitoring disabled");

    // Manual devices without an ip are never polled.
    s.add_node();
    assert_eq!(s.monitored_ips().len(), 4);
}

#[test]
fn set_parent_validates_target() {
    let mut s = session();
    let invalid = |id: &str, parent: &str| TreeError::InvalidParent { id: id.into(), parent: parent.into() };

    assert_eq!(s.set_parent("10.0.0.20", Some("10.0.0.20")), Err(invalid("10.0.0.20", "10.0.0.20")));
    assert_eq!(s.set_parent("10.0.0.20", Some("10.9.9.9")), Err(invalid("10.0.0.20", "10.9.9.9")));
    assert_eq!(s.set_parent("10.0.0.20", Some("group:Servers:")), Err(invalid("10.0.0.20", "group:Servers:")));
    assert_eq!(s.set_parent("10.0.0.1", Some("10.0.0.2")), Err(invalid("10.0.0.1", "10.0.0.2")));

    s.set_parent("10.0.0.20", Some("10.0.0.2")).unwrap();
    assert_eq!(last_change(&s, "10.0.0.20"), "Parent changed from 10.0.0.1 to 10.0.0.2");
    s.set_parent("10.0.0.20", None).unwrap();
    assert!(s.node("10.0.0.20").unwrap().parent_id.is_none());
    assert_eq!(s.node("10.0.0.20").unwrap().version, Some(3));
}

// =============================================================================
// positions & layout
// =============================================================================

#[test]
fn move_node_pins_and_records_without_versioning() {
    let mut s = session();
    s.move_node("10.0.0.2", 300.0, 150.0).unwrap();
    let node = s.node("10.0.0.2").unwrap();
    assert_eq!((node.fx, node.fy), (Some(300.0), Some(150.0)));
    assert_eq!(node.version, Some(1));
    assert_eq!(s.export_layout().positions["10.0.0.2"], Position::new(300.0, 150.0));
    assert!(s.move_node("group:Servers:", 1.0, 1.0).is_err());
}

#[test]
fn auto_layout_replaces_manual_positions() {
    let mut s = session();
    s.move_node("10.0.0.2", 999.0, 999.0).unwrap();
    let layout = s.auto_layout();

    assert!(s.positions().is_empty());
    let config = LayoutConfig::default();
    assert_eq!(s.root().fx, Some(config.margin_x));
    let node = s.node("10.0.0.2").unwrap();
    assert_eq!(node.fx, Some(layout.positions["10.0.0.2"].x));
    assert_eq!(layout.max_depth, 1);
    assert_eq!(s.export_layout().positions.len(), 4);
}

// =============================================================================
// persistence
// =============================================================================

#[test]
fn saved_layout_rebuilds_equivalent_session() {
    let mut s = session();
    s.auto_layout();
    s.move_node("10.0.0.5", 42.0, 43.0).unwrap();
    let saved = s.export_layout();
    assert_eq!(saved.timestamp, Some(t1()));

    let restored = NetworkSession::from_saved(&saved, Arc::new(FixedClock(t1())), LayoutConfig::default()).unwrap();
    assert_eq!(restored.export_layout().positions, saved.positions);
    assert_eq!(restored.positions().get("10.0.0.5"), Some(Position::new(42.0, 43.0)));
    assert_eq!(restored.node("10.0.0.5").unwrap().version, Some(1));
}

#[test]
fn saved_layout_without_snapshot_yields_no_session() {
    let saved = SavedLayout { version: 1, timestamp: None, positions: Default::default(), root: None };
    assert!(NetworkSession::from_saved(&saved, Arc::new(FixedClock(t1())), LayoutConfig::default()).is_none());
}

#[test]
fn snapshot_changes_only_with_state() {
    let mut s = session();
    let first = s.snapshot().unwrap();
    assert_eq!(s.snapshot().unwrap(), first);
    assert!(crate::persist::import_layout(&first).unwrap().timestamp.is_none());

    s.move_node("10.0.0.2", 1.0, 2.0).unwrap();
    assert_ne!(s.snapshot().unwrap(), first);
}
