use super::*;

#[test]
fn role_serde_uses_wire_labels() {
    let cases = [
        (Role::Gateway, "\"gateway/router\""),
        (Role::Switch, "\"switch/ap\""),
        (Role::Nas, "\"nas\""),
        (Role::Unknown, "\"unknown\""),
        (Role::Group, "\"group\""),
    ];
    for (role, expected) in cases {
        assert_eq!(serde_json::to_string(&role).unwrap(), expected);
        let back: Role = serde_json::from_str(expected).unwrap();
        assert_eq!(back, role);
        assert_eq!(format!("\"{role}\""), expected);
    }
}

#[test]
fn device_id_and_name_follow_ip_and_hostname() {
    let node = TreeNode::device("10.0.0.5", Some("nas.lan"), Role::Nas);
    assert_eq!(node.id, "10.0.0.5");
    assert_eq!(node.name, "nas.lan");
    assert_eq!(node.ip.as_deref(), Some("10.0.0.5"));

    let bare = TreeNode::device("10.0.0.6", None, Role::Client);
    assert_eq!(bare.name, "10.0.0.6");
}

#[test]
fn display_name_falls_back_when_empty() {
    assert_eq!(display_name(Some("10.0.0.1"), Some("")), "10.0.0.1");
    assert_eq!(display_name(None, None), "New device");
    assert_eq!(display_name(Some(""), Some("host")), "host");
}

#[test]
fn group_nodes_have_prefixed_ids() {
    let group = TreeNode::group("Servers:");
    assert_eq!(group.id, "group:Servers:");
    assert!(group.is_group());
    assert!(group.version.is_none());
    assert!(group.ip.is_none());
}

#[test]
fn monitoring_defaults_to_enabled() {
    let mut node = TreeNode::device("10.0.0.9", None, Role::Client);
    assert!(node.is_monitored());
    node.monitoring_enabled = Some(false);
    assert!(!node.is_monitored());
}

#[test]
fn tree_node_serializes_camel_case_and_skips_empty() {
    let mut node = TreeNode::device("10.0.0.2", Some("pc"), Role::Client);
    node.parent_id = Some("10.0.0.1".into());
    node.monitoring_enabled = Some(false);
    let value = serde_json::to_value(&node).unwrap();
    assert_eq!(value["parentId"], "10.0.0.1");
    assert_eq!(value["monitoringEnabled"], false);
    assert!(value.get("children").is_none());
    assert!(value.get("version").is_none());
    assert!(value.get("fx").is_none());
}

#[test]
fn tree_node_deserializes_with_missing_optionals() {
    let node: TreeNode = serde_json::from_str(r#"{"id":"a","name":"A"}"#).unwrap();
    assert_eq!(node.role, Role::Unknown);
    assert!(node.children.is_empty());
    assert!(node.history.is_empty());
}
