//! Integration tests: JSON records → Store adoption → derived state.
//!
//! Exercises the path an embedder takes: deserialize node and edge arrays,
//! hand them to the store, then query lookups, hit tests and deletion.

use flow_core::config::FlowConfig;
use flow_core::hit;
use flow_core::id::{EdgeId, NodeId};
use flow_core::model::{Edge, HandleType, Node};
use flow_core::store::{FlowEvent, Store};
use flow_core::geometry::Point;
use pretty_assertions::assert_eq;
use serde::Deserialize;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Deserialize)]
struct Fixture {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

fn fixture() -> Fixture {
    serde_json::from_str(include_str!("fixtures/nested.json")).unwrap()
}

fn make_store() -> (Store, Rc<RefCell<Vec<String>>>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let Fixture { nodes, edges } = fixture();
    let mut store = Store::new(FlowConfig::default());
    store.set_container_size(800.0, 600.0);
    let codes = Rc::new(RefCell::new(Vec::new()));
    let sink = codes.clone();
    store.set_error_handler(move |e| sink.borrow_mut().push(e.code().to_string()));
    assert!(store.set_nodes(nodes), "every fixture node is measured");
    store.set_edges(edges);
    (store, codes)
}

fn abs(store: &Store, id: &str) -> Point {
    store
        .internal_node(NodeId::intern(id))
        .unwrap_or_else(|| panic!("@{id} not adopted"))
        .internals
        .position_absolute
}

// ─── Parent resolution ───────────────────────────────────────────────────

#[test]
fn child_listed_first_resolves_against_its_parent() {
    let (store, codes) = make_store();
    assert_eq!(abs(&store, "child"), Point::new(110.0, 120.0));

    let children: Vec<NodeId> = store.children(NodeId::intern("group")).collect();
    assert_eq!(children, vec![NodeId::intern("child")]);

    let child_z = store.internal_node(NodeId::intern("child")).unwrap().internals.z;
    let group_z = store.internal_node(NodeId::intern("group")).unwrap().internals.z;
    assert!(child_z > group_z, "child z {child_z} must exceed parent z {group_z}");
    assert!(codes.borrow().is_empty());
}

#[test]
fn moving_the_parent_moves_the_child() {
    let (mut store, _) = make_store();
    let mut nodes = store.nodes().to_vec();
    let group = nodes.iter_mut().find(|n| n.id.as_str() == "group").unwrap();
    group.position = Point::new(200.0, 100.0);
    store.set_nodes(nodes);
    assert_eq!(abs(&store, "child"), Point::new(210.0, 120.0));
}

#[test]
fn unmeasured_node_is_not_initialized_and_not_hit() {
    let (mut store, _) = make_store();
    let mut nodes = store.nodes().to_vec();
    nodes.push(Node::new("pending", Point::new(700.0, 0.0)));
    assert!(!store.set_nodes(nodes));
    assert!(!store.nodes_initialized());
    assert_eq!(hit::node_at_point(store.node_lookup(), Point::new(700.0, 0.0)), None);
}

// ─── Hit testing ─────────────────────────────────────────────────────────

#[test]
fn topmost_node_wins() {
    let (store, _) = make_store();
    // Inside both the group and its child.
    assert_eq!(
        hit::node_at_point(store.node_lookup(), Point::new(115.0, 125.0)),
        Some(NodeId::intern("child"))
    );
    assert_eq!(
        hit::node_at_point(store.node_lookup(), Point::new(250.0, 200.0)),
        Some(NodeId::intern("group"))
    );
}

#[test]
fn declared_handles_are_hit_before_measurement() {
    let (store, _) = make_store();
    let handle = hit::handle_at_point(store.node_lookup(), Point::new(400.0, 70.0), 0.0)
        .expect("target handle of @free");
    assert_eq!(handle.node_id, NodeId::intern("free"));
    assert_eq!(handle.handle_type, HandleType::Target);
}

// ─── Edges ───────────────────────────────────────────────────────────────

#[test]
fn connection_lookup_sees_both_edges_of_a_node() {
    let (store, _) = make_store();
    let mut ids: Vec<EdgeId> = store
        .connections(NodeId::intern("free"), None, None)
        .map(|c| c.edge_id)
        .collect();
    ids.sort_by_key(|id| id.as_str().to_string());
    assert_eq!(ids, vec![EdgeId::intern("child-free"), EdgeId::intern("free-locked")]);
}

#[test]
fn edge_without_a_source_handle_reports_008() {
    let (mut store, codes) = make_store();
    assert!(store.edge_endpoints(EdgeId::intern("child-free")).is_none());
    assert_eq!(*codes.borrow(), vec!["008".to_string()]);
}

// ─── Deletion ────────────────────────────────────────────────────────────

#[test]
fn deleting_a_parent_takes_children_and_edges() {
    let (mut store, _) = make_store();
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = events.clone();
    store.subscribe(move |e| sink.borrow_mut().push(e.clone()));

    let removed = store.delete_elements(&[NodeId::intern("group")], &[]);
    let mut nodes: Vec<&str> = removed.nodes.iter().map(|id| id.as_str()).collect();
    nodes.sort();
    assert_eq!(nodes, vec!["child", "group"]);
    assert_eq!(removed.edges, vec![EdgeId::intern("child-free")]);

    let left: Vec<&str> = store.nodes().iter().map(|n| n.id.as_str()).collect();
    assert_eq!(left, vec!["free", "locked"]);
    assert_eq!(store.edges().len(), 1);
    assert!(events.borrow().iter().any(|e| matches!(e, FlowEvent::Delete { .. })));
}

#[test]
fn non_deletable_node_survives() {
    let (mut store, _) = make_store();
    let removed = store.delete_elements(&[NodeId::intern("locked")], &[]);
    assert!(removed.is_empty());
    assert_eq!(store.nodes().len(), 4);
}

// ─── Errors ──────────────────────────────────────────────────────────────

#[test]
fn clicking_an_unknown_node_reports_012() {
    let (mut store, codes) = make_store();
    store.handle_node_click(NodeId::intern("nope"), false);
    assert_eq!(*codes.borrow(), vec!["012".to_string()]);
    assert!(store.selected_nodes().is_empty());
}

#[test]
fn delete_event_serializes_as_plain_ids() {
    let (mut store, _) = make_store();
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = events.clone();
    store.subscribe(move |e| {
        if let FlowEvent::NodesChange(changes) = e {
            sink.borrow_mut().extend(changes.iter().cloned());
        }
    });
    store.delete_elements(&[NodeId::intern("free")], &[]);
    let json = serde_json::to_value(&events.borrow()[0]).unwrap();
    assert_eq!(json, serde_json::json!({ "type": "remove", "id": "free" }));
}
