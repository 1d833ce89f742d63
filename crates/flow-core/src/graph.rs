//! Edge and graph utilities.
//!
//! Helpers over plain node/edge slices: creating and reconnecting edges
//! without duplicates, neighbour queries, resolving where an edge attaches
//! to its nodes, and working out what a delete really removes.

use crate::error::{FlowError, Result};
use crate::geometry::{Bounds, Point, Rect, Viewport, bounds_of_boxes, bounds_to_rect, overlapping_area, rect_to_bounds};
use crate::id::{EdgeId, NodeId};
use crate::model::{
    Connection, ConnectionMode, Edge, Handle, HandleBounds, HandleType, InternalNode, Node, Side,
};
use crate::paths::Endpoints;
use indexmap::IndexSet;

/// z offset for selected elements.
pub const SELECTED_Z_OFFSET: i32 = 1000;

// ─── Edge creation ───────────────────────────────────────────────────────

/// Deterministic id for an edge built from a connection.
pub fn edge_id_for(c: &Connection) -> EdgeId {
    let handle = |h: Option<crate::id::HandleId>| h.map(|h| h.as_str().to_string()).unwrap_or_default();
    EdgeId::intern(&format!(
        "xy-edge__{}{}-{}{}",
        c.source,
        handle(c.source_handle),
        c.target,
        handle(c.target_handle)
    ))
}

/// An edge with these endpoints (handles included) already exists.
pub fn connection_exists(c: &Connection, edges: &[Edge]) -> bool {
    edges.iter().any(|e| e.connects_like(c))
}

/// Append `edge` unless an edge with identical endpoints exists.
///
/// Returns whether the edge was added.
pub fn add_edge(edge: Edge, edges: &mut Vec<Edge>) -> Result<bool> {
    if edge.source.is_empty() || edge.target.is_empty() {
        return Err(FlowError::MissingEdgeEndpoint);
    }
    if connection_exists(&edge.connection(), edges) {
        log::debug!("edge {} duplicates existing endpoints, skipped", edge.id);
        return Ok(false);
    }
    edges.push(edge);
    Ok(true)
}

/// [`add_edge`] for a bare connection, with a derived id.
pub fn add_connection(c: &Connection, edges: &mut Vec<Edge>) -> Result<bool> {
    add_edge(Edge::from_connection(edge_id_for(c), c), edges)
}

/// Move an existing edge onto new endpoints. The edge is re-appended at
/// the end, under a derived id when `replace_id` is set.
pub fn reconnect_edge(
    old: &Edge,
    new_connection: &Connection,
    edges: &mut Vec<Edge>,
    replace_id: bool,
) -> Result<EdgeId> {
    if new_connection.source.is_empty() || new_connection.target.is_empty() {
        return Err(FlowError::MissingEdgeEndpoint);
    }
    let Some(found) = edges.iter().position(|e| e.id == old.id) else {
        return Err(FlowError::UnknownEdge { edge: old.id });
    };
    let mut edge = edges.remove(found);
    edge.id = if replace_id {
        edge_id_for(new_connection)
    } else {
        old.id
    };
    edge.source = new_connection.source;
    edge.target = new_connection.target;
    edge.source_handle = new_connection.source_handle;
    edge.target_handle = new_connection.target_handle;
    let id = edge.id;
    edges.push(edge);
    Ok(id)
}

// ─── Neighbours ──────────────────────────────────────────────────────────

/// Edges touching any of `nodes`.
pub fn connected_edges<'a>(nodes: &IndexSet<NodeId>, edges: &'a [Edge]) -> Vec<&'a Edge> {
    edges
        .iter()
        .filter(|e| nodes.contains(&e.source) || nodes.contains(&e.target))
        .collect()
}

/// Nodes with an edge into `node`.
pub fn incomers<'a>(node: NodeId, nodes: &'a [Node], edges: &[Edge]) -> Vec<&'a Node> {
    let ids: IndexSet<NodeId> = edges
        .iter()
        .filter(|e| e.target == node)
        .map(|e| e.source)
        .collect();
    nodes.iter().filter(|n| ids.contains(&n.id)).collect()
}

/// Nodes `node` has an edge into.
pub fn outgoers<'a>(node: NodeId, nodes: &'a [Node], edges: &[Edge]) -> Vec<&'a Node> {
    let ids: IndexSet<NodeId> = edges
        .iter()
        .filter(|e| e.source == node)
        .map(|e| e.target)
        .collect();
    nodes.iter().filter(|n| ids.contains(&n.id)).collect()
}

// ─── Edge geometry ───────────────────────────────────────────────────────

/// Handle bounds from the handles a node declares, for nodes whose
/// handles have not been measured yet.
pub fn declared_handle_bounds(node: &Node) -> Option<HandleBounds> {
    if node.handles.is_empty() {
        return None;
    }
    let mut bounds = HandleBounds::default();
    for h in &node.handles {
        let handle = Handle {
            id: h.id,
            node_id: node.id,
            handle_type: h.handle_type,
            position: h.position,
            x: h.x,
            y: h.y,
            width: h.width.unwrap_or(1.0),
            height: h.height.unwrap_or(1.0),
            connectable: h.connectable,
        };
        match h.handle_type {
            HandleType::Source => bounds.source.push(handle),
            HandleType::Target => bounds.target.push(handle),
        }
    }
    Some(bounds)
}

/// Measured handle bounds, else the declared ones.
pub fn effective_handle_bounds(node: &InternalNode) -> Option<HandleBounds> {
    node.internals
        .handle_bounds
        .clone()
        .or_else(|| declared_handle_bounds(&node.node))
}

/// Absolute attachment point of `handle` on `node`: the midpoint of the
/// side it sits on, or its centre. Without a handle the node box is used.
pub fn handle_position(node: &InternalNode, handle: Option<&Handle>, fallback: Side, center: bool) -> Point {
    let abs = node.internals.position_absolute;
    let x = handle.map(|h| h.x).unwrap_or(0.0) + abs.x;
    let y = handle.map(|h| h.y).unwrap_or(0.0) + abs.y;
    let (width, height) = match handle {
        Some(h) => (h.width, h.height),
        None => {
            let d = node.dimensions();
            (d.width, d.height)
        }
    };
    if center {
        return Point::new(x + width / 2.0, y + height / 2.0);
    }
    match handle.map(|h| h.position).unwrap_or(fallback) {
        Side::Top => Point::new(x + width / 2.0, y),
        Side::Right => Point::new(x + width, y + height / 2.0),
        Side::Bottom => Point::new(x + width / 2.0, y + height),
        Side::Left => Point::new(x, y + height / 2.0),
    }
}

/// Endpoints of `edge` between its two nodes.
///
/// The source handle is looked up among source handles. The target handle
/// is looked up among target handles, plus source handles in loose mode.
/// A missing handle id means the first handle of the list.
pub fn edge_position(
    edge: &Edge,
    source: &InternalNode,
    target: &InternalNode,
    mode: ConnectionMode,
) -> Result<Endpoints> {
    let source_bounds = effective_handle_bounds(source).unwrap_or_default();
    let target_bounds = effective_handle_bounds(target).unwrap_or_default();

    let source_handle = source_bounds.find(HandleType::Source, edge.source_handle);
    let target_handle = match mode {
        ConnectionMode::Strict => target_bounds.find(HandleType::Target, edge.target_handle),
        ConnectionMode::Loose => {
            let mut all = target_bounds.target.iter().chain(target_bounds.source.iter());
            match edge.target_handle {
                Some(id) => all.find(|h| h.id == Some(id)),
                None => all.next(),
            }
        }
    };

    let (Some(sh), Some(th)) = (source_handle, target_handle) else {
        let (handle_type, handle) = if source_handle.is_none() {
            (HandleType::Source, edge.source_handle)
        } else {
            (HandleType::Target, edge.target_handle)
        };
        return Err(FlowError::UnresolvedHandle {
            edge: edge.id,
            handle_type,
            handle,
        });
    };

    let s = handle_position(source, Some(sh), sh.position, false);
    let t = handle_position(target, Some(th), th.position, false);
    Ok(Endpoints::new(s, sh.position, t, th.position))
}

/// Stacking order for an edge: lifted above its selected endpoints when
/// elevation is on.
pub fn elevated_edge_z_index(
    source: &InternalNode,
    target: &InternalNode,
    selected: bool,
    z_index: i32,
    elevate_on_select: bool,
) -> i32 {
    if !elevate_on_select {
        return z_index;
    }
    let touched = selected || source.node.selected || target.node.selected;
    let lifted = source.internals.z.max(target.internals.z).max(SELECTED_Z_OFFSET);
    z_index + if touched { lifted } else { 0 }
}

/// The box spanning both endpoint nodes intersects the visible pane.
pub fn is_edge_visible(source: &InternalNode, target: &InternalNode, width: f64, height: f64, t: Viewport) -> bool {
    let mut b = bounds_of_boxes(rect_to_bounds(source.rect()), rect_to_bounds(target.rect()));
    if b.x == b.x2 {
        b.x2 += 1.0;
    }
    if b.y == b.y2 {
        b.y2 += 1.0;
    }
    let view = crate::geometry::viewport_rect(t, width, height);
    overlapping_area(view, bounds_to_rect(b)) > 0.0
}

// ─── Bounds ──────────────────────────────────────────────────────────────

/// Union of the nodes' absolute rectangles, zero-size when empty.
pub fn nodes_bounds<'a>(nodes: impl IntoIterator<Item = &'a InternalNode>) -> Rect {
    let mut acc = Bounds::EMPTY;
    let mut any = false;
    for n in nodes {
        acc = bounds_of_boxes(acc, rect_to_bounds(n.rect()));
        any = true;
    }
    if any { bounds_to_rect(acc) } else { Rect::default() }
}

// ─── Deletion ────────────────────────────────────────────────────────────

/// Everything a delete request actually removes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ElementsToRemove {
    pub nodes: Vec<NodeId>,
    pub edges: Vec<EdgeId>,
}

impl ElementsToRemove {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

/// Expand a delete request: requested nodes plus their descendants, every
/// edge touching a removed node, and the requested edges. Elements with
/// `deletable == Some(false)` survive, and so do their descendants.
pub fn elements_to_remove(
    node_ids: &[NodeId],
    edge_ids: &[EdgeId],
    nodes: &[Node],
    edges: &[Edge],
) -> ElementsToRemove {
    let mut removed: IndexSet<NodeId> = IndexSet::new();
    for n in nodes {
        if n.is_deletable() && node_ids.contains(&n.id) {
            removed.insert(n.id);
        }
    }
    // Children may be listed before their parents.
    loop {
        let before = removed.len();
        for n in nodes {
            if n.is_deletable()
                && !removed.contains(&n.id)
                && n.parent_id.is_some_and(|p| removed.contains(&p))
            {
                removed.insert(n.id);
            }
        }
        if removed.len() == before {
            break;
        }
    }

    let mut removed_edges: IndexSet<EdgeId> = IndexSet::new();
    for e in edges.iter().filter(|e| e.is_deletable()) {
        if removed.contains(&e.source) || removed.contains(&e.target) || edge_ids.contains(&e.id) {
            removed_edges.insert(e.id);
        }
    }

    ElementsToRemove {
        nodes: nodes
            .iter()
            .filter(|n| removed.contains(&n.id))
            .map(|n| n.id)
            .collect(),
        edges: removed_edges.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::HandleId;
    use crate::model::NodeInternals;
    use pretty_assertions::assert_eq;

    fn conn(s: &str, sh: Option<&str>, t: &str, th: Option<&str>) -> Connection {
        Connection {
            source: NodeId::intern(s),
            target: NodeId::intern(t),
            source_handle: sh.map(HandleId::intern),
            target_handle: th.map(HandleId::intern),
        }
    }

    fn internal(node: Node, abs: Point) -> InternalNode {
        InternalNode {
            internals: NodeInternals {
                position_absolute: abs,
                z: 0,
                handle_bounds: None,
                user_node: node.clone(),
            },
            node,
        }
    }

    #[test]
    fn edge_ids_are_deterministic() {
        assert_eq!(edge_id_for(&conn("a", Some("s1"), "b", None)).as_str(), "xy-edge__as1-b");
        assert_eq!(edge_id_for(&conn("a", None, "b", Some("t"))).as_str(), "xy-edge__a-bt");
    }

    #[test]
    fn add_edge_is_idempotent() {
        let mut edges = Vec::new();
        let c = conn("a", Some("out"), "b", Some("in"));
        assert_eq!(add_connection(&c, &mut edges), Ok(true));
        assert_eq!(add_connection(&c, &mut edges), Ok(false));
        assert_eq!(edges.len(), 1);

        // Different handle is a different edge.
        assert_eq!(add_connection(&conn("a", None, "b", Some("in")), &mut edges), Ok(true));
        assert_eq!(edges.len(), 2);
    }

    #[test]
    fn add_edge_requires_endpoints() {
        let mut edges = Vec::new();
        let err = add_edge(Edge::new("e", "", "b"), &mut edges).unwrap_err();
        assert_eq!(err.code(), "006");
        assert!(edges.is_empty());
    }

    #[test]
    fn reconnect_moves_edge_to_end() {
        let mut edges = vec![Edge::new("e1", "a", "b"), Edge::new("e2", "b", "c")];
        let old = edges[0].clone();
        let id = reconnect_edge(&old, &conn("a", None, "c", None), &mut edges, true).unwrap();
        assert_eq!(id.as_str(), "xy-edge__a-c");
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[1].target, NodeId::intern("c"));

        let ghost = Edge::new("nope", "a", "b");
        let err = reconnect_edge(&ghost, &conn("a", None, "b", None), &mut edges, false).unwrap_err();
        assert_eq!(err.code(), "007");
    }

    #[test]
    fn neighbours() {
        let nodes = vec![
            Node::new("a", Point::ZERO),
            Node::new("b", Point::ZERO),
            Node::new("c", Point::ZERO),
        ];
        let edges = vec![Edge::new("e1", "a", "b"), Edge::new("e2", "b", "c")];
        let b = NodeId::intern("b");
        let ids = |v: Vec<&Node>| v.iter().map(|n| n.id.as_str().to_string()).collect::<Vec<_>>();
        assert_eq!(ids(incomers(b, &nodes, &edges)), vec!["a"]);
        assert_eq!(ids(outgoers(b, &nodes, &edges)), vec!["c"]);
        let set: IndexSet<NodeId> = [NodeId::intern("a")].into_iter().collect();
        assert_eq!(connected_edges(&set, &edges).len(), 1);
    }

    #[test]
    fn edge_position_uses_handle_sides() {
        let src = Node::new("s", Point::ZERO)
            .with_measured(100.0, 50.0)
            .with_handle(crate::model::NodeHandle {
                id: None,
                handle_type: HandleType::Source,
                position: Side::Right,
                x: 96.0,
                y: 21.0,
                width: Some(8.0),
                height: Some(8.0),
                connectable: None,
            });
        let tgt = Node::new("t", Point::ZERO)
            .with_measured(100.0, 50.0)
            .with_handle(crate::model::NodeHandle {
                id: Some(HandleId::intern("in")),
                handle_type: HandleType::Target,
                position: Side::Left,
                x: -4.0,
                y: 21.0,
                width: Some(8.0),
                height: Some(8.0),
                connectable: None,
            });
        let s = internal(src, Point::new(0.0, 0.0));
        let t = internal(tgt, Point::new(300.0, 100.0));

        let edge = Edge::new("e", "s", "t").with_handles(None, Some("in"));
        let ep = edge_position(&edge, &s, &t, ConnectionMode::Strict).unwrap();
        assert_eq!((ep.source_x, ep.source_y), (104.0, 25.0));
        assert_eq!((ep.target_x, ep.target_y), (296.0, 125.0));
        assert_eq!((ep.source_position, ep.target_position), (Side::Right, Side::Left));

        // Target handle id that only exists as a source handle.
        let bad = Edge::new("e2", "s", "s");
        let err = edge_position(&bad, &s, &s, ConnectionMode::Strict).unwrap_err();
        assert_eq!(err.code(), "008");
        assert!(edge_position(&bad, &s, &s, ConnectionMode::Loose).is_ok());
    }

    #[test]
    fn elevation_only_when_enabled() {
        let a = internal(Node::new("a", Point::ZERO).selected(true), Point::ZERO);
        let b = internal(Node::new("b", Point::ZERO), Point::ZERO);
        assert_eq!(elevated_edge_z_index(&a, &b, false, 0, false), 0);
        assert_eq!(elevated_edge_z_index(&a, &b, false, 0, true), 1000);
        assert_eq!(elevated_edge_z_index(&b, &b, false, 2, true), 2);
    }

    #[test]
    fn edge_visibility() {
        let a = internal(Node::new("a", Point::ZERO).with_measured(10.0, 10.0), Point::ZERO);
        let b = internal(Node::new("b", Point::ZERO).with_measured(10.0, 10.0), Point::new(50.0, 0.0));
        assert!(is_edge_visible(&a, &b, 100.0, 100.0, Viewport::IDENTITY));
        assert!(!is_edge_visible(&a, &b, 100.0, 100.0, Viewport::new(-1000.0, 0.0, 1.0)));
    }

    #[test]
    fn bounds_of_nothing_is_zero() {
        assert_eq!(nodes_bounds(std::iter::empty()), Rect::default());
        let a = internal(Node::new("a", Point::ZERO).with_measured(10.0, 10.0), Point::new(-5.0, 0.0));
        let b = internal(Node::new("b", Point::ZERO).with_measured(10.0, 20.0), Point::new(20.0, 5.0));
        assert_eq!(nodes_bounds([&a, &b]), Rect::new(-5.0, 0.0, 35.0, 25.0));
    }

    #[test]
    fn delete_cascades_to_children_and_edges() {
        let mut locked = Node::new("locked", Point::ZERO).with_parent("group");
        locked.deletable = Some(false);
        let nodes = vec![
            Node::new("child", Point::ZERO).with_parent("group"),
            Node::new("group", Point::ZERO),
            locked,
            Node::new("other", Point::ZERO),
        ];
        let mut kept_edge = Edge::new("e3", "other", "other");
        kept_edge.deletable = Some(false);
        let edges = vec![
            Edge::new("e1", "child", "other"),
            Edge::new("e2", "other", "other"),
            kept_edge,
        ];
        let out = elements_to_remove(&[NodeId::intern("group")], &[EdgeId::intern("e3")], &nodes, &edges);
        let n: Vec<_> = out.nodes.iter().map(|i| i.as_str()).collect();
        let e: Vec<_> = out.edges.iter().map(|i| i.as_str()).collect();
        assert_eq!(n, vec!["child", "group"]);
        assert_eq!(e, vec!["e1"]);
    }
}
