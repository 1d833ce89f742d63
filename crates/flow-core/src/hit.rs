//! Hit testing: point/rectangle → node and handle lookup.
//!
//! Only rendered nodes take part: hidden nodes and nodes that have not been
//! measured yet are invisible to every query here.

use crate::geometry::{Point, Rect, Viewport, overlapping_area, point_to_renderer_point};
use crate::graph::handle_position;
use crate::id::NodeId;
use crate::model::{ConnectionHandle, Handle, HandleType, InternalNode, NodeLookup};

/// Extra search distance around the connection radius, so nodes whose
/// handles overhang their box are still found.
pub const HANDLE_SEARCH_PADDING: f64 = 250.0;

/// Rendered nodes from back to front: ascending `z`, then array order.
pub fn paint_order(lookup: &NodeLookup) -> Vec<&InternalNode> {
    let mut nodes: Vec<&InternalNode> = lookup.values().filter(|n| n.is_rendered()).collect();
    // Stable sort keeps array order within one z level.
    nodes.sort_by_key(|n| n.internals.z);
    nodes
}

/// Topmost node at flow-space point `p`.
pub fn node_at_point(lookup: &NodeLookup, p: Point) -> Option<NodeId> {
    paint_order(lookup)
        .into_iter()
        .rev()
        .find(|n| n.rect().contains(p))
        .map(|n| n.id())
}

/// Nodes inside a screen-space rectangle.
///
/// With `partially` any overlap counts, otherwise the node must be fully
/// covered.
pub fn nodes_inside(
    lookup: &NodeLookup,
    screen_rect: Rect,
    t: Viewport,
    partially: bool,
    exclude_non_selectable: bool,
) -> Vec<NodeId> {
    let origin = point_to_renderer_point(screen_rect.position(), t, None);
    let pane = Rect::new(origin.x, origin.y, screen_rect.width / t.zoom, screen_rect.height / t.zoom);

    lookup
        .values()
        .filter(|n| n.is_rendered())
        .filter(|n| !exclude_non_selectable || n.node.is_selectable(true))
        .filter(|n| {
            let overlap = overlapping_area(pane, n.rect());
            let area = n.dimensions().width * n.dimensions().height;
            (partially && overlap > 0.0) || overlap >= area
        })
        .map(|n| n.id())
        .collect()
}

/// Nodes whose box touches the square of half-size `distance` around `p`.
pub fn nodes_within_distance(lookup: &NodeLookup, p: Point, distance: f64) -> Vec<&InternalNode> {
    let area = Rect::new(p.x - distance, p.y - distance, distance * 2.0, distance * 2.0);
    lookup
        .values()
        .filter(|n| overlapping_area(area, n.rect()) > 0.0)
        .collect()
}

fn to_connection_handle(node: &InternalNode, handle: &Handle, center: Point) -> ConnectionHandle {
    ConnectionHandle {
        node_id: node.id(),
        id: handle.id,
        handle_type: handle.handle_type,
        position: handle.position,
        x: center.x,
        y: center.y,
    }
}

/// Nearest handle centre within `radius` of flow-space point `p`,
/// skipping `from` itself. When several handles sit at the same distance
/// the one of the opposite type to `from` wins.
pub fn closest_handle(
    lookup: &NodeLookup,
    p: Point,
    radius: f64,
    from: &ConnectionHandle,
) -> Option<ConnectionHandle> {
    let mut closest: Vec<ConnectionHandle> = Vec::new();
    let mut min_distance = f64::INFINITY;

    for node in nodes_within_distance(lookup, p, radius + HANDLE_SEARCH_PADDING) {
        let Some(bounds) = &node.internals.handle_bounds else {
            continue;
        };
        for handle in bounds.iter() {
            if handle.node_id == from.node_id
                && handle.handle_type == from.handle_type
                && handle.id == from.id
            {
                continue;
            }
            let center = handle_position(node, Some(handle), handle.position, true);
            let distance = center.distance(p);
            if distance > radius {
                continue;
            }
            if distance < min_distance {
                closest.clear();
                closest.push(to_connection_handle(node, handle, center));
                min_distance = distance;
            } else if distance == min_distance {
                closest.push(to_connection_handle(node, handle, center));
            }
        }
    }

    if closest.len() > 1 {
        let opposite = from.handle_type.opposite();
        if let Some(i) = closest.iter().position(|h| h.handle_type == opposite) {
            return Some(closest.swap_remove(i));
        }
    }
    closest.into_iter().next()
}

/// Handle whose rectangle contains flow-space point `p`, topmost node
/// first. `slop` grows every handle rectangle on all sides.
pub fn handle_at_point(lookup: &NodeLookup, p: Point, slop: f64) -> Option<ConnectionHandle> {
    for node in paint_order(lookup).into_iter().rev() {
        let Some(bounds) = &node.internals.handle_bounds else {
            continue;
        };
        let abs = node.internals.position_absolute;
        // Later handles are painted on top.
        for handle in bounds.target.iter().rev().chain(bounds.source.iter().rev()) {
            let r = Rect::new(
                abs.x + handle.x - slop,
                abs.y + handle.y - slop,
                handle.width + 2.0 * slop,
                handle.height + 2.0 * slop,
            );
            if r.contains(p) {
                let center = handle_position(node, Some(handle), handle.position, true);
                return Some(to_connection_handle(node, handle, center));
            }
        }
    }
    None
}

/// Handle on `node` by type and id (`None` = first of that type).
pub fn find_handle(node: &InternalNode, handle_type: HandleType, id: Option<crate::id::HandleId>) -> Option<ConnectionHandle> {
    let bounds = node.internals.handle_bounds.as_ref()?;
    let handle = bounds.find(handle_type, id)?;
    let center = handle_position(node, Some(handle), handle.position, true);
    Some(to_connection_handle(node, handle, center))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::HandleId;
    use crate::model::{HandleBounds, Node, NodeInternals, Side};
    use pretty_assertions::assert_eq;

    fn put(lookup: &mut NodeLookup, id: &str, x: f64, y: f64, w: f64, h: f64, z: i32) {
        let node = Node::new(id, Point::new(x, y)).with_measured(w, h);
        lookup.insert(
            node.id,
            InternalNode {
                internals: NodeInternals {
                    position_absolute: Point::new(x, y),
                    z,
                    handle_bounds: None,
                    user_node: node.clone(),
                },
                node,
            },
        );
    }

    fn handle(node: &str, id: &str, ty: HandleType, x: f64, y: f64) -> Handle {
        Handle {
            id: Some(HandleId::intern(id)),
            node_id: NodeId::intern(node),
            handle_type: ty,
            position: Side::Left,
            x,
            y,
            width: 10.0,
            height: 10.0,
            connectable: None,
        }
    }

    #[test]
    fn topmost_by_z_then_order() {
        let mut lookup = NodeLookup::new();
        put(&mut lookup, "low", 0.0, 0.0, 100.0, 100.0, 5);
        put(&mut lookup, "high", 50.0, 50.0, 100.0, 100.0, 0);
        put(&mut lookup, "later", 50.0, 50.0, 100.0, 100.0, 0);
        assert_eq!(node_at_point(&lookup, Point::new(60.0, 60.0)), Some(NodeId::intern("low")));
        assert_eq!(node_at_point(&lookup, Point::new(120.0, 120.0)), Some(NodeId::intern("later")));
        assert_eq!(node_at_point(&lookup, Point::new(500.0, 500.0)), None);
    }

    #[test]
    fn unmeasured_and_hidden_are_skipped() {
        let mut lookup = NodeLookup::new();
        put(&mut lookup, "ghost", 0.0, 0.0, 0.0, 0.0, 0);
        put(&mut lookup, "hidden", 0.0, 0.0, 50.0, 50.0, 0);
        lookup[&NodeId::intern("hidden")].node.hidden = true;
        assert_eq!(node_at_point(&lookup, Point::new(0.0, 0.0)), None);
        assert!(nodes_inside(&lookup, Rect::new(-10.0, -10.0, 100.0, 100.0), Viewport::IDENTITY, true, false).is_empty());
    }

    #[test]
    fn marquee_partial_vs_full() {
        let mut lookup = NodeLookup::new();
        put(&mut lookup, "a", 10.0, 10.0, 50.0, 50.0, 0);
        // 40% of b lies inside the rectangle.
        put(&mut lookup, "b", 80.0, 10.0, 50.0, 50.0, 0);
        let rect = Rect::new(0.0, 0.0, 100.0, 100.0);

        let partial = nodes_inside(&lookup, rect, Viewport::IDENTITY, true, true);
        assert_eq!(partial, vec![NodeId::intern("a"), NodeId::intern("b")]);
        let full = nodes_inside(&lookup, rect, Viewport::IDENTITY, false, true);
        assert_eq!(full, vec![NodeId::intern("a")]);
    }

    #[test]
    fn marquee_is_converted_to_flow_space() {
        let mut lookup = NodeLookup::new();
        put(&mut lookup, "a", 10.0, 10.0, 20.0, 20.0, 0);
        // Screen rect (40,40)-(120,120) is flow (10,10)-(50,50) at zoom 2 offset 20.
        let t = Viewport::new(20.0, 20.0, 2.0);
        let hits = nodes_inside(&lookup, Rect::new(40.0, 40.0, 80.0, 80.0), t, false, true);
        assert_eq!(hits, vec![NodeId::intern("a")]);
    }

    #[test]
    fn closest_prefers_opposite_type_on_tie() {
        let mut lookup = NodeLookup::new();
        put(&mut lookup, "a", 0.0, 0.0, 50.0, 50.0, 0);
        put(&mut lookup, "b", 200.0, 0.0, 50.0, 50.0, 0);
        lookup[&NodeId::intern("b")].internals.handle_bounds = Some(HandleBounds {
            source: [handle("b", "s", HandleType::Source, 0.0, 20.0)].into_iter().collect(),
            target: [handle("b", "t", HandleType::Target, 0.0, 20.0)].into_iter().collect(),
        });
        let from = ConnectionHandle {
            node_id: NodeId::intern("a"),
            id: Some(HandleId::intern("out")),
            handle_type: HandleType::Source,
            position: Side::Right,
            x: 50.0,
            y: 25.0,
        };
        let hit = closest_handle(&lookup, Point::new(203.0, 25.0), 20.0, &from).unwrap();
        assert_eq!(hit.handle_type, HandleType::Target);
        assert_eq!((hit.x, hit.y), (205.0, 25.0));

        assert!(closest_handle(&lookup, Point::new(100.0, 25.0), 20.0, &from).is_none());
    }

    #[test]
    fn handle_under_pointer() {
        let mut lookup = NodeLookup::new();
        put(&mut lookup, "a", 100.0, 100.0, 50.0, 50.0, 0);
        lookup[&NodeId::intern("a")].internals.handle_bounds = Some(HandleBounds {
            source: [handle("a", "s", HandleType::Source, 45.0, 20.0)].into_iter().collect(),
            target: Default::default(),
        });
        let h = handle_at_point(&lookup, Point::new(150.0, 125.0), 0.0).unwrap();
        assert_eq!(h.id, Some(HandleId::intern("s")));
        assert!(handle_at_point(&lookup, Point::new(120.0, 125.0), 0.0).is_none());
    }
}
