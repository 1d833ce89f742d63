//! Node drag controller.
//!
//! A drag moves the grabbed node together with every selected node
//! (nested selections move once, with their selected ancestor). Each
//! pointer move snaps and clamps every member, then commits positions
//! through [`Store::update_node_positions`] with `dragging = true`; the
//! final commit on release carries `dragging = false`.

use flow_core::error::FlowError;
use flow_core::geometry::{
    Bounds, CoordinateExtent, Dimensions, Point, Rect, bounds_of_boxes, calc_auto_pan, clamp_position,
    is_numeric, rect_to_bounds, snap_position,
};
use flow_core::id::NodeId;
use flow_core::model::{InternalNode, NodeExtent, NodeLookup, NodeOrigin};
use flow_core::store::{FlowEvent, PositionUpdate, Store};
use indexmap::IndexMap;

/// One node taking part in a drag.
#[derive(Debug, Clone, PartialEq)]
pub struct DragItem {
    pub id: NodeId,
    /// Position relative to the parent.
    pub position: Point,
    pub position_absolute: Point,
    /// Pointer minus absolute position at grab time.
    pub distance: Point,
    pub dimensions: Dimensions,
    pub extent: Option<NodeExtent>,
}

impl DragItem {
    fn update(&self) -> PositionUpdate {
        PositionUpdate {
            id: self.id,
            position: self.position,
            position_absolute: self.position_absolute,
            dimensions: self.dimensions,
        }
    }
}

/// The nearest ancestor of `node` is selected. Guards against parent
/// cycles.
fn is_parent_selected(node: &InternalNode, lookup: &NodeLookup) -> bool {
    let mut current = node.node.parent_id;
    let mut hops = 0;
    while let Some(parent_id) = current {
        let Some(parent) = lookup.get(&parent_id) else {
            return false;
        };
        if parent.node.selected {
            return true;
        }
        hops += 1;
        if hops > lookup.len() {
            return false;
        }
        current = parent.node.parent_id;
    }
    false
}

/// The drag set for a drag started at flow point `pointer` on `grabbed`
/// (or on the selection when `None`).
pub fn drag_items(
    lookup: &NodeLookup,
    nodes_draggable: bool,
    pointer: Point,
    grabbed: Option<NodeId>,
) -> IndexMap<NodeId, DragItem> {
    lookup
        .values()
        .filter(|n| n.node.selected || Some(n.id()) == grabbed)
        .filter(|n| n.node.parent_id.is_none() || !is_parent_selected(n, lookup))
        .filter(|n| n.node.is_draggable(nodes_draggable))
        .map(|n| {
            let abs = n.internals.position_absolute;
            let measured = n.node.measured.unwrap_or_default();
            let item = DragItem {
                id: n.id(),
                position: n.node.position,
                position_absolute: abs,
                distance: pointer - abs,
                dimensions: measured,
                extent: n.node.extent,
            };
            (item.id, item)
        })
        .collect()
}

/// Resolve a node's next position: the extent that applies to it (its
/// parent, its own relative extent, or `node_extent`), clamped, and the
/// matching parent-relative position.
///
/// Reports `005` for a parent extent without a parent and `015` for a node
/// that has not been measured.
pub fn calculate_node_position(
    node: &InternalNode,
    next: Point,
    lookup: &NodeLookup,
    node_origin: NodeOrigin,
    node_extent: &CoordinateExtent,
    on_error: &mut dyn FnMut(FlowError),
) -> (Point, Point) {
    let parent = node.node.parent_id.and_then(|id| lookup.get(&id));
    let parent_abs = parent.map(|p| p.internals.position_absolute).unwrap_or_default();
    let origin = node.node.origin.unwrap_or(node_origin);
    let measured = node.node.measured;
    let dims = measured.unwrap_or_default();

    let extent = match (&node.node.extent, parent) {
        (Some(NodeExtent::Parent), _) if node.node.expand_parent => None,
        (Some(NodeExtent::Parent), None) => {
            on_error(FlowError::ParentExtentWithoutParent { node: node.id() });
            None
        }
        (Some(NodeExtent::Parent), Some(p)) => {
            let d = p.node.measured.unwrap_or_default();
            if d.width != 0.0 && d.height != 0.0 && is_numeric(d.width) && is_numeric(d.height) {
                Some(CoordinateExtent::new(
                    parent_abs.x,
                    parent_abs.y,
                    parent_abs.x + d.width,
                    parent_abs.y + d.height,
                ))
            } else {
                None
            }
        }
        (Some(NodeExtent::Coordinates(e)), Some(_)) => Some(e.translate(parent_abs.x, parent_abs.y)),
        (Some(NodeExtent::Coordinates(e)), None) => Some(*e),
        (None, _) => Some(*node_extent),
    };

    let absolute = match extent {
        Some(e) => clamp_position(next, &e, dims),
        None => next,
    };
    if measured.is_none() {
        on_error(FlowError::UninitializedNode { node: node.id() });
    }
    let position = Point::new(
        absolute.x - parent_abs.x + dims.width * origin[0],
        absolute.y - parent_abs.y + dims.height * origin[1],
    );
    (position, absolute)
}

/// Move every selected draggable node by one keyboard step (`5` units,
/// or one grid cell when snapping) times `factor`.
pub fn move_selected_nodes(store: &mut Store, direction: Point, factor: f64) {
    let config = store.config().clone();
    let (vx, vy) = match config.active_snap_grid() {
        Some([gx, gy]) => (gx, gy),
        None => (5.0, 5.0),
    };
    let dx = direction.x * vx * factor;
    let dy = direction.y * vy * factor;

    let mut errors = Vec::new();
    let mut updates = Vec::new();
    let lookup = store.node_lookup();
    for node in lookup.values() {
        if !node.node.selected || !node.node.is_draggable(config.nodes_draggable) {
            continue;
        }
        let abs = node.internals.position_absolute;
        let mut next = Point::new(abs.x + dx, abs.y + dy);
        if let Some(grid) = config.active_snap_grid() {
            next = snap_position(next, grid);
        }
        let (position, position_absolute) = calculate_node_position(
            node,
            next,
            lookup,
            config.node_origin,
            &config.node_extent,
            &mut |e| errors.push(e),
        );
        updates.push(PositionUpdate {
            id: node.id(),
            position,
            position_absolute,
            dimensions: node.node.measured.unwrap_or_default(),
        });
    }
    for e in errors {
        store.report(e);
    }
    if !updates.is_empty() {
        store.update_node_positions(&updates, false);
    }
}

// ─── Controller ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
struct Session {
    grabbed: Option<NodeId>,
    items: IndexMap<NodeId, DragItem>,
    /// Last pointer position in flow space.
    last: Point,
    /// Last pointer position on screen.
    pointer: Point,
}

#[derive(Debug, Clone, PartialEq, Default)]
enum DragState {
    #[default]
    Idle,
    /// Pointer is down; waiting for the threshold.
    Pending { grabbed: Option<NodeId>, start: Point },
    Dragging(Session),
}

#[derive(Debug, Default)]
pub struct DragController {
    state: DragState,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.state, DragState::Idle)
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    /// Ids being dragged.
    pub fn dragged(&self) -> Vec<NodeId> {
        match &self.state {
            DragState::Dragging(s) => s.items.keys().copied().collect(),
            _ => Vec::new(),
        }
    }

    /// Pointer down on `grabbed` (or on the selection box when `None`) at
    /// screen point `p`. Returns whether a drag may follow.
    pub fn pointer_down(&mut self, store: &mut Store, grabbed: Option<NodeId>, p: Point) -> bool {
        if let Some(id) = grabbed {
            let Some(node) = store.internal_node(id) else {
                store.report(FlowError::UnknownNode { node: id });
                return false;
            };
            if !node.node.is_draggable(store.config().nodes_draggable) {
                return false;
            }
        }
        self.state = DragState::Pending { grabbed, start: p };
        if store.config().node_drag_threshold <= 0.0 {
            self.start(store, grabbed, p);
        }
        true
    }

    fn start(&mut self, store: &mut Store, grabbed: Option<NodeId>, p: Point) {
        let config = store.config();
        let select_on_drag = config.select_nodes_on_drag;
        let elements_selectable = config.elements_selectable;
        let nodes_draggable = config.nodes_draggable;

        if let Some(id) = grabbed {
            let (selected, selectable) = store
                .internal_node(id)
                .map(|n| (n.node.selected, n.node.is_selectable(elements_selectable)))
                .unwrap_or((false, false));
            if (!select_on_drag || !selectable) && !store.multi_selection_active() && !selected {
                store.unselect_nodes_and_edges(None, None);
            }
            if selectable && select_on_drag {
                store.handle_node_click(id, false);
            }
        }

        let flow = store.screen_to_flow(p, false);
        let items = drag_items(store.node_lookup(), nodes_draggable, flow, grabbed);
        let ids: Vec<NodeId> = items.keys().copied().collect();
        self.state = DragState::Dragging(Session {
            grabbed,
            items,
            last: flow,
            pointer: p,
        });
        if !ids.is_empty() {
            store.emit(FlowEvent::NodeDragStart {
                node: grabbed.or(ids.first().copied()),
                nodes: ids,
            });
        }
    }

    pub fn pointer_move(&mut self, store: &mut Store, p: Point) {
        match &mut self.state {
            DragState::Idle => {}
            DragState::Pending { grabbed, start } => {
                let (grabbed, start) = (*grabbed, *start);
                if start.distance(p) > store.config().node_drag_threshold {
                    self.start(store, grabbed, start);
                    self.pointer_move(store, p);
                }
            }
            DragState::Dragging(session) => {
                session.pointer = p;
                let flow = store.screen_to_flow(p, false);
                let snapped = store.screen_to_flow(p, true);
                let last_snapped = match store.config().active_snap_grid() {
                    Some(grid) => snap_position(session.last, grid),
                    None => session.last,
                };
                if snapped == last_snapped && flow == session.last {
                    return;
                }
                self.update_nodes(store, flow);
            }
        }
    }

    /// Move the drag set so the pointer sits at flow point `pointer`.
    fn update_nodes(&mut self, store: &mut Store, pointer: Point) {
        if self.grabbed_node_removed(store) {
            log::warn!("dragged node was removed, aborting drag");
            self.abort(store);
            return;
        }
        let DragState::Dragging(session) = &mut self.state else {
            return;
        };
        session.last = pointer;

        let config = store.config();
        let multi = session.items.len() > 1;
        let nodes_box = multi.then(|| {
            session
                .items
                .values()
                .map(|i| rect_to_bounds(Rect::from_position(i.position_absolute, i.dimensions)))
                .fold(Bounds::EMPTY, bounds_of_boxes)
        });

        let mut errors = Vec::new();
        let mut changed = false;
        let lookup = store.node_lookup();
        for item in session.items.values_mut() {
            let Some(node) = lookup.get(&item.id) else {
                continue;
            };
            let mut next = pointer - item.distance;
            if let Some(grid) = config.active_snap_grid() {
                next = snap_position(next, grid);
            }

            let extent = match nodes_box {
                Some(b) if item.extent.is_none() => {
                    let e = &config.node_extent;
                    let abs = item.position_absolute;
                    CoordinateExtent::new(
                        abs.x - b.x + e.min.x,
                        abs.y - b.y + e.min.y,
                        abs.x + item.dimensions.width - b.x2 + e.max.x,
                        abs.y + item.dimensions.height - b.y2 + e.max.y,
                    )
                }
                _ => config.node_extent,
            };

            let (position, position_absolute) = calculate_node_position(
                node,
                next,
                lookup,
                config.node_origin,
                &extent,
                &mut |e| errors.push(e),
            );
            changed |= position != item.position;
            item.position = position;
            item.position_absolute = position_absolute;
        }

        let updates: Vec<PositionUpdate> = session
            .items
            .values()
            .filter(|i| lookup.contains_key(&i.id))
            .map(DragItem::update)
            .collect();
        let grabbed = session.grabbed;
        let ids: Vec<NodeId> = session.items.keys().copied().collect();

        for e in errors {
            store.report(e);
        }
        if !changed {
            return;
        }
        store.update_node_positions(&updates, true);
        store.emit(FlowEvent::NodeDrag {
            node: grabbed.or(ids.first().copied()),
            nodes: ids,
        });
    }

    fn grabbed_node_removed(&self, store: &Store) -> bool {
        match &self.state {
            DragState::Dragging(s) => match s.grabbed {
                Some(id) => store.internal_node(id).is_none(),
                None => !s.items.keys().any(|id| store.internal_node(*id).is_some()),
            },
            DragState::Pending {
                grabbed: Some(id), ..
            } => store.internal_node(*id).is_none(),
            _ => false,
        }
    }

    /// Release. Returns `true` when a drag took place, `false` for a
    /// click that never crossed the threshold.
    pub fn pointer_up(&mut self, store: &mut Store) -> bool {
        match std::mem::take(&mut self.state) {
            DragState::Dragging(session) => {
                Self::finish(store, session);
                true
            }
            _ => false,
        }
    }

    /// Commit the session and emit the stop event. A session that emitted
    /// a start always gets a stop, listing only the nodes still present.
    fn finish(store: &mut Store, session: Session) {
        if session.items.is_empty() {
            return;
        }
        let updates: Vec<PositionUpdate> = session
            .items
            .values()
            .filter(|i| store.internal_node(i.id).is_some())
            .map(DragItem::update)
            .collect();
        if !updates.is_empty() {
            store.update_node_positions(&updates, false);
        }
        let ids: Vec<NodeId> = updates.iter().map(|u| u.id).collect();
        let node = session.grabbed.filter(|id| store.internal_node(*id).is_some());
        store.emit(FlowEvent::NodeDragStop {
            node: node.or(ids.first().copied()),
            nodes: ids,
        });
    }

    /// Pan when the pointer sits in the auto-pan band, dragging the nodes
    /// along. Returns whether the viewport moved.
    pub fn auto_pan(&mut self, store: &mut Store) -> bool {
        let DragState::Dragging(session) = &mut self.state else {
            return false;
        };
        let config = store.config();
        if !config.auto_pan_on_node_drag {
            return false;
        }
        let v = calc_auto_pan(session.pointer, store.container_size(), config.auto_pan_speed, config.auto_pan_margin);
        if v == Point::ZERO {
            return false;
        }
        let zoom = store.viewport().zoom;
        let next = Point::new(session.last.x - v.x / zoom, session.last.y - v.y / zoom);
        if store.pan_by(v) {
            self.update_nodes(store, next);
            return true;
        }
        false
    }

    /// End the gesture now. Nodes stay where they are and are committed
    /// with `dragging = false` so no node is left marked as dragging.
    pub fn abort(&mut self, store: &mut Store) {
        if let DragState::Dragging(session) = std::mem::take(&mut self.state) {
            log::debug!("drag aborted");
            Self::finish(store, session);
        }
    }
}
