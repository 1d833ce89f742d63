//! The node/edge store.
//!
//! Owns the embedder's node and edge arrays plus everything derived from
//! them: the internal node lookup (absolute positions, z, handle bounds),
//! the parent and connection indices, the viewport and the transient
//! connection state. Controllers read it and write to it through change
//! records; observers are notified after derived state is up to date.

use crate::changes::{EdgeChange, NodeChange, SetAttributes, apply_edge_changes, apply_node_changes};
use crate::config::FlowConfig;
use crate::error::FlowError;
use crate::geometry::{
    CoordinateExtent, Dimensions, Point, Rect, Viewport, bounds_of_rects, clamp_position,
    clamp_position_to_parent, constrain_viewport, is_numeric, node_position_with_origin,
    round_half_up,
};
use crate::graph::{self, ElementsToRemove, SELECTED_Z_OFFSET};
use crate::id::{EdgeId, HandleId, NodeId};
use crate::model::{
    Connection, ConnectionState, Edge, FinalConnectionState, Handle, HandleBounds, HandleConnection,
    HandleType, InternalNode, Node, NodeExtent, NodeInternals, NodeLookup, NodeOrigin, Side,
};
use crate::paths::Endpoints;
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

// ─── Events ──────────────────────────────────────────────────────────────

/// Position and size reported with resize events.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ResizeParams {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Everything observers hear about.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowEvent {
    NodesChange(Vec<NodeChange>),
    EdgesChange(Vec<EdgeChange>),
    Delete {
        nodes: Vec<NodeId>,
        edges: Vec<EdgeId>,
    },
    SelectionChange {
        nodes: Vec<NodeId>,
        edges: Vec<EdgeId>,
    },

    Connect(Connection),
    ConnectStart {
        node_id: NodeId,
        handle_id: Option<HandleId>,
        handle_type: HandleType,
    },
    ConnectEnd(FinalConnectionState),
    ClickConnectStart {
        node_id: NodeId,
        handle_id: Option<HandleId>,
        handle_type: HandleType,
    },
    ClickConnectEnd(FinalConnectionState),
    ReconnectStart {
        edge: EdgeId,
        handle_type: HandleType,
    },
    Reconnect {
        old_edge: EdgeId,
        connection: Connection,
    },
    ReconnectEnd {
        edge: EdgeId,
        handle_type: HandleType,
        state: FinalConnectionState,
    },

    NodeDragStart {
        node: Option<NodeId>,
        nodes: Vec<NodeId>,
    },
    NodeDrag {
        node: Option<NodeId>,
        nodes: Vec<NodeId>,
    },
    NodeDragStop {
        node: Option<NodeId>,
        nodes: Vec<NodeId>,
    },

    SelectionStart,
    SelectionEnd,

    ResizeStart {
        node: NodeId,
        params: ResizeParams,
    },
    Resize {
        node: NodeId,
        params: ResizeParams,
        direction: [f64; 2],
    },
    ResizeEnd {
        node: NodeId,
        params: ResizeParams,
    },

    MoveStart(Viewport),
    Move(Viewport),
    MoveEnd(Viewport),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&FlowEvent)>;
type ErrorSink = Box<dyn FnMut(&FlowError)>;
type ConnectionPredicate = Box<dyn Fn(&Connection) -> bool>;

// ─── Measurements & updates ──────────────────────────────────────────────

/// A handle as measured on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasuredHandle {
    pub id: Option<HandleId>,
    pub handle_type: HandleType,
    pub position: Side,
    /// Screen-space bounding rectangle.
    pub rect: Rect,
    pub connectable: Option<bool>,
}

/// One report from the measurement provider.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeMeasurement {
    pub id: NodeId,
    /// Unscaled size of the node.
    pub dimensions: Dimensions,
    /// Screen-space bounding rectangle of the node.
    pub rect: Rect,
    pub handles: Vec<MeasuredHandle>,
    /// Re-read handles even if the size is unchanged.
    pub force: bool,
}

/// A new relative position for a node, with the absolute position and
/// size it was computed from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionUpdate {
    pub id: NodeId,
    pub position: Point,
    pub position_absolute: Point,
    pub dimensions: Dimensions,
}

/// A child whose new rectangle may push its parent outwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParentExpandChild {
    pub id: NodeId,
    pub parent_id: NodeId,
    /// Absolute rectangle of the child.
    pub rect: Rect,
}

// ─── Free helpers ────────────────────────────────────────────────────────

/// Stacking order before parent adjustment.
pub fn calculate_z(node: &Node, selected_z: i32) -> i32 {
    node.z_index.unwrap_or(0) + if node.selected { selected_z } else { 0 }
}

fn child_xyz(
    child: &Node,
    parent: &InternalNode,
    origin: NodeOrigin,
    node_extent: &CoordinateExtent,
    selected_z: i32,
) -> (Point, i32) {
    let parent_rect = parent.rect();
    let dims = child.dimensions();
    let with_origin = node_position_with_origin(child.position, dims, child.origin.unwrap_or(origin));
    let relative = match &child.extent {
        Some(NodeExtent::Coordinates(e)) => clamp_position(with_origin, e, dims),
        _ => with_origin,
    };
    let mut absolute = clamp_position(
        Point::new(parent_rect.x + relative.x, parent_rect.y + relative.y),
        node_extent,
        dims,
    );
    if child.extent == Some(NodeExtent::Parent) {
        absolute = clamp_position_to_parent(absolute, dims, parent_rect);
    }
    let child_z = calculate_z(child, selected_z);
    let parent_z = parent.internals.z;
    let z = if parent_z >= child_z { parent_z + 1 } else { child_z };
    (absolute, z)
}

fn internal_from_user(
    user: &Node,
    previous: Option<InternalNode>,
    config: &FlowConfig,
    selected_z: i32,
) -> InternalNode {
    let dims = user.dimensions();
    let with_origin = node_position_with_origin(user.position, dims, user.origin.unwrap_or(config.node_origin));
    let extent = match &user.extent {
        Some(NodeExtent::Coordinates(e)) => *e,
        _ => config.node_extent,
    };
    let position_absolute = clamp_position(with_origin, &extent, dims);
    // A node that lost its measurement must be measured again.
    let handle_bounds = graph::declared_handle_bounds(user).or_else(|| {
        user.measured
            .and(previous.and_then(|p| p.internals.handle_bounds))
    });
    InternalNode {
        node: user.clone(),
        internals: NodeInternals {
            position_absolute,
            z: calculate_z(user, selected_z),
            handle_bounds,
            user_node: user.clone(),
        },
    }
}

/// Position/dimension changes that grow each parent to contain its
/// expanding children. Growth past the top/left edge moves the parent and
/// shifts its other children back so they stay put on screen.
pub fn expand_parent_changes(
    children: &[ParentExpandChild],
    lookup: &NodeLookup,
    parent_lookup: &IndexMap<NodeId, IndexSet<NodeId>>,
    node_origin: NodeOrigin,
) -> Vec<NodeChange> {
    let mut expansions: IndexMap<NodeId, (Rect, &InternalNode)> = IndexMap::new();
    for child in children {
        let Some(parent) = lookup.get(&child.parent_id) else {
            continue;
        };
        let parent_rect = expansions
            .get(&child.parent_id)
            .map(|(r, _)| *r)
            .unwrap_or_else(|| parent.rect());
        expansions.insert(child.parent_id, (bounds_of_rects(parent_rect, child.rect), parent));
    }

    let mut changes = Vec::new();
    for (parent_id, (expanded, parent)) in expansions {
        let abs = parent.internals.position_absolute;
        let dims = parent.dimensions();
        let origin = parent.node.origin.unwrap_or(node_origin);

        let x_change = if expanded.x < abs.x {
            round_half_up((abs.x - expanded.x).abs())
        } else {
            0.0
        };
        let y_change = if expanded.y < abs.y {
            round_half_up((abs.y - expanded.y).abs())
        } else {
            0.0
        };
        let new_width = dims.width.max(round_half_up(expanded.width));
        let new_height = dims.height.max(round_half_up(expanded.height));
        let width_change = (new_width - dims.width) * origin[0];
        let height_change = (new_height - dims.height) * origin[1];

        if x_change > 0.0 || y_change > 0.0 || width_change != 0.0 || height_change != 0.0 {
            changes.push(NodeChange::Position {
                id: parent_id,
                position: Some(Point::new(
                    parent.node.position.x - x_change + width_change,
                    parent.node.position.y - y_change + height_change,
                )),
                dragging: None,
            });
            if let Some(siblings) = parent_lookup.get(&parent_id) {
                for sibling in siblings {
                    if children.iter().any(|c| c.id == *sibling) {
                        continue;
                    }
                    if let Some(s) = lookup.get(sibling) {
                        changes.push(NodeChange::Position {
                            id: *sibling,
                            position: Some(s.node.position.offset(x_change, y_change)),
                            dragging: None,
                        });
                    }
                }
            }
        }

        if dims.width < expanded.width || dims.height < expanded.height || x_change != 0.0 || y_change != 0.0 {
            let width = new_width
                + if x_change != 0.0 {
                    node_origin[0] * x_change - width_change
                } else {
                    0.0
                };
            let height = new_height
                + if y_change != 0.0 {
                    node_origin[1] * y_change - height_change
                } else {
                    0.0
                };
            changes.push(NodeChange::Dimensions {
                id: parent_id,
                dimensions: Some(Dimensions::new(width, height)),
                resizing: None,
                set_attributes: Some(SetAttributes::All),
            });
        }
    }
    changes
}

/// Key into the connection lookup.
pub fn connection_key(node: NodeId, handle_type: Option<HandleType>, handle: Option<HandleId>) -> String {
    match (handle_type, handle) {
        (None, _) => node.to_string(),
        (Some(t), None) => format!("{node}-{t}"),
        (Some(t), Some(h)) => format!("{node}-{t}-{h}"),
    }
}

// ─── Store ───────────────────────────────────────────────────────────────

pub struct Store {
    config: FlowConfig,

    nodes: Vec<Node>,
    edges: Vec<Edge>,
    node_lookup: NodeLookup,
    parent_lookup: IndexMap<NodeId, IndexSet<NodeId>>,
    edge_lookup: IndexMap<EdgeId, Edge>,
    connection_lookup: IndexMap<String, IndexMap<EdgeId, HandleConnection>>,
    nodes_initialized: bool,

    viewport: Viewport,
    width: f64,
    height: f64,

    connection: ConnectionState,
    multi_selection_active: bool,
    user_selection_active: bool,
    nodes_selection_active: bool,

    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
    on_error: ErrorSink,
    is_valid_connection: Option<ConnectionPredicate>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new(FlowConfig::default())
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("nodes", &self.nodes.len())
            .field("edges", &self.edges.len())
            .field("viewport", &self.viewport)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl Store {
    pub fn new(config: FlowConfig) -> Self {
        Self {
            config,
            nodes: Vec::new(),
            edges: Vec::new(),
            node_lookup: NodeLookup::new(),
            parent_lookup: IndexMap::new(),
            edge_lookup: IndexMap::new(),
            connection_lookup: IndexMap::new(),
            nodes_initialized: false,
            viewport: Viewport::IDENTITY,
            width: 0.0,
            height: 0.0,
            connection: ConnectionState::Idle,
            multi_selection_active: false,
            user_selection_active: false,
            nodes_selection_active: false,
            listeners: Vec::new(),
            next_subscription: 0,
            on_error: Box::new(|err| log::warn!("[{}] {}", err.code(), err)),
            is_valid_connection: None,
        }
    }

    // ─── Config, observers, errors ───────────────────────────────────────

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// Replace the configuration and recompute derived node state.
    pub fn set_config(&mut self, config: FlowConfig) {
        self.config = config;
        self.node_lookup.clear();
        self.adopt_user_nodes();
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&FlowEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(l, _)| *l != id);
        self.listeners.len() != before
    }

    pub fn emit(&mut self, event: FlowEvent) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(&event);
        }
    }

    pub fn set_error_handler(&mut self, handler: impl FnMut(&FlowError) + 'static) {
        self.on_error = Box::new(handler);
    }

    /// Hand an error to the error sink. The engine carries on.
    pub fn report(&mut self, err: FlowError) {
        (self.on_error)(&err);
    }

    /// Borrow the error sink, e.g. for [`crate::registry::TypeRegistry::resolve`].
    pub fn error_sink(&mut self) -> &mut dyn FnMut(&FlowError) {
        &mut *self.on_error
    }

    pub fn set_is_valid_connection(&mut self, predicate: impl Fn(&Connection) -> bool + 'static) {
        self.is_valid_connection = Some(Box::new(predicate));
    }

    /// The embedder's connection predicate; accepts everything when unset.
    pub fn validate_connection(&self, c: &Connection) -> bool {
        self.is_valid_connection.as_ref().is_none_or(|p| p(c))
    }

    // ─── Nodes ───────────────────────────────────────────────────────────

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node_lookup(&self) -> &NodeLookup {
        &self.node_lookup
    }

    pub fn internal_node(&self, id: NodeId) -> Option<&InternalNode> {
        self.node_lookup.get(&id)
    }

    pub fn parent_lookup(&self) -> &IndexMap<NodeId, IndexSet<NodeId>> {
        &self.parent_lookup
    }

    /// Direct children of `id`, in array order.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.parent_lookup.get(&id).into_iter().flatten().copied()
    }

    /// Every visible node has a measured size.
    pub fn nodes_initialized(&self) -> bool {
        self.nodes_initialized
    }

    /// Replace the node array and rebuild the derived state. Edges
    /// attached to nodes that are no longer present are removed too.
    pub fn set_nodes(&mut self, nodes: Vec<Node>) -> bool {
        let before: Vec<NodeId> = self.node_lookup.keys().copied().collect();
        self.nodes = nodes;
        let initialized = self.adopt_user_nodes();
        self.drop_dangling_edges(&before);
        initialized
    }

    /// Remove the edges of nodes in `before` that the last adoption
    /// dropped, and broadcast the removals.
    fn drop_dangling_edges(&mut self, before: &[NodeId]) {
        let gone: IndexSet<NodeId> = before
            .iter()
            .copied()
            .filter(|id| !self.node_lookup.contains_key(id))
            .collect();
        if gone.is_empty() {
            return;
        }
        let touches = |e: &Edge| gone.contains(&e.source) || gone.contains(&e.target);
        let removed: Vec<EdgeChange> = self
            .edges
            .iter()
            .filter(|e| touches(*e))
            .map(|e| EdgeChange::remove(e.id))
            .collect();
        if removed.is_empty() {
            return;
        }
        log::debug!("dropping {} edge(s) of removed nodes", removed.len());
        let kept: Vec<Edge> = self.edges.iter().filter(|e| !touches(*e)).cloned().collect();
        self.set_edges(kept);
        self.emit(FlowEvent::EdgesChange(removed));
    }

    /// Reconcile `self.nodes` into the lookup. Records that compare equal
    /// to the ones adopted last time keep their internal state. Returns
    /// whether every visible node is measured.
    fn adopt_user_nodes(&mut self) -> bool {
        let mut previous = std::mem::take(&mut self.node_lookup);
        self.parent_lookup.clear();
        let selected_z = self.selected_z();
        let mut initialized = !self.nodes.is_empty();

        for user in &self.nodes {
            let prev = previous.swap_remove(&user.id);
            let internal = match prev {
                Some(p) if p.internals.user_node == *user => p,
                prev => internal_from_user(user, prev, &self.config, selected_z),
            };
            let measured = internal
                .node
                .measured
                .is_some_and(|m| is_numeric(m.width) && is_numeric(m.height));
            if !measured && !internal.node.hidden {
                initialized = false;
            }
            self.node_lookup.insert(user.id, internal);
        }

        self.resolve_child_positions();
        self.nodes_initialized = initialized;
        initialized
    }

    fn selected_z(&self) -> i32 {
        if self.config.elevate_nodes_on_select {
            SELECTED_Z_OFFSET
        } else {
            0
        }
    }

    /// Recompute absolute position and z of every child from its parent.
    /// Parents are resolved before their children whatever the array
    /// order; children of missing parents are left as they are.
    fn resolve_child_positions(&mut self) {
        let mut resolved: IndexSet<NodeId> = IndexSet::new();
        let mut pending: Vec<NodeId> = Vec::new();
        for (id, n) in &self.node_lookup {
            if n.node.parent_id.is_some() {
                pending.push(*id);
            } else {
                resolved.insert(*id);
            }
        }

        while !pending.is_empty() {
            let mut deferred = Vec::new();
            let mut progressed = false;
            for id in pending {
                let Some(parent_id) = self.node_lookup.get(&id).and_then(|n| n.node.parent_id) else {
                    continue;
                };
                if !resolved.contains(&parent_id) {
                    deferred.push(id);
                    continue;
                }
                self.update_child_node(id, parent_id);
                resolved.insert(id);
                progressed = true;
            }
            pending = deferred;
            if !progressed {
                break;
            }
        }

        for id in pending {
            if let Some(parent) = self.node_lookup.get(&id).and_then(|n| n.node.parent_id) {
                log::warn!(
                    "parent node {parent} not found for {id}; list parent nodes before their children"
                );
            }
        }
    }

    fn update_child_node(&mut self, id: NodeId, parent_id: NodeId) {
        let selected_z = self.selected_z();
        let Some(parent) = self.node_lookup.get(&parent_id) else {
            return;
        };
        let Some(child) = self.node_lookup.get(&id) else {
            return;
        };
        let (position, z) = child_xyz(
            &child.node,
            parent,
            self.config.node_origin,
            &self.config.node_extent,
            selected_z,
        );
        self.parent_lookup.entry(parent_id).or_default().insert(id);
        if let Some(child) = self.node_lookup.get_mut(&id) {
            child.internals.position_absolute = position;
            child.internals.z = z;
        }
    }

    /// Re-derive children's absolute positions after parents moved.
    pub fn update_absolute_positions(&mut self) {
        self.parent_lookup.clear();
        self.resolve_child_positions();
    }

    /// Fold fresh measurements into the lookup: size, handle bounds
    /// relative to the node in flow units, and extent clamping. Emits
    /// dimension changes for nodes whose size changed, plus parent growth
    /// for `expand_parent` children.
    pub fn update_node_internals(&mut self, measurements: &[NodeMeasurement]) {
        let zoom = self.viewport.zoom;
        let mut changes = Vec::new();
        let mut expanding = Vec::new();
        let mut updated = false;

        for m in measurements {
            let Some(node) = self.node_lookup.get(&m.id) else {
                continue;
            };
            if node.node.hidden {
                if let Some(node) = self.node_lookup.get_mut(&m.id) {
                    node.internals.handle_bounds = None;
                }
                updated = true;
                continue;
            }

            let dims = m.dimensions;
            let changed = node.node.measured != Some(dims);
            let do_update = dims.width != 0.0
                && dims.height != 0.0
                && (changed || node.internals.handle_bounds.is_none() || m.force);
            if !do_update {
                continue;
            }

            let mut abs = node.internals.position_absolute;
            match (&node.node.extent, node.node.parent_id) {
                (Some(NodeExtent::Parent), Some(parent_id)) => {
                    if let Some(parent) = self.node_lookup.get(&parent_id) {
                        abs = clamp_position_to_parent(abs, dims, parent.rect());
                    }
                }
                (Some(NodeExtent::Coordinates(e)), None) => abs = clamp_position(abs, e, dims),
                (None, None) => abs = clamp_position(abs, &self.config.node_extent, dims),
                _ => {}
            }

            let mut bounds = HandleBounds::default();
            for h in &m.handles {
                let handle = Handle {
                    id: h.id,
                    node_id: m.id,
                    handle_type: h.handle_type,
                    position: h.position,
                    x: (h.rect.x - m.rect.x) / zoom,
                    y: (h.rect.y - m.rect.y) / zoom,
                    width: h.rect.width / zoom,
                    height: h.rect.height / zoom,
                    connectable: h.connectable,
                };
                match h.handle_type {
                    HandleType::Source => bounds.source.push(handle),
                    HandleType::Target => bounds.target.push(handle),
                }
            }

            let parent_id = node.node.parent_id;
            let expand = node.node.expand_parent;
            if let Some(node) = self.node_lookup.get_mut(&m.id) {
                node.node.measured = Some(dims);
                node.internals.position_absolute = abs;
                node.internals.handle_bounds = Some(bounds);
            }
            if let Some(parent_id) = parent_id {
                self.update_child_node(m.id, parent_id);
            }
            updated = true;

            if changed {
                changes.push(NodeChange::Dimensions {
                    id: m.id,
                    dimensions: Some(dims),
                    resizing: None,
                    set_attributes: None,
                });
                if let (true, Some(parent_id), Some(node)) = (expand, parent_id, self.node_lookup.get(&m.id)) {
                    expanding.push(ParentExpandChild {
                        id: m.id,
                        parent_id,
                        rect: node.rect(),
                    });
                }
            }
        }

        if !expanding.is_empty() {
            changes.extend(expand_parent_changes(
                &expanding,
                &self.node_lookup,
                &self.parent_lookup,
                self.config.node_origin,
            ));
        }

        if !updated {
            return;
        }
        self.update_absolute_positions();
        self.trigger_node_changes(changes);
    }

    /// Commit new node positions. Nodes that expand their parent are kept
    /// at non-negative relative positions while the parent grows instead.
    pub fn update_node_positions(&mut self, updates: &[PositionUpdate], dragging: bool) {
        let mut changes = Vec::with_capacity(updates.len());
        let mut expanding = Vec::new();

        for u in updates {
            let node = self.node_lookup.get(&u.id);
            let parent_id = node.filter(|n| n.node.expand_parent).and_then(|n| n.node.parent_id);
            let position = match parent_id {
                Some(_) => Point::new(u.position.x.max(0.0), u.position.y.max(0.0)),
                None => u.position,
            };
            if let Some(parent_id) = parent_id {
                expanding.push(ParentExpandChild {
                    id: u.id,
                    parent_id,
                    rect: Rect::from_position(u.position_absolute, u.dimensions),
                });
            }
            changes.push(NodeChange::position(u.id, position, dragging));
        }

        if !expanding.is_empty() {
            changes.extend(expand_parent_changes(
                &expanding,
                &self.node_lookup,
                &self.parent_lookup,
                self.config.node_origin,
            ));
        }

        self.trigger_node_changes(changes);
        self.refresh_connection_origin();
    }

    /// Keep an in-flight connection attached to its origin handle when
    /// the origin node moves.
    fn refresh_connection_origin(&mut self) {
        let ConnectionState::InProgress(c) = &self.connection else {
            return;
        };
        let from = &c.from_handle;
        let Some(node) = self.node_lookup.get(&from.node_id) else {
            return;
        };
        let handle = node
            .internals
            .handle_bounds
            .as_ref()
            .and_then(|b| b.find(from.handle_type, from.id));
        let point = graph::handle_position(node, handle, Side::Left, true);
        if let ConnectionState::InProgress(c) = &mut self.connection {
            c.from = point;
            c.from_handle.x = point.x;
            c.from_handle.y = point.y;
        }
    }

    /// Apply (in uncontrolled mode) and broadcast node changes.
    pub fn trigger_node_changes(&mut self, changes: Vec<NodeChange>) {
        if changes.is_empty() {
            return;
        }
        if self.config.auto_apply_changes {
            let next = apply_node_changes(&changes, &self.nodes);
            self.set_nodes(next);
        }
        self.emit(FlowEvent::NodesChange(changes));
    }

    // ─── Edges ───────────────────────────────────────────────────────────

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edge_lookup.get(&id)
    }

    pub fn edge_lookup(&self) -> &IndexMap<EdgeId, Edge> {
        &self.edge_lookup
    }

    /// Replace the edge array and rebuild the edge and connection indices.
    pub fn set_edges(&mut self, edges: Vec<Edge>) {
        self.edges = edges;
        self.edge_lookup.clear();
        self.connection_lookup.clear();
        for edge in &self.edges {
            let c = HandleConnection::of_edge(edge);
            for (node, ty, handle) in [
                (edge.source, HandleType::Source, edge.source_handle),
                (edge.target, HandleType::Target, edge.target_handle),
            ] {
                let mut keys = vec![connection_key(node, None, None), connection_key(node, Some(ty), None)];
                if handle.is_some() {
                    keys.push(connection_key(node, Some(ty), handle));
                }
                for key in keys {
                    self.connection_lookup.entry(key).or_default().insert(edge.id, c);
                }
            }
            self.edge_lookup.insert(edge.id, edge.clone());
        }
    }

    /// Connections touching a node, one of its handle types, or one handle.
    pub fn connections(
        &self,
        node: NodeId,
        handle_type: Option<HandleType>,
        handle: Option<HandleId>,
    ) -> impl Iterator<Item = &HandleConnection> + '_ {
        self.connection_lookup
            .get(&connection_key(node, handle_type, handle))
            .into_iter()
            .flat_map(|m| m.values())
    }

    pub fn trigger_edge_changes(&mut self, changes: Vec<EdgeChange>) {
        if changes.is_empty() {
            return;
        }
        if self.config.auto_apply_changes {
            let next = apply_edge_changes(&changes, &self.edges);
            self.set_edges(next);
        }
        self.emit(FlowEvent::EdgesChange(changes));
    }

    /// Add an edge for `c` unless one with the same endpoints exists.
    pub fn add_edge(&mut self, c: &Connection) -> bool {
        let mut edges = self.edges.clone();
        match graph::add_connection(c, &mut edges) {
            Ok(true) => {
                let Some(edge) = edges.pop() else {
                    return false;
                };
                self.trigger_edge_changes(vec![EdgeChange::Add {
                    item: edge,
                    index: None,
                }]);
                true
            }
            Ok(false) => false,
            Err(err) => {
                self.report(err);
                false
            }
        }
    }

    /// Where `edge` attaches to its nodes. Reports `008` when a handle
    /// cannot be resolved.
    pub fn edge_endpoints(&mut self, edge: EdgeId) -> Option<Endpoints> {
        let e = self.edge_lookup.get(&edge)?;
        let source = self.node_lookup.get(&e.source)?;
        let target = self.node_lookup.get(&e.target)?;
        match graph::edge_position(e, source, target, self.config.connection_mode) {
            Ok(endpoints) => Some(endpoints),
            Err(err) => {
                self.report(err);
                None
            }
        }
    }

    /// Render z of an edge.
    pub fn edge_z_index(&self, edge: EdgeId) -> Option<i32> {
        let e = self.edge_lookup.get(&edge)?;
        let source = self.node_lookup.get(&e.source)?;
        let target = self.node_lookup.get(&e.target)?;
        Some(graph::elevated_edge_z_index(
            source,
            target,
            e.selected,
            e.z_index.unwrap_or(0),
            self.config.elevate_edges_on_select,
        ))
    }

    // ─── Viewport ────────────────────────────────────────────────────────

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn container_size(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }

    /// Set the pane size. A zero-size pane is reported and replaced by 1×1.
    pub fn set_container_size(&mut self, width: f64, height: f64) {
        let valid = |v: f64| is_numeric(v) && v > 0.0;
        if !valid(width) || !valid(height) {
            self.report(FlowError::ZeroSizeContainer);
        }
        self.width = if valid(width) { width } else { 1.0 };
        self.height = if valid(height) { height } else { 1.0 };
    }

    /// `t` constrained by the zoom range and translate extent.
    pub fn constrain(&self, t: Viewport) -> Viewport {
        constrain_viewport(
            t,
            self.width,
            self.height,
            self.config.min_zoom,
            self.config.max_zoom,
            &self.config.translate_extent,
        )
    }

    /// Set the viewport, constrained. Returns what was applied.
    pub fn set_viewport(&mut self, t: Viewport) -> Viewport {
        self.viewport = self.constrain(t);
        self.viewport
    }

    /// Pan by a screen-space delta. Returns whether the viewport moved.
    pub fn pan_by(&mut self, delta: Point) -> bool {
        if delta.x == 0.0 && delta.y == 0.0 {
            return false;
        }
        let current = self.viewport;
        let next = self.set_viewport(Viewport::new(current.x + delta.x, current.y + delta.y, current.zoom));
        next != current
    }

    pub fn screen_to_flow(&self, p: Point, snap: bool) -> Point {
        let grid = if snap { self.config.active_snap_grid() } else { None };
        crate::geometry::point_to_renderer_point(p, self.viewport, grid)
    }

    pub fn flow_to_screen(&self, p: Point) -> Point {
        crate::geometry::renderer_point_to_point(p, self.viewport)
    }

    // ─── Connection state ────────────────────────────────────────────────

    pub fn connection(&self) -> &ConnectionState {
        &self.connection
    }

    pub fn set_connection(&mut self, state: ConnectionState) {
        self.connection = state;
    }

    pub fn cancel_connection(&mut self) {
        self.connection = ConnectionState::Idle;
    }

    // ─── Selection ───────────────────────────────────────────────────────

    pub fn multi_selection_active(&self) -> bool {
        self.multi_selection_active
    }

    pub fn set_multi_selection_active(&mut self, active: bool) {
        self.multi_selection_active = active;
    }

    pub fn user_selection_active(&self) -> bool {
        self.user_selection_active
    }

    pub fn set_user_selection_active(&mut self, active: bool) {
        self.user_selection_active = active;
    }

    /// A marquee selection finished with nodes selected; the selection
    /// box can be dragged as a whole.
    pub fn nodes_selection_active(&self) -> bool {
        self.nodes_selection_active
    }

    pub fn set_nodes_selection_active(&mut self, active: bool) {
        self.nodes_selection_active = active;
    }

    pub fn selected_nodes(&self) -> Vec<NodeId> {
        self.nodes.iter().filter(|n| n.selected).map(|n| n.id).collect()
    }

    pub fn selected_edges(&self) -> Vec<EdgeId> {
        self.edges.iter().filter(|e| e.selected).map(|e| e.id).collect()
    }

    /// Bounding box of the selected nodes in flow space.
    pub fn selection_rect(&self) -> Option<Rect> {
        let selected: Vec<&InternalNode> = self
            .node_lookup
            .values()
            .filter(|n| n.node.selected && n.is_rendered())
            .collect();
        (!selected.is_empty()).then(|| graph::nodes_bounds(selected))
    }

    /// Select changes that make exactly `ids` selected.
    pub fn node_selection_changes(&self, ids: &IndexSet<NodeId>) -> Vec<NodeChange> {
        self.nodes
            .iter()
            .filter(|n| n.selected != ids.contains(&n.id))
            .map(|n| NodeChange::select(n.id, !n.selected))
            .collect()
    }

    pub fn edge_selection_changes(&self, ids: &IndexSet<EdgeId>) -> Vec<EdgeChange> {
        self.edges
            .iter()
            .filter(|e| e.selected != ids.contains(&e.id))
            .map(|e| EdgeChange::select(e.id, !e.selected))
            .collect()
    }

    /// Select `ids`. Without multi-selection everything else is unselected.
    pub fn add_selected_nodes(&mut self, ids: &[NodeId]) {
        if self.multi_selection_active {
            let changes = ids.iter().map(|id| NodeChange::select(*id, true)).collect();
            self.trigger_node_changes(changes);
            return;
        }
        let set: IndexSet<NodeId> = ids.iter().copied().collect();
        let node_changes = self.node_selection_changes(&set);
        let edge_changes = self.edge_selection_changes(&IndexSet::new());
        self.trigger_node_changes(node_changes);
        self.trigger_edge_changes(edge_changes);
        self.emit_selection_change();
    }

    pub fn add_selected_edges(&mut self, ids: &[EdgeId]) {
        if self.multi_selection_active {
            let changes = ids.iter().map(|id| EdgeChange::select(*id, true)).collect();
            self.trigger_edge_changes(changes);
            return;
        }
        let set: IndexSet<EdgeId> = ids.iter().copied().collect();
        let edge_changes = self.edge_selection_changes(&set);
        let node_changes = self.node_selection_changes(&IndexSet::new());
        self.trigger_node_changes(node_changes);
        self.trigger_edge_changes(edge_changes);
        self.emit_selection_change();
    }

    /// Unselect the given elements, or all of them when `None`.
    pub fn unselect_nodes_and_edges(&mut self, nodes: Option<&[NodeId]>, edges: Option<&[EdgeId]>) {
        let node_ids: Vec<NodeId> = match nodes {
            Some(ids) => ids.to_vec(),
            None => self.nodes.iter().map(|n| n.id).collect(),
        };
        let edge_ids: Vec<EdgeId> = match edges {
            Some(ids) => ids.to_vec(),
            None => self.edges.iter().map(|e| e.id).collect(),
        };
        self.trigger_node_changes(node_ids.into_iter().map(|id| NodeChange::select(id, false)).collect());
        self.trigger_edge_changes(edge_ids.into_iter().map(|id| EdgeChange::select(id, false)).collect());
        self.emit_selection_change();
    }

    /// Unselect whatever is selected.
    pub fn reset_selected_elements(&mut self) {
        if !self.config.elements_selectable {
            return;
        }
        let node_changes: Vec<NodeChange> = self
            .nodes
            .iter()
            .filter(|n| n.selected)
            .map(|n| NodeChange::select(n.id, false))
            .collect();
        let edge_changes: Vec<EdgeChange> = self
            .edges
            .iter()
            .filter(|e| e.selected)
            .map(|e| EdgeChange::select(e.id, false))
            .collect();
        let any = !node_changes.is_empty() || !edge_changes.is_empty();
        self.trigger_node_changes(node_changes);
        self.trigger_edge_changes(edge_changes);
        if any {
            self.emit_selection_change();
        }
    }

    /// Click on a node: select it, or unselect it when it is already
    /// selected and `unselect` or multi-selection is on.
    pub fn handle_node_click(&mut self, id: NodeId, unselect: bool) {
        let Some(node) = self.node_lookup.get(&id) else {
            self.report(FlowError::UnknownNode { node: id });
            return;
        };
        let selected = node.node.selected;
        self.nodes_selection_active = false;
        if !selected {
            self.add_selected_nodes(&[id]);
        } else if unselect || self.multi_selection_active {
            self.unselect_nodes_and_edges(Some(&[id]), Some(&[]));
        }
    }

    pub fn emit_selection_change(&mut self) {
        let nodes = self.selected_nodes();
        let edges = self.selected_edges();
        self.emit(FlowEvent::SelectionChange { nodes, edges });
    }

    // ─── Deletion ────────────────────────────────────────────────────────

    /// Delete nodes (with their descendants and connected edges) and edges.
    pub fn delete_elements(&mut self, nodes: &[NodeId], edges: &[EdgeId]) -> ElementsToRemove {
        let doomed = graph::elements_to_remove(nodes, edges, &self.nodes, &self.edges);
        if doomed.is_empty() {
            return doomed;
        }
        self.trigger_edge_changes(doomed.edges.iter().map(|id| EdgeChange::remove(*id)).collect());
        self.trigger_node_changes(doomed.nodes.iter().map(|id| NodeChange::remove(*id)).collect());
        self.emit(FlowEvent::Delete {
            nodes: doomed.nodes.clone(),
            edges: doomed.edges.clone(),
        });
        doomed
    }

    // ─── Bounds ──────────────────────────────────────────────────────────

    /// Measured nodes to fit into view, optionally restricted to `ids`.
    pub fn fit_view_nodes(&self, ids: Option<&[NodeId]>, include_hidden: bool) -> Vec<&InternalNode> {
        self.node_lookup
            .values()
            .filter(|n| n.node.measured.is_some_and(|m| m.is_measured()))
            .filter(|n| include_hidden || !n.node.hidden)
            .filter(|n| ids.is_none_or(|ids| ids.contains(&n.id())))
            .collect()
    }

    /// Bounding box of the given nodes (all rendered nodes when `None`).
    pub fn nodes_bounds(&self, ids: Option<&[NodeId]>) -> Rect {
        graph::nodes_bounds(self.fit_view_nodes(ids, false))
    }
}
