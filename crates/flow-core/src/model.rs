//! Node, edge and handle records.
//!
//! `Node` and `Edge` are the user-facing records owned by the embedder.
//! `InternalNode` is the store-owned mirror of a node that carries the
//! derived fields: absolute position, stacking order and measured handle
//! geometry. Connections are described by endpoint tuples; the transient
//! state of an in-flight connect gesture lives in `ConnectionState`.

use crate::geometry::{CoordinateExtent, Dimensions, Point, Rect};
use crate::id::{EdgeId, HandleId, NodeId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Anchor fraction `[ox, oy]` of a node's `position` within its box.
pub type NodeOrigin = [f64; 2];

// ─── Handles ─────────────────────────────────────────────────────────────

/// Side of a node a handle sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Top,
    Right,
    #[default]
    Bottom,
    Left,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Top => Side::Bottom,
            Side::Bottom => Side::Top,
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Side::Left | Side::Right)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleType {
    Source,
    Target,
}

impl HandleType {
    pub fn as_str(self) -> &'static str {
        match self {
            HandleType::Source => "source",
            HandleType::Target => "target",
        }
    }

    pub fn opposite(self) -> HandleType {
        match self {
            HandleType::Source => HandleType::Target,
            HandleType::Target => HandleType::Source,
        }
    }
}

impl fmt::Display for HandleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How strictly handle types must pair up when connecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMode {
    /// Only source ↔ target.
    #[default]
    Strict,
    /// Any pairing except a handle with itself.
    Loose,
}

/// A handle declared on a node by the embedder, used until the node's
/// handles have been measured. Coordinates are relative to the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeHandle {
    #[serde(default)]
    pub id: Option<HandleId>,
    #[serde(rename = "type")]
    pub handle_type: HandleType,
    pub position: Side,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    /// `Some(false)` refuses connections through this handle.
    #[serde(default)]
    pub connectable: Option<bool>,
}

impl NodeHandle {
    /// A handle with top-left corner at `(x, y)` inside the node.
    pub fn new(handle_type: HandleType, position: Side, x: f64, y: f64) -> Self {
        Self {
            id: None,
            handle_type,
            position,
            x,
            y,
            width: None,
            height: None,
            connectable: None,
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(HandleId::intern(id));
        self
    }

    pub fn with_connectable(mut self, connectable: bool) -> Self {
        self.connectable = Some(connectable);
        self
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }
}

/// A measured handle rectangle relative to its node, in flow units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handle {
    pub id: Option<HandleId>,
    pub node_id: NodeId,
    #[serde(rename = "type")]
    pub handle_type: HandleType,
    pub position: Side,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub connectable: Option<bool>,
}

impl Handle {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    pub fn is_connectable(&self) -> bool {
        self.connectable.unwrap_or(true)
    }
}

pub type HandleList = SmallVec<[Handle; 4]>;

/// Measured handles of one node, split by type.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HandleBounds {
    pub source: HandleList,
    pub target: HandleList,
}

impl HandleBounds {
    pub fn of_type(&self, handle_type: HandleType) -> &HandleList {
        match handle_type {
            HandleType::Source => &self.source,
            HandleType::Target => &self.target,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Handle> {
        self.source.iter().chain(self.target.iter())
    }

    /// Handle by id, or the first handle of that type when `id` is `None`.
    pub fn find(&self, handle_type: HandleType, id: Option<HandleId>) -> Option<&Handle> {
        let list = self.of_type(handle_type);
        match id {
            Some(id) => list.iter().find(|h| h.id == Some(id)),
            None => list.first(),
        }
    }
}

// ─── Extent ──────────────────────────────────────────────────────────────

/// Where a node may be positioned. Absent means the global node extent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "NodeExtentRepr", into = "NodeExtentRepr")]
pub enum NodeExtent {
    /// Inside the parent's rectangle.
    Parent,
    /// Explicit rectangle; relative to the parent when the node has one.
    Coordinates(CoordinateExtent),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum NodeExtentRepr {
    Keyword(String),
    Coordinates(CoordinateExtent),
}

impl TryFrom<NodeExtentRepr> for NodeExtent {
    type Error = String;

    fn try_from(repr: NodeExtentRepr) -> Result<Self, Self::Error> {
        match repr {
            NodeExtentRepr::Keyword(k) if k == "parent" => Ok(NodeExtent::Parent),
            NodeExtentRepr::Keyword(k) => Err(format!("unknown node extent \"{k}\"")),
            NodeExtentRepr::Coordinates(c) => Ok(NodeExtent::Coordinates(c)),
        }
    }
}

impl From<NodeExtent> for NodeExtentRepr {
    fn from(e: NodeExtent) -> Self {
        match e {
            NodeExtent::Parent => NodeExtentRepr::Keyword("parent".to_string()),
            NodeExtent::Coordinates(c) => NodeExtentRepr::Coordinates(c),
        }
    }
}

// ─── Nodes ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    /// Relative to the parent when `parent_id` is set.
    pub position: Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// Size reported by the measurement provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measured: Option<Dimensions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extent: Option<NodeExtent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<NodeOrigin>,
    #[serde(default)]
    pub expand_parent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draggable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selectable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connectable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focusable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletable: Option<bool>,
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub dragging: bool,
    #[serde(default)]
    pub resizing: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub handles: Vec<NodeHandle>,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, position: Point) -> Self {
        Self {
            id: id.into(),
            node_type: None,
            position,
            width: None,
            height: None,
            measured: None,
            parent_id: None,
            extent: None,
            origin: None,
            expand_parent: false,
            draggable: None,
            selectable: None,
            connectable: None,
            focusable: None,
            deletable: None,
            selected: false,
            dragging: false,
            resizing: false,
            hidden: false,
            z_index: None,
            handles: Vec::new(),
        }
    }

    pub fn with_type(mut self, node_type: &str) -> Self {
        self.node_type = Some(node_type.to_string());
        self
    }

    /// Explicit width/height attributes.
    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Already-measured dimensions.
    pub fn with_measured(mut self, width: f64, height: f64) -> Self {
        self.measured = Some(Dimensions::new(width, height));
        self
    }

    pub fn with_parent(mut self, parent: impl Into<NodeId>) -> Self {
        self.parent_id = Some(parent.into());
        self
    }

    pub fn with_extent(mut self, extent: NodeExtent) -> Self {
        self.extent = Some(extent);
        self
    }

    pub fn with_handle(mut self, handle: NodeHandle) -> Self {
        self.handles.push(handle);
        self
    }

    pub fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    /// Measured size, else the width/height attributes, else zero.
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(
            self.measured
                .map(|m| m.width)
                .or(self.width)
                .unwrap_or(0.0),
            self.measured
                .map(|m| m.height)
                .or(self.height)
                .unwrap_or(0.0),
        )
    }

    /// Width and height are known, either measured or declared.
    pub fn has_dimensions(&self) -> bool {
        let w = self.measured.map(|m| m.width).or(self.width);
        let h = self.measured.map(|m| m.height).or(self.height);
        w.is_some() && h.is_some()
    }

    pub fn is_draggable(&self, default: bool) -> bool {
        self.draggable.unwrap_or(default)
    }

    pub fn is_selectable(&self, default: bool) -> bool {
        self.selectable.unwrap_or(default)
    }

    pub fn is_connectable(&self, default: bool) -> bool {
        self.connectable.unwrap_or(default)
    }

    pub fn is_focusable(&self, default: bool) -> bool {
        self.focusable.unwrap_or(default)
    }

    pub fn is_deletable(&self) -> bool {
        self.deletable.unwrap_or(true)
    }
}

/// Derived per-node state owned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeInternals {
    /// Top-left corner in flow space, origin applied and clamped.
    pub position_absolute: Point,
    pub z: i32,
    /// `None` until the node's handles have been measured.
    pub handle_bounds: Option<HandleBounds>,
    /// The record the embedder passed in, for change detection.
    pub user_node: Node,
}

/// Store-owned node index in array order.
pub type NodeLookup = IndexMap<NodeId, InternalNode>;

#[derive(Debug, Clone, PartialEq)]
pub struct InternalNode {
    pub node: Node,
    pub internals: NodeInternals,
}

impl InternalNode {
    pub fn id(&self) -> NodeId {
        self.node.id
    }

    pub fn dimensions(&self) -> Dimensions {
        self.node.dimensions()
    }

    /// Absolute rectangle in flow space.
    pub fn rect(&self) -> Rect {
        Rect::from_position(self.internals.position_absolute, self.dimensions())
    }

    /// Visible and measured: takes part in hit testing and bounds.
    pub fn is_rendered(&self) -> bool {
        !self.node.hidden && self.node.has_dimensions() && self.dimensions().is_measured()
    }
}

// ─── Edges ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: EdgeId,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub edge_type: Option<String>,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default)]
    pub source_handle: Option<HandleId>,
    #[serde(default)]
    pub target_handle: Option<HandleId>,
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selectable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconnectable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Edge {
    pub fn new(id: impl Into<EdgeId>, source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            edge_type: None,
            source: source.into(),
            target: target.into(),
            source_handle: None,
            target_handle: None,
            selected: false,
            hidden: false,
            selectable: None,
            deletable: None,
            reconnectable: None,
            z_index: None,
            label: None,
        }
    }

    /// Edge built from a finished connection.
    pub fn from_connection(id: EdgeId, c: &Connection) -> Self {
        let mut edge = Edge::new(id, c.source, c.target);
        edge.source_handle = c.source_handle;
        edge.target_handle = c.target_handle;
        edge
    }

    pub fn with_handles(mut self, source: Option<&str>, target: Option<&str>) -> Self {
        self.source_handle = source.map(HandleId::intern);
        self.target_handle = target.map(HandleId::intern);
        self
    }

    pub fn with_type(mut self, edge_type: &str) -> Self {
        self.edge_type = Some(edge_type.to_string());
        self
    }

    pub fn is_selectable(&self, default: bool) -> bool {
        self.selectable.unwrap_or(default)
    }

    pub fn is_deletable(&self) -> bool {
        self.deletable.unwrap_or(true)
    }

    pub fn connection(&self) -> Connection {
        Connection {
            source: self.source,
            target: self.target,
            source_handle: self.source_handle,
            target_handle: self.target_handle,
        }
    }

    /// Same endpoints, handles included.
    pub fn connects_like(&self, other: &Connection) -> bool {
        self.source == other.source
            && self.target == other.target
            && self.source_handle == other.source_handle
            && self.target_handle == other.target_handle
    }
}

// ─── Connections ─────────────────────────────────────────────────────────

/// The endpoints of a (prospective) edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub source: NodeId,
    pub target: NodeId,
    pub source_handle: Option<HandleId>,
    pub target_handle: Option<HandleId>,
}

/// An edge as recorded in the connection lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandleConnection {
    pub edge_id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub source_handle: Option<HandleId>,
    pub target_handle: Option<HandleId>,
}

impl HandleConnection {
    pub fn of_edge(edge: &Edge) -> Self {
        Self {
            edge_id: edge.id,
            source: edge.source,
            target: edge.target,
            source_handle: edge.source_handle,
            target_handle: edge.target_handle,
        }
    }
}

/// A handle taking part in a connect gesture, with its absolute centre.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionHandle {
    pub node_id: NodeId,
    pub id: Option<HandleId>,
    #[serde(rename = "type")]
    pub handle_type: HandleType,
    pub position: Side,
    pub x: f64,
    pub y: f64,
}

/// Live state of a connect gesture.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInProgress {
    /// `None` until a candidate handle is under the pointer.
    pub is_valid: Option<bool>,
    pub from: Point,
    pub from_handle: ConnectionHandle,
    pub from_position: Side,
    pub to: Point,
    pub to_handle: Option<ConnectionHandle>,
    pub to_position: Side,
    /// Pointer in flow space.
    pub pointer: Point,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ConnectionState {
    #[default]
    Idle,
    InProgress(ConnectionInProgress),
}

impl ConnectionState {
    pub fn is_in_progress(&self) -> bool {
        matches!(self, ConnectionState::InProgress(_))
    }

    pub fn in_progress(&self) -> Option<&ConnectionInProgress> {
        match self {
            ConnectionState::InProgress(c) => Some(c),
            ConnectionState::Idle => None,
        }
    }
}

/// Snapshot handed to connect-end listeners.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalConnectionState {
    pub is_valid: Option<bool>,
    pub from_handle: Option<ConnectionHandle>,
    pub to_handle: Option<ConnectionHandle>,
    pub to: Option<Point>,
    pub pointer: Option<Point>,
}

impl From<&ConnectionState> for FinalConnectionState {
    fn from(state: &ConnectionState) -> Self {
        match state {
            ConnectionState::Idle => FinalConnectionState::default(),
            ConnectionState::InProgress(c) => FinalConnectionState {
                is_valid: c.is_valid,
                from_handle: Some(c.from_handle.clone()),
                to_handle: c.to_handle.clone(),
                to: Some(c.to),
                pointer: Some(c.pointer),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn dimensions_prefer_measured() {
        let n = Node::new("a", Point::ZERO).with_size(10.0, 20.0);
        assert_eq!(n.dimensions(), Dimensions::new(10.0, 20.0));
        let n = n.with_measured(30.0, 40.0);
        assert_eq!(n.dimensions(), Dimensions::new(30.0, 40.0));
        assert!(!Node::new("b", Point::ZERO).has_dimensions());
    }

    #[test]
    fn tri_state_flags_fall_back_to_default() {
        let mut n = Node::new("a", Point::ZERO);
        assert!(n.is_draggable(true));
        assert!(!n.is_draggable(false));
        n.draggable = Some(false);
        assert!(!n.is_draggable(true));
    }

    #[test]
    fn extent_wire_format() {
        let n: Node = serde_json::from_str(
            r#"{"id":"c","position":{"x":1,"y":2},"parentId":"p","extent":"parent"}"#,
        )
        .unwrap();
        assert_eq!(n.extent, Some(NodeExtent::Parent));
        assert_eq!(n.parent_id, Some(NodeId::intern("p")));

        let n: Node = serde_json::from_str(
            r#"{"id":"d","position":{"x":0,"y":0},"extent":[[0,0],[10,10]]}"#,
        )
        .unwrap();
        assert_eq!(
            n.extent,
            Some(NodeExtent::Coordinates(CoordinateExtent::new(0.0, 0.0, 10.0, 10.0)))
        );

        assert!(serde_json::from_str::<Node>(r#"{"id":"e","position":{"x":0,"y":0},"extent":"nope"}"#).is_err());
    }

    #[test]
    fn handle_lookup_defaults_to_first() {
        let node = NodeId::intern("n");
        let h = |id: &str| Handle {
            id: Some(HandleId::intern(id)),
            node_id: node,
            handle_type: HandleType::Target,
            position: Side::Left,
            x: 0.0,
            y: 0.0,
            width: 4.0,
            height: 4.0,
            connectable: None,
        };
        let bounds = HandleBounds {
            source: HandleList::new(),
            target: [h("t1"), h("t2")].into_iter().collect(),
        };
        assert_eq!(bounds.find(HandleType::Target, None).and_then(|h| h.id), Some(HandleId::intern("t1")));
        assert_eq!(
            bounds.find(HandleType::Target, Some(HandleId::intern("t2"))).and_then(|h| h.id),
            Some(HandleId::intern("t2"))
        );
        assert!(bounds.find(HandleType::Source, None).is_none());
    }

    #[test]
    fn sides_are_symmetric() {
        for s in [Side::Top, Side::Right, Side::Bottom, Side::Left] {
            assert_eq!(s.opposite().opposite(), s);
        }
    }
}
