//! Connection controller: drawing new edges between handles, moving an
//! existing edge's end, and click-to-connect.
//!
//! The live gesture is mirrored into the store's [`ConnectionState`] so a
//! renderer can draw the line in progress.

use flow_core::changes::EdgeChange;
use flow_core::error::FlowError;
use flow_core::geometry::{Point, calc_auto_pan};
use flow_core::graph;
use flow_core::hit;
use flow_core::id::EdgeId;
use flow_core::model::{
    Connection, ConnectionHandle, ConnectionInProgress, ConnectionMode, ConnectionState, FinalConnectionState,
    HandleType,
};
use flow_core::store::{FlowEvent, Store};

/// Whether `to` may be connected to `from`, and the connection that would
/// result. Source and target are swapped when dragging from a target.
pub fn validate_handle(store: &Store, from: &ConnectionHandle, to: &ConnectionHandle) -> (Connection, bool) {
    let from_target = from.handle_type == HandleType::Target;
    let connection = if from_target {
        Connection {
            source: to.node_id,
            source_handle: to.id,
            target: from.node_id,
            target_handle: from.id,
        }
    } else {
        Connection {
            source: from.node_id,
            source_handle: from.id,
            target: to.node_id,
            target_handle: to.id,
        }
    };

    let config = store.config();
    let connectable = store.internal_node(to.node_id).is_some_and(|n| {
        let handle = n
            .internals
            .handle_bounds
            .as_ref()
            .and_then(|b| b.find(to.handle_type, to.id));
        n.node.is_connectable(config.nodes_connectable) && handle.is_none_or(|h| h.is_connectable())
    });
    let pairs = match config.connection_mode {
        ConnectionMode::Strict => to.handle_type != from.handle_type,
        ConnectionMode::Loose => to.node_id != from.node_id || to.id != from.id,
    };
    let valid = connectable && pairs && store.validate_connection(&connection);
    (connection, valid)
}

/// The end of a reconnectable edge within `radius` of flow point `p`.
/// Returns the edge and the type of the end under the pointer.
pub fn edge_end_at(store: &mut Store, p: Point, radius: f64) -> Option<(EdgeId, HandleType)> {
    let default = store.config().edges_reconnectable;
    let candidates: Vec<EdgeId> = store
        .edges()
        .iter()
        .rev()
        .filter(|e| !e.hidden && e.reconnectable.unwrap_or(default))
        .map(|e| e.id)
        .collect();
    for id in candidates {
        let Some(ends) = store.edge_endpoints(id) else {
            continue;
        };
        if Point::new(ends.source_x, ends.source_y).distance(p) <= radius {
            return Some((id, HandleType::Source));
        }
        if Point::new(ends.target_x, ends.target_y).distance(p) <= radius {
            return Some((id, HandleType::Target));
        }
    }
    None
}

#[derive(Debug, Clone, PartialEq)]
struct Gesture {
    from: ConnectionHandle,
    /// Screen point where the gesture began.
    start: Point,
    /// Last pointer position on screen.
    pointer: Point,
    /// Edge being reconnected and the type of its fixed end.
    reconnect: Option<(EdgeId, HandleType)>,
    connection: Option<Connection>,
    is_valid: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Default)]
enum GestureState {
    #[default]
    Idle,
    /// Pointer is down on a handle; waiting for the threshold.
    Candidate(Gesture),
    Connecting(Gesture),
}

#[derive(Debug, Default)]
pub struct ConnectionController {
    state: GestureState,
    click_start: Option<ConnectionHandle>,
}

impl ConnectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.state, GestureState::Idle)
    }

    pub fn is_connecting(&self) -> bool {
        matches!(self.state, GestureState::Connecting(_))
    }

    /// Handle stored by the first click of a click-to-connect.
    pub fn click_start(&self) -> Option<&ConnectionHandle> {
        self.click_start.as_ref()
    }

    /// Pointer down on handle `from` at screen point `p`.
    pub fn pointer_down(&mut self, store: &mut Store, from: ConnectionHandle, p: Point) -> bool {
        let Some(node) = store.internal_node(from.node_id) else {
            store.report(FlowError::UnknownNode { node: from.node_id });
            return false;
        };
        if !node.node.is_connectable(store.config().nodes_connectable) {
            return false;
        }
        self.begin(store, from, p, None);
        true
    }

    /// Pointer down on the `moving` end of `edge`: the other end stays
    /// attached and the gesture draws from it.
    pub fn reconnect_down(&mut self, store: &mut Store, edge: EdgeId, moving: HandleType, p: Point) -> bool {
        let Some(e) = store.edge(edge) else {
            store.report(FlowError::UnknownEdge { edge });
            return false;
        };
        if !e.reconnectable.unwrap_or(store.config().edges_reconnectable) {
            return false;
        }
        let fixed = moving.opposite();
        let (node_id, handle_id) = match fixed {
            HandleType::Source => (e.source, e.source_handle),
            HandleType::Target => (e.target, e.target_handle),
        };
        let Some(from) = store
            .internal_node(node_id)
            .and_then(|n| hit::find_handle(n, fixed, handle_id))
        else {
            log::warn!("edge {edge} has no {} handle to reconnect from", fixed.as_str());
            return false;
        };
        store.emit(FlowEvent::ReconnectStart {
            edge,
            handle_type: fixed,
        });
        self.begin(store, from, p, Some((edge, fixed)));
        true
    }

    fn begin(&mut self, store: &mut Store, from: ConnectionHandle, p: Point, reconnect: Option<(EdgeId, HandleType)>) {
        let gesture = Gesture {
            from,
            start: p,
            pointer: p,
            reconnect,
            connection: None,
            is_valid: None,
        };
        if store.config().connection_drag_threshold <= 0.0 {
            self.start(store, gesture);
        } else {
            self.state = GestureState::Candidate(gesture);
        }
    }

    fn start(&mut self, store: &mut Store, gesture: Gesture) {
        let from = &gesture.from;
        store.emit(FlowEvent::ConnectStart {
            node_id: from.node_id,
            handle_id: from.id,
            handle_type: from.handle_type,
        });
        let pointer = store.screen_to_flow(gesture.pointer, false);
        store.set_connection(ConnectionState::InProgress(ConnectionInProgress {
            is_valid: None,
            from: Point::new(from.x, from.y),
            from_handle: from.clone(),
            from_position: from.position,
            to: pointer,
            to_handle: None,
            to_position: from.position.opposite(),
            pointer,
        }));
        self.state = GestureState::Connecting(gesture);
    }

    pub fn pointer_move(&mut self, store: &mut Store, p: Point) {
        match std::mem::take(&mut self.state) {
            GestureState::Idle => {}
            GestureState::Candidate(mut g) => {
                if g.start.distance(p) <= store.config().connection_drag_threshold {
                    self.state = GestureState::Candidate(g);
                    return;
                }
                g.pointer = p;
                self.start(store, g);
                self.update(store, p);
            }
            state @ GestureState::Connecting(_) => {
                self.state = state;
                self.update(store, p);
            }
        }
    }

    /// Re-evaluate the candidate handle for a pointer at screen point `p`.
    fn update(&mut self, store: &mut Store, p: Point) {
        let GestureState::Connecting(g) = &mut self.state else {
            return;
        };
        if store.internal_node(g.from.node_id).is_none() {
            log::warn!("connection origin {} was removed", g.from.node_id);
            self.cancel(store);
            return;
        }
        g.pointer = p;
        let pointer = store.screen_to_flow(p, false);
        let lookup = store.node_lookup();
        let radius = store.config().connection_radius;

        let from = &g.from;
        let under = hit::handle_at_point(lookup, pointer, 0.0).filter(|h| {
            !(h.node_id == from.node_id && h.handle_type == from.handle_type && h.id == from.id)
        });
        let candidate = under.or_else(|| hit::closest_handle(lookup, pointer, radius, from));

        let (connection, valid) = match &candidate {
            Some(to) => {
                let (c, valid) = validate_handle(store, from, to);
                (Some(c), valid)
            }
            None => (None, false),
        };
        g.connection = connection;
        g.is_valid = candidate.as_ref().map(|_| valid);

        let (to, to_position) = match candidate.as_ref().filter(|_| valid) {
            Some(h) => (Point::new(h.x, h.y), h.position),
            None => (pointer, from.position.opposite()),
        };
        let next = ConnectionInProgress {
            is_valid: g.is_valid,
            from: Point::new(from.x, from.y),
            from_handle: from.clone(),
            from_position: from.position,
            to,
            to_handle: candidate,
            to_position,
            pointer,
        };
        store.set_connection(ConnectionState::InProgress(next));
    }

    /// Release. Returns whether a connect gesture took place.
    pub fn pointer_up(&mut self, store: &mut Store) -> bool {
        match std::mem::take(&mut self.state) {
            GestureState::Idle => false,
            GestureState::Candidate(_) => {
                store.cancel_connection();
                false
            }
            GestureState::Connecting(g) => {
                let state = FinalConnectionState::from(store.connection());
                if g.is_valid == Some(true)
                    && let Some(c) = g.connection
                {
                    match g.reconnect {
                        None => {
                            store.emit(FlowEvent::Connect(c));
                            store.add_edge(&c);
                        }
                        Some((edge, _)) => {
                            store.emit(FlowEvent::Reconnect {
                                old_edge: edge,
                                connection: c,
                            });
                            Self::apply_reconnect(store, edge, &c);
                        }
                    }
                }
                Self::finish(store, g.reconnect, state);
                true
            }
        }
    }

    fn finish(store: &mut Store, reconnect: Option<(EdgeId, HandleType)>, state: FinalConnectionState) {
        store.cancel_connection();
        store.emit(FlowEvent::ConnectEnd(state.clone()));
        if let Some((edge, handle_type)) = reconnect {
            store.emit(FlowEvent::ReconnectEnd {
                edge,
                handle_type,
                state,
            });
        }
    }

    /// Replace `edge` by one with the new endpoints, keeping its id.
    fn apply_reconnect(store: &mut Store, edge: EdgeId, c: &Connection) {
        let Some(old) = store.edge(edge).cloned() else {
            store.report(FlowError::UnknownEdge { edge });
            return;
        };
        let mut edges = vec![old.clone()];
        if let Err(err) = graph::reconnect_edge(&old, c, &mut edges, false) {
            store.report(err);
            return;
        }
        let Some(next) = edges.pop() else {
            return;
        };
        store.trigger_edge_changes(vec![
            EdgeChange::remove(edge),
            EdgeChange::Add {
                item: next,
                index: None,
            },
        ]);
    }

    /// Click on a handle. The first click remembers it; the second
    /// connects to it when valid.
    pub fn click(&mut self, store: &mut Store, handle: ConnectionHandle) {
        if !store.config().connect_on_click {
            return;
        }
        let Some(from) = self.click_start.take() else {
            let connectable = store
                .internal_node(handle.node_id)
                .is_some_and(|n| n.node.is_connectable(store.config().nodes_connectable));
            if !connectable {
                return;
            }
            store.emit(FlowEvent::ClickConnectStart {
                node_id: handle.node_id,
                handle_id: handle.id,
                handle_type: handle.handle_type,
            });
            self.click_start = Some(handle);
            return;
        };

        let (connection, valid) = validate_handle(store, &from, &handle);
        if valid {
            store.emit(FlowEvent::Connect(connection));
            store.add_edge(&connection);
        }
        let to = Point::new(handle.x, handle.y);
        store.emit(FlowEvent::ClickConnectEnd(FinalConnectionState {
            is_valid: Some(valid),
            from_handle: Some(from),
            to_handle: Some(handle),
            to: Some(to),
            pointer: Some(to),
        }));
    }

    /// Pan while the pointer is in the auto-pan band. Returns whether the
    /// viewport moved.
    pub fn auto_pan(&mut self, store: &mut Store) -> bool {
        let GestureState::Connecting(g) = &self.state else {
            return false;
        };
        let config = store.config();
        if !config.auto_pan_on_connect {
            return false;
        }
        let v = calc_auto_pan(g.pointer, store.container_size(), config.auto_pan_speed, config.auto_pan_margin);
        let pointer = g.pointer;
        if v == Point::ZERO || !store.pan_by(v) {
            return false;
        }
        self.update(store, pointer);
        true
    }

    /// Abort the gesture. An end event without a target is still emitted.
    pub fn cancel(&mut self, store: &mut Store) {
        self.click_start = None;
        match std::mem::take(&mut self.state) {
            GestureState::Connecting(g) => {
                let mut state = FinalConnectionState::from(store.connection());
                state.is_valid = None;
                state.to_handle = None;
                log::debug!("connection from {} cancelled", g.from.node_id);
                Self::finish(store, g.reconnect, state);
            }
            GestureState::Candidate(_) | GestureState::Idle => store.cancel_connection(),
        }
    }
}
