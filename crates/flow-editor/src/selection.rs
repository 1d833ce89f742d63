//! Marquee selection.
//!
//! Dragging on empty canvas spans a rectangle between the down point and
//! the pointer. Nodes inside it are selected; edges follow from their
//! endpoints. Changes are only emitted when membership changes.

use flow_core::config::SelectionMode;
use flow_core::geometry::{Point, Rect};
use flow_core::hit;
use flow_core::id::{EdgeId, NodeId};
use flow_core::store::{FlowEvent, Store};
use indexmap::IndexSet;

#[derive(Debug, Clone, PartialEq)]
struct Marquee {
    /// Screen point where the pointer went down.
    start: Point,
    rect: Rect,
    /// The marquee has moved and selection started.
    active: bool,
    /// Kept selection when adding to it.
    base_nodes: IndexSet<NodeId>,
    nodes: IndexSet<NodeId>,
    edges: IndexSet<EdgeId>,
}

#[derive(Debug, Default)]
pub struct SelectionController {
    marquee: Option<Marquee>,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.marquee.is_some()
    }

    /// Current marquee in screen space.
    pub fn rect(&self) -> Option<Rect> {
        self.marquee.as_ref().filter(|m| m.active).map(|m| m.rect)
    }

    /// Pointer down on empty canvas at screen point `p`.
    pub fn pointer_down(&mut self, store: &mut Store, p: Point) -> bool {
        if !store.config().elements_selectable {
            return false;
        }
        self.marquee = Some(Marquee {
            start: p,
            rect: Rect::new(p.x, p.y, 0.0, 0.0),
            active: false,
            base_nodes: IndexSet::new(),
            nodes: IndexSet::new(),
            edges: IndexSet::new(),
        });
        true
    }

    pub fn pointer_move(&mut self, store: &mut Store, p: Point) {
        let Some(m) = self.marquee.as_mut() else {
            return;
        };
        if !m.active {
            if m.start == p {
                return;
            }
            m.active = true;
            if store.multi_selection_active() {
                m.base_nodes = store.selected_nodes().into_iter().collect();
            } else {
                store.reset_selected_elements();
            }
            m.nodes = m.base_nodes.clone();
            store.emit(FlowEvent::SelectionStart);
        }
        m.rect = Rect::from_corners(m.start, p);

        let config = store.config();
        let partial = config.selection_mode == SelectionMode::Partial;
        let edges_selectable = config.elements_selectable;
        let mut nodes = m.base_nodes.clone();
        nodes.extend(hit::nodes_inside(
            store.node_lookup(),
            m.rect,
            store.viewport(),
            partial,
            true,
        ));

        let mut edges = IndexSet::new();
        for id in &nodes {
            for c in store.connections(*id, None, None) {
                if store
                    .edge(c.edge_id)
                    .is_some_and(|e| e.is_selectable(edges_selectable))
                {
                    edges.insert(c.edge_id);
                }
            }
        }

        let nodes_changed = !same_members(&nodes, &m.nodes);
        let edges_changed = !same_members(&edges, &m.edges);
        if nodes_changed {
            let changes = store.node_selection_changes(&nodes);
            store.trigger_node_changes(changes);
        }
        if edges_changed {
            let changes = store.edge_selection_changes(&edges);
            store.trigger_edge_changes(changes);
        }
        m.nodes = nodes;
        m.edges = edges;
        if nodes_changed || edges_changed {
            store.emit_selection_change();
        }
        store.set_user_selection_active(true);
        store.set_nodes_selection_active(false);
    }

    /// Release. Returns whether a marquee ran; `false` means the pane was
    /// clicked.
    pub fn pointer_up(&mut self, store: &mut Store) -> bool {
        let Some(m) = self.marquee.take() else {
            return false;
        };
        if !m.active {
            return false;
        }
        store.set_user_selection_active(false);
        store.set_nodes_selection_active(!m.nodes.is_empty());
        store.emit(FlowEvent::SelectionEnd);
        true
    }

    /// Drop the marquee, keeping whatever it selected.
    pub fn cancel(&mut self, store: &mut Store) {
        self.pointer_up(store);
    }
}

fn same_members<T: std::hash::Hash + Eq>(a: &IndexSet<T>, b: &IndexSet<T>) -> bool {
    a.len() == b.len() && a.iter().all(|x| b.contains(x))
}
