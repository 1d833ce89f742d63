//! `FlowCanvas`: owns a [`Store`] and the interaction controllers and
//! routes normalized input to them.
//!
//! Pointer-down decides which controller owns the gesture by hit testing in
//! this order: handle, edge end, resize control, node, selection box, pane.
//! Everything until pointer-up goes to that controller.

use crate::connection::{self, ConnectionController};
use crate::drag::{DragController, move_selected_nodes};
use crate::input::{BUTTON_PRIMARY, InputEvent, Modifiers};
use crate::panzoom::{FitViewOptions, PanZoom};
use crate::resize::{ResizeControl, ResizeController, ResizeOptions};
use crate::selection::SelectionController;
use crate::transition::TransitionOptions;
use flow_core::config::{FlowConfig, Platform};
use flow_core::geometry::{Point, Rect, Viewport};
use flow_core::hit;
use flow_core::id::NodeId;
use flow_core::model::ConnectionHandle;
use flow_core::store::Store;
use futures::channel::oneshot;
use indexmap::IndexMap;

/// Screen pixels around a handle that still grab it.
pub const HANDLE_HIT_SLOP: f64 = 2.0;
/// Screen pixels around a node border that grab a resize control.
pub const RESIZE_HIT_SLOP: f64 = 4.0;

/// Who owns the pointer between down and up.
#[derive(Debug, Clone, PartialEq, Default)]
enum Gesture {
    #[default]
    None,
    /// Empty canvas. `click` is set for the primary button; panning runs
    /// when the pan controller accepted the button.
    Pane { start: Point, click: bool },
    Drag { node: Option<NodeId> },
    Resize,
    Connect { handle: Option<ConnectionHandle> },
    Select,
}

#[derive(Debug, Default)]
pub struct FlowCanvas {
    store: Store,
    panzoom: PanZoom,
    drag: DragController,
    resize: ResizeController,
    connection: ConnectionController,
    selection: SelectionController,
    /// Nodes showing resize controls.
    resizable: IndexMap<NodeId, ResizeOptions>,
    gesture: Gesture,
    multi_key: bool,
    selection_key: bool,
}

impl FlowCanvas {
    pub fn new(config: FlowConfig) -> Self {
        Self {
            store: Store::new(config),
            ..Self::default()
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    pub fn connection(&self) -> &ConnectionController {
        &self.connection
    }

    /// Marquee rectangle in screen space while one is drawn.
    pub fn selection_rect(&self) -> Option<Rect> {
        self.selection.rect()
    }

    /// Show resize controls on `node`, or hide them with `None`.
    pub fn set_resizable(&mut self, node: NodeId, options: Option<ResizeOptions>) {
        match options {
            Some(o) => {
                self.resizable.insert(node, o);
            }
            None => {
                self.resizable.shift_remove(&node);
            }
        }
    }

    pub fn set_should_resize(&mut self, f: impl FnMut(&flow_core::store::ResizeParams, [f64; 2]) -> bool + 'static) {
        self.resize.set_should_resize(f);
    }

    /// A pointer gesture is in progress.
    pub fn is_busy(&self) -> bool {
        self.gesture != Gesture::None
    }

    // ─── Viewport ────────────────────────────────────────────────────────

    pub fn set_viewport(&mut self, t: Viewport, options: TransitionOptions) -> oneshot::Receiver<bool> {
        self.panzoom.set_viewport(&mut self.store, t, options)
    }

    pub fn zoom_in(&mut self, options: TransitionOptions) -> oneshot::Receiver<bool> {
        self.panzoom.zoom_in(&mut self.store, options)
    }

    pub fn zoom_out(&mut self, options: TransitionOptions) -> oneshot::Receiver<bool> {
        self.panzoom.zoom_out(&mut self.store, options)
    }

    pub fn fit_view(&mut self, options: &FitViewOptions) -> oneshot::Receiver<bool> {
        self.panzoom.fit_view(&mut self.store, options)
    }

    pub fn screen_to_flow_position(&self, p: Point, snap: bool) -> Point {
        self.panzoom.screen_to_flow_position(&self.store, p, snap)
    }

    pub fn flow_to_screen_position(&self, p: Point) -> Point {
        self.panzoom.flow_to_screen_position(&self.store, p)
    }

    // ─── Input ───────────────────────────────────────────────────────────

    /// Feed one input event. `now_ms` is the host's monotonic clock.
    pub fn handle_event(&mut self, event: &InputEvent, now_ms: f64) {
        match event {
            InputEvent::PointerDown {
                x,
                y,
                button,
                modifiers,
            } => self.pointer_down(Point::new(*x, *y), *button, *modifiers),
            InputEvent::PointerMove { x, y, .. } => self.pointer_move(Point::new(*x, *y)),
            InputEvent::PointerUp { .. } => self.pointer_up(),
            InputEvent::Wheel {
                x,
                y,
                dx,
                dy,
                mode,
                modifiers,
            } => {
                self.panzoom
                    .wheel(&mut self.store, Point::new(*x, *y), *dx, *dy, *mode, *modifiers, now_ms);
            }
            InputEvent::DoubleClick { x, y, modifiers } => {
                let p = Point::new(*x, *y);
                let flow = self.store.screen_to_flow(p, false);
                if hit::node_at_point(self.store.node_lookup(), flow).is_none() {
                    // Completion is observable through `tick`; nobody awaits it here.
                    let _ = self.panzoom.double_click(&mut self.store, p, *modifiers);
                }
            }
            InputEvent::KeyDown { key, modifiers } => self.key_down(key, *modifiers),
            InputEvent::KeyUp { key, .. } => self.key_up(key),
            InputEvent::Cancel => self.cancel(),
        }
    }

    fn multi_key_name(&self) -> &'static str {
        match self.store.config().platform {
            Platform::MacOs => "Meta",
            Platform::Other => "Control",
        }
    }

    fn pointer_down(&mut self, p: Point, button: u8, modifiers: Modifiers) {
        if self.gesture != Gesture::None {
            return;
        }
        let platform = self.store.config().platform;
        self.store
            .set_multi_selection_active(self.multi_key || modifiers.multi_select(platform));

        if button != BUTTON_PRIMARY {
            if self.panzoom.pointer_down(&mut self.store, p, button) {
                self.gesture = Gesture::Pane { start: p, click: false };
            }
            return;
        }

        let zoom = self.store.viewport().zoom;
        let flow = self.store.screen_to_flow(p, false);

        if let Some(handle) = hit::handle_at_point(self.store.node_lookup(), flow, HANDLE_HIT_SLOP / zoom) {
            self.connection.pointer_down(&mut self.store, handle.clone(), p);
            self.gesture = Gesture::Connect { handle: Some(handle) };
            return;
        }

        let reconnect_radius = self.store.config().reconnect_radius;
        if let Some((edge, end)) = connection::edge_end_at(&mut self.store, flow, reconnect_radius)
            && self.connection.reconnect_down(&mut self.store, edge, end, p)
        {
            self.gesture = Gesture::Connect { handle: None };
            return;
        }

        if let Some((node, control)) = self.resize_control_at(p)
            && let Some(options) = self.resizable.get(&node)
        {
            self.resize.options = *options;
            if self.resize.pointer_down(&mut self.store, node, control, p) {
                self.gesture = Gesture::Resize;
                return;
            }
        }

        if let Some(node) = hit::node_at_point(self.store.node_lookup(), flow) {
            self.drag.pointer_down(&mut self.store, Some(node), p);
            self.gesture = Gesture::Drag { node: Some(node) };
            return;
        }

        if self.store.nodes_selection_active()
            && self.store.selection_rect().is_some_and(|r| r.contains(flow))
        {
            self.drag.pointer_down(&mut self.store, None, p);
            self.gesture = Gesture::Drag { node: None };
            return;
        }

        let marquee = self.selection_key || self.store.config().selection_on_drag;
        if marquee && self.selection.pointer_down(&mut self.store, p) {
            self.gesture = Gesture::Select;
        } else {
            self.panzoom.pointer_down(&mut self.store, p, button);
            self.gesture = Gesture::Pane { start: p, click: true };
        }
    }

    /// Resize control of a resizable node under screen point `p`, topmost
    /// node first.
    fn resize_control_at(&self, p: Point) -> Option<(NodeId, ResizeControl)> {
        let t = self.store.viewport();
        hit::paint_order(self.store.node_lookup())
            .into_iter()
            .rev()
            .filter(|n| self.resizable.contains_key(&n.id()))
            .find_map(|n| {
                let r = n.rect();
                let screen = Rect::new(r.x * t.zoom + t.x, r.y * t.zoom + t.y, r.width * t.zoom, r.height * t.zoom);
                ResizeControl::at_point(screen, p, RESIZE_HIT_SLOP).map(|c| (n.id(), c))
            })
    }

    fn pointer_move(&mut self, p: Point) {
        match &mut self.gesture {
            Gesture::None => {}
            Gesture::Pane { start, click } => {
                if *start != p {
                    *click = false;
                }
                self.panzoom.pointer_move(&mut self.store, p);
            }
            Gesture::Drag { .. } => self.drag.pointer_move(&mut self.store, p),
            Gesture::Resize => self.resize.pointer_move(&mut self.store, p),
            Gesture::Connect { .. } => self.connection.pointer_move(&mut self.store, p),
            Gesture::Select => self.selection.pointer_move(&mut self.store, p),
        }
    }

    fn pointer_up(&mut self) {
        match std::mem::take(&mut self.gesture) {
            Gesture::None => {}
            Gesture::Pane { click, .. } => {
                self.panzoom.pointer_up(&mut self.store);
                if click {
                    self.pane_click();
                }
            }
            Gesture::Drag { node } => {
                let dragged = self.drag.pointer_up(&mut self.store);
                let selectable = self.store.config().elements_selectable;
                if !dragged
                    && let Some(id) = node
                    && self
                        .store
                        .internal_node(id)
                        .is_some_and(|n| n.node.is_selectable(selectable))
                {
                    self.store.handle_node_click(id, false);
                }
            }
            Gesture::Resize => self.resize.pointer_up(&mut self.store),
            Gesture::Connect { handle } => {
                let dragged = self.connection.pointer_up(&mut self.store);
                if !dragged && let Some(h) = handle {
                    self.connection.click(&mut self.store, h);
                }
            }
            Gesture::Select => {
                if !self.selection.pointer_up(&mut self.store) {
                    self.pane_click();
                }
            }
        }
    }

    fn pane_click(&mut self) {
        self.store.reset_selected_elements();
        self.store.set_nodes_selection_active(false);
    }

    fn key_down(&mut self, key: &str, modifiers: Modifiers) {
        if key == self.multi_key_name() {
            self.multi_key = true;
            self.store.set_multi_selection_active(true);
            return;
        }
        match key {
            "Escape" => self.cancel(),
            "Shift" => self.selection_key = true,
            "Backspace" | "Delete" if self.gesture == Gesture::None => {
                let nodes = self.store.selected_nodes();
                let edges = self.store.selected_edges();
                let removed = self.store.delete_elements(&nodes, &edges);
                log::debug!("deleted {} nodes and {} edges", removed.nodes.len(), removed.edges.len());
            }
            "ArrowUp" | "ArrowDown" | "ArrowLeft" | "ArrowRight" if self.gesture == Gesture::None => {
                let direction = match key {
                    "ArrowUp" => Point::new(0.0, -1.0),
                    "ArrowDown" => Point::new(0.0, 1.0),
                    "ArrowLeft" => Point::new(-1.0, 0.0),
                    _ => Point::new(1.0, 0.0),
                };
                let factor = if modifiers.shift { 4.0 } else { 1.0 };
                move_selected_nodes(&mut self.store, direction, factor);
            }
            _ => {}
        }
    }

    fn key_up(&mut self, key: &str) {
        if key == self.multi_key_name() {
            self.multi_key = false;
            self.store.set_multi_selection_active(false);
        } else if key == "Shift" {
            self.selection_key = false;
        }
    }

    /// Abort whatever gesture is running.
    pub fn cancel(&mut self) {
        match std::mem::take(&mut self.gesture) {
            Gesture::Drag { .. } => self.drag.abort(&mut self.store),
            Gesture::Resize => self.resize.pointer_up(&mut self.store),
            Gesture::Connect { .. } => self.connection.cancel(&mut self.store),
            Gesture::Select => self.selection.cancel(&mut self.store),
            Gesture::Pane { .. } | Gesture::None => {}
        }
        if self.connection.click_start().is_some() {
            self.connection.cancel(&mut self.store);
        }
        self.panzoom.cancel(&mut self.store);
    }

    // ─── Frame ───────────────────────────────────────────────────────────

    /// Advance transitions, auto-pan and timers. Returns whether another
    /// frame is wanted.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        let viewport_busy = self.panzoom.tick(&mut self.store, now_ms);
        if self.drag.is_dragging() {
            self.drag.auto_pan(&mut self.store);
        }
        if self.connection.is_connecting() {
            self.connection.auto_pan(&mut self.store);
        }
        viewport_busy || self.drag.is_dragging() || self.connection.is_connecting()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{BUTTON_MIDDLE, WheelDeltaMode};
    use flow_core::model::{HandleType, Node, NodeHandle, Side};
    use flow_core::store::FlowEvent;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn canvas(config: FlowConfig) -> (FlowCanvas, Rc<RefCell<Vec<FlowEvent>>>) {
        let mut canvas = FlowCanvas::new(config);
        let store = canvas.store_mut();
        store.set_container_size(800.0, 600.0);
        store.set_nodes(vec![
            Node::new("a", Point::new(100.0, 100.0))
                .with_measured(100.0, 50.0)
                .with_handle(NodeHandle::new(HandleType::Source, Side::Right, 95.0, 20.0).with_size(10.0, 10.0)),
            Node::new("b", Point::new(400.0, 100.0))
                .with_measured(100.0, 50.0)
                .with_handle(NodeHandle::new(HandleType::Target, Side::Left, -5.0, 20.0).with_size(10.0, 10.0)),
        ]);
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        store.subscribe(move |e| sink.borrow_mut().push(e.clone()));
        (canvas, events)
    }

    fn position(c: &FlowCanvas, id: &str) -> Point {
        c.store().nodes().iter().find(|n| n.id.as_str() == id).unwrap().position
    }

    fn gesture(c: &mut FlowCanvas, points: &[(f64, f64)]) {
        let (x, y) = points[0];
        c.handle_event(&InputEvent::pointer_down(x, y), 0.0);
        for (x, y) in &points[1..] {
            c.handle_event(&InputEvent::pointer_move(*x, *y), 0.0);
        }
        let (x, y) = points[points.len() - 1];
        c.handle_event(&InputEvent::pointer_up(x, y), 0.0);
    }

    #[test]
    fn pane_drag_pans() {
        let (mut c, _) = canvas(FlowConfig::default());
        gesture(&mut c, &[(10.0, 10.0), (30.0, 20.0), (50.0, 40.0)]);
        assert_eq!(c.store().viewport(), Viewport::new(40.0, 30.0, 1.0));
        assert!(!c.is_busy());
    }

    #[test]
    fn middle_button_pans_even_over_nodes() {
        let (mut c, _) = canvas(FlowConfig::default());
        c.handle_event(
            &InputEvent::PointerDown {
                x: 150.0,
                y: 120.0,
                button: BUTTON_MIDDLE,
                modifiers: Modifiers::NONE,
            },
            0.0,
        );
        c.handle_event(&InputEvent::pointer_move(160.0, 120.0), 0.0);
        c.handle_event(&InputEvent::pointer_up(160.0, 120.0), 0.0);
        assert_eq!(c.store().viewport().x, 10.0);
        assert_eq!(position(&c, "a"), Point::new(100.0, 100.0));
    }

    #[test]
    fn node_click_selects_and_pane_click_clears() {
        let (mut c, _) = canvas(FlowConfig::default());
        gesture(&mut c, &[(150.0, 120.0)]);
        assert_eq!(c.store().selected_nodes(), vec![NodeId::intern("a")]);
        gesture(&mut c, &[(700.0, 500.0)]);
        assert!(c.store().selected_nodes().is_empty());
    }

    #[test]
    fn node_drag_moves_the_node() {
        let (mut c, events) = canvas(FlowConfig::default());
        gesture(&mut c, &[(150.0, 120.0), (170.0, 130.0), (190.0, 140.0)]);
        assert_eq!(position(&c, "a"), Point::new(140.0, 120.0));
        assert!(events.borrow().iter().any(|e| matches!(e, FlowEvent::NodeDragStop { .. })));
    }

    #[test]
    fn handle_drag_connects() {
        let (mut c, _) = canvas(FlowConfig::default());
        gesture(&mut c, &[(200.0, 125.0), (300.0, 125.0), (400.0, 125.0)]);
        assert_eq!(c.store().edges().len(), 1);
        assert!(!c.store().connection().is_in_progress());
    }

    #[test]
    fn shift_drag_draws_a_marquee() {
        let (mut c, events) = canvas(FlowConfig::default());
        c.handle_event(&InputEvent::key("Shift"), 0.0);
        c.handle_event(&InputEvent::pointer_down(50.0, 50.0), 0.0);
        c.handle_event(&InputEvent::pointer_move(300.0, 300.0), 0.0);
        assert!(c.selection_rect().is_some());
        c.handle_event(&InputEvent::pointer_up(300.0, 300.0), 0.0);
        assert_eq!(c.store().selected_nodes(), vec![NodeId::intern("a")]);
        assert_eq!(c.store().viewport(), Viewport::IDENTITY);
        assert!(events.borrow().iter().any(|e| matches!(e, FlowEvent::SelectionEnd)));
    }

    #[test]
    fn escape_cancels_a_connection() {
        let (mut c, events) = canvas(FlowConfig::default());
        c.handle_event(&InputEvent::pointer_down(200.0, 125.0), 0.0);
        c.handle_event(&InputEvent::pointer_move(300.0, 200.0), 0.0);
        assert!(c.store().connection().is_in_progress());
        c.handle_event(&InputEvent::key("Escape"), 0.0);
        assert!(!c.store().connection().is_in_progress());
        assert!(!c.is_busy());
        assert!(events.borrow().iter().any(|e| matches!(e, FlowEvent::ConnectEnd(_))));
    }

    #[test]
    fn delete_removes_the_selection() {
        let (mut c, _) = canvas(FlowConfig::default());
        gesture(&mut c, &[(150.0, 120.0)]);
        c.handle_event(&InputEvent::key("Backspace"), 0.0);
        let ids: Vec<&str> = c.store().nodes().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["b"]);
    }

    #[test]
    fn arrow_keys_nudge_the_selection() {
        let (mut c, _) = canvas(FlowConfig::default());
        gesture(&mut c, &[(150.0, 120.0)]);
        c.handle_event(&InputEvent::key("ArrowRight"), 0.0);
        c.handle_event(
            &InputEvent::KeyDown {
                key: "ArrowDown".to_string(),
                modifiers: Modifiers::shift(),
            },
            0.0,
        );
        assert_eq!(position(&c, "a"), Point::new(105.0, 120.0));
    }

    #[test]
    fn multi_select_key_extends_selection() {
        let (mut c, _) = canvas(FlowConfig::default());
        gesture(&mut c, &[(150.0, 120.0)]);
        c.handle_event(&InputEvent::key("Control"), 0.0);
        gesture(&mut c, &[(450.0, 120.0)]);
        assert_eq!(c.store().selected_nodes().len(), 2);
        c.handle_event(
            &InputEvent::KeyUp {
                key: "Control".to_string(),
                modifiers: Modifiers::NONE,
            },
            0.0,
        );
        assert!(!c.store().multi_selection_active());
    }

    #[test]
    fn resize_control_takes_precedence_over_drag() {
        let (mut c, _) = canvas(FlowConfig::default());
        c.set_resizable(NodeId::intern("b"), Some(ResizeOptions::default()));
        gesture(&mut c, &[(500.0, 150.0), (520.0, 170.0), (540.0, 190.0)]);
        let b = c.store().nodes().iter().find(|n| n.id.as_str() == "b").unwrap();
        assert_eq!(b.position, Point::new(400.0, 100.0));
        assert_eq!(b.measured.map(|m| (m.width, m.height)), Some((140.0, 90.0)));
        assert!(!b.resizing);
    }

    #[test]
    fn wheel_and_double_click_zoom() {
        let (mut c, _) = canvas(FlowConfig::default());
        c.handle_event(
            &InputEvent::Wheel {
                x: 0.0,
                y: 0.0,
                dx: 0.0,
                dy: -100.0,
                mode: WheelDeltaMode::Pixel,
                modifiers: Modifiers::NONE,
            },
            0.0,
        );
        assert!(c.store().viewport().zoom > 1.0);
        // The scroll-end timer keeps frames coming until it fires.
        assert!(c.tick(100.0));
        assert!(!c.tick(200.0));

        let before = c.store().viewport().zoom;
        c.handle_event(
            &InputEvent::DoubleClick {
                x: 700.0,
                y: 500.0,
                modifiers: Modifiers::shift(),
            },
            300.0,
        );
        c.tick(300.0);
        c.tick(600.0);
        assert!((c.store().viewport().zoom - (before * 0.5).max(0.5)).abs() < 1e-9);
        assert!(!c.tick(700.0));
    }
}
