//! Viewport controller: pan/zoom gestures and programmatic viewport moves.
//!
//! Every transform goes through [`Store::constrain`] (zoom range, then
//! translate extent). Observers see `MoveStart` once when a movement
//! begins, `Move` for each applied viewport and `MoveEnd` when it settles:
//! on pointer-up for drag panning, 150ms after the last wheel event for
//! scroll gestures, and when a transition completes.

use crate::input::{Modifiers, WheelDeltaMode};
use crate::transition::{Transition, TransitionOptions, TransitionStep, resolved};
use flow_core::config::{PanOnScrollMode, Platform};
use flow_core::geometry::{Padding, Point, Rect, Viewport, clamp, viewport_for_bounds};
use flow_core::graph;
use flow_core::id::NodeId;
use flow_core::store::{FlowEvent, Store};
use futures::channel::oneshot;

/// Factor applied by [`PanZoom::zoom_in`] and [`PanZoom::zoom_out`].
pub const ZOOM_STEP: f64 = 1.2;

/// Idle time after the last wheel event before the gesture ends.
pub const SCROLL_END_DELAY: f64 = 150.0;

/// Options for [`PanZoom::fit_view`].
#[derive(Debug, Clone, Default)]
pub struct FitViewOptions {
    /// Falls back to `FlowConfig::fit_view_padding`.
    pub padding: Option<Padding>,
    pub include_hidden: bool,
    pub min_zoom: Option<f64>,
    pub max_zoom: Option<f64>,
    /// Restrict to these nodes.
    pub nodes: Option<Vec<NodeId>>,
    pub transition: TransitionOptions,
}

/// Zoom exponent for one wheel event.
pub fn wheel_delta(dy: f64, mode: WheelDeltaMode, ctrl: bool, platform: Platform) -> f64 {
    let factor = if ctrl && platform == Platform::MacOs { 10.0 } else { 1.0 };
    let unit = match mode {
        WheelDeltaMode::Line => 0.05,
        WheelDeltaMode::Page => 1.0,
        WheelDeltaMode::Pixel => 0.002,
    };
    -dy * unit * factor
}

#[derive(Debug, Default)]
pub struct PanZoom {
    transition: Option<Transition>,
    drag_from: Option<Point>,
    moving: bool,
    scroll_end_at: Option<f64>,
    now: f64,
}

impl PanZoom {
    pub fn new() -> Self {
        Self::default()
    }

    /// A gesture, transition or scroll timer is pending.
    pub fn is_active(&self) -> bool {
        self.transition.is_some() || self.drag_from.is_some() || self.scroll_end_at.is_some()
    }

    pub fn is_panning(&self) -> bool {
        self.drag_from.is_some()
    }

    pub fn is_moving(&self) -> bool {
        self.moving
    }

    fn begin_move(&mut self, store: &mut Store) {
        if !self.moving {
            self.moving = true;
            let vp = store.viewport();
            store.emit(FlowEvent::MoveStart(vp));
        }
    }

    fn end_move(&mut self, store: &mut Store) {
        if self.moving {
            self.moving = false;
            let vp = store.viewport();
            store.emit(FlowEvent::MoveEnd(vp));
        }
    }

    fn apply(&mut self, store: &mut Store, t: Viewport) -> Viewport {
        let before = store.viewport();
        let after = store.set_viewport(t);
        if after != before {
            store.emit(FlowEvent::Move(after));
        }
        after
    }

    /// `t` rescaled to `zoom` (clamped to the zoom range) about screen
    /// point `p`, which keeps its flow-space position.
    fn zoom_about(store: &Store, t: Viewport, zoom: f64, p: Point) -> Viewport {
        let config = store.config();
        let k = clamp(zoom, config.min_zoom, config.max_zoom);
        let fx = (p.x - t.x) / t.zoom;
        let fy = (p.y - t.y) / t.zoom;
        Viewport::new(p.x - fx * k, p.y - fy * k, k)
    }

    fn pane_center(store: &Store) -> Point {
        let size = store.container_size();
        Point::new(size.width / 2.0, size.height / 2.0)
    }

    // ─── Programmatic ────────────────────────────────────────────────────

    /// Move to `t`, animated when `options.duration > 0`. The future
    /// resolves `true` on completion and `false` when interrupted.
    pub fn set_viewport(&mut self, store: &mut Store, t: Viewport, options: TransitionOptions) -> oneshot::Receiver<bool> {
        // Dropping a running transition resolves it with `false`.
        self.transition = None;
        let target = store.constrain(t);
        self.begin_move(store);
        if options.duration <= 0.0 {
            self.apply(store, target);
            self.end_move(store);
            return resolved(true);
        }
        let (transition, done) = Transition::new(store.viewport(), target, store.container_size(), options);
        self.transition = Some(transition);
        done
    }

    pub fn zoom_to(&mut self, store: &mut Store, zoom: f64, options: TransitionOptions) -> oneshot::Receiver<bool> {
        let target = Self::zoom_about(store, store.viewport(), zoom, Self::pane_center(store));
        self.set_viewport(store, target, options)
    }

    pub fn scale_by(&mut self, store: &mut Store, factor: f64, options: TransitionOptions) -> oneshot::Receiver<bool> {
        let zoom = store.viewport().zoom * factor;
        self.zoom_to(store, zoom, options)
    }

    pub fn zoom_in(&mut self, store: &mut Store, options: TransitionOptions) -> oneshot::Receiver<bool> {
        self.scale_by(store, ZOOM_STEP, options)
    }

    pub fn zoom_out(&mut self, store: &mut Store, options: TransitionOptions) -> oneshot::Receiver<bool> {
        self.scale_by(store, 1.0 / ZOOM_STEP, options)
    }

    /// Centre the pane on flow point `(x, y)`, at `zoom` or the maximum zoom.
    pub fn set_center(
        &mut self,
        store: &mut Store,
        x: f64,
        y: f64,
        zoom: Option<f64>,
        options: TransitionOptions,
    ) -> oneshot::Receiver<bool> {
        let zoom = zoom.unwrap_or(store.config().max_zoom);
        let c = Self::pane_center(store);
        self.set_viewport(store, Viewport::new(c.x - x * zoom, c.y - y * zoom, zoom), options)
    }

    pub fn fit_bounds(
        &mut self,
        store: &mut Store,
        bounds: Rect,
        padding: Option<Padding>,
        options: TransitionOptions,
    ) -> oneshot::Receiver<bool> {
        let config = store.config();
        let padding = padding.unwrap_or(config.fit_view_padding);
        let size = store.container_size();
        let t = viewport_for_bounds(bounds, size.width, size.height, config.min_zoom, config.max_zoom, &padding);
        self.set_viewport(store, t, options)
    }

    /// Fit the measured nodes (or `options.nodes`) into the pane.
    /// Resolves `false` right away when there is nothing to fit.
    pub fn fit_view(&mut self, store: &mut Store, options: &FitViewOptions) -> oneshot::Receiver<bool> {
        let nodes = store.fit_view_nodes(options.nodes.as_deref(), options.include_hidden);
        if nodes.is_empty() {
            log::debug!("fit_view: no measured nodes to fit");
            return resolved(false);
        }
        let bounds = graph::nodes_bounds(nodes);
        let config = store.config();
        let padding = options.padding.unwrap_or(config.fit_view_padding);
        let size = store.container_size();
        let t = viewport_for_bounds(
            bounds,
            size.width,
            size.height,
            options.min_zoom.unwrap_or(config.min_zoom),
            options.max_zoom.unwrap_or(config.max_zoom),
            &padding,
        );
        self.set_viewport(store, t, options.transition)
    }

    pub fn screen_to_flow_position(&self, store: &Store, p: Point, snap: bool) -> Point {
        store.screen_to_flow(p, snap)
    }

    pub fn flow_to_screen_position(&self, store: &Store, p: Point) -> Point {
        store.flow_to_screen(p)
    }

    // ─── Frame tick ──────────────────────────────────────────────────────

    /// Advance the running transition and the scroll-end timer. Returns
    /// whether more ticks are needed.
    pub fn tick(&mut self, store: &mut Store, now_ms: f64) -> bool {
        self.now = now_ms;
        if let Some(transition) = self.transition.as_mut() {
            match transition.tick(now_ms) {
                TransitionStep::Running(t) => {
                    self.apply(store, t);
                }
                TransitionStep::Finished(t) => {
                    self.apply(store, t);
                    if let Some(done) = self.transition.take() {
                        done.finish();
                    }
                    if self.drag_from.is_none() && self.scroll_end_at.is_none() {
                        self.end_move(store);
                    }
                }
            }
        }
        if self.scroll_end_at.is_some_and(|at| now_ms >= at) {
            self.scroll_end_at = None;
            if self.transition.is_none() {
                self.end_move(store);
            }
        }
        self.is_active()
    }

    // ─── Gestures ────────────────────────────────────────────────────────

    /// Wheel or trackpad input at screen point `p`. Returns whether the
    /// event was consumed.
    #[allow(clippy::too_many_arguments)]
    pub fn wheel(
        &mut self,
        store: &mut Store,
        p: Point,
        dx: f64,
        dy: f64,
        mode: WheelDeltaMode,
        modifiers: Modifiers,
        now_ms: f64,
    ) -> bool {
        self.now = now_ms;
        if store.user_selection_active() {
            return false;
        }
        let config = store.config();
        let pinch = modifiers.ctrl && config.zoom_on_pinch;
        let t = store.viewport();

        let next = if config.pan_on_scroll && !pinch {
            let n = if mode == WheelDeltaMode::Line { 20.0 } else { 1.0 };
            let scroll_mode = config.pan_on_scroll_mode;
            let mut delta_x = if scroll_mode == PanOnScrollMode::Vertical { 0.0 } else { dx * n };
            let mut delta_y = if scroll_mode == PanOnScrollMode::Horizontal { 0.0 } else { dy * n };
            // Shift turns vertical scrolling sideways outside macOS.
            if config.platform != Platform::MacOs && modifiers.shift && scroll_mode != PanOnScrollMode::Vertical {
                delta_x = dy * n;
                delta_y = 0.0;
            }
            let speed = config.pan_on_scroll_speed;
            Viewport::new(t.x - delta_x * speed, t.y - delta_y * speed, t.zoom)
        } else if config.zoom_on_scroll || pinch {
            let exponent = wheel_delta(dy, mode, modifiers.ctrl, config.platform);
            Self::zoom_about(store, t, t.zoom * 2f64.powf(exponent), p)
        } else {
            return false;
        };

        self.transition = None;
        self.begin_move(store);
        self.apply(store, next);
        self.scroll_end_at = Some(now_ms + SCROLL_END_DELAY);
        true
    }

    /// Start a drag-pan when `button` may pan. Interrupts any transition.
    pub fn pointer_down(&mut self, store: &mut Store, p: Point, button: u8) -> bool {
        if store.user_selection_active() || !store.config().pans_with_button(button) {
            return false;
        }
        self.transition = None;
        self.drag_from = Some(p);
        true
    }

    pub fn pointer_move(&mut self, store: &mut Store, p: Point) -> bool {
        let Some(last) = self.drag_from else {
            return false;
        };
        let delta = p - last;
        self.drag_from = Some(p);
        if delta == Point::ZERO {
            return true;
        }
        self.begin_move(store);
        let t = store.viewport();
        self.apply(store, Viewport::new(t.x + delta.x, t.y + delta.y, t.zoom));
        true
    }

    pub fn pointer_up(&mut self, store: &mut Store) -> bool {
        if self.drag_from.take().is_none() {
            return false;
        }
        if self.transition.is_none() && self.scroll_end_at.is_none() {
            self.end_move(store);
        }
        true
    }

    /// Zoom in (out with Shift) by a factor of two about `p`.
    pub fn double_click(&mut self, store: &mut Store, p: Point, modifiers: Modifiers) -> Option<oneshot::Receiver<bool>> {
        let config = store.config();
        if !config.zoom_on_double_click || store.user_selection_active() {
            return None;
        }
        let duration = config.double_click_zoom_duration;
        let t = store.viewport();
        let k = t.zoom * if modifiers.shift { 0.5 } else { 2.0 };
        let target = Self::zoom_about(store, t, k, p);
        Some(self.set_viewport(store, target, TransitionOptions::with_duration(duration)))
    }

    /// Stop everything in flight.
    pub fn cancel(&mut self, store: &mut Store) {
        self.transition = None;
        self.drag_from = None;
        self.scroll_end_at = None;
        self.end_move(store);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transition::{Interpolation, linear};
    use flow_core::config::FlowConfig;
    use flow_core::model::Node;
    use futures::executor::block_on;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn store(config: FlowConfig) -> (Store, Rc<RefCell<Vec<FlowEvent>>>) {
        let mut store = Store::new(config);
        store.set_container_size(1200.0, 800.0);
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        store.subscribe(move |e| sink.borrow_mut().push(e.clone()));
        (store, events)
    }

    fn kinds(events: &[FlowEvent]) -> Vec<&'static str> {
        events
            .iter()
            .map(|e| match e {
                FlowEvent::MoveStart(_) => "start",
                FlowEvent::Move(_) => "move",
                FlowEvent::MoveEnd(_) => "end",
                _ => "other",
            })
            .collect()
    }

    #[test]
    fn wheel_zoom_keeps_pointer_anchor() {
        let (mut store, events) = store(FlowConfig::default());
        let mut pz = PanZoom::new();
        let p = Point::new(300.0, 200.0);
        let before = store.screen_to_flow(p, false);

        assert!(pz.wheel(&mut store, p, 0.0, -100.0, WheelDeltaMode::Pixel, Modifiers::NONE, 0.0));
        let t = store.viewport();
        assert!((t.zoom - 2f64.powf(0.2)).abs() < 1e-12);
        let after = store.screen_to_flow(p, false);
        assert!((after.x - before.x).abs() < 1e-9 && (after.y - before.y).abs() < 1e-9);

        assert!(pz.tick(&mut store, 100.0));
        assert!(!pz.tick(&mut store, 150.0));
        assert_eq!(kinds(&events.borrow()), vec!["start", "move", "end"]);
    }

    #[test]
    fn pan_on_scroll_respects_axis_mode() {
        let (mut store, _) = store(FlowConfig {
            pan_on_scroll: true,
            pan_on_scroll_mode: PanOnScrollMode::Vertical,
            ..Default::default()
        });
        let mut pz = PanZoom::new();
        pz.wheel(&mut store, Point::ZERO, 40.0, 30.0, WheelDeltaMode::Pixel, Modifiers::NONE, 0.0);
        assert_eq!(store.viewport(), Viewport::new(0.0, -15.0, 1.0));

        // Line mode scales deltas by 20.
        pz.wheel(&mut store, Point::ZERO, 0.0, 1.0, WheelDeltaMode::Line, Modifiers::NONE, 10.0);
        assert_eq!(store.viewport(), Viewport::new(0.0, -25.0, 1.0));
    }

    #[test]
    fn shift_scroll_pans_sideways() {
        let (mut store, _) = store(FlowConfig {
            pan_on_scroll: true,
            ..Default::default()
        });
        let mut pz = PanZoom::new();
        pz.wheel(&mut store, Point::ZERO, 0.0, 10.0, WheelDeltaMode::Pixel, Modifiers::shift(), 0.0);
        assert_eq!(store.viewport(), Viewport::new(-5.0, 0.0, 1.0));
    }

    #[test]
    fn pinch_zooms_even_with_pan_on_scroll() {
        let (mut store, _) = store(FlowConfig {
            pan_on_scroll: true,
            ..Default::default()
        });
        let mut pz = PanZoom::new();
        pz.wheel(&mut store, Point::ZERO, 0.0, -50.0, WheelDeltaMode::Pixel, Modifiers::ctrl(), 0.0);
        assert!(store.viewport().zoom > 1.0);
    }

    #[test]
    fn drag_pan_only_with_allowed_buttons() {
        let (mut store, events) = store(FlowConfig::default());
        let mut pz = PanZoom::new();
        assert!(!pz.pointer_down(&mut store, Point::ZERO, 2));
        assert!(pz.pointer_down(&mut store, Point::new(10.0, 10.0), 0));
        pz.pointer_move(&mut store, Point::new(30.0, 5.0));
        pz.pointer_move(&mut store, Point::new(40.0, 5.0));
        pz.pointer_up(&mut store);
        assert_eq!(store.viewport(), Viewport::new(30.0, -5.0, 1.0));
        assert_eq!(kinds(&events.borrow()), vec!["start", "move", "move", "end"]);

        store.set_user_selection_active(true);
        assert!(!pz.pointer_down(&mut store, Point::ZERO, 0));
    }

    #[test]
    fn fit_view_centres_nodes() {
        let (mut store, _) = store(FlowConfig::default());
        store.set_nodes(vec![Node::new("a", Point::ZERO).with_measured(100.0, 100.0)]);
        let mut pz = PanZoom::new();
        let done = pz.fit_view(&mut store, &FitViewOptions::default());
        assert_eq!(block_on(done), Ok(true));
        assert_eq!(store.viewport(), Viewport::new(500.0, 300.0, 2.0));
    }

    #[test]
    fn fit_view_without_nodes_resolves_false() {
        let (mut store, _) = store(FlowConfig::default());
        store.set_nodes(vec![Node::new("unmeasured", Point::ZERO)]);
        let mut pz = PanZoom::new();
        assert_eq!(block_on(pz.fit_view(&mut store, &FitViewOptions::default())), Ok(false));
        assert_eq!(store.viewport(), Viewport::IDENTITY);
    }

    #[test]
    fn zoom_in_scales_about_the_centre() {
        let (mut store, _) = store(FlowConfig::default());
        let mut pz = PanZoom::new();
        assert_eq!(block_on(pz.zoom_in(&mut store, TransitionOptions::default())), Ok(true));
        let t = store.viewport();
        assert!((t.zoom - 1.2).abs() < 1e-12);
        assert!((t.x - (600.0 - 600.0 * 1.2)).abs() < 1e-9);
        assert_eq!(block_on(pz.zoom_to(&mut store, 10.0, TransitionOptions::default())), Ok(true));
        assert_eq!(store.viewport().zoom, 2.0);
    }

    #[test]
    fn set_center_uses_max_zoom() {
        let (mut store, _) = store(FlowConfig::default());
        let mut pz = PanZoom::new();
        let done = pz.set_center(&mut store, 100.0, 50.0, None, TransitionOptions::default());
        assert_eq!(block_on(done), Ok(true));
        assert_eq!(store.viewport(), Viewport::new(400.0, 300.0, 2.0));
    }

    #[test]
    fn animated_move_resolves_on_completion() {
        let (mut store, events) = store(FlowConfig::default());
        let mut pz = PanZoom::new();
        let options = TransitionOptions {
            duration: 200.0,
            ease: linear,
            interpolate: Interpolation::Linear,
        };
        let mut done = pz.set_viewport(&mut store, Viewport::new(100.0, 0.0, 1.0), options);
        assert_eq!(done.try_recv(), Ok(None));
        assert!(pz.tick(&mut store, 0.0));
        assert!(pz.tick(&mut store, 100.0));
        assert_eq!(store.viewport(), Viewport::new(50.0, 0.0, 1.0));
        assert!(!pz.tick(&mut store, 200.0));
        assert_eq!(store.viewport(), Viewport::new(100.0, 0.0, 1.0));
        assert_eq!(block_on(done), Ok(true));
        assert_eq!(kinds(&events.borrow()), vec!["start", "move", "move", "end"]);
    }

    #[test]
    fn superseded_move_resolves_false() {
        let (mut store, _) = store(FlowConfig::default());
        let mut pz = PanZoom::new();
        let first = pz.set_viewport(&mut store, Viewport::new(100.0, 0.0, 1.0), TransitionOptions::with_duration(100.0));
        let second = pz.set_viewport(&mut store, Viewport::new(0.0, 100.0, 1.0), TransitionOptions::default());
        assert_eq!(block_on(first), Ok(false));
        assert_eq!(block_on(second), Ok(true));
        assert_eq!(store.viewport(), Viewport::new(0.0, 100.0, 1.0));
    }

    #[test]
    fn double_click_zooms_towards_pointer() {
        let (mut store, _) = store(FlowConfig::default());
        let mut pz = PanZoom::new();
        let done = pz.double_click(&mut store, Point::new(100.0, 100.0), Modifiers::NONE);
        assert!(done.is_some());
        pz.tick(&mut store, 0.0);
        pz.tick(&mut store, 250.0);
        assert_eq!(store.viewport(), Viewport::new(-100.0, -100.0, 2.0));
    }
}
