//! Node resize controller.
//!
//! A resize is driven from one of eight controls on the node's border.
//! Every pointer move recomputes the node rectangle from the gesture's
//! start values with [`dimensions_after_resize`], then commits position and
//! dimension changes (plus position corrections for children when the
//! top/left edge moves).

use flow_core::changes::{NodeChange, SetAttributes};
use flow_core::error::FlowError;
use flow_core::geometry::{CoordinateExtent, Dimensions, Point, Rect};
use flow_core::id::NodeId;
use flow_core::model::{InternalNode, NodeExtent, NodeOrigin};
use flow_core::store::{FlowEvent, ParentExpandChild, ResizeParams, Store, expand_parent_changes};

/// Where on the node border a resize control sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResizeControl {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
}

/// Which edges a control moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlDirection {
    pub is_horizontal: bool,
    pub is_vertical: bool,
    /// The left edge moves.
    pub affects_x: bool,
    /// The top edge moves.
    pub affects_y: bool,
}

impl ResizeControl {
    pub const ALL: [ResizeControl; 8] = [
        ResizeControl::TopLeft,
        ResizeControl::Top,
        ResizeControl::TopRight,
        ResizeControl::Right,
        ResizeControl::BottomRight,
        ResizeControl::Bottom,
        ResizeControl::BottomLeft,
        ResizeControl::Left,
    ];

    pub fn direction(self) -> ControlDirection {
        use ResizeControl::*;
        ControlDirection {
            is_horizontal: matches!(self, TopLeft | TopRight | Right | BottomRight | BottomLeft | Left),
            is_vertical: matches!(self, TopLeft | Top | TopRight | BottomRight | Bottom | BottomLeft),
            affects_x: matches!(self, TopLeft | BottomLeft | Left),
            affects_y: matches!(self, TopLeft | Top | TopRight),
        }
    }

    /// Control position as fractions of the node rectangle.
    pub fn anchor(self) -> [f64; 2] {
        use ResizeControl::*;
        match self {
            TopLeft => [0.0, 0.0],
            Top => [0.5, 0.0],
            TopRight => [1.0, 0.0],
            Right => [1.0, 0.5],
            BottomRight => [1.0, 1.0],
            Bottom => [0.5, 1.0],
            BottomLeft => [0.0, 1.0],
            Left => [0.0, 0.5],
        }
    }

    /// The control of `rect` under `p`. Corners win over edges; edges
    /// accept any point within `slop` of the border line.
    pub fn at_point(rect: Rect, p: Point, slop: f64) -> Option<ResizeControl> {
        let near = |a: f64, b: f64| (a - b).abs() <= slop;
        let within = |v: f64, lo: f64, hi: f64| v >= lo - slop && v <= hi + slop;
        if !within(p.x, rect.x, rect.x + rect.width) || !within(p.y, rect.y, rect.y + rect.height) {
            return None;
        }
        let left = near(p.x, rect.x);
        let right = near(p.x, rect.x + rect.width);
        let top = near(p.y, rect.y);
        let bottom = near(p.y, rect.y + rect.height);
        match (left, right, top, bottom) {
            (true, _, true, _) => Some(ResizeControl::TopLeft),
            (_, true, true, _) => Some(ResizeControl::TopRight),
            (true, _, _, true) => Some(ResizeControl::BottomLeft),
            (_, true, _, true) => Some(ResizeControl::BottomRight),
            (true, ..) => Some(ResizeControl::Left),
            (_, true, ..) => Some(ResizeControl::Right),
            (_, _, true, _) => Some(ResizeControl::Top),
            (_, _, _, true) => Some(ResizeControl::Bottom),
            _ => None,
        }
    }
}

/// Restricts a resize to one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeDirection {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeOptions {
    pub min_width: f64,
    pub min_height: f64,
    pub max_width: f64,
    pub max_height: f64,
    pub keep_aspect_ratio: bool,
    pub direction: Option<ResizeDirection>,
}

impl Default for ResizeOptions {
    fn default() -> Self {
        Self {
            min_width: 10.0,
            min_height: 10.0,
            max_width: f64::MAX,
            max_height: f64::MAX,
            keep_aspect_ratio: false,
            direction: None,
        }
    }
}

// ─── Geometry ────────────────────────────────────────────────────────────

/// Node rectangle and pointer at gesture start.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StartValues {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub pointer_x: f64,
    pub pointer_y: f64,
    pub aspect_ratio: f64,
}

fn lower_extent_clamp(lower_extent: f64, lower_bound: f64) -> f64 {
    0f64.max(lower_bound - lower_extent)
}

fn upper_extent_clamp(upper_extent: f64, upper_bound: f64) -> f64 {
    0f64.max(upper_extent - upper_bound)
}

fn size_clamp(size: f64, min: f64, max: f64) -> f64 {
    0f64.max(min - size).max(size - max)
}

/// The rectangle after dragging a control to `pointer` (flow space,
/// already snapped).
///
/// Each constraint yields how far the raw pointer delta overshoots it; the
/// largest overshoot per axis is taken back so every constraint holds at
/// once. `extent` is the box the node must stay in and `child_extent` the
/// footprint of children it must keep covering, both in the node's parent
/// coordinates.
#[allow(clippy::too_many_arguments)]
pub fn dimensions_after_resize(
    start: &StartValues,
    control: ControlDirection,
    pointer: Point,
    options: &ResizeOptions,
    origin: NodeOrigin,
    extent: Option<&CoordinateExtent>,
    child_extent: Option<&CoordinateExtent>,
) -> ResizeParams {
    let ControlDirection {
        is_horizontal,
        is_vertical,
        mut affects_x,
        mut affects_y,
    } = control;
    let is_diagonal = is_horizontal && is_vertical;
    let ar = start.aspect_ratio;
    let keep_ratio = options.keep_aspect_ratio;

    let mut dist_x = if is_horizontal { (pointer.x - start.pointer_x).floor() } else { 0.0 };
    let mut dist_y = if is_vertical { (pointer.y - start.pointer_y).floor() } else { 0.0 };

    let new_width = start.width + if affects_x { -dist_x } else { dist_x };
    let new_height = start.height + if affects_y { -dist_y } else { dist_y };

    let origin_offset_x = -origin[0] * start.width;
    let origin_offset_y = -origin[1] * start.height;

    let mut clamp_x = size_clamp(new_width, options.min_width, options.max_width);
    let mut clamp_y = size_clamp(new_height, options.min_height, options.max_height);

    if let Some(e) = extent {
        let x_clamp = if affects_x && dist_x < 0.0 {
            lower_extent_clamp(start.x + dist_x + origin_offset_x, e.min.x)
        } else if !affects_x && dist_x > 0.0 {
            upper_extent_clamp(start.x + new_width + origin_offset_x, e.max.x)
        } else {
            0.0
        };
        let y_clamp = if affects_y && dist_y < 0.0 {
            lower_extent_clamp(start.y + dist_y + origin_offset_y, e.min.y)
        } else if !affects_y && dist_y > 0.0 {
            upper_extent_clamp(start.y + new_height + origin_offset_y, e.max.y)
        } else {
            0.0
        };
        clamp_x = clamp_x.max(x_clamp);
        clamp_y = clamp_y.max(y_clamp);
    }

    if let Some(c) = child_extent {
        let x_clamp = if affects_x && dist_x > 0.0 {
            upper_extent_clamp(start.x + dist_x, c.min.x)
        } else if !affects_x && dist_x < 0.0 {
            lower_extent_clamp(start.x + new_width, c.max.x)
        } else {
            0.0
        };
        let y_clamp = if affects_y && dist_y > 0.0 {
            upper_extent_clamp(start.y + dist_y, c.min.y)
        } else if !affects_y && dist_y < 0.0 {
            lower_extent_clamp(start.y + new_height, c.max.y)
        } else {
            0.0
        };
        clamp_x = clamp_x.max(x_clamp);
        clamp_y = clamp_y.max(y_clamp);
    }

    if keep_ratio {
        // The other axis follows through the ratio, so its limits apply too.
        if is_horizontal {
            clamp_x = clamp_x.max(size_clamp(new_width / ar, options.min_height, options.max_height) * ar);

            let grows_down = (!affects_x && !affects_y) || (affects_x && !affects_y && is_diagonal);
            let moved_y = (if affects_x { dist_x } else { -dist_x }) / ar;
            if let Some(e) = extent {
                let c = if grows_down {
                    upper_extent_clamp(start.y + origin_offset_y + new_width / ar, e.max.y)
                } else {
                    lower_extent_clamp(start.y + origin_offset_y + moved_y, e.min.y)
                };
                clamp_x = clamp_x.max(c * ar);
            }
            if let Some(ce) = child_extent {
                let c = if grows_down {
                    lower_extent_clamp(start.y + new_width / ar, ce.max.y)
                } else {
                    upper_extent_clamp(start.y + moved_y, ce.min.y)
                };
                clamp_x = clamp_x.max(c * ar);
            }
        }

        if is_vertical {
            clamp_y = clamp_y.max(size_clamp(new_height * ar, options.min_width, options.max_width) / ar);

            let grows_right = (!affects_x && !affects_y) || (affects_y && !affects_x && is_diagonal);
            let moved_x = (if affects_y { dist_y } else { -dist_y }) * ar;
            if let Some(e) = extent {
                let c = if grows_right {
                    upper_extent_clamp(start.x + new_height * ar + origin_offset_x, e.max.x)
                } else {
                    lower_extent_clamp(start.x + moved_x + origin_offset_x, e.min.x)
                };
                clamp_y = clamp_y.max(c / ar);
            }
            if let Some(ce) = child_extent {
                let c = if grows_right {
                    lower_extent_clamp(start.x + new_height * ar, ce.max.x)
                } else {
                    upper_extent_clamp(start.x + moved_x, ce.min.x)
                };
                clamp_y = clamp_y.max(c / ar);
            }
        }
    }

    dist_y += if dist_y < 0.0 { clamp_y } else { -clamp_y };
    dist_x += if dist_x < 0.0 { clamp_x } else { -clamp_x };

    if keep_ratio {
        if is_diagonal {
            // The axis that grew proportionally more drives the other.
            let flip = affects_x != affects_y;
            if new_width > new_height * ar {
                dist_y = (if flip { -dist_x } else { dist_x }) / ar;
            } else {
                dist_x = (if flip { -dist_y } else { dist_y }) * ar;
            }
        } else if is_horizontal {
            dist_y = dist_x / ar;
            affects_y = affects_x;
        } else {
            dist_x = dist_y * ar;
            affects_x = affects_y;
        }
    }

    let x = if affects_x { start.x + dist_x } else { start.x };
    let y = if affects_y { start.y + dist_y } else { start.y };

    ResizeParams {
        width: start.width + if affects_x { -dist_x } else { dist_x },
        height: start.height + if affects_y { -dist_y } else { dist_y },
        x: origin[0] * dist_x * (if affects_x { -1.0 } else { 1.0 }) + x,
        y: origin[1] * dist_y * (if affects_y { -1.0 } else { 1.0 }) + y,
    }
}

/// Sign of the size change per axis, flipped for edges that move the
/// top/left corner.
pub fn resize_direction(next: &ResizeParams, prev: &ResizeParams, control: ControlDirection) -> [f64; 2] {
    let sign = |d: f64| {
        if d > 0.0 {
            1.0
        } else if d < 0.0 {
            -1.0
        } else {
            0.0
        }
    };
    let dw = next.width - prev.width;
    let dh = next.height - prev.height;
    let mut direction = [sign(dw), sign(dh)];
    if dw != 0.0 && control.affects_x {
        direction[0] *= -1.0;
    }
    if dh != 0.0 && control.affects_y {
        direction[1] *= -1.0;
    }
    direction
}

/// The box a child with `origin` occupies in its parent's parent
/// coordinates.
fn child_footprint(child: &InternalNode, parent: &InternalNode, origin: NodeOrigin) -> CoordinateExtent {
    let x = parent.node.position.x + child.node.position.x;
    let y = parent.node.position.y + child.node.position.y;
    let d = child.node.measured.unwrap_or_default();
    let ox = origin[0] * d.width;
    let oy = origin[1] * d.height;
    CoordinateExtent::new(x - ox, y - oy, x + d.width - ox, y + d.height - oy)
}

// ─── Controller ──────────────────────────────────────────────────────────

/// Veto hook: receives the next rectangle and direction, returns `false`
/// to skip the update.
pub type ShouldResize = Box<dyn FnMut(&ResizeParams, [f64; 2]) -> bool>;

#[derive(Debug, Clone)]
struct Session {
    node: NodeId,
    control: ControlDirection,
    start: StartValues,
    prev: ResizeParams,
    origin: NodeOrigin,
    expand_parent: Option<NodeId>,
    extent: Option<CoordinateExtent>,
    child_extent: Option<CoordinateExtent>,
    /// Children with their current relative positions.
    children: Vec<(NodeId, Point)>,
}

#[derive(Default)]
pub struct ResizeController {
    pub options: ResizeOptions,
    should_resize: Option<ShouldResize>,
    session: Option<Session>,
}

impl std::fmt::Debug for ResizeController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResizeController")
            .field("options", &self.options)
            .field("session", &self.session)
            .finish()
    }
}

impl ResizeController {
    pub fn new(options: ResizeOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn set_should_resize(&mut self, f: impl FnMut(&ResizeParams, [f64; 2]) -> bool + 'static) {
        self.should_resize = Some(Box::new(f));
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn node(&self) -> Option<NodeId> {
        self.session.as_ref().map(|s| s.node)
    }

    /// Grab `control` of `node` at screen point `p`.
    pub fn pointer_down(&mut self, store: &mut Store, node: NodeId, control: ResizeControl, p: Point) -> bool {
        let Some(internal) = store.internal_node(node) else {
            store.report(FlowError::UnknownNode { node });
            return false;
        };
        let measured = internal.node.measured.unwrap_or_default();
        if !measured.is_measured() {
            log::debug!("node {node} has no size yet, not resizing");
            return false;
        }
        let config = store.config();
        let pointer = store.screen_to_flow(p, true);
        let prev = ResizeParams {
            x: internal.node.position.x,
            y: internal.node.position.y,
            width: measured.width,
            height: measured.height,
        };
        let start = StartValues {
            x: prev.x,
            y: prev.y,
            width: prev.width,
            height: prev.height,
            pointer_x: pointer.x,
            pointer_y: pointer.y,
            aspect_ratio: prev.width / prev.height,
        };
        let origin = internal.node.origin.unwrap_or(config.node_origin);
        let lookup = store.node_lookup();

        let parent = internal.node.parent_id.and_then(|id| lookup.get(&id));
        let extent = match (&internal.node.extent, parent) {
            (Some(NodeExtent::Parent), Some(p)) => {
                let d = p.node.measured.unwrap_or_default();
                Some(CoordinateExtent::new(0.0, 0.0, d.width, d.height))
            }
            (Some(NodeExtent::Parent), None) => None,
            (Some(NodeExtent::Coordinates(e)), _) => Some(*e),
            (None, None) => Some(config.node_extent),
            (None, Some(_)) => None,
        };
        let expand_parent = internal
            .node
            .parent_id
            .filter(|_| internal.node.expand_parent && parent.is_some());

        let mut children = Vec::new();
        let mut child_extent: Option<CoordinateExtent> = None;
        for child_id in store.children(node) {
            let Some(child) = lookup.get(&child_id) else {
                continue;
            };
            children.push((child_id, child.node.position));
            if matches!(child.node.extent, Some(NodeExtent::Parent)) || child.node.expand_parent {
                let e = child_footprint(child, internal, child.node.origin.unwrap_or(config.node_origin));
                child_extent = Some(match child_extent {
                    Some(c) => CoordinateExtent::new(
                        e.min.x.min(c.min.x),
                        e.min.y.min(c.min.y),
                        e.max.x.max(c.max.x),
                        e.max.y.max(c.max.y),
                    ),
                    None => e,
                });
            }
        }

        self.session = Some(Session {
            node,
            control: ResizeControl::direction(control),
            start,
            prev,
            origin,
            expand_parent,
            extent,
            child_extent,
            children,
        });
        store.emit(FlowEvent::ResizeStart { node, params: prev });
        true
    }

    pub fn pointer_move(&mut self, store: &mut Store, p: Point) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if store.internal_node(session.node).is_none() {
            log::warn!("resized node {} was removed", session.node);
            let (node, params) = (session.node, session.prev);
            self.session = None;
            store.emit(FlowEvent::ResizeEnd { node, params });
            return;
        }
        let pointer = store.screen_to_flow(p, true);
        let prev = session.prev;
        let next = dimensions_after_resize(
            &session.start,
            session.control,
            pointer,
            &self.options,
            session.origin,
            session.extent.as_ref(),
            session.child_extent.as_ref(),
        );

        let width_changed = next.width != prev.width;
        let height_changed = next.height != prev.height;
        let x_changed = next.x != prev.x && width_changed;
        let y_changed = next.y != prev.y && height_changed;
        if !x_changed && !y_changed && !width_changed && !height_changed {
            return;
        }

        let origin = session.origin;
        let mut position = None;
        let mut size = None;
        let mut child_changes = Vec::new();

        if x_changed || y_changed || origin[0] == 1.0 || origin[1] == 1.0 {
            let x = if x_changed { next.x } else { session.prev.x };
            let y = if y_changed { next.y } else { session.prev.y };
            session.prev.x = x;
            session.prev.y = y;
            position = Some(Point::new(x, y));

            // Children keep their absolute position when the top/left edge moves.
            let dx = next.x - prev.x;
            let dy = next.y - prev.y;
            for (id, child) in session.children.iter_mut() {
                child.x = child.x - dx + origin[0] * (next.width - prev.width);
                child.y = child.y - dy + origin[1] * (next.height - prev.height);
                child_changes.push(NodeChange::Position {
                    id: *id,
                    position: Some(*child),
                    dragging: None,
                });
            }
        }

        if width_changed || height_changed {
            let direction = self.options.direction;
            let width = if width_changed && direction != Some(ResizeDirection::Vertical) {
                next.width
            } else {
                session.prev.width
            };
            let height = if height_changed && direction != Some(ResizeDirection::Horizontal) {
                next.height
            } else {
                session.prev.height
            };
            session.prev.width = width;
            session.prev.height = height;
            size = Some(Dimensions::new(width, height));
        }

        if session.expand_parent.is_some() {
            let x_limit = origin[0] * size.map_or(0.0, |s| s.width);
            if let Some(p) = position.filter(|p| p.x != 0.0 && p.x < x_limit) {
                session.prev.x = x_limit;
                session.start.x -= p.x - x_limit;
            }
            let y_limit = origin[1] * size.map_or(0.0, |s| s.height);
            if let Some(p) = position.filter(|p| p.y != 0.0 && p.y < y_limit) {
                session.prev.y = y_limit;
                session.start.y -= p.y - y_limit;
            }
        }

        let direction = resize_direction(&session.prev, &prev, session.control);
        let params = session.prev;
        let node = session.node;
        let expand_parent = session.expand_parent;
        if let Some(veto) = self.should_resize.as_mut()
            && !veto(&params, direction)
        {
            return;
        }
        store.emit(FlowEvent::Resize { node, params, direction });

        let changes = Self::changes(store, node, expand_parent, position, size, self.options.direction, child_changes);
        store.trigger_node_changes(changes);
    }

    /// Change records for one resize step.
    fn changes(
        store: &Store,
        node: NodeId,
        expand_parent: Option<NodeId>,
        mut position: Option<Point>,
        size: Option<Dimensions>,
        direction: Option<ResizeDirection>,
        child_changes: Vec<NodeChange>,
    ) -> Vec<NodeChange> {
        let mut changes = Vec::new();
        let lookup = store.node_lookup();

        if let (Some(parent_id), Some(internal)) = (expand_parent, lookup.get(&node)) {
            let origin = internal.node.origin.unwrap_or(store.config().node_origin);
            let measured = internal.node.measured.unwrap_or_default();
            let dims = size.unwrap_or(measured);
            let relative = position.unwrap_or(internal.node.position);
            let parent_abs = lookup
                .get(&parent_id)
                .map(|p| p.internals.position_absolute)
                .unwrap_or_default();
            let abs = Point::new(
                parent_abs.x + relative.x - origin[0] * dims.width,
                parent_abs.y + relative.y - origin[1] * dims.height,
            );
            let child = ParentExpandChild {
                id: node,
                parent_id,
                rect: Rect::from_position(abs, dims),
            };
            changes.extend(expand_parent_changes(
                &[child],
                lookup,
                store.parent_lookup(),
                store.config().node_origin,
            ));
            position = position.map(|p| {
                Point::new(
                    (origin[0] * dims.width).max(p.x),
                    (origin[1] * dims.height).max(p.y),
                )
            });
        }

        if let Some(p) = position {
            changes.push(NodeChange::Position {
                id: node,
                position: Some(p),
                dragging: None,
            });
        }
        if let Some(d) = size {
            let set_attributes = match direction {
                None => SetAttributes::All,
                Some(ResizeDirection::Horizontal) => SetAttributes::Width,
                Some(ResizeDirection::Vertical) => SetAttributes::Height,
            };
            changes.push(NodeChange::Dimensions {
                id: node,
                dimensions: Some(d),
                resizing: Some(true),
                set_attributes: Some(set_attributes),
            });
        }
        changes.extend(child_changes);
        changes
    }

    /// Release: settle `resizing` and report the final rectangle.
    pub fn pointer_up(&mut self, store: &mut Store) {
        let Some(session) = self.session.take() else {
            return;
        };
        let params = session.prev;
        if store.internal_node(session.node).is_none() {
            store.emit(FlowEvent::ResizeEnd {
                node: session.node,
                params,
            });
            return;
        }
        store.trigger_node_changes(vec![NodeChange::Dimensions {
            id: session.node,
            dimensions: Some(Dimensions::new(params.width, params.height)),
            resizing: Some(false),
            set_attributes: None,
        }]);
        store.emit(FlowEvent::ResizeEnd {
            node: session.node,
            params,
        });
    }
}
