//! Geometry primitives.
//!
//! Stateless rectangle/point math shared by the store and every
//! controller: extent clamping, bounding-box union, overlap area,
//! padding parsing, and conversion between screen (renderer) space and
//! flow space through a viewport transform.

use crate::error::FlowError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ─── Basic shapes ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl std::ops::Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

impl Dimensions {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Both sides are finite and non-zero.
    pub fn is_measured(&self) -> bool {
        is_numeric(self.width) && is_numeric(self.height) && self.width != 0.0 && self.height != 0.0
    }
}

/// Axis-aligned rectangle given by origin and size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_position(position: Point, dims: Dimensions) -> Self {
        Self::new(position.x, position.y, dims.width, dims.height)
    }

    /// Normalised rectangle spanned by two corners, in any order.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self::new(
            a.x.min(b.x),
            a.y.min(b.y),
            (b.x - a.x).abs(),
            (b.y - a.y).abs(),
        )
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }
}

/// Axis-aligned box given by its two corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Bounds {
    /// Neutral element for [`bounds_of_boxes`].
    pub const EMPTY: Bounds = Bounds {
        x: f64::INFINITY,
        y: f64::INFINITY,
        x2: f64::NEG_INFINITY,
        y2: f64::NEG_INFINITY,
    };
}

/// Pan/zoom transform: screen = flow * zoom + (x, y).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Viewport {
    pub const IDENTITY: Viewport = Viewport {
        x: 0.0,
        y: 0.0,
        zoom: 1.0,
    };

    pub fn new(x: f64, y: f64, zoom: f64) -> Self {
        Self { x, y, zoom }
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.x, self.y, self.zoom]
    }
}

/// `[[xmin, ymin], [xmax, ymax]]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[[f64; 2]; 2]", into = "[[f64; 2]; 2]")]
pub struct CoordinateExtent {
    pub min: Point,
    pub max: Point,
}

impl CoordinateExtent {
    pub const INFINITE: CoordinateExtent = CoordinateExtent {
        min: Point {
            x: f64::NEG_INFINITY,
            y: f64::NEG_INFINITY,
        },
        max: Point {
            x: f64::INFINITY,
            y: f64::INFINITY,
        },
    };

    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min: Point::new(min_x, min_y),
            max: Point::new(max_x, max_y),
        }
    }

    pub fn from_rect(rect: Rect) -> Self {
        Self::new(rect.x, rect.y, rect.x + rect.width, rect.y + rect.height)
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.min.x + dx, self.min.y + dy, self.max.x + dx, self.max.y + dy)
    }
}

impl Default for CoordinateExtent {
    fn default() -> Self {
        Self::INFINITE
    }
}

impl From<[[f64; 2]; 2]> for CoordinateExtent {
    fn from(v: [[f64; 2]; 2]) -> Self {
        Self::new(v[0][0], v[0][1], v[1][0], v[1][1])
    }
}

impl From<CoordinateExtent> for [[f64; 2]; 2] {
    fn from(e: CoordinateExtent) -> Self {
        [[e.min.x, e.min.y], [e.max.x, e.max.y]]
    }
}

// ─── Scalar helpers ──────────────────────────────────────────────────────

/// Finite number check.
pub fn is_numeric(v: f64) -> bool {
    v.is_finite()
}

/// `min(max(val, min), max)`. Unlike `f64::clamp` this tolerates
/// `min > max` by returning `max`.
pub fn clamp(val: f64, min: f64, max: f64) -> f64 {
    val.max(min).min(max)
}

/// Round half towards positive infinity.
pub fn round_half_up(v: f64) -> f64 {
    (v + 0.5).floor()
}

// ─── Clamping ────────────────────────────────────────────────────────────

/// Nearest point inside `[extent.min, extent.max - dims]`.
pub fn clamp_position(position: Point, extent: &CoordinateExtent, dims: Dimensions) -> Point {
    Point::new(
        clamp(position.x, extent.min.x, extent.max.x - dims.width),
        clamp(position.y, extent.min.y, extent.max.y - dims.height),
    )
}

/// Clamp a child's absolute position into its parent's absolute rectangle.
pub fn clamp_position_to_parent(child: Point, child_dims: Dimensions, parent: Rect) -> Point {
    clamp_position(child, &CoordinateExtent::from_rect(parent), child_dims)
}

/// Top-left position of a node whose `position` refers to `origin`
/// (fractions of its size).
pub fn node_position_with_origin(position: Point, dims: Dimensions, origin: [f64; 2]) -> Point {
    Point::new(
        position.x - dims.width * origin[0],
        position.y - dims.height * origin[1],
    )
}

pub fn snap_position(position: Point, grid: [f64; 2]) -> Point {
    Point::new(
        grid[0] * round_half_up(position.x / grid[0]),
        grid[1] * round_half_up(position.y / grid[1]),
    )
}

// ─── Boxes ───────────────────────────────────────────────────────────────

pub fn rect_to_bounds(r: Rect) -> Bounds {
    Bounds {
        x: r.x,
        y: r.y,
        x2: r.x + r.width,
        y2: r.y + r.height,
    }
}

pub fn bounds_to_rect(b: Bounds) -> Rect {
    Rect::new(b.x, b.y, b.x2 - b.x, b.y2 - b.y)
}

pub fn bounds_of_boxes(a: Bounds, b: Bounds) -> Bounds {
    Bounds {
        x: a.x.min(b.x),
        y: a.y.min(b.y),
        x2: a.x2.max(b.x2),
        y2: a.y2.max(b.y2),
    }
}

pub fn bounds_of_rects(a: Rect, b: Rect) -> Rect {
    bounds_to_rect(bounds_of_boxes(rect_to_bounds(a), rect_to_bounds(b)))
}

/// Overlap area of two rectangles, rounded up. Zero when disjoint.
pub fn overlapping_area(a: Rect, b: Rect) -> f64 {
    let x_overlap = 0f64.max((a.x + a.width).min(b.x + b.width) - a.x.max(b.x));
    let y_overlap = 0f64.max((a.y + a.height).min(b.y + b.height) - a.y.max(b.y));
    (x_overlap * y_overlap).ceil()
}

// ─── Transforms ──────────────────────────────────────────────────────────

/// Screen point → flow point, optionally snapped to the grid.
pub fn point_to_renderer_point(p: Point, t: Viewport, snap_grid: Option<[f64; 2]>) -> Point {
    let flow = Point::new((p.x - t.x) / t.zoom, (p.y - t.y) / t.zoom);
    match snap_grid {
        Some(grid) => snap_position(flow, grid),
        None => flow,
    }
}

/// Flow point → screen point.
pub fn renderer_point_to_point(p: Point, t: Viewport) -> Point {
    Point::new(p.x * t.zoom + t.x, p.y * t.zoom + t.y)
}

/// Visible flow-space rectangle of a `width × height` pane.
pub fn viewport_rect(t: Viewport, width: f64, height: f64) -> Rect {
    Rect::new(-t.x / t.zoom, -t.y / t.zoom, width / t.zoom, height / t.zoom)
}

/// Clamp zoom into `[min_zoom, max_zoom]`, then constrain the translation
/// so that the pane `[[0,0],[width,height]]` stays inside
/// `translate_extent`. Content smaller than the pane is centred.
pub fn constrain_viewport(
    t: Viewport,
    width: f64,
    height: f64,
    min_zoom: f64,
    max_zoom: f64,
    translate_extent: &CoordinateExtent,
) -> Viewport {
    let zoom = clamp(t.zoom, min_zoom, max_zoom);
    let invert_x = |v: f64| (v - t.x) / zoom;
    let invert_y = |v: f64| (v - t.y) / zoom;

    let dx0 = invert_x(0.0) - translate_extent.min.x;
    let dx1 = invert_x(width) - translate_extent.max.x;
    let dy0 = invert_y(0.0) - translate_extent.min.y;
    let dy1 = invert_y(height) - translate_extent.max.y;

    let shift = |d0: f64, d1: f64| -> f64 {
        if d1 > d0 {
            (d0 + d1) / 2.0
        } else {
            let lower = 0f64.min(d0);
            if lower != 0.0 { lower } else { 0f64.max(d1) }
        }
    };

    let sx = shift(dx0, dx1);
    let sy = shift(dy0, dy1);

    Viewport::new(t.x + zoom * sx, t.y + zoom * sy, zoom)
}

// ─── Padding ─────────────────────────────────────────────────────────────

/// A single padding value. Plain numbers are a fraction of the pane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PaddingValue {
    Ratio(f64),
    Pixels(f64),
    Percent(f64),
}

impl Default for PaddingValue {
    fn default() -> Self {
        PaddingValue::Ratio(0.0)
    }
}

impl FromStr for PaddingValue {
    type Err = FlowError;

    /// Accepts `"0.1"`, `"10px"` and `"5%"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || FlowError::InvalidPadding {
            value: s.to_string(),
        };
        let trimmed = s.trim();
        let (number, ctor): (&str, fn(f64) -> PaddingValue) =
            if let Some(n) = trimmed.strip_suffix("px") {
                (n, PaddingValue::Pixels)
            } else if let Some(n) = trimmed.strip_suffix('%') {
                (n, PaddingValue::Percent)
            } else {
                (trimmed, PaddingValue::Ratio)
            };
        let value: f64 = number.trim().parse().map_err(|_| invalid())?;
        if !value.is_finite() {
            return Err(invalid());
        }
        Ok(ctor(value))
    }
}

impl From<f64> for PaddingValue {
    fn from(v: f64) -> Self {
        PaddingValue::Ratio(v)
    }
}

/// Per-side padding with axis fallbacks: `top` falls back to `y`, `left`
/// to `x` and so on.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SidePadding {
    pub top: Option<PaddingValue>,
    pub right: Option<PaddingValue>,
    pub bottom: Option<PaddingValue>,
    pub left: Option<PaddingValue>,
    pub x: Option<PaddingValue>,
    pub y: Option<PaddingValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Padding {
    Uniform(PaddingValue),
    Sides(SidePadding),
}

impl Default for Padding {
    fn default() -> Self {
        Padding::Uniform(PaddingValue::Ratio(0.1))
    }
}

impl From<f64> for Padding {
    fn from(v: f64) -> Self {
        Padding::Uniform(PaddingValue::Ratio(v))
    }
}

impl From<PaddingValue> for Padding {
    fn from(v: PaddingValue) -> Self {
        Padding::Uniform(v)
    }
}

/// Pixel paddings; `x`/`y` are the totals of both sides of that axis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResolvedPadding {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
    pub x: f64,
    pub y: f64,
}

/// Resolve one padding value against a pane extent, in pixels.
pub fn parse_padding(padding: PaddingValue, extent: f64) -> f64 {
    match padding {
        PaddingValue::Ratio(p) => ((extent - extent / (1.0 + p)) * 0.5).floor(),
        PaddingValue::Pixels(px) => px.floor(),
        PaddingValue::Percent(pct) => (extent * pct * 0.01).floor(),
    }
}

pub fn parse_paddings(padding: &Padding, width: f64, height: f64) -> ResolvedPadding {
    let (top, right, bottom, left) = match padding {
        Padding::Uniform(v) => {
            let py = parse_padding(*v, height);
            let px = parse_padding(*v, width);
            (py, px, py, px)
        }
        Padding::Sides(s) => {
            let zero = PaddingValue::Ratio(0.0);
            (
                parse_padding(s.top.or(s.y).unwrap_or(zero), height),
                parse_padding(s.right.or(s.x).unwrap_or(zero), width),
                parse_padding(s.bottom.or(s.y).unwrap_or(zero), height),
                parse_padding(s.left.or(s.x).unwrap_or(zero), width),
            )
        }
    };
    ResolvedPadding {
        top,
        right,
        bottom,
        left,
        x: left + right,
        y: top + bottom,
    }
}

/// Padding actually left around `bounds` on screen under `t`.
fn applied_paddings(bounds: Rect, t: Viewport, width: f64, height: f64) -> ResolvedPadding {
    let top_left = renderer_point_to_point(bounds.position(), t);
    let bottom_right = renderer_point_to_point(
        Point::new(bounds.x + bounds.width, bounds.y + bounds.height),
        t,
    );
    let left = top_left.x.floor();
    let top = top_left.y.floor();
    let right = (width - bottom_right.x).floor();
    let bottom = (height - bottom_right.y).floor();
    ResolvedPadding {
        top,
        right,
        bottom,
        left,
        x: left + right,
        y: top + bottom,
    }
}

/// Viewport that fits `bounds` into a `width × height` pane.
///
/// Zoom is the smaller of the two per-axis fits, clamped to the zoom
/// range. The bounds are centred and any side whose applied padding falls
/// short of the requested one is shifted back in. Invalid or empty bounds
/// give the identity viewport.
pub fn viewport_for_bounds(
    bounds: Rect,
    width: f64,
    height: f64,
    min_zoom: f64,
    max_zoom: f64,
    padding: &Padding,
) -> Viewport {
    let valid = [bounds.x, bounds.y, bounds.width, bounds.height, width, height]
        .iter()
        .all(|v| is_numeric(*v));
    if !valid || bounds.width <= 0.0 || bounds.height <= 0.0 {
        return Viewport::IDENTITY;
    }

    let p = parse_paddings(padding, width, height);
    let x_zoom = (width - p.x) / bounds.width;
    let y_zoom = (height - p.y) / bounds.height;
    let zoom = clamp(x_zoom.min(y_zoom), min_zoom, max_zoom);

    let center = bounds.center();
    let x = width / 2.0 - center.x * zoom;
    let y = height / 2.0 - center.y * zoom;

    let applied = applied_paddings(bounds, Viewport::new(x, y, zoom), width, height);
    let off_left = (applied.left - p.left).min(0.0);
    let off_top = (applied.top - p.top).min(0.0);
    let off_right = (applied.right - p.right).min(0.0);
    let off_bottom = (applied.bottom - p.bottom).min(0.0);

    Viewport::new(
        x - off_left + off_right,
        y - off_top + off_bottom,
        zoom,
    )
}

// ─── Auto-pan ────────────────────────────────────────────────────────────

fn auto_pan_velocity(value: f64, min: f64, max: f64) -> f64 {
    if value < min {
        clamp((value - min).abs(), 1.0, min) / min
    } else if value > max {
        -clamp((value - max).abs(), 1.0, min) / min
    } else {
        0.0
    }
}

/// Pan velocity for a pointer at `pos` (pane-relative) inside a pane of
/// `size`. Non-zero only inside the `margin` band along the edges.
pub fn calc_auto_pan(pos: Point, size: Dimensions, speed: f64, margin: f64) -> Point {
    Point::new(
        auto_pan_velocity(pos.x, margin, size.width - margin) * speed,
        auto_pan_velocity(pos.y, margin, size.height - margin) * speed,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn clamp_keeps_whole_node_inside() {
        let extent = CoordinateExtent::new(0.0, 0.0, 200.0, 200.0);
        let dims = Dimensions::new(100.0, 50.0);
        let p = clamp_position(Point::new(250.0, 250.0), &extent, dims);
        assert_eq!(p, Point::new(100.0, 150.0));
    }

    #[test]
    fn clamp_is_idempotent_and_bounded() {
        let extent = CoordinateExtent::new(-50.0, 10.0, 300.0, 120.0);
        let dims = Dimensions::new(40.0, 30.0);
        for i in -20..20 {
            for j in -20..20 {
                let p = Point::new(i as f64 * 23.5, j as f64 * 11.25);
                let once = clamp_position(p, &extent, dims);
                assert!(once.x >= -50.0 && once.x <= 260.0);
                assert!(once.y >= 10.0 && once.y <= 90.0);
                assert_eq!(clamp_position(once, &extent, dims), once);
            }
        }
    }

    #[test]
    fn clamp_tolerates_oversized_node() {
        assert_eq!(clamp(5.0, 10.0, 0.0), 0.0);
    }

    #[test]
    fn overlap_is_ceiled_and_zero_when_disjoint() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(overlapping_area(a, Rect::new(5.0, 5.0, 10.0, 10.0)), 25.0);
        assert_eq!(overlapping_area(a, Rect::new(9.5, 9.5, 10.0, 10.0)), 1.0);
        assert_eq!(overlapping_area(a, Rect::new(20.0, 0.0, 5.0, 5.0)), 0.0);
    }

    #[test]
    fn union_of_rects() {
        let r = bounds_of_rects(Rect::new(0.0, 0.0, 10.0, 10.0), Rect::new(-5.0, 5.0, 10.0, 20.0));
        assert_eq!(r, Rect::new(-5.0, 0.0, 15.0, 25.0));
    }

    #[test]
    fn fit_bounds_scenario() {
        let vp = viewport_for_bounds(
            Rect::new(0.0, 0.0, 100.0, 100.0),
            1200.0,
            800.0,
            0.5,
            2.0,
            &Padding::from(0.1),
        );
        assert_eq!(vp, Viewport::new(500.0, 300.0, 2.0));
    }

    #[test]
    fn fit_bounds_zoom_always_in_range() {
        for w in [1.0, 10.0, 100.0, 1000.0, 10_000.0] {
            for h in [1.0, 50.0, 5000.0] {
                let vp = viewport_for_bounds(
                    Rect::new(-30.0, 40.0, w, h),
                    800.0,
                    600.0,
                    0.5,
                    2.0,
                    &Padding::from(0.2),
                );
                assert!(vp.zoom >= 0.5 && vp.zoom <= 2.0, "zoom {}", vp.zoom);
            }
        }
    }

    #[test]
    fn fit_bounds_invalid_is_identity() {
        let pad = Padding::default();
        assert_eq!(
            viewport_for_bounds(Rect::new(0.0, 0.0, 0.0, 10.0), 800.0, 600.0, 0.5, 2.0, &pad),
            Viewport::IDENTITY
        );
        assert_eq!(
            viewport_for_bounds(Rect::new(f64::NAN, 0.0, 5.0, 10.0), 800.0, 600.0, 0.5, 2.0, &pad),
            Viewport::IDENTITY
        );
    }

    #[test]
    fn asymmetric_padding_is_honoured() {
        let pad = Padding::Sides(SidePadding {
            left: Some(PaddingValue::Pixels(200.0)),
            ..Default::default()
        });
        let bounds = Rect::new(0.0, 0.0, 400.0, 100.0);
        let vp = viewport_for_bounds(bounds, 800.0, 600.0, 0.1, 1.0, &pad);
        let screen = renderer_point_to_point(bounds.position(), vp);
        assert!(screen.x >= 200.0);
    }

    #[test]
    fn renderer_point_roundtrip() {
        let transforms = [
            Viewport::new(0.0, 0.0, 1.0),
            Viewport::new(120.0, -40.0, 0.5),
            Viewport::new(-3.0, 7.5, 2.0),
        ];
        for t in transforms {
            let p = Point::new(33.0, -12.5);
            let back = renderer_point_to_point(point_to_renderer_point(p, t, None), t);
            assert!((back.x - p.x).abs() < 1e-9 && (back.y - p.y).abs() < 1e-9);
        }
    }

    #[test]
    fn snapping_rounds_half_up() {
        assert_eq!(snap_position(Point::new(7.5, -7.5), [15.0, 15.0]), Point::new(15.0, -0.0));
        assert_eq!(snap_position(Point::new(22.0, 8.0), [15.0, 15.0]), Point::new(15.0, 15.0));
    }

    #[test]
    fn padding_strings() {
        assert_eq!("10px".parse::<PaddingValue>(), Ok(PaddingValue::Pixels(10.0)));
        assert_eq!("5%".parse::<PaddingValue>(), Ok(PaddingValue::Percent(5.0)));
        assert_eq!("0.1".parse::<PaddingValue>(), Ok(PaddingValue::Ratio(0.1)));
        let err = "tenpx".parse::<PaddingValue>().unwrap_err();
        assert_eq!(err.code(), "016");

        assert_eq!(parse_padding(PaddingValue::Percent(5.0), 800.0), 40.0);
        assert_eq!(parse_padding(PaddingValue::Ratio(0.1), 1200.0), 54.0);
    }

    #[test]
    fn side_padding_falls_back_to_axis() {
        let pad = Padding::Sides(SidePadding {
            x: Some(PaddingValue::Pixels(10.0)),
            top: Some(PaddingValue::Pixels(4.0)),
            ..Default::default()
        });
        let p = parse_paddings(&pad, 100.0, 100.0);
        assert_eq!((p.top, p.right, p.bottom, p.left), (4.0, 10.0, 0.0, 10.0));
        assert_eq!((p.x, p.y), (20.0, 4.0));
    }

    #[test]
    fn auto_pan_inside_margin_band() {
        let size = Dimensions::new(500.0, 400.0);
        assert_eq!(calc_auto_pan(Point::new(250.0, 200.0), size, 15.0, 40.0), Point::ZERO);
        let v = calc_auto_pan(Point::new(0.0, 390.0), size, 15.0, 40.0);
        assert_eq!(v.x, 15.0);
        assert!(v.y < 0.0);
    }

    #[test]
    fn constrain_clamps_zoom_and_ignores_infinite_extent() {
        let t = constrain_viewport(
            Viewport::new(50.0, 60.0, 5.0),
            800.0,
            600.0,
            0.5,
            2.0,
            &CoordinateExtent::INFINITE,
        );
        assert_eq!(t, Viewport::new(50.0, 60.0, 2.0));
    }

    #[test]
    fn constrain_keeps_pane_inside_translate_extent() {
        let extent = CoordinateExtent::new(0.0, 0.0, 1000.0, 1000.0);
        let t = constrain_viewport(Viewport::new(100.0, 0.0, 1.0), 500.0, 500.0, 0.5, 2.0, &extent);
        assert_eq!(t, Viewport::new(0.0, 0.0, 1.0));
        let t = constrain_viewport(Viewport::new(-900.0, 0.0, 1.0), 500.0, 500.0, 0.5, 2.0, &extent);
        assert_eq!(t, Viewport::new(-500.0, 0.0, 1.0));
    }

    #[test]
    fn extent_serialises_as_nested_arrays() {
        let e = CoordinateExtent::new(0.0, 1.0, 2.0, 3.0);
        let json = serde_json::to_string(&e).unwrap();
        assert_eq!(json, "[[0.0,1.0],[2.0,3.0]]");
    }
}
