//! Edge path generators.
//!
//! Pure functions from endpoint coordinates and handle sides to SVG
//! path-data strings plus a label anchor. Nothing here touches the store.

use crate::geometry::Point;
use crate::model::Side;
use std::fmt::{self, Write};

/// Output of every generator: path data, label anchor and the label's
/// offset from the source point.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgePath {
    pub path: String,
    pub label_x: f64,
    pub label_y: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

/// Endpoints of an edge in flow space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Endpoints {
    pub source_x: f64,
    pub source_y: f64,
    pub source_position: Side,
    pub target_x: f64,
    pub target_y: f64,
    pub target_position: Side,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            source_x: 0.0,
            source_y: 0.0,
            source_position: Side::Bottom,
            target_x: 0.0,
            target_y: 0.0,
            target_position: Side::Top,
        }
    }
}

impl Endpoints {
    pub fn new(source: Point, source_position: Side, target: Point, target_position: Side) -> Self {
        Self {
            source_x: source.x,
            source_y: source.y,
            source_position,
            target_x: target.x,
            target_y: target.y,
            target_position,
        }
    }

    fn source(&self) -> Point {
        Point::new(self.source_x, self.source_y)
    }

    fn target(&self) -> Point {
        Point::new(self.target_x, self.target_y)
    }
}

/// Number formatting for path data. `-0` prints as `0`.
struct Num(f64);

impl fmt::Display for Num {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0.0 {
            f.write_str("0")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

// ─── Centres ─────────────────────────────────────────────────────────────

/// Midpoint of a straight segment with half-distances as offsets.
pub fn edge_center(source: Point, target: Point) -> (f64, f64, f64, f64) {
    let x_offset = (target.x - source.x).abs() / 2.0;
    let center_x = if target.x < source.x {
        target.x + x_offset
    } else {
        target.x - x_offset
    };
    let y_offset = (target.y - source.y).abs() / 2.0;
    let center_y = if target.y < source.y {
        target.y + y_offset
    } else {
        target.y - y_offset
    };
    (center_x, center_y, x_offset, y_offset)
}

/// Point at t = 0.5 on a cubic bezier.
pub fn bezier_edge_center(
    source: Point,
    target: Point,
    source_control: Point,
    target_control: Point,
) -> (f64, f64, f64, f64) {
    let cx = source.x * 0.125 + source_control.x * 0.375 + target_control.x * 0.375 + target.x * 0.125;
    let cy = source.y * 0.125 + source_control.y * 0.375 + target_control.y * 0.375 + target.y * 0.125;
    (cx, cy, (cx - source.x).abs(), (cy - source.y).abs())
}

fn cubic(source: Point, sc: Point, tc: Point, target: Point) -> EdgePath {
    let (label_x, label_y, offset_x, offset_y) = bezier_edge_center(source, target, sc, tc);
    EdgePath {
        path: format!(
            "M{},{} C{},{} {},{} {},{}",
            Num(source.x),
            Num(source.y),
            Num(sc.x),
            Num(sc.y),
            Num(tc.x),
            Num(tc.y),
            Num(target.x),
            Num(target.y)
        ),
        label_x,
        label_y,
        offset_x,
        offset_y,
    }
}

// ─── Bezier ──────────────────────────────────────────────────────────────

pub const DEFAULT_CURVATURE: f64 = 0.25;

fn control_offset(distance: f64, curvature: f64) -> f64 {
    if distance >= 0.0 {
        0.5 * distance
    } else {
        curvature * 25.0 * (-distance).sqrt()
    }
}

fn control_with_curvature(pos: Side, from: Point, to: Point, c: f64) -> Point {
    match pos {
        Side::Left => Point::new(from.x - control_offset(from.x - to.x, c), from.y),
        Side::Right => Point::new(from.x + control_offset(to.x - from.x, c), from.y),
        Side::Top => Point::new(from.x, from.y - control_offset(from.y - to.y, c)),
        Side::Bottom => Point::new(from.x, from.y + control_offset(to.y - from.y, c)),
    }
}

/// Cubic bezier whose control points leave each endpoint along its side.
/// When the target lies behind the source the offset falls off with the
/// square root of the distance.
pub fn bezier_path(e: &Endpoints, curvature: f64) -> EdgePath {
    let (s, t) = (e.source(), e.target());
    let sc = control_with_curvature(e.source_position, s, t, curvature);
    let tc = control_with_curvature(e.target_position, t, s, curvature);
    cubic(s, sc, tc, t)
}

// ─── Simple bezier ───────────────────────────────────────────────────────

fn simple_control(pos: Side, from: Point, to: Point) -> Point {
    if pos.is_horizontal() {
        Point::new(0.5 * (from.x + to.x), from.y)
    } else {
        Point::new(from.x, 0.5 * (from.y + to.y))
    }
}

pub fn simple_bezier_path(e: &Endpoints) -> EdgePath {
    let (s, t) = (e.source(), e.target());
    let sc = simple_control(e.source_position, s, t);
    let tc = simple_control(e.target_position, t, s);
    cubic(s, sc, tc, t)
}

// ─── Straight ────────────────────────────────────────────────────────────

pub fn straight_path(e: &Endpoints) -> EdgePath {
    let (label_x, label_y, offset_x, offset_y) = edge_center(e.source(), e.target());
    EdgePath {
        path: format!(
            "M {},{}L {},{}",
            Num(e.source_x),
            Num(e.source_y),
            Num(e.target_x),
            Num(e.target_y)
        ),
        label_x,
        label_y,
        offset_x,
        offset_y,
    }
}

// ─── Smooth step ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothStepOptions {
    /// Radius of the rounded corners; 0 gives sharp steps.
    pub border_radius: f64,
    /// Distance the path leaves each handle before turning.
    pub offset: f64,
    pub center_x: Option<f64>,
    pub center_y: Option<f64>,
    /// Where between source and target the middle segment sits, 0..1.
    pub step_position: f64,
}

impl Default for SmoothStepOptions {
    fn default() -> Self {
        Self {
            border_radius: 5.0,
            offset: 20.0,
            center_x: None,
            center_y: None,
            step_position: 0.5,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Axis {
    X,
    Y,
}

impl Axis {
    fn of(self, p: Point) -> f64 {
        match self {
            Axis::X => p.x,
            Axis::Y => p.y,
        }
    }

    fn other(self) -> Axis {
        match self {
            Axis::X => Axis::Y,
            Axis::Y => Axis::X,
        }
    }

    fn set(self, p: &mut Point, v: f64) {
        match self {
            Axis::X => p.x = v,
            Axis::Y => p.y = v,
        }
    }
}

fn handle_direction(side: Side) -> Point {
    match side {
        Side::Left => Point::new(-1.0, 0.0),
        Side::Right => Point::new(1.0, 0.0),
        Side::Top => Point::new(0.0, -1.0),
        Side::Bottom => Point::new(0.0, 1.0),
    }
}

fn general_direction(source: Point, source_position: Side, target: Point) -> Point {
    if source_position.is_horizontal() {
        if source.x < target.x {
            Point::new(1.0, 0.0)
        } else {
            Point::new(-1.0, 0.0)
        }
    } else if source.y < target.y {
        Point::new(0.0, 1.0)
    } else {
        Point::new(0.0, -1.0)
    }
}

/// Polyline of the step path: source, gapped source, up to three
/// waypoints, gapped target, target. Also returns the label anchor.
fn step_points(e: &Endpoints, opts: &SmoothStepOptions) -> (Vec<Point>, f64, f64, f64, f64) {
    let (source, target) = (e.source(), e.target());
    let offset = opts.offset;
    let source_dir = handle_direction(e.source_position);
    let target_dir = handle_direction(e.target_position);
    let source_gapped = Point::new(source.x + source_dir.x * offset, source.y + source_dir.y * offset);
    let target_gapped = Point::new(target.x + target_dir.x * offset, target.y + target_dir.y * offset);
    let dir = general_direction(source_gapped, e.source_position, target_gapped);
    let axis = if dir.x != 0.0 { Axis::X } else { Axis::Y };
    let curr_dir = axis.of(dir);

    let mut source_gap_offset = Point::ZERO;
    let mut target_gap_offset = Point::ZERO;
    let (_, _, default_offset_x, default_offset_y) = edge_center(source, target);

    let points: Vec<Point>;
    let center_x: f64;
    let center_y: f64;

    if axis.of(source_dir) * axis.of(target_dir) == -1.0 {
        // Handles face each other along the main axis.
        if axis == Axis::X {
            center_x = opts
                .center_x
                .unwrap_or(source_gapped.x + (target_gapped.x - source_gapped.x) * opts.step_position);
            center_y = opts
                .center_y
                .unwrap_or((source_gapped.y + target_gapped.y) / 2.0);
        } else {
            center_x = opts
                .center_x
                .unwrap_or((source_gapped.x + target_gapped.x) / 2.0);
            center_y = opts
                .center_y
                .unwrap_or(source_gapped.y + (target_gapped.y - source_gapped.y) * opts.step_position);
        }
        let vertical_split = vec![
            Point::new(center_x, source_gapped.y),
            Point::new(center_x, target_gapped.y),
        ];
        let horizontal_split = vec![
            Point::new(source_gapped.x, center_y),
            Point::new(target_gapped.x, center_y),
        ];
        let source_leads = axis.of(source_dir) == curr_dir;
        points = match (axis, source_leads) {
            (Axis::X, true) | (Axis::Y, false) => vertical_split,
            (Axis::X, false) | (Axis::Y, true) => horizontal_split,
        };
    } else {
        let source_target = vec![Point::new(source_gapped.x, target_gapped.y)];
        let target_source = vec![Point::new(target_gapped.x, source_gapped.y)];
        let mut chosen = match axis {
            Axis::X if source_dir.x == curr_dir => target_source.clone(),
            Axis::X => source_target.clone(),
            Axis::Y if source_dir.y == curr_dir => source_target.clone(),
            Axis::Y => target_source.clone(),
        };

        if e.source_position == e.target_position {
            // Same-side handles closer than the offset would overlap the
            // gapped points; pull one of them back.
            let diff = (axis.of(source) - axis.of(target)).abs();
            if diff <= offset {
                let gap_offset = (offset - 1.0).min(offset - diff);
                if axis.of(source_dir) == curr_dir {
                    let sign = if axis.of(source_gapped) > axis.of(source) { -1.0 } else { 1.0 };
                    axis.set(&mut source_gap_offset, sign * gap_offset);
                } else {
                    let sign = if axis.of(target_gapped) > axis.of(target) { -1.0 } else { 1.0 };
                    axis.set(&mut target_gap_offset, sign * gap_offset);
                }
            }
        } else {
            let opp = axis.other();
            let same_dir = axis.of(source_dir) == opp.of(target_dir);
            let source_gt = opp.of(source_gapped) > opp.of(target_gapped);
            let source_lt = opp.of(source_gapped) < opp.of(target_gapped);
            let flip = if axis.of(source_dir) == 1.0 {
                (!same_dir && source_gt) || (same_dir && source_lt)
            } else {
                (!same_dir && source_lt) || (same_dir && source_gt)
            };
            if flip {
                chosen = if axis == Axis::X { source_target } else { target_source };
            }
        }

        let source_gap_point = source_gapped + source_gap_offset;
        let target_gap_point = target_gapped + target_gap_offset;
        let corner = chosen[0];
        let max_x = (source_gap_point.x - corner.x).abs().max((target_gap_point.x - corner.x).abs());
        let max_y = (source_gap_point.y - corner.y).abs().max((target_gap_point.y - corner.y).abs());

        // Label goes on the longest segment.
        if max_x >= max_y {
            center_x = (source_gap_point.x + target_gap_point.x) / 2.0;
            center_y = corner.y;
        } else {
            center_x = corner.x;
            center_y = (source_gap_point.y + target_gap_point.y) / 2.0;
        }
        points = chosen;
    }

    let mut path_points = Vec::with_capacity(points.len() + 4);
    path_points.push(source);
    path_points.push(source_gapped + source_gap_offset);
    path_points.extend(points);
    path_points.push(target_gapped + target_gap_offset);
    path_points.push(target);

    (path_points, center_x, center_y, default_offset_x, default_offset_y)
}

/// Corner at `b` between segments `a→b` and `b→c`, rounded with a
/// quadratic curve no larger than half of either segment.
fn bend(out: &mut String, a: Point, b: Point, c: Point, size: f64) {
    let bend_size = (a.distance(b) / 2.0).min(b.distance(c) / 2.0).min(size);
    let (x, y) = (b.x, b.y);

    if (a.x == x && x == c.x) || (a.y == y && y == c.y) {
        let _ = write!(out, "L{} {}", Num(x), Num(y));
        return;
    }

    if a.y == y {
        let x_dir = if a.x < c.x { -1.0 } else { 1.0 };
        let y_dir = if a.y < c.y { 1.0 } else { -1.0 };
        let _ = write!(
            out,
            "L {},{}Q {},{} {},{}",
            Num(x + bend_size * x_dir),
            Num(y),
            Num(x),
            Num(y),
            Num(x),
            Num(y + bend_size * y_dir)
        );
        return;
    }

    let x_dir = if a.x < c.x { 1.0 } else { -1.0 };
    let y_dir = if a.y < c.y { -1.0 } else { 1.0 };
    let _ = write!(
        out,
        "L {},{}Q {},{} {},{}",
        Num(x),
        Num(y + bend_size * y_dir),
        Num(x),
        Num(y),
        Num(x + bend_size * x_dir),
        Num(y)
    );
}

/// Orthogonal path with rounded corners.
pub fn smooth_step_path(e: &Endpoints, opts: &SmoothStepOptions) -> EdgePath {
    let (points, label_x, label_y, offset_x, offset_y) = step_points(e, opts);
    let mut path = String::new();
    let last = points.len() - 1;
    for (i, p) in points.iter().enumerate() {
        if i > 0 && i < last {
            bend(&mut path, points[i - 1], *p, points[i + 1], opts.border_radius);
        } else {
            let cmd = if i == 0 { 'M' } else { 'L' };
            let _ = write!(path, "{cmd}{} {}", Num(p.x), Num(p.y));
        }
    }
    EdgePath {
        path,
        label_x,
        label_y,
        offset_x,
        offset_y,
    }
}

/// Smooth step with sharp corners.
pub fn step_path(e: &Endpoints, opts: &SmoothStepOptions) -> EdgePath {
    smooth_step_path(
        e,
        &SmoothStepOptions {
            border_radius: 0.0,
            ..*opts
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn horizontal(sx: f64, sy: f64, tx: f64, ty: f64) -> Endpoints {
        Endpoints::new(Point::new(sx, sy), Side::Right, Point::new(tx, ty), Side::Left)
    }

    #[test]
    fn straight() {
        let p = straight_path(&horizontal(0.0, 0.0, 100.0, 50.0));
        assert_eq!(p.path, "M 0,0L 100,50");
        assert_eq!((p.label_x, p.label_y, p.offset_x, p.offset_y), (50.0, 25.0, 50.0, 25.0));
    }

    #[test]
    fn bezier_forward() {
        let p = bezier_path(&horizontal(0.0, 0.0, 100.0, 0.0), DEFAULT_CURVATURE);
        assert_eq!(p.path, "M0,0 C50,0 50,0 100,0");
        assert_eq!((p.label_x, p.label_y), (50.0, 0.0));
    }

    #[test]
    fn bezier_backward_uses_sqrt_falloff() {
        // Source right of target: distance -100, offset 0.25 * 25 * 10.
        let p = bezier_path(&horizontal(100.0, 0.0, 0.0, 0.0), DEFAULT_CURVATURE);
        assert_eq!(p.path, "M100,0 C162.5,0 -62.5,0 0,0");
    }

    #[test]
    fn simple_bezier_controls_sit_halfway() {
        let p = simple_bezier_path(&horizontal(0.0, 0.0, 100.0, 40.0));
        assert_eq!(p.path, "M0,0 C50,0 50,40 100,40");
    }

    #[test]
    fn step_between_facing_handles() {
        let p = step_path(&horizontal(0.0, 0.0, 100.0, 100.0), &SmoothStepOptions::default());
        assert_eq!(
            p.path,
            "M0 0L20 0L 50,0Q 50,0 50,0L 50,100Q 50,100 50,100L80 100L100 100"
        );
        assert_eq!((p.label_x, p.label_y), (50.0, 50.0));
    }

    #[test]
    fn smooth_step_rounds_corners() {
        let p = smooth_step_path(&horizontal(0.0, 0.0, 100.0, 100.0), &SmoothStepOptions::default());
        assert_eq!(
            p.path,
            "M0 0L20 0L 45,0Q 50,0 50,5L 50,95Q 50,100 55,100L80 100L100 100"
        );
    }

    #[test]
    fn smooth_step_radius_capped_by_segment() {
        let p = smooth_step_path(
            &horizontal(0.0, 0.0, 100.0, 4.0),
            &SmoothStepOptions {
                border_radius: 50.0,
                ..Default::default()
            },
        );
        // Middle vertical segment is 4 long, so the bend is at most 2.
        assert!(p.path.contains("Q 50,0 50,2"));
    }

    #[test]
    fn coincident_endpoints_stay_finite() {
        let e = Endpoints::new(Point::new(10.0, 10.0), Side::Bottom, Point::new(10.0, 10.0), Side::Top);
        for p in [
            bezier_path(&e, DEFAULT_CURVATURE),
            simple_bezier_path(&e),
            straight_path(&e),
            smooth_step_path(&e, &SmoothStepOptions::default()),
        ] {
            assert!(!p.path.contains("NaN"), "{}", p.path);
            assert!(p.label_x.is_finite() && p.label_y.is_finite());
        }
    }

    #[test]
    fn negative_zero_prints_plain() {
        assert_eq!(Num(-0.0).to_string(), "0");
        assert_eq!(Num(-2.5).to_string(), "-2.5");
    }
}
