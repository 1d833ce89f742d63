//! Animated viewport transitions.
//!
//! A transition is a small state machine advanced by `tick(now_ms)`. Its
//! completion is observable through a oneshot future that resolves to
//! `true` when the target is reached and `false` when the transition is
//! aborted or superseded.

use flow_core::geometry::{Dimensions, Viewport};
use futures::channel::oneshot;

/// Maps linear progress in `[0, 1]` to eased progress.
pub type Easing = fn(f64) -> f64;

pub fn linear(t: f64) -> f64 {
    t
}

pub fn cubic_in(t: f64) -> f64 {
    t * t * t
}

pub fn cubic_out(t: f64) -> f64 {
    let u = t - 1.0;
    u * u * u + 1.0
}

pub fn cubic_in_out(t: f64) -> f64 {
    let t = t * 2.0;
    if t <= 1.0 {
        t * t * t / 2.0
    } else {
        let t = t - 2.0;
        (t * t * t + 2.0) / 2.0
    }
}

/// How intermediate viewports are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// Straight interpolation of `x`, `y` and `zoom`.
    Linear,
    /// Zoom out, travel, zoom in along the smooth-zoom path of van Wijk
    /// and Nuij.
    #[default]
    Smooth,
}

#[derive(Debug, Clone, Copy)]
pub struct TransitionOptions {
    /// Milliseconds; `0` applies the target immediately.
    pub duration: f64,
    pub ease: Easing,
    pub interpolate: Interpolation,
}

impl Default for TransitionOptions {
    fn default() -> Self {
        Self {
            duration: 0.0,
            ease: cubic_in_out,
            interpolate: Interpolation::Smooth,
        }
    }
}

impl TransitionOptions {
    pub fn with_duration(duration: f64) -> Self {
        Self {
            duration,
            ..Self::default()
        }
    }
}

// ─── Smooth zoom ─────────────────────────────────────────────────────────

const RHO: f64 = std::f64::consts::SQRT_2;
const EPSILON2: f64 = 1e-12;

/// A view as `[centre x, centre y, visible width]` in flow space.
type View = [f64; 3];

fn smooth_zoom(p0: View, p1: View) -> impl Fn(f64) -> View {
    let [ux0, uy0, w0] = p0;
    let [ux1, uy1, w1] = p1;
    let dx = ux1 - ux0;
    let dy = uy1 - uy0;
    let d2 = dx * dx + dy * dy;
    let rho2 = RHO * RHO;
    let rho4 = rho2 * rho2;

    // Coincident centres: pure zoom.
    let coincident = d2 < EPSILON2;
    let d1 = d2.sqrt();
    let (r0, s) = if coincident {
        (0.0, (w1 / w0).ln() / RHO)
    } else {
        let b0 = (w1 * w1 - w0 * w0 + rho4 * d2) / (2.0 * w0 * rho2 * d1);
        let b1 = (w1 * w1 - w0 * w0 - rho4 * d2) / (2.0 * w1 * rho2 * d1);
        let r0 = ((b0 * b0 + 1.0).sqrt() - b0).ln();
        let r1 = ((b1 * b1 + 1.0).sqrt() - b1).ln();
        (r0, (r1 - r0) / RHO)
    };

    move |t| {
        if coincident {
            return [ux0 + t * dx, uy0 + t * dy, w0 * (RHO * t * s).exp()];
        }
        let s = t * s;
        let cosh_r0 = r0.cosh();
        let u = w0 / (rho2 * d1) * (cosh_r0 * (RHO * s + r0).tanh() - r0.sinh());
        [ux0 + u * dx, uy0 + u * dy, w0 * cosh_r0 / (RHO * s + r0).cosh()]
    }
}

/// Viewport at eased progress `t` between `from` and `to` for a pane of
/// `size`.
pub fn interpolate(from: Viewport, to: Viewport, t: f64, size: Dimensions, mode: Interpolation) -> Viewport {
    if t >= 1.0 {
        return to;
    }
    match mode {
        Interpolation::Linear => Viewport::new(
            from.x + (to.x - from.x) * t,
            from.y + (to.y - from.y) * t,
            from.zoom + (to.zoom - from.zoom) * t,
        ),
        Interpolation::Smooth => {
            let (px, py) = (size.width / 2.0, size.height / 2.0);
            let w = size.width.max(size.height).max(1.0);
            let view = |v: Viewport| -> View { [(px - v.x) / v.zoom, (py - v.y) / v.zoom, w / v.zoom] };
            let [cx, cy, vw] = smooth_zoom(view(from), view(to))(t);
            let k = w / vw;
            Viewport::new(px - cx * k, py - cy * k, k)
        }
    }
}

// ─── State machine ───────────────────────────────────────────────────────

/// What a tick produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransitionStep {
    Running(Viewport),
    Finished(Viewport),
}

pub struct Transition {
    from: Viewport,
    to: Viewport,
    size: Dimensions,
    options: TransitionOptions,
    started_at: Option<f64>,
    done: Option<oneshot::Sender<bool>>,
}

impl std::fmt::Debug for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transition")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("duration", &self.options.duration)
            .field("started_at", &self.started_at)
            .finish()
    }
}

impl Transition {
    pub fn new(
        from: Viewport,
        to: Viewport,
        size: Dimensions,
        options: TransitionOptions,
    ) -> (Self, oneshot::Receiver<bool>) {
        let (tx, rx) = oneshot::channel();
        let transition = Self {
            from,
            to,
            size,
            options,
            started_at: None,
            done: Some(tx),
        };
        (transition, rx)
    }

    pub fn target(&self) -> Viewport {
        self.to
    }

    /// Advance to `now_ms`. The first tick fixes the start time.
    pub fn tick(&mut self, now_ms: f64) -> TransitionStep {
        let start = *self.started_at.get_or_insert(now_ms);
        let elapsed = now_ms - start;
        if self.options.duration <= 0.0 || elapsed >= self.options.duration {
            return TransitionStep::Finished(self.to);
        }
        let t = (self.options.ease)(elapsed / self.options.duration);
        TransitionStep::Running(interpolate(self.from, self.to, t, self.size, self.options.interpolate))
    }

    /// Resolve the completion future with `true`.
    pub fn finish(mut self) {
        if let Some(tx) = self.done.take() {
            let _ = tx.send(true);
        }
    }
}

impl Drop for Transition {
    /// Dropping an unfinished transition resolves its future with `false`.
    fn drop(&mut self) {
        if let Some(tx) = self.done.take() {
            let _ = tx.send(false);
        }
    }
}

/// A future that has already resolved to `value`.
pub fn resolved(value: bool) -> oneshot::Receiver<bool> {
    let (tx, rx) = oneshot::channel();
    let _ = tx.send(value);
    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    const SIZE: Dimensions = Dimensions {
        width: 800.0,
        height: 600.0,
    };

    #[test]
    fn easings_hit_endpoints() {
        for ease in [linear, cubic_in, cubic_out, cubic_in_out] {
            assert_eq!(ease(0.0), 0.0);
            assert!((ease(1.0) - 1.0).abs() < 1e-12);
        }
        assert!((cubic_in_out(0.5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn smooth_path_starts_and_ends_on_target() {
        let from = Viewport::new(0.0, 0.0, 1.0);
        let to = Viewport::new(-400.0, 200.0, 2.0);
        let start = interpolate(from, to, 0.0, SIZE, Interpolation::Smooth);
        assert!((start.x - from.x).abs() < 1e-9);
        assert!((start.zoom - from.zoom).abs() < 1e-9);
        let near_end = interpolate(from, to, 0.999_999, SIZE, Interpolation::Smooth);
        assert!((near_end.zoom - to.zoom).abs() < 1e-3);
        assert!((near_end.x - to.x).abs() < 1e-2);
    }

    #[test]
    fn smooth_path_handles_pure_zoom() {
        let from = Viewport::new(0.0, 0.0, 1.0);
        // Same centre, zoomed about the pane centre.
        let to = Viewport::new(-400.0, -300.0, 2.0);
        let mid = interpolate(from, to, 0.5, SIZE, Interpolation::Smooth);
        assert!(mid.zoom.is_finite() && mid.zoom > 1.0 && mid.zoom < 2.0);
        let centre = |v: Viewport| ((400.0 - v.x) / v.zoom, (300.0 - v.y) / v.zoom);
        let (cx, cy) = centre(mid);
        assert!((cx - 400.0).abs() < 1e-9 && (cy - 300.0).abs() < 1e-9);
    }

    #[test]
    fn ticks_run_to_completion() {
        let from = Viewport::IDENTITY;
        let to = Viewport::new(100.0, 0.0, 1.0);
        let options = TransitionOptions {
            duration: 100.0,
            ease: linear,
            interpolate: Interpolation::Linear,
        };
        let (mut tr, rx) = Transition::new(from, to, SIZE, options);
        assert_eq!(tr.tick(1000.0), TransitionStep::Running(from));
        assert_eq!(tr.tick(1050.0), TransitionStep::Running(Viewport::new(50.0, 0.0, 1.0)));
        assert_eq!(tr.tick(1100.0), TransitionStep::Finished(to));
        tr.finish();
        assert_eq!(block_on(rx), Ok(true));
    }

    #[test]
    fn dropped_transition_resolves_false() {
        let (tr, rx) = Transition::new(Viewport::IDENTITY, Viewport::IDENTITY, SIZE, TransitionOptions::with_duration(10.0));
        drop(tr);
        assert_eq!(block_on(rx), Ok(false));
        assert_eq!(block_on(resolved(true)), Ok(true));
    }
}
