//! Input abstraction layer.
//!
//! Normalizes pointer, wheel and keyboard events from the host into a
//! unified `InputEvent` enum consumed by the controllers. Coordinates are
//! screen pixels relative to the top-left corner of the pane.

use flow_core::config::Platform;
use flow_core::geometry::Point;

/// Keyboard modifiers held during an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub fn shift() -> Self {
        Self {
            shift: true,
            ..Self::NONE
        }
    }

    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Self::NONE
        }
    }

    /// The key that adds to the current selection: Meta on macOS,
    /// Control elsewhere.
    pub fn multi_select(&self, platform: Platform) -> bool {
        match platform {
            Platform::MacOs => self.meta,
            Platform::Other => self.ctrl,
        }
    }
}

/// Unit of a wheel delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WheelDeltaMode {
    #[default]
    Pixel,
    Line,
    Page,
}

/// Primary mouse button.
pub const BUTTON_PRIMARY: u8 = 0;
/// Middle mouse button.
pub const BUTTON_MIDDLE: u8 = 1;
/// Secondary mouse button.
pub const BUTTON_SECONDARY: u8 = 2;

/// A normalized input event from any pointing device or the keyboard.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Pointer pressed.
    PointerDown {
        x: f64,
        y: f64,
        button: u8,
        modifiers: Modifiers,
    },

    /// Pointer moved, pressed or not.
    PointerMove { x: f64, y: f64, modifiers: Modifiers },

    /// Pointer released.
    PointerUp { x: f64, y: f64, modifiers: Modifiers },

    /// Wheel or trackpad scroll. A pinch arrives as a wheel with `ctrl`.
    Wheel {
        x: f64,
        y: f64,
        dx: f64,
        dy: f64,
        mode: WheelDeltaMode,
        modifiers: Modifiers,
    },

    DoubleClick { x: f64, y: f64, modifiers: Modifiers },

    KeyDown { key: String, modifiers: Modifiers },

    KeyUp { key: String, modifiers: Modifiers },

    /// The host lost the pointer (blur, pointercancel).
    Cancel,
}

impl InputEvent {
    pub fn pointer_down(x: f64, y: f64) -> Self {
        Self::PointerDown {
            x,
            y,
            button: BUTTON_PRIMARY,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn pointer_move(x: f64, y: f64) -> Self {
        Self::PointerMove {
            x,
            y,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn pointer_up(x: f64, y: f64) -> Self {
        Self::PointerUp {
            x,
            y,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn key(key: &str) -> Self {
        Self::KeyDown {
            key: key.to_string(),
            modifiers: Modifiers::NONE,
        }
    }

    /// Extract position if this event has one.
    pub fn position(&self) -> Option<Point> {
        match self {
            Self::PointerDown { x, y, .. }
            | Self::PointerMove { x, y, .. }
            | Self::PointerUp { x, y, .. }
            | Self::Wheel { x, y, .. }
            | Self::DoubleClick { x, y, .. } => Some(Point::new(*x, *y)),
            Self::KeyDown { .. } | Self::KeyUp { .. } | Self::Cancel => None,
        }
    }

    pub fn modifiers(&self) -> Modifiers {
        match self {
            Self::PointerDown { modifiers, .. }
            | Self::PointerMove { modifiers, .. }
            | Self::PointerUp { modifiers, .. }
            | Self::Wheel { modifiers, .. }
            | Self::DoubleClick { modifiers, .. }
            | Self::KeyDown { modifiers, .. }
            | Self::KeyUp { modifiers, .. } => *modifiers,
            Self::Cancel => Modifiers::NONE,
        }
    }
}
