pub mod canvas;
pub mod connection;
pub mod drag;
pub mod input;
pub mod panzoom;
pub mod resize;
pub mod selection;
pub mod transition;

pub use canvas::FlowCanvas;
pub use connection::ConnectionController;
pub use drag::DragController;
pub use input::{InputEvent, Modifiers, WheelDeltaMode};
pub use panzoom::{FitViewOptions, PanZoom};
pub use resize::{ResizeControl, ResizeController, ResizeDirection, ResizeOptions};
pub use selection::SelectionController;
pub use transition::{Interpolation, TransitionOptions};
