pub mod changes;
pub mod config;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod hit;
pub mod id;
pub mod model;
pub mod paths;
pub mod registry;
pub mod store;

pub use changes::{EdgeChange, NodeChange, SetAttributes, apply_edge_changes, apply_node_changes};
pub use config::{FlowConfig, PanOnScrollMode, Platform, SelectionMode};
pub use error::{FlowError, Result};
pub use geometry::{CoordinateExtent, Dimensions, Padding, Point, Rect, Viewport};
pub use id::{EdgeId, HandleId, NodeId};
pub use model::*;
pub use paths::{EdgePath, Endpoints};
pub use registry::{EdgeShape, ElementKind, TypeRegistry};
pub use store::{FlowEvent, NodeMeasurement, PositionUpdate, ResizeParams, Store, SubscriptionId};
