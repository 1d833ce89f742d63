//! Interaction configuration.
//!
//! One immutable struct with every flag the controllers read. Fields are
//! public so embedders write `FlowConfig { min_zoom: 0.1, ..Default::default() }`.

use crate::geometry::{CoordinateExtent, Padding};
use crate::model::{ConnectionMode, NodeOrigin};
use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};

/// Axis restriction for pan-on-scroll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanOnScrollMode {
    #[default]
    Free,
    Vertical,
    Horizontal,
}

/// Marquee containment rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Any overlap selects.
    Partial,
    /// Only fully contained nodes are selected.
    #[default]
    Full,
}

/// Host platform, used to normalise wheel deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Platform {
    MacOs,
    #[default]
    Other,
}

/// Mouse buttons that may start a drag-pan. Empty disables it.
pub type PanButtons = SmallVec<[u8; 3]>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlowConfig {
    /// Default: **0.5**.
    pub min_zoom: f64,
    /// Default: **2**.
    pub max_zoom: f64,
    /// Bounds for panning, in flow space. Default: infinite.
    pub translate_extent: CoordinateExtent,
    /// Extent for nodes without their own. Default: infinite.
    pub node_extent: CoordinateExtent,
    /// Default: **[0, 0]** (position is the top-left corner).
    pub node_origin: NodeOrigin,

    pub snap_to_grid: bool,
    /// Default: **[15, 15]**.
    pub snap_grid: [f64; 2],

    /// Lift selected nodes by 1000 in z. Default: **true**.
    pub elevate_nodes_on_select: bool,
    /// Lift selected edges (and edges touching selected nodes). Default: **false**.
    pub elevate_edges_on_select: bool,

    pub nodes_draggable: bool,
    pub nodes_connectable: bool,
    pub nodes_focusable: bool,
    pub elements_selectable: bool,
    pub edges_reconnectable: bool,
    /// Select a node when a drag starts on it. Default: **true**.
    pub select_nodes_on_drag: bool,

    /// Pixels the pointer must travel before a node drag starts. Default: **1**.
    pub node_drag_threshold: f64,
    /// Same for connection drags. Default: **1**.
    pub connection_drag_threshold: f64,
    /// Snap radius around handles, in screen pixels. Default: **20**.
    pub connection_radius: f64,
    /// Grab radius around an edge end to start a reconnect. Default: **10**.
    pub reconnect_radius: f64,
    pub connection_mode: ConnectionMode,
    /// Two clicks on handles create a connection. Default: **true**.
    pub connect_on_click: bool,

    pub auto_pan_on_node_drag: bool,
    pub auto_pan_on_connect: bool,
    /// Default: **15**.
    pub auto_pan_speed: f64,
    /// Width of the auto-pan band along the pane edges. Default: **40**.
    pub auto_pan_margin: f64,

    /// Default: **[0, 1]** (primary and middle button).
    pub pan_on_drag: PanButtons,
    pub pan_on_scroll: bool,
    /// Default: **0.5**.
    pub pan_on_scroll_speed: f64,
    pub pan_on_scroll_mode: PanOnScrollMode,
    pub zoom_on_scroll: bool,
    pub zoom_on_pinch: bool,
    pub zoom_on_double_click: bool,
    /// Default: **250** ms.
    pub double_click_zoom_duration: f64,
    /// Marquee on plain pane drag instead of requiring Shift. Default: **false**.
    pub selection_on_drag: bool,
    pub selection_mode: SelectionMode,
    /// Default: **0.1**.
    pub fit_view_padding: Padding,

    pub platform: Platform,

    /// The store folds its own change records into its arrays. Default: **true**.
    pub auto_apply_changes: bool,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.5,
            max_zoom: 2.0,
            translate_extent: CoordinateExtent::INFINITE,
            node_extent: CoordinateExtent::INFINITE,
            node_origin: [0.0, 0.0],
            snap_to_grid: false,
            snap_grid: [15.0, 15.0],
            elevate_nodes_on_select: true,
            elevate_edges_on_select: false,
            nodes_draggable: true,
            nodes_connectable: true,
            nodes_focusable: true,
            elements_selectable: true,
            edges_reconnectable: true,
            select_nodes_on_drag: true,
            node_drag_threshold: 1.0,
            connection_drag_threshold: 1.0,
            connection_radius: 20.0,
            reconnect_radius: 10.0,
            connection_mode: ConnectionMode::Strict,
            connect_on_click: true,
            auto_pan_on_node_drag: true,
            auto_pan_on_connect: true,
            auto_pan_speed: 15.0,
            auto_pan_margin: 40.0,
            pan_on_drag: smallvec![0, 1],
            pan_on_scroll: false,
            pan_on_scroll_speed: 0.5,
            pan_on_scroll_mode: PanOnScrollMode::Free,
            zoom_on_scroll: true,
            zoom_on_pinch: true,
            zoom_on_double_click: true,
            double_click_zoom_duration: 250.0,
            selection_on_drag: false,
            selection_mode: SelectionMode::Full,
            fit_view_padding: Padding::from(0.1),
            platform: Platform::Other,
            auto_apply_changes: true,
        }
    }
}

impl FlowConfig {
    /// Snap grid when snapping is on.
    pub fn active_snap_grid(&self) -> Option<[f64; 2]> {
        self.snap_to_grid.then_some(self.snap_grid)
    }

    pub fn pans_with_button(&self, button: u8) -> bool {
        self.pan_on_drag.contains(&button)
    }
}
