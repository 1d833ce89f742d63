//! Error codes reported through the Store's error sink.
//!
//! The engine never halts on these. Each variant maps to a stable
//! three-digit code so embedders can filter or translate messages.

use crate::id::{EdgeId, HandleId, NodeId};
use crate::model::HandleType;

pub type Result<T> = std::result::Result<T, FlowError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FlowError {
    #[error("Node type \"{node_type}\" not found. Using fallback type \"default\".")]
    UnknownNodeType { node_type: String },

    #[error("The flow container needs a width and a height to render the graph.")]
    ZeroSizeContainer,

    #[error("Only child nodes can use a parent extent.")]
    ParentExtentWithoutParent { node: NodeId },

    #[error("Can't create edge. An edge needs a source and a target.")]
    MissingEdgeEndpoint,

    #[error("The old edge with id={edge} does not exist.")]
    UnknownEdge { edge: EdgeId },

    #[error("Couldn't create edge for {handle_type} handle id: \"{}\", edge id: {edge}.", handle_label(.handle))]
    UnresolvedHandle {
        edge: EdgeId,
        handle_type: HandleType,
        handle: Option<HandleId>,
    },

    #[error("Edge type \"{edge_type}\" not found. Using fallback type \"default\".")]
    UnknownEdgeType { edge_type: String },

    #[error(
        "Node with id \"{node}\" does not exist, it may have been removed. This can happen when a node is deleted before a handler for it is called."
    )]
    UnknownNode { node: NodeId },

    #[error(
        "It seems that you are trying to drag a node that is not initialized. Apply the dimension changes emitted by the store first."
    )]
    UninitializedNode { node: NodeId },

    #[error(
        "The padding value \"{value}\" is invalid. Please provide a number or a string with a valid unit (px or %)."
    )]
    InvalidPadding { value: String },
}

fn handle_label(handle: &Option<HandleId>) -> &str {
    handle.as_ref().map(|h| h.as_str()).unwrap_or("null")
}

impl FlowError {
    /// Stable error code.
    pub fn code(&self) -> &'static str {
        match self {
            FlowError::UnknownNodeType { .. } => "003",
            FlowError::ZeroSizeContainer => "004",
            FlowError::ParentExtentWithoutParent { .. } => "005",
            FlowError::MissingEdgeEndpoint => "006",
            FlowError::UnknownEdge { .. } => "007",
            FlowError::UnresolvedHandle { .. } => "008",
            FlowError::UnknownEdgeType { .. } => "011",
            FlowError::UnknownNode { .. } => "012",
            FlowError::UninitializedNode { .. } => "015",
            FlowError::InvalidPadding { .. } => "016",
        }
    }
}
