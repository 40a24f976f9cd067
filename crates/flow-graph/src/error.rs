//! Error types for the graph editor core

use thiserror::Error;

use crate::types::WorkflowStatus;
use crate::validation::ConnectionError;

/// Result type alias using GraphError
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors that can occur while editing a workflow graph
#[derive(Debug, Error)]
pub enum GraphError {
    /// A gesture referenced a node that is not in the graph
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// A gesture referenced an edge that is not in the graph
    #[error("Edge not found: {0}")]
    EdgeNotFound(String),

    /// A whole-graph replacement would leave an edge pointing at nothing
    #[error("Edge '{edge_id}' references unknown node '{node_id}'")]
    DanglingEdge { edge_id: String, node_id: String },

    /// A whole-graph replacement holds an edge from a node to itself
    #[error("Edge '{edge_id}' connects node '{node_id}' to itself")]
    SelfLoop { edge_id: String, node_id: String },

    /// A whole-graph replacement holds two nodes with the same id
    #[error("Duplicate node id: {0}")]
    DuplicateNodeId(String),

    /// A whole-graph replacement holds two edges with the same id
    #[error("Duplicate edge id: {0}")]
    DuplicateEdgeId(String),

    /// Connect gesture rejected by connection validation
    #[error("Connection rejected: {0}")]
    Connection(#[from] ConnectionError),

    /// Subtype is not in the node type catalog
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    /// Node type cannot be placed on an edge
    #[error("Node type '{0}' cannot be inserted on an edge")]
    NotInsertable(String),

    /// Edge insertion requested without an edge selected
    #[error("No edge is selected")]
    NoEdgeSelected,

    /// Workflow status change not allowed by the lifecycle
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidStatusTransition {
        from: WorkflowStatus,
        to: WorkflowStatus,
    },

    /// Viewport zoom must be a finite positive number
    #[error("Invalid zoom factor: {0}")]
    InvalidZoom(f64),

    /// Drag payload or catalog document could not be parsed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Undo snapshot could not be compressed or decompressed
    #[error("Compression error: {0}")]
    Compression(String),
}

impl GraphError {
    /// Create a node-not-found error
    pub fn node_not_found(id: impl Into<String>) -> Self {
        Self::NodeNotFound(id.into())
    }

    /// Create an edge-not-found error
    pub fn edge_not_found(id: impl Into<String>) -> Self {
        Self::EdgeNotFound(id.into())
    }
}
