//! Error types for the persistence client

use thiserror::Error;

use flow_graph::GraphError;

use crate::config::ConfigError;

/// Result type alias using ClientError
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors surfaced by backend synchronization
#[derive(Debug, Error)]
pub enum ClientError {
    /// Required field missing before a create or save; no request was made
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The action needs a workflow id and the workflow is still a draft
    #[error("Workflow has not been saved yet")]
    NotSaved,

    /// A create request for this session is still outstanding
    #[error("A create request is already in flight")]
    Busy,

    /// Transport failure (connection refused, timeout, ...)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status
    #[error("Backend returned {status}: {message}")]
    Status { status: u16, message: String },

    /// A loaded workflow violates the graph invariants
    #[error("Malformed workflow '{workflow_id}': {reason}")]
    Malformed { workflow_id: String, reason: String },

    /// Response body could not be decoded
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ClientError {
    /// A 404 for a workflow id
    pub fn not_found(id: &str) -> Self {
        Self::Status {
            status: 404,
            message: format!("Workflow '{}' not found", id),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}
