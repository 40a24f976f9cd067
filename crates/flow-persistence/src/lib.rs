//! Flow Persistence - Backend synchronization for the Flowpad editor
//!
//! Connects the editor core in `flow-graph` to the workflow service:
//!
//! - `WorkflowBackend`: resource operations, over HTTP or a local store
//! - `PersistenceClient`: cached reads, serialized writes, key-based
//!   cache invalidation
//! - `EditorSession`: create/save/run/delete/load for one open workflow,
//!   with view state and navigation intents
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use flow_graph::NodeTypeCatalog;
//! use flow_persistence::{ClientConfig, EditorSession, PersistenceClient};
//!
//! let config = ClientConfig::load_with_env(config_dir).await?;
//! let client = PersistenceClient::from_config(&config).await?;
//! let mut session = EditorSession::new_draft(client, Arc::new(NodeTypeCatalog::builtin()), "Nightly sync");
//! session.canvas_mut().add_at_viewport_center("schedule")?;
//! session.save().await?;
//! ```

pub mod backend;
pub mod cache;
pub mod client;
pub mod config;
pub mod constants;
pub mod dto;
pub mod error;
pub mod http;
pub mod local;
pub mod locks;
pub mod session;

#[cfg(test)]
mod testing;

// Re-export key types
pub use backend::WorkflowBackend;
pub use cache::{CachedQuery, QueryCache, QueryKey};
pub use client::{PersistenceClient, SyncAction, SyncOutcome, SyncRequest, SyncSuccess};
pub use config::{ClientConfig, ConfigError};
pub use dto::{
    CreateWorkflowRequest, CreatedWorkflow, ExecutionStatus, ExecutionSummary, RunResponse,
    UpdateWorkflowRequest, WorkflowDocument, WorkflowSummary,
};
pub use error::{ClientError, Result};
pub use http::HttpWorkflowBackend;
pub use local::LocalWorkflowBackend;
pub use locks::WorkflowLocks;
pub use session::{EditorSession, EditorView};
