//! Flow Graph - Workflow graph model and canvas editing for Flowpad
//!
//! This crate holds everything the workflow editor does without talking to
//! a backend:
//!
//! - Graph model with typed per-subtype node configuration
//! - Batch-mutating graph store publishing immutable snapshots
//! - Screen/canvas coordinate mapping for pan and zoom
//! - Node type catalog grouped by category
//! - Exclusive node/edge selection driving the context menu
//! - Mid-edge node insertion
//! - Reachability-aware connection validation
//! - Compressed snapshot-based undo/redo
//!
//! # Architecture
//!
//! - `GraphStore`: the only owner of the canonical graph
//! - `CanvasSession`: binds pointer gestures to store batches
//! - `EventSink`: generic event streaming to whatever renders the editor
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use flow_graph::{CanvasSession, NodeTypeCatalog, ScreenPoint};
//!
//! let mut canvas = CanvasSession::new(Arc::new(NodeTypeCatalog::builtin()));
//! let hook = canvas.add_at_viewport_center("webhook")?;
//! let notify = canvas.add_at_viewport_center("slack")?;
//! let edge = canvas.connect(&hook, &notify)?;
//! canvas.click_edge(&edge, ScreenPoint::new(400.0, 300.0))?;
//! canvas.insert_on_selected_edge("delay")?;
//! ```

pub mod builder;
pub mod canvas;
pub mod catalog;
pub mod coords;
pub mod error;
pub mod events;
pub mod ids;
pub mod insertion;
pub mod node_config;
pub mod selection;
pub mod store;
pub mod types;
pub mod undo;
pub mod validation;

// Re-export key types
pub use builder::WorkflowBuilder;
pub use canvas::CanvasSession;
pub use catalog::{CatalogCategory, ColorTag, DragPayload, NodeTypeCatalog, NodeTypeDescriptor};
pub use coords::{canvas_to_screen, screen_to_canvas, ScreenPoint, Viewport};
pub use error::{GraphError, Result};
pub use events::{EditorEvent, EventSink, NoticeLevel, NullEventSink, Route, VecEventSink};
pub use ids::{IdGenerator, IdSource, SequentialIds};
pub use node_config::NodeConfig;
pub use selection::{ContextMenu, Selection, SelectionController};
pub use store::{ApplyReport, GraphChange, GraphStore, SkipReason};
pub use types::{
    EdgeId, EdgePresentation, GraphEdge, GraphNode, NodeCategory, NodeId, Position, Workflow,
    WorkflowGraph, WorkflowHeader, WorkflowId, WorkflowStatus,
};
pub use undo::UndoStack;
pub use validation::{validate_connection, validate_workflow, ConnectionError, ValidationError};
