//! Editor events
//!
//! Events are sent from the editor core (and the persistence session built
//! on it) to whatever renders the editor: graph and selection changes,
//! transient notices, and navigation intents.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::selection::Selection;
use crate::types::WorkflowId;

/// Trait for sending editor events
///
/// This abstracts over the transport mechanism (UI channel, mpsc, etc.)
/// so the editor can be driven headless in tests.
pub trait EventSink: Send + Sync {
    /// Send an event
    ///
    /// Returns an error if the event could not be sent (e.g., channel closed)
    fn send(&self, event: EditorEvent) -> Result<(), EventError>;
}

/// Error when sending events fails
#[derive(Debug, Clone)]
pub struct EventError {
    pub message: String,
}

impl std::fmt::Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Event error: {}", self.message)
    }
}

impl std::error::Error for EventError {}

impl EventError {
    pub fn channel_closed() -> Self {
        Self {
            message: "Channel closed".to_string(),
        }
    }
}

/// Severity of a user-facing notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// Where the editor should go next
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "to", rename_all = "camelCase")]
pub enum Route {
    Dashboard,
    #[serde(rename_all = "camelCase")]
    Editor { workflow_id: WorkflowId },
}

impl Route {
    /// Path of the route in the web frontend
    pub fn path(&self) -> String {
        match self {
            Route::Dashboard => "/".to_string(),
            Route::Editor { workflow_id } => format!("/workflows/{}", workflow_id),
        }
    }
}

/// Events emitted while editing a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EditorEvent {
    /// A new graph snapshot was published
    #[serde(rename_all = "camelCase")]
    GraphChanged { revision: u64 },

    #[serde(rename_all = "camelCase")]
    SelectionChanged { selection: Selection },

    /// Transient message for the user
    #[serde(rename_all = "camelCase")]
    Notice { level: NoticeLevel, message: String },

    #[serde(rename_all = "camelCase")]
    WorkflowCreated { workflow_id: WorkflowId },

    #[serde(rename_all = "camelCase")]
    WorkflowSaved { workflow_id: WorkflowId },

    #[serde(rename_all = "camelCase")]
    WorkflowLoaded { workflow_id: WorkflowId },

    /// The editor could not show the workflow
    #[serde(rename_all = "camelCase")]
    LoadFailed { workflow_id: WorkflowId, message: String },

    #[serde(rename_all = "camelCase")]
    RunStarted {
        workflow_id: WorkflowId,
        execution_id: String,
    },

    #[serde(rename_all = "camelCase")]
    WorkflowDeleted { workflow_id: WorkflowId },

    /// The editor should navigate
    #[serde(rename_all = "camelCase")]
    Navigate { route: Route },
}

impl EditorEvent {
    /// Create a success notice
    pub fn success(message: impl Into<String>) -> Self {
        Self::Notice {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    /// Create an error notice
    pub fn error(message: impl Into<String>) -> Self {
        Self::Notice {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// A no-op event sink that discards all events
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: EditorEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// A vector-based event sink that collects events
///
/// Useful for testing to verify events were emitted correctly.
#[derive(Default)]
pub struct VecEventSink {
    events: Mutex<Vec<EditorEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all collected events
    pub fn events(&self) -> Vec<EditorEvent> {
        self.events.lock().clone()
    }

    /// Remove and return all collected events
    pub fn take(&self) -> Vec<EditorEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: EditorEvent) -> Result<(), EventError> {
        self.events.lock().push(event);
        Ok(())
    }
}

/// Send an event, logging instead of failing when the sink is gone
pub fn emit(sink: &dyn EventSink, event: EditorEvent) {
    if let Err(e) = sink.send(event) {
        log::warn!("Dropping editor event: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_event_sink() {
        let sink = VecEventSink::new();
        sink.send(EditorEvent::GraphChanged { revision: 3 }).unwrap();
        sink.send(EditorEvent::error("boom")).unwrap();

        let events = sink.take();
        assert_eq!(events.len(), 2);
        match &events[1] {
            EditorEvent::Notice { level, message } => {
                assert_eq!(*level, NoticeLevel::Error);
                assert_eq!(message, "boom");
            }
            other => panic!("Expected Notice event, got {:?}", other),
        }
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_event_wire_shape() {
        let event = EditorEvent::Navigate {
            route: Route::Editor {
                workflow_id: "wf-1".to_string(),
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "navigate");
        assert_eq!(json["route"]["to"], "editor");
        assert_eq!(json["route"]["workflowId"], "wf-1");
    }

    #[test]
    fn test_route_paths() {
        assert_eq!(Route::Dashboard.path(), "/");
        assert_eq!(
            Route::Editor {
                workflow_id: "abc".to_string()
            }
            .path(),
            "/workflows/abc"
        );
    }
}
