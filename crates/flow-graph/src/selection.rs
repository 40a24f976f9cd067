//! Selection Controller
//!
//! At most one node or one edge is selected. The context menu shown by the
//! canvas is derived from the selection and never stored separately, so a
//! node menu and an edge menu can never be open together.

use serde::{Deserialize, Serialize};

use crate::types::{EdgeId, NodeId, Position, WorkflowGraph};

/// What is currently selected
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Selection {
    #[default]
    None,
    Node { id: NodeId },
    /// `anchor` is the canvas position of the click, used to place the
    /// insertion menu and the inserted node
    Edge { id: EdgeId, anchor: Position },
}

impl Selection {
    pub fn node_id(&self) -> Option<&str> {
        match self {
            Selection::Node { id } => Some(id),
            _ => None,
        }
    }

    pub fn edge_id(&self) -> Option<&str> {
        match self {
            Selection::Edge { id, .. } => Some(id),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Selection::None)
    }
}

/// Actions offered for a selected node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeAction {
    Edit,
    Delete,
    Duplicate,
}

/// Actions offered for a selected edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeAction {
    InsertNodeBetween,
    Cancel,
}

/// The single context menu visible for the current selection
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContextMenu {
    Hidden,
    Node {
        node_id: NodeId,
        actions: Vec<NodeAction>,
    },
    Edge {
        edge_id: EdgeId,
        anchor: Position,
        actions: Vec<EdgeAction>,
    },
}

/// Tracks the selection and derives the context menu from it
#[derive(Debug, Clone, Default)]
pub struct SelectionController {
    selection: Selection,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Select a node; returns whether the selection changed
    pub fn select_node(&mut self, id: impl Into<NodeId>) -> bool {
        self.set(Selection::Node { id: id.into() })
    }

    /// Select an edge anchored at a canvas position
    pub fn select_edge(&mut self, id: impl Into<EdgeId>, anchor: Position) -> bool {
        self.set(Selection::Edge {
            id: id.into(),
            anchor,
        })
    }

    pub fn clear(&mut self) -> bool {
        self.set(Selection::None)
    }

    /// Drop the selection if its entity is no longer in the graph
    pub fn reconcile(&mut self, graph: &WorkflowGraph) -> bool {
        let stale = match &self.selection {
            Selection::None => false,
            Selection::Node { id } => !graph.contains_node(id),
            Selection::Edge { id, .. } => !graph.contains_edge(id),
        };
        if stale {
            log::debug!("Selected entity removed, clearing selection");
            self.clear()
        } else {
            false
        }
    }

    pub fn context_menu(&self) -> ContextMenu {
        match &self.selection {
            Selection::None => ContextMenu::Hidden,
            Selection::Node { id } => ContextMenu::Node {
                node_id: id.clone(),
                actions: vec![NodeAction::Edit, NodeAction::Delete, NodeAction::Duplicate],
            },
            Selection::Edge { id, anchor } => ContextMenu::Edge {
                edge_id: id.clone(),
                anchor: *anchor,
                actions: vec![EdgeAction::InsertNodeBetween, EdgeAction::Cancel],
            },
        }
    }

    fn set(&mut self, next: Selection) -> bool {
        if self.selection == next {
            return false;
        }
        self.selection = next;
        true
    }
}
