//! Fluent builder for workflow graphs
//!
//! Provides a fluent API for constructing graphs programmatically, mainly
//! for tests and seeded fixtures. Nodes are laid out left to right unless
//! a position is given.

use crate::catalog::NodeTypeCatalog;
use crate::node_config::{subtypes, NodeConfig};
use crate::types::{GraphEdge, GraphNode, NodeCategory, Position, Workflow, WorkflowGraph};

/// Horizontal spacing of auto-placed nodes
const AUTO_SPACING: f64 = 200.0;

/// Fluent builder for constructing workflow graphs
///
/// # Example
///
/// ```ignore
/// let graph = WorkflowBuilder::new()
///     .trigger("start")
///     .step("notify", "slack")
///     .with_config(serde_json::json!({"channel": "#ops"}))
///     .connect("start", "notify")
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct WorkflowBuilder {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    edge_counter: usize,
}

impl WorkflowBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node with an explicit category and subtype
    pub fn node(self, id: impl Into<String>, category: NodeCategory, subtype: &str) -> Self {
        let position = Position::new(self.nodes.len() as f64 * AUTO_SPACING, 0.0);
        self.add_node(id, category, subtype, position)
    }

    /// Add a node at a position
    pub fn add_node(
        mut self,
        id: impl Into<String>,
        category: NodeCategory,
        subtype: &str,
        position: Position,
    ) -> Self {
        let id = id.into();
        self.nodes.push(GraphNode::new(
            id.clone(),
            category,
            id,
            position,
            NodeConfig::default_for(subtype),
        ));
        self
    }

    /// Add a manual trigger
    pub fn trigger(self, id: impl Into<String>) -> Self {
        self.node(id, NodeCategory::Trigger, subtypes::MANUAL)
    }

    /// Add a node whose category is looked up in the builtin catalog
    pub fn step(self, id: impl Into<String>, subtype: &str) -> Self {
        let category = NodeTypeCatalog::builtin()
            .find(subtype)
            .map(|d| d.category)
            .unwrap_or(NodeCategory::Unknown);
        self.node(id, category, subtype)
    }

    /// Set the configuration of the most recently added node
    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        if let Some(node) = self.nodes.last_mut() {
            node.config = NodeConfig::from_value(node.config.subtype(), config);
        }
        self
    }

    /// Set the label of the most recently added node
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        if let Some(node) = self.nodes.last_mut() {
            node.label = label.into();
        }
        self
    }

    /// Add an edge between two nodes (auto-generates edge ID)
    pub fn connect(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.edge_counter += 1;
        let id = format!("edge-{}", self.edge_counter);
        self.edges.push(GraphEdge::new(id, source, target));
        self
    }

    /// Add an edge with an explicit ID
    pub fn connect_with_id(
        mut self,
        edge_id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        self.edges.push(GraphEdge::new(edge_id, source, target));
        self
    }

    /// Build the graph without validation
    pub fn build(self) -> WorkflowGraph {
        WorkflowGraph {
            nodes: self.nodes,
            edges: self.edges,
        }
    }

    /// Build an unsaved draft workflow around the graph
    pub fn build_draft(self, name: impl Into<String>) -> Workflow {
        let mut workflow = Workflow::draft(name);
        workflow.graph = self.build();
        workflow
    }
}
