//! Core types for workflow graphs
//!
//! These types define the structure of an edited workflow: nodes placed on
//! the canvas, the edges wiring them, and the workflow's own lifecycle.

use std::collections::{HashSet, VecDeque};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};
use crate::node_config::NodeConfig;

/// Unique identifier for a node
pub type NodeId = String;

/// Unique identifier for an edge
pub type EdgeId = String;

/// Backend-assigned identifier for a saved workflow
pub type WorkflowId = String;

/// A point in canvas space (independent of pan and zoom)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Point halfway between two positions
    pub fn midpoint(self, other: Position) -> Position {
        Position::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    /// This position shifted by the given canvas delta
    pub fn offset(self, dx: f64, dy: f64) -> Position {
        Position::new(self.x + dx, self.y + dy)
    }
}

/// Category of a node type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCategory {
    /// Entry points (webhooks, schedules, manual runs)
    #[serde(alias = "Triggers")]
    Trigger,
    /// Control flow (conditions, delays)
    #[serde(alias = "Logic")]
    Logic,
    /// API calls and data shaping
    #[serde(alias = "API & Data")]
    Data,
    /// Messaging integrations
    #[serde(alias = "Communication")]
    Communication,
    /// Project tooling integrations
    #[serde(alias = "Project Tools")]
    Tooling,
    /// Cloud service integrations
    #[serde(alias = "Cloud Services")]
    Cloud,
    /// Category this build does not know about
    #[serde(other)]
    Unknown,
}

impl NodeCategory {
    /// All known categories in palette order
    pub const ALL: [NodeCategory; 6] = [
        NodeCategory::Trigger,
        NodeCategory::Logic,
        NodeCategory::Data,
        NodeCategory::Communication,
        NodeCategory::Tooling,
        NodeCategory::Cloud,
    ];

    /// Heading shown in the node palette
    pub fn display_name(&self) -> &'static str {
        match self {
            NodeCategory::Trigger => "Triggers",
            NodeCategory::Logic => "Logic",
            NodeCategory::Data => "API & Data",
            NodeCategory::Communication => "Communication",
            NodeCategory::Tooling => "Project Tools",
            NodeCategory::Cloud => "Cloud Services",
            NodeCategory::Unknown => "Other",
        }
    }

    /// Triggers start a workflow and never receive incoming edges
    pub fn accepts_incoming(&self) -> bool {
        !matches!(self, NodeCategory::Trigger)
    }
}

/// A node instance on the canvas
///
/// The subtype is not stored separately: it is always the subtype of the
/// node's configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "NodeRecord", into = "NodeRecord")]
pub struct GraphNode {
    /// Unique identifier for this node instance
    pub id: NodeId,
    /// Category half of the type reference
    pub category: NodeCategory,
    /// Display label
    pub label: String,
    /// Position in canvas units
    pub position: Position,
    /// Subtype-specific configuration
    pub config: NodeConfig,
}

impl GraphNode {
    pub fn new(
        id: impl Into<String>,
        category: NodeCategory,
        label: impl Into<String>,
        position: Position,
        config: NodeConfig,
    ) -> Self {
        Self {
            id: id.into(),
            category,
            label: label.into(),
            position,
            config,
        }
    }

    /// Subtype half of the type reference
    pub fn subtype(&self) -> &str {
        self.config.subtype()
    }
}

/// Wire shape of a node: `{id, type, subtype, label?, position, config}`
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeRecord {
    id: NodeId,
    #[serde(rename = "type")]
    category: NodeCategory,
    subtype: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    label: String,
    position: Position,
    #[serde(default)]
    config: serde_json::Value,
}

impl From<NodeRecord> for GraphNode {
    fn from(record: NodeRecord) -> Self {
        let config = NodeConfig::from_value(&record.subtype, record.config);
        GraphNode {
            id: record.id,
            category: record.category,
            label: record.label,
            position: record.position,
            config,
        }
    }
}

impl From<GraphNode> for NodeRecord {
    fn from(node: GraphNode) -> Self {
        NodeRecord {
            subtype: node.config.subtype().to_string(),
            config: node.config.to_value(),
            id: node.id,
            category: node.category,
            label: node.label,
            position: node.position,
        }
    }
}

/// Cosmetic edge hints; never affect graph semantics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgePresentation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker_end: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub animated: bool,
}

impl EdgePresentation {
    /// Hints applied to edges drawn by the connect gesture
    pub fn standard() -> Self {
        Self {
            style: Some(serde_json::json!({
                "strokeWidth": 1,
                "stroke": "#94A3B8",
                "opacity": 0.8,
            })),
            marker_end: Some(serde_json::json!({
                "type": "arrowclosed",
                "width": 10,
                "height": 10,
                "color": "#94A3B8",
            })),
            animated: true,
        }
    }
}

/// A directed edge between two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    /// Unique identifier for this edge
    pub id: EdgeId,
    /// Source node ID
    pub source: NodeId,
    /// Target node ID
    pub target: NodeId,
    #[serde(flatten)]
    pub presentation: EdgePresentation,
}

impl GraphEdge {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            presentation: EdgePresentation::default(),
        }
    }

    pub fn with_presentation(mut self, presentation: EdgePresentation) -> Self {
        self.presentation = presentation;
        self
    }

    /// Whether this edge touches the given node
    pub fn is_incident_to(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }
}

/// Nodes and edges of a workflow
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowGraph {
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
}

impl WorkflowGraph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a node by ID
    pub fn find_node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Find a node by ID (mutable)
    pub fn find_node_mut(&mut self, id: &str) -> Option<&mut GraphNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Find an edge by ID
    pub fn find_edge(&self, id: &str) -> Option<&GraphEdge> {
        self.edges.iter().find(|e| e.id == id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.find_node(id).is_some()
    }

    pub fn contains_edge(&self, id: &str) -> bool {
        self.find_edge(id).is_some()
    }

    /// Get edges coming into a node
    pub fn incoming_edges<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges.iter().filter(move |e| e.target == node_id)
    }

    /// Get edges going out of a node
    pub fn outgoing_edges<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges.iter().filter(move |e| e.source == node_id)
    }

    /// Get the IDs of nodes that feed into this node
    pub fn get_dependencies(&self, node_id: &str) -> Vec<NodeId> {
        self.incoming_edges(node_id).map(|e| e.source.clone()).collect()
    }

    /// Get the IDs of nodes fed by this node
    pub fn get_dependents(&self, node_id: &str) -> Vec<NodeId> {
        self.outgoing_edges(node_id).map(|e| e.target.clone()).collect()
    }

    /// Whether an edge `source -> target` already exists
    pub fn has_connection(&self, source: &str, target: &str) -> bool {
        self.edges.iter().any(|e| e.source == source && e.target == target)
    }

    /// Whether `to` is reachable from `from` by following edges forward
    pub fn reaches(&self, from: &str, to: &str) -> bool {
        if from == to {
            return true;
        }
        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.push_back(from);
        visited.insert(from);

        while let Some(current) = queue.pop_front() {
            for edge in self.outgoing_edges(current) {
                if edge.target == to {
                    return true;
                }
                if visited.insert(edge.target.as_str()) {
                    queue.push_back(edge.target.as_str());
                }
            }
        }
        false
    }

    /// Edge endpoints that do not resolve to a node, as `(edge_id, node_id)`
    pub fn dangling_references(&self) -> Vec<(EdgeId, NodeId)> {
        let node_ids: HashSet<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
        let mut dangling = Vec::new();
        for edge in &self.edges {
            for endpoint in [&edge.source, &edge.target] {
                if !node_ids.contains(endpoint.as_str()) {
                    dangling.push((edge.id.clone(), endpoint.clone()));
                }
            }
        }
        dangling
    }

    /// Edges whose source and target are the same node
    pub fn self_loops(&self) -> impl Iterator<Item = &GraphEdge> {
        self.edges.iter().filter(|e| e.source == e.target)
    }

    /// Fail on the first broken invariant a store snapshot must hold
    ///
    /// Node ids and edge ids are unique, every endpoint resolves and no
    /// edge joins a node to itself.
    pub fn check_consistency(&self) -> Result<()> {
        let mut node_ids = HashSet::new();
        if let Some(node) = self.nodes.iter().find(|n| !node_ids.insert(n.id.as_str())) {
            return Err(GraphError::DuplicateNodeId(node.id.clone()));
        }
        let mut edge_ids = HashSet::new();
        if let Some(edge) = self.edges.iter().find(|e| !edge_ids.insert(e.id.as_str())) {
            return Err(GraphError::DuplicateEdgeId(edge.id.clone()));
        }
        if let Some((edge_id, node_id)) = self.dangling_references().into_iter().next() {
            return Err(GraphError::DanglingEdge { edge_id, node_id });
        }
        if let Some(edge) = self.self_loops().next() {
            return Err(GraphError::SelfLoop {
                edge_id: edge.id.clone(),
                node_id: edge.source.clone(),
            });
        }
        Ok(())
    }
}

/// Lifecycle status of a workflow
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    #[default]
    Draft,
    Active,
    Error,
}

impl WorkflowStatus {
    /// Whether the lifecycle allows moving from `self` to `next`
    ///
    /// `draft -> active`, anything `-> error`, `error -> draft`; staying put
    /// is always allowed.
    pub fn can_transition_to(self, next: WorkflowStatus) -> bool {
        use WorkflowStatus::*;
        matches!(
            (self, next),
            (Draft, Draft) | (Active, Active) | (Error, Error) | (Draft, Active) | (_, Error) | (Error, Draft)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Draft => "draft",
            WorkflowStatus::Active => "active",
            WorkflowStatus::Error => "error",
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity, naming and lifecycle of a workflow
///
/// The status is only changed through [`WorkflowHeader::transition`] (user
/// intent, checked against the lifecycle) or
/// [`WorkflowHeader::adopt_status`] (the backend's authoritative value).
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowHeader {
    /// Absent until the workflow has been created on the backend
    pub id: Option<WorkflowId>,
    pub name: String,
    pub description: String,
    status: WorkflowStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl WorkflowHeader {
    /// A new unsaved draft
    pub fn draft(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: String::new(),
            status: WorkflowStatus::Draft,
            created_at: None,
            updated_at: None,
        }
    }

    /// Header of a workflow that already exists on the backend
    pub fn saved(id: impl Into<String>, name: impl Into<String>, status: WorkflowStatus) -> Self {
        Self {
            id: Some(id.into()),
            status,
            ..Self::draft(name)
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn status(&self) -> WorkflowStatus {
        self.status
    }

    pub fn is_saved(&self) -> bool {
        self.id.is_some()
    }

    /// Move to a new status if the lifecycle allows it
    pub fn transition(&mut self, next: WorkflowStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(GraphError::InvalidStatusTransition {
                from: self.status,
                to: next,
            });
        }
        if self.status != next {
            log::debug!("Workflow status {} -> {}", self.status, next);
            self.status = next;
        }
        Ok(())
    }

    /// Take the status reported by the backend as-is
    pub fn adopt_status(&mut self, status: WorkflowStatus) {
        self.status = status;
    }
}

/// A workflow with its graph, as loaded or about to be saved
#[derive(Debug, Clone, PartialEq)]
pub struct Workflow {
    pub header: WorkflowHeader,
    pub graph: WorkflowGraph,
}

impl Workflow {
    /// A new empty draft
    pub fn draft(name: impl Into<String>) -> Self {
        Self {
            header: WorkflowHeader::draft(name),
            graph: WorkflowGraph::new(),
        }
    }
}
