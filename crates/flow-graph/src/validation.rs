//! Graph validation for workflow graphs
//!
//! Two entry points: [`validate_connection`] answers whether the connect
//! gesture may add one particular edge, and [`validate_workflow`] reports
//! every structural problem of a whole graph.

use std::collections::{HashMap, HashSet, VecDeque};

use thiserror::Error;

use crate::catalog::NodeTypeCatalog;
use crate::types::WorkflowGraph;

/// Why a proposed connection was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    #[error("Unknown node '{0}'")]
    UnknownNode(String),

    #[error("Node '{0}' cannot connect to itself")]
    SelfLoop(String),

    #[error("Nodes '{source_id}' and '{target_id}' are already connected")]
    AlreadyConnected { source_id: String, target_id: String },

    #[error("Trigger node '{0}' cannot have incoming connections")]
    TriggerTarget(String),

    #[error("Connecting '{source_id}' to '{target_id}' would create a cycle")]
    WouldCycle { source_id: String, target_id: String },
}

/// Validation error with location context
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Cycle detected in the graph
    CycleDetected,
    /// An edge references a non-existent node
    UnknownNode { edge_id: String, node_id: String },
    /// A node's subtype is not in the catalog
    UnknownNodeType { node_id: String, subtype: String },
    /// Two nodes share an id
    DuplicateNodeId { node_id: String },
    /// Two edges share an id
    DuplicateEdgeId { edge_id: String },
    /// An edge leads into a trigger
    TriggerHasIncoming { edge_id: String, node_id: String },
    /// An edge joins a node to itself
    SelfLoop { edge_id: String, node_id: String },
}

impl ValidationError {
    /// Whether this error means the graph cannot be rendered at all
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::UnknownNode { .. }
                | Self::DuplicateNodeId { .. }
                | Self::DuplicateEdgeId { .. }
                | Self::SelfLoop { .. }
        )
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CycleDetected => write!(f, "Cycle detected in graph"),
            Self::UnknownNode { edge_id, node_id } => {
                write!(f, "Edge '{}' references unknown node '{}'", edge_id, node_id)
            }
            Self::UnknownNodeType { node_id, subtype } => {
                write!(f, "Unknown node type '{}' for node '{}'", subtype, node_id)
            }
            Self::DuplicateNodeId { node_id } => write!(f, "Duplicate node id '{}'", node_id),
            Self::DuplicateEdgeId { edge_id } => write!(f, "Duplicate edge id '{}'", edge_id),
            Self::TriggerHasIncoming { edge_id, node_id } => {
                write!(f, "Edge '{}' leads into trigger '{}'", edge_id, node_id)
            }
            Self::SelfLoop { edge_id, node_id } => {
                write!(f, "Edge '{}' connects '{}' to itself", edge_id, node_id)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Check whether `source -> target` may be added to the graph
pub fn validate_connection(
    graph: &WorkflowGraph,
    source: &str,
    target: &str,
) -> Result<(), ConnectionError> {
    if !graph.contains_node(source) {
        return Err(ConnectionError::UnknownNode(source.to_string()));
    }
    let target_node = graph
        .find_node(target)
        .ok_or_else(|| ConnectionError::UnknownNode(target.to_string()))?;

    if source == target {
        return Err(ConnectionError::SelfLoop(source.to_string()));
    }
    if !target_node.category.accepts_incoming() {
        return Err(ConnectionError::TriggerTarget(target.to_string()));
    }
    if graph.has_connection(source, target) {
        return Err(ConnectionError::AlreadyConnected {
            source_id: source.to_string(),
            target_id: target.to_string(),
        });
    }
    // The new edge closes a cycle exactly when target already reaches source
    if graph.reaches(target, source) {
        return Err(ConnectionError::WouldCycle {
            source_id: source.to_string(),
            target_id: target.to_string(),
        });
    }
    Ok(())
}

/// Validate a whole workflow graph
///
/// Returns all validation errors found (not just the first).
/// Pass a catalog to also check node types.
pub fn validate_workflow(
    graph: &WorkflowGraph,
    catalog: Option<&NodeTypeCatalog>,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    validate_unique_ids(graph, &mut errors);
    validate_edge_references(graph, &mut errors);
    validate_self_loops(graph, &mut errors);
    validate_trigger_inputs(graph, &mut errors);
    detect_cycles(graph, &mut errors);

    if let Some(catalog) = catalog {
        validate_node_types(graph, catalog, &mut errors);
    }

    errors
}

/// Only the errors that make a graph unrenderable
pub fn malformed_errors(graph: &WorkflowGraph) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    validate_unique_ids(graph, &mut errors);
    validate_edge_references(graph, &mut errors);
    validate_self_loops(graph, &mut errors);
    errors
}

fn validate_unique_ids(graph: &WorkflowGraph, errors: &mut Vec<ValidationError>) {
    let mut node_ids = HashSet::new();
    for node in &graph.nodes {
        if !node_ids.insert(node.id.as_str()) {
            errors.push(ValidationError::DuplicateNodeId {
                node_id: node.id.clone(),
            });
        }
    }
    let mut edge_ids = HashSet::new();
    for edge in &graph.edges {
        if !edge_ids.insert(edge.id.as_str()) {
            errors.push(ValidationError::DuplicateEdgeId {
                edge_id: edge.id.clone(),
            });
        }
    }
}

/// Check that all edge source/target nodes exist
fn validate_edge_references(graph: &WorkflowGraph, errors: &mut Vec<ValidationError>) {
    errors.extend(
        graph
            .dangling_references()
            .into_iter()
            .map(|(edge_id, node_id)| ValidationError::UnknownNode { edge_id, node_id }),
    );
}

fn validate_self_loops(graph: &WorkflowGraph, errors: &mut Vec<ValidationError>) {
    errors.extend(graph.self_loops().map(|edge| ValidationError::SelfLoop {
        edge_id: edge.id.clone(),
        node_id: edge.source.clone(),
    }));
}

fn validate_trigger_inputs(graph: &WorkflowGraph, errors: &mut Vec<ValidationError>) {
    for edge in &graph.edges {
        if let Some(node) = graph.find_node(&edge.target) {
            if !node.category.accepts_incoming() {
                errors.push(ValidationError::TriggerHasIncoming {
                    edge_id: edge.id.clone(),
                    node_id: node.id.clone(),
                });
            }
        }
    }
}

/// Detect cycles using Kahn's algorithm (topological sort)
fn detect_cycles(graph: &WorkflowGraph, errors: &mut Vec<ValidationError>) {
    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    for node in &graph.nodes {
        in_degree.insert(&node.id, 0);
    }
    // Dangling edges are reported separately and ignored here
    let edges: Vec<_> = graph
        .edges
        .iter()
        .filter(|e| in_degree.contains_key(e.source.as_str()) && in_degree.contains_key(e.target.as_str()))
        .collect();
    for edge in &edges {
        if let Some(deg) = in_degree.get_mut(edge.target.as_str()) {
            *deg += 1;
        }
    }

    let mut queue: VecDeque<&str> = in_degree
        .iter()
        .filter(|(_, &deg)| deg == 0)
        .map(|(&id, _)| id)
        .collect();

    let mut visited = 0;
    while let Some(node_id) = queue.pop_front() {
        visited += 1;
        for edge in &edges {
            if edge.source == node_id {
                if let Some(deg) = in_degree.get_mut(edge.target.as_str()) {
                    *deg -= 1;
                    if *deg == 0 {
                        queue.push_back(&edge.target);
                    }
                }
            }
        }
    }

    if visited < in_degree.len() {
        errors.push(ValidationError::CycleDetected);
    }
}

/// Check that all nodes have known types in the catalog
fn validate_node_types(
    graph: &WorkflowGraph,
    catalog: &NodeTypeCatalog,
    errors: &mut Vec<ValidationError>,
) {
    for node in &graph.nodes {
        if !catalog.contains(node.subtype()) {
            errors.push(ValidationError::UnknownNodeType {
                node_id: node.id.clone(),
                subtype: node.subtype().to_string(),
            });
        }
    }
}
