//! Graph Store: canonical node/edge collections with batch mutation
//!
//! The store publishes immutable [`WorkflowGraph`] snapshots behind an
//! `Arc`. A batch of [`GraphChange`] directives is applied to a private
//! copy and only then published, so no observer ever sees a half-applied
//! batch. Directives that would break the graph invariants (or that refer
//! to something already gone) are skipped individually and reported in the
//! [`ApplyReport`]; the rest of the batch still applies.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::node_config::NodeConfig;
use crate::types::{EdgeId, GraphEdge, GraphNode, NodeId, Position, WorkflowGraph};

/// A single graph change directive
#[derive(Debug, Clone, PartialEq)]
pub enum GraphChange {
    AddNode(GraphNode),
    /// Also removes every edge incident to the node
    RemoveNode(NodeId),
    AddEdge(GraphEdge),
    RemoveEdge(EdgeId),
    MoveNode { id: NodeId, position: Position },
    ConfigureNode { id: NodeId, config: NodeConfig },
    RelabelNode { id: NodeId, label: String },
}

impl GraphChange {
    fn kind(&self) -> &'static str {
        match self {
            GraphChange::AddNode(_) => "add_node",
            GraphChange::RemoveNode(_) => "remove_node",
            GraphChange::AddEdge(_) => "add_edge",
            GraphChange::RemoveEdge(_) => "remove_edge",
            GraphChange::MoveNode { .. } => "move_node",
            GraphChange::ConfigureNode { .. } => "configure_node",
            GraphChange::RelabelNode { .. } => "relabel_node",
        }
    }
}

/// Why a directive was not applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Referenced node no longer exists
    MissingNode,
    /// Referenced edge no longer exists
    MissingEdge,
    /// A node or edge with this id already exists
    DuplicateId,
    /// An edge between the same two nodes already exists
    DuplicateConnection,
    /// Source and target are the same node
    SelfLoop,
    /// An edge endpoint is not in the node set
    DanglingEndpoint,
}

/// A directive that was skipped, by position in its batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedChange {
    pub index: usize,
    pub reason: SkipReason,
}

/// Result of applying one batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Revision of the snapshot published by this batch
    pub revision: u64,
    /// Number of directives that took effect
    pub applied: usize,
    /// Directives that were skipped
    pub skipped: Vec<SkippedChange>,
    /// Nodes removed by this batch
    pub removed_nodes: Vec<NodeId>,
    /// Edges removed by this batch, including cascades
    pub removed_edges: Vec<EdgeId>,
}

impl ApplyReport {
    /// Whether the batch changed the graph at all
    pub fn changed(&self) -> bool {
        self.applied > 0
    }
}

/// Owner of the canonical graph snapshot
#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    snapshot: Arc<WorkflowGraph>,
    revision: u64,
}

impl GraphStore {
    /// Create a store holding an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store from an existing graph, which must be consistent
    pub fn with_graph(graph: WorkflowGraph) -> Result<Self> {
        graph.check_consistency()?;
        Ok(Self {
            snapshot: Arc::new(graph),
            revision: 0,
        })
    }

    /// The current snapshot; cheap to clone and never mutated
    pub fn snapshot(&self) -> Arc<WorkflowGraph> {
        Arc::clone(&self.snapshot)
    }

    /// Borrow the current graph
    pub fn graph(&self) -> &WorkflowGraph {
        &self.snapshot
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Replace the whole graph (load, undo, redo)
    ///
    /// Rejects a graph that fails `check_consistency` and leaves the store
    /// unchanged.
    pub fn replace(&mut self, graph: WorkflowGraph) -> Result<u64> {
        graph.check_consistency()?;
        self.snapshot = Arc::new(graph);
        self.revision += 1;
        log::debug!("Graph replaced at revision {}", self.revision);
        Ok(self.revision)
    }

    /// Apply an ordered batch of directives atomically
    pub fn apply(&mut self, changes: &[GraphChange]) -> ApplyReport {
        let mut graph = (*self.snapshot).clone();
        let mut report = ApplyReport::default();

        for (index, change) in changes.iter().enumerate() {
            match apply_one(&mut graph, change, &mut report) {
                Ok(()) => report.applied += 1,
                Err(reason) => {
                    log::debug!("Skipping {} at index {}: {:?}", change.kind(), index, reason);
                    report.skipped.push(SkippedChange { index, reason });
                }
            }
        }

        if report.changed() {
            self.snapshot = Arc::new(graph);
            self.revision += 1;
        }
        report.revision = self.revision;
        log::debug!(
            "Applied batch: {} applied, {} skipped, revision {}",
            report.applied,
            report.skipped.len(),
            report.revision
        );
        report
    }
}

fn apply_one(
    graph: &mut WorkflowGraph,
    change: &GraphChange,
    report: &mut ApplyReport,
) -> std::result::Result<(), SkipReason> {
    match change {
        GraphChange::AddNode(node) => {
            if graph.contains_node(&node.id) {
                return Err(SkipReason::DuplicateId);
            }
            graph.nodes.push(node.clone());
        }
        GraphChange::RemoveNode(id) => {
            let Some(pos) = graph.nodes.iter().position(|n| &n.id == id) else {
                return Err(SkipReason::MissingNode);
            };
            graph.nodes.remove(pos);
            graph.edges.retain(|edge| {
                let incident = edge.is_incident_to(id);
                if incident {
                    report.removed_edges.push(edge.id.clone());
                }
                !incident
            });
            report.removed_nodes.push(id.clone());
        }
        GraphChange::AddEdge(edge) => {
            if graph.contains_edge(&edge.id) {
                return Err(SkipReason::DuplicateId);
            }
            if edge.source == edge.target {
                return Err(SkipReason::SelfLoop);
            }
            if !graph.contains_node(&edge.source) || !graph.contains_node(&edge.target) {
                return Err(SkipReason::DanglingEndpoint);
            }
            if graph.has_connection(&edge.source, &edge.target) {
                return Err(SkipReason::DuplicateConnection);
            }
            graph.edges.push(edge.clone());
        }
        GraphChange::RemoveEdge(id) => {
            let Some(pos) = graph.edges.iter().position(|e| &e.id == id) else {
                return Err(SkipReason::MissingEdge);
            };
            graph.edges.remove(pos);
            report.removed_edges.push(id.clone());
        }
        GraphChange::MoveNode { id, position } => {
            let node = graph.find_node_mut(id).ok_or(SkipReason::MissingNode)?;
            node.position = *position;
        }
        GraphChange::ConfigureNode { id, config } => {
            let node = graph.find_node_mut(id).ok_or(SkipReason::MissingNode)?;
            node.config = config.clone();
        }
        GraphChange::RelabelNode { id, label } => {
            let node = graph.find_node_mut(id).ok_or(SkipReason::MissingNode)?;
            node.label = label.clone();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;
    use crate::node_config::subtypes;
    use crate::types::NodeCategory;
    use proptest::prelude::*;

    fn node(id: &str) -> GraphNode {
        GraphNode::new(
            id,
            NodeCategory::Logic,
            id,
            Position::default(),
            NodeConfig::default_for(subtypes::CONDITION),
        )
    }

    fn store_with(nodes: &[&str], edges: &[(&str, &str, &str)]) -> GraphStore {
        let mut store = GraphStore::new();
        let mut changes: Vec<GraphChange> =
            nodes.iter().map(|id| GraphChange::AddNode(node(id))).collect();
        changes.extend(
            edges
                .iter()
                .map(|(id, s, t)| GraphChange::AddEdge(GraphEdge::new(*id, *s, *t))),
        );
        let report = store.apply(&changes);
        assert!(report.skipped.is_empty());
        store
    }

    #[test]
    fn test_remove_node_cascades() {
        let mut store = store_with(&["a", "b", "c"], &[("e1", "a", "b"), ("e2", "b", "c"), ("e3", "a", "c")]);

        let report = store.apply(&[GraphChange::RemoveNode("b".into())]);

        assert_eq!(report.removed_nodes, vec!["b"]);
        assert_eq!(report.removed_edges, vec!["e1", "e2"]);
        let graph = store.graph();
        assert!(graph.edges.iter().all(|e| !e.is_incident_to("b")));
        assert_eq!(graph.edges.len(), 1);
    }

    #[test]
    fn test_missing_ids_are_noops() {
        let mut store = store_with(&["a"], &[]);
        let before = store.revision();

        let report = store.apply(&[
            GraphChange::RemoveNode("ghost".into()),
            GraphChange::RemoveEdge("ghost-edge".into()),
            GraphChange::MoveNode {
                id: "ghost".into(),
                position: Position::new(1.0, 1.0),
            },
        ]);

        assert_eq!(report.applied, 0);
        assert_eq!(report.skipped.len(), 3);
        assert_eq!(store.revision(), before);
    }

    #[test]
    fn test_rejects_dangling_and_self_loop_edges() {
        let mut store = store_with(&["a", "b"], &[]);

        let report = store.apply(&[
            GraphChange::AddEdge(GraphEdge::new("e1", "a", "missing")),
            GraphChange::AddEdge(GraphEdge::new("e2", "a", "a")),
            GraphChange::AddEdge(GraphEdge::new("e3", "a", "b")),
            GraphChange::AddEdge(GraphEdge::new("e4", "a", "b")),
        ]);

        let reasons: Vec<_> = report.skipped.iter().map(|s| s.reason.clone()).collect();
        assert_eq!(
            reasons,
            vec![
                SkipReason::DanglingEndpoint,
                SkipReason::SelfLoop,
                SkipReason::DuplicateConnection
            ]
        );
        assert_eq!(store.graph().edges.len(), 1);
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut store = store_with(&["a"], &[]);
        let batch = [GraphChange::AddNode(node("b"))];

        store.apply(&batch);
        let report = store.apply(&batch);

        assert_eq!(report.skipped[0].reason, SkipReason::DuplicateId);
        assert_eq!(store.graph().nodes.len(), 2);
    }

    #[test]
    fn test_earlier_snapshots_are_untouched() {
        let mut store = store_with(&["a"], &[]);
        let before = store.snapshot();

        store.apply(&[GraphChange::MoveNode {
            id: "a".into(),
            position: Position::new(5.0, 5.0),
        }]);

        assert_eq!(before.find_node("a").unwrap().position, Position::default());
        assert_eq!(store.graph().find_node("a").unwrap().position, Position::new(5.0, 5.0));
    }

    #[test]
    fn test_order_within_batch_matters() {
        let mut store = GraphStore::new();
        let report = store.apply(&[
            GraphChange::AddEdge(GraphEdge::new("e1", "a", "b")),
            GraphChange::AddNode(node("a")),
            GraphChange::AddNode(node("b")),
        ]);
        assert_eq!(report.skipped[0].reason, SkipReason::DanglingEndpoint);
        assert!(store.graph().edges.is_empty());
    }

    #[test]
    fn test_replace_rejects_inconsistent_graph() {
        let mut store = store_with(&["a"], &[]);
        let mut bad = WorkflowGraph::new();
        bad.edges.push(GraphEdge::new("e1", "x", "y"));

        assert!(store.replace(bad).is_err());
        assert_eq!(store.graph().nodes.len(), 1);
    }

    #[test]
    fn test_replace_rejects_self_loop_and_duplicate_ids() {
        let mut store = store_with(&["a", "b"], &[("e1", "a", "b")]);
        let revision = store.revision();

        let mut looped = WorkflowGraph::new();
        looped.nodes.push(node("a"));
        looped.edges.push(GraphEdge::new("e1", "a", "a"));
        assert!(matches!(
            store.replace(looped),
            Err(GraphError::SelfLoop { .. })
        ));

        let mut twins = WorkflowGraph::new();
        twins.nodes.push(node("a"));
        twins.nodes.push(node("a"));
        assert!(matches!(
            store.replace(twins),
            Err(GraphError::DuplicateNodeId(_))
        ));
        assert!(GraphStore::with_graph(store.graph().clone()).is_ok());

        assert_eq!(store.revision(), revision);
        assert_eq!(store.graph().nodes.len(), 2);
        assert_eq!(store.graph().edges[0].target, "b");
    }

    const IDS: [&str; 5] = ["n0", "n1", "n2", "n3", "n4"];

    fn change_strategy() -> impl Strategy<Value = GraphChange> {
        let id = prop::sample::select(IDS.to_vec());
        prop_oneof![
            id.clone().prop_map(|id| GraphChange::AddNode(node(id))),
            id.clone().prop_map(|id| GraphChange::RemoveNode(id.to_string())),
            (0u32..20, id.clone(), id.clone()).prop_map(|(n, s, t)| {
                GraphChange::AddEdge(GraphEdge::new(format!("e{}", n), s, t))
            }),
            (0u32..20).prop_map(|n| GraphChange::RemoveEdge(format!("e{}", n))),
            (id, -100.0..100.0f64, -100.0..100.0f64).prop_map(|(id, x, y)| {
                GraphChange::MoveNode {
                    id: id.to_string(),
                    position: Position::new(x, y),
                }
            }),
        ]
    }

    proptest! {
        /// Every published snapshot has only resolvable edge endpoints
        #[test]
        fn prop_batches_keep_graph_consistent(
            batches in prop::collection::vec(prop::collection::vec(change_strategy(), 0..8), 1..12)
        ) {
            let mut store = GraphStore::new();
            for batch in &batches {
                store.apply(batch);
                prop_assert!(store.graph().dangling_references().is_empty());
            }
        }

        /// After removing a node no edge mentions it
        #[test]
        fn prop_remove_node_leaves_no_incident_edges(
            setup in prop::collection::vec(change_strategy(), 0..30),
            victim in prop::sample::select(IDS.to_vec())
        ) {
            let mut store = GraphStore::new();
            store.apply(&setup);
            store.apply(&[GraphChange::RemoveNode(victim.to_string())]);
            prop_assert!(store.graph().edges.iter().all(|e| !e.is_incident_to(victim)));
        }
    }
}
