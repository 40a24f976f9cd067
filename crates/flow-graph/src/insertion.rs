//! Mid-edge node insertion
//!
//! Splitting edge `e = (source, target)` with a new node `n` replaces `e`
//! by `(source, n)` and `(n, target)` in a single batch, so observers see
//! either the old graph or the finished split.
//!
//! If `e` is already gone when the insertion runs, the removal is skipped
//! by the store and the node is still added, without edges. The later
//! gesture wins instead of the insertion failing.

use crate::catalog::NodeTypeDescriptor;
use crate::error::{GraphError, Result};
use crate::ids::IdSource;
use crate::selection::{Selection, SelectionController};
use crate::store::{ApplyReport, GraphChange, GraphStore};
use crate::types::{GraphEdge, GraphNode, NodeId, Position, WorkflowGraph};

/// The batch that performs one insertion
#[derive(Debug, Clone, PartialEq)]
pub struct InsertionPlan {
    pub node_id: NodeId,
    pub changes: Vec<GraphChange>,
}

/// Outcome of an applied insertion
#[derive(Debug, Clone)]
pub struct Insertion {
    pub node_id: NodeId,
    /// Whether the edge still existed and was split
    pub split: bool,
    pub report: ApplyReport,
}

/// Build the batch that inserts a node of `descriptor` on `edge_id`
pub fn plan_insertion(
    graph: &WorkflowGraph,
    edge_id: &str,
    anchor: Position,
    descriptor: &NodeTypeDescriptor,
    ids: &mut dyn IdSource,
) -> InsertionPlan {
    let node_id = ids.node_id();
    let node = GraphNode::new(
        node_id.clone(),
        descriptor.category,
        descriptor.label.clone(),
        anchor,
        descriptor.instantiate_config(),
    );

    let mut changes = vec![
        GraphChange::RemoveEdge(edge_id.to_string()),
        GraphChange::AddNode(node),
    ];

    match graph.find_edge(edge_id) {
        Some(edge) => {
            changes.push(GraphChange::AddEdge(
                GraphEdge::new(ids.edge_id(), edge.source.clone(), node_id.clone())
                    .with_presentation(edge.presentation.clone()),
            ));
            changes.push(GraphChange::AddEdge(
                GraphEdge::new(ids.edge_id(), node_id.clone(), edge.target.clone())
                    .with_presentation(edge.presentation.clone()),
            ));
        }
        None => {
            log::debug!("Edge {} is gone, inserting {} unconnected", edge_id, node_id);
        }
    }

    InsertionPlan { node_id, changes }
}

/// Insert a node on the selected edge and clear the selection
///
/// Fails only when no edge is selected.
pub fn insert_on_selected_edge(
    store: &mut GraphStore,
    selection: &mut SelectionController,
    descriptor: &NodeTypeDescriptor,
    ids: &mut dyn IdSource,
) -> Result<Insertion> {
    let (edge_id, anchor) = match selection.selection() {
        Selection::Edge { id, anchor } => (id.clone(), *anchor),
        _ => return Err(GraphError::NoEdgeSelected),
    };

    let plan = plan_insertion(store.graph(), &edge_id, anchor, descriptor, ids);
    let split = plan.changes.len() == 4;
    let report = store.apply(&plan.changes);
    selection.clear();

    log::info!(
        "Inserted {} node {} on edge {} (split: {})",
        descriptor.subtype,
        plan.node_id,
        edge_id,
        split
    );

    Ok(Insertion {
        node_id: plan.node_id,
        split,
        report,
    })
}
