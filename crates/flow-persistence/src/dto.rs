//! Wire types of the workflow backend
//!
//! The backend sometimes wraps payloads in `{"data": ...}` and sometimes
//! does not; [`Envelope`] accepts both.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use flow_graph::{GraphEdge, GraphNode, Workflow, WorkflowGraph, WorkflowHeader, WorkflowId, WorkflowStatus};

/// A response payload, bare or wrapped in `data`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    pub fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { data } => data,
            Envelope::Bare(inner) => inner,
        }
    }
}

/// Workflow list payload, either a bare array or `{workflows: [...]}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum WorkflowListPayload {
    Keyed { workflows: Vec<WorkflowSummary> },
    Bare(Vec<WorkflowSummary>),
}

impl WorkflowListPayload {
    pub fn into_vec(self) -> Vec<WorkflowSummary> {
        match self {
            WorkflowListPayload::Keyed { workflows } => workflows,
            WorkflowListPayload::Bare(workflows) => workflows,
        }
    }
}

/// Row of the workflow list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSummary {
    pub id: WorkflowId,
    pub name: String,
    #[serde(default)]
    pub status: WorkflowStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub node_count: usize,
}

impl WorkflowSummary {
    /// Most recent timestamp known for the workflow
    pub fn last_touched(&self) -> Option<DateTime<Utc>> {
        self.updated_at.or(self.created_at)
    }
}

/// A full stored workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDocument {
    pub id: WorkflowId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: WorkflowStatus,
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl WorkflowDocument {
    pub fn graph(&self) -> WorkflowGraph {
        WorkflowGraph {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }

    pub fn header(&self) -> WorkflowHeader {
        let mut header = WorkflowHeader::saved(self.id.clone(), self.name.clone(), self.status)
            .with_description(self.description.clone());
        header.created_at = self.created_at;
        header.updated_at = self.updated_at;
        header
    }

    pub fn into_workflow(self) -> Workflow {
        Workflow {
            header: self.header(),
            graph: WorkflowGraph {
                nodes: self.nodes,
                edges: self.edges,
            },
        }
    }

    pub fn summary(&self) -> WorkflowSummary {
        WorkflowSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
            node_count: self.nodes.len(),
        }
    }
}

/// Body of `POST /workflows`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkflowRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub status: WorkflowStatus,
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
}

/// Body of `PUT /workflows/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWorkflowRequest {
    pub name: String,
    pub status: WorkflowStatus,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Response of `POST /workflows`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedWorkflow {
    pub id: WorkflowId,
    /// Present when the backend chose a status other than the requested one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<WorkflowStatus>,
}

/// Response of `POST /workflows/{id}/run`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResponse {
    #[serde(alias = "execution_id")]
    pub execution_id: String,
}

/// State of one workflow execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

/// Row of the recent-executions list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSummary {
    pub id: String,
    pub workflow_id: WorkflowId,
    pub status: ExecutionStatus,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_accepts_both_shapes() {
        let wrapped: Envelope<CreatedWorkflow> =
            serde_json::from_value(json!({"data": {"id": "wf-1"}})).unwrap();
        let bare: Envelope<CreatedWorkflow> = serde_json::from_value(json!({"id": "wf-1"})).unwrap();
        assert_eq!(wrapped.into_inner().id, "wf-1");
        assert_eq!(bare.into_inner().id, "wf-1");
    }

    #[test]
    fn test_list_payload_shapes() {
        let row = json!({"id": "a", "name": "A", "status": "active", "nodeCount": 3});
        let keyed: Envelope<WorkflowListPayload> =
            serde_json::from_value(json!({"data": {"workflows": [row.clone()]}})).unwrap();
        let bare: Envelope<WorkflowListPayload> = serde_json::from_value(json!([row])).unwrap();

        let keyed = keyed.into_inner().into_vec();
        assert_eq!(keyed[0].node_count, 3);
        assert_eq!(keyed[0].status, WorkflowStatus::Active);
        assert_eq!(bare.into_inner().into_vec().len(), 1);
    }

    #[test]
    fn test_document_decodes_nodes_and_edges() {
        let doc: WorkflowDocument = serde_json::from_value(json!({
            "id": "wf-1",
            "name": "Nightly",
            "status": "draft",
            "nodes": [
                {"id": "n1", "type": "trigger", "subtype": "schedule",
                 "position": {"x": 0, "y": 0}, "config": {"cron": "0 0 * * *"}}
            ],
            "edges": [],
            "updatedAt": "2024-05-01T10:00:00Z"
        }))
        .unwrap();

        let workflow = doc.clone().into_workflow();
        assert_eq!(workflow.header.id.as_deref(), Some("wf-1"));
        assert_eq!(workflow.graph.nodes[0].config.to_value()["cron"], "0 0 * * *");
        assert!(doc.summary().last_touched().is_some());
    }

    #[test]
    fn test_create_body_shape() {
        let body = CreateWorkflowRequest {
            name: "New".to_string(),
            description: "desc".to_string(),
            owner_id: Some("u1".to_string()),
            status: WorkflowStatus::Draft,
            nodes: vec![],
            edges: vec![],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["ownerId"], "u1");
        assert_eq!(json["status"], "draft");
    }

    #[test]
    fn test_unknown_execution_status() {
        let row: ExecutionSummary = serde_json::from_value(json!({
            "id": "x1", "workflowId": "wf-1", "status": "paused"
        }))
        .unwrap();
        assert_eq!(row.status, ExecutionStatus::Unknown);
    }
}
