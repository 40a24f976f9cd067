//! Backend abstraction for workflow persistence and execution
//!
//! The editor talks to the workflow service only through
//! [`WorkflowBackend`]. Two implementations ship with the crate:
//!
//! - [`HttpWorkflowBackend`](crate::http::HttpWorkflowBackend): the REST
//!   service, over reqwest
//! - [`LocalWorkflowBackend`](crate::local::LocalWorkflowBackend): in-memory
//!   with optional JSON files, for offline use and tests

use async_trait::async_trait;

use crate::dto::{
    CreateWorkflowRequest, CreatedWorkflow, ExecutionSummary, RunResponse, UpdateWorkflowRequest,
    WorkflowDocument, WorkflowSummary,
};
use crate::error::Result;

/// Resource operations of the workflow service
///
/// Every call is a single attempt; retrying is left to the caller.
#[async_trait]
pub trait WorkflowBackend: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// `GET /workflows`
    async fn list_workflows(&self) -> Result<Vec<WorkflowSummary>>;

    /// `GET /workflows/{id}`
    async fn get_workflow(&self, id: &str) -> Result<WorkflowDocument>;

    /// `POST /workflows`
    async fn create_workflow(&self, request: &CreateWorkflowRequest) -> Result<CreatedWorkflow>;

    /// `PUT /workflows/{id}`
    async fn update_workflow(&self, id: &str, request: &UpdateWorkflowRequest) -> Result<()>;

    /// `DELETE /workflows/{id}`
    async fn delete_workflow(&self, id: &str) -> Result<()>;

    /// `POST /workflows/{id}/run`
    async fn run_workflow(&self, id: &str) -> Result<RunResponse>;

    /// `GET /workflow-executions/recent`
    async fn recent_executions(&self) -> Result<Vec<ExecutionSummary>>;
}
