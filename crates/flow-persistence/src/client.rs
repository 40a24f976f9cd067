//! Persistence client
//!
//! Wraps a [`WorkflowBackend`] with the query cache and per-workflow
//! request serialization. Reads go through the cache; writes are
//! single-attempt and invalidate the queries they affect.

use std::sync::Arc;

use flow_graph::{WorkflowGraph, WorkflowHeader, WorkflowId};

use crate::backend::WorkflowBackend;
use crate::cache::{CachedQuery, QueryCache, QueryKey};
use crate::config::ClientConfig;
use crate::dto::{
    CreateWorkflowRequest, CreatedWorkflow, ExecutionSummary, RunResponse, UpdateWorkflowRequest,
    WorkflowDocument, WorkflowSummary,
};
use crate::error::Result;
use crate::http::HttpWorkflowBackend;
use crate::local::LocalWorkflowBackend;
use crate::locks::{WorkflowLocks, CREATE_KEY};

/// A write or load to send to the backend
#[derive(Debug, Clone, PartialEq)]
pub enum SyncRequest {
    Create(CreateWorkflowRequest),
    Save {
        workflow_id: WorkflowId,
        body: UpdateWorkflowRequest,
    },
    Run {
        workflow_id: WorkflowId,
    },
    Delete {
        workflow_id: WorkflowId,
    },
    Load {
        workflow_id: WorkflowId,
    },
}

impl SyncRequest {
    pub fn action(&self) -> SyncAction {
        match self {
            SyncRequest::Create(_) => SyncAction::Create,
            SyncRequest::Save { .. } => SyncAction::Save,
            SyncRequest::Run { .. } => SyncAction::Run,
            SyncRequest::Delete { .. } => SyncAction::Delete,
            SyncRequest::Load { .. } => SyncAction::Load,
        }
    }

    /// Target workflow; `None` for a create
    pub fn workflow_id(&self) -> Option<&str> {
        match self {
            SyncRequest::Create(_) => None,
            SyncRequest::Save { workflow_id, .. }
            | SyncRequest::Run { workflow_id }
            | SyncRequest::Delete { workflow_id }
            | SyncRequest::Load { workflow_id } => Some(workflow_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    Create,
    Save,
    Run,
    Delete,
    Load,
}

impl SyncAction {
    /// Queries made stale by a successful action on `workflow_id`
    pub fn invalidates(self, workflow_id: Option<&str>) -> Vec<QueryKey> {
        let item = workflow_id.map(|id| QueryKey::Workflow(id.to_string()));
        match self {
            SyncAction::Create => vec![QueryKey::WorkflowList],
            SyncAction::Save | SyncAction::Delete => {
                std::iter::once(QueryKey::WorkflowList).chain(item).collect()
            }
            SyncAction::Run => std::iter::once(QueryKey::RecentExecutions)
                .chain(item)
                .collect(),
            SyncAction::Load => Vec::new(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncAction::Create => "create",
            SyncAction::Save => "save",
            SyncAction::Run => "run",
            SyncAction::Delete => "delete",
            SyncAction::Load => "load",
        }
    }
}

/// What a successful request returned
#[derive(Debug, Clone, PartialEq)]
pub enum SyncSuccess {
    Created(CreatedWorkflow),
    Saved,
    RunStarted(RunResponse),
    Deleted,
    Loaded(WorkflowDocument),
}

/// Resolution of one [`SyncRequest`]
#[derive(Debug)]
pub struct SyncOutcome {
    pub action: SyncAction,
    /// Workflow the request targeted; `None` for a create
    pub workflow_id: Option<WorkflowId>,
    pub result: Result<SyncSuccess>,
}

/// Cached, serialized access to a workflow backend
///
/// Cheap to clone; clones share the backend, cache and locks.
#[derive(Clone)]
pub struct PersistenceClient {
    backend: Arc<dyn WorkflowBackend>,
    cache: QueryCache,
    locks: WorkflowLocks,
    owner_id: Option<String>,
}

impl PersistenceClient {
    pub fn new(backend: Arc<dyn WorkflowBackend>) -> Self {
        Self {
            backend,
            cache: QueryCache::new(),
            locks: WorkflowLocks::new(),
            owner_id: None,
        }
    }

    /// Owner recorded on workflows this client creates
    pub fn with_owner_id(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    /// Build a client from configuration
    ///
    /// A configured local store directory selects the local backend (loading
    /// what is already on disk); otherwise the HTTP backend is used.
    pub async fn from_config(config: &ClientConfig) -> Result<Self> {
        let backend: Arc<dyn WorkflowBackend> = match &config.local_store_dir {
            Some(dir) => {
                let local = LocalWorkflowBackend::with_persistence(dir);
                let count = local.load_from_disk().await?;
                log::info!("Using local workflow store {:?} ({} workflows)", dir, count);
                Arc::new(local)
            }
            None => {
                log::info!("Using workflow backend at {}", config.api_base_url);
                Arc::new(HttpWorkflowBackend::from_config(config)?)
            }
        };

        let client = Self::new(backend);
        Ok(match &config.owner_id {
            Some(owner) => client.with_owner_id(owner.clone()),
            None => client,
        })
    }

    pub fn backend(&self) -> &Arc<dyn WorkflowBackend> {
        &self.backend
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }

    /// Create body for a draft, stamped with this client's owner
    pub fn create_request(
        &self,
        header: &WorkflowHeader,
        graph: &WorkflowGraph,
    ) -> CreateWorkflowRequest {
        CreateWorkflowRequest {
            name: header.name.clone(),
            description: header.description.clone(),
            owner_id: self.owner_id.clone(),
            status: header.status(),
            nodes: graph.nodes.clone(),
            edges: graph.edges.clone(),
        }
    }

    pub async fn list_workflows(&self) -> Result<Vec<WorkflowSummary>> {
        if let Some(CachedQuery::WorkflowList(rows)) = self.cache.get_fresh(&QueryKey::WorkflowList)
        {
            return Ok(rows);
        }
        let rows = self.backend.list_workflows().await?;
        self.cache
            .put(QueryKey::WorkflowList, CachedQuery::WorkflowList(rows.clone()));
        Ok(rows)
    }

    pub async fn get_workflow(&self, id: &str) -> Result<WorkflowDocument> {
        let key = QueryKey::Workflow(id.to_string());
        if let Some(CachedQuery::Workflow(doc)) = self.cache.get_fresh(&key) {
            return Ok(doc);
        }
        let doc = self.backend.get_workflow(id).await?;
        self.cache.put(key, CachedQuery::Workflow(doc.clone()));
        Ok(doc)
    }

    pub async fn recent_executions(&self) -> Result<Vec<ExecutionSummary>> {
        if let Some(CachedQuery::RecentExecutions(rows)) =
            self.cache.get_fresh(&QueryKey::RecentExecutions)
        {
            return Ok(rows);
        }
        let rows = self.backend.recent_executions().await?;
        self.cache.put(
            QueryKey::RecentExecutions,
            CachedQuery::RecentExecutions(rows.clone()),
        );
        Ok(rows)
    }

    /// Send one request and report how it resolved
    ///
    /// Requests for the same workflow id (and all creates) run one at a
    /// time. A failed request leaves the cache untouched.
    pub async fn execute(&self, request: SyncRequest) -> SyncOutcome {
        let action = request.action();
        let workflow_id = request.workflow_id().map(str::to_string);
        let _guard = self
            .locks
            .acquire(workflow_id.as_deref().unwrap_or(CREATE_KEY))
            .await;

        log::debug!(
            "{} {} via {} backend",
            action.as_str(),
            workflow_id.as_deref().unwrap_or("new workflow"),
            self.backend.name()
        );

        let result = match &request {
            SyncRequest::Create(body) => self
                .backend
                .create_workflow(body)
                .await
                .map(SyncSuccess::Created),
            SyncRequest::Save { workflow_id, body } => self
                .backend
                .update_workflow(workflow_id, body)
                .await
                .map(|()| SyncSuccess::Saved),
            SyncRequest::Run { workflow_id } => self
                .backend
                .run_workflow(workflow_id)
                .await
                .map(SyncSuccess::RunStarted),
            SyncRequest::Delete { workflow_id } => self
                .backend
                .delete_workflow(workflow_id)
                .await
                .map(|()| SyncSuccess::Deleted),
            SyncRequest::Load { workflow_id } => {
                self.get_workflow(workflow_id).await.map(SyncSuccess::Loaded)
            }
        };

        match &result {
            Ok(_) => {
                self.cache
                    .invalidate_all(&action.invalidates(workflow_id.as_deref()));
                log::info!(
                    "{} succeeded for {}",
                    action.as_str(),
                    workflow_id.as_deref().unwrap_or("new workflow")
                );
            }
            Err(e) => log::warn!(
                "{} failed for {}: {}",
                action.as_str(),
                workflow_id.as_deref().unwrap_or("new workflow"),
                e
            ),
        }

        SyncOutcome {
            action,
            workflow_id,
            result,
        }
    }
}
