//! In-memory workflow backend with file persistence
//!
//! Keeps workflows in memory and, when a directory is configured, mirrors
//! each one to `<dir>/<id>.json`. Used for offline editing and in tests.
//!
//! # Example
//!
//! ```ignore
//! use flow_persistence::LocalWorkflowBackend;
//!
//! let backend = LocalWorkflowBackend::with_persistence(".flowpad/workflows");
//! let count = backend.load_from_disk().await?;
//! println!("Loaded {} workflows", count);
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use tokio::fs;

use crate::backend::WorkflowBackend;
use crate::constants::defaults;
use crate::dto::{
    CreateWorkflowRequest, CreatedWorkflow, ExecutionStatus, ExecutionSummary, RunResponse,
    UpdateWorkflowRequest, WorkflowDocument, WorkflowSummary,
};
use crate::error::{ClientError, Result};

#[derive(Debug, Default)]
struct LocalState {
    workflows: HashMap<String, WorkflowDocument>,
    /// Newest first
    executions: Vec<ExecutionSummary>,
}

/// Workflow backend held in process memory
#[derive(Debug, Default)]
pub struct LocalWorkflowBackend {
    state: RwLock<LocalState>,
    /// Optional directory for file persistence
    persist_path: Option<PathBuf>,
}

impl LocalWorkflowBackend {
    /// Create a store without persistence
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that mirrors workflows into `path`
    ///
    /// The directory is created on first write.
    pub fn with_persistence(path: impl AsRef<Path>) -> Self {
        Self {
            state: RwLock::default(),
            persist_path: Some(path.as_ref().to_path_buf()),
        }
    }

    /// Load every `*.json` workflow from the persistence directory
    ///
    /// Returns the number of workflows loaded. Unreadable files are skipped
    /// with a warning.
    pub async fn load_from_disk(&self) -> Result<usize> {
        let Some(path) = &self.persist_path else {
            return Ok(0);
        };
        if !fs::try_exists(path).await? {
            return Ok(0);
        }

        let mut loaded = Vec::new();
        let mut entries = fs::read_dir(path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_path = entry.path();
            if file_path.extension().map_or(true, |e| e != "json") {
                continue;
            }
            let content = match fs::read_to_string(&file_path).await {
                Ok(content) => content,
                Err(e) => {
                    log::warn!("Failed to read workflow from {:?}: {}", file_path, e);
                    continue;
                }
            };
            match serde_json::from_str::<WorkflowDocument>(&content) {
                Ok(doc) => {
                    log::info!("Loaded workflow '{}' from {:?}", doc.id, file_path);
                    loaded.push(doc);
                }
                Err(e) => {
                    log::warn!("Failed to parse workflow from {:?}: {}", file_path, e);
                }
            }
        }

        let count = loaded.len();
        let mut state = self.state.write();
        for doc in loaded {
            state.workflows.insert(doc.id.clone(), doc);
        }
        Ok(count)
    }

    /// Store a document without any checks
    ///
    /// Lets tests stage workflows the editor itself would never produce.
    pub fn insert_document(&self, doc: WorkflowDocument) {
        self.state.write().workflows.insert(doc.id.clone(), doc);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.state.read().workflows.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.state.read().workflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn save_to_disk(&self, doc: &WorkflowDocument) -> Result<()> {
        let Some(path) = &self.persist_path else {
            return Ok(());
        };
        fs::create_dir_all(path).await?;
        let file_path = path.join(format!("{}.json", doc.id));
        let content = serde_json::to_string_pretty(doc)?;
        fs::write(&file_path, content).await?;
        log::debug!("Saved workflow '{}' to {:?}", doc.id, file_path);
        Ok(())
    }

    async fn delete_from_disk(&self, id: &str) -> Result<()> {
        let Some(path) = &self.persist_path else {
            return Ok(());
        };
        let file_path = path.join(format!("{}.json", id));
        if fs::try_exists(&file_path).await? {
            fs::remove_file(&file_path).await?;
            log::debug!("Deleted workflow '{}' from {:?}", id, file_path);
        }
        Ok(())
    }
}

#[async_trait]
impl WorkflowBackend for LocalWorkflowBackend {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn list_workflows(&self) -> Result<Vec<WorkflowSummary>> {
        let mut rows: Vec<_> = self
            .state
            .read()
            .workflows
            .values()
            .map(WorkflowDocument::summary)
            .collect();
        rows.sort_by(|a, b| {
            b.last_touched()
                .cmp(&a.last_touched())
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(rows)
    }

    async fn get_workflow(&self, id: &str) -> Result<WorkflowDocument> {
        self.state
            .read()
            .workflows
            .get(id)
            .cloned()
            .ok_or_else(|| ClientError::not_found(id))
    }

    async fn create_workflow(&self, request: &CreateWorkflowRequest) -> Result<CreatedWorkflow> {
        let doc = WorkflowDocument {
            id: uuid::Uuid::new_v4().to_string(),
            name: request.name.clone(),
            description: request.description.clone(),
            status: request.status,
            nodes: request.nodes.clone(),
            edges: request.edges.clone(),
            created_at: Some(Utc::now()),
            updated_at: None,
        };
        self.save_to_disk(&doc).await?;

        let created = CreatedWorkflow {
            id: doc.id.clone(),
            status: None,
        };
        self.state.write().workflows.insert(doc.id.clone(), doc);
        log::info!("Created local workflow '{}'", created.id);
        Ok(created)
    }

    async fn update_workflow(&self, id: &str, request: &UpdateWorkflowRequest) -> Result<()> {
        let mut doc = self.get_workflow(id).await?;
        doc.name = request.name.clone();
        doc.status = request.status;
        doc.nodes = request.nodes.clone();
        doc.edges = request.edges.clone();
        doc.updated_at = Some(Utc::now());

        // Memory only changes once the file is written
        self.save_to_disk(&doc).await?;
        self.state.write().workflows.insert(doc.id.clone(), doc);
        Ok(())
    }

    async fn delete_workflow(&self, id: &str) -> Result<()> {
        if !self.contains(id) {
            return Err(ClientError::not_found(id));
        }
        self.delete_from_disk(id).await?;
        self.state.write().workflows.remove(id);
        log::info!("Deleted local workflow '{}'", id);
        Ok(())
    }

    async fn run_workflow(&self, id: &str) -> Result<RunResponse> {
        let mut state = self.state.write();
        if !state.workflows.contains_key(id) {
            return Err(ClientError::not_found(id));
        }
        let execution_id = uuid::Uuid::new_v4().to_string();
        state.executions.insert(
            0,
            ExecutionSummary {
                id: execution_id.clone(),
                workflow_id: id.to_string(),
                status: ExecutionStatus::Pending,
                started_at: Some(Utc::now()),
            },
        );
        state.executions.truncate(defaults::RECENT_EXECUTIONS);
        Ok(RunResponse { execution_id })
    }

    async fn recent_executions(&self) -> Result<Vec<ExecutionSummary>> {
        Ok(self.state.read().executions.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_graph::{WorkflowBuilder, WorkflowStatus};

    fn request(name: &str) -> CreateWorkflowRequest {
        let graph = WorkflowBuilder::new()
            .trigger("t")
            .step("a", "http_request")
            .connect("t", "a")
            .build();
        CreateWorkflowRequest {
            name: name.to_string(),
            description: String::new(),
            owner_id: None,
            status: WorkflowStatus::Draft,
            nodes: graph.nodes,
            edges: graph.edges,
        }
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let backend = LocalWorkflowBackend::new();
        let created = backend.create_workflow(&request("Sync")).await.unwrap();

        let doc = backend.get_workflow(&created.id).await.unwrap();

        assert_eq!(doc.name, "Sync");
        assert_eq!(doc.edges.len(), 1);
        assert!(doc.created_at.is_some());
    }

    #[tokio::test]
    async fn test_missing_ids_are_not_found() {
        let backend = LocalWorkflowBackend::new();
        let update = UpdateWorkflowRequest {
            name: "x".to_string(),
            status: WorkflowStatus::Draft,
            nodes: vec![],
            edges: vec![],
        };

        assert!(backend.get_workflow("nope").await.unwrap_err().is_not_found());
        assert!(backend.update_workflow("nope", &update).await.unwrap_err().is_not_found());
        assert!(backend.delete_workflow("nope").await.unwrap_err().is_not_found());
        assert!(backend.run_workflow("nope").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_recent_executions_newest_first() {
        let backend = LocalWorkflowBackend::new();
        let created = backend.create_workflow(&request("Run")).await.unwrap();

        let mut runs = Vec::new();
        for _ in 0..12 {
            runs.push(backend.run_workflow(&created.id).await.unwrap().execution_id);
        }
        let recent = backend.recent_executions().await.unwrap();

        assert_eq!(recent.len(), defaults::RECENT_EXECUTIONS);
        assert_eq!(recent[0].id, runs[11]);
        assert_eq!(recent[9].id, runs[2]);
    }

    #[tokio::test]
    async fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalWorkflowBackend::with_persistence(dir.path());
        let kept = backend.create_workflow(&request("Kept")).await.unwrap();
        let gone = backend.create_workflow(&request("Gone")).await.unwrap();
        backend.delete_workflow(&gone.id).await.unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        std::fs::write(dir.path().join("broken.json"), "{").unwrap();

        let reopened = LocalWorkflowBackend::with_persistence(dir.path());
        let count = reopened.load_from_disk().await.unwrap();

        assert_eq!(count, 1);
        assert!(reopened.contains(&kept.id));
        assert!(!reopened.contains(&gone.id));
    }

    #[tokio::test]
    async fn test_unreadable_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalWorkflowBackend::with_persistence(dir.path());
        let kept = backend.create_workflow(&request("Kept")).await.unwrap();
        std::fs::write(dir.path().join("binary.json"), [0xff, 0xfe, 0x00]).unwrap();

        let reopened = LocalWorkflowBackend::with_persistence(dir.path());
        let count = reopened.load_from_disk().await.unwrap();

        assert_eq!(count, 1);
        assert!(reopened.contains(&kept.id));
    }

    #[tokio::test]
    async fn test_failed_write_leaves_memory_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        let backend = LocalWorkflowBackend::with_persistence(blocker.join("workflows"));
        let created = request("Original");
        backend.insert_document(WorkflowDocument {
            id: "wf-1".to_string(),
            name: created.name,
            description: created.description,
            status: created.status,
            nodes: created.nodes,
            edges: created.edges,
            created_at: None,
            updated_at: None,
        });
        let update = UpdateWorkflowRequest {
            name: "Renamed".to_string(),
            status: WorkflowStatus::Active,
            nodes: vec![],
            edges: vec![],
        };

        assert!(backend.update_workflow("wf-1", &update).await.is_err());
        let doc = backend.get_workflow("wf-1").await.unwrap();
        assert_eq!(doc.name, "Original");
        assert_eq!(doc.status, WorkflowStatus::Draft);
        assert_eq!(doc.nodes.len(), 2);
        assert!(doc.updated_at.is_none());

        assert!(backend.create_workflow(&request("New")).await.is_err());
        assert_eq!(backend.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_workflow() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalWorkflowBackend::with_persistence(dir.path());
        let created = backend.create_workflow(&request("Stuck")).await.unwrap();
        let file = dir.path().join(format!("{}.json", created.id));
        std::fs::remove_file(&file).unwrap();
        std::fs::create_dir(&file).unwrap();

        assert!(backend.delete_workflow(&created.id).await.is_err());
        assert!(backend.contains(&created.id));
    }

    #[tokio::test]
    async fn test_load_without_directory() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalWorkflowBackend::with_persistence(dir.path().join("missing"));
        assert_eq!(backend.load_from_disk().await.unwrap(), 0);
        assert!(backend.is_empty());
    }
}
