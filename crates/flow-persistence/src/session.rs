//! Editor session
//!
//! Binds one [`CanvasSession`] to the persistence client. Each network
//! action is split in three steps so the canvas stays usable while a call
//! is outstanding:
//!
//! 1. `prepare_*` validates and snapshots the workflow (synchronous)
//! 2. [`PersistenceClient::execute`] talks to the backend (async, borrows
//!    nothing from the session)
//! 3. [`EditorSession::resolve`] applies the outcome and emits events
//!
//! Dropping the session before step 3 discards the outcome.

use std::sync::Arc;

use chrono::Utc;

use flow_graph::events::emit;
use flow_graph::validation::malformed_errors;
use flow_graph::{
    CanvasSession, EditorEvent, EventSink, NodeTypeCatalog, NullEventSink, Route, WorkflowGraph,
    WorkflowHeader, WorkflowId, WorkflowStatus,
};

use crate::client::{PersistenceClient, SyncAction, SyncOutcome, SyncRequest, SyncSuccess};
use crate::dto::UpdateWorkflowRequest;
use crate::error::{ClientError, Result};

/// What the editor shows in place of the canvas
#[derive(Debug, Clone, PartialEq)]
pub enum EditorView {
    /// Fetching a workflow; the canvas is not shown
    Loading { workflow_id: WorkflowId },
    Ready,
    /// The workflow could not be shown; no graph is rendered
    LoadFailed {
        workflow_id: WorkflowId,
        message: String,
    },
}

pub struct EditorSession {
    canvas: CanvasSession,
    header: WorkflowHeader,
    view: EditorView,
    client: PersistenceClient,
    events: Arc<dyn EventSink>,
    create_in_flight: bool,
}

impl EditorSession {
    /// A fresh unsaved workflow
    pub fn new_draft(
        client: PersistenceClient,
        catalog: Arc<NodeTypeCatalog>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            canvas: CanvasSession::new(catalog),
            header: WorkflowHeader::draft(name),
            view: EditorView::Ready,
            client,
            events: Arc::new(NullEventSink),
            create_in_flight: false,
        }
    }

    /// A session for a stored workflow, waiting for its first load
    ///
    /// Returns the load request to hand to the client.
    pub fn for_workflow(
        client: PersistenceClient,
        catalog: Arc<NodeTypeCatalog>,
        workflow_id: impl Into<WorkflowId>,
    ) -> (Self, SyncRequest) {
        let mut session = Self::new_draft(client, catalog, "");
        let request = session.prepare_load(workflow_id);
        (session, request)
    }

    /// Route editor events (canvas and persistence) to `events`
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.canvas.set_event_sink(events.clone());
        self.events = events;
        self
    }

    pub fn canvas(&self) -> &CanvasSession {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut CanvasSession {
        &mut self.canvas
    }

    pub fn header(&self) -> &WorkflowHeader {
        &self.header
    }

    pub fn view(&self) -> &EditorView {
        &self.view
    }

    pub fn client(&self) -> &PersistenceClient {
        &self.client
    }

    pub fn is_create_in_flight(&self) -> bool {
        self.create_in_flight
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.header.name = name.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.header.description = description.into();
    }

    /// Change the status locally; sent with the next save
    pub fn set_status(&mut self, status: WorkflowStatus) -> Result<()> {
        self.header.transition(status)?;
        Ok(())
    }

    // =========================================================================
    // Step 1: prepare
    // =========================================================================

    /// Create for a draft, update for a saved workflow
    pub fn prepare_save(&mut self) -> Result<SyncRequest> {
        if self.header.name.trim().is_empty() {
            return Err(ClientError::Validation(
                "Workflow name is required".to_string(),
            ));
        }

        let graph = self.canvas.graph();
        match &self.header.id {
            Some(id) => Ok(SyncRequest::Save {
                workflow_id: id.clone(),
                body: UpdateWorkflowRequest {
                    name: self.header.name.clone(),
                    status: self.header.status(),
                    nodes: graph.nodes.clone(),
                    edges: graph.edges.clone(),
                },
            }),
            None => {
                if self.create_in_flight {
                    return Err(ClientError::Busy);
                }
                self.create_in_flight = true;
                Ok(SyncRequest::Create(
                    self.client.create_request(&self.header, graph),
                ))
            }
        }
    }

    pub fn prepare_run(&self) -> Result<SyncRequest> {
        let workflow_id = self.header.id.clone().ok_or(ClientError::NotSaved)?;
        Ok(SyncRequest::Run { workflow_id })
    }

    pub fn prepare_delete(&self) -> Result<SyncRequest> {
        let workflow_id = self.header.id.clone().ok_or(ClientError::NotSaved)?;
        Ok(SyncRequest::Delete { workflow_id })
    }

    /// Switch to the loading view for `workflow_id`
    ///
    /// A create still in flight no longer belongs to this session; its
    /// outcome is discarded when it arrives.
    pub fn prepare_load(&mut self, workflow_id: impl Into<WorkflowId>) -> SyncRequest {
        let workflow_id = workflow_id.into();
        self.create_in_flight = false;
        self.view = EditorView::Loading {
            workflow_id: workflow_id.clone(),
        };
        SyncRequest::Load { workflow_id }
    }

    // =========================================================================
    // Step 3: resolve
    // =========================================================================

    /// Apply a resolved request
    ///
    /// Returns the request's error after it has been reported. Outcomes for
    /// another workflow than the one being edited are dropped.
    pub fn resolve(&mut self, outcome: SyncOutcome) -> Result<()> {
        if !self.is_current(&outcome) {
            log::debug!(
                "Discarding {} outcome for {:?}",
                outcome.action.as_str(),
                outcome.workflow_id
            );
            return Ok(());
        }

        let action = outcome.action;
        let workflow_id = outcome.workflow_id;
        if action == SyncAction::Create {
            self.create_in_flight = false;
        }

        match outcome.result {
            Ok(SyncSuccess::Created(created)) => {
                self.header.id = Some(created.id.clone());
                if let Some(status) = created.status {
                    self.header.adopt_status(status);
                }
                self.header.created_at = Some(Utc::now());
                self.emit(EditorEvent::WorkflowCreated {
                    workflow_id: created.id.clone(),
                });
                self.emit(EditorEvent::success("Workflow created"));
                self.emit(EditorEvent::Navigate {
                    route: Route::Editor {
                        workflow_id: created.id,
                    },
                });
                Ok(())
            }
            Ok(SyncSuccess::Saved) => {
                self.header.updated_at = Some(Utc::now());
                if let Some(id) = workflow_id {
                    self.emit(EditorEvent::WorkflowSaved { workflow_id: id });
                }
                self.emit(EditorEvent::success("Workflow saved"));
                Ok(())
            }
            Ok(SyncSuccess::RunStarted(run)) => {
                if let Some(id) = workflow_id {
                    self.emit(EditorEvent::RunStarted {
                        workflow_id: id,
                        execution_id: run.execution_id.clone(),
                    });
                }
                self.emit(EditorEvent::success(format!(
                    "Run started ({})",
                    run.execution_id
                )));
                Ok(())
            }
            Ok(SyncSuccess::Deleted) => {
                self.header.id = None;
                self.header.created_at = None;
                self.header.updated_at = None;
                if let Some(id) = workflow_id {
                    self.emit(EditorEvent::WorkflowDeleted { workflow_id: id });
                }
                self.emit(EditorEvent::success("Workflow deleted"));
                self.emit(EditorEvent::Navigate {
                    route: Route::Dashboard,
                });
                Ok(())
            }
            Ok(SyncSuccess::Loaded(doc)) => {
                let errors = malformed_errors(&doc.graph());
                if let Some(first) = errors.first() {
                    let err = ClientError::Malformed {
                        workflow_id: doc.id.clone(),
                        reason: first.to_string(),
                    };
                    self.fail_load(doc.id, &err);
                    return Err(err);
                }

                let id = doc.id.clone();
                let workflow = doc.into_workflow();
                if let Err(e) = self.canvas.load_graph(workflow.graph) {
                    let err = ClientError::Graph(e);
                    self.fail_load(id, &err);
                    return Err(err);
                }
                self.header = workflow.header;
                self.view = EditorView::Ready;
                self.emit(EditorEvent::WorkflowLoaded { workflow_id: id });
                Ok(())
            }
            Err(err) => {
                match (action, workflow_id) {
                    (SyncAction::Load, Some(id)) => self.fail_load(id, &err),
                    _ => self.emit(EditorEvent::error(format!(
                        "Failed to {} workflow: {}",
                        action.as_str(),
                        err
                    ))),
                }
                Err(err)
            }
        }
    }

    // =========================================================================
    // Prepare, execute and resolve in one call
    // =========================================================================

    pub async fn save(&mut self) -> Result<()> {
        let request = self.prepare_save().map_err(|e| self.reject(e))?;
        self.dispatch(request).await
    }

    pub async fn run(&mut self) -> Result<()> {
        let request = self.prepare_run().map_err(|e| self.reject(e))?;
        self.dispatch(request).await
    }

    pub async fn delete(&mut self) -> Result<()> {
        let request = self.prepare_delete().map_err(|e| self.reject(e))?;
        self.dispatch(request).await
    }

    pub async fn open(&mut self, workflow_id: impl Into<WorkflowId>) -> Result<()> {
        let request = self.prepare_load(workflow_id);
        self.dispatch(request).await
    }

    async fn dispatch(&mut self, request: SyncRequest) -> Result<()> {
        let client = self.client.clone();
        let outcome = client.execute(request).await;
        self.resolve(outcome)
    }

    /// Report an error caught before any request was made
    fn reject(&self, err: ClientError) -> ClientError {
        self.emit(EditorEvent::error(err.to_string()));
        err
    }

    fn is_current(&self, outcome: &SyncOutcome) -> bool {
        match (outcome.action, &outcome.workflow_id) {
            (SyncAction::Create, _) => self.create_in_flight && self.header.id.is_none(),
            (SyncAction::Load, Some(id)) => {
                matches!(&self.view, EditorView::Loading { workflow_id } if workflow_id == id)
            }
            (_, id) => id.is_some() && self.header.id == *id,
        }
    }

    fn fail_load(&mut self, workflow_id: WorkflowId, err: &ClientError) {
        log::warn!("Failed to load workflow '{}': {}", workflow_id, err);
        if let Err(e) = self.canvas.load_graph(WorkflowGraph::new()) {
            log::warn!("Failed to clear canvas: {}", e);
        }
        let message = err.to_string();
        self.view = EditorView::LoadFailed {
            workflow_id: workflow_id.clone(),
            message: message.clone(),
        };
        self.emit(EditorEvent::LoadFailed {
            workflow_id,
            message: message.clone(),
        });
        self.emit(EditorEvent::error(message));
    }

    fn emit(&self, event: EditorEvent) {
        emit(self.events.as_ref(), event);
    }
}
