//! In-process fake of the workflow service
//!
//! An axum router on an ephemeral port serving the same REST surface as
//! the real backend, mixing bare and `{"data": ...}` responses.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::dto::{
    CreateWorkflowRequest, ExecutionStatus, ExecutionSummary, UpdateWorkflowRequest,
    WorkflowDocument,
};

type Reply<T> = Result<T, (StatusCode, Json<Value>)>;

#[derive(Default)]
struct FakeData {
    workflows: Vec<WorkflowDocument>,
    executions: Vec<ExecutionSummary>,
    next_id: u64,
    requests: usize,
    last_owner: Option<String>,
    failing: bool,
}

#[derive(Clone, Default)]
struct FakeState {
    inner: Arc<Mutex<FakeData>>,
}

impl FakeState {
    /// Count the request and fail it if the server is set to fail
    fn enter(&self) -> Reply<()> {
        let mut data = self.inner.lock();
        data.requests += 1;
        if data.failing {
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "backend down"})),
            ));
        }
        Ok(())
    }
}

fn not_found() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"message": "Workflow not found"})),
    )
}

/// A running fake backend; stopped on drop
pub struct FakeServer {
    addr: SocketAddr,
    state: FakeState,
    handle: tokio::task::JoinHandle<()>,
}

impl FakeServer {
    pub async fn start() -> Self {
        let state = FakeState::default();
        let app = Router::new()
            .route("/v1/workflows", get(list_handler).post(create_handler))
            .route(
                "/v1/workflows/:id",
                get(get_handler).put(update_handler).delete(delete_handler),
            )
            .route("/v1/workflows/:id/run", post(run_handler))
            .route("/v1/workflow-executions/recent", get(recent_handler))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake backend");
        let addr = listener.local_addr().expect("fake backend address");

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                log::error!("Fake backend error: {}", e);
            }
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    /// Store a document as-is, even one the editor would refuse
    pub fn seed(&self, doc: WorkflowDocument) {
        self.state.inner.lock().workflows.push(doc);
    }

    pub fn set_failing(&self, failing: bool) {
        self.state.inner.lock().failing = failing;
    }

    pub fn request_count(&self) -> usize {
        self.state.inner.lock().requests
    }

    pub fn last_owner(&self) -> Option<String> {
        self.state.inner.lock().last_owner.clone()
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn list_handler(State(state): State<FakeState>) -> Reply<Json<Value>> {
    state.enter()?;
    let data = state.inner.lock();
    let rows: Vec<_> = data.workflows.iter().map(|w| w.summary()).collect();
    Ok(Json(json!({"data": {"workflows": rows}})))
}

async fn create_handler(
    State(state): State<FakeState>,
    Json(body): Json<CreateWorkflowRequest>,
) -> Reply<(StatusCode, Json<Value>)> {
    state.enter()?;
    let mut data = state.inner.lock();
    data.next_id += 1;
    let id = format!("wf-{}", data.next_id);
    data.last_owner = body.owner_id.clone();
    data.workflows.push(WorkflowDocument {
        id: id.clone(),
        name: body.name,
        description: body.description,
        status: body.status,
        nodes: body.nodes,
        edges: body.edges,
        created_at: Some(Utc::now()),
        updated_at: None,
    });
    Ok((StatusCode::CREATED, Json(json!({"data": {"id": id}}))))
}

async fn get_handler(
    State(state): State<FakeState>,
    Path(id): Path<String>,
) -> Reply<Json<WorkflowDocument>> {
    state.enter()?;
    let data = state.inner.lock();
    data.workflows
        .iter()
        .find(|w| w.id == id)
        .cloned()
        .map(Json)
        .ok_or_else(not_found)
}

async fn update_handler(
    State(state): State<FakeState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateWorkflowRequest>,
) -> Reply<Json<Value>> {
    state.enter()?;
    let mut data = state.inner.lock();
    let doc = data
        .workflows
        .iter_mut()
        .find(|w| w.id == id)
        .ok_or_else(not_found)?;
    doc.name = body.name;
    doc.status = body.status;
    doc.nodes = body.nodes;
    doc.edges = body.edges;
    doc.updated_at = Some(Utc::now());
    Ok(Json(json!({"success": true})))
}

async fn delete_handler(
    State(state): State<FakeState>,
    Path(id): Path<String>,
) -> Reply<StatusCode> {
    state.enter()?;
    let mut data = state.inner.lock();
    let before = data.workflows.len();
    data.workflows.retain(|w| w.id != id);
    if data.workflows.len() == before {
        return Err(not_found());
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn run_handler(
    State(state): State<FakeState>,
    Path(id): Path<String>,
) -> Reply<Json<Value>> {
    state.enter()?;
    let mut data = state.inner.lock();
    if !data.workflows.iter().any(|w| w.id == id) {
        return Err(not_found());
    }
    let execution_id = format!("exec-{}", data.executions.len() + 1);
    data.executions.insert(
        0,
        ExecutionSummary {
            id: execution_id.clone(),
            workflow_id: id,
            status: ExecutionStatus::Pending,
            started_at: Some(Utc::now()),
        },
    );
    Ok(Json(json!({"data": {"executionId": execution_id}})))
}

async fn recent_handler(State(state): State<FakeState>) -> Reply<Json<Vec<ExecutionSummary>>> {
    state.enter()?;
    Ok(Json(state.inner.lock().executions.clone()))
}
