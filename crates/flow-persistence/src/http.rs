//! HTTP backend for the workflow service
//!
//! Talks to the REST surface rooted at the configured base URL (which
//! already carries the API version, e.g. `.../v1`). Payloads may come back
//! bare or wrapped in `{"data": ...}`; both are accepted.

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::backend::WorkflowBackend;
use crate::config::ClientConfig;
use crate::constants::paths;
use crate::dto::{
    CreateWorkflowRequest, CreatedWorkflow, Envelope, ExecutionSummary, RunResponse,
    UpdateWorkflowRequest, WorkflowDocument, WorkflowListPayload, WorkflowSummary,
};
use crate::error::{ClientError, Result};

/// Workflow backend reached over HTTP
pub struct HttpWorkflowBackend {
    /// HTTP client for API requests
    http_client: reqwest::Client,
    /// Base URL without a trailing slash
    base_url: String,
}

impl HttpWorkflowBackend {
    /// Create a backend with the transport's default settings
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http_client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http_client,
            base_url,
        }
    }

    /// Create a backend using the configured base URL and timeout
    ///
    /// Without a configured timeout, requests wait as long as the transport
    /// lets them.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build()?;
        Ok(Self::with_client(http_client, config.api_base_url.clone()))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn workflow_url(&self, id: &str) -> String {
        self.url(&format!("{}/{}", paths::WORKFLOWS, id))
    }
}

/// Turn a non-success response into `ClientError::Status`
async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|value| {
            ["message", "error", "detail"]
                .iter()
                .find_map(|key| value.get(*key).and_then(|m| m.as_str()).map(str::to_string))
        })
        .or_else(|| Some(body.trim().to_string()).filter(|b| !b.is_empty()))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

    log::warn!("Backend responded {}: {}", status, message);
    Err(ClientError::Status {
        status: status.as_u16(),
        message,
    })
}

/// Decode a successful response, bare or enveloped
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let bytes = check(response).await?.bytes().await?;
    let envelope: Envelope<T> = serde_json::from_slice(&bytes)?;
    Ok(envelope.into_inner())
}

#[async_trait]
impl WorkflowBackend for HttpWorkflowBackend {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn list_workflows(&self) -> Result<Vec<WorkflowSummary>> {
        log::debug!("GET {}", paths::WORKFLOWS);
        let response = self.http_client.get(self.url(paths::WORKFLOWS)).send().await?;
        let payload: WorkflowListPayload = decode(response).await?;
        Ok(payload.into_vec())
    }

    async fn get_workflow(&self, id: &str) -> Result<WorkflowDocument> {
        log::debug!("GET {}/{}", paths::WORKFLOWS, id);
        let response = self.http_client.get(self.workflow_url(id)).send().await?;
        decode(response).await
    }

    async fn create_workflow(&self, request: &CreateWorkflowRequest) -> Result<CreatedWorkflow> {
        log::debug!("POST {} ({})", paths::WORKFLOWS, request.name);
        let response = self
            .http_client
            .post(self.url(paths::WORKFLOWS))
            .json(request)
            .send()
            .await?;
        decode(response).await
    }

    async fn update_workflow(&self, id: &str, request: &UpdateWorkflowRequest) -> Result<()> {
        log::debug!("PUT {}/{}", paths::WORKFLOWS, id);
        let response = self
            .http_client
            .put(self.workflow_url(id))
            .json(request)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn delete_workflow(&self, id: &str) -> Result<()> {
        log::debug!("DELETE {}/{}", paths::WORKFLOWS, id);
        let response = self.http_client.delete(self.workflow_url(id)).send().await?;
        check(response).await?;
        Ok(())
    }

    async fn run_workflow(&self, id: &str) -> Result<RunResponse> {
        log::debug!("POST {}/{}/run", paths::WORKFLOWS, id);
        let response = self
            .http_client
            .post(format!("{}/run", self.workflow_url(id)))
            .send()
            .await?;
        decode(response).await
    }

    async fn recent_executions(&self) -> Result<Vec<ExecutionSummary>> {
        log::debug!("GET {}", paths::RECENT_EXECUTIONS);
        let response = self
            .http_client
            .get(self.url(paths::RECENT_EXECUTIONS))
            .send()
            .await?;
        decode(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeServer;
    use flow_graph::{WorkflowBuilder, WorkflowStatus};

    fn create_request(name: &str) -> CreateWorkflowRequest {
        let graph = WorkflowBuilder::new()
            .trigger("t")
            .step("n", "slack")
            .connect("t", "n")
            .build();
        CreateWorkflowRequest {
            name: name.to_string(),
            description: String::new(),
            owner_id: Some("owner-1".to_string()),
            status: WorkflowStatus::Draft,
            nodes: graph.nodes,
            edges: graph.edges,
        }
    }

    #[tokio::test]
    async fn test_create_get_update_round() {
        let server = FakeServer::start().await;
        let backend = HttpWorkflowBackend::new(format!("{}/", server.base_url()));

        let created = backend.create_workflow(&create_request("Alerts")).await.unwrap();
        let doc = backend.get_workflow(&created.id).await.unwrap();
        assert_eq!(doc.name, "Alerts");
        assert_eq!(doc.nodes.len(), 2);
        assert_eq!(server.last_owner().as_deref(), Some("owner-1"));

        backend
            .update_workflow(
                &created.id,
                &UpdateWorkflowRequest {
                    name: "Alerts v2".to_string(),
                    status: WorkflowStatus::Active,
                    nodes: doc.nodes.clone(),
                    edges: vec![],
                },
            )
            .await
            .unwrap();

        let doc = backend.get_workflow(&created.id).await.unwrap();
        assert_eq!(doc.name, "Alerts v2");
        assert_eq!(doc.status, WorkflowStatus::Active);
        assert!(doc.edges.is_empty());
    }

    #[tokio::test]
    async fn test_list_unwraps_envelope() {
        let server = FakeServer::start().await;
        let backend = HttpWorkflowBackend::new(server.base_url());
        backend.create_workflow(&create_request("One")).await.unwrap();

        let list = backend.list_workflows().await.unwrap();

        assert_eq!(list.len(), 1);
        assert_eq!(list[0].node_count, 2);
    }

    #[tokio::test]
    async fn test_from_config_with_and_without_timeout() {
        let server = FakeServer::start().await;
        for timeout in [None, Some(5)] {
            let config = ClientConfig {
                api_base_url: server.base_url(),
                request_timeout_secs: timeout,
                ..ClientConfig::default()
            };
            let backend = HttpWorkflowBackend::from_config(&config).unwrap();
            assert!(backend.list_workflows().await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_missing_workflow_is_status_error() {
        let server = FakeServer::start().await;
        let backend = HttpWorkflowBackend::new(server.base_url());

        let err = backend.get_workflow("nope").await.unwrap_err();

        assert!(err.is_not_found());
        match err {
            ClientError::Status { message, .. } => assert_eq!(message, "Workflow not found"),
            other => panic!("Expected Status, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_run_and_recent_executions() {
        let server = FakeServer::start().await;
        let backend = HttpWorkflowBackend::new(server.base_url());
        let created = backend.create_workflow(&create_request("Run me")).await.unwrap();

        let run = backend.run_workflow(&created.id).await.unwrap();
        let recent = backend.recent_executions().await.unwrap();

        assert_eq!(recent[0].id, run.execution_id);
        assert_eq!(recent[0].workflow_id, created.id);
    }

    #[tokio::test]
    async fn test_delete() {
        let server = FakeServer::start().await;
        let backend = HttpWorkflowBackend::new(server.base_url());
        let created = backend.create_workflow(&create_request("Temp")).await.unwrap();

        backend.delete_workflow(&created.id).await.unwrap();

        assert!(backend.list_workflows().await.unwrap().is_empty());
        assert!(backend.delete_workflow(&created.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_unreachable_backend() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let backend = HttpWorkflowBackend::new(format!("http://{}/v1", addr));
        let err = backend.list_workflows().await.unwrap_err();
        assert!(matches!(err, ClientError::Http(_)));
    }
}
