//! HTTP implementation of the job and registry clients.
//!
//! One `ApiClient` serves both traits: the remote-execution lifecycle
//! endpoints and the artifact-registry endpoints share the base URL,
//! bearer auth, and per-run correlation id.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use skyline_api::{
    ApiEnvelope, Artifact, CustomArgs, LogToken, MigrationStatusUpdate, PipelineExecution,
    RemoteExecution, Workspace,
};

use super::{error_from_response, ClientError, ClientResult, JobClient, RegistryClient};

/// Header carrying the per-run correlation id.
const CORRELATION_HEADER: &str = "x-correlation-id";

/// Configuration for the API client.
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Base URL of the platform API.
    pub base_url: String,
    /// Bearer token.
    pub api_key: String,
    /// Organization scope applied to every call, if any.
    pub org_id: Option<String>,
    /// Project scope applied to every call, if any.
    pub project_id: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: crate::config::DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            org_id: None,
            project_id: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Client for the job-control and registry endpoints.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    org_id: Option<String>,
    project_id: Option<String>,
}

impl ApiClient {
    /// Build a client. Assigns a fresh correlation id for the run.
    pub fn new(config: ApiClientConfig) -> ClientResult<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .unwrap_or_else(|_| HeaderValue::from_static("Bearer"));
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        if let Ok(value) = HeaderValue::from_str(&Uuid::new_v4().to_string()) {
            headers.insert(CORRELATION_HEADER, value);
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            org_id: config.org_id,
            project_id: config.project_id,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Org/project scope pairs appended to every request.
    fn scope(&self) -> Vec<(&'static str, String)> {
        let mut scope = Vec::new();
        if let Some(org) = &self.org_id {
            scope.push(("orgId", org.clone()));
        }
        if let Some(project) = &self.project_id {
            scope.push(("projectId", project.clone()));
        }
        scope
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        let envelope: ApiEnvelope<T> = response.json().await?;
        Ok(envelope.data)
    }

    async fn expect_success(response: reqwest::Response) -> ClientResult<()> {
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }
}

#[async_trait]
impl JobClient for ApiClient {
    async fn get_workspace(&self, workspace_id: &str) -> ClientResult<Workspace> {
        let response = self
            .http
            .get(self.url(&format!("workspaces/{workspace_id}")))
            .query(&self.scope())
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn create_remote_execution(
        &self,
        workspace_id: &str,
        pipeline: &str,
        args: &CustomArgs,
    ) -> ClientResult<RemoteExecution> {
        let response = self
            .http
            .post(self.url(&format!("workspaces/{workspace_id}/executions")))
            .query(&self.scope())
            .query(&[("pipeline", pipeline)])
            .json(args)
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn upload_remote_execution(
        &self,
        execution_id: &str,
        archive: Vec<u8>,
    ) -> ClientResult<RemoteExecution> {
        let response = self
            .http
            .put(self.url(&format!("executions/{execution_id}/source")))
            .query(&self.scope())
            .header(reqwest::header::CONTENT_TYPE, "application/x-tar")
            .body(archive)
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn execute_remote_execution(&self, execution_id: &str) -> ClientResult<RemoteExecution> {
        let response = self
            .http
            .post(self.url(&format!("executions/{execution_id}/run")))
            .query(&self.scope())
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn get_pipeline_execution(
        &self,
        pipeline_execution_id: &str,
        stage_node_id: Option<&str>,
    ) -> ClientResult<PipelineExecution> {
        let mut request = self
            .http
            .get(self.url(&format!("pipeline-executions/{pipeline_execution_id}")))
            .query(&self.scope());
        if let Some(stage) = stage_node_id {
            request = request.query(&[("stageNodeId", stage)]);
        }
        Self::parse(request.send().await?).await
    }

    async fn get_log_token(&self) -> ClientResult<String> {
        let response = self
            .http
            .get(self.url("logs/token"))
            .query(&self.scope())
            .send()
            .await?;
        let token: LogToken = Self::parse(response).await?;
        Ok(token.token)
    }
}

#[async_trait]
impl RegistryClient for ApiClient {
    async fn list_artifacts(&self, registry: &str) -> ClientResult<Vec<Artifact>> {
        let response = self
            .http
            .get(self.url(&format!("registries/{registry}/artifacts")))
            .query(&self.scope())
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn download_artifact(&self, artifact: &Artifact) -> ClientResult<Vec<u8>> {
        let response = self
            .http
            .get(self.url(&format!(
                "registries/{}/artifacts/{}/versions/{}/content",
                artifact.registry, artifact.name, artifact.version
            )))
            .query(&self.scope())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response.bytes().await?.to_vec())
    }

    async fn upload_artifact(
        &self,
        artifact: &Artifact,
        content: Vec<u8>,
        overwrite: bool,
    ) -> ClientResult<()> {
        let response = self
            .http
            .put(self.url(&format!(
                "registries/{}/artifacts/{}/versions/{}/content",
                artifact.registry, artifact.name, artifact.version
            )))
            .query(&self.scope())
            .query(&[("overwrite", overwrite)])
            .body(content)
            .send()
            .await?;
        Self::expect_success(response).await
    }

    async fn update_migration_status(&self, update: &MigrationStatusUpdate) -> ClientResult<()> {
        let response = self
            .http
            .post(self.url("migrations/artifact-status"))
            .query(&self.scope())
            .json(update)
            .send()
            .await?;
        Self::expect_success(response).await
    }
}
