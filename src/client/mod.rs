//! Platform service clients.
//!
//! Orchestration consumes the services through the traits here and holds
//! them as `Arc<dyn …>`, so tests can substitute the mocks in
//! [`crate::mock`]. The HTTP implementations live in [`http`] and
//! [`logs`].

pub mod http;
pub mod logs;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use skyline_api::{
    Artifact, CustomArgs, MigrationStatusUpdate, PipelineExecution, RemoteExecution, Workspace,
};

pub use http::{ApiClient, ApiClientConfig};
pub use logs::{HttpLogClient, LogClientConfig};

/// Errors for client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level failure (connect, send, decode).
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote side rejected the call.
    #[error("remote error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Log client used before `set_token`.
    #[error("log token not set")]
    TokenMissing,
}

/// Result alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Remote-execution lifecycle and workspace lookup.
///
/// Every failure is fatal to the operation in progress; retries, if any,
/// belong to the transport underneath. `get_pipeline_execution` is polled
/// repeatedly and must accept both an unscoped call (top-level summary)
/// and a stage-scoped call (that stage's step graph); a summary with
/// absent graph is a valid not-ready response.
#[async_trait]
pub trait JobClient: Send + Sync {
    async fn get_workspace(&self, workspace_id: &str) -> ClientResult<Workspace>;

    async fn create_remote_execution(
        &self,
        workspace_id: &str,
        pipeline: &str,
        args: &CustomArgs,
    ) -> ClientResult<RemoteExecution>;

    async fn upload_remote_execution(
        &self,
        execution_id: &str,
        archive: Vec<u8>,
    ) -> ClientResult<RemoteExecution>;

    async fn execute_remote_execution(&self, execution_id: &str) -> ClientResult<RemoteExecution>;

    async fn get_pipeline_execution(
        &self,
        pipeline_execution_id: &str,
        stage_node_id: Option<&str>,
    ) -> ClientResult<PipelineExecution>;

    async fn get_log_token(&self) -> ClientResult<String>;
}

/// Log retrieval for one step at a time.
#[async_trait]
pub trait LogClient: Send + Sync {
    /// Store the token for subsequent calls. Must be called once, before
    /// any blob or tail.
    fn set_token(&self, token: &str);

    /// Fetch a completed log blob, printing its lines. Returns the line
    /// count; zero means nothing is stored yet and a live tail may apply.
    async fn blob(&self, cancel: &CancellationToken, key: &str) -> ClientResult<usize>;

    /// Stream live log lines until the stream ends or `cancel` fires.
    async fn tail(&self, cancel: &CancellationToken, key: &str) -> ClientResult<()>;
}

/// Artifact registry operations used by migration.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    async fn list_artifacts(&self, registry: &str) -> ClientResult<Vec<Artifact>>;

    async fn download_artifact(&self, artifact: &Artifact) -> ClientResult<Vec<u8>>;

    async fn upload_artifact(
        &self,
        artifact: &Artifact,
        content: Vec<u8>,
        overwrite: bool,
    ) -> ClientResult<()>;

    async fn update_migration_status(&self, update: &MigrationStatusUpdate) -> ClientResult<()>;
}

/// Turn a non-success response into a `ClientError::Api`.
///
/// Prefers the `message` field of a JSON error body, falling back to the
/// raw body truncated to one line.
pub(crate) async fn error_from_response(response: reqwest::Response) -> ClientError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    ClientError::Api {
        status,
        message: extract_error_message(&body),
    }
}

fn extract_error_message(body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        message: String,
    }
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return parsed.message;
    }
    let line = body.lines().next().unwrap_or_default();
    if line.is_empty() {
        "no error detail".to_string()
    } else {
        line.to_string()
    }
}
