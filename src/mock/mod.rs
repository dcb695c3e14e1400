//! Mock clients for tests.
//!
//! Configurable stand-ins for the three platform clients, with failure
//! injection for exercising error paths.
//!
//! - [`MockJobClient`] serves scripted pipeline-execution snapshots per
//!   poll scope; an exhausted script keeps re-serving its last snapshot,
//!   the way the live endpoint keeps answering polls.
//! - [`MockLogClient`] records blob/tail calls and returns stored line
//!   counts.
//! - [`MockRegistryClient`] holds an in-memory artifact store and tracks
//!   the peak number of simultaneous transfers.
//!
//! Snapshot fixture builders live at the bottom of the module.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use skyline_api::{
    AdjacencyList, Artifact, CustomArgs, DefaultPipelineOverride, ExecutionGraph, ExecutionNode,
    ExecutionSummary, LayoutNode, MigrationStatusUpdate, NodeStatus, PipelineExecution,
    RemoteExecution, Workspace,
};

use crate::client::{ClientError, ClientResult, JobClient, LogClient, RegistryClient};

fn injected(op: &str) -> ClientError {
    ClientError::Api {
        status: 500,
        message: format!("injected failure: {op}"),
    }
}

// ====== job client ======

#[derive(Default)]
struct JobClientState {
    workspace: Workspace,
    execution: RemoteExecution,
    scripts: HashMap<Option<String>, VecDeque<PipelineExecution>>,
    last_served: HashMap<Option<String>, PipelineExecution>,
    created: Vec<CustomArgs>,
    uploaded: Vec<usize>,
    calls: Vec<String>,
    failures: HashSet<String>,
}

/// Scripted job client.
pub struct MockJobClient {
    state: Arc<Mutex<JobClientState>>,
}

impl MockJobClient {
    pub fn new() -> Self {
        let mut default_pipelines = HashMap::new();
        default_pipelines.insert(
            "plan".to_string(),
            DefaultPipelineOverride {
                project_pipeline: None,
                workspace_pipeline: Some("default-plan".to_string()),
            },
        );
        let state = JobClientState {
            workspace: Workspace {
                id: "ws-1".to_string(),
                name: "acceptance".to_string(),
                repository_path: None,
                default_pipelines,
            },
            execution: RemoteExecution {
                id: "exec-1".to_string(),
                checksum: None,
                pipeline_execution_id: Some("pe-1".to_string()),
                url: Some("https://app.skyline.io/executions/exec-1".to_string()),
            },
            ..JobClientState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn set_workspace(&self, workspace: Workspace) {
        self.state.lock().unwrap().workspace = workspace;
    }

    pub fn set_execution(&self, execution: RemoteExecution) {
        self.state.lock().unwrap().execution = execution;
    }

    /// Queue a snapshot for one poll scope (`None` = unscoped).
    pub fn push_snapshot(&self, scope: Option<&str>, snapshot: PipelineExecution) {
        self.state
            .lock()
            .unwrap()
            .scripts
            .entry(scope.map(str::to_string))
            .or_default()
            .push_back(snapshot);
    }

    /// Make the named operation fail with an injected error.
    pub fn fail(&self, op: &str) {
        self.state.lock().unwrap().failures.insert(op.to_string());
    }

    /// Operation names in call order. Poll calls carry their scope as
    /// `get_pipeline_execution:<stage-id>` (`-` when unscoped).
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// How many polls ran for one scope.
    pub fn poll_count(&self, scope: Option<&str>) -> usize {
        let wanted = format!("get_pipeline_execution:{}", scope.unwrap_or("-"));
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|call| **call == wanted)
            .count()
    }

    /// Args recorded by `create_remote_execution`.
    pub fn created_args(&self) -> Vec<CustomArgs> {
        self.state.lock().unwrap().created.clone()
    }

    /// Archive sizes recorded by `upload_remote_execution`.
    pub fn uploaded_sizes(&self) -> Vec<usize> {
        self.state.lock().unwrap().uploaded.clone()
    }

    fn enter(&self, op: &str) -> ClientResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(op.to_string());
        if state.failures.contains(op.split(':').next().unwrap_or(op)) {
            return Err(injected(op));
        }
        Ok(())
    }
}

impl Default for MockJobClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobClient for MockJobClient {
    async fn get_workspace(&self, _workspace_id: &str) -> ClientResult<Workspace> {
        self.enter("get_workspace")?;
        Ok(self.state.lock().unwrap().workspace.clone())
    }

    async fn create_remote_execution(
        &self,
        _workspace_id: &str,
        _pipeline: &str,
        args: &CustomArgs,
    ) -> ClientResult<RemoteExecution> {
        self.enter("create_remote_execution")?;
        let mut state = self.state.lock().unwrap();
        state.created.push(args.clone());
        Ok(state.execution.clone())
    }

    async fn upload_remote_execution(
        &self,
        _execution_id: &str,
        archive: Vec<u8>,
    ) -> ClientResult<RemoteExecution> {
        self.enter("upload_remote_execution")?;
        let mut state = self.state.lock().unwrap();
        state.uploaded.push(archive.len());
        Ok(state.execution.clone())
    }

    async fn execute_remote_execution(&self, _execution_id: &str) -> ClientResult<RemoteExecution> {
        self.enter("execute_remote_execution")?;
        Ok(self.state.lock().unwrap().execution.clone())
    }

    async fn get_pipeline_execution(
        &self,
        _pipeline_execution_id: &str,
        stage_node_id: Option<&str>,
    ) -> ClientResult<PipelineExecution> {
        self.enter(&format!(
            "get_pipeline_execution:{}",
            stage_node_id.unwrap_or("-")
        ))?;
        let key = stage_node_id.map(str::to_string);
        let mut state = self.state.lock().unwrap();
        let popped = state
            .scripts
            .get_mut(&key)
            .and_then(|script| script.pop_front());
        if let Some(snapshot) = popped {
            state.last_served.insert(key, snapshot.clone());
            return Ok(snapshot);
        }
        if let Some(last) = state.last_served.get(&key) {
            return Ok(last.clone());
        }
        // Nothing scripted: a settling execution with no summary yet.
        Ok(PipelineExecution::default())
    }

    async fn get_log_token(&self) -> ClientResult<String> {
        self.enter("get_log_token")?;
        Ok("mock-token".to_string())
    }
}

// ====== log client ======

#[derive(Default)]
struct LogClientState {
    token: Option<String>,
    blobs: HashMap<String, usize>,
    blob_calls: Vec<String>,
    tail_calls: Vec<String>,
    fail_blob: bool,
    fail_tail: bool,
}

/// Recording log client.
pub struct MockLogClient {
    state: Arc<Mutex<LogClientState>>,
}

impl MockLogClient {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(LogClientState::default())),
        }
    }

    /// Store a blob line count for a key; unset keys report zero lines.
    pub fn store_blob(&self, key: &str, lines: usize) {
        self.state.lock().unwrap().blobs.insert(key.to_string(), lines);
    }

    pub fn fail_blob(&self) {
        self.state.lock().unwrap().fail_blob = true;
    }

    pub fn fail_tail(&self) {
        self.state.lock().unwrap().fail_tail = true;
    }

    /// Keys passed to `blob`, in call order.
    pub fn blob_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().blob_calls.clone()
    }

    /// Keys passed to `tail`, in call order.
    pub fn tail_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().tail_calls.clone()
    }

    pub fn token(&self) -> Option<String> {
        self.state.lock().unwrap().token.clone()
    }
}

impl Default for MockLogClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LogClient for MockLogClient {
    fn set_token(&self, token: &str) {
        self.state.lock().unwrap().token = Some(token.to_string());
    }

    async fn blob(&self, _cancel: &CancellationToken, key: &str) -> ClientResult<usize> {
        let mut state = self.state.lock().unwrap();
        state.blob_calls.push(key.to_string());
        if state.token.is_none() {
            return Err(ClientError::TokenMissing);
        }
        if state.fail_blob {
            return Err(injected("blob"));
        }
        Ok(state.blobs.get(key).copied().unwrap_or(0))
    }

    async fn tail(&self, _cancel: &CancellationToken, key: &str) -> ClientResult<()> {
        let mut state = self.state.lock().unwrap();
        state.tail_calls.push(key.to_string());
        if state.token.is_none() {
            return Err(ClientError::TokenMissing);
        }
        if state.fail_tail {
            return Err(injected("tail"));
        }
        Ok(())
    }
}

// ====== registry client ======

#[derive(Default)]
struct RegistryClientState {
    artifacts: HashMap<String, Vec<Artifact>>,
    content: HashMap<String, Vec<u8>>,
    downloads: Vec<String>,
    uploads: Vec<(Artifact, bool)>,
    status_updates: Vec<MigrationStatusUpdate>,
    fail_list: HashSet<String>,
    fail_download: HashSet<String>,
    fail_upload: HashSet<String>,
    fail_status: bool,
    transfer_delay: Duration,
    in_flight: usize,
    max_in_flight: usize,
}

/// In-memory registry client.
///
/// The in-flight gauge rises when a download starts and falls when the
/// matching upload begins or the download fails, so its peak is the
/// number of artifacts simultaneously inside the transfer section.
pub struct MockRegistryClient {
    state: Arc<Mutex<RegistryClientState>>,
}

impl MockRegistryClient {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(RegistryClientState::default())),
        }
    }

    /// Add an artifact (with generated content) to a registry.
    pub fn add_artifact(&self, registry: &str, name: &str, version: &str) {
        let content = format!("{name}-{version}").into_bytes();
        let artifact = Artifact {
            name: name.to_string(),
            version: version.to_string(),
            artifact_type: "generic".to_string(),
            registry: registry.to_string(),
            size: content.len() as u64,
            properties: HashMap::new(),
        };
        let mut state = self.state.lock().unwrap();
        state.content.insert(content_key(&artifact), content);
        state
            .artifacts
            .entry(registry.to_string())
            .or_default()
            .push(artifact);
    }

    pub fn fail_list(&self, registry: &str) {
        self.state.lock().unwrap().fail_list.insert(registry.to_string());
    }

    /// Make downloads of the named artifact fail.
    pub fn fail_download(&self, name: &str) {
        self.state.lock().unwrap().fail_download.insert(name.to_string());
    }

    /// Make uploads of the named artifact fail.
    pub fn fail_upload(&self, name: &str) {
        self.state.lock().unwrap().fail_upload.insert(name.to_string());
    }

    /// Make every status update fail.
    pub fn fail_status(&self) {
        self.state.lock().unwrap().fail_status = true;
    }

    /// Sleep this long inside each download and upload.
    pub fn set_transfer_delay(&self, delay: Duration) {
        self.state.lock().unwrap().transfer_delay = delay;
    }

    /// Artifact names passed to `download_artifact`, in call order.
    pub fn downloads(&self) -> Vec<String> {
        self.state.lock().unwrap().downloads.clone()
    }

    /// Uploaded artifacts with their overwrite flags.
    pub fn uploads(&self) -> Vec<(Artifact, bool)> {
        self.state.lock().unwrap().uploads.clone()
    }

    /// Every status update received, in arrival order.
    pub fn status_updates(&self) -> Vec<MigrationStatusUpdate> {
        self.state.lock().unwrap().status_updates.clone()
    }

    /// Peak number of artifacts simultaneously in the transfer section.
    pub fn max_in_flight(&self) -> usize {
        self.state.lock().unwrap().max_in_flight
    }
}

impl Default for MockRegistryClient {
    fn default() -> Self {
        Self::new()
    }
}

fn content_key(artifact: &Artifact) -> String {
    format!("{}@{}", artifact.name, artifact.version)
}

#[async_trait]
impl RegistryClient for MockRegistryClient {
    async fn list_artifacts(&self, registry: &str) -> ClientResult<Vec<Artifact>> {
        let state = self.state.lock().unwrap();
        if state.fail_list.contains(registry) {
            return Err(injected("list_artifacts"));
        }
        Ok(state.artifacts.get(registry).cloned().unwrap_or_default())
    }

    async fn download_artifact(&self, artifact: &Artifact) -> ClientResult<Vec<u8>> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            state.downloads.push(artifact.name.clone());
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
            state.transfer_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock().unwrap();
        if state.fail_download.contains(&artifact.name) {
            state.in_flight -= 1;
            return Err(injected("download_artifact"));
        }
        match state.content.get(&content_key(artifact)) {
            Some(content) => Ok(content.clone()),
            None => {
                state.in_flight -= 1;
                Err(ClientError::Api {
                    status: 404,
                    message: format!("artifact {} not found", artifact.name),
                })
            }
        }
    }

    async fn upload_artifact(
        &self,
        artifact: &Artifact,
        content: Vec<u8>,
        overwrite: bool,
    ) -> ClientResult<()> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            state.in_flight -= 1;
            state.transfer_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock().unwrap();
        if state.fail_upload.contains(&artifact.name) {
            return Err(injected("upload_artifact"));
        }
        state.content.insert(content_key(artifact), content);
        state.uploads.push((artifact.clone(), overwrite));
        Ok(())
    }

    async fn update_migration_status(&self, update: &MigrationStatusUpdate) -> ClientResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_status {
            return Err(injected("update_migration_status"));
        }
        state.status_updates.push(update.clone());
        Ok(())
    }
}

// ====== snapshot fixtures ======

/// A stage layout node of a user-visible type.
pub fn stage_node(id: &str, name: &str, status: NodeStatus, next_ids: &[&str]) -> LayoutNode {
    LayoutNode {
        node_id: id.to_string(),
        name: name.to_string(),
        status,
        node_type: "Custom".to_string(),
        next_ids: next_ids.iter().map(|s| s.to_string()).collect(),
    }
}

/// A step node of a user-visible type, with log key `key-{id}`.
pub fn step_node(id: &str, name: &str, status: NodeStatus) -> ExecutionNode {
    ExecutionNode {
        uuid: id.to_string(),
        name: name.to_string(),
        status,
        step_type: "Custom".to_string(),
        log_base_key: format!("key-{id}"),
        executable_responses: Vec::new(),
    }
}

/// A step graph from nodes plus `(id, children, next_ids)` edges.
pub fn step_graph(
    root: &str,
    steps: Vec<ExecutionNode>,
    edges: &[(&str, &[&str], &[&str])],
) -> ExecutionGraph {
    ExecutionGraph {
        root_node_id: root.to_string(),
        node_map: steps.into_iter().map(|s| (s.uuid.clone(), s)).collect(),
        node_adjacency_list_map: edges
            .iter()
            .map(|(id, children, next_ids)| {
                (
                    id.to_string(),
                    AdjacencyList {
                        children: children.iter().map(|s| s.to_string()).collect(),
                        next_ids: next_ids.iter().map(|s| s.to_string()).collect(),
                    },
                )
            })
            .collect(),
    }
}

/// An unscoped poll snapshot: stage layout, no step graph.
pub fn unscoped_snapshot(starting_node_id: &str, stages: Vec<LayoutNode>) -> PipelineExecution {
    PipelineExecution {
        pipeline_execution_summary: Some(ExecutionSummary {
            starting_node_id: Some(starting_node_id.to_string()),
            status: NodeStatus::Running,
            layout_node_map: stages
                .into_iter()
                .map(|s| (s.node_id.clone(), s))
                .collect(),
            execution_graph: None,
        }),
    }
}

/// A stage-scoped poll snapshot: stage layout plus that stage's graph.
pub fn scoped_snapshot(
    starting_node_id: &str,
    stages: Vec<LayoutNode>,
    graph: ExecutionGraph,
) -> PipelineExecution {
    PipelineExecution {
        pipeline_execution_summary: Some(ExecutionSummary {
            starting_node_id: Some(starting_node_id.to_string()),
            status: NodeStatus::Running,
            layout_node_map: stages
                .into_iter()
                .map(|s| (s.node_id.clone(), s))
                .collect(),
            execution_graph: Some(graph),
        }),
    }
}

/// A workspace whose named operation has a default pipeline configured.
pub fn workspace_with_pipeline(id: &str, operation: &str, pipeline: &str) -> Workspace {
    let mut default_pipelines = HashMap::new();
    default_pipelines.insert(
        operation.to_string(),
        DefaultPipelineOverride {
            project_pipeline: None,
            workspace_pipeline: Some(pipeline.to_string()),
        },
    );
    Workspace {
        id: id.to_string(),
        name: id.to_string(),
        repository_path: None,
        default_pipelines,
    }
}
