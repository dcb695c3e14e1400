//! Plan orchestration.
//!
//! Drives one `plan` invocation end to end: workspace lookup, pipeline
//! and upload-root resolution, confirmation, source archiving, the
//! create → upload → execute lifecycle, readiness wait, and the stage
//! walk with live log attachment. Everything shares one cancellation
//! token wired to the interrupt handler.

pub mod wait;

use std::future::Future;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use skyline_api::CustomArgs;

use crate::archive::{sha256_hex, ArchiveError, Archiver};
use crate::client::{ClientError, ClientResult, JobClient, LogClient};
use crate::progress::Progress;
use crate::walk::{WalkError, Walker};
use crate::workspace::{resolve_default_pipeline, resolve_repository_root, WorkspaceError};

pub use wait::{wait_for_start, WaitConfig};

/// Errors for the plan flow.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("failed to fetch workspace: {0}")]
    Workspace(#[source] ClientError),

    #[error(transparent)]
    Resolution(#[from] WorkspaceError),

    #[error("plan not approved")]
    Declined,

    #[error("failed to archive source: {0}")]
    Archive(#[from] ArchiveError),

    #[error("failed to create remote execution: {0}")]
    Create(#[source] ClientError),

    #[error("failed to upload source archive: {0}")]
    Upload(#[source] ClientError),

    #[error("uploaded archive checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("failed to trigger execution: {0}")]
    Execute(#[source] ClientError),

    #[error("execution was triggered but reports no pipeline execution id")]
    MissingPipelineExecution,

    #[error("failed to obtain log token: {0}")]
    LogToken(#[source] ClientError),

    #[error("The pipeline execution was not started after {seconds} seconds")]
    StartTimeout { seconds: u64 },

    #[error("failed to poll pipeline execution: {0}")]
    Poll(#[source] ClientError),

    #[error(transparent)]
    Walk(#[from] WalkError),

    #[error("operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl PlanError {
    /// Map to a process exit code.
    pub fn exit_code(&self) -> i32 {
        match self {
            PlanError::Resolution(_) => 1,
            PlanError::Declined => 1,
            PlanError::Io(_) => 1,
            PlanError::Archive(_) => 92,
            PlanError::Workspace(_)
            | PlanError::Create(_)
            | PlanError::Upload(_)
            | PlanError::ChecksumMismatch { .. }
            | PlanError::Execute(_)
            | PlanError::MissingPipelineExecution
            | PlanError::LogToken(_)
            | PlanError::Poll(_) => 20,
            PlanError::Walk(WalkError::Client(_)) => 20,
            PlanError::Walk(WalkError::Cancelled) => 80,
            PlanError::StartTimeout { .. } => 80,
            PlanError::Cancelled => 80,
        }
    }
}

/// Result type for plan operations.
pub type PlanResult<T> = Result<T, PlanError>;

/// Options for one plan invocation.
#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    /// Workspace to execute against.
    pub workspace_id: String,
    /// Resources passed through to the operation as targets.
    pub targets: Vec<String>,
    /// Resources forced to be replaced.
    pub replace: Vec<String>,
    /// Skip the confirmation prompt.
    pub auto_approve: bool,
}

/// Run the plan flow end to end.
pub async fn run_plan(
    jobs: Arc<dyn JobClient>,
    logs: Arc<dyn LogClient>,
    progress: Progress,
    cancel: CancellationToken,
    options: PlanOptions,
) -> PlanResult<()> {
    progress.start(&format!("Fetching workspace {}", options.workspace_id));
    let workspace = with_cancel(&cancel, jobs.get_workspace(&options.workspace_id))
        .await?
        .map_err(PlanError::Workspace)?;

    let pipeline = resolve_default_pipeline(&workspace, "plan")?;
    progress.step(&format!("Using pipeline {pipeline}"));

    let working_dir = std::env::current_dir()?;
    let repo = resolve_repository_root(&working_dir, workspace.repository_path.as_deref())?;
    if let Some(warning) = &repo.warning {
        progress.step(warning);
    }

    if !options.auto_approve && !confirm("Run plan against this workspace? [y/N] ")? {
        return Err(PlanError::Declined);
    }

    progress.start("Archiving source");
    let archive = Archiver::new(&repo.root).create()?;
    let checksum = sha256_hex(&archive);
    progress.step(&format!("{} bytes, sha256 {checksum}", archive.len()));

    progress.start("Creating remote execution");
    let args = CustomArgs {
        operation: "plan".to_string(),
        targets: options.targets.clone(),
        replace: options.replace.clone(),
    };
    let execution = with_cancel(
        &cancel,
        jobs.create_remote_execution(&options.workspace_id, &pipeline, &args),
    )
    .await?
    .map_err(PlanError::Create)?;

    progress.start("Uploading source archive");
    let execution = with_cancel(&cancel, jobs.upload_remote_execution(&execution.id, archive))
        .await?
        .map_err(PlanError::Upload)?;
    if let Some(remote) = &execution.checksum {
        if remote != &checksum {
            return Err(PlanError::ChecksumMismatch {
                expected: checksum,
                actual: remote.clone(),
            });
        }
    }

    progress.start("Triggering execution");
    let execution = with_cancel(&cancel, jobs.execute_remote_execution(&execution.id))
        .await?
        .map_err(PlanError::Execute)?;
    if let Some(url) = &execution.url {
        progress.success(&format!("Execution started: {url}"));
    }
    let pipeline_execution_id = execution
        .pipeline_execution_id
        .clone()
        .ok_or(PlanError::MissingPipelineExecution)?;

    let token = with_cancel(&cancel, jobs.get_log_token())
        .await?
        .map_err(PlanError::LogToken)?;
    logs.set_token(&token);

    let starting_node_id = wait_for_start(
        jobs.as_ref(),
        &cancel,
        &pipeline_execution_id,
        &WaitConfig::default(),
    )
    .await?;

    let walker = Walker::new(
        Arc::clone(&jobs),
        Arc::clone(&logs),
        progress.clone(),
        cancel.clone(),
    );
    walker
        .walk_stages(&pipeline_execution_id, &starting_node_id)
        .await?;

    progress.success("Plan complete");
    Ok(())
}

/// Run a client call, aborting promptly when the token fires.
async fn with_cancel<T>(
    cancel: &CancellationToken,
    call: impl Future<Output = ClientResult<T>>,
) -> PlanResult<ClientResult<T>> {
    tokio::select! {
        _ = cancel.cancelled() => Err(PlanError::Cancelled),
        result = call => Ok(result),
    }
}

/// Prompt on stderr and read one line from stdin.
fn confirm(prompt: &str) -> io::Result<bool> {
    eprint!("{prompt}");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let answer = line.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}
