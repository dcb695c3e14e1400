//! Stage and step walkers.
//!
//! The stage walker polls the unscoped pipeline execution on a coarse
//! interval and hands each newly active stage to the step walker exactly
//! once, in pipeline order. The step walker polls scoped to its stage on
//! a faster interval, announces steps exactly once in discovery order,
//! and spawns a log attachment per step without blocking discovery.
//! Stage walks are sequential: one stage is fully drained before the
//! next poll resumes, while log streaming within the stage runs
//! concurrently.

pub mod attach;
pub mod graph;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use skyline_api::{ExecutionNode, PipelineExecution};

use crate::client::{ClientError, JobClient, LogClient};
use crate::progress::Progress;

pub use attach::StepAttachment;
pub use graph::{next_active_stage, next_active_step, next_inactive_step};

/// Errors for the walk.
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("failed to fetch pipeline execution: {0}")]
    Client(#[from] ClientError),

    #[error("operation cancelled")]
    Cancelled,
}

/// Poll cadences for the walk.
#[derive(Debug, Clone)]
pub struct WalkConfig {
    /// Interval between unscoped stage polls.
    pub stage_interval: Duration,
    /// Interval between stage-scoped step polls.
    pub step_interval: Duration,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            stage_interval: Duration::from_secs(3),
            step_interval: Duration::from_secs(1),
        }
    }
}

/// Drives stage and step discovery for one pipeline execution.
pub struct Walker {
    jobs: Arc<dyn JobClient>,
    logs: Arc<dyn LogClient>,
    progress: Progress,
    cancel: CancellationToken,
    config: WalkConfig,
}

impl Walker {
    /// Create a walker with the default cadences.
    pub fn new(
        jobs: Arc<dyn JobClient>,
        logs: Arc<dyn LogClient>,
        progress: Progress,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            jobs,
            logs,
            progress,
            cancel,
            config: WalkConfig::default(),
        }
    }

    /// Override the poll cadences.
    pub fn with_config(mut self, config: WalkConfig) -> Self {
        self.config = config;
        self
    }

    /// Walk the pipeline's stages from `starting_node_id`, draining each
    /// discovered stage's steps before resuming the stage poll.
    ///
    /// Returns once the layout has no further active stage.
    pub async fn walk_stages(
        &self,
        pipeline_execution_id: &str,
        starting_node_id: &str,
    ) -> Result<(), WalkError> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut cursor = starting_node_id.to_string();

        loop {
            let execution = self.fetch(pipeline_execution_id, None).await?;
            if let Some(summary) = execution.summary() {
                if !summary.layout_node_map.is_empty() {
                    match graph::next_active_stage(&summary.layout_node_map, &cursor) {
                        None => return Ok(()),
                        Some(stage) if !visited.contains(&stage.node_id) => {
                            visited.insert(stage.node_id.clone());
                            cursor = stage.node_id.clone();
                            self.progress.start(&format!("Stage: {}", stage.name));
                            self.walk_steps(pipeline_execution_id, &cursor).await?;
                        }
                        // Still waiting on the same stage.
                        Some(_) => {}
                    }
                }
            }
            self.sleep(self.config.stage_interval).await?;
        }
    }

    /// Walk one stage's step graph until its steps are exhausted.
    ///
    /// While the stage is active, only active steps are surfaced and each
    /// gets a live attachment (blob with tail fallback). Once the stage
    /// is terminal, every remaining unvisited step is swept in graph
    /// order with a blob-only attachment; an exhausted sweep ends the
    /// walk for this stage.
    pub async fn walk_steps(
        &self,
        pipeline_execution_id: &str,
        stage_node_id: &str,
    ) -> Result<(), WalkError> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut cursor: Option<String> = None;

        loop {
            let execution = self.fetch(pipeline_execution_id, Some(stage_node_id)).await?;
            if let Some(summary) = execution.summary() {
                let stage_status = summary
                    .layout_node_map
                    .get(stage_node_id)
                    .map(|stage| stage.status);
                if let (Some(status), Some(step_graph)) =
                    (stage_status, summary.execution_graph.as_ref())
                {
                    let start = cursor
                        .clone()
                        .unwrap_or_else(|| step_graph.root_node_id.clone());

                    if status.is_active() {
                        if let Some(node) = graph::next_active_step(step_graph, &start) {
                            if !visited.contains(&node.uuid) {
                                visited.insert(node.uuid.clone());
                                cursor = Some(node.uuid.clone());
                                self.announce_step(node, true);
                            }
                        }
                    } else if status.is_terminal() {
                        match graph::next_inactive_step(step_graph, &start, &visited) {
                            None => return Ok(()),
                            Some(node) => {
                                visited.insert(node.uuid.clone());
                                cursor = Some(node.uuid.clone());
                                self.announce_step(node, false);
                            }
                        }
                    }
                    // Unknown stage status: treat as not ready.
                }
            }
            self.sleep(self.config.step_interval).await?;
        }
    }

    fn announce_step(&self, node: &ExecutionNode, live: bool) {
        self.progress.step(&format!("Step: {}", node.name));
        let attachment = StepAttachment {
            name: node.name.clone(),
            key: node.resolve_log_key().to_string(),
            live,
        };
        attach::spawn_attachment(
            Arc::clone(&self.logs),
            self.progress.clone(),
            self.cancel.clone(),
            attachment,
        );
    }

    async fn fetch(
        &self,
        pipeline_execution_id: &str,
        stage_node_id: Option<&str>,
    ) -> Result<PipelineExecution, WalkError> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(WalkError::Cancelled),
            result = self
                .jobs
                .get_pipeline_execution(pipeline_execution_id, stage_node_id) => Ok(result?),
        }
    }

    async fn sleep(&self, interval: Duration) -> Result<(), WalkError> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(WalkError::Cancelled),
            _ = tokio::time::sleep(interval) => Ok(()),
        }
    }
}
