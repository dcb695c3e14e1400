//! Bounded-time readiness wait.
//!
//! After execution is triggered the platform needs a moment to schedule
//! the pipeline. The walk must not begin until the starting stage has
//! actually reached `Running`, and must not wait forever if it never
//! does.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use skyline_api::NodeStatus;

use crate::client::JobClient;

use super::PlanError;

/// Poll and deadline settings for the readiness wait.
#[derive(Debug, Clone)]
pub struct WaitConfig {
    /// Interval between readiness polls.
    pub poll_interval: Duration,
    /// How long the starting node gets to reach `Running`.
    pub deadline: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            deadline: Duration::from_secs(5),
        }
    }
}

/// Wait until the pipeline's starting node reports `Running`, returning
/// its id.
///
/// A summary without a starting-node id or without that node's layout
/// entry is a not-ready tick. A node that is merely assigned (any status
/// other than `Running`) keeps the wait going. Past the deadline the
/// wait fails with a timeout error naming the configured seconds.
pub async fn wait_for_start(
    jobs: &dyn JobClient,
    cancel: &CancellationToken,
    pipeline_execution_id: &str,
    config: &WaitConfig,
) -> Result<String, PlanError> {
    let deadline = Instant::now() + config.deadline;

    loop {
        if cancel.is_cancelled() {
            return Err(PlanError::Cancelled);
        }

        let execution = jobs
            .get_pipeline_execution(pipeline_execution_id, None)
            .await
            .map_err(PlanError::Poll)?;

        if let Some(summary) = execution.summary() {
            if let Some(starting) = summary.starting_node_id.as_deref() {
                if let Some(node) = summary.layout_node_map.get(starting) {
                    if node.status == NodeStatus::Running {
                        return Ok(starting.to_string());
                    }
                }
            }
        }

        if Instant::now() >= deadline {
            return Err(PlanError::StartTimeout {
                seconds: config.deadline.as_secs(),
            });
        }

        tokio::select! {
            _ = cancel.cancelled() => return Err(PlanError::Cancelled),
            _ = tokio::time::sleep(config.poll_interval) => {}
        }
    }
}
