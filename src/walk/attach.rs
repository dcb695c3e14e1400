//! Fire-and-forget log attachment.
//!
//! One task per discovered step, spawned by the step walker and never
//! joined back into the poll loop. The task owns everything it needs;
//! errors are reported and swallowed because log output is best-effort.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::client::LogClient;
use crate::progress::Progress;

/// Owned data for one step's log attachment.
#[derive(Debug, Clone)]
pub struct StepAttachment {
    /// Step display name.
    pub name: String,
    /// Resolved log key.
    pub key: String,
    /// Whether the stage was still active when the step was discovered.
    /// Live steps fall back to tailing when the blob has nothing yet.
    pub live: bool,
}

/// Spawn the attachment task for one step.
pub fn spawn_attachment(
    logs: Arc<dyn LogClient>,
    progress: Progress,
    cancel: CancellationToken,
    attachment: StepAttachment,
) {
    tokio::spawn(async move {
        attach_step_logs(logs.as_ref(), &progress, &cancel, &attachment).await;
    });
}

/// Fetch or stream one step's logs.
///
/// Blob first. In the live branch, a failed or empty blob falls back to
/// the tail stream. Nothing here propagates: a failed attachment must
/// never abort the surrounding walk.
pub async fn attach_step_logs(
    logs: &dyn LogClient,
    progress: &Progress,
    cancel: &CancellationToken,
    attachment: &StepAttachment,
) {
    match logs.blob(cancel, &attachment.key).await {
        Ok(0) if attachment.live => {
            tail(logs, progress, cancel, attachment).await;
        }
        Ok(_) => {}
        Err(err) if attachment.live => {
            tracing::warn!(
                step = %attachment.name,
                error = %err,
                "log blob fetch failed, falling back to tail"
            );
            tail(logs, progress, cancel, attachment).await;
        }
        Err(err) => {
            progress.error(&format!(
                "failed to fetch logs for step {}: {err}",
                attachment.name
            ));
        }
    }
}

async fn tail(
    logs: &dyn LogClient,
    progress: &Progress,
    cancel: &CancellationToken,
    attachment: &StepAttachment,
) {
    if let Err(err) = logs.tail(cancel, &attachment.key).await {
        progress.error(&format!(
            "failed to stream logs for step {}: {err}",
            attachment.name
        ));
    }
}
