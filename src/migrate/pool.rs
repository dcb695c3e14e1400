//! Bounded-concurrency artifact pool.
//!
//! Every artifact in a mapping is dispatched up front as its own task;
//! a semaphore admits at most `concurrency` of them into the
//! download/upload section at a time. Task errors drain into a channel
//! buffered to the artifact count so no producer ever blocks, and the
//! pool joins everything before aggregating.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use skyline_api::{Artifact, MigrationStatus, MigrationStatusUpdate};

use crate::client::{ClientResult, RegistryClient};
use crate::progress::Progress;

use super::config::{FailureMode, RegistryMapping};

/// Aggregate failure for one mapping run.
///
/// `failed` counts the artifacts whose download or upload failed;
/// cancelled-before-start artifacts are not failures. `details` holds
/// one line per failed artifact for the caller to log.
#[derive(Debug, Error)]
#[error("{failed} artifact migration(s) failed")]
pub struct PoolError {
    pub failed: usize,
    pub details: Vec<String>,
}

/// Worker pool for one source-to-destination mapping.
pub struct MigrationPool {
    registry: Arc<dyn RegistryClient>,
    progress: Progress,
    cancel: CancellationToken,
    concurrency: usize,
    failure_mode: FailureMode,
    overwrite: bool,
}

impl MigrationPool {
    pub fn new(
        registry: Arc<dyn RegistryClient>,
        progress: Progress,
        cancel: CancellationToken,
        concurrency: usize,
        failure_mode: FailureMode,
    ) -> Self {
        Self {
            registry,
            progress,
            cancel,
            concurrency,
            failure_mode,
            overwrite: false,
        }
    }

    /// Pass `--overwrite` through to every upload.
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Migrate `artifacts` into the mapping's destination registry.
    ///
    /// Returns once every dispatched task has finished. Under
    /// [`FailureMode::Stop`] the first failure cancels the pool scope;
    /// tasks that have not entered their transfer yet bail out, while
    /// in-flight transfers run to completion.
    pub async fn run(
        &self,
        mapping: &RegistryMapping,
        artifacts: Vec<Artifact>,
    ) -> Result<(), PoolError> {
        if artifacts.is_empty() {
            return Ok(());
        }

        let semaphore = Arc::new(Semaphore::new(self.concurrency.max(1)));
        // Child scope: fires on user cancellation, or on the first
        // failure when the mode is Stop.
        let scope = self.cancel.child_token();
        let (errors_tx, mut errors_rx) = mpsc::channel(artifacts.len());
        let mut tasks = JoinSet::new();
        let stop_on_error = self.failure_mode == FailureMode::Stop;

        for artifact in artifacts {
            if scope.is_cancelled() {
                break;
            }
            let registry = Arc::clone(&self.registry);
            let progress = self.progress.clone();
            let semaphore = Arc::clone(&semaphore);
            let scope = scope.clone();
            let errors = errors_tx.clone();
            let destination = mapping.destination_registry.clone();
            let overwrite = self.overwrite;

            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };
                if scope.is_cancelled() {
                    return;
                }
                if let Err(err) =
                    migrate_artifact(&*registry, &progress, &scope, &artifact, &destination, overwrite)
                        .await
                {
                    progress.error(&format!(
                        "failed to migrate {} {}: {err}",
                        artifact.name, artifact.version
                    ));
                    if stop_on_error {
                        scope.cancel();
                    }
                    let _ = errors.try_send(format!(
                        "{} {}: {err}",
                        artifact.name, artifact.version
                    ));
                }
            });
        }
        drop(errors_tx);

        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                tracing::error!("artifact migration task panicked: {err}");
            }
        }

        let mut details = Vec::new();
        while let Ok(detail) = errors_rx.try_recv() {
            details.push(detail);
        }
        if details.is_empty() {
            Ok(())
        } else {
            Err(PoolError {
                failed: details.len(),
                details,
            })
        }
    }
}

enum Transfer {
    Done,
    Cancelled,
}

/// Migrate one artifact, reporting status around the transfer.
///
/// Status updates are best-effort telemetry: a failed update is logged
/// and never fails the artifact.
async fn migrate_artifact(
    registry: &dyn RegistryClient,
    progress: &Progress,
    scope: &CancellationToken,
    artifact: &Artifact,
    destination: &str,
    overwrite: bool,
) -> ClientResult<()> {
    report_status(
        registry,
        MigrationStatusUpdate::new(artifact, destination, MigrationStatus::Started),
    )
    .await;

    match transfer(registry, scope, artifact, destination, overwrite).await {
        Ok(Transfer::Done) => {
            report_status(
                registry,
                MigrationStatusUpdate::new(artifact, destination, MigrationStatus::Completed),
            )
            .await;
            progress.step(&format!("{} {} migrated", artifact.name, artifact.version));
            Ok(())
        }
        // Cancelled between download and upload; nothing to report.
        Ok(Transfer::Cancelled) => Ok(()),
        Err(err) => {
            report_status(
                registry,
                MigrationStatusUpdate::new(artifact, destination, MigrationStatus::Failed)
                    .with_error(err.to_string()),
            )
            .await;
            Err(err)
        }
    }
}

async fn transfer(
    registry: &dyn RegistryClient,
    scope: &CancellationToken,
    artifact: &Artifact,
    destination: &str,
    overwrite: bool,
) -> ClientResult<Transfer> {
    let content = registry.download_artifact(artifact).await?;
    if scope.is_cancelled() {
        return Ok(Transfer::Cancelled);
    }
    // The upload target is a rewritten copy; the original keeps the
    // source registry for status updates.
    let mut target = artifact.clone();
    target.registry = destination.to_string();
    registry.upload_artifact(&target, content, overwrite).await?;
    Ok(Transfer::Done)
}

async fn report_status(registry: &dyn RegistryClient, update: MigrationStatusUpdate) {
    if let Err(err) = registry.update_migration_status(&update).await {
        tracing::warn!(
            artifact = %update.artifact_name,
            status = ?update.status,
            "failed to report migration status: {err}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_error_names_the_failed_count() {
        let err = PoolError {
            failed: 3,
            details: vec!["a 1: x".into(), "b 2: y".into(), "c 3: z".into()],
        };
        assert_eq!(err.to_string(), "3 artifact migration(s) failed");
    }
}
