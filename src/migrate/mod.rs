//! Artifact migration between registries.
//!
//! A structurally separate flow from plan orchestration, sharing the
//! client traits and the cancellation token. The config file declares
//! source-to-destination mappings; each mapping runs through the
//! bounded [`pool`], and the failure mode decides whether a failed
//! mapping stops the run or is logged and skipped.

pub mod config;
pub mod pool;

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::client::{ClientError, RegistryClient};
use crate::progress::Progress;

pub use config::{
    effective_concurrency, FailureMode, MigrationConfig, MigrationConfigError, RegistryMapping,
    DEFAULT_CONCURRENCY,
};
pub use pool::{MigrationPool, PoolError};

/// Errors for the migrate flow.
#[derive(Debug, Error)]
pub enum MigrateError {
    #[error(transparent)]
    Config(#[from] MigrationConfigError),

    #[error("failed to list artifacts in {registry}: {source}")]
    List {
        registry: String,
        #[source]
        source: ClientError,
    },

    #[error("{failed} artifact migration(s) failed")]
    ArtifactsFailed { failed: usize },

    #[error("operation cancelled")]
    Cancelled,
}

impl MigrateError {
    /// Map to a process exit code.
    pub fn exit_code(&self) -> i32 {
        match self {
            MigrateError::Config(_) => 1,
            MigrateError::List { .. } => 20,
            MigrateError::ArtifactsFailed { .. } => 70,
            MigrateError::Cancelled => 80,
        }
    }
}

/// Options for one migrate invocation.
#[derive(Debug, Clone, Default)]
pub struct MigrateOptions {
    /// Path to the YAML mapping config.
    pub config_path: PathBuf,
    /// Pool width override; the config's value applies when unset.
    pub concurrency: Option<i64>,
    /// Overwrite artifacts that already exist in the destination.
    pub overwrite: bool,
}

/// Run every mapping in the config through the pool.
///
/// Under [`FailureMode::Stop`] the first failed mapping aborts the run
/// with its failed-artifact count. Under [`FailureMode::Continue`] all
/// mappings are attempted and the run exits cleanly with failures
/// logged.
pub async fn run_migrate(
    registry: Arc<dyn RegistryClient>,
    progress: Progress,
    cancel: CancellationToken,
    options: MigrateOptions,
) -> Result<(), MigrateError> {
    let config = MigrationConfig::load(&options.config_path)?;
    let concurrency = match options.concurrency {
        Some(requested) => effective_concurrency(requested),
        None => config.effective_concurrency(),
    };

    let mut failed_mappings = 0usize;
    let mut failed_artifacts = 0usize;

    for mapping in &config.mappings {
        if cancel.is_cancelled() {
            return Err(MigrateError::Cancelled);
        }
        progress.start(&format!(
            "Migrating {} to {}",
            mapping.source_registry, mapping.destination_registry
        ));

        let artifacts = match registry.list_artifacts(&mapping.source_registry).await {
            Ok(artifacts) => artifacts,
            Err(source) => match config.failure_mode {
                FailureMode::Stop => {
                    return Err(MigrateError::List {
                        registry: mapping.source_registry.clone(),
                        source,
                    })
                }
                FailureMode::Continue => {
                    progress.error(&format!(
                        "failed to list artifacts in {}: {source}",
                        mapping.source_registry
                    ));
                    failed_mappings += 1;
                    continue;
                }
            },
        };
        progress.step(&format!("{} artifact(s)", artifacts.len()));

        let pool = MigrationPool::new(
            Arc::clone(&registry),
            progress.clone(),
            cancel.clone(),
            concurrency,
            config.failure_mode,
        )
        .with_overwrite(options.overwrite);

        match pool.run(mapping, artifacts).await {
            Ok(()) => progress.success(&format!(
                "Migrated {} to {}",
                mapping.source_registry, mapping.destination_registry
            )),
            Err(err) => {
                if cancel.is_cancelled() {
                    return Err(MigrateError::Cancelled);
                }
                failed_mappings += 1;
                failed_artifacts += err.failed;
                for detail in &err.details {
                    tracing::warn!("artifact failed: {detail}");
                }
                match config.failure_mode {
                    FailureMode::Stop => {
                        return Err(MigrateError::ArtifactsFailed { failed: err.failed })
                    }
                    FailureMode::Continue => progress.error(&err.to_string()),
                }
            }
        }
    }

    if cancel.is_cancelled() {
        return Err(MigrateError::Cancelled);
    }
    if failed_mappings > 0 {
        progress.error(&format!(
            "{failed_mappings} mapping(s) had failures ({failed_artifacts} artifact(s))"
        ));
    }
    Ok(())
}
