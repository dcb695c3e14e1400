//! Migration config file.
//!
//! A YAML document declaring which registries to migrate and how the
//! pool behaves when an artifact fails.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Pool width used when the config leaves `concurrency` unset or
/// non-positive.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Errors reading or validating the migration config.
#[derive(Debug, Error)]
pub enum MigrationConfigError {
    #[error("failed to read migration config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse migration config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("migration config {path} declares no registry mappings")]
    Empty { path: PathBuf },
}

/// What the pool does when an artifact migration fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureMode {
    /// Keep migrating the remaining artifacts; report failures at the end.
    #[default]
    Continue,
    /// Cancel remaining work after the first failure.
    Stop,
}

/// One source-to-destination registry pair.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryMapping {
    pub source_registry: String,
    pub destination_registry: String,
}

/// The parsed migration config.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationConfig {
    pub mappings: Vec<RegistryMapping>,
    #[serde(default)]
    pub failure_mode: FailureMode,
    /// Requested pool width. Zero or negative means "use the default".
    #[serde(default)]
    pub concurrency: i64,
}

impl MigrationConfig {
    /// Read and parse the config at `path`.
    pub fn load(path: &Path) -> Result<Self, MigrationConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| MigrationConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self =
            serde_yaml::from_str(&raw).map_err(|source| MigrationConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        if config.mappings.is_empty() {
            return Err(MigrationConfigError::Empty {
                path: path.to_path_buf(),
            });
        }
        Ok(config)
    }

    /// The pool width to actually use.
    pub fn effective_concurrency(&self) -> usize {
        effective_concurrency(self.concurrency)
    }
}

/// Clamp a requested width to something usable.
pub fn effective_concurrency(requested: i64) -> usize {
    if requested <= 0 {
        DEFAULT_CONCURRENCY
    } else {
        requested as usize
    }
}
