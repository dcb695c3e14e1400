//! Artifact registry types.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An artifact listed from a registry.
///
/// Never mutated after listing, except that the migration orchestrator
/// rewrites `registry` to the destination before upload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// Artifact name.
    #[serde(default)]
    pub name: String,
    /// Artifact version.
    #[serde(default)]
    pub version: String,
    /// Package type (e.g. "generic", "docker").
    #[serde(default, rename = "type")]
    pub artifact_type: String,
    /// Registry the artifact belongs to.
    #[serde(default)]
    pub registry: String,
    /// Content size in bytes.
    #[serde(default)]
    pub size: u64,
    /// Opaque key/value properties.
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

/// Migration state reported to the status tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MigrationStatus {
    /// Migration of the artifact has begun.
    Started,
    /// Artifact was uploaded to the destination.
    Completed,
    /// Migration of the artifact failed.
    Failed,
}

/// One status update for an artifact under migration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationStatusUpdate {
    /// Artifact name.
    pub artifact_name: String,
    /// Artifact version.
    pub artifact_version: String,
    /// Registry the artifact is migrating from.
    pub source_registry: String,
    /// Registry the artifact is migrating to.
    pub destination_registry: String,
    /// Reported state.
    pub status: MigrationStatus,
    /// Error text, set when `status` is `Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When this update was produced.
    pub updated_at: DateTime<Utc>,
}

impl MigrationStatusUpdate {
    /// Build an update for an artifact headed to `destination`.
    pub fn new(artifact: &Artifact, destination: &str, status: MigrationStatus) -> Self {
        Self {
            artifact_name: artifact.name.clone(),
            artifact_version: artifact.version.clone(),
            source_registry: artifact.registry.clone(),
            destination_registry: destination.to_string(),
            status,
            error: None,
            updated_at: Utc::now(),
        }
    }

    /// Attach error text to a `Failed` update.
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}
