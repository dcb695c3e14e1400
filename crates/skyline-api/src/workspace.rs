//! Workspace types.
//!
//! A workspace identifies a remote execution target and carries the
//! per-operation default pipeline configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A Skyline workspace.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    /// Workspace identifier.
    #[serde(default)]
    pub id: String,
    /// Workspace display name.
    #[serde(default)]
    pub name: String,
    /// Optional subpath of the working directory that must be uploaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_path: Option<String>,
    /// Default pipeline overrides keyed by operation name ("plan", ...).
    #[serde(default)]
    pub default_pipelines: HashMap<String, DefaultPipelineOverride>,
}

/// Default pipeline configuration for one operation.
///
/// The workspace-level override wins over the project-level one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultPipelineOverride {
    /// Pipeline configured at the project level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_pipeline: Option<String>,
    /// Pipeline configured at the workspace level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_pipeline: Option<String>,
}
