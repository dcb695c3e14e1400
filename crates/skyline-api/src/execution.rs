//! Remote execution types.
//!
//! A remote execution is the job record driven through
//! create → upload → execute; once triggered it references a pipeline
//! execution whose nested graph is polled separately.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::graph::{ExecutionGraph, LayoutNode};
use crate::status::NodeStatus;

/// A remote execution job record.
///
/// Every lifecycle call returns a fresh snapshot; callers always re-read
/// the latest struct rather than patching an older one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteExecution {
    /// Execution identifier.
    #[serde(default)]
    pub id: String,
    /// Checksum of the uploaded source archive, once uploaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    /// Pipeline execution identifier, once execution is triggered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_execution_id: Option<String>,
    /// Human-facing URL for the execution, once triggered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Caller-supplied arguments recorded on the remote execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomArgs {
    /// Operation name ("plan", ...).
    #[serde(default)]
    pub operation: String,
    /// Resources targeted by the operation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<String>,
    /// Resources forced to be replaced.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replace: Vec<String>,
}

/// A pipeline execution snapshot returned by the status-poll endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineExecution {
    /// Summary of the execution; absent while the execution is settling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_execution_summary: Option<ExecutionSummary>,
}

impl PipelineExecution {
    /// The summary, if the execution has one yet.
    pub fn summary(&self) -> Option<&ExecutionSummary> {
        self.pipeline_execution_summary.as_ref()
    }
}

/// Pipeline execution summary.
///
/// Unscoped polls return the stage layout only; polls scoped to a stage
/// also carry that stage's step graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSummary {
    /// Id of the stage the pipeline starts at; absent while settling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_node_id: Option<String>,
    /// Overall execution status.
    #[serde(default)]
    pub status: NodeStatus,
    /// Stage id → stage layout node.
    #[serde(default)]
    pub layout_node_map: HashMap<String, LayoutNode>,
    /// Step graph of the scoped stage; absent on unscoped polls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_graph: Option<ExecutionGraph>,
}

/// Token for the log service, obtained once per run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogToken {
    /// The opaque token value.
    #[serde(default)]
    pub token: String,
}
