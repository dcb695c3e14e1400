//! Pipeline execution graph types.
//!
//! Two levels: a stage layout map (id → LayoutNode with next-edges) and a
//! per-stage step graph (id → ExecutionNode plus an adjacency list of
//! children and next ids).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::status::NodeStatus;

/// One stage in the pipeline layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutNode {
    /// Stage node identifier.
    #[serde(default)]
    pub node_id: String,
    /// User-facing stage name.
    #[serde(default)]
    pub name: String,
    /// Current stage status.
    #[serde(default)]
    pub status: NodeStatus,
    /// Stage type, used to filter internal orchestration stages.
    #[serde(default)]
    pub node_type: String,
    /// Candidate successor stage ids. Only the first is followed.
    #[serde(default)]
    pub next_ids: Vec<String>,
}

/// One step inside a stage's execution graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionNode {
    /// Step identifier.
    #[serde(default)]
    pub uuid: String,
    /// User-facing step name.
    #[serde(default)]
    pub name: String,
    /// Current step status.
    #[serde(default)]
    pub status: NodeStatus,
    /// Step type, used to filter internal orchestration steps.
    #[serde(default)]
    pub step_type: String,
    /// Default key for fetching this step's logs.
    #[serde(default)]
    pub log_base_key: String,
    /// Responses from the executor; may carry a just-in-time log key.
    #[serde(default)]
    pub executable_responses: Vec<ExecutableResponse>,
}

impl ExecutionNode {
    /// Resolve the log key for this step.
    ///
    /// A live execution response carries its own key under
    /// `executableResponses[0].async.logKeys[0]`; when present and
    /// non-empty it overrides `logBaseKey`.
    pub fn resolve_log_key(&self) -> &str {
        self.executable_responses
            .first()
            .and_then(|r| r.async_details.as_ref())
            .and_then(|a| a.log_keys.first())
            .map(String::as_str)
            .filter(|k| !k.is_empty())
            .unwrap_or(&self.log_base_key)
    }
}

/// A single executor response attached to a step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutableResponse {
    /// Details reported by an async executor.
    #[serde(rename = "async", default, skip_serializing_if = "Option::is_none")]
    pub async_details: Option<AsyncDetails>,
}

/// Async executor details.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsyncDetails {
    /// Log keys assigned by the executor.
    #[serde(default)]
    pub log_keys: Vec<String>,
}

/// Adjacency entry for one step node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjacencyList {
    /// Child step ids (sub-steps entered before siblings).
    #[serde(default)]
    pub children: Vec<String>,
    /// Sibling step ids that follow this node.
    #[serde(default)]
    pub next_ids: Vec<String>,
}

/// The step graph of one stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionGraph {
    /// Entry node of the graph.
    #[serde(default)]
    pub root_node_id: String,
    /// Step id → step node.
    #[serde(default)]
    pub node_map: HashMap<String, ExecutionNode>,
    /// Step id → adjacency entry.
    #[serde(default)]
    pub node_adjacency_list_map: HashMap<String, AdjacencyList>,
}

impl ExecutionGraph {
    /// Look up the adjacency entry for a node, if any.
    pub fn adjacency(&self, id: &str) -> Option<&AdjacencyList> {
        self.node_adjacency_list_map.get(id)
    }
}
