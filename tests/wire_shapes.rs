//! Wire shape tests
//!
//! Parse realistic platform payloads and check the serde mappings the
//! clients rely on: camelCase envelopes, nested graph snapshots, the
//! unknown-status fallback, and log key resolution.

use skyline_api::{
    ApiEnvelope, Artifact, CustomArgs, ExecutionNode, LayoutNode, MigrationStatus,
    MigrationStatusUpdate, NodeStatus, PipelineExecution, RemoteExecution, Workspace,
};

// ====== envelopes and workspaces ======

#[test]
fn test_envelope_unwraps_workspace_payload() {
    let body = r#"{
        "correlationId": "req-77",
        "data": {
            "id": "ws-9",
            "name": "payments-prod",
            "repositoryPath": "infra/payments",
            "defaultPipelines": {
                "plan": {
                    "projectPipeline": "org-plan",
                    "workspacePipeline": "payments-plan"
                }
            }
        }
    }"#;

    let envelope: ApiEnvelope<Workspace> = serde_json::from_str(body).unwrap();
    assert_eq!(envelope.correlation_id.as_deref(), Some("req-77"));

    let workspace = envelope.data;
    assert_eq!(workspace.id, "ws-9");
    assert_eq!(workspace.repository_path.as_deref(), Some("infra/payments"));
    let plan = &workspace.default_pipelines["plan"];
    assert_eq!(plan.project_pipeline.as_deref(), Some("org-plan"));
    assert_eq!(plan.workspace_pipeline.as_deref(), Some("payments-plan"));
}

// ====== pipeline execution snapshots ======

#[test]
fn test_pipeline_execution_snapshot_parses_nested_graph() {
    let body = r#"{
        "pipelineExecutionSummary": {
            "startingNodeId": "stage-1",
            "status": "Running",
            "layoutNodeMap": {
                "stage-1": {
                    "nodeId": "stage-1",
                    "name": "Plan",
                    "status": "Running",
                    "nodeType": "Custom",
                    "nextIds": ["stage-2"]
                }
            },
            "executionGraph": {
                "rootNodeId": "step-a",
                "nodeMap": {
                    "step-a": {
                        "uuid": "step-a",
                        "name": "terraform plan",
                        "status": "Running",
                        "stepType": "Custom",
                        "logBaseKey": "base/step-a",
                        "executableResponses": [
                            { "async": { "logKeys": ["live/step-a"] } }
                        ]
                    }
                },
                "nodeAdjacencyListMap": {
                    "step-a": { "children": [], "nextIds": [] }
                }
            }
        }
    }"#;

    let snapshot: PipelineExecution = serde_json::from_str(body).unwrap();
    let summary = snapshot.summary().unwrap();
    assert_eq!(summary.starting_node_id.as_deref(), Some("stage-1"));
    assert_eq!(summary.status, NodeStatus::Running);
    assert_eq!(summary.layout_node_map["stage-1"].next_ids, vec!["stage-2"]);

    let graph = summary.execution_graph.as_ref().unwrap();
    assert_eq!(graph.root_node_id, "step-a");
    assert_eq!(graph.node_map["step-a"].resolve_log_key(), "live/step-a");
    assert!(graph.adjacency("step-a").unwrap().next_ids.is_empty());
}

#[test]
fn test_settling_snapshot_has_no_summary() {
    let snapshot: PipelineExecution = serde_json::from_str("{}").unwrap();
    assert!(snapshot.summary().is_none());
}

#[test]
fn test_unknown_status_strings_fall_back_to_unknown() {
    let node: LayoutNode =
        serde_json::from_str(r#"{"nodeId": "stage-1", "status": "Expired"}"#).unwrap();
    assert_eq!(node.status, NodeStatus::Unknown);
    assert!(!node.status.is_active());
    assert!(!node.status.is_terminal());
}

// ====== log key resolution ======

#[test]
fn test_live_log_key_overrides_the_base_key() {
    let node: ExecutionNode = serde_json::from_str(
        r#"{
            "uuid": "step-a",
            "logBaseKey": "base/step-a",
            "executableResponses": [ { "async": { "logKeys": ["live/step-a"] } } ]
        }"#,
    )
    .unwrap();
    assert_eq!(node.resolve_log_key(), "live/step-a");
}

#[test]
fn test_log_key_falls_back_when_the_live_key_is_missing_or_empty() {
    let empty_key: ExecutionNode = serde_json::from_str(
        r#"{
            "uuid": "step-b",
            "logBaseKey": "base/step-b",
            "executableResponses": [ { "async": { "logKeys": [""] } } ]
        }"#,
    )
    .unwrap();
    assert_eq!(empty_key.resolve_log_key(), "base/step-b");

    let no_responses: ExecutionNode =
        serde_json::from_str(r#"{"uuid": "step-c", "logBaseKey": "base/step-c"}"#).unwrap();
    assert_eq!(no_responses.resolve_log_key(), "base/step-c");
}

// ====== outbound payloads ======

#[test]
fn test_status_update_serializes_the_tracker_shape() {
    let artifact = Artifact {
        name: "pkg".to_string(),
        version: "1.2.3".to_string(),
        registry: "legacy".to_string(),
        ..Default::default()
    };

    let completed = serde_json::to_value(MigrationStatusUpdate::new(
        &artifact,
        "central",
        MigrationStatus::Completed,
    ))
    .unwrap();
    assert_eq!(completed["status"], "COMPLETED");
    assert_eq!(completed["artifactName"], "pkg");
    assert_eq!(completed["artifactVersion"], "1.2.3");
    assert_eq!(completed["sourceRegistry"], "legacy");
    assert_eq!(completed["destinationRegistry"], "central");
    assert!(
        completed.get("error").is_none(),
        "error stays off the wire when unset"
    );

    let failed = serde_json::to_value(
        MigrationStatusUpdate::new(&artifact, "central", MigrationStatus::Failed)
            .with_error("HTTP 500"),
    )
    .unwrap();
    assert_eq!(failed["status"], "FAILED");
    assert_eq!(failed["error"], "HTTP 500");
}

#[test]
fn test_remote_execution_payloads_omit_unset_fields() {
    let execution = RemoteExecution {
        id: "exec-1".to_string(),
        ..Default::default()
    };
    let value = serde_json::to_value(&execution).unwrap();
    assert_eq!(value["id"], "exec-1");
    assert!(value.get("checksum").is_none());
    assert!(value.get("pipelineExecutionId").is_none());
    assert!(value.get("url").is_none());

    let args = CustomArgs {
        operation: "plan".to_string(),
        ..Default::default()
    };
    let value = serde_json::to_value(&args).unwrap();
    assert_eq!(value["operation"], "plan");
    assert!(value.get("targets").is_none());
    assert!(value.get("replace").is_none());
}
