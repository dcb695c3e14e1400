//! Walk and plan orchestration tests
//!
//! Drives the stage/step walkers and the full plan flow over the mock
//! clients. Announcements are observed through the log attachments each
//! discovered step spawns: exactly-once discovery means exactly one
//! blob call per step key.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use skyline_api::{NodeStatus, PipelineExecution};
use skyline_cli::mock::{
    scoped_snapshot, stage_node, step_graph, step_node, unscoped_snapshot, MockJobClient,
    MockLogClient,
};
use skyline_cli::plan::{run_plan, PlanOptions};
use skyline_cli::progress::Progress;
use skyline_cli::LogClient;
use skyline_cli::walk::{WalkConfig, WalkError, Walker};

fn fast_config() -> WalkConfig {
    WalkConfig {
        stage_interval: Duration::from_millis(20),
        step_interval: Duration::from_millis(10),
    }
}

/// Two stages; the first drains while active, the second is discovered
/// already terminal.
fn script_two_stage_walk(jobs: &MockJobClient) {
    // Unscoped stage polls: build running, then deploy running, then done.
    jobs.push_snapshot(
        None,
        unscoped_snapshot(
            "s1",
            vec![
                stage_node("s1", "Build", NodeStatus::Running, &["s2"]),
                stage_node("s2", "Deploy", NodeStatus::NotStarted, &[]),
            ],
        ),
    );
    jobs.push_snapshot(
        None,
        unscoped_snapshot(
            "s1",
            vec![
                stage_node("s1", "Build", NodeStatus::Success, &["s2"]),
                stage_node("s2", "Deploy", NodeStatus::Running, &[]),
            ],
        ),
    );
    jobs.push_snapshot(
        None,
        unscoped_snapshot(
            "s1",
            vec![
                stage_node("s1", "Build", NodeStatus::Success, &["s2"]),
                stage_node("s2", "Deploy", NodeStatus::Success, &[]),
            ],
        ),
    );

    // Stage s1 scoped polls: step a runs, then everything is terminal.
    jobs.push_snapshot(
        Some("s1"),
        scoped_snapshot(
            "s1",
            vec![stage_node("s1", "Build", NodeStatus::Running, &["s2"])],
            step_graph(
                "a",
                vec![step_node("a", "terraform plan", NodeStatus::Running)],
                &[("a", &[], &[])],
            ),
        ),
    );
    jobs.push_snapshot(
        Some("s1"),
        scoped_snapshot(
            "s1",
            vec![stage_node("s1", "Build", NodeStatus::Success, &["s2"])],
            step_graph(
                "a",
                vec![step_node("a", "terraform plan", NodeStatus::Success)],
                &[("a", &[], &[])],
            ),
        ),
    );

    // Stage s2 scoped polls: discovered terminal, steps swept blob-only.
    jobs.push_snapshot(
        Some("s2"),
        scoped_snapshot(
            "s1",
            vec![stage_node("s2", "Deploy", NodeStatus::Success, &[])],
            step_graph(
                "b",
                vec![step_node("b", "approve", NodeStatus::Success)],
                &[("b", &[], &[])],
            ),
        ),
    );
}

// ====== walker ======

#[tokio::test]
async fn test_walk_announces_each_step_once_in_order() {
    let jobs = Arc::new(MockJobClient::new());
    let logs = Arc::new(MockLogClient::new());
    logs.set_token("t");
    script_two_stage_walk(&jobs);

    let cancel = CancellationToken::new();
    let walker = Walker::new(
        jobs.clone(),
        logs.clone(),
        Progress::quiet(),
        cancel.clone(),
    )
    .with_config(fast_config());

    walker.walk_stages("pe-1", "s1").await.unwrap();
    // Let the fire-and-forget attachments drain.
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(
        logs.blob_calls(),
        vec!["key-a".to_string(), "key-b".to_string()],
        "each step attaches exactly once, in discovery order"
    );
    assert_eq!(
        logs.tail_calls(),
        vec!["key-a".to_string()],
        "only the live step falls back to tail; the swept step is blob-only"
    );
}

#[tokio::test]
async fn test_walk_does_not_reenter_a_stage_still_active() {
    let jobs = Arc::new(MockJobClient::new());
    let logs = Arc::new(MockLogClient::new());
    logs.set_token("t");

    let running = unscoped_snapshot(
        "s1",
        vec![stage_node("s1", "Build", NodeStatus::Running, &[])],
    );
    // The stage stays active for an extra tick after its steps drained.
    jobs.push_snapshot(None, running.clone());
    jobs.push_snapshot(None, running);
    jobs.push_snapshot(
        None,
        unscoped_snapshot(
            "s1",
            vec![stage_node("s1", "Build", NodeStatus::Success, &[])],
        ),
    );
    jobs.push_snapshot(
        Some("s1"),
        scoped_snapshot(
            "s1",
            vec![stage_node("s1", "Build", NodeStatus::Running, &[])],
            step_graph(
                "a",
                vec![step_node("a", "terraform plan", NodeStatus::Running)],
                &[("a", &[], &[])],
            ),
        ),
    );
    jobs.push_snapshot(
        Some("s1"),
        scoped_snapshot(
            "s1",
            vec![stage_node("s1", "Build", NodeStatus::Success, &[])],
            step_graph(
                "a",
                vec![step_node("a", "terraform plan", NodeStatus::Success)],
                &[("a", &[], &[])],
            ),
        ),
    );

    let cancel = CancellationToken::new();
    let walker = Walker::new(
        jobs.clone(),
        logs.clone(),
        Progress::quiet(),
        cancel.clone(),
    )
    .with_config(fast_config());

    walker.walk_stages("pe-1", "s1").await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // A re-entered step walk would add scoped polls beyond the scripted two.
    assert_eq!(jobs.poll_count(Some("s1")), 2);
    assert_eq!(logs.blob_calls(), vec!["key-a".to_string()]);
}

#[tokio::test]
async fn test_walk_skips_ticks_without_a_summary() {
    let jobs = Arc::new(MockJobClient::new());
    let logs = Arc::new(MockLogClient::new());
    logs.set_token("t");

    // First unscoped poll: settling, no summary yet.
    jobs.push_snapshot(None, PipelineExecution::default());
    jobs.push_snapshot(
        None,
        unscoped_snapshot(
            "s1",
            vec![stage_node("s1", "Build", NodeStatus::Success, &[])],
        ),
    );

    let cancel = CancellationToken::new();
    let walker = Walker::new(
        jobs.clone(),
        logs.clone(),
        Progress::quiet(),
        cancel.clone(),
    )
    .with_config(fast_config());

    // Terminates without announcing anything: the only stage is already done.
    walker.walk_stages("pe-1", "s1").await.unwrap();
    assert!(logs.blob_calls().is_empty());
}

#[tokio::test]
async fn test_walk_propagates_cancellation() {
    let jobs = Arc::new(MockJobClient::new());
    let logs = Arc::new(MockLogClient::new());
    logs.set_token("t");

    let cancel = CancellationToken::new();
    cancel.cancel();
    let walker = Walker::new(jobs, logs, Progress::quiet(), cancel).with_config(fast_config());

    let err = walker.walk_stages("pe-1", "s1").await.unwrap_err();
    assert!(matches!(err, WalkError::Cancelled));
}

// ====== full plan flow ======

#[tokio::test]
async fn test_plan_end_to_end_over_mocks() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("main.tf"), "resource \"null_resource\" \"a\" {}\n").unwrap();
    std::env::set_current_dir(dir.path()).unwrap();

    let jobs = Arc::new(MockJobClient::new());
    let logs = Arc::new(MockLogClient::new());
    // The readiness wait consumes one unscoped poll before the walk.
    jobs.push_snapshot(
        None,
        unscoped_snapshot(
            "s1",
            vec![
                stage_node("s1", "Build", NodeStatus::Running, &["s2"]),
                stage_node("s2", "Deploy", NodeStatus::NotStarted, &[]),
            ],
        ),
    );
    script_two_stage_walk(&jobs);

    let options = PlanOptions {
        workspace_id: "ws-1".to_string(),
        targets: vec!["null_resource.a".to_string()],
        replace: Vec::new(),
        auto_approve: true,
    };
    run_plan(
        jobs.clone(),
        logs.clone(),
        Progress::quiet(),
        CancellationToken::new(),
        options,
    )
    .await
    .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let calls = jobs.calls();
    for op in [
        "get_workspace",
        "create_remote_execution",
        "upload_remote_execution",
        "execute_remote_execution",
        "get_log_token",
    ] {
        assert_eq!(
            calls.iter().filter(|c| *c == op).count(),
            1,
            "{op} runs exactly once"
        );
    }

    let created = jobs.created_args();
    assert_eq!(created[0].operation, "plan");
    assert_eq!(created[0].targets, vec!["null_resource.a".to_string()]);

    assert!(jobs.uploaded_sizes()[0] > 0, "archive upload is non-empty");
    assert_eq!(logs.token(), Some("mock-token".to_string()));
    assert_eq!(
        logs.blob_calls(),
        vec!["key-a".to_string(), "key-b".to_string()]
    );
}
