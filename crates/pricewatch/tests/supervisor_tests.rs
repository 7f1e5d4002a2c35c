//! Run lifecycle through the orchestrator with shell scripts as the worker.

#![cfg(unix)]

mod common;

use std::time::Duration;

use common::TestHarness;
use pricewatch::run_state::RunLock;
use pricewatch::{PricewatchError, RunStatus, SupervisorError};

#[tokio::test]
async fn run_records_exit_and_releases_lock() {
    let harness = TestHarness::new();
    harness.write_run_script("echo \"unbuffered=$PYTHONUNBUFFERED\"\npwd\n");
    let orch = harness.orchestrator();

    let run_id = orch.start_run().await.unwrap();
    let running = orch.get_status();
    assert_eq!(running.run_id.as_deref(), Some(run_id.as_str()));

    let outcome = orch.wait_for_completion().await.unwrap();
    assert!(outcome.success());

    let state = orch.get_status();
    assert_eq!(state.status, RunStatus::Idle);
    assert_eq!(state.last_exit_code, Some(0));
    assert_eq!(state.last_run_id.as_deref(), Some(run_id.as_str()));
    assert!(state.last_ended_at.is_some());
    assert!(RunLock::holder(&harness.layout.run_lock()).is_none());

    let log = orch.get_file(&format!("log:{}", run_id)).unwrap();
    assert_eq!(log.content_type, "text/plain");
    let text = String::from_utf8(log.contents).unwrap();
    assert!(text.contains("unbuffered=1"));
    assert!(text.contains(&harness.root().canonicalize().unwrap().display().to_string()));
}

#[tokio::test]
async fn concurrent_start_is_rejected() {
    let harness = TestHarness::new();
    harness.write_run_script("exec sleep 10\n");
    let first = harness.orchestrator();
    let second = harness.orchestrator();

    first.start_run().await.unwrap();
    let err = second.start_run().await.unwrap_err();
    assert!(matches!(
        err,
        PricewatchError::Supervisor(SupervisorError::AlreadyRunning)
    ));

    // A different orchestrator can stop the run it did not start.
    let stopped = second.stop_run().await.unwrap();
    assert!(stopped.run_id.is_some());

    let outcome = tokio::time::timeout(Duration::from_secs(5), first.wait_for_completion())
        .await
        .unwrap()
        .unwrap();
    assert!(outcome.stopped);
    assert_eq!(outcome.error_message.as_deref(), Some("Manually stopped"));

    let state = first.get_status();
    assert!(!state.is_running());
    assert_eq!(state.error_message.as_deref(), Some("Manually stopped"));
}

#[tokio::test]
async fn stop_ignores_sigterm_and_kills() {
    let harness = TestHarness::new();
    harness.write_run_script("trap '' TERM\nwhile true; do sleep 0.05; done\n");
    let orch = harness.orchestrator();

    orch.start_run().await.unwrap();
    // Let the shell install its trap.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let stopped = orch.stop_run().await.unwrap();
    assert!(stopped.forced);

    let outcome = tokio::time::timeout(Duration::from_secs(5), orch.wait_for_completion())
        .await
        .unwrap()
        .unwrap();
    assert!(outcome.stopped);
    assert_eq!(orch.get_status().error_message.as_deref(), Some("Manually stopped"));
}

#[tokio::test]
async fn stop_when_idle_fails() {
    let harness = TestHarness::new();
    let orch = harness.orchestrator();

    assert!(matches!(
        orch.stop_run().await,
        Err(PricewatchError::Supervisor(SupervisorError::NotRunning))
    ));
}

#[tokio::test]
async fn failed_worker_reports_code() {
    let harness = TestHarness::new();
    harness.write_run_script("echo 'scrape failed' >&2\nexit 7\n");
    let orch = harness.orchestrator();

    orch.start_run().await.unwrap();
    let outcome = orch.wait_for_completion().await.unwrap();

    assert_eq!(outcome.exit_code, Some(7));
    assert_eq!(
        orch.get_status().error_message.as_deref(),
        Some("Worker exited with code 7")
    );
}

#[tokio::test]
async fn analyzer_runs_after_complete_scrape() {
    let harness = TestHarness::new();
    let mut config = harness.config.clone();
    config.total_properties = Some(2);
    harness.write_at(&harness.layout.pricing_data(), "hotel_name,check_in_date\n");
    harness.write_analyze_script("echo analysis done\n");

    let orch = pricewatch::Orchestrator::new(config);

    harness.write_progress(1);
    let err = orch.run_analyzer().await.unwrap_err();
    assert!(err.to_string().contains("Scrape incomplete (1/2 properties)"));

    harness.write_progress(2);
    let outcome = orch.run_analyzer().await.unwrap();
    assert_eq!(outcome.stdout.trim(), "analysis done");
}
