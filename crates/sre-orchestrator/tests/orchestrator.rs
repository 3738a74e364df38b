// SPDX-License-Identifier: MIT OR Apache-2.0
//! State machine semantics end to end: retry budgets, timeout policy,
//! callback discipline, and the seed scenarios.

use serde_json::{Value, json};
use sre_core::{CommitStatus, InputEnvelope, OrderOutcome, SkillPackage};
use sre_executor::{AiExecutor, Committer};
use sre_orchestrator::{OrderConfig, Orchestrator};
use sre_sandbox::{MockEngine, MockRun, Sandbox};
use sre_storage::Gateway;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

const OUTPUT: &str = r#"{"issues":[],"summary":"ok"}"#;

fn orchestrator(engine: &MockEngine) -> (TempDir, Orchestrator) {
    let dir = TempDir::new().unwrap();
    let gateway = Gateway::local(dir.path()).unwrap();
    let committer = Committer::new(
        Sandbox::new(Arc::new(engine.clone())),
        gateway,
        AiExecutor::simulated(),
    );
    (dir, Orchestrator::new(committer))
}

fn config(order_id: &str) -> OrderConfig {
    OrderConfig::new(
        order_id,
        SkillPackage::sandbox("code-review", "img", "scripts/main.py"),
        InputEnvelope::new(json!({"code": "print('hi')", "language": "python"})).unwrap(),
    )
}

fn counting_callback(orchestrator: &Orchestrator) -> Arc<AtomicUsize> {
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    orchestrator
        .callbacks()
        .register(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
    fired
}

#[tokio::test]
async fn happy_path_completes_with_matching_digest() {
    let engine = MockEngine::scripted([MockRun::success(OUTPUT)]);
    let (_dir, orchestrator) = orchestrator(&engine);
    let fired = counting_callback(&orchestrator);

    let result = orchestrator.execute_order(&config("order-1")).await;

    assert_eq!(result.status, OrderOutcome::Completed);
    let commit = result.commit_result.unwrap();
    assert_eq!(commit.status, CommitStatus::Success);
    let expected: Value = serde_json::from_str(OUTPUT).unwrap();
    assert_eq!(commit.result_hash, sre_digest::digest_hex(&expected));
    let verification = result.verification.unwrap();
    assert!(verification.is_valid);
    // Completed never fires callbacks.
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn retries_consume_budget_then_succeed() {
    // Fails twice, then succeeds: with max_retries = 2 this completes.
    let engine = MockEngine::scripted([
        MockRun::failure(1, "flaky"),
        MockRun::failure(1, "flaky"),
        MockRun::success(OUTPUT),
    ]);
    let (_dir, orchestrator) = orchestrator(&engine);

    let result = orchestrator
        .execute_order(&config("order-2").with_max_retries(2))
        .await;

    assert_eq!(result.status, OrderOutcome::Completed);
    assert_eq!(engine.started().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn deterministic_failure_exhausts_budget() {
    // Fails three times with max_retries = 2: three attempts, then Failed.
    let engine = MockEngine::scripted([
        MockRun::failure(1, "boom"),
        MockRun::failure(1, "boom"),
        MockRun::failure(1, "boom"),
    ]);
    let (_dir, orchestrator) = orchestrator(&engine);
    let fired = counting_callback(&orchestrator);

    let result = orchestrator
        .execute_order(&config("order-3").with_max_retries(2))
        .await;

    assert_eq!(result.status, OrderOutcome::Failed);
    assert_eq!(engine.started().len(), 3);
    assert!(result.error_message.unwrap().contains("boom"));
    // Failure callbacks fire exactly once for the terminal record.
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn timeout_is_never_retried() {
    let engine = MockEngine::scripted([MockRun::sleeping(Duration::from_secs(10))]);
    let (_dir, orchestrator) = orchestrator(&engine);
    let fired = counting_callback(&orchestrator);

    let result = orchestrator
        .execute_order(
            &config("order-4")
                .with_timeout_seconds(1)
                .with_max_retries(5),
        )
        .await;

    assert_eq!(result.status, OrderOutcome::Timeout);
    // Budget unspent: the single attempt is all there was.
    assert_eq!(engine.started().len(), 1);
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert!(result.error_message.unwrap().contains("timeout after 1s"));

    // The cancelled commit's container still gets force-removed.
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
    assert!(engine.active().is_empty());
}

#[tokio::test]
async fn oversize_envelope_fails_without_touching_the_engine() {
    let engine = MockEngine::new();
    let (_dir, orchestrator) = orchestrator(&engine);
    let fired = counting_callback(&orchestrator);

    let config = OrderConfig::new(
        "order-5",
        SkillPackage::sandbox("code-review", "img", "scripts/main.py"),
        InputEnvelope::new(json!({"blob": "x".repeat(100_001)})).unwrap(),
    );
    let result = orchestrator.execute_order(&config).await;

    assert_eq!(result.status, OrderOutcome::Failed);
    assert!(engine.started().is_empty());
    assert!(result.error_message.unwrap().contains("too large"));
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn twenty_one_fields_fails_identically() {
    let engine = MockEngine::new();
    let (_dir, orchestrator) = orchestrator(&engine);

    let mut map = serde_json::Map::new();
    for i in 0..21 {
        map.insert(format!("f{i}"), json!(i));
    }
    let config = OrderConfig::new(
        "order-6",
        SkillPackage::sandbox("code-review", "img", "scripts/main.py"),
        InputEnvelope::new(Value::Object(map)).unwrap(),
    );
    let result = orchestrator.execute_order(&config).await;

    assert_eq!(result.status, OrderOutcome::Failed);
    assert!(engine.started().is_empty());
    assert!(result.error_message.unwrap().contains("too many"));
}

#[tokio::test(start_paused = true)]
async fn nonzero_exit_with_two_retries_records_three_attempts() {
    // Scenario 4 from the acceptance set: deterministic exit 1, stderr
    // "boom", max_retries = 2.
    let engine = MockEngine::scripted([
        MockRun::failure(1, "boom"),
        MockRun::failure(1, "boom"),
        MockRun::failure(1, "boom"),
    ]);
    let (_dir, orchestrator) = orchestrator(&engine);

    let result = orchestrator
        .execute_order(&config("order-7").with_max_retries(2))
        .await;

    assert_eq!(result.status, OrderOutcome::Failed);
    assert_eq!(engine.started().len(), 3);
    let commit = result.commit_result.unwrap();
    assert_eq!(commit.status, CommitStatus::Failed);
    assert!(commit.error_message.unwrap().contains("code 1"));
}

#[tokio::test]
async fn completed_result_reports_total_duration() {
    let engine = MockEngine::scripted([MockRun::success(OUTPUT)]);
    let (_dir, orchestrator) = orchestrator(&engine);
    let result = orchestrator.execute_order(&config("order-8")).await;
    assert_eq!(result.status, OrderOutcome::Completed);
    // Field is populated on every path; exact value is machine-dependent.
    let _ = result.execution_time_ms;
    assert!(result.error_message.is_none());
}
