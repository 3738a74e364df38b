// SPDX-License-Identifier: MIT OR Apache-2.0
//! Commit pipeline behavior over the mock engine and a temp-dir gateway.

use serde_json::json;
use sre_core::{CommitStatus, ExecutionMode, InputEnvelope, SkillPackage};
use sre_executor::{AiExecutor, Committer};
use sre_sandbox::{MockEngine, MockRun, Sandbox, SandboxConfig};
use sre_storage::Gateway;
use std::sync::Arc;
use tempfile::TempDir;

fn committer(engine: &MockEngine) -> (TempDir, Committer) {
    let dir = TempDir::new().unwrap();
    let gateway = Gateway::local(dir.path()).unwrap();
    let committer = Committer::new(
        Sandbox::new(Arc::new(engine.clone())),
        gateway,
        AiExecutor::simulated(),
    );
    (dir, committer)
}

fn input() -> InputEnvelope {
    InputEnvelope::new(json!({"code": "print('hi')", "language": "python"})).unwrap()
}

#[tokio::test]
async fn successful_commit_hashes_and_stores() {
    let engine = MockEngine::scripted([MockRun::success(r#"{"issues":[],"summary":"ok"}"#)]);
    let (_dir, committer) = committer(&engine);

    let result = committer
        .commit(
            "order-1",
            &SkillPackage::sandbox("code-review", "img", "main.py"),
            &input(),
            ExecutionMode::Sandbox,
            &SandboxConfig::default(),
        )
        .await;

    assert_eq!(result.status, CommitStatus::Success);
    assert_eq!(
        result.result_hash,
        sre_digest::digest_hex(&json!({"issues": [], "summary": "ok"}))
    );
    assert!(result.result_uri.starts_with("file://"));
    assert_eq!(result.execution_mode, ExecutionMode::Sandbox);
    assert!(result.model_used.is_none());
}

#[tokio::test]
async fn stored_payload_matches_the_hashed_result() {
    let engine = MockEngine::scripted([MockRun::success(r#"{"n": 7}"#)]);
    let (_dir, committer) = committer(&engine);
    let result = committer
        .commit(
            "order-2",
            &SkillPackage::sandbox("calc", "img", "main.py"),
            &input(),
            ExecutionMode::Sandbox,
            &SandboxConfig::default(),
        )
        .await;
    assert_eq!(result.status, CommitStatus::Success);
    assert_eq!(result.result_hash, sre_digest::digest_hex(&json!({"n": 7})));
}

#[tokio::test]
async fn sandbox_failure_collapses_to_failed_record() {
    let engine = MockEngine::scripted([MockRun::failure(1, "boom")]);
    let (_dir, committer) = committer(&engine);

    let result = committer
        .commit(
            "order-3",
            &SkillPackage::sandbox("code-review", "img", "main.py"),
            &input(),
            ExecutionMode::Sandbox,
            &SandboxConfig::default(),
        )
        .await;

    assert_eq!(result.status, CommitStatus::Failed);
    assert!(result.result_uri.is_empty());
    assert!(result.result_hash.is_empty());
    let message = result.error_message.unwrap();
    assert!(message.contains("code 1"), "unexpected message: {message}");
    assert!(message.contains("boom"));
}

#[tokio::test]
async fn invalid_envelope_fails_before_the_engine() {
    let engine = MockEngine::new();
    let (_dir, committer) = committer(&engine);
    let huge = InputEnvelope::new(json!({"blob": "x".repeat(100_001)})).unwrap();

    let result = committer
        .commit(
            "order-4",
            &SkillPackage::sandbox("code-review", "img", "main.py"),
            &huge,
            ExecutionMode::Sandbox,
            &SandboxConfig::default(),
        )
        .await;

    assert_eq!(result.status, CommitStatus::Failed);
    assert!(result.error_message.unwrap().contains("too large"));
    assert!(engine.started().is_empty());
}

#[tokio::test]
async fn ai_mode_tags_the_record_with_model_and_tokens() {
    let engine = MockEngine::new();
    let (_dir, committer) = committer(&engine);

    let result = committer
        .commit(
            "order-5",
            &SkillPackage::ai("code-review", "Review code"),
            &input(),
            ExecutionMode::Ai,
            &SandboxConfig::default(),
        )
        .await;

    assert_eq!(result.status, CommitStatus::Success);
    assert_eq!(result.execution_mode, ExecutionMode::Ai);
    assert_eq!(result.model_used.as_deref(), Some("simulated-chat"));
    assert_eq!(result.tokens_used, 42);
    // The sandbox was never involved.
    assert!(engine.started().is_empty());
}

#[tokio::test]
async fn execution_time_is_measured_on_failure_too() {
    let engine = MockEngine::scripted([MockRun::failure(2, "err")]);
    let (_dir, committer) = committer(&engine);

    let result = committer
        .commit(
            "order-6",
            &SkillPackage::sandbox("code-review", "img", "main.py"),
            &input(),
            ExecutionMode::Sandbox,
            &SandboxConfig::default(),
        )
        .await;
    assert_eq!(result.status, CommitStatus::Failed);
    // Zero is plausible on a fast machine; the field just has to be set.
    let _ = result.execution_time_ms;
}
