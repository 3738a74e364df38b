// SPDX-License-Identifier: MIT OR Apache-2.0
//! The "execute one order" contract.
//!
//! Composes commit, self-check verification, retry, timeout and failure
//! callbacks into a single state machine:
//!
//! ```text
//! Start -> Committing -> Verifying -> Completed
//!             |  commit.failed          | verify.error
//!             v                         v
//!          Retrying (1s backoff) --> Failed
//!             | deadline hit
//!             v
//!          Timeout  (never retried)
//! ```
//!
//! Timeout and Failed fire every registered failure callback; Completed
//! fires none. The verification here is the self-check form — the stored
//! payload re-digested against the hash the commit just produced — not
//! the adversarial replay, which runs out-of-band in the watcher.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod callbacks;

pub use callbacks::{CallbackRegistry, FailureCallback};

use sre_core::{
    CommitStatus, InputEnvelope, OrderOutcome, OrderResult, SkillPackage, VerificationResult,
};
use sre_executor::Committer;
use sre_sandbox::SandboxConfig;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Default per-attempt deadline.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 300;

/// Fixed backoff between commit retries.
const RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Everything needed to execute one order.
#[derive(Debug, Clone)]
pub struct OrderConfig {
    /// Order under execution.
    pub order_id: String,
    /// Resolved, immutable skill package.
    pub skill_package: SkillPackage,
    /// Guarded input envelope.
    pub input: InputEnvelope,
    /// Per-attempt deadline in seconds.
    pub timeout_seconds: u64,
    /// Commit retries after the first attempt.
    pub max_retries: u32,
    /// Callback URL recorded for the dispatcher; delivery is its concern.
    pub callback_url: Option<String>,
    /// Sandbox resource overrides.
    pub sandbox_config: Option<SandboxConfig>,
}

impl OrderConfig {
    /// Config with the documented defaults: 300 s deadline, no retries.
    pub fn new(
        order_id: impl Into<String>,
        skill_package: SkillPackage,
        input: InputEnvelope,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            skill_package,
            input,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            max_retries: 0,
            callback_url: None,
            sandbox_config: None,
        }
    }

    /// Override the per-attempt deadline.
    #[must_use]
    pub fn with_timeout_seconds(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    /// Override the retry budget.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Attach sandbox resource overrides.
    #[must_use]
    pub fn with_sandbox_config(mut self, config: SandboxConfig) -> Self {
        self.sandbox_config = Some(config);
        self
    }
}

/// How one attempt ended, and whether the loop may retry.
enum Attempt {
    Completed(OrderResult),
    /// Deadline hit; never retried.
    Timeout(OrderResult),
    /// Commit failed; consumes a retry slot.
    CommitFailed(OrderResult),
    /// Commit succeeded but the self-check did not; never retried.
    VerifyFailed(OrderResult),
}

/// Drives orders through the state machine.
pub struct Orchestrator {
    committer: Committer,
    callbacks: Arc<CallbackRegistry>,
    retry_backoff: Duration,
}

impl Orchestrator {
    /// Orchestrator over the given commit pipeline.
    pub fn new(committer: Committer) -> Self {
        Self {
            committer,
            callbacks: Arc::new(CallbackRegistry::new()),
            retry_backoff: RETRY_BACKOFF,
        }
    }

    /// The failure-callback registry shared with the host process.
    #[must_use]
    pub fn callbacks(&self) -> Arc<CallbackRegistry> {
        Arc::clone(&self.callbacks)
    }

    /// Execute one order to a terminal state.
    pub async fn execute_order(&self, config: &OrderConfig) -> OrderResult {
        info!(target: "sre.orchestrator", order_id = %config.order_id, "starting order execution");
        let start = Instant::now();

        let mut terminal: Option<OrderResult> = None;
        for attempt in 0..=config.max_retries {
            match self.attempt(config, attempt).await {
                Attempt::Completed(mut result) => {
                    result.execution_time_ms = start.elapsed().as_millis() as u64;
                    info!(
                        target: "sre.orchestrator",
                        order_id = %config.order_id,
                        execution_time_ms = result.execution_time_ms,
                        "completed"
                    );
                    return result;
                }
                Attempt::Timeout(result) | Attempt::VerifyFailed(result) => {
                    terminal = Some(result);
                    break;
                }
                Attempt::CommitFailed(result) => {
                    terminal = Some(result);
                    if attempt < config.max_retries {
                        warn!(
                            target: "sre.orchestrator",
                            order_id = %config.order_id,
                            attempt = attempt + 1,
                            max_retries = config.max_retries,
                            "commit failed, retrying"
                        );
                        tokio::time::sleep(self.retry_backoff).await;
                    }
                }
            }
        }

        let mut result = terminal.expect("at least one attempt ran");
        result.execution_time_ms = start.elapsed().as_millis() as u64;
        warn!(
            target: "sre.orchestrator",
            order_id = %config.order_id,
            status = ?result.status,
            "order did not complete, firing failure callbacks"
        );
        self.callbacks.fire(&result);
        result
    }

    async fn attempt(&self, config: &OrderConfig, attempt: u32) -> Attempt {
        let order_id = &config.order_id;
        let sandbox_config = config.sandbox_config.clone().unwrap_or_default();
        let deadline = Duration::from_secs(config.timeout_seconds);

        info!(
            target: "sre.orchestrator",
            order_id = %order_id,
            attempt = attempt + 1,
            "starting commit"
        );

        let commit_future = self.committer.commit(
            order_id,
            &config.skill_package,
            &config.input,
            config.skill_package.execution_mode,
            &sandbox_config,
        );

        // The deadline cancels the in-flight commit; the sandbox guard
        // force-removes the container on that cancellation.
        let commit = match tokio::time::timeout(deadline, commit_future).await {
            Ok(commit) => commit,
            Err(_) => {
                return Attempt::Timeout(OrderResult {
                    order_id: order_id.clone(),
                    status: OrderOutcome::Timeout,
                    commit_result: None,
                    verification: None,
                    execution_time_ms: 0,
                    error_message: Some(format!(
                        "execution timeout after {}s",
                        config.timeout_seconds
                    )),
                });
            }
        };

        if commit.status == CommitStatus::Failed {
            let error_message = commit.error_message.clone();
            return Attempt::CommitFailed(OrderResult {
                order_id: order_id.clone(),
                status: OrderOutcome::Failed,
                commit_result: Some(commit),
                verification: None,
                execution_time_ms: 0,
                error_message,
            });
        }

        // Self-check: re-read the stored payload and compare its digest
        // with the hash the commit just produced.
        let verification = self.self_check(&commit.result_uri, &commit.result_hash).await;
        if verification.is_valid {
            Attempt::Completed(OrderResult {
                order_id: order_id.clone(),
                status: OrderOutcome::Completed,
                commit_result: Some(commit),
                verification: Some(verification),
                execution_time_ms: 0,
                error_message: None,
            })
        } else {
            let error_message = Some(
                verification
                    .error
                    .clone()
                    .or_else(|| verification.mismatch_description())
                    .unwrap_or_else(|| "self-check verification failed".into()),
            );
            Attempt::VerifyFailed(OrderResult {
                order_id: order_id.clone(),
                status: OrderOutcome::Failed,
                commit_result: Some(commit),
                verification: Some(verification),
                execution_time_ms: 0,
                error_message,
            })
        }
    }

    async fn self_check(&self, uri: &str, committed_hash: &str) -> VerificationResult {
        match self.committer.gateway().fetch_result(uri).await {
            Ok(stored) => {
                let recomputed = sre_digest::digest_hex(&stored);
                if recomputed == committed_hash {
                    VerificationResult::valid(recomputed)
                } else {
                    VerificationResult::mismatch(recomputed, committed_hash)
                }
            }
            Err(err) => VerificationResult::process_error(format!(
                "stored result unreadable during self-check: {err}"
            )),
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("retry_backoff", &self.retry_backoff)
            .finish_non_exhaustive()
    }
}
