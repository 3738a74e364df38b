// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tagged outcome records returned by the pipelines.
//!
//! Errors are values inside these records; only invariant violations raise.

use crate::ExecutionMode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CommitResult
// ---------------------------------------------------------------------------

/// Terminal status of a commit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitStatus {
    /// Executed, hashed and stored.
    Success,
    /// Any step failed; see `error_message`.
    Failed,
}

/// Outcome of the executor pipeline for one order.
///
/// Produced by the committer; the on-chain submission is a separate concern
/// that consumes `result_hash` and `result_uri`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitResult {
    /// Order this commit belongs to.
    pub order_id: String,
    /// URI of the stored result payload; empty on failure.
    pub result_uri: String,
    /// Hex-encoded SHA-256 of the canonical result; empty on failure.
    pub result_hash: String,
    /// Wall-clock execution time, measured on every path.
    pub execution_time_ms: u64,
    /// Success or failure tag.
    pub status: CommitStatus,
    /// Failure description, when `status == Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// How the result was produced; AI results are not replayable.
    pub execution_mode: ExecutionMode,
    /// Model identifier, for AI-mode commits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
    /// Tokens consumed, for AI-mode commits.
    #[serde(default)]
    pub tokens_used: u64,
}

impl CommitResult {
    /// Build a failure record with empty URI and hash.
    #[must_use]
    pub fn failed(
        order_id: impl Into<String>,
        execution_mode: ExecutionMode,
        execution_time_ms: u64,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            result_uri: String::new(),
            result_hash: String::new(),
            execution_time_ms,
            status: CommitStatus::Failed,
            error_message: Some(error_message.into()),
            execution_mode,
            model_used: None,
            tokens_used: 0,
        }
    }

    /// Returns `true` for successful commits.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == CommitStatus::Success
    }
}

// ---------------------------------------------------------------------------
// VerificationResult
// ---------------------------------------------------------------------------

/// Outcome of a replay verification.
///
/// `is_valid == false` only and exactly when the digests differ; process
/// failures populate `error` and must not trigger a challenge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// `true` when the recomputed digest matches the committed one.
    pub is_valid: bool,
    /// Process failure description, when the replay itself failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Digest the replay produced, hex.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_hash: Option<String>,
    /// Digest the executor committed, hex.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_hash: Option<String>,
}

impl VerificationResult {
    /// A passing verification.
    #[must_use]
    pub fn valid(hash: impl Into<String>) -> Self {
        let hash = hash.into();
        Self {
            is_valid: true,
            error: None,
            expected_hash: Some(hash.clone()),
            actual_hash: Some(hash),
        }
    }

    /// A digest mismatch: the one outcome that justifies a challenge.
    #[must_use]
    pub fn mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            error: None,
            expected_hash: Some(expected.into()),
            actual_hash: Some(actual.into()),
        }
    }

    /// A process failure; distinct from a mismatch.
    #[must_use]
    pub fn process_error(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            error: Some(message.into()),
            expected_hash: None,
            actual_hash: None,
        }
    }

    /// `true` when the replay failed for reasons other than a mismatch.
    #[must_use]
    pub fn is_process_error(&self) -> bool {
        self.error.is_some()
    }

    /// Human-readable mismatch description, used as challenge proof.
    #[must_use]
    pub fn mismatch_description(&self) -> Option<String> {
        if self.is_valid || self.error.is_some() {
            return None;
        }
        Some(format!(
            "hash mismatch: expected {}, got {}",
            self.expected_hash.as_deref().unwrap_or("?"),
            self.actual_hash.as_deref().unwrap_or("?"),
        ))
    }
}

// ---------------------------------------------------------------------------
// ChallengeResult
// ---------------------------------------------------------------------------

/// Status of a challenge operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeStatus {
    /// Challenge prepared but not yet submitted.
    Pending,
    /// Challenge transaction submitted to the ledger.
    Submitted,
    /// The on-chain program accepted the challenge.
    Accepted,
    /// No challenge was made (the result verified as valid).
    Rejected,
    /// Submission or preparation failed.
    Failed,
}

/// Outcome of one challenge check, appended to the challenge log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeResult {
    /// Order that was checked.
    pub order_id: String,
    /// Outcome tag.
    pub status: ChallengeStatus,
    /// Mismatch or failure description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
    /// Transaction signature, when submitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_signature: Option<String>,
    /// Wall-clock time the outcome was recorded.
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// OrderResult
// ---------------------------------------------------------------------------

/// Terminal status of one orchestrated order execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderOutcome {
    /// Committed and self-verified.
    Completed,
    /// Commit failed with no retry budget left, or verification errored.
    Failed,
    /// The deadline elapsed; never retried.
    Timeout,
}

/// Full outcome of one orchestrated order execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderResult {
    /// Order that was executed.
    pub order_id: String,
    /// Terminal state.
    pub status: OrderOutcome,
    /// Commit outcome, when the pipeline got that far.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_result: Option<CommitResult>,
    /// Self-check verification outcome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationResult>,
    /// Total wall-clock duration.
    pub execution_time_ms: u64,
    /// Failure description for non-completed outcomes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_commit_has_empty_uri_and_hash() {
        let r = CommitResult::failed("order-1", ExecutionMode::Sandbox, 12, "boom");
        assert_eq!(r.status, CommitStatus::Failed);
        assert!(r.result_uri.is_empty());
        assert!(r.result_hash.is_empty());
        assert_eq!(r.error_message.as_deref(), Some("boom"));
        assert!(!r.is_success());
    }

    #[test]
    fn mismatch_description_only_for_real_mismatches() {
        let valid = VerificationResult::valid("aa".repeat(32));
        assert!(valid.mismatch_description().is_none());

        let err = VerificationResult::process_error("sandbox crashed");
        assert!(err.is_process_error());
        assert!(err.mismatch_description().is_none());

        let mismatch = VerificationResult::mismatch("aa".repeat(32), "bb".repeat(32));
        let desc = mismatch.mismatch_description().unwrap();
        assert!(desc.contains("hash mismatch"));
        assert!(desc.contains(&"aa".repeat(32)));
    }

    #[test]
    fn statuses_serialize_snake_case() {
        assert_eq!(
            serde_json::to_string(&ChallengeStatus::Submitted).unwrap(),
            "\"submitted\""
        );
        assert_eq!(
            serde_json::to_string(&OrderOutcome::Timeout).unwrap(),
            "\"timeout\""
        );
        assert_eq!(
            serde_json::to_string(&CommitStatus::Success).unwrap(),
            "\"success\""
        );
    }
}
