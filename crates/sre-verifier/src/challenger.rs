// SPDX-License-Identifier: MIT OR Apache-2.0
//! Challenge construction, submission, and the process-wide log.

use crate::verify::Verifier;
use async_trait::async_trait;
use chrono::Utc;
use sre_core::{ChallengeResult, ChallengeStatus, SYSTEM_PROGRAM_ID};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};

/// Accounts referenced by a challenge instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeAccounts {
    /// The escrow order under challenge.
    pub escrow: String,
    /// The challenger identity that signs.
    pub challenger: String,
    /// The system program.
    pub system_program: String,
}

/// The instruction handed to a [`TransactionSubmitter`].
///
/// The proof blob is the first 64 bytes of the UTF-8 mismatch
/// description, zero-padded; the on-chain program treats it as an opaque
/// `[u8; 64]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeInstruction {
    /// Program the instruction targets.
    pub program_id: String,
    /// Instruction name, always `challenge`.
    pub instruction: String,
    /// Referenced accounts.
    pub accounts: ChallengeAccounts,
    /// Opaque proof blob.
    pub proof: [u8; 64],
}

/// A transaction submission failure.
#[derive(Debug, Clone, thiserror::Error)]
#[error("challenge submission failed: {reason}")]
pub struct SubmitError {
    /// Failure detail.
    pub reason: String,
}

impl SubmitError {
    /// Wrap a failure description.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Submits challenge transactions to the ledger.
#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    /// Submit the instruction and return the transaction signature.
    async fn submit(&self, instruction: &ChallengeInstruction) -> Result<String, SubmitError>;
}

/// Demo-mode submitter: records the instruction and fabricates the
/// signature the devnet demo uses. Real submission is deliberately not
/// implemented here — wiring a signing path is the deployment's job.
#[derive(Debug, Default)]
pub struct DemoSubmitter {
    delay: Duration,
    submitted: Mutex<Vec<ChallengeInstruction>>,
}

impl DemoSubmitter {
    /// Submitter with no artificial latency.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Submitter that sleeps `delay` per submission, approximating rpc
    /// round-trip time in demos.
    #[must_use]
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// Every instruction submitted so far.
    #[must_use]
    pub fn submitted(&self) -> Vec<ChallengeInstruction> {
        self.submitted.lock().expect("submitter poisoned").clone()
    }
}

#[async_trait]
impl TransactionSubmitter for DemoSubmitter {
    async fn submit(&self, instruction: &ChallengeInstruction) -> Result<String, SubmitError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let prefix: String = instruction.accounts.escrow.chars().take(8).collect();
        self.submitted
            .lock()
            .expect("submitter poisoned")
            .push(instruction.clone());
        Ok(format!("challenge_tx_{prefix}"))
    }
}

/// Process-local ordered log of every challenge outcome.
///
/// Written only by the challenger; readers get copy-on-read snapshots so
/// iteration never races mutation.
#[derive(Debug, Default)]
pub struct ChallengeLog {
    entries: Mutex<Vec<ChallengeResult>>,
}

/// Counts by status over the whole log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChallengeStats {
    /// Entries in the log.
    pub total: usize,
    /// Challenges submitted on-chain.
    pub submitted: usize,
    /// Checks that found a valid result (no challenge made).
    pub rejected: usize,
    /// Preparation or submission failures.
    pub failed: usize,
}

impl ChallengeLog {
    /// An empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn add(&self, result: ChallengeResult) {
        info!(
            target: "sre.verifier",
            order_id = %result.order_id,
            status = ?result.status,
            "challenge logged"
        );
        self.entries.lock().expect("challenge log poisoned").push(result);
    }

    /// Snapshot of every entry, in append order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ChallengeResult> {
        self.entries.lock().expect("challenge log poisoned").clone()
    }

    /// Entries with the given status.
    #[must_use]
    pub fn by_status(&self, status: ChallengeStatus) -> Vec<ChallengeResult> {
        self.snapshot()
            .into_iter()
            .filter(|r| r.status == status)
            .collect()
    }

    /// Read-only counts by status.
    #[must_use]
    pub fn stats(&self) -> ChallengeStats {
        let mut counts: HashMap<ChallengeStatus, usize> = HashMap::new();
        let entries = self.entries.lock().expect("challenge log poisoned");
        for entry in entries.iter() {
            *counts.entry(entry.status).or_default() += 1;
        }
        ChallengeStats {
            total: entries.len(),
            submitted: counts.get(&ChallengeStatus::Submitted).copied().unwrap_or(0),
            rejected: counts.get(&ChallengeStatus::Rejected).copied().unwrap_or(0),
            failed: counts.get(&ChallengeStatus::Failed).copied().unwrap_or(0),
        }
    }
}

/// Verifies committed orders and challenges the invalid ones.
pub struct Challenger {
    verifier: Verifier,
    submitter: Arc<dyn TransactionSubmitter>,
    program_id: String,
    identity: String,
    log: Arc<ChallengeLog>,
}

impl Challenger {
    /// Challenger signing as `identity` and submitting through
    /// `submitter`.
    pub fn new(
        verifier: Verifier,
        submitter: Arc<dyn TransactionSubmitter>,
        identity: impl Into<String>,
    ) -> Self {
        Self {
            verifier,
            submitter,
            program_id: sre_core::ESCROW_PROGRAM_ID.to_string(),
            identity: identity.into(),
            log: Arc::new(ChallengeLog::new()),
        }
    }

    /// Shared handle to the challenge log.
    #[must_use]
    pub fn log(&self) -> Arc<ChallengeLog> {
        Arc::clone(&self.log)
    }

    /// Verify one order; on mismatch build and submit a challenge.
    ///
    /// A `Rejected` outcome means "no challenge was made"; process errors
    /// during verification map to `Failed` without any submission.
    pub async fn challenge_if_invalid(&self, order_id: &str) -> ChallengeResult {
        let verification = self.verifier.verify(order_id).await;

        let result = if let Some(error) = &verification.error {
            warn!(target: "sre.verifier", order_id, error = %error, "verification error, not challenging");
            ChallengeResult {
                order_id: order_id.to_string(),
                status: ChallengeStatus::Failed,
                error_reason: Some(format!("verification error: {error}")),
                tx_signature: None,
                timestamp: Utc::now(),
            }
        } else if verification.is_valid {
            ChallengeResult {
                order_id: order_id.to_string(),
                status: ChallengeStatus::Rejected,
                error_reason: Some("result valid, no challenge needed".into()),
                tx_signature: None,
                timestamp: Utc::now(),
            }
        } else {
            let description = verification
                .mismatch_description()
                .unwrap_or_else(|| "digest mismatch".into());
            warn!(target: "sre.verifier", order_id, %description, "invalid result detected");
            let instruction = self.build_instruction(order_id, &description);
            match self.submitter.submit(&instruction).await {
                Ok(signature) => {
                    info!(target: "sre.verifier", order_id, %signature, "challenge submitted");
                    ChallengeResult {
                        order_id: order_id.to_string(),
                        status: ChallengeStatus::Submitted,
                        error_reason: Some(description),
                        tx_signature: Some(signature),
                        timestamp: Utc::now(),
                    }
                }
                Err(err) => ChallengeResult {
                    order_id: order_id.to_string(),
                    status: ChallengeStatus::Failed,
                    error_reason: Some(err.to_string()),
                    tx_signature: None,
                    timestamp: Utc::now(),
                },
            }
        };

        self.log.add(result.clone());
        result
    }

    /// Check a batch of orders sequentially, the watcher loop's unit of
    /// work.
    pub async fn watch_and_challenge(&self, order_ids: &[String]) -> Vec<ChallengeResult> {
        let mut results = Vec::with_capacity(order_ids.len());
        for order_id in order_ids {
            results.push(self.challenge_if_invalid(order_id).await);
        }
        results
    }

    fn build_instruction(&self, order_id: &str, description: &str) -> ChallengeInstruction {
        ChallengeInstruction {
            program_id: self.program_id.clone(),
            instruction: "challenge".into(),
            accounts: ChallengeAccounts {
                escrow: order_id.to_string(),
                challenger: self.identity.clone(),
                system_program: SYSTEM_PROGRAM_ID.to_string(),
            },
            proof: proof_bytes(description),
        }
    }
}

impl std::fmt::Debug for Challenger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Challenger")
            .field("identity", &self.identity)
            .field("program_id", &self.program_id)
            .finish_non_exhaustive()
    }
}

/// First 64 bytes of the UTF-8 description, zero-padded.
fn proof_bytes(description: &str) -> [u8; 64] {
    let mut proof = [0u8; 64];
    let bytes = description.as_bytes();
    let len = bytes.len().min(64);
    proof[..len].copy_from_slice(&bytes[..len]);
    proof
}
