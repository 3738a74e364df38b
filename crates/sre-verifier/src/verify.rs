// SPDX-License-Identifier: MIT OR Apache-2.0
//! The replay pipeline: refetch, re-execute, recompute, byte-compare.

use crate::ledger::LedgerClient;
use sre_core::{ExecutionMode, VerificationResult};
use sre_sandbox::{Sandbox, SandboxConfig};
use std::sync::Arc;
use tracing::{info, warn};

/// Replays committed orders and compares digests.
///
/// Any process failure (ledger unreachable, sandbox crash) is reported as
/// a verification *error*, strictly distinct from a digest mismatch —
/// only mismatches may trigger a challenge.
#[derive(Clone)]
pub struct Verifier {
    ledger: Arc<dyn LedgerClient>,
    sandbox: Sandbox,
    sandbox_config: SandboxConfig,
}

impl Verifier {
    /// Verifier over the given ledger view and sandbox.
    pub fn new(ledger: Arc<dyn LedgerClient>, sandbox: Sandbox) -> Self {
        Self {
            ledger,
            sandbox,
            sandbox_config: SandboxConfig::default(),
        }
    }

    /// Override the sandbox limits used for replays.
    #[must_use]
    pub fn with_sandbox_config(mut self, config: SandboxConfig) -> Self {
        self.sandbox_config = config;
        self
    }

    /// Replay one committed order and compare digests byte-for-byte.
    pub async fn verify(&self, order_id: &str) -> VerificationResult {
        info!(target: "sre.verifier", order_id, "starting verification");

        // 1. The order and its committed digest.
        let order = match self.ledger.fetch_order(order_id).await {
            Ok(order) => order,
            Err(err) => return VerificationResult::process_error(err.to_string()),
        };
        let Some(committed) = order.result_digest else {
            return VerificationResult::process_error(format!(
                "order {order_id} has no committed digest"
            ));
        };

        // 2. Resolve the immutable package by content hash.
        let package = match self.ledger.fetch_skill(&order.skill).await {
            Ok(record) => match self.ledger.fetch_skill_package(&record.content_hash).await {
                Ok(package) => package,
                Err(err) => return VerificationResult::process_error(err.to_string()),
            },
            Err(err) => return VerificationResult::process_error(err.to_string()),
        };

        // Only sandbox results carry the bit-identical replay guarantee.
        if package.execution_mode == ExecutionMode::Ai {
            return VerificationResult::process_error(format!(
                "order {order_id} ran in ai mode; results are accepted by digest and not replayable"
            ));
        }

        // 3. The original input envelope.
        let input = match self.ledger.fetch_order_input(order_id).await {
            Ok(input) => input,
            Err(err) => return VerificationResult::process_error(err.to_string()),
        };

        // 4. Deterministic replay, same envelope, same limits.
        let replay = match self
            .sandbox
            .execute(&package, &input, &self.sandbox_config)
            .await
        {
            Ok(value) => value,
            Err(err) => {
                return VerificationResult::process_error(format!("replay failed: {err}"));
            }
        };

        // 5–6. Recompute and byte-compare.
        let replay_digest = sre_digest::digest(&replay);
        let replay_hex = sre_digest::to_hex(&replay_digest);
        let committed_hex = sre_digest::to_hex(&committed);

        if replay_digest == committed {
            info!(target: "sre.verifier", order_id, hash = %replay_hex, "verification passed");
            VerificationResult::valid(replay_hex)
        } else {
            warn!(
                target: "sre.verifier",
                order_id,
                expected = %replay_hex,
                actual = %committed_hex,
                "digest mismatch"
            );
            VerificationResult::mismatch(replay_hex, committed_hex)
        }
    }
}

impl std::fmt::Debug for Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Verifier").finish_non_exhaustive()
    }
}
