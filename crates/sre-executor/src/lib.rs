// SPDX-License-Identifier: MIT OR Apache-2.0
//! The executor pipeline: run a skill, digest the result, persist it,
//! and hand back everything the on-chain submitter needs.
//!
//! The pipeline itself never submits a transaction; it produces a
//! [`CommitResult`] whose `result_hash` and `result_uri` are the payload
//! of the commit instruction. Failures in any step collapse to a failed
//! record at this boundary — the orchestrator decides whether to retry.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod ai;
mod chat;
mod provider;

pub use ai::{AiExecutor, AiRunOutput};
pub use chat::OpenAiCompatibleProvider;
pub use provider::{AiProvider, ProviderError, ProviderOutput, SimulatedProvider};

use sre_core::{CommitResult, CommitStatus, ExecutionMode, InputEnvelope, SkillPackage};
use sre_sandbox::{Sandbox, SandboxConfig};
use sre_storage::Gateway;
use std::time::Instant;
use tracing::{error, info};

/// Runs the commit path for one order at a time.
#[derive(Debug, Clone)]
pub struct Committer {
    sandbox: Sandbox,
    gateway: Gateway,
    ai: AiExecutor,
}

impl Committer {
    /// Committer over the given sandbox, storage gateway and AI executor.
    pub fn new(sandbox: Sandbox, gateway: Gateway, ai: AiExecutor) -> Self {
        Self {
            sandbox,
            gateway,
            ai,
        }
    }

    /// The storage gateway this committer persists results through.
    #[must_use]
    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// Execute the skill, digest and store the result, and return the
    /// commit record.
    ///
    /// `execution_time_ms` is measured on every path, including failures.
    pub async fn commit(
        &self,
        order_id: &str,
        skill: &SkillPackage,
        input: &InputEnvelope,
        execution_mode: ExecutionMode,
        sandbox_config: &SandboxConfig,
    ) -> CommitResult {
        let start = Instant::now();
        let mut model_used = None;
        let mut tokens_used = 0;

        // Step 1: produce the result, by replayable sandbox run or by
        // provider inference.
        let result = match execution_mode {
            ExecutionMode::Sandbox => {
                match self.sandbox.execute(skill, input, sandbox_config).await {
                    Ok(value) => value,
                    Err(err) => {
                        return self.fail(order_id, execution_mode, start, err.to_string());
                    }
                }
            }
            ExecutionMode::Ai => match self.ai.execute_skill(skill, input).await {
                Ok(run) => {
                    model_used = Some(run.model_used);
                    tokens_used = run.tokens_used;
                    run.output
                }
                Err(err) => {
                    return self.fail(order_id, execution_mode, start, err.to_string());
                }
            },
        };

        // Step 2: canonical digest.
        let result_hash = sre_digest::digest_hex(&result);

        // Step 3: persist the payload.
        let result_uri = match self.gateway.store_result(&result, order_id).await {
            Ok(uri) => uri,
            Err(err) => {
                return self.fail(order_id, execution_mode, start, err.to_string());
            }
        };

        let execution_time_ms = start.elapsed().as_millis() as u64;
        info!(
            target: "sre.executor",
            order_id,
            hash = %result_hash,
            uri = %result_uri,
            execution_time_ms,
            "commit prepared"
        );

        CommitResult {
            order_id: order_id.to_string(),
            result_uri,
            result_hash,
            execution_time_ms,
            status: CommitStatus::Success,
            error_message: None,
            execution_mode,
            model_used,
            tokens_used,
        }
    }

    fn fail(
        &self,
        order_id: &str,
        execution_mode: ExecutionMode,
        start: Instant,
        message: String,
    ) -> CommitResult {
        error!(target: "sre.executor", order_id, error = %message, "commit failed");
        CommitResult::failed(
            order_id,
            execution_mode,
            start.elapsed().as_millis() as u64,
            message,
        )
    }
}
