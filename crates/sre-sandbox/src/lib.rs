// SPDX-License-Identifier: MIT OR Apache-2.0
//! Resource-bounded, network-disabled skill execution.
//!
//! One container per invocation: the input envelope is delivered through
//! the `INPUT_JSON` environment variable, standard output is decoded as
//! the skill result, and the container is force-removed on every exit
//! path — success, failure, timeout and cancellation alike. Network is
//! disabled by default because any network call is a source of
//! non-determinism that would make the replay contract unsatisfiable.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod docker;
mod engine;
mod mock;

pub use docker::DockerCliEngine;
pub use engine::{ContainerEngine, ContainerHandle, ContainerLogs, EngineError, RunSpec, WaitStatus};
pub use mock::{MockEngine, MockRun};

use serde_json::Value;
use sre_core::{EnvelopeError, InputEnvelope, SkillPackage};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default memory ceiling: 512 MiB.
pub const DEFAULT_MEM_LIMIT_BYTES: u64 = 512 * 1024 * 1024;

/// Default CPU accounting period in microseconds.
pub const DEFAULT_CPU_PERIOD_US: u64 = 100_000;

/// Default CPU quota in microseconds (50% of one core).
pub const DEFAULT_CPU_QUOTA_US: u64 = 50_000;

/// Default wall-clock ceiling in seconds.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Per-call resource limits. Every field has a safe default; callers
/// override selectively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxConfig {
    /// Memory ceiling in bytes.
    pub mem_limit_bytes: u64,
    /// CPU accounting period in microseconds.
    pub cpu_period_us: u64,
    /// CPU quota in microseconds per period.
    pub cpu_quota_us: u64,
    /// Wall-clock ceiling in seconds; the skill's own declared ceiling
    /// further lowers this.
    pub timeout_seconds: u64,
    /// Whether the container runs without network access.
    pub network_disabled: bool,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            mem_limit_bytes: DEFAULT_MEM_LIMIT_BYTES,
            cpu_period_us: DEFAULT_CPU_PERIOD_US,
            cpu_quota_us: DEFAULT_CPU_QUOTA_US,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            network_disabled: true,
        }
    }
}

/// Failures raised by sandboxed execution.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    /// The input envelope violated a pre-execution invariant; the
    /// container was never started.
    #[error(transparent)]
    Input(#[from] EnvelopeError),

    /// Sandbox-mode execution requested for a package with no runtime
    /// descriptor.
    #[error("skill package `{name}` has no sandbox runtime descriptor")]
    MissingRuntime {
        /// Skill name.
        name: String,
    },

    /// The wait deadline elapsed; the container was force-removed.
    #[error("container timed out after {seconds}s")]
    ContainerTimeout {
        /// Deadline that elapsed.
        seconds: u64,
    },

    /// The container exited with a non-zero code.
    #[error("container exited with code {code}: {logs}")]
    NonZeroExit {
        /// Observed exit code.
        code: i64,
        /// Captured container logs.
        logs: String,
    },

    /// Standard output was not valid JSON.
    #[error("container output is not valid JSON: {reason}")]
    InvalidOutput {
        /// Parse failure detail.
        reason: String,
    },

    /// The container engine itself failed.
    #[error("container engine failure: {0}")]
    Engine(#[from] EngineError),
}

/// Executes skills in containers obtained from a [`ContainerEngine`].
#[derive(Clone)]
pub struct Sandbox {
    engine: Arc<dyn ContainerEngine>,
}

impl Sandbox {
    /// Sandbox over the given engine.
    pub fn new(engine: Arc<dyn ContainerEngine>) -> Self {
        Self { engine }
    }

    /// Sandbox over the local `docker` binary.
    #[must_use]
    pub fn docker() -> Self {
        Self::new(Arc::new(DockerCliEngine::new()))
    }

    /// Execute a sandbox-mode skill and decode its standard output.
    ///
    /// # Errors
    ///
    /// See [`SandboxError`]; input-invariant violations are raised before
    /// the engine is touched.
    pub async fn execute(
        &self,
        skill: &SkillPackage,
        envelope: &InputEnvelope,
        config: &SandboxConfig,
    ) -> Result<Value, SandboxError> {
        envelope.validate()?;

        let runtime = skill.runtime.as_ref().ok_or_else(|| SandboxError::MissingRuntime {
            name: skill.name.clone(),
        })?;

        // The skill's declared ceiling only ever lowers the configured one.
        let timeout_seconds = runtime
            .timeout_seconds
            .map_or(config.timeout_seconds, |t| t.min(config.timeout_seconds));

        let spec = RunSpec {
            image: runtime.docker_image.clone(),
            command: vec!["python".into(), runtime.entrypoint.clone()],
            env: vec![("INPUT_JSON".into(), envelope.to_json())],
            mem_limit_bytes: config.mem_limit_bytes,
            cpu_period_us: config.cpu_period_us,
            cpu_quota_us: config.cpu_quota_us,
            network_disabled: config.network_disabled,
        };

        debug!(
            target: "sre.sandbox",
            skill = %skill.name,
            image = %spec.image,
            timeout_seconds,
            "starting container"
        );

        let handle = self.engine.run(spec).await?;
        let mut guard = ReleaseGuard::new(Arc::clone(&handle));

        let outcome = Self::drive(&*handle, timeout_seconds).await;

        // Scoped release: the handle is removed before this call returns,
        // whatever `drive` did.
        if let Err(err) = handle.remove(true).await {
            warn!(target: "sre.sandbox", id = %handle.id(), %err, "force-remove failed");
        }
        guard.disarm();

        outcome
    }

    async fn drive(
        handle: &dyn ContainerHandle,
        timeout_seconds: u64,
    ) -> Result<Value, SandboxError> {
        let status = handle.wait(Duration::from_secs(timeout_seconds)).await?;

        let code = match status {
            WaitStatus::TimedOut => {
                return Err(SandboxError::ContainerTimeout {
                    seconds: timeout_seconds,
                });
            }
            WaitStatus::Exited { code } => code,
        };

        let logs = handle.logs().await?;
        if code != 0 {
            return Err(SandboxError::NonZeroExit {
                code,
                logs: logs.combined(),
            });
        }

        serde_json::from_str(&logs.stdout).map_err(|e| SandboxError::InvalidOutput {
            reason: e.to_string(),
        })
    }
}

impl std::fmt::Debug for Sandbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sandbox").finish_non_exhaustive()
    }
}

/// Removes the container on drop when the normal exit path was skipped,
/// which happens when the surrounding future is cancelled mid-await.
struct ReleaseGuard {
    handle: Option<Arc<dyn ContainerHandle>>,
}

impl ReleaseGuard {
    fn new(handle: Arc<dyn ContainerHandle>) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    fn disarm(&mut self) {
        self.handle = None;
    }
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Ok(rt) = tokio::runtime::Handle::try_current() {
                rt.spawn(async move {
                    if let Err(err) = handle.remove(true).await {
                        warn!(target: "sre.sandbox", id = %handle.id(), %err, "release-on-cancel failed");
                    }
                });
            }
        }
    }
}
