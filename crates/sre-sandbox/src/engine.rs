// SPDX-License-Identifier: MIT OR Apache-2.0
//! The container engine contract the sandbox is written against.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// A container engine failure, opaque to the sandbox.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{reason}")]
pub struct EngineError {
    /// Human-readable failure detail.
    pub reason: String,
}

impl EngineError {
    /// Wrap a failure description.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Everything needed to launch one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSpec {
    /// Image reference.
    pub image: String,
    /// Command and arguments.
    pub command: Vec<String>,
    /// Environment variables.
    pub env: Vec<(String, String)>,
    /// Memory ceiling in bytes.
    pub mem_limit_bytes: u64,
    /// CPU accounting period in microseconds.
    pub cpu_period_us: u64,
    /// CPU quota in microseconds per period.
    pub cpu_quota_us: u64,
    /// Whether to disable network access.
    pub network_disabled: bool,
}

/// Result of waiting for a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStatus {
    /// The container exited with the given code.
    Exited {
        /// Exit code.
        code: i64,
    },
    /// The deadline elapsed before the container exited.
    TimedOut,
}

/// Captured container output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerLogs {
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
}

impl ContainerLogs {
    /// Both streams joined, stderr last, for error messages.
    #[must_use]
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (true, true) => String::new(),
            (false, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout, self.stderr),
        }
    }
}

/// A launched container.
#[async_trait]
pub trait ContainerHandle: Send + Sync {
    /// Engine-assigned container id.
    fn id(&self) -> &str;

    /// Wait up to `timeout` for the container to exit.
    async fn wait(&self, timeout: Duration) -> Result<WaitStatus, EngineError>;

    /// Fetch the container's captured output streams.
    async fn logs(&self) -> Result<ContainerLogs, EngineError>;

    /// Remove the container, killing it first when `force` is set.
    /// Idempotent: removing an already-removed container succeeds.
    async fn remove(&self, force: bool) -> Result<(), EngineError>;
}

/// Launches containers. One implementation drives the local `docker`
/// binary; the mock engine scripts outcomes for tests.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Create and start a container for `spec`.
    async fn run(&self, spec: RunSpec) -> Result<Arc<dyn ContainerHandle>, EngineError>;
}
