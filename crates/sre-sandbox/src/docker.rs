// SPDX-License-Identifier: MIT OR Apache-2.0
//! Engine backed by the local `docker` binary.

use crate::engine::{ContainerEngine, ContainerHandle, ContainerLogs, EngineError, RunSpec, WaitStatus};
use async_trait::async_trait;
use std::process::Output;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Drives containers through `docker create` / `start` / `wait` / `logs`
/// / `rm -f`, applying the resource limits from the [`RunSpec`].
#[derive(Debug, Clone)]
pub struct DockerCliEngine {
    binary: String,
}

impl DockerCliEngine {
    /// Engine using `docker` from `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_binary("docker")
    }

    /// Engine using an explicit binary, e.g. `podman`.
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn invoke(&self, args: &[&str]) -> Result<Output, EngineError> {
        let output = Command::new(&self.binary)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| EngineError::new(format!("spawn {}: {e}", self.binary)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EngineError::new(format!(
                "{} {} failed: {}",
                self.binary,
                args.first().unwrap_or(&""),
                stderr.trim()
            )));
        }
        Ok(output)
    }
}

impl Default for DockerCliEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContainerEngine for DockerCliEngine {
    async fn run(&self, spec: RunSpec) -> Result<Arc<dyn ContainerHandle>, EngineError> {
        let mem = spec.mem_limit_bytes.to_string();
        let period = spec.cpu_period_us.to_string();
        let quota = spec.cpu_quota_us.to_string();

        let mut args: Vec<String> = vec![
            "create".into(),
            "--memory".into(),
            mem,
            "--cpu-period".into(),
            period,
            "--cpu-quota".into(),
            quota,
        ];
        if spec.network_disabled {
            args.push("--network".into());
            args.push("none".into());
        }
        for (key, value) in &spec.env {
            args.push("-e".into());
            args.push(format!("{key}={value}"));
        }
        args.push(spec.image.clone());
        args.extend(spec.command.iter().cloned());

        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let created = self.invoke(&arg_refs).await?;
        let id = String::from_utf8_lossy(&created.stdout).trim().to_string();
        if id.is_empty() {
            return Err(EngineError::new("docker create returned no container id"));
        }

        self.invoke(&["start", &id]).await?;
        debug!(target: "sre.sandbox", id = %id, image = %spec.image, "container started");

        Ok(Arc::new(DockerCliHandle {
            engine: self.clone(),
            id,
        }))
    }
}

struct DockerCliHandle {
    engine: DockerCliEngine,
    id: String,
}

#[async_trait]
impl ContainerHandle for DockerCliHandle {
    fn id(&self) -> &str {
        &self.id
    }

    async fn wait(&self, timeout: Duration) -> Result<WaitStatus, EngineError> {
        let args = ["wait", self.id.as_str()];
        let wait = self.engine.invoke(&args);
        match tokio::time::timeout(timeout, wait).await {
            Err(_) => Ok(WaitStatus::TimedOut),
            Ok(result) => {
                let output = result?;
                let text = String::from_utf8_lossy(&output.stdout);
                let code = text
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| EngineError::new(format!("unparseable wait output: {text}")))?;
                Ok(WaitStatus::Exited { code })
            }
        }
    }

    async fn logs(&self) -> Result<ContainerLogs, EngineError> {
        // `docker logs` keeps the streams separate on the cli process's
        // own stdout/stderr.
        let output = Command::new(&self.engine.binary)
            .args(["logs", &self.id])
            .output()
            .await
            .map_err(|e| EngineError::new(format!("spawn {}: {e}", self.engine.binary)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EngineError::new(format!("docker logs failed: {}", stderr.trim())));
        }
        Ok(ContainerLogs {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn remove(&self, force: bool) -> Result<(), EngineError> {
        let result = if force {
            self.engine.invoke(&["rm", "-f", &self.id]).await
        } else {
            self.engine.invoke(&["rm", &self.id]).await
        };
        match result {
            Ok(_) => Ok(()),
            // Already gone counts as removed.
            Err(err) if err.reason.contains("No such container") => Ok(()),
            Err(err) => Err(err),
        }
    }
}
