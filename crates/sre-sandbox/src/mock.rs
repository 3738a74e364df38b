// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scriptable engine used by the test suites of every downstream crate.

use crate::engine::{ContainerEngine, ContainerHandle, ContainerLogs, EngineError, RunSpec, WaitStatus};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted container outcome.
#[derive(Debug, Clone)]
pub struct MockRun {
    /// Exit code the container reports.
    pub exit_code: i64,
    /// Standard output the container produces.
    pub stdout: String,
    /// Standard error the container produces.
    pub stderr: String,
    /// Simulated run time before exit.
    pub delay: Duration,
}

impl MockRun {
    /// A run that exits 0 printing `stdout`.
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
            delay: Duration::ZERO,
        }
    }

    /// A run that exits with `code` printing `stderr`.
    pub fn failure(code: i64, stderr: impl Into<String>) -> Self {
        Self {
            exit_code: code,
            stdout: String::new(),
            stderr: stderr.into(),
            delay: Duration::ZERO,
        }
    }

    /// A run that sleeps for `delay` before exiting 0.
    pub fn sleeping(delay: Duration) -> Self {
        Self {
            exit_code: 0,
            stdout: "{}".into(),
            stderr: String::new(),
            delay,
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    script: VecDeque<MockRun>,
    started: Vec<RunSpec>,
    removed: Vec<String>,
    active: Vec<String>,
}

/// Engine whose containers behave as scripted, tracking every start and
/// removal so tests can assert the release invariant.
#[derive(Debug, Clone, Default)]
pub struct MockEngine {
    state: Arc<Mutex<MockState>>,
    next_id: Arc<AtomicU64>,
}

impl MockEngine {
    /// Engine whose runs all succeed with an empty JSON object.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine that replays the given outcomes in order, then falls back
    /// to the default success.
    #[must_use]
    pub fn scripted(runs: impl IntoIterator<Item = MockRun>) -> Self {
        let engine = Self::new();
        engine
            .state
            .lock()
            .expect("mock state poisoned")
            .script
            .extend(runs);
        engine
    }

    /// Queue one more scripted outcome.
    pub fn push(&self, run: MockRun) {
        self.state
            .lock()
            .expect("mock state poisoned")
            .script
            .push_back(run);
    }

    /// Specs of every container started so far.
    #[must_use]
    pub fn started(&self) -> Vec<RunSpec> {
        self.state.lock().expect("mock state poisoned").started.clone()
    }

    /// Ids of every container removed so far.
    #[must_use]
    pub fn removed(&self) -> Vec<String> {
        self.state.lock().expect("mock state poisoned").removed.clone()
    }

    /// Ids of containers started but not yet removed.
    #[must_use]
    pub fn active(&self) -> Vec<String> {
        self.state.lock().expect("mock state poisoned").active.clone()
    }
}

#[async_trait]
impl ContainerEngine for MockEngine {
    async fn run(&self, spec: RunSpec) -> Result<Arc<dyn ContainerHandle>, EngineError> {
        let run = {
            let mut state = self.state.lock().expect("mock state poisoned");
            state.started.push(spec);
            state
                .script
                .pop_front()
                .unwrap_or_else(|| MockRun::success("{}"))
        };
        let id = format!("mock-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        self.state
            .lock()
            .expect("mock state poisoned")
            .active
            .push(id.clone());
        Ok(Arc::new(MockHandle {
            id,
            run,
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockHandle {
    id: String,
    run: MockRun,
    state: Arc<Mutex<MockState>>,
}

#[async_trait]
impl ContainerHandle for MockHandle {
    fn id(&self) -> &str {
        &self.id
    }

    async fn wait(&self, timeout: Duration) -> Result<WaitStatus, EngineError> {
        if self.run.delay > timeout {
            tokio::time::sleep(timeout).await;
            return Ok(WaitStatus::TimedOut);
        }
        tokio::time::sleep(self.run.delay).await;
        Ok(WaitStatus::Exited {
            code: self.run.exit_code,
        })
    }

    async fn logs(&self) -> Result<ContainerLogs, EngineError> {
        Ok(ContainerLogs {
            stdout: self.run.stdout.clone(),
            stderr: self.run.stderr.clone(),
        })
    }

    async fn remove(&self, _force: bool) -> Result<(), EngineError> {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.active.retain(|id| id != &self.id);
        if !state.removed.contains(&self.id) {
            state.removed.push(self.id.clone());
        }
        Ok(())
    }
}
