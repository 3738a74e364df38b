// SPDX-License-Identifier: MIT OR Apache-2.0
//! Interval-driven synthetic event source for deterministic tests.

use crate::stop::StopToken;
use crate::{EventCallback, ListenerError};
use chrono::Utc;
use sre_core::{ChainEvent, ESCROW_PROGRAM_ID, EventKind};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::warn;

/// Kinds the mock cycles through, shaped like a typical order lifecycle.
const SCRIPT: [EventKind; 4] = [
    EventKind::SkillRegistered,
    EventKind::EscrowCreated,
    EventKind::EscrowFunded,
    EventKind::EscrowReleased,
];

/// Honours the listener callback surface while emitting synthetic events
/// on a configurable interval. The substrate for downstream pipeline
/// tests and the `--test` CLI mode.
pub struct MockListener {
    interval: Duration,
    limit: Option<u64>,
    callbacks: Vec<EventCallback>,
    stop: StopToken,
}

impl MockListener {
    /// Mock emitting one event per `interval`, indefinitely.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            limit: None,
            callbacks: Vec::new(),
            stop: StopToken::new(),
        }
    }

    /// Stop after `limit` events instead of running until stopped.
    #[must_use]
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Register a callback; same ordering contract as the real listener.
    pub fn on_event(&mut self, callback: EventCallback) {
        self.callbacks.push(callback);
    }

    /// Token that stops the emission loop.
    #[must_use]
    pub fn stop_token(&self) -> StopToken {
        self.stop.clone()
    }

    /// Signal the loop to stop. Idempotent.
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Emit synthetic events until stopped (or the limit is reached).
    ///
    /// # Errors
    ///
    /// Never fails; the `Result` mirrors the real listener's signature.
    pub async fn run(&self) -> Result<(), ListenerError> {
        let mut sequence: u64 = 0;
        loop {
            if self.stop.is_stopped() {
                return Ok(());
            }
            if self.limit.is_some_and(|limit| sequence >= limit) {
                return Ok(());
            }
            tokio::select! {
                () = self.stop.stopped() => return Ok(()),
                () = tokio::time::sleep(self.interval) => {}
            }
            if self.stop.is_stopped() {
                return Ok(());
            }

            let event = Self::synthesize(sequence);
            for (index, callback) in self.callbacks.iter().enumerate() {
                if let Err(err) = callback(event.clone()).await {
                    warn!(
                        target: "sre.listener",
                        callback = index,
                        %err,
                        "mock event callback failed"
                    );
                }
            }
            sequence += 1;
        }
    }

    fn synthesize(sequence: u64) -> ChainEvent {
        let kind = SCRIPT[(sequence as usize) % SCRIPT.len()];
        let mut data = BTreeMap::new();
        data.insert("sequence".into(), serde_json::Value::Number(sequence.into()));
        ChainEvent {
            kind,
            signature: format!("mock-sig-{sequence}"),
            slot: 1000 + sequence,
            timestamp: Utc::now(),
            program_id: ESCROW_PROGRAM_ID.to_string(),
            data,
            raw_logs: vec![format!(
                "Program log: {}",
                kind.log_keyword().unwrap_or("Unknown")
            )],
        }
    }
}

impl std::fmt::Debug for MockListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockListener")
            .field("interval", &self.interval)
            .field("limit", &self.limit)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}
