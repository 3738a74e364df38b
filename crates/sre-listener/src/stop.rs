// SPDX-License-Identifier: MIT OR Apache-2.0
//! Cooperative stop signalling for listener loops.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// A cloneable token that signals a listener to stop at the next message
/// boundary.
///
/// All clones share state; stopping one makes every clone observe
/// `is_stopped() == true`. Stopping is idempotent.
#[derive(Clone)]
pub struct StopToken {
    inner: Arc<StopInner>,
}

struct StopInner {
    stopped: AtomicBool,
    notify: Notify,
}

impl StopToken {
    /// A token that is not yet stopped.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StopInner {
                stopped: AtomicBool::new(false),
                notify: Notify::new(),
            }),
        }
    }

    /// Signal the stop. Calling more than once is harmless.
    pub fn stop(&self) {
        self.inner.stopped.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Whether the stop has been signalled.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Resolves when the token is stopped; immediately if it already is.
    pub async fn stopped(&self) {
        if self.is_stopped() {
            return;
        }
        loop {
            self.inner.notify.notified().await;
            if self.is_stopped() {
                return;
            }
        }
    }
}

impl Default for StopToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StopToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StopToken")
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_running() {
        assert!(!StopToken::new().is_stopped());
    }

    #[test]
    fn stop_is_idempotent_and_shared() {
        let a = StopToken::new();
        let b = a.clone();
        a.stop();
        a.stop();
        assert!(b.is_stopped());
    }

    #[tokio::test]
    async fn stopped_future_resolves() {
        let token = StopToken::new();
        let waiter = token.clone();
        let task = tokio::spawn(async move { waiter.stopped().await });
        token.stop();
        task.await.unwrap();
    }
}
