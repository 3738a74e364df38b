// SPDX-License-Identifier: MIT OR Apache-2.0
//! Failure callback registry.

use sre_core::OrderResult;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex};
use tracing::error;

/// A callback invoked with the terminal record of a failed or timed-out
/// order.
pub type FailureCallback = Arc<dyn Fn(&OrderResult) + Send + Sync>;

/// Holds registered failure callbacks.
///
/// Explicit register/clear keeps tests hermetic; nothing here is an
/// ambient global.
#[derive(Default)]
pub struct CallbackRegistry {
    callbacks: Mutex<Vec<FailureCallback>>,
}

impl CallbackRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback to fire on Timeout and Failed outcomes.
    pub fn register(&self, callback: FailureCallback) {
        self.callbacks
            .lock()
            .expect("callback registry poisoned")
            .push(callback);
    }

    /// Remove every registered callback.
    pub fn clear(&self) {
        self.callbacks
            .lock()
            .expect("callback registry poisoned")
            .clear();
    }

    /// Number of registered callbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.callbacks
            .lock()
            .expect("callback registry poisoned")
            .len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fire every callback, best-effort: a panicking callback is logged
    /// and the rest still run.
    pub fn fire(&self, result: &OrderResult) {
        let callbacks = self
            .callbacks
            .lock()
            .expect("callback registry poisoned")
            .clone();
        for (index, callback) in callbacks.iter().enumerate() {
            if catch_unwind(AssertUnwindSafe(|| callback(result))).is_err() {
                error!(
                    target: "sre.orchestrator",
                    callback = index,
                    order_id = %result.order_id,
                    "failure callback panicked"
                );
            }
        }
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("callbacks", &self.len())
            .finish()
    }
}
