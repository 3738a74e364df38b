// SPDX-License-Identifier: MIT OR Apache-2.0
//! Durable program-log subscription and event fan-out.
//!
//! The [`ChainListener`] holds one websocket per process, subscribes to
//! each watched program's logs at `confirmed` commitment, and fans typed
//! [`ChainEvent`]s out to registered callbacks strictly in arrival
//! order. Transport failures drive a bounded reconnect loop; a callback
//! that fails is logged and never aborts the loop. The [`MockListener`]
//! honours the same surface for deterministic tests.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod listener;
mod mock;
mod parser;
mod stop;

pub use listener::{ChainListener, HELIUS_WS_DEVNET, HELIUS_WS_MAINNET, ListenerConfig};
pub use mock::MockListener;
pub use parser::LogParser;
pub use stop::StopToken;

use futures::future::BoxFuture;
use sre_core::ChainEvent;
use std::sync::Arc;

/// A registered event consumer.
///
/// Callbacks are invoked in sequence, not concurrently, so a callback
/// that suspends does not reorder subsequent deliveries.
pub type EventCallback = Arc<dyn Fn(ChainEvent) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Adapt an async closure into an [`EventCallback`].
pub fn callback<F, Fut>(f: F) -> EventCallback
where
    F: Fn(ChainEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |event| Box::pin(f(event)))
}

/// Failures surfaced by listener loops.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    /// A websocket-level failure; drives the reconnect loop.
    #[error("listener transport failure: {reason}")]
    Transport {
        /// Failure detail.
        reason: String,
    },

    /// Every reconnect attempt failed; the listener has stopped.
    #[error("listener gave up after {attempts} reconnect attempts: {last}")]
    ReconnectExhausted {
        /// Attempts made.
        attempts: u32,
        /// Description of the final failure.
        last: String,
    },
}
