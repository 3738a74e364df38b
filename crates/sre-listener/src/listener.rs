// SPDX-License-Identifier: MIT OR Apache-2.0
//! Long-lived `logsSubscribe` connection with reconnect discipline.

use crate::parser::LogParser;
use crate::stop::StopToken;
use crate::{EventCallback, ListenerError};
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use sre_core::{ChainEvent, ESCROW_PROGRAM_ID, TRANSFER_HOOK_PROGRAM_ID};
use std::collections::HashMap;
use std::time::Duration;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Helius devnet websocket endpoint.
pub const HELIUS_WS_DEVNET: &str = "wss://devnet.helius-rpc.com/";

/// Helius mainnet websocket endpoint.
pub const HELIUS_WS_MAINNET: &str = "wss://mainnet.helius-rpc.com/";

/// Connection settings for a [`ChainListener`].
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Full websocket URL including any credential query parameter.
    pub ws_url: String,
    /// Program ids to subscribe to, one `logsSubscribe` each.
    pub programs: Vec<String>,
    /// Fixed delay between reconnect attempts.
    pub reconnect_delay: Duration,
    /// Consecutive failed connections tolerated before giving up.
    pub max_reconnect_attempts: u32,
}

impl ListenerConfig {
    fn helius(base: &str, api_key: &str) -> Self {
        Self {
            ws_url: format!("{base}?api-key={api_key}"),
            programs: vec![
                ESCROW_PROGRAM_ID.to_string(),
                TRANSFER_HOOK_PROGRAM_ID.to_string(),
            ],
            reconnect_delay: Duration::from_secs(5),
            max_reconnect_attempts: 10,
        }
    }

    /// Devnet config with the default watched programs.
    #[must_use]
    pub fn helius_devnet(api_key: &str) -> Self {
        Self::helius(HELIUS_WS_DEVNET, api_key)
    }

    /// Mainnet config with the default watched programs.
    #[must_use]
    pub fn helius_mainnet(api_key: &str) -> Self {
        Self::helius(HELIUS_WS_MAINNET, api_key)
    }
}

/// Subscribes to program logs at `confirmed` commitment and fans typed
/// events out to registered callbacks, strictly in arrival order.
pub struct ChainListener {
    config: ListenerConfig,
    parser: LogParser,
    callbacks: Vec<EventCallback>,
    stop: StopToken,
}

impl ChainListener {
    /// Listener over the given connection settings.
    #[must_use]
    pub fn new(config: ListenerConfig) -> Self {
        let parser = LogParser::new(config.programs.iter().cloned());
        Self {
            config,
            parser,
            callbacks: Vec::new(),
            stop: StopToken::new(),
        }
    }

    /// Register a callback. Callbacks run sequentially per event; one
    /// that fails is logged and never aborts the loop.
    pub fn on_event(&mut self, callback: EventCallback) {
        self.callbacks.push(callback);
    }

    /// Token that stops the listener at the next message boundary.
    #[must_use]
    pub fn stop_token(&self) -> StopToken {
        self.stop.clone()
    }

    /// Signal the listener to stop. Idempotent.
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Run until stopped or until the reconnect budget is exhausted.
    ///
    /// # Errors
    ///
    /// [`ListenerError::ReconnectExhausted`] after
    /// `max_reconnect_attempts` consecutive transport failures; the
    /// supervisor decides whether to restart the process.
    pub async fn run(&self) -> Result<(), ListenerError> {
        let mut attempts: u32 = 0;
        while !self.stop.is_stopped() {
            match self.run_connection(&mut attempts).await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    attempts += 1;
                    if attempts >= self.config.max_reconnect_attempts {
                        return Err(ListenerError::ReconnectExhausted {
                            attempts,
                            last: err.to_string(),
                        });
                    }
                    warn!(
                        target: "sre.listener",
                        attempt = attempts,
                        max = self.config.max_reconnect_attempts,
                        %err,
                        "transport failure, reconnecting"
                    );
                    tokio::select! {
                        () = tokio::time::sleep(self.config.reconnect_delay) => {}
                        () = self.stop.stopped() => return Ok(()),
                    }
                }
            }
        }
        Ok(())
    }

    /// One socket lifetime: connect, subscribe, dispatch until the socket
    /// dies or the stop token fires.
    async fn run_connection(&self, attempts: &mut u32) -> Result<(), ListenerError> {
        let (mut ws, _) = connect_async(self.config.ws_url.as_str())
            .await
            .map_err(|e| ListenerError::Transport {
                reason: e.to_string(),
            })?;
        info!(target: "sre.listener", url = %self.config.ws_url, "connected");

        for (index, program) in self.config.programs.iter().enumerate() {
            let request = json!({
                "jsonrpc": "2.0",
                "id": index + 1,
                "method": "logsSubscribe",
                "params": [
                    {"mentions": [program]},
                    {"commitment": "confirmed"},
                ],
            });
            ws.send(Message::Text(request.to_string().into()))
                .await
                .map_err(|e| ListenerError::Transport {
                    reason: e.to_string(),
                })?;
        }

        // subscription id -> program id, filled in as confirmations arrive.
        let mut subscriptions: HashMap<u64, String> = HashMap::new();

        loop {
            tokio::select! {
                () = self.stop.stopped() => {
                    let _ = ws.close(None).await;
                    info!(target: "sre.listener", "stopped");
                    return Ok(());
                }
                message = ws.next() => {
                    let message = message
                        .ok_or_else(|| ListenerError::Transport { reason: "socket closed".into() })?
                        .map_err(|e| ListenerError::Transport { reason: e.to_string() })?;
                    match message {
                        Message::Text(text) => {
                            if let Some(event) = self.decode(&text, &mut subscriptions, attempts) {
                                self.dispatch(event).await;
                            }
                        }
                        Message::Ping(payload) => {
                            let _ = ws.send(Message::Pong(payload)).await;
                        }
                        Message::Close(_) => {
                            return Err(ListenerError::Transport {
                                reason: "server closed the connection".into(),
                            });
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    fn decode(
        &self,
        text: &str,
        subscriptions: &mut HashMap<u64, String>,
        attempts: &mut u32,
    ) -> Option<ChainEvent> {
        let message: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(err) => {
                warn!(target: "sre.listener", %err, "unparseable frame");
                return None;
            }
        };

        // Subscription confirmation: {"id": n, "result": sub_id}.
        if let (Some(id), Some(sub_id)) = (message["id"].as_u64(), message["result"].as_u64()) {
            if let Some(program) = self.config.programs.get((id as usize).saturating_sub(1)) {
                debug!(target: "sre.listener", program = %program, sub_id, "subscription confirmed");
                subscriptions.insert(sub_id, program.clone());
                // A confirmed subscription resets the reconnect budget.
                *attempts = 0;
            }
            return None;
        }

        if message["method"].as_str() != Some("logsNotification") {
            return None;
        }

        let params = &message["params"];
        let sub_id = params["subscription"].as_u64()?;
        let program_id = subscriptions.get(&sub_id).cloned().unwrap_or_default();
        let result = &params["result"];
        let slot = result["context"]["slot"].as_u64().unwrap_or(0);
        let value = &result["value"];
        let signature = value["signature"].as_str().unwrap_or_default();
        let logs: Vec<String> = value["logs"]
            .as_array()
            .map(|lines| {
                lines
                    .iter()
                    .filter_map(|l| l.as_str().map(str::to_owned))
                    .collect()
            })
            .unwrap_or_default();

        self.parser.parse(&program_id, signature, &logs, slot)
    }

    async fn dispatch(&self, event: ChainEvent) {
        for (index, callback) in self.callbacks.iter().enumerate() {
            if let Err(err) = callback(event.clone()).await {
                warn!(
                    target: "sre.listener",
                    callback = index,
                    kind = ?event.kind,
                    %err,
                    "event callback failed"
                );
            }
        }
    }
}

impl std::fmt::Debug for ChainListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainListener")
            .field("programs", &self.config.programs)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}
