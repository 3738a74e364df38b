// SPDX-License-Identifier: MIT OR Apache-2.0
//! The LLM provider contract and the no-credential fallback.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;

/// What a provider returns for one inference call.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderOutput {
    /// Parsed JSON result. Non-JSON response bodies arrive wrapped as
    /// `{"raw_response": <text>}`.
    pub result: Value,
    /// Model that produced the result.
    pub model: String,
    /// Total tokens consumed.
    pub tokens: u64,
}

/// Failures surfaced by AI providers.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The API answered with a non-success status.
    #[error("provider http {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated upstream.
        body: String,
    },

    /// The request never completed.
    #[error("provider transport failure: {reason}")]
    Transport {
        /// Failure detail.
        reason: String,
    },

    /// The response arrived but is not the expected shape.
    #[error("malformed provider response: {reason}")]
    MalformedResponse {
        /// Parse failure detail.
        reason: String,
    },

    /// Every retry attempt failed with a transient error.
    #[error("provider failed after {attempts} attempts: {last}")]
    Exhausted {
        /// Attempts made.
        attempts: u32,
        /// Description of the final failure.
        last: String,
    },
}

impl ProviderError {
    /// Whether the retry loop should try again: 429, 5xx, and transport
    /// failures are transient; other 4xx surface immediately.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            Self::Transport { .. } => true,
            Self::MalformedResponse { .. } | Self::Exhausted { .. } => false,
        }
    }
}

/// An LLM inference backend.
///
/// Connection teardown is `Drop`; providers hold nothing that outlives
/// their client.
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Run one inference and return the parsed result.
    async fn execute(
        &self,
        system_prompt: &str,
        user_input: &Value,
    ) -> Result<ProviderOutput, ProviderError>;

    /// Short provider name for logs.
    fn name(&self) -> &'static str;
}

/// Deterministic canned responses for runs without any API credential.
///
/// Responses are keyed on the system prompt so the common demo skills
/// get plausible shapes.
#[derive(Debug, Clone)]
pub struct SimulatedProvider {
    latency: Duration,
}

impl SimulatedProvider {
    /// Provider with the default simulated latency.
    #[must_use]
    pub fn new() -> Self {
        Self {
            latency: Duration::from_millis(50),
        }
    }

    /// Provider with an explicit latency, zero for tests.
    #[must_use]
    pub fn with_latency(latency: Duration) -> Self {
        Self { latency }
    }

    fn canned_response(system_prompt: &str) -> Value {
        let prompt = system_prompt.to_ascii_lowercase();
        if prompt.contains("code-review") {
            return json!({
                "summary": "Simulated review: no critical issues found.",
                "issues": [{
                    "severity": "info",
                    "description": "This is a simulated review result.",
                    "suggestion": "Configure DEEPSEEK_API_KEY for real analysis.",
                }],
                "score": 85,
            });
        }
        if prompt.contains("sentiment") {
            return json!({
                "sentiment": "positive",
                "confidence": 0.95,
                "analysis": "Simulated analysis: text appears positive.",
            });
        }
        json!({
            "status": "success",
            "message": "Simulated execution successful",
        })
    }
}

impl Default for SimulatedProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AiProvider for SimulatedProvider {
    async fn execute(
        &self,
        system_prompt: &str,
        _user_input: &Value,
    ) -> Result<ProviderOutput, ProviderError> {
        tokio::time::sleep(self.latency).await;
        Ok(ProviderOutput {
            result: Self::canned_response(system_prompt),
            model: "simulated-chat".into(),
            tokens: 42,
        })
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}
