// SPDX-License-Identifier: MIT OR Apache-2.0
//! OpenAI-compatible chat-completions providers.

use crate::provider::{AiProvider, ProviderError, ProviderOutput};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};

const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com/v1";
const DEEPSEEK_MODEL: &str = "deepseek-chat";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OPENAI_MODEL: &str = "gpt-4o-mini";

const MAX_ATTEMPTS: u32 = 3;
const BASE_BACKOFF: Duration = Duration::from_secs(1);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// A provider speaking the OpenAI chat-completions wire format.
///
/// Covers DeepSeek, OpenAI, and anything else exposing the same API;
/// only the base URL, model and credential differ.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    name: &'static str,
}

impl OpenAiCompatibleProvider {
    /// Provider against the DeepSeek endpoint.
    #[must_use]
    pub fn deepseek(api_key: impl Into<String>) -> Self {
        Self::custom(api_key, DEEPSEEK_BASE_URL, DEEPSEEK_MODEL, "deepseek")
    }

    /// Provider against the OpenAI endpoint.
    #[must_use]
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::custom(api_key, OPENAI_BASE_URL, OPENAI_MODEL, "openai")
    }

    /// Provider against an arbitrary compatible endpoint.
    pub fn custom(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        name: &'static str,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            api_key: api_key.into(),
            name,
        }
    }

    /// Model identifier sent with every request.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    async fn request_once(
        &self,
        system_prompt: &str,
        user_input: &Value,
    ) -> Result<ProviderOutput, ProviderError> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_input.to_string()},
            ],
            "max_tokens": 4096,
            "temperature": 0.7,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Http {
                status: status.as_u16(),
                body: body.chars().take(512).collect(),
            });
        }

        let payload: Value = response.json().await.map_err(|e| {
            ProviderError::MalformedResponse {
                reason: e.to_string(),
            }
        })?;

        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| ProviderError::MalformedResponse {
                reason: "missing choices[0].message.content".into(),
            })?;
        let tokens = payload["usage"]["total_tokens"].as_u64().unwrap_or(0);

        Ok(ProviderOutput {
            result: parse_model_output(content),
            model: self.model.clone(),
            tokens,
        })
    }
}

/// Strip markdown fences, then parse; anything unparseable is wrapped as
/// `{"raw_response": <text>}` rather than rejected.
fn parse_model_output(content: &str) -> Value {
    let cleaned = content
        .replace("```json", "")
        .replace("```", "")
        .trim()
        .to_string();
    serde_json::from_str(&cleaned).unwrap_or_else(|_| json!({"raw_response": content}))
}

#[async_trait]
impl AiProvider for OpenAiCompatibleProvider {
    async fn execute(
        &self,
        system_prompt: &str,
        user_input: &Value,
    ) -> Result<ProviderOutput, ProviderError> {
        let mut last_error: Option<ProviderError> = None;
        for attempt in 0..MAX_ATTEMPTS {
            match self.request_once(system_prompt, user_input).await {
                Ok(output) => {
                    debug!(
                        target: "sre.executor",
                        provider = self.name,
                        model = %self.model,
                        tokens = output.tokens,
                        "inference completed"
                    );
                    return Ok(output);
                }
                Err(err) if err.is_transient() && attempt + 1 < MAX_ATTEMPTS => {
                    let delay = BASE_BACKOFF * 2u32.pow(attempt);
                    warn!(
                        target: "sre.executor",
                        provider = self.name,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        %err,
                        "transient provider error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(err);
                }
                Err(err) => return Err(err),
            }
        }
        Err(ProviderError::Exhausted {
            attempts: MAX_ATTEMPTS,
            last: last_error.map(|e| e.to_string()).unwrap_or_default(),
        })
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_json_is_unwrapped() {
        let v = parse_model_output("```json\n{\"a\": 1}\n```");
        assert_eq!(v, json!({"a": 1}));
    }

    #[test]
    fn plain_json_passes_through() {
        assert_eq!(parse_model_output("{\"ok\":true}"), json!({"ok": true}));
    }

    #[test]
    fn prose_is_wrapped_as_raw_response() {
        let v = parse_model_output("I could not produce JSON.");
        assert_eq!(v["raw_response"], "I could not produce JSON.");
    }
}
