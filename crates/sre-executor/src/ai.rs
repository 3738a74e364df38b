// SPDX-License-Identifier: MIT OR Apache-2.0
//! AI-delegated skill execution.

use crate::chat::OpenAiCompatibleProvider;
use crate::provider::{AiProvider, ProviderError, SimulatedProvider};
use serde_json::Value;
use sre_core::{InputEnvelope, RuntimeEnv, SkillPackage};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Outcome of one AI-mode skill run.
#[derive(Debug, Clone, PartialEq)]
pub struct AiRunOutput {
    /// Parsed result the provider produced.
    pub output: Value,
    /// Model identifier.
    pub model_used: String,
    /// Tokens consumed.
    pub tokens_used: u64,
    /// Wall-clock inference time.
    pub execution_time_ms: u64,
}

/// Runs AI-mode skills against a configured provider.
#[derive(Clone)]
pub struct AiExecutor {
    provider: Arc<dyn AiProvider>,
}

impl AiExecutor {
    /// Executor over an explicit provider.
    pub fn new(provider: Arc<dyn AiProvider>) -> Self {
        Self { provider }
    }

    /// Executor over the deterministic simulated provider.
    #[must_use]
    pub fn simulated() -> Self {
        Self::new(Arc::new(SimulatedProvider::new()))
    }

    /// Select a provider from the environment: DeepSeek first, then
    /// OpenAI, then the simulated fallback.
    #[must_use]
    pub fn from_env(env: &RuntimeEnv) -> Self {
        if let Some(key) = &env.deepseek_api_key {
            info!(target: "sre.executor", "using deepseek provider");
            return Self::new(Arc::new(OpenAiCompatibleProvider::deepseek(key.clone())));
        }
        if let Some(key) = &env.openai_api_key {
            info!(target: "sre.executor", "using openai provider");
            return Self::new(Arc::new(OpenAiCompatibleProvider::openai(key.clone())));
        }
        warn!(target: "sre.executor", "no AI credential configured, using simulated provider");
        Self::simulated()
    }

    /// Name of the selected provider.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Execute a skill by prompting the provider with the skill manifest
    /// and the input envelope.
    ///
    /// # Errors
    ///
    /// Propagates [`ProviderError`]; the committer collapses these into a
    /// failed commit record.
    pub async fn execute_skill(
        &self,
        skill: &SkillPackage,
        input: &InputEnvelope,
    ) -> Result<AiRunOutput, ProviderError> {
        let start = Instant::now();
        let system_prompt = build_system_prompt(skill);
        let output = self.provider.execute(&system_prompt, input.as_value()).await?;
        Ok(AiRunOutput {
            output: output.result,
            model_used: output.model,
            tokens_used: output.tokens,
            execution_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}

impl std::fmt::Debug for AiExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiExecutor")
            .field("provider", &self.provider.name())
            .finish()
    }
}

/// Assemble the system prompt from the skill manifest: name, description,
/// declared output schema and any worked examples.
fn build_system_prompt(skill: &SkillPackage) -> String {
    let schema = skill
        .io
        .output_schema
        .as_ref()
        .map(|s| serde_json::to_string_pretty(s).unwrap_or_else(|_| s.to_string()))
        .unwrap_or_else(|| "Return a JSON object with appropriate fields.".into());

    let mut prompt = format!(
        "You are an agent executing the skill: {}\n\nDescription: {}\n\n\
         You must return a valid JSON response matching this schema:\n{}",
        skill.name,
        skill.description.as_deref().unwrap_or(""),
        schema,
    );

    if !skill.examples.is_empty() {
        if let Ok(examples) = serde_json::to_string_pretty(&skill.examples) {
            prompt.push_str("\n\nExamples:\n");
            prompt.push_str(&examples);
        }
    }

    prompt.push_str(
        "\n\nIMPORTANT RULES:\n\
         1. Respond ONLY with valid JSON. No markdown, no explanations, no code blocks.\n\
         2. Follow the output schema exactly if provided.\n\
         3. Be accurate and concise.",
    );
    prompt
}
