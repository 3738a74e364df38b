// SPDX-License-Identifier: MIT OR Apache-2.0
//! Skill package manifests.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a skill is executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Deterministic containerized execution; replayable byte-for-byte.
    #[default]
    Sandbox,
    /// Delegated to an LLM provider; accepted by digest, not replayable.
    Ai,
}

/// Container runtime descriptor for sandbox-mode skills.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillRuntime {
    /// Container image reference.
    pub docker_image: String,
    /// Entrypoint script executed inside the container.
    pub entrypoint: String,
    /// Per-skill wall-clock ceiling in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

/// Declared input/output JSON schemas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillIo {
    /// Schema the input envelope must satisfy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
    /// Schema the skill result is expected to satisfy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
}

/// Immutable, content-addressed manifest describing how to execute a skill.
///
/// Resolved by content digest; once resolved it does not change for the
/// lifetime of the order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillPackage {
    /// Skill name, e.g. `code-review`.
    pub name: String,
    /// Semantic version.
    pub version: String,
    /// Marketplace category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Human-readable description, used in AI system prompts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Execution mode selector.
    #[serde(default)]
    pub execution_mode: ExecutionMode,
    /// Declared input/output schemas.
    #[serde(default)]
    pub io: SkillIo,
    /// Worked examples, surfaced to AI providers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<Value>,
    /// Container runtime; required for sandbox mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<SkillRuntime>,
}

impl SkillPackage {
    /// Minimal sandbox-mode package for the given image and entrypoint.
    pub fn sandbox(
        name: impl Into<String>,
        docker_image: impl Into<String>,
        entrypoint: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: "0.1.0".into(),
            category: None,
            description: None,
            execution_mode: ExecutionMode::Sandbox,
            io: SkillIo::default(),
            examples: Vec::new(),
            runtime: Some(SkillRuntime {
                docker_image: docker_image.into(),
                entrypoint: entrypoint.into(),
                timeout_seconds: None,
            }),
        }
    }

    /// Minimal AI-mode package with the given description.
    pub fn ai(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: "0.1.0".into(),
            category: None,
            description: Some(description.into()),
            execution_mode: ExecutionMode::Ai,
            io: SkillIo::default(),
            examples: Vec::new(),
            runtime: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sandbox_constructor_sets_runtime() {
        let pkg = SkillPackage::sandbox("code-review", "sre-python:3.11", "scripts/main.py");
        assert_eq!(pkg.execution_mode, ExecutionMode::Sandbox);
        let rt = pkg.runtime.unwrap();
        assert_eq!(rt.docker_image, "sre-python:3.11");
        assert_eq!(rt.entrypoint, "scripts/main.py");
    }

    #[test]
    fn ai_constructor_has_no_runtime() {
        let pkg = SkillPackage::ai("sentiment", "classify sentiment");
        assert_eq!(pkg.execution_mode, ExecutionMode::Ai);
        assert!(pkg.runtime.is_none());
    }

    #[test]
    fn deserializes_with_defaults() {
        let pkg: SkillPackage =
            serde_json::from_value(json!({"name": "x", "version": "1.0.0"})).unwrap();
        assert_eq!(pkg.execution_mode, ExecutionMode::Sandbox);
        assert!(pkg.io.output_schema.is_none());
        assert!(pkg.examples.is_empty());
    }
}
