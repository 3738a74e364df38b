// SPDX-License-Identifier: MIT OR Apache-2.0
//! Seeded mock order and skill records.
//!
//! Fixture substrate for offline watcher runs and the dashboard demo:
//! same seed, same records, every time.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use chrono::{Duration as ChronoDuration, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use uuid::Uuid;

/// A generated order record, shaped like a terminal `OrderResult`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockOrder {
    /// Order identifier.
    pub order_id: String,
    /// Skill the order purchased.
    pub skill_id: String,
    /// Terminal status: `completed`, `failed` or `timeout`.
    pub status: String,
    /// Execution duration consistent with the status.
    pub execution_time_ms: u64,
    /// Creation time within the last 24 hours, ISO-8601.
    pub created_at: String,
    /// 64-hex-char result digest.
    pub result_hash: String,
    /// Executing agent.
    pub agent_id: String,
}

/// A generated skill record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockSkill {
    /// Skill identifier.
    pub skill_id: String,
    /// Skill name.
    pub name: String,
    /// Semantic version.
    pub version: String,
    /// Marketplace category.
    pub category: String,
    /// Per-invocation price.
    pub price_lamports: u64,
    /// Lifetime execution count.
    pub execution_count: u64,
    /// Success rate in `[0, 1]`.
    pub success_rate: f64,
}

/// Fixture write failure.
#[derive(Debug, thiserror::Error)]
#[error("failed to write fixtures: {reason}")]
pub struct FixtureError {
    /// Failure detail.
    pub reason: String,
}

const SKILL_TEMPLATES: [(&str, &str, u64); 8] = [
    ("text-summarizer", "nlp", 1000),
    ("image-classifier", "vision", 2000),
    ("sentiment-analyzer", "nlp", 800),
    ("code-reviewer", "dev-tools", 3000),
    ("translation-engine", "nlp", 1500),
    ("data-validator", "data", 500),
    ("report-generator", "business", 2500),
    ("anomaly-detector", "analytics", 4000),
];

const AGENT_TEMPLATES: [&str; 5] = [
    "agent-alpha-001",
    "agent-beta-002",
    "agent-gamma-003",
    "agent-delta-004",
    "agent-epsilon-005",
];

// Weighted status distribution: mostly completed, some failed, few
// timeouts.
const STATUS_WEIGHTS: [(&str, f64); 3] =
    [("completed", 0.85), ("failed", 0.10), ("timeout", 0.05)];

fn weighted_status(rng: &mut StdRng) -> &'static str {
    let roll: f64 = rng.r#gen();
    let mut cumulative = 0.0;
    for (status, weight) in STATUS_WEIGHTS {
        cumulative += weight;
        if roll < cumulative {
            return status;
        }
    }
    STATUS_WEIGHTS[0].0
}

fn result_hash(seed_data: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(seed_data.as_bytes());
    sre_digest::to_hex(&hasher.finalize())
}

/// Generate `count` order records; a seed makes the output reproducible,
/// including timestamps (seeded runs anchor to a fixed base time).
#[must_use]
pub fn generate_orders(count: usize, seed: Option<u64>) -> Vec<MockOrder> {
    let mut rng = rng_from(seed);
    let base_time = match seed {
        Some(_) => chrono::DateTime::from_timestamp(1_735_689_600, 0).expect("valid epoch"),
        None => Utc::now(),
    };
    let mut orders = Vec::with_capacity(count);

    for index in 0..count {
        let (skill_name, _, _) = SKILL_TEMPLATES
            .choose(&mut rng)
            .expect("templates non-empty");
        let agent_id = AGENT_TEMPLATES.choose(&mut rng).expect("templates non-empty");

        let order_id = format!("order-{}", Uuid::from_u128(rng.r#gen()));
        let skill_id = format!("skill-{skill_name}-v1");
        let status = weighted_status(&mut rng);

        let execution_time_ms = match status {
            "completed" => rng.gen_range(50..=500),
            "failed" => rng.gen_range(10..=100),
            _ => rng.gen_range(30_000..=60_000),
        };

        let offset_minutes = rng.gen_range(0..=1440);
        let created_at = (base_time - ChronoDuration::minutes(offset_minutes))
            .format("%Y-%m-%dT%H:%M:%SZ")
            .to_string();

        let hash_seed = format!("{order_id}-{skill_id}-{index}");
        orders.push(MockOrder {
            order_id,
            skill_id,
            status: status.to_string(),
            execution_time_ms,
            created_at,
            result_hash: result_hash(&hash_seed),
            agent_id: (*agent_id).to_string(),
        });
    }
    orders
}

/// Generate `count` skill records; templates repeat once exhausted.
#[must_use]
pub fn generate_skills(count: usize, seed: Option<u64>) -> Vec<MockSkill> {
    let mut rng = rng_from(seed);
    let mut templates: Vec<(&str, &str, u64)> = SKILL_TEMPLATES.to_vec();
    templates.shuffle(&mut rng);

    (0..count)
        .map(|index| {
            let (name, category, base_price) = templates[index % templates.len()];
            let minor = rng.gen_range(0..=9);
            let patch = rng.gen_range(0..=20);
            MockSkill {
                skill_id: format!("skill-{name}-v1"),
                name: name.to_string(),
                version: format!("1.{minor}.{patch}"),
                category: category.to_string(),
                price_lamports: base_price + rng.gen_range(0..=500),
                execution_count: rng.gen_range(0..=10_000),
                success_rate: f64::from(rng.gen_range(80..=100u32)) / 100.0,
            }
        })
        .collect()
}

/// Write `orders.json` and `skills.json` under `dir`.
///
/// # Errors
///
/// Returns [`FixtureError`] when serialization or the write fails.
pub fn write_fixtures(
    dir: &Path,
    orders: &[MockOrder],
    skills: &[MockSkill],
) -> Result<(), FixtureError> {
    std::fs::create_dir_all(dir).map_err(|e| FixtureError {
        reason: format!("create {}: {e}", dir.display()),
    })?;
    write_json(&dir.join("orders.json"), orders)?;
    write_json(&dir.join("skills.json"), skills)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), FixtureError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| FixtureError {
        reason: e.to_string(),
    })?;
    std::fs::write(path, json).map_err(|e| FixtureError {
        reason: format!("write {}: {e}", path.display()),
    })
}

fn rng_from(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}
