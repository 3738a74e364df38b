// SPDX-License-Identifier: MIT OR Apache-2.0
//! Read access to ledger state, behind a trait so the watcher can run
//! offline against seeded fixtures.

use async_trait::async_trait;
use serde_json::json;
use sre_core::{InputEnvelope, Order, OrderStatus, SkillPackage};
use std::collections::HashMap;
use std::sync::Mutex;

/// A ledger read failure.
#[derive(Debug, Clone, thiserror::Error)]
#[error("ledger read failed: {reason}")]
pub struct LedgerError {
    /// Failure detail.
    pub reason: String,
}

impl LedgerError {
    /// Wrap a failure description.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// The on-chain skill record that points at a content-addressed package.
#[derive(Debug, Clone, PartialEq)]
pub struct SkillRecord {
    /// Ledger address of the skill.
    pub address: String,
    /// Content hash resolving the immutable package.
    pub content_hash: String,
    /// Per-invocation price.
    pub price_lamports: u64,
}

/// Everything the verifier needs to read from the ledger and storage.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Fetch an order record by address.
    async fn fetch_order(&self, order_id: &str) -> Result<Order, LedgerError>;

    /// Fetch the skill record an order references.
    async fn fetch_skill(&self, skill_address: &str) -> Result<SkillRecord, LedgerError>;

    /// Resolve a skill package by content hash.
    async fn fetch_skill_package(&self, content_hash: &str)
    -> Result<SkillPackage, LedgerError>;

    /// Fetch the original input envelope for an order.
    async fn fetch_order_input(&self, order_id: &str) -> Result<InputEnvelope, LedgerError>;
}

/// Fixture-backed ledger for offline watcher runs and tests.
///
/// Unseeded lookups fall back to a committed order with an all-zero
/// digest and a minimal sandbox package, so a watcher pointed at seed
/// order ids exercises the full verify-and-challenge path without a
/// ledger connection.
#[derive(Debug, Default)]
pub struct MockLedger {
    orders: Mutex<HashMap<String, Order>>,
    packages: Mutex<HashMap<String, SkillPackage>>,
    inputs: Mutex<HashMap<String, InputEnvelope>>,
}

impl MockLedger {
    /// An empty fixture ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an order record.
    #[must_use]
    pub fn with_order(self, order: Order) -> Self {
        self.orders
            .lock()
            .expect("mock ledger poisoned")
            .insert(order.address.clone(), order);
        self
    }

    /// Seed the package resolved for `content_hash`.
    #[must_use]
    pub fn with_package(self, content_hash: impl Into<String>, package: SkillPackage) -> Self {
        self.packages
            .lock()
            .expect("mock ledger poisoned")
            .insert(content_hash.into(), package);
        self
    }

    /// Seed the input envelope for `order_id`.
    #[must_use]
    pub fn with_input(self, order_id: impl Into<String>, input: InputEnvelope) -> Self {
        self.inputs
            .lock()
            .expect("mock ledger poisoned")
            .insert(order_id.into(), input);
        self
    }

    fn default_order(order_id: &str) -> Order {
        Order {
            address: order_id.to_string(),
            client: "mock-client".into(),
            executor: "mock-executor".into(),
            skill: "mock-skill-address".into(),
            result_digest: Some([0u8; 32]),
            status: OrderStatus::Committed,
            dispute_deadline: None,
        }
    }

    fn default_package() -> SkillPackage {
        let mut package =
            SkillPackage::sandbox("mock-skill", "sre-python:3.11", "scripts/main.py");
        package.runtime.as_mut().expect("sandbox package").timeout_seconds = Some(60);
        package
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn fetch_order(&self, order_id: &str) -> Result<Order, LedgerError> {
        Ok(self
            .orders
            .lock()
            .expect("mock ledger poisoned")
            .get(order_id)
            .cloned()
            .unwrap_or_else(|| Self::default_order(order_id)))
    }

    async fn fetch_skill(&self, skill_address: &str) -> Result<SkillRecord, LedgerError> {
        Ok(SkillRecord {
            address: skill_address.to_string(),
            content_hash: format!("content-{skill_address}"),
            price_lamports: 1_000_000,
        })
    }

    async fn fetch_skill_package(
        &self,
        content_hash: &str,
    ) -> Result<SkillPackage, LedgerError> {
        Ok(self
            .packages
            .lock()
            .expect("mock ledger poisoned")
            .get(content_hash)
            .cloned()
            .unwrap_or_else(Self::default_package))
    }

    async fn fetch_order_input(&self, order_id: &str) -> Result<InputEnvelope, LedgerError> {
        if let Some(input) = self
            .inputs
            .lock()
            .expect("mock ledger poisoned")
            .get(order_id)
        {
            return Ok(input.clone());
        }
        InputEnvelope::new(json!({"input_data": "mock_input"}))
            .map_err(|e| LedgerError::new(e.to_string()))
    }
}

/// A ledger whose every read fails, for process-error tests.
#[derive(Debug, Default)]
pub struct UnreachableLedger;

#[async_trait]
impl LedgerClient for UnreachableLedger {
    async fn fetch_order(&self, order_id: &str) -> Result<Order, LedgerError> {
        Err(LedgerError::new(format!("order {order_id} unreachable")))
    }

    async fn fetch_skill(&self, skill_address: &str) -> Result<SkillRecord, LedgerError> {
        Err(LedgerError::new(format!("skill {skill_address} unreachable")))
    }

    async fn fetch_skill_package(
        &self,
        content_hash: &str,
    ) -> Result<SkillPackage, LedgerError> {
        Err(LedgerError::new(format!("package {content_hash} unreachable")))
    }

    async fn fetch_order_input(&self, order_id: &str) -> Result<InputEnvelope, LedgerError> {
        Err(LedgerError::new(format!("input for {order_id} unreachable")))
    }
}
