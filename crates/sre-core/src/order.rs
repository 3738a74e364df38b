// SPDX-License-Identifier: MIT OR Apache-2.0
//! Ledger-side order records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of an order as recorded on the ledger.
///
/// The runtime never mutates an order directly; state transitions happen
/// on-chain and are observed through the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Posted on the ledger, not yet funded.
    Created,
    /// Escrow funded by the client; executable.
    Funded,
    /// Executor has posted a result digest.
    Committed,
    /// A challenge was submitted during the dispute window.
    Challenged,
    /// Dispute window elapsed; escrow released to the executor.
    Released,
    /// Cancelled before completion.
    Cancelled,
}

/// A single unit of work escrowed on the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Ledger address identifying the order.
    pub address: String,
    /// Client that posted and funded the order.
    pub client: String,
    /// Executor expected to commit a result.
    pub executor: String,
    /// Reference to the skill being purchased.
    pub skill: String,
    /// Committed result digest; `None` until the executor commits.
    pub result_digest: Option<[u8; 32]>,
    /// Current lifecycle state.
    pub status: OrderStatus,
    /// End of the dispute window, when known.
    pub dispute_deadline: Option<DateTime<Utc>>,
}

impl Order {
    /// Returns `true` once a result digest has been committed.
    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.result_digest.is_some() && self.status == OrderStatus::Committed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(status: OrderStatus, digest: Option<[u8; 32]>) -> Order {
        Order {
            address: "order-1".into(),
            client: "client-1".into(),
            executor: "executor-1".into(),
            skill: "skill-1".into(),
            result_digest: digest,
            status,
            dispute_deadline: None,
        }
    }

    #[test]
    fn committed_requires_digest_and_status() {
        assert!(order(OrderStatus::Committed, Some([0u8; 32])).is_committed());
        assert!(!order(OrderStatus::Committed, None).is_committed());
        assert!(!order(OrderStatus::Funded, Some([0u8; 32])).is_committed());
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&OrderStatus::Challenged).unwrap();
        assert_eq!(json, "\"challenged\"");
    }

    #[test]
    fn order_roundtrips_through_json() {
        let o = order(OrderStatus::Committed, Some([7u8; 32]));
        let json = serde_json::to_string(&o).unwrap();
        let back: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(back, o);
    }
}
