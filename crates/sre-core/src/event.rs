// SPDX-License-Identifier: MIT OR Apache-2.0
//! Typed events decoded from program logs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Event taxonomy recognized by the log parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A new skill manifest was registered.
    SkillRegistered,
    /// An existing skill was updated.
    SkillUpdated,
    /// A skill was deprecated.
    SkillDeprecated,
    /// An agent identity was created.
    AgentCreated,
    /// An agent profile was updated.
    AgentUpdated,
    /// An agent identity was closed.
    AgentClosed,
    /// An escrow order was created.
    EscrowCreated,
    /// An escrow order was funded.
    EscrowFunded,
    /// Escrow funds were released to the executor.
    EscrowReleased,
    /// An escrow order was cancelled.
    EscrowCancelled,
    /// An escrow order was disputed.
    EscrowDisputed,
    /// The transfer hook was initialized.
    TransferHookInitialized,
    /// The transfer hook configuration changed.
    TransferHookConfigUpdated,
    /// A hooked transfer executed.
    TransferHooked,
    /// Recognized program, unrecognized log content.
    Unknown,
}

impl EventKind {
    /// Keyword the parser looks for in `Program log:` lines, when one exists.
    #[must_use]
    pub fn log_keyword(&self) -> Option<&'static str> {
        match self {
            Self::SkillRegistered => Some("SkillRegistered"),
            Self::SkillUpdated => Some("SkillUpdated"),
            Self::SkillDeprecated => Some("SkillDeprecated"),
            Self::AgentCreated => Some("AgentCreated"),
            Self::AgentUpdated => Some("AgentUpdated"),
            Self::AgentClosed => Some("AgentClosed"),
            Self::EscrowCreated => Some("EscrowCreated"),
            Self::EscrowFunded => Some("EscrowFunded"),
            Self::EscrowReleased => Some("EscrowReleased"),
            Self::EscrowCancelled => Some("EscrowCancelled"),
            Self::EscrowDisputed => Some("EscrowDisputed"),
            Self::TransferHookInitialized => Some("TransferHookInitialized"),
            Self::TransferHookConfigUpdated => Some("TransferHookConfigUpdated"),
            Self::TransferHooked => Some("TransferHooked"),
            Self::Unknown => None,
        }
    }

    /// Broad family tag, useful for filtering subscriptions.
    #[must_use]
    pub fn family(&self) -> &'static str {
        match self {
            Self::SkillRegistered | Self::SkillUpdated | Self::SkillDeprecated => "skill",
            Self::AgentCreated | Self::AgentUpdated | Self::AgentClosed => "agent",
            Self::EscrowCreated
            | Self::EscrowFunded
            | Self::EscrowReleased
            | Self::EscrowCancelled
            | Self::EscrowDisputed => "escrow",
            Self::TransferHookInitialized | Self::TransferHookConfigUpdated | Self::TransferHooked => {
                "transfer_hook"
            }
            Self::Unknown => "unknown",
        }
    }
}

/// A typed record synthesized from one log notification.
///
/// Immutable after emission; the listener fans out clones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainEvent {
    /// Classified event kind.
    pub kind: EventKind,
    /// Transaction signature the logs belong to.
    pub signature: String,
    /// Slot the notification was observed at.
    pub slot: u64,
    /// Wall-clock time the event was synthesized.
    pub timestamp: DateTime<Utc>,
    /// Program that emitted the logs.
    pub program_id: String,
    /// Decoded data extracted from the logs.
    pub data: BTreeMap<String, Value>,
    /// Raw log lines, kept verbatim.
    pub raw_logs: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_but_unknown_has_a_keyword() {
        let kinds = [
            EventKind::SkillRegistered,
            EventKind::SkillUpdated,
            EventKind::SkillDeprecated,
            EventKind::AgentCreated,
            EventKind::AgentUpdated,
            EventKind::AgentClosed,
            EventKind::EscrowCreated,
            EventKind::EscrowFunded,
            EventKind::EscrowReleased,
            EventKind::EscrowCancelled,
            EventKind::EscrowDisputed,
            EventKind::TransferHookInitialized,
            EventKind::TransferHookConfigUpdated,
            EventKind::TransferHooked,
        ];
        for kind in kinds {
            assert!(kind.log_keyword().is_some(), "{kind:?} missing keyword");
        }
        assert!(EventKind::Unknown.log_keyword().is_none());
    }

    #[test]
    fn families_cover_the_taxonomy() {
        assert_eq!(EventKind::EscrowFunded.family(), "escrow");
        assert_eq!(EventKind::SkillUpdated.family(), "skill");
        assert_eq!(EventKind::AgentClosed.family(), "agent");
        assert_eq!(EventKind::TransferHooked.family(), "transfer_hook");
        assert_eq!(EventKind::Unknown.family(), "unknown");
    }
}
