// SPDX-License-Identifier: MIT OR Apache-2.0
//! Classifies raw log batches into typed chain events.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use serde_json::{Number, Value};
use sre_core::{ChainEvent, EventKind};
use std::collections::BTreeMap;

/// All classifiable kinds, in match priority order.
const KEYWORD_TABLE: [EventKind; 14] = [
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

/// Tokens whose trailing numeric value is lifted into the event data.
const NUMERIC_TOKENS: [&str; 2] = ["fee_bps:", "amount:"];

/// Walks log lines left to right and synthesizes a [`ChainEvent`].
#[derive(Debug, Clone)]
pub struct LogParser {
    watched: Vec<String>,
}

impl LogParser {
    /// Parser that treats the given program ids as watched.
    pub fn new(watched: impl IntoIterator<Item = String>) -> Self {
        Self {
            watched: watched.into_iter().collect(),
        }
    }

    /// Classify one `(signature, logs, slot)` batch.
    ///
    /// Returns `None` for a batch from an unwatched program with no
    /// recognized keyword; batches from watched programs always produce
    /// an event, falling back to [`EventKind::Unknown`].
    #[must_use]
    pub fn parse(
        &self,
        program_id: &str,
        signature: &str,
        logs: &[String],
        slot: u64,
    ) -> Option<ChainEvent> {
        let mut kind: Option<EventKind> = None;
        let mut data: BTreeMap<String, Value> = BTreeMap::new();

        for line in logs {
            if kind.is_none() {
                if let Some(message) = line.strip_prefix("Program log: ") {
                    kind = KEYWORD_TABLE
                        .iter()
                        .copied()
                        .find(|k| k.log_keyword().is_some_and(|kw| message.contains(kw)));
                }
            }
            if let Some(encoded) = line.strip_prefix("Program data: ") {
                if let Ok(bytes) = BASE64.decode(encoded.trim()) {
                    data.insert("raw_data".into(), Value::String(to_hex(&bytes)));
                }
            }
            for token in NUMERIC_TOKENS {
                if let Some(value) = extract_number_after(line, token) {
                    let key = token.trim_end_matches(':');
                    data.insert(key.into(), Value::Number(Number::from(value)));
                }
            }
        }

        let watched = self.watched.iter().any(|p| p == program_id);
        let kind = match (kind, watched) {
            (Some(kind), _) => kind,
            (None, true) => EventKind::Unknown,
            (None, false) => return None,
        };

        Some(ChainEvent {
            kind,
            signature: signature.to_string(),
            slot,
            timestamp: Utc::now(),
            program_id: program_id.to_string(),
            data,
            raw_logs: logs.to_vec(),
        })
    }
}

fn extract_number_after(line: &str, token: &str) -> Option<u64> {
    let start = line.find(token)? + token.len();
    let rest = line[start..].trim_start();
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sre_core::ESCROW_PROGRAM_ID;

    fn parser() -> LogParser {
        LogParser::new([ESCROW_PROGRAM_ID.to_string()])
    }

    fn logs(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn classifies_escrow_funded() {
        let event = parser()
            .parse(
                ESCROW_PROGRAM_ID,
                "sig-1",
                &logs(&[
                    "Program log: Instruction: FundEscrow",
                    "Program log: EscrowFunded order=abc amount: 5000",
                ]),
                42,
            )
            .unwrap();
        assert_eq!(event.kind, EventKind::EscrowFunded);
        assert_eq!(event.slot, 42);
        assert_eq!(event.data["amount"], Value::Number(5000u64.into()));
    }

    #[test]
    fn first_keyword_wins_walking_left_to_right() {
        let event = parser()
            .parse(
                ESCROW_PROGRAM_ID,
                "sig-2",
                &logs(&[
                    "Program log: SkillRegistered name=code-review",
                    "Program log: EscrowCreated",
                ]),
                1,
            )
            .unwrap();
        assert_eq!(event.kind, EventKind::SkillRegistered);
    }

    #[test]
    fn program_data_is_decoded_to_hex() {
        let encoded = BASE64.encode([0xde, 0xad, 0xbe, 0xef]);
        let event = parser()
            .parse(
                ESCROW_PROGRAM_ID,
                "sig-3",
                &logs(&[
                    "Program log: EscrowCreated",
                    &format!("Program data: {encoded}"),
                ]),
                1,
            )
            .unwrap();
        assert_eq!(event.data["raw_data"], Value::String("deadbeef".into()));
    }

    #[test]
    fn fee_bps_extraction() {
        let event = parser()
            .parse(
                ESCROW_PROGRAM_ID,
                "sig-4",
                &logs(&["Program log: TransferHookConfigUpdated fee_bps: 250"]),
                1,
            )
            .unwrap();
        assert_eq!(event.kind, EventKind::TransferHookConfigUpdated);
        assert_eq!(event.data["fee_bps"], Value::Number(250u64.into()));
    }

    #[test]
    fn watched_program_with_no_keyword_is_unknown() {
        let event = parser()
            .parse(
                ESCROW_PROGRAM_ID,
                "sig-5",
                &logs(&["Program log: Instruction: Initialize"]),
                1,
            )
            .unwrap();
        assert_eq!(event.kind, EventKind::Unknown);
    }

    #[test]
    fn unwatched_program_with_no_keyword_is_dropped() {
        assert!(
            parser()
                .parse(
                    "SomeOtherProgram1111111111111111111111111111",
                    "sig-6",
                    &logs(&["Program log: hello"]),
                    1,
                )
                .is_none()
        );
    }

    #[test]
    fn unwatched_program_with_keyword_still_classifies() {
        let event = parser()
            .parse(
                "SomeOtherProgram1111111111111111111111111111",
                "sig-7",
                &logs(&["Program log: EscrowDisputed"]),
                1,
            )
            .unwrap();
        assert_eq!(event.kind, EventKind::EscrowDisputed);
    }

    #[test]
    fn raw_logs_are_preserved_verbatim() {
        let lines = logs(&["Program log: EscrowCreated", "Program consumed 1234 units"]);
        let event = parser()
            .parse(ESCROW_PROGRAM_ID, "sig-8", &lines, 9)
            .unwrap();
        assert_eq!(event.raw_logs, lines);
        assert_eq!(event.signature, "sig-8");
    }
}
