// SPDX-License-Identifier: MIT OR Apache-2.0
//! The adversarial half of the optimistic contract: replay committed
//! orders, compare digests byte-for-byte, and challenge mismatches.
//!
//! Verification *errors* (unreachable ledger, sandbox crash) are strictly
//! distinct from digest *mismatches*; only a mismatch ever produces a
//! challenge transaction. Every challenge outcome lands in the
//! process-wide [`ChallengeLog`] under single-writer discipline.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod challenger;
mod ledger;
mod verify;

pub use challenger::{
    ChallengeAccounts, ChallengeInstruction, ChallengeLog, ChallengeStats, Challenger,
    DemoSubmitter, SubmitError, TransactionSubmitter,
};
pub use ledger::{LedgerClient, LedgerError, MockLedger, SkillRecord, UnreachableLedger};
pub use verify::Verifier;
