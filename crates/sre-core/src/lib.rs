// SPDX-License-Identifier: MIT OR Apache-2.0
//! Core domain types for the skill runtime environment.
//!
//! Everything the pipelines exchange lives here: ledger-side records
//! ([`Order`], [`SkillPackage`]), the guarded [`InputEnvelope`], typed
//! [`ChainEvent`]s, and the tagged outcome records ([`CommitResult`],
//! [`VerificationResult`], [`ChallengeResult`], [`OrderResult`]) that
//! replace exception-as-control-flow at pipeline boundaries.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod envelope;
mod env;
mod event;
mod order;
mod outcome;
mod skill;

pub use envelope::{EnvelopeError, InputEnvelope, MAX_INPUT_BYTES, MAX_TOP_LEVEL_FIELDS};
pub use env::{DEVNET_RPC_URL, RuntimeEnv};
pub use event::{ChainEvent, EventKind};
pub use order::{Order, OrderStatus};
pub use outcome::{
    ChallengeResult, ChallengeStatus, CommitResult, CommitStatus, OrderOutcome, OrderResult,
    VerificationResult,
};
pub use skill::{ExecutionMode, SkillIo, SkillPackage, SkillRuntime};

/// On-chain address of the escrow program whose logs the listener watches.
pub const ESCROW_PROGRAM_ID: &str = "CdamAXn5fCros3MktPxmbQKXtxd34XHATTLmh9jkn7DT";

/// On-chain address of the transfer-hook program.
pub const TRANSFER_HOOK_PROGRAM_ID: &str = "7hKqvXJz3mWyBdNcR4tFgA2sL9nPeUuD5EbZjQxHwS6M";

/// The system program, referenced by challenge instructions.
pub const SYSTEM_PROGRAM_ID: &str = "11111111111111111111111111111111";
