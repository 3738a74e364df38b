// SPDX-License-Identifier: MIT OR Apache-2.0
//! The guarded JSON envelope passed to skills.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Maximum serialized envelope size in bytes.
pub const MAX_INPUT_BYTES: usize = 100_000;

/// Maximum number of top-level fields in an envelope.
pub const MAX_TOP_LEVEL_FIELDS: usize = 20;

/// Invariant violations raised before any execution side effect.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvelopeError {
    /// The envelope must be a JSON object.
    #[error("input envelope must be a JSON object")]
    NotAnObject,

    /// Serialized size exceeds [`MAX_INPUT_BYTES`].
    #[error("input too large ({size} bytes, max {MAX_INPUT_BYTES})")]
    InputTooLarge {
        /// Observed serialized size.
        size: usize,
    },

    /// Top-level field count exceeds [`MAX_TOP_LEVEL_FIELDS`].
    #[error("too many input fields ({count}, max {MAX_TOP_LEVEL_FIELDS})")]
    TooManyFields {
        /// Observed field count.
        count: usize,
    },
}

/// The JSON object handed to a skill.
///
/// Construction only checks the shape; the size and field-count invariants
/// are enforced by [`validate`](Self::validate), which every pipeline calls
/// before touching the container engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputEnvelope(Value);

impl InputEnvelope {
    /// Wrap a JSON value, rejecting non-objects.
    pub fn new(value: Value) -> Result<Self, EnvelopeError> {
        if !value.is_object() {
            return Err(EnvelopeError::NotAnObject);
        }
        Ok(Self(value))
    }

    /// Enforce the pre-execution invariants.
    ///
    /// # Errors
    ///
    /// [`EnvelopeError::InputTooLarge`] when the serialized form exceeds
    /// [`MAX_INPUT_BYTES`]; [`EnvelopeError::TooManyFields`] when the object
    /// has more than [`MAX_TOP_LEVEL_FIELDS`] top-level keys.
    pub fn validate(&self) -> Result<(), EnvelopeError> {
        let serialized = self.0.to_string();
        if serialized.len() > MAX_INPUT_BYTES {
            return Err(EnvelopeError::InputTooLarge {
                size: serialized.len(),
            });
        }
        let count = self
            .0
            .as_object()
            .map(serde_json::Map::len)
            .unwrap_or_default();
        if count > MAX_TOP_LEVEL_FIELDS {
            return Err(EnvelopeError::TooManyFields { count });
        }
        Ok(())
    }

    /// Borrow the underlying JSON value.
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Compact JSON serialization, as delivered via `INPUT_JSON`.
    #[must_use]
    pub fn to_json(&self) -> String {
        self.0.to_string()
    }
}
