// SPDX-License-Identifier: MIT OR Apache-2.0
//! Content-addressed persistence for skill results.
//!
//! The [`Gateway`] wraps one [`StorageProvider`] chosen once at startup:
//! a gist provider when a `GITHUB_TOKEN` credential is configured and the
//! client initializes, the local filesystem otherwise. The returned URI is
//! the only cross-component reference to a stored payload; its scheme tags
//! the provider (`file://` or `gist://`) and consumers must not assume a
//! particular backend.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod gist;
mod local;

pub use gist::GistProvider;
pub use local::LocalProvider;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};
use sre_core::RuntimeEnv;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// Default blob directory relative to the runtime working directory.
pub const DEFAULT_STORAGE_DIR: &str = "data/results";

/// Failures surfaced by storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The upload metadata is missing its order id.
    #[error("metadata must include a non-empty order_id")]
    MetadataIncomplete,

    /// No blob exists at the given URI.
    #[error("no blob at {uri}")]
    NotFound {
        /// URI that was requested.
        uri: String,
    },

    /// Transport or filesystem failure.
    #[error("storage i/o failure: {reason}")]
    IoFailure {
        /// Human-readable failure detail.
        reason: String,
    },

    /// The blob exists but is not the expected JSON envelope.
    #[error("invalid payload at {uri}: {reason}")]
    InvalidPayload {
        /// URI that was fetched.
        uri: String,
        /// Parse failure detail.
        reason: String,
    },
}

/// Metadata attached to every upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobMetadata {
    /// Order the blob belongs to. Required.
    pub order_id: String,
    /// MIME type of the payload.
    pub content_type: String,
    /// Upload timestamp, ISO-8601.
    pub timestamp: String,
}

impl BlobMetadata {
    /// Metadata for a JSON result of the given order.
    #[must_use]
    pub fn for_order(order_id: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            content_type: "application/json".into(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

/// A backend that can persist, retrieve and probe blobs.
///
/// Providers are interchangeable behind this three-operation contract.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Persist `data` and return a URI tagged with this provider's scheme.
    async fn upload(&self, data: &[u8], metadata: &BlobMetadata) -> Result<String, StorageError>;

    /// Read back the blob at `uri`.
    async fn download(&self, uri: &str) -> Result<Vec<u8>, StorageError>;

    /// Whether a blob exists at `uri`. Malformed URIs resolve to `false`.
    async fn exists(&self, uri: &str) -> bool;

    /// URI scheme this provider emits, without the `://` suffix.
    fn scheme(&self) -> &'static str;
}

/// Which backend the gateway selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Local filesystem under a blob directory.
    Local,
    /// Remote gist storage.
    Gist,
}

/// Process-wide storage front end.
///
/// Construct one at the composition root and share it via `Arc`; the
/// explicit constructors keep tests hermetic.
#[derive(Clone)]
pub struct Gateway {
    provider: Arc<dyn StorageProvider>,
    kind: ProviderKind,
}

impl Gateway {
    /// Gateway over the local filesystem provider.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::IoFailure`] if the blob directory cannot be
    /// created.
    pub fn local(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        Ok(Self {
            provider: Arc::new(LocalProvider::new(dir)?),
            kind: ProviderKind::Local,
        })
    }

    /// Gateway over the gist provider with the given token.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::IoFailure`] if the HTTP client cannot be
    /// initialized.
    pub fn gist(token: impl Into<String>) -> Result<Self, StorageError> {
        Ok(Self {
            provider: Arc::new(GistProvider::new(token)?),
            kind: ProviderKind::Gist,
        })
    }

    /// Gateway over an arbitrary provider, for tests and adapters.
    pub fn with_provider(provider: Arc<dyn StorageProvider>, kind: ProviderKind) -> Self {
        Self { provider, kind }
    }

    /// Evaluate the provider fallback chain once: gist when a token is
    /// configured and the client initializes, local filesystem otherwise.
    /// Deployments pass [`DEFAULT_STORAGE_DIR`] as `local_dir` unless they
    /// relocate the blob directory.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::IoFailure`] only when the local fallback
    /// itself cannot be set up.
    pub fn from_env(env: &RuntimeEnv, local_dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        if let Some(token) = &env.github_token {
            match Self::gist(token.clone()) {
                Ok(gateway) => {
                    debug!(target: "sre.storage", "using gist storage provider");
                    return Ok(gateway);
                }
                Err(err) => {
                    warn!(target: "sre.storage", %err, "gist provider unavailable, falling back to local");
                }
            }
        }
        debug!(target: "sre.storage", "using local storage provider");
        Self::local(local_dir)
    }

    /// Which backend was selected.
    #[must_use]
    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    /// Store a skill result wrapped in its metadata envelope.
    ///
    /// The on-disk payload is `{order_id, stored_at, result}`; the inner
    /// `result` is what [`fetch_result`](Self::fetch_result) returns.
    ///
    /// # Errors
    ///
    /// Propagates provider failures; [`StorageError::MetadataIncomplete`]
    /// when `order_id` is empty.
    pub async fn store_result(&self, result: &Value, order_id: &str) -> Result<String, StorageError> {
        let envelope = json!({
            "order_id": order_id,
            "stored_at": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            "result": result,
        });
        let data = serde_json::to_vec(&envelope)
            .map_err(|e| StorageError::IoFailure { reason: e.to_string() })?;
        let metadata = BlobMetadata::for_order(order_id);
        self.provider.upload(&data, &metadata).await
    }

    /// Fetch a stored result by URI, unwrapping the metadata envelope.
    ///
    /// # Errors
    ///
    /// [`StorageError::NotFound`] when nothing is stored at `uri`;
    /// [`StorageError::InvalidPayload`] when the blob is not the expected
    /// envelope.
    pub async fn fetch_result(&self, uri: &str) -> Result<Value, StorageError> {
        if !self.provider.exists(uri).await {
            return Err(StorageError::NotFound { uri: uri.into() });
        }
        let data = self.provider.download(uri).await?;
        let envelope: Value =
            serde_json::from_slice(&data).map_err(|e| StorageError::InvalidPayload {
                uri: uri.into(),
                reason: e.to_string(),
            })?;
        // Tolerate bare payloads written by older runtimes.
        Ok(match envelope {
            Value::Object(mut map) if map.contains_key("result") => {
                map.remove("result").unwrap_or(Value::Null)
            }
            other => other,
        })
    }

    /// Whether a blob exists at `uri`.
    pub async fn exists(&self, uri: &str) -> bool {
        self.provider.exists(uri).await
    }

    /// Raw download, bypassing the envelope.
    ///
    /// # Errors
    ///
    /// Propagates provider failures.
    pub async fn download(&self, uri: &str) -> Result<Vec<u8>, StorageError> {
        self.provider.download(uri).await
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("kind", &self.kind)
            .field("scheme", &self.provider.scheme())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn local_gateway() -> (TempDir, Gateway) {
        let dir = TempDir::new().unwrap();
        let gateway = Gateway::local(dir.path()).unwrap();
        (dir, gateway)
    }

    #[tokio::test]
    async fn store_then_fetch_returns_inner_result() {
        let (_dir, gateway) = local_gateway();
        let result = json!({"issues": [], "summary": "ok"});
        let uri = gateway.store_result(&result, "order-1").await.unwrap();
        assert!(uri.starts_with("file://"));
        assert!(gateway.exists(&uri).await);
        assert_eq!(gateway.fetch_result(&uri).await.unwrap(), result);
    }

    #[tokio::test]
    async fn envelope_carries_order_id_and_stored_at() {
        let (_dir, gateway) = local_gateway();
        let uri = gateway
            .store_result(&json!({"n": 1}), "order-2")
            .await
            .unwrap();
        let raw = gateway.download(&uri).await.unwrap();
        let envelope: Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(envelope["order_id"], "order-2");
        assert!(envelope["stored_at"].as_str().unwrap().ends_with('Z'));
        assert_eq!(envelope["result"], json!({"n": 1}));
    }

    #[tokio::test]
    async fn fetch_missing_uri_is_not_found() {
        let (dir, gateway) = local_gateway();
        let uri = format!("file://{}/absent.json", dir.path().display());
        match gateway.fetch_result(&uri).await {
            Err(StorageError::NotFound { .. }) => {}
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_order_id_is_metadata_incomplete() {
        let (_dir, gateway) = local_gateway();
        match gateway.store_result(&json!({}), "").await {
            Err(StorageError::MetadataIncomplete) => {}
            other => panic!("expected MetadataIncomplete, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fallback_chain_without_token_selects_local() {
        let dir = TempDir::new().unwrap();
        let env = RuntimeEnv::default();
        let gateway = Gateway::from_env(&env, dir.path()).unwrap();
        assert_eq!(gateway.kind(), ProviderKind::Local);
    }

    #[tokio::test]
    async fn fallback_chain_with_token_selects_gist() {
        let dir = TempDir::new().unwrap();
        let env = RuntimeEnv {
            github_token: Some("ghp_test".into()),
            ..RuntimeEnv::default()
        };
        let gateway = Gateway::from_env(&env, dir.path()).unwrap();
        assert_eq!(gateway.kind(), ProviderKind::Gist);
    }
}
