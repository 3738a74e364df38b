// SPDX-License-Identifier: MIT OR Apache-2.0
//! Remote gist provider, selected when a token is configured.

use crate::{BlobMetadata, StorageError, StorageProvider};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Value, json};
use tracing::debug;

const DEFAULT_API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = "sre-storage";

/// Stores blobs as secret gists; URIs are `gist://{id}`.
#[derive(Debug)]
pub struct GistProvider {
    client: reqwest::Client,
    api_base: String,
    token: String,
}

impl GistProvider {
    /// Create a provider against the public API endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::IoFailure`] when the HTTP client cannot be
    /// built; callers treat that as "provider unavailable" and fall back.
    pub fn new(token: impl Into<String>) -> Result<Self, StorageError> {
        Self::with_api_base(token, DEFAULT_API_BASE)
    }

    /// Create a provider against a custom endpoint (tests point this at a
    /// mock server).
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::IoFailure`] when the HTTP client cannot be
    /// built.
    pub fn with_api_base(
        token: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| StorageError::IoFailure {
                reason: format!("build http client: {e}"),
            })?;
        Ok(Self {
            client,
            api_base: api_base.into(),
            token: token.into(),
        })
    }

    fn gist_id(uri: &str) -> Option<&str> {
        uri.strip_prefix("gist://").filter(|id| !id.is_empty())
    }

    async fn fetch(&self, id: &str) -> Result<Value, StorageError> {
        let response = self
            .client
            .get(format!("{}/gists/{id}", self.api_base))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| StorageError::IoFailure {
                reason: format!("fetch gist {id}: {e}"),
            })?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound {
                uri: format!("gist://{id}"),
            });
        }
        if !response.status().is_success() {
            return Err(StorageError::IoFailure {
                reason: format!("fetch gist {id}: http {}", response.status()),
            });
        }
        response.json().await.map_err(|e| StorageError::IoFailure {
            reason: format!("decode gist {id}: {e}"),
        })
    }
}

#[async_trait]
impl StorageProvider for GistProvider {
    async fn upload(&self, data: &[u8], metadata: &BlobMetadata) -> Result<String, StorageError> {
        if metadata.order_id.trim().is_empty() {
            return Err(StorageError::MetadataIncomplete);
        }
        let content = String::from_utf8_lossy(data);
        let body = json!({
            "description": format!("skill result for {}", metadata.order_id),
            "public": false,
            "files": {
                format!("{}.json", metadata.order_id): {"content": content},
            },
        });
        let response = self
            .client
            .post(format!("{}/gists", self.api_base))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| StorageError::IoFailure {
                reason: format!("create gist: {e}"),
            })?;
        if !response.status().is_success() {
            return Err(StorageError::IoFailure {
                reason: format!("create gist: http {}", response.status()),
            });
        }
        let created: Value = response.json().await.map_err(|e| StorageError::IoFailure {
            reason: format!("decode gist response: {e}"),
        })?;
        let id = created["id"].as_str().ok_or_else(|| StorageError::IoFailure {
            reason: "gist response missing id".into(),
        })?;
        debug!(target: "sre.storage", order_id = %metadata.order_id, gist = %id, "uploaded");
        Ok(format!("gist://{id}"))
    }

    async fn download(&self, uri: &str) -> Result<Vec<u8>, StorageError> {
        let id = Self::gist_id(uri).ok_or_else(|| StorageError::NotFound { uri: uri.into() })?;
        let gist = self.fetch(id).await?;
        let files = gist["files"]
            .as_object()
            .ok_or_else(|| StorageError::InvalidPayload {
                uri: uri.into(),
                reason: "gist has no files".into(),
            })?;
        let first = files
            .values()
            .next()
            .ok_or_else(|| StorageError::InvalidPayload {
                uri: uri.into(),
                reason: "gist has no files".into(),
            })?;
        let content = first["content"]
            .as_str()
            .ok_or_else(|| StorageError::InvalidPayload {
                uri: uri.into(),
                reason: "gist file has no content".into(),
            })?;
        Ok(content.as_bytes().to_vec())
    }

    async fn exists(&self, uri: &str) -> bool {
        match Self::gist_id(uri) {
            Some(id) => self.fetch(id).await.is_ok(),
            None => false,
        }
    }

    fn scheme(&self) -> &'static str {
        "gist"
    }
}
