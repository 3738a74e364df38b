// SPDX-License-Identifier: MIT OR Apache-2.0
//! Local filesystem provider, the fallback backend.

use crate::{BlobMetadata, StorageError, StorageProvider};
use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Stores blobs as JSON files under a single directory.
///
/// URIs are `file://{absolute_path}`. Filenames embed the order id, a UTC
/// timestamp and a short hash so rapid re-uploads of the same order never
/// collide.
#[derive(Debug)]
pub struct LocalProvider {
    dir: PathBuf,
}

impl LocalProvider {
    /// Create the provider, making sure the blob directory exists.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::IoFailure`] when the directory cannot be
    /// created.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| StorageError::IoFailure {
            reason: format!("create {}: {e}", dir.display()),
        })?;
        Ok(Self { dir })
    }

    /// Directory blobs are written to.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn filename(order_id: &str) -> String {
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let mut hasher = Sha256::new();
        hasher.update(format!("{order_id}:{timestamp}").as_bytes());
        let short = sre_digest::to_hex(&hasher.finalize())[..8].to_string();
        format!("{order_id}_{timestamp}_{short}.json")
    }

    fn uri_to_path(uri: &str) -> Option<PathBuf> {
        let path = uri.strip_prefix("file://")?;
        if path.is_empty() {
            return None;
        }
        Some(PathBuf::from(path))
    }

    fn path_to_uri(path: &Path) -> String {
        format!("file://{}", path.display())
    }
}

#[async_trait]
impl StorageProvider for LocalProvider {
    async fn upload(&self, data: &[u8], metadata: &BlobMetadata) -> Result<String, StorageError> {
        if metadata.order_id.trim().is_empty() {
            return Err(StorageError::MetadataIncomplete);
        }
        let path = self.dir.join(Self::filename(&metadata.order_id));
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| StorageError::IoFailure {
                reason: format!("write {}: {e}", path.display()),
            })?;
        let canonical = path
            .canonicalize()
            .map_err(|e| StorageError::IoFailure {
                reason: format!("canonicalize {}: {e}", path.display()),
            })?;
        Ok(Self::path_to_uri(&canonical))
    }

    async fn download(&self, uri: &str) -> Result<Vec<u8>, StorageError> {
        let path = Self::uri_to_path(uri).ok_or_else(|| StorageError::NotFound {
            uri: uri.into(),
        })?;
        if !path.exists() {
            return Err(StorageError::NotFound { uri: uri.into() });
        }
        tokio::fs::read(&path)
            .await
            .map_err(|e| StorageError::IoFailure {
                reason: format!("read {}: {e}", path.display()),
            })
    }

    async fn exists(&self, uri: &str) -> bool {
        Self::uri_to_path(uri).is_some_and(|p| p.exists())
    }

    fn scheme(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn filename_layout_matches_contract() {
        let name = LocalProvider::filename("order-9");
        // order-9_YYYYMMDD_HHMMSS_xxxxxxxx.json
        assert!(name.starts_with("order-9_"));
        assert!(name.ends_with(".json"));
        let stem = name.strip_suffix(".json").unwrap();
        let parts: Vec<&str> = stem.split('_').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[1].len(), 8);
        assert_eq!(parts[2].len(), 6);
        assert_eq!(parts[3].len(), 8);
        assert!(parts[3].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn upload_download_roundtrip_is_bytewise() {
        let dir = TempDir::new().unwrap();
        let provider = LocalProvider::new(dir.path()).unwrap();
        let data = br#"{"order_id":"o","result":{"n":1}}"#;
        let uri = provider
            .upload(data, &BlobMetadata::for_order("o"))
            .await
            .unwrap();
        assert!(provider.exists(&uri).await);
        assert_eq!(provider.download(&uri).await.unwrap(), data);
    }

    #[tokio::test]
    async fn malformed_uri_exists_false() {
        let dir = TempDir::new().unwrap();
        let provider = LocalProvider::new(dir.path()).unwrap();
        assert!(!provider.exists("not-a-uri").await);
        assert!(!provider.exists("gist://abc").await);
        assert!(!provider.exists("file://").await);
    }

    #[tokio::test]
    async fn missing_order_id_rejected_before_write() {
        let dir = TempDir::new().unwrap();
        let provider = LocalProvider::new(dir.path()).unwrap();
        let meta = BlobMetadata {
            order_id: "  ".into(),
            content_type: "application/json".into(),
            timestamp: String::new(),
        };
        assert!(matches!(
            provider.upload(b"{}", &meta).await,
            Err(StorageError::MetadataIncomplete)
        ));
        // Nothing was written.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
