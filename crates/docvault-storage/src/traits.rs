//! Storage abstraction trait
//!
//! This module defines the Storage trait that all object store backends must implement.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::StorageBackend;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("Storage operation timed out")]
    Timeout,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl StorageError {
    /// Whether a single retry of the same operation may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StorageError::UploadFailed(_)
                | StorageError::BackendError(_)
                | StorageError::Timeout
                | StorageError::IoError(_)
        )
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// One object write: key, bytes, content type, tags and contextual metadata.
#[derive(Clone)]
pub struct PutObject {
    pub key: String,
    pub data: Bytes,
    pub content_type: String,
    pub tags: BTreeMap<String, String>,
    pub metadata: BTreeMap<String, String>,
}

impl PutObject {
    pub fn new(key: impl Into<String>, data: Bytes, content_type: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            data,
            content_type: content_type.into(),
            tags: BTreeMap::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

impl std::fmt::Debug for PutObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PutObject")
            .field("key", &self.key)
            .field("size_bytes", &self.data.len())
            .field("content_type", &self.content_type)
            .field("tags", &self.tags)
            .field("metadata_keys", &self.metadata.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// An object read back from the store
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Bytes,
    pub content_type: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

/// Storage abstraction trait
///
/// The orchestrator only ever sees this trait; backends are chosen at startup
/// by [`crate::create_storage`]. The returned object id is opaque to callers.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write one object and return the backend's identifier for it
    async fn put_object(&self, object: PutObject) -> StorageResult<String>;

    async fn get_object(&self, key: &str) -> StorageResult<StoredObject>;

    /// Delete an object. Deleting a missing key is not an error.
    async fn delete_object(&self, key: &str) -> StorageResult<()>;

    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
