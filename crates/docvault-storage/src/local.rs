use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::keys::validate_key;
use crate::traits::{PutObject, Storage, StorageError, StorageResult, StoredObject};
use crate::StorageBackend;

const SIDECAR_SUFFIX: &str = ".meta.json";
const PARTIAL_SUFFIX: &str = ".partial";

/// Content type, tags and metadata kept next to each object
#[derive(Debug, Serialize, Deserialize)]
struct Sidecar {
    content_type: String,
    size_bytes: u64,
    #[serde(default)]
    tags: BTreeMap<String, String>,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

/// Local filesystem storage implementation
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at `base_path` (created if missing)
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage { base_path })
    }

    /// Convert storage key to filesystem path with security validation
    ///
    /// Rejects keys with traversal segments, then checks that the resolved
    /// parent stays below the base directory.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        validate_key(storage_key)?;

        let path = self.base_path.join(storage_key);

        let base_canonical = self.base_path.canonicalize().map_err(|e| {
            StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
        })?;

        // Nearest existing ancestor must resolve inside the base (symlinks)
        let mut ancestor = path.parent();
        while let Some(dir) = ancestor {
            if let Ok(canonical) = dir.canonicalize() {
                if canonical.strip_prefix(&base_canonical).is_err() {
                    return Err(StorageError::InvalidKey(
                        "Storage key resolves outside storage directory".to_string(),
                    ));
                }
                break;
            }
            ancestor = dir.parent();
        }

        Ok(path)
    }

    fn sidecar_path(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(SIDECAR_SUFFIX);
        PathBuf::from(name)
    }

    fn partial_path(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(PARTIAL_SUFFIX);
        PathBuf::from(name)
    }

    /// Write to a temporary sibling, then rename into place
    async fn write_atomic(path: &Path, data: &[u8]) -> StorageResult<()> {
        let partial = Self::partial_path(path);

        let mut file = fs::File::create(&partial).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", partial.display(), e))
        })?;

        file.write_all(data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", partial.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", partial.display(), e))
        })?;

        fs::rename(&partial, path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to move file {}: {}", path.display(), e))
        })
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn put_object(&self, object: PutObject) -> StorageResult<String> {
        let path = self.key_to_path(&object.key)?;
        let start = std::time::Instant::now();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let sidecar = Sidecar {
            content_type: object.content_type,
            size_bytes: object.data.len() as u64,
            tags: object.tags,
            metadata: object.metadata,
        };
        let sidecar_json = serde_json::to_vec_pretty(&sidecar)
            .map_err(|e| StorageError::BackendError(format!("Failed to encode metadata: {}", e)))?;

        // Sidecar first: an object file never exists without its metadata
        Self::write_atomic(&Self::sidecar_path(&path), &sidecar_json).await?;
        Self::write_atomic(&path, &object.data).await?;

        tracing::info!(
            key = %object.key,
            size_bytes = sidecar.size_bytes,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage put successful"
        );

        Ok(object.key)
    }

    async fn get_object(&self, key: &str) -> StorageResult<StoredObject> {
        let path = self.key_to_path(key)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(key.to_string()));
        }

        let data = fs::read(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        let sidecar: Option<Sidecar> = match fs::read(Self::sidecar_path(&path)).await {
            Ok(raw) => Some(serde_json::from_slice(&raw).map_err(|e| {
                StorageError::BackendError(format!("Corrupt metadata for {}: {}", key, e))
            })?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        let (content_type, metadata) = match sidecar {
            Some(s) => (Some(s.content_type), s.metadata),
            None => (None, BTreeMap::new()),
        };

        Ok(StoredObject {
            data: Bytes::from(data),
            content_type,
            metadata,
        })
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;

        for target in [path.clone(), Self::sidecar_path(&path)] {
            match fs::remove_file(&target).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(StorageError::DeleteFailed(format!(
                        "Failed to delete file {}: {}",
                        target.display(),
                        e
                    )))
                }
            }
        }

        tracing::info!(key = %key, "Local storage delete successful");
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(key)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
