//! In-process object store for development and tests

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::keys::validate_key;
use crate::traits::{PutObject, Storage, StorageError, StorageResult, StoredObject};
use crate::StorageBackend;

/// Object store that keeps everything in a map
#[derive(Clone, Default)]
pub struct MemoryStorage {
    objects: Arc<RwLock<HashMap<String, PutObject>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored object by key (for test assertions)
    pub fn object(&self, key: &str) -> Option<PutObject> {
        self.objects.read().ok()?.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects
            .read()
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Replace an object's bytes in place, keeping its metadata
    pub fn overwrite(&self, key: &str, data: bytes::Bytes) -> bool {
        match self.objects.write() {
            Ok(mut objects) => match objects.get_mut(key) {
                Some(object) => {
                    object.data = data;
                    true
                }
                None => false,
            },
            Err(_) => false,
        }
    }

    fn poisoned() -> StorageError {
        StorageError::BackendError("memory storage lock poisoned".to_string())
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn put_object(&self, object: PutObject) -> StorageResult<String> {
        validate_key(&object.key)?;
        let key = object.key.clone();
        self.objects
            .write()
            .map_err(|_| Self::poisoned())?
            .insert(key.clone(), object);
        Ok(key)
    }

    async fn get_object(&self, key: &str) -> StorageResult<StoredObject> {
        let objects = self.objects.read().map_err(|_| Self::poisoned())?;
        let object = objects
            .get(key)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        Ok(StoredObject {
            data: object.data.clone(),
            content_type: Some(object.content_type.clone()),
            metadata: object.metadata.clone(),
        })
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        self.objects
            .write()
            .map_err(|_| Self::poisoned())?
            .remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self
            .objects
            .read()
            .map_err(|_| Self::poisoned())?
            .contains_key(key))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}
