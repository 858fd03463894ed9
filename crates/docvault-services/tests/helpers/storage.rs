//! Object store double: call counting, scripted failures, latency and corruption

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use docvault_storage::{
    MemoryStorage, PutObject, Storage, StorageBackend, StorageError, StorageResult, StoredObject,
};

#[derive(Default)]
pub struct TestStorage {
    pub inner: MemoryStorage,
    put_calls: AtomicUsize,
    put_keys: Mutex<Vec<String>>,
    failures: Mutex<VecDeque<StorageError>>,
    latency: Mutex<Option<Duration>>,
    corrupt_writes: AtomicBool,
}

impl TestStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next put with `error` (queued, one per call)
    pub fn fail_next(&self, error: StorageError) {
        self.failures.lock().unwrap().push_back(error);
    }

    /// Delay every put by `latency` before it takes effect
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = Some(latency);
    }

    /// Persist a byte-altered copy of whatever is written
    pub fn corrupt_writes(&self) {
        self.corrupt_writes.store(true, Ordering::SeqCst);
    }

    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub fn put_keys(&self) -> Vec<String> {
        self.put_keys.lock().unwrap().clone()
    }
}

#[async_trait]
impl Storage for TestStorage {
    async fn put_object(&self, mut object: PutObject) -> StorageResult<String> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        self.put_keys.lock().unwrap().push(object.key.clone());

        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let scripted = self.failures.lock().unwrap().pop_front();
        if let Some(error) = scripted {
            return Err(error);
        }

        if self.corrupt_writes.load(Ordering::SeqCst) {
            let mut altered = BytesMut::from(&object.data[..]);
            altered.extend_from_slice(b"\x00");
            object.data = altered.freeze();
        }

        self.inner.put_object(object).await
    }

    async fn get_object(&self, key: &str) -> StorageResult<StoredObject> {
        self.inner.get_object(key).await
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        self.inner.delete_object(key).await
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        self.inner.exists(key).await
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}

/// Bytes stored under `key`, for assertions
pub fn stored_bytes(storage: &TestStorage, key: &str) -> Option<Bytes> {
    storage.inner.object(key).map(|o| o.data)
}
