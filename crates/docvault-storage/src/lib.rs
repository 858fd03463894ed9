//! DocVault Storage Library
//!
//! Object store adapters consumed by the upload orchestrator, plus the secure
//! path generator that names every stored document.
//!
//! # Storage key format
//!
//! `documents/{owner_hash}/{document_type}/{timestamp}_{nonce}`
//!
//! `owner_hash` is a truncated HMAC of the owner id under the server-side path
//! salt. Keys must not contain `..`, backslashes or a leading `/`; every
//! backend checks this with [`keys::validate_key`].

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod memory;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use docvault_core::StorageBackend;
pub use factory::create_storage;
pub use keys::SecurePathGenerator;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use memory::MemoryStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{PutObject, Storage, StorageError, StorageResult, StoredObject};
