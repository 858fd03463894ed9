//! DocVault Core Library
//!
//! Domain models, configuration, the error taxonomy and the crypto engine shared
//! by every DocVault component.

pub mod access_token;
pub mod clock;
pub mod config;
pub mod constants;
pub mod encryption;
pub mod error;
pub mod hooks;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, RandomSource, SequenceRandom, SystemClock, SystemRandom};
pub use config::{
    DocVaultConfig, SecretBytes, SizeLimits, StorageConfig, ThreatPatternConfig,
    UnknownMimePolicy,
};
pub use encryption::CryptoEngine;
pub use error::{ErrorMetadata, ErrorResponse, LogLevel, VaultError};
pub use hooks::{NoLimit, NoOpNotifier, Notifier, RateLimiter, UploadOutcome};
pub use storage_types::StorageBackend;
