//! Secure storage key generation, shared by all backends.
//!
//! Key format: `documents/{owner_hash}/{document_type}/{timestamp}_{nonce}`.

use std::sync::Arc;

use docvault_core::models::DocumentType;
use docvault_core::{Clock, DocVaultConfig, RandomSource, VaultError};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{StorageError, StorageResult};

type HmacSha256 = Hmac<Sha256>;

const KEY_PREFIX: &str = "documents";
/// Hex characters of the owner HMAC kept in the path (128 bits)
const OWNER_HASH_HEX_LEN: usize = 32;
/// Random bytes per key (128 bits)
const NONCE_BYTES: usize = 16;
const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S%.3fZ";

pub struct SecurePathGenerator {
    owner_mac: HmacSha256,
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
}

impl SecurePathGenerator {
    pub fn new(
        path_salt: &[u8],
        clock: Arc<dyn Clock>,
        random: Arc<dyn RandomSource>,
    ) -> Result<Self, VaultError> {
        let owner_mac = HmacSha256::new_from_slice(path_salt)
            .map_err(|e| VaultError::Config(format!("Invalid path salt: {}", e)))?;
        Ok(Self {
            owner_mac,
            clock,
            random,
        })
    }

    pub fn from_config(
        config: &DocVaultConfig,
        clock: Arc<dyn Clock>,
        random: Arc<dyn RandomSource>,
    ) -> Result<Self, VaultError> {
        Self::new(config.path_salt.expose(), clock, random)
    }

    /// Deterministic, salted stand-in for an owner id. Also used in logs.
    pub fn owner_hash(&self, owner_id: &str) -> String {
        let mut mac = self.owner_mac.clone();
        mac.update(owner_id.as_bytes());
        let mut digest = hex::encode(mac.finalize().into_bytes());
        digest.truncate(OWNER_HASH_HEX_LEN);
        digest
    }

    /// Fresh storage key for one document.
    pub fn generate_path(&self, owner_id: &str, document_type: DocumentType) -> String {
        let mut nonce = [0u8; NONCE_BYTES];
        self.random.fill(&mut nonce);

        format!(
            "{}/{}/{}/{}_{}",
            KEY_PREFIX,
            self.owner_hash(owner_id),
            document_type.as_str(),
            self.clock.now().format(TIMESTAMP_FORMAT),
            hex::encode(nonce)
        )
    }
}

/// Reject keys that could escape a backend's namespace.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid segments".to_string(),
        ));
    }
    Ok(())
}
