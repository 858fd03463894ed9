//! Crypto engine: authenticated encryption of sensitive metadata and
//! issuance/verification of access tokens.
//!
//! Uses AES-256-GCM. Every `encrypt` call draws a fresh 96-bit nonce from the OS
//! CSPRNG; there is no API that accepts a caller-supplied nonce.

use std::collections::BTreeMap;
use std::sync::Arc;

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose, Engine as _};
use uuid::Uuid;

use crate::access_token;
use crate::clock::Clock;
use crate::config::DocVaultConfig;
use crate::models::{AccessTokenClaims, EncryptedBlob};
use crate::VaultError;

pub const ALGORITHM_AES_256_GCM: &str = "AES-256-GCM";
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

#[derive(Clone)]
pub struct CryptoEngine {
    cipher: Aes256Gcm,
    signing_key: Arc<[u8]>,
    token_ttl_secs: u64,
    clock: Arc<dyn Clock>,
}

impl CryptoEngine {
    /// Create an engine from raw 32-byte keys.
    pub fn from_key_bytes(
        encryption_key: &[u8],
        signing_key: &[u8],
        token_ttl_secs: u64,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, VaultError> {
        if encryption_key.len() != 32 {
            return Err(VaultError::Config(
                "Encryption key must be 32 bytes (256 bits)".to_string(),
            ));
        }
        if signing_key.len() != 32 {
            return Err(VaultError::Config(
                "Token signing key must be 32 bytes (256 bits)".to_string(),
            ));
        }
        let key = Key::<Aes256Gcm>::from_slice(encryption_key);
        Ok(Self {
            cipher: Aes256Gcm::new(key),
            signing_key: Arc::from(signing_key),
            token_ttl_secs,
            clock,
        })
    }

    pub fn from_config(config: &DocVaultConfig, clock: Arc<dyn Clock>) -> Result<Self, VaultError> {
        Self::from_key_bytes(
            config.encryption_key.expose(),
            config.token_signing_key.expose(),
            config.token_ttl_secs,
            clock,
        )
    }

    /// Encrypt `plaintext` under a freshly generated nonce.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<EncryptedBlob, VaultError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let mut sealed = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| VaultError::Internal(format!("Encryption failed: {}", e)))?;

        // aes-gcm appends the tag to the ciphertext
        let tag = sealed.split_off(sealed.len() - TAG_LEN);

        Ok(EncryptedBlob {
            algorithm: ALGORITHM_AES_256_GCM.to_string(),
            nonce: nonce.to_vec(),
            ciphertext: sealed,
            tag,
        })
    }

    /// Decrypt a blob. Any tag mismatch, wrong key or malformed blob is reported
    /// as the same `Integrity` error.
    pub fn decrypt(&self, blob: &EncryptedBlob) -> Result<Vec<u8>, VaultError> {
        if blob.algorithm != ALGORITHM_AES_256_GCM
            || blob.nonce.len() != NONCE_LEN
            || blob.tag.len() != TAG_LEN
        {
            return Err(VaultError::Integrity);
        }

        let mut sealed = Vec::with_capacity(blob.ciphertext.len() + TAG_LEN);
        sealed.extend_from_slice(&blob.ciphertext);
        sealed.extend_from_slice(&blob.tag);

        self.cipher
            .decrypt(Nonce::from_slice(&blob.nonce), sealed.as_slice())
            .map_err(|_| VaultError::Integrity)
    }

    /// Encrypt a metadata map as JSON
    pub fn encrypt_metadata(
        &self,
        metadata: &BTreeMap<String, String>,
    ) -> Result<EncryptedBlob, VaultError> {
        let json = serde_json::to_vec(metadata)?;
        self.encrypt(&json)
    }

    pub fn decrypt_metadata(
        &self,
        blob: &EncryptedBlob,
    ) -> Result<BTreeMap<String, String>, VaultError> {
        let plaintext = self.decrypt(blob)?;
        serde_json::from_slice(&plaintext).map_err(|_| VaultError::Integrity)
    }

    /// Issue a token for one request/owner pair using the configured TTL.
    pub fn issue_access_token(&self, request_id: Uuid, owner_id: &str) -> Result<String, VaultError> {
        self.issue_access_token_with_ttl(request_id, owner_id, self.token_ttl_secs)
    }

    pub fn issue_access_token_with_ttl(
        &self,
        request_id: Uuid,
        owner_id: &str,
        ttl_secs: u64,
    ) -> Result<String, VaultError> {
        let issued_at = self.clock.now().timestamp();
        let ttl = i64::try_from(ttl_secs)
            .map_err(|_| VaultError::Internal("Token TTL out of range".to_string()))?;
        let claims = AccessTokenClaims {
            request_id,
            owner_id: owner_id.to_string(),
            issued_at,
            expires_at: issued_at.saturating_add(ttl),
        };
        access_token::create(&claims, &self.signing_key)
    }

    /// Verify signature (constant time) and expiry against the injected clock.
    pub fn verify_access_token(&self, token: &str) -> Result<AccessTokenClaims, VaultError> {
        access_token::verify(token, &self.signing_key, self.clock.now().timestamp())
    }

    pub fn token_ttl_secs(&self) -> u64 {
        self.token_ttl_secs
    }
}

impl EncryptedBlob {
    /// Compact `alg.nonce.ciphertext.tag` encoding
    pub fn encode(&self) -> String {
        let engine = general_purpose::URL_SAFE_NO_PAD;
        format!(
            "{}.{}.{}.{}",
            self.algorithm,
            engine.encode(&self.nonce),
            engine.encode(&self.ciphertext),
            engine.encode(&self.tag)
        )
    }

    /// Parse the compact encoding; malformed input is an integrity failure.
    pub fn decode(encoded: &str) -> Result<Self, VaultError> {
        let engine = general_purpose::URL_SAFE_NO_PAD;
        let mut parts = encoded.split('.');
        let (Some(algorithm), Some(nonce), Some(ciphertext), Some(tag), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return Err(VaultError::Integrity);
        };
        if algorithm != ALGORITHM_AES_256_GCM {
            return Err(VaultError::Integrity);
        }
        let decode = |s: &str| engine.decode(s).map_err(|_| VaultError::Integrity);
        Ok(EncryptedBlob {
            algorithm: algorithm.to_string(),
            nonce: decode(nonce)?,
            ciphertext: decode(ciphertext)?,
            tag: decode(tag)?,
        })
    }
}
