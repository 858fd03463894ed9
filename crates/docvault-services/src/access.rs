//! Token-gated document retrieval

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use docvault_core::models::{
    AccessTokenClaims, AuditAction, AuditEvent, AuditOutcome, EncryptedBlob,
    SecureObjectReference,
};
use docvault_core::{Clock, CryptoEngine, ErrorMetadata, VaultError};
use docvault_infra::AuditLogger;
use docvault_storage::{Storage, StorageError};
use subtle::ConstantTimeEq;

use crate::upload::{sha256_hex, METADATA_ENCRYPTED};

/// A verified document and its decrypted request metadata
#[derive(Debug, Clone)]
pub struct OpenedDocument {
    pub data: Bytes,
    pub content_type: Option<String>,
    pub claims: AccessTokenClaims,
    pub metadata: BTreeMap<String, String>,
}

pub struct DocumentAccessService {
    crypto: CryptoEngine,
    storage: Arc<dyn Storage>,
    audit: AuditLogger,
    clock: Arc<dyn Clock>,
}

impl DocumentAccessService {
    pub fn new(
        crypto: CryptoEngine,
        storage: Arc<dyn Storage>,
        audit: AuditLogger,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            crypto,
            storage,
            audit,
            clock,
        }
    }

    /// Fetch the document behind `reference` if `token` grants access to it.
    ///
    /// The token must verify, be unexpired and name the same request as the
    /// reference. The fetched bytes must hash to the reference checksum.
    pub async fn open_document(
        &self,
        token: &str,
        reference: &SecureObjectReference,
    ) -> Result<OpenedDocument, VaultError> {
        let claims = match self.crypto.verify_access_token(token) {
            Ok(claims) => claims,
            Err(err) => {
                self.deny(reference, None, &err);
                return Err(err);
            }
        };

        if claims.request_id != reference.request_id() {
            let err = VaultError::InvalidToken;
            self.deny(reference, Some(&claims.owner_id), &err);
            return Err(err);
        }

        let stored = match self.storage.get_object(reference.object_key()).await {
            Ok(stored) => stored,
            Err(StorageError::NotFound(_)) => {
                let err = VaultError::Integrity;
                tracing::error!(request_id = %reference.request_id(), "Referenced object is missing");
                self.deny(reference, Some(&claims.owner_id), &err);
                return Err(err);
            }
            Err(e) => {
                let err = VaultError::Upload(format!("Object read failed: {}", e));
                self.deny(reference, Some(&claims.owner_id), &err);
                return Err(err);
            }
        };

        let checksum = sha256_hex(&stored.data);
        if !bool::from(checksum.as_bytes().ct_eq(reference.checksum().as_bytes())) {
            let err = VaultError::Integrity;
            tracing::error!(request_id = %reference.request_id(), "Stored object checksum mismatch");
            self.deny(reference, Some(&claims.owner_id), &err);
            return Err(err);
        }

        let metadata = match stored.metadata.get(METADATA_ENCRYPTED) {
            Some(encoded) => {
                match EncryptedBlob::decode(encoded).and_then(|blob| self.crypto.decrypt_metadata(&blob)) {
                    Ok(metadata) => metadata,
                    Err(err) => {
                        self.deny(reference, Some(&claims.owner_id), &err);
                        return Err(err);
                    }
                }
            }
            None => BTreeMap::new(),
        };

        self.audit.log_action(
            AuditEvent::new(
                AuditAction::DocumentAccessed,
                reference.request_id(),
                claims.owner_id.as_str(),
                self.clock.now(),
            )
            .with_outcome(AuditOutcome::Success)
            .with_field("size_bytes", stored.data.len() as u64),
        );

        Ok(OpenedDocument {
            data: stored.data,
            content_type: stored.content_type,
            claims,
            metadata,
        })
    }

    fn deny(&self, reference: &SecureObjectReference, owner_id: Option<&str>, err: &VaultError) {
        self.audit.log_action(
            AuditEvent::new(
                AuditAction::AccessDenied,
                reference.request_id(),
                owner_id.unwrap_or_default(),
                self.clock.now(),
            )
            .with_outcome(AuditOutcome::Rejected)
            .with_field("error_code", err.error_code()),
        );
    }
}
