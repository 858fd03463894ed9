//! Document upload service
//!
//! The only component the surrounding product calls to store a document. It
//! composes the validator, path generator, crypto engine, object store and
//! audit logger into the upload state machine.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use docvault_core::models::{
    AuditAction, AuditEvent, AuditOutcome, ReviewFlag, UploadReceipt, UploadRequest,
    ValidationResult,
};
use docvault_core::{
    Clock, CryptoEngine, DocVaultConfig, ErrorMetadata, NoLimit, NoOpNotifier, Notifier,
    RandomSource, RateLimiter, UploadOutcome, VaultError,
};
use docvault_infra::AuditLogger;
use docvault_storage::{PutObject, SecurePathGenerator, Storage, StorageError};
use docvault_validation::{sanitize_filename, FileValidator, ValidationContext};
use serde_json::Value;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use super::state::{fields, UploadRun, UploadState};

/// Store attempts per upload: the first write plus one retry
const MAX_STORE_ATTEMPTS: u32 = 2;
/// Bound on the best-effort cleanup of an object that will not be referenced
const CLEANUP_TIMEOUT: Duration = Duration::from_secs(5);

pub const METADATA_ENCRYPTED: &str = "encrypted_metadata";
const TAG_REVIEW: &str = "review";
const TAG_REVIEW_MANUAL: &str = "manual";

/// Collaborators the service is assembled from
pub struct UploadComponents {
    pub validator: FileValidator,
    pub paths: SecurePathGenerator,
    pub crypto: CryptoEngine,
    pub storage: Arc<dyn Storage>,
    pub audit: AuditLogger,
    pub clock: Arc<dyn Clock>,
    /// Bound on each individual store attempt
    pub store_timeout: Duration,
}

impl UploadComponents {
    /// Assemble every component from configuration
    pub fn from_config(
        config: &DocVaultConfig,
        storage: Arc<dyn Storage>,
        audit: AuditLogger,
        clock: Arc<dyn Clock>,
        random: Arc<dyn RandomSource>,
    ) -> Result<Self, VaultError> {
        Ok(Self {
            validator: FileValidator::from_config(config, clock.clone())?,
            paths: SecurePathGenerator::from_config(config, clock.clone(), random)?,
            crypto: CryptoEngine::from_config(config, clock.clone())?,
            storage,
            audit,
            clock,
            store_timeout: Duration::from_secs(config.store_timeout_secs),
        })
    }
}

/// Outcome of the bounded, retried store write
enum StoreOutcome {
    Stored { object_id: String, attempts: u32 },
    Failed { error: StorageError, attempts: u32 },
    Cancelled { attempts: u32 },
}

pub struct DocumentUploadService {
    validator: FileValidator,
    paths: SecurePathGenerator,
    crypto: CryptoEngine,
    storage: Arc<dyn Storage>,
    audit: AuditLogger,
    clock: Arc<dyn Clock>,
    rate_limiter: Arc<dyn RateLimiter>,
    notifier: Arc<dyn Notifier>,
    store_timeout: Duration,
    verify_after_store: bool,
}

impl DocumentUploadService {
    pub fn new(components: UploadComponents) -> Self {
        Self {
            validator: components.validator,
            paths: components.paths,
            crypto: components.crypto,
            storage: components.storage,
            audit: components.audit,
            clock: components.clock,
            rate_limiter: Arc::new(NoLimit),
            notifier: Arc::new(NoOpNotifier),
            store_timeout: components.store_timeout,
            verify_after_store: false,
        }
    }

    pub fn with_rate_limiter(mut self, rate_limiter: Arc<dyn RateLimiter>) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Bound on each individual store attempt
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Read the object back after writing and compare checksums
    pub fn with_read_back_verification(mut self, enabled: bool) -> Self {
        self.verify_after_store = enabled;
        self
    }

    pub fn crypto(&self) -> &CryptoEngine {
        &self.crypto
    }

    /// Validate, store and issue an access token for one document.
    pub async fn upload_document(&self, request: UploadRequest) -> Result<UploadReceipt, VaultError> {
        self.upload_document_cancellable(request, CancellationToken::new())
            .await
    }

    /// As [`Self::upload_document`], abandoning the upload if `cancel` fires
    /// before the store write is confirmed.
    pub async fn upload_document_cancellable(
        &self,
        request: UploadRequest,
        cancel: CancellationToken,
    ) -> Result<UploadReceipt, VaultError> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "upload_document",
            request_id = %request_id,
            owner = %self.paths.owner_hash(&request.owner_id),
            document_type = %request.document_type,
        );

        let result = self
            .run_upload(request_id, request, cancel)
            .instrument(span.clone())
            .await;

        if let Err(ref err) = result {
            let _entered = span.enter();
            match err.log_level() {
                docvault_core::LogLevel::Debug => {
                    tracing::debug!(error = %err, code = err.error_code(), "Upload rejected")
                }
                docvault_core::LogLevel::Warn => {
                    tracing::warn!(error = %err, code = err.error_code(), "Upload rejected")
                }
                docvault_core::LogLevel::Error => {
                    tracing::error!(error = %err, code = err.error_code(), "Upload failed")
                }
            }
        }

        result
    }

    async fn run_upload(
        &self,
        request_id: Uuid,
        request: UploadRequest,
        cancel: CancellationToken,
    ) -> Result<UploadReceipt, VaultError> {
        let document_type = request.document_type;
        let client_id = request
            .context
            .client_id
            .clone()
            .unwrap_or_else(|| request.owner_id.clone());

        if !self.rate_limiter.check(&client_id).await {
            self.audit.log_action(
                AuditEvent::new(
                    AuditAction::UploadRejected,
                    request_id,
                    request.owner_id.as_str(),
                    self.clock.now(),
                )
                .with_document_type(document_type)
                .with_outcome(AuditOutcome::Rejected)
                .with_field("reason", "rate_limited"),
            );
            return Err(VaultError::RateLimited);
        }

        let file_name = sanitize_filename(&request.original_filename);
        let mut run = UploadRun::start(
            request_id,
            &request.owner_id,
            document_type,
            &self.audit,
            self.clock.as_ref(),
            self.request_fields(&request, &file_name),
        );

        if cancel.is_cancelled() {
            run.abandon("cancelled");
            return Err(VaultError::Abandoned);
        }

        // Validating
        run.transition(
            UploadState::Validating,
            AuditAction::ValidationStarted,
            AuditOutcome::Pending,
            BTreeMap::new(),
        );

        let validation = self.validator.validate(
            &request.data,
            &request.declared_mime_type,
            document_type,
            &ValidationContext::for_request(request_id),
        );

        let (data, flags, content_type) = match validation {
            Ok(ValidationResult {
                errors,
                sanitized: Some(data),
                flags,
                normalized_mime_type,
            }) if errors.is_empty() => (data, flags, normalized_mime_type),
            Ok(result) => {
                let reasons = if result.errors.is_empty() {
                    vec!["File rejected".to_string()]
                } else {
                    result.errors
                };
                run.transition(
                    UploadState::ValidationFailed,
                    AuditAction::ValidationFailed,
                    AuditOutcome::Rejected,
                    fields([("reasons", reasons.clone().into())]),
                );
                self.notify(request_id, &request, false, reasons.clone(), false)
                    .await;
                return Err(VaultError::Validation { reasons });
            }
            Err(VaultError::Security) => {
                run.transition(
                    UploadState::ValidationFailed,
                    AuditAction::SecurityRejected,
                    AuditOutcome::Rejected,
                    fields([("reason", "threat_marker".into())]),
                );
                self.notify(
                    request_id,
                    &request,
                    false,
                    VaultError::Security.client_messages(),
                    false,
                )
                .await;
                return Err(VaultError::Security);
            }
            Err(err) => {
                run.transition(
                    UploadState::ValidationFailed,
                    AuditAction::ValidationFailed,
                    AuditOutcome::Failure,
                    fields([("error_code", err.error_code().into())]),
                );
                return Err(err);
            }
        };

        let flag_labels: Vec<&str> = flags.iter().map(ReviewFlag::label).collect();
        run.transition(
            UploadState::Validated,
            AuditAction::ValidationPassed,
            AuditOutcome::Success,
            fields([
                ("review_flags", flag_labels.clone().into()),
                ("content_type", content_type.as_str().into()),
            ]),
        );

        // Storing
        let object_key = self.paths.generate_path(&request.owner_id, document_type);
        run.transition(
            UploadState::Storing,
            AuditAction::StoreStarted,
            AuditOutcome::Pending,
            BTreeMap::new(),
        );

        let uploaded_at = self.clock.now();
        let checksum = sha256_hex(&data);
        let object = match self.build_object(
            request_id,
            &request,
            &object_key,
            data,
            &content_type,
            &file_name,
            &checksum,
            &flags,
            uploaded_at,
        ) {
            Ok(object) => object,
            Err(err) => {
                run.transition(
                    UploadState::StoreFailed,
                    AuditAction::StoreFailed,
                    AuditOutcome::Failure,
                    fields([("error_code", err.error_code().into()), ("attempts", 0.into())]),
                );
                return Err(err);
            }
        };
        let file_size = object.data.len() as u64;

        let (object_id, attempts) = match self.store_with_retry(&object, &cancel).await {
            StoreOutcome::Stored {
                object_id,
                attempts,
            } => (object_id, attempts),
            StoreOutcome::Failed { error, attempts } => {
                tracing::error!(error = %error, attempts, "Object store write failed");
                run.transition(
                    UploadState::StoreFailed,
                    AuditAction::StoreFailed,
                    AuditOutcome::Failure,
                    fields([
                        ("error_code", "UPLOAD_ERROR".into()),
                        ("attempts", attempts.into()),
                        ("transient", error.is_transient().into()),
                    ]),
                );
                return Err(VaultError::Upload(error.to_string()));
            }
            StoreOutcome::Cancelled { attempts } => {
                tracing::info!(attempts, "Upload cancelled during store");
                self.discard(&object_key).await;
                run.abandon("cancelled");
                return Err(VaultError::Abandoned);
            }
        };

        if let Err(err) = self.verify_stored(&object, &checksum).await {
            tracing::error!(error = %err, "Stored object failed checksum verification");
            self.discard(&object_key).await;
            run.transition(
                UploadState::StoreFailed,
                AuditAction::StoreFailed,
                AuditOutcome::Failure,
                fields([
                    ("error_code", err.error_code().into()),
                    ("attempts", attempts.into()),
                ]),
            );
            return Err(err);
        }

        run.transition(
            UploadState::Stored,
            AuditAction::StoreSucceeded,
            AuditOutcome::Success,
            fields([
                ("attempts", attempts.into()),
                ("object_key", object_key.as_str().into()),
                ("object_id", object_id.into()),
                ("checksum", checksum.as_str().into()),
                ("file_size", file_size.into()),
            ]),
        );

        // A write confirmed after cancellation is kept but never gets a token
        if cancel.is_cancelled() {
            run.abandon("cancelled");
            return Err(VaultError::Abandoned);
        }

        let access_token = match self.crypto.issue_access_token(request_id, &request.owner_id) {
            Ok(token) => token,
            Err(err) => {
                tracing::error!(error = %err, state = ?run.state(), "Token issuance failed");
                run.abandon("token_issue_failed");
                return Err(err);
            }
        };

        run.transition(
            UploadState::TokenIssued,
            AuditAction::UploadSucceeded,
            AuditOutcome::Success,
            fields([
                ("token_ttl_secs", self.crypto.token_ttl_secs().into()),
                ("manual_review", (!flags.is_empty()).into()),
            ]),
        );

        self.notify(request_id, &request, true, Vec::new(), !flags.is_empty())
            .await;

        tracing::info!(
            file_size,
            attempts,
            review_flags = ?flag_labels,
            "Document upload complete"
        );

        Ok(UploadReceipt {
            request_id,
            object_key,
            file_name,
            file_size,
            uploaded_at,
            access_token,
            checksum,
            review_flags: flags,
        })
    }

    /// Caller-safe context copied onto `UploadStarted`
    fn request_fields(&self, request: &UploadRequest, file_name: &str) -> BTreeMap<String, Value> {
        let mut context = fields([
            ("file_name", file_name.into()),
            ("file_size", (request.data.len() as u64).into()),
            ("declared_mime_type", request.declared_mime_type.as_str().into()),
        ]);
        if let Some(ref client_id) = request.context.client_id {
            context.insert("client_id".to_string(), client_id.as_str().into());
        }
        if let Some(ref client_ip) = request.context.client_ip {
            context.insert("client_ip".to_string(), client_ip.as_str().into());
        }
        if let Some(ref user_agent) = request.context.user_agent {
            context.insert("user_agent".to_string(), user_agent.as_str().into());
        }
        for (key, value) in &request.context.extra {
            context.insert(format!("ctx.{}", key), value.as_str().into());
        }
        context
    }

    #[allow(clippy::too_many_arguments)]
    fn build_object(
        &self,
        request_id: Uuid,
        request: &UploadRequest,
        object_key: &str,
        data: Bytes,
        content_type: &str,
        file_name: &str,
        checksum: &str,
        flags: &[ReviewFlag],
        uploaded_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<PutObject, VaultError> {
        let mut object = PutObject::new(object_key, data, content_type)
            .with_tag("document_type", request.document_type.as_str())
            .with_tag("request_id", request_id.to_string())
            .with_metadata("request_id", request_id.to_string())
            .with_metadata("original_filename", file_name)
            .with_metadata("checksum_sha256", checksum)
            .with_metadata("uploaded_at", uploaded_at.to_rfc3339());

        if !flags.is_empty() {
            object = object.with_tag(TAG_REVIEW, TAG_REVIEW_MANUAL);
        }

        if !request.metadata.is_empty() {
            let blob = self.crypto.encrypt_metadata(&request.metadata)?;
            object = object.with_metadata(METADATA_ENCRYPTED, blob.encode());
        }

        Ok(object)
    }

    /// Write under a timeout, retrying once on a transient failure with the same key and bytes
    async fn store_with_retry(&self, object: &PutObject, cancel: &CancellationToken) -> StoreOutcome {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let write = tokio::time::timeout(self.store_timeout, self.storage.put_object(object.clone()));

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return StoreOutcome::Cancelled { attempts },
                result = write => result.unwrap_or(Err(StorageError::Timeout)),
            };

            match result {
                Ok(object_id) => return StoreOutcome::Stored { object_id, attempts },
                Err(error) if error.is_transient() && attempts < MAX_STORE_ATTEMPTS => {
                    tracing::warn!(error = %error, attempts, "Transient store failure, retrying");
                }
                Err(error) => return StoreOutcome::Failed { error, attempts },
            }
        }
    }

    /// The checksum returned to the caller must describe exactly the stored bytes.
    async fn verify_stored(&self, object: &PutObject, checksum: &str) -> Result<(), VaultError> {
        let written = sha256_hex(&object.data);
        if !bool::from(written.as_bytes().ct_eq(checksum.as_bytes())) {
            return Err(VaultError::Integrity);
        }

        if self.verify_after_store {
            let stored = self
                .storage
                .get_object(&object.key)
                .await
                .map_err(|e| VaultError::Upload(format!("Read-back failed: {}", e)))?;
            let read_back = sha256_hex(&stored.data);
            if !bool::from(read_back.as_bytes().ct_eq(checksum.as_bytes())) {
                return Err(VaultError::Integrity);
            }
        }

        Ok(())
    }

    /// Best-effort removal of an object that will never be referenced
    async fn discard(&self, key: &str) {
        match tokio::time::timeout(CLEANUP_TIMEOUT, self.storage.delete_object(key)).await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => tracing::warn!(error = %error, "Failed to remove orphaned object"),
            Err(_) => tracing::warn!("Timed out removing orphaned object"),
        }
    }

    async fn notify(
        &self,
        request_id: Uuid,
        request: &UploadRequest,
        accepted: bool,
        reasons: Vec<String>,
        manual_review: bool,
    ) {
        let outcome = UploadOutcome {
            request_id,
            owner_id: request.owner_id.clone(),
            document_type: request.document_type,
            accepted,
            reasons,
            manual_review,
        };
        if let Err(error) = self.notifier.notify(&outcome).await {
            tracing::warn!(error = %error, accepted, "Upload outcome notification failed");
        }
    }
}

/// Lowercase hex SHA-256
pub(crate) fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
