#[path = "helpers/mod.rs"]
mod helpers;

use std::sync::Arc;
use std::time::Duration;

use docvault_core::constants::MB;
use docvault_core::models::{AuditAction, AuditOutcome, DocumentType, ReviewFlag};
use docvault_core::{ErrorMetadata, VaultError};
use docvault_infra::TokenBucketLimiter;
use docvault_services::METADATA_ENCRYPTED;
use docvault_storage::StorageError;
use helpers::fixtures::*;
use helpers::storage::stored_bytes;
use helpers::{setup_vault, setup_vault_with, test_config, FailingNotifier};
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_valid_pdf_is_stored_and_token_issued() {
    let vault = setup_vault();
    let data = pdf_of_size(2 * MB);
    let expected_checksum = hex::encode(Sha256::digest(&data));

    let receipt = vault
        .service
        .upload_document(pdf_request(data.clone(), DocumentType::Identity))
        .await
        .expect("upload should succeed");

    assert!(!receipt.access_token.is_empty());
    assert!(receipt.object_key.starts_with("documents/"));
    assert!(receipt.object_key.contains("/identity/"));
    assert!(!receipt.object_key.contains(OWNER));
    assert_eq!(receipt.checksum, expected_checksum);
    assert_eq!(receipt.file_size, (2 * MB) as u64);
    assert_eq!(receipt.file_name, "scan.pdf");
    assert!(receipt.review_flags.is_empty());

    // Exactly the validated bytes were persisted, once
    assert_eq!(vault.storage.put_calls(), 1);
    assert_eq!(stored_bytes(&vault.storage, &receipt.object_key), Some(data));

    let claims = vault
        .service
        .crypto()
        .verify_access_token(&receipt.access_token)
        .unwrap();
    assert_eq!(claims.request_id, receipt.request_id);
    assert_eq!(claims.owner_id, OWNER);
    assert_eq!(claims.expires_at - claims.issued_at, 1800);
}

#[tokio::test]
async fn test_one_audit_event_per_transition() {
    let vault = setup_vault();
    let receipt = vault.service.upload_document(identity_pdf()).await.unwrap();

    assert_eq!(
        vault.audit.actions(),
        vec![
            AuditAction::UploadStarted,
            AuditAction::ValidationStarted,
            AuditAction::ValidationPassed,
            AuditAction::StoreStarted,
            AuditAction::StoreSucceeded,
            AuditAction::UploadSucceeded,
        ]
    );
    let events = vault.audit.events();
    assert!(events.iter().all(|e| e.request_id == receipt.request_id));
    assert!(events
        .iter()
        .all(|e| e.document_type == Some(DocumentType::Identity)));
    assert_eq!(events.last().unwrap().outcome, AuditOutcome::Success);

    let outcomes = vault.notifier.outcomes();
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].accepted);
}

#[tokio::test]
async fn test_oversized_file_is_rejected_before_store() {
    let vault = setup_vault();
    let data = pdf_of_size(20 * MB);

    let err = vault
        .service
        .upload_document(pdf_request(data, DocumentType::Identity))
        .await
        .unwrap_err();

    match err {
        VaultError::Validation { ref reasons } => {
            assert!(reasons.iter().any(|r| r.contains("too large")));
        }
        other => panic!("expected validation error, got {:?}", other),
    }
    assert_eq!(vault.storage.put_calls(), 0);
    assert_eq!(vault.audit.count(AuditAction::UploadSucceeded), 0);
    assert_eq!(vault.audit.count(AuditAction::ValidationFailed), 1);

    let outcomes = vault.notifier.outcomes();
    assert!(!outcomes[0].accepted);
    assert_eq!(outcomes[0].reasons, err.client_messages());
}

#[tokio::test]
async fn test_background_check_allows_larger_files() {
    let vault = setup_vault();
    let mut body = b"%PDF-1.4\nDisclosure and Barring Service certificate\n".to_vec();
    body.resize(14 * MB, b' ');

    let receipt = vault
        .service
        .upload_document(pdf_request(body.into(), DocumentType::BackgroundCheck))
        .await
        .unwrap();
    assert!(receipt.review_flags.is_empty());
}

#[tokio::test]
async fn test_script_marker_is_security_error_without_detail() {
    let vault = setup_vault();
    let data = pdf_with_text("<script>alert('owned')</script>");

    let err = vault
        .service
        .upload_document(pdf_request(data, DocumentType::Identity))
        .await
        .unwrap_err();

    assert!(matches!(err, VaultError::Security));
    assert_eq!(err.to_response().messages, vec!["Content rejected".to_string()]);
    assert_eq!(vault.storage.put_calls(), 0);
    assert_eq!(vault.audit.count(AuditAction::SecurityRejected), 1);
    assert_eq!(vault.audit.count(AuditAction::UploadSucceeded), 0);

    let rejected = vault
        .audit
        .events()
        .into_iter()
        .find(|e| e.action == AuditAction::SecurityRejected)
        .unwrap();
    assert!(rejected.outcome.is_failure());

    let serialized = serde_json::to_string(&vault.audit.events()).unwrap();
    assert!(!serialized.contains("<script>"));
    assert!(!serialized.contains("owned"));
}

#[tokio::test]
async fn test_signature_mismatch_is_validation_error() {
    let vault = setup_vault();
    let request = pdf_request(minimal_png(), DocumentType::AddressProof);

    let err = vault.service.upload_document(request).await.unwrap_err();
    assert!(matches!(err, VaultError::Validation { .. }));
    assert_eq!(vault.storage.put_calls(), 0);
}

#[tokio::test]
async fn test_images_are_accepted() {
    let vault = setup_vault();
    let png = docvault_core::models::UploadRequest::new(
        minimal_png(),
        "image/png",
        "front.png",
        DocumentType::Identity,
        OWNER,
    );
    let jpeg = docvault_core::models::UploadRequest::new(
        minimal_jpeg(),
        "image/jpeg",
        "utility bill.jpg",
        DocumentType::AddressProof,
        OWNER,
    );

    vault.service.upload_document(png).await.unwrap();
    let receipt = vault.service.upload_document(jpeg).await.unwrap();
    assert_eq!(receipt.file_name, "utility_bill.jpg");
}

#[tokio::test]
async fn test_empty_file_is_rejected() {
    let vault = setup_vault();
    let err = vault
        .service
        .upload_document(pdf_request(bytes::Bytes::new(), DocumentType::Identity))
        .await
        .unwrap_err();
    assert_eq!(err.client_messages(), vec!["File is empty".to_string()]);
}

#[tokio::test]
async fn test_transient_store_failure_is_retried_once() {
    let vault = setup_vault();
    vault
        .storage
        .fail_next(StorageError::BackendError("503 Slow Down".to_string()));

    let receipt = vault.service.upload_document(identity_pdf()).await.unwrap();

    assert_eq!(vault.storage.put_calls(), 2);
    let keys = vault.storage.put_keys();
    assert_eq!(keys[0], keys[1]);
    assert_eq!(keys[0], receipt.object_key);

    assert_eq!(vault.audit.count(AuditAction::StoreStarted), 1);
    assert_eq!(vault.audit.count(AuditAction::StoreSucceeded), 1);
    assert_eq!(vault.audit.count(AuditAction::UploadSucceeded), 1);
    let stored = vault
        .audit
        .events()
        .into_iter()
        .find(|e| e.action == AuditAction::StoreSucceeded)
        .unwrap();
    assert_eq!(stored.context["attempts"], 2);
}

#[tokio::test]
async fn test_store_failure_after_retry_is_upload_error() {
    let vault = setup_vault();
    vault
        .storage
        .fail_next(StorageError::UploadFailed("connection reset".to_string()));
    vault
        .storage
        .fail_next(StorageError::UploadFailed("connection reset".to_string()));

    let err = vault
        .service
        .upload_document(identity_pdf())
        .await
        .unwrap_err();

    assert!(matches!(err, VaultError::Upload(_)));
    assert!(err
        .to_response()
        .messages
        .iter()
        .all(|m| !m.contains("connection reset")));
    assert_eq!(vault.storage.put_calls(), 2);
    assert_eq!(vault.audit.count(AuditAction::StoreFailed), 1);
    assert_eq!(vault.audit.count(AuditAction::UploadSucceeded), 0);
    assert_eq!(vault.audit.count(AuditAction::UploadAbandoned), 0);
}

#[tokio::test]
async fn test_permanent_store_failure_is_not_retried() {
    let vault = setup_vault();
    vault
        .storage
        .fail_next(StorageError::ConfigError("bucket missing".to_string()));

    let err = vault
        .service
        .upload_document(identity_pdf())
        .await
        .unwrap_err();

    assert!(matches!(err, VaultError::Upload(_)));
    assert_eq!(vault.storage.put_calls(), 1);
}

#[tokio::test]
async fn test_store_timeout_counts_as_transient() {
    let vault = setup_vault_with(test_config(), |service| {
        service.with_store_timeout(Duration::from_millis(30))
    });
    vault.storage.set_latency(Duration::from_millis(300));

    let err = vault
        .service
        .upload_document(identity_pdf())
        .await
        .unwrap_err();

    assert!(matches!(err, VaultError::Upload(_)));
    assert_eq!(vault.storage.put_calls(), 2);
    assert!(vault.storage.inner.is_empty());
}

#[tokio::test]
async fn test_cancellation_during_store_abandons_upload() {
    let vault = setup_vault();
    vault.storage.set_latency(Duration::from_secs(5));
    let cancel = CancellationToken::new();

    let service = vault.service.clone();
    let token = cancel.clone();
    let upload = tokio::spawn(async move {
        service
            .upload_document_cancellable(identity_pdf(), token)
            .await
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();

    let err = upload.await.unwrap().unwrap_err();
    assert!(matches!(err, VaultError::Abandoned));
    assert_eq!(vault.audit.count(AuditAction::UploadSucceeded), 0);
    assert_eq!(
        vault.audit.actions().last(),
        Some(&AuditAction::UploadAbandoned)
    );
    assert!(vault.storage.inner.is_empty());
}

#[tokio::test]
async fn test_pre_cancelled_upload_never_reaches_store() {
    let vault = setup_vault();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = vault
        .service
        .upload_document_cancellable(identity_pdf(), cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, VaultError::Abandoned));
    assert_eq!(vault.storage.put_calls(), 0);
    assert_eq!(
        vault.audit.actions(),
        vec![AuditAction::UploadStarted, AuditAction::UploadAbandoned]
    );
}

#[tokio::test]
async fn test_dropped_upload_is_recorded_as_abandoned() {
    let vault = setup_vault();
    vault.storage.set_latency(Duration::from_secs(5));

    let result = tokio::time::timeout(
        Duration::from_millis(50),
        vault.service.upload_document(identity_pdf()),
    )
    .await;

    assert!(result.is_err());
    assert_eq!(vault.audit.count(AuditAction::UploadAbandoned), 1);
    assert_eq!(vault.audit.count(AuditAction::UploadSucceeded), 0);
    let abandoned = vault.audit.events().pop().unwrap();
    assert_eq!(abandoned.context["abandoned_in"], "Storing");
}

#[tokio::test]
async fn test_concurrent_uploads_get_distinct_keys() {
    let vault = setup_vault();

    let uploads = (0..50).map(|_| {
        let service = vault.service.clone();
        tokio::spawn(async move { service.upload_document(identity_pdf()).await })
    });
    let receipts: Vec<_> = futures::future::join_all(uploads)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    let keys: std::collections::HashSet<_> =
        receipts.iter().map(|r| r.object_key.clone()).collect();
    let request_ids: std::collections::HashSet<_> =
        receipts.iter().map(|r| r.request_id).collect();
    assert_eq!(keys.len(), 50);
    assert_eq!(request_ids.len(), 50);
    assert_eq!(vault.storage.inner.len(), 50);
    assert_eq!(vault.audit.count(AuditAction::UploadSucceeded), 50);
}

#[tokio::test]
async fn test_rate_limited_client_is_rejected() {
    let vault = setup_vault_with(test_config(), |service| {
        service.with_rate_limiter(Arc::new(TokenBucketLimiter::new(1, 0.0)))
    });

    vault
        .service
        .upload_document(with_client(identity_pdf(), "client-1"))
        .await
        .unwrap();
    let err = vault
        .service
        .upload_document(with_client(identity_pdf(), "client-1"))
        .await
        .unwrap_err();

    assert!(matches!(err, VaultError::RateLimited));
    assert_eq!(vault.audit.count(AuditAction::UploadRejected), 1);
    assert_eq!(vault.audit.count(AuditAction::UploadStarted), 1);
    assert_eq!(vault.storage.put_calls(), 1);

    // Another client still has its own allowance
    vault
        .service
        .upload_document(with_client(identity_pdf(), "client-2"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_request_metadata_is_encrypted_at_rest() {
    let vault = setup_vault();
    let request = identity_pdf().with_metadata("passport_number", "P1234567");

    let receipt = vault.service.upload_document(request).await.unwrap();

    let object = vault.storage.inner.object(&receipt.object_key).unwrap();
    let encoded = object.metadata.get(METADATA_ENCRYPTED).unwrap();
    assert!(!encoded.contains("P1234567"));

    let blob = docvault_core::models::EncryptedBlob::decode(encoded).unwrap();
    let metadata = vault.service.crypto().decrypt_metadata(&blob).unwrap();
    assert_eq!(metadata.get("passport_number").map(String::as_str), Some("P1234567"));

    let serialized = serde_json::to_string(&vault.audit.events()).unwrap();
    assert!(!serialized.contains("P1234567"));
    assert!(!serialized.contains(&receipt.access_token));
}

#[tokio::test]
async fn test_review_flags_route_to_manual_review() {
    let vault = setup_vault();
    let request = pdf_request(
        pdf_with_text("Scanned letter dated 02/01/2015"),
        DocumentType::BackgroundCheck,
    );

    let receipt = vault.service.upload_document(request).await.unwrap();

    assert!(receipt
        .review_flags
        .contains(&ReviewFlag::LowConfidenceDocumentType));
    assert!(receipt
        .review_flags
        .iter()
        .any(|f| matches!(f, ReviewFlag::StaleDocument { .. })));

    let object = vault.storage.inner.object(&receipt.object_key).unwrap();
    assert_eq!(object.tags.get("review").map(String::as_str), Some("manual"));
    assert!(vault.notifier.outcomes()[0].manual_review);
}

#[tokio::test]
async fn test_audit_failure_does_not_fail_upload() {
    let vault = setup_vault();
    vault.audit.set_failing(true);

    let receipt = vault.service.upload_document(identity_pdf()).await;
    assert!(receipt.is_ok());
}

#[tokio::test]
async fn test_audit_failure_does_not_mask_original_error() {
    let vault = setup_vault();
    vault.audit.set_failing(true);

    let err = vault
        .service
        .upload_document(pdf_request(pdf_of_size(20 * MB), DocumentType::Identity))
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::Validation { .. }));
}

#[tokio::test]
async fn test_notifier_failure_does_not_fail_upload() {
    let vault = setup_vault_with(test_config(), |service| {
        service.with_notifier(Arc::new(FailingNotifier))
    });
    assert!(vault.service.upload_document(identity_pdf()).await.is_ok());
}

#[tokio::test]
async fn test_read_back_mismatch_is_integrity_error() {
    let vault = setup_vault_with(test_config(), |service| {
        service.with_read_back_verification(true)
    });
    vault.storage.corrupt_writes();

    let err = vault
        .service
        .upload_document(identity_pdf())
        .await
        .unwrap_err();

    assert!(matches!(err, VaultError::Integrity));
    assert!(vault.storage.inner.is_empty());
    assert_eq!(vault.audit.count(AuditAction::StoreFailed), 1);
    assert_eq!(vault.audit.count(AuditAction::UploadSucceeded), 0);
}
