#![allow(dead_code)]

pub mod fixtures;
pub mod storage;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use docvault_core::{DocVaultConfig, ManualClock, Notifier, SequenceRandom, UploadOutcome};
use docvault_infra::{AuditLogger, MemoryAuditSink, TracingFailureMonitor};
use docvault_services::{DocumentAccessService, DocumentUploadService, UploadComponents};

use storage::TestStorage;

pub const ENCRYPTION_KEY: [u8; 32] = [7u8; 32];
pub const SIGNING_KEY: [u8; 32] = [9u8; 32];
pub const PATH_SALT: &[u8] = b"vault-test-path-salt";

/// Per-attempt store timeout used by default in tests
pub const TEST_STORE_TIMEOUT: Duration = Duration::from_millis(500);

/// Everything a test needs to drive and observe the vault
pub struct TestVault {
    pub service: Arc<DocumentUploadService>,
    pub access: DocumentAccessService,
    pub audit: Arc<MemoryAuditSink>,
    pub storage: Arc<TestStorage>,
    pub clock: Arc<ManualClock>,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn test_config() -> DocVaultConfig {
    DocVaultConfig::with_keys(ENCRYPTION_KEY, SIGNING_KEY, PATH_SALT)
}

/// Vault with default configuration and the given service customisation
pub fn setup_vault_with<F>(config: DocVaultConfig, customize: F) -> TestVault
where
    F: FnOnce(DocumentUploadService) -> DocumentUploadService,
{
    let audit = Arc::new(MemoryAuditSink::new());
    let logger = AuditLogger::new(audit.clone(), Arc::new(TracingFailureMonitor));
    let storage = Arc::new(TestStorage::new());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
    ));
    let notifier = Arc::new(RecordingNotifier::default());

    let components = UploadComponents::from_config(
        &config,
        storage.clone(),
        logger.clone(),
        clock.clone(),
        Arc::new(SequenceRandom::new(1)),
    )
    .expect("components");

    let service = customize(
        DocumentUploadService::new(components)
            .with_notifier(notifier.clone())
            .with_store_timeout(TEST_STORE_TIMEOUT),
    );

    let access = DocumentAccessService::new(
        service.crypto().clone(),
        storage.clone(),
        logger,
        clock.clone(),
    );

    TestVault {
        service: Arc::new(service),
        access,
        audit,
        storage,
        clock,
        notifier,
    }
}

pub fn setup_vault() -> TestVault {
    setup_vault_with(test_config(), |service| service)
}

/// Notifier that remembers every outcome
#[derive(Default)]
pub struct RecordingNotifier {
    outcomes: Mutex<Vec<UploadOutcome>>,
}

impl RecordingNotifier {
    pub fn outcomes(&self) -> Vec<UploadOutcome> {
        self.outcomes.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, outcome: &UploadOutcome) -> Result<(), String> {
        self.outcomes.lock().unwrap().push(outcome.clone());
        Ok(())
    }
}

/// Notifier whose delivery always fails
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(&self, _outcome: &UploadOutcome) -> Result<(), String> {
        Err("mail relay unavailable".to_string())
    }
}
