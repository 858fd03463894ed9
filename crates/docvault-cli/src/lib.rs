//! Shared wiring for the docvault operator binary.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use base64::Engine;
use docvault_core::{DocVaultConfig, RandomSource, SystemClock, SystemRandom};
use docvault_infra::{AuditLogger, JsonLinesAuditSink, TracingFailureMonitor};
use docvault_services::{DocumentUploadService, UploadComponents};

/// Declared MIME type for a file when none is given on the command line.
pub fn guess_mime_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("pdf") => "application/pdf",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    }
}

/// Base64 of 32 fresh random bytes, the format the key variables expect.
pub fn generate_key(random: &dyn RandomSource) -> String {
    let mut key = [0u8; 32];
    random.fill(&mut key);
    base64::engine::general_purpose::STANDARD.encode(key)
}

/// Audit logger writing to `audit_log` as JSON lines, or to tracing when unset.
pub fn audit_logger(audit_log: Option<&Path>) -> anyhow::Result<AuditLogger> {
    match audit_log {
        Some(path) => {
            let sink = JsonLinesAuditSink::open(path)
                .with_context(|| format!("Failed to open audit log {}", path.display()))?;
            Ok(AuditLogger::new(
                Arc::new(sink),
                Arc::new(TracingFailureMonitor),
            ))
        }
        None => Ok(AuditLogger::tracing()),
    }
}

/// Upload service wired to the configured storage backend and system time.
pub async fn build_upload_service(
    config: &DocVaultConfig,
    audit: AuditLogger,
) -> anyhow::Result<DocumentUploadService> {
    let storage = docvault_storage::create_storage(&config.storage)
        .await
        .context("Failed to initialize storage backend")?;

    let components = UploadComponents::from_config(
        config,
        storage,
        audit,
        Arc::new(SystemClock),
        Arc::new(SystemRandom),
    )?;

    Ok(DocumentUploadService::new(components))
}
