use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use docvault_core::models::{AuditAction, AuditEvent};
use tokio::runtime::{Handle, RuntimeFlavor};

use super::{AuditError, AuditSink};

/// Emits each record as a JSON line on the `audit` tracing target
///
/// Success and pending outcomes log at INFO, failures at WARN.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
        let json = serde_json::to_string(event)?;

        if event.outcome.is_failure() {
            tracing::event!(
                target: "audit",
                tracing::Level::WARN,
                audit_entry = %json,
                action = event.action.as_str(),
                request_id = %event.request_id,
                outcome = ?event.outcome,
                "Document audit log - failure"
            );
        } else {
            tracing::event!(
                target: "audit",
                tracing::Level::INFO,
                audit_entry = %json,
                action = event.action.as_str(),
                request_id = %event.request_id,
                outcome = ?event.outcome,
                "Document audit log"
            );
        }
        Ok(())
    }
}

/// Appends one JSON object per line to a file
pub struct JsonLinesAuditSink {
    file: Mutex<File>,
}

impl JsonLinesAuditSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl AuditSink for JsonLinesAuditSink {
    fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        let write = || -> Result<(), AuditError> {
            let mut file = self
                .file
                .lock()
                .map_err(|_| AuditError::Unavailable("audit file lock poisoned".to_string()))?;
            // Single write per record keeps lines whole
            file.write_all(&line)?;
            file.flush()?;
            Ok(())
        };

        // Keep the file write off the async worker when running on a multi-thread runtime
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(write)
            }
            _ => write(),
        }
    }
}

/// Keeps records in memory; can be switched into a failing mode
#[derive(Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
    failing: std::sync::atomic::AtomicBool,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent writes fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing
            .store(failing, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn actions(&self) -> Vec<AuditAction> {
        self.events().iter().map(|e| e.action).collect()
    }

    pub fn count(&self, action: AuditAction) -> usize {
        self.events().iter().filter(|e| e.action == action).count()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
        if self.failing.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(AuditError::Unavailable("memory sink set to fail".to_string()));
        }
        self.events
            .lock()
            .map_err(|_| AuditError::Unavailable("memory sink lock poisoned".to_string()))?
            .push(event.clone());
        Ok(())
    }
}
