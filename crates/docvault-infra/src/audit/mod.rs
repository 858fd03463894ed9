//! Audit logging
//!
//! Every upload lifecycle transition and access decision is recorded through an
//! [`AuditLogger`]. Writing a record never fails the caller's operation: a sink
//! error is handed to the [`FailureMonitor`] and the request carries on with
//! its own result.

mod monitor;
mod sinks;

use std::sync::Arc;

use docvault_core::models::AuditEvent;
use thiserror::Error;

pub use monitor::{FailureMonitor, TracingFailureMonitor};
pub use sinks::{JsonLinesAuditSink, MemoryAuditSink, TracingAuditSink};

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Audit sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Audit record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Audit sink unavailable: {0}")]
    Unavailable(String),
}

/// Destination for audit records. Appends only.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: &AuditEvent) -> Result<(), AuditError>;
}

/// Explicit audit dependency handed to the services at construction
#[derive(Clone)]
pub struct AuditLogger {
    sink: Arc<dyn AuditSink>,
    monitor: Arc<dyn FailureMonitor>,
}

impl AuditLogger {
    pub fn new(sink: Arc<dyn AuditSink>, monitor: Arc<dyn FailureMonitor>) -> Self {
        Self { sink, monitor }
    }

    /// Logger writing to the `audit` tracing target
    pub fn tracing() -> Self {
        Self::new(Arc::new(TracingAuditSink), Arc::new(TracingFailureMonitor))
    }

    /// Append `event`. Returns whether the sink accepted it.
    pub fn log_action(&self, event: AuditEvent) -> bool {
        match self.sink.record(&event) {
            Ok(()) => true,
            Err(err) => {
                self.monitor.audit_write_failed(&event, &err);
                false
            }
        }
    }
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLogger").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use docvault_core::models::AuditAction;
    use std::sync::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct RecordingMonitor {
        failures: Mutex<Vec<(AuditAction, String)>>,
    }

    impl FailureMonitor for RecordingMonitor {
        fn audit_write_failed(&self, event: &AuditEvent, error: &AuditError) {
            self.failures
                .lock()
                .unwrap()
                .push((event.action, error.to_string()));
        }
    }

    fn event(action: AuditAction) -> AuditEvent {
        AuditEvent::new(action, Uuid::new_v4(), "owner-1", Utc::now())
    }

    #[test]
    fn successful_write_skips_monitor() {
        let sink = Arc::new(MemoryAuditSink::new());
        let monitor = Arc::new(RecordingMonitor::default());
        let logger = AuditLogger::new(sink.clone(), monitor.clone());

        assert!(logger.log_action(event(AuditAction::UploadStarted)));
        assert_eq!(sink.actions(), vec![AuditAction::UploadStarted]);
        assert!(monitor.failures.lock().unwrap().is_empty());
    }

    #[test]
    fn failed_write_goes_to_monitor() {
        let sink = Arc::new(MemoryAuditSink::new());
        sink.set_failing(true);
        let monitor = Arc::new(RecordingMonitor::default());
        let logger = AuditLogger::new(sink.clone(), monitor.clone());

        assert!(!logger.log_action(event(AuditAction::StoreFailed)));
        assert!(sink.events().is_empty());
        let failures = monitor.failures.lock().unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, AuditAction::StoreFailed);
    }
}
