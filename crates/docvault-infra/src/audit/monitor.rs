use docvault_core::models::AuditEvent;

use super::AuditError;

/// External monitoring collaborator told about audit records that were lost
pub trait FailureMonitor: Send + Sync {
    fn audit_write_failed(&self, event: &AuditEvent, error: &AuditError);
}

/// Reports lost audit records at ERROR on the `monitoring` target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingFailureMonitor;

impl FailureMonitor for TracingFailureMonitor {
    fn audit_write_failed(&self, event: &AuditEvent, error: &AuditError) {
        tracing::event!(
            target: "monitoring",
            tracing::Level::ERROR,
            action = event.action.as_str(),
            request_id = %event.request_id,
            outcome = ?event.outcome,
            error = %error,
            "Audit record could not be written"
        );
    }
}
