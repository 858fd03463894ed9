//! DocVault Infrastructure Library
//!
//! Shared infrastructure used by the vault services:
//! - Audit logging (sinks and the audit-failure monitor)
//! - Telemetry initialization
//! - Client rate limiting

pub mod audit;

#[cfg(feature = "observability-basic")]
pub mod telemetry;

#[cfg(feature = "rate-limit")]
pub mod rate_limit;

// Re-export commonly used types
pub use audit::{
    AuditError, AuditLogger, AuditSink, FailureMonitor, JsonLinesAuditSink, MemoryAuditSink,
    TracingAuditSink, TracingFailureMonitor,
};

#[cfg(feature = "observability-basic")]
pub use telemetry::{init_telemetry, LogFormat};

#[cfg(feature = "rate-limit")]
pub use rate_limit::TokenBucketLimiter;
