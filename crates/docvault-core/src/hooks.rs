//! Collaborator hooks
//!
//! Trait interfaces for the systems around the vault (client throttling and
//! outcome notification). The surrounding product implements these; the no-op
//! versions are used when a collaborator is not wired in.

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::models::DocumentType;

/// Accept/reject outcome handed to the notification system
#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    pub request_id: Uuid,
    pub owner_id: String,
    pub document_type: DocumentType,
    pub accepted: bool,
    /// Caller-safe reasons when rejected
    pub reasons: Vec<String>,
    pub manual_review: bool,
}

/// Trait for informing users of upload outcomes
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, outcome: &UploadOutcome) -> Result<(), String>;
}

/// No-op implementation for when notifications are handled elsewhere
pub struct NoOpNotifier;

#[async_trait]
impl Notifier for NoOpNotifier {
    async fn notify(&self, _outcome: &UploadOutcome) -> Result<(), String> {
        Ok(())
    }
}

/// Per-client request throttling
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Returns false when the client has exhausted its allowance.
    async fn check(&self, client_id: &str) -> bool;
}

/// Rate limiter that admits every request
pub struct NoLimit;

#[async_trait]
impl RateLimiter for NoLimit {
    async fn check(&self, _client_id: &str) -> bool {
        true
    }
}
