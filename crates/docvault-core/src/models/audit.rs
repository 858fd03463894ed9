//! Audit record model
//!
//! Records are append-only. They carry identifiers, outcomes and caller-safe
//! context only: never file bytes, token strings or key material.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::DocumentType;

/// Lifecycle transition or access decision being recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    UploadStarted,
    ValidationStarted,
    ValidationPassed,
    ValidationFailed,
    SecurityRejected,
    StoreStarted,
    StoreSucceeded,
    StoreFailed,
    UploadSucceeded,
    UploadAbandoned,
    /// Throttled before the upload state machine was entered
    UploadRejected,
    DocumentAccessed,
    AccessDenied,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::UploadStarted => "upload_started",
            AuditAction::ValidationStarted => "validation_started",
            AuditAction::ValidationPassed => "validation_passed",
            AuditAction::ValidationFailed => "validation_failed",
            AuditAction::SecurityRejected => "security_rejected",
            AuditAction::StoreStarted => "store_started",
            AuditAction::StoreSucceeded => "store_succeeded",
            AuditAction::StoreFailed => "store_failed",
            AuditAction::UploadSucceeded => "upload_succeeded",
            AuditAction::UploadAbandoned => "upload_abandoned",
            AuditAction::UploadRejected => "upload_rejected",
            AuditAction::DocumentAccessed => "document_accessed",
            AuditAction::AccessDenied => "access_denied",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Pending,
    Success,
    Rejected,
    Failure,
    Abandoned,
}

impl AuditOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            AuditOutcome::Rejected | AuditOutcome::Failure | AuditOutcome::Abandoned
        )
    }
}

/// Structured audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub action: AuditAction,
    pub request_id: Uuid,
    pub owner_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_type: Option<DocumentType>,
    pub timestamp: DateTime<Utc>,
    pub outcome: AuditOutcome,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, serde_json::Value>,
}

impl AuditEvent {
    /// Create a new pending record
    pub fn new(
        action: AuditAction,
        request_id: Uuid,
        owner_id: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            action,
            request_id,
            owner_id: owner_id.into(),
            document_type: None,
            timestamp,
            outcome: AuditOutcome::Pending,
            context: BTreeMap::new(),
        }
    }

    pub fn with_document_type(mut self, document_type: DocumentType) -> Self {
        self.document_type = Some(document_type);
        self
    }

    pub fn with_outcome(mut self, outcome: AuditOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    /// Attach a contextual field
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn with_fields(mut self, fields: BTreeMap<String, serde_json::Value>) -> Self {
        self.context.extend(fields);
        self
    }
}
