use std::collections::BTreeMap;

use docvault_core::models::{AuditAction, AuditEvent, AuditOutcome, DocumentType};
use docvault_core::Clock;
use docvault_infra::AuditLogger;
use serde_json::Value;
use uuid::Uuid;

/// Lifecycle of one upload call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    Started,
    Validating,
    ValidationFailed,
    Validated,
    Storing,
    StoreFailed,
    Stored,
    TokenIssued,
    Abandoned,
}

impl UploadState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UploadState::ValidationFailed
                | UploadState::StoreFailed
                | UploadState::TokenIssued
                | UploadState::Abandoned
        )
    }

    pub fn can_transition_to(&self, next: UploadState) -> bool {
        use UploadState::*;
        match (self, next) {
            (Started, Validating)
            | (Validating, ValidationFailed)
            | (Validating, Validated)
            | (Validated, Storing)
            | (Storing, StoreFailed)
            | (Storing, Stored)
            | (Stored, TokenIssued) => true,
            (from, Abandoned) => !from.is_terminal(),
            _ => false,
        }
    }
}

/// One in-flight upload. Emits exactly one audit record per transition.
///
/// Dropping a run that has not reached a terminal state records it as
/// abandoned, which covers callers that drop the upload future mid-flight.
pub(crate) struct UploadRun<'a> {
    request_id: Uuid,
    owner_id: String,
    document_type: DocumentType,
    state: UploadState,
    audit: &'a AuditLogger,
    clock: &'a dyn Clock,
}

impl<'a> UploadRun<'a> {
    /// Enter `Started`, recording `UploadStarted`
    pub(crate) fn start(
        request_id: Uuid,
        owner_id: &str,
        document_type: DocumentType,
        audit: &'a AuditLogger,
        clock: &'a dyn Clock,
        fields: BTreeMap<String, Value>,
    ) -> Self {
        let run = Self {
            request_id,
            owner_id: owner_id.to_string(),
            document_type,
            state: UploadState::Started,
            audit,
            clock,
        };
        run.emit(AuditAction::UploadStarted, AuditOutcome::Pending, fields);
        run
    }

    pub(crate) fn state(&self) -> UploadState {
        self.state
    }

    pub(crate) fn transition(
        &mut self,
        next: UploadState,
        action: AuditAction,
        outcome: AuditOutcome,
        fields: BTreeMap<String, Value>,
    ) {
        if !self.state.can_transition_to(next) {
            tracing::error!(
                request_id = %self.request_id,
                from = ?self.state,
                to = ?next,
                "Illegal upload state transition"
            );
            return;
        }
        self.state = next;
        self.emit(action, outcome, fields);
    }

    /// Move to `Abandoned` from any non-terminal state
    pub(crate) fn abandon(&mut self, reason: &str) {
        if self.state.is_terminal() {
            return;
        }
        let from = self.state;
        self.state = UploadState::Abandoned;
        self.emit(
            AuditAction::UploadAbandoned,
            AuditOutcome::Abandoned,
            fields([("reason", reason.into()), ("abandoned_in", format!("{:?}", from).into())]),
        );
    }

    fn emit(&self, action: AuditAction, outcome: AuditOutcome, fields: BTreeMap<String, Value>) {
        let event = AuditEvent::new(action, self.request_id, self.owner_id.as_str(), self.clock.now())
            .with_document_type(self.document_type)
            .with_outcome(outcome)
            .with_fields(fields);
        self.audit.log_action(event);
    }
}

impl Drop for UploadRun<'_> {
    fn drop(&mut self) {
        if !self.state.is_terminal() {
            tracing::warn!(
                request_id = %self.request_id,
                state = ?self.state,
                "Upload dropped before completion"
            );
            self.abandon("dropped");
        }
    }
}

/// Build an audit context map from key/value pairs
pub(crate) fn fields<const N: usize>(pairs: [(&str, Value); N]) -> BTreeMap<String, Value> {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}
