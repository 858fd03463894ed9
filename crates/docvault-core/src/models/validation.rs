use bytes::Bytes;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Non-fatal observation that routes a document to manual review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReviewFlag {
    /// Archive magic bytes were found inside the content.
    EmbeddedArchive { format: String },
    /// None of the expected certificate phrases were found.
    LowConfidenceDocumentType,
    /// Most recent date in the document is older than the configured age threshold.
    StaleDocument { latest_date: NaiveDate },
}

impl ReviewFlag {
    pub fn label(&self) -> &'static str {
        match self {
            ReviewFlag::EmbeddedArchive { .. } => "embedded_archive",
            ReviewFlag::LowConfidenceDocumentType => "low_confidence_document_type",
            ReviewFlag::StaleDocument { .. } => "stale_document",
        }
    }
}

/// Outcome of validating one file.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// Caller-safe rejection reasons; empty when accepted.
    pub errors: Vec<String>,
    /// The accepted bytes, present only when `errors` is empty.
    pub sanitized: Option<Bytes>,
    pub flags: Vec<ReviewFlag>,
    /// Declared MIME type, lowercased and stripped of parameters.
    pub normalized_mime_type: String,
}

impl ValidationResult {
    pub fn is_accepted(&self) -> bool {
        self.errors.is_empty() && self.sanitized.is_some()
    }

    pub fn requires_manual_review(&self) -> bool {
        !self.flags.is_empty()
    }
}
