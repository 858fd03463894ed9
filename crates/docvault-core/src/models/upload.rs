use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{DocumentType, ReviewFlag, SecureObjectReference};

/// Client metadata attached to an upload request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestContext {
    /// Identifier used for per-client throttling (API client, session, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

/// A single document upload. Lives for the duration of one call.
#[derive(Clone)]
pub struct UploadRequest {
    pub data: Bytes,
    pub declared_mime_type: String,
    pub original_filename: String,
    pub document_type: DocumentType,
    pub owner_id: String,
    /// Sensitive caller metadata; encrypted before it leaves the process.
    pub metadata: BTreeMap<String, String>,
    pub context: RequestContext,
}

impl UploadRequest {
    pub fn new(
        data: impl Into<Bytes>,
        declared_mime_type: impl Into<String>,
        original_filename: impl Into<String>,
        document_type: DocumentType,
        owner_id: impl Into<String>,
    ) -> Self {
        Self {
            data: data.into(),
            declared_mime_type: declared_mime_type.into(),
            original_filename: original_filename.into(),
            document_type,
            owner_id: owner_id.into(),
            metadata: BTreeMap::new(),
            context: RequestContext::default(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }
}

// File content and metadata values stay out of debug output.
impl fmt::Debug for UploadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadRequest")
            .field("size_bytes", &self.data.len())
            .field("declared_mime_type", &self.declared_mime_type)
            .field("original_filename", &self.original_filename)
            .field("document_type", &self.document_type)
            .field("metadata_keys", &self.metadata.keys().collect::<Vec<_>>())
            .field("context", &self.context)
            .finish()
    }
}

/// Successful upload result returned to the surrounding product.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    pub request_id: Uuid,
    pub object_key: String,
    pub file_name: String,
    pub file_size: u64,
    pub uploaded_at: DateTime<Utc>,
    pub access_token: String,
    /// Lowercase hex SHA-256 of the stored bytes.
    pub checksum: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub review_flags: Vec<ReviewFlag>,
}

impl UploadReceipt {
    /// The immutable reference to persist alongside the owner's record.
    pub fn reference(&self) -> SecureObjectReference {
        SecureObjectReference::new(
            self.object_key.clone(),
            self.request_id,
            self.checksum.clone(),
            self.uploaded_at,
        )
    }
}
