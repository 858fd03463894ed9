use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Pointer to a stored document. Fields are read-only once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecureObjectReference {
    object_key: String,
    request_id: Uuid,
    checksum: String,
    created_at: DateTime<Utc>,
}

impl SecureObjectReference {
    pub fn new(
        object_key: String,
        request_id: Uuid,
        checksum: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            object_key,
            request_id,
            checksum,
            created_at,
        }
    }

    pub fn object_key(&self) -> &str {
        &self.object_key
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Lowercase hex SHA-256 of exactly the persisted bytes.
    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
