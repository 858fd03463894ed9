use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payload carried inside a signed access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    #[serde(rename = "rid")]
    pub request_id: Uuid,
    #[serde(rename = "sub")]
    pub owner_id: String,
    /// Unix seconds.
    #[serde(rename = "iat")]
    pub issued_at: i64,
    /// Unix seconds; the token verifies up to and including this instant.
    #[serde(rename = "exp")]
    pub expires_at: i64,
}
