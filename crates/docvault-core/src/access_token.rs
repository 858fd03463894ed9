//! Signed, time-limited access tokens.
//!
//! Token = base64url(claims JSON) "." base64url(HMAC-SHA256(key, encoded claims)).
//! Nothing is stored server-side; a token is valid iff its signature verifies and
//! `exp >= now`.

use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::models::AccessTokenClaims;
use crate::VaultError;

type HmacSha256 = Hmac<Sha256>;

const SEPARATOR: char = '.';

/// Build a signed token for the given claims.
pub fn create(claims: &AccessTokenClaims, key: &[u8]) -> Result<String, VaultError> {
    let payload = base64_url_encode(&serde_json::to_vec(claims)?);
    let tag = sign(payload.as_bytes(), key)?;
    Ok(format!("{}{}{}", payload, SEPARATOR, base64_url_encode(&tag)))
}

/// Verify a token's signature and expiry at `now` (unix seconds).
///
/// Signature failures take precedence over expiry so that a forged token never
/// learns whether its claims would have been current.
pub fn verify(token: &str, key: &[u8], now: i64) -> Result<AccessTokenClaims, VaultError> {
    let (payload, signature) = token
        .split_once(SEPARATOR)
        .ok_or(VaultError::InvalidToken)?;
    let supplied = base64_url_decode(signature).map_err(|_| VaultError::InvalidToken)?;
    let expected = sign(payload.as_bytes(), key)?;

    // ct_eq compares every byte regardless of where the first difference is.
    if !bool::from(expected.as_slice().ct_eq(supplied.as_slice())) {
        return Err(VaultError::InvalidToken);
    }

    let decoded = base64_url_decode(payload).map_err(|_| VaultError::InvalidToken)?;
    let claims: AccessTokenClaims =
        serde_json::from_slice(&decoded).map_err(|_| VaultError::InvalidToken)?;

    if claims.expires_at < now {
        return Err(VaultError::TokenExpired);
    }

    Ok(claims)
}

fn sign(payload: &[u8], key: &[u8]) -> Result<Vec<u8>, VaultError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| VaultError::Internal(format!("Invalid token signing key: {}", e)))?;
    mac.update(payload);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn base64_url_encode(data: &[u8]) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(data)
}

fn base64_url_decode(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(s)
}
