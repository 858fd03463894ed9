use serde::{Deserialize, Serialize};

/// Output of one AEAD encryption.
///
/// Compact form: `alg.nonce.ciphertext.tag`, each segment base64url without padding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedBlob {
    pub algorithm: String,
    pub nonce: Vec<u8>,
    pub ciphertext: Vec<u8>,
    pub tag: Vec<u8>,
}
