pub mod builtin;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Malformed, truncated or tampered ciphertext.
    #[error("decryption failed: {0}")]
    Decryption(String),
}

/// Symmetric encryption for secrets persisted alongside storage records
/// (e.g. S3 secret access keys).
pub trait SecretCipher: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<String, VaultError>;

    fn decrypt(&self, ciphertext: &str) -> Result<String, VaultError>;
}
