use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use super::{SecretCipher, VaultError};

const NONCE_LEN: usize = 12;

/// AES-256-GCM with a key derived from the configured `ENCRYPTION_KEY`.
///
/// Output is `base64(nonce || ciphertext)`. Empty input maps to empty output
/// in both directions.
pub struct BuiltinCipher {
    key: Zeroizing<[u8; 32]>,
}

impl BuiltinCipher {
    pub fn new(key_material: &str) -> Self {
        let mut key = Zeroizing::new([0u8; 32]);
        key.copy_from_slice(&Sha256::digest(key_material.as_bytes()));
        Self { key }
    }

    fn cipher(&self) -> Result<Aes256Gcm, String> {
        Aes256Gcm::new_from_slice(&self.key[..]).map_err(|e| format!("invalid key length: {:?}", e))
    }
}

impl SecretCipher for BuiltinCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, VaultError> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }

        let cipher = self.cipher().map_err(VaultError::Encryption)?;
        let nonce_bytes = generate_nonce();
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|e| VaultError::Encryption(e.to_string()))?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&ciphertext);
        Ok(base64::engine::general_purpose::STANDARD.encode(blob))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, VaultError> {
        if ciphertext.is_empty() {
            return Ok(String::new());
        }

        let blob = base64::engine::general_purpose::STANDARD
            .decode(ciphertext)
            .map_err(|e| VaultError::Decryption(format!("invalid base64: {}", e)))?;
        // nonce plus the 16-byte GCM tag
        if blob.len() < NONCE_LEN + 16 {
            return Err(VaultError::Decryption("ciphertext too short".into()));
        }

        let (nonce, body) = blob.split_at(NONCE_LEN);
        let cipher = self.cipher().map_err(VaultError::Decryption)?;
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), body)
            .map_err(|_| VaultError::Decryption("authentication failed".into()))?;

        String::from_utf8(plaintext).map_err(|e| VaultError::Decryption(e.to_string()))
    }
}

fn generate_nonce() -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    nonce
}
