use aes_gcm::aead::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// Bytes of entropy in an issued secret.
pub const SECRET_BYTES: usize = 32;

/// Generate a fresh opaque secret: 32 random bytes, hex-encoded.
pub fn generate_secret() -> Zeroizing<String> {
    let mut bytes = Zeroizing::new([0u8; SECRET_BYTES]);
    OsRng.fill_bytes(&mut bytes[..]);
    Zeroizing::new(hex::encode(&bytes[..]))
}

/// One-way digest stored in place of the secret (lowercase hex SHA-256).
pub fn hash_secret(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_is_fixed_width_hex() {
        let secret = generate_secret();
        assert_eq!(secret.len(), SECRET_BYTES * 2);
        assert!(secret.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_secrets_do_not_repeat() {
        assert_ne!(*generate_secret(), *generate_secret());
    }

    #[test]
    fn test_hash_is_stable_and_not_the_secret() {
        let secret = generate_secret();
        let h1 = hash_secret(&secret);
        assert_eq!(h1, hash_secret(&secret));
        assert_eq!(h1.len(), 64);
        assert_ne!(h1, *secret);
        // known vector
        assert_eq!(
            hash_secret("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
