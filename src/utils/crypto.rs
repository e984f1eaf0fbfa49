//! Symmetric encryption for secrets persisted at rest (MFA shared secrets).

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use sha2::{Digest, Sha256};

use crate::error::AuthError;

const NONCE_LEN: usize = 12;

/// AES-256-GCM cipher keyed off the engine signing secret, so a single
/// configured secret covers both token signatures and at-rest encryption.
pub struct SecretCipher {
    cipher: Aes256Gcm,
}

impl SecretCipher {
    pub fn new(master_secret: &str) -> Self {
        let digest = Sha256::digest(master_secret.as_bytes());
        let key = Key::<Aes256Gcm>::from_slice(&digest);
        Self { cipher: Aes256Gcm::new(key) }
    }

    /// Encrypts to base64(nonce || ciphertext) with a random nonce per call.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, AuthError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| AuthError::Config("secret encryption failed".into()))?;
        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(nonce.as_slice());
        blob.extend_from_slice(&ciphertext);
        Ok(B64.encode(blob))
    }

    pub fn decrypt(&self, encoded: &str) -> Result<String, AuthError> {
        let blob = B64
            .decode(encoded)
            .map_err(|_| AuthError::Config("stored secret is not valid base64".into()))?;
        if blob.len() <= NONCE_LEN {
            return Err(AuthError::Config("stored secret blob too short".into()));
        }
        let (nonce, ciphertext) = blob.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| AuthError::Config("stored secret failed authentication".into()))?;
        String::from_utf8(plaintext)
            .map_err(|_| AuthError::Config("decrypted secret is not utf-8".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let cipher = SecretCipher::new("a-sufficiently-long-master-secret-value");
        let encrypted = cipher.encrypt("JBSWY3DPEHPK3PXP").unwrap();
        assert_ne!(encrypted, "JBSWY3DPEHPK3PXP");
        assert_eq!(cipher.decrypt(&encrypted).unwrap(), "JBSWY3DPEHPK3PXP");
    }

    #[test]
    fn nonces_differ_between_calls() {
        let cipher = SecretCipher::new("a-sufficiently-long-master-secret-value");
        let a = cipher.encrypt("same").unwrap();
        let b = cipher.encrypt("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let encrypted =
            SecretCipher::new("first-master-secret-first-master-secret").encrypt("s").unwrap();
        let other = SecretCipher::new("second-master-secret-second-master-sec");
        assert!(other.decrypt(&encrypted).is_err());
    }

    #[test]
    fn tampered_blob_rejected() {
        let cipher = SecretCipher::new("a-sufficiently-long-master-secret-value");
        assert!(cipher.decrypt("not base64!!").is_err());
        assert!(cipher.decrypt(&B64.encode([0u8; 4])).is_err());
    }
}
