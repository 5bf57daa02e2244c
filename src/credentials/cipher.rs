//! Per-value symmetric encryption: ChaCha20-Poly1305, envelope `enc:v1:<nonce>:<ciphertext>` (base64url).

use crate::error::AppError;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use chacha20poly1305::aead::Aead;
use chacha20poly1305::{ChaCha20Poly1305, KeyInit, Nonce};

const ENVELOPE_PREFIX: &str = "enc:v1:";
const NONCE_LEN: usize = 12;

#[derive(Clone)]
pub struct ValueCipher {
    key: [u8; 32],
}

impl std::fmt::Debug for ValueCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ValueCipher(..)")
    }
}

impl ValueCipher {
    pub fn new(key: [u8; 32]) -> Self {
        ValueCipher { key }
    }

    /// Accepts base64url (no pad) or standard base64 of exactly 32 bytes.
    pub fn from_base64(encoded: &str) -> Result<Self, AppError> {
        let encoded = encoded.trim();
        let bytes = URL_SAFE_NO_PAD
            .decode(encoded.as_bytes())
            .or_else(|_| STANDARD.decode(encoded.as_bytes()))
            .map_err(|e| AppError::Crypto(format!("encryption key is not base64: {}", e)))?;
        if bytes.len() != 32 {
            return Err(AppError::Crypto(format!(
                "encryption key must be 32 bytes, got {}",
                bytes.len()
            )));
        }
        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes);
        Ok(ValueCipher { key })
    }

    pub fn is_encrypted(value: &str) -> bool {
        value.starts_with(ENVELOPE_PREFIX)
    }

    fn aead(&self) -> Result<ChaCha20Poly1305, AppError> {
        ChaCha20Poly1305::new_from_slice(&self.key)
            .map_err(|e| AppError::Crypto(format!("failed to initialize cipher: {}", e)))
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, AppError> {
        let nonce_source = uuid::Uuid::new_v4();
        let nonce_bytes = &nonce_source.as_bytes()[..NONCE_LEN];
        let ciphertext = self
            .aead()?
            .encrypt(Nonce::from_slice(nonce_bytes), plaintext.as_bytes())
            .map_err(|e| AppError::Crypto(format!("failed to encrypt value: {}", e)))?;
        Ok(format!(
            "{}{}:{}",
            ENVELOPE_PREFIX,
            URL_SAFE_NO_PAD.encode(nonce_bytes),
            URL_SAFE_NO_PAD.encode(ciphertext)
        ))
    }

    /// Values stored before encryption was enabled come back unchanged.
    pub fn decrypt(&self, stored: &str) -> Result<String, AppError> {
        let Some(body) = stored.strip_prefix(ENVELOPE_PREFIX) else {
            return Ok(stored.to_string());
        };
        let (nonce_b64, ciphertext_b64) = body
            .split_once(':')
            .ok_or_else(|| AppError::Crypto("encrypted value envelope is invalid".into()))?;
        let nonce = URL_SAFE_NO_PAD
            .decode(nonce_b64.as_bytes())
            .map_err(|e| AppError::Crypto(format!("failed to decode nonce: {}", e)))?;
        if nonce.len() != NONCE_LEN {
            return Err(AppError::Crypto("nonce length is invalid".into()));
        }
        let ciphertext = URL_SAFE_NO_PAD
            .decode(ciphertext_b64.as_bytes())
            .map_err(|e| AppError::Crypto(format!("failed to decode ciphertext: {}", e)))?;
        let plaintext = self
            .aead()?
            .decrypt(Nonce::from_slice(&nonce), ciphertext.as_slice())
            .map_err(|e| AppError::Crypto(format!("failed to decrypt value: {}", e)))?;
        String::from_utf8(plaintext).map_err(|e| AppError::Crypto(format!("decrypted value is not utf-8: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> ValueCipher {
        ValueCipher::new([7u8; 32])
    }

    #[test]
    fn encrypts_with_fresh_nonce() {
        let c = cipher();
        let a = c.encrypt("s3cret").unwrap();
        let b = c.encrypt("s3cret").unwrap();
        assert!(ValueCipher::is_encrypted(&a));
        assert_ne!(a, b);
        assert!(!a.contains("s3cret"));
        assert_eq!(c.decrypt(&a).unwrap(), "s3cret");
    }

    #[test]
    fn wrong_key_fails() {
        let stored = cipher().encrypt("s3cret").unwrap();
        let other = ValueCipher::new([8u8; 32]);
        assert!(matches!(other.decrypt(&stored), Err(AppError::Crypto(_))));
    }

    #[test]
    fn plaintext_passes_through() {
        assert_eq!(cipher().decrypt("legacy").unwrap(), "legacy");
    }

    #[test]
    fn key_must_be_32_bytes() {
        let short = URL_SAFE_NO_PAD.encode([1u8; 16]);
        assert!(ValueCipher::from_base64(&short).is_err());
        let ok = STANDARD.encode([1u8; 32]);
        assert!(ValueCipher::from_base64(&ok).is_ok());
    }
}
