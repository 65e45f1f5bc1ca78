use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64_STANDARD};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Nonce length for AES-256-GCM (96 bits).
const NONCE_LEN: usize = 12;

/// FieldCipher
///
/// The Field Encryption Codec: converts designated PII string fields
/// (full names, notes, interaction comments) between plaintext and the
/// at-rest form `base64(nonce || ciphertext)` using a single process-wide
/// AES-256-GCM key derived from configuration at startup.
///
/// Two deliberate robustness contracts, both required by the data this
/// application inherits:
///
/// 1. **Construct now, fail late.** An empty key must not prevent the
///    process from starting; health checks and non-PII endpoints stay
///    available. The misconfiguration is detected (and logged) at the
///    first encrypt/decrypt call, which then passes the value through.
/// 2. **Decrypt never errors.** Rows persisted before encryption was
///    introduced, or under a different key, hold values that do not
///    decode. Returning the stored value unchanged keeps an entire
///    listing page alive instead of failing it for one legacy row.
pub struct FieldCipher {
    cipher: Option<Aes256Gcm>,
}

/// CipherState
///
/// The shared, immutable codec handle carried in the application state.
/// There is no runtime key rotation; the key is fixed for the process lifetime.
pub type CipherState = Arc<FieldCipher>;

impl FieldCipher {
    /// Builds the codec from the configured key string.
    ///
    /// The AES key is the SHA-256 digest of the configured string, so any
    /// non-empty passphrase yields a valid 256-bit key. An empty/blank key
    /// produces a codec that passes values through (see struct docs); it
    /// does NOT panic here.
    pub fn new(key: &str) -> Self {
        if key.trim().is_empty() {
            return Self { cipher: None };
        }
        let digest = Sha256::digest(key.as_bytes());
        // new_from_slice only fails on a wrong key length; the digest is
        // always 32 bytes, so treat a failure as the missing-key case.
        let cipher = Aes256Gcm::new_from_slice(&digest).ok();
        Self { cipher }
    }

    /// True when a usable key was configured.
    pub fn is_configured(&self) -> bool {
        self.cipher.is_some()
    }

    /// Encrypts a field value for persistence.
    ///
    /// A fresh random nonce is generated per call, so the same plaintext
    /// maps to different ciphertexts across calls; only the round-trip
    /// property is guaranteed. The empty string round-trips to the empty
    /// string without touching the cipher.
    pub fn encrypt(&self, plaintext: &str) -> String {
        if plaintext.is_empty() {
            return String::new();
        }
        let Some(cipher) = &self.cipher else {
            tracing::error!("field encryption key is not configured; storing value unencrypted");
            return plaintext.to_string();
        };
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        match cipher.encrypt(&nonce, plaintext.as_bytes()) {
            Ok(ciphertext) => {
                let mut combined = nonce.to_vec();
                combined.extend_from_slice(&ciphertext);
                BASE64_STANDARD.encode(&combined)
            }
            Err(e) => {
                tracing::error!("field encryption failed: {:?}", e);
                plaintext.to_string()
            }
        }
    }

    /// Decrypts a stored field value for a response DTO.
    ///
    /// Malformed base64, truncated payloads, authentication failures
    /// (wrong key) and invalid UTF-8 all fall back to returning the stored
    /// value unchanged. None of them propagate past this method.
    pub fn decrypt(&self, stored: &str) -> String {
        if stored.is_empty() {
            return String::new();
        }
        let Some(cipher) = &self.cipher else {
            tracing::error!("field encryption key is not configured; returning stored value");
            return stored.to_string();
        };

        let Ok(combined) = BASE64_STANDARD.decode(stored) else {
            tracing::debug!("stored field value is not base64; returning as-is");
            return stored.to_string();
        };
        if combined.len() <= NONCE_LEN {
            tracing::debug!("stored field value too short to carry a nonce; returning as-is");
            return stored.to_string();
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);
        match cipher.decrypt(nonce, ciphertext) {
            Ok(plaintext) => match String::from_utf8(plaintext) {
                Ok(s) => s,
                Err(_) => {
                    tracing::warn!("decrypted field value is not valid UTF-8; returning stored value");
                    stored.to_string()
                }
            },
            Err(_) => {
                // Legacy plaintext or a value written under a different key.
                tracing::debug!("field value failed to decrypt; returning stored value");
                stored.to_string()
            }
        }
    }

    /// Encrypts an optional field, preserving `None`.
    pub fn encrypt_opt(&self, plaintext: Option<&str>) -> Option<String> {
        plaintext.map(|p| self.encrypt(p))
    }

    /// Decrypts an optional field, preserving `None`.
    pub fn decrypt_opt(&self, stored: Option<&str>) -> Option<String> {
        stored.map(|s| self.decrypt(s))
    }
}
