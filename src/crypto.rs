//! Cryptographic utilities for sealing credentials at rest and in cookies.
//!
//! Account tokens/secrets stored in the database and the pending handshake held in
//! the browser cookie are both sealed with AES-256-GCM. The output format is
//! hex(nonce (12 bytes) || ciphertext || auth_tag).

use aes_gcm::{
    aead::{generic_array::typenum::U12, Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use log::debug;
use std::env;

/// The length of the nonce in bytes (96 bits for AES-GCM)
const NONCE_LENGTH: usize = 12;

/// Environment variable holding the 32-byte key as 64 hex characters.
pub const ENCRYPTION_KEY_VAR: &str = "TOKEN_ENCRYPTION_KEY";

/// AES-256-GCM cipher bound to one key.
#[derive(Clone)]
pub struct TokenCipher {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for TokenCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TokenCipher([REDACTED])")
    }
}

impl TokenCipher {
    /// Builds a cipher from a 64-character hex key.
    ///
    /// # Returns
    ///
    /// - `Ok(TokenCipher)`: If the key decodes to exactly 32 bytes
    /// - `Err`: If the key is invalid hex or the wrong length
    pub fn from_hex(key_hex: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let key_bytes = hex::decode(key_hex.trim()).map_err(|e| {
            format!(
                "{} is not valid hex: {}. Generate a key with: openssl rand -hex 32",
                ENCRYPTION_KEY_VAR, e
            )
        })?;

        if key_bytes.len() != 32 {
            return Err(format!(
                "{} must be exactly 32 bytes (64 hex chars), got {} bytes",
                ENCRYPTION_KEY_VAR,
                key_bytes.len()
            )
            .into());
        }

        let cipher = Aes256Gcm::new_from_slice(&key_bytes)
            .map_err(|e| format!("Invalid encryption key: {}", e))?;
        Ok(Self { cipher })
    }

    /// Builds a cipher from the `TOKEN_ENCRYPTION_KEY` environment variable.
    ///
    /// Call this at startup so a missing or malformed key stops the service before
    /// any credential is handled.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let key_hex = env::var(ENCRYPTION_KEY_VAR).map_err(|_| {
            format!(
                "{} environment variable is not set. Generate a 32-byte key with: openssl rand -hex 32",
                ENCRYPTION_KEY_VAR
            )
        })?;
        let cipher = Self::from_hex(&key_hex)?;
        debug!("Token encryption configuration validated successfully");
        Ok(cipher)
    }

    /// Encrypts a value with a fresh random nonce.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        getrandom::getrandom(&mut nonce_bytes)
            .map_err(|e| format!("Failed to generate random nonce: {}", e))?;
        let nonce: Nonce<U12> = nonce_bytes.into();

        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| format!("Encryption failed: {}", e))?;

        let mut sealed = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(hex::encode(sealed))
    }

    /// Decrypts a value produced by [`TokenCipher::encrypt`].
    ///
    /// Fails when the key is wrong or the data was altered.
    pub fn decrypt(&self, sealed_hex: &str) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let sealed =
            hex::decode(sealed_hex).map_err(|e| format!("Invalid hex in sealed value: {}", e))?;

        if sealed.len() < NONCE_LENGTH {
            return Err("Sealed value is too short".into());
        }

        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LENGTH);
        let nonce_array: [u8; NONCE_LENGTH] =
            nonce_bytes.try_into().map_err(|_| "Invalid nonce length")?;
        let nonce: Nonce<U12> = nonce_array.into();

        let plaintext = self
            .cipher
            .decrypt(&nonce, ciphertext)
            .map_err(|_| "Decryption failed - wrong key or corrupted data")?;

        let value = String::from_utf8(plaintext)
            .map_err(|e| format!("Decrypted value is not valid UTF-8: {}", e))?;
        Ok(value)
    }
}
