//! AES-256-GCM sealing for fragment payloads and the array key-check token.
//!
//! Sealed layout: `nonce (12B) || ciphertext || tag (16B)`. A fresh random
//! nonce is drawn for every seal.

use std::fmt;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::RngCore;

use crate::error::{Error, Result};

/// AES-GCM nonce length in bytes (96 bits).
pub const NONCE_LEN: usize = 12;
/// AES-GCM authentication tag length.
pub const TAG_LEN: usize = 16;
/// AES-256 key length.
pub const KEY_LEN: usize = 32;

/// How a blob's payload is protected. Stored as one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionType {
    NoEncryption = 0x00,
    Aes256Gcm = 0x01,
}

impl EncryptionType {
    pub fn from_u8(byte: u8) -> Result<Self> {
        match byte {
            0x00 => Ok(EncryptionType::NoEncryption),
            0x01 => Ok(EncryptionType::Aes256Gcm),
            _ => Err(Error::Corruption(format!("invalid encryption type: {byte}"))),
        }
    }

    pub(crate) fn of(key: Option<&EncryptionKey>) -> Self {
        match key {
            Some(_) => EncryptionType::Aes256Gcm,
            None => EncryptionType::NoEncryption,
        }
    }
}

/// A 256-bit array encryption key.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey([u8; KEY_LEN]);

impl EncryptionKey {
    /// Wrap raw key material. Must be exactly 32 bytes.
    pub fn new(bytes: &[u8]) -> Result<Self> {
        let key: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
            Error::InvalidArgument(format!(
                "AES-256-GCM key must be {KEY_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(EncryptionKey(key))
    }

    fn cipher(&self) -> Result<Aes256Gcm> {
        Aes256Gcm::new_from_slice(&self.0)
            .map_err(|e| Error::InvalidArgument(format!("AES key init failed: {e}")))
    }

    /// Encrypt `plaintext` under a fresh random nonce.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);

        let ciphertext = self
            .cipher()?
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|e| Error::Serialization(format!("encryption failed: {e}")))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Decrypt a blob produced by [`seal`](Self::seal).
    ///
    /// An authentication failure means the blob was sealed with another key.
    pub fn open(&self, sealed: &[u8]) -> Result<Vec<u8>> {
        if sealed.len() < NONCE_LEN + TAG_LEN {
            return Err(Error::Corruption("sealed payload too short".into()));
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        self.cipher()?
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| Error::EncryptionKeyMismatch)
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey(..)")
    }
}
