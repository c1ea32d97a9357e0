use crate::crypto::{EncryptionKey, EncryptionType};
use crate::error::{Error, Result};

/// Magic number identifying an array header blob.
pub const HEADER_MAGIC: u64 = 0x0044_4145_4852_5241; // "ARRHEAD\0"
pub const HEADER_VERSION: u32 = 1;
/// File name of the header inside the array directory.
pub const HEADER_FILE: &str = "__array_header";

const KEY_CHECK_PLAINTEXT: &[u8] = b"array-metadata key check v1";

/// Written once when an array is created. Records how the array is
/// encrypted so that a wrong key is caught at open, before any fragment is
/// read, and even when the array has no fragments yet.
///
/// ```text
/// ┌────────────┬─────────────┬──────────┬───────────────┬─────────────┬──────────┐
/// │ Magic (8B) │ Version (4B)│ Enc (1B) │ Token len (4B)│ Token (var) │ CRC (4B) │
/// └────────────┴─────────────┴──────────┴───────────────┴─────────────┴──────────┘
/// ```
///
/// The token is a fixed plaintext sealed with the array key; it is empty for
/// unencrypted arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayHeader {
    pub encryption: EncryptionType,
    key_check: Vec<u8>,
}

impl ArrayHeader {
    pub fn new(key: Option<&EncryptionKey>) -> Result<Self> {
        let key_check = match key {
            Some(key) => key.seal(KEY_CHECK_PLAINTEXT)?,
            None => Vec::new(),
        };
        Ok(ArrayHeader {
            encryption: EncryptionType::of(key),
            key_check,
        })
    }

    /// Fails with `EncryptionKeyMismatch` unless `key` is the one the array
    /// was created with (or both are absent).
    pub fn verify_key(&self, key: Option<&EncryptionKey>) -> Result<()> {
        match (self.encryption, key) {
            (EncryptionType::NoEncryption, None) => Ok(()),
            (EncryptionType::Aes256Gcm, Some(key)) => {
                if key.open(&self.key_check)? == KEY_CHECK_PLAINTEXT {
                    Ok(())
                } else {
                    Err(Error::EncryptionKeyMismatch)
                }
            }
            _ => Err(Error::EncryptionKeyMismatch),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(8 + 4 + 1 + 4 + self.key_check.len() + 4);
        buf.extend_from_slice(&HEADER_MAGIC.to_le_bytes());
        buf.extend_from_slice(&HEADER_VERSION.to_le_bytes());
        buf.push(self.encryption as u8);
        buf.extend_from_slice(&(self.key_check.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.key_check);
        let crc = crc32fast::hash(&buf);
        buf.extend_from_slice(&crc.to_le_bytes());
        buf
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        const FIXED: usize = 8 + 4 + 1 + 4;
        if data.len() < FIXED + 4 {
            return Err(Error::Corruption("array header too short".into()));
        }
        let body_len = data.len() - 4;
        let stored_crc = u32::from_le_bytes(fixed(&data[body_len..]));
        if crc32fast::hash(&data[..body_len]) != stored_crc {
            return Err(Error::Corruption("array header CRC mismatch".into()));
        }

        let magic = u64::from_le_bytes(fixed(&data[0..8]));
        if magic != HEADER_MAGIC {
            return Err(Error::Corruption(format!(
                "bad header magic: expected {HEADER_MAGIC:#x}, got {magic:#x}"
            )));
        }
        let version = u32::from_le_bytes(fixed(&data[8..12]));
        if version != HEADER_VERSION {
            return Err(Error::Corruption(format!(
                "unsupported header version {version}"
            )));
        }
        let encryption = EncryptionType::from_u8(data[12])?;
        let token_len = u32::from_le_bytes(fixed(&data[13..17])) as usize;
        if FIXED + token_len != body_len {
            return Err(Error::Corruption("array header token length mismatch".into()));
        }

        Ok(ArrayHeader {
            encryption,
            key_check: data[FIXED..body_len].to_vec(),
        })
    }
}

fn fixed<const N: usize>(slice: &[u8]) -> [u8; N] {
    let mut buf = [0u8; N];
    buf.copy_from_slice(slice);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> EncryptionKey {
        EncryptionKey::new(&[byte; 32]).unwrap()
    }

    #[test]
    fn plaintext_header_accepts_only_no_key() {
        let header = ArrayHeader::decode(&ArrayHeader::new(None).unwrap().encode()).unwrap();
        assert!(header.verify_key(None).is_ok());
        assert!(matches!(
            header.verify_key(Some(&key(1))),
            Err(Error::EncryptionKeyMismatch)
        ));
    }

    #[test]
    fn encrypted_header_accepts_only_its_key() {
        let k = key(1);
        let header = ArrayHeader::decode(&ArrayHeader::new(Some(&k)).unwrap().encode()).unwrap();
        assert_eq!(header.encryption, EncryptionType::Aes256Gcm);
        assert!(header.verify_key(Some(&k)).is_ok());
        assert!(matches!(
            header.verify_key(Some(&key(2))),
            Err(Error::EncryptionKeyMismatch)
        ));
        assert!(matches!(header.verify_key(None), Err(Error::EncryptionKeyMismatch)));
    }

    #[test]
    fn corrupted_header() {
        let mut encoded = ArrayHeader::new(None).unwrap().encode();
        encoded[12] = 0x07;
        assert!(matches!(ArrayHeader::decode(&encoded), Err(Error::Corruption(_))));
    }
}
