use uuid::Uuid;
use xxhash_rust::xxh3::xxh3_64;

use crate::crypto::{EncryptionKey, EncryptionType};
use crate::error::{Error, Result};
use crate::fragment::record::MetadataRecord;
use crate::fragment::{Fragment, FragmentId};

/// Magic number identifying a metadata fragment blob.
pub const FRAGMENT_MAGIC: u64 = 0x0041_5445_4D52_5241; // "ARRMETA\0"
/// Current fragment format version.
pub const FORMAT_VERSION: u32 = 1;

const CHECKSUM_SIZE: usize = 8;

/// Fixed-size header at the start of every fragment blob.
///
/// ```text
/// ┌──────────────────────────────────────┐
/// │ Magic (8B)                           │
/// │ Format version (4B)                  │
/// │ Encryption type (1B)                 │
/// │ Start timestamp (8B)                 │
/// │ End timestamp (8B)                   │
/// │ Sequence (8B)                        │
/// │ UUID (16B)                           │
/// │ Payload length (8B)                  │
/// └──────────────────────────────────────┘
/// ```
///
/// The payload follows the header, then an xxh3-64 checksum over header and
/// payload. The payload is the plain body or, when encrypted, the sealed body.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameHeader {
    pub version: u32,
    pub encryption: EncryptionType,
    pub start_ts: u64,
    pub end_ts: u64,
    pub id: FragmentId,
    pub payload_len: u64,
}

impl FrameHeader {
    /// Size of the header in bytes (fixed).
    pub const SIZE: usize = 8 + 4 + 1 + 8 + 8 + 8 + 16 + 8; // 61 bytes

    pub fn encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&FRAGMENT_MAGIC.to_le_bytes());
        buf.extend_from_slice(&self.version.to_le_bytes());
        buf.push(self.encryption as u8);
        buf.extend_from_slice(&self.start_ts.to_le_bytes());
        buf.extend_from_slice(&self.end_ts.to_le_bytes());
        buf.extend_from_slice(&self.id.seq.to_le_bytes());
        buf.extend_from_slice(self.id.uuid.as_bytes());
        buf.extend_from_slice(&self.payload_len.to_le_bytes());
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::Corruption("fragment header too short".into()));
        }
        let magic = read_u64(data, 0);
        if magic != FRAGMENT_MAGIC {
            return Err(Error::Corruption(format!(
                "bad magic: expected {FRAGMENT_MAGIC:#x}, got {magic:#x}"
            )));
        }
        let version = u32::from_le_bytes(fixed(&data[8..12]));
        if version != FORMAT_VERSION {
            return Err(Error::Corruption(format!(
                "unsupported fragment version {version}"
            )));
        }
        let encryption = EncryptionType::from_u8(data[12])?;
        let start_ts = read_u64(data, 13);
        let end_ts = read_u64(data, 21);
        if start_ts > end_ts {
            return Err(Error::Corruption(format!(
                "fragment range [{start_ts}, {end_ts}] is inverted"
            )));
        }
        let seq = read_u64(data, 29);
        let uuid = Uuid::from_bytes(fixed(&data[37..53]));
        let payload_len = read_u64(data, 53);

        Ok(FrameHeader {
            version,
            encryption,
            start_ts,
            end_ts,
            id: FragmentId { seq, uuid },
            payload_len,
        })
    }
}

/// Serialize a fragment, sealing its body when `key` is given.
///
/// Fails with `Serialization` if any entry is not storable.
pub fn encode(fragment: &Fragment, key: Option<&EncryptionKey>) -> Result<Vec<u8>> {
    let entry_count = u32::try_from(fragment.entries.len())
        .map_err(|_| Error::Serialization("too many entries in one fragment".into()))?;

    let mut body = Vec::new();
    body.extend_from_slice(&entry_count.to_le_bytes());
    for entry in &fragment.entries {
        MetadataRecord::encode(entry, &mut body)?;
    }

    let payload = match key {
        Some(key) => key.seal(&body)?,
        None => body,
    };

    let header = FrameHeader {
        version: FORMAT_VERSION,
        encryption: EncryptionType::of(key),
        start_ts: fragment.start_ts,
        end_ts: fragment.end_ts,
        id: fragment.id,
        payload_len: payload.len() as u64,
    };

    let mut buf = Vec::with_capacity(FrameHeader::SIZE + payload.len() + CHECKSUM_SIZE);
    header.encode(&mut buf);
    buf.extend_from_slice(&payload);
    let checksum = xxh3_64(&buf);
    buf.extend_from_slice(&checksum.to_le_bytes());
    Ok(buf)
}

/// Deserialize a fragment blob.
///
/// Structure is verified before any decryption is attempted, so a failed
/// decryption is reported as a key mismatch rather than corruption.
pub fn decode(data: &[u8], key: Option<&EncryptionKey>) -> Result<Fragment> {
    let header = FrameHeader::decode(data)?;

    let payload_end = usize::try_from(header.payload_len)
        .ok()
        .and_then(|len| FrameHeader::SIZE.checked_add(len))
        .ok_or_else(|| Error::Corruption("payload length overflows".into()))?;
    if data.len() != payload_end + CHECKSUM_SIZE {
        return Err(Error::Corruption(format!(
            "fragment is {} bytes, header implies {}",
            data.len(),
            payload_end.saturating_add(CHECKSUM_SIZE)
        )));
    }

    let stored = read_u64(data, payload_end);
    let computed = xxh3_64(&data[..payload_end]);
    if stored != computed {
        return Err(Error::Corruption("fragment checksum mismatch".into()));
    }

    let payload = &data[FrameHeader::SIZE..payload_end];
    let body = match (header.encryption, key) {
        (EncryptionType::NoEncryption, None) => payload.to_vec(),
        (EncryptionType::Aes256Gcm, Some(key)) => key.open(payload)?,
        _ => return Err(Error::EncryptionKeyMismatch),
    };

    let entries = decode_body(&body)?;
    Ok(Fragment {
        start_ts: header.start_ts,
        end_ts: header.end_ts,
        id: header.id,
        entries,
    })
}

fn decode_body(body: &[u8]) -> Result<Vec<crate::types::MetadataEntry>> {
    if body.len() < 4 {
        return Err(Error::Corruption("fragment body too short".into()));
    }
    let entry_count = u32::from_le_bytes(fixed(&body[0..4])) as usize;

    let mut entries = Vec::new();
    let mut offset = 4;
    for _ in 0..entry_count {
        let (entry, consumed) = MetadataRecord::decode(&body[offset..])?;
        entries.push(entry);
        offset += consumed;
    }
    if offset != body.len() {
        return Err(Error::Corruption(format!(
            "{} trailing bytes after {entry_count} records",
            body.len() - offset
        )));
    }
    Ok(entries)
}

fn read_u64(data: &[u8], offset: usize) -> u64 {
    u64::from_le_bytes(fixed(&data[offset..offset + 8]))
}

fn fixed<const N: usize>(slice: &[u8]) -> [u8; N] {
    let mut buf = [0u8; N];
    buf.copy_from_slice(slice);
    buf
}
