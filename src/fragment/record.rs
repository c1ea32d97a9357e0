use crate::error::{Error, Result};
use crate::types::{Datatype, EntryKind, MetadataEntry, MetadataValue};

/// A single operation record inside a fragment body.
///
/// On-disk format:
/// ```text
/// ┌──────────┬─────────┬──────────┬────────────┬───────────┬──────────────────────────────┐
/// │ CRC (4B) │ Len (4B)│ Kind (1B)│ Key Len(4B)│ Key (var) │ Put only: Type(1B) Count(4B) │
/// │          │         │          │            │           │           Value (var)        │
/// └──────────┴─────────┴──────────┴────────────┴───────────┴──────────────────────────────┘
/// ```
///
/// CRC covers everything after the CRC field itself. A Delete record ends
/// right after the key; trailing bytes on a Delete are rejected.
pub struct MetadataRecord;

const CRC_SIZE: usize = 4;
const LEN_SIZE: usize = 4;
const KIND_SIZE: usize = 1;
const KEY_LEN_SIZE: usize = 4;
const TYPE_SIZE: usize = 1;
const COUNT_SIZE: usize = 4;
const HEADER_SIZE: usize = CRC_SIZE + LEN_SIZE + KIND_SIZE + KEY_LEN_SIZE;

impl MetadataRecord {
    /// Serialize one entry, checking it is storable first.
    pub fn encode(entry: &MetadataEntry, buf: &mut Vec<u8>) -> Result<()> {
        if entry.key.is_empty() {
            return Err(Error::Serialization("metadata key is empty".into()));
        }
        if let Some(value) = &entry.value {
            value.validate().map_err(|msg| {
                Error::Serialization(format!(
                    "key {:?}: {msg}",
                    String::from_utf8_lossy(&entry.key)
                ))
            })?;
        }

        let key_len = u32::try_from(entry.key.len())
            .map_err(|_| Error::Serialization("metadata key too long".into()))?;
        let value_len = entry
            .value
            .as_ref()
            .map_or(0, |v| TYPE_SIZE + COUNT_SIZE + v.bytes.len());
        let payload_len = KIND_SIZE + KEY_LEN_SIZE + entry.key.len() + value_len;
        let payload_len_u32 = u32::try_from(payload_len)
            .map_err(|_| Error::Serialization("metadata record too large".into()))?;

        let start = buf.len();
        buf.reserve(CRC_SIZE + LEN_SIZE + payload_len);

        // CRC placeholder, filled once the rest is written
        buf.extend_from_slice(&[0u8; CRC_SIZE]);
        buf.extend_from_slice(&payload_len_u32.to_le_bytes());
        buf.push(entry.kind() as u8);
        buf.extend_from_slice(&key_len.to_le_bytes());
        buf.extend_from_slice(&entry.key);

        if let Some(value) = &entry.value {
            buf.push(value.datatype as u8);
            buf.extend_from_slice(&value.count.to_le_bytes());
            buf.extend_from_slice(&value.bytes);
        }

        let crc = crc32fast::hash(&buf[start + CRC_SIZE..]);
        buf[start..start + CRC_SIZE].copy_from_slice(&crc.to_le_bytes());
        Ok(())
    }

    /// Deserialize one record, returning the entry and the bytes consumed.
    pub fn decode(data: &[u8]) -> Result<(MetadataEntry, usize)> {
        if data.len() < HEADER_SIZE {
            return Err(Error::Corruption("record too short".into()));
        }

        let stored_crc = read_u32(data, 0);
        let payload_len = read_u32(data, CRC_SIZE) as usize;

        let total_len = CRC_SIZE + LEN_SIZE + payload_len;
        if data.len() < total_len || payload_len < KIND_SIZE + KEY_LEN_SIZE {
            return Err(Error::Corruption("record truncated".into()));
        }

        let computed_crc = crc32fast::hash(&data[CRC_SIZE..total_len]);
        if stored_crc != computed_crc {
            return Err(Error::Corruption("record CRC mismatch".into()));
        }

        let mut offset = CRC_SIZE + LEN_SIZE;
        let kind = EntryKind::from_u8(data[offset])?;
        offset += KIND_SIZE;

        let key_len = read_u32(data, offset) as usize;
        offset += KEY_LEN_SIZE;
        if key_len == 0 {
            return Err(Error::Corruption("record has an empty key".into()));
        }
        if offset + key_len > total_len {
            return Err(Error::Corruption("key length exceeds record".into()));
        }
        let key = data[offset..offset + key_len].to_vec();
        offset += key_len;

        let entry = match kind {
            EntryKind::Delete => {
                if offset != total_len {
                    return Err(Error::Corruption("tombstone carries a payload".into()));
                }
                MetadataEntry::delete(key)
            }
            EntryKind::Put => {
                if offset + TYPE_SIZE + COUNT_SIZE > total_len {
                    return Err(Error::Corruption("value header exceeds record".into()));
                }
                let datatype = Datatype::from_u8(data[offset])?;
                offset += TYPE_SIZE;
                let count = read_u32(data, offset);
                offset += COUNT_SIZE;
                let value = MetadataValue {
                    datatype,
                    count,
                    bytes: data[offset..total_len].to_vec(),
                };
                value.validate().map_err(Error::Corruption)?;
                MetadataEntry::put(key, value)
            }
        };

        Ok((entry, total_len))
    }
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&data[offset..offset + 4]);
    u32::from_le_bytes(buf)
}
