use crate::error::{Error, Result};

/// Raw metadata key bytes. Never decoded; multi-byte UTF-8 is kept verbatim.
pub type Key = Vec<u8>;

/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;

/// Element type of a metadata value.
///
/// The discriminant is the one-byte code written to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Datatype {
    Int8 = 0x01,
    Int16 = 0x02,
    Int32 = 0x03,
    Int64 = 0x04,
    UInt8 = 0x05,
    UInt16 = 0x06,
    UInt32 = 0x07,
    UInt64 = 0x08,
    Float32 = 0x09,
    Float64 = 0x0A,
    Char = 0x0B,
    StringAscii = 0x0C,
    StringUtf8 = 0x0D,
    Blob = 0x0E,
    /// Wildcard. Valid in type queries, never storable.
    Any = 0xFF,
}

impl Datatype {
    /// Size in bytes of one element.
    pub fn size(self) -> usize {
        match self {
            Datatype::Int8
            | Datatype::UInt8
            | Datatype::Char
            | Datatype::StringAscii
            | Datatype::StringUtf8
            | Datatype::Blob
            | Datatype::Any => 1,
            Datatype::Int16 | Datatype::UInt16 => 2,
            Datatype::Int32 | Datatype::UInt32 | Datatype::Float32 => 4,
            Datatype::Int64 | Datatype::UInt64 | Datatype::Float64 => 8,
        }
    }

    pub fn from_u8(byte: u8) -> Result<Self> {
        Ok(match byte {
            0x01 => Datatype::Int8,
            0x02 => Datatype::Int16,
            0x03 => Datatype::Int32,
            0x04 => Datatype::Int64,
            0x05 => Datatype::UInt8,
            0x06 => Datatype::UInt16,
            0x07 => Datatype::UInt32,
            0x08 => Datatype::UInt64,
            0x09 => Datatype::Float32,
            0x0A => Datatype::Float64,
            0x0B => Datatype::Char,
            0x0C => Datatype::StringAscii,
            0x0D => Datatype::StringUtf8,
            0x0E => Datatype::Blob,
            0xFF => Datatype::Any,
            _ => return Err(Error::Corruption(format!("invalid datatype code: {byte:#x}"))),
        })
    }
}

/// A fixed-width element that can be packed into a metadata payload.
pub trait Element: Copy {
    const DATATYPE: Datatype;

    fn write_le(self, out: &mut Vec<u8>);
    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_element {
    ($($ty:ty => $dt:expr),* $(,)?) => {
        $(
            impl Element for $ty {
                const DATATYPE: Datatype = $dt;

                fn write_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                fn read_le(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$ty>()];
                    buf.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(buf)
                }
            }
        )*
    };
}

impl_element!(
    i8 => Datatype::Int8,
    i16 => Datatype::Int16,
    i32 => Datatype::Int32,
    i64 => Datatype::Int64,
    u8 => Datatype::UInt8,
    u16 => Datatype::UInt16,
    u32 => Datatype::UInt32,
    u64 => Datatype::UInt64,
    f32 => Datatype::Float32,
    f64 => Datatype::Float64,
);

/// Distinguishes puts from deletes inside a fragment.
/// A Delete is a tombstone: it suppresses older values for the key during merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Put = 0x01,
    Delete = 0x02,
}

impl EntryKind {
    pub fn from_u8(byte: u8) -> Result<Self> {
        match byte {
            0x01 => Ok(EntryKind::Put),
            0x02 => Ok(EntryKind::Delete),
            _ => Err(Error::Corruption(format!("invalid entry kind: {byte}"))),
        }
    }
}

/// One stored metadata item: a typed vector of `count` elements.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataValue {
    pub datatype: Datatype,
    pub count: u32,
    pub bytes: Vec<u8>,
}

impl MetadataValue {
    /// Build a value from raw parts, checking the storage invariants.
    pub fn new(datatype: Datatype, count: u32, bytes: Vec<u8>) -> Result<Self> {
        let value = MetadataValue {
            datatype,
            count,
            bytes,
        };
        value.validate().map_err(Error::InvalidArgument)?;
        Ok(value)
    }

    /// Pack a slice of fixed-width elements.
    pub fn from_slice<T: Element>(values: &[T]) -> Result<Self> {
        let mut bytes = Vec::with_capacity(values.len() * T::DATATYPE.size());
        for v in values {
            v.write_le(&mut bytes);
        }
        let count = u32::try_from(values.len())
            .map_err(|_| Error::InvalidArgument("too many elements".into()))?;
        Self::new(T::DATATYPE, count, bytes)
    }

    /// Unpack the payload as `T`. Returns None if `T` does not match the stored type.
    pub fn to_vec<T: Element>(&self) -> Option<Vec<T>> {
        if T::DATATYPE != self.datatype {
            return None;
        }
        Some(
            self.bytes
                .chunks_exact(self.datatype.size())
                .map(T::read_le)
                .collect(),
        )
    }

    /// Checks that the value is storable. The error string names the violation.
    pub(crate) fn validate(&self) -> std::result::Result<(), String> {
        if self.datatype == Datatype::Any {
            return Err("datatype ANY cannot be stored".into());
        }
        if self.count == 0 {
            return Err("value count must be at least 1".into());
        }
        let expected = self.count as usize * self.datatype.size();
        if self.bytes.len() != expected {
            return Err(format!(
                "payload is {} bytes, expected {} ({} x {:?})",
                self.bytes.len(),
                expected,
                self.count,
                self.datatype
            ));
        }
        Ok(())
    }
}

/// One operation inside a fragment. `value` is None for tombstones.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataEntry {
    pub key: Key,
    pub value: Option<MetadataValue>,
}

impl MetadataEntry {
    pub fn put(key: Key, value: MetadataValue) -> Self {
        MetadataEntry {
            key,
            value: Some(value),
        }
    }

    pub fn delete(key: Key) -> Self {
        MetadataEntry { key, value: None }
    }

    pub fn kind(&self) -> EntryKind {
        match self.value {
            Some(_) => EntryKind::Put,
            None => EntryKind::Delete,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        self.value.is_none()
    }
}
