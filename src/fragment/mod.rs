pub mod codec;
pub mod record;

use std::cmp::Ordering;

use uuid::Uuid;

use crate::types::{MetadataEntry, Timestamp};

pub use codec::{decode, encode};
pub use record::MetadataRecord;

/// Identity of a fragment within its array.
///
/// `seq` is a logical clock: a writer takes one past the largest `seq` it
/// can list. `uuid` keeps names unique when two writers pick the same `seq`.
/// Ordering is `(seq, uuid)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FragmentId {
    pub seq: u64,
    pub uuid: Uuid,
}

impl FragmentId {
    /// A fresh id at logical position `seq`.
    pub fn new(seq: u64) -> Self {
        FragmentId {
            seq,
            uuid: Uuid::new_v4(),
        }
    }
}

/// One immutable batch of metadata operations produced by a single write
/// session (or by consolidation).
///
/// Entries keep the order in which they were issued; a later entry for the
/// same key overrides an earlier one.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub start_ts: Timestamp,
    pub end_ts: Timestamp,
    pub id: FragmentId,
    pub entries: Vec<MetadataEntry>,
}

impl Fragment {
    pub fn new(
        start_ts: Timestamp,
        end_ts: Timestamp,
        id: FragmentId,
        entries: Vec<MetadataEntry>,
    ) -> Self {
        debug_assert!(start_ts <= end_ts);
        Fragment {
            start_ts,
            end_ts,
            id,
            entries,
        }
    }

    pub fn descriptor(&self, suffix: &str) -> FragmentDescriptor {
        FragmentDescriptor::new(self.start_ts, self.end_ts, self.id, suffix)
    }
}

/// What the fragment store knows about a fragment without reading it:
/// everything here is recoverable from the file name alone.
///
/// Name format: `__<start_ts>_<end_ts>_<seq:020>_<uuid>.<suffix>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentDescriptor {
    pub start_ts: Timestamp,
    pub end_ts: Timestamp,
    pub id: FragmentId,
    pub name: String,
}

impl FragmentDescriptor {
    pub fn new(start_ts: Timestamp, end_ts: Timestamp, id: FragmentId, suffix: &str) -> Self {
        let name = format!(
            "__{}_{}_{:020}_{}.{}",
            start_ts,
            end_ts,
            id.seq,
            id.uuid.simple(),
            suffix
        );
        FragmentDescriptor {
            start_ts,
            end_ts,
            id,
            name,
        }
    }

    /// Parse a file name. Returns None for anything that is not a fragment
    /// with the given suffix (temp uploads, headers, foreign files).
    pub fn parse(name: &str, suffix: &str) -> Option<Self> {
        let stem = name.strip_prefix("__")?.strip_suffix(suffix)?.strip_suffix('.')?;
        let mut parts = stem.split('_');
        let start_ts = parts.next()?.parse().ok()?;
        let end_ts = parts.next()?.parse().ok()?;
        let seq = parts.next()?.parse().ok()?;
        let uuid = Uuid::parse_str(parts.next()?).ok()?;
        if parts.next().is_some() || start_ts > end_ts {
            return None;
        }
        Some(FragmentDescriptor {
            start_ts,
            end_ts,
            id: FragmentId { seq, uuid },
            name: name.to_string(),
        })
    }
}

impl Ord for FragmentDescriptor {
    /// Replay order: `(start_ts, end_ts, id)` ascending.
    fn cmp(&self, other: &Self) -> Ordering {
        (self.start_ts, self.end_ts, self.id).cmp(&(other.start_ts, other.end_ts, other.id))
    }
}

impl PartialOrd for FragmentDescriptor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_roundtrip() {
        let id = FragmentId::new(7);
        let desc = FragmentDescriptor::new(100, 250, id, "meta");
        assert!(desc.name.starts_with("__100_250_00000000000000000007_"));
        assert!(desc.name.ends_with(".meta"));
        let parsed = FragmentDescriptor::parse(&desc.name, "meta").unwrap();
        assert_eq!(parsed, desc);
    }

    #[test]
    fn parse_rejects_foreign_names() {
        assert!(FragmentDescriptor::parse("__array_header", "meta").is_none());
        assert!(FragmentDescriptor::parse("__1_2_3.meta", "meta").is_none());
        assert!(FragmentDescriptor::parse("__1_2_3_notauuid.meta", "meta").is_none());
        let desc = FragmentDescriptor::new(1, 2, FragmentId::new(0), "meta");
        let tmp = format!("{}.tmp", desc.name);
        assert!(FragmentDescriptor::parse(&tmp, "meta").is_none());
        assert!(FragmentDescriptor::parse(&desc.name, "other").is_none());
    }

    #[test]
    fn parse_rejects_inverted_range() {
        let desc = FragmentDescriptor::new(5, 9, FragmentId::new(0), "meta");
        let inverted = desc.name.replacen("__5_9_", "__9_5_", 1);
        assert!(FragmentDescriptor::parse(&inverted, "meta").is_none());
    }

    #[test]
    fn ordering_uses_timestamps_then_seq() {
        let a = FragmentDescriptor::new(10, 10, FragmentId::new(5), "meta");
        let b = FragmentDescriptor::new(10, 10, FragmentId::new(6), "meta");
        let c = FragmentDescriptor::new(10, 11, FragmentId::new(0), "meta");
        let d = FragmentDescriptor::new(11, 11, FragmentId::new(0), "meta");
        let mut v = vec![d.clone(), c.clone(), b.clone(), a.clone()];
        v.sort();
        assert_eq!(v, vec![a, b, c, d]);
    }
}
