use std::fmt;

use tracing::{debug, info, warn};

use crate::consolidator;
use crate::context::Context;
use crate::crypto::EncryptionKey;
use crate::error::{Error, Result};
use crate::fragment::{Fragment, FragmentDescriptor, FragmentId};
use crate::store::FragmentStore;
use crate::types::{Datatype, Element, MetadataEntry, MetadataValue, Timestamp};
use crate::view::{self, MetadataView};

/// Mode an array session is bound to. Switching requires close and reopen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpenMode::Read => f.write_str("read"),
            OpenMode::Write => f.write_str("write"),
        }
    }
}

/// An open session on an array's metadata.
///
/// On open, every fragment with `end_ts <= timestamp` is loaded and merged
/// into a private [`MetadataView`]. The view is a snapshot: nothing written
/// or consolidated afterwards changes it.
///
/// In write mode, puts and deletes are buffered and also applied to the
/// session's own view, so the writer reads its own writes. `close` persists
/// the buffer as one fragment; dropping the session without `close`
/// discards it.
pub struct Array {
    ctx: Context,
    uri: String,
    mode: OpenMode,
    key: Option<EncryptionKey>,
    /// Read timestamp of the view.
    timestamp: Timestamp,
    /// Start of the write session; also the end when `fixed_timestamp`.
    start_ts: Timestamp,
    fixed_timestamp: bool,
    view: MetadataView,
    pending: Vec<MetadataEntry>,
}

impl Array {
    /// Create an empty array at `uri`, optionally encrypted.
    pub fn create(ctx: &Context, uri: &str, key: Option<&EncryptionKey>) -> Result<()> {
        FragmentStore::new(ctx, uri).create(key)?;
        info!(
            "created array {} ({})",
            uri,
            if key.is_some() { "encrypted" } else { "unencrypted" }
        );
        Ok(())
    }

    /// Open at the current time.
    pub fn open(
        ctx: &Context,
        uri: &str,
        mode: OpenMode,
        key: Option<&EncryptionKey>,
    ) -> Result<Self> {
        let now = ctx.now_ms();
        Self::open_inner(ctx, uri, mode, now, false, key)
    }

    /// Open as of `timestamp`.
    ///
    /// Read mode: time travel, only fragments with `end_ts <= timestamp` are
    /// visible. Write mode: the fragment written on close is stamped
    /// `[timestamp, timestamp]` instead of the wall-clock session bounds.
    pub fn open_at(
        ctx: &Context,
        uri: &str,
        mode: OpenMode,
        timestamp: Timestamp,
        key: Option<&EncryptionKey>,
    ) -> Result<Self> {
        Self::open_inner(ctx, uri, mode, timestamp, true, key)
    }

    fn open_inner(
        ctx: &Context,
        uri: &str,
        mode: OpenMode,
        timestamp: Timestamp,
        fixed_timestamp: bool,
        key: Option<&EncryptionKey>,
    ) -> Result<Self> {
        let view = load_view(ctx, uri, timestamp, key)?;
        debug!(
            "opened {} for {} at {} ({} metadata items)",
            uri,
            mode,
            timestamp,
            view.len()
        );
        Ok(Array {
            ctx: ctx.clone(),
            uri: uri.trim_end_matches('/').to_string(),
            mode,
            key: key.cloned(),
            timestamp,
            start_ts: timestamp,
            fixed_timestamp,
            view,
            pending: Vec::new(),
        })
    }

    /// Consolidate all metadata fragments of the array at `uri` into one.
    /// Returns the new fragment, or None when there was nothing to merge.
    pub fn consolidate_metadata(
        ctx: &Context,
        uri: &str,
        key: Option<&EncryptionKey>,
    ) -> Result<Option<FragmentDescriptor>> {
        consolidator::consolidate(ctx, uri, key)
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Read timestamp of the current view.
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    fn require_mode(&self, expected: OpenMode) -> Result<()> {
        if self.mode == expected {
            return Ok(());
        }
        Err(Error::WrongOpenMode {
            expected: match expected {
                OpenMode::Read => "read",
                OpenMode::Write => "write",
            },
        })
    }

    /// Buffer a put of `count` elements of `datatype`.
    ///
    /// Exactly `count * datatype.size()` bytes are taken from `value`.
    pub fn put(
        &mut self,
        key: &[u8],
        datatype: Datatype,
        count: u32,
        value: Option<&[u8]>,
    ) -> Result<()> {
        self.require_mode(OpenMode::Write)?;
        if key.is_empty() {
            return Err(Error::InvalidArgument("metadata key is empty".into()));
        }
        let Some(value) = value else {
            return Err(Error::InvalidArgument("metadata value is missing".into()));
        };
        if datatype == Datatype::Any {
            return Err(Error::InvalidArgument(
                "datatype ANY cannot be stored as metadata".into(),
            ));
        }
        if count == 0 {
            return Err(Error::InvalidArgument(
                "metadata value count must be at least 1".into(),
            ));
        }
        let len = count as usize * datatype.size();
        if value.len() < len {
            return Err(Error::InvalidArgument(format!(
                "metadata value has {} bytes, {} x {:?} needs {}",
                value.len(),
                count,
                datatype,
                len
            )));
        }

        let value = MetadataValue::new(datatype, count, value[..len].to_vec())?;
        self.buffer(MetadataEntry::put(key.to_vec(), value));
        Ok(())
    }

    /// Typed put: element type and count come from the slice.
    pub fn put_values<T: Element>(&mut self, key: &[u8], values: &[T]) -> Result<()> {
        self.require_mode(OpenMode::Write)?;
        if key.is_empty() {
            return Err(Error::InvalidArgument("metadata key is empty".into()));
        }
        let value = MetadataValue::from_slice(values)?;
        self.buffer(MetadataEntry::put(key.to_vec(), value));
        Ok(())
    }

    /// Buffer a delete. Deleting a key that does not exist is not an error.
    pub fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.require_mode(OpenMode::Write)?;
        if key.is_empty() {
            return Err(Error::InvalidArgument("metadata key is empty".into()));
        }
        self.buffer(MetadataEntry::delete(key.to_vec()));
        Ok(())
    }

    fn buffer(&mut self, entry: MetadataEntry) {
        self.view.apply(&entry);
        self.pending.push(entry);
    }

    /// Look up a key. None when absent; never an error.
    pub fn get(&self, key: &[u8]) -> Option<&MetadataValue> {
        self.view.get(key)
    }

    /// Number of live metadata items.
    pub fn count(&self) -> u64 {
        self.view.len() as u64
    }

    /// The `index`-th item in iteration order (first-insertion order).
    pub fn get_by_index(&self, index: u64) -> Result<(&[u8], &MetadataValue)> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.view.get_by_index(i))
            .ok_or(Error::IndexOutOfRange {
                index,
                count: self.count(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &MetadataValue)> {
        self.view.iter()
    }

    /// Rebuild the view at the current time. Read mode only.
    pub fn reopen(&mut self) -> Result<()> {
        self.require_mode(OpenMode::Read)?;
        let now = self.ctx.now_ms();
        self.view = load_view(&self.ctx, &self.uri, now, self.key.as_ref())?;
        self.timestamp = now;
        debug!("reopened {} at {} ({} metadata items)", self.uri, now, self.view.len());
        Ok(())
    }

    /// End the session. In write mode a non-empty buffer is persisted as one
    /// fragment, which is returned; otherwise nothing is written.
    pub fn close(mut self) -> Result<Option<FragmentDescriptor>> {
        let pending = std::mem::take(&mut self.pending);
        if self.mode == OpenMode::Read || pending.is_empty() {
            debug!("closed {} ({} mode, nothing to write)", self.uri, self.mode);
            return Ok(None);
        }

        let end_ts = if self.fixed_timestamp {
            self.start_ts
        } else {
            self.ctx.now_ms().max(self.start_ts)
        };

        let store = FragmentStore::new(&self.ctx, &self.uri);
        let id = FragmentId::new(store.next_seq()?);
        let fragment = Fragment::new(self.start_ts, end_ts, id, pending);
        let desc = store.write(&fragment, self.key.as_ref())?;
        debug!(
            "closed {} and committed {} operations to {}",
            self.uri,
            fragment.entries.len(),
            desc.name
        );
        Ok(Some(desc))
    }
}

impl Drop for Array {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            warn!(
                "array {} dropped without close, discarding {} buffered metadata operations",
                self.uri,
                self.pending.len()
            );
        }
    }
}

fn load_view(
    ctx: &Context,
    uri: &str,
    timestamp: Timestamp,
    key: Option<&EncryptionKey>,
) -> Result<MetadataView> {
    let store = FragmentStore::new(ctx, uri);
    store.header()?.verify_key(key)?;
    let fragments = store.load_all(&store.list_until(timestamp)?, key)?;
    Ok(view::merge(&fragments))
}
