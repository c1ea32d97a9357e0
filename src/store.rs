use tracing::{debug, warn};

use crate::context::Context;
use crate::crypto::EncryptionKey;
use crate::error::{Error, Result};
use crate::fragment::{self, Fragment, FragmentDescriptor};
use crate::header::{ArrayHeader, HEADER_FILE};
use crate::types::Timestamp;
use crate::vfs::join;

/// Naming and persistence of the metadata fragments of one array.
///
/// Layout under the array URI:
/// ```text
/// <array_uri>/
///   __array_header
///   <metadata_dir>/
///     __<start>_<end>_<seq>_<uuid>.<suffix>
///     ...
/// ```
///
/// No merge logic lives here; callers decide what to do with the bytes.
pub struct FragmentStore<'a> {
    ctx: &'a Context,
    array_uri: String,
}

impl<'a> FragmentStore<'a> {
    pub fn new(ctx: &'a Context, array_uri: &str) -> Self {
        FragmentStore {
            ctx,
            array_uri: array_uri.trim_end_matches('/').to_string(),
        }
    }

    pub fn array_uri(&self) -> &str {
        &self.array_uri
    }

    pub fn metadata_uri(&self) -> String {
        join(&self.array_uri, &self.ctx.config().metadata_dir)
    }

    fn fragment_uri(&self, desc: &FragmentDescriptor) -> String {
        join(&self.metadata_uri(), &desc.name)
    }

    /// Create the array directory layout and its header.
    pub fn create(&self, key: Option<&EncryptionKey>) -> Result<()> {
        let vfs = self.ctx.vfs();
        if vfs.is_file(&join(&self.array_uri, HEADER_FILE))? {
            return Err(Error::ArrayExists(self.array_uri.clone()));
        }
        vfs.create_dir(&self.metadata_uri())?;
        let header = ArrayHeader::new(key)?;
        vfs.write_new(&join(&self.array_uri, HEADER_FILE), &header.encode())
            .map_err(|e| match e {
                Error::Io(io) if io.kind() == std::io::ErrorKind::AlreadyExists => {
                    Error::ArrayExists(self.array_uri.clone())
                }
                other => other,
            })
    }

    /// Read the header. `ArrayNotFound` when there is no array at this URI.
    pub fn header(&self) -> Result<ArrayHeader> {
        let uri = join(&self.array_uri, HEADER_FILE);
        if !self.ctx.vfs().is_file(&uri)? {
            return Err(Error::ArrayNotFound(self.array_uri.clone()));
        }
        ArrayHeader::decode(&self.ctx.vfs().read(&uri)?)
    }

    /// All fragments, sorted in replay order `(start_ts, end_ts, id)`.
    pub fn list(&self) -> Result<Vec<FragmentDescriptor>> {
        let suffix = &self.ctx.config().fragment_suffix;
        let mut fragments = Vec::new();
        for name in self.ctx.vfs().ls(&self.metadata_uri())? {
            match FragmentDescriptor::parse(&name, suffix) {
                Some(desc) => fragments.push(desc),
                None if name.starts_with('.') => {} // in-flight upload
                None => warn!("ignoring unrecognized file in metadata dir: {}", name),
            }
        }
        fragments.sort();
        Ok(fragments)
    }

    /// Fragments visible to a read at `timestamp`: those with `end_ts <= timestamp`.
    pub fn list_until(&self, timestamp: Timestamp) -> Result<Vec<FragmentDescriptor>> {
        let mut fragments = self.list()?;
        fragments.retain(|desc| desc.end_ts <= timestamp);
        Ok(fragments)
    }

    /// Next value of the logical clock: one past the largest listed `seq`.
    pub fn next_seq(&self) -> Result<u64> {
        Ok(self
            .list()?
            .iter()
            .map(|desc| desc.id.seq + 1)
            .max()
            .unwrap_or(0))
    }

    /// Encode and persist a fragment with atomic non-clobbering create.
    pub fn write(
        &self,
        fragment: &Fragment,
        key: Option<&EncryptionKey>,
    ) -> Result<FragmentDescriptor> {
        let desc = fragment.descriptor(&self.ctx.config().fragment_suffix);
        let bytes = fragment::encode(fragment, key)?;
        self.ctx.vfs().write_new(&self.fragment_uri(&desc), &bytes)?;
        debug!(
            "wrote fragment {} ({} entries, {} bytes)",
            desc.name,
            fragment.entries.len(),
            bytes.len()
        );
        Ok(desc)
    }

    pub fn read(&self, desc: &FragmentDescriptor) -> Result<Vec<u8>> {
        self.ctx.vfs().read(&self.fragment_uri(desc))
    }

    /// Read and decode one fragment.
    pub fn load(&self, desc: &FragmentDescriptor, key: Option<&EncryptionKey>) -> Result<Fragment> {
        let fragment = fragment::decode(&self.read(desc)?, key)?;
        if fragment.id != desc.id
            || fragment.start_ts != desc.start_ts
            || fragment.end_ts != desc.end_ts
        {
            return Err(Error::Corruption(format!(
                "fragment {} does not match its name",
                desc.name
            )));
        }
        Ok(fragment)
    }

    /// Load several fragments, keeping their order.
    pub fn load_all(
        &self,
        descs: &[FragmentDescriptor],
        key: Option<&EncryptionKey>,
    ) -> Result<Vec<Fragment>> {
        descs.iter().map(|desc| self.load(desc, key)).collect()
    }

    pub fn delete(&self, desc: &FragmentDescriptor) -> Result<()> {
        self.ctx.vfs().remove_file(&self.fragment_uri(desc))?;
        debug!("deleted fragment {}", desc.name);
        Ok(())
    }
}
