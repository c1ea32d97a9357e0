//! Filesystem abstraction the fragment store persists through.
//!
//! URIs are plain strings. `file://` prefixes are accepted by [`LocalFs`];
//! [`MemFs`] treats URIs as opaque keys.

pub mod local;
pub mod memory;

use crate::error::Result;

pub use local::LocalFs;
pub use memory::MemFs;

/// Byte-blob storage with atomic, non-clobbering create.
///
/// `write_new` is the only concurrency primitive the store relies on: it must
/// either publish the complete blob under `uri` or fail with
/// `io::ErrorKind::AlreadyExists`, never expose a partial blob and never
/// replace an existing one.
pub trait Vfs: Send + Sync {
    fn create_dir(&self, uri: &str) -> Result<()>;

    fn is_dir(&self, uri: &str) -> Result<bool>;

    fn is_file(&self, uri: &str) -> Result<bool>;

    /// Names (not full URIs) of the files directly inside `uri`.
    fn ls(&self, uri: &str) -> Result<Vec<String>>;

    fn read(&self, uri: &str) -> Result<Vec<u8>>;

    fn write_new(&self, uri: &str, data: &[u8]) -> Result<()>;

    fn remove_file(&self, uri: &str) -> Result<()>;
}

/// Join a child name onto a URI.
pub fn join(uri: &str, name: &str) -> String {
    format!("{}/{}", uri.trim_end_matches('/'), name)
}
