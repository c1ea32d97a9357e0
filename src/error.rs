use std::io;

use thiserror::Error;

/// Unified error type for the metadata store.
///
/// Looking up or deleting a key that does not exist is never an error:
/// `get` returns `None` and `delete` is a silent no-op.
#[derive(Debug, Error)]
pub enum Error {
    /// IO error from the filesystem layer, propagated unchanged.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// put/delete on a read session, reopen on a write session.
    #[error("operation requires an array opened in {expected} mode")]
    WrongOpenMode { expected: &'static str },

    /// Empty key, zero count, missing payload or the `Any` datatype.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Positional lookup past the end of the view.
    #[error("index {index} out of range, array has {count} metadata items")]
    IndexOutOfRange { index: u64, count: u64 },

    /// A fragment could not be encoded because one of its entries is invalid.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Fragment or header bytes failed structural checks (magic, checksum, bounds).
    #[error("corruption: {0}")]
    Corruption(String),

    /// The supplied key does not match the one the data was written with,
    /// including encrypted-vs-plaintext mismatches.
    #[error("encryption key mismatch")]
    EncryptionKeyMismatch,

    /// No array exists at the given URI.
    #[error("array not found: {0}")]
    ArrayNotFound(String),

    /// `create` was called on a URI that already holds an array.
    #[error("array already exists: {0}")]
    ArrayExists(String),

    /// Configuration could not be parsed.
    #[error("config error: {0}")]
    Config(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
