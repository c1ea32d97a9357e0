//! # Array Metadata Store
//!
//! Versioned key/value metadata attached to a multi-dimensional array.
//! Callers attach typed scalar or vector values to an array, independent of
//! its cell data.
//!
//! ## Core idea
//! Every write session appends one immutable, timestamped fragment of puts
//! and tombstones. Opening the array replays the fragments visible at the
//! requested timestamp into an ordered in-memory view. Consolidation runs
//! the very same replay over the full history and writes the result back as
//! a single fragment.
//!
//! ```text
//! write session ──close──▶ fragment ─┐
//! write session ──close──▶ fragment ─┼─▶ view::merge ─▶ MetadataView (per session)
//! write session ──close──▶ fragment ─┘        │
//!                                             └─▶ consolidator ─▶ one fragment
//! ```

pub mod array;
pub mod clock;
pub mod config;
pub mod consolidator;
pub mod context;
pub mod crypto;
pub mod error;
pub mod fragment;
pub mod header;
pub mod store;
pub mod types;
pub mod vfs;
pub mod view;

// Public re-exports for the top-level API
pub use array::{Array, OpenMode};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use context::{Context, ContextBuilder};
pub use crypto::{EncryptionKey, EncryptionType};
pub use error::{Error, Result};
pub use types::{Datatype, MetadataValue};
