//! Storage backends for hoard.
//!
//! Hoard keeps content in two tiers:
//!
//! - a **blob backend** ([`BlobBackend`]) for bulk bytes, addressed by an
//!   opaque `scheme://container/key` location string, and
//! - a **small-record backend** ([`RecordBackend`]) for addresses, entries,
//!   aliases and relations, with point reads, create-if-absent writes,
//!   unconditional deletes and per-partition queries.
//!
//! # Implementations
//!
//! - [`MemoryBlobBackend`] / [`MemoryRecordBackend`] -- process-local, for tests
//!   and embedding
//! - [`FsBlobBackend`] / [`FsRecordBackend`] -- a directory tree on local disk
//!
//! Backends never retry. Timeouts and retry policy belong to whoever wraps
//! them.

pub mod error;
pub mod fs;
pub mod location;
pub mod memory;
pub mod traits;

pub use error::{BackendError, BackendResult};
pub use fs::{FsBlobBackend, FsRecordBackend};
pub use location::BlobLocation;
pub use memory::{MemoryBlobBackend, MemoryRecordBackend};
pub use traits::{from_record, to_record, BlobBackend, PutCondition, Record, RecordBackend, RecordKey};
