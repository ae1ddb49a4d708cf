//! Entry index for hoard.
//!
//! The index is a small graph over archived items:
//!
//! - **Entries** are the metadata records, keyed by `(group, id)` and created
//!   exactly once.
//! - **Aliases** are human-chosen names bound to one entry id. A name can be
//!   bound at most once until it is removed.
//! - **Relations** are directed edges between two existing entries. An entry
//!   has a set of outgoing edges; nothing is implicitly bidirectional.
//!
//! Every key is scoped by the index's group.
//!
//! # Modules
//!
//! - [`error`] -- Error types for index operations
//! - [`traits`] -- The [`EntryIndex`] trait
//! - [`memory`] -- [`InMemoryIndex`], three maps behind three locks
//! - [`record`] -- [`RecordIndex`], one logical table per concern in a
//!   [`RecordBackend`](hoard_backend::RecordBackend)

pub mod error;
pub mod memory;
pub mod record;
pub mod traits;

#[cfg(test)]
mod suite;

pub use error::{IndexError, Result};
pub use memory::InMemoryIndex;
pub use record::{RecordIndex, TableNames};
pub use traits::EntryIndex;
