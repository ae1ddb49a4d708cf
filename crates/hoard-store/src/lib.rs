//! Content-addressed blob storage for hoard.
//!
//! Every blob is identified by its [`Score`](hoard_types::Score), the SHA-256
//! of its bytes. Storing the same bytes twice costs one upload: the second
//! `put` finds the first one's [`Address`](hoard_types::Address) and returns
//! it untouched.
//!
//! # Storage Backends
//!
//! All stores implement the [`ContentStore`] trait:
//!
//! - [`TieredStore`] -- bytes in a blob backend, addresses in a small-record
//!   backend keyed by score
//! - [`InMemoryContentStore`] -- `HashMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Content is read exactly once: staging and hashing share one pass.
//! 2. Upload-then-register: an address becomes visible only after its bytes
//!    are in the blob backend.
//! 3. Registration is create-if-absent; losing that race is not an error.
//! 4. Stores never retry. All I/O errors are propagated.

pub mod error;
pub mod memory;
pub mod staging;
pub mod tiered;
pub mod traits;

#[cfg(test)]
mod suite;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryContentStore;
pub use staging::StagedContent;
pub use tiered::{TieredStore, BLOB_PREFIX};
pub use traits::ContentStore;
