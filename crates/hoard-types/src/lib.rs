//! Foundation types for hoard.
//!
//! Every other hoard crate depends on `hoard-types`. The types here are the
//! record shapes that travel between the content store, the entry index and
//! the ingestion pipeline.
//!
//! # Key Types
//!
//! - [`Score`] -- SHA-256 content digest, the deduplication key for a blob
//! - [`Address`] -- where a blob lives: score, backend location, size
//! - [`Entry`] -- indexed metadata record for one archived item

pub mod address;
pub mod entry;
pub mod error;
pub mod score;

pub use address::Address;
pub use entry::{Entry, ORIGINAL_ROLE, THUMBNAIL_ROLE};
pub use error::TypeError;
pub use score::{Score, ScoreHasher};
