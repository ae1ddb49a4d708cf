//! Ingestion pipeline for hoard.
//!
//! One file goes in; one [`Entry`](hoard_types::Entry) comes out, pointing at
//! the stored original and a derived thumbnail. The [`Ingestor`] drives the
//! pipeline and leans on three pluggable collaborators:
//!
//! - [`Classifier`] decides whether a file is worth ingesting
//! - [`Deriver`] produces the secondary artifact (a thumbnail)
//! - [`MetadataExtractor`] reads the timestamp and location
//!
//! The [`tools`] module provides implementations backed by ImageMagick.

pub mod collaborators;
pub mod error;
pub mod ingestor;
pub mod maidenhead;
pub mod tools;

pub use collaborators::{Classifier, DerivedArtifact, Deriver, Metadata, MetadataExtractor};
pub use error::{IngestError, IngestResult};
pub use ingestor::{IngestOutcome, IngestReport, Ingestor, DEFAULT_ENTRY_TYPE};
pub use tools::{ExifExtractor, IdentifyClassifier, ThumbnailDeriver, DEFAULT_GEOMETRY};
