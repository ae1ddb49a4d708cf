//! Traits for the per-file helpers the [`Ingestor`](crate::Ingestor) calls.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tempfile::TempPath;

use crate::error::IngestResult;

/// Decides whether a file should be ingested at all.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn is_supported(&self, path: &Path) -> bool;
}

/// Produces a secondary artifact (a thumbnail) from the original.
#[async_trait]
pub trait Deriver: Send + Sync {
    async fn derive(&self, path: &Path) -> IngestResult<DerivedArtifact>;
}

/// Reads when and where an item happened.
///
/// Extraction never fails: a missing embedded timestamp falls back to the
/// file's modification time, a missing location to an empty grid square.
#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    async fn extract(&self, path: &Path) -> Metadata;
}

/// A derived file on local disk, removed when this value is dropped.
#[derive(Debug)]
pub struct DerivedArtifact {
    path: TempPath,
}

impl DerivedArtifact {
    pub fn new(path: TempPath) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Timestamp and location of an item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Metadata {
    pub timestamp: DateTime<Utc>,
    /// Maidenhead locator, or empty when unknown.
    pub gridsquare: String,
}

impl Metadata {
    pub fn new(timestamp: DateTime<Utc>, gridsquare: impl Into<String>) -> Self {
        Self {
            timestamp,
            gridsquare: gridsquare.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn artifact_is_removed_on_drop() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"thumb").unwrap();
        let artifact = DerivedArtifact::new(file.into_temp_path());
        let path = artifact.path().to_path_buf();
        assert!(path.exists());
        drop(artifact);
        assert!(!path.exists());
    }
}
