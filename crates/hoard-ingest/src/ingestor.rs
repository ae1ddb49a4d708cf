//! The per-file ingestion pipeline.
//!
//! ```text
//! classify ──► ┌ put original ──────────────┐
//!              ├ derive thumbnail ► put it ─┼─► join ─► add entry
//!              └ extract metadata ──────────┘
//! ```
//!
//! The three branches run concurrently and are always joined; a failing
//! branch never leaves another one running. Blobs uploaded before a failure
//! stay in their store and are picked up by the next attempt through dedup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use hoard_index::{EntryIndex, IndexError};
use hoard_store::ContentStore;
use hoard_types::{Address, Entry, ORIGINAL_ROLE, THUMBNAIL_ROLE};
use tracing::{debug, info, warn};

use crate::collaborators::{Classifier, Deriver, MetadataExtractor};
use crate::error::{IngestError, IngestResult};

/// Entry type stamped on ingested items unless configured otherwise.
pub const DEFAULT_ENTRY_TYPE: &str = "image";

/// What happened to one file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IngestOutcome {
    /// A new entry was indexed.
    Added(Entry),
    /// The entry already existed; nothing new was indexed.
    Duplicate { id: String },
    /// The classifier rejected the file.
    Skipped,
}

/// Tally of a batch run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub added: Vec<String>,
    pub duplicates: Vec<String>,
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl IngestReport {
    pub fn total(&self) -> usize {
        self.added.len() + self.duplicates.len() + self.skipped.len() + self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Drives files through classify, store, and index.
pub struct Ingestor {
    originals: Arc<dyn ContentStore>,
    thumbnails: Arc<dyn ContentStore>,
    index: Arc<dyn EntryIndex>,
    classifier: Arc<dyn Classifier>,
    deriver: Arc<dyn Deriver>,
    extractor: Arc<dyn MetadataExtractor>,
    entry_type: String,
}

impl Ingestor {
    pub fn new(
        originals: Arc<dyn ContentStore>,
        thumbnails: Arc<dyn ContentStore>,
        index: Arc<dyn EntryIndex>,
        classifier: Arc<dyn Classifier>,
        deriver: Arc<dyn Deriver>,
        extractor: Arc<dyn MetadataExtractor>,
    ) -> Self {
        Self {
            originals,
            thumbnails,
            index,
            classifier,
            deriver,
            extractor,
            entry_type: DEFAULT_ENTRY_TYPE.to_string(),
        }
    }

    pub fn with_entry_type(mut self, entry_type: impl Into<String>) -> Self {
        self.entry_type = entry_type.into();
        self
    }

    /// Ingest one file.
    pub async fn ingest(&self, path: &Path) -> IngestResult<IngestOutcome> {
        if !self.classifier.is_supported(path).await {
            info!(path = %path.display(), "unsupported file skipped");
            return Ok(IngestOutcome::Skipped);
        }

        let original = put_file(Arc::clone(&self.originals), path.to_path_buf());
        let thumbnail = async {
            let artifact = self.deriver.derive(path).await?;
            let stored = put_file(Arc::clone(&self.thumbnails), artifact.path().to_path_buf()).await;
            drop(artifact);
            stored
        };
        let metadata = self.extractor.extract(path);

        let (original, thumbnail, metadata) = tokio::join!(original, thumbnail, metadata);
        let original = original?;
        let thumbnail = thumbnail?;

        let mut entry = Entry::new(metadata.timestamp)
            .entry_type(self.entry_type.as_str())
            .gridsquare(metadata.gridsquare)
            .address(ORIGINAL_ROLE, original)
            .address(THUMBNAIL_ROLE, thumbnail);
        if let Some(name) = path.file_name() {
            entry = entry.name(name.to_string_lossy());
        }

        let index = Arc::clone(&self.index);
        match tokio::task::spawn_blocking(move || index.add(entry)).await? {
            Ok(entry) => {
                info!(path = %path.display(), id = %entry.id, "entry added");
                Ok(IngestOutcome::Added(entry))
            }
            Err(IndexError::EntryExists { id }) => {
                info!(path = %path.display(), id = %id, "already archived");
                Ok(IngestOutcome::Duplicate { id })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Ingest files one after another, recording each result.
    pub async fn ingest_all(&self, paths: &[PathBuf]) -> IngestReport {
        let mut report = IngestReport::default();
        for path in paths {
            match self.ingest(path).await {
                Ok(IngestOutcome::Added(entry)) => report.added.push(entry.id),
                Ok(IngestOutcome::Duplicate { id }) => report.duplicates.push(id),
                Ok(IngestOutcome::Skipped) => report.skipped.push(path.clone()),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "ingestion failed");
                    report.failed.push((path.clone(), e.to_string()));
                }
            }
        }
        debug!(
            added = report.added.len(),
            duplicates = report.duplicates.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "batch finished"
        );
        report
    }
}

async fn put_file(store: Arc<dyn ContentStore>, path: PathBuf) -> IngestResult<Address> {
    let address = tokio::task::spawn_blocking(move || store.put_file(&path)).await??;
    Ok(address)
}

impl std::fmt::Debug for Ingestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ingestor")
            .field("group", &self.index.group())
            .field("entry_type", &self.entry_type)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{DerivedArtifact, Metadata};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use hoard_backend::{
        BackendError, BackendResult, BlobBackend, MemoryBlobBackend, MemoryRecordBackend,
    };
    use hoard_index::InMemoryIndex;
    use hoard_store::TieredStore;
    use hoard_types::Score;
    use std::io::Write;
    use std::sync::Mutex;

    struct Accept(bool);

    #[async_trait]
    impl Classifier for Accept {
        async fn is_supported(&self, _path: &Path) -> bool {
            self.0
        }
    }

    /// Writes `thumb:` plus the source bytes, remembering every path it made.
    #[derive(Default)]
    struct PrefixDeriver {
        made: Mutex<Vec<PathBuf>>,
        fail: bool,
    }

    #[async_trait]
    impl Deriver for PrefixDeriver {
        async fn derive(&self, path: &Path) -> IngestResult<DerivedArtifact> {
            if self.fail {
                return Err(IngestError::Tool {
                    program: "fake".into(),
                    path: path.to_path_buf(),
                    reason: "refused".into(),
                });
            }
            let mut file = tempfile::NamedTempFile::new()?;
            file.write_all(b"thumb:")?;
            file.write_all(&std::fs::read(path)?)?;
            let tmp = file.into_temp_path();
            self.made.lock().unwrap().push(tmp.to_path_buf());
            Ok(DerivedArtifact::new(tmp))
        }
    }

    /// A blob backend whose uploads always fail.
    struct RefusingBlobs;

    impl BlobBackend for RefusingBlobs {
        fn scheme(&self) -> &str {
            "refuse"
        }

        fn put(&self, _key: &str, _content: &mut dyn std::io::Read) -> BackendResult<String> {
            Err(BackendError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "bucket unavailable",
            )))
        }

        fn get(&self, location: &str, _writer: &mut dyn Write) -> BackendResult<u64> {
            Err(BackendError::NotFound(location.to_string()))
        }
    }

    struct Fixed(Metadata);

    #[async_trait]
    impl MetadataExtractor for Fixed {
        async fn extract(&self, _path: &Path) -> Metadata {
            self.0.clone()
        }
    }

    struct Harness {
        orig_blobs: Arc<MemoryBlobBackend>,
        thumb_blobs: Arc<MemoryBlobBackend>,
        index: Arc<InMemoryIndex>,
        deriver: Arc<PrefixDeriver>,
        ingestor: Ingestor,
    }

    fn harness(accept: bool, deriver: PrefixDeriver) -> Harness {
        let records = Arc::new(MemoryRecordBackend::new());
        let orig_blobs = Arc::new(MemoryBlobBackend::new("orig"));
        let thumb_blobs = Arc::new(MemoryBlobBackend::new("thumb"));
        let originals = Arc::new(TieredStore::new(orig_blobs.clone(), records.clone(), "Orig"));
        let thumbnails = Arc::new(TieredStore::new(thumb_blobs.clone(), records, "Thumb"));
        let index = Arc::new(InMemoryIndex::new("family"));
        let deriver = Arc::new(deriver);
        let when = Utc.with_ymd_and_hms(2019, 6, 1, 12, 0, 0).unwrap();

        let ingestor = Ingestor::new(
            originals,
            thumbnails,
            index.clone(),
            Arc::new(Accept(accept)),
            deriver.clone(),
            Arc::new(Fixed(Metadata::new(when, "JN58td"))),
        );
        Harness {
            orig_blobs,
            thumb_blobs,
            index,
            deriver,
            ingestor,
        }
    }

    fn photo(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[tokio::test]
    async fn photo_is_archived_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = photo(dir.path(), "photo.jpg", b"pixels");
        let h = harness(true, PrefixDeriver::default());

        let IngestOutcome::Added(entry) = h.ingestor.ingest(&path).await.unwrap() else {
            panic!("first ingest should add an entry");
        };
        assert_eq!(entry.name.as_deref(), Some("photo.jpg"));
        assert_eq!(entry.entry_type.as_deref(), Some("image"));
        assert_eq!(entry.gridsquare.as_deref(), Some("JN58td"));
        assert_eq!(entry.group, "family");
        assert_eq!(entry.addresses[ORIGINAL_ROLE].score, Score::of(b"pixels"));
        assert_eq!(entry.addresses[THUMBNAIL_ROLE].score, Score::of(b"thumb:pixels"));
        assert!(entry.id.starts_with("2019-06-01T12:00:00Z"));
        assert!(entry.id.ends_with(Score::of(b"pixels").as_str()));

        let again = h.ingestor.ingest(&path).await.unwrap();
        assert_eq!(again, IngestOutcome::Duplicate { id: entry.id.clone() });
        assert_eq!(h.orig_blobs.upload_count(), 1);
        assert_eq!(h.thumb_blobs.upload_count(), 1);
        assert_eq!(h.index.len(), 1);
    }

    #[tokio::test]
    async fn rejected_file_has_no_side_effects() {
        let dir = tempfile::tempdir().unwrap();
        let path = photo(dir.path(), "notes.txt", b"text");
        let h = harness(false, PrefixDeriver::default());

        assert_eq!(h.ingestor.ingest(&path).await.unwrap(), IngestOutcome::Skipped);
        assert_eq!(h.orig_blobs.upload_count(), 0);
        assert!(h.deriver.made.lock().unwrap().is_empty());
        assert!(h.index.is_empty());
    }

    #[tokio::test]
    async fn derive_failure_still_drains_original_upload() {
        let dir = tempfile::tempdir().unwrap();
        let path = photo(dir.path(), "broken.jpg", b"bad pixels");
        let h = harness(
            true,
            PrefixDeriver {
                fail: true,
                ..Default::default()
            },
        );

        let err = h.ingestor.ingest(&path).await.unwrap_err();
        assert!(matches!(err, IngestError::Tool { .. }));
        // The original upload ran to completion and is not rolled back.
        assert_eq!(h.orig_blobs.upload_count(), 1);
        assert_eq!(h.thumb_blobs.upload_count(), 0);
        assert!(h.index.is_empty());
    }

    #[tokio::test]
    async fn thumbnail_scratch_file_is_released() {
        let dir = tempfile::tempdir().unwrap();
        let path = photo(dir.path(), "a.jpg", b"aaa");
        let h = harness(true, PrefixDeriver::default());
        h.ingestor.ingest(&path).await.unwrap();

        let made = h.deriver.made.lock().unwrap().clone();
        assert_eq!(made.len(), 1);
        assert!(!made[0].exists());
    }

    #[tokio::test]
    async fn thumbnail_scratch_file_is_released_when_upload_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = photo(dir.path(), "b.jpg", b"bbb");
        let records = Arc::new(MemoryRecordBackend::new());
        let orig_blobs = Arc::new(MemoryBlobBackend::new("orig"));
        let deriver = Arc::new(PrefixDeriver::default());
        let index = Arc::new(InMemoryIndex::new("family"));
        let when = Utc.with_ymd_and_hms(2019, 6, 1, 12, 0, 0).unwrap();
        let ingestor = Ingestor::new(
            Arc::new(TieredStore::new(orig_blobs.clone(), records.clone(), "Orig")),
            Arc::new(TieredStore::new(Arc::new(RefusingBlobs), records, "Thumb")),
            index.clone(),
            Arc::new(Accept(true)),
            deriver.clone(),
            Arc::new(Fixed(Metadata::new(when, "JN58td"))),
        );

        let err = ingestor.ingest(&path).await.unwrap_err();
        assert!(matches!(err, IngestError::Store(_)));

        let made = deriver.made.lock().unwrap().clone();
        assert_eq!(made.len(), 1);
        assert!(!made[0].exists());
        assert_eq!(orig_blobs.upload_count(), 1);
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn missing_file_fails() {
        let h = harness(true, PrefixDeriver::default());
        let err = h
            .ingestor
            .ingest(Path::new("/definitely/not/here.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Io(_) | IngestError::Store(_)));
        assert!(h.index.is_empty());
    }

    #[tokio::test]
    async fn batch_report_counts_each_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let one = photo(dir.path(), "one.jpg", b"1");
        let two = photo(dir.path(), "two.jpg", b"2");
        let gone = dir.path().join("gone.jpg");
        let h = harness(true, PrefixDeriver::default());

        let report = h
            .ingestor
            .ingest_all(&[one.clone(), two, one, gone.clone()])
            .await;
        assert_eq!(report.added.len(), 2);
        assert_eq!(report.duplicates.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, gone);
        assert_eq!(report.total(), 4);
        assert!(!report.is_success());
    }

    #[tokio::test]
    async fn entry_type_is_configurable() {
        let dir = tempfile::tempdir().unwrap();
        let path = photo(dir.path(), "scan.png", b"scan");
        let h = harness(true, PrefixDeriver::default());
        let ingestor = h.ingestor.with_entry_type("document");

        let IngestOutcome::Added(entry) = ingestor.ingest(&path).await.unwrap() else {
            panic!("expected a new entry");
        };
        assert_eq!(entry.entry_type.as_deref(), Some("document"));
    }
}
