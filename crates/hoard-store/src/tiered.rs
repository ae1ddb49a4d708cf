use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use hoard_backend::{
    from_record, to_record, BlobBackend, PutCondition, RecordBackend, RecordKey,
};
use hoard_types::{Address, Score};
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::staging::StagedContent;
use crate::traits::ContentStore;

/// Key prefix for blobs in the blob backend; the full key is `prefix + score`.
pub const BLOB_PREFIX: &str = "blobs/";

/// Two-tier store: bytes in a [`BlobBackend`], addresses in a [`RecordBackend`].
///
/// The record table is keyed by score alone. Registration is a
/// create-if-absent write, so when several writers race on the same content
/// exactly one record is created and everyone returns that record's address.
/// Within one process, puts of the same score are additionally serialized so
/// that concurrent duplicates cost a single upload.
pub struct TieredStore {
    blobs: Arc<dyn BlobBackend>,
    records: Arc<dyn RecordBackend>,
    index_table: String,
    staging_dir: Option<PathBuf>,
    inflight: Mutex<HashMap<Score, Arc<Mutex<()>>>>,
}

impl TieredStore {
    pub fn new(
        blobs: Arc<dyn BlobBackend>,
        records: Arc<dyn RecordBackend>,
        index_table: impl Into<String>,
    ) -> Self {
        Self {
            blobs,
            records,
            index_table: index_table.into(),
            staging_dir: None,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Stage content in `dir` instead of the OS temp dir.
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    /// Name of the record table holding this store's addresses.
    pub fn index_table(&self) -> &str {
        &self.index_table
    }

    /// Run `f` while holding the in-process gate for `score`.
    fn exclusive<T>(&self, score: &Score, f: impl FnOnce() -> StoreResult<T>) -> StoreResult<T> {
        let gate = {
            let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(inflight.entry(score.clone()).or_default())
        };

        let result = {
            let _held = gate.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };

        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        // The map and this frame are the only holders: nobody else is waiting.
        if Arc::strong_count(&gate) == 2 {
            inflight.remove(score);
        }
        result
    }

    fn register(&self, address: &Address) -> StoreResult<Address> {
        let record = to_record(address)?;
        let key = RecordKey::partition(address.score.as_str());
        match self
            .records
            .put(&self.index_table, &key, &record, PutCondition::IfAbsent)
        {
            Ok(()) => Ok(address.clone()),
            Err(e) if e.is_condition_failed() => {
                warn!(
                    score = %address.score.short(),
                    table = %self.index_table,
                    "another writer registered this blob first; using its address"
                );
                self.describe(&address.score)
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl ContentStore for TieredStore {
    fn put(&self, content: &mut dyn Read) -> StoreResult<Address> {
        let mut staged = StagedContent::stage(content, self.staging_dir.as_deref())?;
        let score = staged.score.clone();
        debug!(score = %score.short(), size = staged.size, "content staged");

        self.exclusive(&score, || {
            match self.describe(&score) {
                Ok(existing) => {
                    debug!(score = %score.short(), location = %existing.location, "dedup hit");
                    return Ok(existing);
                }
                Err(StoreError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }

            let key = format!("{BLOB_PREFIX}{score}");
            let location = self.blobs.put(&key, staged.reader()?)?;
            let address = Address::new(score.clone(), location, staged.size);
            let address = self.register(&address)?;
            info!(
                score = %score.short(),
                size = address.size,
                location = %address.location,
                "blob stored"
            );
            Ok(address)
        })
    }

    fn get_address(&self, address: &Address, writer: &mut dyn Write) -> StoreResult<()> {
        let copied = self.blobs.get(&address.location, writer)?;
        if copied != address.size {
            return Err(StoreError::SizeMismatch {
                location: address.location.clone(),
                expected: address.size,
                actual: copied,
            });
        }
        Ok(())
    }

    fn describe(&self, score: &Score) -> StoreResult<Address> {
        let key = RecordKey::partition(score.as_str());
        match self.records.get(&self.index_table, &key)? {
            Some(record) => Ok(from_record(record)?),
            None => Err(StoreError::NotFound(score.clone())),
        }
    }
}

impl std::fmt::Debug for TieredStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredStore")
            .field("scheme", &self.blobs.scheme())
            .field("index_table", &self.index_table)
            .field("staging_dir", &self.staging_dir)
            .finish()
    }
}
