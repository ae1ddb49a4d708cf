//! In-memory backends for tests and embedding.
//!
//! Both backends hold their data behind a `RwLock`. A conditional write takes
//! the table's write lock for the whole check-and-insert, so it is atomic with
//! respect to every other call on the same backend.

use std::collections::{BTreeMap, HashMap};
use std::io::{Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use crate::error::{BackendError, BackendResult};
use crate::location::BlobLocation;
use crate::traits::{BlobBackend, PutCondition, Record, RecordBackend, RecordKey};

const MEMORY_SCHEME: &str = "mem";

fn poisoned<E: std::fmt::Display>(e: E) -> BackendError {
    BackendError::LockPoisoned(e.to_string())
}

/// `HashMap`-backed blob backend producing `mem://<container>/<key>` locations.
pub struct MemoryBlobBackend {
    container: String,
    blobs: RwLock<HashMap<String, Vec<u8>>>,
    uploads: AtomicUsize,
}

impl MemoryBlobBackend {
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            blobs: RwLock::new(HashMap::new()),
            uploads: AtomicUsize::new(0),
        }
    }

    /// Number of `put` calls that reached this backend.
    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    /// Number of distinct keys held.
    pub fn len(&self) -> usize {
        self.blobs.read().map(|b| b.len()).unwrap_or(0)
    }

    /// Returns `true` if no blob has been stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlobBackend for MemoryBlobBackend {
    fn scheme(&self) -> &str {
        MEMORY_SCHEME
    }

    fn put(&self, key: &str, content: &mut dyn Read) -> BackendResult<String> {
        if key.is_empty() {
            return Err(BackendError::InvalidKey(key.to_string()));
        }
        let mut data = Vec::new();
        content.read_to_end(&mut data)?;
        self.uploads.fetch_add(1, Ordering::SeqCst);
        self.blobs
            .write()
            .map_err(poisoned)?
            .insert(key.to_string(), data);
        Ok(BlobLocation::new(MEMORY_SCHEME, &self.container, key).to_string())
    }

    fn get(&self, location: &str, writer: &mut dyn Write) -> BackendResult<u64> {
        let loc = BlobLocation::parse_for(location, MEMORY_SCHEME)?;
        if loc.container != self.container {
            return Err(BackendError::InvalidLocation {
                location: location.to_string(),
                reason: format!("container {:?} is not {:?}", loc.container, self.container),
            });
        }
        let blobs = self.blobs.read().map_err(poisoned)?;
        let data = blobs
            .get(&loc.key)
            .ok_or_else(|| BackendError::NotFound(location.to_string()))?;
        writer.write_all(data)?;
        Ok(data.len() as u64)
    }
}

impl std::fmt::Debug for MemoryBlobBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBlobBackend")
            .field("container", &self.container)
            .field("blob_count", &self.len())
            .field("uploads", &self.upload_count())
            .finish()
    }
}

type Table = BTreeMap<RecordKey, Record>;

/// In-memory small-record backend. Tables are created on first write.
#[derive(Debug, Default)]
pub struct MemoryRecordBackend {
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryRecordBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records in `table`.
    pub fn table_len(&self, table: &str) -> usize {
        self.tables
            .read()
            .map(|t| t.get(table).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }
}

impl RecordBackend for MemoryRecordBackend {
    fn get(&self, table: &str, key: &RecordKey) -> BackendResult<Option<Record>> {
        let tables = self.tables.read().map_err(poisoned)?;
        Ok(tables.get(table).and_then(|t| t.get(key)).cloned())
    }

    fn put(
        &self,
        table: &str,
        key: &RecordKey,
        record: &Record,
        condition: PutCondition,
    ) -> BackendResult<()> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        let rows = tables.entry(table.to_string()).or_default();
        if condition == PutCondition::IfAbsent && rows.contains_key(key) {
            return Err(BackendError::ConditionFailed {
                table: table.to_string(),
                key: key.to_string(),
            });
        }
        rows.insert(key.clone(), record.clone());
        Ok(())
    }

    fn delete(&self, table: &str, key: &RecordKey) -> BackendResult<bool> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        Ok(tables
            .get_mut(table)
            .map(|rows| rows.remove(key).is_some())
            .unwrap_or(false))
    }

    fn query(
        &self,
        table: &str,
        partition: &str,
        sort_prefix: &str,
    ) -> BackendResult<Vec<(String, Record)>> {
        let tables = self.tables.read().map_err(poisoned)?;
        let Some(rows) = tables.get(table) else {
            return Ok(Vec::new());
        };
        let start = RecordKey::new(partition, sort_prefix);
        Ok(rows
            .range(start..)
            .take_while(|(k, _)| k.partition == partition && k.sort.starts_with(sort_prefix))
            .map(|(k, v)| (k.sort.clone(), v.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blob_put_and_get() {
        let backend = MemoryBlobBackend::new("orig");
        let loc = backend.put("blobs/abc", &mut &b"hello"[..]).unwrap();
        assert_eq!(loc, "mem://orig/blobs/abc");

        let mut out = Vec::new();
        assert_eq!(backend.get(&loc, &mut out).unwrap(), 5);
        assert_eq!(out, b"hello");
        assert_eq!(backend.upload_count(), 1);
    }

    #[test]
    fn blob_get_missing_and_foreign() {
        let backend = MemoryBlobBackend::new("orig");
        let mut out = Vec::new();
        assert!(matches!(
            backend.get("mem://orig/blobs/none", &mut out),
            Err(BackendError::NotFound(_))
        ));
        assert!(matches!(
            backend.get("mem://thumb/blobs/none", &mut out),
            Err(BackendError::InvalidLocation { .. })
        ));
        assert!(matches!(
            backend.get("file://orig/blobs/none", &mut out),
            Err(BackendError::InvalidLocation { .. })
        ));
    }

    #[test]
    fn conditional_put_refuses_existing_key() {
        let backend = MemoryRecordBackend::new();
        let key = RecordKey::new("g", "id1");
        backend
            .put("Entries", &key, &json!({"v": 1}), PutCondition::IfAbsent)
            .unwrap();
        let err = backend
            .put("Entries", &key, &json!({"v": 2}), PutCondition::IfAbsent)
            .unwrap_err();
        assert!(err.is_condition_failed());
        assert_eq!(backend.get("Entries", &key).unwrap().unwrap()["v"], 1);

        backend
            .put("Entries", &key, &json!({"v": 3}), PutCondition::Always)
            .unwrap();
        assert_eq!(backend.get("Entries", &key).unwrap().unwrap()["v"], 3);
    }

    #[test]
    fn delete_is_idempotent() {
        let backend = MemoryRecordBackend::new();
        let key = RecordKey::partition("k");
        assert!(!backend.delete("T", &key).unwrap());
        backend.put("T", &key, &json!({}), PutCondition::Always).unwrap();
        assert!(backend.delete("T", &key).unwrap());
        assert!(!backend.delete("T", &key).unwrap());
    }

    #[test]
    fn query_stays_inside_partition_and_prefix() {
        let backend = MemoryRecordBackend::new();
        for (p, s) in [("g-a", "b"), ("g-a", "c"), ("g-ab", "x"), ("g-b", "a")] {
            backend
                .put("R", &RecordKey::new(p, s), &json!({"b": s}), PutCondition::Always)
                .unwrap();
        }
        let sorts: Vec<String> = backend
            .query("R", "g-a", "")
            .unwrap()
            .into_iter()
            .map(|(s, _)| s)
            .collect();
        assert_eq!(sorts, vec!["b", "c"]);

        assert_eq!(backend.query("R", "g-a", "c").unwrap().len(), 1);
        assert!(backend.query("R", "nobody", "").unwrap().is_empty());
        assert!(backend.query("Missing", "g-a", "").unwrap().is_empty());
    }

    #[test]
    fn concurrent_conditional_puts_have_one_winner() {
        use std::sync::Arc;
        use std::thread;

        let backend = Arc::new(MemoryRecordBackend::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let backend = Arc::clone(&backend);
                thread::spawn(move || {
                    backend
                        .put(
                            "T",
                            &RecordKey::partition("same"),
                            &json!({ "writer": i }),
                            PutCondition::IfAbsent,
                        )
                        .is_ok()
                })
            })
            .collect();
        let wins = handles
            .into_iter()
            .map(|h| h.join().expect("thread should not panic"))
            .filter(|won| *won)
            .count();
        assert_eq!(wins, 1);
    }
}
