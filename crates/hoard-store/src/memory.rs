use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use hoard_types::{Address, Score, ScoreHasher};

use crate::error::{StoreError, StoreResult};
use crate::tiered::BLOB_PREFIX;
use crate::traits::ContentStore;

/// In-memory, HashMap-based content store.
///
/// Intended for tests and embedding. Addresses and bytes live together in one
/// map behind a `RwLock`; the insert-if-absent under the write lock is what
/// makes duplicate puts return the first address.
pub struct InMemoryContentStore {
    name: String,
    objects: RwLock<HashMap<Score, (Address, Vec<u8>)>>,
    inserts: AtomicUsize,
}

impl InMemoryContentStore {
    /// Create an empty store. `name` becomes the container in its locations.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objects: RwLock::new(HashMap::new()),
            inserts: AtomicUsize::new(0),
        }
    }

    /// Number of distinct blobs stored.
    pub fn len(&self) -> usize {
        self.objects.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Number of puts that stored new bytes rather than reusing an address.
    pub fn insert_count(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total bytes across all stored blobs.
    pub fn total_bytes(&self) -> u64 {
        self.objects
            .read()
            .map(|m| m.values().map(|(addr, _)| addr.size).sum())
            .unwrap_or(0)
    }

    fn location_for(&self, score: &Score) -> String {
        format!("mem://{}/{BLOB_PREFIX}{score}", self.name)
    }
}

impl Default for InMemoryContentStore {
    fn default() -> Self {
        Self::new("memory")
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::LockPoisoned(e.to_string())
}

impl ContentStore for InMemoryContentStore {
    fn put(&self, content: &mut dyn Read) -> StoreResult<Address> {
        let mut hashing = ScoreHasher::new(Vec::new());
        io::copy(content, &mut hashing)?;
        let (data, score, size) = hashing.finish()?;

        let mut objects = self.objects.write().map_err(poisoned)?;
        let location = self.location_for(&score);
        let (address, _) = objects
            .entry(score.clone())
            .or_insert_with(|| {
                self.inserts.fetch_add(1, Ordering::SeqCst);
                (Address::new(score, location, size), data)
            });
        Ok(address.clone())
    }

    fn get_address(&self, address: &Address, writer: &mut dyn Write) -> StoreResult<()> {
        let objects = self.objects.read().map_err(poisoned)?;
        let (stored, data) = objects
            .get(&address.score)
            .ok_or_else(|| StoreError::NotFound(address.score.clone()))?;
        if stored.location != address.location {
            return Err(StoreError::NotFound(address.score.clone()));
        }
        writer.write_all(data)?;
        Ok(())
    }

    fn describe(&self, score: &Score) -> StoreResult<Address> {
        let objects = self.objects.read().map_err(poisoned)?;
        objects
            .get(score)
            .map(|(addr, _)| addr.clone())
            .ok_or_else(|| StoreError::NotFound(score.clone()))
    }
}

impl std::fmt::Debug for InMemoryContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryContentStore")
            .field("name", &self.name)
            .field("blob_count", &self.len())
            .finish()
    }
}
