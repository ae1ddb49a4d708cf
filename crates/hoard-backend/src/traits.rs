//! The backend traits shared by the content store and the entry index.

use std::fmt;
use std::io::{Read, Write};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{BackendError, BackendResult};

/// A record in its backend-native attribute form.
pub type Record = serde_json::Value;

/// Primary key of a record: a partition key plus an optional sort key.
///
/// Tables without a sort key use an empty `sort`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub partition: String,
    pub sort: String,
}

impl RecordKey {
    pub fn new(partition: impl Into<String>, sort: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            sort: sort.into(),
        }
    }

    /// A key for a table with no sort key.
    pub fn partition(partition: impl Into<String>) -> Self {
        Self::new(partition, "")
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sort.is_empty() {
            f.write_str(&self.partition)
        } else {
            write!(f, "{}/{}", self.partition, self.sort)
        }
    }
}

/// Condition attached to a record write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PutCondition {
    /// Create or replace.
    Always,
    /// Create only; fail with [`BackendError::ConditionFailed`] if the key exists.
    IfAbsent,
}

/// Small-record key-value backend.
///
/// Each call is atomic for its single key. There are no cross-key
/// transactions: callers that check one key and then write another must
/// tolerate the race in between.
pub trait RecordBackend: Send + Sync {
    /// Point lookup. Returns `Ok(None)` if the key is absent.
    fn get(&self, table: &str, key: &RecordKey) -> BackendResult<Option<Record>>;

    /// Write a record under `condition`.
    fn put(
        &self,
        table: &str,
        key: &RecordKey,
        record: &Record,
        condition: PutCondition,
    ) -> BackendResult<()>;

    /// Unconditional delete. Returns `true` if the key existed.
    fn delete(&self, table: &str, key: &RecordKey) -> BackendResult<bool>;

    /// All records in `partition` whose sort key starts with `sort_prefix`,
    /// ordered by sort key. An empty prefix returns the whole partition.
    fn query(
        &self,
        table: &str,
        partition: &str,
        sort_prefix: &str,
    ) -> BackendResult<Vec<(String, Record)>>;
}

/// Bulk blob backend.
pub trait BlobBackend: Send + Sync {
    /// Location scheme this backend produces (`"mem"`, `"file"`, ...).
    fn scheme(&self) -> &str;

    /// Upload `content` under `key` and return its location string.
    fn put(&self, key: &str, content: &mut dyn Read) -> BackendResult<String>;

    /// Stream the blob at `location` into `writer`. Returns bytes copied.
    fn get(&self, location: &str, writer: &mut dyn Write) -> BackendResult<u64>;
}

/// Serialize a value into its record form.
pub fn to_record<T: Serialize>(value: &T) -> BackendResult<Record> {
    serde_json::to_value(value).map_err(|e| BackendError::Serialization(e.to_string()))
}

/// Deserialize a record into a typed value.
pub fn from_record<T: DeserializeOwned>(record: Record) -> BackendResult<T> {
    serde_json::from_value(record).map_err(|e| BackendError::Serialization(e.to_string()))
}
