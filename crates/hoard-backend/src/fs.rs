//! Local-filesystem backends.
//!
//! Blobs live at `<root>/<container>/<key>` and are addressed as
//! `file://<container>/<key>`. Records live one JSON document per file at
//! `<root>/<table>/p<hex partition>/k<hex sort>.json`; key segments too long
//! for a file name are named by their SHA-256 instead (`q...`, `h...`), and
//! every file carries its full key.
//!
//! Every write lands in a temp file in the destination directory first and is
//! then renamed into place, so readers never observe a partial file.
//! Create-if-absent writes use a no-clobber rename, which makes them atomic
//! across processes sharing the same directory.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{BackendError, BackendResult};
use crate::location::BlobLocation;
use crate::traits::{BlobBackend, PutCondition, Record, RecordBackend, RecordKey};

const FILE_SCHEME: &str = "file";

/// Reject keys that could escape the backend root.
fn checked_relative(key: &str) -> BackendResult<&Path> {
    let path = Path::new(key);
    let valid = !key.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if valid {
        Ok(path)
    } else {
        Err(BackendError::InvalidKey(key.to_string()))
    }
}

/// Write `content` into a temp file beside `dest`, returning the unpersisted file.
fn stage_beside(dest: &Path, content: &mut dyn Read) -> BackendResult<NamedTempFile> {
    let dir = dest
        .parent()
        .ok_or_else(|| BackendError::InvalidKey(dest.display().to_string()))?;
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    io::copy(content, &mut tmp)?;
    tmp.as_file().sync_all()?;
    Ok(tmp)
}

/// Blob backend over a local directory.
#[derive(Clone, Debug)]
pub struct FsBlobBackend {
    root: PathBuf,
    container: String,
}

impl FsBlobBackend {
    /// Blobs for `container` are kept under `root/container`.
    pub fn new(root: impl Into<PathBuf>, container: impl Into<String>) -> BackendResult<Self> {
        let container = container.into();
        checked_relative(&container)?;
        if container.contains('/') {
            return Err(BackendError::InvalidKey(container));
        }
        Ok(Self {
            root: root.into(),
            container,
        })
    }

    fn path_for(&self, key: &str) -> BackendResult<PathBuf> {
        Ok(self.root.join(&self.container).join(checked_relative(key)?))
    }
}

impl BlobBackend for FsBlobBackend {
    fn scheme(&self) -> &str {
        FILE_SCHEME
    }

    fn put(&self, key: &str, content: &mut dyn Read) -> BackendResult<String> {
        let dest = self.path_for(key)?;
        let tmp = stage_beside(&dest, content)?;
        tmp.persist(&dest).map_err(|e| BackendError::Io(e.error))?;
        debug!(path = %dest.display(), "blob written");
        Ok(BlobLocation::new(FILE_SCHEME, &self.container, key).to_string())
    }

    fn get(&self, location: &str, writer: &mut dyn Write) -> BackendResult<u64> {
        let loc = BlobLocation::parse_for(location, FILE_SCHEME)?;
        if loc.container != self.container {
            return Err(BackendError::InvalidLocation {
                location: location.to_string(),
                reason: format!("container {:?} is not {:?}", loc.container, self.container),
            });
        }
        let path = self.path_for(&loc.key)?;
        let mut file = match fs::File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(BackendError::NotFound(location.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(io::copy(&mut file, writer)?)
    }
}

/// Longest key segment that is stored hex-encoded in a file name. Longer
/// segments are named by their SHA-256, which keeps every name well under
/// common 255-byte file name limits.
const MAX_PLAIN_SEGMENT: usize = 96;

/// Name a key segment on disk: `<plain><hex>` when short, `<hashed><sha256>`
/// otherwise. The tags keep the two forms from colliding.
fn segment_name(plain: char, hashed: char, segment: &str) -> String {
    if segment.len() <= MAX_PLAIN_SEGMENT {
        format!("{plain}{}", hex::encode(segment))
    } else {
        format!("{hashed}{}", hex::encode(Sha256::digest(segment.as_bytes())))
    }
}

/// On-disk form of a record. The key travels with it, since a hashed file
/// name cannot be decoded back into the key.
#[derive(Serialize, Deserialize)]
struct StoredRecord {
    partition: String,
    sort: String,
    record: Record,
}

/// Small-record backend storing one JSON file per record.
#[derive(Clone, Debug)]
pub struct FsRecordBackend {
    root: PathBuf,
}

impl FsRecordBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn table_dir(&self, table: &str) -> BackendResult<PathBuf> {
        let valid = !table.is_empty()
            && !table.starts_with('.')
            && table
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(BackendError::InvalidKey(table.to_string()));
        }
        Ok(self.root.join(table))
    }

    fn partition_dir(&self, table: &str, partition: &str) -> BackendResult<PathBuf> {
        Ok(self
            .table_dir(table)?
            .join(segment_name('p', 'q', partition)))
    }

    fn record_path(&self, table: &str, key: &RecordKey) -> BackendResult<PathBuf> {
        Ok(self
            .partition_dir(table, &key.partition)?
            .join(format!("{}.json", segment_name('k', 'h', &key.sort))))
    }

    fn read_stored(path: &Path) -> BackendResult<Option<StoredRecord>> {
        match fs::read(path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| BackendError::Serialization(e.to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl RecordBackend for FsRecordBackend {
    fn get(&self, table: &str, key: &RecordKey) -> BackendResult<Option<Record>> {
        let stored = Self::read_stored(&self.record_path(table, key)?)?;
        Ok(stored.map(|s| s.record))
    }

    fn put(
        &self,
        table: &str,
        key: &RecordKey,
        record: &Record,
        condition: PutCondition,
    ) -> BackendResult<()> {
        let dest = self.record_path(table, key)?;
        let stored = StoredRecord {
            partition: key.partition.clone(),
            sort: key.sort.clone(),
            record: record.clone(),
        };
        let bytes =
            serde_json::to_vec(&stored).map_err(|e| BackendError::Serialization(e.to_string()))?;
        let tmp = stage_beside(&dest, &mut bytes.as_slice())?;
        match condition {
            PutCondition::Always => {
                tmp.persist(&dest).map_err(|e| BackendError::Io(e.error))?;
            }
            PutCondition::IfAbsent => match tmp.persist_noclobber(&dest) {
                Ok(_) => {}
                Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                    return Err(BackendError::ConditionFailed {
                        table: table.to_string(),
                        key: key.to_string(),
                    });
                }
                Err(e) => return Err(BackendError::Io(e.error)),
            },
        }
        Ok(())
    }

    fn delete(&self, table: &str, key: &RecordKey) -> BackendResult<bool> {
        match fs::remove_file(self.record_path(table, key)?) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn query(
        &self,
        table: &str,
        partition: &str,
        sort_prefix: &str,
    ) -> BackendResult<Vec<(String, Record)>> {
        let dir = self.partition_dir(table, partition)?;
        let listing = match fs::read_dir(&dir) {
            Ok(listing) => listing,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut rows = Vec::new();
        for dirent in listing {
            let dirent = dirent?;
            // Temp files from in-flight writes have no `.json` suffix.
            if dirent.path().extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            // A concurrent delete may remove the file between listing and reading.
            let Some(stored) = Self::read_stored(&dirent.path())? else {
                continue;
            };
            if stored.partition == partition && stored.sort.starts_with(sort_prefix) {
                rows.push((stored.sort, stored.record));
            }
        }
        rows.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(rows)
    }
}
