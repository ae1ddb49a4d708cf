use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use hoard_types::{Address, Score};

use crate::error::StoreResult;

/// Content-addressed blob store.
///
/// All implementations must satisfy these invariants:
/// - Byte-identical content always gets the same score.
/// - A `put` of content whose score is already registered performs no upload
///   and returns the registered address, location included.
/// - `describe` reports a missing score as [`StoreError::NotFound`], never as
///   a transport error.
///
/// [`StoreError::NotFound`]: crate::StoreError::NotFound
pub trait ContentStore: Send + Sync {
    /// Store everything read from `content` and return its address.
    fn put(&self, content: &mut dyn Read) -> StoreResult<Address>;

    /// Stream the bytes for an already-resolved address into `writer`.
    fn get_address(&self, address: &Address, writer: &mut dyn Write) -> StoreResult<()>;

    /// Look up the address registered for `score`.
    fn describe(&self, score: &Score) -> StoreResult<Address>;

    /// Resolve `score` and stream its bytes into `writer`.
    fn get(&self, score: &Score, writer: &mut dyn Write) -> StoreResult<()> {
        let address = self.describe(score)?;
        self.get_address(&address, writer)
    }

    /// Store the contents of the file at `path`.
    fn put_file(&self, path: &Path) -> StoreResult<Address> {
        let mut file = File::open(path)?;
        self.put(&mut file)
    }
}
