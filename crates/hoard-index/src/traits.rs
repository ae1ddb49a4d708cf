//! The [`EntryIndex`] trait defining the index interface.
//!
//! Any backend (in-memory, key-value store) implements this trait. All keys
//! are scoped by [`EntryIndex::group`].

use hoard_types::Entry;

use crate::error::{IndexError, Result};

/// Storage for entries, aliases and relations.
///
/// Implementations must be thread-safe (`Send + Sync`). Single-key writes are
/// atomic; operations that check one key and write another (`alias`,
/// `relate`) are not, and an entry that vanished between the check and the
/// write would go unnoticed. Entries are never deleted, so the window is
/// harmless today.
pub trait EntryIndex: Send + Sync {
    /// The group every key is scoped by.
    fn group(&self) -> &str;

    /// Insert a new entry, stamping the group and deriving missing ids.
    ///
    /// Returns the entry as stored. Fails with [`IndexError::EntryExists`] if
    /// the id is taken; re-ingesting identical content lands here.
    fn add(&self, entry: Entry) -> Result<Entry>;

    /// Fetch an entry by id.
    fn get(&self, id: &str) -> Result<Entry>;

    /// Whether an entry with this id exists.
    fn exists(&self, id: &str) -> Result<bool>;

    /// Bind `alias` to the existing entry `id`.
    fn alias(&self, alias: &str, id: &str) -> Result<()>;

    /// Resolve an alias to its entry.
    fn get_alias(&self, alias: &str) -> Result<Entry>;

    /// Remove an alias. Removing an unbound alias succeeds.
    fn unalias(&self, alias: &str) -> Result<()>;

    /// Add the directed edge `a -> b`. Both entries must exist.
    fn relate(&self, a: &str, b: &str) -> Result<()>;

    /// Remove the edge `a -> b`. Removing a missing edge succeeds.
    fn unrelate(&self, a: &str, b: &str) -> Result<()>;

    /// Targets of all edges leaving `id`, sorted. Empty if there are none.
    fn relations(&self, id: &str) -> Result<Vec<String>>;

    /// Entries whose grid square starts with `prefix`, ordered by
    /// `gridsquare_id`.
    fn near(&self, gridsquare_prefix: &str) -> Result<Vec<Entry>>;

    /// Fail with [`IndexError::MissingEntry`] unless every id exists.
    fn require_entries(&self, ids: &[&str]) -> Result<()> {
        for id in ids {
            if !self.exists(id)? {
                return Err(IndexError::MissingEntry { id: id.to_string() });
            }
        }
        Ok(())
    }
}
