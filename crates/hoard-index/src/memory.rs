//! In-memory index for testing and ephemeral use.
//!
//! [`InMemoryIndex`] keeps entries, aliases and relations in three maps, each
//! behind its own `RwLock`. No method holds one lock while taking another.

use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use hoard_types::Entry;
use tracing::debug;

use crate::error::{IndexError, Result};
use crate::traits::EntryIndex;

fn poisoned<E: std::fmt::Display>(e: E) -> IndexError {
    IndexError::LockPoisoned(e.to_string())
}

/// An in-memory implementation of [`EntryIndex`].
///
/// Data is lost when the index is dropped.
#[derive(Debug)]
pub struct InMemoryIndex {
    group: String,
    entries: RwLock<HashMap<String, Entry>>,
    aliases: RwLock<HashMap<String, String>>,
    relations: RwLock<HashMap<String, BTreeSet<String>>>,
}

impl InMemoryIndex {
    /// Create an empty index scoped to `group`.
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            entries: RwLock::new(HashMap::new()),
            aliases: RwLock::new(HashMap::new()),
            relations: RwLock::new(HashMap::new()),
        }
    }

    /// Number of entries stored.
    pub fn len(&self) -> usize {
        self.entries.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Returns `true` if no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EntryIndex for InMemoryIndex {
    fn group(&self) -> &str {
        &self.group
    }

    fn add(&self, mut entry: Entry) -> Result<Entry> {
        entry.group = self.group.clone();
        entry.assign_ids();

        let mut entries = self.entries.write().map_err(poisoned)?;
        if entries.contains_key(&entry.id) {
            return Err(IndexError::EntryExists { id: entry.id });
        }
        entries.insert(entry.id.clone(), entry.clone());
        debug!(id = %entry.id, "entry added");
        Ok(entry)
    }

    fn get(&self, id: &str) -> Result<Entry> {
        let entries = self.entries.read().map_err(poisoned)?;
        entries
            .get(id)
            .cloned()
            .ok_or_else(|| IndexError::EntryNotFound { id: id.to_string() })
    }

    fn exists(&self, id: &str) -> Result<bool> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries.contains_key(id))
    }

    fn alias(&self, alias: &str, id: &str) -> Result<()> {
        self.require_entries(&[id])?;

        let mut aliases = self.aliases.write().map_err(poisoned)?;
        if aliases.contains_key(alias) {
            return Err(IndexError::AliasExists {
                alias: alias.to_string(),
            });
        }
        aliases.insert(alias.to_string(), id.to_string());
        Ok(())
    }

    fn get_alias(&self, alias: &str) -> Result<Entry> {
        let id = {
            let aliases = self.aliases.read().map_err(poisoned)?;
            aliases
                .get(alias)
                .cloned()
                .ok_or_else(|| IndexError::AliasNotFound {
                    alias: alias.to_string(),
                })?
        };
        self.get(&id)
    }

    fn unalias(&self, alias: &str) -> Result<()> {
        let mut aliases = self.aliases.write().map_err(poisoned)?;
        aliases.remove(alias);
        Ok(())
    }

    fn relate(&self, a: &str, b: &str) -> Result<()> {
        self.require_entries(&[a, b])?;

        let mut relations = self.relations.write().map_err(poisoned)?;
        relations
            .entry(a.to_string())
            .or_default()
            .insert(b.to_string());
        Ok(())
    }

    fn unrelate(&self, a: &str, b: &str) -> Result<()> {
        let mut relations = self.relations.write().map_err(poisoned)?;
        if let Some(targets) = relations.get_mut(a) {
            targets.remove(b);
            if targets.is_empty() {
                relations.remove(a);
            }
        }
        Ok(())
    }

    fn relations(&self, id: &str) -> Result<Vec<String>> {
        let relations = self.relations.read().map_err(poisoned)?;
        Ok(relations
            .get(id)
            .map(|targets| targets.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn near(&self, gridsquare_prefix: &str) -> Result<Vec<Entry>> {
        let entries = self.entries.read().map_err(poisoned)?;
        let mut found: Vec<Entry> = entries
            .values()
            .filter(|e| {
                e.gridsquare_id
                    .as_deref()
                    .is_some_and(|gs| gs.starts_with(gridsquare_prefix))
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| a.gridsquare_id.cmp(&b.gridsquare_id));
        Ok(found)
    }
}
