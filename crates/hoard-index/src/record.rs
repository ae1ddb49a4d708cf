//! Index over a [`RecordBackend`].
//!
//! Four logical tables, each name carrying a configurable prefix:
//!
//! | table              | partition       | sort            | record                          |
//! |--------------------|-----------------|-----------------|---------------------------------|
//! | `Entries`          | group           | id              | the [`Entry`]                   |
//! | `Aliases`          | group           | alias           | `{group, alias, id}`            |
//! | `Relations`        | `group-A`       | B               | `{a, b}`                        |
//! | `Group-Gridsquare` | group           | gridsquare_id   | `{group, gridsquare_id, id}`    |
//!
//! Entry and alias creation use a create-if-absent write, so two processes
//! sharing a backend can never both bind the same key.
//!
//! The gridsquare row is written after its entry. If that second write fails,
//! `add` reports the error and the next `add` of the same entry rewrites the
//! row before answering [`IndexError::EntryExists`].

use std::sync::Arc;

use hoard_backend::{from_record, to_record, PutCondition, RecordBackend, RecordKey};
use hoard_types::Entry;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{IndexError, Result};
use crate::traits::EntryIndex;

/// Concrete table names for one deployment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableNames {
    pub entries: String,
    pub aliases: String,
    pub relations: String,
    pub gridsquare: String,
}

impl TableNames {
    /// Standard table names behind `prefix`.
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            entries: format!("{prefix}Entries"),
            aliases: format!("{prefix}Aliases"),
            relations: format!("{prefix}Relations"),
            gridsquare: format!("{prefix}Group-Gridsquare"),
        }
    }
}

impl Default for TableNames {
    fn default() -> Self {
        Self::with_prefix("")
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct AliasRecord {
    group: String,
    alias: String,
    id: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct RelationRecord {
    a: String,
    b: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct GridsquareRecord {
    group: String,
    gridsquare_id: String,
    id: String,
}

/// [`EntryIndex`] persisted through a [`RecordBackend`].
///
/// Relation partitions are `group-A` with no escaping, so groups sharing one
/// backend must not be prefixes of each other followed by `-`: group `a` with
/// id `b-c` and group `a-b` with id `c` land in the same partition. Give each
/// group its own table prefix when group names can overlap like that.
pub struct RecordIndex {
    records: Arc<dyn RecordBackend>,
    group: String,
    tables: TableNames,
}

impl RecordIndex {
    pub fn new(
        records: Arc<dyn RecordBackend>,
        group: impl Into<String>,
        table_prefix: &str,
    ) -> Self {
        Self {
            records,
            group: group.into(),
            tables: TableNames::with_prefix(table_prefix),
        }
    }

    pub fn tables(&self) -> &TableNames {
        &self.tables
    }

    fn entry_key(&self, id: &str) -> RecordKey {
        RecordKey::new(self.group.as_str(), id)
    }

    fn alias_key(&self, alias: &str) -> RecordKey {
        RecordKey::new(self.group.as_str(), alias)
    }

    fn relation_partition(&self, a: &str) -> String {
        format!("{}-{a}", self.group)
    }

    /// Upsert the location row of `entry`, if it has a grid square.
    fn write_gridsquare_row(&self, entry: &Entry) -> Result<()> {
        let Some(gridsquare_id) = &entry.gridsquare_id else {
            return Ok(());
        };
        let row = GridsquareRecord {
            group: self.group.clone(),
            gridsquare_id: gridsquare_id.clone(),
            id: entry.id.clone(),
        };
        let key = RecordKey::new(self.group.as_str(), gridsquare_id.as_str());
        let record = to_record(&row)?;
        self.records
            .put(&self.tables.gridsquare, &key, &record, PutCondition::Always)?;
        Ok(())
    }
}

impl EntryIndex for RecordIndex {
    fn group(&self) -> &str {
        &self.group
    }

    fn add(&self, mut entry: Entry) -> Result<Entry> {
        entry.group = self.group.clone();
        entry.assign_ids();

        let record = to_record(&entry)?;
        match self.records.put(
            &self.tables.entries,
            &self.entry_key(&entry.id),
            &record,
            PutCondition::IfAbsent,
        ) {
            Ok(()) => {}
            Err(e) if e.is_condition_failed() => {
                let stored = self.get(&entry.id)?;
                self.write_gridsquare_row(&stored)?;
                return Err(IndexError::EntryExists { id: entry.id });
            }
            Err(e) => return Err(e.into()),
        }

        if let Err(e) = self.write_gridsquare_row(&entry) {
            warn!(id = %entry.id, error = %e, "gridsquare row not written");
            return Err(e);
        }

        debug!(id = %entry.id, group = %self.group, "entry added");
        Ok(entry)
    }

    fn get(&self, id: &str) -> Result<Entry> {
        let record = self
            .records
            .get(&self.tables.entries, &self.entry_key(id))?
            .ok_or_else(|| IndexError::EntryNotFound { id: id.to_string() })?;
        Ok(from_record(record)?)
    }

    fn exists(&self, id: &str) -> Result<bool> {
        Ok(self
            .records
            .get(&self.tables.entries, &self.entry_key(id))?
            .is_some())
    }

    fn alias(&self, alias: &str, id: &str) -> Result<()> {
        self.require_entries(&[id])?;

        let row = AliasRecord {
            group: self.group.clone(),
            alias: alias.to_string(),
            id: id.to_string(),
        };
        match self.records.put(
            &self.tables.aliases,
            &self.alias_key(alias),
            &to_record(&row)?,
            PutCondition::IfAbsent,
        ) {
            Ok(()) => Ok(()),
            Err(e) if e.is_condition_failed() => Err(IndexError::AliasExists {
                alias: alias.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn get_alias(&self, alias: &str) -> Result<Entry> {
        let record = self
            .records
            .get(&self.tables.aliases, &self.alias_key(alias))?
            .ok_or_else(|| IndexError::AliasNotFound {
                alias: alias.to_string(),
            })?;
        let row: AliasRecord = from_record(record)?;
        self.get(&row.id)
    }

    fn unalias(&self, alias: &str) -> Result<()> {
        self.records
            .delete(&self.tables.aliases, &self.alias_key(alias))?;
        Ok(())
    }

    fn relate(&self, a: &str, b: &str) -> Result<()> {
        self.require_entries(&[a, b])?;

        let row = RelationRecord {
            a: a.to_string(),
            b: b.to_string(),
        };
        let key = RecordKey::new(self.relation_partition(a), b);
        let record = to_record(&row)?;
        self.records
            .put(&self.tables.relations, &key, &record, PutCondition::Always)?;
        Ok(())
    }

    fn unrelate(&self, a: &str, b: &str) -> Result<()> {
        let key = RecordKey::new(self.relation_partition(a), b);
        self.records.delete(&self.tables.relations, &key)?;
        Ok(())
    }

    fn relations(&self, id: &str) -> Result<Vec<String>> {
        self.records
            .query(&self.tables.relations, &self.relation_partition(id), "")?
            .into_iter()
            .map(|(_, record)| -> Result<String> {
                let row: RelationRecord = from_record(record)?;
                Ok(row.b)
            })
            .collect()
    }

    fn near(&self, gridsquare_prefix: &str) -> Result<Vec<Entry>> {
        self.records
            .query(&self.tables.gridsquare, &self.group, gridsquare_prefix)?
            .into_iter()
            .map(|(_, record)| -> Result<Entry> {
                let row: GridsquareRecord = from_record(record)?;
                self.get(&row.id)
            })
            .collect()
    }
}

impl std::fmt::Debug for RecordIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordIndex")
            .field("group", &self.group)
            .field("tables", &self.tables)
            .finish()
    }
}
