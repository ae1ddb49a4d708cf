use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::address::Address;

/// Role key for the address of the original artifact.
pub const ORIGINAL_ROLE: &str = "orig";
/// Role key for the address of the derived thumbnail.
pub const THUMBNAIL_ROLE: &str = "thumb";

/// Bytes of entropy in a random id suffix.
const RANDOM_SUFFIX_BYTES: usize = 32;

/// Indexed metadata record for one archived item.
///
/// An entry is created once by ingestion and is read-only afterwards. Its
/// `id` is derived on first insertion when left empty (see
/// [`Entry::assign_ids`]).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Formatted timestamp followed by the original's score (or random hex).
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// When the item happened.
    pub timestamp: DateTime<Utc>,
    /// Arbitrary priority used to filter out unimportant items.
    #[serde(default)]
    pub importance: i64,
    /// Free-form classification ("image", ...).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub entry_type: Option<String>,
    /// Maidenhead grid square.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gridsquare: Option<String>,
    /// Tenant scope. Stamped by the index on insertion.
    #[serde(default)]
    pub group: String,
    /// `gridsquare + id`, the secondary ordering key for location lookups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gridsquare_id: Option<String>,
    /// Role name to content address.
    #[serde(default)]
    pub addresses: BTreeMap<String, Address>,
}

impl Entry {
    /// Create an empty entry at `timestamp`.
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            id: String::new(),
            name: None,
            timestamp,
            importance: 0,
            entry_type: None,
            gridsquare: None,
            group: String::new(),
            gridsquare_id: None,
            addresses: BTreeMap::new(),
        }
    }

    /// Create an entry with a fixed id.
    pub fn with_id(id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            ..Self::new(timestamp)
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn entry_type(mut self, entry_type: impl Into<String>) -> Self {
        self.entry_type = Some(entry_type.into());
        self
    }

    pub fn importance(mut self, importance: i64) -> Self {
        self.importance = importance;
        self
    }

    /// Set the grid square. An empty string clears it.
    pub fn gridsquare(mut self, gridsquare: impl Into<String>) -> Self {
        let gridsquare = gridsquare.into();
        self.gridsquare = (!gridsquare.is_empty()).then_some(gridsquare);
        self
    }

    pub fn address(mut self, role: impl Into<String>, address: Address) -> Self {
        self.addresses.insert(role.into(), address);
        self
    }

    /// The address of the original artifact, if any.
    pub fn primary_address(&self) -> Option<&Address> {
        self.addresses.get(ORIGINAL_ROLE)
    }

    /// Fill in `id` (when empty) and `gridsquare_id` (when a grid square is set).
    ///
    /// The id is the RFC 3339 timestamp followed by the original's score, so
    /// ingesting the same content with the same timestamp twice yields the
    /// same id. Entries without an original get a random 256-bit suffix.
    pub fn assign_ids(&mut self) {
        if self.id.is_empty() {
            let ts = self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true);
            self.id = ts + &self.id_suffix();
        }

        match self.gridsquare.as_deref() {
            Some(gs) if !gs.is_empty() => {
                self.gridsquare_id = Some(format!("{gs}{}", self.id));
            }
            _ => self.gridsquare_id = None,
        }
    }

    fn id_suffix(&self) -> String {
        match self.primary_address() {
            Some(addr) => addr.score.to_string(),
            None => random_suffix(),
        }
    }
}

/// 32 random bytes, upper-case hex.
///
/// Panics only if the OS entropy source is unavailable.
fn random_suffix() -> String {
    let mut bytes = [0u8; RANDOM_SUFFIX_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode_upper(bytes)
}
