use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Settings for one archive, read from `hoard.toml`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoardConfig {
    /// Tenant scope for every index key.
    pub group: String,
    /// Root of the local blob and record directories.
    pub data_dir: PathBuf,
    /// Prepended to every record table name.
    pub table_prefix: String,
    pub stores: StoresConfig,
    pub tools: ToolsConfig,
}

impl Default for HoardConfig {
    fn default() -> Self {
        Self {
            group: "default".into(),
            data_dir: PathBuf::from(".hoard"),
            table_prefix: String::new(),
            stores: StoresConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

impl HoardConfig {
    /// Read `path`, or fall back to defaults if it does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", path.display()));
            }
        };
        toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn blobs_dir(&self) -> PathBuf {
        self.data_dir.join("blobs")
    }

    pub fn records_dir(&self) -> PathBuf {
        self.data_dir.join("records")
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.data_dir.join("staging")
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoresConfig {
    pub original: StoreConfig,
    pub thumbnail: StoreConfig,
}

impl Default for StoresConfig {
    fn default() -> Self {
        Self {
            original: StoreConfig::new("orig", "Orig"),
            thumbnail: StoreConfig::new("thumb", "Thumb"),
        }
    }
}

/// Where one content store keeps its blobs and its score index.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub container: String,
    pub index_table: String,
}

impl StoreConfig {
    fn new(container: &str, index_table: &str) -> Self {
        Self {
            container: container.into(),
            index_table: index_table.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub identify: PathBuf,
    pub convert: PathBuf,
    pub thumbnail_geometry: String,
    pub entry_type: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            identify: PathBuf::from("identify"),
            convert: PathBuf::from("convert"),
            thumbnail_geometry: hoard_ingest::DEFAULT_GEOMETRY.into(),
            entry_type: hoard_ingest::DEFAULT_ENTRY_TYPE.into(),
        }
    }
}
