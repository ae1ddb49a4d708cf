//! Wiring a [`HoardConfig`] into concrete stores and an index.

use std::sync::Arc;

use anyhow::Context;
use hoard_backend::{FsBlobBackend, FsRecordBackend, RecordBackend};
use hoard_index::{EntryIndex, RecordIndex};
use hoard_ingest::{ExifExtractor, IdentifyClassifier, Ingestor, ThumbnailDeriver};
use hoard_store::{ContentStore, TieredStore};

use crate::config::{HoardConfig, StoreConfig};

/// The stores and index of one local archive.
pub struct Archive {
    pub originals: Arc<dyn ContentStore>,
    pub thumbnails: Arc<dyn ContentStore>,
    pub index: Arc<dyn EntryIndex>,
    config: HoardConfig,
}

impl Archive {
    pub fn open(config: &HoardConfig) -> anyhow::Result<Self> {
        let staging = config.staging_dir();
        std::fs::create_dir_all(&staging)
            .with_context(|| format!("creating {}", staging.display()))?;

        let records: Arc<dyn RecordBackend> = Arc::new(FsRecordBackend::new(config.records_dir()));
        let originals = open_store(config, &config.stores.original, Arc::clone(&records))?;
        let thumbnails = open_store(config, &config.stores.thumbnail, Arc::clone(&records))?;
        let index = RecordIndex::new(records, config.group.as_str(), &config.table_prefix);

        Ok(Self {
            originals: Arc::new(originals),
            thumbnails: Arc::new(thumbnails),
            index: Arc::new(index),
            config: config.clone(),
        })
    }

    /// The store that holds addresses for `role`.
    pub fn store_for(&self, role: &str) -> Option<&Arc<dyn ContentStore>> {
        match role {
            hoard_types::ORIGINAL_ROLE => Some(&self.originals),
            hoard_types::THUMBNAIL_ROLE => Some(&self.thumbnails),
            _ => None,
        }
    }

    /// An ingestor using the configured ImageMagick tools.
    pub fn ingestor(&self) -> Ingestor {
        let tools = &self.config.tools;
        Ingestor::new(
            Arc::clone(&self.originals),
            Arc::clone(&self.thumbnails),
            Arc::clone(&self.index),
            Arc::new(IdentifyClassifier::new(&tools.identify)),
            Arc::new(
                ThumbnailDeriver::new(&tools.convert).with_geometry(&tools.thumbnail_geometry),
            ),
            Arc::new(ExifExtractor::new(&tools.identify)),
        )
        .with_entry_type(&tools.entry_type)
    }
}

fn open_store(
    config: &HoardConfig,
    store: &StoreConfig,
    records: Arc<dyn RecordBackend>,
) -> anyhow::Result<TieredStore> {
    let blobs = FsBlobBackend::new(config.blobs_dir(), store.container.as_str())
        .with_context(|| format!("opening blob container {:?}", store.container))?;
    let table = format!("{}{}", config.table_prefix, store.index_table);
    Ok(TieredStore::new(Arc::new(blobs), records, table).with_staging_dir(config.staging_dir()))
}
