//! # Archive Ingestion Job
//!
//! Expands compressed archive objects from the landing prefix into
//! individual entries under the extraction prefix. Entities are archive
//! keys; entries that already exist at the destination are skipped, which
//! makes reruns cheap and idempotent. Bulk file work runs under the lower
//! concurrency ceiling (10 in the reference configuration).
//!
//! There is no destination clear here: extraction is additive, and the
//! skip-existing check takes the place of the delete-and-repopulate step
//! the table jobs perform.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::config::RecomputeConfig;
use crate::error::Result;
use crate::orchestration::{into_response, BatchJob, BatchOrchestrator, BatchResponse};
use crate::remote::ObjectStore;
use crate::results::EntityResult;

pub const DEFAULT_SOURCE_PREFIX: &str = "bronze/gdelt_data/";
pub const DEFAULT_EXTRACT_PREFIX: &str = "bronze/gdelt_data_unzip/";

/// One file extracted from an archive.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveEntry {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Splits raw archive bytes into entries. Decompression mechanics stay
/// behind this trait.
pub trait ArchiveReader: Send + Sync {
    fn entries(&self, archive_key: &str, bytes: &[u8]) -> Result<Vec<ArchiveEntry>>;
}

/// Batch job expanding archives into individual stored entries.
pub struct IngestionJob<O> {
    store: Arc<O>,
    reader: Arc<dyn ArchiveReader>,
    source_prefix: String,
    extract_prefix: String,
    concurrency: usize,
    /// Destination keys that existed before the batch; populated during the
    /// source listing and only read afterwards.
    existing: Mutex<HashSet<String>>,
}

impl<O> IngestionJob<O>
where
    O: ObjectStore + 'static,
{
    pub fn new(store: Arc<O>, reader: Arc<dyn ArchiveReader>, config: &RecomputeConfig) -> Self {
        Self {
            store,
            reader,
            source_prefix: DEFAULT_SOURCE_PREFIX.to_string(),
            extract_prefix: DEFAULT_EXTRACT_PREFIX.to_string(),
            concurrency: config.bulk_concurrency,
            existing: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_prefixes(
        mut self,
        source_prefix: impl Into<String>,
        extract_prefix: impl Into<String>,
    ) -> Self {
        self.source_prefix = source_prefix.into();
        self.extract_prefix = extract_prefix.into();
        self
    }
}

#[async_trait]
impl<O> BatchJob for IngestionJob<O>
where
    O: ObjectStore + 'static,
{
    fn name(&self) -> &str {
        "ingestion"
    }

    fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// List the archives to process and snapshot the already-extracted keys.
    async fn fetch_entities(&self) -> Result<Vec<String>> {
        let archives = self.store.list_prefix(&self.source_prefix).await?;
        let extracted = self.store.list_prefix(&self.extract_prefix).await?;
        info!(
            archives = archives.len(),
            already_extracted = extracted.len(),
            "archive listing complete"
        );
        *self.existing.lock() = extracted.into_iter().collect();
        Ok(archives)
    }

    /// Nothing to clear: extraction is additive and reruns skip existing
    /// entries instead of deleting them.
    async fn prepare_destination(&self) -> Result<()> {
        debug!(extract_prefix = %self.extract_prefix, "extraction destination is additive, no clear");
        Ok(())
    }

    async fn process(self: Arc<Self>, entity: String) -> EntityResult {
        let bytes = match self.store.get(&entity).await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(archive = %entity, error = %e, "archive download failed");
                return EntityResult::failed(entity, e.to_string());
            }
        };

        let entries = match self.reader.entries(&entity, &bytes) {
            Ok(entries) => entries,
            Err(e) => {
                error!(archive = %entity, error = %e, "archive could not be read");
                return EntityResult::failed(entity, e.to_string());
            }
        };

        let mut uploaded = 0usize;
        for entry in entries {
            let destination = format!("{}{}", self.extract_prefix, entry.name);
            if self.existing.lock().contains(&destination) {
                debug!(key = %destination, "entry already extracted, skipping");
                continue;
            }
            if let Err(e) = self.store.put(&destination, entry.bytes).await {
                error!(archive = %entity, key = %destination, error = %e, "entry upload failed");
                return EntityResult::failed(entity, e.to_string());
            }
            uploaded += 1;
        }

        debug!(archive = %entity, uploaded, "archive processed");
        EntityResult::success(entity)
    }
}

/// Entry point: run one ingestion batch.
pub async fn run_ingestion_job<O>(
    store: Arc<O>,
    reader: Arc<dyn ArchiveReader>,
    config: &RecomputeConfig,
) -> BatchResponse
where
    O: ObjectStore + 'static,
{
    let job = IngestionJob::new(store, reader, config);
    into_response(BatchOrchestrator::run(Arc::new(job)).await)
}
