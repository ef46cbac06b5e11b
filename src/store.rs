//! Persistence boundary for records, band handles, index results, and
//! capture groups.
//!
//! The pipeline only calls save/append operations; schema and transactions
//! belong to whichever backend implements [`RecordStore`]. `MemoryStore` is
//! the in-process implementation used by tests and dry runs.
use std::collections::HashMap;
use std::sync::Mutex;

use thiserror::Error;
use tracing::debug;

use crate::record::{BandHandle, CaptureGroup, Footprint, IndexResult, ProductRecord};
use crate::types::Mission;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Unknown record: {0}")]
    UnknownRecord(String),
}

/// Durable home of the data model. Implementations must be shareable across
/// pipeline worker threads.
pub trait RecordStore: Send + Sync {
    /// Persist the current state of a record (upsert by id).
    fn save_record(&self, record: &ProductRecord) -> Result<(), StoreError>;

    /// Append one imported band to its record's band list.
    fn append_band(&self, handle: &BandHandle) -> Result<(), StoreError>;

    /// Persist one rendered index output.
    fn save_index(&self, index: &IndexResult) -> Result<(), StoreError>;

    /// Look up an existing capture group by its grouping key.
    fn find_group(
        &self,
        mission: Mission,
        product_type: &str,
        footprint: Option<&Footprint>,
    ) -> Result<Option<CaptureGroup>, StoreError>;

    /// Persist a new capture group.
    fn save_group(&self, group: &CaptureGroup) -> Result<(), StoreError>;
}

#[derive(Default)]
struct MemoryStoreInner {
    records: HashMap<String, ProductRecord>,
    bands: Vec<BandHandle>,
    indices: Vec<IndexResult>,
    groups: Vec<CaptureGroup>,
}

/// In-memory store backed by a mutex, suitable for tests and `--dry-run`
/// ingestion where no database is configured.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryStoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, id: &str) -> Option<ProductRecord> {
        self.inner.lock().unwrap().records.get(id).cloned()
    }

    pub fn bands_for(&self, record_id: &str) -> Vec<BandHandle> {
        self.inner
            .lock()
            .unwrap()
            .bands
            .iter()
            .filter(|b| b.record_id == record_id)
            .cloned()
            .collect()
    }

    pub fn indices_for(&self, record_id: &str) -> Vec<IndexResult> {
        self.inner
            .lock()
            .unwrap()
            .indices
            .iter()
            .filter(|i| i.record_id == record_id)
            .cloned()
            .collect()
    }

    pub fn group_count(&self) -> usize {
        self.inner.lock().unwrap().groups.len()
    }
}

impl RecordStore for MemoryStore {
    fn save_record(&self, record: &ProductRecord) -> Result<(), StoreError> {
        debug!(record_id = %record.id, "saving record");
        let mut inner = self.inner.lock().unwrap();
        inner.records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn append_band(&self, handle: &BandHandle) -> Result<(), StoreError> {
        debug!(record_id = %handle.record_id, code = %handle.code, "appending band");
        self.inner.lock().unwrap().bands.push(handle.clone());
        Ok(())
    }

    fn save_index(&self, index: &IndexResult) -> Result<(), StoreError> {
        debug!(record_id = %index.record_id, kind = %index.kind, "saving index result");
        self.inner.lock().unwrap().indices.push(index.clone());
        Ok(())
    }

    fn find_group(
        &self,
        mission: Mission,
        product_type: &str,
        footprint: Option<&Footprint>,
    ) -> Result<Option<CaptureGroup>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .groups
            .iter()
            .find(|g| {
                g.mission == mission
                    && g.product_type == product_type
                    && g.footprint.as_ref() == footprint
            })
            .cloned())
    }

    fn save_group(&self, group: &CaptureGroup) -> Result<(), StoreError> {
        self.inner.lock().unwrap().groups.push(group.clone());
        Ok(())
    }
}
