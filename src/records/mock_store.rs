//! Mock implementation of FileRecordStore for testing

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::info;

use crate::error::StoreError;
use crate::records::{FileRecord, FileRecordStore};

/// In-memory record store
pub struct MockRecordStore {
    records: Arc<Mutex<HashMap<String, FileRecord>>>,
    fail_writes: AtomicBool,
}

impl MockRecordStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            fail_writes: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, FileRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record_count(&self) -> usize {
        self.lock().len()
    }

    /// Make every following `put_record` fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl Default for MockRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FileRecordStore for MockRecordStore {
    fn put_record(&self, record: &FileRecord) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("mock write failure".to_string()));
        }
        let mut records = self.lock();
        if records.contains_key(&record.id) {
            return Err(StoreError::Backend(format!("duplicate record id {}", record.id)));
        }
        records.insert(record.id.clone(), record.clone());
        info!("Mock: Stored record {}", record.id);
        Ok(())
    }

    fn get_record(&self, id: &str) -> Result<Option<FileRecord>, StoreError> {
        Ok(self.lock().get(id).cloned())
    }

    fn list_records(&self) -> Result<Vec<FileRecord>, StoreError> {
        let mut records: Vec<FileRecord> = self.lock().values().cloned().collect();
        records.sort_by(|a, b| b.upload_dt.cmp(&a.upload_dt).then_with(|| b.id.cmp(&a.id)));
        Ok(records)
    }
}
