//! Mock implementation of ChunkStore for testing

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::info;

use crate::chunks::{ChunkReader, ChunkStore};
use crate::error::StoreError;

type ChunkMap = HashMap<String, BTreeMap<u32, Vec<u8>>>;

/// In-memory chunk store.
///
/// Tracks how many readers are open so tests can check that every read
/// cursor is released, and can be told to fail writes.
pub struct MockChunkStore {
    chunks: Arc<Mutex<ChunkMap>>,
    open_readers: Arc<AtomicUsize>,
    fail_writes: AtomicBool,
}

impl MockChunkStore {
    pub fn new() -> Self {
        Self {
            chunks: Arc::new(Mutex::new(HashMap::new())),
            open_readers: Arc::new(AtomicUsize::new(0)),
            fail_writes: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ChunkMap> {
        self.chunks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of objects with at least one chunk
    pub fn object_count(&self) -> usize {
        self.lock().len()
    }

    /// Readers currently open
    pub fn open_readers(&self) -> usize {
        self.open_readers.load(Ordering::SeqCst)
    }

    /// Make every following `put_chunk` fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Overwrite a stored chunk without going through the write path
    pub fn tamper_chunk(&self, file_id: &str, n: u32, data: &[u8]) {
        if let Some(chunk) = self.lock().get_mut(file_id).and_then(|c| c.get_mut(&n)) {
            *chunk = data.to_vec();
        }
    }
}

impl Default for MockChunkStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkStore for MockChunkStore {
    fn put_chunk(&self, file_id: &str, n: u32, data: &[u8]) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("mock write failure".to_string()));
        }
        self.lock()
            .entry(file_id.to_string())
            .or_default()
            .insert(n, data.to_vec());
        info!("Mock: Wrote chunk {} of {} ({} bytes)", n, file_id, data.len());
        Ok(())
    }

    fn open_reader(&self, file_id: &str) -> Result<Box<dyn ChunkReader>, StoreError> {
        let chunks = self.lock().get(file_id).cloned().ok_or_else(|| StoreError::Corrupted {
            id: file_id.to_string(),
            reason: "no chunks stored".to_string(),
        })?;

        self.open_readers.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockChunkReader {
            file_id: file_id.to_string(),
            chunks,
            open_readers: Arc::clone(&self.open_readers),
        }))
    }

    fn delete_chunks(&self, file_id: &str) -> Result<(), StoreError> {
        if self.lock().remove(file_id).is_some() {
            info!("Mock: Deleted chunks of {}", file_id);
        }
        Ok(())
    }

    fn chunk_count(&self, file_id: &str) -> Result<u32, StoreError> {
        Ok(self.lock().get(file_id).map(|c| c.len() as u32).unwrap_or(0))
    }
}

struct MockChunkReader {
    file_id: String,
    chunks: BTreeMap<u32, Vec<u8>>,
    open_readers: Arc<AtomicUsize>,
}

impl ChunkReader for MockChunkReader {
    fn read_chunk(&mut self, n: u32) -> Result<Vec<u8>, StoreError> {
        self.chunks.get(&n).cloned().ok_or_else(|| StoreError::Corrupted {
            id: self.file_id.clone(),
            reason: format!("missing chunk {}", n),
        })
    }
}

impl Drop for MockChunkReader {
    fn drop(&mut self) {
        self.open_readers.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_counter_tracks_drops() {
        let store = MockChunkStore::new();
        store.put_chunk("a", 0, b"x").unwrap();

        let first = store.open_reader("a").unwrap();
        let second = store.open_reader("a").unwrap();
        assert_eq!(store.open_readers(), 2);
        drop(first);
        assert_eq!(store.open_readers(), 1);
        drop(second);
        assert_eq!(store.open_readers(), 0);
    }

    #[test]
    fn test_failed_open_does_not_count() {
        let store = MockChunkStore::new();
        assert!(store.open_reader("missing").is_err());
        assert_eq!(store.open_readers(), 0);
    }

    #[test]
    fn test_fail_writes() {
        let store = MockChunkStore::new();
        store.set_fail_writes(true);
        assert!(store.put_chunk("a", 0, b"x").is_err());
        assert_eq!(store.object_count(), 0);

        store.set_fail_writes(false);
        store.put_chunk("a", 0, b"x").unwrap();
        assert_eq!(store.chunk_count("a").unwrap(), 1);
    }
}
