//! Chunked Binary Storage Abstraction
//!
//! Binary payloads are split into fixed-size chunks keyed by
//! `(file id, chunk number)`, so objects larger than a single document can be
//! written piecewise and reassembled on read. Backends only see chunks; the
//! record store (see `records`) knows how many chunks make up an object.

pub mod config;
pub mod local_store;
pub mod mock_store;


use bytes::Bytes;
use log::debug;

use crate::error::StoreError;

/// Trait defining the chunk storage interface
pub trait ChunkStore: Send + Sync {
    /// Store chunk `n` of an object, replacing any previous chunk `n`
    fn put_chunk(&self, file_id: &str, n: u32, data: &[u8]) -> Result<(), StoreError>;

    /// Open a reader over an object's chunks
    fn open_reader(&self, file_id: &str) -> Result<Box<dyn ChunkReader>, StoreError>;

    /// Remove every chunk of an object. Removing an unknown object is not an error.
    fn delete_chunks(&self, file_id: &str) -> Result<(), StoreError>;

    /// Number of chunks currently stored for an object
    fn chunk_count(&self, file_id: &str) -> Result<u32, StoreError>;
}

/// Open read handle on one object's chunks. Released when dropped.
pub trait ChunkReader: Send {
    fn read_chunk(&mut self, n: u32) -> Result<Vec<u8>, StoreError>;
}

/// Split a payload into `chunk_size` pieces. Every object has at least one
/// chunk, so an empty payload is a single empty chunk.
pub fn split_chunks(data: &[u8], chunk_size: usize) -> Vec<&[u8]> {
    if data.is_empty() {
        return vec![data];
    }
    data.chunks(chunk_size.max(1)).collect()
}

/// Sequential cursor over an object's chunks.
///
/// Yields chunks `0..count` in order and stops after the first error. The
/// underlying reader is released when the cursor is dropped, whether or not
/// it was read to the end.
pub struct ChunkCursor {
    file_id: String,
    reader: Box<dyn ChunkReader>,
    next: u32,
    count: u32,
}

impl ChunkCursor {
    pub fn new(file_id: &str, reader: Box<dyn ChunkReader>, count: u32) -> Self {
        Self {
            file_id: file_id.to_string(),
            reader,
            next: 0,
            count,
        }
    }

    /// Chunks not read yet
    pub fn remaining(&self) -> u32 {
        self.count - self.next
    }

    /// Read every remaining chunk into one contiguous buffer
    pub fn read_to_end(mut self, capacity: usize) -> Result<Vec<u8>, StoreError> {
        let mut buffer = Vec::with_capacity(capacity);
        for chunk in self.by_ref() {
            buffer.extend_from_slice(&chunk?);
        }
        Ok(buffer)
    }
}

impl Iterator for ChunkCursor {
    type Item = Result<Bytes, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.count {
            return None;
        }
        let n = self.next;
        match self.reader.read_chunk(n) {
            Ok(chunk) => {
                self.next += 1;
                Some(Ok(Bytes::from(chunk)))
            }
            Err(e) => {
                self.next = self.count;
                Some(Err(e))
            }
        }
    }
}

impl Drop for ChunkCursor {
    fn drop(&mut self) {
        if self.next < self.count {
            debug!(
                "Chunk cursor for {} released after {}/{} chunks",
                self.file_id, self.next, self.count
            );
        }
    }
}
