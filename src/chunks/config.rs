//! Configuration for chunk storage backends

use std::sync::Arc;

use log::info;
use serde::{Deserialize, Serialize};

use crate::chunks::{local_store::LocalChunkStore, mock_store::MockChunkStore, ChunkStore};
use crate::error::StoreError;

/// 255 KiB, leaving room for the chunk record's own fields under the document ceiling
pub const DEFAULT_CHUNK_SIZE: u32 = 255 * 1024;

/// Largest single document the storage layer accepts (16 MiB)
pub const DEFAULT_MAX_DOCUMENT_SIZE: u64 = 16 * 1024 * 1024;

/// Available chunk storage backends
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub enum ChunkBackend {
    #[default]
    Local,
    Mock,
}

impl std::str::FromStr for ChunkBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" | "fs" | "filesystem" => Ok(ChunkBackend::Local),
            "mock" => Ok(ChunkBackend::Mock),
            _ => Err(format!("Unknown chunk backend: {}", s)),
        }
    }
}

/// Chunk storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkConfig {
    pub backend: ChunkBackend,
    /// Directory holding one sub-directory per object
    pub base_path: String,
    /// Staging directory for chunks being written
    pub temp_path: String,
    /// Bytes per chunk
    pub chunk_size: u32,
    /// Single-document size ceiling of the storage layer
    pub max_document_size: u64,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            backend: ChunkBackend::default(),
            base_path: "./data/chunks".to_string(),
            temp_path: "./data/temp".to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_document_size: DEFAULT_MAX_DOCUMENT_SIZE,
        }
    }
}

impl ChunkConfig {
    /// A chunk must be non-empty and fit in a single document
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("chunks.chunk_size must be positive".to_string());
        }
        if u64::from(self.chunk_size) > self.max_document_size {
            return Err(format!(
                "chunks.chunk_size {} exceeds max_document_size {}",
                self.chunk_size, self.max_document_size
            ));
        }
        Ok(())
    }

    /// Create a chunk store instance based on the configuration
    pub fn create_store(&self) -> Result<Arc<dyn ChunkStore>, StoreError> {
        info!("Creating chunk store with backend {:?}", self.backend);
        match self.backend {
            ChunkBackend::Local => Ok(Arc::new(LocalChunkStore::new(self)?)),
            ChunkBackend::Mock => Ok(Arc::new(MockChunkStore::new())),
        }
    }
}
