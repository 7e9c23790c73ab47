//! Application State Management
//!
//! This module provides the application state that contains all services
//! and their dependencies, following the dependency injection pattern.

use std::sync::Arc;

use log::info;

use crate::chunks::mock_store::MockChunkStore;
use crate::chunks::ChunkStore;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::permissions::PermissionMatrix;
use crate::records::mock_store::MockRecordStore;
use crate::records::FileRecordStore;
use crate::service::FileService;

/// Application state containing all services and their dependencies
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub permissions: Arc<PermissionMatrix>,
    pub file_service: Arc<FileService>,
}

impl AppState {
    /// Create application state from configuration
    pub fn from_config(config: AppConfig) -> Result<Self, AppError> {
        info!("Initializing application state with configuration");
        config.validate()?;

        info!(
            "Chunk backend {:?} at {} (chunk size {})",
            config.chunks.backend, config.chunks.base_path, config.chunks.chunk_size
        );
        let chunks = config.chunks.create_store()?;

        info!(
            "Record backend {:?} at {} (wal_mode: {})",
            config.records.backend, config.records.db_path, config.records.wal_mode
        );
        let records = config.records.create_store()?;

        let state = Self::with_backends(config, chunks, records);
        info!("Application state initialized successfully");
        Ok(state)
    }

    /// Assemble the state around already created backends
    pub fn with_backends(
        config: AppConfig,
        chunks: Arc<dyn ChunkStore>,
        records: Arc<dyn FileRecordStore>,
    ) -> Self {
        let file_service = Arc::new(FileService::new(chunks, records, config.chunks.chunk_size));
        Self {
            permissions: Arc::new(config.permissions.clone()),
            file_service,
            config,
        }
    }

    /// Create application state for testing with mock backends
    pub fn new_for_testing() -> Self {
        Self::with_backends(
            AppConfig::default(),
            Arc::new(MockChunkStore::new()),
            Arc::new(MockRecordStore::new()),
        )
    }
}
