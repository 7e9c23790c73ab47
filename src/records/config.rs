//! Configuration for file record backends

use std::sync::Arc;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::records::{mock_store::MockRecordStore, sqlite_store::SqliteRecordStore, FileRecordStore};

/// Available record storage backends
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub enum RecordBackend {
    #[default]
    SQLite,
    Mock,
}

impl std::str::FromStr for RecordBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(RecordBackend::SQLite),
            "mock" => Ok(RecordBackend::Mock),
            _ => Err(format!("Unknown record backend: {}", s)),
        }
    }
}

/// Record storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordConfig {
    pub backend: RecordBackend,
    /// Database file path
    pub db_path: String,
    /// Enable WAL mode
    pub wal_mode: bool,
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            backend: RecordBackend::default(),
            db_path: "./data/records.db".to_string(),
            wal_mode: true,
        }
    }
}

impl RecordConfig {
    /// Create a record store instance based on the configuration
    pub fn create_store(&self) -> Result<Arc<dyn FileRecordStore>, StoreError> {
        match self.backend {
            RecordBackend::SQLite => {
                info!("Creating SQLite record store");
                Ok(Arc::new(SqliteRecordStore::open(&self.db_path, self.wal_mode)?))
            }
            RecordBackend::Mock => {
                info!("Creating Mock record store");
                Ok(Arc::new(MockRecordStore::new()))
            }
        }
    }
}
