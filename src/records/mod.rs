//! File Record Storage Abstraction
//!
//! One record per stored object, describing its payload: content type,
//! length, chunk layout and digest, plus the upload metadata. The payload
//! itself lives in the chunk store under the same id.

pub mod config;
pub mod mock_store;
pub mod sqlite_store;


use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::model::{FileData, FileMetadata};

/// Stored description of one object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileRecord {
    pub id: String,
    pub content_type: String,
    /// Payload length in bytes
    pub length: u64,
    pub chunk_size: u32,
    pub chunk_count: u32,
    /// Lowercase hex md5 of the whole payload
    pub md5: String,
    pub uploader_id: Option<String>,
    pub upload_dt: DateTime<Utc>,
}

impl FileRecord {
    pub fn metadata(&self) -> FileMetadata {
        FileMetadata {
            uploader_id: self.uploader_id.clone(),
            upload_dt: Some(self.upload_dt),
        }
    }

    /// Transport form, with or without the payload
    pub fn to_file_data(&self, data: Option<Vec<u8>>) -> FileData {
        FileData {
            id: Some(self.id.clone()),
            content_type: Some(self.content_type.clone()),
            metadata: Some(self.metadata()),
            data,
        }
    }
}

/// Trait defining the record storage interface
pub trait FileRecordStore: Send + Sync {
    /// Insert a new record. Ids are never reused, so an existing id is an error.
    fn put_record(&self, record: &FileRecord) -> Result<(), StoreError>;

    fn get_record(&self, id: &str) -> Result<Option<FileRecord>, StoreError>;

    /// Every record, newest upload first
    fn list_records(&self) -> Result<Vec<FileRecord>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_to_file_data() {
        let record = FileRecord {
            id: "65a0f1c2d3e4f5a6b7c8d9e0".to_string(),
            content_type: "text/plain".to_string(),
            length: 5,
            chunk_size: 4,
            chunk_count: 2,
            md5: "5d41402abc4b2a76b9719d911017c592".to_string(),
            uploader_id: Some("acc-7".to_string()),
            upload_dt: "2024-06-01T08:00:00Z".parse().unwrap(),
        };

        let listed = record.to_file_data(None);
        assert_eq!(listed.id.as_deref(), Some("65a0f1c2d3e4f5a6b7c8d9e0"));
        assert_eq!(listed.content_type.as_deref(), Some("text/plain"));
        assert!(listed.data.is_none());

        let metadata = listed.metadata.unwrap();
        assert_eq!(metadata.uploader_id.as_deref(), Some("acc-7"));
        assert_eq!(metadata.upload_dt, Some(record.upload_dt));

        let full = record.to_file_data(Some(b"hello".to_vec()));
        assert_eq!(full.data.as_deref(), Some(&b"hello"[..]));
    }
}
