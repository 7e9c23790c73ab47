//! Blob store gateway
//!
//! Splits file payloads into chunks, writes them to the chunk store and
//! records the object in the record store. Callers are expected to have run
//! the operation guard already; this layer only deals with storage.
//!
//! Chunks are written before the record. A failure in between leaves
//! orphaned chunks (removed best-effort), never a record without data.

use std::sync::Arc;

use chrono::Utc;
use log::{debug, error, info, warn};

use crate::chunks::{split_chunks, ChunkCursor, ChunkStore};
use crate::error::StoreError;
use crate::ids::ObjectId;
use crate::model::FileData;
use crate::records::{FileRecord, FileRecordStore};
use crate::reply::Reply;
use crate::service::session::SessionContext;
use crate::status::Status;

pub const ADD_FAILED: &str = "could not add file";
pub const GET_FAILED: &str = "could not get file";
pub const LIST_FAILED: &str = "could not list files";

/// Open download: the stored record and a lazy cursor over its chunks
pub struct FileDownload {
    pub record: FileRecord,
    pub cursor: ChunkCursor,
}

pub struct FileService {
    chunks: Arc<dyn ChunkStore>,
    records: Arc<dyn FileRecordStore>,
    chunk_size: u32,
}

fn not_found<T>() -> Reply<T> {
    Reply::failed(Status::with_error("file_id.err", "file not found"))
}

fn checksum(data: &[u8]) -> String {
    format!("{:x}", md5::compute(data))
}

impl FileService {
    pub fn new(
        chunks: Arc<dyn ChunkStore>,
        records: Arc<dyn FileRecordStore>,
        chunk_size: u32,
    ) -> Self {
        Self {
            chunks,
            records,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    /// Store a new file and return its freshly assigned id
    pub fn add(&self, session: &SessionContext, file: &FileData) -> Reply<String> {
        let (Some(content_type), Some(data)) = (file.content_type.as_deref(), file.data.as_deref())
        else {
            warn!("add called with an incomplete file");
            return Reply::message(ADD_FAILED);
        };

        match self.store(session, content_type, data) {
            Ok(id) => Reply::ok(id),
            Err(e) => {
                error!("Failed to add file: {}", e);
                Reply::message(ADD_FAILED)
            }
        }
    }

    fn store(
        &self,
        session: &SessionContext,
        content_type: &str,
        data: &[u8],
    ) -> Result<String, StoreError> {
        let id = ObjectId::new().to_hex();
        let pieces = split_chunks(data, self.chunk_size as usize);

        for (n, piece) in pieces.iter().enumerate() {
            if let Err(e) = self.chunks.put_chunk(&id, n as u32, piece) {
                self.discard_chunks(&id);
                return Err(e);
            }
        }

        let record = FileRecord {
            id: id.clone(),
            content_type: content_type.to_string(),
            length: data.len() as u64,
            chunk_size: self.chunk_size,
            chunk_count: pieces.len() as u32,
            md5: checksum(data),
            uploader_id: session.acc_id.clone(),
            upload_dt: Utc::now(),
        };
        if let Err(e) = self.records.put_record(&record) {
            self.discard_chunks(&id);
            return Err(e);
        }

        info!(
            "Stored file {} ({} bytes in {} chunks, {})",
            id, record.length, record.chunk_count, record.content_type
        );
        Ok(id)
    }

    fn discard_chunks(&self, id: &str) {
        if let Err(e) = self.chunks.delete_chunks(id) {
            warn!("Could not remove orphaned chunks of {}: {}", id, e);
        }
    }

    /// Fetch a whole file, verified against its record
    pub fn get(&self, file_id: &str) -> Reply<FileData> {
        let download = match self.open(file_id) {
            Reply {
                payload: Some(download),
                ..
            } => download,
            Reply { status, .. } => return Reply::failed(status),
        };

        let FileDownload { record, cursor } = download;
        match Self::read_verified(&record, cursor) {
            Ok(data) => {
                debug!("Read file {} ({} bytes)", record.id, data.len());
                Reply::ok(record.to_file_data(Some(data)))
            }
            Err(e) => {
                error!("Failed to read file {}: {}", file_id, e);
                Reply::message(GET_FAILED)
            }
        }
    }

    fn read_verified(record: &FileRecord, cursor: ChunkCursor) -> Result<Vec<u8>, StoreError> {
        let data = cursor.read_to_end(record.length as usize)?;
        let corrupted = |reason: String| StoreError::Corrupted {
            id: record.id.clone(),
            reason,
        };

        if data.len() as u64 != record.length {
            return Err(corrupted(format!(
                "length {} does not match recorded {}",
                data.len(),
                record.length
            )));
        }
        let digest = checksum(&data);
        if digest != record.md5 {
            return Err(corrupted(format!("md5 {} does not match recorded {}", digest, record.md5)));
        }
        Ok(data)
    }

    /// Open a file for streaming. Chunks are read as the cursor advances.
    pub fn open(&self, file_id: &str) -> Reply<FileDownload> {
        let record = match self.records.get_record(file_id) {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!("File {} not found", file_id);
                return not_found();
            }
            Err(e) => {
                error!("Failed to look up file {}: {}", file_id, e);
                return Reply::message(GET_FAILED);
            }
        };

        match self.chunks.chunk_count(&record.id) {
            Ok(stored) if stored == record.chunk_count => {}
            Ok(stored) => {
                error!(
                    "File {} has {} chunks stored, {} recorded",
                    file_id, stored, record.chunk_count
                );
                return Reply::message(GET_FAILED);
            }
            Err(e) => {
                error!("Failed to count chunks of {}: {}", file_id, e);
                return Reply::message(GET_FAILED);
            }
        }

        match self.chunks.open_reader(&record.id) {
            Ok(reader) => {
                let cursor = ChunkCursor::new(&record.id, reader, record.chunk_count);
                Reply::ok(FileDownload { record, cursor })
            }
            Err(e) => {
                error!("Failed to open chunks of {}: {}", file_id, e);
                Reply::message(GET_FAILED)
            }
        }
    }

    /// Every stored file without its payload, newest first
    pub fn list(&self) -> Reply<Vec<FileData>> {
        match self.records.list_records() {
            Ok(records) => Reply::ok(records.iter().map(|r| r.to_file_data(None)).collect()),
            Err(e) => {
                error!("Failed to list files: {}", e);
                Reply::message(LIST_FAILED)
            }
        }
    }
}
