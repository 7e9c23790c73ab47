//! SQLite implementation of FileRecordStore

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::StoreError;
use crate::records::{FileRecord, FileRecordStore};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS files (
    id TEXT PRIMARY KEY,
    content_type TEXT NOT NULL,
    length INTEGER NOT NULL,
    chunk_size INTEGER NOT NULL,
    chunk_count INTEGER NOT NULL,
    md5 TEXT NOT NULL,
    uploader_id TEXT,
    upload_dt TEXT NOT NULL
)";

const SELECT_COLUMNS: &str =
    "SELECT id, content_type, length, chunk_size, chunk_count, md5, uploader_id, upload_dt \
     FROM files";

/// SQLite implementation of FileRecordStore
pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
}

impl SqliteRecordStore {
    /// Open (creating if needed) the database at `db_path`
    pub fn open(db_path: &str, wal_mode: bool) -> Result<Self, StoreError> {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)?;
        if wal_mode {
            let mode: String =
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
            debug!("SQLite journal mode: {}", mode);
        }
        info!("Opened record database at {}", db_path);
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(CREATE_TABLE, [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Backend("record database lock poisoned".to_string()))
    }
}

type RawRecord = (String, String, i64, i64, i64, String, Option<String>, String);

fn read_row(row: &Row<'_>) -> rusqlite::Result<RawRecord> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn to_record(raw: RawRecord) -> Result<FileRecord, StoreError> {
    let (id, content_type, length, chunk_size, chunk_count, md5, uploader_id, upload_dt) = raw;
    let upload_dt = DateTime::parse_from_rfc3339(&upload_dt)
        .map_err(|e| StoreError::Encoding(format!("upload_dt of {}: {}", id, e)))?
        .with_timezone(&Utc);
    let out_of_range =
        |field: &str| StoreError::Encoding(format!("{} of {} out of range", field, id));

    Ok(FileRecord {
        length: u64::try_from(length).map_err(|_| out_of_range("length"))?,
        chunk_size: u32::try_from(chunk_size).map_err(|_| out_of_range("chunk_size"))?,
        chunk_count: u32::try_from(chunk_count).map_err(|_| out_of_range("chunk_count"))?,
        id,
        content_type,
        md5,
        uploader_id,
        upload_dt,
    })
}

impl FileRecordStore for SqliteRecordStore {
    fn put_record(&self, record: &FileRecord) -> Result<(), StoreError> {
        let length = i64::try_from(record.length)
            .map_err(|_| StoreError::Encoding(format!("length of {} out of range", record.id)))?;

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO files \
             (id, content_type, length, chunk_size, chunk_count, md5, uploader_id, upload_dt) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.id,
                record.content_type,
                length,
                record.chunk_size,
                record.chunk_count,
                record.md5,
                record.uploader_id,
                record.upload_dt.to_rfc3339_opts(SecondsFormat::Micros, true),
            ],
        )?;
        Ok(())
    }

    fn get_record(&self, id: &str) -> Result<Option<FileRecord>, StoreError> {
        let conn = self.lock()?;
        let raw = conn
            .query_row(&format!("{} WHERE id = ?1", SELECT_COLUMNS), params![id], read_row)
            .optional()?;
        raw.map(to_record).transpose()
    }

    fn list_records(&self) -> Result<Vec<FileRecord>, StoreError> {
        let conn = self.lock()?;
        let sql = format!("{} ORDER BY upload_dt DESC, rowid DESC", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], read_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(to_record(row?)?);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(id: &str) -> FileRecord {
        FileRecord {
            id: id.to_string(),
            content_type: "image/gif".to_string(),
            length: 3,
            chunk_size: 255 * 1024,
            chunk_count: 1,
            md5: "d41d8cd98f00b204e9800998ecf8427e".to_string(),
            uploader_id: None,
            upload_dt: "2024-02-29T23:59:59.123456Z".parse().unwrap(),
        }
    }

    #[test]
    fn test_sqlite_record_store_basic_operations() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("nested").join("records.db");
        let store = SqliteRecordStore::open(db_path.to_str().unwrap(), true).unwrap();

        store.put_record(&record("abc")).unwrap();
        assert_eq!(store.get_record("abc").unwrap(), Some(record("abc")));
        assert_eq!(store.get_record("nope").unwrap(), None);
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        store.put_record(&record("dup")).unwrap();
        assert!(matches!(store.put_record(&record("dup")), Err(StoreError::Sqlite(_))));
    }

    #[test]
    fn test_records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("records.db");
        let db_path = db_path.to_str().unwrap();

        SqliteRecordStore::open(db_path, false).unwrap().put_record(&record("kept")).unwrap();
        let reopened = SqliteRecordStore::open(db_path, false).unwrap();
        assert_eq!(reopened.get_record("kept").unwrap(), Some(record("kept")));
    }
}
