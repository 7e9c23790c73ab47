//! Local filesystem chunk storage
//!
//! Each object gets a directory under `base_path` named by its id; chunk `n`
//! lives in `{n:08}.chunk`. Chunks are written to `temp_path` first and then
//! renamed into place, so a reader never sees a partially written chunk.
//! `temp_path` must be on the same filesystem as `base_path`.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::chunks::config::ChunkConfig;
use crate::chunks::{ChunkReader, ChunkStore};
use crate::error::StoreError;

pub struct LocalChunkStore {
    base_path: PathBuf,
    temp_path: PathBuf,
}

impl LocalChunkStore {
    pub fn new(config: &ChunkConfig) -> Result<Self, StoreError> {
        let base_path = PathBuf::from(&config.base_path);
        let temp_path = PathBuf::from(&config.temp_path);

        fs::create_dir_all(&base_path)?;
        fs::create_dir_all(&temp_path)?;
        info!(
            "Using chunk directory {} (temp {})",
            base_path.display(),
            temp_path.display()
        );

        Ok(Self {
            base_path,
            temp_path,
        })
    }

    fn object_dir(&self, file_id: &str) -> Result<PathBuf, StoreError> {
        check_key(file_id)?;
        Ok(self.base_path.join(file_id))
    }
}

/// Ids become directory names, so only a conservative character set is allowed
fn check_key(file_id: &str) -> Result<(), StoreError> {
    let valid = !file_id.is_empty()
        && file_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(file_id.to_string()))
    }
}

fn chunk_path(dir: &Path, n: u32) -> PathBuf {
    dir.join(format!("{:08}.chunk", n))
}

impl ChunkStore for LocalChunkStore {
    fn put_chunk(&self, file_id: &str, n: u32, data: &[u8]) -> Result<(), StoreError> {
        let dir = self.object_dir(file_id)?;
        fs::create_dir_all(&dir)?;

        let staged = self.temp_path.join(format!("{}.{:08}.part", file_id, n));
        let written = File::create(&staged).and_then(|mut file| {
            file.write_all(data)?;
            file.sync_all()
        });
        if let Err(e) = written.and_then(|_| fs::rename(&staged, chunk_path(&dir, n))) {
            let _ = fs::remove_file(&staged);
            return Err(e.into());
        }

        debug!("Wrote chunk {} of {} ({} bytes)", n, file_id, data.len());
        Ok(())
    }

    fn open_reader(&self, file_id: &str) -> Result<Box<dyn ChunkReader>, StoreError> {
        let dir = self.object_dir(file_id)?;
        if !dir.is_dir() {
            return Err(StoreError::Corrupted {
                id: file_id.to_string(),
                reason: "no chunks stored".to_string(),
            });
        }
        Ok(Box::new(LocalChunkReader {
            file_id: file_id.to_string(),
            dir,
        }))
    }

    fn delete_chunks(&self, file_id: &str) -> Result<(), StoreError> {
        let dir = self.object_dir(file_id)?;
        match fs::remove_dir_all(&dir) {
            Ok(()) => {
                info!("Deleted chunks of {}", file_id);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!("Failed to delete chunks of {}: {}", file_id, e);
                Err(e.into())
            }
        }
    }

    fn chunk_count(&self, file_id: &str) -> Result<u32, StoreError> {
        let dir = self.object_dir(file_id)?;
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut count = 0;
        for entry in entries {
            if entry?.path().extension().is_some_and(|ext| ext == "chunk") {
                count += 1;
            }
        }
        Ok(count)
    }
}

struct LocalChunkReader {
    file_id: String,
    dir: PathBuf,
}

impl ChunkReader for LocalChunkReader {
    fn read_chunk(&mut self, n: u32) -> Result<Vec<u8>, StoreError> {
        match fs::read(chunk_path(&self.dir, n)) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::Corrupted {
                id: self.file_id.clone(),
                reason: format!("missing chunk {}", n),
            }),
            Err(e) => Err(e.into()),
        }
    }
}
