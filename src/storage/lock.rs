//! Single-writer lock
//!
//! A writer owns `__write.lock` inside the array directory for as long as it
//! is open. The file is created with create-new semantics so a second writer
//! sees it and backs off. Readers never look at it.

use crate::storage::error::{StorageError, StorageResult};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Name of the lock file inside an array directory
pub const LOCK_FILE: &str = "__write.lock";

/// Exclusive write access to one array; released on drop
#[derive(Debug)]
pub struct WriterLock {
    path: PathBuf,
    released: bool,
}

impl WriterLock {
    /// Take the lock for the array at `array_dir`
    pub fn acquire(array_dir: &Path) -> StorageResult<Self> {
        let path = array_dir.join(LOCK_FILE);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(StorageError::WriteConflict(array_dir.to_path_buf()));
            }
            Err(e) => return Err(StorageError::from_write_io(e)),
        };

        if let Err(e) = file
            .write_all(std::process::id().to_string().as_bytes())
            .and_then(|_| file.sync_all())
        {
            let _ = std::fs::remove_file(&path);
            return Err(StorageError::from_write_io(e));
        }

        tracing::debug!("Acquired writer lock {:?}", path);
        Ok(Self {
            path,
            released: false,
        })
    }

    /// Whether some writer currently holds the array
    pub fn is_held(array_dir: &Path) -> bool {
        array_dir.join(LOCK_FILE).exists()
    }

    /// Pid recorded by the holder, if the lock exists and is readable
    pub fn holder(array_dir: &Path) -> Option<u32> {
        std::fs::read_to_string(array_dir.join(LOCK_FILE))
            .ok()
            .and_then(|content| content.trim().parse().ok())
    }

    /// Remove a lock left behind by a writer that died without closing
    ///
    /// Returns whether a lock file was present.
    pub fn break_stale(array_dir: &Path) -> StorageResult<bool> {
        let path = array_dir.join(LOCK_FILE);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::warn!("Removed writer lock {:?}", path);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Release the lock now, reporting failures
    pub fn release(mut self) -> StorageResult<()> {
        self.released = true;
        std::fs::remove_file(&self.path)?;
        tracing::debug!("Released writer lock {:?}", self.path);
        Ok(())
    }
}

impl Drop for WriterLock {
    fn drop(&mut self) {
        if !self.released {
            if let Err(e) = std::fs::remove_file(&self.path) {
                tracing::warn!("Failed to remove writer lock {:?}: {}", self.path, e);
            }
        }
    }
}
