//! Index log - durable record of committed coordinates
//!
//! Appending an entry here is the commit point of a write: the cells are
//! already in the columns, and a write whose entry never landed is an
//! orphan.
//!
//! Format per entry:
//! - length: u32 (4 bytes)
//! - data: [u8; length] (bincode IndexEntry)
//! - crc: u32 (4 bytes, CRC32 of length + data)

use crate::index::IndexEntry;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::types::OpenMode;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Upper bound on one serialized entry
const MAX_ENTRY_LEN: usize = 1 << 20;

/// Append-only log of index entries
#[derive(Debug)]
pub struct IndexLog {
    file: File,
    path: PathBuf,
    /// Bytes of valid entries
    byte_len: u64,
    entry_count: u64,
    mode: OpenMode,
    #[cfg(test)]
    fail_next_append: bool,
}

impl IndexLog {
    /// Create an empty log, replacing any leftover file
    pub fn create(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(StorageError::from_write_io)?;
        file.sync_all()?;

        Ok(Self {
            file,
            path,
            byte_len: 0,
            entry_count: 0,
            mode: OpenMode::Write,
            #[cfg(test)]
            fail_next_append: false,
        })
    }

    /// Open a log and replay its valid entries
    ///
    /// Replay stops at the first torn or corrupt entry. In write mode the
    /// file is cut back to the last valid entry so later appends follow it.
    pub fn open(path: impl AsRef<Path>, mode: OpenMode) -> StorageResult<(Self, Vec<IndexEntry>)> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(mode == OpenMode::Write)
            .open(&path)?;

        let file_len = file.metadata()?.len();
        let mut reader = BufReader::new(&file);
        let mut entries = Vec::new();
        let mut byte_len = 0u64;

        loop {
            match Self::read_entry_from(&mut reader) {
                Ok(Some((entry, size))) => {
                    entries.push(entry);
                    byte_len += size;
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(
                        "Index log replay stopped at entry {}: {}",
                        entries.len(),
                        e
                    );
                    break;
                }
            }
        }
        drop(reader);

        if byte_len < file_len {
            tracing::warn!(
                "Index log {:?} has {} bytes past its last valid entry",
                path,
                file_len - byte_len
            );
            if mode == OpenMode::Write {
                file.set_len(byte_len)?;
                file.sync_all()?;
            }
        }

        let log = Self {
            file,
            path,
            byte_len,
            entry_count: entries.len() as u64,
            mode,
            #[cfg(test)]
            fail_next_append: false,
        };
        Ok((log, entries))
    }

    /// Read a single entry and its on-disk size; `None` at a clean end
    fn read_entry_from<R: Read>(reader: &mut R) -> StorageResult<Option<(IndexEntry, u64)>> {
        let mut len_buf = [0u8; 4];
        match reader.read_exact(&mut len_buf) {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }
        let len = u32::from_le_bytes(len_buf) as usize;

        if len > MAX_ENTRY_LEN {
            return Err(StorageError::Corruption(format!(
                "Index entry length too large: {}",
                len
            )));
        }

        let mut data = vec![0u8; len];
        reader.read_exact(&mut data)?;

        let mut crc_buf = [0u8; 4];
        reader.read_exact(&mut crc_buf)?;
        let stored_crc = u32::from_le_bytes(crc_buf);

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&len_buf);
        hasher.update(&data);
        let computed_crc = hasher.finalize();

        if stored_crc != computed_crc {
            return Err(StorageError::Corruption(format!(
                "CRC mismatch: stored={}, computed={}",
                stored_crc, computed_crc
            )));
        }

        let entry: IndexEntry = bincode::deserialize(&data)?;
        Ok(Some((entry, (8 + len) as u64)))
    }

    /// Append an entry; with `sync` it is durable when this returns
    ///
    /// A failed append leaves the log at its previous length.
    pub fn append(&mut self, entry: &IndexEntry, sync: bool) -> StorageResult<()> {
        if self.mode != OpenMode::Write {
            return Err(StorageError::ReadOnlyViolation);
        }

        let data = bincode::serialize(entry)?;
        let len_bytes = (data.len() as u32).to_le_bytes();

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&len_bytes);
        hasher.update(&data);
        let crc = hasher.finalize();

        // Write: length (4) + data (N) + crc (4) as one buffer
        let mut record = Vec::with_capacity(8 + data.len());
        record.extend_from_slice(&len_bytes);
        record.extend_from_slice(&data);
        record.extend_from_slice(&crc.to_le_bytes());

        let start = self.byte_len;
        let result = self
            .file
            .seek(SeekFrom::Start(start))
            .and_then(|_| self.file.write_all(&record))
            .and_then(|_| if sync { self.file.sync_data() } else { Ok(()) });
        #[cfg(test)]
        let result = result.and_then(|_| {
            if std::mem::take(&mut self.fail_next_append) {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "injected index append failure",
                ));
            }
            Ok(())
        });

        if let Err(e) = result {
            if let Err(rollback) = self.file.set_len(start) {
                tracing::warn!(
                    "Failed to roll back index log {:?} after append error: {}",
                    self.path,
                    rollback
                );
            }
            return Err(StorageError::from_write_io(e));
        }

        self.byte_len += record.len() as u64;
        self.entry_count += 1;
        Ok(())
    }

    /// Keep only the first `count` of the replayed `entries`
    ///
    /// A writer cuts the file after them; a reader only forgets the rest.
    pub fn truncate_entries(&mut self, entries: &[IndexEntry], count: u64) -> StorageResult<()> {
        let count = count.min(entries.len() as u64);
        let mut byte_len = 0u64;
        for entry in &entries[..count as usize] {
            byte_len += 8 + bincode::serialized_size(entry)?;
        }

        if self.mode == OpenMode::Write {
            self.file.set_len(byte_len)?;
            self.file.sync_all()?;
        }
        tracing::debug!(
            "Index log {:?} cut back from {} to {} entries",
            self.path,
            self.entry_count,
            count
        );

        self.byte_len = byte_len;
        self.entry_count = count;
        Ok(())
    }

    /// Make the next append fail after writing its record
    #[cfg(test)]
    pub(crate) fn fail_next_append(&mut self) {
        self.fail_next_append = true;
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> StorageResult<()> {
        if self.mode == OpenMode::Write {
            self.file.sync_data()?;
        }
        Ok(())
    }

    /// Number of committed entries
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    /// Bytes occupied by committed entries
    pub fn byte_len(&self) -> u64 {
        self.byte_len
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
