//! Fixed-width attribute column files
//!
//! Layout:
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ HEADER (32 bytes)                       │
//! │   magic: [u8; 4] = "TCOL"               │
//! │   version: u16                          │
//! │   cell_width: u16 = 8                   │
//! │   datatype_tag: [u8; 2]                 │
//! │   reserved: [u8; 18]                    │
//! │   checksum: u32                         │
//! ├─────────────────────────────────────────┤
//! │ CELLS                                   │
//! │   i64 little-endian, one per write,     │
//! │   in write order                        │
//! └─────────────────────────────────────────┘
//! ```
//!
//! The number of cells is implied by the file size. Bytes past the last
//! committed cell (a torn append, or cells whose index entry never landed)
//! are not part of the column.

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::types::{Datatype, OpenMode, CELL_WIDTH};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Magic bytes for column file identification
const COLUMN_MAGIC: [u8; 4] = *b"TCOL";

/// Current column format version
const COLUMN_VERSION: u16 = 1;

/// Header size in bytes
pub const COLUMN_HEADER_SIZE: usize = 32;

/// Column file header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnHeader {
    pub version: u16,
    pub cell_width: u16,
    pub datatype: Datatype,
}

impl ColumnHeader {
    pub fn new(datatype: Datatype) -> Self {
        Self {
            version: COLUMN_VERSION,
            cell_width: CELL_WIDTH as u16,
            datatype,
        }
    }

    /// Serialize header to bytes
    pub fn to_bytes(&self) -> [u8; COLUMN_HEADER_SIZE] {
        let mut buf = [0u8; COLUMN_HEADER_SIZE];

        buf[0..4].copy_from_slice(&COLUMN_MAGIC);
        buf[4..6].copy_from_slice(&self.version.to_le_bytes());
        buf[6..8].copy_from_slice(&self.cell_width.to_le_bytes());
        buf[8..10].copy_from_slice(&self.datatype.tag());
        // bytes 10-27 reserved

        let checksum = crc32fast::hash(&buf[0..28]);
        buf[28..32].copy_from_slice(&checksum.to_le_bytes());

        buf
    }

    /// Parse header from bytes
    pub fn from_bytes(buf: &[u8; COLUMN_HEADER_SIZE]) -> StorageResult<Self> {
        let stored_checksum = u32::from_le_bytes([buf[28], buf[29], buf[30], buf[31]]);
        let computed_checksum = crc32fast::hash(&buf[0..28]);
        if stored_checksum != computed_checksum {
            return Err(StorageError::Corruption(format!(
                "Column header checksum mismatch: stored={}, computed={}",
                stored_checksum, computed_checksum
            )));
        }

        if buf[0..4] != COLUMN_MAGIC {
            return Err(StorageError::Corruption(format!(
                "Invalid column magic: {:?}",
                &buf[0..4]
            )));
        }

        let version = u16::from_le_bytes([buf[4], buf[5]]);
        if version > COLUMN_VERSION {
            return Err(StorageError::Corruption(format!(
                "Unsupported column version: {}",
                version
            )));
        }

        let cell_width = u16::from_le_bytes([buf[6], buf[7]]);
        if cell_width as usize != CELL_WIDTH {
            return Err(StorageError::Corruption(format!(
                "Unsupported cell width: {}",
                cell_width
            )));
        }

        Ok(Self {
            version,
            cell_width,
            datatype: Datatype::from_tag([buf[8], buf[9]])?,
        })
    }
}

/// An append-only column of 8-byte cells backed by one file
#[derive(Debug)]
pub struct AttributeColumn {
    name: String,
    datatype: Datatype,
    path: PathBuf,
    file: File,
    /// Cells visible through this handle
    len: u64,
    mode: OpenMode,
    #[cfg(test)]
    fault: Option<Fault>,
}

/// Failure to inject into the next matching column operation
#[cfg(test)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fault {
    /// The cell is written, then the append reports an error
    Append,
    /// Truncation fails before touching the file
    Truncate,
}

impl AttributeColumn {
    /// Create an empty column file, replacing any leftover file
    pub fn create(
        path: impl AsRef<Path>,
        name: impl Into<String>,
        datatype: Datatype,
    ) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(&path)?;
        file.write_all(&ColumnHeader::new(datatype).to_bytes())
            .map_err(StorageError::from_write_io)?;
        file.sync_all()?;

        Ok(Self {
            name: name.into(),
            datatype,
            path,
            file,
            len: 0,
            mode: OpenMode::Write,
            #[cfg(test)]
            fault: None,
        })
    }

    /// Open an existing column and check it holds the expected datatype
    pub fn open(
        path: impl AsRef<Path>,
        name: impl Into<String>,
        datatype: Datatype,
        mode: OpenMode,
    ) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let name = name.into();
        let mut file = OpenOptions::new()
            .read(true)
            .write(mode == OpenMode::Write)
            .open(&path)?;

        let mut header_buf = [0u8; COLUMN_HEADER_SIZE];
        file.read_exact(&mut header_buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                StorageError::Corruption(format!("Column '{}' header truncated", name))
            } else {
                StorageError::Io(e)
            }
        })?;
        let header = ColumnHeader::from_bytes(&header_buf)?;
        if header.datatype != datatype {
            return Err(StorageError::Corruption(format!(
                "Column '{}' stores {} but schema declares {}",
                name, header.datatype, datatype
            )));
        }

        let mut column = Self {
            name,
            datatype,
            path,
            file,
            len: 0,
            mode,
            #[cfg(test)]
            fault: None,
        };
        column.len = column.physical_len()?;
        Ok(column)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn datatype(&self) -> Datatype {
        self.datatype
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of visible cells
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whole cells currently in the file, committed or not
    pub fn physical_len(&self) -> StorageResult<u64> {
        let size = self.file.metadata()?.len();
        Ok(size.saturating_sub(COLUMN_HEADER_SIZE as u64) / CELL_WIDTH as u64)
    }

    /// Restrict the visible cells to the first `len` (read snapshots)
    pub fn limit(&mut self, len: u64) {
        self.len = self.len.min(len);
    }

    fn cell_position(offset: u64) -> u64 {
        COLUMN_HEADER_SIZE as u64 + offset * CELL_WIDTH as u64
    }

    /// Append a cell, returning its offset (the pre-append length)
    ///
    /// With `sync` the cell is on stable storage when this returns. A failed
    /// append leaves the column at its previous length.
    pub fn append(&mut self, cell: i64, sync: bool) -> StorageResult<u64> {
        let offset = self.len;
        self.append_at(offset, cell, sync)?;
        Ok(offset)
    }

    /// Append a cell that must land at `offset`
    ///
    /// Fails with `Corruption`, writing nothing, unless the column holds
    /// exactly `offset` cells.
    pub fn append_at(&mut self, offset: u64, cell: i64, sync: bool) -> StorageResult<()> {
        if self.mode != OpenMode::Write {
            return Err(StorageError::ReadOnlyViolation);
        }
        if self.len != offset {
            return Err(StorageError::Corruption(format!(
                "Column '{}' holds {} cells, expected {}; reopen the array to recover",
                self.name, self.len, offset
            )));
        }

        let position = Self::cell_position(offset);
        let result = self
            .file
            .seek(SeekFrom::Start(position))
            .and_then(|_| self.file.write_all(&cell.to_le_bytes()))
            .and_then(|_| if sync { self.file.sync_data() } else { Ok(()) });
        #[cfg(test)]
        let result = result.and_then(|_| self.take_fault(Fault::Append));

        if let Err(e) = result {
            if let Err(rollback) = self.file.set_len(position) {
                tracing::warn!(
                    "Failed to roll back column '{}' after append error: {}",
                    self.name,
                    rollback
                );
            }
            return Err(StorageError::from_write_io(e));
        }

        self.len += 1;
        Ok(())
    }

    /// Read the cell at `offset`
    pub fn read(&mut self, offset: u64) -> StorageResult<i64> {
        if offset >= self.len {
            return Err(StorageError::OffsetOutOfRange {
                offset,
                len: self.len,
            });
        }

        let mut buf = [0u8; CELL_WIDTH];
        self.file.seek(SeekFrom::Start(Self::cell_position(offset)))?;
        self.file.read_exact(&mut buf)?;
        Ok(i64::from_le_bytes(buf))
    }

    /// Drop every cell from `len` onwards
    pub fn truncate(&mut self, len: u64) -> StorageResult<()> {
        if self.mode != OpenMode::Write {
            return Err(StorageError::ReadOnlyViolation);
        }
        #[cfg(test)]
        self.take_fault(Fault::Truncate)?;
        self.file.set_len(Self::cell_position(len))?;
        self.len = self.len.min(len);
        Ok(())
    }

    /// Flush appended cells to stable storage
    pub fn sync(&mut self) -> StorageResult<()> {
        if self.mode == OpenMode::Write {
            self.file.sync_data()?;
        }
        Ok(())
    }

    /// Make the next `fault` operation fail
    #[cfg(test)]
    pub(crate) fn inject(&mut self, fault: Fault) {
        self.fault = Some(fault);
    }

    #[cfg(test)]
    fn take_fault(&mut self, fault: Fault) -> std::io::Result<()> {
        if self.fault == Some(fault) {
            self.fault = None;
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("injected {:?} failure", fault),
            ));
        }
        Ok(())
    }
}
