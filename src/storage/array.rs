//! Sparse array store
//!
//! Ties one schema, one index and one column per attribute together:
//! - Write path: validate → append one cell per column → index log entry
//! - Read path: index lookup → one cell read per column
//!
//! The index entry is the commit point. Cells appended without one are
//! orphans; writers cut them off at open, readers never see them.

use crate::index::{IndexEntry, IndexLog, SparseCellIndex};
use crate::storage::column::AttributeColumn;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::lock::{WriterLock, LOCK_FILE};
use crate::storage::metadata::{
    load_metadata, save_metadata, validate_key, MetadataMap, METADATA_FILE,
};
use crate::storage::schema::{load_schema, save_schema, ArraySchema};
use crate::storage::types::{CellMap, CellValue, OpenMode, OverwritePolicy, SyncMode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Schema metadata file, the commit point of creation
pub const SCHEMA_FILE: &str = "__schema.json";

/// Index log file
pub const INDEX_FILE: &str = "__index.log";

/// Directory holding one column file per attribute
pub const ATTRIBUTES_DIR: &str = "attributes";

/// Per-handle behaviour
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// When writes reach stable storage
    #[serde(default)]
    pub sync_mode: SyncMode,
    /// What a second write to a coordinate does
    #[serde(default)]
    pub overwrite: OverwritePolicy,
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set sync mode
    pub fn sync_mode(mut self, sync_mode: SyncMode) -> Self {
        self.sync_mode = sync_mode;
        self
    }

    /// Builder: set overwrite policy
    pub fn overwrite(mut self, overwrite: OverwritePolicy) -> Self {
        self.overwrite = overwrite;
        self
    }
}

/// Lifecycle of a store handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    Open(OpenMode),
    Closed,
}

/// Everything a handle owns while it is open
#[derive(Debug)]
struct OpenArray {
    index: SparseCellIndex,
    log: IndexLog,
    /// Same order as the schema's attributes
    columns: Vec<AttributeColumn>,
    metadata: MetadataMap,
    lock: Option<WriterLock>,
}

/// Handle on one sparse array directory
#[derive(Debug)]
pub struct SparseArrayStore {
    path: PathBuf,
    schema: ArraySchema,
    config: StoreConfig,
    mode: OpenMode,
    /// `None` once closed
    inner: Option<OpenArray>,
}

impl SparseArrayStore {
    /// Path of the column file for the attribute at `position`
    pub fn column_path(path: &Path, position: usize) -> PathBuf {
        path.join(ATTRIBUTES_DIR).join(format!("a{:04}.col", position))
    }

    /// Whether an array is materialized at `path`
    pub fn exists(path: impl AsRef<Path>) -> bool {
        path.as_ref().join(SCHEMA_FILE).is_file()
    }

    /// Materialize an empty array and return it open for writing
    pub fn create(path: impl AsRef<Path>, schema: ArraySchema) -> StorageResult<Self> {
        Self::create_with(path, schema, &StoreConfig::default())
    }

    /// [`create`](Self::create) with explicit handle configuration
    ///
    /// Of several processes creating the same path at once, exactly one
    /// succeeds and the rest fail with `AlreadyExists`. A failed create
    /// removes only what it wrote itself.
    pub fn create_with(
        path: impl AsRef<Path>,
        schema: ArraySchema,
        config: &StoreConfig,
    ) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        schema.validate()?;

        let created_dir = Self::claim_dir(&path)?;
        let lock = match WriterLock::acquire(&path) {
            Ok(lock) => lock,
            Err(StorageError::WriteConflict(_)) => return Err(StorageError::AlreadyExists(path)),
            Err(e) => return Err(e),
        };
        // Under the lock the directory must hold nothing but the lock itself
        if Self::exists(&path) || Self::has_foreign_entries(&path)? {
            return Err(StorageError::AlreadyExists(path));
        }

        let (columns, log) = match Self::materialize(&path, &schema) {
            Ok(parts) => parts,
            Err(e) => {
                Self::remove_partial(&path);
                drop(lock);
                if created_dir {
                    if let Err(cleanup) = std::fs::remove_dir(&path) {
                        tracing::debug!("Left array directory {:?} in place: {}", path, cleanup);
                    }
                }
                return Err(e);
            }
        };

        tracing::info!(
            "Created array {:?} ({} dimensions, {} attributes)",
            path,
            schema.dimensions().len(),
            schema.attributes().len()
        );

        let inner = OpenArray {
            index: SparseCellIndex::new(schema.dimensions().to_vec(), config.overwrite),
            log,
            columns,
            metadata: MetadataMap::new(),
            lock: Some(lock),
        };
        Ok(Self {
            path,
            schema,
            config: *config,
            mode: OpenMode::Write,
            inner: Some(inner),
        })
    }

    /// Create the array directory, or accept an existing empty one
    ///
    /// Returns whether this call created it.
    fn claim_dir(path: &Path) -> StorageResult<bool> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(StorageError::from_write_io)?;
        }

        match std::fs::create_dir(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                if path.is_dir()
                    && !Self::exists(path)
                    && std::fs::read_dir(path)?.next().is_none()
                {
                    Ok(false)
                } else {
                    Err(StorageError::AlreadyExists(path.to_path_buf()))
                }
            }
            Err(e) => Err(StorageError::from_write_io(e)),
        }
    }

    /// Whether the directory holds anything besides the writer lock
    fn has_foreign_entries(path: &Path) -> StorageResult<bool> {
        for entry in std::fs::read_dir(path)? {
            if entry?.file_name() != LOCK_FILE {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Lay out columns and index, then commit the schema
    fn materialize(
        path: &Path,
        schema: &ArraySchema,
    ) -> StorageResult<(Vec<AttributeColumn>, IndexLog)> {
        std::fs::create_dir_all(path.join(ATTRIBUTES_DIR)).map_err(StorageError::from_write_io)?;
        let columns = schema
            .attributes()
            .iter()
            .enumerate()
            .map(|(position, attr)| {
                AttributeColumn::create(
                    Self::column_path(path, position),
                    attr.name.clone(),
                    attr.datatype,
                )
            })
            .collect::<StorageResult<Vec<_>>>()?;
        let log = IndexLog::create(path.join(INDEX_FILE))?;

        save_schema(&path.join(SCHEMA_FILE), schema)?;
        Ok((columns, log))
    }

    /// Undo a failed creation; the caller still holds the lock
    fn remove_partial(path: &Path) {
        let dirs = [path.join(ATTRIBUTES_DIR)];
        let files = [
            path.join(INDEX_FILE),
            path.join(SCHEMA_FILE).with_extension("json.tmp"),
        ];

        for dir in &dirs {
            if let Err(e) = std::fs::remove_dir_all(dir) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("Failed to clean up {:?}: {}", dir, e);
                }
            }
        }
        for file in &files {
            if let Err(e) = std::fs::remove_file(file) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("Failed to clean up {:?}: {}", file, e);
                }
            }
        }
    }

    /// Open an existing array with the default configuration
    pub fn open(path: impl AsRef<Path>, mode: OpenMode) -> StorageResult<Self> {
        Self::open_with(path, mode, &StoreConfig::default())
    }

    /// Open an existing array
    ///
    /// A writer takes the array's lock and cuts off any orphaned cells.
    /// Index entries whose cells are missing from some column are dropped,
    /// from the file by a writer and from the view by a reader. A reader
    /// sees the array as of this call.
    pub fn open_with(
        path: impl AsRef<Path>,
        mode: OpenMode,
        config: &StoreConfig,
    ) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !Self::exists(&path) {
            return Err(StorageError::NotFound(path));
        }

        let schema = load_schema(&path.join(SCHEMA_FILE))?;
        let lock = match mode {
            OpenMode::Write => Some(WriterLock::acquire(&path)?),
            OpenMode::Read => None,
        };

        let (mut log, mut entries) = IndexLog::open(path.join(INDEX_FILE), mode)?;

        let mut columns = Vec::with_capacity(schema.attributes().len());
        for (position, attr) in schema.attributes().iter().enumerate() {
            columns.push(AttributeColumn::open(
                Self::column_path(&path, position),
                attr.name.clone(),
                attr.datatype,
                mode,
            )?);
        }

        // Unsynced cells can be lost while their index entries survive; the
        // committed prefix ends at the shortest column
        let logged = log.entry_count();
        let shortest = columns.iter().map(|c| c.len()).min().unwrap_or(logged);
        if shortest < logged {
            tracing::warn!(
                "Columns of {:?} hold {} of {} logged cells; dropping the last {} index entries",
                path,
                shortest,
                logged,
                logged - shortest
            );
            log.truncate_entries(&entries, shortest)?;
            entries.truncate(shortest as usize);
        }
        let committed = log.entry_count();

        if let Some(entry) = entries.iter().find(|e| e.offset >= committed) {
            return Err(StorageError::Corruption(format!(
                "Index entry {:?} points at offset {} past {} committed cells",
                entry.coordinate, entry.offset, committed
            )));
        }

        for column in &mut columns {
            match mode {
                OpenMode::Write => {
                    if column.len() > committed {
                        tracing::warn!(
                            "Discarding {} orphaned cells from column '{}'",
                            column.len() - committed,
                            column.name()
                        );
                    }
                    // Also drops a torn partial cell
                    column.truncate(committed)?;
                }
                OpenMode::Read => column.limit(committed),
            }
        }

        let metadata = load_metadata(&path.join(METADATA_FILE))?;

        let index =
            SparseCellIndex::from_entries(schema.dimensions().to_vec(), config.overwrite, entries);

        tracing::info!(
            "Opened array {:?} for {} ({} coordinates, {} cells)",
            path,
            mode,
            index.len(),
            committed
        );

        Ok(Self {
            path,
            schema,
            config: *config,
            mode,
            inner: Some(OpenArray {
                index,
                log,
                columns,
                metadata,
                lock,
            }),
        })
    }

    /// Open, run `f`, and close on every exit path
    pub fn scoped<T, F>(path: impl AsRef<Path>, mode: OpenMode, f: F) -> StorageResult<T>
    where
        F: FnOnce(&mut Self) -> StorageResult<T>,
    {
        Self::scoped_with(path, mode, &StoreConfig::default(), f)
    }

    /// [`scoped`](Self::scoped) with explicit handle configuration
    pub fn scoped_with<T, F>(
        path: impl AsRef<Path>,
        mode: OpenMode,
        config: &StoreConfig,
        f: F,
    ) -> StorageResult<T>
    where
        F: FnOnce(&mut Self) -> StorageResult<T>,
    {
        let mut store = Self::open_with(path, mode, config)?;
        let result = f(&mut store);
        let closed = if store.is_open() {
            store.close()
        } else {
            Ok(())
        };
        let value = result?;
        closed?;
        Ok(value)
    }

    fn open_array(&self) -> StorageResult<&OpenArray> {
        self.inner.as_ref().ok_or(StorageError::UseAfterClose)
    }

    /// Write every attribute of one coordinate
    ///
    /// Nothing is visible until the index entry is appended; if any step
    /// fails the columns are cut back to their previous length. Should that
    /// cut fail too, later writes are refused with `Corruption` until a
    /// rollback succeeds or the array is reopened.
    pub fn write(&mut self, coordinate: &[i64], cells: &CellMap) -> StorageResult<()> {
        let inner = self.inner.as_mut().ok_or(StorageError::UseAfterClose)?;
        if self.mode != OpenMode::Write {
            return Err(StorageError::ReadOnlyViolation);
        }

        let mut raw = Vec::with_capacity(self.schema.attributes().len());
        for attr in self.schema.attributes() {
            let value = cells
                .get(&attr.name)
                .ok_or_else(|| StorageError::MissingAttribute(attr.name.clone()))?;
            if value.datatype() != attr.datatype {
                return Err(StorageError::TypeMismatch {
                    attribute: attr.name.clone(),
                    expected: attr.datatype.to_string(),
                    actual: value.datatype().to_string(),
                });
            }
            raw.push(value.to_cell());
        }
        if let Some(name) = cells
            .keys()
            .find(|name| self.schema.attribute_index(name).is_none())
        {
            return Err(StorageError::UnknownAttribute(name.clone()));
        }

        let replaced = inner.index.check(coordinate)?;

        let sync = self.config.sync_mode == SyncMode::EveryWrite;
        let offset = inner.log.entry_count();

        let appended = inner
            .columns
            .iter_mut()
            .zip(&raw)
            .try_for_each(|(column, &cell)| column.append_at(offset, cell, sync));
        if let Err(e) = appended {
            Self::rollback(&mut inner.columns, offset);
            return Err(e);
        }

        let entry = IndexEntry::new(coordinate.to_vec(), offset);
        if let Err(e) = inner.log.append(&entry, sync) {
            Self::rollback(&mut inner.columns, offset);
            return Err(e);
        }
        inner.index.insert(entry.coordinate, offset)?;

        match replaced {
            Some(previous) => tracing::debug!(
                "Replaced {:?}: offset {} -> {}",
                coordinate,
                previous,
                offset
            ),
            None => tracing::debug!("Wrote {:?} at offset {}", coordinate, offset),
        }
        Ok(())
    }

    fn rollback(columns: &mut [AttributeColumn], len: u64) {
        for column in columns {
            if let Err(e) = column.truncate(len) {
                tracing::error!(
                    "Failed to roll back column '{}' to {} cells, refusing writes until it is: {}",
                    column.name(),
                    len,
                    e
                );
            }
        }
    }

    /// Set an array-level metadata value, returning the one it replaced
    ///
    /// Durable when this returns, whatever the sync mode.
    pub fn put_metadata(
        &mut self,
        key: &str,
        value: impl Into<CellValue>,
    ) -> StorageResult<Option<CellValue>> {
        let inner = self.inner.as_mut().ok_or(StorageError::UseAfterClose)?;
        if self.mode != OpenMode::Write {
            return Err(StorageError::ReadOnlyViolation);
        }
        validate_key(key)?;

        let mut metadata = inner.metadata.clone();
        let previous = metadata.insert(key.to_string(), value.into());
        save_metadata(&self.path.join(METADATA_FILE), &metadata)?;
        inner.metadata = metadata;

        tracing::debug!("Set metadata '{}' on {:?}", key, self.path);
        Ok(previous)
    }

    /// Remove a metadata key, returning its value if it was set
    pub fn delete_metadata(&mut self, key: &str) -> StorageResult<Option<CellValue>> {
        let inner = self.inner.as_mut().ok_or(StorageError::UseAfterClose)?;
        if self.mode != OpenMode::Write {
            return Err(StorageError::ReadOnlyViolation);
        }
        if !inner.metadata.contains_key(key) {
            return Ok(None);
        }

        let mut metadata = inner.metadata.clone();
        let previous = metadata.remove(key);
        save_metadata(&self.path.join(METADATA_FILE), &metadata)?;
        inner.metadata = metadata;
        Ok(previous)
    }

    pub fn metadata(&self, key: &str) -> StorageResult<Option<CellValue>> {
        Ok(self.open_array()?.metadata.get(key).copied())
    }

    /// All metadata, in key order, as of open or the last local change
    pub fn metadata_entries(&self) -> StorageResult<&MetadataMap> {
        Ok(&self.open_array()?.metadata)
    }

    /// Read every attribute of one coordinate; `None` if never written
    pub fn read(&mut self, coordinate: &[i64]) -> StorageResult<Option<CellMap>> {
        let inner = self.inner.as_mut().ok_or(StorageError::UseAfterClose)?;

        let expected = self.schema.dimensions().len();
        if coordinate.len() != expected {
            return Err(StorageError::InvalidCoordinate {
                expected,
                actual: coordinate.len(),
            });
        }

        let offset = match inner.index.lookup(coordinate) {
            Some(offset) => offset,
            None => return Ok(None),
        };

        let mut cells = CellMap::new();
        for (attr, column) in self.schema.attributes().iter().zip(inner.columns.iter_mut()) {
            let raw = column.read(offset)?;
            cells.insert(attr.name.clone(), CellValue::from_cell(raw, attr.datatype));
        }
        Ok(Some(cells))
    }

    /// Every written coordinate with its cells, in coordinate order
    pub fn entries(&mut self) -> StorageResult<Vec<(Vec<i64>, CellMap)>> {
        let coordinates = self.coordinates()?;
        let mut entries = Vec::with_capacity(coordinates.len());
        for coordinate in coordinates {
            if let Some(cells) = self.read(&coordinate)? {
                entries.push((coordinate, cells));
            }
        }
        Ok(entries)
    }

    /// Written coordinates in lexicographic order
    pub fn coordinates(&self) -> StorageResult<Vec<Vec<i64>>> {
        Ok(self.open_array()?.index.coordinates())
    }

    /// Number of written coordinates
    pub fn len(&self) -> StorageResult<usize> {
        Ok(self.open_array()?.index.len())
    }

    pub fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.open_array()?.index.is_empty())
    }

    /// Per-dimension bounds of the written coordinates
    pub fn non_empty_domain(&self) -> StorageResult<Option<Vec<(i64, i64)>>> {
        Ok(self.open_array()?.index.non_empty_domain())
    }

    /// Flush columns, then the index, to stable storage
    pub fn flush(&mut self) -> StorageResult<()> {
        let inner = self.inner.as_mut().ok_or(StorageError::UseAfterClose)?;
        for column in &mut inner.columns {
            column.sync()?;
        }
        inner.log.sync()
    }

    /// Flush and release the handle; later calls fail with `UseAfterClose`
    pub fn close(&mut self) -> StorageResult<()> {
        let mut inner = self.inner.take().ok_or(StorageError::UseAfterClose)?;

        for column in &mut inner.columns {
            column.sync()?;
        }
        inner.log.sync()?;
        if let Some(lock) = inner.lock.take() {
            lock.release()?;
        }

        tracing::info!("Closed array {:?}", self.path);
        Ok(())
    }

    pub fn state(&self) -> StoreState {
        match self.inner {
            Some(_) => StoreState::Open(self.mode),
            None => StoreState::Closed,
        }
    }

    pub fn is_open(&self) -> bool {
        self.inner.is_some()
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn schema(&self) -> &ArraySchema {
        &self.schema
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Get array statistics
    pub fn stats(&self) -> StorageResult<ArrayStats> {
        let inner = self.open_array()?;

        let column_bytes: u64 = inner
            .columns
            .iter()
            .filter_map(|c| std::fs::metadata(c.path()).ok())
            .map(|m| m.len())
            .sum();

        Ok(ArrayStats {
            mode: self.mode,
            dimensions: self.schema.dimensions().len(),
            attributes: self.schema.attributes().len(),
            coordinates: inner.index.len(),
            cells_per_column: inner.log.entry_count(),
            metadata_keys: inner.metadata.len(),
            storage_size_bytes: column_bytes + inner.log.byte_len(),
        })
    }

    /// Delete the array at `path`
    ///
    /// Takes the writer lock first, so an open writer makes this fail with
    /// `WriteConflict` and nothing is deleted.
    pub fn remove(path: impl AsRef<Path>) -> StorageResult<()> {
        let path = path.as_ref();
        if !Self::exists(path) {
            return Err(StorageError::NotFound(path.to_path_buf()));
        }
        let lock = WriterLock::acquire(path)?;

        // Without its schema the directory is no longer an array
        std::fs::remove_file(path.join(SCHEMA_FILE))?;
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            if entry.file_name() == LOCK_FILE {
                continue;
            }
            if entry.file_type()?.is_dir() {
                std::fs::remove_dir_all(entry.path())?;
            } else {
                std::fs::remove_file(entry.path())?;
            }
        }
        lock.release()?;
        std::fs::remove_dir(path)?;

        tracing::info!("Removed array {:?}", path);
        Ok(())
    }

    /// Remove a writer lock left by a crashed process
    ///
    /// Returns whether a lock was present.
    pub fn break_lock(path: impl AsRef<Path>) -> StorageResult<bool> {
        let path = path.as_ref();
        if !Self::exists(path) {
            return Err(StorageError::NotFound(path.to_path_buf()));
        }
        WriterLock::break_stale(path)
    }
}

impl Drop for SparseArrayStore {
    fn drop(&mut self) {
        if self.inner.is_some() {
            if let Err(e) = self.close() {
                tracing::error!("Failed to close array {:?}: {}", self.path, e);
            }
        }
    }
}

/// Array statistics
#[derive(Debug, Clone)]
pub struct ArrayStats {
    pub mode: OpenMode,
    pub dimensions: usize,
    pub attributes: usize,
    /// Distinct written coordinates
    pub coordinates: usize,
    /// Committed cells per column, including replaced ones
    pub cells_per_column: u64,
    pub metadata_keys: usize,
    pub storage_size_bytes: u64,
}

impl std::fmt::Display for ArrayStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Mode: {}, Dimensions: {}, Attributes: {}, Coordinates: {}, Cells: {}, Metadata: {}, Size: {:.2} KB",
            self.mode,
            self.dimensions,
            self.attributes,
            self.coordinates,
            self.cells_per_column,
            self.metadata_keys,
            self.storage_size_bytes as f64 / 1024.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::column::{Fault, COLUMN_HEADER_SIZE};
    use crate::storage::schema::{Attribute, Dimension};
    use crate::storage::types::{Datatype, DimensionType, CELL_WIDTH};
    use crate::temporal::{Resolution, TemporalValue};
    use std::io::Write;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use tempfile::tempdir;

    fn test_schema() -> ArraySchema {
        ArraySchema::sparse()
            .dimension(Dimension::new("id", (1, 4), 4, DimensionType::Int32))
            .attribute(Attribute::datetime("when", Resolution::Second))
            .attribute(Attribute::new("count", Datatype::Int64))
    }

    fn cells(when: &str, count: i64) -> CellMap {
        let mut cells = CellMap::new();
        cells.insert(
            "when".to_string(),
            TemporalValue::parse(when, Resolution::Second).unwrap().into(),
        );
        cells.insert("count".to_string(), CellValue::Int64(count));
        cells
    }

    fn create_test_store() -> (SparseArrayStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let store = SparseArrayStore::create(dir.path().join("array"), test_schema()).unwrap();
        (store, dir)
    }

    #[test]
    fn test_create_layout() {
        let (store, dir) = create_test_store();
        let path = dir.path().join("array");

        assert_eq!(store.state(), StoreState::Open(OpenMode::Write));
        assert!(path.join(SCHEMA_FILE).is_file());
        assert!(path.join(INDEX_FILE).is_file());
        assert!(path.join(crate::storage::lock::LOCK_FILE).is_file());
        assert!(SparseArrayStore::column_path(&path, 0).is_file());
        assert!(SparseArrayStore::column_path(&path, 1).is_file());
        assert!(store.is_empty().unwrap());

        drop(store);
        assert!(!path.join(crate::storage::lock::LOCK_FILE).exists());
    }

    #[test]
    fn test_write_and_read() {
        let (mut store, _dir) = create_test_store();

        store.write(&[2], &cells("2020-07-26 13:45:55", 7)).unwrap();
        store.write(&[4], &cells("1969-12-31 23:59:59", -1)).unwrap();

        assert_eq!(store.read(&[2]).unwrap(), Some(cells("2020-07-26 13:45:55", 7)));
        assert_eq!(store.read(&[4]).unwrap(), Some(cells("1969-12-31 23:59:59", -1)));
        assert_eq!(store.read(&[1]).unwrap(), None);
        assert_eq!(store.len().unwrap(), 2);
        assert_eq!(store.non_empty_domain().unwrap(), Some(vec![(2, 4)]));
    }

    #[test]
    fn test_persistence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("array");
        {
            let mut store = SparseArrayStore::create(&path, test_schema()).unwrap();
            store.write(&[3], &cells("2020-01-01", 1)).unwrap();
            store.write(&[1], &cells("2021-01-01", 2)).unwrap();
            store.close().unwrap();
        }

        let mut store = SparseArrayStore::open(&path, OpenMode::Read).unwrap();
        assert_eq!(store.schema(), &test_schema());
        assert_eq!(store.coordinates().unwrap(), vec![vec![1], vec![3]]);

        let entries = store.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], (vec![1], cells("2021-01-01", 2)));
        assert_eq!(entries[1], (vec![3], cells("2020-01-01", 1)));
    }

    #[test]
    fn test_create_rejects_existing() {
        let (store, dir) = create_test_store();
        drop(store);

        let err = SparseArrayStore::create(dir.path().join("array"), test_schema()).unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));

        // A non-empty directory that is not an array
        let other = dir.path().join("other");
        std::fs::create_dir_all(&other).unwrap();
        std::fs::write(other.join("notes.txt"), "hello").unwrap();
        let err = SparseArrayStore::create(&other, test_schema()).unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));

        // An empty directory is fine
        let empty = dir.path().join("empty");
        std::fs::create_dir_all(&empty).unwrap();
        SparseArrayStore::create(&empty, test_schema()).unwrap();
    }

    #[test]
    fn test_invalid_schema_writes_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("array");
        let schema = ArraySchema::sparse()
            .dimension(Dimension::new("id", (4, 1), 1, DimensionType::Int32))
            .attribute(Attribute::new("a", Datatype::Int64));

        let err = SparseArrayStore::create(&path, schema).unwrap_err();
        assert!(matches!(err, StorageError::InvalidSchema(_)));
        assert!(!path.exists());
    }

    #[test]
    fn test_open_missing_array() {
        let dir = tempdir().unwrap();
        let err = SparseArrayStore::open(dir.path().join("nope"), OpenMode::Read).unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));

        // A directory without schema is not an array either
        let err = SparseArrayStore::open(dir.path(), OpenMode::Write).unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[test]
    fn test_write_validation() {
        let (mut store, _dir) = create_test_store();

        let err = store.write(&[5], &cells("2020-01-01", 1)).unwrap_err();
        assert!(matches!(err, StorageError::CoordinateOutOfDomain { value: 5, .. }));

        let err = store.write(&[1, 1], &cells("2020-01-01", 1)).unwrap_err();
        assert!(matches!(err, StorageError::InvalidCoordinate { .. }));

        let mut missing = cells("2020-01-01", 1);
        missing.remove("count");
        let err = store.write(&[1], &missing).unwrap_err();
        assert!(matches!(err, StorageError::MissingAttribute(ref name) if name == "count"));

        let mut extra = cells("2020-01-01", 1);
        extra.insert("color".to_string(), CellValue::Int64(3));
        let err = store.write(&[1], &extra).unwrap_err();
        assert!(matches!(err, StorageError::UnknownAttribute(ref name) if name == "color"));

        // Right kind, wrong resolution
        let mut wrong = cells("2020-01-01", 1);
        wrong.insert(
            "when".to_string(),
            TemporalValue::parse("2020-01-01", Resolution::Day).unwrap().into(),
        );
        match store.write(&[1], &wrong).unwrap_err() {
            StorageError::TypeMismatch {
                attribute,
                expected,
                actual,
            } => {
                assert_eq!(attribute, "when");
                assert_eq!(expected, "datetime64[s]");
                assert_eq!(actual, "datetime64[D]");
            }
            other => panic!("unexpected error: {:?}", other),
        }

        assert!(store.is_empty().unwrap());
        assert_eq!(store.stats().unwrap().cells_per_column, 0);
    }

    #[test]
    fn test_duplicate_rejected_by_default() {
        let (mut store, _dir) = create_test_store();
        store.write(&[1], &cells("2020-01-01", 1)).unwrap();

        let err = store.write(&[1], &cells("2020-01-02", 2)).unwrap_err();
        assert!(matches!(err, StorageError::DuplicateCoordinate(_)));
        assert_eq!(store.read(&[1]).unwrap(), Some(cells("2020-01-01", 1)));
        assert_eq!(store.stats().unwrap().cells_per_column, 1);
    }

    #[test]
    fn test_replace_policy() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("array");
        let config = StoreConfig::new().overwrite(OverwritePolicy::Replace);
        {
            let mut store = SparseArrayStore::create_with(&path, test_schema(), &config).unwrap();
            store.write(&[1], &cells("2020-01-01", 1)).unwrap();
            store.write(&[1], &cells("2020-01-02", 2)).unwrap();
            assert_eq!(store.read(&[1]).unwrap(), Some(cells("2020-01-02", 2)));
            assert_eq!(store.len().unwrap(), 1);
        }

        let mut store = SparseArrayStore::open(&path, OpenMode::Read).unwrap();
        assert_eq!(store.read(&[1]).unwrap(), Some(cells("2020-01-02", 2)));
        let stats = store.stats().unwrap();
        assert_eq!(stats.coordinates, 1);
        assert_eq!(stats.cells_per_column, 2);
    }

    #[test]
    fn test_read_only_and_closed() {
        let (mut store, dir) = create_test_store();
        store.write(&[1], &cells("2020-01-01", 1)).unwrap();
        store.close().unwrap();

        assert_eq!(store.state(), StoreState::Closed);
        assert!(matches!(store.read(&[1]), Err(StorageError::UseAfterClose)));
        assert!(matches!(
            store.write(&[2], &cells("2020-01-01", 1)),
            Err(StorageError::UseAfterClose)
        ));
        assert!(matches!(store.close(), Err(StorageError::UseAfterClose)));
        assert!(matches!(store.len(), Err(StorageError::UseAfterClose)));

        let mut reader = SparseArrayStore::open(dir.path().join("array"), OpenMode::Read).unwrap();
        assert_eq!(reader.state(), StoreState::Open(OpenMode::Read));
        assert!(matches!(
            reader.write(&[2], &cells("2020-01-01", 1)),
            Err(StorageError::ReadOnlyViolation)
        ));
    }

    #[test]
    fn test_single_writer_and_reader_snapshot() {
        let (mut writer, dir) = create_test_store();
        let path = dir.path().join("array");
        writer.write(&[1], &cells("2020-01-01", 1)).unwrap();

        let err = SparseArrayStore::open(&path, OpenMode::Write).unwrap_err();
        assert!(matches!(err, StorageError::WriteConflict(_)));
        assert!(matches!(
            SparseArrayStore::remove(&path),
            Err(StorageError::WriteConflict(_))
        ));

        let mut reader = SparseArrayStore::open(&path, OpenMode::Read).unwrap();
        writer.write(&[2], &cells("2020-01-02", 2)).unwrap();

        assert_eq!(reader.read(&[1]).unwrap(), Some(cells("2020-01-01", 1)));
        assert_eq!(reader.read(&[2]).unwrap(), None);
        assert_eq!(reader.len().unwrap(), 1);

        writer.close().unwrap();
        let mut writer = SparseArrayStore::open(&path, OpenMode::Write).unwrap();
        assert_eq!(writer.read(&[2]).unwrap(), Some(cells("2020-01-02", 2)));
    }

    #[test]
    fn test_orphaned_cells_are_discarded() {
        let (mut store, dir) = create_test_store();
        let path = dir.path().join("array");
        store.write(&[1], &cells("2020-01-01", 1)).unwrap();
        store.close().unwrap();

        // A crash after the columns were appended but before the index entry
        for position in 0..2 {
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(SparseArrayStore::column_path(&path, position))
                .unwrap();
            file.write_all(&99i64.to_le_bytes()).unwrap();
        }

        let mut reader = SparseArrayStore::open(&path, OpenMode::Read).unwrap();
        assert_eq!(reader.stats().unwrap().cells_per_column, 1);
        assert_eq!(reader.read(&[1]).unwrap(), Some(cells("2020-01-01", 1)));
        drop(reader);

        let mut writer = SparseArrayStore::open(&path, OpenMode::Write).unwrap();
        let column_len = std::fs::metadata(SparseArrayStore::column_path(&path, 0))
            .unwrap()
            .len();
        assert_eq!(column_len, (COLUMN_HEADER_SIZE + CELL_WIDTH) as u64);

        writer.write(&[2], &cells("2020-01-02", 2)).unwrap();
        assert_eq!(writer.read(&[2]).unwrap(), Some(cells("2020-01-02", 2)));
    }

    fn file_len(path: &Path) -> u64 {
        std::fs::metadata(path).unwrap().len()
    }

    fn cells_len(cells: usize) -> u64 {
        (COLUMN_HEADER_SIZE + cells * CELL_WIDTH) as u64
    }

    #[test]
    fn test_short_column_cuts_back_index() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("array");
        let config = StoreConfig::new().sync_mode(SyncMode::OnClose);
        {
            let mut store = SparseArrayStore::create_with(&path, test_schema(), &config).unwrap();
            store.write(&[1], &cells("2020-01-01", 1)).unwrap();
            store.write(&[2], &cells("2020-01-02", 2)).unwrap();
            store.write(&[3], &cells("2020-01-03", 3)).unwrap();
            store.close().unwrap();
        }
        let log_len = file_len(&path.join(INDEX_FILE));

        // The last cell of one column never reached the disk, its index entry did
        let file = std::fs::OpenOptions::new()
            .write(true)
            .open(SparseArrayStore::column_path(&path, 1))
            .unwrap();
        file.set_len(cells_len(2)).unwrap();
        drop(file);

        let mut reader = SparseArrayStore::open(&path, OpenMode::Read).unwrap();
        assert_eq!(reader.stats().unwrap().cells_per_column, 2);
        assert_eq!(reader.read(&[1]).unwrap(), Some(cells("2020-01-01", 1)));
        assert_eq!(reader.read(&[2]).unwrap(), Some(cells("2020-01-02", 2)));
        assert_eq!(reader.read(&[3]).unwrap(), None);
        assert_eq!(file_len(&path.join(INDEX_FILE)), log_len);
        drop(reader);

        let mut writer = SparseArrayStore::open_with(&path, OpenMode::Write, &config).unwrap();
        assert!(file_len(&path.join(INDEX_FILE)) < log_len);
        assert_eq!(file_len(&SparseArrayStore::column_path(&path, 0)), cells_len(2));

        writer.write(&[3], &cells("2020-02-03", 30)).unwrap();
        writer.close().unwrap();

        let mut reader = SparseArrayStore::open(&path, OpenMode::Read).unwrap();
        assert_eq!(reader.read(&[3]).unwrap(), Some(cells("2020-02-03", 30)));
        assert_eq!(reader.stats().unwrap().cells_per_column, 3);
    }

    #[test]
    fn test_index_entry_past_columns_is_corruption() {
        let (mut store, dir) = create_test_store();
        let path = dir.path().join("array");
        store.write(&[1], &cells("2020-01-01", 1)).unwrap();
        store.write(&[2], &cells("2020-01-02", 2)).unwrap();
        store.close().unwrap();

        let mut log = IndexLog::create(path.join(INDEX_FILE)).unwrap();
        log.append(&IndexEntry::new(vec![1], 0), true).unwrap();
        log.append(&IndexEntry::new(vec![2], 7), true).unwrap();
        drop(log);

        let err = SparseArrayStore::open(&path, OpenMode::Read).unwrap_err();
        assert!(matches!(err, StorageError::Corruption(_)));
    }

    #[test]
    fn test_on_close_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("array");
        let config = StoreConfig::new().sync_mode(SyncMode::OnClose);
        {
            let mut store = SparseArrayStore::create_with(&path, test_schema(), &config).unwrap();
            store.write(&[1], &cells("2020-01-01", 1)).unwrap();
            store.write(&[4], &cells("2020-01-04", 4)).unwrap();
            store.flush().unwrap();
            store.write(&[2], &cells("2020-01-02", 2)).unwrap();
            store.close().unwrap();
        }

        let mut store = SparseArrayStore::open_with(&path, OpenMode::Read, &config).unwrap();
        assert_eq!(store.coordinates().unwrap(), vec![vec![1], vec![2], vec![4]]);
        assert_eq!(store.read(&[2]).unwrap(), Some(cells("2020-01-02", 2)));
        assert_eq!(store.read(&[4]).unwrap(), Some(cells("2020-01-04", 4)));
        assert_eq!(store.stats().unwrap().cells_per_column, 3);
    }

    #[test]
    fn test_failed_column_append_rolls_back() {
        let (mut store, dir) = create_test_store();
        let path = dir.path().join("array");
        store.write(&[1], &cells("2020-01-01", 1)).unwrap();
        let log_len = file_len(&path.join(INDEX_FILE));

        store.inner.as_mut().unwrap().columns[1].inject(Fault::Append);
        assert!(store.write(&[2], &cells("2020-01-02", 2)).is_err());

        assert_eq!(store.stats().unwrap().cells_per_column, 1);
        assert_eq!(file_len(&SparseArrayStore::column_path(&path, 0)), cells_len(1));
        assert_eq!(file_len(&SparseArrayStore::column_path(&path, 1)), cells_len(1));
        assert_eq!(file_len(&path.join(INDEX_FILE)), log_len);
        assert_eq!(store.read(&[2]).unwrap(), None);
        assert_eq!(store.read(&[1]).unwrap(), Some(cells("2020-01-01", 1)));

        store.write(&[2], &cells("2020-01-03", 3)).unwrap();
        assert_eq!(store.read(&[2]).unwrap(), Some(cells("2020-01-03", 3)));
        store.close().unwrap();

        let mut reader = SparseArrayStore::open(&path, OpenMode::Read).unwrap();
        assert_eq!(reader.stats().unwrap().cells_per_column, 2);
        assert_eq!(reader.read(&[2]).unwrap(), Some(cells("2020-01-03", 3)));
    }

    #[test]
    fn test_failed_index_append_rolls_back() {
        let (mut store, dir) = create_test_store();
        let path = dir.path().join("array");
        store.write(&[1], &cells("2020-01-01", 1)).unwrap();
        let log_len = file_len(&path.join(INDEX_FILE));

        store.inner.as_mut().unwrap().log.fail_next_append();
        assert!(store.write(&[2], &cells("2020-01-02", 2)).is_err());

        assert_eq!(store.len().unwrap(), 1);
        assert_eq!(file_len(&SparseArrayStore::column_path(&path, 0)), cells_len(1));
        assert_eq!(file_len(&SparseArrayStore::column_path(&path, 1)), cells_len(1));
        assert_eq!(file_len(&path.join(INDEX_FILE)), log_len);

        store.write(&[3], &cells("2020-01-03", 3)).unwrap();
        store.close().unwrap();

        let mut reader = SparseArrayStore::open(&path, OpenMode::Read).unwrap();
        assert_eq!(reader.coordinates().unwrap(), vec![vec![1], vec![3]]);
        assert_eq!(reader.read(&[3]).unwrap(), Some(cells("2020-01-03", 3)));
    }

    #[test]
    fn test_failed_rollback_refuses_misaligned_write() {
        let (mut store, dir) = create_test_store();
        let path = dir.path().join("array");
        store.write(&[1], &cells("2020-01-01", 1)).unwrap();

        // Column 0 takes its cell, column 1 fails, and column 0 cannot be cut back
        {
            let inner = store.inner.as_mut().unwrap();
            inner.columns[0].inject(Fault::Truncate);
            inner.columns[1].inject(Fault::Append);
        }
        assert!(store.write(&[2], &cells("2020-01-02", 2)).is_err());
        assert_eq!(file_len(&SparseArrayStore::column_path(&path, 0)), cells_len(2));

        // The stray cell is not reused as the next write's offset
        let err = store.write(&[3], &cells("2020-01-03", 3)).unwrap_err();
        assert!(matches!(err, StorageError::Corruption(_)));
        assert_eq!(file_len(&SparseArrayStore::column_path(&path, 0)), cells_len(1));

        store.write(&[3], &cells("2020-01-03", 3)).unwrap();
        assert_eq!(store.read(&[3]).unwrap(), Some(cells("2020-01-03", 3)));
        assert_eq!(store.read(&[1]).unwrap(), Some(cells("2020-01-01", 1)));
        store.close().unwrap();

        let mut reader = SparseArrayStore::open(&path, OpenMode::Read).unwrap();
        assert_eq!(reader.read(&[2]).unwrap(), None);
        assert_eq!(reader.read(&[3]).unwrap(), Some(cells("2020-01-03", 3)));
    }

    #[test]
    fn test_concurrent_create_has_one_winner() {
        const CREATORS: usize = 4;

        for round in 0..16 {
            let dir = tempdir().unwrap();
            let path = dir.path().join("array");
            if round % 2 == 1 {
                std::fs::create_dir(&path).unwrap();
            }

            let barrier = Arc::new(Barrier::new(CREATORS));
            let handles: Vec<_> = (0..CREATORS)
                .map(|_| {
                    let barrier = Arc::clone(&barrier);
                    let path = path.clone();
                    thread::spawn(move || {
                        barrier.wait();
                        SparseArrayStore::create(&path, test_schema())
                    })
                })
                .collect();

            let mut winners = Vec::new();
            for handle in handles {
                match handle.join().unwrap() {
                    Ok(store) => winners.push(store),
                    Err(StorageError::AlreadyExists(_)) => {}
                    Err(e) => panic!("unexpected error: {:?}", e),
                }
            }
            assert_eq!(winners.len(), 1);

            assert!(path.join(SCHEMA_FILE).is_file());
            assert!(path.join(INDEX_FILE).is_file());
            assert!(path.join(LOCK_FILE).is_file());
            assert!(SparseArrayStore::column_path(&path, 0).is_file());
            assert!(SparseArrayStore::column_path(&path, 1).is_file());

            let mut winner = winners.pop().unwrap();
            winner.write(&[1], &cells("2020-01-01", 1)).unwrap();
            winner.close().unwrap();

            let mut reader = SparseArrayStore::open(&path, OpenMode::Read).unwrap();
            assert_eq!(reader.read(&[1]).unwrap(), Some(cells("2020-01-01", 1)));
        }
    }

    #[test]
    fn test_create_leaves_locked_directory_alone() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("array");
        std::fs::create_dir(&path).unwrap();
        let lock = WriterLock::acquire(&path).unwrap();

        let err = SparseArrayStore::create(&path, test_schema()).unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));
        assert!(path.join(LOCK_FILE).is_file());
        assert!(!path.join(ATTRIBUTES_DIR).exists());
        lock.release().unwrap();
    }

    #[test]
    fn test_metadata() {
        let (mut store, dir) = create_test_store();
        let path = dir.path().join("array");
        let built = TemporalValue::parse("2020-07-26 13:45:55", Resolution::Second).unwrap();

        assert_eq!(store.metadata("rows").unwrap(), None);
        assert_eq!(store.put_metadata("rows", 4i64).unwrap(), None);
        store.put_metadata("built", built).unwrap();
        assert_eq!(
            store.put_metadata("rows", 5i64).unwrap(),
            Some(CellValue::Int64(4))
        );
        assert!(matches!(
            store.put_metadata("", 1i64),
            Err(StorageError::InvalidMetadataKey(_))
        ));

        // Readers see the metadata as of their open
        let mut early = SparseArrayStore::open(&path, OpenMode::Read).unwrap();
        store.put_metadata("note", -1i64).unwrap();
        assert_eq!(store.delete_metadata("note").unwrap(), Some(CellValue::Int64(-1)));
        assert_eq!(store.delete_metadata("note").unwrap(), None);
        store.close().unwrap();

        assert_eq!(early.metadata("rows").unwrap(), Some(CellValue::Int64(5)));
        assert_eq!(early.metadata("note").unwrap(), None);
        assert!(matches!(
            early.put_metadata("rows", 6i64),
            Err(StorageError::ReadOnlyViolation)
        ));
        early.close().unwrap();
        assert!(matches!(early.metadata("rows"), Err(StorageError::UseAfterClose)));

        let reader = SparseArrayStore::open(&path, OpenMode::Read).unwrap();
        let entries: Vec<_> = reader
            .metadata_entries()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        assert_eq!(
            entries,
            vec![
                ("built".to_string(), CellValue::Datetime(built)),
                ("rows".to_string(), CellValue::Int64(5)),
            ]
        );
        assert_eq!(reader.stats().unwrap().metadata_keys, 2);
    }

    #[test]
    fn test_scoped_closes() {
        let (store, dir) = create_test_store();
        drop(store);
        let path = dir.path().join("array");

        let count = SparseArrayStore::scoped(&path, OpenMode::Write, |store| {
            store.write(&[3], &cells("2020-01-01", 3))?;
            store.len()
        })
        .unwrap();
        assert_eq!(count, 1);
        assert!(!WriterLock::is_held(&path));

        let err = SparseArrayStore::scoped(&path, OpenMode::Write, |store| {
            store.write(&[9], &cells("2020-01-01", 3))
        })
        .unwrap_err();
        assert!(matches!(err, StorageError::CoordinateOutOfDomain { .. }));
        assert!(!WriterLock::is_held(&path));
    }

    #[test]
    fn test_scoped_with_config() {
        let (store, dir) = create_test_store();
        drop(store);
        let path = dir.path().join("array");
        let config = StoreConfig::new().overwrite(OverwritePolicy::Replace);

        let cells_written = SparseArrayStore::scoped_with(&path, OpenMode::Write, &config, |store| {
            assert_eq!(store.config(), &config);
            store.write(&[1], &cells("2020-01-01", 1))?;
            store.write(&[1], &cells("2020-01-02", 2))?;
            Ok(store.stats()?.cells_per_column)
        })
        .unwrap();
        assert_eq!(cells_written, 2);
        assert!(!WriterLock::is_held(&path));

        let read = SparseArrayStore::scoped(&path, OpenMode::Read, |store| store.read(&[1])).unwrap();
        assert_eq!(read, Some(cells("2020-01-02", 2)));
    }

    #[test]
    fn test_remove_respects_writer_lock() {
        let (mut store, dir) = create_test_store();
        let path = dir.path().join("array");
        store.write(&[1], &cells("2020-01-01", 1)).unwrap();
        store.put_metadata("rows", 1i64).unwrap();
        store.close().unwrap();

        // A writer that appeared after any earlier lock check
        let lock = WriterLock::acquire(&path).unwrap();
        assert!(matches!(
            SparseArrayStore::remove(&path),
            Err(StorageError::WriteConflict(_))
        ));
        assert!(path.join(SCHEMA_FILE).is_file());
        assert!(path.join(METADATA_FILE).is_file());
        assert!(SparseArrayStore::column_path(&path, 0).is_file());
        lock.release().unwrap();

        SparseArrayStore::remove(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_break_lock_and_remove() {
        let (store, dir) = create_test_store();
        let path = dir.path().join("array");
        // Simulate a crashed writer
        std::mem::forget(store);

        assert!(matches!(
            SparseArrayStore::open(&path, OpenMode::Write),
            Err(StorageError::WriteConflict(_))
        ));
        assert!(SparseArrayStore::break_lock(&path).unwrap());
        SparseArrayStore::open(&path, OpenMode::Write).unwrap();

        SparseArrayStore::remove(&path).unwrap();
        assert!(!path.exists());
        assert!(matches!(
            SparseArrayStore::remove(&path),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_stats_display() {
        let (mut store, _dir) = create_test_store();
        store.write(&[1], &cells("2020-01-01", 1)).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.coordinates, 1);
        assert_eq!(stats.attributes, 2);
        assert!(stats.to_string().contains("Coordinates: 1"));
        assert!(stats.to_string().contains("Metadata: 0"));
    }
}
