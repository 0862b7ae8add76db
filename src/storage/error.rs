//! Storage engine error types
//!
//! Defines all errors that can occur in the storage layer.

use crate::temporal::TemporalError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in the storage engine
#[derive(Error, Debug)]
pub enum StorageError {
    /// A temporal value could not be built
    #[error(transparent)]
    Temporal(#[from] TemporalError),

    /// The disk or allocator ran out of space while growing a file
    #[error("Out of storage: {0}")]
    OutOfStorage(std::io::Error),

    /// Column read past its committed length
    #[error("Offset {offset} out of range (length: {len})")]
    OffsetOutOfRange { offset: u64, len: u64 },

    /// A coordinate key lies outside its dimension's domain
    #[error("Coordinate {value} out of domain [{lo}, {hi}] on dimension '{dimension}'")]
    CoordinateOutOfDomain {
        dimension: String,
        value: i64,
        lo: i64,
        hi: i64,
    },

    /// Coordinate has the wrong number of keys
    #[error("Invalid coordinate: expected {expected} keys, got {actual}")]
    InvalidCoordinate { expected: usize, actual: usize },

    /// Coordinate already written and overwrite is not allowed
    #[error("Duplicate coordinate: {0:?}")]
    DuplicateCoordinate(Vec<i64>),

    /// An array is already materialized at the path
    #[error("Array already exists: {0:?}")]
    AlreadyExists(PathBuf),

    /// The schema failed validation
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    /// No array at the path
    #[error("Array not found: {0:?}")]
    NotFound(PathBuf),

    /// A declared attribute was absent from a write
    #[error("Missing attribute: {0}")]
    MissingAttribute(String),

    /// A write named an attribute the schema does not declare
    #[error("Unknown attribute: {0}")]
    UnknownAttribute(String),

    /// A value does not match the attribute's declared type
    #[error("Type mismatch on '{attribute}': expected {expected}, got {actual}")]
    TypeMismatch {
        attribute: String,
        expected: String,
        actual: String,
    },

    /// Write attempted through a read-only handle
    #[error("Array is open for reading only")]
    ReadOnlyViolation,

    /// A metadata key was empty, too long or not printable
    #[error("Invalid metadata key: {0}")]
    InvalidMetadataKey(String),

    /// Operation on a closed array
    #[error("Array is closed")]
    UseAfterClose,

    /// Another writer holds the array
    #[error("Array is already open for writing: {0:?}")]
    WriteConflict(PathBuf),

    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Data corruption detected (checksum mismatch, invalid magic, etc.)
    #[error("Corrupt data: {0}")]
    Corruption(String),
}

impl StorageError {
    /// True for mistakes the caller can fix (bad schema, coordinate or
    /// value), false for environment failures (I/O, corruption, locking)
    pub fn is_caller_error(&self) -> bool {
        match self {
            StorageError::Temporal(_)
            | StorageError::OffsetOutOfRange { .. }
            | StorageError::CoordinateOutOfDomain { .. }
            | StorageError::InvalidCoordinate { .. }
            | StorageError::DuplicateCoordinate(_)
            | StorageError::AlreadyExists(_)
            | StorageError::InvalidSchema(_)
            | StorageError::NotFound(_)
            | StorageError::MissingAttribute(_)
            | StorageError::UnknownAttribute(_)
            | StorageError::TypeMismatch { .. }
            | StorageError::ReadOnlyViolation
            | StorageError::InvalidMetadataKey(_)
            | StorageError::UseAfterClose => true,
            StorageError::OutOfStorage(_)
            | StorageError::WriteConflict(_)
            | StorageError::Io(_)
            | StorageError::Serialization(_)
            | StorageError::Corruption(_) => false,
        }
    }

    /// Classify an I/O error raised while growing a file
    pub(crate) fn from_write_io(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::StorageFull | std::io::ErrorKind::OutOfMemory => {
                StorageError::OutOfStorage(err)
            }
            _ => StorageError::Io(err),
        }
    }
}

impl From<bincode::Error> for StorageError {
    fn from(err: bincode::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
