//! Array metadata: named values stored beside the schema
//!
//! The whole map is one snapshot file, replaced atomically on every change.
//!
//! Layout:
//! ```text
//! magic: [u8; 4] = "TMET"
//! version: u16
//! reserved: u16
//! payload_len: u32
//! checksum: u32 (CRC32 of payload)
//! payload: bincode BTreeMap<String, CellValue>
//! ```
//!
//! An array without the file has no metadata.

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::types::CellValue;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

/// Metadata file inside an array directory
pub const METADATA_FILE: &str = "__metadata.bin";

const METADATA_MAGIC: [u8; 4] = *b"TMET";

const METADATA_VERSION: u16 = 1;

const METADATA_HEADER_SIZE: usize = 16;

/// Longest accepted key, in bytes
pub const MAX_KEY_LEN: usize = 255;

/// Metadata keys and their values, in key order
pub type MetadataMap = BTreeMap<String, CellValue>;

pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidMetadataKey(
            "key must not be empty".to_string(),
        ));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(StorageError::InvalidMetadataKey(format!(
            "key is {} bytes, limit is {}",
            key.len(),
            MAX_KEY_LEN
        )));
    }
    if key.chars().any(char::is_control) {
        return Err(StorageError::InvalidMetadataKey(format!(
            "key {:?} contains control characters",
            key
        )));
    }
    Ok(())
}

/// Replace the metadata file with `metadata`, durably
pub(crate) fn save_metadata(path: &Path, metadata: &MetadataMap) -> StorageResult<()> {
    let payload = bincode::serialize(metadata)?;

    let mut buf = Vec::with_capacity(METADATA_HEADER_SIZE + payload.len());
    buf.extend_from_slice(&METADATA_MAGIC);
    buf.extend_from_slice(&METADATA_VERSION.to_le_bytes());
    buf.extend_from_slice(&[0u8; 2]);
    buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    buf.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    buf.extend_from_slice(&payload);

    let tmp_path = path.with_extension("bin.tmp");
    {
        let mut file = std::fs::File::create(&tmp_path).map_err(StorageError::from_write_io)?;
        file.write_all(&buf).map_err(StorageError::from_write_io)?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Read the metadata file; a missing file is an empty map
pub(crate) fn load_metadata(path: &Path) -> StorageResult<MetadataMap> {
    let buf = match std::fs::read(path) {
        Ok(buf) => buf,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(MetadataMap::new()),
        Err(e) => return Err(e.into()),
    };

    if buf.len() < METADATA_HEADER_SIZE {
        return Err(StorageError::Corruption(format!(
            "Metadata file {:?} is {} bytes, shorter than its header",
            path,
            buf.len()
        )));
    }
    if buf[0..4] != METADATA_MAGIC {
        return Err(StorageError::Corruption(
            "Invalid metadata magic bytes".to_string(),
        ));
    }

    let version = u16::from_le_bytes([buf[4], buf[5]]);
    if version > METADATA_VERSION {
        return Err(StorageError::Corruption(format!(
            "Unsupported metadata version: {}",
            version
        )));
    }

    let len = u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]) as usize;
    let stored_crc = u32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]);
    let payload = &buf[METADATA_HEADER_SIZE..];
    if payload.len() != len {
        return Err(StorageError::Corruption(format!(
            "Metadata payload is {} bytes, header says {}",
            payload.len(),
            len
        )));
    }

    let computed_crc = crc32fast::hash(payload);
    if stored_crc != computed_crc {
        return Err(StorageError::Corruption(format!(
            "Metadata checksum mismatch: stored={}, computed={}",
            stored_crc, computed_crc
        )));
    }

    Ok(bincode::deserialize(payload)?)
}
