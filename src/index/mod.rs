//! Sparse coordinate index
//!
//! Maps each written coordinate to the offset of its cells in the attribute
//! columns:
//!
//! - **SparseCellIndex**: In-memory map with domain and duplicate checks
//! - **IndexLog**: Append-only, checksummed log the map is rebuilt from
//!
//! # Architecture
//!
//! ```text
//! write([3]) → columns append at offset 7 → IndexLog ← {[3], 7} → SparseCellIndex
//!
//! open → IndexLog replay → SparseCellIndex (later entries win)
//! ```

mod cell_index;
mod log;

pub use cell_index::SparseCellIndex;
pub use log::IndexLog;

use serde::{Deserialize, Serialize};

/// One committed write: where a coordinate's cells live
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexEntry {
    /// One key per dimension, in schema order
    pub coordinate: Vec<i64>,
    /// Cell offset shared by every attribute column
    pub offset: u64,
}

impl IndexEntry {
    pub fn new(coordinate: Vec<i64>, offset: u64) -> Self {
        Self { coordinate, offset }
    }
}
