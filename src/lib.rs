//! # Tilestore
//!
//! A multi-dimensional sparse array store with fixed-width columns and a
//! resolution-tagged datetime type.
//!
//! ## Features
//!
//! - **Sparse storage**: Only written coordinates occupy space
//! - **Datetime attributes**: Thirteen resolutions, year down to attosecond
//! - **Durability**: Cells first, index entry last; crashes leave no torn cells
//! - **Single writer, many readers**: Readers see a snapshot taken at open
//!
//! ## Modules
//!
//! - [`temporal`]: Resolution-tagged datetime values and calendar parsing
//! - [`storage`]: Schema, columns, metadata and the array store
//! - [`index`]: Coordinate index and its log
//! - [`fixture`]: The `all_datetimes` test array
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tilestore::storage::{OpenMode, SparseArrayStore, StoreConfig};
//! use tilestore::fixture;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     fixture::build_all_datetimes("./all_datetimes", &StoreConfig::default())?;
//!
//!     let mut store = SparseArrayStore::open("./all_datetimes", OpenMode::Read)?;
//!     if let Some(cells) = store.read(&[1])? {
//!         for (name, value) in &cells {
//!             println!("{} = {}", name, value);
//!         }
//!     }
//!     store.close()?;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod fixture;
pub mod index;
pub mod storage;
pub mod temporal;

// Re-export top-level types for convenience
pub use storage::{
    ArraySchema, ArrayStats, Attribute, CellMap, CellValue, Datatype, Dimension, DimensionType,
    MetadataMap, OpenMode, OverwritePolicy, SparseArrayStore, StorageError, StorageResult,
    StoreConfig, StoreState, SyncMode,
};

pub use index::{IndexEntry, SparseCellIndex};

pub use temporal::{Resolution, TemporalError, TemporalResult, TemporalValue, TruncationPolicy};

pub use config::{Config, ConfigError, LoggingConfig};
