//! Sparse array storage
//!
//! This module provides the on-disk array format:
//!
//! - **types**: Datatypes, cell values and handle options
//! - **schema**: Dimensions, attributes and schema validation
//! - **column**: Fixed-width attribute column files
//! - **lock**: Single-writer lock file
//! - **metadata**: Named array-level values
//! - **array**: The store orchestrating schema, index and columns
//! - **error**: Error types
//!
//! # Architecture
//!
//! ```text
//! Write Path:
//!   (coordinate, cells) → validate → append cell per column → index log (commit)
//!
//! Read Path:
//!   coordinate → index lookup → offset → read cell per column
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use tilestore::storage::{
//!     ArraySchema, Attribute, CellMap, DimensionType, Dimension, OpenMode, SparseArrayStore,
//! };
//! use tilestore::temporal::{Resolution, TemporalValue};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let schema = ArraySchema::sparse()
//!         .dimension(Dimension::new("id", (1, 4), 4, DimensionType::Int32))
//!         .attribute(Attribute::datetime("seen", Resolution::Second));
//!
//!     let mut store = SparseArrayStore::create("./events", schema)?;
//!     let mut cells = CellMap::new();
//!     cells.insert(
//!         "seen".to_string(),
//!         TemporalValue::parse("2020-07-26 13:45:55", Resolution::Second)?.into(),
//!     );
//!     store.write(&[1], &cells)?;
//!     store.close()?;
//!
//!     let mut reader = SparseArrayStore::open("./events", OpenMode::Read)?;
//!     assert_eq!(reader.read(&[1])?, Some(cells));
//!     Ok(())
//! }
//! ```

pub mod array;
pub mod column;
pub mod error;
pub mod lock;
pub mod metadata;
pub mod schema;
pub mod types;

// Re-export commonly used types
pub use array::{ArrayStats, SparseArrayStore, StoreConfig, StoreState};
pub use column::{AttributeColumn, ColumnHeader};
pub use error::{StorageError, StorageResult};
pub use lock::WriterLock;
pub use metadata::MetadataMap;
pub use schema::{ArraySchema, Attribute, Dimension};
pub use types::{
    CellMap, CellValue, Datatype, DimensionType, OpenMode, OverwritePolicy, SyncMode, CELL_WIDTH,
};
