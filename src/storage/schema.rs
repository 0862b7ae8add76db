//! Array schema: dimensions and attributes
//!
//! A schema is built by the caller, validated once by
//! [`SparseArrayStore::create`](crate::storage::SparseArrayStore::create)
//! and stored as JSON next to the array's columns. It never changes after
//! that.

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::types::{Datatype, DimensionType};
use crate::temporal::Resolution;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Write;
use std::path::Path;

/// Current schema metadata format version
const SCHEMA_FORMAT_VERSION: u32 = 1;

/// One integer dimension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    /// Inclusive `[lo, hi]`
    pub domain: (i64, i64),
    /// Chunking granularity along this dimension
    pub tile_extent: i64,
    pub datatype: DimensionType,
}

impl Dimension {
    pub fn new(
        name: impl Into<String>,
        domain: (i64, i64),
        tile_extent: i64,
        datatype: DimensionType,
    ) -> Self {
        Self {
            name: name.into(),
            domain,
            tile_extent,
            datatype,
        }
    }

    pub fn contains(&self, key: i64) -> bool {
        key >= self.domain.0 && key <= self.domain.1
    }
}

/// One fixed-width attribute column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub datatype: Datatype,
}

impl Attribute {
    pub fn new(name: impl Into<String>, datatype: Datatype) -> Self {
        Self {
            name: name.into(),
            datatype,
        }
    }

    /// Shorthand for a datetime attribute
    pub fn datetime(name: impl Into<String>, resolution: Resolution) -> Self {
        Self::new(name, Datatype::Datetime(resolution))
    }
}

/// Dimensions, attributes and the sparse flag of an array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArraySchema {
    dimensions: Vec<Dimension>,
    attributes: Vec<Attribute>,
    sparse: bool,
}

impl ArraySchema {
    /// An empty sparse schema
    pub fn sparse() -> Self {
        Self {
            dimensions: Vec::new(),
            attributes: Vec::new(),
            sparse: true,
        }
    }

    /// An empty dense schema; dense arrays fail validation in this store
    pub fn dense() -> Self {
        Self {
            sparse: false,
            ..Self::sparse()
        }
    }

    /// Builder: append a dimension
    pub fn dimension(mut self, dimension: Dimension) -> Self {
        self.dimensions.push(dimension);
        self
    }

    /// Builder: append an attribute
    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn is_sparse(&self) -> bool {
        self.sparse
    }

    /// Position of an attribute by name
    pub fn attribute_index(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a.name == name)
    }

    /// Check every structural rule; nothing is written before this passes
    pub fn validate(&self) -> StorageResult<()> {
        if !self.sparse {
            return Err(StorageError::InvalidSchema(
                "only sparse arrays are supported".into(),
            ));
        }
        if self.dimensions.is_empty() {
            return Err(StorageError::InvalidSchema("no dimensions declared".into()));
        }
        if self.attributes.is_empty() {
            return Err(StorageError::InvalidSchema("no attributes declared".into()));
        }

        let mut dimension_names = HashSet::new();
        for dim in &self.dimensions {
            if dim.name.is_empty() {
                return Err(StorageError::InvalidSchema("empty dimension name".into()));
            }
            if !dimension_names.insert(dim.name.as_str()) {
                return Err(StorageError::InvalidSchema(format!(
                    "duplicate dimension '{}'",
                    dim.name
                )));
            }

            let (lo, hi) = dim.domain;
            if lo > hi {
                return Err(StorageError::InvalidSchema(format!(
                    "dimension '{}' has domain [{}, {}] with lo > hi",
                    dim.name, lo, hi
                )));
            }
            let (min, max) = dim.datatype.bounds();
            if lo < min || hi > max {
                return Err(StorageError::InvalidSchema(format!(
                    "dimension '{}' domain [{}, {}] exceeds {} range",
                    dim.name, lo, hi, dim.datatype
                )));
            }
            if dim.tile_extent <= 0 {
                return Err(StorageError::InvalidSchema(format!(
                    "dimension '{}' has non-positive tile extent {}",
                    dim.name, dim.tile_extent
                )));
            }
            let span = hi as i128 - lo as i128 + 1;
            if dim.tile_extent as i128 > span {
                return Err(StorageError::InvalidSchema(format!(
                    "dimension '{}' tile extent {} exceeds domain span {}",
                    dim.name, dim.tile_extent, span
                )));
            }
        }

        let mut attribute_names = HashSet::new();
        for attr in &self.attributes {
            if attr.name.is_empty() {
                return Err(StorageError::InvalidSchema("empty attribute name".into()));
            }
            if dimension_names.contains(attr.name.as_str()) {
                return Err(StorageError::InvalidSchema(format!(
                    "attribute '{}' collides with a dimension name",
                    attr.name
                )));
            }
            if !attribute_names.insert(attr.name.as_str()) {
                return Err(StorageError::InvalidSchema(format!(
                    "duplicate attribute '{}'",
                    attr.name
                )));
            }
        }

        Ok(())
    }
}

/// On-disk envelope of a schema
#[derive(Debug, Serialize, Deserialize)]
struct SchemaFile {
    format_version: u32,
    schema: ArraySchema,
}

/// Write schema metadata atomically (temp file, fsync, rename)
pub(crate) fn save_schema(path: &Path, schema: &ArraySchema) -> StorageResult<()> {
    let envelope = SchemaFile {
        format_version: SCHEMA_FORMAT_VERSION,
        schema: schema.clone(),
    };
    let content = serde_json::to_string_pretty(&envelope)?;

    let tmp_path = path.with_extension("json.tmp");
    {
        let mut file = std::fs::File::create(&tmp_path).map_err(StorageError::from_write_io)?;
        file.write_all(content.as_bytes())
            .map_err(StorageError::from_write_io)?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Read schema metadata written by [`save_schema`]
pub(crate) fn load_schema(path: &Path) -> StorageResult<ArraySchema> {
    let content = std::fs::read_to_string(path)?;
    let envelope: SchemaFile = serde_json::from_str(&content)?;
    if envelope.format_version > SCHEMA_FORMAT_VERSION {
        return Err(StorageError::Corruption(format!(
            "Unsupported schema version: {}",
            envelope.format_version
        )));
    }
    Ok(envelope.schema)
}
