//! Core data types for the sparse array store
//!
//! This module defines the fundamental types used throughout the storage layer:
//! - `Datatype`: Storage type of an attribute (fixed 8-byte cells)
//! - `DimensionType`: Integer type of a dimension
//! - `CellValue`: A typed value destined for, or read from, one cell
//! - `OpenMode`, `SyncMode` and `OverwritePolicy`: Handle behaviour

use crate::storage::error::{StorageError, StorageResult};
use crate::temporal::{Resolution, TemporalValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Width of every cell in bytes
pub const CELL_WIDTH: usize = 8;

/// Values for one coordinate, keyed by attribute name
pub type CellMap = BTreeMap<String, CellValue>;

/// Storage type of an attribute
///
/// Serialized in datetime64 notation: `"int64"`, `"datetime64[ms]"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Datatype {
    /// Plain signed 64-bit integer
    Int64,
    /// Tick count at a fixed resolution
    Datetime(Resolution),
}

impl Datatype {
    /// Resolution tag, for datetime attributes
    pub fn resolution(&self) -> Option<Resolution> {
        match self {
            Datatype::Int64 => None,
            Datatype::Datetime(res) => Some(*res),
        }
    }

    /// Two-byte tag stored in a column header
    pub fn tag(&self) -> [u8; 2] {
        match self {
            Datatype::Int64 => [0, 0],
            Datatype::Datetime(res) => [1, *res as u8],
        }
    }

    pub fn from_tag(tag: [u8; 2]) -> StorageResult<Self> {
        match tag {
            [0, 0] => Ok(Datatype::Int64),
            [1, res] => Ok(Datatype::Datetime(Resolution::try_from(res)?)),
            _ => Err(StorageError::Corruption(format!(
                "Unknown datatype tag: {:?}",
                tag
            ))),
        }
    }
}

impl std::fmt::Display for Datatype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Datatype::Int64 => write!(f, "int64"),
            Datatype::Datetime(res) => write!(f, "datetime64[{}]", res.code()),
        }
    }
}

impl FromStr for Datatype {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("int64") {
            return Ok(Datatype::Int64);
        }
        let unit = s
            .strip_prefix("datetime64[")
            .and_then(|rest| rest.strip_suffix(']'))
            .ok_or_else(|| StorageError::InvalidSchema(format!("Unknown datatype: {}", s)))?;
        Ok(Datatype::Datetime(unit.parse()?))
    }
}

impl TryFrom<String> for Datatype {
    type Error = StorageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Datatype> for String {
    fn from(value: Datatype) -> Self {
        value.to_string()
    }
}

/// Integer type of a dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DimensionType {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
}

impl DimensionType {
    /// Inclusive range of values the type can hold
    pub fn bounds(&self) -> (i64, i64) {
        match self {
            DimensionType::Int8 => (i8::MIN as i64, i8::MAX as i64),
            DimensionType::Int16 => (i16::MIN as i64, i16::MAX as i64),
            DimensionType::Int32 => (i32::MIN as i64, i32::MAX as i64),
            DimensionType::Int64 => (i64::MIN, i64::MAX),
            DimensionType::UInt8 => (0, u8::MAX as i64),
            DimensionType::UInt16 => (0, u16::MAX as i64),
            DimensionType::UInt32 => (0, u32::MAX as i64),
        }
    }
}

impl std::fmt::Display for DimensionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DimensionType::Int8 => "int8",
            DimensionType::Int16 => "int16",
            DimensionType::Int32 => "int32",
            DimensionType::Int64 => "int64",
            DimensionType::UInt8 => "uint8",
            DimensionType::UInt16 => "uint16",
            DimensionType::UInt32 => "uint32",
        };
        write!(f, "{}", name)
    }
}

/// A value for one attribute cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellValue {
    Int64(i64),
    Datetime(TemporalValue),
}

impl CellValue {
    /// The datatype this value satisfies
    pub fn datatype(&self) -> Datatype {
        match self {
            CellValue::Int64(_) => Datatype::Int64,
            CellValue::Datetime(value) => Datatype::Datetime(value.resolution()),
        }
    }

    /// Raw 8-byte cell content
    pub fn to_cell(&self) -> i64 {
        match self {
            CellValue::Int64(v) => *v,
            CellValue::Datetime(value) => value.to_ticks(),
        }
    }

    /// Reattach a declared datatype to raw cell content
    pub fn from_cell(raw: i64, datatype: Datatype) -> Self {
        match datatype {
            Datatype::Int64 => CellValue::Int64(raw),
            Datatype::Datetime(res) => CellValue::Datetime(TemporalValue::from_ticks(raw, res)),
        }
    }

    /// Parse text as a value of the given datatype
    ///
    /// Datetime text is truncated to the declared resolution.
    pub fn parse(text: &str, datatype: Datatype) -> StorageResult<Self> {
        match datatype {
            Datatype::Int64 => text.trim().parse::<i64>().map(CellValue::Int64).map_err(|e| {
                StorageError::TypeMismatch {
                    attribute: "value".to_string(),
                    expected: datatype.to_string(),
                    actual: format!("'{}' ({})", text, e),
                }
            }),
            Datatype::Datetime(res) => Ok(CellValue::Datetime(TemporalValue::parse(text, res)?)),
        }
    }

    pub fn as_datetime(&self) -> Option<TemporalValue> {
        match self {
            CellValue::Datetime(value) => Some(*value),
            CellValue::Int64(_) => None,
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Int64(v) => write!(f, "{}", v),
            CellValue::Datetime(value) => write!(f, "{}", value),
        }
    }
}

impl From<TemporalValue> for CellValue {
    fn from(value: TemporalValue) -> Self {
        CellValue::Datetime(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int64(value)
    }
}

/// How an array handle was opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenMode {
    Read,
    Write,
}

impl std::fmt::Display for OpenMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpenMode::Read => write!(f, "read"),
            OpenMode::Write => write!(f, "write"),
        }
    }
}

/// When appended cells and index entries reach stable storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Sync every column and the index before `write` returns
    #[default]
    EveryWrite,
    /// Sync on `flush` and `close` only
    OnClose,
}

/// What a write to an existing coordinate does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverwritePolicy {
    /// Fail with `DuplicateCoordinate`
    #[default]
    Reject,
    /// Replace every attribute of the coordinate
    Replace,
}
