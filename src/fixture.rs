//! The `all_datetimes` test array
//!
//! One int32 dimension `id` over `[1, 4]` and one datetime attribute per
//! resolution, named `datetime_<unit>`. Coordinate 1 holds the same instant,
//! 2020-07-26 13:45:55.123456789123456789, written at each resolution. The
//! array's metadata repeats each value under the attribute's name.

use crate::storage::{
    ArraySchema, Attribute, CellMap, Dimension, DimensionType, OpenMode, SparseArrayStore,
    StorageResult, StoreConfig,
};
use crate::temporal::{Resolution, TemporalValue};
use std::path::Path;

/// Directory name the array is conventionally built under
pub const ARRAY_NAME: &str = "all_datetimes";

/// The only coordinate the fixture writes
pub const COORDINATE: [i64; 1] = [1];

/// Source text for each attribute
const VALUES: [(Resolution, &str); 13] = [
    (Resolution::Year, "2020"),
    (Resolution::Month, "2020-07"),
    (Resolution::Week, "2020-07-26 13:45:55"),
    (Resolution::Day, "2020-07-26"),
    (Resolution::Hour, "2020-07-26 13"),
    (Resolution::Minute, "2020-07-26 13:45"),
    (Resolution::Second, "2020-07-26 13:45:55"),
    (Resolution::Millisecond, "2020-07-26 13:45:55.123"),
    (Resolution::Microsecond, "2020-07-26 13:45:55.123456"),
    (Resolution::Nanosecond, "2020-07-26 13:45:55.123456789"),
    (Resolution::Picosecond, "2020-07-26 13:45:55.123456789123"),
    (Resolution::Femtosecond, "2020-07-26 13:45:55.123456789123456"),
    (
        Resolution::Attosecond,
        "2020-07-26 13:45:55.123456789123456789",
    ),
];

pub fn attribute_name(resolution: Resolution) -> String {
    format!("datetime_{}", resolution.name())
}

pub fn schema() -> ArraySchema {
    VALUES.iter().fold(
        ArraySchema::sparse().dimension(Dimension::new("id", (1, 4), 4, DimensionType::Int32)),
        |schema, &(resolution, _)| {
            schema.attribute(Attribute::datetime(attribute_name(resolution), resolution))
        },
    )
}

/// Cells written at [`COORDINATE`]
///
/// Sub-second values finer than nanoseconds do not fit 64 bits for this
/// instant and wrap.
pub fn cells() -> StorageResult<CellMap> {
    let mut cells = CellMap::new();
    for &(resolution, text) in VALUES.iter() {
        cells.insert(
            attribute_name(resolution),
            TemporalValue::parse(text, resolution)?.into(),
        );
    }
    Ok(cells)
}

/// Create the array at `path`, write its single coordinate and its metadata
pub fn build_all_datetimes(path: impl AsRef<Path>, config: &StoreConfig) -> StorageResult<()> {
    let mut store = SparseArrayStore::create_with(path, schema(), config)?;
    let cells = cells()?;
    store.write(&COORDINATE, &cells)?;
    for (name, value) in &cells {
        store.put_metadata(name, *value)?;
    }
    store.close()
}

/// Read back the fixture coordinate from an existing array
pub fn read_all_datetimes(path: impl AsRef<Path>) -> StorageResult<Option<CellMap>> {
    SparseArrayStore::scoped(path, OpenMode::Read, |store| store.read(&COORDINATE))
}
