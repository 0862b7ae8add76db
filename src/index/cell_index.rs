//! Sparse cell index - in-memory coordinate map
//!
//! Maps coordinate → offset for O(1) lookup. Only coordinates that were
//! written are present; the rest of the domain costs nothing.

use crate::index::IndexEntry;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::schema::Dimension;
use crate::storage::types::OverwritePolicy;
use std::collections::HashMap;

/// Coordinate → cell offset map for one array
#[derive(Debug, Clone)]
pub struct SparseCellIndex {
    dimensions: Vec<Dimension>,
    policy: OverwritePolicy,
    cells: HashMap<Vec<i64>, u64>,
}

impl SparseCellIndex {
    pub fn new(dimensions: Vec<Dimension>, policy: OverwritePolicy) -> Self {
        Self {
            dimensions,
            policy,
            cells: HashMap::new(),
        }
    }

    /// Rebuild from replayed log entries; later entries win
    pub fn from_entries(
        dimensions: Vec<Dimension>,
        policy: OverwritePolicy,
        entries: impl IntoIterator<Item = IndexEntry>,
    ) -> Self {
        let mut index = Self::new(dimensions, policy);
        for entry in entries {
            index.cells.insert(entry.coordinate, entry.offset);
        }
        index
    }

    pub fn policy(&self) -> OverwritePolicy {
        self.policy
    }

    /// Check a coordinate can be inserted, without inserting it
    ///
    /// Returns the offset the coordinate currently maps to, if any.
    pub fn check(&self, coordinate: &[i64]) -> StorageResult<Option<u64>> {
        if coordinate.len() != self.dimensions.len() {
            return Err(StorageError::InvalidCoordinate {
                expected: self.dimensions.len(),
                actual: coordinate.len(),
            });
        }

        for (dim, &key) in self.dimensions.iter().zip(coordinate) {
            if !dim.contains(key) {
                return Err(StorageError::CoordinateOutOfDomain {
                    dimension: dim.name.clone(),
                    value: key,
                    lo: dim.domain.0,
                    hi: dim.domain.1,
                });
            }
        }

        let existing = self.cells.get(coordinate).copied();
        if existing.is_some() && self.policy == OverwritePolicy::Reject {
            return Err(StorageError::DuplicateCoordinate(coordinate.to_vec()));
        }
        Ok(existing)
    }

    /// Map a coordinate to an offset
    ///
    /// Returns the offset it replaced under `OverwritePolicy::Replace`.
    pub fn insert(&mut self, coordinate: Vec<i64>, offset: u64) -> StorageResult<Option<u64>> {
        self.check(&coordinate)?;
        Ok(self.cells.insert(coordinate, offset))
    }

    /// Offset of a coordinate, if it was written
    pub fn lookup(&self, coordinate: &[i64]) -> Option<u64> {
        self.cells.get(coordinate).copied()
    }

    pub fn contains(&self, coordinate: &[i64]) -> bool {
        self.cells.contains_key(coordinate)
    }

    /// Number of distinct coordinates
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Written coordinates in lexicographic order
    pub fn coordinates(&self) -> Vec<Vec<i64>> {
        let mut coordinates: Vec<Vec<i64>> = self.cells.keys().cloned().collect();
        coordinates.sort();
        coordinates
    }

    /// Iterate over (coordinate, offset) pairs in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&[i64], u64)> {
        self.cells.iter().map(|(c, &o)| (c.as_slice(), o))
    }

    /// Per-dimension `[min, max]` of written keys; `None` when empty
    pub fn non_empty_domain(&self) -> Option<Vec<(i64, i64)>> {
        let mut coordinates = self.cells.keys();
        let first = coordinates.next()?;
        let mut domain: Vec<(i64, i64)> = first.iter().map(|&k| (k, k)).collect();

        for coordinate in coordinates {
            for (range, &key) in domain.iter_mut().zip(coordinate) {
                range.0 = range.0.min(key);
                range.1 = range.1.max(key);
            }
        }
        Some(domain)
    }

    /// Largest offset referenced by any coordinate
    pub fn max_offset(&self) -> Option<u64> {
        self.cells.values().copied().max()
    }
}
