//! The ordered key-value index contract and the in-memory indexes that
//! ship with the crate.
//!
//! A spatial index stores its records in any structure implementing
//! [`Index`]: an ordered map keyed by [`IndexKey`] with forward cursors.
//! Everything spatial happens above this layer.

pub mod tree;

#[cfg(feature = "serialization")]
pub mod serialized;

#[cfg(feature = "serialization")]
pub use serialized::SerializedIndex;
pub use tree::TreeIndex;

use crate::error::Result;
use crate::record::Record;
use crate::space::ZValue;
use crate::spatial_object::SoId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Key of an index entry, ordered by z-value then spatial object id.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IndexKey {
    pub z: ZValue,
    pub soid: SoId,
}

impl IndexKey {
    pub fn new(z: ZValue, soid: SoId) -> Self {
        Self { z, soid }
    }

    /// The smallest key with z-value `z`.
    pub fn lower_bound(z: ZValue) -> Self {
        Self { z, soid: 0 }
    }
}

impl fmt::Debug for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.z, self.soid)
    }
}

/// A forward cursor over index records in key order.
pub trait Cursor<R> {
    /// Advance and return the next record, or `None` at the end.
    ///
    /// The returned reference may point into a buffer that the next call
    /// overwrites.
    fn next(&mut self) -> Result<Option<&R>>;

    /// Reposition so that the next call to [`Cursor::next`] returns the
    /// first record with a key `>= key`.
    fn seek(&mut self, key: IndexKey) -> Result<()>;
}

/// Ordered storage for the records of a spatial index.
pub trait Index<R: Record> {
    /// Insert a record under [`Record::key`]. Fails with
    /// [`SpatialError::DuplicateKey`](crate::SpatialError::DuplicateKey) if
    /// the key is taken.
    fn insert(&mut self, record: R) -> Result<()>;

    /// Remove the record with this key. Returns `false` if absent.
    fn delete(&mut self, key: &IndexKey) -> Result<bool>;

    /// A cursor positioned at the first record with z-value `>= lower`.
    fn cursor(&self, lower: ZValue) -> Result<Box<dyn Cursor<R> + '_>>;

    /// True if cursors lend the stored records themselves, which then stay
    /// valid for the lifetime of the borrow.
    fn stable_records(&self) -> bool;

    /// Number of entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A cursor that owns a sorted run of records.
///
/// Used for the query side of single-object joins.
pub(crate) struct VecCursor<R> {
    records: Vec<R>,
    position: usize,
}

impl<R: Record> VecCursor<R> {
    /// `records` must be sorted by key.
    pub(crate) fn new(records: Vec<R>) -> Self {
        debug_assert!(records.windows(2).all(|w| w[0].key() < w[1].key()));
        Self {
            records,
            position: 0,
        }
    }
}

impl<R: Record> Cursor<R> for VecCursor<R> {
    fn next(&mut self) -> Result<Option<&R>> {
        let record = self.records.get(self.position);
        if record.is_some() {
            self.position += 1;
        }
        Ok(record)
    }

    fn seek(&mut self, key: IndexKey) -> Result<()> {
        self.position = self.records.partition_point(|r| r.key() < key);
        Ok(())
    }
}
