//! In-memory ordered index on a `BTreeMap`.

use super::{Cursor, Index, IndexKey};
use crate::error::{Result, SpatialError};
use crate::record::Record;
use crate::space::ZValue;
use std::collections::BTreeMap;
use std::collections::btree_map::{Entry, Range};

/// Records kept in a `BTreeMap` keyed by `(z, soid)`.
///
/// In stable mode cursors lend the stored records. In buffered mode each
/// cursor copies records into one reusable buffer, which exercises the
/// copy-out contract the same way a storage-backed index would.
#[derive(Debug, Clone)]
pub struct TreeIndex<R> {
    records: BTreeMap<IndexKey, R>,
    stable: bool,
}

impl<R: Record> TreeIndex<R> {
    /// An index whose cursors lend stored records.
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
            stable: true,
        }
    }

    /// An index whose cursors copy records into a buffer.
    pub fn buffered() -> Self {
        Self {
            records: BTreeMap::new(),
            stable: false,
        }
    }

    /// Look up a single record.
    pub fn get(&self, key: &IndexKey) -> Option<&R> {
        self.records.get(key)
    }

    /// All records in key order.
    pub fn iter(&self) -> impl Iterator<Item = &R> + '_ {
        self.records.values()
    }
}

impl<R: Record> Default for TreeIndex<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> Index<R> for TreeIndex<R> {
    fn insert(&mut self, record: R) -> Result<()> {
        let key = record.key();
        match self.records.entry(key) {
            Entry::Occupied(_) => Err(SpatialError::DuplicateKey {
                z: key.z,
                soid: key.soid,
            }),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    fn delete(&mut self, key: &IndexKey) -> Result<bool> {
        Ok(self.records.remove(key).is_some())
    }

    fn cursor(&self, lower: ZValue) -> Result<Box<dyn Cursor<R> + '_>> {
        Ok(Box::new(TreeCursor {
            records: &self.records,
            range: self.records.range(IndexKey::lower_bound(lower)..),
            buffer: if self.stable { None } else { Some(None) },
        }))
    }

    fn stable_records(&self) -> bool {
        self.stable
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

struct TreeCursor<'a, R> {
    records: &'a BTreeMap<IndexKey, R>,
    range: Range<'a, IndexKey, R>,
    /// `None` when lending stored records, otherwise the copy-out buffer.
    buffer: Option<Option<R>>,
}

impl<R: Record> Cursor<R> for TreeCursor<'_, R> {
    fn next(&mut self) -> Result<Option<&R>> {
        let Some((_, record)) = self.range.next() else {
            return Ok(None);
        };
        match &mut self.buffer {
            None => Ok(Some(record)),
            Some(buffer) => {
                match buffer {
                    Some(target) => record.copy_to(target),
                    None => *buffer = Some(record.clone()),
                }
                Ok(buffer.as_ref())
            }
        }
    }

    fn seek(&mut self, key: IndexKey) -> Result<()> {
        self.range = self.records.range(key..);
        Ok(())
    }
}
