//! An index that keeps its records serialized.
//!
//! Records are encoded with `bincode` on insert and decoded again for
//! every cursor step, the way a storage-engine-backed index behaves. It is
//! never stable: each decoded record lives in the cursor's buffer until
//! the next step.

use super::{Cursor, Index, IndexKey};
use crate::error::{Result, SpatialError};
use crate::record::Record;
use crate::space::ZValue;
use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::collections::btree_map::{Entry, Range};
use std::marker::PhantomData;

/// Records stored as `bincode` bytes in a `BTreeMap`.
#[derive(Debug, Clone)]
pub struct SerializedIndex<R> {
    entries: BTreeMap<IndexKey, Bytes>,
    size_bytes: usize,
    _records: PhantomData<fn() -> R>,
}

impl<R> SerializedIndex<R>
where
    R: Record + Serialize + DeserializeOwned,
{
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            size_bytes: 0,
            _records: PhantomData,
        }
    }

    /// Total size of the encoded records.
    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }
}

impl<R> Default for SerializedIndex<R>
where
    R: Record + Serialize + DeserializeOwned,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Index<R> for SerializedIndex<R>
where
    R: Record + Serialize + DeserializeOwned,
{
    fn insert(&mut self, record: R) -> Result<()> {
        let key = record.key();
        match self.entries.entry(key) {
            Entry::Occupied(_) => Err(SpatialError::DuplicateKey {
                z: key.z,
                soid: key.soid,
            }),
            Entry::Vacant(slot) => {
                let bytes = Bytes::from(bincode::serialize(&record)?);
                self.size_bytes += bytes.len();
                slot.insert(bytes);
                Ok(())
            }
        }
    }

    fn delete(&mut self, key: &IndexKey) -> Result<bool> {
        match self.entries.remove(key) {
            Some(bytes) => {
                self.size_bytes -= bytes.len();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn cursor(&self, lower: ZValue) -> Result<Box<dyn Cursor<R> + '_>> {
        Ok(Box::new(SerializedCursor {
            entries: &self.entries,
            range: self.entries.range(IndexKey::lower_bound(lower)..),
            buffer: None,
        }))
    }

    fn stable_records(&self) -> bool {
        false
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

struct SerializedCursor<'a, R> {
    entries: &'a BTreeMap<IndexKey, Bytes>,
    range: Range<'a, IndexKey, Bytes>,
    buffer: Option<R>,
}

impl<R> Cursor<R> for SerializedCursor<'_, R>
where
    R: Record + DeserializeOwned,
{
    fn next(&mut self) -> Result<Option<&R>> {
        let Some((key, bytes)) = self.range.next() else {
            return Ok(None);
        };
        let record: R = bincode::deserialize(bytes).map_err(|e| {
            SpatialError::BackingStore(format!("Corrupt entry {:?}: {}", key, e))
        })?;
        Ok(Some(&*self.buffer.insert(record)))
    }

    fn seek(&mut self, key: IndexKey) -> Result<()> {
        self.range = self.entries.range(key..);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{MutableRecord, StableRecord};
    use crate::spatial_object::{BBox, SpatialObject};

    fn boxed(id: u64, z: ZValue) -> MutableRecord<BBox, String> {
        let mut b = BBox::new(0.0, 0.0, id as f64 + 1.0, 1.0);
        b.set_id(id);
        let mut r = MutableRecord::with_payload(b, format!("box-{}", id));
        r.set_z(z);
        r
    }

    #[test]
    fn test_records_survive_encoding() {
        let mut index = SerializedIndex::new();
        let cells: Vec<_> = ZValue::ROOT.descendants(2).collect();
        for (i, &z) in cells.iter().enumerate() {
            index.insert(boxed(i as u64, z)).unwrap();
        }
        assert!(index.size_bytes() > 0);
        assert!(!index.stable_records());

        let mut cursor = index.cursor(ZValue::ROOT).unwrap();
        let mut i = 0;
        while let Some(record) = cursor.next().unwrap() {
            assert_eq!(record, &boxed(i, cells[i as usize]));
            i += 1;
        }
        assert_eq!(i, 4);
    }

    #[test]
    fn test_duplicates_and_delete() {
        let mut index = SerializedIndex::new();
        let z = ZValue::ROOT.child(true);
        index.insert(boxed(1, z)).unwrap();
        assert!(index.insert(boxed(1, z)).is_err());
        assert!(index.delete(&IndexKey::new(z, 1)).unwrap());
        assert_eq!(index.size_bytes(), 0);
        assert!(index.is_empty());
    }

    #[test]
    fn test_stable_records_can_be_serialized() {
        let mut index: SerializedIndex<StableRecord<BBox>> = SerializedIndex::new();
        let mut b = BBox::new(1.0, 1.0, 2.0, 2.0);
        b.set_id(3);
        index.insert(StableRecord::new(b)).unwrap();
        let mut cursor = index.cursor(ZValue::ROOT).unwrap();
        assert_eq!(cursor.next().unwrap().map(|r| r.soid()), Some(3));
    }
}
