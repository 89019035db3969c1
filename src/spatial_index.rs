//! Spatial indexes: decomposition layered over an ordered index.
//!
//! A [`SpatialIndex`] turns each added object into one record per
//! z-value of its decomposition and stores them in a backing [`Index`].
//! It never looks at the records again except to remove them; queries
//! and joins read the backing index through cursors.

use crate::decompose::Decomposer;
use crate::error::{Result, SpatialError};
use crate::index::{Cursor, Index, IndexKey, TreeIndex};
use crate::record::{Record, RecordFactory};
use crate::space::{Space, ZValue};
use crate::spatial_object::{SoId, SpatialObject};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::sync::Arc;

/// How objects are approximated when added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexOptions {
    /// Store one entry per z-value of the decomposition.
    #[default]
    Default,
    /// Store a single entry per object, under its cover cell.
    SingleCell,
}

/// Summary of an index's contents.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexStats {
    /// Objects currently indexed
    pub objects: usize,
    /// Index entries, one per stored z-value
    pub entries: usize,
    /// Average number of z-values per object
    pub z_values_per_object: f64,
}

/// A spatial index over a backing ordered index `I`.
#[derive(Debug)]
pub struct SpatialIndex<R, I = TreeIndex<R>> {
    space: Arc<Space>,
    options: IndexOptions,
    index: I,
    /// Next id to assign; `None` once `SoId::MAX` is taken.
    next_soid: Option<SoId>,
    objects: usize,
    _records: PhantomData<fn() -> R>,
}

impl<R: Record> SpatialIndex<R, TreeIndex<R>> {
    /// A spatial index over an in-memory [`TreeIndex`].
    pub fn in_memory(space: Arc<Space>) -> Self {
        Self::new(space, TreeIndex::new())
    }
}

impl<R: Record, I: Index<R>> SpatialIndex<R, I> {
    pub fn new(space: Arc<Space>, index: I) -> Self {
        Self::with_options(space, index, IndexOptions::Default)
    }

    pub fn with_options(space: Arc<Space>, index: I, options: IndexOptions) -> Self {
        if !index.is_empty() {
            log::warn!(
                "Building a spatial index over {} existing entries; they are not counted as objects",
                index.len()
            );
        }
        Self {
            space,
            options,
            index,
            next_soid: Some(0),
            objects: 0,
            _records: PhantomData,
        }
    }

    pub fn space(&self) -> &Arc<Space> {
        &self.space
    }

    pub fn options(&self) -> IndexOptions {
        self.options
    }

    /// The backing index.
    pub fn index(&self) -> &I {
        &self.index
    }

    /// Add an object, assigning it an id if it has none.
    ///
    /// The object is decomposed first, so a classification error leaves
    /// the index and the object untouched. If an insert fails, entries
    /// written by this call are removed again and an id assigned by this
    /// call is cleared before the error is returned.
    pub fn add<F>(&mut self, object: &mut R::Object, factory: &mut F) -> Result<SoId>
    where
        F: RecordFactory<R> + ?Sized,
    {
        let z_values = self.z_values(object)?;
        let (soid, assigned) = match object.id() {
            Some(id) => (id, false),
            None => {
                let id = self.next_soid.ok_or_else(|| {
                    SpatialError::InvalidInput(
                        "No spatial object ids left to assign; the largest id is taken".into(),
                    )
                })?;
                object.set_id(id);
                (id, true)
            }
        };

        if let Err(e) = self.insert_all(object, soid, &z_values, factory) {
            if assigned {
                object.clear_id();
            }
            return Err(e);
        }

        self.next_soid = match (self.next_soid, soid.checked_add(1)) {
            (Some(next), Some(after)) => Some(next.max(after)),
            _ => None,
        };
        self.objects += 1;
        log::debug!("added object {} under {} z-values", soid, z_values.len());
        Ok(soid)
    }

    fn insert_all<F>(
        &mut self,
        object: &R::Object,
        soid: SoId,
        z_values: &[ZValue],
        factory: &mut F,
    ) -> Result<()>
    where
        F: RecordFactory<R> + ?Sized,
    {
        let mut record = factory.new_record(object);
        if record.soid() != soid {
            return Err(SpatialError::InvalidInput(format!(
                "Record factory produced soid {} for object {}",
                record.soid(),
                soid
            )));
        }
        for (i, &z) in z_values.iter().enumerate() {
            record.set_z(z);
            if let Err(e) = self.index.insert(record.clone()) {
                self.roll_back(soid, &z_values[..i]);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Remove an object by recomputing its z-values.
    ///
    /// Returns `false` if none of its entries were present. An object that
    /// is only partially present has the remaining entries removed.
    pub fn remove(&mut self, object: &R::Object) -> Result<bool> {
        let soid = object.id().ok_or_else(|| {
            SpatialError::InvalidInput("Cannot remove an object that has no id".into())
        })?;
        let z_values = self.z_values(object)?;
        let mut removed = 0;
        for &z in &z_values {
            if self.index.delete(&IndexKey::new(z, soid))? {
                removed += 1;
            }
        }
        if removed == 0 {
            return Ok(false);
        }
        if removed < z_values.len() {
            log::warn!(
                "Object {} was partially indexed: removed {} of {} entries",
                soid,
                removed,
                z_values.len()
            );
        }
        self.objects = self.objects.saturating_sub(1);
        log::debug!("removed object {} ({} entries)", soid, removed);
        Ok(true)
    }

    /// A cursor over the records with z-value `>= lower`.
    pub fn cursor(&self, lower: ZValue) -> Result<Box<dyn Cursor<R> + '_>> {
        self.index.cursor(lower)
    }

    /// Number of index entries.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn stats(&self) -> IndexStats {
        let entries = self.index.len();
        IndexStats {
            objects: self.objects,
            entries,
            z_values_per_object: if self.objects == 0 {
                0.0
            } else {
                entries as f64 / self.objects as f64
            },
        }
    }

    /// The z-values this index stores `object` under.
    pub fn z_values(&self, object: &R::Object) -> Result<Vec<ZValue>> {
        let decomposer = Decomposer::new(&self.space);
        match self.options {
            IndexOptions::Default => decomposer.decompose(object),
            IndexOptions::SingleCell => Ok(vec![decomposer.cover(object)?]),
        }
    }

    fn roll_back(&mut self, soid: SoId, z_values: &[ZValue]) {
        for &z in z_values {
            if let Err(e) = self.index.delete(&IndexKey::new(z, soid)) {
                log::warn!("Failed to roll back entry ({}, {}): {}", z, soid, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{MutableRecord, StableRecord};
    use crate::spatial_object::{BBox, Point};

    fn space() -> Arc<Space> {
        Arc::new(Space::new(&[0.0, 0.0], &[1_000_000.0, 1_000_000.0], &[20, 20]).unwrap())
    }

    #[test]
    fn test_add_assigns_ids_and_entries() {
        let mut index: SpatialIndex<StableRecord<BBox>> = SpatialIndex::in_memory(space());
        let mut factory = StableRecord::<BBox>::factory();
        let mut a = BBox::new(10.0, 10.0, 300_000.0, 20_000.0).with_max_z(6);
        let mut b = BBox::new(500.0, 500.0, 600.0, 600.0);

        assert_eq!(index.add(&mut a, &mut factory).unwrap(), 0);
        assert_eq!(index.add(&mut b, &mut factory).unwrap(), 1);
        assert_eq!(a.id(), Some(0));

        let expected = index.z_values(&a).unwrap().len() + index.z_values(&b).unwrap().len();
        assert_eq!(index.len(), expected);
        let stats = index.stats();
        assert_eq!(stats.objects, 2);
        assert_eq!(stats.entries, expected);
    }

    #[test]
    fn test_application_ids_are_respected() {
        let mut index: SpatialIndex<MutableRecord<Point>> = SpatialIndex::in_memory(space());
        let mut factory = MutableRecord::<Point>::factory();
        let mut p = Point::new(1.0, 1.0);
        p.set_id(41);
        assert_eq!(index.add(&mut p, &mut factory).unwrap(), 41);
        let mut q = Point::new(2.0, 2.0);
        assert_eq!(index.add(&mut q, &mut factory).unwrap(), 42);
    }

    #[test]
    fn test_duplicate_add_rolls_back() {
        let mut index: SpatialIndex<StableRecord<BBox>> = SpatialIndex::in_memory(space());
        let mut factory = StableRecord::<BBox>::factory();
        let mut a = BBox::new(10.0, 10.0, 300_000.0, 300_000.0).with_max_z(8);
        index.add(&mut a, &mut factory).unwrap();
        let before = index.len();

        // Same id and shape: the first insert already collides.
        let mut again = a.clone();
        let err = index.add(&mut again, &mut factory).unwrap_err();
        assert!(matches!(err, SpatialError::DuplicateKey { soid: 0, .. }));
        assert_eq!(index.len(), before);
        assert_eq!(index.stats().objects, 1);
    }

    #[test]
    fn test_failed_add_keeps_object_unassigned() {
        let mut index: SpatialIndex<StableRecord<Point>> = SpatialIndex::in_memory(space());
        let mut factory = StableRecord::<Point>::factory();
        let mut outside = Point::new(-5.0, 1.0);
        assert!(index.add(&mut outside, &mut factory).is_err());
        assert_eq!(outside.id(), None);

        let mut inside = Point::new(5.0, 1.0);
        assert_eq!(index.add(&mut inside, &mut factory).unwrap(), 0);
    }

    #[test]
    fn test_failed_insert_clears_assigned_id() {
        let mut index: SpatialIndex<StableRecord<Point>> = SpatialIndex::in_memory(space());
        let mut factory = StableRecord::<Point>::factory();
        let mut first = Point::new(5.0, 1.0);
        index.add(&mut first, &mut factory).unwrap();

        // Every record claims soid 0, which collides for the next object.
        let mut stale = |object: &Point| {
            let mut copy = object.clone();
            copy.set_id(0);
            StableRecord::new(copy)
        };
        let mut second = Point::new(5.0, 1.0);
        assert!(matches!(
            index.add(&mut second, &mut stale),
            Err(SpatialError::InvalidInput(_))
        ));
        assert_eq!(second.id(), None);
        assert_eq!(index.add(&mut second, &mut factory).unwrap(), 1);
        assert_eq!(index.stats().objects, 2);
    }

    #[test]
    fn test_ids_exhausted_after_max() {
        let mut index: SpatialIndex<StableRecord<BBox>> = SpatialIndex::in_memory(space());
        let mut factory = StableRecord::<BBox>::factory();
        let mut last = BBox::new(10.0, 10.0, 50.0, 50.0);
        last.set_id(SoId::MAX);
        assert_eq!(index.add(&mut last, &mut factory).unwrap(), SoId::MAX);

        let mut next = BBox::new(40.0, 40.0, 90.0, 90.0);
        assert!(matches!(
            index.add(&mut next, &mut factory),
            Err(SpatialError::InvalidInput(_))
        ));
        assert_eq!(next.id(), None);
        assert_eq!(index.stats().objects, 1);

        // Application ids still work.
        next.set_id(7);
        assert_eq!(index.add(&mut next, &mut factory).unwrap(), 7);
    }

    #[test]
    fn test_remove() {
        let mut index: SpatialIndex<StableRecord<BBox>> = SpatialIndex::in_memory(space());
        let mut factory = StableRecord::<BBox>::factory();
        let mut a = BBox::new(10.0, 10.0, 300_000.0, 300_000.0);
        let mut b = BBox::new(700_000.0, 10.0, 900_000.0, 300_000.0);
        index.add(&mut a, &mut factory).unwrap();
        index.add(&mut b, &mut factory).unwrap();

        assert!(index.remove(&a).unwrap());
        assert!(!index.remove(&a).unwrap());
        assert_eq!(index.len(), index.z_values(&b).unwrap().len());

        let unassigned = BBox::new(1.0, 1.0, 2.0, 2.0);
        assert!(matches!(
            index.remove(&unassigned),
            Err(SpatialError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_single_cell_option() {
        let mut index: SpatialIndex<StableRecord<BBox>> =
            SpatialIndex::with_options(space(), TreeIndex::new(), IndexOptions::SingleCell);
        let mut factory = StableRecord::<BBox>::factory();
        let mut a = BBox::new(10.0, 10.0, 300_000.0, 300_000.0).with_max_z(16);
        index.add(&mut a, &mut factory).unwrap();
        assert_eq!(index.len(), 1);

        let mut cursor = index.cursor(ZValue::ROOT).unwrap();
        let record = cursor.next().unwrap().unwrap();
        let decomposer = Decomposer::new(index.space());
        assert_eq!(record.z(), decomposer.cover(&a).unwrap());
    }

    #[test]
    fn test_failed_decomposition_leaves_index_untouched() {
        let mut index: SpatialIndex<StableRecord<Point>> = SpatialIndex::in_memory(space());
        let mut factory = StableRecord::<Point>::factory();
        let mut outside = Point::new(-1.0, 5.0);
        assert!(index.add(&mut outside, &mut factory).is_err());
        assert!(index.is_empty());
        assert_eq!(index.stats().objects, 0);
    }
}
