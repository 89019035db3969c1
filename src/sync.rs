//! Thread-safe wrapper for sharing a spatial index between threads.
//!
//! Enable the `sync` feature to use this module:
//!
//! ```toml
//! [dependencies]
//! zjoin = { version = "0.1", features = ["sync"] }
//! ```
//!
//! Writers take the lock for one `add` or `remove`. A join holds a read
//! guard for as long as its iterator lives, so writers wait until it is
//! dropped.
//!
//! ```rust
//! use std::sync::Arc;
//! use std::thread;
//! use zjoin::prelude::*;
//! use zjoin::SyncSpatialIndex;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let space = Arc::new(Space::new(&[0.0, 0.0], &[100.0, 100.0], &[16, 16])?);
//! let index: SyncSpatialIndex<StableRecord<Point>> = SyncSpatialIndex::in_memory(space);
//!
//! let writer = index.clone();
//! let handle = thread::spawn(move || {
//!     let mut factory = StableRecord::<Point>::factory();
//!     writer.add(&mut Point::new(1.0, 1.0), &mut factory).unwrap();
//! });
//! handle.join().unwrap();
//!
//! assert_eq!(index.stats().objects, 1);
//! # Ok(())
//! # }
//! ```

use crate::error::Result;
use crate::index::{Index, TreeIndex};
use crate::record::{Record, RecordFactory};
use crate::space::Space;
use crate::spatial_index::{IndexStats, SpatialIndex};
use crate::spatial_object::SoId;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

/// A [`SpatialIndex`] behind `Arc<RwLock<_>>`.
///
/// Clones share the same index. Joins run against a read guard:
///
/// ```rust,ignore
/// let guard = index.read();
/// let pairs = join.iterator(&*guard, &*guard)?;
/// ```
pub struct SyncSpatialIndex<R, I = TreeIndex<R>> {
    inner: Arc<RwLock<SpatialIndex<R, I>>>,
}

impl<R, I> Clone for SyncSpatialIndex<R, I> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: Record> SyncSpatialIndex<R, TreeIndex<R>> {
    /// A shared spatial index over an in-memory [`TreeIndex`].
    pub fn in_memory(space: Arc<Space>) -> Self {
        Self::new(SpatialIndex::in_memory(space))
    }
}

impl<R: Record, I: Index<R>> SyncSpatialIndex<R, I> {
    pub fn new(index: SpatialIndex<R, I>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(index)),
        }
    }

    /// Add an object. See [`SpatialIndex::add`].
    pub fn add<F>(&self, object: &mut R::Object, factory: &mut F) -> Result<SoId>
    where
        F: RecordFactory<R> + ?Sized,
    {
        self.inner.write().add(object, factory)
    }

    /// Remove an object. See [`SpatialIndex::remove`].
    pub fn remove(&self, object: &R::Object) -> Result<bool> {
        self.inner.write().remove(object)
    }

    /// Shared access for queries and joins.
    pub fn read(&self) -> RwLockReadGuard<'_, SpatialIndex<R, I>> {
        self.inner.read()
    }

    /// Exclusive access, for batches of updates under one lock.
    pub fn write(&self) -> RwLockWriteGuard<'_, SpatialIndex<R, I>> {
        self.inner.write()
    }

    pub fn space(&self) -> Arc<Space> {
        Arc::clone(self.inner.read().space())
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn stats(&self) -> IndexStats {
        self.inner.read().stats()
    }

    /// Unwrap the index if this is the last handle.
    pub fn into_inner(self) -> std::result::Result<SpatialIndex<R, I>, Self> {
        match Arc::try_unwrap(self.inner) {
            Ok(lock) => Ok(lock.into_inner()),
            Err(inner) => Err(Self { inner }),
        }
    }
}
