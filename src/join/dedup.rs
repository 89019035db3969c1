//! Duplicate suppression for [`Duplicates::Exclude`](super::Duplicates).
//!
//! An object approximated by several z-values can meet the same partner
//! in several cells. Emitted pairs are remembered until the scan passes
//! the end of either object's cover cell; after that neither object has
//! an entry left to surface again, so the pair is forgotten and memory
//! stays proportional to the pairs that are still "open".

use crate::decompose::Decomposer;
use crate::error::Result;
use crate::space::ZValue;
use crate::spatial_object::{SoId, SpatialObject};
use rustc_hash::{FxHashMap, FxHashSet};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum Side {
    Left,
    Right,
}

#[derive(Debug, Default)]
pub(crate) struct EmittedPairs {
    emitted: FxHashSet<(SoId, SoId)>,
    expiry: BinaryHeap<Reverse<(ZValue, SoId, SoId)>>,
    /// Upper end of each live object's cover cell, per side.
    cover_hi: FxHashMap<(Side, SoId), ZValue>,
    cover_expiry: BinaryHeap<Reverse<(ZValue, Side, SoId)>>,
}

impl EmittedPairs {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn contains(&self, left: SoId, right: SoId) -> bool {
        self.emitted.contains(&(left, right))
    }

    /// Remember an emitted pair until the scan passes `expires`.
    pub(crate) fn insert(&mut self, left: SoId, right: SoId, expires: ZValue) -> bool {
        let inserted = self.emitted.insert((left, right));
        if inserted {
            self.expiry.push(Reverse((expires, left, right)));
        }
        inserted
    }

    /// Last z-value at which `object` can still have an entry, computing
    /// its cover on first use.
    pub(crate) fn cover_hi<O: SpatialObject + ?Sized>(
        &mut self,
        side: Side,
        soid: SoId,
        object: &O,
        decomposer: &Decomposer<'_>,
    ) -> Result<ZValue> {
        if let Some(&hi) = self.cover_hi.get(&(side, soid)) {
            return Ok(hi);
        }
        let hi = decomposer.cover(object)?.hi();
        self.cover_hi.insert((side, soid), hi);
        self.cover_expiry.push(Reverse((hi, side, soid)));
        Ok(hi)
    }

    /// Forget everything that expires before `position`.
    pub(crate) fn release(&mut self, position: ZValue) {
        while let Some(&Reverse((expires, left, right))) = self.expiry.peek() {
            if expires >= position {
                break;
            }
            self.expiry.pop();
            self.emitted.remove(&(left, right));
        }
        while let Some(&Reverse((expires, side, soid))) = self.cover_expiry.peek() {
            if expires >= position {
                break;
            }
            self.cover_expiry.pop();
            self.cover_hi.remove(&(side, soid));
        }
    }

    /// Number of pairs currently remembered.
    pub(crate) fn len(&self) -> usize {
        self.emitted.len()
    }
}
