//! Approximating spatial objects by sets of z-values.
//!
//! Decomposition walks the cell tree best first, coarsest cells first,
//! and refines overlapping cells while the object's `max_z()` budget
//! allows. A cell that cannot be refined within budget is kept whole, so
//! the output always covers the object. Finally, complete sibling pairs
//! are coalesced into their parent.

use crate::error::{Result, SpatialError};
use crate::space::{RegionComparison, Space, ZValue};
use crate::spatial_object::SpatialObject;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Decomposes objects against one space.
#[derive(Debug, Clone, Copy)]
pub struct Decomposer<'s> {
    space: &'s Space,
}

impl<'s> Decomposer<'s> {
    pub fn new(space: &'s Space) -> Self {
        Self { space }
    }

    pub fn space(&self) -> &'s Space {
        self.space
    }

    /// Decompose `object` into at most `object.max_z()` disjoint cells,
    /// sorted ascending, whose union covers the object.
    pub fn decompose<O: SpatialObject + ?Sized>(&self, object: &O) -> Result<Vec<ZValue>> {
        let bound = object.max_z();
        if bound == 0 {
            return Err(SpatialError::DecompositionOverflow { produced: 0, bound });
        }

        let space = self.space;
        let max_level = space.max_level();
        let dims = space.dimensions() as u32;
        let mut emitted: Vec<ZValue> = Vec::with_capacity(bound);
        // Keyed by level first so that coarse cells are refined first.
        let mut pending: BinaryHeap<Reverse<(u32, ZValue)>> = BinaryHeap::new();
        let mut children: Vec<(ZValue, RegionComparison)> = Vec::new();

        match object.classify(&space.decode(ZValue::ROOT))? {
            RegionComparison::Inside => emitted.push(ZValue::ROOT),
            RegionComparison::Overlap => pending.push(Reverse((0, ZValue::ROOT))),
            RegionComparison::Outside => {}
        }

        while let Some(Reverse((level, z))) = pending.pop() {
            if level == max_level {
                emitted.push(z);
                continue;
            }
            let split = dims.min(max_level - level);
            children.clear();
            for child in z.descendants(split) {
                let comparison = object.classify(&space.decode(child))?;
                if comparison != RegionComparison::Outside {
                    children.push((child, comparison));
                }
            }
            if children.is_empty() || emitted.len() + pending.len() + children.len() > bound {
                emitted.push(z);
                continue;
            }
            for &(child, comparison) in &children {
                match comparison {
                    RegionComparison::Inside => emitted.push(child),
                    _ => pending.push(Reverse((child.level(), child))),
                }
            }
        }

        if emitted.is_empty() {
            // Nothing classified as touching the object; fall back to the
            // finest cell holding one of its points.
            let point = object.arbitrary_point();
            let z = space.encode(&point, max_level)?;
            log::trace!("{:?} fell back to point cell {}", object, z);
            return Ok(vec![z]);
        }

        emitted.sort_unstable();
        let cells = coalesce(emitted);
        log::trace!("decomposed {:?} into {} z-values", object, cells.len());
        debug_assert!(cells.len() <= bound);
        Ok(cells)
    }

    /// The finest single cell containing every z-value of the object's
    /// decomposition.
    pub fn cover<O: SpatialObject + ?Sized>(&self, object: &O) -> Result<ZValue> {
        let cells = self.decompose(object)?;
        Ok(cells
            .iter()
            .skip(1)
            .fold(cells[0], |cover, &z| cover.common_ancestor(z)))
    }
}

/// Merge complete sibling pairs into their parent, repeatedly.
///
/// `cells` must be sorted and pairwise disjoint.
fn coalesce(cells: Vec<ZValue>) -> Vec<ZValue> {
    let mut stack: Vec<ZValue> = Vec::with_capacity(cells.len());
    for z in cells {
        let mut z = z;
        while let Some(&top) = stack.last() {
            match z.parent() {
                Some(parent) if top.is_sibling(z) => {
                    stack.pop();
                    z = parent;
                }
                _ => break,
            }
        }
        stack.push(z);
    }
    stack
}
