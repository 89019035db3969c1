//! Grid cells decoded from z-values.

use super::{DimVec, Space, ZValue};
use crate::error::Result;
use std::fmt;

/// How a cell relates to a spatial object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionComparison {
    /// The cell lies entirely inside the object.
    Inside,
    /// The cell and the object do not meet.
    Outside,
    /// The cell is partially covered; refinement may help.
    Overlap,
}

/// An axis-aligned grid cell of a [`Space`].
///
/// Grid intervals are inclusive; application-coordinate intervals are
/// half open, `[lo, hi)`.
#[derive(Clone)]
pub struct Region<'s> {
    space: &'s Space,
    z: ZValue,
    lo: DimVec<u64>,
    hi: DimVec<u64>,
}

impl<'s> Region<'s> {
    pub(crate) fn new(space: &'s Space, z: ZValue, lo: DimVec<u64>, hi: DimVec<u64>) -> Self {
        Self { space, z, lo, hi }
    }

    /// The space this region belongs to.
    pub fn space(&self) -> &'s Space {
        self.space
    }

    /// The z-value this region was decoded from.
    pub fn z(&self) -> ZValue {
        self.z
    }

    pub fn level(&self) -> u32 {
        self.z.level()
    }

    pub fn dimensions(&self) -> usize {
        self.lo.len()
    }

    /// First grid coordinate of the cell along `d`.
    pub fn grid_lo(&self, d: usize) -> u64 {
        self.lo[d]
    }

    /// Last grid coordinate of the cell along `d`.
    pub fn grid_hi(&self, d: usize) -> u64 {
        self.hi[d]
    }

    /// Lower application coordinate along `d`.
    pub fn lo(&self, d: usize) -> f64 {
        self.space.lo(d) + self.lo[d] as f64 * self.space.cell_width(d)
    }

    /// Upper (exclusive) application coordinate along `d`.
    pub fn hi(&self, d: usize) -> f64 {
        self.space.lo(d) + (self.hi[d] + 1) as f64 * self.space.cell_width(d)
    }

    /// True if the point falls in this cell. Fails for points outside the
    /// space.
    pub fn contains_point(&self, point: &[f64]) -> Result<bool> {
        for (d, &x) in point.iter().enumerate().take(self.dimensions()) {
            let g = self.space.grid_coord(d, x)?;
            if g < self.lo[d] || g > self.hi[d] {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Compare this cell with the closed box `[lo, hi]`.
    ///
    /// The box is snapped to the grid (clamped into the space), so every
    /// grid cell touched by the box counts as covered.
    pub fn compare_box(&self, lo: &[f64], hi: &[f64]) -> RegionComparison {
        let mut inside = true;
        for d in 0..self.dimensions() {
            let box_lo = self.space.grid_coord_clamped(d, lo[d]);
            let box_hi = self.space.grid_coord_clamped(d, hi[d]);
            if box_hi < self.lo[d] || box_lo > self.hi[d] {
                return RegionComparison::Outside;
            }
            if box_lo > self.lo[d] || box_hi < self.hi[d] {
                inside = false;
            }
        }
        if inside {
            RegionComparison::Inside
        } else {
            RegionComparison::Overlap
        }
    }

    /// The cell as a 2D rectangle in application coordinates.
    ///
    /// Only meaningful for 2D spaces; extra dimensions are ignored.
    pub fn to_rect(&self) -> geo::Rect<f64> {
        geo::Rect::new(
            geo::coord! { x: self.lo(0), y: self.lo(1.min(self.dimensions() - 1)) },
            geo::coord! { x: self.hi(0), y: self.hi(1.min(self.dimensions() - 1)) },
        )
    }
}

impl fmt::Debug for Region<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Region({}", self.z)?;
        for d in 0..self.dimensions() {
            write!(f, " [{}, {})", self.lo(d), self.hi(d))?;
        }
        write!(f, ")")
    }
}
