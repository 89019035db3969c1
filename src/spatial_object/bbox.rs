//! Axis-aligned boxes.

use super::{Coords, SoId, SpatialObject};
use crate::error::{Result, SpatialError};
use crate::space::{Region, RegionComparison};
use serde::{Deserialize, Serialize};

/// Default decomposition bound for boxes.
pub const DEFAULT_BOX_MAX_Z: usize = 4;

/// A closed axis-aligned box `[lo, hi]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    id: Option<SoId>,
    lo: Coords,
    hi: Coords,
    max_z: usize,
}

impl BBox {
    /// A 2D box from its corners.
    ///
    /// # Panics
    ///
    /// Panics if a lower coordinate exceeds the upper one; use
    /// [`BBox::try_from_corners`] for untrusted input.
    pub fn new(x_lo: f64, y_lo: f64, x_hi: f64, y_hi: f64) -> Self {
        assert!(
            x_lo <= x_hi && y_lo <= y_hi,
            "Box corners are inverted: ({}, {}) - ({}, {})",
            x_lo,
            y_lo,
            x_hi,
            y_hi
        );
        Self {
            id: None,
            lo: Coords::from_slice(&[x_lo, y_lo]),
            hi: Coords::from_slice(&[x_hi, y_hi]),
            max_z: DEFAULT_BOX_MAX_Z,
        }
    }

    /// A box with any number of dimensions.
    pub fn try_from_corners(lo: &[f64], hi: &[f64]) -> Result<Self> {
        if lo.len() != hi.len() || lo.is_empty() {
            return Err(SpatialError::InvalidInput(format!(
                "Box corners have {} and {} coordinates",
                lo.len(),
                hi.len()
            )));
        }
        if let Some(d) = (0..lo.len()).find(|&d| !(lo[d] <= hi[d])) {
            return Err(SpatialError::InvalidInput(format!(
                "Box is inverted or not finite along dimension {}: [{}, {}]",
                d, lo[d], hi[d]
            )));
        }
        Ok(Self {
            id: None,
            lo: lo.iter().copied().collect(),
            hi: hi.iter().copied().collect(),
            max_z: DEFAULT_BOX_MAX_Z,
        })
    }

    /// Override the decomposition bound.
    pub fn with_max_z(mut self, max_z: usize) -> Self {
        self.max_z = max_z;
        self
    }

    pub fn lo(&self) -> &[f64] {
        &self.lo
    }

    pub fn hi(&self) -> &[f64] {
        &self.hi
    }

    pub fn x_lo(&self) -> f64 {
        self.lo[0]
    }

    pub fn x_hi(&self) -> f64 {
        self.hi[0]
    }

    pub fn y_lo(&self) -> f64 {
        self.lo[1]
    }

    pub fn y_hi(&self) -> f64 {
        self.hi[1]
    }

    /// True if the point lies in the box, boundary included.
    pub fn contains_point(&self, point: &[f64]) -> bool {
        self.lo
            .iter()
            .zip(&self.hi)
            .zip(point)
            .all(|((&lo, &hi), &x)| lo <= x && x <= hi)
    }

    /// True if the boxes share interior or boundary points.
    pub fn overlaps(&self, other: &BBox) -> bool {
        self.lo
            .iter()
            .zip(&self.hi)
            .zip(other.lo.iter().zip(&other.hi))
            .all(|((&a_lo, &a_hi), (&b_lo, &b_hi))| a_lo <= b_hi && b_lo <= a_hi)
    }

    /// The box as a 2D rectangle.
    pub fn to_rect(&self) -> geo::Rect<f64> {
        geo::Rect::new(
            geo::coord! { x: self.lo[0], y: self.lo[1] },
            geo::coord! { x: self.hi[0], y: self.hi[1] },
        )
    }
}

impl From<geo::Rect<f64>> for BBox {
    fn from(rect: geo::Rect<f64>) -> Self {
        BBox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }
}

impl SpatialObject for BBox {
    fn id(&self) -> Option<SoId> {
        self.id
    }

    fn set_id(&mut self, id: SoId) {
        self.id = Some(id);
    }

    fn clear_id(&mut self) {
        self.id = None;
    }

    fn arbitrary_point(&self) -> Coords {
        self.lo
            .iter()
            .zip(&self.hi)
            .map(|(&lo, &hi)| lo + (hi - lo) / 2.0)
            .collect()
    }

    fn max_z(&self) -> usize {
        self.max_z
    }

    fn classify(&self, region: &Region<'_>) -> Result<RegionComparison> {
        if self.lo.len() != region.dimensions() {
            return Err(SpatialError::InvalidInput(format!(
                "Box has {} dimensions, space has {}",
                self.lo.len(),
                region.dimensions()
            )));
        }
        let space = region.space();
        for d in 0..self.lo.len() {
            if self.hi[d] < space.lo(d) || self.lo[d] > space.hi(d) {
                return Err(SpatialError::InvalidInput(format!(
                    "Box lies outside the space in dimension {}: [{}, {}] vs [{}, {}]",
                    d,
                    self.lo[d],
                    self.hi[d],
                    space.lo(d),
                    space.hi(d)
                )));
            }
        }
        Ok(region.compare_box(&self.lo, &self.hi))
    }

    fn equal_to(&self, other: &Self) -> bool {
        self.lo == other.lo && self.hi == other.hi
    }
}
