//! Points.

use super::{Coords, SoId, SpatialObject};
use crate::error::Result;
use crate::space::{Region, RegionComparison};
use serde::{Deserialize, Serialize};

/// A point in any number of dimensions.
///
/// A point is never inside a cell, only overlapping it, so decomposition
/// always descends to the finest level and yields one z-value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    id: Option<SoId>,
    coords: Coords,
}

impl Point {
    /// A 2D point.
    pub fn new(x: f64, y: f64) -> Self {
        Self::from_coords(&[x, y])
    }

    /// A point with any number of coordinates.
    pub fn from_coords(coords: &[f64]) -> Self {
        Self {
            id: None,
            coords: coords.iter().copied().collect(),
        }
    }

    pub fn x(&self) -> f64 {
        self.coords[0]
    }

    pub fn y(&self) -> f64 {
        self.coords[1]
    }

    pub fn coords(&self) -> &[f64] {
        &self.coords
    }
}

impl From<geo::Point<f64>> for Point {
    fn from(point: geo::Point<f64>) -> Self {
        Point::new(point.x(), point.y())
    }
}

impl SpatialObject for Point {
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
        self.coords.clone()
    }

    fn max_z(&self) -> usize {
        1
    }

    fn classify(&self, region: &Region<'_>) -> Result<RegionComparison> {
        Ok(if region.contains_point(&self.coords)? {
            RegionComparison::Overlap
        } else {
            RegionComparison::Outside
        })
    }

    fn equal_to(&self, other: &Self) -> bool {
        self.coords == other.coords
    }
}
