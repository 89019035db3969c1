//! The spatial object capability and the shapes that ship with the crate.
//!
//! Anything that can report how it relates to a grid cell can be indexed.
//! The decomposer only needs three things from an object:
//!
//! - an arbitrary point inside it, used for degenerate objects that no
//!   cell classification catches;
//! - a bound on the number of z-values it may be approximated with;
//! - a classification of any [`Region`] as inside, outside or overlapping.

pub mod bbox;
#[cfg(feature = "geometry")]
pub mod geometry;
pub mod point;
pub mod shape;

pub use bbox::BBox;
#[cfg(feature = "geometry")]
pub use geometry::GeometryObject;
pub use point::Point;
pub use shape::Shape;

use crate::error::Result;
use crate::space::{Region, RegionComparison};
use smallvec::SmallVec;
use std::fmt;

/// Spatial object id, the secondary key of index entries.
pub type SoId = u64;

/// Coordinates of a point, inline for up to four dimensions.
pub type Coords = SmallVec<[f64; 4]>;

/// A shape that can be decomposed into z-values.
pub trait SpatialObject: fmt::Debug {
    /// Id assigned by the application or by the index on insertion.
    fn id(&self) -> Option<SoId>;

    /// Assign the id. Called by the index when the id is unset.
    fn set_id(&mut self, id: SoId);

    /// Forget an id assigned by a failed insertion.
    fn clear_id(&mut self);

    /// Some point inside the object.
    fn arbitrary_point(&self) -> Coords;

    /// Upper bound on the number of z-values used to approximate the
    /// object. Must be positive.
    fn max_z(&self) -> usize;

    /// Classify a grid cell against the object.
    fn classify(&self, region: &Region<'_>) -> Result<RegionComparison>;

    /// Geometric equality, ignoring ids.
    fn equal_to(&self, other: &Self) -> bool
    where
        Self: Sized;
}
