//! A tagged union over the shapes shipped with the crate.

use super::{BBox, Coords, Point, SoId, SpatialObject};
#[cfg(feature = "geometry")]
use super::GeometryObject;
use crate::error::Result;
#[cfg(feature = "geometry")]
use crate::error::SpatialError;
use crate::space::{Region, RegionComparison};
use serde::{Deserialize, Serialize};

/// Any of the built-in shapes, so one index can hold a mix of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Point(Point),
    Box(BBox),
    #[cfg(feature = "geometry")]
    Geometry(GeometryObject),
}

impl Shape {
    /// Exact overlap test between two shapes, boundaries included.
    ///
    /// Points overlap only if equal. Mixing a geometry with a point or box
    /// requires two dimensions.
    pub fn overlaps(&self, other: &Shape) -> Result<bool> {
        match (self, other) {
            (Shape::Point(a), Shape::Point(b)) => Ok(a.coords() == b.coords()),
            (Shape::Point(p), Shape::Box(b)) | (Shape::Box(b), Shape::Point(p)) => {
                Ok(b.contains_point(p.coords()))
            }
            (Shape::Box(a), Shape::Box(b)) => Ok(a.overlaps(b)),
            #[cfg(feature = "geometry")]
            (Shape::Geometry(a), Shape::Geometry(b)) => a.intersects(b),
            #[cfg(feature = "geometry")]
            (Shape::Geometry(g), other) | (other, Shape::Geometry(g)) => {
                use geo::Intersects;
                let other = other.to_geo()?;
                Ok(g.geometry()?.intersects(&other))
            }
        }
    }

    #[cfg(feature = "geometry")]
    fn to_geo(&self) -> Result<geo::Geometry<f64>> {
        match self {
            Shape::Point(p) if p.coords().len() == 2 => {
                Ok(geo::Point::new(p.x(), p.y()).into())
            }
            Shape::Box(b) if b.lo().len() == 2 => Ok(b.to_rect().into()),
            Shape::Geometry(g) => Ok(g.geometry()?.clone()),
            _ => Err(SpatialError::InvalidInput(
                "Only 2D points and boxes can be compared with geometries".into(),
            )),
        }
    }
}

impl From<Point> for Shape {
    fn from(point: Point) -> Self {
        Shape::Point(point)
    }
}

impl From<BBox> for Shape {
    fn from(bbox: BBox) -> Self {
        Shape::Box(bbox)
    }
}

#[cfg(feature = "geometry")]
impl From<GeometryObject> for Shape {
    fn from(geometry: GeometryObject) -> Self {
        Shape::Geometry(geometry)
    }
}

macro_rules! delegate {
    ($self:ident, $shape:ident => $body:expr) => {
        match $self {
            Shape::Point($shape) => $body,
            Shape::Box($shape) => $body,
            #[cfg(feature = "geometry")]
            Shape::Geometry($shape) => $body,
        }
    };
}

impl SpatialObject for Shape {
    fn id(&self) -> Option<SoId> {
        delegate!(self, s => s.id())
    }

    fn set_id(&mut self, id: SoId) {
        delegate!(self, s => s.set_id(id))
    }

    fn clear_id(&mut self) {
        delegate!(self, s => s.clear_id())
    }

    fn arbitrary_point(&self) -> Coords {
        delegate!(self, s => s.arbitrary_point())
    }

    fn max_z(&self) -> usize {
        delegate!(self, s => s.max_z())
    }

    fn classify(&self, region: &Region<'_>) -> Result<RegionComparison> {
        delegate!(self, s => s.classify(region))
    }

    fn equal_to(&self, other: &Self) -> bool {
        match (self, other) {
            (Shape::Point(a), Shape::Point(b)) => a.equal_to(b),
            (Shape::Box(a), Shape::Box(b)) => a.equal_to(b),
            #[cfg(feature = "geometry")]
            (Shape::Geometry(a), Shape::Geometry(b)) => a.equal_to(b),
            _ => false,
        }
    }
}
