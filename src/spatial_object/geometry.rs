//! Spatial objects backed by arbitrary `geo` geometries.
//!
//! A [`GeometryObject`] carries two representations of the same shape:
//! the parsed [`geo::Geometry`] and its Well-Known Binary encoding. Either
//! one may be missing and is materialised on first use, at most once per
//! instance:
//!
//! - a new object starts from the geometry; WKB is produced when the
//!   object is serialized;
//! - an object read back from storage starts from WKB; the geometry is
//!   parsed when the object is first classified or inspected.

use super::{Coords, SoId, SpatialObject};
use crate::error::{Result, SpatialError};
use crate::space::{Region, RegionComparison};
use bytes::{Buf, BufMut, Bytes};
use geo::{BoundingRect, Geometry, InteriorPoint, Relate};
use geozero::{CoordDimensions, ToGeo, ToWkb};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Default decomposition bound for geometries.
pub const DEFAULT_GEOMETRY_MAX_Z: usize = 8;

/// A 2D geometry with lazily materialised WKB and parsed forms.
#[derive(Clone)]
pub struct GeometryObject {
    id: Option<SoId>,
    max_z: usize,
    geometry: OnceCell<Geometry<f64>>,
    wkb: OnceCell<Bytes>,
}

impl GeometryObject {
    /// Wrap a parsed geometry.
    pub fn new(geometry: impl Into<Geometry<f64>>) -> Self {
        Self {
            id: None,
            max_z: DEFAULT_GEOMETRY_MAX_Z,
            geometry: OnceCell::with_value(geometry.into()),
            wkb: OnceCell::new(),
        }
    }

    /// Wrap a WKB payload; parsing is deferred until first use.
    pub fn from_wkb(wkb: impl Into<Bytes>) -> Self {
        Self {
            id: None,
            max_z: DEFAULT_GEOMETRY_MAX_Z,
            geometry: OnceCell::new(),
            wkb: OnceCell::with_value(wkb.into()),
        }
    }

    /// Parse a GeoJSON geometry.
    pub fn from_geojson(geojson: &str) -> Result<Self> {
        let geom: geojson::Geometry = geojson.parse().map_err(|e| {
            SpatialError::InvalidInput(format!("Failed to parse GeoJSON: {}", e))
        })?;
        let geometry = Geometry::<f64>::try_from(geom).map_err(|e| {
            SpatialError::InvalidInput(format!("Unsupported GeoJSON geometry: {}", e))
        })?;
        Ok(Self::new(geometry))
    }

    /// Override the decomposition bound.
    pub fn with_max_z(mut self, max_z: usize) -> Self {
        self.max_z = max_z;
        self
    }

    /// The parsed geometry, decoding the WKB payload on first access.
    pub fn geometry(&self) -> Result<&Geometry<f64>> {
        self.geometry.get_or_try_init(|| {
            let wkb = self.wkb.get().ok_or_else(|| {
                SpatialError::Serialization("Geometry has neither WKB nor a parsed form".into())
            })?;
            geozero::wkb::Wkb(wkb.to_vec()).to_geo().map_err(|e| {
                SpatialError::Serialization(format!("Failed to parse WKB: {}", e))
            })
        })
    }

    /// The WKB encoding, produced from the geometry on first access.
    pub fn wkb(&self) -> Result<&Bytes> {
        self.wkb.get_or_try_init(|| {
            let geometry = self.geometry.get().ok_or_else(|| {
                SpatialError::Serialization("Geometry has neither WKB nor a parsed form".into())
            })?;
            geometry
                .to_wkb(CoordDimensions::xy())
                .map(Bytes::from)
                .map_err(|e| SpatialError::Serialization(format!("Failed to write WKB: {}", e)))
        })
    }

    /// True once the geometry has been parsed.
    pub fn is_materialized(&self) -> bool {
        self.geometry.get().is_some()
    }

    /// Append the length-prefixed WKB blob to `out`.
    pub fn write_to(&self, out: &mut impl BufMut) -> Result<()> {
        let wkb = self.wkb()?;
        let len = u32::try_from(wkb.len()).map_err(|_| {
            SpatialError::Serialization(format!("WKB payload of {} bytes is too large", wkb.len()))
        })?;
        out.put_u32(len);
        out.put_slice(wkb);
        Ok(())
    }

    /// Read a length-prefixed WKB blob written by [`GeometryObject::write_to`].
    pub fn read_from(input: &mut impl Buf) -> Result<Self> {
        if input.remaining() < 4 {
            return Err(SpatialError::Serialization(
                "Truncated geometry: missing length prefix".into(),
            ));
        }
        let len = input.get_u32() as usize;
        if input.remaining() < len {
            return Err(SpatialError::Serialization(format!(
                "Truncated geometry: expected {} bytes, found {}",
                len,
                input.remaining()
            )));
        }
        Ok(Self::from_wkb(input.copy_to_bytes(len)))
    }

    /// True if the two geometries share at least one point.
    pub fn intersects(&self, other: &GeometryObject) -> Result<bool> {
        Ok(self.geometry()?.relate(other.geometry()?).is_intersects())
    }

    fn check_space(region: &Region<'_>) -> Result<()> {
        if region.dimensions() != 2 {
            return Err(SpatialError::InvalidInput(format!(
                "Geometries need a 2D space, got {} dimensions",
                region.dimensions()
            )));
        }
        Ok(())
    }
}

impl SpatialObject for GeometryObject {
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
        let point = self.geometry().ok().and_then(|geometry| {
            geometry.interior_point().or_else(|| {
                geometry
                    .bounding_rect()
                    .map(|rect| geo::Point::from(rect.center()))
            })
        });
        match point {
            Some(point) => Coords::from_slice(&[point.x(), point.y()]),
            None => Coords::new(),
        }
    }

    fn max_z(&self) -> usize {
        self.max_z
    }

    fn classify(&self, region: &Region<'_>) -> Result<RegionComparison> {
        Self::check_space(region)?;
        let geometry = self.geometry()?;
        let cell = region.to_rect();
        if let Some(bounds) = geometry.bounding_rect()
            && (bounds.max().x < cell.min().x
                || bounds.min().x > cell.max().x
                || bounds.max().y < cell.min().y
                || bounds.min().y > cell.max().y)
        {
            return Ok(RegionComparison::Outside);
        }
        let matrix = geometry.relate(&cell);
        Ok(if matrix.is_contains() {
            RegionComparison::Inside
        } else if matrix.is_intersects() {
            RegionComparison::Overlap
        } else {
            RegionComparison::Outside
        })
    }

    fn equal_to(&self, other: &Self) -> bool {
        match (self.geometry(), other.geometry()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for GeometryObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("GeometryObject");
        s.field("id", &self.id).field("max_z", &self.max_z);
        match self.geometry.get() {
            Some(geometry) => s.field("geometry", geometry),
            None => s.field("wkb_len", &self.wkb.get().map(Bytes::len)),
        };
        s.finish()
    }
}

#[derive(Serialize, Deserialize)]
struct GeometryRepr {
    id: Option<SoId>,
    max_z: usize,
    wkb: Vec<u8>,
}

impl Serialize for GeometryObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let wkb = self.wkb().map_err(serde::ser::Error::custom)?;
        GeometryRepr {
            id: self.id,
            max_z: self.max_z,
            wkb: wkb.to_vec(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for GeometryObject {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let repr = GeometryRepr::deserialize(deserializer)?;
        let mut object = GeometryObject::from_wkb(repr.wkb).with_max_z(repr.max_z);
        object.id = repr.id;
        Ok(object)
    }
}
