//! The space model: dimensions, grid resolution and bit interleaving.
//!
//! A [`Space`] maps application coordinates onto a grid with `bits[d]`
//! bits per dimension, then interleaves the grid coordinates into a
//! [`ZValue`]. Truncating a z-value to fewer bits yields the containing
//! coarser cell, which is what the decomposer and the join rely on.
//!
//! ```rust
//! use zjoin::space::Space;
//!
//! let space = Space::new(&[0.0, 0.0], &[1_000_000.0, 1_000_000.0], &[20, 20])?;
//! let z = space.encode(&[5.0, 5.0], space.max_level())?;
//! let region = space.decode(z);
//! assert!(region.contains_point(&[5.0, 5.0])?);
//! # Ok::<(), zjoin::SpatialError>(())
//! ```

pub mod region;
pub mod zvalue;

pub use region::{Region, RegionComparison};
pub use zvalue::{MAX_Z_BITS, ZValue};

use crate::error::{Result, SpatialError};
use smallvec::SmallVec;

/// Maximum number of dimensions a space can have.
pub const MAX_DIMENSIONS: usize = 6;

/// Per-dimension storage, inline for common dimension counts.
pub(crate) type DimVec<T> = SmallVec<[T; 4]>;

/// An immutable space definition shared by every index built on it.
#[derive(Debug, Clone, PartialEq)]
pub struct Space {
    lo: DimVec<f64>,
    hi: DimVec<f64>,
    bits: DimVec<u32>,
    /// Dimension supplying each z-value bit, most significant first.
    interleave: Vec<usize>,
    /// For each z-value bit, the bit index within its dimension
    /// (0 = most significant).
    dim_bit: Vec<u32>,
}

impl Space {
    /// Create a space with the default round-robin interleave.
    pub fn new(lo: &[f64], hi: &[f64], bits: &[u32]) -> Result<Self> {
        Self::builder().bounds(lo, hi).bits(bits).build()
    }

    /// Start building a space.
    pub fn builder() -> SpaceBuilder {
        SpaceBuilder::default()
    }

    /// Number of dimensions.
    pub fn dimensions(&self) -> usize {
        self.lo.len()
    }

    /// Lower bound of dimension `d`.
    pub fn lo(&self, d: usize) -> f64 {
        self.lo[d]
    }

    /// Upper bound of dimension `d`.
    pub fn hi(&self, d: usize) -> f64 {
        self.hi[d]
    }

    /// Grid bits of dimension `d`.
    pub fn bits(&self, d: usize) -> u32 {
        self.bits[d]
    }

    /// Interleave order, one dimension per z-value bit.
    pub fn interleave(&self) -> &[usize] {
        &self.interleave
    }

    /// Finest level, i.e. the total number of grid bits.
    pub fn max_level(&self) -> u32 {
        self.interleave.len() as u32
    }

    /// Number of defined z-value bits for cells at `level`.
    ///
    /// Levels count bits, so this is `level` itself, capped at the
    /// space's resolution.
    pub fn z_value_length(&self, level: u32) -> u32 {
        level.min(self.max_level())
    }

    /// Grid coordinate of `x` along dimension `d`.
    ///
    /// Fails for coordinates outside `[lo, hi]`; `hi` maps to the last
    /// grid cell.
    pub fn grid_coord(&self, d: usize, x: f64) -> Result<u64> {
        if !x.is_finite() || x < self.lo[d] || x > self.hi[d] {
            return Err(SpatialError::InvalidInput(format!(
                "Coordinate {} of dimension {} is outside [{}, {}]",
                x, d, self.lo[d], self.hi[d]
            )));
        }
        Ok(self.grid_coord_clamped(d, x))
    }

    /// Grid coordinate of `x` along dimension `d`, clamped into the space.
    pub fn grid_coord_clamped(&self, d: usize, x: f64) -> u64 {
        let cells = 1u64 << self.bits[d];
        if x.is_nan() || x <= self.lo[d] {
            return 0;
        }
        if x >= self.hi[d] {
            return cells - 1;
        }
        let scaled = (x - self.lo[d]) / (self.hi[d] - self.lo[d]) * cells as f64;
        (scaled.floor() as u64).min(cells - 1)
    }

    /// Width of one finest-level grid cell along dimension `d`.
    pub fn cell_width(&self, d: usize) -> f64 {
        (self.hi[d] - self.lo[d]) / (1u64 << self.bits[d]) as f64
    }

    /// Z-value of the cell at `level` containing `coords`.
    pub fn encode(&self, coords: &[f64], level: u32) -> Result<ZValue> {
        if coords.len() != self.dimensions() {
            return Err(SpatialError::InvalidInput(format!(
                "Expected {} coordinates, got {}",
                self.dimensions(),
                coords.len()
            )));
        }
        if level > self.max_level() {
            return Err(SpatialError::InvalidInput(format!(
                "Level {} exceeds the space's maximum level {}",
                level,
                self.max_level()
            )));
        }
        let grid = coords
            .iter()
            .enumerate()
            .map(|(d, &x)| self.grid_coord(d, x))
            .collect::<Result<DimVec<u64>>>()?;
        Ok(self.shuffle(&grid, level))
    }

    /// Interleave grid coordinates, keeping the first `level` bits.
    pub(crate) fn shuffle(&self, grid: &[u64], level: u32) -> ZValue {
        let mut address = 0u64;
        for position in 0..level as usize {
            let d = self.interleave[position];
            let shift = self.bits[d] - 1 - self.dim_bit[position];
            if (grid[d] >> shift) & 1 == 1 {
                address |= 1 << (62 - position);
            }
        }
        ZValue::new(address, level)
    }

    /// Decode a z-value into the grid cell it denotes.
    ///
    /// A z-value finer than the space's resolution (one produced by a
    /// different space) is truncated to its ancestor at `max_level()`.
    pub fn decode(&self, z: ZValue) -> Region<'_> {
        let z = if z.level() > self.max_level() {
            z.ancestor(self.max_level())
        } else {
            z
        };
        let dims = self.dimensions();
        let mut prefix: DimVec<u64> = SmallVec::from_elem(0, dims);
        let mut used: DimVec<u32> = SmallVec::from_elem(0, dims);
        for position in 0..z.level() {
            let d = self.interleave[position as usize];
            prefix[d] = (prefix[d] << 1) | z.bit(position) as u64;
            used[d] += 1;
        }
        let mut lo = DimVec::with_capacity(dims);
        let mut hi = DimVec::with_capacity(dims);
        for d in 0..dims {
            let free = self.bits[d] - used[d];
            let cell_lo = prefix[d] << free;
            lo.push(cell_lo);
            hi.push(cell_lo + ((1u64 << free) - 1));
        }
        Region::new(self, z, lo, hi)
    }
}

/// Builder for [`Space`].
///
/// ```rust
/// use zjoin::space::Space;
///
/// // x gets the first 3 bits, then y, then x again.
/// let space = Space::builder()
///     .bounds(&[0.0, 0.0], &[8.0, 2.0])
///     .bits(&[3, 1])
///     .interleave(&[0, 0, 1, 0])
///     .build()?;
/// assert_eq!(space.max_level(), 4);
/// # Ok::<(), zjoin::SpatialError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct SpaceBuilder {
    dimensions: Option<usize>,
    lo: Vec<f64>,
    hi: Vec<f64>,
    bits: Vec<u32>,
    interleave: Option<Vec<usize>>,
}

impl SpaceBuilder {
    /// Declare the dimension count explicitly; checked against the
    /// bounds and bits.
    pub fn dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    /// Per-dimension coordinate bounds.
    pub fn bounds(mut self, lo: &[f64], hi: &[f64]) -> Self {
        self.lo = lo.to_vec();
        self.hi = hi.to_vec();
        self
    }

    /// Per-dimension grid bits.
    pub fn bits(mut self, bits: &[u32]) -> Self {
        self.bits = bits.to_vec();
        self
    }

    /// Custom interleave: the dimension supplying each z-value bit, most
    /// significant first.
    pub fn interleave(mut self, interleave: &[usize]) -> Self {
        self.interleave = Some(interleave.to_vec());
        self
    }

    /// Validate and build the space.
    pub fn build(self) -> Result<Space> {
        let dims = self.dimensions.unwrap_or(self.lo.len());
        if dims == 0 || dims > MAX_DIMENSIONS {
            return Err(SpatialError::Configuration(format!(
                "Dimension count must be between 1 and {}, got {}",
                MAX_DIMENSIONS, dims
            )));
        }
        if self.lo.len() != dims || self.hi.len() != dims || self.bits.len() != dims {
            return Err(SpatialError::Configuration(format!(
                "Expected {} dimensions, got {} lower bounds, {} upper bounds and {} bit counts",
                dims,
                self.lo.len(),
                self.hi.len(),
                self.bits.len()
            )));
        }
        for d in 0..dims {
            let (lo, hi) = (self.lo[d], self.hi[d]);
            if !lo.is_finite() || !hi.is_finite() || lo >= hi {
                return Err(SpatialError::Configuration(format!(
                    "Invalid bounds for dimension {}: [{}, {}]",
                    d, lo, hi
                )));
            }
            if self.bits[d] == 0 {
                return Err(SpatialError::Configuration(format!(
                    "Dimension {} needs at least one bit",
                    d
                )));
            }
        }
        let total: u32 = self.bits.iter().sum();
        if total > MAX_Z_BITS {
            return Err(SpatialError::Configuration(format!(
                "Total bits {} exceed the maximum of {}",
                total, MAX_Z_BITS
            )));
        }

        let interleave = match self.interleave {
            Some(interleave) => interleave,
            None => round_robin(&self.bits),
        };
        if interleave.len() != total as usize {
            return Err(SpatialError::Configuration(format!(
                "Interleave has {} positions, expected {}",
                interleave.len(),
                total
            )));
        }
        let mut seen = vec![0u32; dims];
        let mut dim_bit = Vec::with_capacity(interleave.len());
        for &d in &interleave {
            if d >= dims {
                return Err(SpatialError::Configuration(format!(
                    "Interleave refers to dimension {} of a {}-dimensional space",
                    d, dims
                )));
            }
            dim_bit.push(seen[d]);
            seen[d] += 1;
        }
        if let Some(d) = (0..dims).find(|&d| seen[d] != self.bits[d]) {
            return Err(SpatialError::Configuration(format!(
                "Interleave assigns {} bits to dimension {}, expected {}",
                seen[d], d, self.bits[d]
            )));
        }

        Ok(Space {
            lo: self.lo.into_iter().collect(),
            hi: self.hi.into_iter().collect(),
            bits: self.bits.into_iter().collect(),
            interleave,
            dim_bit,
        })
    }
}

fn round_robin(bits: &[u32]) -> Vec<usize> {
    let total: u32 = bits.iter().sum();
    let mut remaining = bits.to_vec();
    let mut interleave = Vec::with_capacity(total as usize);
    while interleave.len() < total as usize {
        for (d, left) in remaining.iter_mut().enumerate() {
            if *left > 0 {
                interleave.push(d);
                *left -= 1;
            }
        }
    }
    interleave
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_space() -> Space {
        Space::new(&[0.0, 0.0], &[1_000_000.0, 1_000_000.0], &[20, 20]).unwrap()
    }

    #[test]
    fn test_default_interleave_round_robin() {
        let space = Space::new(&[0.0, 0.0, 0.0], &[1.0, 1.0, 1.0], &[2, 1, 3]).unwrap();
        assert_eq!(space.interleave(), &[0, 1, 2, 0, 2, 2]);
        assert_eq!(space.max_level(), 6);
    }

    #[test]
    fn test_configuration_errors() {
        let cases: Vec<Result<Space>> = vec![
            Space::new(&[], &[], &[]),
            Space::new(&[0.0], &[1.0, 1.0], &[4]),
            Space::new(&[1.0], &[0.0], &[4]),
            Space::new(&[0.0], &[f64::INFINITY], &[4]),
            Space::new(&[0.0], &[1.0], &[0]),
            Space::new(&[0.0, 0.0], &[1.0, 1.0], &[30, 30]),
            Space::builder()
                .bounds(&[0.0, 0.0], &[1.0, 1.0])
                .bits(&[2, 2])
                .interleave(&[0, 0, 0, 1])
                .build(),
            Space::builder()
                .dimensions(3)
                .bounds(&[0.0, 0.0], &[1.0, 1.0])
                .bits(&[2, 2])
                .build(),
        ];
        for case in cases {
            assert!(matches!(case, Err(SpatialError::Configuration(_))));
        }
    }

    #[test]
    fn test_encode_known_values() {
        let space = Space::new(&[0.0, 0.0], &[4.0, 4.0], &[2, 2]).unwrap();
        // (3, 1): x = 11, y = 01, interleaved x1 y1 x0 y0 = 1 0 1 1
        let z = space.encode(&[3.0, 1.0], 4).unwrap();
        assert_eq!(z.to_string(), "z(1011/4)");
        let z = space.encode(&[3.0, 1.0], 2).unwrap();
        assert_eq!(z.to_string(), "z(10/2)");
        // The upper bound belongs to the last cell.
        let z = space.encode(&[4.0, 4.0], 4).unwrap();
        assert_eq!(z.to_string(), "z(1111/4)");
    }

    #[test]
    fn test_encode_rejects_bad_input() {
        let space = unit_space();
        assert!(space.encode(&[-1.0, 5.0], 10).is_err());
        assert!(space.encode(&[5.0, f64::NAN], 10).is_err());
        assert!(space.encode(&[5.0], 10).is_err());
        assert!(space.encode(&[5.0, 5.0], 41).is_err());
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let space = unit_space();
        let points = [
            [0.0, 0.0],
            [5.0, 5.0],
            [123_456.7, 987_654.3],
            [999_999.9, 0.5],
            [1_000_000.0, 1_000_000.0],
        ];
        for point in points {
            for level in 0..=space.max_level() {
                let z = space.encode(&point, level).unwrap();
                assert_eq!(z.level(), level);
                let region = space.decode(z);
                assert!(
                    region.contains_point(&point).unwrap(),
                    "{:?} not in {:?} at level {}",
                    point,
                    region,
                    level
                );
            }
        }
    }

    #[test]
    fn test_children_are_subregions() {
        let space = unit_space();
        let z = space.encode(&[250_000.0, 700_000.0], 7).unwrap();
        let parent = space.decode(z);
        for child in [z.child(false), z.child(true)] {
            let region = space.decode(child);
            for d in 0..2 {
                assert!(parent.lo(d) <= region.lo(d));
                assert!(region.hi(d) <= parent.hi(d));
            }
            assert!(child > z && child <= z.hi());
        }
    }

    #[test]
    fn test_z_value_length() {
        let space = Space::new(&[0.0, 0.0], &[4.0, 4.0], &[2, 2]).unwrap();
        assert_eq!(space.z_value_length(0), 0);
        assert_eq!(space.z_value_length(3), 3);
        assert_eq!(space.z_value_length(4), 4);
        assert_eq!(space.z_value_length(9), 4);
        let z = space.encode(&[3.0, 1.0], 3).unwrap();
        assert_eq!(space.z_value_length(z.level()), 3);
    }

    #[test]
    fn test_decode_truncates_foreign_levels() {
        let coarse = Space::new(&[0.0, 0.0], &[4.0, 4.0], &[2, 2]).unwrap();
        let fine = Space::new(&[0.0, 0.0], &[4.0, 4.0], &[8, 8]).unwrap();
        let z = fine.encode(&[3.5, 1.5], 16).unwrap();
        let region = coarse.decode(z);
        assert_eq!(region.level(), 4);
        assert_eq!(region.z(), coarse.encode(&[3.5, 1.5], 4).unwrap());
    }

    #[test]
    fn test_custom_interleave() {
        let space = Space::builder()
            .bounds(&[0.0, 0.0], &[8.0, 2.0])
            .bits(&[3, 1])
            .interleave(&[0, 0, 1, 0])
            .build()
            .unwrap();
        // x = 5 = 101, y = 1: bits x2 x1 y0 x0 = 1 0 1 1
        let z = space.encode(&[5.5, 1.5], 4).unwrap();
        assert_eq!(z.to_string(), "z(1011/4)");
        let region = space.decode(z.ancestor(2));
        assert_eq!(region.grid_lo(0), 4);
        assert_eq!(region.grid_hi(0), 5);
        assert_eq!(region.grid_lo(1), 0);
        assert_eq!(region.grid_hi(1), 1);
    }
}
