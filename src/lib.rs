//! Z-order spatial indexing and spatial joins over ordered key-value indexes.
//!
//! Objects are approximated by sets of grid cells, each identified by a
//! [`ZValue`] whose integer order is Z-order. The cells are stored in any
//! ordered [`Index`], and two such indexes are joined by merging their
//! records in z-value order.
//!
//! ```rust
//! use std::sync::Arc;
//! use zjoin::prelude::*;
//!
//! let space = Arc::new(Space::new(&[0.0, 0.0], &[1_000_000.0, 1_000_000.0], &[20, 20])?);
//! let mut parks: SpatialIndex<StableRecord<BBox>> = SpatialIndex::in_memory(space.clone());
//! let mut sites: SpatialIndex<StableRecord<Point>> = SpatialIndex::in_memory(space);
//!
//! parks.add(&mut BBox::new(1000.0, 1000.0, 5000.0, 4000.0), &mut StableRecord::<BBox>::factory())?;
//! sites.add(&mut Point::new(2500.0, 3000.0), &mut StableRecord::<Point>::factory())?;
//!
//! let join = SpatialJoin::new(
//!     Duplicates::Exclude,
//!     |park: &StableRecord<BBox>, site: &StableRecord<Point>| {
//!         park.spatial_object().contains_point(site.spatial_object().coords())
//!     },
//! );
//! assert_eq!(join.iterator(&parks, &sites)?.count(), 1);
//! # Ok::<(), zjoin::SpatialError>(())
//! ```

pub mod config;
pub mod decompose;
pub mod error;
pub mod index;
pub mod join;
pub mod record;
pub mod space;
pub mod spatial_index;
pub mod spatial_object;

#[cfg(feature = "sync")]
pub mod sync;

pub use config::{Config, SpaceConfig};
pub use decompose::Decomposer;
pub use error::{Result, SpatialError};

pub use space::{Region, RegionComparison, Space, SpaceBuilder, ZValue};

pub use spatial_object::{BBox, Coords, Point, Shape, SoId, SpatialObject};
#[cfg(feature = "geometry")]
pub use spatial_object::GeometryObject;

pub use record::{MutableRecord, Record, RecordFactory, StableRecord};

pub use index::{Cursor, Index, IndexKey, TreeIndex};
#[cfg(feature = "serialization")]
pub use index::SerializedIndex;

pub use spatial_index::{IndexOptions, IndexStats, SpatialIndex};

pub use join::{
    Duplicates, JoinFilter, JoinStats, Pair, QueryIterator, SpatialJoin, SpatialJoinIterator,
    TryFilter, try_filter,
};

#[cfg(feature = "sync")]
pub use sync::SyncSpatialIndex;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{Decomposer, SpatialError, ZValue};

    pub use crate::{Space, SpatialIndex, IndexOptions};

    pub use crate::{BBox, Point, Shape, SpatialObject};
    #[cfg(feature = "geometry")]
    pub use crate::GeometryObject;

    pub use crate::{MutableRecord, Record, RecordFactory, StableRecord};

    pub use crate::{Index, TreeIndex};

    pub use crate::{Duplicates, JoinFilter, Pair, SpatialJoin, try_filter};
}
