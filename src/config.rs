//! Serializable configuration for spaces, indexes and joins.
//!
//! ```rust
//! use zjoin::Config;
//!
//! let json = r#"{
//!     "space": { "lo": [0.0, 0.0], "hi": [300.0, 300.0], "bits": [20, 20] },
//!     "index": "single_cell",
//!     "duplicates": "include"
//! }"#;
//! let config = Config::from_json(json).unwrap();
//! let space = config.build_space().unwrap();
//! assert_eq!(space.max_level(), 40);
//! ```

use crate::error::Result;
use crate::index::TreeIndex;
use crate::join::{Duplicates, SpatialJoin};
use crate::record::Record;
use crate::space::Space;
use crate::spatial_index::{IndexOptions, SpatialIndex};
use serde::de::Error;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Space parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpaceConfig {
    /// Lower bound per dimension
    #[serde(default = "SpaceConfig::default_lo")]
    pub lo: Vec<f64>,

    /// Upper bound per dimension
    #[serde(default = "SpaceConfig::default_hi")]
    pub hi: Vec<f64>,

    /// Grid bits per dimension
    #[serde(default = "SpaceConfig::default_bits")]
    pub bits: Vec<u32>,

    /// Dimension supplying each z-value bit; round robin when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interleave: Option<Vec<usize>>,
}

impl SpaceConfig {
    fn default_lo() -> Vec<f64> {
        vec![0.0, 0.0]
    }

    fn default_hi() -> Vec<f64> {
        vec![1_000_000.0, 1_000_000.0]
    }

    fn default_bits() -> Vec<u32> {
        vec![20, 20]
    }

    pub fn new(lo: &[f64], hi: &[f64], bits: &[u32]) -> Self {
        Self {
            lo: lo.to_vec(),
            hi: hi.to_vec(),
            bits: bits.to_vec(),
            interleave: None,
        }
    }

    pub fn with_interleave(mut self, interleave: &[usize]) -> Self {
        self.interleave = Some(interleave.to_vec());
        self
    }

    pub fn build(&self) -> Result<Space> {
        let mut builder = Space::builder().bounds(&self.lo, &self.hi).bits(&self.bits);
        if let Some(interleave) = &self.interleave {
            builder = builder.interleave(interleave);
        }
        builder.build()
    }
}

impl Default for SpaceConfig {
    fn default() -> Self {
        Self {
            lo: Self::default_lo(),
            hi: Self::default_hi(),
            bits: Self::default_bits(),
            interleave: None,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// How objects are decomposed when added
    #[serde(default)]
    pub index: IndexOptions,

    /// Duplicate policy for joins
    #[serde(default)]
    pub duplicates: Duplicates,

    /// The space every index is built on
    #[serde(default)]
    pub space: SpaceConfig,
}

impl Config {
    pub fn with_space(mut self, space: SpaceConfig) -> Self {
        self.space = space;
        self
    }

    pub fn with_index_options(mut self, options: IndexOptions) -> Self {
        self.index = options;
        self
    }

    pub fn with_duplicates(mut self, duplicates: Duplicates) -> Self {
        self.duplicates = duplicates;
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.space.build().map(|_| ()).map_err(|e| e.to_string())
    }

    /// Build the configured space.
    pub fn build_space(&self) -> Result<Arc<Space>> {
        self.space.build().map(Arc::new)
    }

    /// An empty in-memory spatial index on a new space.
    ///
    /// Indexes that will be joined must share a space; use
    /// [`Config::spatial_index_on`] for the second one.
    pub fn spatial_index<R: Record>(&self) -> Result<SpatialIndex<R>> {
        Ok(self.spatial_index_on(self.build_space()?))
    }

    /// An empty in-memory spatial index on `space`, using the configured
    /// index options.
    pub fn spatial_index_on<R: Record>(&self, space: Arc<Space>) -> SpatialIndex<R> {
        SpatialIndex::with_options(space, TreeIndex::new(), self.index)
    }

    /// A join with the configured duplicate policy.
    pub fn join<F>(&self, filter: F) -> SpatialJoin<F> {
        SpatialJoin::new(self.duplicates, filter)
    }

    /// Load configuration from JSON string
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        let config: Config = serde_json::from_str(json)?;
        if let Err(e) = config.validate() {
            return Err(serde_json::Error::custom(e));
        }
        Ok(config)
    }

    /// Save configuration as JSON string
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load configuration from TOML string (requires toml feature)
    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> std::result::Result<Self, toml::de::Error> {
        let config: Config = toml::from_str(toml_str)?;
        if let Err(e) = config.validate() {
            return Err(toml::de::Error::custom(e));
        }
        Ok(config)
    }

    /// Save configuration as TOML string (requires toml feature)
    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
