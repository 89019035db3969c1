//! Error types for zjoin.

use crate::space::ZValue;
use crate::spatial_object::SoId;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SpatialError>;

/// Errors surfaced by spaces, decomposition, indexes and joins.
///
/// None of these are retried inside the crate.
#[derive(Debug, Error)]
pub enum SpatialError {
    /// Invalid space parameters or configuration.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// An entry with the same z-value and spatial object id already exists.
    #[error("Duplicate index key: z = {z}, soid = {soid}")]
    DuplicateKey { z: ZValue, soid: SoId },

    /// The decomposition cannot stay within the object's declared bound.
    #[error("Decomposition produced {produced} z-values, bound is {bound}")]
    DecompositionOverflow { produced: usize, bound: usize },

    /// The application's join filter failed.
    #[error("Join filter failed: {0}")]
    Predicate(String),

    /// Failure reported by the backing index.
    #[error("Backing store error: {0}")]
    BackingStore(String),

    /// Invalid argument, e.g. coordinates outside the space.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Encoding or decoding failure (WKB, bincode, JSON, TOML).
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for SpatialError {
    fn from(e: serde_json::Error) -> Self {
        SpatialError::Serialization(e.to_string())
    }
}

#[cfg(feature = "serialization")]
impl From<bincode::Error> for SpatialError {
    fn from(e: bincode::Error) -> Self {
        SpatialError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SpatialError::DuplicateKey {
            z: ZValue::ROOT,
            soid: 7,
        };
        assert!(err.to_string().contains("soid = 7"));

        let err = SpatialError::DecompositionOverflow {
            produced: 5,
            bound: 4,
        };
        assert_eq!(
            err.to_string(),
            "Decomposition produced 5 z-values, bound is 4"
        );
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: SpatialError = json_err.into();
        assert!(matches!(err, SpatialError::Serialization(_)));
    }
}
