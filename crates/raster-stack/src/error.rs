//! Error types for band-stack operations.

use std::path::PathBuf;

use geotiff_io::GeoTiffError;
use projection::ProjectionError;
use thiserror::Error;

/// Errors that can occur while building, matching or mutating band stacks.
#[derive(Error, Debug)]
pub enum StackError {
    /// Two rasters that must share a grid do not.
    #[error("grid mismatch: expected {expected}, found {found}")]
    GridMismatch { expected: String, found: String },

    /// No features left to burn.
    #[error("empty feature set: {0}")]
    EmptyFeatureSet(String),

    /// A band selector string does not follow `Band <n>: <description>`.
    #[error("malformed band selector: {0:?}")]
    MalformedBandSelector(String),

    /// Another writer holds the stack's lock file.
    #[error("band stack {0} is locked by another writer")]
    ConcurrentWriteConflict(PathBuf),

    /// A band index outside the raster's band range.
    #[error("band {index} out of range for raster with {band_count} bands")]
    BandOutOfRange { index: usize, band_count: usize },

    /// Band and description counts differ.
    #[error("{bands} bands but {descriptions} descriptions")]
    LengthMismatch { bands: usize, descriptions: usize },

    /// The operation would leave a stack without bands.
    #[error("operation would leave {0} without bands")]
    EmptyStack(PathBuf),

    /// Bounds or pixel size cannot describe a grid.
    #[error("invalid bounds: {0}")]
    InvalidBounds(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    InvalidConfig(String),

    /// Resampling method name not recognized.
    #[error("unknown resampling method: {0}")]
    UnknownResampling(String),

    /// Vector input could not be parsed or converted.
    #[error("vector error: {0}")]
    Vector(String),

    /// Worker pool could not be built.
    #[error("thread pool error: {0}")]
    ThreadPool(String),

    /// Projection error.
    #[error(transparent)]
    Projection(#[from] ProjectionError),

    /// GeoTIFF read/write error.
    #[error(transparent)]
    GeoTiff(#[from] GeoTiffError),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StackError {
    /// Create a GridMismatch error.
    pub fn grid_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::GridMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create an EmptyFeatureSet error.
    pub fn empty_features(msg: impl Into<String>) -> Self {
        Self::EmptyFeatureSet(msg.into())
    }

    /// Create an InvalidBounds error.
    pub fn invalid_bounds(msg: impl Into<String>) -> Self {
        Self::InvalidBounds(msg.into())
    }

    /// Create a Vector error.
    pub fn vector(msg: impl Into<String>) -> Self {
        Self::Vector(msg.into())
    }
}

impl From<serde_json::Error> for StackError {
    fn from(err: serde_json::Error) -> Self {
        Self::Vector(err.to_string())
    }
}

impl From<rayon::ThreadPoolBuildError> for StackError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        Self::ThreadPool(err.to_string())
    }
}

/// Result type for band-stack operations.
pub type Result<T> = std::result::Result<T, StackError>;
