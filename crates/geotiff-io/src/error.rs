//! Error types for GeoTIFF reading and writing.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing band-stack rasters.
#[derive(Error, Debug)]
pub enum GeoTiffError {
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TIFF encoding or decoding error.
    #[error("TIFF error: {0}")]
    Tiff(String),

    /// No usable pixel-to-world transform in the file.
    #[error("{0} has no georeferencing tags")]
    MissingGeoreference(PathBuf),

    /// No EPSG code in the GeoKey directory.
    #[error("{0} has no EPSG coordinate reference system")]
    MissingCrs(PathBuf),

    /// A layout this crate does not handle (rotation, odd sample packing).
    #[error("unsupported raster layout: {0}")]
    UnsupportedLayout(String),

    /// Malformed or unwritable GDAL_METADATA document.
    #[error("GDAL metadata error: {0}")]
    Metadata(String),

    /// Raster data is inconsistent with its declared shape.
    #[error("invalid raster data: {0}")]
    InvalidData(String),
}

impl GeoTiffError {
    /// Create an InvalidData error.
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }

    /// Create an UnsupportedLayout error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedLayout(msg.into())
    }
}

impl From<tiff::TiffError> for GeoTiffError {
    fn from(err: tiff::TiffError) -> Self {
        Self::Tiff(err.to_string())
    }
}

/// Result type for GeoTIFF operations.
pub type Result<T> = std::result::Result<T, GeoTiffError>;
