//! Error types for CRS transformations.

use stack_common::Crs;
use thiserror::Error;

/// Errors that can occur while transforming coordinates.
#[derive(Error, Debug, Clone)]
pub enum ProjectionError {
    /// The EPSG code has no known definition.
    #[error("{0} is not in the CRS definition database")]
    UnknownCrs(Crs),

    /// The definition string could not be parsed by the projection engine.
    #[error("invalid definition for {crs}: {message}")]
    InvalidDefinition { crs: Crs, message: String },

    /// A coordinate could not be transformed.
    #[error("transform from {from} to {to} failed at ({x}, {y}): {message}")]
    TransformFailed {
        from: Crs,
        to: Crs,
        x: f64,
        y: f64,
        message: String,
    },
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;
