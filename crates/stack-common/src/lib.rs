//! Common types shared by every crate in the band-stack workspace.

pub mod bbox;
pub mod crs;
pub mod grid;

pub use bbox::{BboxParseError, BoundingBox, NsewBounds};
pub use crs::{Crs, CrsParseError};
pub use grid::{GeoTransform, RasterTemplate, DEFAULT_NODATA};
