//! Coordinate reference system transformations.
//!
//! Web Mercator <-> WGS84 is implemented directly; every other EPSG pair
//! goes through `proj4rs` using definitions from `crs-definitions`.

pub mod definitions;
pub mod error;
pub mod mercator;
pub mod transform;

pub use definitions::{is_geographic, proj_string};
pub use error::{ProjectionError, Result};
pub use transform::CrsTransformer;
