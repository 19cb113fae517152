//! Vector burning: feature sets, attribute rasters and proximity rasters.

pub mod burn;
pub mod distance;
pub mod features;
pub mod geometry;
pub mod proximity;
pub mod rasterize;

pub use features::{FeatureSet, VectorFeature};
pub use proximity::{
    nearest_to_corners, proximity_raster, select_proximity_features, vector_proximity_raster,
    ExtentRelation, ProximitySelection,
};
pub use rasterize::{rasterize_vector, rasterize_vector_to_file};
