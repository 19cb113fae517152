//! Band-stack raster toolkit.
//!
//! Builds and maintains a *band stack*: a multi-band GeoTIFF whose bands
//! share one pixel grid, the *template*.
//!
//! # Architecture
//!
//! ```text
//! bounds + CRS + pixel size (+ clip layer)
//!      │
//!      ▼
//! create_template_raster ──► template.tif (placeholder)
//!      │
//!      ├─► match_and_stack(sources) ──► add_matched_arrays_to_data_raster
//!      │        (reproject + resample)       (replace placeholder / append)
//!      │
//!      ├─► rasterize_vector / vector_proximity_raster
//!      │
//!      └─► drop_bands / retain_bands
//!               │
//!               ▼
//!          read_pixel_matrix ──► downstream analysis
//! ```
//!
//! # Example
//!
//! ```ignore
//! use raster_stack::{create_template_raster, match_stack_into, SourceSpec, StackConfig};
//!
//! let config = StackConfig::from_env();
//! create_template_raster("stack.tif", &bounds, crs, 100.0, None, &config)?;
//! match_stack_into("stack.tif", "stack.tif", &[SourceSpec::new("gravity.tif")], &config)?;
//! ```

pub mod assembler;
pub mod config;
pub mod error;
pub mod lock;
pub mod matcher;
pub mod pixels;
pub mod remover;
pub mod resample;
pub mod selector;
pub mod template;
pub mod types;
pub mod vector;

pub use assembler::{
    add_matched_arrays_to_data_raster, add_selected_bands_from_source, is_placeholder,
    match_and_stack, match_sources, match_stack_into, restack_matched_layers, MatchedStack,
};
pub use config::StackConfig;
pub use error::{Result, StackError};
pub use lock::StackLock;
pub use matcher::{match_raster_to_template, match_source, MatchedBands, TemplateGrid};
pub use pixels::{read_pixel_matrix, PixelMatrix};
pub use remover::{drop_bands, retain_bands};
pub use selector::{parse_selectors, selectors_for, BandSelector};
pub use template::{
    build_template, create_template_raster, estimate_layer_memory, template_dimensions,
    template_raster,
};
pub use types::{BandSelection, ResamplingMethod, SourceSpec};
pub use vector::{
    rasterize_vector, rasterize_vector_to_file, vector_proximity_raster, ExtentRelation,
    FeatureSet, VectorFeature,
};

pub use geotiff_io::{Band, BandRaster, GeoTiffCompression};
pub use stack_common::{BoundingBox, Crs, GeoTransform, NsewBounds, RasterTemplate};
