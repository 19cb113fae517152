//! Band-stack GeoTIFF persistence.
//!
//! A band stack is stored the way GDAL writes a multiband float raster: a
//! single TIFF directory (IFD) holding one `f32` sample per band,
//! pixel-interleaved, with every sample past the first marked as an
//! unspecified extra sample.
//!
//! ```text
//! IFD 0  ── SamplesPerPixel = N, georeference tags, GDAL_NODATA, GDAL_METADATA
//! ```
//!
//! `GDAL_METADATA` carries stack-level flags such as the placeholder marker
//! and one `DESCRIPTION` item per described band. Older stacks written as
//! one single-sample directory per band, with the description in
//! `ImageDescription`, are still read, as are foreign planar rasters.
//!
//! Writes go to a sibling temporary file that is renamed over the target,
//! so readers never observe a half-written stack.

pub mod error;
pub mod metadata;
pub mod raster;
pub mod reader;
pub mod tags;
pub mod writer;

pub use error::{GeoTiffError, Result};
pub use metadata::{GdalMetadata, MetadataItem};
pub use raster::{Band, BandRaster, RasterHeader};
pub use reader::{read_header, read_raster};
pub use writer::{write_raster, GeoTiffCompression, GeoTiffWriter};
