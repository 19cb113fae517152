//! Common fixtures: reference grids and helpers that write small GeoTIFFs
//! into a scratch directory.

use std::path::{Path, PathBuf};

use geotiff_io::{write_raster, Band, BandRaster, GeoTiffCompression};
use stack_common::{Crs, GeoTransform, RasterTemplate, DEFAULT_NODATA};

/// Common bounding boxes as `(west, south, east, north)`.
pub mod bbox {
    /// Unit square, handy for pixel-size-1 grids.
    pub const UNIT_10: (f64, f64, f64, f64) = (0.0, 0.0, 10.0, 10.0);
}

/// Common CRS codes.
pub mod crs {
    pub const WGS84: u32 = 4326;
    pub const UTM_13N: u32 = 32613;
}

/// A north-up template with its upper-left corner at `(west, north)`.
pub fn test_template(
    width: usize,
    height: usize,
    west: f64,
    north: f64,
    pixel_size: f64,
    epsg: u32,
) -> RasterTemplate {
    RasterTemplate::new(
        width,
        height,
        GeoTransform::from_origin(west, north, pixel_size, pixel_size),
        Crs::from_epsg(epsg),
        DEFAULT_NODATA,
    )
}

/// `size x size` grid with pixel size 1 anchored at `(0, size)` in UTM 13N.
pub fn unit_template(size: usize) -> RasterTemplate {
    test_template(size, size, 0.0, size as f64, 1.0, crs::UTM_13N)
}

/// Write `bands` (data, description) on `template` to `dir/name`.
pub fn write_test_raster(
    dir: &Path,
    name: &str,
    template: &RasterTemplate,
    bands: Vec<(Vec<f32>, &str)>,
) -> PathBuf {
    let raster = BandRaster::new(
        *template,
        bands
            .into_iter()
            .map(|(data, description)| Band::new(data, description))
            .collect(),
    );
    write_fixture(dir, name, &raster)
}

/// Write a placeholder template mask (all 1 unless `mask` is given).
pub fn write_template_mask(
    dir: &Path,
    name: &str,
    template: &RasterTemplate,
    mask: Option<Vec<f32>>,
) -> PathBuf {
    let data = mask.unwrap_or_else(|| vec![1.0; template.len()]);
    let raster =
        BandRaster::new(*template, vec![Band::new(data, "template mask")]).with_placeholder(true);
    write_fixture(dir, name, &raster)
}

fn write_fixture(dir: &Path, name: &str, raster: &BandRaster) -> PathBuf {
    let path = dir.join(name);
    if let Err(e) = write_raster(&path, raster, GeoTiffCompression::None) {
        panic!("failed to write fixture {}: {}", path.display(), e);
    }
    path
}
