//! Template grid construction.
//!
//! A template is the pixel grid every band of a stack conforms to. It is
//! persisted as a single-band mask raster flagged as a placeholder: 1 inside
//! the analysis area, 0 outside (or all 1 without a clipping layer).

use std::path::Path;

use geotiff_io::{write_raster, Band, BandRaster};
use stack_common::{BoundingBox, Crs, GeoTransform, RasterTemplate, DEFAULT_NODATA};
use tracing::{info, instrument, warn};

use crate::config::StackConfig;
use crate::error::{Result, StackError};
use crate::vector::burn::burn_mask;
use crate::vector::FeatureSet;

/// Description of the mask band in a fresh template.
pub const TEMPLATE_BAND_DESCRIPTION: &str = "template mask";

/// Grid dimensions for `bounds` at `pixel_size`.
///
/// `width = ceil(|west - east| / pixel_size)`,
/// `height = ceil(|north - south| / pixel_size)`.
pub fn template_dimensions(bounds: &BoundingBox, pixel_size: f64) -> Result<(usize, usize)> {
    if !pixel_size.is_finite() || pixel_size <= 0.0 {
        return Err(StackError::invalid_bounds(format!(
            "pixel size must be positive, got {pixel_size}"
        )));
    }
    let coords = [bounds.min_x, bounds.min_y, bounds.max_x, bounds.max_y];
    if coords.iter().any(|c| !c.is_finite()) {
        return Err(StackError::invalid_bounds(format!("non-finite bounds {bounds:?}")));
    }

    let width = ((bounds.min_x - bounds.max_x).abs() / pixel_size).ceil();
    let height = ((bounds.max_y - bounds.min_y).abs() / pixel_size).ceil();
    if width < 1.0 || height < 1.0 {
        return Err(StackError::invalid_bounds(format!(
            "bounds {bounds:?} are degenerate"
        )));
    }
    Ok((width as usize, height as usize))
}

/// The template grid for `bounds` (west, south, east, north) in `crs`.
///
/// The transform is anchored at (west, north).
pub fn build_template(bounds: &BoundingBox, crs: Crs, pixel_size: f64) -> Result<RasterTemplate> {
    let (width, height) = template_dimensions(bounds, pixel_size)?;
    Ok(RasterTemplate::new(
        width,
        height,
        GeoTransform::from_origin(bounds.min_x, bounds.max_y, pixel_size, pixel_size),
        crs,
        DEFAULT_NODATA,
    ))
}

/// Build the template mask raster in memory.
///
/// With a clipping layer, its geometries are reprojected to `crs` and
/// burned as 1 over a 0 background.
pub fn template_raster(
    bounds: &BoundingBox,
    crs: Crs,
    pixel_size: f64,
    clip: Option<&FeatureSet>,
) -> Result<BandRaster> {
    let template = build_template(bounds, crs, pixel_size)?;

    let data = match clip {
        None => vec![1.0; template.len()],
        Some(clip) => {
            if clip.is_empty() {
                return Err(StackError::empty_features("clipping layer has no geometries"));
            }
            let clip = clip.reproject(crs)?;
            let mask = burn_mask(&template, clip.features.iter().map(|f| &f.geometry), 0.0);
            let inside = mask.iter().filter(|&&m| m).count();
            if inside == 0 {
                warn!(
                    features = clip.len(),
                    "Clipping layer burned no pixels, template mask is all zero"
                );
            }
            mask.into_iter().map(|m| if m { 1.0 } else { 0.0 }).collect()
        }
    };

    Ok(
        BandRaster::new(template, vec![Band::new(data, TEMPLATE_BAND_DESCRIPTION)])
            .with_placeholder(true),
    )
}

/// Build a template and write it to `path`.
#[instrument(skip_all, fields(path = %path.as_ref().display(), crs = %crs, pixel_size))]
pub fn create_template_raster(
    path: impl AsRef<Path>,
    bounds: &BoundingBox,
    crs: Crs,
    pixel_size: f64,
    clip: Option<&FeatureSet>,
    config: &StackConfig,
) -> Result<RasterTemplate> {
    let raster = template_raster(bounds, crs, pixel_size, clip)?;
    write_raster(path.as_ref(), &raster, config.compression)?;
    info!(
        width = raster.template.width,
        height = raster.template.height,
        clipped = clip.is_some(),
        "Created template raster"
    );
    Ok(raster.template)
}

/// Size in bytes of one layer of a template over `bounds`.
pub fn estimate_layer_memory(
    bounds: &BoundingBox,
    pixel_size: f64,
    bytes_per_pixel: usize,
) -> Result<u64> {
    let (width, height) = template_dimensions(bounds, pixel_size)?;
    Ok(width as u64 * height as u64 * bytes_per_pixel as u64)
}
