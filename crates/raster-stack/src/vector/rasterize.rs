//! Attribute rasterization onto a template grid.

use std::path::Path;

use geotiff_io::{write_raster, Band, BandRaster};
use stack_common::RasterTemplate;
use tracing::{debug, info, instrument};

use super::burn::burn_values;
use super::features::FeatureSet;
use crate::config::StackConfig;
use crate::error::{Result, StackError};
use crate::matcher::TemplateGrid;

/// Burn features into a single-band raster on `template`.
///
/// With a `field`, each feature burns its numeric attribute value and rows
/// without a numeric value are dropped; without one every feature burns 1.
/// Later features overwrite earlier ones. Unburned pixels are nodata.
pub fn rasterize_vector(
    features: &FeatureSet,
    template: &RasterTemplate,
    field: Option<&str>,
) -> Result<BandRaster> {
    if features.is_empty() {
        return Err(StackError::empty_features("no features to rasterize"));
    }
    let features = features.reproject(template.crs)?;

    let values: Vec<Option<f64>> = match field {
        Some(field) => features.numeric_attribute(field),
        None => vec![Some(1.0); features.len()],
    };
    let dropped = values.iter().filter(|v| v.is_none()).count();
    if dropped == features.len() {
        return Err(StackError::empty_features(format!(
            "no feature has a numeric {:?} value",
            field.unwrap_or_default()
        )));
    }

    let bounds = template.bounds();
    let items: Vec<_> = features
        .features
        .iter()
        .zip(&values)
        .filter_map(|(f, v)| v.map(|v| (f, v as f32)))
        .filter(|(f, _)| f.bounds().is_some_and(|b| b.intersects(&bounds)))
        .map(|(f, v)| (&f.geometry, v))
        .collect();
    debug!(burned = items.len(), dropped, "Rasterizing features");

    let data = burn_values(template, items, template.nodata);
    let description = field.unwrap_or("features").to_string();
    Ok(BandRaster::new(*template, vec![Band::new(data, description)]).with_placeholder(false))
}

/// Rasterize onto the grid of a template file and write `output`.
#[instrument(skip_all, fields(template = %template_path.as_ref().display(), output = %output.as_ref().display()))]
pub fn rasterize_vector_to_file(
    features: &FeatureSet,
    template_path: impl AsRef<Path>,
    field: Option<&str>,
    output: impl AsRef<Path>,
    config: &StackConfig,
) -> Result<()> {
    let template = TemplateGrid::load(template_path)?.template;
    let raster = rasterize_vector(features, &template, field)?;
    write_raster(output.as_ref(), &raster, config.compression)?;
    info!(field = field.unwrap_or("-"), "Wrote attribute raster");
    Ok(())
}
