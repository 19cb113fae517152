//! Distance-to-nearest-feature rasters.
//!
//! Features are first reprojected to the template CRS. If every feature
//! lies inside the template extent the distance field is computed on the
//! template grid (**Within**). Otherwise (**Beyond**) only features near the
//! template are kept and the grid grows to cover them.

use std::fmt;
use std::path::{Path, PathBuf};

use geotiff_io::{write_raster, Band, BandRaster};
use stack_common::{BoundingBox, GeoTransform, RasterTemplate, DEFAULT_NODATA};
use tracing::{debug, info, instrument, warn};

use super::burn::burn_mask;
use super::distance::euclidean_distance;
use super::features::FeatureSet;
use super::geometry::{distance_to, intersects_bounds};
use crate::config::StackConfig;
use crate::error::{Result, StackError};
use crate::matcher::TemplateGrid;

/// How the selected features relate to the template extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtentRelation {
    Within,
    Beyond,
}

impl fmt::Display for ExtentRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Within => write!(f, "Within"),
            Self::Beyond => write!(f, "Beyond"),
        }
    }
}

/// Features chosen for a proximity computation, in the template CRS.
#[derive(Debug, Clone)]
pub struct ProximitySelection {
    pub features: FeatureSet,
    pub relation: ExtentRelation,
}

/// Choose the features that drive the distance field.
///
/// Beyond the extent, features touching the template bounds grown by their
/// own diagonal are kept. When none do, the `corner_neighbors` nearest
/// features to each template corner are used instead.
pub fn select_proximity_features(
    features: &FeatureSet,
    template: &RasterTemplate,
    corner_neighbors: usize,
) -> Result<ProximitySelection> {
    if features.is_empty() {
        return Err(StackError::empty_features("no proximity features supplied"));
    }
    let features = features.reproject(template.crs)?;
    let bounds = template.bounds();

    let within = features
        .features
        .iter()
        .all(|f| f.bounds().is_some_and(|b| bounds.contains(&b)));
    if within {
        debug!(count = features.len(), "All proximity features within template");
        return Ok(ProximitySelection {
            features,
            relation: ExtentRelation::Within,
        });
    }

    let search = bounds.expand(bounds.diagonal());
    let near: Vec<usize> = features
        .features
        .iter()
        .enumerate()
        .filter(|(_, f)| {
            f.bounds().is_some_and(|b| b.intersects(&search))
                && intersects_bounds(&f.geometry, &search)
        })
        .map(|(i, _)| i)
        .collect();

    let chosen = if near.is_empty() {
        let picked = nearest_to_corners(&features, &bounds, corner_neighbors);
        info!(
            count = picked.len(),
            corner_neighbors, "No features near template, using nearest to corners"
        );
        picked
    } else {
        debug!(count = near.len(), "Features near template");
        near
    };

    if chosen.is_empty() {
        return Err(StackError::empty_features(
            "no usable proximity features after fallback",
        ));
    }

    Ok(ProximitySelection {
        features: features.subset(&chosen),
        relation: ExtentRelation::Beyond,
    })
}

/// Indices of the `k` nearest features to each corner of `bounds`.
///
/// Corners are visited in (min_x, min_y), (min_x, max_y), (max_x, max_y),
/// (max_x, min_y) order; duplicates keep their first position.
pub fn nearest_to_corners(features: &FeatureSet, bounds: &BoundingBox, k: usize) -> Vec<usize> {
    let mut picked: Vec<usize> = Vec::new();
    for (x, y) in bounds.corners() {
        let mut ranked: Vec<(f64, usize)> = features
            .features
            .iter()
            .enumerate()
            .filter(|(_, f)| f.bounds().is_some())
            .map(|(i, f)| (distance_to(&f.geometry, x, y), i))
            .collect();
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        for (_, i) in ranked.into_iter().take(k) {
            if !picked.contains(&i) {
                picked.push(i);
            }
        }
    }
    picked
}

/// Compute the proximity raster in memory.
///
/// Distances are in CRS units. Within the extent the output grid is the
/// template; beyond it, the template grown in whole pixels to cover the
/// selected features.
pub fn proximity_raster(selection: &ProximitySelection, template: &RasterTemplate) -> Result<BandRaster> {
    let pixel_size = template.pixel_size();
    let (grid, radius) = match selection.relation {
        ExtentRelation::Within => (*template, pixel_size + 1.0),
        ExtentRelation::Beyond => {
            let feature_bounds = selection
                .features
                .bounds()
                .ok_or_else(|| StackError::empty_features("selected features have no extent"))?;
            (expanded_grid(template, &feature_bounds), pixel_size)
        }
    };

    let mask = burn_mask(
        &grid,
        selection.features.features.iter().map(|f| &f.geometry),
        radius,
    );
    let pixels = euclidean_distance(&mask, grid.width, grid.height)
        .ok_or_else(|| StackError::empty_features("features burned no pixels"))?;
    let distances = pixels.into_iter().map(|d| d * pixel_size as f32).collect();

    debug!(
        relation = %selection.relation,
        width = grid.width,
        height = grid.height,
        radius,
        "Computed proximity field"
    );

    let mut grid = grid;
    grid.nodata = DEFAULT_NODATA;
    Ok(BandRaster::new(grid, vec![Band::new(distances, "proximity")]).with_placeholder(false))
}

/// The template grid extended by whole pixels to also cover `bounds`.
pub fn expanded_grid(template: &RasterTemplate, bounds: &BoundingBox) -> RasterTemplate {
    let t = template.bounds();
    let (px, py) = template.transform.resolution();

    let grow = |distance: f64, step: f64| (distance.max(0.0) / step).ceil();
    let left = grow(t.min_x - bounds.min_x, px);
    let right = grow(bounds.max_x - t.max_x, px);
    let up = grow(bounds.max_y - t.max_y, py);
    let down = grow(t.min_y - bounds.min_y, py);

    let west = t.min_x - left * px;
    let north = t.max_y + up * py;
    RasterTemplate::new(
        template.width + (left + right) as usize,
        template.height + (up + down) as usize,
        GeoTransform::from_origin(west, north, px, py),
        template.crs,
        template.nodata,
    )
}

/// Full proximity operation against a template file.
///
/// The result is written to a new `proximity_raster*.tif` in the
/// configured scratch directory, whose path is returned.
#[instrument(skip_all, fields(template = %template_path.as_ref().display(), features = features.len()))]
pub fn vector_proximity_raster(
    features: &FeatureSet,
    template_path: impl AsRef<Path>,
    config: &StackConfig,
) -> Result<PathBuf> {
    let template = TemplateGrid::load(template_path)?.template;
    let selection = select_proximity_features(features, &template, config.corner_neighbors)?;
    if selection.relation == ExtentRelation::Beyond {
        warn!(
            kept = selection.features.len(),
            "Proximity features extend beyond the template; output grid is expanded"
        );
    }
    let raster = proximity_raster(&selection, &template)?;

    let (_, path) = tempfile::Builder::new()
        .prefix("proximity_raster")
        .suffix(".tif")
        .tempfile_in(&config.scratch_dir)?
        .keep()
        .map_err(|e| e.error)?;
    write_raster(&path, &raster, config.compression)?;

    info!(path = %path.display(), relation = %selection.relation, "Wrote proximity raster");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::features::VectorFeature;
    use geo::Point;
    use stack_common::Crs;

    fn template(size: usize) -> RasterTemplate {
        RasterTemplate::new(
            size,
            size,
            GeoTransform::from_origin(0.0, size as f64, 1.0, 1.0),
            Crs::from_epsg(32613),
            DEFAULT_NODATA,
        )
    }

    fn points(coords: &[(f64, f64)]) -> FeatureSet {
        FeatureSet::new(
            Crs::from_epsg(32613),
            coords
                .iter()
                .map(|&(x, y)| VectorFeature::new(Point::new(x, y)))
                .collect(),
        )
    }

    #[test]
    fn test_within_selection() {
        let sel = select_proximity_features(&points(&[(5.0, 5.0)]), &template(10), 5).unwrap();
        assert_eq!(sel.relation, ExtentRelation::Within);
        assert_eq!(sel.features.len(), 1);
    }

    #[test]
    fn test_beyond_keeps_near_features() {
        // Diagonal of a 10x10 template is ~14.1.
        let set = points(&[(5.0, 5.0), (20.0, 5.0), (100.0, 100.0)]);
        let sel = select_proximity_features(&set, &template(10), 5).unwrap();
        assert_eq!(sel.relation, ExtentRelation::Beyond);
        assert_eq!(sel.features.len(), 2);
    }

    #[test]
    fn test_corner_fallback_dedupes() {
        let set = points(&[(1000.0, 1000.0), (1001.0, 1000.0), (-900.0, -900.0)]);
        let picked = nearest_to_corners(&set, &BoundingBox::new(0.0, 0.0, 10.0, 10.0), 2);
        // Corner (0, 0) ranks the far-negative point first.
        assert_eq!(picked[0], 2);
        assert_eq!(picked.len(), 3);
    }

    #[test]
    fn test_empty_set_rejected() {
        let empty = FeatureSet::new(Crs::from_epsg(32613), Vec::new());
        assert!(matches!(
            select_proximity_features(&empty, &template(10), 5),
            Err(StackError::EmptyFeatureSet(_))
        ));
    }

    #[test]
    fn test_expanded_grid_stays_aligned() {
        let t = template(10);
        let grown = expanded_grid(&t, &BoundingBox::new(-2.5, 3.0, 12.2, 14.0));
        assert_eq!(grown.transform.origin_x, -3.0);
        assert_eq!(grown.transform.origin_y, 14.0);
        assert_eq!(grown.width, 16);
        assert_eq!(grown.height, 14);
    }
}
