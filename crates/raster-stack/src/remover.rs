//! Removing bands from a band stack.

use std::collections::HashSet;
use std::path::Path;

use geotiff_io::{read_raster, write_raster, Band, BandRaster};
use tracing::{info, instrument};

use crate::config::StackConfig;
use crate::error::{Result, StackError};
use crate::lock::StackLock;
use crate::selector::BandSelector;

/// Drop the bands at zero-based `indices` and rewrite the stack.
///
/// Remaining bands keep their relative order and descriptions. Duplicate
/// indices are ignored. Returns the band count after the rewrite.
#[instrument(skip_all, fields(path = %path.as_ref().display(), drop = ?indices))]
pub fn drop_bands(path: impl AsRef<Path>, indices: &[usize], config: &StackConfig) -> Result<usize> {
    let path = path.as_ref();
    let _lock = StackLock::acquire(path, config.lock_wait())?;
    let raster = read_raster(path)?;
    let kept = without_bands(raster, indices, path)?;

    write_raster(path, &kept, config.compression)?;
    info!(band_count = kept.band_count(), "Dropped bands");
    Ok(kept.band_count())
}

/// Keep only the bands named by `selectors`, in selector order, described
/// by the selector descriptions. A band named twice is kept once.
#[instrument(skip_all, fields(path = %path.as_ref().display(), keep = selectors.len()))]
pub fn retain_bands(
    path: impl AsRef<Path>,
    selectors: &[BandSelector],
    config: &StackConfig,
) -> Result<usize> {
    let path = path.as_ref();
    let _lock = StackLock::acquire(path, config.lock_wait())?;
    let raster = read_raster(path)?;
    let kept = select_bands(raster, selectors, path)?;

    write_raster(path, &kept, config.compression)?;
    info!(band_count = kept.band_count(), "Retained bands");
    Ok(kept.band_count())
}

fn without_bands(raster: BandRaster, indices: &[usize], path: &Path) -> Result<BandRaster> {
    let band_count = raster.band_count();
    if let Some(&index) = indices.iter().find(|&&i| i >= band_count) {
        return Err(StackError::BandOutOfRange { index, band_count });
    }
    let dropped: HashSet<usize> = indices.iter().copied().collect();
    if dropped.len() == band_count {
        return Err(StackError::EmptyStack(path.to_path_buf()));
    }

    let bands: Vec<Band> = raster
        .bands
        .into_iter()
        .enumerate()
        .filter(|(i, _)| !dropped.contains(i))
        .map(|(_, band)| band)
        .collect();
    Ok(BandRaster::new(raster.template, bands).with_placeholder(false))
}

fn select_bands(raster: BandRaster, selectors: &[BandSelector], path: &Path) -> Result<BandRaster> {
    let band_count = raster.band_count();
    let mut seen = HashSet::new();
    let mut bands = Vec::with_capacity(selectors.len());

    for selector in selectors {
        let band = raster.band(selector.index).ok_or(StackError::BandOutOfRange {
            index: selector.index,
            band_count,
        })?;
        if seen.insert(selector.index) {
            bands.push(Band::new(band.data.clone(), selector.description.clone()));
        }
    }

    if bands.is_empty() {
        return Err(StackError::EmptyStack(path.to_path_buf()));
    }
    Ok(BandRaster::new(raster.template, bands).with_placeholder(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stack_common::{Crs, GeoTransform, RasterTemplate, DEFAULT_NODATA};

    fn stack(n: usize) -> BandRaster {
        let template = RasterTemplate::new(
            2,
            2,
            GeoTransform::from_origin(0.0, 2.0, 1.0, 1.0),
            Crs::from_epsg(32613),
            DEFAULT_NODATA,
        );
        let bands = (0..n)
            .map(|i| Band::filled(4, i as f32, format!("layer {i}")))
            .collect();
        BandRaster::new(template, bands).with_placeholder(false)
    }

    fn path() -> &'static Path {
        Path::new("stack.tif")
    }

    #[test]
    fn test_drop_middle() {
        let kept = without_bands(stack(3), &[1], path()).unwrap();
        assert_eq!(kept.descriptions(), vec!["layer 0", "layer 2"]);
        assert_eq!(kept.bands[1].data, vec![2.0; 4]);
    }

    #[test]
    fn test_drop_duplicates_ignored() {
        let kept = without_bands(stack(3), &[0, 0, 2], path()).unwrap();
        assert_eq!(kept.descriptions(), vec!["layer 1"]);
    }

    #[test]
    fn test_drop_out_of_range() {
        let err = without_bands(stack(3), &[3], path()).unwrap_err();
        assert!(matches!(err, StackError::BandOutOfRange { index: 3, band_count: 3 }));
    }

    #[test]
    fn test_drop_everything() {
        let err = without_bands(stack(2), &[1, 0], path()).unwrap_err();
        assert!(matches!(err, StackError::EmptyStack(_)));
    }

    #[test]
    fn test_drop_nothing_keeps_all() {
        let kept = without_bands(stack(2), &[], path()).unwrap();
        assert_eq!(kept.band_count(), 2);
    }

    #[test]
    fn test_select_reorders_and_renames() {
        let selectors = vec![
            BandSelector::new(3, "third"),
            BandSelector::new(1, "first"),
            BandSelector::new(3, "again"),
        ];
        let kept = select_bands(stack(3), &selectors, path()).unwrap();
        assert_eq!(kept.descriptions(), vec!["third", "first"]);
        assert_eq!(kept.bands[0].data, vec![2.0; 4]);
    }

    #[test]
    fn test_select_out_of_range() {
        let err = select_bands(stack(2), &[BandSelector::new(5, "x")], path()).unwrap_err();
        assert!(matches!(err, StackError::BandOutOfRange { index: 5, .. }));
        assert!(matches!(
            select_bands(stack(2), &[], path()),
            Err(StackError::EmptyStack(_))
        ));
    }

    #[test]
    fn test_drop_bands_rewrites_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("stack.tif");
        write_raster(&file, &stack(3), Default::default()).unwrap();

        assert_eq!(drop_bands(&file, &[1], &StackConfig::default()).unwrap(), 2);
        let raster = read_raster(&file).unwrap();
        assert_eq!(raster.descriptions(), vec!["layer 0", "layer 2"]);
        assert!(!crate::lock::lock_path(&file).exists());
    }
}
