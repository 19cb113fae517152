//! Band stack assembly.
//!
//! Matched bands are collected from a batch of sources and written into a
//! data raster: they replace a placeholder template's contents or are
//! appended after the existing bands of a real stack.

use std::path::Path;

use geotiff_io::{read_raster, write_raster, Band, BandRaster};
use rayon::prelude::*;
use stack_common::RasterTemplate;
use tracing::{debug, info, instrument};

use crate::config::StackConfig;
use crate::error::{Result, StackError};
use crate::lock::StackLock;
use crate::matcher::{match_source, MatchedBands, TemplateGrid};
use crate::selector::BandSelector;
use crate::types::{file_stem, BandSelection, ResamplingMethod, SourceSpec};

/// Matched bands from a batch, in input order, on one template grid.
#[derive(Debug, Clone)]
pub struct MatchedStack {
    pub template: RasterTemplate,
    pub bands: Vec<Band>,
}

impl MatchedStack {
    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn descriptions(&self) -> Vec<String> {
        self.bands.iter().map(|b| b.description.clone()).collect()
    }

    /// Split into planes and descriptions.
    pub fn into_parts(self) -> (Vec<Vec<f32>>, Vec<String>) {
        self.bands
            .into_iter()
            .map(|b| (b.data, b.description))
            .unzip()
    }
}

/// Match every source onto the template at `template_path`.
///
/// With `threads > 1` sources are matched on a pool of that many workers;
/// the result keeps input order either way.
#[instrument(skip_all, fields(template = %template_path.as_ref().display(), sources = sources.len(), threads))]
pub fn match_and_stack(
    template_path: impl AsRef<Path>,
    sources: &[SourceSpec],
    threads: usize,
    resample_threads: usize,
) -> Result<MatchedStack> {
    let grid = TemplateGrid::load(template_path)?;
    match_sources(&grid, sources, threads, resample_threads)
}

/// [`match_and_stack`] against an already loaded grid.
pub fn match_sources(
    grid: &TemplateGrid,
    sources: &[SourceSpec],
    threads: usize,
    resample_threads: usize,
) -> Result<MatchedStack> {
    let matched: Vec<MatchedBands> = if threads <= 1 {
        sources
            .iter()
            .map(|source| match_source(grid, source, resample_threads))
            .collect::<Result<_>>()?
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()?;
        pool.install(|| {
            sources
                .par_iter()
                .map(|source| match_source(grid, source, resample_threads))
                .collect::<Result<_>>()
        })?
    };

    let bands: Vec<Band> = matched
        .into_iter()
        .flat_map(|m| {
            m.planes
                .into_iter()
                .zip(m.descriptions)
                .map(|(data, description)| Band::new(data, description))
        })
        .collect();

    debug!(bands = bands.len(), "Matched source batch");
    Ok(MatchedStack {
        template: grid.template,
        bands,
    })
}

/// Whether a data raster is still an untouched template.
///
/// The persisted flag decides. Files without one count as placeholders
/// when they hold exactly one band whose valid pixels are all 1.
pub fn is_placeholder(raster: &BandRaster) -> bool {
    if let Some(flag) = raster.placeholder {
        return flag;
    }
    let template = raster.template;
    match raster.bands.as_slice() {
        [band] => band
            .data
            .iter()
            .filter(|&&v| !template.is_nodata(v))
            .all(|&v| v == 1.0),
        _ => false,
    }
}

/// Write matched planes into the data raster at `path`.
///
/// A placeholder's contents are replaced; a stack gets the planes appended.
/// A missing file is created holding just the new bands. Returns the band
/// count after the write.
#[instrument(skip_all, fields(path = %path.as_ref().display(), bands = planes.len()))]
pub fn add_matched_arrays_to_data_raster(
    path: impl AsRef<Path>,
    template: &RasterTemplate,
    planes: Vec<Vec<f32>>,
    descriptions: Vec<String>,
    config: &StackConfig,
) -> Result<usize> {
    let path = path.as_ref();
    if planes.len() != descriptions.len() {
        return Err(StackError::LengthMismatch {
            bands: planes.len(),
            descriptions: descriptions.len(),
        });
    }
    if let Some(plane) = planes.iter().find(|p| p.len() != template.len()) {
        return Err(StackError::grid_mismatch(
            format!("{} pixels", template.len()),
            format!("{} pixels", plane.len()),
        ));
    }
    let new_bands: Vec<Band> = planes
        .into_iter()
        .zip(descriptions)
        .map(|(data, description)| Band::new(data, description))
        .collect();

    let _lock = StackLock::acquire(path, config.lock_wait())?;

    let raster = if path.exists() {
        let existing = read_raster(path)?;
        if !existing.template.same_grid(template) {
            return Err(StackError::grid_mismatch(
                existing.template.describe(),
                template.describe(),
            ));
        }
        if is_placeholder(&existing) {
            debug!("Replacing placeholder template contents");
            BandRaster::new(existing.template, new_bands)
        } else {
            let mut bands = existing.bands;
            bands.extend(new_bands);
            BandRaster::new(existing.template, bands)
        }
    } else {
        BandRaster::new(*template, new_bands)
    }
    .with_placeholder(false);

    write_raster(path, &raster, config.compression)?;
    info!(band_count = raster.band_count(), "Updated band stack");
    Ok(raster.band_count())
}

/// Match a batch of sources onto `template_path` and add them to `data_raster`.
pub fn match_stack_into(
    data_raster: impl AsRef<Path>,
    template_path: impl AsRef<Path>,
    sources: &[SourceSpec],
    config: &StackConfig,
) -> Result<usize> {
    let stack = match_and_stack(
        template_path,
        sources,
        config.threads,
        config.resample_threads,
    )?;
    let template = stack.template;
    let (planes, descriptions) = stack.into_parts();
    add_matched_arrays_to_data_raster(data_raster, &template, planes, descriptions, config)
}

/// Match the bands named by `selectors` from `source` onto the data raster's
/// own grid and add them with the selector descriptions.
#[instrument(skip_all, fields(data_raster = %data_raster.as_ref().display(), source = %source.as_ref().display()))]
pub fn add_selected_bands_from_source(
    data_raster: impl AsRef<Path>,
    source: impl AsRef<Path>,
    selectors: &[BandSelector],
    method: ResamplingMethod,
    config: &StackConfig,
) -> Result<usize> {
    let data_raster = data_raster.as_ref();
    let grid = TemplateGrid::load(data_raster)?;

    let spec = SourceSpec::new(source.as_ref())
        .method(method)
        .bands(BandSelection::Indices(
            selectors.iter().map(|s| s.index).collect(),
        ))
        .descriptions(selectors.iter().map(|s| s.description.clone()).collect());

    let matched = match_source(&grid, &spec, config.resample_threads)?;
    add_matched_arrays_to_data_raster(
        data_raster,
        &grid.template,
        matched.planes,
        matched.descriptions,
        config,
    )
}

/// Stack already aligned single-band rasters into a new file at `output`.
///
/// Each band is named after its file stem. Every input must share the
/// first input's grid.
#[instrument(skip_all, fields(output = %output.as_ref().display(), inputs = paths.len()))]
pub fn restack_matched_layers<P: AsRef<Path>>(
    paths: &[P],
    output: impl AsRef<Path>,
    config: &StackConfig,
) -> Result<usize> {
    let mut template: Option<RasterTemplate> = None;
    let mut bands = Vec::with_capacity(paths.len());

    for path in paths {
        let path = path.as_ref();
        let raster = read_raster(path)?;
        match &template {
            Some(t) if !t.same_grid(&raster.template) => {
                return Err(StackError::grid_mismatch(
                    t.describe(),
                    raster.template.describe(),
                ));
            }
            Some(_) => {}
            None => template = Some(raster.template),
        }
        let data = raster
            .bands
            .into_iter()
            .next()
            .ok_or_else(|| StackError::EmptyStack(path.to_path_buf()))?
            .data;
        bands.push(Band::new(data, file_stem(path)));
    }

    let output = output.as_ref();
    let template = template.ok_or_else(|| StackError::EmptyStack(output.to_path_buf()))?;
    let raster = BandRaster::new(template, bands).with_placeholder(false);

    let _lock = StackLock::acquire(output, config.lock_wait())?;
    write_raster(output, &raster, config.compression)?;
    info!(band_count = raster.band_count(), "Restacked layers");
    Ok(raster.band_count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stack_common::{Crs, GeoTransform, DEFAULT_NODATA};

    fn template() -> RasterTemplate {
        RasterTemplate::new(
            3,
            2,
            GeoTransform::from_origin(0.0, 2.0, 1.0, 1.0),
            Crs::from_epsg(32613),
            DEFAULT_NODATA,
        )
    }

    fn write(path: &Path, bands: Vec<Band>, placeholder: Option<bool>) {
        let mut raster = BandRaster::new(template(), bands);
        raster.placeholder = placeholder;
        write_raster(path, &raster, Default::default()).unwrap();
    }

    #[test]
    fn test_placeholder_flag_wins() {
        let raster =
            BandRaster::new(template(), vec![Band::filled(6, 1.0, "mask")]).with_placeholder(false);
        assert!(!is_placeholder(&raster));

        let raster = BandRaster::new(template(), vec![Band::filled(6, 7.0, "x")]).with_placeholder(true);
        assert!(is_placeholder(&raster));
    }

    #[test]
    fn test_placeholder_heuristic() {
        let mut data = vec![1.0; 6];
        data[2] = DEFAULT_NODATA;
        assert!(is_placeholder(&BandRaster::new(template(), vec![Band::new(data, "")])));

        let data = vec![1.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        assert!(!is_placeholder(&BandRaster::new(template(), vec![Band::new(data, "")])));

        let two = vec![Band::filled(6, 1.0, "a"), Band::filled(6, 1.0, "b")];
        assert!(!is_placeholder(&BandRaster::new(template(), two)));
    }

    #[test]
    fn test_replace_then_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stack.tif");
        write(&path, vec![Band::filled(6, 1.0, "mask")], Some(true));
        let config = StackConfig::default();

        let count = add_matched_arrays_to_data_raster(
            &path,
            &template(),
            vec![vec![2.0; 6], vec![3.0; 6]],
            vec!["a".into(), "b".into()],
            &config,
        )
        .unwrap();
        assert_eq!(count, 2);

        let count = add_matched_arrays_to_data_raster(
            &path,
            &template(),
            vec![vec![4.0; 6]],
            vec!["c".into()],
            &config,
        )
        .unwrap();
        assert_eq!(count, 3);

        let raster = read_raster(&path).unwrap();
        assert_eq!(raster.descriptions(), vec!["a", "b", "c"]);
        assert_eq!(raster.placeholder, Some(false));
        assert_eq!(raster.bands[2].data, vec![4.0; 6]);
    }

    #[test]
    fn test_length_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stack.tif");
        let err = add_matched_arrays_to_data_raster(
            &path,
            &template(),
            vec![vec![2.0; 6]],
            vec![],
            &StackConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, StackError::LengthMismatch { bands: 1, descriptions: 0 }));
        assert!(!path.exists());
    }

    #[test]
    fn test_grid_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stack.tif");
        write(&path, vec![Band::filled(6, 5.0, "x")], Some(false));

        let mut other = template();
        other.transform.origin_x = 100.0;
        let err = add_matched_arrays_to_data_raster(
            &path,
            &other,
            vec![vec![2.0; 6]],
            vec!["y".into()],
            &StackConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, StackError::GridMismatch { .. }));
        assert_eq!(read_raster(&path).unwrap().band_count(), 1);
    }

    #[test]
    fn test_held_lock_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stack.tif");
        write(&path, vec![Band::filled(6, 1.0, "mask")], Some(true));

        let _held = StackLock::acquire(&path, std::time::Duration::ZERO).unwrap();
        let err = add_matched_arrays_to_data_raster(
            &path,
            &template(),
            vec![vec![2.0; 6]],
            vec!["a".into()],
            &StackConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, StackError::ConcurrentWriteConflict(_)));
    }

    #[test]
    fn test_restack_names_bands_by_stem() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("gravity.tif");
        let b = dir.path().join("magnetics.tif");
        write(&a, vec![Band::filled(6, 1.5, "x")], None);
        write(&b, vec![Band::filled(6, 2.5, "y")], None);

        let out = dir.path().join("stack.tif");
        assert_eq!(restack_matched_layers(&[&a, &b], &out, &StackConfig::default()).unwrap(), 2);
        let raster = read_raster(&out).unwrap();
        assert_eq!(raster.descriptions(), vec!["gravity", "magnetics"]);
        assert_eq!(raster.bands[1].data, vec![2.5; 6]);
    }

    #[test]
    fn test_restack_rejects_mismatched_grid() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.tif");
        let b = dir.path().join("b.tif");
        write(&a, vec![Band::filled(6, 1.0, "x")], None);
        let other = RasterTemplate::new(
            2,
            3,
            GeoTransform::from_origin(0.0, 3.0, 1.0, 1.0),
            Crs::from_epsg(32613),
            DEFAULT_NODATA,
        );
        write_raster(
            &b,
            &BandRaster::new(other, vec![Band::filled(6, 1.0, "y")]),
            Default::default(),
        )
        .unwrap();

        let err = restack_matched_layers(&[&a, &b], dir.path().join("out.tif"), &StackConfig::default())
            .unwrap_err();
        assert!(matches!(err, StackError::GridMismatch { .. }));
    }
}
