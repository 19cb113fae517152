//! Raster-to-template matching.
//!
//! A source raster is warped onto a template grid by inverse mapping: every
//! destination pixel center is taken to world coordinates, transformed into
//! the source CRS, converted to a fractional source pixel position and
//! sampled with the chosen kernel. Destination pixels outside the
//! template's footprint (nodata in its first band) are always nodata.

use std::path::Path;

use geotiff_io::{read_raster, BandRaster};
use projection::CrsTransformer;
use rayon::prelude::*;
use stack_common::RasterTemplate;
use tracing::{debug, instrument};

use crate::error::{Result, StackError};
use crate::resample::{self, SourceBand};
use crate::types::{BandSelection, ResamplingMethod, SourceSpec};

/// The grid and footprint a source is matched onto.
#[derive(Debug, Clone)]
pub struct TemplateGrid {
    pub template: RasterTemplate,
    /// `true` where the template's first band holds data.
    pub footprint: Vec<bool>,
}

impl TemplateGrid {
    /// Read a template raster and derive its footprint from band 1.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raster = read_raster(path)?;
        Ok(Self::from_raster(&raster))
    }

    pub fn from_raster(raster: &BandRaster) -> Self {
        let template = raster.template;
        let footprint = match raster.bands.first() {
            Some(band) => band.data.iter().map(|&v| !template.is_nodata(v)).collect(),
            None => vec![true; template.len()],
        };
        Self {
            template,
            footprint,
        }
    }

    /// A template with no nodata pixels.
    pub fn full(template: RasterTemplate) -> Self {
        Self {
            footprint: vec![true; template.len()],
            template,
        }
    }
}

/// Bands matched from one source, each `template.len()` long.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedBands {
    pub planes: Vec<Vec<f32>>,
    pub descriptions: Vec<String>,
}

/// Resolve a band selection against a raster with `band_count` bands.
///
/// Returns 1-based band numbers in output order.
pub fn resolve_bands(selection: &BandSelection, band_count: usize) -> Result<Vec<usize>> {
    match selection {
        BandSelection::All => Ok((1..=band_count).collect()),
        BandSelection::Indices(indices) => {
            for &index in indices {
                if index == 0 || index > band_count {
                    return Err(StackError::BandOutOfRange { index, band_count });
                }
            }
            Ok(indices.clone())
        }
    }
}

/// Match a source file onto a template file.
pub fn match_raster_to_template(
    template_path: impl AsRef<Path>,
    source: &SourceSpec,
    resample_threads: usize,
) -> Result<MatchedBands> {
    let grid = TemplateGrid::load(template_path)?;
    match_source(&grid, source, resample_threads)
}

/// Match a source file onto an already loaded template grid.
#[instrument(skip_all, fields(source = %source.path.display(), method = %source.method))]
pub fn match_source(
    grid: &TemplateGrid,
    source: &SourceSpec,
    resample_threads: usize,
) -> Result<MatchedBands> {
    let raster = read_raster(&source.path)?;
    let band_numbers = resolve_bands(&source.bands, raster.band_count())?;

    let descriptions = source.describe(&band_numbers);
    if descriptions.len() != band_numbers.len() {
        return Err(StackError::LengthMismatch {
            bands: band_numbers.len(),
            descriptions: descriptions.len(),
        });
    }

    let planes = warp_bands(grid, &raster, &band_numbers, source.method, resample_threads)?;
    debug!(bands = planes.len(), "Matched source to template");

    Ok(MatchedBands {
        planes,
        descriptions,
    })
}

/// Warp the selected bands (1-based) of `source` onto `grid`.
///
/// Rows are distributed over a dedicated pool of `threads` workers; each
/// worker owns its own coordinate transformer.
pub fn warp_bands(
    grid: &TemplateGrid,
    source: &BandRaster,
    band_numbers: &[usize],
    method: ResamplingMethod,
    threads: usize,
) -> Result<Vec<Vec<f32>>> {
    let dst = grid.template;
    let src = source.template;

    let bands: Vec<SourceBand> = band_numbers
        .iter()
        .map(|&n| {
            source
                .band(n)
                .map(|b| SourceBand::new(&b.data, src.width, src.height, src.nodata))
                .ok_or(StackError::BandOutOfRange {
                    index: n,
                    band_count: source.band_count(),
                })
        })
        .collect::<Result<_>>()?;

    // Fail early on unknown CRSs; workers rebuild their own copy.
    let first = CrsTransformer::new(dst.crs, src.crs)?;
    debug!(
        from = %dst.crs,
        to = %src.crs,
        identity = first.is_identity(),
        threads,
        "Warping bands"
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .build()?;

    let rows: Vec<Vec<Vec<f32>>> = pool.install(|| {
        (0..dst.height)
            .into_par_iter()
            .map_init(
                || CrsTransformer::new(dst.crs, src.crs),
                |transformer, row| match transformer {
                    Ok(transformer) => Ok(warp_row(grid, &src, &bands, method, transformer, row)),
                    Err(e) => Err(StackError::Projection(e.clone())),
                },
            )
            .collect::<Result<_>>()
    })?;

    let mut planes: Vec<Vec<f32>> = (0..bands.len())
        .map(|_| Vec::with_capacity(dst.len()))
        .collect();
    for row in rows {
        for (plane, values) in planes.iter_mut().zip(row) {
            plane.extend(values);
        }
    }
    Ok(planes)
}

/// One destination row for every band.
fn warp_row(
    grid: &TemplateGrid,
    src: &RasterTemplate,
    bands: &[SourceBand],
    method: ResamplingMethod,
    transformer: &CrsTransformer,
    row: usize,
) -> Vec<Vec<f32>> {
    let dst = &grid.template;
    let mut out = vec![vec![dst.nodata; dst.width]; bands.len()];

    for col in 0..dst.width {
        if !grid.footprint[dst.index(col, row)] {
            continue;
        }
        let Some((fx, fy)) = source_position(dst, src, transformer, col as f64 + 0.5, row as f64 + 0.5)
        else {
            continue;
        };
        if fx < 0.0 || fy < 0.0 || fx > src.width as f64 || fy > src.height as f64 {
            continue;
        }

        let scale = if method == ResamplingMethod::Nearest {
            (1.0, 1.0)
        } else {
            local_scale(dst, src, transformer, col, row, (fx, fy))
        };

        for (values, band) in out.iter_mut().zip(bands) {
            if let Some(v) = resample::sample(method, band, fx - 0.5, fy - 0.5, scale) {
                values[col] = v;
            }
        }
    }
    out
}

/// Fractional source pixel position (edges at integers) of a fractional
/// destination pixel position.
fn source_position(
    dst: &RasterTemplate,
    src: &RasterTemplate,
    transformer: &CrsTransformer,
    col: f64,
    row: f64,
) -> Option<(f64, f64)> {
    let (wx, wy) = dst.transform.pixel_to_world(col, row);
    let (sx, sy) = transformer.transform(wx, wy).ok()?;
    Some(src.transform.world_to_pixel(sx, sy))
}

/// Destination pixel size in source pixels along each axis.
fn local_scale(
    dst: &RasterTemplate,
    src: &RasterTemplate,
    transformer: &CrsTransformer,
    col: usize,
    row: usize,
    center: (f64, f64),
) -> (f64, f64) {
    let (c, r) = (col as f64 + 0.5, row as f64 + 0.5);
    let step = |p: Option<(f64, f64)>| {
        p.map(|(x, y)| ((x - center.0).powi(2) + (y - center.1).powi(2)).sqrt())
            .filter(|d| d.is_finite())
            .unwrap_or(1.0)
    };
    (
        step(source_position(dst, src, transformer, c + 1.0, r)),
        step(source_position(dst, src, transformer, c, r + 1.0)),
    )
}
