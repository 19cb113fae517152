//! Pixel-by-band readout of a band stack.
//!
//! Downstream analysis wants one row per pixel and one column per band.
//! Rows with nodata in any band can be dropped; `pixel_index` keeps the
//! grid offset of every row so results can be scattered back.

use std::path::Path;

use geotiff_io::{read_raster, BandRaster};
use stack_common::RasterTemplate;
use tracing::debug;

use crate::error::{Result, StackError};

/// Row-major `pixels x bands` matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelMatrix {
    pub band_count: usize,
    pub values: Vec<f32>,
    /// Grid offset (`row * width + col`) of each matrix row.
    pub pixel_index: Vec<usize>,
    pub descriptions: Vec<String>,
}

impl PixelMatrix {
    /// Build from an in-memory stack.
    pub fn from_raster(raster: &BandRaster, drop_nodata: bool) -> Self {
        let template = raster.template;
        let band_count = raster.band_count();
        let mut values = Vec::with_capacity(template.len() * band_count);
        let mut pixel_index = Vec::with_capacity(template.len());

        for i in 0..template.len() {
            let row = raster.bands.iter().map(|b| b.data[i]);
            if drop_nodata && raster.bands.iter().any(|b| template.is_nodata(b.data[i])) {
                continue;
            }
            values.extend(row);
            pixel_index.push(i);
        }

        Self {
            band_count,
            values,
            pixel_index,
            descriptions: raster.descriptions(),
        }
    }

    /// Number of pixel rows.
    pub fn len(&self) -> usize {
        self.pixel_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixel_index.is_empty()
    }

    /// The band values of matrix row `i`.
    pub fn row(&self, i: usize) -> Option<&[f32]> {
        let start = i.checked_mul(self.band_count)?;
        self.values.get(start..start + self.band_count)
    }

    /// Place one value per matrix row back onto `template`'s grid.
    /// Pixels without a row hold the template nodata.
    pub fn scatter(&self, values: &[f32], template: &RasterTemplate) -> Result<Vec<f32>> {
        if values.len() != self.len() {
            return Err(StackError::LengthMismatch {
                bands: self.len(),
                descriptions: values.len(),
            });
        }
        let mut out = vec![template.nodata; template.len()];
        for (&offset, &v) in self.pixel_index.iter().zip(values) {
            let slot = out.get_mut(offset).ok_or_else(|| {
                StackError::grid_mismatch(template.describe(), format!("pixel offset {offset}"))
            })?;
            *slot = v;
        }
        Ok(out)
    }
}

/// Read the stack at `path` as a pixel matrix.
pub fn read_pixel_matrix(path: impl AsRef<Path>, drop_nodata: bool) -> Result<PixelMatrix> {
    let raster = read_raster(path)?;
    let matrix = PixelMatrix::from_raster(&raster, drop_nodata);
    debug!(
        rows = matrix.len(),
        bands = matrix.band_count,
        "Read pixel matrix"
    );
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geotiff_io::Band;
    use stack_common::{Crs, GeoTransform, DEFAULT_NODATA};

    fn raster() -> BandRaster {
        let template = RasterTemplate::new(
            2,
            2,
            GeoTransform::from_origin(0.0, 2.0, 1.0, 1.0),
            Crs::from_epsg(32613),
            DEFAULT_NODATA,
        );
        BandRaster::new(
            template,
            vec![
                Band::new(vec![1.0, 2.0, DEFAULT_NODATA, 4.0], "a"),
                Band::new(vec![10.0, f32::NAN, 30.0, 40.0], "b"),
            ],
        )
    }

    #[test]
    fn test_keep_all_rows() {
        let m = PixelMatrix::from_raster(&raster(), false);
        assert_eq!(m.len(), 4);
        assert_eq!(m.row(0).unwrap(), &[1.0, 10.0]);
        assert_eq!(m.row(3).unwrap(), &[4.0, 40.0]);
        assert!(m.row(4).is_none());
    }

    #[test]
    fn test_drop_nodata_rows() {
        let m = PixelMatrix::from_raster(&raster(), true);
        assert_eq!(m.pixel_index, vec![0, 3]);
        assert_eq!(m.values, vec![1.0, 10.0, 4.0, 40.0]);
        assert_eq!(m.descriptions, vec!["a", "b"]);
    }

    #[test]
    fn test_scatter_back() {
        let r = raster();
        let m = PixelMatrix::from_raster(&r, true);
        let grid = m.scatter(&[7.0, 8.0], &r.template).unwrap();
        assert_eq!(grid, vec![7.0, DEFAULT_NODATA, DEFAULT_NODATA, 8.0]);
        assert!(m.scatter(&[1.0], &r.template).is_err());
    }
}
