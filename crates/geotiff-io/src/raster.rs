//! In-memory band stacks.

use crate::error::{GeoTiffError, Result};
use stack_common::RasterTemplate;

/// One band: row-major pixels plus a free-text description.
#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    pub data: Vec<f32>,
    pub description: String,
}

impl Band {
    pub fn new(data: Vec<f32>, description: impl Into<String>) -> Self {
        Self {
            data,
            description: description.into(),
        }
    }

    /// A band filled with a single value.
    pub fn filled(len: usize, value: f32, description: impl Into<String>) -> Self {
        Self::new(vec![value; len], description)
    }
}

/// An ordered stack of bands sharing one grid.
#[derive(Debug, Clone, PartialEq)]
pub struct BandRaster {
    pub template: RasterTemplate,
    pub bands: Vec<Band>,
    /// Persisted placeholder flag. `None` when the file carried no flag.
    pub placeholder: Option<bool>,
}

impl BandRaster {
    pub fn new(template: RasterTemplate, bands: Vec<Band>) -> Self {
        Self {
            template,
            bands,
            placeholder: None,
        }
    }

    pub fn with_placeholder(mut self, placeholder: bool) -> Self {
        self.placeholder = Some(placeholder);
        self
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// Band by 1-based index.
    pub fn band(&self, index: usize) -> Option<&Band> {
        index.checked_sub(1).and_then(|i| self.bands.get(i))
    }

    pub fn descriptions(&self) -> Vec<String> {
        self.bands.iter().map(|b| b.description.clone()).collect()
    }

    /// Check every band has exactly one value per grid cell.
    pub fn validate(&self) -> Result<()> {
        if self.template.is_empty() {
            return Err(GeoTiffError::invalid_data("raster has zero dimensions"));
        }
        let expected = self.template.len();
        for (i, band) in self.bands.iter().enumerate() {
            if band.data.len() != expected {
                return Err(GeoTiffError::invalid_data(format!(
                    "band {} has {} values, grid {}x{} needs {}",
                    i + 1,
                    band.data.len(),
                    self.template.width,
                    self.template.height,
                    expected
                )));
            }
        }
        Ok(())
    }
}

/// Grid and band metadata without pixel data.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterHeader {
    pub template: RasterTemplate,
    pub band_count: usize,
    pub descriptions: Vec<String>,
    pub placeholder: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use stack_common::{Crs, GeoTransform, DEFAULT_NODATA};

    fn template() -> RasterTemplate {
        RasterTemplate::new(
            2,
            2,
            GeoTransform::from_origin(0.0, 2.0, 1.0, 1.0),
            Crs::from_epsg(32613),
            DEFAULT_NODATA,
        )
    }

    #[test]
    fn test_band_one_based() {
        let raster = BandRaster::new(
            template(),
            vec![Band::filled(4, 1.0, "a"), Band::filled(4, 2.0, "b")],
        );
        assert_eq!(raster.band(1).unwrap().description, "a");
        assert_eq!(raster.band(2).unwrap().description, "b");
        assert!(raster.band(0).is_none());
        assert!(raster.band(3).is_none());
    }

    #[test]
    fn test_validate_length() {
        let raster = BandRaster::new(template(), vec![Band::filled(3, 1.0, "short")]);
        assert!(matches!(raster.validate(), Err(GeoTiffError::InvalidData(_))));
    }
}
