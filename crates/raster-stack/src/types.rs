//! Core types shared by the matcher and the assembler.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StackError;

/// Resampling algorithm used when a source is warped onto a template grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResamplingMethod {
    /// Nearest neighbor - fastest, preserves exact values
    Nearest,
    /// Bilinear - smooth, good default
    #[default]
    Bilinear,
    /// Catmull-Rom bicubic
    Cubic,
    /// Cubic B-spline, smoother than `Cubic`
    CubicSpline,
    /// Lanczos windowed sinc (a = 3)
    Lanczos,
    /// Mean of the contributing valid pixels
    Average,
    /// Most frequent contributing value
    Mode,
    /// Gaussian weighted mean
    Gauss,
}

impl ResamplingMethod {
    pub const ALL: [ResamplingMethod; 8] = [
        Self::Nearest,
        Self::Bilinear,
        Self::Cubic,
        Self::CubicSpline,
        Self::Lanczos,
        Self::Average,
        Self::Mode,
        Self::Gauss,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nearest => "nearest",
            Self::Bilinear => "bilinear",
            Self::Cubic => "cubic",
            Self::CubicSpline => "cubic_spline",
            Self::Lanczos => "lanczos",
            Self::Average => "average",
            Self::Mode => "mode",
            Self::Gauss => "gauss",
        }
    }
}

impl FromStr for ResamplingMethod {
    type Err = StackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "nearest" | "near" => Ok(Self::Nearest),
            "bilinear" | "linear" => Ok(Self::Bilinear),
            "cubic" | "bicubic" => Ok(Self::Cubic),
            "cubic_spline" | "cubicspline" => Ok(Self::CubicSpline),
            "lanczos" => Ok(Self::Lanczos),
            "average" | "mean" => Ok(Self::Average),
            "mode" => Ok(Self::Mode),
            "gauss" | "gaussian" => Ok(Self::Gauss),
            _ => Err(StackError::UnknownResampling(s.to_string())),
        }
    }
}

impl fmt::Display for ResamplingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which bands of a source raster to match.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BandSelection {
    #[default]
    All,
    /// Explicit 1-based band numbers, in output order.
    Indices(Vec<usize>),
}

/// One source raster in a batch match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub path: PathBuf,
    pub method: ResamplingMethod,
    pub bands: BandSelection,
    /// Per-band descriptions; derived from the file name when absent.
    pub descriptions: Option<Vec<String>>,
}

impl SourceSpec {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            method: ResamplingMethod::default(),
            bands: BandSelection::All,
            descriptions: None,
        }
    }

    pub fn method(mut self, method: ResamplingMethod) -> Self {
        self.method = method;
        self
    }

    pub fn bands(mut self, bands: BandSelection) -> Self {
        self.bands = bands;
        self
    }

    pub fn descriptions(mut self, descriptions: Vec<String>) -> Self {
        self.descriptions = Some(descriptions);
        self
    }

    /// Descriptions for the matched bands `band_numbers` (1-based).
    ///
    /// Explicit descriptions win. Otherwise the file stem is used, with a
    /// `band <n>` suffix when the source contributes more than one band.
    pub fn describe(&self, band_numbers: &[usize]) -> Vec<String> {
        if let Some(descriptions) = &self.descriptions {
            return descriptions.clone();
        }
        let stem = file_stem(&self.path);
        if band_numbers.len() == 1 {
            vec![stem]
        } else {
            band_numbers
                .iter()
                .map(|n| format!("{} band {}", stem, n))
                .collect()
        }
    }
}

/// File stem as a description, falling back to the full path.
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resampling_from_str() {
        assert_eq!("nearest".parse::<ResamplingMethod>().unwrap(), ResamplingMethod::Nearest);
        assert_eq!("Cubic-Spline".parse::<ResamplingMethod>().unwrap(), ResamplingMethod::CubicSpline);
        assert_eq!("cubic_spline".parse::<ResamplingMethod>().unwrap(), ResamplingMethod::CubicSpline);
        assert_eq!("GAUSS".parse::<ResamplingMethod>().unwrap(), ResamplingMethod::Gauss);
        assert!(matches!(
            "sinc".parse::<ResamplingMethod>(),
            Err(StackError::UnknownResampling(_))
        ));
    }

    #[test]
    fn test_resampling_display_roundtrip() {
        for method in ResamplingMethod::ALL {
            assert_eq!(method.to_string().parse::<ResamplingMethod>().unwrap(), method);
        }
    }

    #[test]
    fn test_default_descriptions() {
        let spec = SourceSpec::new("/data/magnetics.tif");
        assert_eq!(spec.describe(&[1]), vec!["magnetics"]);
        assert_eq!(
            spec.describe(&[1, 3]),
            vec!["magnetics band 1", "magnetics band 3"]
        );

        let named = spec.descriptions(vec!["tmi".to_string()]);
        assert_eq!(named.describe(&[2]), vec!["tmi"]);
    }
}
