//! GeoTIFF and GDAL private tag handling.
//!
//! Only the subset needed for north-up EPSG-referenced grids is written:
//! pixel scale + tiepoint, a three-key GeoKey directory and GDAL nodata.
//! The GDAL_METADATA document lives in [`crate::metadata`].

use stack_common::{Crs, GeoTransform};

use crate::error::{self, GeoTiffError};

/// ModelPixelScaleTag: `[ScaleX, ScaleY, ScaleZ]`.
pub const MODEL_PIXEL_SCALE: u16 = 33550;
/// ModelTiepointTag: `[I, J, K, X, Y, Z]`.
pub const MODEL_TIEPOINT: u16 = 33922;
/// ModelTransformationTag: 4x4 row-major affine matrix.
pub const MODEL_TRANSFORMATION: u16 = 34264;
/// GeoKeyDirectoryTag.
pub const GEO_KEY_DIRECTORY: u16 = 34735;
/// GDAL_METADATA (XML).
pub const GDAL_METADATA: u16 = 42112;
/// GDAL_NODATA (ASCII).
pub const GDAL_NODATA: u16 = 42113;

const GT_MODEL_TYPE: u16 = 1024;
const GT_RASTER_TYPE: u16 = 1025;
const GEOGRAPHIC_TYPE: u16 = 2048;
const PROJECTED_CS_TYPE: u16 = 3072;

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;
const USER_DEFINED: u32 = 32767;

/// Metadata item holding the placeholder flag.
pub const PLACEHOLDER_ITEM: &str = "STACK_PLACEHOLDER";

/// Build a GeoKey directory for an EPSG CRS.
///
/// Layout: header `[1, 1, 0, N]` followed by `N` entries of
/// `[KeyID, TIFFTagLocation, Count, Value]`, all values inline. Codes that
/// do not fit a SHORT are rejected.
pub fn build_geokey_directory(crs: Crs, geographic: bool) -> error::Result<Vec<u16>> {
    let code = u16::try_from(crs.epsg)
        .ok()
        .filter(|&code| u32::from(code) != USER_DEFINED)
        .ok_or_else(|| {
            GeoTiffError::unsupported(format!("EPSG:{} cannot be stored as a GeoKey", crs.epsg))
        })?;

    let (model_type, crs_key) = if geographic {
        (MODEL_TYPE_GEOGRAPHIC, GEOGRAPHIC_TYPE)
    } else {
        (MODEL_TYPE_PROJECTED, PROJECTED_CS_TYPE)
    };

    Ok(vec![
        1, 1, 0, 3, // header
        GT_MODEL_TYPE, 0, 1, model_type,
        GT_RASTER_TYPE, 0, 1, RASTER_PIXEL_IS_AREA,
        crs_key, 0, 1, code,
    ])
}

/// Extract the EPSG code from a GeoKey directory.
///
/// A projected CRS key wins over a geographic one. User-defined (32767)
/// or out-of-line values yield `None`.
pub fn parse_geokey_directory(keys: &[u32]) -> Option<Crs> {
    if keys.len() < 4 {
        return None;
    }
    let count = keys[3] as usize;

    let mut projected = None;
    let mut geographic = None;
    for entry in keys[4..].chunks_exact(4).take(count) {
        let (key, location, value) = (entry[0], entry[1], entry[3]);
        if location != 0 || value == 0 || value == USER_DEFINED {
            continue;
        }
        match key as u16 {
            PROJECTED_CS_TYPE => projected = Some(value),
            GEOGRAPHIC_TYPE => geographic = Some(value),
            _ => {}
        }
    }

    projected.or(geographic).map(Crs::from_epsg)
}

/// Pixel scale and tiepoint values for a north-up transform.
pub fn model_tags(transform: &GeoTransform) -> ([f64; 3], [f64; 6]) {
    let (sx, sy) = transform.resolution();
    (
        [sx, sy, 0.0],
        [0.0, 0.0, 0.0, transform.origin_x, transform.origin_y, 0.0],
    )
}

/// Rebuild a transform from pixel scale and tiepoint tags.
pub fn transform_from_tiepoint(scale: &[f64], tiepoint: &[f64]) -> Option<GeoTransform> {
    if scale.len() < 2 || tiepoint.len() < 6 || scale[0] == 0.0 || scale[1] == 0.0 {
        return None;
    }
    let (i, j, x, y) = (tiepoint[0], tiepoint[1], tiepoint[3], tiepoint[4]);
    Some(GeoTransform::from_origin(
        x - i * scale[0],
        y + j * scale[1],
        scale[0],
        scale[1],
    ))
}

/// Rebuild a transform from a ModelTransformation matrix.
///
/// Returns `Err` with a message for rotated or sheared matrices.
pub fn transform_from_matrix(matrix: &[f64]) -> Result<Option<GeoTransform>, String> {
    if matrix.len() < 8 {
        return Ok(None);
    }
    let (a, b, c, d, e, f) = (matrix[0], matrix[1], matrix[3], matrix[4], matrix[5], matrix[7]);
    if b != 0.0 || d != 0.0 {
        return Err(format!("rotated model transformation ({b}, {d})"));
    }
    if a == 0.0 || e == 0.0 {
        return Ok(None);
    }
    Ok(Some(GeoTransform {
        origin_x: c,
        origin_y: f,
        pixel_width: a,
        pixel_height: e,
    }))
}

/// Format a nodata value the way GDAL_NODATA expects.
pub fn format_nodata(nodata: f32) -> String {
    if nodata.is_nan() {
        "nan".to_string()
    } else {
        nodata.to_string()
    }
}

/// Parse a GDAL_NODATA string.
pub fn parse_nodata(text: &str) -> Option<f32> {
    let text = text.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    if text.eq_ignore_ascii_case("nan") {
        return Some(f32::NAN);
    }
    // Values outside f32 range saturate to the f32 extremes.
    text.parse::<f64>().ok().map(|v| v as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geokey_roundtrip_projected() {
        let keys = build_geokey_directory(Crs::from_epsg(32613), false).unwrap();
        let wide: Vec<u32> = keys.iter().map(|&k| k as u32).collect();
        assert_eq!(parse_geokey_directory(&wide), Some(Crs::from_epsg(32613)));
    }

    #[test]
    fn test_geokey_geographic() {
        let keys = build_geokey_directory(Crs::WGS84, true).unwrap();
        assert_eq!(keys[4 + 3], MODEL_TYPE_GEOGRAPHIC);
        let wide: Vec<u32> = keys.iter().map(|&k| k as u32).collect();
        assert_eq!(parse_geokey_directory(&wide), Some(Crs::WGS84));
    }

    #[test]
    fn test_geokey_user_defined_is_none() {
        let keys = [1, 1, 0, 1, PROJECTED_CS_TYPE as u32, 0, 1, USER_DEFINED];
        assert_eq!(parse_geokey_directory(&keys), None);
    }

    #[test]
    fn test_tiepoint_with_offset() {
        let t = transform_from_tiepoint(&[10.0, 10.0, 0.0], &[2.0, 1.0, 0.0, 120.0, 40.0, 0.0])
            .unwrap();
        assert_eq!(t.origin_x, 100.0);
        assert_eq!(t.origin_y, 50.0);
        assert_eq!(t.pixel_height, -10.0);
    }

    #[test]
    fn test_rotated_matrix_rejected() {
        let m = [1.0, 0.5, 0.0, 0.0, 0.0, -1.0, 0.0, 0.0];
        assert!(transform_from_matrix(&m).is_err());
    }

    #[test]
    fn test_nodata_text() {
        assert_eq!(parse_nodata(&format_nodata(f32::MIN)), Some(f32::MIN));
        assert_eq!(parse_nodata("-9999\0"), Some(-9999.0));
        assert!(parse_nodata("nan").unwrap().is_nan());
        assert_eq!(parse_nodata("-3.4028234663852886e+38"), Some(f32::MIN));
    }

    #[test]
    fn test_geokey_rejects_wide_codes() {
        let err = build_geokey_directory(Crs::from_epsg(102_100), false).unwrap_err();
        assert!(matches!(err, GeoTiffError::UnsupportedLayout(_)));
        assert!(build_geokey_directory(Crs::from_epsg(USER_DEFINED), false).is_err());
    }
}
