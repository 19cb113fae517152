//! Pixel grid definitions: affine geotransforms and raster templates.

use crate::{BoundingBox, Crs};
use serde::{Deserialize, Serialize};

/// Nodata sentinel used for every raster this workspace writes.
pub const DEFAULT_NODATA: f32 = f32::MIN;

/// North-up affine transform (no rotation terms).
///
/// Pixel `(col, row)` covers the world rectangle starting at
/// `origin_x + col * pixel_width`, `origin_y + row * pixel_height`.
/// `pixel_height` is negative for the usual north-up layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Transform anchored at the upper-left corner with square-ish pixels.
    pub fn from_origin(west: f64, north: f64, xsize: f64, ysize: f64) -> Self {
        Self {
            origin_x: west,
            origin_y: north,
            pixel_width: xsize,
            pixel_height: -ysize,
        }
    }

    /// World coordinate of a (fractional) pixel position.
    pub fn pixel_to_world(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width,
            self.origin_y + row * self.pixel_height,
        )
    }

    /// World coordinate of the center of pixel `(col, row)`.
    pub fn pixel_center(&self, col: usize, row: usize) -> (f64, f64) {
        self.pixel_to_world(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Fractional pixel position of a world coordinate.
    ///
    /// Integer values are pixel edges; pixel centers sit at `i + 0.5`.
    pub fn world_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.origin_x) / self.pixel_width,
            (y - self.origin_y) / self.pixel_height,
        )
    }

    /// Absolute pixel size `(x, y)`.
    pub fn resolution(&self) -> (f64, f64) {
        (self.pixel_width.abs(), self.pixel_height.abs())
    }

    /// Approximate equality, tolerant of float noise from file round trips.
    pub fn approx_eq(&self, other: &GeoTransform) -> bool {
        let tol = 1e-9 * self.pixel_width.abs().max(1.0);
        (self.origin_x - other.origin_x).abs() <= tol
            && (self.origin_y - other.origin_y).abs() <= tol
            && (self.pixel_width - other.pixel_width).abs() <= tol
            && (self.pixel_height - other.pixel_height).abs() <= tol
    }
}

/// The pixel grid every band of a stack conforms to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RasterTemplate {
    pub width: usize,
    pub height: usize,
    pub transform: GeoTransform,
    pub crs: Crs,
    pub nodata: f32,
}

impl RasterTemplate {
    pub fn new(width: usize, height: usize, transform: GeoTransform, crs: Crs, nodata: f32) -> Self {
        Self {
            width,
            height,
            transform,
            crs,
            nodata,
        }
    }

    /// Number of pixels in one band.
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// World extent covered by the grid.
    pub fn bounds(&self) -> BoundingBox {
        let (x0, y0) = self.transform.pixel_to_world(0.0, 0.0);
        let (x1, y1) = self
            .transform
            .pixel_to_world(self.width as f64, self.height as f64);
        BoundingBox::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }

    /// Pixel size along x (the value callers treat as "the" resolution).
    pub fn pixel_size(&self) -> f64 {
        self.transform.resolution().0
    }

    /// Row-major offset of `(col, row)`.
    pub fn index(&self, col: usize, row: usize) -> usize {
        row * self.width + col
    }

    /// Whether `value` is this grid's nodata (NaN always counts).
    pub fn is_nodata(&self, value: f32) -> bool {
        value.is_nan() || value == self.nodata
    }

    /// Same dimensions, transform and CRS. Nodata is not compared.
    pub fn same_grid(&self, other: &RasterTemplate) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.crs == other.crs
            && self.transform.approx_eq(&other.transform)
    }

    /// Short human readable description used in error messages.
    pub fn describe(&self) -> String {
        let (rx, ry) = self.transform.resolution();
        format!(
            "{}x{} @ {}x{} origin ({}, {}) {}",
            self.width,
            self.height,
            rx,
            ry,
            self.transform.origin_x,
            self.transform.origin_y,
            self.crs
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> RasterTemplate {
        RasterTemplate::new(
            4,
            3,
            GeoTransform::from_origin(100.0, 50.0, 10.0, 10.0),
            Crs::from_epsg(32612),
            DEFAULT_NODATA,
        )
    }

    #[test]
    fn test_bounds() {
        let t = template();
        assert_eq!(t.bounds(), BoundingBox::new(100.0, 20.0, 140.0, 50.0));
    }

    #[test]
    fn test_pixel_roundtrip() {
        let t = template();
        let (x, y) = t.transform.pixel_center(2, 1);
        assert_eq!((x, y), (125.0, 35.0));
        let (c, r) = t.transform.world_to_pixel(x, y);
        assert!((c - 2.5).abs() < 1e-12);
        assert!((r - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_same_grid_ignores_nodata() {
        let a = template();
        let mut b = template();
        b.nodata = -9999.0;
        assert!(a.same_grid(&b));
        b.width = 5;
        assert!(!a.same_grid(&b));
    }

    #[test]
    fn test_is_nodata() {
        let t = template();
        assert!(t.is_nodata(f32::MIN));
        assert!(t.is_nodata(f32::NAN));
        assert!(!t.is_nodata(0.0));
    }
}
