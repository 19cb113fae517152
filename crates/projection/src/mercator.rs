//! Spherical Web Mercator (EPSG:3857).
//!
//! Kept out of the general engine: it is the most common pairing with
//! WGS84 and the closed form is exact.

use std::f64::consts::PI;

/// WGS84 semi-major axis used by Web Mercator (meters).
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Latitude limit of the square Web Mercator world.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Longitude/latitude degrees to Web Mercator meters.
#[inline]
pub fn lon_lat_to_mercator(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let x = EARTH_RADIUS * lon.to_radians();
    let y = EARTH_RADIUS * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln();
    (x, y)
}

/// Web Mercator meters to longitude/latitude degrees.
#[inline]
pub fn mercator_to_lon_lat(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / EARTH_RADIUS).to_degrees();
    let lat = (y / EARTH_RADIUS).sinh().atan().to_degrees();
    (lon, lat)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin() {
        let (x, y) = lon_lat_to_mercator(0.0, 0.0);
        assert!(x.abs() < 1e-9);
        assert!(y.abs() < 1e-9);
    }

    #[test]
    fn test_world_extent() {
        let (x, y) = lon_lat_to_mercator(180.0, MAX_LATITUDE);
        assert!((x - 20_037_508.342_789_244).abs() < 1e-6);
        assert!((y - 20_037_508.342_789_244).abs() < 1e-3);
    }

    #[test]
    fn test_roundtrip() {
        let (x, y) = lon_lat_to_mercator(-105.25, 39.75);
        let (lon, lat) = mercator_to_lon_lat(x, y);
        assert!((lon + 105.25).abs() < 1e-9);
        assert!((lat - 39.75).abs() < 1e-9);
    }
}
