//! Lookup of PROJ definitions for EPSG codes.

use stack_common::Crs;

/// PROJ4 string for a CRS, if the definition database knows it.
pub fn proj_string(crs: Crs) -> Option<&'static str> {
    u16::try_from(crs.epsg)
        .ok()
        .and_then(crs_definitions::from_code)
        .map(|def| def.proj4)
}

/// Whether a CRS expresses coordinates as longitude/latitude degrees.
pub fn is_geographic(crs: Crs) -> bool {
    match proj_string(crs) {
        Some(def) => def.contains("+proj=longlat"),
        // Unknown codes in the 4000 block are geographic datums.
        None => (4000..5000).contains(&crs.epsg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_definitions() {
        assert!(proj_string(Crs::WGS84).is_some());
        assert!(proj_string(Crs::from_epsg(32612)).is_some());
        assert!(proj_string(Crs::from_epsg(999_999)).is_none());
    }

    #[test]
    fn test_is_geographic() {
        assert!(is_geographic(Crs::WGS84));
        assert!(is_geographic(Crs::from_epsg(4269)));
        assert!(!is_geographic(Crs::WEB_MERCATOR));
        assert!(!is_geographic(Crs::from_epsg(32612)));
    }
}
