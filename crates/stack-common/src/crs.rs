//! Coordinate Reference System identifiers.
//!
//! A [`Crs`] is only an identity (an EPSG code). The `projection` crate
//! owns the definitions and the math.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A coordinate reference system identified by its EPSG code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Crs {
    pub epsg: u32,
}

impl Crs {
    /// WGS84 geographic (lon/lat in degrees).
    pub const WGS84: Crs = Crs { epsg: 4326 };
    /// Web Mercator (meters).
    pub const WEB_MERCATOR: Crs = Crs { epsg: 3857 };

    pub fn from_epsg(epsg: u32) -> Self {
        Self { epsg }
    }

    /// Parse a CRS string.
    ///
    /// Accepts formats like:
    /// - "EPSG:4326"
    /// - "epsg:32612"
    /// - "urn:ogc:def:crs:EPSG::4326"
    /// - "OGC:CRS84" / "CRS:84" (same as EPSG:4326)
    /// - "4326"
    pub fn parse(s: &str) -> Result<Self, CrsParseError> {
        let normalized = s.trim().to_uppercase();

        if matches!(
            normalized.as_str(),
            "CRS:84" | "OGC:CRS84" | "URN:OGC:DEF:CRS:OGC:1.3:CRS84"
        ) {
            return Ok(Self::WGS84);
        }

        let code = normalized
            .rsplit(':')
            .next()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| CrsParseError::UnsupportedCrs(s.to_string()))?;

        if !(normalized == code || normalized.contains("EPSG")) {
            return Err(CrsParseError::UnsupportedCrs(s.to_string()));
        }

        code.parse::<u32>()
            .map(Self::from_epsg)
            .map_err(|_| CrsParseError::UnsupportedCrs(s.to_string()))
    }
}

impl FromStr for Crs {
    type Err = CrsParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CrsParseError {
    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),
}
