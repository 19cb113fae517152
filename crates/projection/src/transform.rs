//! Point transformation between two CRSs.

use proj4rs::proj::Proj;
use stack_common::Crs;

use crate::definitions::{is_geographic, proj_string};
use crate::error::{ProjectionError, Result};
use crate::mercator;

enum Engine {
    Identity,
    WgsToMercator,
    MercatorToWgs,
    Proj {
        source: Proj,
        target: Proj,
        source_geographic: bool,
        target_geographic: bool,
    },
}

/// Transforms coordinates from one CRS into another.
///
/// Build once per CRS pair and reuse; building parses both definitions.
/// Geographic coordinates are always longitude/latitude degrees on both
/// sides of the API.
pub struct CrsTransformer {
    from: Crs,
    to: Crs,
    engine: Engine,
}

impl std::fmt::Debug for CrsTransformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrsTransformer")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish()
    }
}

impl CrsTransformer {
    /// Create a transformer from `from` to `to`.
    pub fn new(from: Crs, to: Crs) -> Result<Self> {
        let engine = if from == to {
            Engine::Identity
        } else if from == Crs::WGS84 && to == Crs::WEB_MERCATOR {
            Engine::WgsToMercator
        } else if from == Crs::WEB_MERCATOR && to == Crs::WGS84 {
            Engine::MercatorToWgs
        } else {
            Engine::Proj {
                source: load_proj(from)?,
                target: load_proj(to)?,
                source_geographic: is_geographic(from),
                target_geographic: is_geographic(to),
            }
        };

        Ok(Self { from, to, engine })
    }

    pub fn source_crs(&self) -> Crs {
        self.from
    }

    pub fn target_crs(&self) -> Crs {
        self.to
    }

    /// True when no math is needed.
    pub fn is_identity(&self) -> bool {
        matches!(self.engine, Engine::Identity)
    }

    /// Transform a single point.
    pub fn transform(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        match &self.engine {
            Engine::Identity => Ok((x, y)),
            Engine::WgsToMercator => Ok(mercator::lon_lat_to_mercator(x, y)),
            Engine::MercatorToWgs => Ok(mercator::mercator_to_lon_lat(x, y)),
            Engine::Proj {
                source,
                target,
                source_geographic,
                target_geographic,
            } => {
                // proj4rs uses radians for geographic coordinates
                let mut point = if *source_geographic {
                    (x.to_radians(), y.to_radians(), 0.0)
                } else {
                    (x, y, 0.0)
                };

                proj4rs::transform::transform(source, target, &mut point).map_err(|e| {
                    ProjectionError::TransformFailed {
                        from: self.from,
                        to: self.to,
                        x,
                        y,
                        message: format!("{e:?}"),
                    }
                })?;

                let out = if *target_geographic {
                    (point.0.to_degrees(), point.1.to_degrees())
                } else {
                    (point.0, point.1)
                };

                if out.0.is_finite() && out.1.is_finite() {
                    Ok(out)
                } else {
                    Err(ProjectionError::TransformFailed {
                        from: self.from,
                        to: self.to,
                        x,
                        y,
                        message: "non-finite result".to_string(),
                    })
                }
            }
        }
    }
}

fn load_proj(crs: Crs) -> Result<Proj> {
    let definition = proj_string(crs).ok_or(ProjectionError::UnknownCrs(crs))?;
    Proj::from_proj_string(definition).map_err(|e| ProjectionError::InvalidDefinition {
        crs,
        message: format!("{e:?}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let t = CrsTransformer::new(Crs::WGS84, Crs::WGS84).unwrap();
        assert!(t.is_identity());
        assert_eq!(t.transform(12.5, -3.0).unwrap(), (12.5, -3.0));
    }

    #[test]
    fn test_mercator_fast_path_matches_closed_form() {
        let t = CrsTransformer::new(Crs::WGS84, Crs::WEB_MERCATOR).unwrap();
        let (x, y) = t.transform(-105.0, 40.0).unwrap();
        let (ex, ey) = mercator::lon_lat_to_mercator(-105.0, 40.0);
        assert_eq!((x, y), (ex, ey));
    }

    #[test]
    fn test_utm_roundtrip() {
        let utm = Crs::from_epsg(32613);
        let forward = CrsTransformer::new(Crs::WGS84, utm).unwrap();
        let back = CrsTransformer::new(utm, Crs::WGS84).unwrap();

        // Central meridian of zone 13 is -105; easting there is the false easting.
        let (e, n) = forward.transform(-105.0, 40.0).unwrap();
        assert!((e - 500_000.0).abs() < 1e-3, "easting {e}");
        assert!(n > 4_400_000.0 && n < 4_450_000.0, "northing {n}");

        let (lon, lat) = back.transform(e, n).unwrap();
        assert!((lon + 105.0).abs() < 1e-7);
        assert!((lat - 40.0).abs() < 1e-7);
    }

    #[test]
    fn test_unknown_crs() {
        let err = CrsTransformer::new(Crs::WGS84, Crs::from_epsg(999_999)).unwrap_err();
        assert!(matches!(err, ProjectionError::UnknownCrs(_)));
    }
}
