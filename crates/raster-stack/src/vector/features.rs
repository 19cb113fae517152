//! Vector feature sets read from GeoJSON.

use std::path::Path;

use geo::{Geometry, MapCoords};
use geojson::{GeoJson, JsonObject, JsonValue};
use projection::CrsTransformer;
use stack_common::{BoundingBox, Crs};
use tracing::debug;

use super::geometry::geometry_bounds;
use crate::error::{Result, StackError};

/// One geometry with its attribute record.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorFeature {
    pub geometry: Geometry<f64>,
    pub properties: JsonObject,
}

impl VectorFeature {
    pub fn new(geometry: impl Into<Geometry<f64>>) -> Self {
        Self {
            geometry: geometry.into(),
            properties: JsonObject::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Bounding box, `None` for empty geometries.
    pub fn bounds(&self) -> Option<BoundingBox> {
        geometry_bounds(&self.geometry)
    }
}

/// Geometries in one CRS plus their attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    pub crs: Crs,
    pub features: Vec<VectorFeature>,
}

impl FeatureSet {
    pub fn new(crs: Crs, features: Vec<VectorFeature>) -> Self {
        Self { crs, features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Load a GeoJSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_geojson_str(&text)
    }

    /// Parse a FeatureCollection, a single Feature or a bare Geometry.
    ///
    /// The CRS comes from the legacy `crs` member when present, otherwise
    /// GeoJSON's default of WGS84. Features without geometry are skipped.
    pub fn from_geojson_str(text: &str) -> Result<Self> {
        let geojson: GeoJson = text
            .parse()
            .map_err(|e: geojson::Error| StackError::vector(e.to_string()))?;

        let (crs, raw) = match geojson {
            GeoJson::FeatureCollection(fc) => {
                let crs = legacy_crs(fc.foreign_members.as_ref())?;
                let raw = fc
                    .features
                    .into_iter()
                    .map(|f| (f.geometry, f.properties.unwrap_or_default()))
                    .collect::<Vec<_>>();
                (crs, raw)
            }
            GeoJson::Feature(f) => {
                let crs = legacy_crs(f.foreign_members.as_ref())?;
                (crs, vec![(f.geometry, f.properties.unwrap_or_default())])
            }
            GeoJson::Geometry(g) => {
                let crs = legacy_crs(g.foreign_members.as_ref())?;
                (crs, vec![(Some(g), JsonObject::new())])
            }
        };

        let total = raw.len();
        let mut features = Vec::with_capacity(total);
        for (geometry, properties) in raw {
            let Some(geometry) = geometry else {
                continue;
            };
            let geometry = Geometry::<f64>::try_from(geometry)
                .map_err(|e| StackError::vector(e.to_string()))?;
            features.push(VectorFeature {
                geometry,
                properties,
            });
        }
        if features.len() < total {
            debug!(skipped = total - features.len(), "Skipped features without geometry");
        }

        Ok(Self::new(crs, features))
    }

    /// Reproject every geometry into `to`.
    pub fn reproject(&self, to: Crs) -> Result<Self> {
        if self.crs == to {
            return Ok(self.clone());
        }
        let transformer = CrsTransformer::new(self.crs, to)?;
        let features = self
            .features
            .iter()
            .map(|f| {
                let geometry = f.geometry.try_map_coords(|c| {
                    transformer
                        .transform(c.x, c.y)
                        .map(|(x, y)| geo::Coord { x, y })
                })?;
                Ok(VectorFeature {
                    geometry,
                    properties: f.properties.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        debug!(from = %self.crs, to = %to, count = features.len(), "Reprojected features");
        Ok(Self::new(to, features))
    }

    /// Union of all feature bounds.
    pub fn bounds(&self) -> Option<BoundingBox> {
        self.features
            .iter()
            .filter_map(VectorFeature::bounds)
            .reduce(|a, b| a.union(&b))
    }

    /// A new set holding the features at `indices`, in that order.
    pub fn subset(&self, indices: &[usize]) -> Self {
        Self::new(
            self.crs,
            indices
                .iter()
                .filter_map(|&i| self.features.get(i).cloned())
                .collect(),
        )
    }

    /// Numeric value of `field` per feature.
    ///
    /// Numbers pass through and numeric strings are parsed. Everything else
    /// (missing, null, booleans, text) is `None`.
    pub fn numeric_attribute(&self, field: &str) -> Vec<Option<f64>> {
        self.features
            .iter()
            .map(|f| match f.properties.get(field) {
                Some(JsonValue::Number(n)) => n.as_f64(),
                Some(JsonValue::String(s)) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
                _ => None,
            })
            .collect()
    }
}

fn legacy_crs(members: Option<&JsonObject>) -> Result<Crs> {
    let name = members
        .and_then(|m| m.get("crs"))
        .and_then(|crs| crs.get("properties"))
        .and_then(|props| props.get("name"))
        .and_then(JsonValue::as_str);

    match name {
        Some(name) => Crs::parse(name).map_err(|e| StackError::vector(e.to_string())),
        None => Ok(Crs::WGS84),
    }
}
