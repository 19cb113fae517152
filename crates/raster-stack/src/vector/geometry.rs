//! Planar geometry helpers for burning and feature selection.
//!
//! Distances, rectangle tests and bounds go through `geo`. Plain burns
//! flatten a geometry once into points, segments and polygons so the
//! per-pixel walk stays cheap.

use geo::{
    BoundingRect, Coord, EuclideanDistance, Geometry, Intersects, LineString, Point, Polygon, Rect,
};
use stack_common::BoundingBox;

/// A geometry broken into primitive parts.
#[derive(Debug, Clone, Default)]
pub struct Flattened {
    pub points: Vec<Coord<f64>>,
    /// Segments of linear parts.
    pub segments: Vec<(Coord<f64>, Coord<f64>)>,
    pub polygons: Vec<Polygon<f64>>,
}

impl Flattened {
    pub fn new(geometry: &Geometry<f64>) -> Self {
        let mut out = Self::default();
        out.push(geometry);
        out
    }

    fn push(&mut self, geometry: &Geometry<f64>) {
        match geometry {
            Geometry::Point(p) => self.points.push(p.0),
            Geometry::MultiPoint(mp) => self.points.extend(mp.iter().map(|p| p.0)),
            Geometry::Line(l) => self.segments.push((l.start, l.end)),
            Geometry::LineString(ls) => self.push_line_string(ls),
            Geometry::MultiLineString(mls) => {
                for ls in mls.iter() {
                    self.push_line_string(ls);
                }
            }
            Geometry::Polygon(p) => self.polygons.push(p.clone()),
            Geometry::MultiPolygon(mp) => self.polygons.extend(mp.iter().cloned()),
            Geometry::Rect(r) => self.polygons.push(r.to_polygon()),
            Geometry::Triangle(t) => self.polygons.push(t.to_polygon()),
            Geometry::GeometryCollection(gc) => {
                for g in gc.iter() {
                    self.push(g);
                }
            }
        }
    }

    fn push_line_string(&mut self, ls: &LineString<f64>) {
        match ls.0.len() {
            0 => {}
            1 => self.points.push(ls.0[0]),
            _ => self
                .segments
                .extend(ls.lines().map(|line| (line.start, line.end))),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty() && self.segments.is_empty() && self.polygons.is_empty()
    }
}

/// Bounds of a geometry, `None` when it has no coordinates.
pub fn geometry_bounds(geometry: &Geometry<f64>) -> Option<BoundingBox> {
    geometry.bounding_rect().map(rect_bounds)
}

pub fn rect_bounds(rect: Rect<f64>) -> BoundingBox {
    BoundingBox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
}

pub fn bounds_rect(bounds: &BoundingBox) -> Rect<f64> {
    Rect::new(
        Coord { x: bounds.min_x, y: bounds.min_y },
        Coord { x: bounds.max_x, y: bounds.max_y },
    )
}

/// Euclidean distance from `(x, y)`; zero inside polygonal parts.
pub fn distance_to(geometry: &Geometry<f64>, x: f64, y: f64) -> f64 {
    Point::new(x, y).euclidean_distance(geometry)
}

/// Whether the geometry touches the rectangle `bounds`.
pub fn intersects_bounds(geometry: &Geometry<f64>, bounds: &BoundingBox) -> bool {
    geometry.intersects(&bounds_rect(bounds))
}
