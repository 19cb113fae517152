//! Burning geometries into a template grid.
//!
//! Plain burns follow the usual rasterizer rules: a polygon claims the
//! pixels whose centers lie inside it; lines and points claim every pixel
//! they pass through. Buffered burns claim every pixel whose center lies
//! within `radius` of the geometry.

use geo::{BoundingRect, Contains, Coord, Geometry, Point};
use stack_common::{BoundingBox, RasterTemplate};

use super::geometry::{distance_to, geometry_bounds, rect_bounds, Flattened};

/// Visit the row-major index of every pixel claimed by `geometry`.
pub fn for_each_cell(
    template: &RasterTemplate,
    geometry: &Geometry<f64>,
    radius: f64,
    mut visit: impl FnMut(usize),
) {
    let flat = Flattened::new(geometry);
    if flat.is_empty() {
        return;
    }

    if radius > 0.0 {
        burn_buffered(template, geometry, radius, &mut visit);
        return;
    }

    burn_polygons(template, &flat, &mut visit);
    for &p in &flat.points {
        if let Some(index) = cell_at(template, p) {
            visit(index);
        }
    }
    let step = template.pixel_size().min(template.transform.resolution().1) * 0.25;
    for &(a, b) in &flat.segments {
        walk_segment(template, a, b, step, &mut visit);
    }
}

/// Binary mask of the pixels claimed by any geometry.
pub fn burn_mask<'a>(
    template: &RasterTemplate,
    geometries: impl IntoIterator<Item = &'a Geometry<f64>>,
    radius: f64,
) -> Vec<bool> {
    let mut mask = vec![false; template.len()];
    for geometry in geometries {
        for_each_cell(template, geometry, radius, |i| mask[i] = true);
    }
    mask
}

/// Burn `(geometry, value)` pairs in order; later features overwrite earlier
/// ones. Unclaimed pixels hold `fill`.
pub fn burn_values<'a>(
    template: &RasterTemplate,
    items: impl IntoIterator<Item = (&'a Geometry<f64>, f32)>,
    fill: f32,
) -> Vec<f32> {
    let mut data = vec![fill; template.len()];
    for (geometry, value) in items {
        for_each_cell(template, geometry, 0.0, |i| data[i] = value);
    }
    data
}

fn burn_buffered(
    template: &RasterTemplate,
    geometry: &Geometry<f64>,
    radius: f64,
    visit: &mut impl FnMut(usize),
) {
    let Some(bounds) = geometry_bounds(geometry) else {
        return;
    };
    let Some((c0, c1, r0, r1)) = pixel_window(template, &bounds.expand(radius)) else {
        return;
    };
    for row in r0..r1 {
        for col in c0..c1 {
            let (x, y) = template.transform.pixel_center(col, row);
            if distance_to(geometry, x, y) <= radius {
                visit(template.index(col, row));
            }
        }
    }
}

fn burn_polygons(template: &RasterTemplate, flat: &Flattened, visit: &mut impl FnMut(usize)) {
    for polygon in &flat.polygons {
        let Some(bounds) = polygon_bounds(polygon) else {
            continue;
        };
        let Some((c0, c1, r0, r1)) = pixel_window(template, &bounds) else {
            continue;
        };
        for row in r0..r1 {
            for col in c0..c1 {
                let (x, y) = template.transform.pixel_center(col, row);
                if polygon.contains(&Point::new(x, y)) {
                    visit(template.index(col, row));
                }
            }
        }
    }
}

fn walk_segment(
    template: &RasterTemplate,
    a: Coord<f64>,
    b: Coord<f64>,
    step: f64,
    visit: &mut impl FnMut(usize),
) {
    let length = ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt();
    let n = if step > 0.0 {
        (length / step).ceil().max(1.0) as usize
    } else {
        1
    };
    let mut last = None;
    for i in 0..=n {
        let t = i as f64 / n as f64;
        let p = Coord {
            x: a.x + t * (b.x - a.x),
            y: a.y + t * (b.y - a.y),
        };
        if let Some(index) = cell_at(template, p) {
            if last != Some(index) {
                visit(index);
                last = Some(index);
            }
        }
    }
}

/// Pixel containing a world coordinate, `None` outside the grid.
fn cell_at(template: &RasterTemplate, p: Coord<f64>) -> Option<usize> {
    let (fx, fy) = template.transform.world_to_pixel(p.x, p.y);
    if fx < 0.0 || fy < 0.0 {
        return None;
    }
    let (col, row) = (fx.floor() as usize, fy.floor() as usize);
    // Points on the far edge belong to the last pixel.
    let col = if fx == template.width as f64 { col.saturating_sub(1) } else { col };
    let row = if fy == template.height as f64 { row.saturating_sub(1) } else { row };
    (col < template.width && row < template.height).then(|| template.index(col, row))
}

/// Half-open pixel window `(c0, c1, r0, r1)` covering `bounds`, clipped to
/// the grid.
pub(crate) fn pixel_window(
    template: &RasterTemplate,
    bounds: &BoundingBox,
) -> Option<(usize, usize, usize, usize)> {
    let (x0, y0) = template.transform.world_to_pixel(bounds.min_x, bounds.max_y);
    let (x1, y1) = template.transform.world_to_pixel(bounds.max_x, bounds.min_y);
    let (cmin, cmax) = (x0.min(x1), x0.max(x1));
    let (rmin, rmax) = (y0.min(y1), y0.max(y1));

    let clamp = |v: f64, hi: usize| v.max(0.0).min(hi as f64) as usize;
    let c0 = clamp(cmin.floor(), template.width);
    let c1 = clamp(cmax.ceil() + 1.0, template.width);
    let r0 = clamp(rmin.floor(), template.height);
    let r1 = clamp(rmax.ceil() + 1.0, template.height);

    (c0 < c1 && r0 < r1).then_some((c0, c1, r0, r1))
}

fn polygon_bounds(polygon: &geo::Polygon<f64>) -> Option<BoundingBox> {
    polygon.bounding_rect().map(rect_bounds)
}
