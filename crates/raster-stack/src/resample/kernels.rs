//! Interpolation kernels for grid resampling.
//!
//! Positions are in source *index space*: `(0.0, 0.0)` is the center of the
//! first pixel. Nodata and NaN samples never contribute; weighted kernels
//! renormalize over the samples that remain.

/// A read-only view of one source band.
#[derive(Debug, Clone, Copy)]
pub struct SourceBand<'a> {
    pub data: &'a [f32],
    pub width: usize,
    pub height: usize,
    pub nodata: f32,
}

impl<'a> SourceBand<'a> {
    pub fn new(data: &'a [f32], width: usize, height: usize, nodata: f32) -> Self {
        Self {
            data,
            width,
            height,
            nodata,
        }
    }

    /// Valid value at `(col, row)`, `None` outside the grid or on nodata.
    #[inline]
    pub fn get(&self, col: isize, row: isize) -> Option<f32> {
        if col < 0 || row < 0 || col as usize >= self.width || row as usize >= self.height {
            return None;
        }
        let value = self.data[row as usize * self.width + col as usize];
        if value.is_nan() || value == self.nodata {
            None
        } else {
            Some(value)
        }
    }
}

/// Nearest neighbor interpolation.
///
/// Returns the value of the pixel containing the position.
pub fn nearest(band: &SourceBand, x: f64, y: f64) -> Option<f32> {
    band.get((x + 0.5).floor() as isize, (y + 0.5).floor() as isize)
}

/// Bilinear interpolation.
///
/// Smoothly interpolates between the four nearest pixels. `scale` widens
/// the tent when the destination pixel covers several source pixels.
pub fn bilinear(band: &SourceBand, x: f64, y: f64, scale: (f64, f64)) -> Option<f32> {
    convolve(band, x, y, 1.0, scale, triangle)
}

/// Bicubic interpolation.
///
/// Uses 16 surrounding pixels. With a complete neighborhood at native scale
/// this is the separable Catmull-Rom spline; otherwise the same kernel is
/// applied with renormalized weights.
pub fn cubic(band: &SourceBand, x: f64, y: f64, scale: (f64, f64)) -> Option<f32> {
    if scale == (1.0, 1.0) {
        if let Some(value) = catmull_rom_4x4(band, x, y) {
            return Some(value);
        }
    }
    convolve(band, x, y, 2.0, scale, keys_cubic)
}

/// Cubic B-spline approximation. Smoother than `cubic`, does not overshoot.
pub fn cubic_spline(band: &SourceBand, x: f64, y: f64, scale: (f64, f64)) -> Option<f32> {
    convolve(band, x, y, 2.0, scale, b_spline)
}

/// Lanczos windowed sinc with three lobes.
pub fn lanczos(band: &SourceBand, x: f64, y: f64, scale: (f64, f64)) -> Option<f32> {
    convolve(band, x, y, LANCZOS_A, scale, lanczos3)
}

/// Gaussian weighted mean (sigma = half a pixel at native scale).
pub fn gauss(band: &SourceBand, x: f64, y: f64, scale: (f64, f64)) -> Option<f32> {
    convolve(band, x, y, 1.5, scale, gaussian)
}

/// Mean of the valid pixels whose centers fall in the destination footprint.
pub fn average(band: &SourceBand, x: f64, y: f64, scale: (f64, f64)) -> Option<f32> {
    let mut sum = 0.0f64;
    let mut count = 0usize;
    for_each_in_window(band, x, y, scale, |v| {
        sum += v as f64;
        count += 1;
    });
    if count == 0 {
        nearest(band, x, y)
    } else {
        Some((sum / count as f64) as f32)
    }
}

/// Most frequent valid value in the destination footprint.
///
/// Ties resolve to the smallest value.
pub fn mode(band: &SourceBand, x: f64, y: f64, scale: (f64, f64)) -> Option<f32> {
    let mut values = Vec::new();
    for_each_in_window(band, x, y, scale, |v| values.push(v));
    if values.is_empty() {
        return nearest(band, x, y);
    }
    values.sort_by(|a, b| a.total_cmp(b));

    let mut best = values[0];
    let mut best_count = 0usize;
    let mut i = 0;
    while i < values.len() {
        let run = values[i..].iter().take_while(|&&v| v == values[i]).count();
        if run > best_count {
            best = values[i];
            best_count = run;
        }
        i += run;
    }
    Some(best)
}

/// Pixels whose centers lie in `[x ± scale/2] × [y ± scale/2]`.
fn for_each_in_window(
    band: &SourceBand,
    x: f64,
    y: f64,
    scale: (f64, f64),
    mut visit: impl FnMut(f32),
) {
    let (hx, hy) = (scale.0.max(1.0) * 0.5, scale.1.max(1.0) * 0.5);
    let (c0, c1) = ((x - hx).ceil() as isize, (x + hx).floor() as isize);
    let (r0, r1) = ((y - hy).ceil() as isize, (y + hy).floor() as isize);
    for row in r0..=r1 {
        for col in c0..=c1 {
            if let Some(v) = band.get(col, row) {
                visit(v);
            }
        }
    }
}

/// Separable kernel convolution over valid samples.
///
/// `radius` is the kernel support at native scale; both support and kernel
/// argument are stretched by the per-axis `scale` (never below 1).
fn convolve(
    band: &SourceBand,
    x: f64,
    y: f64,
    radius: f64,
    scale: (f64, f64),
    kernel: fn(f64) -> f64,
) -> Option<f32> {
    let (sx, sy) = (scale.0.max(1.0), scale.1.max(1.0));
    let (rx, ry) = (radius * sx, radius * sy);

    let c0 = (x - rx).ceil() as isize;
    let c1 = (x + rx).floor() as isize;
    let r0 = (y - ry).ceil() as isize;
    let r1 = (y + ry).floor() as isize;

    let mut sum = 0.0f64;
    let mut weight_sum = 0.0f64;
    for row in r0..=r1 {
        let wy = kernel((row as f64 - y) / sy);
        if wy == 0.0 {
            continue;
        }
        for col in c0..=c1 {
            let wx = kernel((col as f64 - x) / sx);
            if wx == 0.0 {
                continue;
            }
            if let Some(v) = band.get(col, row) {
                let w = wx * wy;
                sum += w * v as f64;
                weight_sum += w;
            }
        }
    }

    if weight_sum.abs() < 1e-12 {
        // Only negative-lobe or zero-weight samples survived.
        return nearest(band, x, y);
    }
    Some((sum / weight_sum) as f32)
}

fn catmull_rom_4x4(band: &SourceBand, x: f64, y: f64) -> Option<f32> {
    let xi = x.floor() as isize;
    let yi = y.floor() as isize;

    let xf = (x - xi as f64) as f32;
    let yf = (y - yi as f64) as f32;

    // Sample 4x4 grid of points
    let mut values = [[0.0f32; 4]; 4];
    for (j, row) in values.iter_mut().enumerate() {
        for (i, value) in row.iter_mut().enumerate() {
            *value = band.get(xi + i as isize - 1, yi + j as isize - 1)?;
        }
    }

    // Cubic interpolation along x for each row
    let mut row_values = [0.0f32; 4];
    for (j, row) in values.iter().enumerate() {
        row_values[j] = cubic_1d(row[0], row[1], row[2], row[3], xf);
    }

    // Cubic interpolation along y
    Some(cubic_1d(
        row_values[0],
        row_values[1],
        row_values[2],
        row_values[3],
        yf,
    ))
}

/// 1D cubic interpolation using Catmull-Rom spline.
fn cubic_1d(p0: f32, p1: f32, p2: f32, p3: f32, t: f32) -> f32 {
    let t2 = t * t;
    let t3 = t2 * t;

    // Catmull-Rom coefficients
    let a = -0.5 * p0 + 1.5 * p1 - 1.5 * p2 + 0.5 * p3;
    let b = p0 - 2.5 * p1 + 2.0 * p2 - 0.5 * p3;
    let c = -0.5 * p0 + 0.5 * p2;
    let d = p1;

    a * t3 + b * t2 + c * t + d
}

fn triangle(t: f64) -> f64 {
    (1.0 - t.abs()).max(0.0)
}

/// Keys cubic with a = -0.5 (the Catmull-Rom kernel).
fn keys_cubic(t: f64) -> f64 {
    let t = t.abs();
    if t < 1.0 {
        1.5 * t * t * t - 2.5 * t * t + 1.0
    } else if t < 2.0 {
        -0.5 * t * t * t + 2.5 * t * t - 4.0 * t + 2.0
    } else {
        0.0
    }
}

fn b_spline(t: f64) -> f64 {
    let t = t.abs();
    if t < 1.0 {
        (4.0 - 6.0 * t * t + 3.0 * t * t * t) / 6.0
    } else if t < 2.0 {
        let u = 2.0 - t;
        u * u * u / 6.0
    } else {
        0.0
    }
}

const LANCZOS_A: f64 = 3.0;

fn lanczos3(t: f64) -> f64 {
    if t.abs() >= LANCZOS_A {
        0.0
    } else {
        sinc(t) * sinc(t / LANCZOS_A)
    }
}

fn sinc(t: f64) -> f64 {
    if t.abs() < 1e-12 {
        1.0
    } else {
        let pt = std::f64::consts::PI * t;
        pt.sin() / pt
    }
}

fn gaussian(t: f64) -> f64 {
    if t.abs() > 1.5 {
        0.0
    } else {
        (-2.0 * t * t).exp()
    }
}
