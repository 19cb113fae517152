//! Exact Euclidean distance transform.
//!
//! Felzenszwalb & Huttenlocher's separable algorithm: a 1-D squared
//! distance pass down every column, then along every row. Both passes are
//! parallel over lines.

use rayon::prelude::*;

// Large but finite so parabola intersections stay well defined.
const FAR: f64 = 1e20;

/// Distance in pixels from every cell to the nearest `true` cell of `mask`.
///
/// Returns `None` when the mask has no `true` cell.
pub fn euclidean_distance(mask: &[bool], width: usize, height: usize) -> Option<Vec<f32>> {
    debug_assert_eq!(mask.len(), width * height);
    if !mask.iter().any(|&m| m) {
        return None;
    }

    let columns: Vec<Vec<f64>> = (0..width)
        .into_par_iter()
        .map(|col| {
            let f: Vec<f64> = (0..height)
                .map(|row| if mask[row * width + col] { 0.0 } else { FAR })
                .collect();
            squared_distance_1d(&f)
        })
        .collect();

    let mut out = vec![0.0f32; width * height];
    out.par_chunks_mut(width)
        .enumerate()
        .for_each(|(row, line)| {
            let f: Vec<f64> = columns.iter().map(|column| column[row]).collect();
            for (value, d2) in line.iter_mut().zip(squared_distance_1d(&f)) {
                *value = d2.sqrt() as f32;
            }
        });

    Some(out)
}

/// 1-D squared distance transform of a sampled function `f`.
fn squared_distance_1d(f: &[f64]) -> Vec<f64> {
    let n = f.len();
    if n == 0 {
        return Vec::new();
    }

    // Parabola vertices and the boundaries between them.
    let mut v = vec![0usize; n];
    let mut z = vec![0.0f64; n + 1];
    let mut k = 0usize;
    z[0] = f64::NEG_INFINITY;
    z[1] = f64::INFINITY;

    for q in 1..n {
        loop {
            let p = v[k];
            let s = ((f[q] + (q * q) as f64) - (f[p] + (p * p) as f64)) / (2.0 * (q - p) as f64);
            if s <= z[k] && k > 0 {
                k -= 1;
                continue;
            }
            k += 1;
            v[k] = q;
            z[k] = s;
            z[k + 1] = f64::INFINITY;
            break;
        }
    }

    let mut d = vec![0.0f64; n];
    k = 0;
    for (q, out) in d.iter_mut().enumerate() {
        while z[k + 1] < q as f64 {
            k += 1;
        }
        let p = v[k];
        let dq = q as f64 - p as f64;
        *out = dq * dq + f[p];
    }
    d
}
