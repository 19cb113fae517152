//! Shared test utilities for the band-stack workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Grid data generators
//! - Template and raster fixtures written to scratch directories
//! - Approximate equality macros
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{assert_approx_eq, fixtures, write_test_raster};
//! ```

pub mod fixtures;
pub mod generators;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f32, 1.0_f32, 0.001_f32);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Assert that every listed offset of a band holds the nodata sentinel.
///
/// ```ignore
/// assert_nodata_at!(band, f32::MIN, [0, 5, 9]);
/// ```
#[macro_export]
macro_rules! assert_nodata_at {
    ($band:expr, $nodata:expr, [$($offset:expr),* $(,)?]) => {{
        let band: &[f32] = &$band;
        $(
            let v = band[$offset];
            if !(v.is_nan() || v == $nodata) {
                panic!("expected nodata at offset {}, found {}", $offset, v);
            }
        )*
    }};
}
