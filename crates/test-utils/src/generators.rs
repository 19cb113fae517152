//! Test data generators for synthetic raster bands.
//!
//! These generators create predictable, verifiable patterns in row-major
//! order (row 0 first, then row 1, etc.).

/// Creates a test grid with predictable values.
///
/// Each cell value is calculated as: `col * 1000 + row`
///
/// # Example
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50);
/// assert_eq!(grid[1], 1000.0); // col=1, row=0
/// assert_eq!(grid[10], 1.0);   // col=0, row=1
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f32);
        }
    }
    data
}

/// Every cell set to `value`.
pub fn create_constant_grid(width: usize, height: usize, value: f32) -> Vec<f32> {
    vec![value; width * height]
}

/// Binary mask: 1 inside the `[c0, c1) x [r0, r1)` window, `outside`
/// elsewhere.
pub fn create_window_mask(
    width: usize,
    height: usize,
    cols: (usize, usize),
    rows: (usize, usize),
    outside: f32,
) -> Vec<f32> {
    let mut data = vec![outside; width * height];
    for row in rows.0..rows.1.min(height) {
        for col in cols.0..cols.1.min(width) {
            data[row * width + col] = 1.0;
        }
    }
    data
}
