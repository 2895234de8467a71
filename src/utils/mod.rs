//! # Utilities
//!
//! Small numeric helpers shared by the input, preprocessing, and sampler
//! modules.

use faer::Mat;

/// Lossy `usize -> f64` conversion saturating at `u32::MAX`.
#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    f64::from(u32::try_from(value).unwrap_or(u32::MAX))
}

#[must_use]
pub fn matrix_is_finite(matrix: &Mat<f64>) -> bool {
    for j in 0..matrix.ncols() {
        for i in 0..matrix.nrows() {
            if !matrix[(i, j)].is_finite() {
                return false;
            }
        }
    }
    true
}

/// Largest absolute element-wise difference between two equally shaped matrices.
#[must_use]
pub fn max_abs_diff(a: &Mat<f64>, b: &Mat<f64>) -> f64 {
    debug_assert_eq!(a.nrows(), b.nrows());
    debug_assert_eq!(a.ncols(), b.ncols());
    let mut max = 0.0;
    for j in 0..a.ncols() {
        for i in 0..a.nrows() {
            let diff = (a[(i, j)] - b[(i, j)]).abs();
            if diff > max {
                max = diff;
            }
        }
    }
    max
}

/// Largest absolute element of a matrix, or `0` when empty.
#[must_use]
pub fn max_abs(matrix: &Mat<f64>) -> f64 {
    let mut max = 0.0;
    for j in 0..matrix.ncols() {
        for i in 0..matrix.nrows() {
            max = f64::max(max, matrix[(i, j)].abs());
        }
    }
    max
}
