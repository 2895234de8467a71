use std::collections::HashSet;

use faer::Mat;

use crate::input::MediationInput;
use crate::utils::usize_to_f64;

/// Per-column centring and scaling applied by [`standardize_columns`].
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnScaling {
    pub means: Vec<f64>,
    /// Population standard deviations; `0` marks a constant column left unscaled.
    pub std_devs: Vec<f64>,
}

/// Centre every column to mean zero and scale it to unit population variance.
///
/// Constant columns (standard deviation at or below `tolerance`) are centred
/// but not scaled, so the result never contains non-finite values.
#[must_use]
pub fn standardize_columns(x: &Mat<f64>, tolerance: f64) -> (Mat<f64>, ColumnScaling) {
    let nrows = x.nrows();
    let n = usize_to_f64(nrows.max(1));
    let mut means = Vec::with_capacity(x.ncols());
    let mut std_devs = Vec::with_capacity(x.ncols());

    for col in 0..x.ncols() {
        let mean = (0..nrows).map(|row| x[(row, col)]).sum::<f64>() / n;
        let variance = (0..nrows)
            .map(|row| {
                let centered = x[(row, col)] - mean;
                centered * centered
            })
            .sum::<f64>()
            / n;
        let std_dev = variance.sqrt();
        means.push(mean);
        std_devs.push(if std_dev > tolerance.abs() { std_dev } else { 0.0 });
    }

    let standardized = Mat::from_fn(nrows, x.ncols(), |row, col| {
        let centered = x[(row, col)] - means[col];
        if std_devs[col] > 0.0 {
            centered / std_devs[col]
        } else {
            centered
        }
    });

    (standardized, ColumnScaling { means, std_devs })
}

/// Standardize outcome, exposure, and mediators in place; covariates are left untouched.
pub fn standardize_input(input: &mut MediationInput, tolerance: f64) {
    input.outcome = standardize_columns(&input.outcome, tolerance).0;
    input.exposure = standardize_columns(&input.exposure, tolerance).0;
    input.mediators = standardize_columns(&input.mediators, tolerance).0;
}

#[must_use]
pub fn column_has_variation(x: &Mat<f64>, column: usize, tolerance: f64) -> bool {
    if column >= x.ncols() || x.nrows() < 2 {
        return false;
    }
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for row in 0..x.nrows() {
        let value = x[(row, column)];
        min = min.min(value);
        max = max.max(value);
    }
    (max - min).abs() > tolerance.abs()
}

/// Indices of columns whose squared norm is at or below `tolerance`.
#[must_use]
pub fn zero_norm_columns(x: &Mat<f64>, tolerance: f64) -> Vec<usize> {
    (0..x.ncols())
        .filter(|&col| {
            let norm = (0..x.nrows()).map(|row| x[(row, col)] * x[(row, col)]).sum::<f64>();
            norm <= tolerance.abs()
        })
        .collect()
}

#[must_use]
fn nonconstant_column_indices(x: &Mat<f64>, tolerance: f64, always_keep: &[usize]) -> Vec<usize> {
    let forced = always_keep
        .iter()
        .copied()
        .filter(|idx| *idx < x.ncols())
        .collect::<HashSet<_>>();
    (0..x.ncols())
        .filter(|&col| forced.contains(&col) || column_has_variation(x, col, tolerance))
        .collect()
}

#[must_use]
fn select_columns(x: &Mat<f64>, columns: &[usize]) -> Mat<f64> {
    Mat::from_fn(x.nrows(), columns.len(), |row, col| x[(row, columns[col])])
}

/// Drop constant mediator or covariate columns, keeping the listed indices regardless.
#[must_use]
pub fn drop_constant_columns(
    x: &Mat<f64>,
    tolerance: f64,
    always_keep: &[usize],
) -> (Mat<f64>, Vec<usize>) {
    let kept_columns = nonconstant_column_indices(x, tolerance, always_keep);
    (select_columns(x, &kept_columns), kept_columns)
}
