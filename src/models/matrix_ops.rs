use faer::Mat;

/// Squared Euclidean norm of every column.
#[must_use]
pub fn squared_column_norms(matrix: &Mat<f64>) -> Vec<f64> {
    (0..matrix.ncols())
        .map(|col| {
            (0..matrix.nrows())
                .map(|row| matrix[(row, col)] * matrix[(row, col)])
                .sum()
        })
        .collect()
}

/// Column vector `n x 1` holding `values`.
#[must_use]
pub fn vec_to_column(values: &[f64]) -> Mat<f64> {
    Mat::from_fn(values.len(), 1, |row, _| values[row])
}

/// Row vector `1 x q` holding `values`.
#[must_use]
pub fn vec_to_row(values: &[f64]) -> Mat<f64> {
    Mat::from_fn(1, values.len(), |_, col| values[col])
}

/// `target[:, target_col] += scale * source[:, source_col]`.
pub fn axpy_column(
    target: &mut Mat<f64>,
    target_col: usize,
    scale: f64,
    source: &Mat<f64>,
    source_col: usize,
) {
    debug_assert_eq!(target.nrows(), source.nrows());
    if scale == 0.0 {
        return;
    }
    for row in 0..target.nrows() {
        target[(row, target_col)] += scale * source[(row, source_col)];
    }
}

/// `sum_i x[i, col] * (residual[i, residual_col] + coefficient * x[i, col])`.
///
/// The inner term is the residual with this column's own contribution added back.
#[must_use]
pub fn partial_residual_dot(
    design: &Mat<f64>,
    col: usize,
    residual: &Mat<f64>,
    residual_col: usize,
    coefficient: f64,
) -> f64 {
    debug_assert_eq!(design.nrows(), residual.nrows());
    let mut sum = 0.0;
    for row in 0..design.nrows() {
        let x = design[(row, col)];
        sum += x * coefficient.mul_add(x, residual[(row, residual_col)]);
    }
    sum
}

/// Sum of squares over every entry.
#[must_use]
pub fn sum_of_squares(matrix: &Mat<f64>) -> f64 {
    let mut total = 0.0;
    for col in 0..matrix.ncols() {
        for row in 0..matrix.nrows() {
            total += matrix[(row, col)] * matrix[(row, col)];
        }
    }
    total
}
