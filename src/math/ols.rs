//! Weighted least squares solver.
//!
//! The GLM fitter solves one weighted least squares problem per IRLS step:
//!
//! ```text
//! minimize Σ w_i (z_i - x_i^T β)^2
//! ```
//!
//! Rows are scaled by `sqrt(w_i)` and the resulting ordinary least squares
//! problem is solved through an SVD, which copes with tall design matrices and
//! with nearly collinear columns (e.g. `age` and `age²`).

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Solve `min Σ w_i (y_i - x_i^T β)^2` by row scaling.
///
/// Rows with non-positive weight contribute nothing.
pub fn solve_weighted_least_squares(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    w: &DVector<f64>,
) -> Option<DVector<f64>> {
    if x.nrows() != y.len() || y.len() != w.len() {
        return None;
    }

    let mut xs = x.clone();
    let mut ys = y.clone();
    for i in 0..x.nrows() {
        let s = w[i].max(0.0).sqrt();
        for j in 0..x.ncols() {
            xs[(i, j)] *= s;
        }
        ys[i] *= s;
    }

    solve_least_squares(&xs, &ys)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn zero_weight_rows_are_ignored() {
        // The last row is an outlier but carries no weight.
        let x = DMatrix::from_row_slice(4, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0, 1.0, 3.0]);
        let y = DVector::from_row_slice(&[1.0, 2.0, 3.0, 100.0]);
        let w = DVector::from_row_slice(&[1.0, 1.0, 1.0, 0.0]);

        let beta = solve_weighted_least_squares(&x, &y, &w).unwrap();
        assert!((beta[0] - 1.0).abs() < 1e-9);
        assert!((beta[1] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let x = DMatrix::from_row_slice(2, 1, &[1.0, 1.0]);
        let y = DVector::from_row_slice(&[1.0, 2.0]);
        let w = DVector::from_row_slice(&[1.0]);
        assert!(solve_weighted_least_squares(&x, &y, &w).is_none());
    }
}
