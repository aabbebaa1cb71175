// geoadjust_core/src/linalg/ols.rs

use crate::error::{AdjustError, Result};
use crate::linalg::{is_unweighted, normal_equation, InverseSolver, SVD_RELATIVE_TOLERANCE};
use crate::types::Matrix;

/// Solves the (weighted) least-squares problem `A·x ≈ L`.
///
/// Unweighted systems (`p` absent or identity) are solved directly from a
/// QR factorization of `A`, without forming an explicit inverse. Weighted
/// systems go through the normal equations, `x = inverse(AᵗPA) · AᵗPL`,
/// using the supplied inversion strategy.
pub fn weighted_ols(
    a: &Matrix,
    l: &Matrix,
    p: Option<&Matrix>,
    inverse: &dyn InverseSolver,
) -> Result<Matrix> {
    if l.nrows() != a.nrows() {
        return Err(AdjustError::ShapeMismatch {
            context: "observation vector",
            expected: (a.nrows(), l.ncols()),
            actual: l.shape(),
        });
    }
    if let Some(p) = p {
        if p.shape() != (a.nrows(), a.nrows()) {
            return Err(AdjustError::ShapeMismatch {
                context: "weight matrix",
                expected: (a.nrows(), a.nrows()),
                actual: p.shape(),
            });
        }
    }

    let Some(p) = p.filter(|p| !is_unweighted(Some(*p))) else {
        return Ok(least_squares_direct(a, l));
    };

    let normal_inverse = inverse.invert(&normal_equation(a, Some(p)));
    Ok(normal_inverse * (a.transpose() * p * l))
}

/// Householder QR least squares, falling back to an SVD solve when `A` is
/// wide or numerically rank deficient.
fn least_squares_direct(a: &Matrix, l: &Matrix) -> Matrix {
    let (rows, cols) = a.shape();
    if cols == 0 || rows == 0 {
        return Matrix::zeros(cols, l.ncols());
    }
    // Factorizing non-finite input is meaningless; let the NaNs through.
    if a.iter().chain(l.iter()).any(|v| !v.is_finite()) {
        return Matrix::from_element(cols, l.ncols(), f64::NAN);
    }

    if rows >= cols {
        let qr = a.clone().qr();
        let r = qr.r();
        let r_diag = r.diagonal();
        let floor = r_diag.amax() * rows as f64 * f64::EPSILON;
        if r_diag.iter().all(|d| d.abs() > floor) {
            let qt_l = qr.q().tr_mul(l);
            if let Some(x) = r.solve_upper_triangular(&qt_l) {
                return x;
            }
        }
        tracing::debug!("QR least squares is rank deficient, using SVD");
    }

    let svd = a.clone().svd(true, true);
    let tolerance =
        svd.singular_values.max() * rows.max(cols) as f64 * SVD_RELATIVE_TOLERANCE;
    svd.solve(l, tolerance)
        .unwrap_or_else(|_| Matrix::zeros(cols, l.ncols()))
}
