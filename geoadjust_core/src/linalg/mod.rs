// geoadjust_core/src/linalg/mod.rs

//! Matrix primitives shared by every adjustment in this crate: normal
//! equations, the inversion cascade, weighted least squares and the
//! precision estimates derived from residuals.

use crate::types::{Matrix, Vector};

mod inverse;
mod ols;

pub use inverse::{
    robust_inverse, CholeskyInverse, InverseCascade, InverseSolver, InverseStage, LdltInverse,
    SvdInverse, SVD_RELATIVE_TOLERANCE,
};
pub use ols::weighted_ols;

/// Tolerance used when deciding whether a weight matrix is the identity.
const IDENTITY_EPSILON: f64 = 1e-12;

/// True when `p` is absent or is an identity matrix, i.e. the system is unweighted.
pub fn is_unweighted(p: Option<&Matrix>) -> bool {
    match p {
        None => true,
        Some(p) => p.is_square() && p.is_identity(IDENTITY_EPSILON),
    }
}

/// Builds the left-hand side of the normal equations: `AᵗA`, or `AᵗPA` when
/// a non-identity weight matrix is supplied.
pub fn normal_equation(a: &Matrix, p: Option<&Matrix>) -> Matrix {
    match p {
        Some(p) if !is_unweighted(Some(p)) => a.transpose() * p * a,
        _ => a.tr_mul(a),
    }
}

/// Unit-weight standard deviation `sqrt(vᵗPv / (n − t))`.
///
/// Returns `NaN` when there is no redundancy (`n ≤ t`).
pub fn rmse(residuals: &Matrix, n: usize, t: usize, p: Option<&Matrix>) -> f64 {
    if n <= t {
        return f64::NAN;
    }
    let weighted_square_sum = match p {
        Some(p) if !is_unweighted(Some(p)) => (residuals.transpose() * p * residuals)[(0, 0)],
        _ => residuals.norm_squared(),
    };
    (weighted_square_sum / (n - t) as f64).sqrt()
}

/// Propagated standard error of each unknown: `rmse · sqrt(diag(N⁻¹))`.
pub fn error_matrix(rmse: f64, normal_inverse: &Matrix) -> Vector {
    normal_inverse.diagonal().map(|q| rmse * q.sqrt())
}
