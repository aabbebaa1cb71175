// geoadjust_core/src/linalg/inverse.rs

use dyn_clone::DynClone;
use nalgebra::Cholesky;
use std::fmt::Debug;

use crate::types::{Matrix, Vector};

/// Relative cutoff applied to singular values by the SVD stage.
pub const SVD_RELATIVE_TOLERANCE: f64 = 1e-12;

// --- INVERSION STAGE TRAIT ---
/// One step of the inversion cascade. A stage either produces an inverse or
/// reports that it cannot handle the matrix, in which case the next stage runs.
pub trait InverseStage: DynClone + Debug + Send + Sync {
    /// Short name used in log output.
    fn name(&self) -> &'static str;

    /// Attempts to invert `m`. Returns `None` on numerical failure.
    fn try_invert(&self, m: &Matrix) -> Option<Matrix>;
}

// This macro automatically generates the implementation of `Clone` for `Box<dyn InverseStage>`.
dyn_clone::clone_trait_object!(InverseStage);

// --- INVERSE SOLVER TRAIT ---
/// Anything that always turns a square matrix into a (pseudo-)inverse.
///
/// Plain functions and closures with the signature `Fn(&Matrix) -> Matrix`
/// qualify, so callers can swap the inversion used by the solvers.
pub trait InverseSolver {
    fn invert(&self, m: &Matrix) -> Matrix;
}

impl<F> InverseSolver for F
where
    F: Fn(&Matrix) -> Matrix,
{
    fn invert(&self, m: &Matrix) -> Matrix {
        self(m)
    }
}

/// Cholesky factorization. Cheapest stage; requires a positive-definite matrix.
#[derive(Debug, Clone, Copy, Default)]
pub struct CholeskyInverse;

impl InverseStage for CholeskyInverse {
    fn name(&self) -> &'static str {
        "cholesky"
    }

    fn try_invert(&self, m: &Matrix) -> Option<Matrix> {
        if !m.is_square() {
            return None;
        }
        Cholesky::new(m.clone()).map(|chol| chol.inverse())
    }
}

/// Symmetric indefinite LDLᵀ factorization with symmetric diagonal pivoting.
///
/// Accepts matrices with negative pivots, but gives up when a pivot falls
/// below `relative_pivot_tolerance` times the largest diagonal magnitude.
#[derive(Debug, Clone, Copy)]
pub struct LdltInverse {
    pub relative_pivot_tolerance: f64,
}

impl Default for LdltInverse {
    fn default() -> Self {
        Self {
            relative_pivot_tolerance: 1e-13,
        }
    }
}

impl InverseStage for LdltInverse {
    fn name(&self) -> &'static str {
        "ldlt"
    }

    fn try_invert(&self, m: &Matrix) -> Option<Matrix> {
        let n = m.nrows();
        if n == 0 || !m.is_square() {
            return None;
        }

        let scale = m.diagonal().amax();
        if !scale.is_finite() || scale == 0.0 {
            return None;
        }
        let floor = scale * self.relative_pivot_tolerance * n as f64;

        // Right-looking factorization of P·M·Pᵀ = L·D·Lᵀ, working on a copy.
        let mut work = m.clone();
        let mut lower = Matrix::identity(n, n);
        let mut diag = Vector::zeros(n);
        let mut perm: Vec<usize> = (0..n).collect();

        for k in 0..n {
            let pivot_row = (k..n).max_by(|&i, &j| {
                work[(i, i)].abs().total_cmp(&work[(j, j)].abs())
            })?;
            if pivot_row != k {
                work.swap_rows(k, pivot_row);
                work.swap_columns(k, pivot_row);
                perm.swap(k, pivot_row);
                for c in 0..k {
                    lower.swap((k, c), (pivot_row, c));
                }
            }

            let d = work[(k, k)];
            if !d.is_finite() || d.abs() <= floor {
                return None;
            }
            diag[k] = d;

            for i in (k + 1)..n {
                lower[(i, k)] = work[(i, k)] / d;
            }
            for i in (k + 1)..n {
                for j in (k + 1)..n {
                    work[(i, j)] -= lower[(i, k)] * d * lower[(j, k)];
                }
            }
        }

        // (P·M·Pᵀ)⁻¹ = L⁻ᵀ·D⁻¹·L⁻¹, then undo the permutation.
        let lower_inv = lower.solve_lower_triangular(&Matrix::identity(n, n))?;
        let d_inv = Matrix::from_diagonal(&diag.map(|d| 1.0 / d));
        let permuted = lower_inv.transpose() * d_inv * lower_inv;

        let mut inverse = Matrix::zeros(n, n);
        for i in 0..n {
            for j in 0..n {
                inverse[(perm[i], perm[j])] = permuted[(i, j)];
            }
        }
        Some(inverse)
    }
}

/// Singular value decomposition pseudo-inverse. Singular values at or below
/// `σ_max · max(rows, cols) · relative_tolerance` are treated as zero.
#[derive(Debug, Clone, Copy)]
pub struct SvdInverse {
    pub relative_tolerance: f64,
}

impl Default for SvdInverse {
    fn default() -> Self {
        Self {
            relative_tolerance: SVD_RELATIVE_TOLERANCE,
        }
    }
}

impl InverseStage for SvdInverse {
    fn name(&self) -> &'static str {
        "svd"
    }

    fn try_invert(&self, m: &Matrix) -> Option<Matrix> {
        if m.is_empty() || m.iter().any(|v| !v.is_finite()) {
            return None;
        }
        let svd = m.clone().svd(true, true);
        let sigma_max = svd.singular_values.max();
        let tolerance = sigma_max * m.nrows().max(m.ncols()) as f64 * self.relative_tolerance;
        svd.pseudo_inverse(tolerance).ok()
    }
}

/// Ordered list of inversion stages, each tried only when the previous one failed.
#[derive(Debug, Clone)]
pub struct InverseCascade {
    stages: Vec<Box<dyn InverseStage>>,
}

impl Default for InverseCascade {
    /// Cholesky, then LDLᵀ, then SVD.
    fn default() -> Self {
        Self::new(vec![
            Box::new(CholeskyInverse),
            Box::new(LdltInverse::default()),
            Box::new(SvdInverse::default()),
        ])
    }
}

impl InverseCascade {
    pub fn new(stages: Vec<Box<dyn InverseStage>>) -> Self {
        Self { stages }
    }

    pub fn stages(&self) -> &[Box<dyn InverseStage>] {
        &self.stages
    }

    /// Runs the cascade and also reports which stage produced the result.
    /// `None` as the stage name means every stage failed and a zero matrix
    /// of the transposed shape was returned.
    pub fn invert_traced(&self, m: &Matrix) -> (Matrix, Option<&'static str>) {
        for stage in &self.stages {
            if let Some(inverse) = stage.try_invert(m) {
                tracing::debug!(
                    "{}x{} matrix inverted by the {} stage",
                    m.nrows(),
                    m.ncols(),
                    stage.name()
                );
                return (inverse, Some(stage.name()));
            }
            tracing::debug!("{} stage failed, falling through", stage.name());
        }

        tracing::warn!(
            "every inversion stage failed on a {}x{} matrix, using a zero matrix",
            m.nrows(),
            m.ncols()
        );
        (Matrix::zeros(m.ncols(), m.nrows()), None)
    }
}

impl InverseSolver for InverseCascade {
    fn invert(&self, m: &Matrix) -> Matrix {
        self.invert_traced(m).0
    }
}

/// Inverts `m` with the default Cholesky → LDLᵀ → SVD cascade. Never fails;
/// a singular matrix yields the best-effort pseudo-inverse.
pub fn robust_inverse(m: &Matrix) -> Matrix {
    InverseCascade::default().invert(m)
}
