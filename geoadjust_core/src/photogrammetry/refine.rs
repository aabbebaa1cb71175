// geoadjust_core/src/photogrammetry/refine.rs

use crate::config::RefinementSettings;
use crate::error::Result;
use crate::linalg::{error_matrix, normal_equation, rmse, weighted_ols, InverseSolver};
use crate::types::{ConvergenceState, Matrix, Vector};

/// One independently solvable piece of a linearized model: `A·dx ≈ L`.
#[derive(Debug, Clone)]
pub struct LinearBlock {
    pub coefficients: Matrix,
    pub residuals: Matrix,
}

/// A nonlinear least-squares problem that can be relinearized around its
/// current estimate.
pub trait IterativeModel {
    /// Linear blocks at the current estimate, in a stable order.
    fn linearize(&self) -> Vec<LinearBlock>;

    /// Convergence predicate for one block's correction.
    fn is_negligible(&self, block: usize, correction: &Matrix, threshold: f64) -> bool;

    /// Adds `correction` to the unknowns of `block`.
    fn apply_correction(&mut self, block: usize, correction: &Matrix);
}

/// Outcome of `refine`. Precision figures are only present once converged.
#[derive(Debug, Clone)]
pub struct Refinement {
    pub state: ConvergenceState,
    /// Linearizations performed.
    pub iterations: usize,
    /// Unit-weight standard deviation over every stacked block.
    pub rmse: Option<f64>,
    /// Standard error of each block's unknowns.
    pub errors: Vec<Vector>,
    /// Residuals `V = A·dx − L` of each block at convergence.
    pub residuals: Vec<Matrix>,
}

/// Gauss–Newton without damping. The model is left at its last estimate in
/// either outcome; the correction that satisfied the predicate is not
/// applied.
pub fn refine<M>(model: &mut M, settings: &RefinementSettings, inverse: &dyn InverseSolver) -> Result<Refinement>
where
    M: IterativeModel + ?Sized,
{
    for iteration in 1..=settings.max_iterations {
        let blocks = model.linearize();
        let corrections = blocks
            .iter()
            .map(|b| weighted_ols(&b.coefficients, &b.residuals, None, inverse))
            .collect::<Result<Vec<_>>>()?;

        let largest = corrections.iter().map(|c| c.amax()).fold(0.0, f64::max);
        tracing::debug!("iteration {}: largest correction {:e}", iteration, largest);

        let converged = corrections
            .iter()
            .enumerate()
            .all(|(i, c)| model.is_negligible(i, c, settings.threshold));

        if converged {
            return Ok(summarize(&blocks, &corrections, iteration, inverse));
        }

        for (i, correction) in corrections.iter().enumerate() {
            model.apply_correction(i, correction);
        }
    }

    tracing::warn!(
        "refinement did not converge within {} iterations",
        settings.max_iterations
    );
    Ok(Refinement {
        state: ConvergenceState::NotConverged,
        iterations: settings.max_iterations,
        rmse: None,
        errors: Vec::new(),
        residuals: Vec::new(),
    })
}

fn summarize(
    blocks: &[LinearBlock],
    corrections: &[Matrix],
    iterations: usize,
    inverse: &dyn InverseSolver,
) -> Refinement {
    let residuals: Vec<Matrix> = blocks
        .iter()
        .zip(corrections)
        .map(|(b, dx)| &b.coefficients * dx - &b.residuals)
        .collect();

    let n: usize = blocks.iter().map(|b| b.coefficients.nrows()).sum();
    let t: usize = blocks.iter().map(|b| b.coefficients.ncols()).sum();
    let stacked = Matrix::from_iterator(n, 1, residuals.iter().flat_map(|v| v.iter().copied()));
    let sigma0 = rmse(&stacked, n, t, None);

    let errors = blocks
        .iter()
        .map(|b| error_matrix(sigma0, &inverse.invert(&normal_equation(&b.coefficients, None))))
        .collect();

    tracing::info!(
        "converged after {} iterations ({} observations, {} unknowns), rmse {:e}",
        iterations,
        n,
        t,
        sigma0
    );

    Refinement {
        state: ConvergenceState::Converged,
        iterations,
        rmse: Some(sigma0),
        errors,
        residuals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::robust_inverse;
    use approx::assert_abs_diff_eq;

    /// Fits `y = exp(k·t)` to exact samples.
    struct Exponential {
        samples: Vec<(f64, f64)>,
        k: f64,
    }

    impl IterativeModel for Exponential {
        fn linearize(&self) -> Vec<LinearBlock> {
            let n = self.samples.len();
            let coefficients = Matrix::from_iterator(n, 1, self.samples.iter().map(|(t, _)| t * (self.k * t).exp()));
            let residuals = Matrix::from_iterator(n, 1, self.samples.iter().map(|(t, y)| y - (self.k * t).exp()));
            vec![LinearBlock {
                coefficients,
                residuals,
            }]
        }

        fn is_negligible(&self, _block: usize, correction: &Matrix, threshold: f64) -> bool {
            correction.amax() < threshold
        }

        fn apply_correction(&mut self, _block: usize, correction: &Matrix) {
            self.k += correction[0];
        }
    }

    fn exponential(k: f64, start: f64) -> Exponential {
        Exponential {
            samples: (0..5).map(|i| (i as f64 * 0.25, (k * i as f64 * 0.25).exp())).collect(),
            k: start,
        }
    }

    #[test]
    fn converges_on_a_smooth_problem() {
        let mut model = exponential(0.7, 0.0);
        let settings = RefinementSettings {
            threshold: 1e-10,
            ..RefinementSettings::default()
        };
        let report = refine(&mut model, &settings, &robust_inverse).unwrap();

        assert!(report.state.is_converged());
        assert!(report.iterations < 20);
        assert_abs_diff_eq!(model.k, 0.7, epsilon = 1e-9);
        assert_eq!(report.errors.len(), 1);
        assert_abs_diff_eq!(report.rmse.unwrap(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn exhausted_budget_is_reported_not_raised() {
        let mut model = exponential(0.7, 0.0);
        let settings = RefinementSettings {
            max_iterations: 1,
            threshold: 1e-12,
            ..RefinementSettings::default()
        };
        let report = refine(&mut model, &settings, &robust_inverse).unwrap();

        assert_eq!(report.state, ConvergenceState::NotConverged);
        assert_eq!(report.iterations, 1);
        assert!(report.rmse.is_none());
        // The single correction was applied.
        assert!(model.k > 0.0);
    }

    #[test]
    fn zero_iterations_leave_the_model_alone() {
        let mut model = exponential(0.7, 0.3);
        let settings = RefinementSettings {
            max_iterations: 0,
            ..RefinementSettings::default()
        };
        let report = refine(&mut model, &settings, &robust_inverse).unwrap();
        assert_eq!(report.state, ConvergenceState::NotConverged);
        assert_eq!(model.k, 0.3);
    }
}
