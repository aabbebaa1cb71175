// geoadjust_core/src/photogrammetry/resection.rs

use nalgebra::{Matrix3, Point2, Point3};

use crate::config::RefinementSettings;
use crate::error::{AdjustError, Result};
use crate::linalg::InverseSolver;
use crate::photogrammetry::{linearize_at, refine, CollinearityLinearization, Exterior, Interior, IterativeModel, LinearBlock};
use crate::types::{ConvergenceState, Matrix, Vector};

const MIN_POINTS: usize = 4;

/// Result of a single-photo space resection.
#[derive(Debug, Clone)]
pub struct SpaceResection {
    pub exterior: Exterior,
    /// Rotation matrix of `exterior`.
    pub rotation: Matrix3<f64>,
    pub state: ConvergenceState,
    pub iterations: usize,
    pub rmse: Option<f64>,
    /// Standard errors of `(Xs, Ys, Zs, φ, ω, κ)`.
    pub error: Option<Vector>,
    /// Measured image points plus their residuals.
    pub adjusted_image_points: Option<Vec<Point2<f64>>>,
}

struct ResectionModel<'a> {
    interior: &'a Interior,
    image_points: &'a [Point2<f64>],
    object_points: &'a [Point3<f64>],
    linearization: CollinearityLinearization,
    exterior: Exterior,
}

impl IterativeModel for ResectionModel<'_> {
    fn linearize(&self) -> Vec<LinearBlock> {
        let rotation = self.exterior.rotation();
        let rows = 2 * self.image_points.len();
        let mut coefficients = Matrix::zeros(rows, 6);
        let mut residuals = Matrix::zeros(rows, 1);

        for (i, (measured, object)) in self.image_points.iter().zip(self.object_points).enumerate() {
            let (predicted, at) = linearize_at(object, &self.exterior, self.interior, &rotation);
            residuals[(2 * i, 0)] = measured.x - predicted.x;
            residuals[(2 * i + 1, 0)] = measured.y - predicted.y;
            coefficients
                .view_mut((2 * i, 0), (2, 6))
                .copy_from(&self.linearization.jacobian(&at));
        }

        vec![LinearBlock {
            coefficients,
            residuals,
        }]
    }

    /// Only the angular part decides convergence.
    fn is_negligible(&self, _block: usize, correction: &Matrix, threshold: f64) -> bool {
        correction.rows(3, 3).iter().all(|d| d.abs() < threshold)
    }

    fn apply_correction(&mut self, _block: usize, correction: &Matrix) {
        self.exterior.apply_correction(correction.as_slice());
    }
}

/// Recovers the exterior orientation of one photograph from at least four
/// control points with known object and image coordinates.
///
/// Running out of iterations is not an error: the last pose is returned with
/// `ConvergenceState::NotConverged` and no precision figures.
pub fn space_resection(
    interior: &Interior,
    image_points: &[Point2<f64>],
    object_points: &[Point3<f64>],
    settings: &RefinementSettings,
    inverse: &dyn InverseSolver,
) -> Result<SpaceResection> {
    if image_points.len() != object_points.len() {
        return Err(AdjustError::SizeMismatch {
            context: "space resection object points",
            expected: image_points.len(),
            actual: object_points.len(),
        });
    }
    if image_points.len() < MIN_POINTS {
        return Err(AdjustError::InsufficientPoints {
            operation: "space resection",
            required: MIN_POINTS,
            actual: image_points.len(),
        });
    }

    let mut model = ResectionModel {
        interior,
        image_points,
        object_points,
        linearization: settings.linearization,
        exterior: Exterior::initial_guess(interior, object_points),
    };
    let report = refine(&mut model, settings, inverse)?;

    let exterior = model.exterior;
    let adjusted_image_points = report.residuals.first().map(|v| {
        image_points
            .iter()
            .enumerate()
            .map(|(i, p)| Point2::new(p.x + v[(2 * i, 0)], p.y + v[(2 * i + 1, 0)]))
            .collect()
    });

    Ok(SpaceResection {
        exterior,
        rotation: exterior.rotation(),
        state: report.state,
        iterations: report.iterations,
        rmse: report.rmse,
        error: report.errors.into_iter().next(),
        adjusted_image_points,
    })
}
