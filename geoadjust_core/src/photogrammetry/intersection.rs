// geoadjust_core/src/photogrammetry/intersection.rs

use nalgebra::{Matrix3, Point2, Point3, Vector3};

use crate::config::RefinementSettings;
use crate::error::{AdjustError, Result};
use crate::linalg::InverseSolver;
use crate::photogrammetry::{linearize_at, refine, CollinearityLinearization, Exterior, Interior, IterativeModel, LinearBlock};
use crate::types::{ConvergenceState, Matrix};

const MIN_VIEWS: usize = 2;

/// A photograph of known orientation together with its measured points.
/// Point `i` of every view is the image of the same object point.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageView {
    pub interior: Interior,
    pub exterior: Exterior,
    pub image_points: Vec<Point2<f64>>,
}

/// Result of a multi-view space intersection.
#[derive(Debug, Clone)]
pub struct SpaceIntersection {
    pub points: Vec<Point3<f64>>,
    pub state: ConvergenceState,
    pub iterations: usize,
    pub rmse: Option<f64>,
    /// Standard errors of `(X, Y, Z)` for each point.
    pub errors: Option<Vec<Vector3<f64>>>,
}

/// Closed-form intersection of corresponding rays from two photographs
/// (point projection coefficient method).
pub fn forward_intersection(left: &ImageView, right: &ImageView) -> Result<Vec<Point3<f64>>> {
    if left.image_points.len() != right.image_points.len() {
        return Err(AdjustError::SizeMismatch {
            context: "forward intersection image points",
            expected: left.image_points.len(),
            actual: right.image_points.len(),
        });
    }

    let ray = |view: &ImageView, rotation: &Matrix3<f64>, p: &Point2<f64>| {
        rotation * Vector3::new(p.x - view.interior.x0, p.y - view.interior.y0, -view.interior.focal_length)
    };
    let (r1, r2) = (left.exterior.rotation(), right.exterior.rotation());
    let (s1, s2) = (left.exterior.position(), right.exterior.position());
    let base = s2 - s1;

    let points = left
        .image_points
        .iter()
        .zip(&right.image_points)
        .map(|(p1, p2)| {
            let a1 = ray(left, &r1, p1);
            let a2 = ray(right, &r2, p2);
            let denominator = a1.x * a2.z - a1.z * a2.x;
            let n1 = (base.x * a2.z - base.z * a2.x) / denominator;
            let n2 = (base.x * a1.z - base.z * a1.x) / denominator;
            Point3::new(
                s2.x + n2 * a2.x,
                s1.y + (n1 * a1.y + n2 * a2.y + base.y) / 2.0,
                s2.z + n2 * a2.z,
            )
        })
        .collect();
    Ok(points)
}

struct IntersectionModel<'a> {
    views: &'a [ImageView],
    rotations: Vec<Matrix3<f64>>,
    linearization: CollinearityLinearization,
    points: Vec<Point3<f64>>,
}

impl IterativeModel for IntersectionModel<'_> {
    /// One block per object point, two rows per view.
    fn linearize(&self) -> Vec<LinearBlock> {
        let rows = 2 * self.views.len();
        self.points
            .iter()
            .enumerate()
            .map(|(j, object)| {
                let mut coefficients = Matrix::zeros(rows, 3);
                let mut residuals = Matrix::zeros(rows, 1);
                for (i, (view, rotation)) in self.views.iter().zip(&self.rotations).enumerate() {
                    let (predicted, at) = linearize_at(object, &view.exterior, &view.interior, rotation);
                    let measured = view.image_points[j];
                    residuals[(2 * i, 0)] = measured.x - predicted.x;
                    residuals[(2 * i + 1, 0)] = measured.y - predicted.y;

                    let jac = self.linearization.jacobian(&at);
                    coefficients
                        .view_mut((2 * i, 0), (2, 3))
                        .copy_from(&(-jac.fixed_columns::<3>(0)));
                }
                LinearBlock {
                    coefficients,
                    residuals,
                }
            })
            .collect()
    }

    fn is_negligible(&self, _block: usize, correction: &Matrix, threshold: f64) -> bool {
        correction.iter().all(|d| d.abs() < threshold)
    }

    fn apply_correction(&mut self, block: usize, correction: &Matrix) {
        self.points[block] += Vector3::new(correction[0], correction[1], correction[2]);
    }
}

/// Refines object points seen in two or more photographs of known
/// orientation. Starts from the closed-form intersection of the first two
/// views; convergence is judged over all points together.
pub fn space_intersection(
    views: &[ImageView],
    settings: &RefinementSettings,
    inverse: &dyn InverseSolver,
) -> Result<SpaceIntersection> {
    let [first, second, ..] = views else {
        return Err(AdjustError::InsufficientPoints {
            operation: "space intersection",
            required: MIN_VIEWS,
            actual: views.len(),
        });
    };
    let expected = first.image_points.len();
    if let Some(view) = views.iter().find(|v| v.image_points.len() != expected) {
        return Err(AdjustError::SizeMismatch {
            context: "space intersection image points",
            expected,
            actual: view.image_points.len(),
        });
    }

    let mut model = IntersectionModel {
        views,
        rotations: views.iter().map(|v| v.exterior.rotation()).collect(),
        linearization: settings.linearization,
        points: forward_intersection(first, second)?,
    };
    tracing::debug!("intersecting {} points over {} views", expected, views.len());
    let report = refine(&mut model, settings, inverse)?;

    let errors = report
        .state
        .is_converged()
        .then(|| report.errors.iter().map(|e| Vector3::new(e[0], e[1], e[2])).collect());

    Ok(SpaceIntersection {
        points: model.points,
        state: report.state,
        iterations: report.iterations,
        rmse: report.rmse,
        errors,
    })
}
