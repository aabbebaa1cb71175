// geoadjust_core/src/photogrammetry/mod.rs

//! Collinearity-based space resection and space intersection.
//!
//! Object space is a right-handed ground system. Image coordinates are in
//! the same linear unit as the focal length, measured from the fiducial
//! centre.

use nalgebra::{Matrix3, Point2, Point3, Vector3};
use serde::{Deserialize, Serialize};

mod collinearity;
mod intersection;
mod refine;
mod resection;

pub use collinearity::{CollinearityJacobian, CollinearityLinearization, LinearizationPoint};
pub use intersection::{forward_intersection, space_intersection, ImageView, SpaceIntersection};
pub use refine::{refine, IterativeModel, LinearBlock, Refinement};
pub use resection::{space_resection, SpaceResection};

/// Interior orientation of a metric camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interior {
    /// Principal point.
    #[serde(default)]
    pub x0: f64,
    #[serde(default)]
    pub y0: f64,
    pub focal_length: f64,
    /// Photo scale denominator `m`.
    pub scale_denominator: f64,
}

impl Interior {
    pub fn new(focal_length: f64, scale_denominator: f64) -> Self {
        Self {
            x0: 0.0,
            y0: 0.0,
            focal_length,
            scale_denominator,
        }
    }

    /// Nominal flying height above ground, `H = m·f`.
    pub fn flying_height(&self) -> f64 {
        self.scale_denominator * self.focal_length
    }
}

/// Exterior orientation: projection centre and φ-ω-κ angles (radians).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Exterior {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub phi: f64,
    pub omega: f64,
    pub kappa: f64,
}

impl Exterior {
    /// Starting pose for a resection: above the centroid of the control
    /// points at the nominal flying height, looking straight down.
    pub fn initial_guess(interior: &Interior, object_points: &[Point3<f64>]) -> Self {
        let count = object_points.len().max(1) as f64;
        let centroid = object_points
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + p.coords)
            / count;
        Self {
            x: centroid.x,
            y: centroid.y,
            z: centroid.z + interior.flying_height(),
            ..Self::default()
        }
    }

    pub fn position(&self) -> Point3<f64> {
        Point3::new(self.x, self.y, self.z)
    }

    /// `R = R_φ · R_ω · R_κ`, primary axis Y.
    pub fn rotation(&self) -> Matrix3<f64> {
        let (sp, cp) = self.phi.sin_cos();
        let (sw, cw) = self.omega.sin_cos();
        let (sk, ck) = self.kappa.sin_cos();

        #[rustfmt::skip]
        let r_phi = Matrix3::new(
            cp,  0.0, -sp,
            0.0, 1.0, 0.0,
            sp,  0.0,  cp,
        );
        #[rustfmt::skip]
        let r_omega = Matrix3::new(
            1.0, 0.0, 0.0,
            0.0, cw,  -sw,
            0.0, sw,   cw,
        );
        #[rustfmt::skip]
        let r_kappa = Matrix3::new(
            ck,  -sk, 0.0,
            sk,   ck, 0.0,
            0.0, 0.0, 1.0,
        );
        r_phi * r_omega * r_kappa
    }

    pub(crate) fn apply_correction(&mut self, dx: &[f64]) {
        self.x += dx[0];
        self.y += dx[1];
        self.z += dx[2];
        self.phi += dx[3];
        self.omega += dx[4];
        self.kappa += dx[5];
    }
}

/// Image-space auxiliary coordinates `[X̄ Ȳ Z̄] = Rᵀ·(P − S)`.
pub fn image_space(object: &Point3<f64>, exterior: &Exterior, rotation: &Matrix3<f64>) -> Vector3<f64> {
    rotation.transpose() * (object - exterior.position())
}

/// Collinearity projection of image-space auxiliary coordinates.
pub fn project(image_space: &Vector3<f64>, interior: &Interior) -> Point2<f64> {
    let f = interior.focal_length;
    Point2::new(
        interior.x0 - f * image_space.x / image_space.z,
        interior.y0 - f * image_space.y / image_space.z,
    )
}

/// Projects object points into the image of a camera with the given pose.
pub fn project_points(object_points: &[Point3<f64>], exterior: &Exterior, interior: &Interior) -> Vec<Point2<f64>> {
    let rotation = exterior.rotation();
    object_points
        .iter()
        .map(|p| project(&image_space(p, exterior, &rotation), interior))
        .collect()
}

/// Builds the linearization inputs for `object` seen from `exterior`.
/// Returns the predicted image point alongside.
pub(crate) fn linearize_at(
    object: &Point3<f64>,
    exterior: &Exterior,
    interior: &Interior,
    rotation: &Matrix3<f64>,
) -> (Point2<f64>, LinearizationPoint) {
    let aux = image_space(object, exterior, rotation);
    let predicted = project(&aux, interior);
    let point = LinearizationPoint {
        x: predicted.x - interior.x0,
        y: predicted.y - interior.y0,
        image_space_z: aux.z,
        focal_length: interior.focal_length,
        flying_height: interior.flying_height(),
        omega: exterior.omega,
        kappa: exterior.kappa,
        rotation: *rotation,
    };
    (predicted, point)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rotation_is_orthonormal() {
        let e = Exterior {
            phi: 0.3,
            omega: -0.2,
            kappa: 1.1,
            ..Exterior::default()
        };
        let r = e.rotation();
        assert_relative_eq!(r * r.transpose(), Matrix3::identity(), epsilon = 1e-12);
        assert_relative_eq!(r.determinant(), 1.0, epsilon = 1e-12);
        // Second row of R_φ·R_ω·R_κ is (cos ω sin κ, cos ω cos κ, −sin ω).
        assert_relative_eq!(r[(1, 2)], -(-0.2f64).sin(), epsilon = 1e-12);
    }

    #[test]
    fn nadir_point_projects_to_principal_point() {
        let interior = Interior {
            x0: 0.01,
            y0: -0.02,
            ..Interior::new(0.15, 10_000.0)
        };
        let exterior = Exterior {
            x: 10.0,
            y: 20.0,
            z: 1500.0,
            ..Exterior::default()
        };
        let image = project_points(&[Point3::new(10.0, 20.0, 0.0), Point3::new(160.0, 20.0, 0.0)], &exterior, &interior);
        assert_relative_eq!(image[0], Point2::new(0.01, -0.02), epsilon = 1e-15);
        // 150 m east at scale 1:10000 is 15 mm.
        assert_relative_eq!(image[1], Point2::new(0.01 + 0.015, -0.02), epsilon = 1e-12);
    }

    #[test]
    fn initial_guess_hovers_above_centroid() {
        let interior = Interior::new(0.15, 10_000.0);
        let pts = [Point3::new(0.0, 0.0, 10.0), Point3::new(100.0, 50.0, 30.0)];
        let e = Exterior::initial_guess(&interior, &pts);
        assert_relative_eq!(e.position(), Point3::new(50.0, 25.0, 1520.0), epsilon = 1e-9);
        assert_eq!((e.phi, e.omega, e.kappa), (0.0, 0.0, 0.0));
    }
}
