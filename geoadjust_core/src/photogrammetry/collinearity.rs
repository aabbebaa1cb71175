// geoadjust_core/src/photogrammetry/collinearity.rs

use nalgebra::{Matrix3, SMatrix};
use serde::{Deserialize, Serialize};

/// Partials of the image coordinates `(x, y)` with respect to the exterior
/// orientation `(Xs, Ys, Zs, φ, ω, κ)`. The partials with respect to the
/// object point are the negated first three columns.
pub type CollinearityJacobian = SMatrix<f64, 2, 6>;

/// Which approximation of the collinearity equations' Jacobian to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CollinearityLinearization {
    /// Vertical photograph: every angle held at zero and `Z̄ ≈ −H`.
    SimplifyAll,
    /// Like `SimplifyAll`, but keeps the rotation about the optical axis.
    KappaOnly,
    /// Rigorous partials built from the full rotation matrix.
    #[default]
    SimplifyNone,
}

/// Everything the coefficient formulas need about one projected point.
#[derive(Debug, Clone, Copy)]
pub struct LinearizationPoint {
    /// Projected image coordinates, relative to the principal point.
    pub x: f64,
    pub y: f64,
    /// `Z̄`, the depth of the point in image-space auxiliary coordinates.
    pub image_space_z: f64,
    pub focal_length: f64,
    /// Nominal flying height `H = m·f`.
    pub flying_height: f64,
    pub omega: f64,
    pub kappa: f64,
    pub rotation: Matrix3<f64>,
}

impl CollinearityLinearization {
    pub fn jacobian(self, p: &LinearizationPoint) -> CollinearityJacobian {
        match self {
            Self::SimplifyAll => simplify_all(p),
            Self::KappaOnly => kappa_only(p),
            Self::SimplifyNone => simplify_none(p),
        }
    }
}

fn simplify_all(p: &LinearizationPoint) -> CollinearityJacobian {
    let (x, y, f, h) = (p.x, p.y, p.focal_length, p.flying_height);
    let xx = f + x * x / f;
    let yy = f + y * y / f;
    let xy = x * y / f;

    #[rustfmt::skip]
    let jac = CollinearityJacobian::from_row_slice(&[
        -f / h, 0.0,    -x / h, -xx, -xy,  y,
        0.0,    -f / h, -y / h, -xy, -yy, -x,
    ]);
    jac
}

fn kappa_only(p: &LinearizationPoint) -> CollinearityJacobian {
    let (x, y, f, h) = (p.x, p.y, p.focal_length, p.flying_height);
    let xx = f + x * x / f;
    let yy = f + y * y / f;
    let xy = x * y / f;
    let (sink, cosk) = p.kappa.sin_cos();

    #[rustfmt::skip]
    let jac = CollinearityJacobian::from_row_slice(&[
        -f / h * cosk, -f / h * sink, -x / h, -xx * cosk + xy * sink, -xy * cosk - xx * sink,  y,
         f / h * sink, -f / h * cosk, -y / h, -xy * cosk + yy * sink, -yy * cosk - xy * sink, -x,
    ]);
    jac
}

fn simplify_none(p: &LinearizationPoint) -> CollinearityJacobian {
    let (x, y, z, f) = (p.x, p.y, p.image_space_z, p.focal_length);
    let (sink, cosk) = p.kappa.sin_cos();
    let (sinw, cosw) = p.omega.sin_cos();
    let r = &p.rotation;
    // Rows of R are (a1 a2 a3), (b1 b2 b3), (c1 c2 c3).
    let (a, b, c) = (r.row(0), r.row(1), r.row(2));

    let a11 = (a[0] * f + a[2] * x) / z;
    let a12 = (b[0] * f + b[2] * x) / z;
    let a13 = (c[0] * f + c[2] * x) / z;
    let a14 = y * sinw - (x / f * (x * cosk - y * sink) + f * cosk) * cosw;
    let a15 = -f * sink - x / f * (x * sink + y * cosk);
    let a21 = (a[1] * f + a[2] * y) / z;
    let a22 = (b[1] * f + b[2] * y) / z;
    let a23 = (c[1] * f + c[2] * y) / z;
    let a24 = -x * sinw - (y / f * (x * cosk - y * sink) - f * sink) * cosw;
    let a25 = -f * cosk - y / f * (x * sink + y * cosk);

    #[rustfmt::skip]
    let jac = CollinearityJacobian::from_row_slice(&[
        a11, a12, a13, a14, a15,  y,
        a21, a22, a23, a24, a25, -x,
    ]);
    jac
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::photogrammetry::{image_space, linearize_at, project, Exterior, Interior};
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    fn point_for(exterior: &Exterior, interior: &Interior, object: &Point3<f64>) -> LinearizationPoint {
        linearize_at(object, exterior, interior, &exterior.rotation()).1
    }

    fn nudged(mut e: Exterior, component: usize, delta: f64) -> Exterior {
        match component {
            0 => e.x += delta,
            1 => e.y += delta,
            2 => e.z += delta,
            3 => e.phi += delta,
            4 => e.omega += delta,
            _ => e.kappa += delta,
        }
        e
    }

    #[test]
    fn rigorous_jacobian_matches_finite_differences() {
        let interior = Interior::new(0.15, 10_000.0);
        let exterior = Exterior {
            x: 1000.0,
            y: 1000.0,
            z: 1500.0,
            phi: 0.01,
            omega: -0.02,
            kappa: 0.3,
        };
        let object = Point3::new(1210.0, 880.0, 35.0);
        let jac = CollinearityLinearization::SimplifyNone.jacobian(&point_for(&exterior, &interior, &object));

        let project_with = |e: &Exterior| project(&image_space(&object, e, &e.rotation()), &interior);
        let steps = [1e-3, 1e-3, 1e-3, 1e-7, 1e-7, 1e-7];
        for (col, step) in steps.iter().enumerate() {
            let (p, m) = (
                project_with(&nudged(exterior, col, *step)),
                project_with(&nudged(exterior, col, -step)),
            );
            assert_relative_eq!(jac[(0, col)], (p.x - m.x) / (2.0 * step), max_relative = 1e-4, epsilon = 1e-9);
            assert_relative_eq!(jac[(1, col)], (p.y - m.y) / (2.0 * step), max_relative = 1e-4, epsilon = 1e-9);
        }
    }

    #[test]
    fn simplified_variants_agree_on_a_vertical_photo() {
        let interior = Interior::new(0.15, 10_000.0);
        let exterior = Exterior {
            x: 0.0,
            y: 0.0,
            z: 1500.0,
            ..Exterior::default()
        };
        let point = point_for(&exterior, &interior, &Point3::new(120.0, -80.0, 0.0));

        let all = CollinearityLinearization::SimplifyAll.jacobian(&point);
        let kappa = CollinearityLinearization::KappaOnly.jacobian(&point);
        let none = CollinearityLinearization::SimplifyNone.jacobian(&point);
        assert_relative_eq!(all, kappa, epsilon = 1e-12);
        assert_relative_eq!(all, none, epsilon = 1e-9);
    }
}
