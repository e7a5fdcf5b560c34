//! Rotation matrices parameterised by three angles, and their derivatives.
//!
//! Angles are `(alpha, beta, gamma)`, rotations about X, Y and Z respectively.
//! The matrix is `R = Rz(gamma) * Ry(beta) * Rx(alpha)`. The derivatives are built from
//! the same per-axis factors, so the two always agree on the convention.
use libm::{cos, sin};

use crate::vector::{M3, V3};

/// Rotation about the X axis, and its derivative w.r.t. the angle.
fn axis_x(alpha: f64) -> (M3, M3) {
    let (s, c) = (sin(alpha), cos(alpha));
    (
        M3::from_rows([[1.0, 0.0, 0.0], [0.0, c, -s], [0.0, s, c]]),
        M3::from_rows([[0.0, 0.0, 0.0], [0.0, -s, -c], [0.0, c, -s]]),
    )
}

/// Rotation about the Y axis, and its derivative w.r.t. the angle.
fn axis_y(beta: f64) -> (M3, M3) {
    let (s, c) = (sin(beta), cos(beta));
    (
        M3::from_rows([[c, 0.0, s], [0.0, 1.0, 0.0], [-s, 0.0, c]]),
        M3::from_rows([[-s, 0.0, c], [0.0, 0.0, 0.0], [-c, 0.0, -s]]),
    )
}

/// Rotation about the Z axis, and its derivative w.r.t. the angle.
fn axis_z(gamma: f64) -> (M3, M3) {
    let (s, c) = (sin(gamma), cos(gamma));
    (
        M3::from_rows([[c, -s, 0.0], [s, c, 0.0], [0.0, 0.0, 1.0]]),
        M3::from_rows([[-s, -c, 0.0], [c, -s, 0.0], [0.0, 0.0, 0.0]]),
    )
}

/// The rotation matrix for these three angles.
pub fn rotation_from_angles(angles: V3) -> M3 {
    let (rx, _) = axis_x(angles.x);
    let (ry, _) = axis_y(angles.y);
    let (rz, _) = axis_z(angles.z);
    rz * ry * rx
}

/// Partial derivatives of [`rotation_from_angles`] w.r.t. alpha, beta and gamma,
/// evaluated at `angles`.
pub fn rotation_derivatives(angles: V3) -> [M3; 3] {
    let (rx, drx) = axis_x(angles.x);
    let (ry, dry) = axis_y(angles.y);
    let (rz, drz) = axis_z(angles.z);
    [rz * ry * drx, rz * dry * rx, drz * ry * rx]
}

/// Jacobian of `R(a) * v` w.r.t. `a`.
/// Column `k` is `dR/da_k * v`.
#[inline]
pub fn derivative_rotation_times_vector(derivatives: &[M3; 3], v: V3) -> M3 {
    let [d_alpha, d_beta, d_gamma] = *derivatives;
    M3::from_columns(d_alpha * v, d_beta * v, d_gamma * v)
}
