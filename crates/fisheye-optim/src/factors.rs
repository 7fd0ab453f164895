//! Reprojection residuals generic over [`nalgebra::RealField`].
//!
//! The same code runs in `f64` for residual evaluation and in dual numbers
//! for the Jacobian (see [`crate::jacobian_ad`]).

use fisheye_core::{Pt2, Pt3};
use nalgebra::{RealField, Vector3};

/// Camera block of the local vector: `fx, fy, cx, cy, k1, k2, k3, k4`.
pub(crate) const CAMERA_DIM: usize = 8;
/// Camera block followed by one pose: rotation vector, then translation.
pub(crate) const LOCAL_DIM: usize = CAMERA_DIM + 6;

/// Residual assigned to each axis of a corner that cannot be projected.
pub(crate) const UNPROJECTABLE_RESIDUAL: f64 = 1e4;
/// Radius below which a ray is treated as lying on the optical axis.
const AXIS_EPS: f64 = 1e-15;
/// Rotation angle below which Rodrigues is replaced by its first-order form.
const SMALL_ANGLE: f64 = 1e-8;

#[inline]
fn lit<T: RealField>(v: f64) -> T {
    nalgebra::convert(v)
}

/// Rotate `p` by the rotation vector `r`.
fn rotate<T: RealField>(r: &Vector3<T>, p: &Vector3<T>) -> Vector3<T> {
    let theta2 = r.norm_squared();
    let cross = r.cross(p);
    if theta2 < lit(SMALL_ANGLE * SMALL_ANGLE) {
        return p + cross;
    }
    let theta = theta2.clone().sqrt();
    let (s, c) = theta.clone().sin_cos();
    let dot = r.dot(p);
    p * c.clone() + cross * (s / theta) + r * (dot * (T::one() - c) / theta2)
}

/// Kannala–Brandt distorted normalized coordinates of a camera-frame point.
fn distort<T: RealField>(k: &[T], pc: &Vector3<T>) -> Option<(T, T)> {
    let (x, y, z) = (pc.x.clone(), pc.y.clone(), pc.z.clone());
    let r2 = x.clone() * x.clone() + y.clone() * y.clone();
    let scale = if r2 < lit(AXIS_EPS * AXIS_EPS) {
        // θ ≈ r / z near the axis, so θd / r → 1 / z.
        if z <= T::zero() {
            return None;
        }
        T::one() / z
    } else {
        let r = r2.sqrt();
        let theta = r.clone().atan2(z);
        let t2 = theta.clone() * theta.clone();
        let tail = k[2].clone() + t2.clone() * k[3].clone();
        let poly = T::one()
            + t2.clone() * (k[0].clone() + t2.clone() * (k[1].clone() + t2 * tail));
        theta * poly / r
    };
    Some((x * scale.clone(), y * scale))
}

/// Pixel residuals `observed - projected` of one view, `[u, v]` per corner.
///
/// `local` is `[fx, fy, cx, cy, k1..k4, rx, ry, rz, tx, ty, tz]`.
pub(crate) fn view_residuals_generic<T: RealField>(
    local: &[T],
    object_points: &[Pt3],
    observations: &[Pt2],
) -> Vec<T> {
    debug_assert_eq!(local.len(), LOCAL_DIM);
    debug_assert_eq!(object_points.len(), observations.len());

    let (fx, fy, cx, cy) = (
        local[0].clone(),
        local[1].clone(),
        local[2].clone(),
        local[3].clone(),
    );
    let k = &local[4..CAMERA_DIM];
    let r = Vector3::new(local[8].clone(), local[9].clone(), local[10].clone());
    let t = Vector3::new(local[11].clone(), local[12].clone(), local[13].clone());

    let mut out = Vec::with_capacity(2 * object_points.len());
    for (p, obs) in object_points.iter().zip(observations) {
        let pw = Vector3::new(lit::<T>(p.x), lit(p.y), lit(p.z));
        let pc = rotate(&r, &pw) + &t;
        match distort(k, &pc) {
            Some((xd, yd)) => {
                out.push(lit::<T>(obs.x) - (fx.clone() * xd + cx.clone()));
                out.push(lit::<T>(obs.y) - (fy.clone() * yd + cy.clone()));
            }
            None => {
                out.push(lit(UNPROJECTABLE_RESIDUAL));
                out.push(lit(UNPROJECTABLE_RESIDUAL));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use fisheye_core::{iso_from_rotvec, FisheyeCamera, Intrinsics, KannalaBrandt4, Vec3};

    #[test]
    fn matches_camera_projection() {
        let cam = FisheyeCamera::new(
            Intrinsics::new(220.0, 218.0, 322.0, 241.0),
            KannalaBrandt4::new(0.1, -0.02, 0.003, -0.001),
        );
        let r = Vec3::new(0.3, -0.2, 0.1);
        let t = Vec3::new(-1.0, 0.5, 4.0);
        let pose = iso_from_rotvec(&r, &t);
        let points = vec![
            Pt3::new(0.0, 0.0, 0.0),
            Pt3::new(3.0, 1.0, 0.0),
            Pt3::new(-2.0, 4.0, 0.0),
        ];
        let projected: Vec<Pt2> = points.iter().map(|p| cam.project(p, &pose).unwrap()).collect();

        let mut local = vec![cam.k.fx, cam.k.fy, cam.k.cx, cam.k.cy];
        local.extend(cam.dist.to_array());
        local.extend(r.iter());
        local.extend(t.iter());
        let res = view_residuals_generic(&local, &points, &projected);
        assert!(res.iter().all(|v| v.abs() < 1e-9), "{res:?}");
    }

    #[test]
    fn small_rotation_is_continuous() {
        let p = Vector3::new(1.0, 2.0, 3.0);
        let tiny = Vector3::new(1e-9, -2e-9, 5e-10);
        let above = Vector3::new(1e-7, -2e-7, 5e-8);
        assert!((rotate(&tiny, &p) - (p + tiny.cross(&p))).norm() < 1e-15);
        assert!((rotate(&above, &p) - (p + above.cross(&p))).norm() < 1e-12);
    }

    #[test]
    fn points_behind_the_camera_get_a_large_residual() {
        let mut local = vec![200.0, 200.0, 320.0, 240.0, 0.0, 0.0, 0.0, 0.0];
        local.extend([0.0, 0.0, 0.0, 0.0, 0.0, -2.0]);
        let res =
            view_residuals_generic(&local, &[Pt3::new(0.0, 0.0, 0.0)], &[Pt2::new(320.0, 240.0)]);
        assert_eq!(res, vec![UNPROJECTABLE_RESIDUAL; 2]);
    }
}
