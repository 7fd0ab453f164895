use fisheye_core::{Iso3, Mat3, Real};
use nalgebra::{Matrix3, Rotation3, Translation3, UnitQuaternion, Vector3};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoseError {
    #[error("intrinsics matrix is not invertible")]
    SingularIntrinsics,
    #[error("homography columns are degenerate")]
    DegenerateHomography,
    #[error("svd failed")]
    SvdFailed,
}

/// Linear pose initialisation from a homography and intrinsics.
///
/// Decomposes a plane-induced homography `H = λ K [r1 r2 t]` into a rotation
/// and translation, assuming the target lies on `Z = 0` in its own frame.
#[derive(Debug, Clone, Copy)]
pub struct PlanarPoseSolver;

/// Estimate `cam_from_board` for a planar board given K and H (plane -> image).
pub fn estimate_planar_pose_from_h(kmtx: &Mat3, hmtx: &Mat3) -> Result<Iso3, PoseError> {
    PlanarPoseSolver::from_homography(kmtx, hmtx)
}

impl PlanarPoseSolver {
    /// Decompose a homography into a pose `T_C_B` given intrinsics `K`.
    ///
    /// The sign of the scale is chosen so the board lies in front of the
    /// camera (`t.z > 0`).
    pub fn from_homography(kmtx: &Mat3, hmtx: &Mat3) -> Result<Iso3, PoseError> {
        let k_inv = kmtx.try_inverse().ok_or(PoseError::SingularIntrinsics)?;

        let k_inv_h1 = k_inv * hmtx.column(0);
        let k_inv_h2 = k_inv * hmtx.column(1);
        let k_inv_h3 = k_inv * hmtx.column(2);

        // Scale factor λ: average the norms of the first two columns.
        let mean_norm = (k_inv_h1.norm() + k_inv_h2.norm()) * 0.5;
        if !mean_norm.is_finite() || mean_norm < Real::EPSILON {
            return Err(PoseError::DegenerateHomography);
        }
        let mut lambda = 1.0 / mean_norm;
        if k_inv_h3.z * lambda < 0.0 {
            lambda = -lambda;
        }

        let r1 = lambda * k_inv_h1;
        let r2 = lambda * k_inv_h2;
        let r3 = r1.cross(&r2);

        let mut r_mat = Matrix3::<Real>::zeros();
        r_mat.set_column(0, &r1);
        r_mat.set_column(1, &r2);
        r_mat.set_column(2, &r3);

        // Project onto SO(3) (polar decomposition via SVD).
        let svd = r_mat.svd(true, true);
        let mut u = svd.u.ok_or(PoseError::SvdFailed)?;
        let v_t = svd.v_t.ok_or(PoseError::SvdFailed)?;
        if (u * v_t).determinant() < 0.0 {
            u.column_mut(2).neg_mut();
        }
        let r_orth = u * v_t;

        let t_vec: Vector3<Real> = lambda * k_inv_h3;
        let rot = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(r_orth));
        Ok(Iso3::from_parts(Translation3::from(t_vec), rot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fisheye_core::Intrinsics;
    use nalgebra::Isometry3;

    fn homography_for(kmtx: &Mat3, iso: &Iso3) -> Mat3 {
        let r = iso.rotation.to_rotation_matrix();
        let mut h = Mat3::zeros();
        h.set_column(0, &(kmtx * r.matrix().column(0)));
        h.set_column(1, &(kmtx * r.matrix().column(1)));
        h.set_column(2, &(kmtx * iso.translation.vector));
        h
    }

    #[test]
    fn planar_pose_from_h_recovers_pose() {
        let kmtx = Intrinsics::new(800.0, 780.0, 640.0, 360.0).k_matrix();
        let rot = Rotation3::from_euler_angles(0.1, -0.05, 0.2);
        let iso_gt = Isometry3::from_parts(Translation3::new(0.1, -0.05, 1.0), rot.into());

        let iso_est = estimate_planar_pose_from_h(&kmtx, &homography_for(&kmtx, &iso_gt)).unwrap();

        assert!((iso_est.translation.vector - iso_gt.translation.vector).norm() < 1e-6);
        let angle = iso_est.rotation.angle_to(&iso_gt.rotation);
        assert!(angle < 1e-6, "rotation error too large: {angle}");
    }

    #[test]
    fn negated_homography_gives_same_pose() {
        let kmtx = Mat3::identity();
        let iso_gt = Isometry3::from_parts(
            Translation3::new(-0.3, 0.2, 4.0),
            UnitQuaternion::from_scaled_axis(Vector3::new(0.2, 0.3, -0.1)),
        );
        let h = -homography_for(&kmtx, &iso_gt) * 3.0;
        let iso_est = estimate_planar_pose_from_h(&kmtx, &h).unwrap();
        assert!(iso_est.translation.vector.z > 0.0);
        assert!((iso_est.translation.vector - iso_gt.translation.vector).norm() < 1e-9);
    }
}
