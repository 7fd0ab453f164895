use crate::{dlt_homography, estimate_planar_pose_from_h, HomographyError, PoseError};
use fisheye_core::{CalibError, FisheyeCamera, ImageSize, Intrinsics, Iso3, Mat3, Pt2, Real};
use log::debug;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitError {
    #[error("{0} of {1} corners could not be undistorted with the seed camera")]
    Unprojectable(usize, usize),
    #[error(transparent)]
    Homography(#[from] HomographyError),
    #[error(transparent)]
    Pose(#[from] PoseError),
}

impl From<InitError> for CalibError {
    fn from(err: InitError) -> Self {
        CalibError::invalid(format!("pose initialisation failed: {err}"))
    }
}

impl From<HomographyError> for CalibError {
    fn from(err: HomographyError) -> Self {
        InitError::from(err).into()
    }
}

impl From<PoseError> for CalibError {
    fn from(err: PoseError) -> Self {
        InitError::from(err).into()
    }
}

/// Seed intrinsics for an image of `size`.
///
/// The principal point sits at the image centre and the focal length is
/// `max(w, h) / π`, i.e. an equidistant lens whose longer side spans 180°.
pub fn seed_intrinsics(size: ImageSize) -> Intrinsics {
    let f = size.width.max(size.height) as Real / std::f64::consts::PI;
    Intrinsics::new(
        f,
        f,
        (size.width as Real - 1.0) * 0.5,
        (size.height as Real - 1.0) * 0.5,
    )
}

/// Initial `cam_from_board` for one view.
///
/// Corners are undistorted through `camera` onto the normalized image plane,
/// where the board-to-plane homography is a pure pinhole map and can be
/// decomposed with `K = I`.
pub fn estimate_view_pose(
    camera: &FisheyeCamera,
    board_points: &[Pt2],
    corners: &[Pt2],
) -> Result<Iso3, InitError> {
    let normalized: Vec<Option<Pt2>> = camera.undistort_points(corners);
    let failed = normalized.iter().filter(|p| p.is_none()).count();
    if failed > 0 {
        return Err(InitError::Unprojectable(failed, corners.len()));
    }
    let normalized: Vec<Pt2> = normalized.into_iter().flatten().collect();

    let h = dlt_homography(board_points, &normalized)?;
    let pose = estimate_planar_pose_from_h(&Mat3::identity(), &h)?;
    debug!(
        "seed pose: t = [{:.3}, {:.3}, {:.3}], angle = {:.3} rad",
        pose.translation.vector.x,
        pose.translation.vector.y,
        pose.translation.vector.z,
        pose.rotation.angle()
    );
    Ok(pose)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fisheye_core::{
        synthetic::planar, CheckerboardSpec, KannalaBrandt4, PatternModel,
    };

    #[test]
    fn seed_uses_image_center() {
        let k = seed_intrinsics(ImageSize::new(640, 480));
        assert!((k.fx - 640.0 / std::f64::consts::PI).abs() < 1e-12);
        assert_eq!(k.fx, k.fy);
        assert_eq!((k.cx, k.cy), (319.5, 239.5));
    }

    #[test]
    fn degenerate_board_becomes_invalid_input() {
        let cam = FisheyeCamera::new(
            seed_intrinsics(ImageSize::new(640, 480)),
            KannalaBrandt4::default(),
        );
        let board = vec![Pt2::new(0.0, 0.0); 6];
        let corners = vec![Pt2::new(320.0, 240.0); 6];
        let err: CalibError = estimate_view_pose(&cam, &board, &corners).unwrap_err().into();
        assert!(matches!(err, CalibError::InvalidInput(_)), "{err:?}");
    }

    #[test]
    fn view_pose_is_exact_with_true_camera() {
        let model = PatternModel::new(CheckerboardSpec::new(9, 6)).unwrap();
        let cam = FisheyeCamera::new(
            Intrinsics::new(220.0, 218.0, 322.0, 241.0),
            KannalaBrandt4::new(0.05, -0.01, 0.0, 0.0),
        );
        let pose_gt = planar::tilted_board_poses(&model, 3, 9.0, 0.35)[1];
        let corners = planar::project_corners(&cam, &pose_gt, &model).unwrap();

        let pose = estimate_view_pose(&cam, &model.planar_points(), &corners).unwrap();
        assert!((pose.translation.vector - pose_gt.translation.vector).norm() < 1e-6);
        assert!(pose.rotation.angle_to(&pose_gt.rotation) < 1e-6);
    }
}
