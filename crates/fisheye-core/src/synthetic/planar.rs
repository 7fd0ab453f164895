//! Synthetic planar target helpers.
//!
//! Poses are `cam_from_board` isometries; corners are produced in
//! [`PatternModel`] order so they can be fed straight into calibration.

use crate::{iso_from_rotvec, FisheyeCamera, ImageSize, Iso3, PatternModel, Pt2, Real, Vec3};
use anyhow::{bail, Result};
use nalgebra::{Translation3, UnitQuaternion, Vector3};

/// Generate `n_views` poses with a yaw rotation around the +Y axis and a Z
/// translation ramp.
pub fn poses_yaw_y_z(
    n_views: usize,
    yaw_start_rad: Real,
    yaw_step_rad: Real,
    z_start: Real,
    z_step: Real,
) -> Vec<Iso3> {
    (0..n_views)
        .map(|view_idx| {
            let yaw = yaw_start_rad + yaw_step_rad * view_idx as Real;
            let rotation = UnitQuaternion::from_scaled_axis(Vector3::y() * yaw);
            let translation = Vector3::new(0.0, 0.0, z_start + z_step * view_idx as Real);
            Iso3::from_parts(Translation3::from(translation), rotation)
        })
        .collect()
}

/// Poses that tilt the board by `tilt_rad` around axes spread evenly in the
/// board plane, keeping the board centre on the optical axis at `distance`.
///
/// View `v` is tilted around the in-plane axis at angle `2π v / n_views`;
/// a small alternating roll breaks symmetry between views.
pub fn tilted_board_poses(
    model: &PatternModel,
    n_views: usize,
    distance: Real,
    tilt_rad: Real,
) -> Vec<Iso3> {
    let spec = model.spec();
    let center = Vec3::new(
        (spec.inner_width - 1) as Real * spec.cell_size * 0.5,
        (spec.inner_height - 1) as Real * spec.cell_size * 0.5,
        0.0,
    );
    (0..n_views)
        .map(|v| {
            let a = std::f64::consts::TAU * v as Real / n_views.max(1) as Real;
            let roll = if v % 2 == 0 { 0.05 } else { -0.05 };
            let rvec = Vec3::new(tilt_rad * a.cos(), tilt_rad * a.sin(), roll);
            let rot = UnitQuaternion::from_scaled_axis(rvec);
            let t = Vec3::new(0.0, 0.0, distance) - rot * center;
            iso_from_rotvec(&rvec, &t)
        })
        .collect()
}

/// Poses that carry the board towards the edge of a wide field of view.
///
/// View 0 sits on the optical axis. The remaining views place the board
/// centre at `distance` along rays `off_axis_rad` from the axis, spread
/// evenly in azimuth, with the board turned to face the camera and a small
/// alternating roll.
pub fn peripheral_board_poses(
    model: &PatternModel,
    n_views: usize,
    distance: Real,
    off_axis_rad: Real,
) -> Vec<Iso3> {
    let spec = model.spec();
    let center = Vec3::new(
        (spec.inner_width - 1) as Real * spec.cell_size * 0.5,
        (spec.inner_height - 1) as Real * spec.cell_size * 0.5,
        0.0,
    );
    let ring = n_views.saturating_sub(1).max(1) as Real;
    (0..n_views)
        .map(|v| {
            let (alpha, phi) = if v == 0 {
                (0.0, 0.0)
            } else {
                (off_axis_rad, std::f64::consts::TAU * (v - 1) as Real / ring)
            };
            let dir = Vec3::new(
                alpha.sin() * phi.cos(),
                alpha.sin() * phi.sin(),
                alpha.cos(),
            );
            let axis = Vec3::new(-phi.sin(), phi.cos(), 0.0);
            let face = UnitQuaternion::from_scaled_axis(axis * alpha);
            let roll = if v % 2 == 0 { 0.1 } else { -0.1 };
            let rot = face * UnitQuaternion::from_scaled_axis(Vec3::z() * roll);
            Iso3::from_parts(Translation3::from(dir * distance - rot * center), rot)
        })
        .collect()
}

/// Project every board corner, failing if any point is not projectable.
pub fn project_corners(
    camera: &FisheyeCamera,
    cam_from_board: &Iso3,
    model: &PatternModel,
) -> Result<Vec<Pt2>> {
    let mut pixels = Vec::with_capacity(model.len());
    for (idx, p) in model.object_points().iter().enumerate() {
        let pc = cam_from_board.transform_point(p);
        let Some(uv) = camera.project_point_c(&pc.coords) else {
            bail!("point {idx} not projectable (z={:.6})", pc.z);
        };
        pixels.push(uv);
    }
    Ok(pixels)
}

/// Like [`project_corners`], also requiring every corner to land `margin`
/// pixels inside the image.
pub fn project_corners_in_image(
    camera: &FisheyeCamera,
    cam_from_board: &Iso3,
    model: &PatternModel,
    size: ImageSize,
    margin: Real,
) -> Result<Vec<Pt2>> {
    let pixels = project_corners(camera, cam_from_board, model)?;
    let (w, h) = (size.width as Real, size.height as Real);
    for (idx, p) in pixels.iter().enumerate() {
        if p.x < margin || p.y < margin || p.x > w - 1.0 - margin || p.y > h - 1.0 - margin {
            bail!("corner {idx} at ({:.1}, {:.1}) falls outside {w}x{h}", p.x, p.y);
        }
    }
    Ok(pixels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CheckerboardSpec, Intrinsics, KannalaBrandt4};

    #[test]
    fn tilted_poses_keep_center_on_axis() {
        let model = PatternModel::new(CheckerboardSpec::new(9, 6)).unwrap();
        let poses = tilted_board_poses(&model, 4, 10.0, 0.3);
        let center = nalgebra::Point3::new(4.0, 2.5, 0.0);
        for pose in &poses {
            let c = pose.transform_point(&center);
            assert!(c.x.abs() < 1e-12 && c.y.abs() < 1e-12);
            assert!((c.z - 10.0).abs() < 1e-12);
        }
    }

    #[test]
    fn projection_checks_image_bounds() {
        let model = PatternModel::new(CheckerboardSpec::new(4, 3)).unwrap();
        let cam = FisheyeCamera::new(
            Intrinsics::new(200.0, 200.0, 160.0, 120.0),
            KannalaBrandt4::default(),
        );
        let near = poses_yaw_y_z(1, 0.0, 0.0, 10.0, 0.0)[0];
        let size = ImageSize::new(320, 240);
        assert!(project_corners_in_image(&cam, &near, &model, size, 2.0).is_ok());
        let shifted = Iso3::from_parts(
            Translation3::new(3.0, 0.0, 1.0),
            UnitQuaternion::identity(),
        );
        assert!(project_corners_in_image(&cam, &shifted, &model, size, 2.0).is_err());
    }

    #[test]
    fn peripheral_poses_reach_the_edge_of_the_field() {
        let model = PatternModel::new(CheckerboardSpec::new(9, 6)).unwrap();
        let cam = FisheyeCamera::new(
            Intrinsics::new(181.0, 179.0, 319.5, 239.5),
            KannalaBrandt4::default(),
        );
        let poses = peripheral_board_poses(&model, 11, 8.0, 0.75);
        let center = nalgebra::Point3::new(4.0, 2.5, 0.0);
        let mut widest: Real = 0.0;
        for (v, pose) in poses.iter().enumerate() {
            let c = pose.transform_point(&center);
            assert!((c.coords.norm() - 8.0).abs() < 1e-9);
            let off_axis = c.coords.xy().norm().atan2(c.z);
            let expected = if v == 0 { 0.0 } else { 0.75 };
            assert!((off_axis - expected).abs() < 1e-9, "view {v}: {off_axis}");
            // Board faces the camera.
            let normal = pose.rotation * Vec3::z();
            assert!((normal.dot(&c.coords.normalize()) - 1.0).abs() < 1e-9);

            project_corners_in_image(&cam, pose, &model, ImageSize::new(640, 480), 10.0).unwrap();
            for p in model.object_points() {
                let q = pose.transform_point(p);
                widest = widest.max(q.coords.xy().norm().atan2(q.z));
            }
        }
        assert!(widest > 70f64.to_radians(), "widest {}", widest.to_degrees());
    }
}
