use fisheye_core::{
    iso_from_rotvec,
    synthetic::{add_raster_noise, planar, render_checkerboard, RenderOptions},
    CalibError, CheckerboardSpec, FisheyeCamera, ImageSize, Intrinsics, Iso3, KannalaBrandt4,
    PatternModel, Pt2, Raster, Real, Vec3,
};
use fisheye_detect::{detect_corners, DetectError, DetectorConfig};

const SIZE: ImageSize = ImageSize {
    width: 640,
    height: 480,
};

fn camera() -> FisheyeCamera {
    FisheyeCamera::new(
        Intrinsics::new(220.0, 218.0, 322.0, 241.0),
        KannalaBrandt4::new(0.1, -0.02, 0.0, 0.0),
    )
}

fn render(pose: &Iso3, spec: CheckerboardSpec) -> (Raster, Vec<Pt2>) {
    let model = PatternModel::new(spec).unwrap();
    let cam = camera();
    let img = render_checkerboard(&cam, pose, &spec, SIZE, &RenderOptions::default()).unwrap();
    let gt = planar::project_corners_in_image(&cam, pose, &model, SIZE, 10.0).unwrap();
    (img, gt)
}

/// Board centred on the optical axis at `distance`, rotated by `rvec`.
fn centred_pose(spec: &CheckerboardSpec, rvec: Vec3, distance: Real) -> Iso3 {
    let center = Vec3::new(
        (spec.inner_width - 1) as Real * 0.5,
        (spec.inner_height - 1) as Real * 0.5,
        0.0,
    );
    let rot = nalgebra::UnitQuaternion::from_scaled_axis(rvec);
    iso_from_rotvec(&rvec, &(Vec3::new(0.0, 0.0, distance) - rot * center))
}

fn errors(found: &[Pt2], gt: &[Pt2]) -> (Real, Real) {
    let d: Vec<Real> = found.iter().zip(gt).map(|(a, b)| (a - b).norm()).collect();
    let mean = d.iter().sum::<Real>() / d.len() as Real;
    let max = d.iter().copied().fold(0.0, Real::max);
    (mean, max)
}

#[test]
fn detects_tilted_boards_in_pattern_order() {
    let spec = CheckerboardSpec::new(9, 6);
    let model = PatternModel::new(spec).unwrap();
    for pose in planar::tilted_board_poses(&model, 4, 8.0, 0.4) {
        let (img, gt) = render(&pose, spec);
        let det = detect_corners(&img, &spec, &DetectorConfig::default()).unwrap();
        assert_eq!(det.corners.len(), 54);
        let (mean, max) = errors(det.corners.points(), &gt);
        assert!(mean < 0.15, "mean error {mean}");
        assert!(max < 0.5, "max error {max}");
        assert!(det.spacing > 12.0);
    }
}

#[test]
fn upside_down_board_is_reported_in_canonical_order() {
    let spec = CheckerboardSpec::new(7, 5);
    let pose = centred_pose(&spec, Vec3::new(0.0, 0.0, std::f64::consts::PI), 6.0);
    let (img, gt) = render(&pose, spec);
    let det = detect_corners(&img, &spec, &DetectorConfig::default()).unwrap();
    let reversed: Vec<Pt2> = gt.iter().rev().copied().collect();
    let (mean, _) = errors(det.corners.points(), &reversed);
    assert!(mean < 0.15, "mean error {mean}");
}

#[test]
fn transposed_spec_matches_rotated_board() {
    let spec = CheckerboardSpec::new(7, 5);
    let (img, _) = render(&centred_pose(&spec, Vec3::new(0.1, -0.1, 0.05), 6.0), spec);
    let transposed = CheckerboardSpec::new(5, 7);
    let det = detect_corners(&img, &transposed, &DetectorConfig::default()).unwrap();
    assert_eq!(det.corners.len(), 35);
}

#[test]
fn noisy_multichannel_image_is_detected() {
    let spec = CheckerboardSpec::new(9, 6);
    let pose = centred_pose(&spec, Vec3::new(0.2, 0.3, 0.1), 7.5);
    let (gray, gt) = render(&pose, spec);
    let rgb: Vec<u8> = gray.data().iter().flat_map(|&v| [v, v, v]).collect();
    let mut img = Raster::new(SIZE.width, SIZE.height, 3, rgb).unwrap();
    add_raster_noise(&mut img, 11, 6);

    let det = detect_corners(&img, &spec, &DetectorConfig::default()).unwrap();
    let (mean, _) = errors(det.corners.points(), &gt);
    assert!(mean < 0.3, "mean error {mean}");
}

#[test]
fn blank_image_has_no_corners() {
    let img = Raster::filled(SIZE.width, SIZE.height, 1, 128).unwrap();
    let err = detect_corners(&img, &CheckerboardSpec::new(9, 6), &DetectorConfig::default())
        .unwrap_err();
    assert!(matches!(err, DetectError::NotFound(_)));
    assert!(matches!(CalibError::from(err), CalibError::CornerNotFound(_)));
}

#[test]
fn wrong_board_size_is_not_found() {
    let spec = CheckerboardSpec::new(7, 5);
    let (img, _) = render(&centred_pose(&spec, Vec3::new(0.1, 0.0, 0.0), 6.0), spec);
    let err = detect_corners(&img, &CheckerboardSpec::new(9, 6), &DetectorConfig::default())
        .unwrap_err();
    assert!(matches!(err, DetectError::NotFound(_)));
}

#[test]
fn invalid_spec_is_rejected() {
    let img = Raster::filled(64, 64, 1, 0).unwrap();
    let err = detect_corners(&img, &CheckerboardSpec::new(1, 6), &DetectorConfig::default())
        .unwrap_err();
    assert!(matches!(err, DetectError::InvalidInput(_)));
}
