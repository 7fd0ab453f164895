use crate::{codec, CalibrationConfig, CalibrationReport};
use fisheye_core::{
    CalibError, CalibrationParams, CheckerboardSpec, CornerSet, FisheyeCamera, ImageSize,
    Iso3, KannalaBrandt4, PatternModel, Raster, Real,
};
use fisheye_detect::{detect_corners, DetectError};
use fisheye_linear::{estimate_view_pose, seed_intrinsics};
use fisheye_optim::{
    refine_fisheye_intrinsics, FisheyeIntrinsicsProblem, FixMask, ParamLayout,
};
use log::{debug, info, warn};
use rayon::prelude::*;

/// Fewest views that constrain shared intrinsics, distortion and poses.
pub const MIN_VIEWS: usize = 3;

/// Calibrate from checkerboard images with `board_width × board_height`
/// inner corners, using the default configuration.
pub fn calibrate(
    images: &[Raster],
    board_width: usize,
    board_height: usize,
) -> Result<CalibrationParams, CalibError> {
    let config = CalibrationConfig::default();
    let spec = CheckerboardSpec::new(board_width, board_height).with_cell_size(config.cell_size);
    Ok(calibrate_with_config(images, &spec, &config)?.params)
}

/// Like [`calibrate`], decoding container bytes to grayscale first.
pub fn calibrate_encoded<B: AsRef<[u8]>>(
    images: &[B],
    board_width: usize,
    board_height: usize,
) -> Result<CalibrationParams, CalibError> {
    let rasters = images
        .iter()
        .map(|b| codec::decode_gray(b.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    calibrate(&rasters, board_width, board_height)
}

/// Detect corners in every image, skipping those without a board, and solve.
///
/// All images must share one size. View indices in the report refer to
/// positions in `images`.
pub fn calibrate_with_config(
    images: &[Raster],
    spec: &CheckerboardSpec,
    config: &CalibrationConfig,
) -> Result<CalibrationReport, CalibError> {
    spec.validate()?;
    let required = config.required_views();
    let Some(first) = images.first() else {
        return Err(CalibError::InsufficientObservations { found: 0, required });
    };
    let size = first.size();
    if let Some((idx, img)) = images.iter().enumerate().find(|(_, img)| img.size() != size) {
        return Err(CalibError::invalid(format!(
            "image {idx} is {}x{}, expected {}x{}",
            img.width(),
            img.height(),
            size.width,
            size.height
        )));
    }

    let detections: Vec<Result<CornerSet, DetectError>> = images
        .par_iter()
        .map(|img| detect_corners(img, spec, &config.detector).map(|d| d.corners))
        .collect();

    let mut views = Vec::new();
    let mut rejected = Vec::new();
    for (idx, det) in detections.into_iter().enumerate() {
        match det {
            Ok(corners) => views.push((idx, corners)),
            Err(DetectError::NotFound(reason)) => {
                warn!("image {idx}: skipped, {reason}");
                rejected.push(idx);
            }
            Err(err) => return Err(err.into()),
        }
    }
    info!(
        "corners found in {} of {} images",
        views.len(),
        images.len()
    );
    solve_views(views, rejected, size, spec, config)
}

/// Solve from corner sets already in pattern order.
pub fn calibrate_corner_sets(
    corner_sets: &[CornerSet],
    image_size: ImageSize,
    spec: &CheckerboardSpec,
    config: &CalibrationConfig,
) -> Result<CalibrationReport, CalibError> {
    spec.validate()?;
    let views = corner_sets.iter().cloned().enumerate().collect();
    solve_views(views, Vec::new(), image_size, spec, config)
}

fn seed_camera(size: ImageSize, config: &CalibrationConfig) -> Result<FisheyeCamera, CalibError> {
    let mut k = seed_intrinsics(size);
    if let Some(f) = config.init.focal {
        k.fx = f;
        k.fy = f;
    }
    if let Some([cx, cy]) = config.init.principal_point {
        k.cx = cx;
        k.cy = cy;
    }
    k.validate()?;
    Ok(FisheyeCamera::new(k, KannalaBrandt4::default()))
}

fn ensure_enough(found: usize, required: usize) -> Result<(), CalibError> {
    if found < required {
        return Err(CalibError::InsufficientObservations { found, required });
    }
    Ok(())
}

fn solve_views(
    views: Vec<(usize, CornerSet)>,
    mut rejected: Vec<usize>,
    size: ImageSize,
    spec: &CheckerboardSpec,
    config: &CalibrationConfig,
) -> Result<CalibrationReport, CalibError> {
    let required = config.required_views();
    ensure_enough(views.len(), required)?;
    if size.width == 0 || size.height == 0 {
        return Err(CalibError::invalid("image size must be non-empty"));
    }
    let model = PatternModel::new(*spec)?;
    for (idx, corners) in &views {
        if corners.len() != model.len() {
            return Err(CalibError::invalid(format!(
                "view {idx} has {} corners, pattern has {}",
                corners.len(),
                model.len()
            )));
        }
    }

    let seed = seed_camera(size, config)?;
    let board = model.planar_points();
    let mut seeded: Vec<(usize, CornerSet, Iso3)> = Vec::with_capacity(views.len());
    for (idx, corners) in views {
        match estimate_view_pose(&seed, &board, corners.points()) {
            Ok(pose) => seeded.push((idx, corners, pose)),
            Err(err) => {
                warn!("view {idx}: pose initialisation failed, {err}");
                rejected.push(idx);
            }
        }
    }
    ensure_enough(seeded.len(), required)?;

    let build = |seeded: &[(usize, CornerSet, Iso3)], camera: &FisheyeCamera, mask: FixMask| {
        let poses: Vec<Iso3> = seeded.iter().map(|(_, _, p)| *p).collect();
        let x0 = ParamLayout::new(poses.len()).pack(camera, &poses)?;
        FisheyeIntrinsicsProblem::new(
            model.object_points().to_vec(),
            seeded.iter().map(|(_, c, _)| c.points().to_vec()).collect(),
            x0,
            mask,
        )
    };

    if let Some(max_cond) = config.max_view_condition {
        let conditioning = build(&seeded, &seed, FixMask::default())?;
        let x0 = conditioning.expand(&conditioning.initial_free());
        let conditions: Vec<Real> = (0..seeded.len())
            .into_par_iter()
            .map(|v| conditioning.pose_condition(&x0, v))
            .collect();
        let mut kept = Vec::with_capacity(seeded.len());
        for (view, cond) in seeded.into_iter().zip(conditions) {
            if cond.is_finite() && cond <= max_cond {
                kept.push(view);
            } else {
                warn!("view {}: dropped, pose condition {cond:.3e} exceeds {max_cond:.1e}", view.0);
                rejected.push(view.0);
            }
        }
        seeded = kept;
        ensure_enough(seeded.len(), required)?;
    }

    let mut camera = seed;
    let mut iterations = 0;
    if config.refine_intrinsics_first {
        let problem = build(&seeded, &camera, config.fix.union(FixMask::distortion_only()))?;
        let est = refine_fisheye_intrinsics(&config.backend, &problem, &config.solve)?;
        debug!(
            "intrinsics stage: cost {:.6e} -> {:.6e} in {} iterations",
            est.report.initial_cost, est.report.final_cost, est.report.iterations
        );
        iterations += est.report.iterations;
        camera = est.camera;
        for (view, pose) in seeded.iter_mut().zip(est.poses) {
            view.2 = pose;
        }
    }

    let problem = build(&seeded, &camera, config.fix)?;
    let est = refine_fisheye_intrinsics(&config.backend, &problem, &config.solve)?;
    iterations += est.report.iterations;
    est.camera.k.validate().map_err(|_| {
        CalibError::FailedToConverge(format!(
            "solution has invalid intrinsics fx={:.3}, fy={:.3}",
            est.camera.k.fx, est.camera.k.fy
        ))
    })?;

    let errors = problem.reprojection_errors(&est.params);
    let per_view_errors: Vec<Real> = errors
        .iter()
        .map(|e| e.iter().sum::<Real>() / e.len().max(1) as Real)
        .collect();
    let all: Vec<Real> = errors.into_iter().flatten().collect();
    let n = all.len().max(1) as Real;
    let mean = all.iter().sum::<Real>() / n;
    let rms = (all.iter().map(|e| e * e).sum::<Real>() / n).sqrt();

    rejected.sort_unstable();
    let used_views: Vec<usize> = seeded.iter().map(|(idx, _, _)| *idx).collect();
    info!(
        "calibrated from {} views: mean error {mean:.4} px, rms {rms:.4} px, cost {:.6e}",
        used_views.len(),
        est.report.final_cost
    );
    if !est.report.converged {
        warn!("solver stopped at the iteration cap; estimate may be inaccurate");
    }

    Ok(CalibrationReport {
        params: CalibrationParams::from_camera(&est.camera),
        camera: est.camera,
        image_size: size,
        mean_reprojection_error: mean,
        rms_reprojection_error: rms,
        per_view_errors,
        used_views,
        rejected_views: rejected,
        iterations,
        final_cost: est.report.final_cost,
        converged: est.report.converged,
        termination: est.report.termination,
        poses: est.poses,
    })
}
