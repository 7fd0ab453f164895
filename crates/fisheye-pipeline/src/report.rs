use fisheye_core::{CalibrationParams, FisheyeCamera, ImageSize, Iso3, Real};
use fisheye_optim::Termination;
use serde::{Deserialize, Serialize};

/// Result of a calibration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationReport {
    /// `{K, D}` in the persisted shape.
    pub params: CalibrationParams,
    pub camera: FisheyeCamera,
    pub image_size: ImageSize,
    /// Mean corner reprojection error over all used views, in pixels.
    pub mean_reprojection_error: Real,
    pub rms_reprojection_error: Real,
    /// Mean reprojection error per used view, aligned with `used_views`.
    pub per_view_errors: Vec<Real>,
    /// Input indices of the views that entered the final solve.
    pub used_views: Vec<usize>,
    /// Input indices skipped for missing corners, failed initialisation or
    /// poor conditioning.
    pub rejected_views: Vec<usize>,
    /// Solver iterations summed over all stages.
    pub iterations: usize,
    pub final_cost: Real,
    pub converged: bool,
    pub termination: Termination,
    /// Refined `cam_from_board` poses, aligned with `used_views`.
    pub poses: Vec<Iso3>,
}
