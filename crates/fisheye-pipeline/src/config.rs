use fisheye_core::Real;
use fisheye_detect::DetectorConfig;
use fisheye_optim::{FixMask, SolveOptions, SolverBackend};
use serde::{Deserialize, Serialize};

/// Overrides for the intrinsics seed.
///
/// By default the seed is an equidistant lens whose longer image side spans
/// 180°, centred on the image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitOptions {
    /// Seed focal length in pixels, used for both axes.
    pub focal: Option<Real>,
    /// Seed principal point `[cx, cy]`.
    pub principal_point: Option<[Real; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub detector: DetectorConfig,
    pub init: InitOptions,
    pub solve: SolveOptions,
    pub backend: SolverBackend,
    /// Shared parameters held at their seed value for the whole solve.
    pub fix: FixMask,
    /// Refine intrinsics and poses with distortion held before the full solve.
    pub refine_intrinsics_first: bool,
    /// Views whose pose Jacobian is worse conditioned than this are dropped.
    pub max_view_condition: Option<Real>,
    /// Square size used by [`crate::calibrate`]; only scales the poses.
    pub cell_size: Real,
    /// Views required to solve. Values below 3 are raised to 3.
    pub min_views: usize,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            init: InitOptions::default(),
            solve: SolveOptions::default(),
            backend: SolverBackend::default(),
            fix: FixMask::default(),
            refine_intrinsics_first: true,
            max_view_condition: Some(1e6),
            cell_size: 1.0,
            min_views: crate::MIN_VIEWS,
        }
    }
}

impl CalibrationConfig {
    pub fn required_views(&self) -> usize {
        self.min_views.max(crate::MIN_VIEWS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_uses_defaults() {
        let cfg: CalibrationConfig = serde_json::from_str(
            r#"{ "backend": "minpack", "solve": { "max_iters": 20 }, "min_views": 1 }"#,
        )
        .unwrap();
        assert_eq!(cfg.backend, SolverBackend::Minpack);
        assert_eq!(cfg.solve.max_iters, 20);
        assert_eq!(cfg.solve.ftol, SolveOptions::default().ftol);
        assert!(cfg.refine_intrinsics_first);
        assert_eq!(cfg.required_views(), 3);
    }
}
