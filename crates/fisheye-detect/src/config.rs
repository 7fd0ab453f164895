use serde::{Deserialize, Serialize};

/// ChESS response and candidate extraction parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChessConfig {
    /// Use the larger r=10 ring instead of the canonical r=5.
    pub use_radius10: bool,
    /// Half-width of the box filter applied before the response.
    pub blur_radius: usize,
    /// Relative threshold as a fraction of the maximum response.
    pub threshold_rel: f32,
    /// Absolute floor on the response; the effective threshold is the larger of the two.
    pub threshold_abs: f32,
    /// Non-maximum suppression radius in pixels.
    pub nms_radius: u32,
    /// Minimum count of positive-response neighbours in the NMS window.
    pub min_cluster_size: u32,
}

impl Default for ChessConfig {
    fn default() -> Self {
        Self {
            use_radius10: false,
            blur_radius: 1,
            threshold_rel: 0.1,
            threshold_abs: 50.0,
            nms_radius: 3,
            min_cluster_size: 2,
        }
    }
}

impl ChessConfig {
    #[inline]
    pub fn ring_radius(&self) -> u32 {
        if self.use_radius10 {
            10
        } else {
            5
        }
    }
}

/// Lattice growth parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Accepted distance between a predicted and a found corner, as a fraction
    /// of the local step length.
    pub tolerance: f32,
    /// Number of seeds tried, nearest to the candidate centroid first.
    pub max_seeds: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.35,
            max_seeds: 8,
        }
    }
}

/// Gradient-orthogonality refinement parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubPixConfig {
    /// Upper bound on the window half-size in pixels.
    pub half_window: usize,
    /// Window half-size limit as a fraction of the local grid spacing.
    pub spacing_fraction: f32,
    pub max_iters: usize,
    /// Stop once an update moves the corner less than this many pixels.
    pub eps: f32,
}

impl Default for SubPixConfig {
    fn default() -> Self {
        Self {
            half_window: 5,
            spacing_fraction: 0.4,
            max_iters: 30,
            eps: 0.01,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub chess: ChessConfig,
    pub grid: GridConfig,
    pub subpix: SubPixConfig,
}
