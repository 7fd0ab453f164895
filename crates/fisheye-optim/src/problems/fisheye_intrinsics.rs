//! Joint refinement of fisheye intrinsics, distortion and per-view poses.
//!
//! Parameters live in one flat vector (see [`ParamLayout`]):
//!
//! | offset          | meaning                       |
//! |-----------------|-------------------------------|
//! | `0..4`          | `fx, fy, cx, cy`              |
//! | `4..8`          | `k1, k2, k3, k4`              |
//! | `8 + 6v..+3`    | rotation vector of view `v`   |
//! | `8 + 6v+3..+6`  | translation of view `v`       |
//!
//! Residuals are `observed - projected` in pixels, two rows per corner,
//! views stacked in order. The Jacobian is exact, from forward-mode AD over
//! each view's local camera and pose block. Parameters held fixed by a [`FixMask`] are
//! removed from the solver's vector and restored by [`FisheyeIntrinsicsProblem::expand`].

use crate::factors::{view_residuals_generic, CAMERA_DIM};
use crate::jacobian_ad::{build_local_params, scatter_jacobian, view_jacobian, ViewJacobian};
use crate::{NllsProblem, NllsSolverBackend, SolveError, SolveOptions, SolveReport};
use fisheye_core::{
    iso_from_rotvec, rotvec_from_iso, FisheyeCamera, Intrinsics, Iso3, KannalaBrandt4, Pt2, Pt3,
    Real, Vec3,
};
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Offsets into the flat parameter vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamLayout {
    n_views: usize,
}

impl ParamLayout {
    pub const FX: usize = 0;
    pub const FY: usize = 1;
    pub const CX: usize = 2;
    pub const CY: usize = 3;
    pub const K1: usize = 4;
    pub const SHARED: usize = 8;
    pub const POSE: usize = 6;

    pub fn new(n_views: usize) -> Self {
        Self { n_views }
    }

    pub fn n_views(&self) -> usize {
        self.n_views
    }

    pub fn len(&self) -> usize {
        Self::SHARED + Self::POSE * self.n_views
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First index of the pose block of `view`.
    #[inline]
    pub fn pose_offset(&self, view: usize) -> usize {
        Self::SHARED + Self::POSE * view
    }

    /// View owning parameter `idx`, or `None` for shared parameters.
    #[inline]
    pub fn view_of(&self, idx: usize) -> Option<usize> {
        (idx >= Self::SHARED).then(|| (idx - Self::SHARED) / Self::POSE)
    }

    pub fn pack(
        &self,
        camera: &FisheyeCamera,
        poses: &[Iso3],
    ) -> Result<DVector<Real>, SolveError> {
        if poses.len() != self.n_views {
            return Err(SolveError::InvalidProblem(format!(
                "expected {} poses, got {}",
                self.n_views,
                poses.len()
            )));
        }
        let mut x = DVector::zeros(self.len());
        x[Self::FX] = camera.k.fx;
        x[Self::FY] = camera.k.fy;
        x[Self::CX] = camera.k.cx;
        x[Self::CY] = camera.k.cy;
        for (i, k) in camera.dist.to_array().iter().enumerate() {
            x[Self::K1 + i] = *k;
        }
        for (v, pose) in poses.iter().enumerate() {
            let (r, t) = rotvec_from_iso(pose);
            let o = self.pose_offset(v);
            x.fixed_rows_mut::<3>(o).copy_from(&r);
            x.fixed_rows_mut::<3>(o + 3).copy_from(&t);
        }
        Ok(x)
    }

    pub fn camera(&self, x: &DVector<Real>) -> FisheyeCamera {
        FisheyeCamera::new(
            Intrinsics::new(x[Self::FX], x[Self::FY], x[Self::CX], x[Self::CY]),
            KannalaBrandt4::new(x[Self::K1], x[Self::K1 + 1], x[Self::K1 + 2], x[Self::K1 + 3]),
        )
    }

    pub fn pose(&self, x: &DVector<Real>, view: usize) -> Iso3 {
        let o = self.pose_offset(view);
        let r = Vec3::new(x[o], x[o + 1], x[o + 2]);
        let t = Vec3::new(x[o + 3], x[o + 4], x[o + 5]);
        iso_from_rotvec(&r, &t)
    }

    pub fn unpack(&self, x: &DVector<Real>) -> (FisheyeCamera, Vec<Iso3>) {
        let poses = (0..self.n_views).map(|v| self.pose(x, v)).collect();
        (self.camera(x), poses)
    }
}

/// Shared parameters held at their initial value during a solve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixMask {
    pub focal: bool,
    pub principal_point: bool,
    pub distortion: [bool; 4],
}

impl FixMask {
    /// Hold all four distortion coefficients.
    pub fn distortion_only() -> Self {
        Self {
            distortion: [true; 4],
            ..Self::default()
        }
    }

    /// Hold `k3` and `k4`, solving only `k1` and `k2`.
    ///
    /// The θ⁷ and θ⁹ terms trade off against θ³ and θ⁵ unless the views reach
    /// far off-axis; with this mask the low-order pair is well determined.
    pub fn high_order_distortion() -> Self {
        Self {
            distortion: [false, false, true, true],
            ..Self::default()
        }
    }

    pub fn union(self, other: Self) -> Self {
        let mut distortion = self.distortion;
        for (d, o) in distortion.iter_mut().zip(other.distortion) {
            *d |= o;
        }
        Self {
            focal: self.focal || other.focal,
            principal_point: self.principal_point || other.principal_point,
            distortion,
        }
    }

    /// Whether shared parameter `idx` is held fixed.
    pub fn is_fixed(&self, idx: usize) -> bool {
        match idx {
            ParamLayout::FX | ParamLayout::FY => self.focal,
            ParamLayout::CX | ParamLayout::CY => self.principal_point,
            i if (ParamLayout::K1..ParamLayout::SHARED).contains(&i) => {
                self.distortion[i - ParamLayout::K1]
            }
            _ => false,
        }
    }
}

/// Reprojection problem over views of one planar pattern.
#[derive(Debug, Clone)]
pub struct FisheyeIntrinsicsProblem {
    object_points: Vec<Pt3>,
    observations: Vec<Vec<Pt2>>,
    layout: ParamLayout,
    free: Vec<usize>,
    base: DVector<Real>,
}

impl FisheyeIntrinsicsProblem {
    /// Build the problem around the full initial vector `initial`.
    ///
    /// Every view must observe all `object_points`, in order.
    pub fn new(
        object_points: Vec<Pt3>,
        observations: Vec<Vec<Pt2>>,
        initial: DVector<Real>,
        mask: FixMask,
    ) -> Result<Self, SolveError> {
        if observations.is_empty() {
            return Err(SolveError::InvalidProblem("need at least one view".into()));
        }
        if object_points.len() < 4 {
            return Err(SolveError::InvalidProblem(format!(
                "need at least 4 pattern points, got {}",
                object_points.len()
            )));
        }
        if let Some((v, obs)) = observations
            .iter()
            .enumerate()
            .find(|(_, obs)| obs.len() != object_points.len())
        {
            return Err(SolveError::InvalidProblem(format!(
                "view {v} has {} corners, pattern has {}",
                obs.len(),
                object_points.len()
            )));
        }
        let layout = ParamLayout::new(observations.len());
        if initial.len() != layout.len() {
            return Err(SolveError::DimensionMismatch {
                expected: layout.len(),
                got: initial.len(),
            });
        }
        let free = (0..layout.len()).filter(|&i| !mask.is_fixed(i)).collect();
        Ok(Self {
            object_points,
            observations,
            layout,
            free,
            base: initial,
        })
    }

    pub fn layout(&self) -> ParamLayout {
        self.layout
    }

    pub fn num_views(&self) -> usize {
        self.observations.len()
    }

    /// Full-vector indices of the free parameters, in solver order.
    pub fn free_indices(&self) -> &[usize] {
        &self.free
    }

    /// Free parameters of the initial vector.
    pub fn initial_free(&self) -> DVector<Real> {
        DVector::from_iterator(self.free.len(), self.free.iter().map(|&i| self.base[i]))
    }

    /// Full parameter vector with `x_free` substituted into the free slots.
    pub fn expand(&self, x_free: &DVector<Real>) -> DVector<Real> {
        let mut full = self.base.clone();
        for (k, &i) in self.free.iter().enumerate() {
            full[i] = x_free[k];
        }
        full
    }

    fn rows_per_view(&self) -> usize {
        2 * self.object_points.len()
    }

    /// Residuals for a full parameter vector.
    pub fn residuals_full(&self, full: &DVector<Real>) -> DVector<Real> {
        let mut r = Vec::with_capacity(self.rows_per_view() * self.num_views());
        for (v, obs) in self.observations.iter().enumerate() {
            let local = build_local_params(full, &self.layout, v);
            r.extend(view_residuals_generic(local.as_slice(), &self.object_points, obs));
        }
        DVector::from_vec(r)
    }

    /// Condition number of the 6-column pose Jacobian of `view`.
    pub fn pose_condition(&self, full: &DVector<Real>, view: usize) -> Real {
        let local = build_local_params(full, &self.layout, view);
        let (_, j) = view_jacobian(&self.object_points, &self.observations[view], &local);
        let sv = j.columns(CAMERA_DIM, ParamLayout::POSE).clone_owned().singular_values();
        let max = sv.max();
        let min = sv.min();
        if min <= 0.0 || !min.is_finite() {
            Real::INFINITY
        } else {
            max / min
        }
    }

    /// Per-corner reprojection distances, grouped by view.
    pub fn reprojection_errors(&self, full: &DVector<Real>) -> Vec<Vec<Real>> {
        let r = self.residuals_full(full);
        r.as_slice()
            .chunks(self.rows_per_view())
            .map(|view| view.chunks(2).map(|xy| xy[0].hypot(xy[1])).collect())
            .collect()
    }
}

impl NllsProblem for FisheyeIntrinsicsProblem {
    fn num_params(&self) -> usize {
        self.free.len()
    }

    fn num_residuals(&self) -> usize {
        self.rows_per_view() * self.num_views()
    }

    fn residuals(&self, x: &DVector<Real>) -> DVector<Real> {
        self.residuals_full(&self.expand(x))
    }

    fn jacobian(&self, x: &DVector<Real>) -> DMatrix<Real> {
        let full = self.expand(x);
        let mut col_of = vec![None; self.layout.len()];
        for (col, &idx) in self.free.iter().enumerate() {
            col_of[idx] = Some(col);
        }

        // Views are differentiated in parallel and scattered in view order.
        let blocks: Vec<ViewJacobian> = (0..self.num_views())
            .into_par_iter()
            .map(|v| {
                let local = build_local_params(&full, &self.layout, v);
                view_jacobian(&self.object_points, &self.observations[v], &local).1
            })
            .collect();

        let rows = self.rows_per_view();
        let mut j = DMatrix::zeros(self.num_residuals(), self.free.len());
        for (v, block) in blocks.iter().enumerate() {
            scatter_jacobian(&mut j, block, v * rows, v, &self.layout, &col_of);
        }
        j
    }
}

/// Refined camera, poses and solver report.
#[derive(Debug, Clone)]
pub struct FisheyeEstimate {
    pub camera: FisheyeCamera,
    pub poses: Vec<Iso3>,
    /// Full parameter vector at the solution.
    pub params: DVector<Real>,
    pub report: SolveReport,
}

/// Run `backend` on `problem` starting from its initial vector.
pub fn refine_fisheye_intrinsics<B: NllsSolverBackend>(
    backend: &B,
    problem: &FisheyeIntrinsicsProblem,
    opts: &SolveOptions,
) -> Result<FisheyeEstimate, SolveError> {
    let (x_free, report) = backend.solve(problem, problem.initial_free(), opts)?;
    let params = problem.expand(&x_free);
    let (camera, poses) = problem.layout().unpack(&params);
    Ok(FisheyeEstimate {
        camera,
        poses,
        params,
        report,
    })
}
