//! Per-view Jacobian assembly using `num-dual`.
//!
//! Each view depends only on the shared camera block and its own 6-DoF pose,
//! so forward-mode AD runs over a 14-entry local vector per view. The local
//! Jacobians are then scattered into the free columns of the global matrix.

use crate::factors::{view_residuals_generic, CAMERA_DIM, LOCAL_DIM};
use crate::ParamLayout;
use fisheye_core::{Pt2, Pt3, Real};
use nalgebra::{Const, DVector, Dyn, OMatrix, SVector};
use num_dual::{jacobian, DualSVec64};

/// Jacobian of one view's residuals w.r.t. its local vector.
pub(crate) type ViewJacobian = OMatrix<Real, Dyn, Const<LOCAL_DIM>>;

/// Full-vector index of local entry `local_idx` of `view`.
#[inline]
pub(crate) fn global_index(layout: &ParamLayout, view: usize, local_idx: usize) -> usize {
    if local_idx < CAMERA_DIM {
        local_idx
    } else {
        layout.pose_offset(view) + local_idx - CAMERA_DIM
    }
}

pub(crate) fn build_local_params(
    full: &DVector<Real>,
    layout: &ParamLayout,
    view: usize,
) -> SVector<Real, LOCAL_DIM> {
    SVector::from_fn(|i, _| full[global_index(layout, view, i)])
}

/// Residuals and local Jacobian of one view.
pub(crate) fn view_jacobian(
    object_points: &[Pt3],
    observations: &[Pt2],
    local: &SVector<Real, LOCAL_DIM>,
) -> (DVector<Real>, ViewJacobian) {
    jacobian(
        |p: SVector<DualSVec64<LOCAL_DIM>, LOCAL_DIM>| {
            DVector::from_vec(view_residuals_generic(
                p.as_slice(),
                object_points,
                observations,
            ))
        },
        *local,
    )
}

/// Copy the columns of `j_view` whose global parameter is free into `j_global`.
///
/// `col_of` maps full-vector indices to solver columns.
pub(crate) fn scatter_jacobian(
    j_global: &mut nalgebra::DMatrix<Real>,
    j_view: &ViewJacobian,
    row_offset: usize,
    view: usize,
    layout: &ParamLayout,
    col_of: &[Option<usize>],
) {
    for local_idx in 0..LOCAL_DIM {
        let Some(col) = col_of[global_index(layout, view, local_idx)] else {
            continue;
        };
        for r in 0..j_view.nrows() {
            j_global[(row_offset + r, col)] = j_view[(r, local_idx)];
        }
    }
}
