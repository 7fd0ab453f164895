use crate::math::normalize_points_2d;
use fisheye_core::{from_homogeneous, to_homogeneous, Mat3, Pt2};
use nalgebra::DMatrix;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HomographyError {
    #[error("need at least 4 point correspondences, got {0}")]
    NotEnoughPoints(usize),
    #[error("point sets differ in length: {0} vs {1}")]
    LengthMismatch(usize, usize),
    #[error("degenerate point configuration")]
    Degenerate,
    #[error("svd failed")]
    SvdFailed,
}

/// Estimate H such that `image ~ H * world` using the normalised DLT.
///
/// Both point sets are Hartley-normalised before building the 2n x 9
/// design matrix; the result is denormalised and scaled so that
/// `H[2,2] = 1`.
pub fn dlt_homography(world: &[Pt2], image: &[Pt2]) -> Result<Mat3, HomographyError> {
    let n = world.len();
    if image.len() != n {
        return Err(HomographyError::LengthMismatch(n, image.len()));
    }
    if n < 4 {
        return Err(HomographyError::NotEnoughPoints(n));
    }

    let (world_n, t_w) = normalize_points_2d(world).ok_or(HomographyError::Degenerate)?;
    let (image_n, t_i) = normalize_points_2d(image).ok_or(HomographyError::Degenerate)?;

    let mut a = DMatrix::<f64>::zeros(2 * n.max(5), 9);
    for (i, (pw, pi)) in world_n.iter().zip(image_n.iter()).enumerate() {
        let (x, y) = (pw.x, pw.y);
        let (u, v) = (pi.x, pi.y);
        let r0 = 2 * i;
        let r1 = 2 * i + 1;

        a[(r0, 0)] = -x;
        a[(r0, 1)] = -y;
        a[(r0, 2)] = -1.0;
        a[(r0, 6)] = u * x;
        a[(r0, 7)] = u * y;
        a[(r0, 8)] = u;

        a[(r1, 3)] = -x;
        a[(r1, 4)] = -y;
        a[(r1, 5)] = -1.0;
        a[(r1, 6)] = v * x;
        a[(r1, 7)] = v * y;
        a[(r1, 8)] = v;
    }

    // Null vector of A: right singular vector of the smallest singular value.
    let svd = a.svd(false, true);
    let v_t = svd.v_t.ok_or(HomographyError::SvdFailed)?;
    let (min_idx, _) = svd
        .singular_values
        .iter()
        .enumerate()
        .fold((0, f64::INFINITY), |best, (i, &s)| if s < best.1 { (i, s) } else { best });
    let h = v_t.row(min_idx);
    let h_n = Mat3::from_fn(|r, c| h[3 * r + c]);

    let t_i_inv = t_i.try_inverse().ok_or(HomographyError::Degenerate)?;
    let mut h_mat = t_i_inv * h_n * t_w;

    let scale = h_mat[(2, 2)];
    if scale.abs() > f64::EPSILON {
        h_mat /= scale;
    }
    if h_mat.iter().any(|v| !v.is_finite()) {
        return Err(HomographyError::Degenerate);
    }
    Ok(h_mat)
}

/// Apply a homography to a point.
pub fn apply_homography(h: &Mat3, p: &Pt2) -> Pt2 {
    from_homogeneous(&(h * to_homogeneous(p)))
}
