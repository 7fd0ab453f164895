//! Numerical conditioning helpers shared by the DLT solvers.

use fisheye_core::{Mat3, Pt2};

/// Hartley normalization for 2D points.
///
/// Centers points at the origin and scales so that the mean distance from
/// the origin is `√2`.
///
/// # Returns
///
/// * `Some((normalized_points, transform_matrix))` with
///   `p_norm = T * p_homogeneous`
/// * `None` if input is empty or all points coincide
///
/// # References
///
/// Hartley & Zisserman, "Multiple View Geometry in Computer Vision", 2nd ed.,
/// Algorithm 4.2 (Normalized DLT)
pub fn normalize_points_2d(points: &[Pt2]) -> Option<(Vec<Pt2>, Mat3)> {
    if points.is_empty() {
        return None;
    }

    let n = points.len() as f64;
    let (cx, cy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    let (cx, cy) = (cx / n, cy / n);

    let mean_dist = points
        .iter()
        .map(|p| ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    if mean_dist <= f64::EPSILON {
        return None;
    }

    let scale = std::f64::consts::SQRT_2 / mean_dist;
    let t = Mat3::new(
        scale,
        0.0,
        -scale * cx,
        0.0,
        scale,
        -scale * cy,
        0.0,
        0.0,
        1.0,
    );
    let norm = points
        .iter()
        .map(|p| Pt2::new((p.x - cx) * scale, (p.y - cy) * scale))
        .collect();
    Some((norm, t))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_2d_centering() {
        let points = vec![
            Pt2::new(100.0, 200.0),
            Pt2::new(200.0, 300.0),
            Pt2::new(150.0, 250.0),
        ];
        let (norm, t) = normalize_points_2d(&points).unwrap();

        let cx: f64 = norm.iter().map(|p| p.x).sum::<f64>() / 3.0;
        let cy: f64 = norm.iter().map(|p| p.y).sum::<f64>() / 3.0;
        assert!(cx.abs() < 1e-10 && cy.abs() < 1e-10);

        let mean_dist: f64 = norm.iter().map(|p| p.coords.norm()).sum::<f64>() / 3.0;
        assert!((mean_dist - 2.0_f64.sqrt()).abs() < 1e-10);

        let mapped = t * fisheye_core::to_homogeneous(&points[0]);
        assert!((fisheye_core::from_homogeneous(&mapped) - norm[0]).norm() < 1e-12);
    }

    #[test]
    fn coincident_points_are_rejected() {
        assert!(normalize_points_2d(&[Pt2::new(1.0, 1.0); 4]).is_none());
        assert!(normalize_points_2d(&[]).is_none());
    }
}
