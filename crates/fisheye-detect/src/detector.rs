use crate::{
    assemble_grid, chess_response, find_candidates, half_window, refine_corner, DetectError,
    DetectorConfig, ImageF32,
};
use fisheye_core::{CheckerboardSpec, CornerSet, Pt2, Raster, Real};
use log::debug;
use serde::{Deserialize, Serialize};

/// Corners of one image plus detection quality signals.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CornerDetection {
    pub corners: CornerSet,
    /// Corners whose sub-pixel refinement did not reach `eps`.
    pub unconverged: usize,
    /// Median distance between neighbouring corners, in pixels.
    pub spacing: Real,
}

/// Locate the `inner_width × inner_height` corner grid of `spec` in `raster`.
///
/// Corners are ordered like [`fisheye_core::PatternModel`] points: row-major,
/// `j` outer, with the `i` axis pointing as far right as possible in the image.
pub fn detect_corners(
    raster: &Raster,
    spec: &CheckerboardSpec,
    cfg: &DetectorConfig,
) -> Result<CornerDetection, DetectError> {
    spec.validate()?;
    let radius = cfg.chess.ring_radius() as usize;
    if raster.width() <= 2 * radius + 2 || raster.height() <= 2 * radius + 2 {
        return Err(DetectError::NotFound(format!(
            "image {}x{} is too small for the detector",
            raster.width(),
            raster.height()
        )));
    }

    let gray = ImageF32::from_raster(raster);
    let smoothed = gray.box_blur(cfg.chess.blur_radius);
    let response = chess_response(&smoothed, cfg.chess.ring_radius());
    let candidates = find_candidates(&response, &cfg.chess);
    debug!(
        "chess: {} candidates, max response {:.1}",
        candidates.len(),
        response.max()
    );

    let grid = assemble_grid(&candidates, spec.inner_width, spec.inner_height, &cfg.grid)?;

    let mut unconverged = 0;
    let points: Vec<Pt2> = grid
        .points
        .iter()
        .zip(&grid.spacing)
        .map(|(p, &spacing)| {
            let hw = half_window(&cfg.subpix, spacing);
            let r = refine_corner(&gray, p.x, p.y, hw, &cfg.subpix);
            if !r.converged {
                unconverged += 1;
            }
            Pt2::new(r.x as Real, r.y as Real)
        })
        .collect();
    if unconverged > 0 {
        debug!("subpix: {unconverged} of {} corners did not converge", points.len());
    }

    Ok(CornerDetection {
        corners: CornerSet::new(points, spec)?,
        unconverged,
        spacing: grid.median_spacing() as Real,
    })
}
