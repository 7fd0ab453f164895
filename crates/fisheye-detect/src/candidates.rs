use crate::{ChessConfig, ResponseMap};

/// Corner candidate in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    pub x: f32,
    pub y: f32,
    pub response: f32,
}

/// Threshold, non-maximum suppression and 5×5 centre-of-mass refinement.
///
/// Candidates are returned strongest first.
pub fn find_candidates(resp: &ResponseMap, cfg: &ChessConfig) -> Vec<Candidate> {
    let max = resp.max();
    let threshold = (cfg.threshold_rel * max).max(cfg.threshold_abs);
    if max.is_nan() || max <= threshold.max(0.0) {
        return Vec::new();
    }

    let r = cfg.nms_radius as isize;
    let (w, h) = (resp.w as isize, resp.h as isize);
    let mut out = Vec::new();

    for y in 0..h {
        for x in 0..w {
            let v = resp.at(x as usize, y as usize);
            if v <= threshold {
                continue;
            }
            let mut is_max = true;
            let mut cluster = 0;
            'window: for ny in (y - r).max(0)..=(y + r).min(h - 1) {
                for nx in (x - r).max(0)..=(x + r).min(w - 1) {
                    if nx == x && ny == y {
                        continue;
                    }
                    let n = resp.at(nx as usize, ny as usize);
                    // Ties go to the earliest pixel in scan order.
                    if n > v || (n == v && (ny, nx) < (y, x)) {
                        is_max = false;
                        break 'window;
                    }
                    if n > 0.0 {
                        cluster += 1;
                    }
                }
            }
            if !is_max || cluster < cfg.min_cluster_size {
                continue;
            }
            let (cx, cy) = center_of_mass(resp, x, y);
            out.push(Candidate {
                x: cx,
                y: cy,
                response: v,
            });
        }
    }

    out.sort_by(|a, b| b.response.total_cmp(&a.response));
    out
}

/// Weighted centroid of the positive response in the 5×5 window around `(x, y)`.
fn center_of_mass(resp: &ResponseMap, x: isize, y: isize) -> (f32, f32) {
    let (mut sx, mut sy, mut sw) = (0.0f32, 0.0f32, 0.0f32);
    for dy in -2..=2 {
        for dx in -2..=2 {
            let (nx, ny) = (x + dx, y + dy);
            if nx < 0 || ny < 0 || nx >= resp.w as isize || ny >= resp.h as isize {
                continue;
            }
            let v = resp.at(nx as usize, ny as usize).max(0.0);
            sx += v * nx as f32;
            sy += v * ny as f32;
            sw += v;
        }
    }
    if sw > 0.0 {
        (sx / sw, sy / sw)
    } else {
        (x as f32, y as f32)
    }
}
