//! Gradient-orthogonality corner refinement.
//!
//! At a saddle point `q`, every image gradient `g(p)` in a neighbourhood is
//! orthogonal to `p - q`. Each iteration solves the Gaussian-weighted normal
//! equations `Σ g gᵀ · q = Σ g gᵀ · p` for a new `q`.

use crate::{ImageF32, SubPixConfig};
use nalgebra::{Matrix2, Vector2};

/// Outcome of one refinement.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Refined {
    pub x: f32,
    pub y: f32,
    pub converged: bool,
}

/// Window half-size for a corner whose nearest grid neighbour is `spacing`
/// pixels away.
pub fn half_window(cfg: &SubPixConfig, spacing: f32) -> usize {
    let limit = (cfg.spacing_fraction * spacing).floor().max(0.0) as usize;
    cfg.half_window.min(limit).max(2)
}

/// Refine `(x0, y0)` with a `(2 hw + 1)²` window.
///
/// Returns the coarse position, flagged unconverged, if the estimate leaves
/// the window or the structure tensor is singular.
pub fn refine_corner(img: &ImageF32, x0: f32, y0: f32, hw: usize, cfg: &SubPixConfig) -> Refined {
    let hw_i = hw as i32;
    let inv_sigma2 = 1.0 / (hw * hw) as f32;
    let mut weights = Vec::with_capacity((2 * hw + 1) * (2 * hw + 1));
    for dy in -hw_i..=hw_i {
        for dx in -hw_i..=hw_i {
            let r2 = (dx * dx + dy * dy) as f32;
            weights.push((-r2 * inv_sigma2).exp());
        }
    }

    let start = Vector2::new(x0, y0);
    let mut q = start;
    let mut converged = false;
    let eps2 = cfg.eps * cfg.eps;

    for _ in 0..cfg.max_iters.max(1) {
        let mut a = Matrix2::<f32>::zeros();
        let mut bb = Vector2::<f32>::zeros();
        let mut k = 0;
        for dy in -hw_i..=hw_i {
            for dx in -hw_i..=hw_i {
                let m = weights[k];
                k += 1;
                let (px, py) = (q.x + dx as f32, q.y + dy as f32);
                let gx = 0.5 * (img.sample(px + 1.0, py) - img.sample(px - 1.0, py));
                let gy = 0.5 * (img.sample(px, py + 1.0) - img.sample(px, py - 1.0));
                let (gxx, gxy, gyy) = (gx * gx * m, gx * gy * m, gy * gy * m);
                a[(0, 0)] += gxx;
                a[(0, 1)] += gxy;
                a[(1, 1)] += gyy;
                bb.x += gxx * dx as f32 + gxy * dy as f32;
                bb.y += gxy * dx as f32 + gyy * dy as f32;
            }
        }
        a[(1, 0)] = a[(0, 1)];
        let Some(inv) = a.try_inverse() else {
            break;
        };
        let delta = inv * bb;
        if !delta.x.is_finite() || !delta.y.is_finite() {
            break;
        }
        q += delta;
        if delta.norm_squared() <= eps2 {
            converged = true;
            break;
        }
    }

    if (q - start).abs().max() > hw as f32 {
        return Refined {
            x: x0,
            y: y0,
            converged: false,
        };
    }
    Refined {
        x: q.x,
        y: q.y,
        converged,
    }
}
