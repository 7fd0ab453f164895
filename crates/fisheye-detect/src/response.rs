//! Dense ChESS ("Chess-board Extraction by Subtraction and Summation") response.
//!
//! For the 16 ring samples `s[0..16]` around a pixel:
//!
//! ```text
//! sum  = Σ_{n<4} |s[n] + s[n+8] - s[n+4] - s[n+12]|
//! diff = Σ_{n<8} |s[n] - s[n+8]|
//! mean = 16 · |mean(ring) - mean(local cross)|
//! R    = sum - diff - mean
//! ```
//!
//! X-junctions give a strong positive response; edges, blobs and L-corners
//! are pushed negative by the `diff` and `mean` terms.

use crate::ImageF32;
use rayon::prelude::*;

/// Ring sample offsets `(dx, dy)` at radius 5, clockwise from the top.
pub const RING5: [(i32, i32); 16] = [
    (0, -5),
    (2, -5),
    (3, -3),
    (5, -2),
    (5, 0),
    (5, 2),
    (3, 3),
    (2, 5),
    (0, 5),
    (-2, 5),
    (-3, 3),
    (-5, 2),
    (-5, 0),
    (-5, -2),
    (-3, -3),
    (-2, -5),
];

/// Ring sample offsets at radius 10.
pub const RING10: [(i32, i32); 16] = [
    (0, -10),
    (4, -9),
    (7, -7),
    (9, -4),
    (10, 0),
    (9, 4),
    (7, 7),
    (4, 9),
    (0, 10),
    (-4, 9),
    (-7, 7),
    (-9, 4),
    (-10, 0),
    (-9, -4),
    (-7, -7),
    (-4, -9),
];

pub fn ring(radius: u32) -> &'static [(i32, i32); 16] {
    if radius >= 10 {
        &RING10
    } else {
        &RING5
    }
}

/// Dense response map in row-major layout.
#[derive(Clone, Debug)]
pub struct ResponseMap {
    pub w: usize,
    pub h: usize,
    pub data: Vec<f32>,
}

impl ResponseMap {
    #[inline]
    pub fn at(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.w + x]
    }

    pub fn max(&self) -> f32 {
        self.data.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }
}

/// ChESS response at one pixel. `(x, y)` must be at least `radius` pixels
/// from every border.
#[inline]
fn response_at(img: &ImageF32, ring: &[(i32, i32); 16], x: usize, y: usize) -> f32 {
    let mut s = [0.0f32; 16];
    for (v, (dx, dy)) in s.iter_mut().zip(ring) {
        *v = img.get((x as i32 + dx) as usize, (y as i32 + dy) as usize);
    }

    let sum_resp: f32 = (0..4)
        .map(|n| (s[n] + s[n + 8] - s[n + 4] - s[n + 12]).abs())
        .sum();
    let diff_resp: f32 = (0..8).map(|n| (s[n] - s[n + 8]).abs()).sum();

    let ring_mean = s.iter().sum::<f32>() / 16.0;
    let local_mean = (img.get(x, y)
        + img.get(x - 1, y)
        + img.get(x + 1, y)
        + img.get(x, y - 1)
        + img.get(x, y + 1))
        / 5.0;

    sum_resp - diff_resp - 16.0 * (ring_mean - local_mean).abs()
}

/// Response for every pixel; a border of `radius` pixels is left at zero.
pub fn chess_response(img: &ImageF32, radius: u32) -> ResponseMap {
    let ring = ring(radius);
    let r = radius as usize;
    let mut data = vec![0.0f32; img.w * img.h];
    if img.w > 2 * r && img.h > 2 * r {
        data.par_chunks_mut(img.w)
            .enumerate()
            .filter(|(y, _)| *y >= r && *y < img.h - r)
            .for_each(|(y, row)| {
                for (x, out) in row.iter_mut().enumerate().take(img.w - r).skip(r) {
                    *out = response_at(img, ring, x, y);
                }
            });
    }
    ResponseMap {
        w: img.w,
        h: img.h,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Axis-aligned X-junction centred between pixels at `(cx, cy)`.
    fn x_junction(w: usize, h: usize, cx: f32, cy: f32) -> ImageF32 {
        let mut img = ImageF32::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let dark = ((x as f32) < cx) ^ ((y as f32) < cy);
                img.set(x, y, if dark { 30.0 } else { 220.0 });
            }
        }
        img
    }

    #[test]
    fn rings_have_expected_radius() {
        for (dx, dy) in RING5 {
            let r = ((dx * dx + dy * dy) as f32).sqrt();
            assert!((4.0..=6.0).contains(&r));
        }
        for (dx, dy) in RING10 {
            let r = ((dx * dx + dy * dy) as f32).sqrt();
            assert!((9.0..=11.0).contains(&r));
        }
    }

    #[test]
    fn x_junction_peaks_at_centre() {
        let img = x_junction(41, 41, 20.5, 20.5);
        let resp = chess_response(&img, 5);
        let (best, _) = resp
            .data
            .iter()
            .enumerate()
            .fold((0, f32::MIN), |acc, (i, &v)| if v > acc.1 { (i, v) } else { acc });
        let (bx, by) = (best % 41, best / 41);
        assert!((bx as i32 - 20).abs() <= 1 && (by as i32 - 20).abs() <= 1, "peak at {bx},{by}");
        assert!(resp.max() > 300.0);
    }

    #[test]
    fn straight_edge_is_not_a_corner() {
        let mut img = ImageF32::new(41, 41);
        for y in 0..41 {
            for x in 0..41 {
                img.set(x, y, if x < 20 { 30.0 } else { 220.0 });
            }
        }
        let resp = chess_response(&img, 5);
        assert!(resp.max() <= 0.0, "max={}", resp.max());
    }

    #[test]
    fn flat_image_has_zero_response() {
        let img = ImageF32 {
            w: 30,
            h: 30,
            data: vec![128.0; 900],
        };
        assert_eq!(chess_response(&img, 10).max(), 0.0);
    }
}
