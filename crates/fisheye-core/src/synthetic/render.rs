//! Ray-traced checkerboard images through a fisheye camera.

use crate::{CheckerboardSpec, FisheyeCamera, ImageSize, Iso3, Pt2, Raster, Real};
use anyhow::Result;
use rayon::prelude::*;

/// Appearance of a rendered board.
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    /// Samples per pixel along each axis for pixels that straddle an edge.
    ///
    /// Low values alias edges aligned with the pixel grid and bias
    /// sub-pixel corner estimates.
    pub supersample: usize,
    pub dark: u8,
    pub light: u8,
    /// Intensity of everything outside the board and its white border.
    pub background: u8,
    /// Width of the light border around the outer squares, in cells.
    pub margin_cells: Real,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            supersample: 8,
            dark: 30,
            light: 220,
            background: 220,
            margin_cells: 1.0,
        }
    }
}

/// Render a gray image of the board seen from `cam_from_board`.
///
/// The board has `inner_width + 1` by `inner_height + 1` squares so that its
/// inner corners coincide with [`crate::PatternModel`] points. Pixel
/// `(x, y)` covers `[x - 0.5, x + 0.5] x [y - 0.5, y + 0.5]`.
pub fn render_checkerboard(
    camera: &FisheyeCamera,
    cam_from_board: &Iso3,
    spec: &CheckerboardSpec,
    size: ImageSize,
    opts: &RenderOptions,
) -> Result<Raster> {
    spec.validate()?;
    let ss = opts.supersample.max(1);
    let mut data = vec![0u8; size.area()];

    data.par_chunks_mut(size.width)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, out) in row.iter_mut().enumerate() {
                let (xf, yf) = (x as Real, y as Real);
                let sample = |dx: Real, dy: Real| {
                    let px = Pt2::new(xf + dx, yf + dy);
                    sample_board(camera, cam_from_board, spec, opts, &px)
                };
                // Pixels whose four corners agree lie inside one region.
                let c = sample(-0.5, -0.5);
                let uniform = [(0.5, -0.5), (-0.5, 0.5), (0.5, 0.5)]
                    .iter()
                    .all(|&(dx, dy)| sample(dx, dy) == c);
                let value = if uniform {
                    c
                } else {
                    let mut acc = 0.0;
                    for sy in 0..ss {
                        for sx in 0..ss {
                            acc += sample(
                                (sx as Real + 0.5) / ss as Real - 0.5,
                                (sy as Real + 0.5) / ss as Real - 0.5,
                            );
                        }
                    }
                    acc / (ss * ss) as Real
                };
                *out = value.round().clamp(0.0, 255.0) as u8;
            }
        });

    Ok(Raster::from_gray(size.width, size.height, data)?)
}

fn sample_board(
    camera: &FisheyeCamera,
    cam_from_board: &Iso3,
    spec: &CheckerboardSpec,
    opts: &RenderOptions,
    px: &Pt2,
) -> Real {
    let background = opts.background as Real;
    let Some(ray) = camera.unproject(px) else {
        return background;
    };
    let normal = cam_from_board.rotation * nalgebra::Vector3::z();
    let t = cam_from_board.translation.vector;
    let denom = normal.dot(&ray);
    if denom.abs() < 1e-12 {
        return background;
    }
    let s = normal.dot(&t) / denom;
    if s <= 0.0 {
        return background;
    }
    let p_b = cam_from_board.inverse_transform_point(&(ray * s).into());

    let cell = spec.cell_size;
    let (u, v) = (p_b.x / cell, p_b.y / cell);
    let (w, h) = (spec.inner_width as Real, spec.inner_height as Real);
    let m = opts.margin_cells;
    if u < -1.0 - m || v < -1.0 - m || u > w + m || v > h + m {
        return background;
    }
    if u < -1.0 || v < -1.0 || u > w || v > h {
        return opts.light as Real;
    }
    let parity = (u.floor() as i64 + v.floor() as i64).rem_euclid(2);
    if parity == 0 {
        opts.dark as Real
    } else {
        opts.light as Real
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Intrinsics, KannalaBrandt4, PatternModel};
    use nalgebra::{Translation3, UnitQuaternion};

    #[test]
    fn renders_checker_pattern_around_projected_corners() {
        let spec = CheckerboardSpec::new(5, 4);
        let model = PatternModel::new(spec).unwrap();
        let cam = FisheyeCamera::new(
            Intrinsics::new(300.0, 300.0, 160.0, 120.0),
            KannalaBrandt4::default(),
        );
        let pose = Iso3::from_parts(
            Translation3::new(-2.0, -1.5, 12.0),
            UnitQuaternion::identity(),
        );
        let size = ImageSize::new(320, 240);
        let img = render_checkerboard(&cam, &pose, &spec, size, &RenderOptions::default()).unwrap();

        // Opposite quadrants around an inner corner share a color.
        let c = cam.project(&model.object_points()[model.index(2, 1)], &pose).unwrap();
        let at = |dx: f64, dy: f64| {
            img.pixel((c.x + dx).round() as usize, (c.y + dy).round() as usize)[0]
        };
        let d = 6.0;
        assert_eq!(at(-d, -d), at(d, d));
        assert_eq!(at(d, -d), at(-d, d));
        assert_ne!(at(-d, -d), at(d, -d));
    }

    #[test]
    fn edge_through_pixel_centre_is_averaged() {
        let spec = CheckerboardSpec::new(5, 4);
        let cam = FisheyeCamera::new(
            Intrinsics::new(300.0, 300.0, 160.0, 120.0),
            KannalaBrandt4::default(),
        );
        // Column u = 2 of the board projects onto x = cx.
        let pose = Iso3::from_parts(
            Translation3::new(-2.0, -1.5, 12.0),
            UnitQuaternion::identity(),
        );
        let opts = RenderOptions::default();
        let img =
            render_checkerboard(&cam, &pose, &spec, ImageSize::new(320, 240), &opts).unwrap();
        let mixed = (opts.dark as u32 + opts.light as u32) / 2;
        assert_eq!(img.pixel(160, 120)[0] as u32, mixed);
        assert_eq!(img.pixel(150, 120)[0], opts.dark);
        assert_eq!(img.pixel(170, 120)[0], opts.light);
    }
}
