use crate::UndistortionMap;
use fisheye_core::{CalibError, Raster};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Fill rule for output pixels whose source falls outside the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Border {
    /// Per-channel constant; channels beyond the raster's are ignored.
    Constant([u8; 4]),
    /// Clamp the source coordinate to the nearest edge pixel.
    Replicate,
}

impl Default for Border {
    fn default() -> Self {
        Border::Constant([0; 4])
    }
}

/// Bilinear resampling of `src` through `map`.
///
/// Sources outside `[0, w-1] × [0, h-1]`, and `NaN` entries, take the border
/// value. Rows are filled in parallel; the result does not depend on the
/// thread count.
pub fn resample(
    src: &Raster,
    map: &UndistortionMap,
    border: &Border,
) -> Result<Raster, CalibError> {
    let ch = src.channels();
    let (w, h) = (src.width(), src.height());
    let max_x = (w - 1) as f32;
    let max_y = (h - 1) as f32;
    let data = src.data();
    let stride = src.stride();
    let out_w = map.width();
    let mut out = vec![0u8; out_w * map.height() * ch];

    out.par_chunks_mut(out_w * ch)
        .enumerate()
        .for_each(|(v, row)| {
            for (u, px) in row.chunks_mut(ch).enumerate() {
                let [mut x, mut y] = map.get(u, v);
                if x.is_nan() || y.is_nan() {
                    fill_border(px, border);
                    continue;
                }
                match border {
                    Border::Replicate => {
                        x = x.clamp(0.0, max_x);
                        y = y.clamp(0.0, max_y);
                    }
                    Border::Constant(_) => {
                        if x < 0.0 || y < 0.0 || x > max_x || y > max_y {
                            fill_border(px, border);
                            continue;
                        }
                    }
                }

                let x0 = x.floor() as usize;
                let y0 = y.floor() as usize;
                let x1 = (x0 + 1).min(w - 1);
                let y1 = (y0 + 1).min(h - 1);
                let fx = x - x0 as f32;
                let fy = y - y0 as f32;
                let at = |xx: usize, yy: usize, c: usize| data[yy * stride + xx * ch + c] as f32;
                for (c, o) in px.iter_mut().enumerate() {
                    let top = at(x0, y0, c) * (1.0 - fx) + at(x1, y0, c) * fx;
                    let bottom = at(x0, y1, c) * (1.0 - fx) + at(x1, y1, c) * fx;
                    *o = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
                }
            }
        });

    Raster::new(out_w, map.height(), ch, out)
}

#[inline]
fn fill_border(px: &mut [u8], border: &Border) {
    match border {
        Border::Constant(value) => {
            for (o, v) in px.iter_mut().zip(value) {
                *o = *v;
            }
        }
        Border::Replicate => px.fill(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fisheye_core::{FisheyeCamera, ImageSize, Intrinsics, KannalaBrandt4};

    #[test]
    fn outside_pixels_take_border_value() {
        let cam = FisheyeCamera::new(
            Intrinsics::new(40.0, 40.0, 10.0, 10.0),
            KannalaBrandt4::default(),
        );
        // Output camera shifted so most rays land left of the source.
        let new_k = Intrinsics::new(40.0, 40.0, 200.0, 10.0);
        let map = UndistortionMap::build(&cam, &new_k, ImageSize::new(21, 21)).unwrap();
        let src = Raster::filled(21, 21, 3, 100).unwrap();
        let out = resample(&src, &map, &Border::Constant([1, 2, 3, 4])).unwrap();
        assert_eq!(out.channels(), 3);
        assert_eq!(out.pixel(0, 10), &[1, 2, 3]);
    }

    #[test]
    fn replicate_border_clamps() {
        let cam = FisheyeCamera::new(
            Intrinsics::new(40.0, 40.0, 10.0, 10.0),
            KannalaBrandt4::default(),
        );
        let new_k = Intrinsics::new(40.0, 40.0, 200.0, 10.0);
        let map = UndistortionMap::build(&cam, &new_k, ImageSize::new(21, 21)).unwrap();
        let src = Raster::filled(21, 21, 1, 77).unwrap();
        let out = resample(&src, &map, &Border::Replicate).unwrap();
        assert_eq!(out.pixel(0, 10), &[77]);
    }
}
