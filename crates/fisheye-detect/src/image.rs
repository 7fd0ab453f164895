use fisheye_core::Raster;
use rayon::prelude::*;

/// Row-major single-channel float image.
#[derive(Clone, Debug)]
pub struct ImageF32 {
    pub w: usize,
    pub h: usize,
    pub data: Vec<f32>,
}

impl ImageF32 {
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            data: vec![0.0; w * h],
        }
    }

    /// BT.601 luma of `raster`; alpha is ignored.
    pub fn from_raster(raster: &Raster) -> Self {
        Self {
            w: raster.width(),
            h: raster.height(),
            data: raster.luma_f32(),
        }
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize) -> usize {
        y * self.w + x
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[self.idx(x, y)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: f32) {
        let i = self.idx(x, y);
        self.data[i] = v;
    }

    /// Value at integer coordinates clamped to the image.
    #[inline]
    pub fn get_clamped(&self, x: isize, y: isize) -> f32 {
        let x = x.clamp(0, self.w as isize - 1) as usize;
        let y = y.clamp(0, self.h as isize - 1) as usize;
        self.get(x, y)
    }

    /// Bilinear sample; pixel centres sit on integer coordinates.
    pub fn sample(&self, x: f32, y: f32) -> f32 {
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let (x0, y0) = (x0 as isize, y0 as isize);
        let top = self.get_clamped(x0, y0) * (1.0 - fx) + self.get_clamped(x0 + 1, y0) * fx;
        let bottom =
            self.get_clamped(x0, y0 + 1) * (1.0 - fx) + self.get_clamped(x0 + 1, y0 + 1) * fx;
        top * (1.0 - fy) + bottom * fy
    }

    /// Separable box filter of half-width `radius`, clamping at the borders.
    pub fn box_blur(&self, radius: usize) -> ImageF32 {
        if radius == 0 {
            return self.clone();
        }
        let r = radius as isize;
        let norm = 1.0 / (2 * radius + 1) as f32;

        let mut horiz = ImageF32::new(self.w, self.h);
        horiz
            .data
            .par_chunks_mut(self.w)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, out) in row.iter_mut().enumerate() {
                    let sum: f32 = (-r..=r)
                        .map(|d| self.get_clamped(x as isize + d, y as isize))
                        .sum();
                    *out = sum * norm;
                }
            });

        let mut out = ImageF32::new(self.w, self.h);
        out.data
            .par_chunks_mut(self.w)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, o) in row.iter_mut().enumerate() {
                    let sum: f32 = (-r..=r)
                        .map(|d| horiz.get_clamped(x as isize, y as isize + d))
                        .sum();
                    *o = sum * norm;
                }
            });
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bilinear_sample_interpolates() {
        let mut img = ImageF32::new(2, 2);
        img.set(1, 0, 10.0);
        img.set(1, 1, 10.0);
        assert!((img.sample(0.5, 0.5) - 5.0).abs() < 1e-6);
        assert!((img.sample(0.25, 0.0) - 2.5).abs() < 1e-6);
        // clamped outside
        assert!((img.sample(5.0, -3.0) - 10.0).abs() < 1e-6);
    }

    #[test]
    fn box_blur_preserves_constant_images() {
        let img = ImageF32 {
            w: 7,
            h: 5,
            data: vec![42.0; 35],
        };
        let blurred = img.box_blur(2);
        assert!(blurred.data.iter().all(|v| (v - 42.0).abs() < 1e-4));
    }
}
