use fisheye_core::{CalibError, FisheyeCamera, ImageSize, Intrinsics, Real, Vec3};
use log::debug;
use rayon::prelude::*;

/// Source-pixel lookup for every output pixel, row-major.
///
/// Entries are `[x, y]` in source pixel coordinates; `NaN` marks output pixels
/// whose ray the fisheye camera cannot see.
#[derive(Debug, Clone)]
pub struct UndistortionMap {
    width: usize,
    height: usize,
    lut: Vec<[f32; 2]>,
}

impl UndistortionMap {
    /// For each output pixel `(u, v)`: ray = `new_k⁻¹ [u, v, 1]`, projected
    /// through `camera`.
    pub fn build(
        camera: &FisheyeCamera,
        new_k: &Intrinsics,
        out_size: ImageSize,
    ) -> Result<Self, CalibError> {
        camera.k.validate()?;
        new_k.validate()?;
        if out_size.width == 0 || out_size.height == 0 {
            return Err(CalibError::invalid("undistorted output size must be non-empty"));
        }

        let mut lut = vec![[f32::NAN; 2]; out_size.area()];
        lut.par_chunks_mut(out_size.width)
            .enumerate()
            .for_each(|(v, row)| {
                let y = (v as Real - new_k.cy) / new_k.fy;
                for (u, out) in row.iter_mut().enumerate() {
                    let x = (u as Real - new_k.cx) / new_k.fx;
                    if let Some(src) = camera.project_point_c(&Vec3::new(x, y, 1.0)) {
                        if src.x.is_finite() && src.y.is_finite() {
                            *out = [src.x as f32, src.y as f32];
                        }
                    }
                }
            });

        debug!(
            "undistortion map {}x{} built",
            out_size.width, out_size.height
        );
        Ok(Self {
            width: out_size.width,
            height: out_size.height,
            lut,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.width, self.height)
    }

    /// Source coordinate for output pixel `(u, v)`.
    #[inline]
    pub fn get(&self, u: usize, v: usize) -> [f32; 2] {
        self.lut[v * self.width + u]
    }

    pub fn as_slice(&self) -> &[[f32; 2]] {
        &self.lut
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fisheye_core::KannalaBrandt4;

    #[test]
    fn principal_point_maps_to_principal_point() {
        let cam = FisheyeCamera::new(
            Intrinsics::new(300.0, 300.0, 50.0, 40.0),
            KannalaBrandt4::new(0.1, 0.01, 0.0, 0.0),
        );
        let map = UndistortionMap::build(&cam, &cam.k, ImageSize::new(101, 81)).unwrap();
        let [x, y] = map.get(50, 40);
        assert!((x - 50.0).abs() < 1e-4 && (y - 40.0).abs() < 1e-4);
        // Off-centre pixels are pulled towards the centre by the fisheye model.
        let [x, _] = map.get(100, 40);
        assert!(x < 100.0 && x > 50.0);
    }

    #[test]
    fn degenerate_intrinsics_are_rejected() {
        let cam = FisheyeCamera::new(
            Intrinsics::new(0.0, 300.0, 50.0, 40.0),
            KannalaBrandt4::default(),
        );
        let new_k = Intrinsics::new(1.0, 1.0, 0.0, 0.0);
        assert!(matches!(
            UndistortionMap::build(&cam, &new_k, ImageSize::new(4, 4)),
            Err(CalibError::InvalidInput(_))
        ));
    }
}
