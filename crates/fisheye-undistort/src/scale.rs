use fisheye_core::{CalibError, FisheyeCamera, ImageSize, Intrinsics, Real};

/// Output intrinsics and size for undistorting at `scale`.
///
/// The output canvas is `floor(src · scale)` pixels (at least one per axis).
/// Focal lengths are kept and the principal point moves by half the change in
/// canvas size, so `scale > 1` keeps more of the fisheye field of view with a
/// wider empty border and `scale < 1` crops the distorted periphery. With
/// `scale = 1` the new intrinsics equal the camera's.
///
/// This deliberately differs from reusing `Knew = K` on the resized canvas:
/// the principal point is re-centred so the added or removed border is split
/// evenly between opposite sides.
pub fn new_camera_for_scale(
    camera: &FisheyeCamera,
    src_size: ImageSize,
    scale: Real,
) -> Result<(Intrinsics, ImageSize), CalibError> {
    camera.k.validate()?;
    if !scale.is_finite() || scale <= 0.0 {
        return Err(CalibError::invalid(format!(
            "scale must be positive and finite, got {scale}"
        )));
    }
    if src_size.width == 0 || src_size.height == 0 {
        return Err(CalibError::invalid("source image size must be non-empty"));
    }
    let out_w = ((src_size.width as Real * scale).floor() as usize).max(1);
    let out_h = ((src_size.height as Real * scale).floor() as usize).max(1);
    let k = &camera.k;
    let new_k = Intrinsics::new(
        k.fx,
        k.fy,
        k.cx + (out_w as Real - src_size.width as Real) * 0.5,
        k.cy + (out_h as Real - src_size.height as Real) * 0.5,
    );
    Ok((new_k, ImageSize::new(out_w, out_h)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fisheye_core::KannalaBrandt4;

    fn cam() -> FisheyeCamera {
        FisheyeCamera::new(Intrinsics::new(200.0, 198.0, 321.0, 238.0), KannalaBrandt4::default())
    }

    #[test]
    fn unit_scale_keeps_camera() {
        let (k, size) = new_camera_for_scale(&cam(), ImageSize::new(640, 480), 1.0).unwrap();
        assert_eq!(k, cam().k);
        assert_eq!(size, ImageSize::new(640, 480));
    }

    #[test]
    fn scale_truncates_and_recentres() {
        let (k, size) = new_camera_for_scale(&cam(), ImageSize::new(640, 480), 1.55).unwrap();
        assert_eq!(size, ImageSize::new(992, 744));
        assert_eq!(k.fx, 200.0);
        assert!((k.cx - (321.0 + 176.0)).abs() < 1e-12);
        assert!((k.cy - (238.0 + 132.0)).abs() < 1e-12);
    }

    #[test]
    fn tiny_scale_keeps_one_pixel() {
        let (_, size) = new_camera_for_scale(&cam(), ImageSize::new(10, 10), 0.01).unwrap();
        assert_eq!(size, ImageSize::new(1, 1));
    }

    #[test]
    fn bad_scale_is_rejected() {
        for s in [0.0, -1.0, Real::NAN, Real::INFINITY] {
            assert!(matches!(
                new_camera_for_scale(&cam(), ImageSize::new(10, 10), s),
                Err(CalibError::InvalidInput(_))
            ));
        }
    }
}
