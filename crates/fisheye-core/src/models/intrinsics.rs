use crate::{CalibError, Mat3, Pt2, Real, Vec2};
use serde::{Deserialize, Serialize};

/// Zero-skew pinhole intrinsics `K = [[fx, 0, cx], [0, fy, cy], [0, 0, 1]]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Intrinsics {
    /// Focal length in pixels along X.
    pub fx: Real,
    /// Focal length in pixels along Y.
    pub fy: Real,
    /// Principal point X coordinate in pixels.
    pub cx: Real,
    /// Principal point Y coordinate in pixels.
    pub cy: Real,
}

impl Intrinsics {
    pub fn new(fx: Real, fy: Real, cx: Real, cy: Real) -> Self {
        Self { fx, fy, cx, cy }
    }

    /// Return the 3x3 camera intrinsics matrix K.
    pub fn k_matrix(&self) -> Mat3 {
        Mat3::new(self.fx, 0.0, self.cx, 0.0, self.fy, self.cy, 0.0, 0.0, 1.0)
    }

    /// K as row-major nested arrays.
    pub fn to_rows(&self) -> [[Real; 3]; 3] {
        [
            [self.fx, 0.0, self.cx],
            [0.0, self.fy, self.cy],
            [0.0, 0.0, 1.0],
        ]
    }

    /// Check that focal lengths are positive and every entry is finite.
    pub fn validate(&self) -> Result<(), CalibError> {
        let finite = [self.fx, self.fy, self.cx, self.cy]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(CalibError::invalid("intrinsics contain non-finite values"));
        }
        if self.fx <= 0.0 || self.fy <= 0.0 {
            return Err(CalibError::invalid(format!(
                "focal lengths must be positive, got fx={} fy={}",
                self.fx, self.fy
            )));
        }
        Ok(())
    }

    /// Parse a row-major K, requiring the zero-skew structure.
    pub fn try_from_rows(rows: &[[Real; 3]; 3]) -> Result<Self, CalibError> {
        Self::try_from_k_matrix(&Mat3::from_fn(|r, c| rows[r][c]))
    }

    /// Parse a K matrix, normalising so that `K[2,2] = 1`.
    pub fn try_from_k_matrix(k: &Mat3) -> Result<Self, CalibError> {
        let eps = 1e-9;
        let k22 = k[(2, 2)];
        if !k22.is_finite() || k22.abs() < eps {
            return Err(CalibError::invalid(format!("K[2,2] must be non-zero, got {k22}")));
        }
        let k = k / k22;
        let structural = [k[(0, 1)], k[(1, 0)], k[(2, 0)], k[(2, 1)]];
        if structural.iter().any(|v| v.abs() > eps) {
            return Err(CalibError::invalid(
                "K must have the structure [[fx,0,cx],[0,fy,cy],[0,0,1]]",
            ));
        }
        let intr = Self::new(k[(0, 0)], k[(1, 1)], k[(0, 2)], k[(1, 2)]);
        intr.validate()?;
        Ok(intr)
    }

    /// Map normalized image-plane coordinates to pixels.
    #[inline]
    pub fn to_pixel(&self, n: &Vec2) -> Pt2 {
        Pt2::new(self.fx * n.x + self.cx, self.fy * n.y + self.cy)
    }

    /// Map pixels to normalized image-plane coordinates.
    #[inline]
    pub fn from_pixel(&self, px: &Pt2) -> Vec2 {
        Vec2::new((px.x - self.cx) / self.fx, (px.y - self.cy) / self.fy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn k_matrix_round_trip() {
        let k = Intrinsics::new(420.0, 410.0, 320.0, 240.0);
        let parsed = Intrinsics::try_from_k_matrix(&(k.k_matrix() * 2.0)).unwrap();
        assert!((parsed.fx - 420.0).abs() < 1e-12);
        assert!((parsed.cy - 240.0).abs() < 1e-12);
        assert_eq!(Intrinsics::try_from_rows(&k.to_rows()).unwrap(), k);
    }

    #[test]
    fn rejects_skew_and_degenerate_focal() {
        let mut rows = Intrinsics::new(400.0, 400.0, 320.0, 240.0).to_rows();
        rows[0][1] = 0.5;
        assert!(Intrinsics::try_from_rows(&rows).is_err());

        let zero = Intrinsics::new(0.0, 400.0, 320.0, 240.0);
        assert!(matches!(zero.validate(), Err(CalibError::InvalidInput(_))));
    }

    #[test]
    fn pixel_mapping_is_inverse() {
        let k = Intrinsics::new(300.0, 280.0, 100.0, 80.0);
        let px = Pt2::new(17.5, 210.25);
        let back = k.to_pixel(&k.from_pixel(&px));
        assert!((px - back).norm() < 1e-12);
    }
}
