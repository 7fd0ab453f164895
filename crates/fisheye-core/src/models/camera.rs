use crate::{CalibError, Intrinsics, Iso3, KannalaBrandt4, Pt2, Pt3, Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Fisheye camera: Kannala–Brandt distortion followed by zero-skew intrinsics.
///
/// K and D always travel together in this type.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FisheyeCamera {
    pub k: Intrinsics,
    pub dist: KannalaBrandt4,
}

impl FisheyeCamera {
    pub fn new(k: Intrinsics, dist: KannalaBrandt4) -> Self {
        Self { k, dist }
    }

    /// Build from a row-major K and a 4-element D, validating both.
    pub fn try_from_parts(k_rows: &[[f64; 3]; 3], d: &[f64]) -> Result<Self, CalibError> {
        let k = Intrinsics::try_from_rows(k_rows)?;
        let dist = KannalaBrandt4::try_from_slice(d)?;
        Ok(Self::new(k, dist))
    }

    /// Project a camera-frame point to pixels.
    pub fn project_point_c(&self, p_c: &Vec3) -> Option<Pt2> {
        let n_d = self.dist.distort_dir(p_c)?;
        Some(self.k.to_pixel(&n_d))
    }

    /// Project a board-frame point observed from `cam_from_board`.
    pub fn project(&self, p: &Pt3, cam_from_board: &Iso3) -> Option<Pt2> {
        let p_c = cam_from_board.transform_point(p);
        self.project_point_c(&p_c.coords)
    }

    /// Unit ray through a distorted pixel.
    pub fn unproject(&self, px: &Pt2) -> Option<Vec3> {
        self.dist.unproject_dir(&self.k.from_pixel(px))
    }

    /// Undistorted pinhole-normalized coordinates of a distorted pixel.
    ///
    /// `None` for pixels whose ray points at or behind the image plane.
    pub fn undistort_point(&self, px: &Pt2) -> Option<Pt2> {
        let n = self.dist.undistort(&self.k.from_pixel(px))?;
        Some(Pt2::from(n))
    }

    /// [`undistort_point`](Self::undistort_point) over a slice.
    pub fn undistort_points(&self, pixels: &[Pt2]) -> Vec<Option<Pt2>> {
        pixels.iter().map(|px| self.undistort_point(px)).collect()
    }

    /// Distort pinhole-normalized coordinates and map them to pixels.
    pub fn distort_normalized(&self, n: &Vec2) -> Pt2 {
        self.k.to_pixel(&self.dist.distort(n))
    }
}
