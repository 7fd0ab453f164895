use crate::{CalibError, Real, Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Newton iteration cap for inverting the θ polynomial.
const UNDISTORT_MAX_ITERS: usize = 10;
const UNDISTORT_TOL: Real = 1e-10;
/// Maximum Newton step, in radians.
const UNDISTORT_MAX_STEP: Real = 0.9;

/// Kannala–Brandt equidistant fisheye distortion with four radial terms.
///
/// The incidence angle `θ` of a ray is mapped to the distorted angle
/// `θd = θ (1 + k1 θ² + k2 θ⁴ + k3 θ⁶ + k4 θ⁸)`; the distorted normalized
/// point lies at radius `θd` along the ray's azimuth. With all coefficients
/// zero this is the ideal equidistant projection, not a pinhole.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KannalaBrandt4 {
    pub k1: Real,
    pub k2: Real,
    pub k3: Real,
    pub k4: Real,
}

impl KannalaBrandt4 {
    pub fn new(k1: Real, k2: Real, k3: Real, k4: Real) -> Self {
        Self { k1, k2, k3, k4 }
    }

    /// Parse `[k1, k2, k3, k4]`; any other length is rejected.
    pub fn try_from_slice(d: &[Real]) -> Result<Self, CalibError> {
        match d {
            [k1, k2, k3, k4] => {
                let dist = Self::new(*k1, *k2, *k3, *k4);
                if dist.to_array().iter().all(|v| v.is_finite()) {
                    Ok(dist)
                } else {
                    Err(CalibError::invalid("distortion coefficients must be finite"))
                }
            }
            _ => Err(CalibError::invalid(format!(
                "distortion must have exactly 4 coefficients, got {}",
                d.len()
            ))),
        }
    }

    pub fn to_array(&self) -> [Real; 4] {
        [self.k1, self.k2, self.k3, self.k4]
    }

    /// Distorted angle `θd(θ)`.
    #[inline]
    pub fn theta_d(&self, theta: Real) -> Real {
        let t2 = theta * theta;
        theta * (1.0 + t2 * (self.k1 + t2 * (self.k2 + t2 * (self.k3 + t2 * self.k4))))
    }

    /// Derivative `dθd/dθ`.
    #[inline]
    pub fn theta_d_derivative(&self, theta: Real) -> Real {
        let t2 = theta * theta;
        let tail = 7.0 * self.k3 + t2 * 9.0 * self.k4;
        1.0 + t2 * (3.0 * self.k1 + t2 * (5.0 * self.k2 + t2 * tail))
    }

    /// Solve `θd(θ) = theta_d` for `θ` by clamped Newton iteration.
    ///
    /// Returns `None` if the iteration does not converge or lands on the
    /// opposite side of the optical axis.
    pub fn theta_from_theta_d(&self, theta_d: Real) -> Option<Real> {
        if !theta_d.is_finite() {
            return None;
        }
        if theta_d.abs() < 1e-15 {
            return Some(theta_d);
        }
        let mut theta = theta_d;
        for _ in 0..UNDISTORT_MAX_ITERS {
            let d = self.theta_d_derivative(theta);
            if d.abs() < 1e-12 {
                return None;
            }
            let step = ((self.theta_d(theta) - theta_d) / d)
                .clamp(-UNDISTORT_MAX_STEP, UNDISTORT_MAX_STEP);
            theta -= step;
            if step.abs() < UNDISTORT_TOL {
                let flipped = theta * theta_d < 0.0;
                return (!flipped).then_some(theta);
            }
        }
        None
    }

    /// Distort a camera-frame direction into normalized distorted coordinates.
    ///
    /// Works for any direction except those on the optical axis pointing
    /// backwards (`r = 0`, `z <= 0`).
    pub fn distort_dir(&self, dir: &Vec3) -> Option<Vec2> {
        let r = (dir.x * dir.x + dir.y * dir.y).sqrt();
        if r < 1e-15 {
            return (dir.z > 0.0).then(Vec2::zeros);
        }
        let theta = r.atan2(dir.z);
        let s = self.theta_d(theta) / r;
        Some(Vec2::new(dir.x * s, dir.y * s))
    }

    /// Distort a pinhole-normalized point `(x/z, y/z)`.
    pub fn distort(&self, n_undist: &Vec2) -> Vec2 {
        let r = n_undist.norm();
        if r < 1e-15 {
            return *n_undist;
        }
        let theta = r.atan();
        n_undist * (self.theta_d(theta) / r)
    }

    /// Invert [`distort`](Self::distort).
    ///
    /// Returns `None` when the distorted radius does not map to a ray in
    /// front of the camera (`θ >= π/2`).
    pub fn undistort(&self, n_dist: &Vec2) -> Option<Vec2> {
        let theta_d = n_dist.norm();
        if theta_d < 1e-15 {
            return Some(*n_dist);
        }
        let theta = self.theta_from_theta_d(theta_d)?;
        if theta >= std::f64::consts::FRAC_PI_2 {
            return None;
        }
        Some(n_dist * (theta.tan() / theta_d))
    }

    /// Unit ray for a normalized distorted point, valid beyond 90° incidence.
    pub fn unproject_dir(&self, n_dist: &Vec2) -> Option<Vec3> {
        let theta_d = n_dist.norm();
        if theta_d < 1e-15 {
            return Some(Vec3::z());
        }
        let theta = self.theta_from_theta_d(theta_d)?;
        let (s, c) = theta.sin_cos();
        Some(Vec3::new(n_dist.x / theta_d * s, n_dist.y / theta_d * s, c))
    }
}
