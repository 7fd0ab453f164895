//! Persisted calibration result in the fixed `{K, D}` shape.
//!
//! ```json
//! { "K": [[fx, 0, cx], [0, fy, cy], [0, 0, 1]], "D": [k1, k2, k3, k4] }
//! ```

use crate::{CalibError, FisheyeCamera, Intrinsics, KannalaBrandt4, Real};
use serde::{Deserialize, Serialize};

/// Camera matrix and fisheye coefficients as produced by calibration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationParams {
    /// Row-major 3x3 camera matrix.
    #[serde(rename = "K")]
    pub k: [[Real; 3]; 3],
    /// Fisheye coefficients `k1..k4`.
    #[serde(rename = "D")]
    pub d: [Real; 4],
}

impl CalibrationParams {
    pub fn from_camera(camera: &FisheyeCamera) -> Self {
        Self {
            k: camera.k.to_rows(),
            d: camera.dist.to_array(),
        }
    }

    /// Validate the shape and convert into a camera model.
    pub fn to_camera(&self) -> Result<FisheyeCamera, CalibError> {
        FisheyeCamera::try_from_parts(&self.k, &self.d)
    }

    pub fn intrinsics(&self) -> Result<Intrinsics, CalibError> {
        Intrinsics::try_from_rows(&self.k)
    }

    pub fn distortion(&self) -> Result<KannalaBrandt4, CalibError> {
        KannalaBrandt4::try_from_slice(&self.d)
    }
}

impl From<&FisheyeCamera> for CalibrationParams {
    fn from(camera: &FisheyeCamera) -> Self {
        Self::from_camera(camera)
    }
}

impl TryFrom<&CalibrationParams> for FisheyeCamera {
    type Error = CalibError;

    fn try_from(params: &CalibrationParams) -> Result<Self, Self::Error> {
        params.to_camera()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_shape_round_trips() {
        let cam = FisheyeCamera::new(
            Intrinsics::new(310.5, 309.25, 640.0, 360.0),
            KannalaBrandt4::new(0.1, -0.02, 0.001, 0.0),
        );
        let params = CalibrationParams::from(&cam);
        let json = serde_json::to_string(&params).unwrap();
        assert!(json.contains("\"K\":[[310.5,0.0,640.0],[0.0,309.25,360.0],[0.0,0.0,1.0]]"));
        assert!(json.contains("\"D\":[0.1,-0.02,0.001,0.0]"));

        let back: CalibrationParams = serde_json::from_str(&json).unwrap();
        assert_eq!(back, params);
        assert_eq!(back.to_camera().unwrap(), cam);
    }

    #[test]
    fn solver_output_reloads_bit_exact() {
        let cam = FisheyeCamera::new(
            Intrinsics::new(
                220.36670566463138,
                0.1 + 0.2 + 217.0,
                322.0 / 3.0,
                241.00001596061642,
            ),
            KannalaBrandt4::new(
                0.1 + 0.2,
                -1.0 / 3.0,
                2.0_f64.sqrt() * 1e-3,
                -7.0 / 9.0 * 1e-4,
            ),
        );
        let params = CalibrationParams::from(&cam);
        let json = serde_json::to_string_pretty(&params).unwrap();
        let back: CalibrationParams = serde_json::from_str(&json).unwrap();
        for (a, b) in back.k.iter().flatten().zip(params.k.iter().flatten()) {
            assert_eq!(a.to_bits(), b.to_bits(), "{a} vs {b}");
        }
        for (a, b) in back.d.iter().zip(&params.d) {
            assert_eq!(a.to_bits(), b.to_bits(), "{a} vs {b}");
        }
    }

    #[test]
    fn rejects_wrong_d_length_in_json() {
        let json = r#"{"K": [[1,0,0],[0,1,0],[0,0,1]], "D": [0, 0, 0]}"#;
        assert!(serde_json::from_str::<CalibrationParams>(json).is_err());
    }

    #[test]
    fn rejects_skewed_k() {
        let params = CalibrationParams {
            k: [[300.0, 1.0, 320.0], [0.0, 300.0, 240.0], [0.0, 0.0, 1.0]],
            d: [0.0; 4],
        };
        assert!(matches!(params.to_camera(), Err(CalibError::InvalidInput(_))));
    }
}
