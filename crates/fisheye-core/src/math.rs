use nalgebra::{Isometry3, Matrix3, Point2, Point3, Translation3, UnitQuaternion, Vector2, Vector3};

pub type Real = f64;

pub type Vec2 = Vector2<Real>;
pub type Vec3 = Vector3<Real>;
pub type Pt2 = Point2<Real>;
pub type Pt3 = Point3<Real>;
pub type Mat3 = Matrix3<Real>;
pub type Iso3 = Isometry3<Real>;

pub fn to_homogeneous(p: &Pt2) -> Vec3 {
    Vec3::new(p.x, p.y, 1.0)
}

pub fn from_homogeneous(v: &Vec3) -> Pt2 {
    Pt2::new(v.x / v.z, v.y / v.z)
}

/// Build a pose from a rotation vector (axis * angle) and a translation.
pub fn iso_from_rotvec(rvec: &Vec3, t: &Vec3) -> Iso3 {
    Iso3::from_parts(
        Translation3::from(*t),
        UnitQuaternion::from_scaled_axis(*rvec),
    )
}

/// Split a pose into its rotation vector and translation.
pub fn rotvec_from_iso(pose: &Iso3) -> (Vec3, Vec3) {
    (pose.rotation.scaled_axis(), pose.translation.vector)
}
