//! Pose algebra between world and link frames.
//!
//! [`Pose`] is the plain data carried across the session boundary; the math
//! is done on [`Isometry3`]. Quaternions are renormalized on conversion, so a
//! slightly drifted orientation from a backend is tolerated. A zero quaternion
//! is the caller's problem.

use nalgebra::{Isometry3, Point3, Quaternion, Translation3, UnitQuaternion};

use crate::types::Pose;

/// Convert a [`Pose`] into an isometry.
#[must_use]
pub fn to_isometry(pose: &Pose) -> Isometry3<f32> {
    let [x, y, z] = pose.position;
    let [qx, qy, qz, qw] = pose.orientation;
    Isometry3::from_parts(
        Translation3::new(x, y, z),
        UnitQuaternion::from_quaternion(Quaternion::new(qw, qx, qy, qz)),
    )
}

/// Convert an isometry back into a [`Pose`].
#[must_use]
pub fn from_isometry(iso: &Isometry3<f32>) -> Pose {
    let t = iso.translation.vector;
    let q = iso.rotation.quaternion();
    Pose::new([t.x, t.y, t.z], [q.i, q.j, q.k, q.w])
}

/// `pose⁻¹`: position negated and rotated by the conjugate orientation.
#[must_use]
pub fn invert(pose: &Pose) -> Pose {
    from_isometry(&to_isometry(pose).inverse())
}

/// `a * b`: apply `b` in the frame of `a`.
#[must_use]
pub fn compose(a: &Pose, b: &Pose) -> Pose {
    from_isometry(&(to_isometry(a) * to_isometry(b)))
}

/// `target` (world frame) expressed in the frame of `reference` (world frame).
#[must_use]
pub fn relative_pose(reference: &Pose, target: &Pose) -> Pose {
    compose(&invert(reference), target)
}

/// Position part of [`relative_pose`].
#[must_use]
pub fn relative_position(reference: &Pose, target_position: [f32; 3]) -> [f32; 3] {
    let [x, y, z] = target_position;
    let local = to_isometry(reference).inverse_transform_point(&Point3::new(x, y, z));
    [local.x, local.y, local.z]
}

/// Quaternion (`[x, y, z, w]`) from roll / pitch / yaw.
#[must_use]
pub fn quat_from_rpy(roll: f32, pitch: f32, yaw: f32) -> [f32; 4] {
    let q = UnitQuaternion::from_euler_angles(roll, pitch, yaw);
    [q.i, q.j, q.k, q.w]
}

/// Rotation angle (rad) between the orientations of two poses.
#[must_use]
pub fn rotation_between(a: &Pose, b: &Pose) -> f32 {
    to_isometry(a).rotation.angle_to(&to_isometry(b).rotation)
}
