//! Distance and ray queries against spheres and oriented boxes.

use nalgebra::{Isometry3, Point3, Vector3};
use pepper_core::config::Shape;

/// Signed distance from `point` to the surface of `shape` placed at `pose`.
/// Negative inside.
#[must_use]
pub fn signed_distance(shape: &Shape, pose: &Isometry3<f32>, point: &Point3<f32>) -> f32 {
    match shape {
        Shape::Sphere(r) => (point - pose.translation.vector).coords.norm() - r,
        Shape::Box(half) => {
            let local = pose.inverse_transform_point(point);
            let q = Vector3::new(
                local.x.abs() - half[0],
                local.y.abs() - half[1],
                local.z.abs() - half[2],
            );
            let outside = q.map(|v| v.max(0.0)).norm();
            let inside = q.x.max(q.y).max(q.z).min(0.0);
            outside + inside
        }
    }
}

/// Outward surface normal of `shape` nearest to `point`.
#[must_use]
pub fn surface_normal(shape: &Shape, pose: &Isometry3<f32>, point: &Point3<f32>) -> Vector3<f32> {
    const EPS: f32 = 1e-3;
    let d = |offset: Vector3<f32>| signed_distance(shape, pose, &(point + offset));
    let gradient = Vector3::new(
        d(Vector3::x() * EPS) - d(-Vector3::x() * EPS),
        d(Vector3::y() * EPS) - d(-Vector3::y() * EPS),
        d(Vector3::z() * EPS) - d(-Vector3::z() * EPS),
    );
    gradient.try_normalize(f32::EPSILON).unwrap_or_else(Vector3::z)
}

/// Whether a sphere at `center` with `radius` touches `shape` within `margin`.
#[must_use]
pub fn sphere_touches(
    shape: &Shape,
    pose: &Isometry3<f32>,
    center: &Point3<f32>,
    radius: f32,
    margin: f32,
) -> bool {
    signed_distance(shape, pose, center) <= radius + margin
}

/// Whether two shapes touch within `margin`.
///
/// Box-box is approximated by testing each box's corners against the other.
#[must_use]
pub fn shapes_touch(
    a: &Shape,
    a_pose: &Isometry3<f32>,
    b: &Shape,
    b_pose: &Isometry3<f32>,
    margin: f32,
) -> bool {
    match (a, b) {
        (Shape::Sphere(r), other) => {
            sphere_touches(other, b_pose, &Point3::from(a_pose.translation.vector), *r, margin)
        }
        (other, Shape::Sphere(r)) => {
            sphere_touches(other, a_pose, &Point3::from(b_pose.translation.vector), *r, margin)
        }
        (Shape::Box(ha), Shape::Box(hb)) => {
            corners(ha, a_pose).any(|c| signed_distance(b, b_pose, &c) <= margin)
                || corners(hb, b_pose).any(|c| signed_distance(a, a_pose, &c) <= margin)
        }
    }
}

fn corners<'a>(half: &'a [f32; 3], pose: &'a Isometry3<f32>) -> impl Iterator<Item = Point3<f32>> + 'a {
    (0..8).map(move |i| {
        let sign = |bit: usize| if i & bit == 0 { -1.0 } else { 1.0 };
        pose * Point3::new(sign(1) * half[0], sign(2) * half[1], sign(4) * half[2])
    })
}

/// Distance along a unit-length ray to the first hit on `shape`, if any.
#[must_use]
pub fn ray_hit(
    shape: &Shape,
    pose: &Isometry3<f32>,
    origin: &Point3<f32>,
    direction: &Vector3<f32>,
) -> Option<f32> {
    match shape {
        Shape::Sphere(r) => {
            let oc = origin - Point3::from(pose.translation.vector);
            let b = oc.dot(direction);
            let c = oc.norm_squared() - r * r;
            let disc = b * b - c;
            if disc < 0.0 {
                return None;
            }
            let root = disc.sqrt();
            [-b - root, -b + root].into_iter().find(|t| *t >= 0.0)
        }
        Shape::Box(half) => {
            let o = pose.inverse_transform_point(origin);
            let d = pose.inverse_transform_vector(direction);
            let mut near = f32::NEG_INFINITY;
            let mut far = f32::INFINITY;
            for axis in 0..3 {
                if d[axis].abs() < f32::EPSILON {
                    if o[axis].abs() > half[axis] {
                        return None;
                    }
                    continue;
                }
                let t1 = (-half[axis] - o[axis]) / d[axis];
                let t2 = (half[axis] - o[axis]) / d[axis];
                near = near.max(t1.min(t2));
                far = far.min(t1.max(t2));
            }
            if near > far || far < 0.0 {
                None
            } else {
                Some(near.max(0.0))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn at(x: f32, y: f32, z: f32) -> Isometry3<f32> {
        Isometry3::translation(x, y, z)
    }

    #[test]
    fn sphere_distance() {
        let s = Shape::Sphere(0.5);
        assert_relative_eq!(signed_distance(&s, &at(1.0, 0.0, 0.0), &Point3::origin()), 0.5);
        assert_relative_eq!(
            signed_distance(&s, &at(0.0, 0.0, 0.0), &Point3::origin()),
            -0.5
        );
    }

    #[test]
    fn box_distance_and_normal() {
        let b = Shape::Box([0.2, 0.3, 0.35]);
        let pose = at(0.45, 0.1, 0.35);
        let above = Point3::new(0.45, 0.1, 0.8);
        assert_relative_eq!(signed_distance(&b, &pose, &above), 0.1, epsilon = 1e-5);
        assert_relative_eq!(
            surface_normal(&b, &pose, &above),
            Vector3::z(),
            epsilon = 1e-3
        );
        let inside = Point3::new(0.45, 0.1, 0.6);
        assert!(signed_distance(&b, &pose, &inside) < 0.0);
    }

    #[test]
    fn sphere_on_box_touches() {
        let table = Shape::Box([0.2, 0.3, 0.35]);
        let target = Shape::Sphere(0.03);
        let table_pose = at(0.45, 0.1, 0.35);
        assert!(shapes_touch(&target, &at(0.32, 0.15, 0.73), &table, &table_pose, 0.005));
        assert!(!shapes_touch(&target, &at(0.32, 0.15, 0.80), &table, &table_pose, 0.005));
        assert!(shapes_touch(&table, &table_pose, &target, &at(0.32, 0.15, 0.73), 0.005));
    }

    #[test]
    fn boxes_touch_by_corner() {
        let b = Shape::Box([0.5, 0.5, 0.5]);
        assert!(shapes_touch(&b, &at(0.0, 0.0, 0.0), &b, &at(0.99, 0.0, 0.0), 0.0));
        assert!(!shapes_touch(&b, &at(0.0, 0.0, 0.0), &b, &at(1.5, 0.0, 0.0), 0.0));
    }

    #[test]
    fn rays() {
        let dir = Vector3::x();
        let origin = Point3::origin();
        let sphere = Shape::Sphere(0.1);
        assert_relative_eq!(
            ray_hit(&sphere, &at(1.0, 0.0, 0.0), &origin, &dir).unwrap(),
            0.9,
            epsilon = 1e-5
        );
        assert!(ray_hit(&sphere, &at(-1.0, 0.0, 0.0), &origin, &dir).is_none());
        assert!(ray_hit(&sphere, &at(1.0, 0.5, 0.0), &origin, &dir).is_none());

        let cube = Shape::Box([0.1, 0.1, 0.1]);
        assert_relative_eq!(
            ray_hit(&cube, &at(1.0, 0.0, 0.0), &origin, &dir).unwrap(),
            0.9,
            epsilon = 1e-5
        );
        assert!(ray_hit(&cube, &at(1.0, 0.5, 0.0), &origin, &dir).is_none());
    }
}
