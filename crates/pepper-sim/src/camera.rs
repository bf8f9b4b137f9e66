//! Ray-cast pinhole camera.
//!
//! One ray per pixel through the optical frame (z forward, x right, y down),
//! first hit wins. Colour frames are flat-shaded with the body colour; depth
//! frames hold the optical-axis distance in millimetres, `0` for no return.

use nalgebra::{Isometry3, Point3, Vector3};
use pepper_core::config::Shape;
use pepper_core::error::SimError;
use pepper_core::types::{CameraFrame, CameraId, PixelFormat, Resolution};

use crate::geometry::ray_hit;

/// Colour of the ground plane.
pub const FLOOR_COLOR: [u8; 3] = [110, 110, 110];
/// Colour where no ray hits anything.
pub const BACKGROUND_COLOR: [u8; 3] = [185, 195, 205];
/// Depth returns beyond this range read as `0`.
pub const MAX_DEPTH_M: f32 = 8.0;

/// Something a camera ray can hit.
#[derive(Debug, Clone, Copy)]
pub struct Renderable {
    pub shape: Shape,
    pub pose: Isometry3<f32>,
    pub color: [u8; 3],
}

/// Horizontal field of view (rad).
#[must_use]
pub fn horizontal_fov(camera: CameraId) -> f32 {
    match camera {
        CameraId::Top | CameraId::Bottom => 56.3_f32.to_radians(),
        CameraId::Depth => 58.0_f32.to_radians(),
    }
}

/// Convert `[0, 1]` RGBA to 8-bit RGB.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[must_use]
pub fn rgb8(color: [f32; 4]) -> [u8; 3] {
    let c = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    [c(color[0]), c(color[1]), c(color[2])]
}

/// Render `scene` from the optical frame at `pose`.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn render(
    camera: CameraId,
    resolution: Resolution,
    pose: &Isometry3<f32>,
    scene: &[Renderable],
    floor: bool,
) -> Result<CameraFrame, SimError> {
    let (width, height) = (resolution.width(), resolution.height());
    let focal = (width as f32 / 2.0) / (horizontal_fov(camera) / 2.0).tan();
    let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
    let origin = Point3::from(pose.translation.vector);
    let pixels = (width * height) as usize;

    let mut rgb = Vec::new();
    let mut depth = Vec::new();
    match camera.format() {
        PixelFormat::Rgb8 => rgb.reserve(pixels * 3),
        PixelFormat::Depth16 => depth.reserve(pixels),
    }

    for v in 0..height {
        for u in 0..width {
            let local = Vector3::new((u as f32 + 0.5 - cx) / focal, (v as f32 + 0.5 - cy) / focal, 1.0);
            let direction = pose.rotation * local.normalize();
            let hit = cast(&origin, &direction, scene, floor);
            match camera.format() {
                PixelFormat::Rgb8 => {
                    rgb.extend_from_slice(&hit.map_or(BACKGROUND_COLOR, |(_, color)| color));
                }
                PixelFormat::Depth16 => {
                    let mm = hit
                        .map(|(t, _)| t / local.norm() * 1000.0)
                        .filter(|mm| *mm <= MAX_DEPTH_M * 1000.0)
                        .map_or(0, |mm| mm.round() as u16);
                    depth.push(mm);
                }
            }
        }
    }

    match camera.format() {
        PixelFormat::Rgb8 => CameraFrame::from_rgb8(width, height, rgb),
        PixelFormat::Depth16 => CameraFrame::from_depth16(width, height, depth),
    }
}

/// Nearest hit as `(distance, colour)`.
fn cast(
    origin: &Point3<f32>,
    direction: &Vector3<f32>,
    scene: &[Renderable],
    floor: bool,
) -> Option<(f32, [u8; 3])> {
    let mut best = None;
    for item in scene {
        if let Some(t) = ray_hit(&item.shape, &item.pose, origin, direction) {
            if best.is_none_or(|(b, _)| t < b) {
                best = Some((t, item.color));
            }
        }
    }
    // ground plane z = 0
    if floor && direction.z < -f32::EPSILON && origin.z > 0.0 {
        let t = -origin.z / direction.z;
        if best.is_none_or(|(b, _)| t < b) {
            best = Some((t, FLOOR_COLOR));
        }
    }
    best
}
