//! [`KinematicSession`]: the reference [`SimSession`] backend.
//!
//! Joints are position-controlled and move toward their targets at a
//! bounded rate each tick; there are no dynamics. Robot links collide as
//! spheres. Dynamic scene bodies are pushed out of any link sphere that
//! penetrates them, which is enough to make a table slide when the arm
//! sweeps through it.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};

use nalgebra::{Isometry3, Point3};
use pepper_core::config::{EnvConfig, Shape};
use pepper_core::error::SimError;
use pepper_core::traits::SimSession;
use pepper_core::transform::{from_isometry, to_isometry};
use pepper_core::types::{
    BodyHandle, BodySpec, CameraFrame, CameraId, ContactTarget, Pose, Resolution, SensorHandle,
    SessionId,
};
use tracing::debug;

use crate::camera::{Renderable, render, rgb8};
use crate::error::ModelError;
use crate::geometry::{shapes_touch, signed_distance, surface_normal};
use crate::model::RobotModel;

static NEXT_SESSION: AtomicU32 = AtomicU32::new(0);

/// Default distance (m) under which two shapes count as touching.
pub const DEFAULT_CONTACT_MARGIN: f32 = 0.005;

#[derive(Debug, Clone)]
struct SimBody {
    spec: BodySpec,
    pose: Isometry3<f32>,
}

/// Kinematic simulation of one robot and its scene.
#[derive(Debug)]
pub struct KinematicSession {
    id: SessionId,
    model: RobotModel,
    physics_dt: f32,
    contact_margin: f32,
    floor: bool,
    angles: Vec<f32>,
    targets: Vec<f32>,
    speed: f32,
    link_poses: Vec<Isometry3<f32>>,
    bodies: BTreeMap<u32, SimBody>,
    next_body: u32,
    cameras: BTreeMap<u32, (CameraId, Resolution)>,
    next_sensor: u32,
    ticks: u64,
    connected: bool,
}

impl KinematicSession {
    /// Session over `model` with all joints at zero.
    pub fn new(model: RobotModel, physics_dt: f32) -> Result<Self, ModelError> {
        if !(physics_dt > 0.0) {
            return Err(ModelError::InvalidTimestep(physics_dt));
        }
        let dof = model.joints().len();
        let link_poses = model.forward_kinematics(&vec![0.0; dof]);
        let id = SessionId(NEXT_SESSION.fetch_add(1, Ordering::Relaxed));
        debug!(session = %id, links = model.links().len(), dof, "kinematic session opened");
        Ok(Self {
            id,
            model,
            physics_dt,
            contact_margin: DEFAULT_CONTACT_MARGIN,
            floor: true,
            angles: vec![0.0; dof],
            targets: vec![0.0; dof],
            speed: 1.0,
            link_poses,
            bodies: BTreeMap::new(),
            next_body: 0,
            cameras: BTreeMap::new(),
            next_sensor: 0,
            ticks: 0,
            connected: true,
        })
    }

    /// Pepper model with the configured joint limits and timestep, posed at
    /// the configured initial angles.
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_config(config: &EnvConfig) -> Result<Self, ModelError> {
        let mut model = RobotModel::pepper();
        for joint in &config.robot.joints {
            model.set_limits(&joint.name, joint.lower, joint.upper, joint.max_velocity)?;
        }
        let mut session = Self::new(model, config.simulation.physics_dt as f32)?;
        for (joint, angle) in config.robot.joints.iter().zip(config.robot.initial_angles()) {
            if let Some(i) = session.model.joint_index(&joint.name) {
                session.angles[i] = angle;
                session.targets[i] = angle;
            }
        }
        session.update_links();
        Ok(session)
    }

    /// Gap (m) below which two shapes count as touching.
    #[must_use]
    pub const fn with_contact_margin(mut self, margin: f32) -> Self {
        self.contact_margin = margin;
        self
    }

    /// Render the ground plane (on by default).
    #[must_use]
    pub const fn with_floor(mut self, floor: bool) -> Self {
        self.floor = floor;
        self
    }

    #[must_use]
    pub const fn model(&self) -> &RobotModel {
        &self.model
    }

    /// Ticks since the session opened.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.connected
    }

    fn live(&self) -> Result<(), SimError> {
        if self.connected {
            Ok(())
        } else {
            Err(SimError::Disconnected)
        }
    }

    fn joint(&self, name: &str) -> Result<usize, SimError> {
        self.model
            .joint_index(name)
            .ok_or_else(|| SimError::UnknownJoint(name.into()))
    }

    fn body(&self, handle: BodyHandle) -> Result<&SimBody, SimError> {
        self.bodies
            .get(&handle.0)
            .ok_or(SimError::BodyNotFound(handle))
    }

    fn update_links(&mut self) {
        self.link_poses = self.model.forward_kinematics(&self.angles);
    }

    /// Collision spheres of every robot link, world frame.
    fn robot_spheres(&self) -> impl Iterator<Item = (usize, Point3<f32>, f32)> + '_ {
        self.model
            .links()
            .iter()
            .enumerate()
            .filter_map(|(i, link)| {
                link.collision_radius
                    .map(|r| (i, Point3::from(self.link_poses[i].translation.vector), r))
            })
    }

    /// Shapes a contact target stands for.
    fn shapes_of(&self, target: &ContactTarget) -> Result<Vec<(Shape, Isometry3<f32>)>, SimError> {
        match target {
            ContactTarget::Robot => Ok(self
                .robot_spheres()
                .map(|(i, _, r)| (Shape::Sphere(r), self.link_poses[i]))
                .collect()),
            ContactTarget::Link(name) => {
                let i = self
                    .model
                    .link_index(name)
                    .ok_or_else(|| SimError::UnknownLink(name.clone()))?;
                Ok(self.model.links()[i]
                    .collision_radius
                    .map(|r| (Shape::Sphere(r), self.link_poses[i]))
                    .into_iter()
                    .collect())
            }
            ContactTarget::Body(handle) => {
                let body = self.body(*handle)?;
                Ok(vec![(body.spec.shape, body.pose)])
            }
        }
    }

    fn advance_joints(&mut self) {
        for (i, joint) in self.model.joints().iter().enumerate() {
            let max_step = self.speed * joint.max_velocity * self.physics_dt;
            let delta = (self.targets[i] - self.angles[i]).clamp(-max_step, max_step);
            self.angles[i] += delta;
        }
        self.update_links();
    }

    /// Move dynamic bodies out of penetrating link spheres.
    fn resolve_contacts(&mut self) {
        let spheres: Vec<(Point3<f32>, f32)> =
            self.robot_spheres().map(|(_, c, r)| (c, r)).collect();
        for body in self.bodies.values_mut().filter(|b| !b.spec.is_static) {
            for (center, radius) in &spheres {
                let depth = signed_distance(&body.spec.shape, &body.pose, center) - radius;
                if depth < 0.0 {
                    let normal = surface_normal(&body.spec.shape, &body.pose, center);
                    body.pose.translation.vector += normal * depth;
                }
            }
        }
    }
}

impl SimSession for KinematicSession {
    fn id(&self) -> SessionId {
        self.id
    }

    fn reset_joints(&mut self, joints: &[String], angles: &[f32]) -> Result<(), SimError> {
        self.live()?;
        if joints.len() != angles.len() {
            return Err(SimError::CommandRejected(format!(
                "{} joints but {} angles",
                joints.len(),
                angles.len()
            )));
        }
        for (name, angle) in joints.iter().zip(angles) {
            let i = self.joint(name)?;
            let angle = self.model.joints()[i].clamp(*angle);
            self.angles[i] = angle;
            self.targets[i] = angle;
        }
        self.update_links();
        Ok(())
    }

    fn spawn_body(&mut self, spec: &BodySpec) -> Result<BodyHandle, SimError> {
        self.live()?;
        if !spec.shape.is_valid() || !spec.pose.is_finite() {
            return Err(SimError::CommandRejected(format!(
                "invalid body spec for {}",
                spec.name
            )));
        }
        let handle = BodyHandle(self.next_body);
        self.next_body += 1;
        self.bodies.insert(
            handle.0,
            SimBody {
                spec: spec.clone(),
                pose: to_isometry(&spec.pose),
            },
        );
        debug!(body = %spec.name, ?handle, "body spawned");
        Ok(handle)
    }

    fn remove_body(&mut self, body: BodyHandle) -> Result<(), SimError> {
        self.live()?;
        self.bodies
            .remove(&body.0)
            .map(|_| ())
            .ok_or(SimError::BodyNotFound(body))
    }

    fn subscribe_camera(
        &mut self,
        camera: CameraId,
        resolution: Resolution,
    ) -> Result<SensorHandle, SimError> {
        self.live()?;
        if self.model.link_index(camera.optical_frame()).is_none() {
            return Err(SimError::SensorUnavailable(camera.optical_frame().into()));
        }
        let handle = SensorHandle(self.next_sensor);
        self.next_sensor += 1;
        self.cameras.insert(handle.0, (camera, resolution));
        debug!(?camera, ?resolution, sensor = handle.0, "camera subscribed");
        Ok(handle)
    }

    fn unsubscribe_camera(&mut self, sensor: SensorHandle) -> Result<(), SimError> {
        self.live()?;
        self.cameras
            .remove(&sensor.0)
            .map(|_| ())
            .ok_or(SimError::SensorNotSubscribed(sensor))
    }

    fn camera_frame(&self, sensor: SensorHandle) -> Result<CameraFrame, SimError> {
        self.live()?;
        let (camera, resolution) = self
            .cameras
            .get(&sensor.0)
            .copied()
            .ok_or(SimError::SensorNotSubscribed(sensor))?;
        let link = self
            .model
            .link_index(camera.optical_frame())
            .ok_or_else(|| SimError::SensorUnavailable(camera.optical_frame().into()))?;
        let scene: Vec<Renderable> = self
            .bodies
            .values()
            .map(|b| Renderable {
                shape: b.spec.shape,
                pose: b.pose,
                color: rgb8(b.spec.color),
            })
            .collect();
        render(camera, resolution, &self.link_poses[link], &scene, self.floor)
    }

    fn joint_angles(&self, joints: &[String]) -> Result<Vec<f32>, SimError> {
        self.live()?;
        joints
            .iter()
            .map(|name| self.joint(name).map(|i| self.angles[i]))
            .collect()
    }

    fn link_pose(&self, link: &str) -> Result<Pose, SimError> {
        self.live()?;
        let i = self
            .model
            .link_index(link)
            .ok_or_else(|| SimError::UnknownLink(link.into()))?;
        Ok(from_isometry(&self.link_poses[i]))
    }

    fn body_pose(&self, body: BodyHandle) -> Result<Pose, SimError> {
        self.live()?;
        Ok(from_isometry(&self.body(body)?.pose))
    }

    fn set_angles(&mut self, joints: &[String], angles: &[f32], speed: f32) -> Result<(), SimError> {
        self.live()?;
        if joints.len() != angles.len() {
            return Err(SimError::CommandRejected(format!(
                "{} joints but {} angles",
                joints.len(),
                angles.len()
            )));
        }
        if !(speed > 0.0) || !speed.is_finite() {
            return Err(SimError::CommandRejected(format!("speed {speed} not in (0, 1]")));
        }
        if angles.iter().any(|a| !a.is_finite()) {
            return Err(SimError::CommandRejected("non-finite joint target".into()));
        }
        let indices = joints
            .iter()
            .map(|name| self.joint(name))
            .collect::<Result<Vec<_>, _>>()?;
        for (i, angle) in indices.into_iter().zip(angles) {
            self.targets[i] = self.model.joints()[i].clamp(*angle);
        }
        self.speed = speed.min(1.0);
        Ok(())
    }

    fn step_simulation(&mut self, ticks: u32) -> Result<(), SimError> {
        self.live()?;
        for _ in 0..ticks {
            self.advance_joints();
            self.resolve_contacts();
        }
        self.ticks += u64::from(ticks);
        Ok(())
    }

    fn in_contact(&self, a: &ContactTarget, b: &ContactTarget) -> Result<bool, SimError> {
        self.live()?;
        let robot = |t: &ContactTarget| !matches!(t, ContactTarget::Body(_));
        let first = self.shapes_of(a)?;
        let second = self.shapes_of(b)?;
        if robot(a) && robot(b) {
            return Ok(false);
        }
        Ok(first.iter().any(|(sa, pa)| {
            second
                .iter()
                .any(|(sb, pb)| shapes_touch(sa, pa, sb, pb, self.contact_margin))
        }))
    }

    fn disconnect(&mut self) -> Result<(), SimError> {
        self.live()?;
        self.connected = false;
        self.cameras.clear();
        self.bodies.clear();
        debug!(session = %self.id, ticks = self.ticks, "kinematic session closed");
        Ok(())
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "KinematicSession"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pepper_core::types::PixelFormat;

    fn names(joints: &[&str]) -> Vec<String> {
        joints.iter().map(|j| (*j).to_string()).collect()
    }

    fn session() -> KinematicSession {
        KinematicSession::from_config(&EnvConfig::default()).unwrap()
    }

    fn ball(name: &str, position: [f32; 3], is_static: bool) -> BodySpec {
        BodySpec {
            name: name.into(),
            shape: Shape::Sphere(0.05),
            pose: Pose::from_position(position),
            color: [1.0, 0.0, 0.0, 1.0],
            is_static,
        }
    }

    #[test]
    fn starts_at_initial_pose() {
        let s = session();
        let config = EnvConfig::default();
        let angles = s.joint_angles(&config.robot.joint_names()).unwrap();
        assert_eq!(angles, config.robot.initial_angles());
    }

    #[test]
    fn rejects_bad_timestep() {
        assert_eq!(
            KinematicSession::new(RobotModel::pepper(), 0.0).unwrap_err(),
            ModelError::InvalidTimestep(0.0)
        );
    }

    #[test]
    fn joints_move_at_bounded_speed() {
        let mut s = session();
        let joint = names(&["HeadYaw"]);
        s.reset_joints(&joint, &[0.0]).unwrap();
        s.set_angles(&joint, &[1.0], 0.5).unwrap();
        s.step_simulation(1).unwrap();
        // 0.5 * 7.33 rad/s * 0.01 s
        assert_relative_eq!(s.joint_angles(&joint).unwrap()[0], 0.036_65, epsilon = 1e-5);
        s.step_simulation(100).unwrap();
        assert_relative_eq!(s.joint_angles(&joint).unwrap()[0], 1.0, epsilon = 1e-5);
        assert_eq!(s.ticks(), 101);
    }

    #[test]
    fn targets_are_clamped() {
        let mut s = session();
        let joint = names(&["HeadPitch"]);
        s.set_angles(&joint, &[3.0], 1.0).unwrap();
        s.step_simulation(200).unwrap();
        assert_relative_eq!(s.joint_angles(&joint).unwrap()[0], 0.6371, epsilon = 1e-5);
    }

    #[test]
    fn bad_commands_rejected() {
        let mut s = session();
        let joint = names(&["HeadYaw"]);
        assert!(matches!(
            s.set_angles(&joint, &[0.0], 0.0),
            Err(SimError::CommandRejected(_))
        ));
        assert!(matches!(
            s.set_angles(&joint, &[f32::NAN], 1.0),
            Err(SimError::CommandRejected(_))
        ));
        assert_eq!(
            s.set_angles(&names(&["RHand"]), &[0.0], 1.0).unwrap_err(),
            SimError::UnknownJoint("RHand".into())
        );
    }

    #[test]
    fn head_yaw_turns_camera() {
        let mut s = session();
        let before = s.link_pose("CameraTop_optical_frame").unwrap();
        s.reset_joints(&names(&["HeadYaw"]), &[1.0]).unwrap();
        let after = s.link_pose("CameraTop_optical_frame").unwrap();
        assert!((before.position[1] - after.position[1]).abs() > 0.05);
    }

    #[test]
    fn hand_contact_with_body() {
        let mut s = session();
        let hand = s.link_pose("l_hand").unwrap().position;
        let near = s.spawn_body(&ball("target", hand, true)).unwrap();
        let far = s.spawn_body(&ball("other", [2.0, 0.0, 0.5], true)).unwrap();
        let link = ContactTarget::Link("l_hand".into());
        assert!(s.in_contact(&link, &ContactTarget::Body(near)).unwrap());
        assert!(s.in_contact(&ContactTarget::Body(near), &ContactTarget::Robot).unwrap());
        assert!(!s.in_contact(&link, &ContactTarget::Body(far)).unwrap());
        assert!(!s.in_contact(&ContactTarget::Robot, &link).unwrap());
        assert_eq!(
            s.in_contact(&ContactTarget::Link("nope".into()), &ContactTarget::Body(near))
                .unwrap_err(),
            SimError::UnknownLink("nope".into())
        );
    }

    #[test]
    fn contact_margin_widens_contacts() {
        let hand = session().link_pose("l_hand").unwrap().position;
        // hand sphere 0.03 + ball 0.05, 1 cm apart
        let above = [hand[0], hand[1], hand[2] + 0.09];
        let link = ContactTarget::Link("l_hand".into());

        let mut tight = session();
        let ball_tight = tight.spawn_body(&ball("target", above, true)).unwrap();
        assert!(!tight.in_contact(&link, &ContactTarget::Body(ball_tight)).unwrap());

        let mut loose = session().with_contact_margin(0.02);
        let ball_loose = loose.spawn_body(&ball("target", above, true)).unwrap();
        assert!(loose.in_contact(&link, &ContactTarget::Body(ball_loose)).unwrap());
    }

    #[test]
    fn sweeping_arm_pushes_dynamic_body() {
        let mut s = session();
        let hand = s.link_pose("l_hand").unwrap().position;
        let dynamic = s.spawn_body(&ball("box", hand, false)).unwrap();
        let fixed = s.spawn_body(&ball("post", hand, true)).unwrap();
        s.step_simulation(1).unwrap();
        let moved = s.body_pose(dynamic).unwrap();
        let stayed = s.body_pose(fixed).unwrap();
        assert!(Pose::from_position(hand).distance_to(&moved) > 0.05);
        assert_relative_eq!(Pose::from_position(hand).distance_to(&stayed), 0.0);
    }

    #[test]
    fn cameras_render_configured_format() {
        let mut s = session();
        let color = s.subscribe_camera(CameraId::Bottom, Resolution::Qqvga).unwrap();
        let depth = s.subscribe_camera(CameraId::Depth, Resolution::Qvga).unwrap();
        let rgb = s.camera_frame(color).unwrap();
        let d = s.camera_frame(depth).unwrap();
        assert_eq!(rgb.format(), PixelFormat::Rgb8);
        assert_eq!(rgb.shape(), vec![120, 160, 3]);
        assert_eq!(d.shape(), vec![240, 320]);

        s.unsubscribe_camera(color).unwrap();
        assert_eq!(
            s.camera_frame(color).unwrap_err(),
            SimError::SensorNotSubscribed(color)
        );
    }

    #[test]
    fn camera_sees_body_in_front() {
        let mut s = session();
        let top = s.subscribe_camera(CameraId::Top, Resolution::Qqvga).unwrap();
        // level head: optical axis along world +x
        s.reset_joints(&names(&["HeadPitch"]), &[0.0]).unwrap();
        let [cx, cy, cz] = s.link_pose("CameraTop_optical_frame").unwrap().position;
        s.spawn_body(&BodySpec {
            color: [0.0, 0.0, 1.0, 1.0],
            ..ball("marker", [cx + 0.5, cy, cz], true)
        })
        .unwrap();
        let frame = s.camera_frame(top).unwrap();
        assert_eq!(frame.rgb_at(80, 60), Some([0, 0, 255]));
    }

    #[test]
    fn floor_can_be_hidden() {
        use crate::camera::{BACKGROUND_COLOR, FLOOR_COLOR};

        let mut with = session();
        let mut without = session().with_floor(false);
        let a = with.subscribe_camera(CameraId::Bottom, Resolution::Qqvga).unwrap();
        let b = without.subscribe_camera(CameraId::Bottom, Resolution::Qqvga).unwrap();
        assert_eq!(with.camera_frame(a).unwrap().rgb_at(80, 60), Some(FLOOR_COLOR));
        assert_eq!(
            without.camera_frame(b).unwrap().rgb_at(80, 60),
            Some(BACKGROUND_COLOR)
        );
    }

    #[test]
    fn disconnect_releases_everything() {
        let mut s = session();
        s.spawn_body(&ball("b", [1.0, 0.0, 0.0], true)).unwrap();
        s.disconnect().unwrap();
        assert!(!s.is_connected());
        assert_eq!(s.step_simulation(1).unwrap_err(), SimError::Disconnected);
        assert_eq!(s.link_pose("l_hand").unwrap_err(), SimError::Disconnected);
        assert_eq!(s.disconnect().unwrap_err(), SimError::Disconnected);
    }

    #[test]
    fn session_ids_are_unique() {
        assert_ne!(session().id(), session().id());
    }
}
