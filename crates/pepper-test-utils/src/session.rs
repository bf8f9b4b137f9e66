//! A scripted [`SimSession`] for driving the episode controller in tests.
//!
//! The session keeps its state behind a shared [`ScriptHandle`], so a test
//! can hand the session to an environment and still move links, add
//! contacts, displace bodies, or inject failures between steps.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use pepper_core::config::EnvConfig;
use pepper_core::error::SimError;
use pepper_core::traits::SimSession;
use pepper_core::types::{
    BodyHandle, BodySpec, CameraFrame, CameraId, ContactTarget, Pose, Resolution, SensorHandle,
    SessionId,
};

// ---------------------------------------------------------------------------
// SessionCall
// ---------------------------------------------------------------------------

/// Commands the session received, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCall {
    ResetJoints(Vec<f32>),
    SpawnBody(String),
    RemoveBody(BodyHandle),
    SubscribeCamera(CameraId, Resolution),
    UnsubscribeCamera(SensorHandle),
    SetAngles { angles: Vec<f32>, speed: f32 },
    StepSimulation(u32),
    Disconnect,
}

// ---------------------------------------------------------------------------
// ScriptState
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct ScriptedBody {
    spec: BodySpec,
    pose: Pose,
}

#[derive(Debug, Default)]
struct ScriptState {
    joints: HashMap<String, f32>,
    pending: Vec<(String, f32)>,
    links: HashMap<String, Pose>,
    bodies: BTreeMap<u32, ScriptedBody>,
    next_body: u32,
    cameras: BTreeMap<u32, (CameraId, Resolution)>,
    next_sensor: u32,
    /// `(link, body name)`; `None` means "some robot link".
    contacts: Vec<(Option<String>, String)>,
    frame_override: Option<CameraFrame>,
    unavailable: HashSet<CameraId>,
    rejected_spawns: HashSet<String>,
    fail_next_step: Option<SimError>,
    calls: Vec<SessionCall>,
    ticks: u64,
    connected: bool,
}

impl ScriptState {
    fn body_name(&self, handle: BodyHandle) -> Result<&str, SimError> {
        self.bodies
            .get(&handle.0)
            .map(|b| b.spec.name.as_str())
            .ok_or(SimError::BodyNotFound(handle))
    }

    fn body_by_name_mut(&mut self, name: &str) -> Option<&mut ScriptedBody> {
        self.bodies.values_mut().find(|b| b.spec.name == name)
    }

    fn touches(&self, robot: &ContactTarget, body: &str) -> bool {
        self.contacts.iter().any(|(link, name)| {
            name == body
                && match robot {
                    ContactTarget::Robot => true,
                    ContactTarget::Link(l) => link.as_deref() == Some(l.as_str()),
                    ContactTarget::Body(_) => false,
                }
        })
    }
}

// ---------------------------------------------------------------------------
// ScriptHandle
// ---------------------------------------------------------------------------

/// Test-side handle onto a [`ScriptedSession`]'s state.
#[derive(Debug, Clone)]
pub struct ScriptHandle(Arc<Mutex<ScriptState>>);

impl ScriptHandle {
    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_link_pose(&self, link: &str, pose: Pose) {
        self.lock().links.insert(link.into(), pose);
    }

    pub fn remove_link(&self, link: &str) {
        self.lock().links.remove(link);
    }

    /// Place the named link exactly on the named body.
    pub fn move_link_to_body(&self, link: &str, body: &str) {
        let mut state = self.lock();
        let pose = state
            .bodies
            .values()
            .find(|b| b.spec.name == body)
            .map(|b| b.pose);
        if let Some(pose) = pose {
            state.links.insert(link.into(), pose);
        }
    }

    /// Overwrite the current pose of a spawned body (by name).
    pub fn set_body_pose(&self, body: &str, pose: Pose) {
        if let Some(b) = self.lock().body_by_name_mut(body) {
            b.pose = pose;
        }
    }

    #[must_use]
    pub fn body_pose(&self, body: &str) -> Option<Pose> {
        self.lock()
            .bodies
            .values()
            .find(|b| b.spec.name == body)
            .map(|b| b.pose)
    }

    /// Script a contact between a robot link (or any link with `None`) and a body.
    pub fn add_contact(&self, link: Option<&str>, body: &str) {
        self.lock()
            .contacts
            .push((link.map(str::to_string), body.into()));
    }

    pub fn clear_contacts(&self) {
        self.lock().contacts.clear();
    }

    /// Return this frame from every subscribed camera.
    pub fn set_frame(&self, frame: CameraFrame) {
        self.lock().frame_override = Some(frame);
    }

    /// Make subscriptions to `camera` fail.
    pub fn make_unavailable(&self, camera: CameraId) {
        self.lock().unavailable.insert(camera);
    }

    /// Make `spawn_body` fail for bodies named `name`.
    pub fn reject_spawn(&self, name: &str) {
        self.lock().rejected_spawns.insert(name.to_string());
    }

    pub fn allow_spawn(&self, name: &str) {
        self.lock().rejected_spawns.remove(name);
    }

    /// The next `step_simulation` fails with `error`.
    pub fn fail_next_step(&self, error: SimError) {
        self.lock().fail_next_step = Some(error);
    }

    #[must_use]
    pub fn joint_angle(&self, joint: &str) -> Option<f32> {
        self.lock().joints.get(joint).copied()
    }

    #[must_use]
    pub fn calls(&self) -> Vec<SessionCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Last `SetAngles` command, if any.
    #[must_use]
    pub fn last_command(&self) -> Option<(Vec<f32>, f32)> {
        self.lock().calls.iter().rev().find_map(|c| match c {
            SessionCall::SetAngles { angles, speed } => Some((angles.clone(), *speed)),
            _ => None,
        })
    }

    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.lock().ticks
    }

    #[must_use]
    pub fn body_count(&self) -> usize {
        self.lock().bodies.len()
    }

    #[must_use]
    pub fn subscribed_cameras(&self) -> Vec<CameraId> {
        self.lock().cameras.values().map(|(id, _)| *id).collect()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.lock().connected
    }
}

// ---------------------------------------------------------------------------
// ScriptedSession
// ---------------------------------------------------------------------------

/// In-memory session: joints snap to their targets on the next tick, bodies
/// stay where they are put, contacts exist only when scripted.
#[derive(Debug)]
pub struct ScriptedSession {
    id: SessionId,
    state: ScriptHandle,
}

impl ScriptedSession {
    /// Session knowing the given joints and links, all at zero / identity.
    pub fn new(joints: &[&str], links: &[&str]) -> (Self, ScriptHandle) {
        let state = ScriptState {
            joints: joints.iter().map(|j| ((*j).to_string(), 0.0)).collect(),
            links: links
                .iter()
                .map(|l| ((*l).to_string(), Pose::IDENTITY))
                .collect(),
            connected: true,
            ..ScriptState::default()
        };
        let handle = ScriptHandle(Arc::new(Mutex::new(state)));
        (
            Self {
                id: SessionId(0),
                state: handle.clone(),
            },
            handle,
        )
    }

    /// Session matching a configuration.
    ///
    /// The camera link sits 1.2 m above the origin looking along +x; the
    /// effector starts 1 m away from everything.
    pub fn for_config(config: &EnvConfig) -> (Self, ScriptHandle) {
        let joints: Vec<&str> = config.robot.joints.iter().map(|j| j.name.as_str()).collect();
        let links = [
            config.camera.pose_link.as_str(),
            config.robot.effector_link.as_str(),
        ];
        let (session, handle) = Self::new(&joints, &links);
        handle.set_link_pose(
            &config.camera.pose_link,
            Pose::from_position([0.0, 0.0, 1.2]),
        );
        handle.set_link_pose(
            &config.robot.effector_link,
            Pose::from_position([-1.0, 0.0, 0.0]),
        );
        (session, handle)
    }

    fn live(&self) -> Result<MutexGuard<'_, ScriptState>, SimError> {
        let state = self.state.lock();
        if state.connected {
            Ok(state)
        } else {
            Err(SimError::Disconnected)
        }
    }
}

impl SimSession for ScriptedSession {
    fn id(&self) -> SessionId {
        self.id
    }

    fn reset_joints(&mut self, joints: &[String], angles: &[f32]) -> Result<(), SimError> {
        let mut state = self.live()?;
        for (name, angle) in joints.iter().zip(angles) {
            let slot = state
                .joints
                .get_mut(name)
                .ok_or_else(|| SimError::UnknownJoint(name.clone()))?;
            *slot = *angle;
        }
        state.pending.clear();
        state.calls.push(SessionCall::ResetJoints(angles.to_vec()));
        Ok(())
    }

    fn spawn_body(&mut self, spec: &BodySpec) -> Result<BodyHandle, SimError> {
        let mut state = self.live()?;
        if state.rejected_spawns.contains(&spec.name) {
            return Err(SimError::CommandRejected(format!("spawn of {}", spec.name)));
        }
        let handle = BodyHandle(state.next_body);
        state.next_body += 1;
        state.bodies.insert(
            handle.0,
            ScriptedBody {
                spec: spec.clone(),
                pose: spec.pose,
            },
        );
        state.calls.push(SessionCall::SpawnBody(spec.name.clone()));
        Ok(handle)
    }

    fn remove_body(&mut self, body: BodyHandle) -> Result<(), SimError> {
        let mut state = self.live()?;
        let removed = state
            .bodies
            .remove(&body.0)
            .ok_or(SimError::BodyNotFound(body))?;
        state.contacts.retain(|(_, name)| *name != removed.spec.name);
        state.calls.push(SessionCall::RemoveBody(body));
        Ok(())
    }

    fn subscribe_camera(
        &mut self,
        camera: CameraId,
        resolution: Resolution,
    ) -> Result<SensorHandle, SimError> {
        let mut state = self.live()?;
        if state.unavailable.contains(&camera) {
            return Err(SimError::SensorUnavailable(camera.optical_frame().into()));
        }
        let handle = SensorHandle(state.next_sensor);
        state.next_sensor += 1;
        state.cameras.insert(handle.0, (camera, resolution));
        state
            .calls
            .push(SessionCall::SubscribeCamera(camera, resolution));
        Ok(handle)
    }

    fn unsubscribe_camera(&mut self, sensor: SensorHandle) -> Result<(), SimError> {
        let mut state = self.live()?;
        state
            .cameras
            .remove(&sensor.0)
            .ok_or(SimError::SensorNotSubscribed(sensor))?;
        state.calls.push(SessionCall::UnsubscribeCamera(sensor));
        Ok(())
    }

    fn camera_frame(&self, sensor: SensorHandle) -> Result<CameraFrame, SimError> {
        let state = self.live()?;
        let (camera, resolution) = state
            .cameras
            .get(&sensor.0)
            .copied()
            .ok_or(SimError::SensorNotSubscribed(sensor))?;
        Ok(state.frame_override.clone().unwrap_or_else(|| {
            CameraFrame::zeros(resolution.width(), resolution.height(), camera.format())
        }))
    }

    fn joint_angles(&self, joints: &[String]) -> Result<Vec<f32>, SimError> {
        let state = self.live()?;
        joints
            .iter()
            .map(|name| {
                state
                    .joints
                    .get(name)
                    .copied()
                    .ok_or_else(|| SimError::UnknownJoint(name.clone()))
            })
            .collect()
    }

    fn link_pose(&self, link: &str) -> Result<Pose, SimError> {
        self.live()?
            .links
            .get(link)
            .copied()
            .ok_or_else(|| SimError::UnknownLink(link.into()))
    }

    fn body_pose(&self, body: BodyHandle) -> Result<Pose, SimError> {
        self.live()?
            .bodies
            .get(&body.0)
            .map(|b| b.pose)
            .ok_or(SimError::BodyNotFound(body))
    }

    fn set_angles(&mut self, joints: &[String], angles: &[f32], speed: f32) -> Result<(), SimError> {
        let mut state = self.live()?;
        if joints.len() != angles.len() {
            return Err(SimError::CommandRejected(format!(
                "{} joints but {} angles",
                joints.len(),
                angles.len()
            )));
        }
        for name in joints {
            if !state.joints.contains_key(name) {
                return Err(SimError::UnknownJoint(name.clone()));
            }
        }
        state.pending = joints.iter().cloned().zip(angles.iter().copied()).collect();
        state.calls.push(SessionCall::SetAngles {
            angles: angles.to_vec(),
            speed,
        });
        Ok(())
    }

    fn step_simulation(&mut self, ticks: u32) -> Result<(), SimError> {
        let mut state = self.live()?;
        if let Some(err) = state.fail_next_step.take() {
            return Err(err);
        }
        let pending = std::mem::take(&mut state.pending);
        for (name, angle) in pending {
            state.joints.insert(name, angle);
        }
        state.ticks += u64::from(ticks);
        state.calls.push(SessionCall::StepSimulation(ticks));
        Ok(())
    }

    fn in_contact(&self, a: &ContactTarget, b: &ContactTarget) -> Result<bool, SimError> {
        let state = self.live()?;
        match (a, b) {
            (ContactTarget::Body(body), robot) | (robot, ContactTarget::Body(body))
                if !matches!(robot, ContactTarget::Body(_)) =>
            {
                let name = state.body_name(*body)?;
                Ok(state.touches(robot, name))
            }
            _ => Ok(false),
        }
    }

    fn disconnect(&mut self) -> Result<(), SimError> {
        let mut state = self.live()?;
        state.connected = false;
        state.cameras.clear();
        state.calls.push(SessionCall::Disconnect);
        Ok(())
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "ScriptedSession"
    }
}
