//! Observation assembly, one pluggable variant per sensing capability.
//!
//! The controller holds a `Box<dyn ObservationAssembler>` chosen from an
//! [`ObservationMode`] at construction. Every variant reports the camera
//! link pose and the controllable joint angles; camera variants add the
//! image from their subscribed sensor.

use std::collections::BTreeMap;

use pepper_core::config::CameraConfig;
use pepper_core::error::SimError;
use pepper_core::traits::SimSession;
use pepper_core::types::{
    CAMERA_KEY, CAMERA_POSE_KEY, CameraId, JOINTS_STATE_KEY, Observation, ObservationSpace,
    Resolution, SensorHandle,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which image (if any) goes into `Observation::camera`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationMode {
    /// RGB image from the configured top or bottom camera.
    Color,
    /// Depth image (millimetres) from the depth camera.
    Depth,
    /// No image.
    PoseOnly,
}

/// Builds [`Observation`]s from session queries.
pub trait ObservationAssembler: Send {
    /// Attach sensors. Called on every reset; replaces earlier subscriptions.
    fn setup(&mut self, session: &mut dyn SimSession) -> Result<(), SimError>;

    /// Detach sensors.
    fn teardown(&mut self, session: &mut dyn SimSession) -> Result<(), SimError>;

    /// Read the current state into an observation.
    fn assemble(&self, session: &dyn SimSession, joints: &[String])
    -> Result<Observation, SimError>;

    /// Declared space for `num_joints` controllable joints.
    fn observation_space(&self, num_joints: usize) -> ObservationSpace;

    fn mode(&self) -> ObservationMode;

    fn name(&self) -> &str;
}

/// Assembler for `mode`.
#[must_use]
pub fn assembler_for(mode: ObservationMode, camera: &CameraConfig) -> Box<dyn ObservationAssembler> {
    match mode {
        ObservationMode::Color => {
            let id = match camera.camera {
                CameraId::Depth => CameraId::Bottom,
                other => other,
            };
            Box::new(CameraAssembler::new(id, camera.resolution, &camera.pose_link))
        }
        ObservationMode::Depth => Box::new(CameraAssembler::new(
            CameraId::Depth,
            camera.resolution,
            &camera.pose_link,
        )),
        ObservationMode::PoseOnly => Box::new(PoseAssembler::new(&camera.pose_link)),
    }
}

// ---------------------------------------------------------------------------
// Shared pieces
// ---------------------------------------------------------------------------

fn camera_pose(session: &dyn SimSession, link: &str) -> Result<[f32; 7], SimError> {
    let pose = session.link_pose(link).map_err(|e| match e {
        SimError::UnknownLink(name) => SimError::SensorUnavailable(name),
        other => other,
    })?;
    Ok(pose.to_array())
}

fn joints_state(session: &dyn SimSession, joints: &[String]) -> Result<Vec<f32>, SimError> {
    let angles = session.joint_angles(joints)?;
    if angles.len() != joints.len() {
        return Err(SimError::Desync(format!(
            "asked for {} joint angles, got {}",
            joints.len(),
            angles.len()
        )));
    }
    Ok(angles)
}

fn vector_spaces(num_joints: usize) -> BTreeMap<String, ObservationSpace> {
    let mut spaces = BTreeMap::new();
    spaces.insert(CAMERA_POSE_KEY.to_string(), ObservationSpace::unbounded(7));
    spaces.insert(
        JOINTS_STATE_KEY.to_string(),
        ObservationSpace::unbounded(num_joints),
    );
    spaces
}

// ---------------------------------------------------------------------------
// CameraAssembler
// ---------------------------------------------------------------------------

/// Image + camera pose + joints, for colour and depth cameras alike.
#[derive(Debug)]
pub struct CameraAssembler {
    camera: CameraId,
    resolution: Resolution,
    pose_link: String,
    sensor: Option<SensorHandle>,
}

impl CameraAssembler {
    #[must_use]
    pub fn new(camera: CameraId, resolution: Resolution, pose_link: &str) -> Self {
        Self {
            camera,
            resolution,
            pose_link: pose_link.into(),
            sensor: None,
        }
    }

    #[must_use]
    pub const fn camera(&self) -> CameraId {
        self.camera
    }

    #[must_use]
    pub const fn sensor(&self) -> Option<SensorHandle> {
        self.sensor
    }
}

impl ObservationAssembler for CameraAssembler {
    fn setup(&mut self, session: &mut dyn SimSession) -> Result<(), SimError> {
        if let Some(old) = self.sensor.take() {
            session.unsubscribe_camera(old)?;
        }
        let handle = session.subscribe_camera(self.camera, self.resolution)?;
        debug!(camera = ?self.camera, resolution = ?self.resolution, sensor = handle.0, "camera subscribed");
        self.sensor = Some(handle);
        Ok(())
    }

    fn teardown(&mut self, session: &mut dyn SimSession) -> Result<(), SimError> {
        if let Some(handle) = self.sensor.take() {
            session.unsubscribe_camera(handle)?;
        }
        Ok(())
    }

    fn assemble(
        &self,
        session: &dyn SimSession,
        joints: &[String],
    ) -> Result<Observation, SimError> {
        let sensor = self
            .sensor
            .ok_or_else(|| SimError::SensorUnavailable(self.camera.optical_frame().into()))?;
        let frame = session.camera_frame(sensor)?;
        let expected = (self.resolution.width(), self.resolution.height());
        if (frame.width(), frame.height()) != expected || frame.format() != self.camera.format() {
            return Err(SimError::Desync(format!(
                "{} frame is {}x{} {:?}, expected {}x{} {:?}",
                self.camera.optical_frame(),
                frame.width(),
                frame.height(),
                frame.format(),
                expected.0,
                expected.1,
                self.camera.format()
            )));
        }
        Ok(Observation {
            camera: Some(frame),
            camera_pose: camera_pose(session, &self.pose_link)?,
            joints_state: joints_state(session, joints)?,
        })
    }

    fn observation_space(&self, num_joints: usize) -> ObservationSpace {
        let mut spaces = vector_spaces(num_joints);
        spaces.insert(
            CAMERA_KEY.to_string(),
            ObservationSpace::Image {
                height: self.resolution.height(),
                width: self.resolution.width(),
                format: self.camera.format(),
            },
        );
        ObservationSpace::Dict { spaces }
    }

    fn mode(&self) -> ObservationMode {
        match self.camera {
            CameraId::Depth => ObservationMode::Depth,
            CameraId::Top | CameraId::Bottom => ObservationMode::Color,
        }
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "CameraAssembler"
    }
}

// ---------------------------------------------------------------------------
// PoseAssembler
// ---------------------------------------------------------------------------

/// Camera pose + joints, no image.
#[derive(Debug)]
pub struct PoseAssembler {
    pose_link: String,
}

impl PoseAssembler {
    #[must_use]
    pub fn new(pose_link: &str) -> Self {
        Self {
            pose_link: pose_link.into(),
        }
    }
}

impl ObservationAssembler for PoseAssembler {
    fn setup(&mut self, _session: &mut dyn SimSession) -> Result<(), SimError> {
        Ok(())
    }

    fn teardown(&mut self, _session: &mut dyn SimSession) -> Result<(), SimError> {
        Ok(())
    }

    fn assemble(
        &self,
        session: &dyn SimSession,
        joints: &[String],
    ) -> Result<Observation, SimError> {
        Ok(Observation {
            camera: None,
            camera_pose: camera_pose(session, &self.pose_link)?,
            joints_state: joints_state(session, joints)?,
        })
    }

    fn observation_space(&self, num_joints: usize) -> ObservationSpace {
        ObservationSpace::Dict {
            spaces: vector_spaces(num_joints),
        }
    }

    fn mode(&self) -> ObservationMode {
        ObservationMode::PoseOnly
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "PoseAssembler"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
