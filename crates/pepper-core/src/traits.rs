use crate::error::SimError;
use crate::types::{
    BodyHandle, BodySpec, CameraFrame, CameraId, ContactTarget, Pose, Resolution, SensorHandle,
    SessionId,
};

// ---------------------------------------------------------------------------
// SimSession
// ---------------------------------------------------------------------------

/// Exclusive handle to one simulation-backend session.
///
/// The episode controller owns exactly one session and issues every query and
/// command through it; nothing is shared between environment instances. All
/// calls are synchronous and run to completion. Any error leaves the episode
/// unusable until the next reset.
///
/// Once [`disconnect`](Self::disconnect) returns, every further call fails
/// with [`SimError::Disconnected`].
pub trait SimSession: Send {
    /// Identifier of this backend connection.
    fn id(&self) -> SessionId;

    /// Teleport the named joints to the given angles with zero velocity.
    fn reset_joints(&mut self, joints: &[String], angles: &[f32]) -> Result<(), SimError>;

    /// Spawn a rigid body.
    fn spawn_body(&mut self, spec: &BodySpec) -> Result<BodyHandle, SimError>;

    fn remove_body(&mut self, body: BodyHandle) -> Result<(), SimError>;

    /// Attach a camera at the given resolution.
    fn subscribe_camera(
        &mut self,
        camera: CameraId,
        resolution: Resolution,
    ) -> Result<SensorHandle, SimError>;

    fn unsubscribe_camera(&mut self, sensor: SensorHandle) -> Result<(), SimError>;

    /// Latest image from a subscribed camera.
    fn camera_frame(&self, sensor: SensorHandle) -> Result<CameraFrame, SimError>;

    /// Current angles (rad) of the named joints, in the given order.
    fn joint_angles(&self, joints: &[String]) -> Result<Vec<f32>, SimError>;

    /// World pose of a robot link.
    fn link_pose(&self, link: &str) -> Result<Pose, SimError>;

    /// World pose of a spawned body.
    fn body_pose(&self, body: BodyHandle) -> Result<Pose, SimError>;

    /// Command position targets. `speed` is a fraction (0, 1] of each
    /// joint's maximum velocity. Motion happens during later ticks.
    fn set_angles(&mut self, joints: &[String], angles: &[f32], speed: f32)
    -> Result<(), SimError>;

    /// Advance the backend by `ticks` fixed timesteps.
    fn step_simulation(&mut self, ticks: u32) -> Result<(), SimError>;

    /// Whether the two targets currently touch.
    fn in_contact(&self, a: &ContactTarget, b: &ContactTarget) -> Result<bool, SimError>;

    /// Release the backend connection.
    fn disconnect(&mut self) -> Result<(), SimError>;

    /// Human-readable backend name.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

// ---------------------------------------------------------------------------
// ObjectDetector
// ---------------------------------------------------------------------------

/// Black-box visual predicate: is the target visible in this image?
///
/// Any `Fn(&CameraFrame) -> bool + Send` is a detector, so tests can stub
/// it with a closure.
pub trait ObjectDetector: Send {
    fn is_object_in_sight(&self, frame: &CameraFrame) -> bool;

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "ObjectDetector"
    }
}

impl<F> ObjectDetector for F
where
    F: Fn(&CameraFrame) -> bool + Send,
{
    fn is_object_in_sight(&self, frame: &CameraFrame) -> bool {
        self(frame)
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "closure"
    }
}
