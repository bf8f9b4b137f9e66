use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::randomize::RandomizationRange;
use crate::types::{BodySpec, CameraId, Pose, Resolution};

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_physics_dt() -> f64 {
    0.01
}
const fn default_control_dt() -> f64 {
    0.05
}
const fn default_settle_ticks() -> u32 {
    20
}
const fn default_max_episode_steps() -> u32 {
    200
}
const fn default_orientation() -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0]
}
const fn default_true() -> bool {
    true
}
const fn default_color() -> [f32; 4] {
    [0.5, 0.5, 0.5, 1.0]
}
fn default_effector_link() -> String {
    "l_hand".into()
}
fn default_pose_link() -> String {
    CameraId::Bottom.optical_frame().into()
}
const fn default_success_distance() -> f32 {
    0.05
}
const fn default_displacement_tolerance() -> f32 {
    0.01
}
const fn default_rotation_tolerance() -> f32 {
    0.05
}
const fn default_success_reward() -> f32 {
    1.0
}
const fn default_safety_penalty() -> f32 {
    -1.0
}
const fn default_sight_reward() -> f32 {
    0.01
}
const fn default_min_speed() -> f32 {
    0.1
}
const fn default_max_speed() -> f32 {
    1.0
}
const fn default_target_color() -> [u8; 3] {
    [230, 25, 25]
}
const fn default_color_tolerance() -> u8 {
    60
}
const fn default_min_pixels() -> u32 {
    3
}
const fn default_depth_band_mm() -> [u16; 2] {
    [150, 900]
}

// ---------------------------------------------------------------------------
// EnvConfig
// ---------------------------------------------------------------------------

/// Complete construction-time configuration of one reach environment.
///
/// Every threshold and weight the episode controller uses lives here; nothing
/// is hardcoded in the step path.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EnvConfig {
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub robot: RobotConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub scene: SceneConfig,
    #[serde(default)]
    pub safety: SafetyConfig,
    #[serde(default)]
    pub reward: RewardConfig,
    #[serde(default)]
    pub action: ActionConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
}

impl EnvConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.simulation.validate()?;
        self.robot.validate()?;
        self.camera.validate()?;
        self.scene.validate()?;
        self.safety.validate()?;
        self.reward.validate()?;
        self.action.validate()?;
        self.detection.validate()?;
        Ok(())
    }

    /// Length of the action vector: one per joint, plus speed when enabled.
    #[must_use]
    pub fn action_dim(&self) -> usize {
        self.robot.joints.len() + usize::from(self.action.with_speed)
    }

    /// Load from TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.into(),
        message: message.into(),
    }
}

fn check_range(field: &str, range: &RandomizationRange) -> Result<(), ConfigError> {
    range.validate().map_err(|e| invalid(field, e.to_string()))
}

// ---------------------------------------------------------------------------
// SimulationConfig
// ---------------------------------------------------------------------------

/// Timing and seeding of the simulation backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Backend tick in seconds (default: 0.01 = 100 Hz).
    #[serde(default = "default_physics_dt")]
    pub physics_dt: f64,

    /// Agent control period in seconds (default: 0.05 = 20 Hz).
    /// Must be >= `physics_dt`. The ratio gives ticks per step.
    #[serde(default = "default_control_dt")]
    pub control_dt: f64,

    /// Ticks run after a reset so the scene comes to rest.
    #[serde(default = "default_settle_ticks")]
    pub settle_ticks: u32,

    /// Step budget applied by the time-limit wrapper. 0 disables it.
    #[serde(default = "default_max_episode_steps")]
    pub max_episode_steps: u32,

    /// Run seed used when `reset` is called without one.
    #[serde(default)]
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            physics_dt: default_physics_dt(),
            control_dt: default_control_dt(),
            settle_ticks: default_settle_ticks(),
            max_episode_steps: default_max_episode_steps(),
            seed: 0,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.physics_dt > 0.0) {
            return Err(ConfigError::InvalidPhysicsDt(self.physics_dt));
        }
        if self.control_dt < self.physics_dt {
            return Err(ConfigError::ControlDtLessThanPhysicsDt);
        }
        Ok(())
    }

    /// Number of backend ticks per control step (at least one).
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    #[must_use]
    pub fn substeps(&self) -> u32 {
        ((self.control_dt / self.physics_dt).round() as u32).max(1)
    }

    /// Control rate in Hz.
    #[must_use]
    pub fn control_hz(&self) -> f64 {
        1.0 / self.control_dt
    }
}

// ---------------------------------------------------------------------------
// RobotConfig
// ---------------------------------------------------------------------------

/// One controllable joint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointConfig {
    pub name: String,
    /// Lower position limit (rad).
    pub lower: f32,
    /// Upper position limit (rad).
    pub upper: f32,
    /// Velocity limit (rad/s).
    pub max_velocity: f32,
    /// Canonical angle at reset (rad).
    #[serde(default)]
    pub initial: f32,
}

impl JointConfig {
    #[must_use]
    pub fn new(name: &str, lower: f32, upper: f32, max_velocity: f32, initial: f32) -> Self {
        Self {
            name: name.into(),
            lower,
            upper,
            max_velocity,
            initial,
        }
    }
}

fn default_joints() -> Vec<JointConfig> {
    vec![
        JointConfig::new("HeadYaw", -2.0857, 2.0857, 7.33, 0.0),
        JointConfig::new("HeadPitch", -0.7068, 0.6371, 9.23, 0.3),
        JointConfig::new("LShoulderPitch", -2.0857, 2.0857, 7.33, 1.2),
        JointConfig::new("LShoulderRoll", 0.0087, 1.5620, 9.23, 0.3),
        JointConfig::new("LElbowYaw", -2.0857, 2.0857, 7.33, -1.2),
        JointConfig::new("LElbowRoll", -1.5620, -0.0087, 9.23, -0.5),
    ]
}

/// Robot arm configuration: the ordered controllable joints and the effector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotConfig {
    /// Controllable joints in observation / action order.
    #[serde(default = "default_joints")]
    pub joints: Vec<JointConfig>,

    /// Link whose contact with (or proximity to) the target counts as success.
    #[serde(default = "default_effector_link")]
    pub effector_link: String,

    /// Offset added to every joint's canonical angle at reset.
    #[serde(default)]
    pub initial_joint_noise: RandomizationRange,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            joints: default_joints(),
            effector_link: default_effector_link(),
            initial_joint_noise: RandomizationRange::default(),
        }
    }
}

impl RobotConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.joints.is_empty() {
            return Err(ConfigError::MissingField("robot.joints".into()));
        }
        if self.effector_link.is_empty() {
            return Err(ConfigError::MissingField("robot.effector_link".into()));
        }
        let mut seen = HashSet::new();
        for joint in &self.joints {
            if !seen.insert(joint.name.as_str()) {
                return Err(invalid(
                    "robot.joints",
                    format!("duplicate joint {}", joint.name),
                ));
            }
            if !(joint.lower < joint.upper) {
                return Err(invalid(
                    "robot.joints",
                    format!("{}: lower must be < upper", joint.name),
                ));
            }
            if !(joint.max_velocity > 0.0) {
                return Err(invalid(
                    "robot.joints",
                    format!("{}: max_velocity must be > 0", joint.name),
                ));
            }
            if !(joint.lower..=joint.upper).contains(&joint.initial) {
                return Err(invalid(
                    "robot.joints",
                    format!("{}: initial angle outside limits", joint.name),
                ));
            }
        }
        check_range("robot.initial_joint_noise", &self.initial_joint_noise)
    }

    #[must_use]
    pub fn joint_names(&self) -> Vec<String> {
        self.joints.iter().map(|j| j.name.clone()).collect()
    }

    /// Canonical initial angles, in joint order.
    #[must_use]
    pub fn initial_angles(&self) -> Vec<f32> {
        self.joints.iter().map(|j| j.initial).collect()
    }
}

// ---------------------------------------------------------------------------
// CameraConfig
// ---------------------------------------------------------------------------

/// Sensor used by camera observation modes and the link reported as `camera_pose`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    #[serde(default)]
    pub camera: CameraId,
    #[serde(default)]
    pub resolution: Resolution,
    /// Link whose world pose fills `camera_pose` and frames `object_position`.
    #[serde(default = "default_pose_link")]
    pub pose_link: String,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            camera: CameraId::default(),
            resolution: Resolution::default(),
            pose_link: default_pose_link(),
        }
    }
}

impl CameraConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pose_link.is_empty() {
            return Err(ConfigError::MissingField("camera.pose_link".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Shape / ObjectConfig
// ---------------------------------------------------------------------------

/// Collision and visual shape of a scene body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    /// Radius.
    Sphere(f32),
    /// Half extents.
    Box([f32; 3]),
}

impl Shape {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Sphere(r) => *r > 0.0,
            Self::Box(h) => h.iter().all(|v| *v > 0.0),
        }
    }
}

/// A scene body placed at reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectConfig {
    pub name: String,
    pub shape: Shape,
    #[serde(default)]
    pub position: [f32; 3],
    #[serde(default = "default_orientation")]
    pub orientation: [f32; 4],
    #[serde(default = "default_color")]
    pub color: [f32; 4],
    #[serde(default = "default_true")]
    pub is_static: bool,
}

impl ObjectConfig {
    /// Spawn description at the configured pose.
    #[must_use]
    pub fn body_spec(&self) -> BodySpec {
        self.body_spec_at(self.position)
    }

    /// Spawn description at an overridden position.
    #[must_use]
    pub fn body_spec_at(&self, position: [f32; 3]) -> BodySpec {
        BodySpec {
            name: self.name.clone(),
            shape: self.shape,
            pose: Pose::new(position, self.orientation),
            color: self.color,
            is_static: self.is_static,
        }
    }

    fn validate(&self, field: &str) -> Result<(), ConfigError> {
        if !self.shape.is_valid() {
            return Err(invalid(field, "shape dimensions must be > 0"));
        }
        let norm: f32 = self.orientation.iter().map(|q| q * q).sum::<f32>().sqrt();
        if (norm - 1.0).abs() > 1e-3 {
            return Err(invalid(field, "orientation must be a unit quaternion"));
        }
        Ok(())
    }
}

/// Table top at 0.62 m, below the left hand at the canonical and mid-range
/// arm poses.
fn default_table() -> ObjectConfig {
    ObjectConfig {
        name: "table".into(),
        shape: Shape::Box([0.2, 0.3, 0.31]),
        position: [0.45, 0.1, 0.31],
        orientation: default_orientation(),
        color: [0.6, 0.45, 0.3, 1.0],
        is_static: false,
    }
}

fn default_target() -> ObjectConfig {
    ObjectConfig {
        name: "target".into(),
        shape: Shape::Sphere(0.03),
        position: [0.32, 0.15, 0.73],
        orientation: default_orientation(),
        color: [0.9, 0.1, 0.1, 1.0],
        is_static: true,
    }
}

/// Forbidden table and reach target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    #[serde(default = "default_table")]
    pub table: ObjectConfig,
    #[serde(default = "default_target")]
    pub target: ObjectConfig,
    /// Offset added to the target's x and y at every reset.
    #[serde(default)]
    pub target_position_noise: RandomizationRange,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            table: default_table(),
            target: default_target(),
            target_position_noise: RandomizationRange::default(),
        }
    }
}

impl SceneConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.table.validate("scene.table")?;
        self.target.validate("scene.target")?;
        check_range("scene.target_position_noise", &self.target_position_noise)
    }
}

// ---------------------------------------------------------------------------
// SafetyConfig
// ---------------------------------------------------------------------------

/// Success and safety thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyConfig {
    /// Effector-to-target distance (m) that counts as a touch.
    #[serde(default = "default_success_distance")]
    pub success_distance: f32,
    /// Table translation (m) from its reset pose that counts as displaced.
    #[serde(default = "default_displacement_tolerance")]
    pub displacement_tolerance: f32,
    /// Table rotation (rad) from its reset pose that counts as displaced.
    #[serde(default = "default_rotation_tolerance")]
    pub rotation_tolerance: f32,
    #[serde(default = "default_true")]
    pub check_table_touch: bool,
    #[serde(default = "default_true")]
    pub check_table_displacement: bool,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            success_distance: default_success_distance(),
            displacement_tolerance: default_displacement_tolerance(),
            rotation_tolerance: default_rotation_tolerance(),
            check_table_touch: true,
            check_table_displacement: true,
        }
    }
}

impl SafetyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.success_distance > 0.0) {
            return Err(invalid("safety.success_distance", "must be > 0"));
        }
        if !(self.displacement_tolerance >= 0.0) {
            return Err(invalid("safety.displacement_tolerance", "must be >= 0"));
        }
        if !(self.rotation_tolerance >= 0.0) {
            return Err(invalid("safety.rotation_tolerance", "must be >= 0"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RewardConfig
// ---------------------------------------------------------------------------

/// Reward shaping weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardConfig {
    /// Sparse bonus on success.
    #[serde(default = "default_success_reward")]
    pub success: f32,
    /// Penalty on a safety violation.
    #[serde(default = "default_safety_penalty")]
    pub safety_violation: f32,
    /// Shaping bonus while the target is visible.
    #[serde(default = "default_sight_reward")]
    pub object_in_sight: f32,
    /// Constant reward per non-terminal step.
    #[serde(default)]
    pub step: f32,
    /// Multiplier on the negative effector-to-target distance.
    #[serde(default)]
    pub distance: f32,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            success: default_success_reward(),
            safety_violation: default_safety_penalty(),
            object_in_sight: default_sight_reward(),
            step: 0.0,
            distance: 0.0,
        }
    }
}

impl RewardConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let weights = [
            ("reward.success", self.success),
            ("reward.safety_violation", self.safety_violation),
            ("reward.object_in_sight", self.object_in_sight),
            ("reward.step", self.step),
            ("reward.distance", self.distance),
        ];
        for (field, value) in weights {
            if !value.is_finite() {
                return Err(invalid(field, "must be finite"));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ActionConfig
// ---------------------------------------------------------------------------

/// What to do with action values outside [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundsPolicy {
    #[default]
    Clip,
    Reject,
}

/// Action interpretation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionConfig {
    /// Trailing speed scalar present in the action vector.
    #[serde(default = "default_true")]
    pub with_speed: bool,
    /// Speed (fraction of max joint velocity) for a speed value of -1.
    #[serde(default = "default_min_speed")]
    pub min_speed: f32,
    /// Speed for a speed value of +1, and the fixed speed when `with_speed` is off.
    #[serde(default = "default_max_speed")]
    pub max_speed: f32,
    #[serde(default)]
    pub out_of_bounds: BoundsPolicy,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            with_speed: true,
            min_speed: default_min_speed(),
            max_speed: default_max_speed(),
            out_of_bounds: BoundsPolicy::Clip,
        }
    }
}

impl ActionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_speed > 0.0 && self.min_speed <= 1.0) {
            return Err(invalid("action.min_speed", "must be in (0, 1]"));
        }
        if !(self.max_speed >= self.min_speed && self.max_speed <= 1.0) {
            return Err(invalid("action.max_speed", "must be in [min_speed, 1]"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// DetectionConfig
// ---------------------------------------------------------------------------

/// Parameters of the built-in target detectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// RGB colour of the target for colour-camera detection.
    #[serde(default = "default_target_color")]
    pub target_color: [u8; 3],
    /// Per-channel tolerance around `target_color`.
    #[serde(default = "default_color_tolerance")]
    pub color_tolerance: u8,
    /// Matching pixels required to report the target as visible.
    #[serde(default = "default_min_pixels")]
    pub min_pixels: u32,
    /// Depth band `[near, far]` in millimetres for depth-camera detection.
    #[serde(default = "default_depth_band_mm")]
    pub depth_band_mm: [u16; 2],
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            target_color: default_target_color(),
            color_tolerance: default_color_tolerance(),
            min_pixels: default_min_pixels(),
            depth_band_mm: default_depth_band_mm(),
        }
    }
}

impl DetectionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_pixels == 0 {
            return Err(invalid("detection.min_pixels", "must be > 0"));
        }
        let [near, far] = self.depth_band_mm;
        if near >= far {
            return Err(invalid("detection.depth_band_mm", "near must be < far"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
