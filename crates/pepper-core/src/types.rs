use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::Shape;
use crate::error::{SimError, ValidationError};

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

/// Identifier of one simulation-backend session (one client connection).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub u32);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session#{}", self.0)
    }
}

/// Handle to a non-robot body spawned in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BodyHandle(pub u32);

/// Handle to a subscribed camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SensorHandle(pub u32);

// ---------------------------------------------------------------------------
// Pose
// ---------------------------------------------------------------------------

/// Position + unit quaternion (`[x, y, z, w]`) in some reference frame.
///
/// Value type: transforms in [`crate::transform`] always return new poses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: [f32; 3],
    pub orientation: [f32; 4],
}

impl Pose {
    pub const IDENTITY: Self = Self {
        position: [0.0; 3],
        orientation: [0.0, 0.0, 0.0, 1.0],
    };

    #[must_use]
    pub const fn new(position: [f32; 3], orientation: [f32; 4]) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Pose with identity orientation.
    #[must_use]
    pub const fn from_position(position: [f32; 3]) -> Self {
        Self {
            position,
            orientation: [0.0, 0.0, 0.0, 1.0],
        }
    }

    /// Position followed by orientation, the layout of `camera_pose`.
    #[must_use]
    pub const fn to_array(&self) -> [f32; 7] {
        let [x, y, z] = self.position;
        let [qx, qy, qz, qw] = self.orientation;
        [x, y, z, qx, qy, qz, qw]
    }

    /// Euclidean distance between the two positions.
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f32 {
        self.position
            .iter()
            .zip(other.position.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f32>()
            .sqrt()
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.position.iter().chain(self.orientation.iter()).all(|v| v.is_finite())
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

// ---------------------------------------------------------------------------
// Camera
// ---------------------------------------------------------------------------

/// Cameras available on the robot head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraId {
    Top,
    #[default]
    Bottom,
    Depth,
}

impl CameraId {
    /// Pixel modality produced by this camera.
    #[must_use]
    pub const fn format(self) -> PixelFormat {
        match self {
            Self::Top | Self::Bottom => PixelFormat::Rgb8,
            Self::Depth => PixelFormat::Depth16,
        }
    }

    /// Name of the optical-frame link the camera is mounted on.
    #[must_use]
    pub const fn optical_frame(self) -> &'static str {
        match self {
            Self::Top => "CameraTop_optical_frame",
            Self::Bottom => "CameraBottom_optical_frame",
            Self::Depth => "CameraDepth_optical_frame",
        }
    }
}

/// Capture resolutions supported by the head cameras.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// 160 x 120
    #[default]
    Qqvga,
    /// 320 x 240
    Qvga,
    /// 640 x 480
    Vga,
}

impl Resolution {
    #[must_use]
    pub const fn width(self) -> u32 {
        match self {
            Self::Qqvga => 160,
            Self::Qvga => 320,
            Self::Vga => 640,
        }
    }

    #[must_use]
    pub const fn height(self) -> u32 {
        match self {
            Self::Qqvga => 120,
            Self::Qvga => 240,
            Self::Vga => 480,
        }
    }
}

/// Pixel storage format of a captured frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// 3 bytes per pixel (red, green, blue).
    Rgb8,
    /// One `u16` per pixel, depth in millimetres.
    Depth16,
}

impl PixelFormat {
    #[must_use]
    pub const fn channels(self) -> usize {
        match self {
            Self::Rgb8 => 3,
            Self::Depth16 => 1,
        }
    }
}

/// Raw pixel storage for a [`CameraFrame`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelData {
    Rgb8(Vec<u8>),
    Depth16(Vec<u16>),
}

/// One captured camera image.
///
/// # Example
///
/// ```
/// use pepper_core::types::{CameraFrame, PixelFormat};
///
/// let frame = CameraFrame::zeros(4, 2, PixelFormat::Rgb8);
/// assert_eq!(frame.shape(), vec![2, 4, 3]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraFrame {
    width: u32,
    height: u32,
    data: PixelData,
}

impl CameraFrame {
    /// Zero-filled frame.
    #[must_use]
    pub fn zeros(width: u32, height: u32, format: PixelFormat) -> Self {
        let len = (width * height) as usize * format.channels();
        let data = match format {
            PixelFormat::Rgb8 => PixelData::Rgb8(vec![0; len]),
            PixelFormat::Depth16 => PixelData::Depth16(vec![0; len]),
        };
        Self {
            width,
            height,
            data,
        }
    }

    /// Wrap interleaved RGB bytes.
    pub fn from_rgb8(width: u32, height: u32, data: Vec<u8>) -> Result<Self, SimError> {
        let expected = (width * height) as usize * 3;
        if data.len() != expected {
            return Err(SimError::Desync(format!(
                "rgb frame has {} bytes, expected {expected}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data: PixelData::Rgb8(data),
        })
    }

    /// Wrap row-major depth samples (millimetres).
    pub fn from_depth16(width: u32, height: u32, data: Vec<u16>) -> Result<Self, SimError> {
        let expected = (width * height) as usize;
        if data.len() != expected {
            return Err(SimError::Desync(format!(
                "depth frame has {} samples, expected {expected}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data: PixelData::Depth16(data),
        })
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub const fn format(&self) -> PixelFormat {
        match self.data {
            PixelData::Rgb8(_) => PixelFormat::Rgb8,
            PixelData::Depth16(_) => PixelFormat::Depth16,
        }
    }

    #[must_use]
    pub const fn data(&self) -> &PixelData {
        &self.data
    }

    /// Array shape: `[height, width, 3]` for colour, `[height, width]` for depth.
    #[must_use]
    pub fn shape(&self) -> Vec<usize> {
        match self.data {
            PixelData::Rgb8(_) => vec![self.height as usize, self.width as usize, 3],
            PixelData::Depth16(_) => vec![self.height as usize, self.width as usize],
        }
    }

    /// RGB triple at `(x, y)`, or `None` for depth frames and out-of-range coordinates.
    #[must_use]
    pub fn rgb_at(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        match &self.data {
            PixelData::Rgb8(bytes) => {
                let offset = (y * self.width + x) as usize * 3;
                Some([bytes[offset], bytes[offset + 1], bytes[offset + 2]])
            }
            PixelData::Depth16(_) => None,
        }
    }

    /// Depth sample at `(x, y)`, or `None` for colour frames and out-of-range coordinates.
    #[must_use]
    pub fn depth_at(&self, x: u32, y: u32) -> Option<u16> {
        if x >= self.width || y >= self.height {
            return None;
        }
        match &self.data {
            PixelData::Depth16(samples) => Some(samples[(y * self.width + x) as usize]),
            PixelData::Rgb8(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Observation
// ---------------------------------------------------------------------------

pub const CAMERA_KEY: &str = "camera";
pub const CAMERA_POSE_KEY: &str = "camera_pose";
pub const JOINTS_STATE_KEY: &str = "joints_state";

/// Structured observation returned by `reset` and `step`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Latest camera image. `None` only for pose-only environments.
    pub camera: Option<CameraFrame>,
    /// Camera optical-frame pose in world: position then quaternion.
    pub camera_pose: [f32; 7],
    /// Controllable joint angles in radians, in declared joint order.
    pub joints_state: Vec<f32>,
}

impl Observation {
    #[must_use]
    pub fn camera_shape(&self) -> Option<Vec<usize>> {
        self.camera.as_ref().map(CameraFrame::shape)
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.camera_pose.iter().chain(self.joints_state.iter()).all(|v| v.is_finite())
    }
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// Normalized joint targets, optionally followed by a speed scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action(Vec<f32>);

impl Action {
    #[must_use]
    pub const fn new(data: Vec<f32>) -> Self {
        Self(data)
    }

    #[must_use]
    pub fn zeros(len: usize) -> Self {
        Self(vec![0.0; len])
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Clip every value to [-1, 1]. Returns `true` if anything changed.
    pub fn clip_normalized(&mut self) -> bool {
        let mut clipped = false;
        for val in &mut self.0 {
            let c = val.clamp(-1.0, 1.0);
            #[allow(clippy::float_cmp)]
            if c != *val {
                clipped = true;
            }
            *val = c;
        }
        clipped
    }

    /// Check dimension and finiteness.
    pub fn validate(&self, expected_len: usize) -> Result<(), ValidationError> {
        if self.0.len() != expected_len {
            return Err(ValidationError::ActionDimMismatch {
                expected: expected_len,
                got: self.0.len(),
            });
        }
        for val in &self.0 {
            if val.is_nan() {
                return Err(ValidationError::ActionContainsNan);
            }
            if val.is_infinite() {
                return Err(ValidationError::ActionContainsInf);
            }
        }
        Ok(())
    }

    /// First dimension outside [-1, 1], if any.
    pub fn check_normalized(&self) -> Result<(), ValidationError> {
        match self.0.iter().position(|v| !(-1.0..=1.0).contains(v)) {
            Some(dim) => Err(ValidationError::ActionOutOfBounds { dim }),
            None => Ok(()),
        }
    }
}

impl From<Vec<f32>> for Action {
    fn from(data: Vec<f32>) -> Self {
        Self(data)
    }
}

impl<const N: usize> From<[f32; N]> for Action {
    fn from(data: [f32; N]) -> Self {
        Self(data.to_vec())
    }
}

/// Map a normalized value in [-1, 1] onto `[low, high]`.
#[must_use]
pub fn scale_normalized(value: f32, low: f32, high: f32) -> f32 {
    low + ((value + 1.0) / 2.0) * (high - low)
}

// ---------------------------------------------------------------------------
// Spaces
// ---------------------------------------------------------------------------

/// Shape and bounds of valid observations. Follows Gymnasium conventions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ObservationSpace {
    Box {
        low: Vec<f32>,
        high: Vec<f32>,
    },
    Image {
        height: u32,
        width: u32,
        format: PixelFormat,
    },
    Dict {
        spaces: BTreeMap<String, Self>,
    },
}

impl ObservationSpace {
    /// Unbounded box of the given length.
    #[must_use]
    pub fn unbounded(len: usize) -> Self {
        Self::Box {
            low: vec![f32::NEG_INFINITY; len],
            high: vec![f32::INFINITY; len],
        }
    }

    #[must_use]
    pub fn shape(&self) -> Vec<usize> {
        match self {
            Self::Box { low, .. } => vec![low.len()],
            Self::Image {
                height,
                width,
                format,
            } => match format {
                PixelFormat::Rgb8 => vec![*height as usize, *width as usize, 3],
                PixelFormat::Depth16 => vec![*height as usize, *width as usize],
            },
            Self::Dict { .. } => vec![], // composite; query children
        }
    }

    /// Child space by key for `Dict` spaces.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Self> {
        match self {
            Self::Dict { spaces } => spaces.get(key),
            _ => None,
        }
    }

    /// Whether `values` fits a `Box` space.
    #[must_use]
    pub fn contains_values(&self, values: &[f32]) -> bool {
        match self {
            Self::Box { low, high } => {
                values.len() == low.len()
                    && values
                        .iter()
                        .zip(low.iter().zip(high.iter()))
                        .all(|(v, (l, h))| v >= l && v <= h)
            }
            _ => false,
        }
    }

    /// Whether `frame` fits an `Image` space.
    #[must_use]
    pub fn contains_frame(&self, frame: &CameraFrame) -> bool {
        match self {
            Self::Image {
                height,
                width,
                format,
            } => frame.height() == *height && frame.width() == *width && frame.format() == *format,
            _ => false,
        }
    }

    /// Whether a full observation fits a `Dict` space.
    ///
    /// A missing `camera` key means the observation must carry no image.
    #[must_use]
    pub fn contains(&self, obs: &Observation) -> bool {
        let Self::Dict { spaces } = self else {
            return false;
        };
        let camera_ok = match (spaces.get(CAMERA_KEY), &obs.camera) {
            (Some(space), Some(frame)) => space.contains_frame(frame),
            (None, None) => true,
            _ => false,
        };
        let pose_ok = spaces
            .get(CAMERA_POSE_KEY)
            .is_some_and(|s| s.contains_values(&obs.camera_pose));
        let joints_ok = spaces
            .get(JOINTS_STATE_KEY)
            .is_some_and(|s| s.contains_values(&obs.joints_state));
        camera_ok && pose_ok && joints_ok
    }
}

/// Shape and bounds of valid actions: a continuous box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSpace {
    pub low: Vec<f32>,
    pub high: Vec<f32>,
}

impl ActionSpace {
    /// `[-1, 1]^dim`.
    #[must_use]
    pub fn normalized(dim: usize) -> Self {
        Self {
            low: vec![-1.0; dim],
            high: vec![1.0; dim],
        }
    }

    #[must_use]
    pub fn shape(&self) -> Vec<usize> {
        vec![self.low.len()]
    }

    #[must_use]
    pub fn dim(&self) -> usize {
        self.low.len()
    }

    /// Sample a random action. Takes `&mut impl Rng` for determinism.
    pub fn sample(&self, rng: &mut impl rand::Rng) -> Action {
        Action(
            self.low
                .iter()
                .zip(self.high.iter())
                .map(|(l, h)| rng.gen_range(*l..=*h))
                .collect(),
        )
    }

    #[must_use]
    pub fn contains(&self, action: &Action) -> bool {
        action.len() == self.low.len()
            && action
                .as_slice()
                .iter()
                .zip(self.low.iter().zip(self.high.iter()))
                .all(|(v, (l, h))| v >= l && v <= h)
    }
}

// ---------------------------------------------------------------------------
// Scene bodies and contacts
// ---------------------------------------------------------------------------

/// Description of a rigid body to spawn in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodySpec {
    pub name: String,
    pub shape: Shape,
    pub pose: Pose,
    pub color: [f32; 4],
    /// Static bodies are never moved by the backend.
    pub is_static: bool,
}

/// One side of a contact query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContactTarget {
    /// Any link of the robot.
    Robot,
    /// A single named robot link.
    Link(String),
    /// A spawned body.
    Body(BodyHandle),
}

// ---------------------------------------------------------------------------
// StepResult
// ---------------------------------------------------------------------------

/// Per-step diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    pub is_success: bool,
    pub is_safety_violated: bool,
    pub is_object_in_sight: bool,
    /// Target position expressed in the camera frame.
    pub object_position: [f32; 3],
    pub episode_length: u32,
    pub episode_reward: f32,
}

/// Result of `env.step(action)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub observation: Observation,
    pub reward: f32,
    /// Episode ended due to success or a safety violation.
    pub terminated: bool,
    /// Episode ended due to an external step budget.
    pub truncated: bool,
    pub info: StepInfo,
}

impl StepResult {
    #[must_use]
    pub const fn done(&self) -> bool {
        self.terminated || self.truncated
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn observation(camera: Option<CameraFrame>, joints: usize) -> Observation {
        Observation {
            camera,
            camera_pose: Pose::IDENTITY.to_array(),
            joints_state: vec![0.1; joints],
        }
    }

    fn dict_space(camera: Option<ObservationSpace>, joints: usize) -> ObservationSpace {
        let mut spaces = BTreeMap::new();
        if let Some(camera) = camera {
            spaces.insert(CAMERA_KEY.to_string(), camera);
        }
        spaces.insert(CAMERA_POSE_KEY.to_string(), ObservationSpace::unbounded(7));
        spaces.insert(
            JOINTS_STATE_KEY.to_string(),
            ObservationSpace::unbounded(joints),
        );
        ObservationSpace::Dict { spaces }
    }

    // ---- Pose ----

    #[test]
    fn pose_to_array_layout() {
        let pose = Pose::new([1.0, 2.0, 3.0], [0.0, 0.0, 0.6, 0.8]);
        assert_eq!(pose.to_array(), [1.0, 2.0, 3.0, 0.0, 0.0, 0.6, 0.8]);
    }

    #[test]
    fn pose_distance() {
        let a = Pose::from_position([0.0, 0.0, 0.0]);
        let b = Pose::from_position([3.0, 4.0, 0.0]);
        assert!((a.distance_to(&b) - 5.0).abs() < f32::EPSILON);
    }

    #[test]
    fn pose_default_is_identity() {
        assert_eq!(Pose::default(), Pose::IDENTITY);
        assert!(Pose::IDENTITY.is_finite());
        assert!(!Pose::from_position([f32::NAN, 0.0, 0.0]).is_finite());
    }

    // ---- Camera ----

    #[test]
    fn camera_modalities() {
        assert_eq!(CameraId::Top.format(), PixelFormat::Rgb8);
        assert_eq!(CameraId::Bottom.format(), PixelFormat::Rgb8);
        assert_eq!(CameraId::Depth.format(), PixelFormat::Depth16);
        assert_eq!(
            CameraId::Bottom.optical_frame(),
            "CameraBottom_optical_frame"
        );
    }

    #[test]
    fn resolution_dimensions() {
        assert_eq!((Resolution::Qqvga.width(), Resolution::Qqvga.height()), (160, 120));
        assert_eq!((Resolution::Qvga.width(), Resolution::Qvga.height()), (320, 240));
        assert_eq!((Resolution::Vga.width(), Resolution::Vga.height()), (640, 480));
    }

    #[test]
    fn frame_shapes() {
        let rgb = CameraFrame::zeros(4, 2, PixelFormat::Rgb8);
        assert_eq!(rgb.shape(), vec![2, 4, 3]);
        let depth = CameraFrame::zeros(4, 2, PixelFormat::Depth16);
        assert_eq!(depth.shape(), vec![2, 4]);
        assert_eq!(depth.format(), PixelFormat::Depth16);
    }

    #[test]
    fn frame_from_rgb8_rejects_bad_length() {
        let err = CameraFrame::from_rgb8(2, 2, vec![0; 5]).unwrap_err();
        assert!(matches!(err, SimError::Desync(_)));
    }

    #[test]
    fn frame_pixel_access() {
        let mut bytes = vec![0; 2 * 2 * 3];
        bytes[9..12].copy_from_slice(&[10, 20, 30]); // pixel (1, 1)
        let frame = CameraFrame::from_rgb8(2, 2, bytes).unwrap();
        assert_eq!(frame.rgb_at(1, 1), Some([10, 20, 30]));
        assert_eq!(frame.rgb_at(2, 0), None);
        assert_eq!(frame.depth_at(0, 0), None);

        let depth = CameraFrame::from_depth16(2, 1, vec![500, 1200]).unwrap();
        assert_eq!(depth.depth_at(1, 0), Some(1200));
        assert_eq!(depth.rgb_at(0, 0), None);
    }

    // ---- Action ----

    #[test]
    fn action_validate_dimension() {
        let action = Action::zeros(3);
        assert!(action.validate(3).is_ok());
        assert_eq!(
            action.validate(7).unwrap_err(),
            ValidationError::ActionDimMismatch {
                expected: 7,
                got: 3
            }
        );
    }

    #[test]
    fn action_validate_non_finite() {
        let nan = Action::new(vec![0.5, f32::NAN]);
        assert_eq!(nan.validate(2).unwrap_err(), ValidationError::ActionContainsNan);
        let inf = Action::new(vec![f32::NEG_INFINITY, 0.0]);
        assert_eq!(inf.validate(2).unwrap_err(), ValidationError::ActionContainsInf);
    }

    #[test]
    fn action_clip_reports_change() {
        let mut action = Action::new(vec![-2.0, 0.5, 1.5]);
        assert!(action.clip_normalized());
        assert_eq!(action.as_slice(), &[-1.0, 0.5, 1.0]);
        assert!(!action.clip_normalized());
    }

    #[test]
    fn action_check_normalized() {
        assert!(Action::from([0.0, 1.0, -1.0]).check_normalized().is_ok());
        assert_eq!(
            Action::from([0.0, 1.2]).check_normalized().unwrap_err(),
            ValidationError::ActionOutOfBounds { dim: 1 }
        );
    }

    #[test]
    fn scale_normalized_endpoints() {
        assert!((scale_normalized(-1.0, -2.0, 2.0) - (-2.0)).abs() < f32::EPSILON);
        assert!(scale_normalized(0.0, -2.0, 2.0).abs() < f32::EPSILON);
        assert!((scale_normalized(1.0, 0.0, 10.0) - 10.0).abs() < f32::EPSILON);
    }

    #[test]
    fn action_serialize_roundtrip() {
        let action = Action::new(vec![0.1, 0.2]);
        let json = serde_json::to_string(&action).unwrap();
        let back: Action = serde_json::from_str(&json).unwrap();
        assert_eq!(action, back);
    }

    // ---- Spaces ----

    #[test]
    fn action_space_sample_is_contained() {
        let space = ActionSpace::normalized(7);
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(3);
        for _ in 0..20 {
            let action = space.sample(&mut rng);
            assert!(space.contains(&action));
        }
        assert_eq!(space.shape(), vec![7]);
    }

    #[test]
    fn action_space_rejects_wrong_length() {
        let space = ActionSpace::normalized(3);
        assert!(!space.contains(&Action::zeros(2)));
    }

    #[test]
    fn image_space_shape() {
        let space = ObservationSpace::Image {
            height: 120,
            width: 160,
            format: PixelFormat::Depth16,
        };
        assert_eq!(space.shape(), vec![120, 160]);
    }

    #[test]
    fn dict_space_contains_matching_observation() {
        let camera = ObservationSpace::Image {
            height: 2,
            width: 4,
            format: PixelFormat::Rgb8,
        };
        let space = dict_space(Some(camera), 3);
        let obs = observation(Some(CameraFrame::zeros(4, 2, PixelFormat::Rgb8)), 3);
        assert!(space.contains(&obs));
    }

    #[test]
    fn dict_space_rejects_shape_changes() {
        let camera = ObservationSpace::Image {
            height: 2,
            width: 4,
            format: PixelFormat::Rgb8,
        };
        let space = dict_space(Some(camera), 3);

        let wrong_joints = observation(Some(CameraFrame::zeros(4, 2, PixelFormat::Rgb8)), 2);
        assert!(!space.contains(&wrong_joints));

        let wrong_format = observation(Some(CameraFrame::zeros(4, 2, PixelFormat::Depth16)), 3);
        assert!(!space.contains(&wrong_format));

        let missing_camera = observation(None, 3);
        assert!(!space.contains(&missing_camera));
    }

    #[test]
    fn pose_only_space_requires_no_camera() {
        let space = dict_space(None, 2);
        assert!(space.contains(&observation(None, 2)));
        assert!(!space.contains(&observation(
            Some(CameraFrame::zeros(1, 1, PixelFormat::Rgb8)),
            2
        )));
    }

    #[test]
    fn step_result_done() {
        let result = StepResult {
            observation: observation(None, 1),
            reward: 0.0,
            terminated: false,
            truncated: true,
            info: StepInfo::default(),
        };
        assert!(result.done());
    }
}
