// pepper-core: Types, traits, config, pose algebra and errors for the Pepper reach environment.

pub mod config;
pub mod error;
pub mod randomize;
pub mod rewards;
pub mod seed;
pub mod traits;
pub mod transform;
pub mod types;

pub mod prelude {
    pub use crate::config::{
        ActionConfig, BoundsPolicy, CameraConfig, DetectionConfig, EnvConfig, JointConfig,
        ObjectConfig, RewardConfig, RobotConfig, SafetyConfig, SceneConfig, Shape,
        SimulationConfig,
    };
    pub use crate::error::{ConfigError, PepperError, SimError, UsageError, ValidationError};
    pub use crate::randomize::RandomizationRange;
    pub use crate::rewards::{ReachReward, RewardPolicy, StepOutcome};
    pub use crate::seed::SeedHierarchy;
    pub use crate::traits::{ObjectDetector, SimSession};
    pub use crate::types::{
        Action, ActionSpace, BodyHandle, BodySpec, CameraFrame, CameraId, ContactTarget,
        Observation, ObservationSpace, PixelFormat, Pose, Resolution, SensorHandle, SessionId,
        StepInfo, StepResult,
    };
}
