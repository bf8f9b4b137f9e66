//! Normalized action → joint position targets and movement speed.

use pepper_core::config::{ActionConfig, BoundsPolicy, RobotConfig};
use pepper_core::error::ValidationError;
use pepper_core::types::{Action, ActionSpace, scale_normalized};

/// Motor command produced from one action.
#[derive(Debug, Clone, PartialEq)]
pub struct JointCommand {
    /// Target angle (rad) per controllable joint, in joint order.
    pub angles: Vec<f32>,
    /// Fraction of max joint velocity, in `[min_speed, max_speed]`.
    pub speed: f32,
    /// Whether any action value was clipped into [-1, 1].
    pub clipped: bool,
}

/// Maps `[-1, 1]` actions onto joint limits.
#[derive(Debug, Clone)]
pub struct ActionMapper {
    low: Vec<f32>,
    high: Vec<f32>,
    with_speed: bool,
    min_speed: f32,
    max_speed: f32,
    policy: BoundsPolicy,
}

impl ActionMapper {
    #[must_use]
    pub fn new(robot: &RobotConfig, action: &ActionConfig) -> Self {
        Self {
            low: robot.joints.iter().map(|j| j.lower).collect(),
            high: robot.joints.iter().map(|j| j.upper).collect(),
            with_speed: action.with_speed,
            min_speed: action.min_speed,
            max_speed: action.max_speed,
            policy: action.out_of_bounds,
        }
    }

    /// Expected action length.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.low.len() + usize::from(self.with_speed)
    }

    /// `[-1, 1]^dim`.
    #[must_use]
    pub fn action_space(&self) -> ActionSpace {
        ActionSpace::normalized(self.dim())
    }

    /// Validate, bound, and scale an action.
    ///
    /// Length and finiteness are always checked. Out-of-range values are
    /// clipped or rejected depending on the configured [`BoundsPolicy`].
    pub fn map(&self, action: &Action) -> Result<JointCommand, ValidationError> {
        action.validate(self.dim())?;

        let mut bounded = action.clone();
        let clipped = match self.policy {
            BoundsPolicy::Clip => bounded.clip_normalized(),
            BoundsPolicy::Reject => {
                bounded.check_normalized()?;
                false
            }
        };

        let values = bounded.as_slice();
        let angles = values
            .iter()
            .zip(self.low.iter().zip(self.high.iter()))
            .map(|(a, (l, h))| scale_normalized(*a, *l, *h))
            .collect();
        let speed = if self.with_speed {
            let raw = values.last().copied().unwrap_or(1.0);
            scale_normalized(raw, self.min_speed, self.max_speed)
        } else {
            self.max_speed
        };

        Ok(JointCommand {
            angles,
            speed,
            clipped,
        })
    }
}
