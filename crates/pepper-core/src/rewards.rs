//! Reward and termination policy for the reach task.

use crate::config::RewardConfig;

// ---------------------------------------------------------------------------
// StepOutcome
// ---------------------------------------------------------------------------

/// Detector outputs for one step: the only input of a [`RewardPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StepOutcome {
    pub is_success: bool,
    pub is_safety_violated: bool,
    pub is_object_in_sight: bool,
    /// Effector-to-target distance (m), when the backend can report it.
    pub distance_to_goal: Option<f32>,
}

impl StepOutcome {
    /// Whether the episode ends on this outcome.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.is_success || self.is_safety_violated
    }
}

// ---------------------------------------------------------------------------
// RewardPolicy
// ---------------------------------------------------------------------------

/// Maps a [`StepOutcome`] to `(reward, done)`.
///
/// Implementations must be pure: the same outcome always gives the same
/// reward. `done` is fixed to [`StepOutcome::is_terminal`]; step budgets are
/// handled outside the policy.
pub trait RewardPolicy: Send {
    fn compute(&self, outcome: &StepOutcome) -> f32;

    fn evaluate(&self, outcome: &StepOutcome) -> (f32, bool) {
        (self.compute(outcome), outcome.is_terminal())
    }

    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// ReachReward
// ---------------------------------------------------------------------------

/// Sparse success bonus, safety penalty, and visibility / distance shaping.
///
/// A safety violation takes precedence over success when both occur on the
/// same step.
#[derive(Debug, Clone, PartialEq)]
pub struct ReachReward {
    weights: RewardConfig,
}

impl ReachReward {
    #[must_use]
    pub const fn new(weights: RewardConfig) -> Self {
        Self { weights }
    }

    #[must_use]
    pub const fn weights(&self) -> &RewardConfig {
        &self.weights
    }
}

impl Default for ReachReward {
    fn default() -> Self {
        Self::new(RewardConfig::default())
    }
}

impl RewardPolicy for ReachReward {
    fn compute(&self, outcome: &StepOutcome) -> f32 {
        let w = &self.weights;
        if outcome.is_safety_violated {
            return w.safety_violation;
        }
        if outcome.is_success {
            return w.success;
        }
        let mut reward = w.step;
        if outcome.is_object_in_sight {
            reward += w.object_in_sight;
        }
        if let Some(distance) = outcome.distance_to_goal {
            reward -= w.distance * distance;
        }
        reward
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "ReachReward"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
