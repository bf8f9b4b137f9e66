//! Task registry: task id → configured environment.

use std::collections::BTreeMap;

use pepper_core::config::EnvConfig;
use pepper_core::error::{ConfigError, PepperError};
use pepper_core::traits::SimSession;
use tracing::info;

use crate::env::{Environment, ReachEnv};
use crate::observation::ObservationMode;
use crate::wrappers::TimeLimit;

/// Colour task, bottom camera.
pub const PEPPER_REACH: &str = "PepperReach-v0";
/// Depth camera task.
pub const PEPPER_REACH_DEPTH: &str = "PepperReachDepth-v0";
/// No image, camera pose and joints only.
pub const PEPPER_REACH_POSE: &str = "PepperReachPose-v0";

/// One registered task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    pub id: String,
    pub mode: ObservationMode,
    /// Overrides `simulation.max_episode_steps` when set.
    pub max_episode_steps: Option<u32>,
    pub description: String,
}

impl TaskSpec {
    #[must_use]
    pub fn new(id: &str, mode: ObservationMode, description: &str) -> Self {
        Self {
            id: id.into(),
            mode,
            max_episode_steps: None,
            description: description.into(),
        }
    }

    #[must_use]
    pub const fn with_max_episode_steps(mut self, steps: u32) -> Self {
        self.max_episode_steps = Some(steps);
        self
    }
}

/// Known tasks by id.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    tasks: BTreeMap<String, TaskSpec>,
}

impl Registry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the three built-in reach tasks.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(TaskSpec::new(
            PEPPER_REACH,
            ObservationMode::Color,
            "reach and touch the target, colour image from the bottom camera",
        ));
        registry.register(TaskSpec::new(
            PEPPER_REACH_DEPTH,
            ObservationMode::Depth,
            "reach and touch the target, depth image",
        ));
        registry.register(TaskSpec::new(
            PEPPER_REACH_POSE,
            ObservationMode::PoseOnly,
            "reach and touch the target, no image",
        ));
        registry
    }

    /// Add or replace a task. Returns the spec it replaced.
    pub fn register(&mut self, spec: TaskSpec) -> Option<TaskSpec> {
        self.tasks.insert(spec.id.clone(), spec)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&TaskSpec> {
        self.tasks.get(id)
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Build the environment registered under `id` on top of `session`.
    ///
    /// The result is wrapped in a [`TimeLimit`] unless the effective step
    /// cap is `0`.
    pub fn make(
        &self,
        id: &str,
        config: EnvConfig,
        session: Box<dyn SimSession>,
    ) -> Result<Box<dyn Environment>, PepperError> {
        let spec = self
            .get(id)
            .ok_or_else(|| ConfigError::UnknownTask(id.into()))?;
        let max_steps = spec
            .max_episode_steps
            .unwrap_or(config.simulation.max_episode_steps);

        let env = ReachEnv::new(config, spec.mode, session)?;
        info!(task = id, mode = ?spec.mode, max_steps, "environment created");
        if max_steps > 0 {
            Ok(Box::new(TimeLimit::new(env, max_steps)))
        } else {
            Ok(Box::new(env))
        }
    }
}

/// [`Registry::make`] against the built-in tasks.
pub fn make(
    id: &str,
    config: EnvConfig,
    session: Box<dyn SimSession>,
) -> Result<Box<dyn Environment>, PepperError> {
    Registry::with_defaults().make(id, config, session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::episode::EpisodeState;
    use pepper_core::types::Action;
    use pepper_test_utils::ScriptedSession;

    fn session(config: &EnvConfig) -> Box<dyn SimSession> {
        Box::new(ScriptedSession::for_config(config).0)
    }

    #[test]
    fn defaults_are_registered() {
        let registry = Registry::with_defaults();
        assert_eq!(registry.len(), 3);
        assert_eq!(
            registry.ids().collect::<Vec<_>>(),
            vec![PEPPER_REACH, PEPPER_REACH_DEPTH, PEPPER_REACH_POSE]
        );
        assert_eq!(
            registry.get(PEPPER_REACH_DEPTH).unwrap().mode,
            ObservationMode::Depth
        );
    }

    #[test]
    fn unknown_id_is_config_error() {
        let config = EnvConfig::default();
        let err = make("PepperWalk-v0", config.clone(), session(&config))
            .err()
            .unwrap();
        assert!(matches!(
            err,
            PepperError::Config(ConfigError::UnknownTask(ref id)) if id == "PepperWalk-v0"
        ));
    }

    #[test]
    fn make_builds_mode_specific_spaces() {
        let config = EnvConfig::default();
        let color = make(PEPPER_REACH, config.clone(), session(&config)).unwrap();
        let pose = make(PEPPER_REACH_POSE, config.clone(), session(&config)).unwrap();
        assert!(color.observation_space().get("camera").is_some());
        assert!(pose.observation_space().get("camera").is_none());
        assert_eq!(color.action_space().dim(), 7);
    }

    #[test]
    fn configured_cap_truncates() {
        let mut config = EnvConfig::default();
        config.simulation.max_episode_steps = 2;
        let mut env = make(PEPPER_REACH_POSE, config.clone(), session(&config)).unwrap();
        env.reset(Some(0)).unwrap();
        assert!(!env.step(&Action::zeros(7)).unwrap().truncated);
        assert!(env.step(&Action::zeros(7)).unwrap().truncated);
        assert_eq!(env.state(), EpisodeState::Terminated);
    }

    #[test]
    fn task_cap_overrides_config() {
        let mut registry = Registry::new();
        registry.register(
            TaskSpec::new("Short-v0", ObservationMode::PoseOnly, "one step").with_max_episode_steps(1),
        );
        let config = EnvConfig::default();
        let mut env = registry.make("Short-v0", config.clone(), session(&config)).unwrap();
        env.reset(None).unwrap();
        assert!(env.step(&Action::zeros(7)).unwrap().truncated);
    }

    #[test]
    fn zero_cap_is_unwrapped() {
        let mut config = EnvConfig::default();
        config.simulation.max_episode_steps = 0;
        let mut env = make(PEPPER_REACH_POSE, config.clone(), session(&config)).unwrap();
        env.reset(None).unwrap();
        for _ in 0..300 {
            assert!(!env.step(&Action::zeros(7)).unwrap().done());
        }
    }

    #[test]
    fn register_replaces() {
        let mut registry = Registry::with_defaults();
        let old = registry.register(TaskSpec::new(PEPPER_REACH, ObservationMode::Depth, ""));
        assert_eq!(old.unwrap().mode, ObservationMode::Color);
        assert_eq!(registry.len(), 3);
    }
}
