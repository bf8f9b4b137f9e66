//! Environment wrappers.

use pepper_core::error::{PepperError, UsageError};
use pepper_core::types::{Action, ActionSpace, Observation, ObservationSpace, StepResult};
use tracing::debug;

use crate::env::Environment;
use crate::episode::EpisodeState;

// ---------------------------------------------------------------------------
// TimeLimit
// ---------------------------------------------------------------------------

/// Truncates episodes after `max_episode_steps` steps.
///
/// The inner environment never sees a step budget. Once the limit is hit the
/// wrapper reports [`EpisodeState::Terminated`] and refuses further steps
/// until the next reset. `0` disables the limit.
pub struct TimeLimit<E> {
    inner: E,
    max_episode_steps: u32,
    elapsed: u32,
    truncated: bool,
}

impl<E: Environment> TimeLimit<E> {
    #[must_use]
    pub const fn new(inner: E, max_episode_steps: u32) -> Self {
        Self {
            inner,
            max_episode_steps,
            elapsed: 0,
            truncated: false,
        }
    }

    #[must_use]
    pub const fn max_episode_steps(&self) -> u32 {
        self.max_episode_steps
    }

    /// Steps taken since the last reset.
    #[must_use]
    pub const fn elapsed(&self) -> u32 {
        self.elapsed
    }

    #[must_use]
    pub const fn inner(&self) -> &E {
        &self.inner
    }

    pub const fn inner_mut(&mut self) -> &mut E {
        &mut self.inner
    }

    #[must_use]
    pub fn into_inner(self) -> E {
        self.inner
    }
}

impl<E: Environment> Environment for TimeLimit<E> {
    fn reset(&mut self, seed: Option<u64>) -> Result<Observation, PepperError> {
        let obs = self.inner.reset(seed)?;
        self.elapsed = 0;
        self.truncated = false;
        Ok(obs)
    }

    fn step(&mut self, action: &Action) -> Result<StepResult, PepperError> {
        if self.truncated && self.inner.state() != EpisodeState::Closed {
            return Err(UsageError::EpisodeTerminated.into());
        }
        let mut result = self.inner.step(action)?;
        self.elapsed += 1;
        if self.max_episode_steps > 0 && self.elapsed >= self.max_episode_steps {
            result.truncated = !result.terminated;
            self.truncated = true;
            if result.truncated {
                debug!(steps = self.elapsed, "episode truncated");
            }
        }
        Ok(result)
    }

    fn close(&mut self) -> Result<(), PepperError> {
        self.inner.close()
    }

    fn observation_space(&self) -> &ObservationSpace {
        self.inner.observation_space()
    }

    fn action_space(&self) -> &ActionSpace {
        self.inner.action_space()
    }

    fn state(&self) -> EpisodeState {
        match self.inner.state() {
            EpisodeState::Ready | EpisodeState::Stepping if self.truncated => {
                EpisodeState::Terminated
            }
            state => state,
        }
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::ReachEnv;
    use crate::observation::ObservationMode;
    use pepper_core::config::EnvConfig;
    use pepper_test_utils::{ScriptHandle, ScriptedSession};

    fn limited(max_steps: u32) -> (TimeLimit<ReachEnv>, ScriptHandle) {
        let config = EnvConfig::default();
        let (session, handle) = ScriptedSession::for_config(&config);
        let env = ReachEnv::new(config, ObservationMode::PoseOnly, Box::new(session)).unwrap();
        (TimeLimit::new(env, max_steps), handle)
    }

    fn zeros() -> Action {
        Action::zeros(7)
    }

    #[test]
    fn truncates_at_limit() {
        let (mut env, _) = limited(3);
        env.reset(None).unwrap();
        for _ in 0..2 {
            let result = env.step(&zeros()).unwrap();
            assert!(!result.truncated);
            assert!(!result.done());
        }
        let last = env.step(&zeros()).unwrap();
        assert!(last.truncated);
        assert!(!last.terminated);
        assert_eq!(env.state(), EpisodeState::Terminated);
        assert_eq!(env.elapsed(), 3);
    }

    #[test]
    fn blocks_steps_after_truncation() {
        let (mut env, _) = limited(1);
        env.reset(None).unwrap();
        assert!(env.step(&zeros()).unwrap().truncated);
        assert!(matches!(
            env.step(&zeros()),
            Err(PepperError::Usage(UsageError::EpisodeTerminated))
        ));

        env.reset(None).unwrap();
        assert_eq!(env.state(), EpisodeState::Ready);
        assert_eq!(env.elapsed(), 0);
        assert!(env.step(&zeros()).is_ok());
    }

    #[test]
    fn termination_wins_over_truncation() {
        let (mut env, handle) = limited(1);
        env.reset(None).unwrap();
        handle.add_contact(None, "table");
        let result = env.step(&zeros()).unwrap();
        assert!(result.terminated);
        assert!(!result.truncated);
    }

    #[test]
    fn zero_disables_limit() {
        let (mut env, _) = limited(0);
        env.reset(None).unwrap();
        for _ in 0..50 {
            assert!(!env.step(&zeros()).unwrap().truncated);
        }
        assert_eq!(env.state(), EpisodeState::Stepping);
    }

    #[test]
    fn closed_wins_over_truncation() {
        let (mut env, _) = limited(1);
        env.reset(None).unwrap();
        env.step(&zeros()).unwrap();
        env.close().unwrap();
        assert_eq!(env.state(), EpisodeState::Closed);
        assert!(matches!(
            env.step(&zeros()),
            Err(PepperError::Usage(UsageError::Closed))
        ));
    }

    #[test]
    fn delegates_spaces_and_name() {
        let (env, _) = limited(5);
        assert_eq!(env.action_space().dim(), 7);
        assert_eq!(env.name(), "ReachEnv");
        assert_eq!(env.max_episode_steps(), 5);
        assert_eq!(env.inner().mode(), ObservationMode::PoseOnly);
    }
}
