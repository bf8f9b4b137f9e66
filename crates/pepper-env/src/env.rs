//! The episode controller.
//!
//! [`ReachEnv`] owns one simulation session and drives it through the
//! reach/touch task: apply action, tick, observe, detect, reward. It is
//! parameterized by an [`ObservationAssembler`] chosen at construction, not
//! specialized by subtype.

use pepper_core::config::EnvConfig;
use pepper_core::error::{PepperError, SimError};
use pepper_core::rewards::{ReachReward, RewardPolicy, StepOutcome};
use pepper_core::seed::{ROBOT_POSE, SeedHierarchy, TARGET_POSE};
use pepper_core::traits::{ObjectDetector, SimSession};
use pepper_core::transform::relative_position;
use pepper_core::types::{
    Action, ActionSpace, Observation, ObservationSpace, Pose, StepInfo, StepResult,
};
use tracing::{debug, info, warn};

use crate::action::ActionMapper;
use crate::detection::detector_for;
use crate::detectors::{CompositeSafety, SuccessDetector};
use crate::episode::{Episode, EpisodeState};
use crate::observation::{ObservationAssembler, ObservationMode, assembler_for};
use crate::scene::Scene;

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// Agent-facing environment API.
pub trait Environment: Send {
    /// Start a new episode. `seed` re-seeds the episode randomization.
    fn reset(&mut self, seed: Option<u64>) -> Result<Observation, PepperError>;

    /// Advance one control step.
    fn step(&mut self, action: &Action) -> Result<StepResult, PepperError>;

    /// Release the simulation session. Later `reset` / `step` calls fail with
    /// `UsageError::Closed`; closing again is a no-op.
    fn close(&mut self) -> Result<(), PepperError>;

    fn observation_space(&self) -> &ObservationSpace;

    fn action_space(&self) -> &ActionSpace;

    /// Lifecycle state as seen by the caller.
    fn state(&self) -> EpisodeState;

    fn name(&self) -> &str;
}

impl<E: Environment + ?Sized> Environment for Box<E> {
    fn reset(&mut self, seed: Option<u64>) -> Result<Observation, PepperError> {
        (**self).reset(seed)
    }

    fn step(&mut self, action: &Action) -> Result<StepResult, PepperError> {
        (**self).step(action)
    }

    fn close(&mut self) -> Result<(), PepperError> {
        (**self).close()
    }

    fn observation_space(&self) -> &ObservationSpace {
        (**self).observation_space()
    }

    fn action_space(&self) -> &ActionSpace {
        (**self).action_space()
    }

    fn state(&self) -> EpisodeState {
        (**self).state()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

// ---------------------------------------------------------------------------
// ReachEnv
// ---------------------------------------------------------------------------

/// What one step observed, before reward.
struct StepReading {
    observation: Observation,
    outcome: StepOutcome,
    object_position: [f32; 3],
}

/// Reach/touch episode controller over an exclusive [`SimSession`].
pub struct ReachEnv {
    config: EnvConfig,
    session: Box<dyn SimSession>,
    assembler: Box<dyn ObservationAssembler>,
    detector: Box<dyn ObjectDetector>,
    policy: Box<dyn RewardPolicy>,
    success: SuccessDetector,
    safety: CompositeSafety,
    mapper: ActionMapper,
    joints: Vec<String>,
    substeps: u32,
    obs_space: ObservationSpace,
    act_space: ActionSpace,
    scene: Option<Scene>,
    seeds: SeedHierarchy,
    seeded_episodes: u64,
    episode: Episode,
}

impl ReachEnv {
    /// Build a controller. The config is validated here; the session is not
    /// touched until the first [`reset`](Environment::reset).
    pub fn new(
        config: EnvConfig,
        mode: ObservationMode,
        session: Box<dyn SimSession>,
    ) -> Result<Self, PepperError> {
        config.validate()?;
        let joints = config.robot.joint_names();
        let assembler = assembler_for(mode, &config.camera);
        let mapper = ActionMapper::new(&config.robot, &config.action);
        Ok(Self {
            obs_space: assembler.observation_space(joints.len()),
            act_space: mapper.action_space(),
            detector: detector_for(mode, &config.detection),
            policy: Box::new(ReachReward::new(config.reward.clone())),
            success: SuccessDetector::new(
                &config.robot.effector_link,
                config.safety.success_distance,
            ),
            safety: CompositeSafety::from_config(&config.safety),
            substeps: config.simulation.substeps(),
            seeds: SeedHierarchy::new(config.simulation.seed),
            seeded_episodes: 0,
            scene: None,
            episode: Episode::default(),
            assembler,
            mapper,
            joints,
            session,
            config,
        })
    }

    /// Replace the visibility detector.
    #[must_use]
    pub fn with_detector(mut self, detector: Box<dyn ObjectDetector>) -> Self {
        self.detector = detector;
        self
    }

    /// Replace the reward policy.
    #[must_use]
    pub fn with_reward_policy(mut self, policy: Box<dyn RewardPolicy>) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &EnvConfig {
        &self.config
    }

    #[must_use]
    pub const fn episode(&self) -> &Episode {
        &self.episode
    }

    #[must_use]
    pub fn mode(&self) -> ObservationMode {
        self.assembler.mode()
    }

    /// Controllable joints in observation / action order.
    #[must_use]
    pub fn joint_names(&self) -> &[String] {
        &self.joints
    }

    /// Scene handles of the current episode.
    #[must_use]
    pub const fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    #[must_use]
    pub fn session(&self) -> &dyn SimSession {
        self.session.as_ref()
    }

    /// Any session failure leaves the episode unusable until the next reset.
    fn fatal(&mut self, err: SimError) -> PepperError {
        warn!(error = %err, episode = self.episode.episode_number, "session error, episode aborted");
        self.episode.abort();
        err.into()
    }

    fn initial_angles(&self, episode_index: u64) -> Vec<f32> {
        let mut rng = self.seeds.subsystem_rng(episode_index, ROBOT_POSE);
        let noise = &self.config.robot.initial_joint_noise;
        self.config
            .robot
            .joints
            .iter()
            .map(|j| (j.initial + noise.sample(&mut rng)).clamp(j.lower, j.upper))
            .collect()
    }

    /// Place scene bodies and attach sensors for a new episode.
    fn setup_scene(&mut self, episode_index: u64) -> Result<(), SimError> {
        let mut rng = self.seeds.subsystem_rng(episode_index, TARGET_POSE);
        let scene = Scene::spawn(self.session.as_mut(), &self.config.scene, &mut rng)?;
        self.scene = Some(scene);
        self.assembler.setup(self.session.as_mut())?;
        info!(
            mode = ?self.assembler.mode(),
            table = ?scene.table,
            target = ?scene.target,
            "scene ready"
        );
        Ok(())
    }

    fn reset_session(&mut self, episode_index: u64) -> Result<Observation, SimError> {
        if let Some(scene) = self.scene.take() {
            scene.despawn(self.session.as_mut())?;
        }

        let angles = self.initial_angles(episode_index);
        self.session.reset_joints(&self.joints, &angles)?;
        self.setup_scene(episode_index)?;

        let settle = self.config.simulation.settle_ticks;
        if settle > 0 {
            self.session.step_simulation(settle)?;
        }
        if let Some(scene) = self.scene.as_mut() {
            scene.rebase(self.session.as_ref())?;
        }

        self.assembler.assemble(self.session.as_ref(), &self.joints)
    }

    /// Observe, detect and locate the target after actuation.
    fn read_step(&self) -> Result<StepReading, SimError> {
        let scene = self
            .scene
            .ok_or_else(|| SimError::Desync("no scene spawned for this episode".into()))?;
        let session = self.session.as_ref();

        let observation = self.assembler.assemble(session, &self.joints)?;
        let success = self.success.evaluate(session, &scene)?;
        let violations = self.safety.violations(session, &scene)?;
        if !violations.is_empty() {
            warn!(?violations, step = self.episode.step_count + 1, "safety violation");
        }
        let is_object_in_sight = observation
            .camera
            .as_ref()
            .is_some_and(|frame| self.detector.is_object_in_sight(frame));

        let [x, y, z, qx, qy, qz, qw] = observation.camera_pose;
        let camera = Pose::new([x, y, z], [qx, qy, qz, qw]);
        let target = session.body_pose(scene.target)?;
        let object_position = relative_position(&camera, target.position);

        Ok(StepReading {
            observation,
            outcome: StepOutcome {
                is_success: success.is_success,
                is_safety_violated: !violations.is_empty(),
                is_object_in_sight,
                distance_to_goal: Some(success.distance),
            },
            object_position,
        })
    }
}

impl Environment for ReachEnv {
    fn reset(&mut self, seed: Option<u64>) -> Result<Observation, PepperError> {
        self.episode.state.check_reset()?;

        if let Some(seed) = seed {
            self.seeds = SeedHierarchy::new(seed);
            self.seeded_episodes = 0;
        }
        let episode_index = self.seeded_episodes;
        self.seeded_episodes += 1;

        let observation = match self.reset_session(episode_index) {
            Ok(obs) => obs,
            Err(err) => return Err(self.fatal(err)),
        };

        self.episode.reset(self.seeds.episode_seed(episode_index));
        info!(
            episode = self.episode.episode_number,
            seed = ?self.episode.seed,
            session = %self.session.id(),
            "episode reset"
        );
        Ok(observation)
    }

    fn step(&mut self, action: &Action) -> Result<StepResult, PepperError> {
        self.episode.state.check_step()?;

        let command = self.mapper.map(action)?;
        if command.clipped {
            warn!(action = ?action.as_slice(), "action clipped to [-1, 1]");
        }

        let actuated = self
            .session
            .set_angles(&self.joints, &command.angles, command.speed)
            .and_then(|()| self.session.step_simulation(self.substeps));
        let reading = match actuated.and_then(|()| self.read_step()) {
            Ok(reading) => reading,
            Err(err) => return Err(self.fatal(err)),
        };

        let (reward, done) = self.policy.evaluate(&reading.outcome);
        self.episode.advance(reward, done);

        debug!(
            step = self.episode.step_count,
            reward,
            done,
            success = reading.outcome.is_success,
            in_sight = reading.outcome.is_object_in_sight,
            "step"
        );
        if reading.outcome.is_success {
            info!(step = self.episode.step_count, "target touched");
        }

        Ok(StepResult {
            observation: reading.observation,
            reward,
            terminated: done,
            truncated: false,
            info: StepInfo {
                is_success: reading.outcome.is_success,
                is_safety_violated: reading.outcome.is_safety_violated,
                is_object_in_sight: reading.outcome.is_object_in_sight,
                object_position: reading.object_position,
                episode_length: self.episode.step_count,
                episode_reward: self.episode.total_reward,
            },
        })
    }

    fn close(&mut self) -> Result<(), PepperError> {
        if self.episode.is_closed() {
            return Ok(());
        }
        let teardown = self.assembler.teardown(self.session.as_mut());
        let disconnect = self.session.disconnect();
        self.scene = None;
        self.episode.close();
        info!(session = %self.session.id(), "environment closed");
        teardown.and(disconnect).map_err(PepperError::from)
    }

    fn observation_space(&self) -> &ObservationSpace {
        &self.obs_space
    }

    fn action_space(&self) -> &ActionSpace {
        &self.act_space
    }

    fn state(&self) -> EpisodeState {
        self.episode.state
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "ReachEnv"
    }
}

impl Drop for ReachEnv {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            debug!(error = %err, "close on drop failed");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
