//! End-to-end episodes on the kinematic backend.

use pepper_core::config::{EnvConfig, Shape};
use pepper_core::error::{PepperError, UsageError};
use pepper_core::randomize::RandomizationRange;
use pepper_core::traits::SimSession;
use pepper_core::types::{Action, PixelFormat, StepResult};
use pepper_env::{
    Environment, EpisodeState, ObservationMode, PEPPER_REACH, PEPPER_REACH_DEPTH,
    PEPPER_REACH_POSE, ReachEnv, make,
};
use pepper_sim::KinematicSession;
use pepper_test_utils::{deterministic_vec, seeded_rng};

/// Left arm raised in front of the robot, clear of the default table.
const ARM_GOAL: [(&str, f32); 4] = [
    ("LShoulderPitch", 0.2),
    ("LShoulderRoll", 0.3),
    ("LElbowYaw", -1.2),
    ("LElbowRoll", -0.5),
];

fn goal_angles(config: &EnvConfig) -> Vec<f32> {
    let mut angles = config.robot.initial_angles();
    for (name, angle) in ARM_GOAL {
        let i = config
            .robot
            .joints
            .iter()
            .position(|j| j.name == name)
            .unwrap();
        angles[i] = angle;
    }
    angles
}

/// Full-speed action that commands `angles`.
fn action_for(config: &EnvConfig, angles: &[f32]) -> Action {
    let mut values: Vec<f32> = config
        .robot
        .joints
        .iter()
        .zip(angles)
        .map(|(j, a)| 2.0 * (a - j.lower) / (j.upper - j.lower) - 1.0)
        .collect();
    values.push(1.0);
    Action::new(values)
}

/// World position of the hand at `angles`.
fn hand_at(config: &EnvConfig, angles: &[f32]) -> [f32; 3] {
    let mut session = KinematicSession::from_config(config).unwrap();
    session
        .reset_joints(&config.robot.joint_names(), angles)
        .unwrap();
    session.link_pose(&config.robot.effector_link).unwrap().position
}

/// Deterministic action with every value scaled into `[-amplitude, amplitude]`.
fn small_action(seed: u64, amplitude: f32) -> Action {
    Action::new(
        deterministic_vec(7, seed)
            .into_iter()
            .map(|v| v * amplitude)
            .collect(),
    )
}

fn reach_env(config: EnvConfig, mode: ObservationMode) -> ReachEnv {
    let session = KinematicSession::from_config(&config).unwrap();
    ReachEnv::new(config, mode, Box::new(session)).unwrap()
}

fn run_until_done(env: &mut impl Environment, action: &Action, max_steps: usize) -> StepResult {
    let mut last = env.step(action).unwrap();
    for _ in 1..max_steps {
        if last.done() {
            break;
        }
        last = env.step(action).unwrap();
    }
    last
}

#[test]
fn every_task_runs_with_random_actions() {
    for (task, image) in [
        (PEPPER_REACH, Some(vec![120, 160, 3])),
        (PEPPER_REACH_DEPTH, Some(vec![120, 160])),
        (PEPPER_REACH_POSE, None),
    ] {
        let config = EnvConfig::default();
        let session = KinematicSession::from_config(&config).unwrap();
        let mut env = make(task, config, Box::new(session)).unwrap();
        let first = env.reset(Some(11)).unwrap();
        assert_eq!(first.camera_shape(), image, "{task}");
        assert!(env.observation_space().contains(&first));

        let mut rng = seeded_rng(5);
        for _ in 0..20 {
            let action = env.action_space().sample(&mut rng);
            let result = env.step(&action).unwrap();
            assert_eq!(result.observation.camera_shape(), image, "{task}");
            assert!(env.observation_space().contains(&result.observation));
            assert!(result.observation.is_finite());
            assert!(result.info.object_position.iter().all(|v| v.is_finite()));
            if result.done() {
                env.reset(None).unwrap();
            }
        }
        env.close().unwrap();
    }
}

#[test]
fn default_scene_normal_step_is_not_terminal() {
    let config = EnvConfig::default();
    let actions = [
        Action::zeros(7),
        Action::new(vec![0.05, -0.05, 0.02, 0.0, 0.01, -0.02, 0.0]),
        small_action(1, 0.1),
        small_action(2, 0.1),
    ];
    for action in actions {
        let mut env = reach_env(config.clone(), ObservationMode::Color);
        env.reset(Some(0)).unwrap();
        let table = env.scene().unwrap().table_initial;

        let result = env.step(&action).unwrap();
        assert!(!result.terminated, "{action:?}");
        assert!(!result.truncated);
        assert!(!result.info.is_safety_violated);
        assert!(!result.info.is_success);
        let expected = if result.info.is_object_in_sight {
            config.reward.step + config.reward.object_in_sight
        } else {
            config.reward.step
        };
        assert!((result.reward - expected).abs() < 1e-6);
        assert_eq!(env.state(), EpisodeState::Stepping);

        let session_table = env.session().body_pose(env.scene().unwrap().table).unwrap();
        assert!(session_table.distance_to(&table) < 1e-6);
    }
}

#[test]
fn holding_mid_range_stays_clear_of_table() {
    let mut env = reach_env(EnvConfig::default(), ObservationMode::PoseOnly);
    env.reset(Some(3)).unwrap();
    for _ in 0..30 {
        let result = env.step(&Action::zeros(7)).unwrap();
        assert!(!result.done());
    }
}

#[test]
fn reaching_the_target_succeeds() {
    let mut config = EnvConfig::default();
    config.scene.table.position = [0.45, -0.6, 0.35];
    let goal = goal_angles(&config);
    config.scene.target.position = hand_at(&config, &goal);

    let action = action_for(&config, &goal);
    let mut env = reach_env(config, ObservationMode::Color);
    let obs = env.reset(Some(0)).unwrap();
    assert_eq!(obs.camera.as_ref().unwrap().format(), PixelFormat::Rgb8);

    let result = run_until_done(&mut env, &action, 20);
    assert!(result.info.is_success);
    assert!(!result.info.is_safety_violated);
    assert!(result.terminated);
    assert!((result.reward - 1.0).abs() < f32::EPSILON);
    assert_eq!(env.state(), EpisodeState::Terminated);

    let [x, y, z] = result.info.object_position;
    assert!((x * x + y * y + z * z).sqrt() < 1.0);
}

#[test]
fn hitting_the_table_is_a_violation() {
    let mut config = EnvConfig::default();
    let goal = goal_angles(&config);
    config.scene.table.shape = Shape::Box([0.05, 0.05, 0.05]);
    config.scene.table.position = hand_at(&config, &goal);
    config.scene.target.position = [1.5, -1.0, 0.5];

    let action = action_for(&config, &goal);
    let mut env = reach_env(config, ObservationMode::PoseOnly);
    env.reset(None).unwrap();

    let result = run_until_done(&mut env, &action, 20);
    assert!(result.info.is_safety_violated);
    assert!(!result.info.is_success);
    assert!(result.terminated);
    assert!((result.reward + 1.0).abs() < f32::EPSILON);

    assert!(matches!(
        env.step(&action),
        Err(PepperError::Usage(UsageError::EpisodeTerminated))
    ));
}

#[test]
fn same_seed_same_rollout() {
    let mut config = EnvConfig::default();
    config.scene.target_position_noise = RandomizationRange::uniform(-0.05, 0.05).unwrap();
    config.robot.initial_joint_noise = RandomizationRange::uniform(-0.05, 0.05).unwrap();

    let rollout = |seed: u64| {
        let mut env = reach_env(config.clone(), ObservationMode::PoseOnly);
        let mut trace = vec![env.reset(Some(seed)).unwrap().joints_state];
        for i in 0..5 {
            let result = env.step(&small_action(i, 0.5)).unwrap();
            trace.push(result.observation.joints_state.clone());
            trace.push(result.info.object_position.to_vec());
            if result.done() {
                trace.push(env.reset(None).unwrap().joints_state);
            }
        }
        trace
    };

    assert_eq!(rollout(9), rollout(9));
    assert_ne!(rollout(9), rollout(10));
}

#[test]
fn time_limit_truncates() {
    let mut config = EnvConfig::default();
    config.simulation.max_episode_steps = 3;
    let session = KinematicSession::from_config(&config).unwrap();
    let mut env = make(PEPPER_REACH_POSE, config, Box::new(session)).unwrap();
    env.reset(None).unwrap();
    let hold = Action::zeros(7);
    assert!(!env.step(&hold).unwrap().done());
    assert!(!env.step(&hold).unwrap().done());
    let last = env.step(&hold).unwrap();
    assert!(last.truncated);
    assert!(!last.terminated);
}

#[test]
fn close_disconnects() {
    let mut env = reach_env(EnvConfig::default(), ObservationMode::Depth);
    env.reset(None).unwrap();
    env.close().unwrap();
    assert_eq!(env.state(), EpisodeState::Closed);
    assert!(matches!(
        env.reset(None),
        Err(PepperError::Usage(UsageError::Closed))
    ));
    assert!(env.close().is_ok());
}
