//! Kinematic reference backend for the Pepper reach environment.
//!
//! [`KinematicSession`] implements [`SimSession`](pepper_core::traits::SimSession)
//! without a physics engine:
//!
//! - [`model`]: link tree, revolute joints, forward kinematics, and the
//!   approximate Pepper upper body
//! - [`geometry`]: sphere / oriented-box distance, contact and ray queries
//! - [`camera`]: ray-cast pinhole rendering into colour or depth frames
//! - [`session`]: bounded-rate joint position control, contacts, and body
//!   pushing
//!
//! # Example
//!
//! ```
//! use pepper_core::config::EnvConfig;
//! use pepper_env::{Environment, PEPPER_REACH, make};
//! use pepper_sim::KinematicSession;
//!
//! let config = EnvConfig::default();
//! let session = KinematicSession::from_config(&config).unwrap();
//! let mut env = make(PEPPER_REACH, config, Box::new(session)).unwrap();
//! let obs = env.reset(Some(0)).unwrap();
//! assert!(env.observation_space().contains(&obs));
//! ```

pub mod camera;
pub mod error;
pub mod geometry;
pub mod model;
pub mod session;

pub use error::ModelError;
pub use model::{JointSpec, LinkSpec, RobotModel};
pub use session::KinematicSession;
