//! Episode controller, observation assembly and task registry for the
//! Pepper reach/touch environment.
//!
//! - [`env`](mod@env): [`ReachEnv`], the [`Environment`] implementation
//!   that owns one simulation session
//! - [`episode`]: lifecycle state machine and counters
//! - [`observation`]: colour / depth / pose-only observation assemblers
//! - [`action`]: normalized action → joint targets and speed
//! - [`scene`]: table and target bodies of one episode
//! - [`detectors`]: success predicate and composable safety checks
//! - [`detection`]: built-in target-visibility detectors
//! - [`wrappers`]: [`TimeLimit`]
//! - [`registry`]: task ids and [`make`]

pub mod action;
pub mod detection;
pub mod detectors;
pub mod env;
pub mod episode;
pub mod observation;
pub mod registry;
pub mod scene;
pub mod wrappers;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use env::{Environment, ReachEnv};
pub use episode::{Episode, EpisodeState};
pub use observation::{ObservationAssembler, ObservationMode};
pub use registry::{PEPPER_REACH, PEPPER_REACH_DEPTH, PEPPER_REACH_POSE, Registry, TaskSpec, make};
pub use wrappers::TimeLimit;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        Environment, Episode, EpisodeState, ObservationAssembler, ObservationMode,
        PEPPER_REACH, PEPPER_REACH_DEPTH, PEPPER_REACH_POSE, ReachEnv, Registry, TaskSpec,
        TimeLimit,
        action::{ActionMapper, JointCommand},
        detection::{ColorBlobDetector, DepthBandDetector},
        detectors::{CompositeSafety, SafetyCheck, SuccessDetector},
        make,
        scene::Scene,
    };
}
