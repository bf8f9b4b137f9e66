//! Deterministic seeds for reproducible episodes.
//!
//! ```text
//! Run seed (reset(Some(seed)) or simulation.seed)
//! └── Episode seed (per reset within the run)
//!     └── Subsystem seed ("robot_pose", "target_pose", ...)
//! ```

use std::hash::{DefaultHasher, Hash, Hasher};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Subsystem key for initial joint randomization.
pub const ROBOT_POSE: &str = "robot_pose";
/// Subsystem key for target placement randomization.
pub const TARGET_POSE: &str = "target_pose";

/// Mix a parent seed with any hashable key.
///
/// # Example
///
/// ```
/// use pepper_core::seed::derive_seed;
///
/// let child = derive_seed(42, "target_pose");
/// assert_eq!(child, derive_seed(42, "target_pose"));
/// assert_ne!(child, derive_seed(42, "robot_pose"));
/// ```
#[must_use]
pub fn derive_seed<K: Hash + ?Sized>(parent: u64, key: &K) -> u64 {
    let mut hasher = DefaultHasher::new();
    parent.hash(&mut hasher);
    key.hash(&mut hasher);
    hasher.finish()
}

/// Seed tree rooted at one run seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeedHierarchy {
    root: u64,
}

impl SeedHierarchy {
    #[must_use]
    pub const fn new(root: u64) -> Self {
        Self { root }
    }

    #[must_use]
    pub const fn root(&self) -> u64 {
        self.root
    }

    #[must_use]
    pub fn episode_seed(&self, episode_number: u64) -> u64 {
        derive_seed(self.root, &episode_number)
    }

    #[must_use]
    pub fn subsystem_seed(&self, episode_number: u64, subsystem: &str) -> u64 {
        derive_seed(self.episode_seed(episode_number), subsystem)
    }

    /// RNG for one subsystem of one episode.
    #[must_use]
    pub fn subsystem_rng(&self, episode_number: u64, subsystem: &str) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.subsystem_seed(episode_number, subsystem))
    }
}
