//! Episode state machine and lifecycle bookkeeping.
//!
//! ```text
//! Uninitialized ──reset──▶ Ready ──step──▶ Stepping ──step(done)──▶ Terminated
//!                            ▲  ◀───────────reset──────────────────────┘
//! any ──close──▶ Closed
//! ```
//!
//! The physical episode lives in the simulation session. [`Episode`] only
//! tracks where the controller is in its lifecycle plus counters for `info`.

use pepper_core::error::UsageError;

// ---------------------------------------------------------------------------
// EpisodeState
// ---------------------------------------------------------------------------

/// Lifecycle state of the episode controller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EpisodeState {
    /// Constructed, never reset.
    #[default]
    Uninitialized,
    /// Reset done, no step taken yet.
    Ready,
    /// At least one non-terminal step taken.
    Stepping,
    /// Success, safety violation, or a fatal session error.
    Terminated,
    /// Session released; nothing is valid any more.
    Closed,
}

impl EpisodeState {
    /// Whether `step` is allowed.
    #[must_use]
    pub const fn can_step(self) -> bool {
        matches!(self, Self::Ready | Self::Stepping)
    }

    /// Error `step` reports in this state, if any.
    pub const fn check_step(self) -> Result<(), UsageError> {
        match self {
            Self::Ready | Self::Stepping => Ok(()),
            Self::Uninitialized => Err(UsageError::NotReset),
            Self::Terminated => Err(UsageError::EpisodeTerminated),
            Self::Closed => Err(UsageError::Closed),
        }
    }

    /// Error `reset` reports in this state, if any.
    pub const fn check_reset(self) -> Result<(), UsageError> {
        match self {
            Self::Closed => Err(UsageError::Closed),
            _ => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Episode
// ---------------------------------------------------------------------------

/// Current episode's lifecycle state and counters.
#[derive(Clone, Debug, Default)]
pub struct Episode {
    pub state: EpisodeState,
    /// Steps taken this episode.
    pub step_count: u32,
    /// Reward accumulated this episode.
    pub total_reward: f32,
    /// Seed of the current episode.
    pub seed: Option<u64>,
    /// Number of resets since construction.
    pub episode_number: u64,
}

impl Episode {
    /// Start a new episode.
    pub const fn reset(&mut self, seed: u64) {
        self.state = EpisodeState::Ready;
        self.step_count = 0;
        self.total_reward = 0.0;
        self.seed = Some(seed);
        self.episode_number += 1;
    }

    /// Record a completed step.
    pub fn advance(&mut self, reward: f32, done: bool) {
        self.step_count += 1;
        self.total_reward += reward;
        self.state = if done {
            EpisodeState::Terminated
        } else {
            EpisodeState::Stepping
        };
    }

    /// The session failed mid-episode; a reset is required.
    pub const fn abort(&mut self) {
        if !matches!(self.state, EpisodeState::Closed) {
            self.state = EpisodeState::Terminated;
        }
    }

    pub const fn close(&mut self) {
        self.state = EpisodeState::Closed;
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self.state, EpisodeState::Closed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
