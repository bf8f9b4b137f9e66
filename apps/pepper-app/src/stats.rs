//! Episode statistics across a run.

use pepper_core::types::StepResult;

/// Cumulative statistics over the episodes of one run.
#[derive(Clone, Debug, Default)]
pub struct EpisodeStats {
    /// Episodes that ended (terminated or truncated).
    pub episodes_completed: u32,
    pub successes: u32,
    pub safety_violations: u32,
    pub total_steps: u64,
    /// Steps per completed episode.
    pub step_history: Vec<u32>,
    /// Reward per completed episode.
    pub reward_history: Vec<f32>,
}

impl EpisodeStats {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            episodes_completed: 0,
            successes: 0,
            safety_violations: 0,
            total_steps: 0,
            step_history: Vec::new(),
            reward_history: Vec::new(),
        }
    }

    /// Count one step; closes the episode when the result is final.
    pub fn record(&mut self, result: &StepResult) {
        self.total_steps += 1;
        if !result.done() {
            return;
        }
        self.episodes_completed += 1;
        self.successes += u32::from(result.info.is_success);
        self.safety_violations += u32::from(result.info.is_safety_violated);
        self.step_history.push(result.info.episode_length);
        self.reward_history.push(result.info.episode_reward);
    }

    /// Average episode length (steps) across completed episodes.
    #[must_use]
    pub fn mean_episode_length(&self) -> Option<f32> {
        if self.step_history.is_empty() {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let sum: f32 = self.step_history.iter().map(|&s| s as f32).sum();
        #[allow(clippy::cast_precision_loss)]
        Some(sum / self.step_history.len() as f32)
    }

    /// Average episode reward across completed episodes.
    #[must_use]
    pub fn mean_reward(&self) -> Option<f32> {
        if self.reward_history.is_empty() {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        Some(self.reward_history.iter().sum::<f32>() / self.reward_history.len() as f32)
    }
}
