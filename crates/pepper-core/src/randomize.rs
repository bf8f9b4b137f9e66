//! Randomization ranges for reset-time sampling.
//!
//! A [`RandomizationRange`] describes how a single scalar (a joint offset, a
//! target coordinate offset) is drawn at the start of an episode.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from constructing or validating a randomization range.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum RangeError {
    #[error("invalid bounds: low ({low}) > high ({high})")]
    InvalidBounds { low: f32, high: f32 },

    #[error("invalid standard deviation: {0} (must be >= 0 and finite)")]
    InvalidStd(f32),

    #[error("value is not finite: {0}")]
    NonFinite(f32),
}

/// How a parameter is randomized on episode reset.
///
/// Serialized as a tagged table, e.g. `{ kind = "uniform", low = -0.1, high = 0.1 }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RandomizationRange {
    /// Always returns the same value.
    Fixed { value: f32 },

    /// Uniform distribution over `[low, high]`.
    Uniform { low: f32, high: f32 },

    /// Gaussian distribution with given mean and standard deviation.
    Gaussian { mean: f32, std: f32 },
}

impl Default for RandomizationRange {
    fn default() -> Self {
        Self::Fixed { value: 0.0 }
    }
}

impl RandomizationRange {
    pub const fn fixed(value: f32) -> Result<Self, RangeError> {
        if !value.is_finite() {
            return Err(RangeError::NonFinite(value));
        }
        Ok(Self::Fixed { value })
    }

    pub fn uniform(low: f32, high: f32) -> Result<Self, RangeError> {
        let range = Self::Uniform { low, high };
        range.validate()?;
        Ok(range)
    }

    pub fn gaussian(mean: f32, std: f32) -> Result<Self, RangeError> {
        let range = Self::Gaussian { mean, std };
        range.validate()?;
        Ok(range)
    }

    /// Symmetric uniform noise `[-half_width, half_width]`; zero width gives `Fixed(0)`.
    pub fn symmetric(half_width: f32) -> Result<Self, RangeError> {
        if half_width == 0.0 {
            return Self::fixed(0.0);
        }
        Self::uniform(-half_width, half_width)
    }

    /// Check a (possibly deserialized) range.
    pub fn validate(&self) -> Result<(), RangeError> {
        match *self {
            Self::Fixed { value } => {
                if !value.is_finite() {
                    return Err(RangeError::NonFinite(value));
                }
            }
            Self::Uniform { low, high } => {
                if !low.is_finite() || !high.is_finite() || low > high {
                    return Err(RangeError::InvalidBounds { low, high });
                }
            }
            Self::Gaussian { mean, std } => {
                if !std.is_finite() || std < 0.0 {
                    return Err(RangeError::InvalidStd(std));
                }
                if !mean.is_finite() {
                    return Err(RangeError::NonFinite(mean));
                }
            }
        }
        Ok(())
    }

    /// Draw one value.
    ///
    /// An invalid Gaussian (negative std) degenerates to its mean; call
    /// [`validate`](Self::validate) at load time to rule that out.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        match *self {
            Self::Fixed { value } => value,
            #[allow(clippy::float_cmp)]
            Self::Uniform { low, high } if low == high => low,
            Self::Uniform { low, high } => rng.gen_range(low..=high),
            Self::Gaussian { mean, std } => match Normal::new(f64::from(mean), f64::from(std)) {
                #[allow(clippy::cast_possible_truncation)]
                Ok(dist) if std > 0.0 => dist.sample(rng) as f32,
                _ => mean,
            },
        }
    }

    /// Center / expected value.
    #[must_use]
    pub fn nominal(&self) -> f32 {
        match *self {
            Self::Fixed { value } => value,
            Self::Uniform { low, high } => (low + high) / 2.0,
            Self::Gaussian { mean, .. } => mean,
        }
    }

    /// Whether sampling always yields the same value.
    #[must_use]
    pub fn is_constant(&self) -> bool {
        match *self {
            Self::Fixed { .. } => true,
            #[allow(clippy::float_cmp)]
            Self::Uniform { low, high } => low == high,
            Self::Gaussian { std, .. } => std == 0.0,
        }
    }
}
