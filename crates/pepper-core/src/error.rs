use thiserror::Error;

use crate::types::{BodyHandle, SensorHandle};

/// Top-level error type for the reach environment.
///
/// Every variant surfaces directly to the caller. Nothing is retried and
/// nothing is folded into a `terminated = true` step result.
#[derive(Debug, Error)]
pub enum PepperError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid action: {0}")]
    InvalidAction(#[from] ValidationError),

    #[error("Simulation error: {0}")]
    Simulation(#[from] SimError),

    #[error("Usage error: {0}")]
    Usage(#[from] UsageError),
}

impl PepperError {
    /// Whether the current episode is unusable and `reset` must be called.
    #[must_use]
    pub const fn requires_reset(&self) -> bool {
        matches!(
            self,
            Self::Simulation(_) | Self::Usage(UsageError::EpisodeTerminated)
        )
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid physics_dt: {0} (must be > 0)")]
    InvalidPhysicsDt(f64),

    #[error("control_dt must be >= physics_dt")]
    ControlDtLessThanPhysicsDt,

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Unknown task id: {0}")]
    UnknownTask(String),
}

/// Errors reported by a simulation session.
///
/// All of them are fatal for the running episode: a desynchronized backend
/// cannot be recovered mid-episode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    #[error("Sensor unavailable: {0}")]
    SensorUnavailable(String),

    #[error("Sensor handle {0:?} is not subscribed")]
    SensorNotSubscribed(SensorHandle),

    #[error("Unknown joint: {0}")]
    UnknownJoint(String),

    #[error("Unknown link: {0}")]
    UnknownLink(String),

    #[error("Body not found: {0:?}")]
    BodyNotFound(BodyHandle),

    #[error("Simulation desynchronized: {0}")]
    Desync(String),

    #[error("Command rejected: {0}")]
    CommandRejected(String),

    #[error("Session is disconnected")]
    Disconnected,
}

/// Action validation errors.
///
/// Copy + static messages for cheap propagation in the step path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Action dimension mismatch: expected {expected}, got {got}")]
    ActionDimMismatch { expected: usize, got: usize },

    #[error("Action contains NaN")]
    ActionContainsNan,

    #[error("Action contains Inf")]
    ActionContainsInf,

    #[error("Action out of bounds at dimension {dim}")]
    ActionOutOfBounds { dim: usize },
}

/// Calls made in the wrong lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("step() called before the first reset()")]
    NotReset,

    #[error("step() called on a terminated episode; call reset() first")]
    EpisodeTerminated,

    #[error("environment is closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pepper_error_from_config_error() {
        let err = ConfigError::InvalidPhysicsDt(-1.0);
        let pepper_err: PepperError = err.into();
        assert!(matches!(pepper_err, PepperError::Config(_)));
        assert!(pepper_err.to_string().contains("-1"));
    }

    #[test]
    fn pepper_error_from_sim_error() {
        let err = SimError::SensorUnavailable("CameraDepth".into());
        let pepper_err: PepperError = err.into();
        assert!(matches!(pepper_err, PepperError::Simulation(_)));
        assert!(pepper_err.to_string().contains("CameraDepth"));
        assert!(pepper_err.requires_reset());
    }

    #[test]
    fn pepper_error_from_validation_error() {
        let err = ValidationError::ActionContainsNan;
        let pepper_err: PepperError = err.into();
        assert!(matches!(pepper_err, PepperError::InvalidAction(_)));
        assert!(!pepper_err.requires_reset());
    }

    #[test]
    fn pepper_error_from_usage_error() {
        let terminated: PepperError = UsageError::EpisodeTerminated.into();
        assert!(terminated.requires_reset());

        let closed: PepperError = UsageError::Closed.into();
        assert!(matches!(closed, PepperError::Usage(UsageError::Closed)));
        assert!(!closed.requires_reset());
    }

    #[test]
    fn config_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let config_err: ConfigError = io_err.into();
        assert!(matches!(config_err, ConfigError::Io(_)));
    }

    #[test]
    fn validation_error_display_messages() {
        assert_eq!(
            ValidationError::ActionDimMismatch {
                expected: 7,
                got: 3
            }
            .to_string(),
            "Action dimension mismatch: expected 7, got 3"
        );
        assert_eq!(
            ValidationError::ActionContainsNan.to_string(),
            "Action contains NaN"
        );
        assert_eq!(
            ValidationError::ActionContainsInf.to_string(),
            "Action contains Inf"
        );
        assert_eq!(
            ValidationError::ActionOutOfBounds { dim: 2 }.to_string(),
            "Action out of bounds at dimension 2"
        );
    }

    #[test]
    fn sim_error_display_messages() {
        assert_eq!(
            SimError::SensorUnavailable("CameraBottom_optical_frame".into()).to_string(),
            "Sensor unavailable: CameraBottom_optical_frame"
        );
        assert_eq!(
            SimError::UnknownJoint("RKneePitch".into()).to_string(),
            "Unknown joint: RKneePitch"
        );
        assert_eq!(
            SimError::BodyNotFound(BodyHandle(4)).to_string(),
            "Body not found: BodyHandle(4)"
        );
        assert_eq!(
            SimError::Desync("joint count changed".into()).to_string(),
            "Simulation desynchronized: joint count changed"
        );
        assert_eq!(SimError::Disconnected.to_string(), "Session is disconnected");
    }

    #[test]
    fn usage_error_display_messages() {
        assert_eq!(
            UsageError::NotReset.to_string(),
            "step() called before the first reset()"
        );
        assert_eq!(UsageError::Closed.to_string(), "environment is closed");
    }

    #[test]
    fn config_error_display_messages() {
        assert_eq!(
            ConfigError::ControlDtLessThanPhysicsDt.to_string(),
            "control_dt must be >= physics_dt"
        );
        assert_eq!(
            ConfigError::InvalidValue {
                field: "safety.success_distance".into(),
                message: "must be > 0".into()
            }
            .to_string(),
            "Invalid value for safety.success_distance: must be > 0"
        );
        assert_eq!(
            ConfigError::UnknownTask("PepperPush-v0".into()).to_string(),
            "Unknown task id: PepperPush-v0"
        );
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn errors_are_send_sync() {
        assert_send_sync::<PepperError>();
        assert_send_sync::<SimError>();
    }
}
