//! Errors raised while building a robot model or session.

use thiserror::Error;

/// Robot-model construction errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("Duplicate link: {0}")]
    DuplicateLink(String),

    #[error("Duplicate joint: {0}")]
    DuplicateJoint(String),

    #[error("Link {link} has unknown parent {parent}")]
    UnknownParent { link: String, parent: String },

    #[error("Model has no joint named {0}")]
    UnknownJoint(String),

    #[error("Joint {joint}: lower limit {lower} > upper limit {upper}")]
    InvalidLimits { joint: String, lower: f32, upper: f32 },

    #[error("Invalid physics_dt: {0} (must be > 0)")]
    InvalidTimestep(f32),
}
