//! Shared test fixtures and utilities for the Pepper reach crates.
//!
//! Provides a scripted [`SimSession`](pepper_core::traits::SimSession) whose
//! state tests can edit while an environment owns it, constant detectors, and
//! deterministic RNG setup.

pub mod mocks;
pub mod rng;
pub mod session;

// ---------------------------------------------------------------------------
// Re-exports for convenience
// ---------------------------------------------------------------------------

pub use mocks::{AlwaysVisible, ConstantDetector, NeverVisible};
pub use rng::{deterministic_vec, seeded_rng};
pub use session::{ScriptHandle, ScriptedSession, SessionCall};
