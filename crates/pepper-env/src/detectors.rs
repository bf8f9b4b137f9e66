//! Success and safety predicates over the current session state.
//!
//! Everything here is a read-only query. Safety checks OR-compose through
//! [`CompositeSafety`].

use pepper_core::config::SafetyConfig;
use pepper_core::error::SimError;
use pepper_core::traits::SimSession;
use pepper_core::transform::rotation_between;
use pepper_core::types::ContactTarget;

use crate::scene::Scene;

// ---------------------------------------------------------------------------
// Success
// ---------------------------------------------------------------------------

/// Goal predicate: the effector touches the target or is close enough to it.
#[derive(Debug, Clone)]
pub struct SuccessDetector {
    effector_link: String,
    success_distance: f32,
}

/// Result of one success evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SuccessReading {
    pub is_success: bool,
    /// Effector-to-target centre distance (m).
    pub distance: f32,
}

impl SuccessDetector {
    #[must_use]
    pub fn new(effector_link: &str, success_distance: f32) -> Self {
        Self {
            effector_link: effector_link.into(),
            success_distance,
        }
    }

    pub fn evaluate(
        &self,
        session: &dyn SimSession,
        scene: &Scene,
    ) -> Result<SuccessReading, SimError> {
        let effector = session.link_pose(&self.effector_link)?;
        let target = session.body_pose(scene.target)?;
        let distance = effector.distance_to(&target);
        let touching = session.in_contact(
            &ContactTarget::Link(self.effector_link.clone()),
            &ContactTarget::Body(scene.target),
        )?;
        Ok(SuccessReading {
            is_success: touching || distance <= self.success_distance,
            distance,
        })
    }
}

// ---------------------------------------------------------------------------
// SafetyCheck
// ---------------------------------------------------------------------------

/// One sub-predicate of the safety condition.
pub trait SafetyCheck: Send {
    fn is_violated(&self, session: &dyn SimSession, scene: &Scene) -> Result<bool, SimError>;

    fn name(&self) -> &str;
}

/// Any robot link in contact with the table.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableTouched;

impl SafetyCheck for TableTouched {
    fn is_violated(&self, session: &dyn SimSession, scene: &Scene) -> Result<bool, SimError> {
        session.in_contact(&ContactTarget::Robot, &ContactTarget::Body(scene.table))
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "TableTouched"
    }
}

/// Table moved or rotated beyond tolerance from its pose at reset.
#[derive(Debug, Clone, Copy)]
pub struct TableDisplaced {
    pub max_translation: f32,
    pub max_rotation: f32,
}

impl SafetyCheck for TableDisplaced {
    fn is_violated(&self, session: &dyn SimSession, scene: &Scene) -> Result<bool, SimError> {
        let now = session.body_pose(scene.table)?;
        let moved = now.distance_to(&scene.table_initial);
        let turned = rotation_between(&now, &scene.table_initial);
        Ok(moved > self.max_translation || turned > self.max_rotation)
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "TableDisplaced"
    }
}

// ---------------------------------------------------------------------------
// CompositeSafety
// ---------------------------------------------------------------------------

/// OR-composition of safety checks.
#[derive(Default)]
pub struct CompositeSafety {
    checks: Vec<Box<dyn SafetyCheck>>,
}

impl CompositeSafety {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks enabled in `config`.
    #[must_use]
    pub fn from_config(config: &SafetyConfig) -> Self {
        let mut composite = Self::new();
        if config.check_table_touch {
            composite = composite.add(Box::new(TableTouched));
        }
        if config.check_table_displacement {
            composite = composite.add(Box::new(TableDisplaced {
                max_translation: config.displacement_tolerance,
                max_rotation: config.rotation_tolerance,
            }));
        }
        composite
    }

    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn add(mut self, check: Box<dyn SafetyCheck>) -> Self {
        self.checks.push(check);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.checks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Names of every violated check. Every check is queried so a session
    /// error is never hidden behind an earlier violation.
    pub fn violations(
        &self,
        session: &dyn SimSession,
        scene: &Scene,
    ) -> Result<Vec<&str>, SimError> {
        let mut violated = Vec::new();
        for check in &self.checks {
            if check.is_violated(session, scene)? {
                violated.push(check.name());
            }
        }
        Ok(violated)
    }
}

impl SafetyCheck for CompositeSafety {
    fn is_violated(&self, session: &dyn SimSession, scene: &Scene) -> Result<bool, SimError> {
        Ok(!self.violations(session, scene)?.is_empty())
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "CompositeSafety"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
