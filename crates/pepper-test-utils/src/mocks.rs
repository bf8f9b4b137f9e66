//! Stub detectors for tests.

use pepper_core::traits::ObjectDetector;
use pepper_core::types::CameraFrame;

// ---------------------------------------------------------------------------
// ConstantDetector
// ---------------------------------------------------------------------------

/// A detector that always gives the same answer.
pub struct ConstantDetector {
    visible: bool,
    label: &'static str,
}

impl ConstantDetector {
    pub const fn new(visible: bool) -> Self {
        Self {
            visible,
            label: "ConstantDetector",
        }
    }

    pub const fn with_label(visible: bool, label: &'static str) -> Self {
        Self { visible, label }
    }
}

impl ObjectDetector for ConstantDetector {
    fn is_object_in_sight(&self, _frame: &CameraFrame) -> bool {
        self.visible
    }

    fn name(&self) -> &str {
        self.label
    }
}

// ---------------------------------------------------------------------------
// AlwaysVisible / NeverVisible
// ---------------------------------------------------------------------------

pub struct AlwaysVisible;

impl ObjectDetector for AlwaysVisible {
    fn is_object_in_sight(&self, _frame: &CameraFrame) -> bool {
        true
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "AlwaysVisible"
    }
}

pub struct NeverVisible;

impl ObjectDetector for NeverVisible {
    fn is_object_in_sight(&self, _frame: &CameraFrame) -> bool {
        false
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "NeverVisible"
    }
}
