//! Built-in target-visibility detectors.
//!
//! Both are deliberately simple pixel counters; anything smarter plugs in
//! through [`ObjectDetector`].

use pepper_core::config::DetectionConfig;
use pepper_core::traits::ObjectDetector;
use pepper_core::types::{CameraFrame, PixelData};

use crate::observation::ObservationMode;

/// Counts pixels within a per-channel tolerance of the target colour.
#[derive(Debug, Clone)]
pub struct ColorBlobDetector {
    color: [u8; 3],
    tolerance: u8,
    min_pixels: u32,
}

impl ColorBlobDetector {
    #[must_use]
    pub const fn new(color: [u8; 3], tolerance: u8, min_pixels: u32) -> Self {
        Self {
            color,
            tolerance,
            min_pixels,
        }
    }

    #[must_use]
    pub const fn from_config(config: &DetectionConfig) -> Self {
        Self::new(config.target_color, config.color_tolerance, config.min_pixels)
    }

    fn matches(&self, px: &[u8]) -> bool {
        px.iter()
            .zip(self.color.iter())
            .all(|(p, c)| p.abs_diff(*c) <= self.tolerance)
    }
}

impl ObjectDetector for ColorBlobDetector {
    fn is_object_in_sight(&self, frame: &CameraFrame) -> bool {
        let PixelData::Rgb8(bytes) = frame.data() else {
            return false;
        };
        let mut count = 0u32;
        for px in bytes.chunks_exact(3) {
            if self.matches(px) {
                count += 1;
                if count >= self.min_pixels {
                    return true;
                }
            }
        }
        false
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "ColorBlobDetector"
    }
}

/// Counts depth samples inside a `[near, far]` millimetre band.
///
/// Zero samples (no return) never count.
#[derive(Debug, Clone)]
pub struct DepthBandDetector {
    near_mm: u16,
    far_mm: u16,
    min_pixels: u32,
}

impl DepthBandDetector {
    #[must_use]
    pub const fn new(near_mm: u16, far_mm: u16, min_pixels: u32) -> Self {
        Self {
            near_mm,
            far_mm,
            min_pixels,
        }
    }

    #[must_use]
    pub const fn from_config(config: &DetectionConfig) -> Self {
        Self::new(
            config.depth_band_mm[0],
            config.depth_band_mm[1],
            config.min_pixels,
        )
    }
}

impl ObjectDetector for DepthBandDetector {
    fn is_object_in_sight(&self, frame: &CameraFrame) -> bool {
        let PixelData::Depth16(samples) = frame.data() else {
            return false;
        };
        let in_band = samples
            .iter()
            .filter(|d| **d != 0 && (self.near_mm..=self.far_mm).contains(*d))
            .count();
        u32::try_from(in_band).unwrap_or(u32::MAX) >= self.min_pixels
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "DepthBandDetector"
    }
}

/// Default detector for an observation mode.
#[must_use]
pub fn detector_for(mode: ObservationMode, config: &DetectionConfig) -> Box<dyn ObjectDetector> {
    match mode {
        ObservationMode::Depth => Box::new(DepthBandDetector::from_config(config)),
        // pose-only never calls its detector
        ObservationMode::Color | ObservationMode::PoseOnly => {
            Box::new(ColorBlobDetector::from_config(config))
        }
    }
}
