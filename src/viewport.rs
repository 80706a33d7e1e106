//! Play-field metrics and responsive sprite scale
//!
//! The host reports the visible viewport (on iOS Safari that is the visual
//! viewport, not the layout viewport); small height jitter from collapsing
//! browser chrome is filtered out by a threshold.

use serde::{Deserialize, Serialize};

use crate::consts::RESIZE_THRESHOLD;

/// One clamp band: `min_dim / divisor`, clamped into `[min, max]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleBand {
    pub divisor: f32,
    pub min: f32,
    pub max: f32,
}

impl ScaleBand {
    pub const fn new(divisor: f32, min: f32, max: f32) -> Self {
        Self { divisor, min, max }
    }

    pub fn apply(&self, min_dimension: f32) -> f32 {
        (min_dimension / self.divisor).max(self.min).min(self.max)
    }
}

/// Responsive multiplier bands per device class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponsiveBands {
    /// Aspect ratio (w/h) above which the field counts as landscape
    pub landscape_aspect: f32,
    /// Portrait fields with a smaller minimum dimension count as phones
    pub phone_max_dimension: f32,
    pub landscape: ScaleBand,
    pub tablet: ScaleBand,
    pub phone: ScaleBand,
}

impl ResponsiveBands {
    /// Bands tuned for illustrated animals
    pub const ANIMALS: Self = Self {
        landscape_aspect: 1.2,
        phone_max_dimension: 450.0,
        landscape: ScaleBand::new(600.0, 0.7, 1.0),
        tablet: ScaleBand::new(700.0, 0.4, 0.7),
        phone: ScaleBand::new(900.0, 0.3, 0.5),
    };

    /// Glyph textures are larger at the source, so their bands sit lower
    pub const FRUITS: Self = Self {
        landscape_aspect: 1.2,
        phone_max_dimension: 450.0,
        landscape: ScaleBand::new(923.0, 0.455, 0.65),
        tablet: ScaleBand::new(1077.0, 0.26, 0.455),
        phone: ScaleBand::new(1300.0, 0.2, 0.35),
    };
}

impl Default for ResponsiveBands {
    fn default() -> Self {
        Self::ANIMALS
    }
}

/// Current play-field size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportMetrics {
    width: f32,
    height: f32,
    threshold: f32,
}

impl ViewportMetrics {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width: width.max(1.0),
            height: height.max(1.0),
            threshold: RESIZE_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold.max(0.0);
        self
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width / self.height
    }

    pub fn min_dimension(&self) -> f32 {
        self.width.min(self.height)
    }

    /// Apply a reported resize. Returns true if the metrics changed.
    pub fn resize(&mut self, width: f32, height: f32) -> bool {
        let dw = (self.width - width).abs();
        let dh = (self.height - height).abs();
        if dw <= self.threshold && dh <= self.threshold {
            return false;
        }
        self.width = width.max(1.0);
        self.height = height.max(1.0);
        log::debug!("Viewport resized to {}x{}", self.width, self.height);
        true
    }

    /// Responsive multiplier for the given bands
    pub fn scale_factor(&self, bands: &ResponsiveBands) -> f32 {
        let min_dim = self.min_dimension();
        let band = if self.aspect_ratio() > bands.landscape_aspect {
            &bands.landscape
        } else if min_dim < bands.phone_max_dimension {
            &bands.phone
        } else {
            &bands.tablet
        };
        band.apply(min_dim)
    }
}
