//! Session settings
//!
//! Immutable for the lifetime of a `Game`. Every section is `#[serde(default)]`
//! so a host may ship a partial JSON override.

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::SettingsError;

/// What a tap does to an entity already at its maximum growth level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AtMaxPolicy {
    /// Shrink back to slightly below the base scale and start the ladder again
    #[default]
    Reset,
    /// Freeze, shrink to nothing and destroy the entity
    Remove,
}

impl AtMaxPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AtMaxPolicy::Reset => "reset",
            AtMaxPolicy::Remove => "remove",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "reset" => Some(AtMaxPolicy::Reset),
            "remove" | "pop" => Some(AtMaxPolicy::Remove),
            _ => None,
        }
    }
}

/// Spawn cadence, lifetime and per-entity physics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnerConfig {
    pub spawn_interval_ms: u32,
    /// Unconditional lifetime of an entity before it is animated out
    pub auto_remove_delay_ms: u32,
    /// Live-set capacity
    pub max_sprites: usize,
    /// Horizontal inset from both field edges for spawn positions
    pub spawn_margin: f32,
    /// How far below the floor line an entity may fall before it is swept
    pub fall_removal_margin: f32,
    pub removal_duration_ms: u32,
    /// Poll interval while waiting for category data before spawning starts
    pub start_retry_ms: u32,
    pub bounce: f32,
    pub friction: f32,
    /// Initial angular velocity is drawn from [-max_spin, max_spin]
    pub max_spin: f32,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            spawn_interval_ms: SPAWN_INTERVAL_MS,
            auto_remove_delay_ms: AUTO_REMOVE_DELAY_MS,
            max_sprites: MAX_SPRITES,
            spawn_margin: SPAWN_MARGIN,
            fall_removal_margin: FALL_REMOVAL_MARGIN,
            removal_duration_ms: REMOVAL_DURATION_MS,
            start_retry_ms: START_RETRY_MS,
            bounce: BOUNCE,
            friction: FRICTION,
            max_spin: MAX_SPIN,
        }
    }
}

/// Growth ladder tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthConfig {
    pub max_level: u32,
    /// Scale factor applied per level (exponential ladder)
    pub growth_multiplier: f32,
    pub growth_duration_ms: u32,
    pub reset_duration_ms: u32,
    /// Scale after a reset, relative to the base scale
    pub reset_scale: f32,
    /// Playback-rate increase per growth level
    pub sound_pitch_step: f32,
    pub at_max: AtMaxPolicy,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            max_level: MAX_LEVEL,
            growth_multiplier: GROWTH_MULTIPLIER,
            growth_duration_ms: GROWTH_DURATION_MS,
            reset_duration_ms: RESET_DURATION_MS,
            reset_scale: RESET_SCALE,
            sound_pitch_step: SOUND_PITCH_STEP,
            at_max: AtMaxPolicy::Reset,
        }
    }
}

impl GrowthConfig {
    /// Ladder scale at `level`
    pub fn scale_at(&self, base_scale: f32, level: u32) -> f32 {
        base_scale * self.growth_multiplier.powi(level as i32)
    }
}

/// Category rotation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RotatorConfig {
    pub switch_interval_ms: u32,
    /// Rotation order; the first entry is active at start
    pub categories: Vec<String>,
    /// Countdown is flagged as "warning" at or below this many ms
    pub warning_ms: u32,
}

impl Default for RotatorConfig {
    fn default() -> Self {
        Self {
            switch_interval_ms: SWITCH_INTERVAL_MS,
            categories: vec!["animals".to_string(), "fruits".to_string()],
            warning_ms: SWITCH_WARNING_MS,
        }
    }
}

/// Sound playback
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Cue volume (0.0 - 1.0)
    pub volume: f32,
    /// Lowest playback rate handed to the audio player
    pub min_rate: f32,
    /// Highest playback rate handed to the audio player
    pub max_rate: f32,
    pub muted: bool,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            volume: CUE_VOLUME,
            min_rate: MIN_PLAYBACK_RATE,
            max_rate: MAX_PLAYBACK_RATE,
            muted: false,
        }
    }
}

/// World geometry handed to the physics side
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub floor_height: f32,
    pub gravity_y: f32,
    /// Viewport changes smaller than this (px) are ignored
    pub resize_threshold: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            floor_height: FLOOR_HEIGHT,
            gravity_y: GRAVITY_Y,
            resize_threshold: RESIZE_THRESHOLD,
        }
    }
}

/// All session settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub spawner: SpawnerConfig,
    pub growth: GrowthConfig,
    pub rotator: RotatorConfig,
    pub audio: AudioSettings,
    pub physics: PhysicsConfig,
}

impl Settings {
    /// Override what happens to entities tapped at max level
    pub fn with_policy(mut self, policy: AtMaxPolicy) -> Self {
        self.growth.at_max = policy;
        self
    }

    /// Parse a (possibly partial) JSON override
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Settings = serde_json::from_str(json)?;
        Ok(settings.sanitized())
    }

    /// Parse a JSON override, falling back to defaults on any error
    pub fn from_json_or_default(json: &str) -> Self {
        match Self::from_json(json) {
            Ok(settings) => {
                log::info!("Loaded settings override");
                settings
            }
            Err(e) => {
                log::warn!("{e} - using default settings");
                Self::default()
            }
        }
    }

    /// Clamp values that would break the simulation
    fn sanitized(mut self) -> Self {
        self.spawner.spawn_interval_ms = self.spawner.spawn_interval_ms.max(1);
        self.rotator.switch_interval_ms = self.rotator.switch_interval_ms.max(1_000);
        self.growth.growth_multiplier = self.growth.growth_multiplier.max(1.0);
        self.growth.reset_scale = self.growth.reset_scale.max(0.01);
        self.audio.volume = self.audio.volume.clamp(0.0, 1.0);
        if self.audio.min_rate > self.audio.max_rate {
            std::mem::swap(&mut self.audio.min_rate, &mut self.audio.max_rate);
        }
        if self.rotator.categories.is_empty() {
            log::warn!("No categories configured - using defaults");
            self.rotator.categories = RotatorConfig::default().categories;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_override_keeps_defaults() {
        let settings =
            Settings::from_json(r#"{ "growth": { "max_level": 7, "at_max": "remove" } }"#).unwrap();
        assert_eq!(settings.growth.max_level, 7);
        assert_eq!(settings.growth.at_max, AtMaxPolicy::Remove);
        assert_eq!(settings.growth.growth_multiplier, GROWTH_MULTIPLIER);
        assert_eq!(settings.spawner.spawn_interval_ms, SPAWN_INTERVAL_MS);
        assert_eq!(settings.rotator.categories, vec!["animals", "fruits"]);
    }

    #[test]
    fn test_bad_json_falls_back() {
        let settings = Settings::from_json_or_default("{ nope");
        assert_eq!(settings.spawner.max_sprites, MAX_SPRITES);
    }

    #[test]
    fn test_sanitize_empty_categories_and_rates() {
        let settings = Settings::from_json(
            r#"{ "rotator": { "categories": [] }, "audio": { "min_rate": 3.0, "max_rate": 0.5 } }"#,
        )
        .unwrap();
        assert_eq!(settings.rotator.categories.len(), 2);
        assert!(settings.audio.min_rate < settings.audio.max_rate);
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!(AtMaxPolicy::from_str("Remove"), Some(AtMaxPolicy::Remove));
        assert_eq!(AtMaxPolicy::from_str("reset"), Some(AtMaxPolicy::Reset));
        assert_eq!(AtMaxPolicy::from_str("explode"), None);
        assert_eq!(AtMaxPolicy::Remove.as_str(), "remove");
    }

    #[test]
    fn test_policy_override_keeps_loaded_values() {
        let loaded = Settings::from_json(r#"{ "growth": { "max_level": 7 } }"#).unwrap();
        let policy = AtMaxPolicy::from_str("pop").unwrap();
        let settings = loaded.with_policy(policy);
        assert_eq!(settings.growth.at_max, AtMaxPolicy::Remove);
        assert_eq!(settings.growth.max_level, 7);
        assert_eq!(settings.growth.at_max.as_str(), "remove");
    }
}
