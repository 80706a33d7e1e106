//! Tap Sprout - falling picture cards that grow when tapped
//!
//! Core modules:
//! - `sim`: Engine-agnostic spawn/growth/removal lifecycle (timers, tweens, state machine)
//! - `theme`: Category descriptors and their built-in fallbacks
//! - `viewport`: Play-field metrics and responsive sprite scale
//! - `audio`: Themed sound cues with level-derived pitch
//! - `platform`: Browser adapter over the host game engine (wasm only)
//! - `settings`: Session tuning

pub mod audio;
pub mod error;
pub mod platform;
pub mod settings;
pub mod sim;
pub mod theme;
pub mod viewport;

pub use audio::{AudioOut, AudioUnlock, SoundCue, UnlockFlag};
pub use error::{AudioError, EngineError, SettingsError, ThemeError};
pub use settings::{AtMaxPolicy, Settings};
pub use sim::{EntityHandle, Game, GameEvent};
pub use theme::CategoryData;
pub use viewport::ViewportMetrics;

/// Reference tuning. Every value here is overridable through `Settings`.
pub mod consts {
    /// Time between spawn ticks
    pub const SPAWN_INTERVAL_MS: u32 = 1500;
    /// Entities are animated out this long after spawning
    pub const AUTO_REMOVE_DELAY_MS: u32 = 10_000;
    /// Live-set capacity
    pub const MAX_SPRITES: usize = 20;
    /// Spawn x is inset this far from both edges
    pub const SPAWN_MARGIN: f32 = 50.0;
    /// Entities below floor + this margin are swept
    pub const FALL_REMOVAL_MARGIN: f32 = 200.0;
    pub const REMOVAL_DURATION_MS: u32 = 400;
    /// Retry period while category data is still loading
    pub const START_RETRY_MS: u32 = 500;

    pub const BOUNCE: f32 = 0.3;
    pub const FRICTION: f32 = 0.7;
    pub const MAX_SPIN: f32 = 0.01;

    /// Growth ladder
    pub const MAX_LEVEL: u32 = 10;
    pub const GROWTH_MULTIPLIER: f32 = 1.12;
    pub const GROWTH_DURATION_MS: u32 = 200;
    pub const RESET_DURATION_MS: u32 = 200;
    pub const RESET_SCALE: f32 = 0.9;
    pub const RESET_ALPHA: f32 = 0.7;
    pub const REMOVE_ALPHA: f32 = 0.3;
    pub const SOUND_PITCH_STEP: f32 = 0.08;

    /// Category rotation
    pub const SWITCH_INTERVAL_MS: u32 = 60_000;
    pub const SWITCH_WARNING_MS: u32 = 10_000;
    pub const COUNTDOWN_TICK_MS: u32 = 1_000;

    /// Audio
    pub const CUE_VOLUME: f32 = 0.7;
    pub const MIN_PLAYBACK_RATE: f32 = 0.5;
    pub const MAX_PLAYBACK_RATE: f32 = 2.0;

    /// World
    pub const FLOOR_HEIGHT: f32 = 40.0;
    pub const GRAVITY_Y: f32 = 0.67;
    pub const RESIZE_THRESHOLD: f32 = 10.0;
}
