//! Error types
//!
//! None of these escape the core as a crash: every caller logs them and skips
//! the affected operation (spawn, sound, body resize, theme load).

use thiserror::Error;

use crate::sim::EntityHandle;

/// Failures reported by the host engine adapter
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine could not create sprite for texture `{0}`")]
    SpriteCreation(String),
    #[error("entity {0:?} is not known to the engine")]
    UnknownEntity(EntityHandle),
    #[error("physics body update rejected for {handle:?}: {reason}")]
    BodyUpdate { handle: EntityHandle, reason: String },
    #[error("static body creation failed: {0}")]
    StaticBody(String),
}

/// Category descriptor parse failures
#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("invalid category json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("category `{0}` has no entities")]
    Empty(String),
}

/// Audio playback failures
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("audio cue `{0}` is not loaded")]
    Missing(String),
    #[error("playback of `{key}` failed: {reason}")]
    Playback { key: String, reason: String },
}

/// Settings parse failures
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid settings json: {0}")]
    Json(#[from] serde_json::Error),
}
