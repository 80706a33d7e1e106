//! Capability interface over the host 2D engine
//!
//! The core never owns render or physics objects. It holds opaque handles and
//! asks the engine to act on them; all per-entity bookkeeping lives in
//! side tables keyed by handle.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Opaque id of a physics-backed sprite
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityHandle(pub u32);

/// Opaque id of a bare static physics body (no sprite)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(pub u32);

/// Everything the core needs from the engine
pub trait Engine {
    /// Whether a texture with this key is loaded (or was generated)
    fn texture_exists(&self, key: &str) -> bool;

    /// Render a glyph into a texture under `key` if none exists yet
    fn ensure_glyph_texture(&mut self, key: &str, glyph: &str);

    /// Create a dynamic sprite with the given texture. Ids of destroyed
    /// sprites may be handed out again.
    fn create_sprite(&mut self, texture: &str, pos: Vec2) -> Result<EntityHandle, EngineError>;

    /// Destroy a sprite and its body. Destroying a dead handle is a no-op.
    fn destroy(&mut self, handle: EntityHandle);

    /// False once the sprite is destroyed
    fn is_active(&self, handle: EntityHandle) -> bool;

    /// Unscaled texture size of the sprite
    fn frame_size(&self, handle: EntityHandle) -> Option<Vec2>;

    fn scale(&self, handle: EntityHandle) -> Option<f32>;
    fn set_scale(&mut self, handle: EntityHandle, scale: f32);
    fn alpha(&self, handle: EntityHandle) -> Option<f32>;
    fn set_alpha(&mut self, handle: EntityHandle, alpha: f32);

    fn position(&self, handle: EntityHandle) -> Option<Vec2>;
    fn set_position(&mut self, handle: EntityHandle, pos: Vec2);
    fn velocity(&self, handle: EntityHandle) -> Option<Vec2>;
    fn set_velocity(&mut self, handle: EntityHandle, vel: Vec2);
    fn angular_velocity(&self, handle: EntityHandle) -> Option<f32>;
    fn set_angular_velocity(&mut self, handle: EntityHandle, omega: f32);

    /// Replace the sprite's body with an axis-aligned rectangle. Engines
    /// rebuild the body for this, which resets position and velocity.
    fn set_body_rect(&mut self, handle: EntityHandle, size: Vec2) -> Result<(), EngineError>;
    fn set_static(&mut self, handle: EntityHandle, is_static: bool);
    fn set_bounce(&mut self, handle: EntityHandle, bounce: f32);
    fn set_friction(&mut self, handle: EntityHandle, friction: f32);

    /// Route taps on this sprite to the host's tap dispatcher
    fn set_interactive(&mut self, handle: EntityHandle);

    /// Add a static rectangle centred on `center`
    fn add_static_rect(&mut self, center: Vec2, size: Vec2) -> Result<BodyHandle, EngineError>;
    fn remove_body(&mut self, body: BodyHandle);
}

/// Rebuild a sprite's body at a new scale, keeping its motion
///
/// Body rebuilds reset position and velocity, so both (and spin) are read
/// before and re-applied after. Failures are logged and leave the old body.
pub fn resize_body<E: Engine + ?Sized>(engine: &mut E, handle: EntityHandle, scale: f32) {
    if !engine.is_active(handle) {
        return;
    }
    let (Some(frame), Some(pos)) = (engine.frame_size(handle), engine.position(handle)) else {
        return;
    };
    let vel = engine.velocity(handle).unwrap_or(Vec2::ZERO);
    let omega = engine.angular_velocity(handle).unwrap_or(0.0);

    if let Err(e) = engine.set_body_rect(handle, frame * scale) {
        log::warn!("{e} - keeping previous body");
        return;
    }
    engine.set_position(handle, pos);
    engine.set_velocity(handle, vel);
    engine.set_angular_velocity(handle, omega);
}
