//! In-memory engine
//!
//! A tiny stand-in for the browser engine: sprites are plain records, gravity
//! is integrated per frame and static rectangles act as ground. Used by the
//! native binary and by tests; it also supports failure injection.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use glam::Vec2;

use super::engine::{BodyHandle, Engine, EntityHandle};
use crate::audio::AudioOut;
use crate::consts::GRAVITY_Y;
use crate::error::{AudioError, EngineError};

/// Frame length the gravity constant is tuned for
const REFERENCE_FRAME_MS: f32 = 1000.0 / 60.0;

#[derive(Debug, Clone)]
pub struct HeadlessSprite {
    pub texture: String,
    pub frame: Vec2,
    pub pos: Vec2,
    pub vel: Vec2,
    pub angular_vel: f32,
    pub scale: f32,
    pub alpha: f32,
    pub body: Option<Vec2>,
    pub is_static: bool,
    pub bounce: f32,
    pub friction: f32,
    pub interactive: bool,
}

#[derive(Debug, Clone)]
pub struct HeadlessEngine {
    pub width: f32,
    pub height: f32,
    pub gravity: f32,
    textures: HashMap<String, Vec2>,
    sprites: BTreeMap<u32, HeadlessSprite>,
    statics: BTreeMap<u32, (Vec2, Vec2)>,
    next_id: u32,
    /// Number of sprites destroyed over the engine's lifetime
    pub destroyed: usize,
    /// Make the next `create_sprite` fail
    pub fail_next_create: bool,
    /// Make every `set_body_rect` fail
    pub fail_body_updates: bool,
    /// Hand destroyed sprite ids to new sprites, like pooled host engines
    pub recycle_ids: bool,
    free_ids: BTreeSet<u32>,
}

impl HeadlessEngine {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            gravity: GRAVITY_Y,
            textures: HashMap::new(),
            sprites: BTreeMap::new(),
            statics: BTreeMap::new(),
            next_id: 1,
            destroyed: 0,
            fail_next_create: false,
            fail_body_updates: false,
            recycle_ids: false,
            free_ids: BTreeSet::new(),
        }
    }

    /// Register a loaded texture
    pub fn add_texture(&mut self, key: &str, size: Vec2) {
        self.textures.insert(key.to_string(), size);
    }

    pub fn sprite(&self, handle: EntityHandle) -> Option<&HeadlessSprite> {
        self.sprites.get(&handle.0)
    }

    pub fn sprite_count(&self) -> usize {
        self.sprites.len()
    }

    pub fn static_bodies(&self) -> Vec<(Vec2, Vec2)> {
        self.statics.values().copied().collect()
    }

    /// Integrate gravity and resolve contacts with static rectangles
    pub fn step(&mut self, dt_ms: f64) {
        let frames = dt_ms as f32 / REFERENCE_FRAME_MS;
        let grounds: Vec<(Vec2, Vec2)> = self.statics.values().copied().collect();

        for sprite in self.sprites.values_mut() {
            let Some(body) = sprite.body else { continue };
            if sprite.is_static {
                continue;
            }
            sprite.vel.y += self.gravity * frames;
            sprite.pos += sprite.vel * frames;

            let half = body / 2.0;
            for (center, size) in &grounds {
                let top = center.y - size.y / 2.0;
                let left = center.x - size.x / 2.0;
                let right = center.x + size.x / 2.0;
                let over = sprite.pos.x + half.x > left && sprite.pos.x - half.x < right;
                let was_above = sprite.pos.y - sprite.vel.y * frames + half.y <= top + 0.5;
                if over && was_above && sprite.pos.y + half.y > top {
                    sprite.pos.y = top - half.y;
                    sprite.vel.y = -sprite.vel.y * sprite.bounce;
                    if sprite.vel.y.abs() < 0.5 {
                        sprite.vel.y = 0.0;
                    }
                    sprite.vel.x *= 1.0 - sprite.friction * 0.1;
                }
            }
        }
    }

    /// Teleport a sprite (test helper for the floor sweep)
    pub fn drop_to(&mut self, handle: EntityHandle, y: f32) {
        if let Some(sprite) = self.sprites.get_mut(&handle.0) {
            sprite.pos.y = y;
        }
    }
}

impl Engine for HeadlessEngine {
    fn texture_exists(&self, key: &str) -> bool {
        self.textures.contains_key(key)
    }

    fn ensure_glyph_texture(&mut self, key: &str, glyph: &str) {
        if self.textures.contains_key(key) {
            return;
        }
        // Glyphs render into a square canvas that is then trimmed
        let side = 300.0 + 8.0 * glyph.chars().count() as f32;
        self.textures.insert(key.to_string(), Vec2::splat(side));
    }

    fn create_sprite(&mut self, texture: &str, pos: Vec2) -> Result<EntityHandle, EngineError> {
        if std::mem::take(&mut self.fail_next_create) {
            return Err(EngineError::SpriteCreation(texture.to_string()));
        }
        let frame = *self
            .textures
            .get(texture)
            .ok_or_else(|| EngineError::SpriteCreation(texture.to_string()))?;
        let id = match self.free_ids.pop_first() {
            Some(id) => id,
            None => {
                self.next_id += 1;
                self.next_id - 1
            }
        };
        self.sprites.insert(
            id,
            HeadlessSprite {
                texture: texture.to_string(),
                frame,
                pos,
                vel: Vec2::ZERO,
                angular_vel: 0.0,
                scale: 1.0,
                alpha: 1.0,
                body: None,
                is_static: false,
                bounce: 0.0,
                friction: 0.1,
                interactive: false,
            },
        );
        Ok(EntityHandle(id))
    }

    fn destroy(&mut self, handle: EntityHandle) {
        if self.sprites.remove(&handle.0).is_some() {
            self.destroyed += 1;
            if self.recycle_ids {
                self.free_ids.insert(handle.0);
            }
        }
    }

    fn is_active(&self, handle: EntityHandle) -> bool {
        self.sprites.contains_key(&handle.0)
    }

    fn frame_size(&self, handle: EntityHandle) -> Option<Vec2> {
        self.sprite(handle).map(|s| s.frame)
    }

    fn scale(&self, handle: EntityHandle) -> Option<f32> {
        self.sprite(handle).map(|s| s.scale)
    }

    fn set_scale(&mut self, handle: EntityHandle, scale: f32) {
        if let Some(s) = self.sprites.get_mut(&handle.0) {
            s.scale = scale;
        }
    }

    fn alpha(&self, handle: EntityHandle) -> Option<f32> {
        self.sprite(handle).map(|s| s.alpha)
    }

    fn set_alpha(&mut self, handle: EntityHandle, alpha: f32) {
        if let Some(s) = self.sprites.get_mut(&handle.0) {
            s.alpha = alpha;
        }
    }

    fn position(&self, handle: EntityHandle) -> Option<Vec2> {
        self.sprite(handle).map(|s| s.pos)
    }

    fn set_position(&mut self, handle: EntityHandle, pos: Vec2) {
        if let Some(s) = self.sprites.get_mut(&handle.0) {
            s.pos = pos;
        }
    }

    fn velocity(&self, handle: EntityHandle) -> Option<Vec2> {
        self.sprite(handle).map(|s| s.vel)
    }

    fn set_velocity(&mut self, handle: EntityHandle, vel: Vec2) {
        if let Some(s) = self.sprites.get_mut(&handle.0) {
            s.vel = vel;
        }
    }

    fn angular_velocity(&self, handle: EntityHandle) -> Option<f32> {
        self.sprite(handle).map(|s| s.angular_vel)
    }

    fn set_angular_velocity(&mut self, handle: EntityHandle, omega: f32) {
        if let Some(s) = self.sprites.get_mut(&handle.0) {
            s.angular_vel = omega;
        }
    }

    fn set_body_rect(&mut self, handle: EntityHandle, size: Vec2) -> Result<(), EngineError> {
        if self.fail_body_updates {
            return Err(EngineError::BodyUpdate {
                handle,
                reason: "body is mid-collision".to_string(),
            });
        }
        let sprite = self
            .sprites
            .get_mut(&handle.0)
            .ok_or(EngineError::UnknownEntity(handle))?;
        // A rebuilt body starts from rest, like a real engine's
        sprite.body = Some(size);
        sprite.vel = Vec2::ZERO;
        sprite.angular_vel = 0.0;
        Ok(())
    }

    fn set_static(&mut self, handle: EntityHandle, is_static: bool) {
        if let Some(s) = self.sprites.get_mut(&handle.0) {
            s.is_static = is_static;
            if is_static {
                s.vel = Vec2::ZERO;
                s.angular_vel = 0.0;
            }
        }
    }

    fn set_bounce(&mut self, handle: EntityHandle, bounce: f32) {
        if let Some(s) = self.sprites.get_mut(&handle.0) {
            s.bounce = bounce;
        }
    }

    fn set_friction(&mut self, handle: EntityHandle, friction: f32) {
        if let Some(s) = self.sprites.get_mut(&handle.0) {
            s.friction = friction;
        }
    }

    fn set_interactive(&mut self, handle: EntityHandle) {
        if let Some(s) = self.sprites.get_mut(&handle.0) {
            s.interactive = true;
        }
    }

    fn add_static_rect(&mut self, center: Vec2, size: Vec2) -> Result<BodyHandle, EngineError> {
        if size.x <= 0.0 || size.y <= 0.0 {
            return Err(EngineError::StaticBody(format!("degenerate size {size}")));
        }
        let id = self.next_id;
        self.next_id += 1;
        self.statics.insert(id, (center, size));
        Ok(BodyHandle(id))
    }

    fn remove_body(&mut self, body: BodyHandle) {
        self.statics.remove(&body.0);
    }
}

/// Audio output that records what it was asked to play
#[derive(Debug, Clone, Default)]
pub struct HeadlessAudio {
    loaded: Vec<String>,
    /// `(cue, volume, rate)` per accepted play
    pub played: Vec<(String, f32, f32)>,
}

impl HeadlessAudio {
    pub fn with_sounds<'a>(keys: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            loaded: keys.into_iter().map(str::to_string).collect(),
            played: Vec::new(),
        }
    }
}

impl AudioOut for HeadlessAudio {
    fn has_sound(&self, key: &str) -> bool {
        self.loaded.iter().any(|k| k == key)
    }

    fn play(&mut self, key: &str, volume: f32, rate: f32) -> Result<(), AudioError> {
        if !self.has_sound(key) {
            return Err(AudioError::Missing(key.to_string()));
        }
        self.played.push((key.to_string(), volume, rate));
        Ok(())
    }
}
