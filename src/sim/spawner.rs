//! Entity spawner
//!
//! Decides what to spawn and where, wires each new entity into the growth
//! ledger, dispatches taps, and removes entities on timeout or when they fall
//! out of the field. The live set is the spawner's canonical list of entities;
//! the engine only owns the sprites behind the handles.

use std::collections::HashMap;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::engine::{Engine, EntityHandle};
use super::growth::{GrowOutcome, GrowthLedger, GrowthNotice};
use super::timer::{TimerId, Timers};
use super::tween::{Ease, TweenSpec, Tweens};
use super::world::GameEvent;
use crate::audio::{AudioOut, SoundCue};
use crate::consts::REMOVE_ALPHA;
use crate::settings::{GrowthConfig, SpawnerConfig};
use crate::theme::CategoryData;
use crate::viewport::ViewportMetrics;

/// One entry of the live set
#[derive(Debug, Clone, PartialEq)]
pub struct LiveEntity {
    pub handle: EntityHandle,
    /// Category active when the entity spawned
    pub category: String,
    pub key: String,
    /// Set once, when any removal path starts
    pub removing: bool,
    /// Lifetime timer, cancelled when the entity leaves early
    pub auto_remove: TimerId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Job {
    SpawnTick,
    RetryStart,
    AutoRemove(EntityHandle),
}

pub struct EntitySpawner<A: AudioOut> {
    config: SpawnerConfig,
    categories: HashMap<String, CategoryData>,
    current: String,
    live: Vec<LiveEntity>,
    last_spawned: Option<String>,
    rng: Pcg32,
    timers: Timers<Job>,
    spawn_timer: Option<TimerId>,
    retry_timer: Option<TimerId>,
    removals: Tweens<()>,
    growth: GrowthLedger,
    sound: SoundCue<A>,
    events: Vec<GameEvent>,
}

impl<A: AudioOut> EntitySpawner<A> {
    pub fn new(
        config: SpawnerConfig,
        growth: GrowthConfig,
        sound: SoundCue<A>,
        initial_category: &str,
        seed: u64,
    ) -> Self {
        Self {
            config,
            categories: HashMap::new(),
            current: initial_category.to_string(),
            live: Vec::new(),
            last_spawned: None,
            rng: Pcg32::seed_from_u64(seed),
            timers: Timers::new(),
            spawn_timer: None,
            retry_timer: None,
            removals: Tweens::new(),
            growth: GrowthLedger::new(growth),
            sound,
            events: Vec::new(),
        }
    }

    /// Register a category's descriptor: its sound mappings go to the sound
    /// cue and any glyph textures are generated up front
    pub fn set_category_data<E: Engine + ?Sized>(&mut self, engine: &mut E, data: CategoryData) {
        self.sound.add_mappings(data.audio_map());
        for (key, glyph) in data.glyphs() {
            engine.ensure_glyph_texture(key, glyph);
        }
        log::info!(
            "Registered category `{}` ({} entities)",
            data.category,
            data.entities.len()
        );
        self.categories.insert(data.category.clone(), data);
    }

    pub fn has_category_data(&self, category: &str) -> bool {
        self.categories.contains_key(category)
    }

    pub fn category_data(&self, category: &str) -> Option<&CategoryData> {
        self.categories.get(category)
    }

    pub fn current_category(&self) -> &str {
        &self.current
    }

    /// Point future spawns at another category. Live entities keep theirs.
    pub fn switch_category(&mut self, category: &str) -> bool {
        if self.current == category {
            return false;
        }
        if !self.has_category_data(category) {
            log::warn!("Switching to `{category}` before its data is registered");
        }
        log::info!("Spawner category {} -> {}", self.current, category);
        self.current = category.to_string();
        true
    }

    /// Start the repeating spawn tick. Without data for the active category
    /// the start is retried until data arrives.
    pub fn start_spawning(&mut self) {
        self.stop_spawning();
        if !self.has_category_data(&self.current) {
            log::info!("Waiting for `{}` data before spawning", self.current);
            self.retry_timer = Some(self.timers.once(self.config.start_retry_ms, Job::RetryStart));
            return;
        }
        self.spawn_timer = Some(self.timers.repeat(self.config.spawn_interval_ms, Job::SpawnTick));
        log::info!("Started spawning {}", self.current);
    }

    /// Cancel the spawn tick. Pending auto-removals and running animations
    /// still complete.
    pub fn stop_spawning(&mut self) {
        let was_running = self.spawn_timer.is_some();
        for id in [self.spawn_timer.take(), self.retry_timer.take()]
            .into_iter()
            .flatten()
        {
            self.timers.cancel(id);
        }
        if was_running {
            log::info!("Stopped spawning");
        }
    }

    pub fn is_spawning(&self) -> bool {
        self.spawn_timer.is_some()
    }

    pub fn is_waiting_for_data(&self) -> bool {
        self.retry_timer.is_some()
    }

    pub fn live(&self) -> &[LiveEntity] {
        &self.live
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn entity(&self, handle: EntityHandle) -> Option<&LiveEntity> {
        self.live.iter().find(|e| e.handle == handle)
    }

    pub fn growth(&self) -> &GrowthLedger {
        &self.growth
    }

    pub fn sound(&self) -> &SoundCue<A> {
        &self.sound
    }

    pub fn sound_mut(&mut self) -> &mut SoundCue<A> {
        &mut self.sound
    }

    /// Take the events produced since the last call
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Pick the next entity key: uniform over the category, never the same
    /// key twice in a row when there is a choice
    fn pick_key(&mut self, data: &CategoryData) -> Option<String> {
        let keys = data.entity_keys();
        let candidates: Vec<&str> = if keys.len() > 1 {
            keys.into_iter()
                .filter(|k| Some(*k) != self.last_spawned.as_deref())
                .collect()
        } else {
            keys
        };
        if candidates.is_empty() {
            return None;
        }
        let key = candidates[self.rng.random_range(0..candidates.len())].to_string();
        self.last_spawned = Some(key.clone());
        Some(key)
    }

    /// Spawn one entity above the field. Returns None when at capacity, when
    /// there is no data, or when the engine can't provide the sprite.
    pub fn spawn_one<E: Engine + ?Sized>(
        &mut self,
        engine: &mut E,
        viewport: &ViewportMetrics,
    ) -> Option<EntityHandle> {
        if self.live.len() >= self.config.max_sprites {
            return None;
        }
        let data = self.categories.get(&self.current)?.clone();
        let key = self.pick_key(&data)?;

        if !engine.texture_exists(&key) {
            log::warn!("Texture not found for: {key}");
            return None;
        }

        let margin = self.config.spawn_margin;
        let x = if viewport.width() > margin * 2.0 {
            self.rng.random_range(margin..=viewport.width() - margin)
        } else {
            viewport.width() / 2.0
        };
        let handle = match engine.create_sprite(&key, Vec2::new(x, 0.0)) {
            Ok(handle) => handle,
            Err(e) => {
                log::warn!("{e}");
                return None;
            }
        };

        let scale = data.base_scale(&key) * viewport.scale_factor(&data.bands());
        let Some(frame) = engine.frame_size(handle) else {
            log::warn!("Sprite for {key} has no frame - discarding");
            engine.destroy(handle);
            return None;
        };
        let size = frame * scale;

        engine.set_scale(handle, scale);
        // Enter from just above the top edge
        engine.set_position(handle, Vec2::new(x, -size.y));
        if let Err(e) = engine.set_body_rect(handle, size) {
            log::warn!("{e} - discarding {key}");
            engine.destroy(handle);
            return None;
        }
        engine.set_bounce(handle, self.config.bounce);
        engine.set_friction(handle, self.config.friction);
        engine.set_velocity(handle, Vec2::ZERO);
        let spin = self.config.max_spin.abs();
        let omega = if spin > 0.0 {
            self.rng.random_range(-spin..=spin)
        } else {
            0.0
        };
        engine.set_angular_velocity(handle, omega);
        engine.set_interactive(handle);

        self.growth.track(handle, scale);
        let delay = self.config.auto_remove_delay_ms;
        let auto_remove = self.timers.once(delay, Job::AutoRemove(handle));
        self.live.push(LiveEntity {
            handle,
            category: self.current.clone(),
            key: key.clone(),
            removing: false,
            auto_remove,
        });

        log::debug!("Spawned {key} ({:?}) at x={x:.0} scale={scale:.3}", handle);
        self.events.push(GameEvent::Spawned {
            handle,
            category: self.current.clone(),
            key,
        });
        Some(handle)
    }

    /// Tap dispatch: play the pitched cue, then grow
    pub fn on_entity_tapped<E: Engine + ?Sized>(
        &mut self,
        engine: &mut E,
        handle: EntityHandle,
    ) -> GrowOutcome {
        let Some(entry) = self.live.iter().find(|e| e.handle == handle) else {
            return GrowOutcome::Rejected;
        };
        if entry.removing || !self.growth.can_grow(&*engine, handle) {
            return GrowOutcome::Rejected;
        }
        let key = entry.key.clone();

        let pitch = self.growth.pitch_multiplier(handle);
        self.sound.play_with_pitch(&key, pitch);

        // Playing audio must not have invalidated the entity
        if !engine.is_active(handle) {
            return GrowOutcome::Rejected;
        }
        let outcome = self.growth.request_grow(engine, handle);
        if outcome == GrowOutcome::Removing {
            if let Some(entry) = self.live.iter_mut().find(|e| e.handle == handle) {
                entry.removing = true;
            }
        }
        outcome
    }

    /// Freeze, shrink and fade the entity, then destroy it. Returns false if
    /// the entity is unknown or already being removed.
    pub fn remove_with_animation<E: Engine + ?Sized>(
        &mut self,
        engine: &mut E,
        handle: EntityHandle,
    ) -> bool {
        let Some(entry) = self.live.iter_mut().find(|e| e.handle == handle) else {
            return false;
        };
        if entry.removing {
            return false;
        }
        entry.removing = true;
        self.growth.mark_removing(handle);

        engine.set_static(handle, true);
        let spec = TweenSpec {
            scale: 0.0,
            alpha: Some(REMOVE_ALPHA),
            duration_ms: self.config.removal_duration_ms,
            ease: Ease::CubicOut,
        };
        self.removals.start(&*engine, handle, spec, ());
        true
    }

    /// Drop an entity from the live set and report it (at most once)
    fn release(&mut self, handle: EntityHandle) {
        if let Some(i) = self.live.iter().position(|e| e.handle == handle) {
            let entry = self.live.remove(i);
            // Engines may hand the same id to a later sprite
            self.timers.cancel(entry.auto_remove);
            self.growth.forget(handle);
            self.events.push(GameEvent::Removed { handle });
        }
    }

    /// Per-frame entry point: timers, animations, then the floor sweep
    pub fn update<E: Engine + ?Sized>(
        &mut self,
        engine: &mut E,
        viewport: &ViewportMetrics,
        floor_y: f32,
        dt_ms: f64,
    ) {
        for job in self.timers.advance(dt_ms) {
            match job {
                Job::SpawnTick => {
                    self.spawn_one(engine, viewport);
                }
                Job::RetryStart => {
                    self.retry_timer = None;
                    self.start_spawning();
                }
                Job::AutoRemove(handle) => {
                    if engine.is_active(handle) {
                        self.remove_with_animation(engine, handle);
                    }
                }
            }
        }

        for notice in self.growth.advance(engine, dt_ms) {
            match notice {
                GrowthNotice::Grew { handle, level } => {
                    self.events.push(GameEvent::Grew { handle, level });
                }
                GrowthNotice::Reset { handle } => {
                    self.events.push(GameEvent::Reset { handle });
                }
                GrowthNotice::Removed { handle } => self.release(handle),
            }
        }

        for (handle, ()) in self.removals.advance(engine, dt_ms) {
            engine.destroy(handle);
            self.release(handle);
        }

        self.sweep(engine, floor_y);
    }

    /// Remove entities that fell past the floor; prune dead ones
    fn sweep<E: Engine + ?Sized>(&mut self, engine: &mut E, floor_y: f32) {
        let limit = floor_y + self.config.fall_removal_margin;
        let fallen: Vec<EntityHandle> = self
            .live
            .iter()
            .filter(|e| !e.removing)
            .filter(|e| engine.position(e.handle).is_some_and(|p| p.y > limit))
            .map(|e| e.handle)
            .collect();
        for handle in fallen {
            log::debug!("{:?} fell out of the field", handle);
            self.remove_with_animation(engine, handle);
        }

        let dead: Vec<EntityHandle> = self
            .live
            .iter()
            .filter(|e| !engine.is_active(e.handle))
            .map(|e| e.handle)
            .collect();
        for handle in dead {
            self.removals.cancel(handle);
            self.release(handle);
        }
    }
}
