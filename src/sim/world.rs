//! Game session
//!
//! Composes the spawner, the category rotator and the floor around one engine
//! instance. The host drives it with `update` once per frame and forwards
//! taps and viewport changes.

use serde::{Deserialize, Serialize};

use super::engine::{Engine, EntityHandle};
use super::floor::PhysicsFloorAdapter;
use super::growth::GrowOutcome;
use super::rotator::{CategoryRotator, CategorySwitch};
use super::spawner::EntitySpawner;
use crate::audio::{AudioOut, AudioUnlock, SoundCue};
use crate::settings::Settings;
use crate::theme::CategoryData;
use crate::viewport::ViewportMetrics;

/// Observable game events, in the order they happened within a frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GameEvent {
    Spawned {
        handle: EntityHandle,
        category: String,
        key: String,
    },
    /// A growth step finished
    Grew { handle: EntityHandle, level: u32 },
    /// Max level reached and the entity dropped back to level 0
    Reset { handle: EntityHandle },
    /// The entity left the live set
    Removed { handle: EntityHandle },
    CategorySwitched(CategorySwitch),
}

pub struct Game<E: Engine, A: AudioOut> {
    engine: E,
    viewport: ViewportMetrics,
    floor: PhysicsFloorAdapter,
    spawner: EntitySpawner<A>,
    rotator: CategoryRotator,
    settings: Settings,
    events: Vec<GameEvent>,
    started: bool,
}

impl<E: Engine, A: AudioOut> Game<E, A> {
    pub fn new(
        engine: E,
        audio: A,
        unlock: Box<dyn AudioUnlock>,
        settings: Settings,
        width: f32,
        height: f32,
        seed: u64,
    ) -> Self {
        let rotator = CategoryRotator::new(settings.rotator.clone());
        let sound = SoundCue::new(audio, unlock, settings.audio.clone());
        let spawner = EntitySpawner::new(
            settings.spawner.clone(),
            settings.growth.clone(),
            sound,
            rotator.current(),
            seed,
        );
        Self {
            engine,
            viewport: ViewportMetrics::new(width, height)
                .with_threshold(settings.physics.resize_threshold),
            floor: PhysicsFloorAdapter::new(settings.physics.floor_height),
            spawner,
            rotator,
            settings,
            events: Vec::new(),
            started: false,
        }
    }

    /// Register a category descriptor (may arrive after `start`)
    pub fn set_category_data(&mut self, data: CategoryData) {
        self.spawner.set_category_data(&mut self.engine, data);
    }

    /// Build the floor, announce the first category and begin spawning
    pub fn start(&mut self) {
        self.floor.sync(&mut self.engine, &self.viewport);
        let switch = self.rotator.start();
        self.spawner.switch_category(&switch.to);
        self.events.push(GameEvent::CategorySwitched(switch));
        self.spawner.start_spawning();
        self.started = true;
        log::info!(
            "Game started ({}x{})",
            self.viewport.width(),
            self.viewport.height()
        );
    }

    /// Stop spawning and rotating. Entities already in flight finish their
    /// animations on later updates.
    pub fn stop(&mut self) {
        self.spawner.stop_spawning();
        self.rotator.stop();
        self.started = false;
    }

    /// Stop and tear down the floor. Entities still on screen fall away and
    /// are swept like any other.
    pub fn shutdown(&mut self) {
        self.stop();
        self.floor.remove(&mut self.engine);
        log::info!("Game shut down");
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Advance the session by one frame; returns this frame's events
    pub fn update(&mut self, dt_ms: f64) -> Vec<GameEvent> {
        for switch in self.rotator.advance(dt_ms) {
            self.apply_switch(switch);
        }
        let floor_y = self.floor.floor_y(&self.viewport);
        self.spawner
            .update(&mut self.engine, &self.viewport, floor_y, dt_ms);

        let mut events = std::mem::take(&mut self.events);
        events.extend(self.spawner.drain_events());
        events
    }

    pub fn on_tap(&mut self, handle: EntityHandle) -> GrowOutcome {
        self.spawner.on_entity_tapped(&mut self.engine, handle)
    }

    /// Apply a reported viewport size; the floor follows any accepted change
    pub fn on_resize(&mut self, width: f32, height: f32) -> bool {
        if !self.viewport.resize(width, height) {
            return false;
        }
        if self.started {
            self.floor.sync(&mut self.engine, &self.viewport);
        }
        true
    }

    /// Switch category now; the countdown restarts from a full interval
    pub fn force_switch(&mut self) -> CategorySwitch {
        let switch = self.rotator.force_switch();
        self.apply_switch(switch.clone());
        switch
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.spawner.sound_mut().set_muted(muted);
    }

    fn apply_switch(&mut self, switch: CategorySwitch) {
        self.spawner.switch_category(&switch.to);
        self.events.push(GameEvent::CategorySwitched(switch));
    }

    /// Prompt for the active category, if its descriptor has one
    pub fn question(&self) -> Option<&str> {
        self.spawner
            .category_data(self.rotator.current())
            .and_then(|d| d.question.as_deref())
    }

    pub fn current_category(&self) -> &str {
        self.rotator.current()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn viewport(&self) -> &ViewportMetrics {
        &self.viewport
    }

    pub fn floor(&self) -> &PhysicsFloorAdapter {
        &self.floor
    }

    pub fn spawner(&self) -> &EntitySpawner<A> {
        &self.spawner
    }

    pub fn rotator(&self) -> &CategoryRotator {
        &self.rotator
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::UnlockFlag;
    use crate::sim::headless::{HeadlessAudio, HeadlessEngine};
    use glam::Vec2;

    fn game() -> Game<HeadlessEngine, HeadlessAudio> {
        let mut engine = HeadlessEngine::new(390.0, 844.0);
        for key in ["cat-01", "dog-01", "elephant-01"] {
            engine.add_texture(key, Vec2::new(300.0, 260.0));
        }
        let audio =
            HeadlessAudio::with_sounds(["cat", "dog", "elephant", "apple", "banana", "grape"]);
        let mut game = Game::new(
            engine,
            audio,
            Box::new(UnlockFlag::new(true)),
            Settings::default(),
            390.0,
            844.0,
            42,
        );
        game.set_category_data(CategoryData::fallback("animals"));
        game.set_category_data(CategoryData::fallback("fruits"));
        game
    }

    fn run(game: &mut Game<HeadlessEngine, HeadlessAudio>, ms: f64) -> Vec<GameEvent> {
        let mut events = Vec::new();
        let mut t = 0.0;
        while t < ms {
            game.engine_mut().step(16.0);
            events.extend(game.update(16.0));
            t += 16.0;
        }
        events
    }

    #[test]
    fn test_start_announces_and_spawns() {
        let mut game = game();
        game.start();
        let events = run(&mut game, 1_600.0);
        assert_eq!(
            events[0],
            GameEvent::CategorySwitched(CategorySwitch {
                from: "fruits".into(),
                to: "animals".into(),
                index: 0
            })
        );
        assert!(matches!(&events[1], GameEvent::Spawned { category, .. } if category == "animals"));
        assert_eq!(game.engine().static_bodies().len(), 1);
    }

    #[test]
    fn test_switch_keeps_animals_and_spawns_fruits() {
        let mut game = game();
        game.start();
        run(&mut game, 5_000.0);
        let animals: Vec<EntityHandle> = game.spawner().live().iter().map(|e| e.handle).collect();
        assert!(!animals.is_empty());

        let switch = game.force_switch();
        assert_eq!(switch.to, "fruits");
        assert_eq!(game.rotator().remaining_secs(), 60);
        let events = run(&mut game, 3_100.0);
        assert!(matches!(&events[0], GameEvent::CategorySwitched(s) if s.to == "fruits"));

        for e in game.spawner().live() {
            if animals.contains(&e.handle) {
                assert_eq!(e.category, "animals");
            } else {
                assert_eq!(e.category, "fruits");
            }
        }
        assert!(game.spawner().live().iter().any(|e| e.category == "fruits"));
    }

    #[test]
    fn test_entities_land_on_floor_and_grow() {
        let mut game = game();
        game.start();
        run(&mut game, 4_000.0);
        let floor_y = game.floor().floor_y(game.viewport());
        let h = game.spawner().live()[0].handle;
        let pos = game.engine().position(h).unwrap();
        assert!(pos.y < floor_y, "entity at {} should rest above {}", pos.y, floor_y);

        assert!(game.on_tap(h).accepted());
        let events = run(&mut game, 300.0);
        assert!(events.contains(&GameEvent::Grew { handle: h, level: 1 }));
    }

    #[test]
    fn test_every_spawn_is_removed_once() {
        let mut game = game();
        game.start();
        let events = run(&mut game, 30_000.0);
        game.stop();
        let events: Vec<GameEvent> = events.into_iter().chain(run(&mut game, 12_000.0)).collect();

        let spawned: Vec<EntityHandle> = events
            .iter()
            .filter_map(|e| match e {
                GameEvent::Spawned { handle, .. } => Some(*handle),
                _ => None,
            })
            .collect();
        assert!(!spawned.is_empty());
        for h in &spawned {
            let removed = events
                .iter()
                .filter(|e| **e == GameEvent::Removed { handle: *h })
                .count();
            assert_eq!(removed, 1, "{h:?}");
        }
        assert_eq!(game.spawner().live_count(), 0);
        assert_eq!(game.engine().sprite_count(), 0);
    }

    #[test]
    fn test_resize_moves_floor() {
        let mut game = game();
        game.start();
        assert!(!game.on_resize(390.0, 840.0));
        assert!(game.on_resize(844.0, 390.0));
        assert_eq!(
            game.engine().static_bodies(),
            vec![(Vec2::new(422.0, 370.0), Vec2::new(844.0, 40.0))]
        );
    }

    #[test]
    fn test_shutdown_removes_floor() {
        let mut game = game();
        game.start();
        run(&mut game, 2_000.0);
        game.shutdown();
        assert!(game.engine().static_bodies().is_empty());
        assert!(game.floor().body().is_none());
        assert!(!game.spawner().is_spawning());
        // Resizes after shutdown don't rebuild the floor
        assert!(game.on_resize(844.0, 390.0));
        assert!(game.engine().static_bodies().is_empty());
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_string(&GameEvent::Grew {
            handle: EntityHandle(3),
            level: 2,
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"grew","handle":3,"level":2}"#);
    }
}
