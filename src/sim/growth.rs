//! Growth ledger - per-entity growth state machine
//!
//! Each tracked entity climbs an exponential scale ladder, one level per tap.
//! At the top of the ladder the configured policy either resets it or pops it.
//!
//! Phases: `Idle -> Growing -> Idle`, `Idle -> Resetting -> Idle` and
//! `Idle -> Removing` (terminal). A request while not `Idle` is rejected, never
//! queued, so an entity has at most one transition in flight. The level is
//! committed when the request is accepted; the scale ramp and the body resize
//! finish when the tween completes.

use std::collections::HashMap;

use super::engine::{Engine, EntityHandle, resize_body};
use super::tween::{Ease, TweenSpec, Tweens};
use crate::consts::{REMOVE_ALPHA, RESET_ALPHA};
use crate::settings::{AtMaxPolicy, GrowthConfig};

/// Where an entity is in its growth cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthPhase {
    Idle,
    Growing,
    Resetting,
    /// Being animated out; accepts nothing further
    Removing,
}

/// Growth bookkeeping for one entity
#[derive(Debug, Clone, PartialEq)]
pub struct GrowthState {
    pub level: u32,
    pub max_level: u32,
    /// Scale at level 0
    pub base_scale: f32,
    pub phase: GrowthPhase,
}

impl GrowthState {
    pub fn is_growing(&self) -> bool {
        self.phase == GrowthPhase::Growing
    }

    pub fn is_resetting(&self) -> bool {
        self.phase == GrowthPhase::Resetting
    }

    pub fn is_idle(&self) -> bool {
        self.phase == GrowthPhase::Idle
    }
}

/// Result of a grow request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GrowOutcome {
    /// Busy, removing, unknown or destroyed - nothing changed
    Rejected,
    /// Level committed, scale ramping toward `target_scale`
    Growing { level: u32, target_scale: f32 },
    /// At max level: shrinking back to the reset scale
    Resetting,
    /// At max level: popping out
    Removing,
}

impl GrowOutcome {
    pub fn accepted(&self) -> bool {
        !matches!(self, GrowOutcome::Rejected)
    }
}

/// Completed transitions, reported by `advance`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GrowthNotice {
    Grew { handle: EntityHandle, level: u32 },
    Reset { handle: EntityHandle },
    /// The entity was destroyed; owners should drop it from their bookkeeping
    Removed { handle: EntityHandle },
}

/// Tween tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Grow,
    Reset,
    Remove,
}

/// Owns every entity's growth state and runs its transitions
#[derive(Debug, Clone)]
pub struct GrowthLedger {
    config: GrowthConfig,
    states: HashMap<EntityHandle, GrowthState>,
    tweens: Tweens<Step>,
}

impl GrowthLedger {
    pub fn new(config: GrowthConfig) -> Self {
        Self {
            config,
            states: HashMap::new(),
            tweens: Tweens::new(),
        }
    }

    pub fn config(&self) -> &GrowthConfig {
        &self.config
    }

    /// Start tracking a freshly spawned entity at level 0
    pub fn track(&mut self, handle: EntityHandle, base_scale: f32) -> &GrowthState {
        self.states.entry(handle).or_insert(GrowthState {
            level: 0,
            max_level: self.config.max_level,
            base_scale: base_scale.max(f32::EPSILON),
            phase: GrowthPhase::Idle,
        })
    }

    pub fn state(&self, handle: EntityHandle) -> Option<&GrowthState> {
        self.states.get(&handle)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Current level (0 for untracked entities)
    pub fn level(&self, handle: EntityHandle) -> u32 {
        self.states.get(&handle).map(|s| s.level).unwrap_or(0)
    }

    /// True if a grow request would be accepted right now
    pub fn can_grow<E: Engine + ?Sized>(&self, engine: &E, handle: EntityHandle) -> bool {
        self.states.get(&handle).is_some_and(GrowthState::is_idle) && engine.is_active(handle)
    }

    /// Tap-sound pitch multiplier for the entity's current level
    pub fn pitch_multiplier(&self, handle: EntityHandle) -> f32 {
        1.0 + self.level(handle) as f32 * self.config.sound_pitch_step
    }

    /// Ladder scale at `level`
    pub fn scale_for_level(&self, base_scale: f32, level: u32) -> f32 {
        self.config.scale_at(base_scale, level)
    }

    /// Ask the entity to grow one level
    pub fn request_grow<E: Engine + ?Sized>(
        &mut self,
        engine: &mut E,
        handle: EntityHandle,
    ) -> GrowOutcome {
        if !self.can_grow(&*engine, handle) {
            return GrowOutcome::Rejected;
        }
        let Some(state) = self.states.get_mut(&handle) else {
            return GrowOutcome::Rejected;
        };

        if state.level >= state.max_level {
            return match self.config.at_max {
                AtMaxPolicy::Reset => {
                    state.phase = GrowthPhase::Resetting;
                    let spec = TweenSpec {
                        scale: state.base_scale * self.config.reset_scale,
                        alpha: Some(RESET_ALPHA),
                        duration_ms: self.config.reset_duration_ms,
                        ease: Ease::CubicIn,
                    };
                    self.tweens.start(&*engine, handle, spec, Step::Reset);
                    GrowOutcome::Resetting
                }
                AtMaxPolicy::Remove => {
                    state.phase = GrowthPhase::Removing;
                    engine.set_static(handle, true);
                    let spec = TweenSpec {
                        scale: 0.0,
                        alpha: Some(REMOVE_ALPHA),
                        duration_ms: self.config.reset_duration_ms,
                        ease: Ease::CubicOut,
                    };
                    self.tweens.start(&*engine, handle, spec, Step::Remove);
                    GrowOutcome::Removing
                }
            };
        }

        state.level += 1;
        state.phase = GrowthPhase::Growing;
        let level = state.level;
        let target_scale = self.config.scale_at(state.base_scale, level);
        let spec = TweenSpec {
            scale: target_scale,
            alpha: None,
            duration_ms: self.config.growth_duration_ms,
            ease: Ease::BackOut,
        };
        self.tweens.start(&*engine, handle, spec, Step::Grow);
        GrowOutcome::Growing {
            level,
            target_scale,
        }
    }

    /// Another path is removing the entity: stop any transition and refuse
    /// further requests
    pub fn mark_removing(&mut self, handle: EntityHandle) {
        self.tweens.cancel(handle);
        if let Some(state) = self.states.get_mut(&handle) {
            state.phase = GrowthPhase::Removing;
        }
    }

    /// Drop the entity's state
    pub fn forget(&mut self, handle: EntityHandle) {
        self.tweens.cancel(handle);
        self.states.remove(&handle);
    }

    /// Step running transitions and commit the ones that finished
    pub fn advance<E: Engine + ?Sized>(&mut self, engine: &mut E, dt_ms: f64) -> Vec<GrowthNotice> {
        let mut notices = Vec::new();
        for (handle, step) in self.tweens.advance(engine, dt_ms) {
            if !engine.is_active(handle) {
                // Destroyed mid-transition by another path
                self.states.remove(&handle);
                continue;
            }
            let Some(state) = self.states.get_mut(&handle) else {
                continue;
            };

            match step {
                Step::Grow if state.phase == GrowthPhase::Growing => {
                    state.phase = GrowthPhase::Idle;
                    let scale = self.config.scale_at(state.base_scale, state.level);
                    resize_body(engine, handle, scale);
                    log::debug!("Entity {:?} grown to level {}", handle, state.level);
                    notices.push(GrowthNotice::Grew {
                        handle,
                        level: state.level,
                    });
                }
                Step::Reset if state.phase == GrowthPhase::Resetting => {
                    engine.set_alpha(handle, 1.0);
                    state.level = 0;
                    state.phase = GrowthPhase::Idle;
                    let scale = state.base_scale * self.config.reset_scale;
                    resize_body(engine, handle, scale);
                    notices.push(GrowthNotice::Reset { handle });
                }
                Step::Remove => {
                    self.states.remove(&handle);
                    engine.destroy(handle);
                    notices.push(GrowthNotice::Removed { handle });
                }
                // Phase changed underneath the tween (e.g. marked removing)
                _ => {}
            }
        }
        notices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::headless::HeadlessEngine;
    use glam::Vec2;
    use proptest::prelude::*;

    const FRAME: f64 = 16.0;

    fn setup(max_level: u32, policy: AtMaxPolicy) -> (HeadlessEngine, GrowthLedger, EntityHandle) {
        let mut engine = HeadlessEngine::new(400.0, 800.0);
        engine.add_texture("cat-01", Vec2::new(200.0, 160.0));
        let h = engine.create_sprite("cat-01", Vec2::new(100.0, 300.0)).unwrap();
        engine.set_scale(h, 0.5);
        engine.set_body_rect(h, Vec2::new(100.0, 80.0)).unwrap();

        let config = GrowthConfig {
            max_level,
            at_max: policy,
            ..GrowthConfig::default()
        };
        let mut ledger = GrowthLedger::new(config);
        ledger.track(h, 0.5);
        (engine, ledger, h)
    }

    /// Advance until no transition is in flight
    fn settle(engine: &mut HeadlessEngine, ledger: &mut GrowthLedger) -> Vec<GrowthNotice> {
        let mut notices = Vec::new();
        for _ in 0..100 {
            notices.extend(ledger.advance(engine, FRAME));
            if ledger.tweens.is_empty() {
                break;
            }
        }
        notices
    }

    #[test]
    fn test_seven_taps_follow_ladder() {
        let (mut engine, mut ledger, h) = setup(7, AtMaxPolicy::Reset);
        let mut previous = 0.5_f32;
        for level in 1..=7 {
            let outcome = ledger.request_grow(&mut engine, h);
            let GrowOutcome::Growing { level: l, target_scale } = outcome else {
                panic!("tap {level} was not accepted: {outcome:?}");
            };
            assert_eq!(l, level);
            assert_eq!(target_scale, ledger.scale_for_level(0.5, level));
            settle(&mut engine, &mut ledger);
            let scale = engine.scale(h).unwrap();
            assert!((scale - target_scale).abs() < 1e-6);
            assert!((scale - previous * 1.12).abs() < 1e-5);
            previous = scale;
        }
        assert!((engine.scale(h).unwrap() - 0.5 * 1.12_f32.powi(7)).abs() < 1e-5);
        assert!((engine.scale(h).unwrap() - 1.105).abs() < 1e-3);
        assert_eq!(ledger.level(h), 7);
    }

    #[test]
    fn test_eighth_tap_resets() {
        let (mut engine, mut ledger, h) = setup(7, AtMaxPolicy::Reset);
        for _ in 0..7 {
            ledger.request_grow(&mut engine, h);
            settle(&mut engine, &mut ledger);
        }
        assert_eq!(ledger.request_grow(&mut engine, h), GrowOutcome::Resetting);
        assert!(ledger.state(h).unwrap().is_resetting());
        let notices = settle(&mut engine, &mut ledger);
        assert_eq!(notices, vec![GrowthNotice::Reset { handle: h }]);
        assert_eq!(ledger.level(h), 0);
        assert!((engine.scale(h).unwrap() - 0.45).abs() < 1e-6);
        assert_eq!(engine.alpha(h), Some(1.0));
        assert!(ledger.can_grow(&engine, h));
    }

    #[test]
    fn test_eighth_tap_removes() {
        let (mut engine, mut ledger, h) = setup(7, AtMaxPolicy::Remove);
        for _ in 0..7 {
            ledger.request_grow(&mut engine, h);
            settle(&mut engine, &mut ledger);
        }
        assert_eq!(ledger.request_grow(&mut engine, h), GrowOutcome::Removing);
        assert!(engine.sprite(h).unwrap().is_static);
        assert_eq!(ledger.request_grow(&mut engine, h), GrowOutcome::Rejected);

        let notices = settle(&mut engine, &mut ledger);
        assert_eq!(notices, vec![GrowthNotice::Removed { handle: h }]);
        assert!(!engine.is_active(h));
        assert_eq!(engine.destroyed, 1);
        assert!(ledger.state(h).is_none());
    }

    #[test]
    fn test_busy_request_rejected() {
        let (mut engine, mut ledger, h) = setup(10, AtMaxPolicy::Reset);
        assert!(ledger.request_grow(&mut engine, h).accepted());
        assert!(ledger.state(h).unwrap().is_growing());
        assert_eq!(ledger.request_grow(&mut engine, h), GrowOutcome::Rejected);
        assert_eq!(ledger.level(h), 1);
    }

    #[test]
    fn test_resize_keeps_motion() {
        let (mut engine, mut ledger, h) = setup(10, AtMaxPolicy::Reset);
        ledger.request_grow(&mut engine, h);
        ledger.advance(&mut engine, 100.0);
        engine.set_velocity(h, Vec2::new(1.5, -2.0));
        engine.set_angular_velocity(h, 0.004);
        ledger.advance(&mut engine, 100.0);

        let sprite = engine.sprite(h).unwrap();
        assert_eq!(sprite.vel, Vec2::new(1.5, -2.0));
        assert_eq!(sprite.angular_vel, 0.004);
        assert_eq!(sprite.pos, Vec2::new(100.0, 300.0));
        let body = sprite.body.unwrap();
        assert!((body.x - 200.0 * 0.56).abs() < 1e-4);
    }

    #[test]
    fn test_body_failure_is_best_effort() {
        let (mut engine, mut ledger, h) = setup(10, AtMaxPolicy::Reset);
        engine.fail_body_updates = true;
        ledger.request_grow(&mut engine, h);
        let notices = settle(&mut engine, &mut ledger);
        assert_eq!(notices, vec![GrowthNotice::Grew { handle: h, level: 1 }]);
        assert!(engine.is_active(h));
        assert!(ledger.can_grow(&engine, h));
        assert_eq!(engine.sprite(h).unwrap().body, Some(Vec2::new(100.0, 80.0)));
    }

    #[test]
    fn test_destroyed_mid_transition_is_noop() {
        let (mut engine, mut ledger, h) = setup(10, AtMaxPolicy::Reset);
        ledger.request_grow(&mut engine, h);
        engine.destroy(h);
        assert!(settle(&mut engine, &mut ledger).is_empty());
        assert!(ledger.state(h).is_none());
        assert_eq!(ledger.request_grow(&mut engine, h), GrowOutcome::Rejected);
    }

    #[test]
    fn test_mark_removing_cancels_growth() {
        let (mut engine, mut ledger, h) = setup(10, AtMaxPolicy::Reset);
        ledger.request_grow(&mut engine, h);
        ledger.mark_removing(h);
        assert!(settle(&mut engine, &mut ledger).is_empty());
        assert_eq!(ledger.request_grow(&mut engine, h), GrowOutcome::Rejected);
    }

    #[test]
    fn test_pitch_multiplier() {
        let (mut engine, mut ledger, h) = setup(10, AtMaxPolicy::Reset);
        assert_eq!(ledger.pitch_multiplier(h), 1.0);
        for _ in 0..3 {
            ledger.request_grow(&mut engine, h);
            settle(&mut engine, &mut ledger);
        }
        assert!((ledger.pitch_multiplier(h) - 1.24).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn prop_level_bounded_and_phases_exclusive(
            max_level in 1u32..12,
            steps in prop::collection::vec(0u32..250, 1..80),
        ) {
            let (mut engine, mut ledger, h) = setup(max_level, AtMaxPolicy::Reset);
            for dt in steps {
                let before = ledger.level(h);
                let busy = !ledger.state(h).unwrap().is_idle();
                let outcome = ledger.request_grow(&mut engine, h);
                if busy {
                    prop_assert_eq!(outcome, GrowOutcome::Rejected);
                    prop_assert_eq!(ledger.level(h), before);
                }
                ledger.advance(&mut engine, f64::from(dt));

                let state = ledger.state(h).unwrap();
                prop_assert!(state.level <= state.max_level);
                prop_assert!(!(state.is_growing() && state.is_resetting()));
            }
        }
    }
}
