//! Spawn/growth/removal lifecycle
//!
//! Everything here is engine-agnostic: the host engine is reached only through
//! the `Engine` trait, time only advances through `update(dt)`, and randomness
//! comes from a seeded RNG. The same session runs in the browser and against
//! the in-memory `HeadlessEngine`.

pub mod engine;
pub mod floor;
pub mod growth;
pub mod headless;
pub mod rotator;
pub mod spawner;
pub mod timer;
pub mod tween;
pub mod world;

pub use engine::{BodyHandle, Engine, EntityHandle, resize_body};
pub use floor::PhysicsFloorAdapter;
pub use growth::{GrowOutcome, GrowthLedger, GrowthNotice, GrowthPhase, GrowthState};
pub use headless::{HeadlessAudio, HeadlessEngine};
pub use rotator::{CategoryRotator, CategorySwitch};
pub use spawner::{EntitySpawner, LiveEntity};
pub use timer::{TimerId, Timers};
pub use tween::{Ease, TweenSpec, Tweens};
pub use world::{Game, GameEvent};
