//! Tap Sprout entry point
//!
//! On the web the host page drives `WebGame`; this only installs logging.
//! Natively it plays a short headless session against the in-memory engine
//! and logs what happens, which is handy for tuning settings.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    tap_sprout::platform::web::install();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use glam::Vec2;
    use tap_sprout::sim::{HeadlessAudio, HeadlessEngine};
    use tap_sprout::{AtMaxPolicy, CategoryData, Game, GameEvent, Settings, UnlockFlag};

    env_logger::init();
    log::info!("Tap Sprout (native, headless) starting...");

    // Usage: tap-sprout [seconds] [reset|remove] [settings.json]
    let mut args = std::env::args().skip(1);
    let seconds: f64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(90.0);
    let policy = args.next().and_then(|p| {
        let parsed = AtMaxPolicy::from_str(&p);
        if parsed.is_none() {
            log::warn!("Unknown max-level policy `{p}`");
        }
        parsed
    });
    let mut settings = match args.next().map(std::fs::read_to_string) {
        Some(Ok(json)) => Settings::from_json_or_default(&json),
        Some(Err(e)) => {
            log::warn!("Could not read settings: {e} - using defaults");
            Settings::default()
        }
        None => Settings::default(),
    };
    if let Some(policy) = policy {
        settings = settings.with_policy(policy);
    }
    log::info!("Max-level policy: {}", settings.growth.at_max.as_str());

    let (width, height) = (390.0, 844.0);
    let mut engine = HeadlessEngine::new(width, height);
    engine.gravity = settings.physics.gravity_y;
    let themes: Vec<CategoryData> = settings
        .rotator
        .categories
        .iter()
        .map(|c| CategoryData::load_or_fallback(c, None))
        .collect();
    let mut sounds = Vec::new();
    for theme in &themes {
        for key in theme.entity_keys() {
            engine.add_texture(key, Vec2::new(300.0, 260.0));
        }
        sounds.extend(theme.sounds.iter().cloned());
    }

    let audio = HeadlessAudio::with_sounds(sounds.iter().map(String::as_str));
    let mut game = Game::new(
        engine,
        audio,
        Box::new(UnlockFlag::new(true)),
        settings,
        width,
        height,
        0x5EED,
    );
    for theme in themes {
        game.set_category_data(theme);
    }
    game.start();

    let dt = 1000.0 / 60.0;
    let frames = (seconds * 1000.0 / dt) as u64;
    let (mut spawned, mut grown, mut resets, mut removed) = (0u32, 0u32, 0u32, 0u32);
    for frame in 0..frames {
        game.engine_mut().step(dt);
        for event in game.update(dt) {
            match event {
                GameEvent::Spawned { .. } => spawned += 1,
                GameEvent::Grew { handle, level } => {
                    grown += 1;
                    log::debug!("{handle:?} reached level {level}");
                }
                GameEvent::Reset { .. } => resets += 1,
                GameEvent::Removed { .. } => removed += 1,
                GameEvent::CategorySwitched(s) => {
                    log::info!("Category: {} -> {}", s.from, s.to)
                }
            }
        }
        // A restless toddler: tap the oldest entity every quarter second
        if frame % 15 == 0 {
            let oldest = game.spawner().live().first().map(|e| e.handle);
            if let Some(handle) = oldest {
                game.on_tap(handle);
            }
        }
    }
    game.shutdown();

    log::info!(
        "Session over: {spawned} spawned, {grown} growth steps, {resets} resets, \
         {removed} removed, {} live",
        game.spawner().live_count()
    );
}
