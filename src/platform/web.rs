//! Browser adapter
//!
//! The host page owns the 2D engine (scene, sprites, matter bodies, sound
//! manager). It hands us two bridge objects implementing the small API
//! below; `WebGame` wraps a `Game` over them and is driven from the host's
//! scene `update`.

use glam::Vec2;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

use crate::audio::UnlockFlag;
use crate::audio::web::WebAudioUnlock;
use crate::error::{AudioError, EngineError};
use crate::settings::Settings;
use crate::sim::{BodyHandle, Engine, EntityHandle, Game};
use crate::theme::CategoryData;
use crate::{AudioOut, GameEvent};

#[wasm_bindgen]
extern "C" {
    /// Host-side engine bridge
    pub type EngineBridge;

    #[wasm_bindgen(method, js_name = textureExists)]
    fn texture_exists(this: &EngineBridge, key: &str) -> bool;
    #[wasm_bindgen(method, js_name = ensureGlyphTexture)]
    fn ensure_glyph_texture(this: &EngineBridge, key: &str, glyph: &str);
    #[wasm_bindgen(method, catch, js_name = createSprite)]
    fn create_sprite(this: &EngineBridge, texture: &str, x: f32, y: f32) -> Result<u32, JsValue>;
    #[wasm_bindgen(method)]
    fn destroy(this: &EngineBridge, id: u32);
    #[wasm_bindgen(method, js_name = isActive)]
    fn is_active(this: &EngineBridge, id: u32) -> bool;
    /// `[w, h]`, or undefined for a dead sprite
    #[wasm_bindgen(method, js_name = frameSize)]
    fn frame_size(this: &EngineBridge, id: u32) -> Option<Vec<f32>>;
    #[wasm_bindgen(method)]
    fn scale(this: &EngineBridge, id: u32) -> Option<f32>;
    #[wasm_bindgen(method, js_name = setScale)]
    fn set_scale(this: &EngineBridge, id: u32, scale: f32);
    #[wasm_bindgen(method)]
    fn alpha(this: &EngineBridge, id: u32) -> Option<f32>;
    #[wasm_bindgen(method, js_name = setAlpha)]
    fn set_alpha(this: &EngineBridge, id: u32, alpha: f32);
    #[wasm_bindgen(method)]
    fn position(this: &EngineBridge, id: u32) -> Option<Vec<f32>>;
    #[wasm_bindgen(method, js_name = setPosition)]
    fn set_position(this: &EngineBridge, id: u32, x: f32, y: f32);
    #[wasm_bindgen(method)]
    fn velocity(this: &EngineBridge, id: u32) -> Option<Vec<f32>>;
    #[wasm_bindgen(method, js_name = setVelocity)]
    fn set_velocity(this: &EngineBridge, id: u32, x: f32, y: f32);
    #[wasm_bindgen(method, js_name = angularVelocity)]
    fn angular_velocity(this: &EngineBridge, id: u32) -> Option<f32>;
    #[wasm_bindgen(method, js_name = setAngularVelocity)]
    fn set_angular_velocity(this: &EngineBridge, id: u32, omega: f32);
    #[wasm_bindgen(method, catch, js_name = setBodyRect)]
    fn set_body_rect(this: &EngineBridge, id: u32, w: f32, h: f32) -> Result<(), JsValue>;
    #[wasm_bindgen(method, js_name = setStatic)]
    fn set_static(this: &EngineBridge, id: u32, is_static: bool);
    #[wasm_bindgen(method, js_name = setBounce)]
    fn set_bounce(this: &EngineBridge, id: u32, bounce: f32);
    #[wasm_bindgen(method, js_name = setFriction)]
    fn set_friction(this: &EngineBridge, id: u32, friction: f32);
    #[wasm_bindgen(method, js_name = setInteractive)]
    fn set_interactive(this: &EngineBridge, id: u32);
    #[wasm_bindgen(method, catch, js_name = addStaticRect)]
    fn add_static_rect(this: &EngineBridge, x: f32, y: f32, w: f32, h: f32) -> Result<u32, JsValue>;
    #[wasm_bindgen(method, js_name = removeBody)]
    fn remove_body(this: &EngineBridge, id: u32);

    /// Host-side sound manager bridge
    pub type AudioBridge;

    #[wasm_bindgen(method, js_name = hasSound)]
    fn has_sound(this: &AudioBridge, key: &str) -> bool;
    #[wasm_bindgen(method, catch)]
    fn play(this: &AudioBridge, key: &str, volume: f32, rate: f32) -> Result<(), JsValue>;
}

fn js_reason(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

fn vec2(parts: Option<Vec<f32>>) -> Option<Vec2> {
    match parts.as_deref() {
        Some([x, y, ..]) => Some(Vec2::new(*x, *y)),
        _ => None,
    }
}

impl Engine for EngineBridge {
    fn texture_exists(&self, key: &str) -> bool {
        EngineBridge::texture_exists(self, key)
    }

    fn ensure_glyph_texture(&mut self, key: &str, glyph: &str) {
        EngineBridge::ensure_glyph_texture(self, key, glyph)
    }

    fn create_sprite(&mut self, texture: &str, pos: Vec2) -> Result<EntityHandle, EngineError> {
        EngineBridge::create_sprite(self, texture, pos.x, pos.y)
            .map(EntityHandle)
            .map_err(|e| {
                log::debug!("createSprite: {}", js_reason(&e));
                EngineError::SpriteCreation(texture.to_string())
            })
    }

    fn destroy(&mut self, handle: EntityHandle) {
        EngineBridge::destroy(self, handle.0)
    }

    fn is_active(&self, handle: EntityHandle) -> bool {
        EngineBridge::is_active(self, handle.0)
    }

    fn frame_size(&self, handle: EntityHandle) -> Option<Vec2> {
        vec2(EngineBridge::frame_size(self, handle.0))
    }

    fn scale(&self, handle: EntityHandle) -> Option<f32> {
        EngineBridge::scale(self, handle.0)
    }

    fn set_scale(&mut self, handle: EntityHandle, scale: f32) {
        EngineBridge::set_scale(self, handle.0, scale)
    }

    fn alpha(&self, handle: EntityHandle) -> Option<f32> {
        EngineBridge::alpha(self, handle.0)
    }

    fn set_alpha(&mut self, handle: EntityHandle, alpha: f32) {
        EngineBridge::set_alpha(self, handle.0, alpha)
    }

    fn position(&self, handle: EntityHandle) -> Option<Vec2> {
        vec2(EngineBridge::position(self, handle.0))
    }

    fn set_position(&mut self, handle: EntityHandle, pos: Vec2) {
        EngineBridge::set_position(self, handle.0, pos.x, pos.y)
    }

    fn velocity(&self, handle: EntityHandle) -> Option<Vec2> {
        vec2(EngineBridge::velocity(self, handle.0))
    }

    fn set_velocity(&mut self, handle: EntityHandle, vel: Vec2) {
        EngineBridge::set_velocity(self, handle.0, vel.x, vel.y)
    }

    fn angular_velocity(&self, handle: EntityHandle) -> Option<f32> {
        EngineBridge::angular_velocity(self, handle.0)
    }

    fn set_angular_velocity(&mut self, handle: EntityHandle, omega: f32) {
        EngineBridge::set_angular_velocity(self, handle.0, omega)
    }

    fn set_body_rect(&mut self, handle: EntityHandle, size: Vec2) -> Result<(), EngineError> {
        EngineBridge::set_body_rect(self, handle.0, size.x, size.y).map_err(|e| {
            EngineError::BodyUpdate {
                handle,
                reason: js_reason(&e),
            }
        })
    }

    fn set_static(&mut self, handle: EntityHandle, is_static: bool) {
        EngineBridge::set_static(self, handle.0, is_static)
    }

    fn set_bounce(&mut self, handle: EntityHandle, bounce: f32) {
        EngineBridge::set_bounce(self, handle.0, bounce)
    }

    fn set_friction(&mut self, handle: EntityHandle, friction: f32) {
        EngineBridge::set_friction(self, handle.0, friction)
    }

    fn set_interactive(&mut self, handle: EntityHandle) {
        EngineBridge::set_interactive(self, handle.0)
    }

    fn add_static_rect(&mut self, center: Vec2, size: Vec2) -> Result<BodyHandle, EngineError> {
        EngineBridge::add_static_rect(self, center.x, center.y, size.x, size.y)
            .map(BodyHandle)
            .map_err(|e| EngineError::StaticBody(js_reason(&e)))
    }

    fn remove_body(&mut self, body: BodyHandle) {
        EngineBridge::remove_body(self, body.0)
    }
}

impl AudioOut for AudioBridge {
    fn has_sound(&self, key: &str) -> bool {
        AudioBridge::has_sound(self, key)
    }

    fn play(&mut self, key: &str, volume: f32, rate: f32) -> Result<(), AudioError> {
        AudioBridge::play(self, key, volume, rate).map_err(|e| AudioError::Playback {
            key: key.to_string(),
            reason: js_reason(&e),
        })
    }
}

/// Visible play-field size. iOS Safari reports the layout viewport in
/// `innerHeight`, so the visual viewport wins when available.
pub fn measure_viewport() -> Option<(f32, f32)> {
    let window = web_sys::window()?;
    if let Some(vv) = window.visual_viewport() {
        return Some((vv.width() as f32, vv.height() as f32));
    }
    let w = window.inner_width().ok()?.as_f64()?;
    let h = window.inner_height().ok()?.as_f64()?;
    Some((w as f32, h as f32))
}

/// Fetch a category descriptor. Resolves to undefined on any failure so the
/// caller can fall back via `setCategoryJson(category, undefined)`.
#[wasm_bindgen(js_name = fetchCategoryJson)]
pub async fn fetch_category_json(path: String) -> Option<String> {
    let window = web_sys::window()?;
    let response = match JsFuture::from(window.fetch_with_str(&path)).await {
        Ok(value) => value.dyn_into::<web_sys::Response>().ok()?,
        Err(e) => {
            log::warn!("Fetching {path} failed: {}", js_reason(&e));
            return None;
        }
    };
    if !response.ok() {
        log::warn!("Fetching {path} failed: HTTP {}", response.status());
        return None;
    }
    let text = JsFuture::from(response.text().ok()?).await.ok()?;
    text.as_string()
}

/// Exported game session
#[wasm_bindgen]
pub struct WebGame {
    game: Game<EngineBridge, AudioBridge>,
    unlock: WebAudioUnlock,
}

#[wasm_bindgen]
impl WebGame {
    /// `settings_json` may be empty; unknown or malformed settings fall back
    /// to defaults
    #[wasm_bindgen(constructor)]
    pub fn new(engine: EngineBridge, audio: AudioBridge, settings_json: &str) -> WebGame {
        let settings = if settings_json.trim().is_empty() {
            Settings::default()
        } else {
            Settings::from_json_or_default(settings_json)
        };
        let (width, height) = measure_viewport().unwrap_or((800.0, 600.0));
        let flag = UnlockFlag::new(false);
        let seed = js_sys::Date::now() as u64;
        log::info!("Session seed: {seed}");
        WebGame {
            game: Game::new(
                engine,
                audio,
                Box::new(flag.clone()),
                settings,
                width,
                height,
                seed,
            ),
            unlock: WebAudioUnlock::new(flag),
        }
    }

    /// Register a fetched descriptor; `json` undefined means the fetch failed
    #[wasm_bindgen(js_name = setCategoryJson)]
    pub fn set_category_json(&mut self, category: &str, json: Option<String>) {
        let data = CategoryData::load_or_fallback(category, json.as_deref());
        self.game.set_category_data(data);
    }

    /// Asset list for a category as JSON (`[{kind, key, path|glyph}]`)
    #[wasm_bindgen(js_name = assetManifest)]
    pub fn asset_manifest(json: &str) -> String {
        let Ok(data) = CategoryData::from_json(json) else {
            return "[]".to_string();
        };
        let entries: Vec<serde_json::Value> = data
            .manifest()
            .into_iter()
            .map(|req| match req {
                crate::theme::AssetRequest::Image { key, path } => {
                    serde_json::json!({ "kind": "image", "key": key, "path": path })
                }
                crate::theme::AssetRequest::Sound { key, path } => {
                    serde_json::json!({ "kind": "sound", "key": key, "path": path })
                }
                crate::theme::AssetRequest::Glyph { key, glyph } => {
                    serde_json::json!({ "kind": "glyph", "key": key, "glyph": glyph })
                }
            })
            .collect();
        serde_json::Value::Array(entries).to_string()
    }

    pub fn start(&mut self) {
        self.game.start();
        self.update_hud();
    }

    pub fn stop(&mut self) {
        self.game.stop();
    }

    /// Stop and remove the floor, e.g. before the scene is torn down
    pub fn shutdown(&mut self) {
        self.game.shutdown();
    }

    /// Per-frame update; returns this frame's events as JSON
    pub fn update(&mut self, dt_ms: f64) -> String {
        let events = self.game.update(dt_ms);
        if events
            .iter()
            .any(|e| matches!(e, GameEvent::CategorySwitched(_)))
        {
            log::info!("Now showing `{}`", self.game.current_category());
        }
        self.update_hud();
        serde_json::to_string(&events).unwrap_or_else(|e| {
            log::error!("Event serialization failed: {e}");
            "[]".to_string()
        })
    }

    /// Forwarded from the sprite's pointerdown handler. Returns true if the
    /// tap started a transition.
    pub fn tap(&mut self, id: u32) -> bool {
        self.game.on_tap(EntityHandle(id)).accepted()
    }

    /// Re-measure the viewport; returns true if the field changed
    pub fn resize(&mut self) -> bool {
        match measure_viewport() {
            Some((w, h)) => self.game.on_resize(w, h),
            None => false,
        }
    }

    /// Tapping the countdown switches immediately
    #[wasm_bindgen(js_name = forceSwitch)]
    pub fn force_switch(&mut self) -> String {
        let switch = self.game.force_switch();
        self.update_hud();
        serde_json::to_string(&switch).unwrap_or_default()
    }

    /// Call from the "tap to start" gesture handler
    #[wasm_bindgen(js_name = unlockAudio)]
    pub fn unlock_audio(&mut self) {
        self.unlock.unlock();
    }

    #[wasm_bindgen(js_name = setMuted)]
    pub fn set_muted(&mut self, muted: bool) {
        self.game.set_muted(muted);
    }

    #[wasm_bindgen(js_name = currentCategory)]
    pub fn current_category(&self) -> String {
        self.game.current_category().to_string()
    }

    pub fn question(&self) -> Option<String> {
        self.game.question().map(str::to_string)
    }

    /// Countdown text, warning highlight and question prompt
    fn update_hud(&self) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        let rotator = self.game.rotator();

        if let Some(el) = document.get_element_by_id("timer-text") {
            el.set_text_content(Some(&rotator.remaining_secs().to_string()));
        }
        if let Some(el) = document.get_element_by_id("category-timer") {
            let _ = el
                .class_list()
                .toggle_with_force("warning", rotator.in_warning());
        }
        if let Some(el) = document.get_element_by_id("question") {
            el.set_text_content(self.game.question());
        }
    }
}

/// Logging and panic hook; called once from the wasm entry point
pub fn install() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        web_sys::console::warn_1(&"logger already initialised".into());
    }
    log::info!("Tap Sprout starting...");
}
