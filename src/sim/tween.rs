//! Scale/alpha tweens
//!
//! Tweens interpolate a sprite's scale and (optionally) alpha over a fixed
//! duration and report a tag exactly once when they finish. Values are
//! written through the engine every frame; the final frame writes the exact
//! targets.

use super::engine::{Engine, EntityHandle};

/// Easing curves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ease {
    Linear,
    /// Overshoots the target slightly, then settles
    BackOut,
    CubicIn,
    CubicOut,
}

impl Ease {
    /// Map progress `t` in [0, 1] onto the curve
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Ease::Linear => t,
            Ease::BackOut => {
                const S: f32 = 1.70158;
                let u = t - 1.0;
                u * u * ((S + 1.0) * u + S) + 1.0
            }
            Ease::CubicIn => t * t * t,
            Ease::CubicOut => {
                let u = 1.0 - t;
                1.0 - u * u * u
            }
        }
    }
}

/// Target values and timing for one tween
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TweenSpec {
    pub scale: f32,
    pub alpha: Option<f32>,
    pub duration_ms: u32,
    pub ease: Ease,
}

#[derive(Debug, Clone)]
struct Tween<K> {
    handle: EntityHandle,
    tag: K,
    from_scale: f32,
    from_alpha: f32,
    spec: TweenSpec,
    elapsed: f64,
}

/// Running tweens, at most one per entity
#[derive(Debug, Clone)]
pub struct Tweens<K> {
    active: Vec<Tween<K>>,
}

impl<K> Default for Tweens<K> {
    fn default() -> Self {
        Self { active: Vec::new() }
    }
}

impl<K> Tweens<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a tween from the sprite's current values. Any tween already
    /// running on the same sprite is dropped without reporting.
    pub fn start<E: Engine + ?Sized>(
        &mut self,
        engine: &E,
        handle: EntityHandle,
        spec: TweenSpec,
        tag: K,
    ) {
        self.cancel(handle);
        self.active.push(Tween {
            handle,
            tag,
            from_scale: engine.scale(handle).unwrap_or(spec.scale),
            from_alpha: engine.alpha(handle).unwrap_or(1.0),
            spec,
            elapsed: 0.0,
        });
    }

    /// Drop the tween on `handle` without reporting it
    pub fn cancel(&mut self, handle: EntityHandle) -> bool {
        let before = self.active.len();
        self.active.retain(|t| t.handle != handle);
        self.active.len() != before
    }

    pub fn is_running(&self, handle: EntityHandle) -> bool {
        self.active.iter().any(|t| t.handle == handle)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Step all tweens. Returns `(handle, tag)` for each tween that finished
    /// this step. Tweens on destroyed sprites finish immediately without
    /// touching the engine.
    pub fn advance<E: Engine + ?Sized>(
        &mut self,
        engine: &mut E,
        dt_ms: f64,
    ) -> Vec<(EntityHandle, K)> {
        let mut finished = Vec::new();
        let mut i = 0;
        while i < self.active.len() {
            let tween = &mut self.active[i];
            if !engine.is_active(tween.handle) {
                let tween = self.active.swap_remove(i);
                finished.push((tween.handle, tween.tag));
                continue;
            }

            tween.elapsed += dt_ms.max(0.0);
            let duration = f64::from(tween.spec.duration_ms.max(1));
            let t = (tween.elapsed / duration).min(1.0) as f32;
            let done = t >= 1.0;

            let (scale, alpha) = if done {
                (tween.spec.scale, tween.spec.alpha)
            } else {
                let k = tween.spec.ease.apply(t);
                (
                    tween.from_scale + (tween.spec.scale - tween.from_scale) * k,
                    tween
                        .spec
                        .alpha
                        .map(|a| tween.from_alpha + (a - tween.from_alpha) * k),
                )
            };
            engine.set_scale(tween.handle, scale.max(0.0));
            if let Some(alpha) = alpha {
                engine.set_alpha(tween.handle, alpha.clamp(0.0, 1.0));
            }

            if done {
                let tween = self.active.swap_remove(i);
                finished.push((tween.handle, tween.tag));
            } else {
                i += 1;
            }
        }
        finished
    }
}
