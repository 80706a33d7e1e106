//! Themed sound cues
//!
//! Each entity key maps to a sound cue; taps replay the cue with a playback
//! rate derived from the entity's growth level. Playback is best effort:
//! locked audio, missing cues and player errors all just skip the sound.

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::AudioError;
use crate::settings::AudioSettings;

/// Raw playback, implemented by the host's audio system
pub trait AudioOut {
    /// Whether the cue finished loading
    fn has_sound(&self, key: &str) -> bool;
    /// Play a loaded cue once
    fn play(&mut self, key: &str, volume: f32, rate: f32) -> Result<(), AudioError>;
}

/// Browser autoplay gate: audio may only start after a user gesture
pub trait AudioUnlock {
    fn is_unlocked(&self) -> bool;
}

/// Shared unlock flag, flipped by whoever owns the "tap to start" gesture
#[derive(Debug, Clone, Default)]
pub struct UnlockFlag(Rc<Cell<bool>>);

impl UnlockFlag {
    pub fn new(unlocked: bool) -> Self {
        Self(Rc::new(Cell::new(unlocked)))
    }

    pub fn unlock(&self) {
        self.0.set(true);
    }
}

impl AudioUnlock for UnlockFlag {
    fn is_unlocked(&self) -> bool {
        self.0.get()
    }
}

/// Maps entity keys to cues and plays them pitched
pub struct SoundCue<A: AudioOut> {
    out: A,
    unlock: Box<dyn AudioUnlock>,
    audio_map: HashMap<String, String>,
    settings: AudioSettings,
}

impl<A: AudioOut> SoundCue<A> {
    pub fn new(out: A, unlock: Box<dyn AudioUnlock>, settings: AudioSettings) -> Self {
        Self {
            out,
            unlock,
            audio_map: HashMap::new(),
            settings,
        }
    }

    /// Merge entity -> cue mappings (later registrations win)
    pub fn add_mappings<'a>(&mut self, pairs: impl IntoIterator<Item = (&'a str, &'a str)>) {
        for (entity, cue) in pairs {
            self.audio_map.insert(entity.to_string(), cue.to_string());
        }
    }

    pub fn cue_for(&self, entity_key: &str) -> Option<&str> {
        self.audio_map.get(entity_key).map(String::as_str)
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.settings.muted = muted;
    }

    /// Clamp a pitch multiplier into the player's supported rate band
    pub fn playback_rate(&self, pitch: f32) -> f32 {
        pitch.clamp(self.settings.min_rate, self.settings.max_rate)
    }

    /// Play the entity's cue at the given pitch multiplier. Returns true if
    /// the player accepted the cue.
    pub fn play_with_pitch(&mut self, entity_key: &str, pitch: f32) -> bool {
        if self.settings.muted || self.settings.volume <= 0.0 {
            return false;
        }
        if !self.unlock.is_unlocked() {
            log::debug!("Audio still locked - skipping cue for {entity_key}");
            return false;
        }
        let Some(cue) = self.audio_map.get(entity_key) else {
            log::warn!("No audio mapping found for: {entity_key}");
            return false;
        };
        if !self.out.has_sound(cue) {
            log::warn!("{}", AudioError::Missing(cue.clone()));
            return false;
        }

        let rate = self.playback_rate(pitch);
        match self.out.play(cue, self.settings.volume, rate) {
            Ok(()) => {
                log::debug!("Playing {cue} for {entity_key} at rate {rate:.2}");
                true
            }
            Err(e) => {
                log::error!("{e}");
                false
            }
        }
    }

    pub fn output(&self) -> &A {
        &self.out
    }

    pub fn output_mut(&mut self) -> &mut A {
        &mut self.out
    }
}

/// Web Audio unlock gate (wasm only)
///
/// Browsers keep an `AudioContext` suspended until a user gesture; the first
/// tap resumes it and plays an inaudible blip so later cues are allowed.
#[cfg(target_arch = "wasm32")]
pub mod web {
    use web_sys::AudioContext;

    use super::UnlockFlag;

    pub struct WebAudioUnlock {
        ctx: Option<AudioContext>,
        flag: UnlockFlag,
    }

    impl WebAudioUnlock {
        pub fn new(flag: UnlockFlag) -> Self {
            Self { ctx: None, flag }
        }

        /// Call from inside a user-gesture handler
        pub fn unlock(&mut self) {
            if self.ctx.is_none() {
                self.ctx = AudioContext::new().ok();
                if self.ctx.is_none() {
                    log::warn!("Failed to create AudioContext - audio disabled");
                    return;
                }
            }
            let Some(ctx) = &self.ctx else { return };

            if ctx.state() == web_sys::AudioContextState::Suspended {
                let _ = ctx.resume();
            }

            let blip = || -> Option<()> {
                let osc = ctx.create_oscillator().ok()?;
                let gain = ctx.create_gain().ok()?;
                gain.gain().set_value(0.0001);
                osc.connect_with_audio_node(&gain).ok()?;
                gain.connect_with_audio_node(&ctx.destination()).ok()?;
                osc.start().ok()?;
                osc.stop_with_when(ctx.current_time() + 0.1).ok()?;
                Some(())
            };
            if blip().is_none() {
                log::warn!("Audio unlock blip failed");
            }

            self.flag.unlock();
            log::info!("Audio unlocked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingOut {
        loaded: Vec<&'static str>,
        played: Vec<(String, f32, f32)>,
        fail: bool,
    }

    impl AudioOut for RecordingOut {
        fn has_sound(&self, key: &str) -> bool {
            self.loaded.contains(&key)
        }

        fn play(&mut self, key: &str, volume: f32, rate: f32) -> Result<(), AudioError> {
            if self.fail {
                return Err(AudioError::Playback {
                    key: key.to_string(),
                    reason: "device lost".to_string(),
                });
            }
            self.played.push((key.to_string(), volume, rate));
            Ok(())
        }
    }

    fn cue(unlocked: bool) -> SoundCue<RecordingOut> {
        let out = RecordingOut {
            loaded: vec!["cat"],
            ..Default::default()
        };
        let mut cue = SoundCue::new(
            out,
            Box::new(UnlockFlag::new(unlocked)),
            AudioSettings::default(),
        );
        cue.add_mappings([("cat-01", "cat"), ("dog-01", "dog")]);
        cue
    }

    #[test]
    fn test_plays_with_clamped_rate() {
        let mut cue = cue(true);
        assert!(cue.play_with_pitch("cat-01", 1.16));
        assert!(cue.play_with_pitch("cat-01", 5.0));
        let played = &cue.output().played;
        assert_eq!(played.len(), 2);
        assert_eq!(played[0].0, "cat");
        assert!((played[0].1 - 0.7).abs() < 1e-6);
        assert!((played[0].2 - 1.16).abs() < 1e-6);
        assert_eq!(played[1].2, 2.0);
    }

    #[test]
    fn test_missing_and_locked_skip() {
        let mut unlocked = cue(true);
        // Mapped but the file never loaded
        assert!(!unlocked.play_with_pitch("dog-01", 1.0));
        // Not mapped at all
        assert!(!unlocked.play_with_pitch("owl-01", 1.0));

        let mut locked = cue(false);
        assert!(!locked.play_with_pitch("cat-01", 1.0));
        assert!(locked.output().played.is_empty());
    }

    #[test]
    fn test_unlock_flag_is_shared() {
        let flag = UnlockFlag::new(false);
        let mut cue = SoundCue::new(
            RecordingOut {
                loaded: vec!["cat"],
                ..Default::default()
            },
            Box::new(flag.clone()),
            AudioSettings::default(),
        );
        cue.add_mappings([("cat-01", "cat")]);
        assert!(!cue.play_with_pitch("cat-01", 1.0));
        flag.unlock();
        assert!(cue.play_with_pitch("cat-01", 1.0));
    }

    #[test]
    fn test_player_error_and_mute() {
        let mut cue = cue(true);
        cue.output_mut().fail = true;
        assert!(!cue.play_with_pitch("cat-01", 1.0));

        let mut cue = self::cue(true);
        cue.set_muted(true);
        assert!(!cue.play_with_pitch("cat-01", 1.0));
    }
}
