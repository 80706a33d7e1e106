//! Category (theme) descriptors
//!
//! A descriptor lists the entity keys of one theme together with the sound
//! cue and base scale of each entity. Descriptors are loaded once and never
//! mutated; the spawner only swaps which one it reads.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ThemeError;
use crate::viewport::ResponsiveBands;

const DEFAULT_IMAGE_PATH: &str = "illust/";
const DEFAULT_IMAGE_EXT: &str = ".png";
const DEFAULT_SOUND_PATH: &str = "voice/";
const DEFAULT_SOUND_EXT: &str = ".wav";

/// One spawnable entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySpec {
    /// Sound cue played on tap
    #[serde(rename = "audioMap")]
    pub sound: String,
    #[serde(rename = "baseScale", default = "default_base_scale")]
    pub base_scale: f32,
}

fn default_base_scale() -> f32 {
    1.0
}

/// Directory overrides for asset loading
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetPaths {
    pub images: Option<String>,
    pub sounds: Option<String>,
}

/// A single asset the host loader should fetch or generate
#[derive(Debug, Clone, PartialEq)]
pub enum AssetRequest {
    Image { key: String, path: String },
    Sound { key: String, path: String },
    /// Texture rendered on the fly from a glyph
    Glyph { key: String, glyph: String },
}

/// Static descriptor of one theme
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryData {
    pub category: String,
    pub display_name: String,
    /// Prompt shown while this category is active
    #[serde(default)]
    pub question: Option<String>,
    /// Entity key -> spec. Ordered so seeded spawns are reproducible.
    pub entities: BTreeMap<String, EntitySpec>,
    #[serde(default)]
    pub sounds: Vec<String>,
    /// Entity key -> glyph, for themes drawn from text glyphs instead of images
    #[serde(default)]
    pub emoji_mapping: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub asset_paths: AssetPaths,
    #[serde(default)]
    pub file_extensions: AssetPaths,
    #[serde(default)]
    pub scale_bands: Option<ResponsiveBands>,
}

impl CategoryData {
    /// Parse a descriptor. A descriptor without entities is rejected.
    pub fn from_json(json: &str) -> Result<Self, ThemeError> {
        let data: CategoryData = serde_json::from_str(json)?;
        if data.entities.is_empty() {
            return Err(ThemeError::Empty(data.category));
        }
        Ok(data)
    }

    /// Parse a descriptor if one was fetched, otherwise (or on any error)
    /// use the built-in fallback for `category`
    pub fn load_or_fallback(category: &str, json: Option<&str>) -> Self {
        let Some(json) = json else {
            log::warn!("No data for category `{category}` - using fallback");
            return Self::fallback(category);
        };
        match Self::from_json(json) {
            Ok(data) => {
                log::info!(
                    "Loaded category `{}` ({} entities)",
                    data.category,
                    data.entities.len()
                );
                data
            }
            Err(e) => {
                log::error!("{e} - using fallback for `{category}`");
                Self::fallback(category)
            }
        }
    }

    /// Small built-in descriptor so the game stays playable without data
    pub fn fallback(category: &str) -> Self {
        let (display_name, entries, glyphs): (&str, &[(&str, &str)], Option<&[(&str, &str)]>) =
            match category {
                "fruits" => (
                    "くだもの",
                    &[("apple", "apple"), ("banana", "banana"), ("grape", "grape")],
                    Some(&[("apple", "🍎"), ("banana", "🍌"), ("grape", "🍇")]),
                ),
                _ => (
                    "どうぶつ",
                    &[("cat-01", "cat"), ("dog-01", "dog"), ("elephant-01", "elephant")],
                    None,
                ),
            };

        let entities = entries
            .iter()
            .map(|(key, sound)| {
                (
                    key.to_string(),
                    EntitySpec {
                        sound: sound.to_string(),
                        base_scale: 1.0,
                    },
                )
            })
            .collect();
        let sounds = entries.iter().map(|(_, s)| s.to_string()).collect();
        let emoji_mapping = glyphs.map(|g| {
            g.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        });

        Self {
            category: category.to_string(),
            display_name: display_name.to_string(),
            question: None,
            entities,
            sounds,
            emoji_mapping,
            asset_paths: AssetPaths::default(),
            file_extensions: AssetPaths::default(),
            scale_bands: None,
        }
    }

    pub fn entity_keys(&self) -> Vec<&str> {
        self.entities.keys().map(String::as_str).collect()
    }

    pub fn base_scale(&self, key: &str) -> f32 {
        self.entities.get(key).map(|e| e.base_scale).unwrap_or(1.0)
    }

    /// Responsive bands: explicit override, or the default for this kind of theme
    pub fn bands(&self) -> ResponsiveBands {
        match self.scale_bands {
            Some(bands) => bands,
            None if self.emoji_mapping.is_some() || self.category == "fruits" => {
                ResponsiveBands::FRUITS
            }
            None => ResponsiveBands::ANIMALS,
        }
    }

    /// Entity key -> sound cue pairs
    pub fn audio_map(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entities
            .iter()
            .map(|(k, e)| (k.as_str(), e.sound.as_str()))
    }

    /// Glyph textures to generate (empty for image themes)
    pub fn glyphs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.emoji_mapping
            .iter()
            .flat_map(|m| m.iter().map(|(k, g)| (k.as_str(), g.as_str())))
    }

    /// Everything the host needs to load for this theme
    pub fn manifest(&self) -> Vec<AssetRequest> {
        let image_path = self.asset_paths.images.as_deref().unwrap_or(DEFAULT_IMAGE_PATH);
        let image_ext = self
            .file_extensions
            .images
            .as_deref()
            .unwrap_or(DEFAULT_IMAGE_EXT);
        let sound_path = self.asset_paths.sounds.as_deref().unwrap_or(DEFAULT_SOUND_PATH);
        let sound_ext = self
            .file_extensions
            .sounds
            .as_deref()
            .unwrap_or(DEFAULT_SOUND_EXT);

        let glyph_keys = self.emoji_mapping.as_ref();
        let mut requests = Vec::new();
        for key in self.entities.keys() {
            match glyph_keys.and_then(|m| m.get(key)) {
                Some(glyph) => requests.push(AssetRequest::Glyph {
                    key: key.clone(),
                    glyph: glyph.clone(),
                }),
                None => requests.push(AssetRequest::Image {
                    key: key.clone(),
                    path: format!("{image_path}{key}{image_ext}"),
                }),
            }
        }
        for sound in &self.sounds {
            requests.push(AssetRequest::Sound {
                key: sound.clone(),
                path: format!("{sound_path}{sound}{sound_ext}"),
            });
        }
        requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FARM: &str = r#"{
        "category": "animals",
        "displayName": "どうぶつ",
        "question": "このどうぶつはなに？",
        "entities": {
            "cow-01": { "audioMap": "cow", "baseScale": 0.8 },
            "pig-01": { "audioMap": "pig" }
        },
        "sounds": ["cow", "pig"],
        "assetPaths": { "images": "art/" },
        "fileExtensions": { "sounds": ".mp3" }
    }"#;

    #[test]
    fn test_parse_descriptor() {
        let data = CategoryData::from_json(FARM).unwrap();
        assert_eq!(data.entity_keys(), vec!["cow-01", "pig-01"]);
        assert_eq!(data.base_scale("cow-01"), 0.8);
        assert_eq!(data.base_scale("pig-01"), 1.0);
        assert_eq!(data.base_scale("unknown"), 1.0);
        assert_eq!(data.bands(), ResponsiveBands::ANIMALS);
        assert_eq!(data.question.as_deref(), Some("このどうぶつはなに？"));
    }

    #[test]
    fn test_manifest_paths() {
        let data = CategoryData::from_json(FARM).unwrap();
        let manifest = data.manifest();
        assert!(manifest.contains(&AssetRequest::Image {
            key: "cow-01".into(),
            path: "art/cow-01.png".into()
        }));
        assert!(manifest.contains(&AssetRequest::Sound {
            key: "pig".into(),
            path: "voice/pig.mp3".into()
        }));
    }

    #[test]
    fn test_empty_entities_rejected() {
        let json = r#"{ "category": "void", "displayName": "-", "entities": {} }"#;
        assert!(matches!(
            CategoryData::from_json(json),
            Err(ThemeError::Empty(_))
        ));
    }

    #[test]
    fn test_malformed_falls_back() {
        let data = CategoryData::load_or_fallback("animals", Some("{ not json"));
        assert_eq!(data.entity_keys(), vec!["cat-01", "dog-01", "elephant-01"]);
        let data = CategoryData::load_or_fallback("fruits", None);
        assert_eq!(data.entities.len(), 3);
        assert_eq!(data.bands(), ResponsiveBands::FRUITS);
        assert_eq!(data.glyphs().count(), 3);
        assert!(
            data.manifest()
                .iter()
                .any(|r| matches!(r, AssetRequest::Glyph { key, .. } if key == "apple"))
        );
    }
}
