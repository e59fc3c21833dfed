use std::path::Path;

use anyhow::Context as _;

use crate::foundation::core::Millis;
use crate::foundation::error::{GrimError, GrimResult};

/// Measured narration track. Immutable once measured.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NarrationAsset {
    /// Opaque reference to the audio produced by speech synthesis.
    pub handle: String,
    pub duration: Millis,
}

/// One generated image, in story order.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ImageAsset {
    pub ordinal: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Background music bed.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MusicAsset {
    pub handle: String,
    pub duration: Millis,
}

/// Story text as it will be narrated (already translated when a translation ran).
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StoryText {
    pub id: String,
    pub text: String,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    "en".to_string()
}

/// Everything the planner needs for one story.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AssetBundle {
    pub story: StoryText,
    pub narration: NarrationAsset,
    pub images: Vec<ImageAsset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub music: Option<MusicAsset>,
}

impl AssetBundle {
    /// Build a bundle from collaborator outputs, numbering images in the order given.
    pub fn new(
        story: StoryText,
        narration: NarrationAsset,
        image_sources: impl IntoIterator<Item = String>,
        music: Option<MusicAsset>,
    ) -> Self {
        let images = image_sources
            .into_iter()
            .enumerate()
            .map(|(ordinal, source)| ImageAsset {
                ordinal,
                source: Some(source),
            })
            .collect();
        Self {
            story,
            narration,
            images,
            music,
        }
    }

    /// Read a bundle written with second-valued durations (see [`BundleFile`]).
    pub fn from_path(path: &Path) -> GrimResult<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read asset bundle '{}'", path.display()))?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> GrimResult<Self> {
        let file: BundleFile = serde_json::from_str(raw)
            .map_err(|e| GrimError::serde(format!("asset bundle json: {e}")))?;
        file.into_bundle()
    }

    /// Music that actually plays: a zero-length bed counts as no bed.
    pub fn effective_music(&self) -> Option<&MusicAsset> {
        self.music.as_ref().filter(|m| !m.duration.is_zero())
    }

    pub fn validate(&self) -> GrimResult<()> {
        if self.story.id.trim().is_empty() {
            return Err(GrimError::invalid_asset("story id must be non-empty"));
        }
        for (expected, image) in self.images.iter().enumerate() {
            if image.ordinal != expected {
                return Err(GrimError::invalid_asset(format!(
                    "image ordinals must be 0..{} in story order; position {expected} has ordinal {}",
                    self.images.len(),
                    image.ordinal
                )));
            }
        }
        Ok(())
    }
}

/// On-disk shape of an [`AssetBundle`]: human-facing durations in seconds.
#[derive(Clone, Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BundleFile {
    pub id: String,
    pub text: String,
    #[serde(default = "default_language")]
    pub language: String,
    pub narration: TrackFile,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub music: Option<TrackFile>,
}

#[derive(Clone, Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrackFile {
    pub handle: String,
    pub duration_s: f64,
}

impl BundleFile {
    pub fn into_bundle(self) -> GrimResult<AssetBundle> {
        let narration = NarrationAsset {
            handle: self.narration.handle,
            duration: Millis::from_secs_f64(self.narration.duration_s)?,
        };
        let music = match self.music {
            Some(track) => Some(MusicAsset {
                handle: track.handle,
                duration: Millis::from_secs_f64(track.duration_s)?,
            }),
            None => None,
        };
        let bundle = AssetBundle::new(
            StoryText {
                id: self.id,
                text: self.text,
                language: self.language,
            },
            narration,
            self.images,
            music,
        );
        bundle.validate()?;
        Ok(bundle)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/descriptors.rs"]
mod tests;
