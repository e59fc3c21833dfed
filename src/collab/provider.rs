use crate::assets::descriptors::StoryText;
use crate::foundation::core::Millis;
use crate::foundation::error::GrimResult;

/// Raw story as supplied by the content source.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SourceStory {
    pub id: String,
    pub title: String,
    pub text: String,
    pub language: String,
}

/// A synthesized narration track.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Narration {
    pub handle: String,
    pub duration: Millis,
}

pub trait ContentSource: Send + Sync {
    fn name(&self) -> &str;
    fn fetch(&self, id: &str) -> GrimResult<SourceStory>;
}

/// Capability: `synthesize(text) -> (duration, handle)` or a provider error.
pub trait SpeechSynthesizer: Send + Sync {
    fn name(&self) -> &str;
    fn synthesize(&self, text: &str, language: &str) -> GrimResult<Narration>;
}

pub trait Translator: Send + Sync {
    fn name(&self) -> &str;
    fn translate(&self, text: &str, target_language: &str) -> GrimResult<String>;
}

/// Produces up to `requested` image handles in story order; fewer is not an error.
pub trait ImageSynthesizer: Send + Sync {
    fn name(&self) -> &str;
    fn synthesize_images(&self, story: &StoryText, requested: usize) -> GrimResult<Vec<String>>;
}
