//! grimreel turns a narrated story into a timeline-exact render plan and, from there, a video.
//!
//! The planning core is pure and deterministic:
//!
//! - [`allocate_segments`] spreads image display time across the narration
//! - [`segment_subtitles`] splits story text into timed cues
//! - [`plan_music`] derives the music bed's gain envelope and loop/trim instruction
//! - [`assemble_plan`] merges them into a validated [`RenderPlan`]
//!
//! Around it sit the collaborator interfaces (speech, translation, images, content), a
//! [`RenderConsumer`] backed by `ffmpeg`, the story database and the batch [`StoryPipeline`].
#![forbid(unsafe_code)]

mod assets;
mod audio;
mod compile;
mod config;
mod foundation;
mod text;
mod timeline;

pub(crate) mod collab;
/// Render consumers.
pub mod encode;
pub mod logging;
pub(crate) mod pipeline;
pub(crate) mod store;

pub use crate::foundation::core::{Millis, TimeSpan};
pub use crate::foundation::error::{GrimError, GrimResult};

pub use crate::assets::descriptors::{
    AssetBundle, BundleFile, ImageAsset, MusicAsset, NarrationAsset, StoryText, TrackFile,
};
pub use crate::audio::mix::{GainEnvelope, GainPoint, MixRules, MusicBed, MusicPlan, plan_music};
pub use crate::compile::fingerprint::{PlanFingerprint, fingerprint_plan};
pub use crate::compile::plan::{NarrationRef, RenderPlan, assemble_from_parts, assemble_plan};
pub use crate::config::{LanguageOverrides, PlanConfig, PlanParams};
pub use crate::text::normalize::normalize_text;
pub use crate::text::segment::{CUE_DELIMITER, SubtitleCue, SubtitleRules, segment_subtitles};
pub use crate::timeline::allocate::{ImageSegment, PacingRules, allocate_segments};

pub use crate::collab::chain::FallbackChain;
pub use crate::collab::provider::{
    ContentSource, ImageSynthesizer, Narration, SourceStory, SpeechSynthesizer, Translator,
};
pub use crate::collab::retry::{CancelToken, RetryPolicy};
pub use crate::encode::ffmpeg::{FfmpegRenderOpts, FfmpegRenderer, build_ffmpeg_args};
pub use crate::encode::sink::{
    InMemoryConsumer, RenderAssets, RenderConsumer, discard_render_output,
};
pub use crate::encode::srt::{write_srt, write_srt_file};
pub use crate::pipeline::runner::{
    Collaborators, PipelineOpts, StoryOutcome, StoryPipeline, StoryStatus,
};
pub use crate::store::json::JsonStoryStore;
pub use crate::store::memory::MemoryStoryStore;
pub use crate::store::query::{StoreStats, export_records, search_records};
pub use crate::store::record::{Stage, StageFailure, StoryRecord, StoryStore};
