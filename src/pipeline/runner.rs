use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;

use crate::{
    assets::descriptors::{AssetBundle, MusicAsset, NarrationAsset, StoryText},
    collab::provider::{ContentSource, ImageSynthesizer, SpeechSynthesizer, Translator},
    collab::retry::{CancelToken, RetryPolicy},
    compile::fingerprint::{PlanFingerprint, fingerprint_plan},
    compile::plan::assemble_plan,
    config::PlanConfig,
    encode::sink::{RenderAssets, RenderConsumer, discard_render_output},
    foundation::error::{GrimError, GrimResult},
    store::record::{Stage, StoryRecord, StoryStore},
};

/// External systems a pipeline talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub source: Arc<dyn ContentSource>,
    /// Only consulted when [`PipelineOpts::target_language`] is set.
    pub translator: Option<Arc<dyn Translator>>,
    pub speech: Arc<dyn SpeechSynthesizer>,
    pub images: Arc<dyn ImageSynthesizer>,
    pub renderer: Arc<dyn RenderConsumer>,
}

/// Worker pool, retry and output controls.
#[derive(Clone, Debug)]
pub struct PipelineOpts {
    /// Optional explicit worker thread count for [`StoryPipeline::run_batch`].
    pub threads: Option<usize>,
    /// Fetch, translation, narration and illustration calls.
    pub retry: RetryPolicy,
    /// Rendering. Encodes run for minutes, so this is kept apart from `retry`.
    pub render_retry: RetryPolicy,
    pub target_language: Option<String>,
    /// Rendered videos land here as `<story id>.mp4`.
    pub output_dir: PathBuf,
}

impl Default for PipelineOpts {
    fn default() -> Self {
        Self {
            threads: None,
            retry: RetryPolicy::default(),
            render_retry: RetryPolicy {
                max_attempts: 2,
                timeout: None,
                ..RetryPolicy::default()
            },
            target_language: None,
            output_dir: PathBuf::from("output"),
        }
    }
}

/// How one story run ended.
#[derive(Debug)]
pub enum StoryStatus {
    Rendered {
        video: PathBuf,
        fingerprint: PlanFingerprint,
    },
    /// A previous run already rendered the story; nothing was redone.
    AlreadyRendered { video: Option<PathBuf> },
    /// `stage` failed; the record keeps its last completed stage.
    Failed { stage: Stage, error: GrimError },
    /// Cancelled while attempting `stage`; nothing was written for it.
    Cancelled { stage: Stage },
    /// The fetched story has the same title as story `of`; nothing was written.
    Duplicate { of: String },
}

#[derive(Debug)]
pub struct StoryOutcome {
    pub id: String,
    pub status: StoryStatus,
}

impl StoryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self.status,
            StoryStatus::Rendered { .. } | StoryStatus::AlreadyRendered { .. }
        )
    }
}

/// Drives stories from source text to rendered video, resuming from stored progress.
pub struct StoryPipeline {
    collab: Collaborators,
    store: Arc<dyn StoryStore>,
    config: PlanConfig,
    music: Option<MusicAsset>,
    opts: PipelineOpts,
    cancel: CancelToken,
}

type StageResult<T> = Result<T, (Stage, GrimError)>;

/// Where [`StoryPipeline::advance`] stopped without an error.
enum Advanced {
    Rendered(PathBuf, PlanFingerprint),
    Duplicate(String),
}

impl StoryPipeline {
    pub fn new(
        collab: Collaborators,
        store: Arc<dyn StoryStore>,
        config: PlanConfig,
    ) -> GrimResult<Self> {
        config.validate()?;
        Ok(Self {
            collab,
            store,
            config,
            music: None,
            opts: PipelineOpts::default(),
            cancel: CancelToken::new(),
        })
    }

    pub fn with_music(mut self, music: Option<MusicAsset>) -> Self {
        self.music = music;
        self
    }

    pub fn with_opts(mut self, opts: PipelineOpts) -> GrimResult<Self> {
        opts.retry.validate()?;
        opts.render_retry.validate()?;
        self.opts = opts;
        Ok(self)
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Run several stories on a bounded worker pool. One story's failure never stops the
    /// others; outcomes come back in input order.
    pub fn run_batch(&self, ids: &[String]) -> GrimResult<Vec<StoryOutcome>> {
        let pool = build_thread_pool(self.opts.threads)?;
        let started = Instant::now();
        let outcomes: Vec<StoryOutcome> =
            pool.install(|| ids.par_iter().map(|id| self.run_story(id)).collect());
        let ok = outcomes.iter().filter(|o| o.is_success()).count();
        let duplicates = outcomes
            .iter()
            .filter(|o| matches!(o.status, StoryStatus::Duplicate { .. }))
            .count();
        tracing::info!(
            stories = ids.len(),
            succeeded = ok,
            duplicates,
            failed = ids.len() - ok - duplicates,
            duration_ms = started.elapsed().as_millis() as u64,
            "batch finished"
        );
        Ok(outcomes)
    }

    /// Advance one story as far as it goes, recording progress after every stage.
    #[tracing::instrument(skip(self), fields(story_id = %id))]
    pub fn run_story(&self, id: &str) -> StoryOutcome {
        let mut record = match self.store.load(id) {
            Ok(Some(r)) => r,
            Ok(None) => StoryRecord::new(id),
            Err(error) => {
                tracing::error!(error = %error, "story record unreadable");
                return StoryOutcome {
                    id: id.to_string(),
                    status: StoryStatus::Failed {
                        stage: Stage::Fetched,
                        error,
                    },
                };
            }
        };

        if record.has_completed(Stage::Rendered) {
            tracing::info!("already rendered, skipping");
            return StoryOutcome {
                id: id.to_string(),
                status: StoryStatus::AlreadyRendered {
                    video: record.video.clone(),
                },
            };
        }

        let status = match self.advance(&mut record) {
            Ok(Advanced::Rendered(video, fingerprint)) => {
                tracing::info!(%fingerprint, video = %video.display(), "story rendered");
                StoryStatus::Rendered { video, fingerprint }
            }
            Ok(Advanced::Duplicate(of)) => {
                tracing::info!(duplicate_of = %of, "story title already tracked, skipping");
                StoryStatus::Duplicate { of }
            }
            Err((stage, GrimError::Cancelled(reason))) => {
                tracing::warn!(%stage, %reason, "story cancelled");
                StoryStatus::Cancelled { stage }
            }
            Err((stage, error)) => {
                tracing::error!(%stage, error = %error, "story failed");
                record.fail(stage, error.to_string());
                if let Err(e) = self.store.save(&record) {
                    tracing::error!(error = %e, "could not record failure");
                }
                StoryStatus::Failed { stage, error }
            }
        };
        StoryOutcome {
            id: id.to_string(),
            status,
        }
    }

    fn advance(&self, record: &mut StoryRecord) -> StageResult<Advanced> {
        let retry = &self.opts.retry;

        if !record.has_completed(Stage::Fetched) {
            self.enter(Stage::Fetched)?;
            let source = &self.collab.source;
            let story = retry
                .run("fetch", &self.cancel, |_| source.fetch(&record.id))
                .map_err(|e| (Stage::Fetched, e))?;
            if let Some(of) = self
                .store
                .duplicate_title(&record.id, &story.title)
                .map_err(|e| (Stage::Fetched, e))?
            {
                return Ok(Advanced::Duplicate(of));
            }
            record.title = story.title;
            record.text = story.text;
            record.language = story.language;
            self.commit(record, Stage::Fetched)?;
        }

        if !record.has_completed(Stage::Translated) {
            self.enter(Stage::Translated)?;
            if let Some((translator, target)) = self.translation_for(record) {
                let translated = retry
                    .run("translate", &self.cancel, |_| {
                        translator.translate(&record.text, &target)
                    })
                    .map_err(|e| (Stage::Translated, e))?;
                record.translated_text = Some(translated);
            }
            self.commit(record, Stage::Translated)?;
        }

        let language = self.narration_language(record);

        if !record.has_completed(Stage::Narrated) || record.narration.is_none() {
            self.enter(Stage::Narrated)?;
            let speech = &self.collab.speech;
            let text = record.narration_text();
            let narration = retry
                .run("narrate", &self.cancel, |_| speech.synthesize(text, &language))
                .map_err(|e| (Stage::Narrated, e))?;
            record.narration = Some(narration);
            self.commit(record, Stage::Narrated)?;
        }
        let narration = record.narration.clone().ok_or_else(|| {
            (
                Stage::Narrated,
                GrimError::invalid_asset("narrated story has no narration"),
            )
        })?;

        let story = StoryText {
            id: record.id.clone(),
            text: record.narration_text().to_string(),
            language: language.clone(),
        };

        if !record.has_completed(Stage::Illustrated) {
            self.enter(Stage::Illustrated)?;
            let requested = self.config.requested_image_count(narration.duration);
            let images = &self.collab.images;
            let handles = retry
                .run("illustrate", &self.cancel, |_| {
                    images.synthesize_images(&story, requested)
                })
                .map_err(|e| (Stage::Illustrated, e))?;
            if handles.is_empty() {
                return Err((
                    Stage::Illustrated,
                    GrimError::invalid_asset("image collaborator returned no images"),
                ));
            }
            if handles.len() < requested {
                tracing::warn!(requested, got = handles.len(), "fewer images than requested");
            }
            record.images = handles;
            self.commit(record, Stage::Illustrated)?;
        }

        // Planning is pure and cheap, so it is redone on every run and never stored.
        self.enter(Stage::Rendered)?;
        let bundle = AssetBundle::new(
            story,
            NarrationAsset {
                handle: narration.handle.clone(),
                duration: narration.duration,
            },
            record.images.iter().cloned(),
            self.music.clone(),
        );
        let plan = self
            .config
            .params(&language)
            .and_then(|params| assemble_plan(&bundle, &params))
            .map_err(|e| (Stage::Rendered, e))?;
        let fingerprint = fingerprint_plan(&plan);
        tracing::debug!(%fingerprint, "plan ready");

        let assets = RenderAssets {
            narration: PathBuf::from(&narration.handle),
            images: record.images.iter().map(PathBuf::from).collect(),
            music: bundle.effective_music().map(|m| PathBuf::from(&m.handle)),
        };
        let out = self.opts.output_dir.join(format!("{}.mp4", record.id));
        let renderer = &self.collab.renderer;
        let rendered = self
            .opts
            .render_retry
            .run("render", &self.cancel, |stop| {
                renderer.render(&plan, &assets, &out, stop)
            });
        let video = match rendered {
            Ok(video) => video,
            Err(e) => {
                if matches!(e, GrimError::Timeout { .. } | GrimError::Cancelled(_)) {
                    discard_render_output(&out);
                }
                return Err((Stage::Rendered, e));
            }
        };

        record.video = Some(video.clone());
        self.commit(record, Stage::Rendered)?;
        Ok(Advanced::Rendered(video, fingerprint))
    }

    fn enter(&self, stage: Stage) -> StageResult<()> {
        self.cancel
            .checkpoint(stage.as_str())
            .map_err(|e| (stage, e))
    }

    fn commit(&self, record: &mut StoryRecord, stage: Stage) -> StageResult<()> {
        record.complete(stage);
        self.store.save(record).map_err(|e| (stage, e))?;
        tracing::debug!(%stage, "stage complete");
        Ok(())
    }

    fn translation_for(&self, record: &StoryRecord) -> Option<(Arc<dyn Translator>, String)> {
        let target = self.opts.target_language.as_deref()?.trim();
        if target.is_empty() || target.eq_ignore_ascii_case(record.language.trim()) {
            return None;
        }
        let translator = self.collab.translator.as_ref()?;
        Some((Arc::clone(translator), target.to_string()))
    }

    fn narration_language(&self, record: &StoryRecord) -> String {
        let lang = if record.translated_text.is_some() {
            self.opts.target_language.as_deref().unwrap_or(&record.language)
        } else {
            &record.language
        };
        let lang = lang.trim();
        if lang.is_empty() {
            "en".to_string()
        } else {
            lang.to_ascii_lowercase()
        }
    }
}

fn build_thread_pool(threads: Option<usize>) -> GrimResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(GrimError::config(
            "pipeline 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| GrimError::Other(anyhow::anyhow!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/runner.rs"]
mod tests;
