use crate::{
    assets::descriptors::AssetBundle,
    audio::mix::{GainEnvelope, MusicBed, MusicPlan, plan_music},
    config::PlanParams,
    foundation::core::Millis,
    foundation::error::{GrimError, GrimResult},
    text::segment::{SubtitleCue, segment_subtitles},
    timeline::allocate::{ImageSegment, allocate_segments},
};

/// Which narration track a plan is fitted to.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NarrationRef {
    pub story_id: String,
    pub handle: String,
}

/// Validated, timestamp-exact plan for one story video.
///
/// A plan consists of:
/// - image segments covering `[0, total_duration]` with shared crossfades
/// - ordered, non-overlapping subtitle cues
/// - the music gain envelope and its loop/trim instruction
///
/// Images and subtitles are fitted to the narration, so `total_duration` always equals the
/// narration duration. Plans are only handed out after [`RenderPlan::validate`] succeeded, and a
/// consumer must not make further timing decisions.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RenderPlan {
    pub narration_ref: NarrationRef,
    pub total_duration: Millis,
    pub image_segments: Vec<ImageSegment>,
    pub subtitle_cues: Vec<SubtitleCue>,
    pub gain_envelope: GainEnvelope,
    pub music: MusicBed,
}

impl RenderPlan {
    /// Check every plan invariant; the error names the first one that fails.
    pub fn validate(&self) -> GrimResult<()> {
        let total = self.total_duration;
        if total.is_zero() {
            return Err(GrimError::timeline(
                "zero-length",
                format!(
                    "plan for story '{}' has zero total duration",
                    self.narration_ref.story_id
                ),
            ));
        }
        validate_segments(&self.image_segments, total)?;
        validate_cues(&self.subtitle_cues, total)?;
        validate_envelope(&self.gain_envelope, total)?;

        let played = self.music.playback_len();
        if !matches!(self.music, MusicBed::Silent) && played != total {
            return Err(GrimError::timeline(
                "music-length",
                format!("music bed plays for {played} but narration lasts {total}"),
            ));
        }
        Ok(())
    }

    /// Pretty JSON, stable field order.
    pub fn to_json(&self) -> GrimResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| GrimError::serde(format!("render plan json: {e}")))
    }

    pub fn from_json_str(raw: &str) -> GrimResult<Self> {
        let plan: RenderPlan = serde_json::from_str(raw)
            .map_err(|e| GrimError::serde(format!("render plan json: {e}")))?;
        plan.validate()?;
        Ok(plan)
    }
}

/// Plan one story: allocate images, segment subtitles, plan the music bed, then validate.
///
/// Pure: identical bundles and parameters give identical plans.
#[tracing::instrument(skip_all, fields(story_id = %bundle.story.id, duration_ms = bundle.narration.duration.0))]
pub fn assemble_plan(bundle: &AssetBundle, params: &PlanParams) -> GrimResult<RenderPlan> {
    bundle.validate()?;
    let total = bundle.narration.duration;
    if total.is_zero() {
        return Err(GrimError::invalid_asset(format!(
            "narration for story '{}' has zero duration",
            bundle.story.id
        )));
    }

    let image_segments = allocate_segments(total, bundle.images.len(), &params.pacing)?;
    let subtitle_cues = segment_subtitles(&bundle.story.text, total, &params.subtitles)?;
    let music = plan_music(total, bundle.effective_music(), &params.mix)?;

    let narration_ref = NarrationRef {
        story_id: bundle.story.id.clone(),
        handle: bundle.narration.handle.clone(),
    };
    let plan = assemble_from_parts(narration_ref, total, image_segments, subtitle_cues, music)?;
    tracing::debug!(
        segments = plan.image_segments.len(),
        cues = plan.subtitle_cues.len(),
        "plan assembled"
    );
    Ok(plan)
}

/// Merge planner outputs into a [`RenderPlan`], rejecting any inconsistency.
pub fn assemble_from_parts(
    narration_ref: NarrationRef,
    total_duration: Millis,
    image_segments: Vec<ImageSegment>,
    subtitle_cues: Vec<SubtitleCue>,
    music: MusicPlan,
) -> GrimResult<RenderPlan> {
    let plan = RenderPlan {
        narration_ref,
        total_duration,
        image_segments,
        subtitle_cues,
        gain_envelope: music.envelope,
        music: music.bed,
    };
    plan.validate()?;
    Ok(plan)
}

fn validate_segments(segments: &[ImageSegment], total: Millis) -> GrimResult<()> {
    let (Some(first), Some(last)) = (segments.first(), segments.last()) else {
        return Err(GrimError::timeline(
            "image-coverage",
            format!("no image segments for [0, {total}]"),
        ));
    };
    if first.start != Millis::ZERO {
        return Err(GrimError::timeline(
            "image-coverage",
            format!("gap [0, {}] before the first segment", first.start),
        ));
    }
    if last.end < total {
        return Err(GrimError::timeline(
            "image-coverage",
            format!(
                "segments end at {} but narration lasts {total}: gap [{}, {total}]",
                last.end, last.end
            ),
        ));
    }
    if first.transition_in != Millis::ZERO || last.transition_out != Millis::ZERO {
        return Err(GrimError::timeline(
            "image-contiguity",
            "first segment cannot fade in and last segment cannot fade out",
        ));
    }

    for (i, seg) in segments.iter().enumerate() {
        if seg.index != i {
            return Err(GrimError::timeline(
                "image-contiguity",
                format!("segment at position {i} has index {}", seg.index),
            ));
        }
        if seg.start >= seg.end {
            return Err(GrimError::timeline(
                "zero-length",
                format!("segment {i} spans [{}, {}]", seg.start, seg.end),
            ));
        }
        if seg.end > total {
            return Err(GrimError::timeline(
                "image-bounds",
                format!("segment {i} ends at {} past {total}", seg.end),
            ));
        }
        if seg.transition_in >= seg.len() || seg.transition_out >= seg.len() {
            return Err(GrimError::timeline(
                "image-contiguity",
                format!("segment {i} of length {} cannot hold its crossfades", seg.len()),
            ));
        }
    }

    for (i, pair) in segments.windows(2).enumerate() {
        let (prev, next) = (&pair[0], &pair[1]);
        if prev.transition_out != next.transition_in {
            return Err(GrimError::timeline(
                "image-contiguity",
                format!(
                    "segments {i}/{} disagree on crossfade: out {} vs in {}",
                    i + 1,
                    prev.transition_out,
                    next.transition_in
                ),
            ));
        }
        let expected = prev.end - prev.transition_out;
        if next.start != expected {
            let detail = if next.start > expected {
                format!(
                    "gap [{expected}, {}] between segments {i} and {}",
                    next.start,
                    i + 1
                )
            } else {
                format!(
                    "segment {} starts at {} inside segment {i} beyond its crossfade (expected {expected})",
                    i + 1,
                    next.start
                )
            };
            return Err(GrimError::timeline("image-contiguity", detail));
        }
    }
    Ok(())
}

fn validate_cues(cues: &[SubtitleCue], total: Millis) -> GrimResult<()> {
    for (i, cue) in cues.iter().enumerate() {
        if cue.index != i {
            return Err(GrimError::timeline(
                "cue-order",
                format!("cue at position {i} has index {}", cue.index),
            ));
        }
        if cue.start >= cue.end {
            return Err(GrimError::timeline(
                "cue-order",
                format!("cue {i} spans [{}, {}]", cue.start, cue.end),
            ));
        }
        if cue.end > total {
            return Err(GrimError::timeline(
                "cue-bounds",
                format!("cue {i} ends at {} past {total}", cue.end),
            ));
        }
    }
    for (i, pair) in cues.windows(2).enumerate() {
        if pair[0].end > pair[1].start {
            return Err(GrimError::timeline(
                "cue-order",
                format!(
                    "cue {i} ends at {} after cue {} starts at {}",
                    pair[0].end,
                    i + 1,
                    pair[1].start
                ),
            ));
        }
    }
    Ok(())
}

fn validate_envelope(envelope: &GainEnvelope, total: Millis) -> GrimResult<()> {
    if envelope.points.is_empty() {
        return Err(GrimError::timeline(
            "envelope-bounds",
            "gain envelope has no control points",
        ));
    }
    for (i, p) in envelope.points.iter().enumerate() {
        if !p.gain.is_finite() || !(0.0..=1.0).contains(&p.gain) {
            return Err(GrimError::timeline(
                "envelope-bounds",
                format!("point {i} has gain {} outside [0, 1]", p.gain),
            ));
        }
        if p.time > total {
            return Err(GrimError::timeline(
                "envelope-bounds",
                format!("point {i} at {} lies past {total}", p.time),
            ));
        }
    }
    for (i, pair) in envelope.points.windows(2).enumerate() {
        if pair[1].time < pair[0].time {
            return Err(GrimError::timeline(
                "envelope-order",
                format!(
                    "point {} at {} precedes point {i} at {}",
                    i + 1,
                    pair[1].time,
                    pair[0].time
                ),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/compile/plan.rs"]
mod tests;
