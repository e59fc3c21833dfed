use std::{collections::BTreeMap, path::Path};

use anyhow::Context as _;

use crate::{
    audio::mix::MixRules,
    foundation::core::Millis,
    foundation::error::{GrimError, GrimResult},
    text::segment::SubtitleRules,
    timeline::allocate::PacingRules,
};

/// Per-language subtitle budget overrides.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LanguageOverrides {
    pub words_per_subtitle: Option<usize>,
    pub max_chars_per_line: Option<usize>,
}

/// Pacing configuration as users write it (seconds, per-language tables).
///
/// [`PlanConfig::params`] flattens it into the typed millisecond parameters the planners take.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlanConfig {
    pub min_image_duration_s: f64,
    pub max_image_duration_s: Option<f64>,
    pub transition_overlap_s: f64,
    pub words_per_subtitle: usize,
    pub max_chars_per_line: usize,
    pub fade_in_s: f64,
    pub fade_out_s: f64,
    pub music_gain: f32,
    pub target_image_duration_s: f64,
    pub min_images: usize,
    pub languages: BTreeMap<String, LanguageOverrides>,
}

impl Default for PlanConfig {
    fn default() -> Self {
        let narrow = |chars| LanguageOverrides {
            words_per_subtitle: None,
            max_chars_per_line: Some(chars),
        };
        let languages = BTreeMap::from([
            ("ja".to_string(), narrow(20)),
            ("ko".to_string(), narrow(24)),
            ("zh".to_string(), narrow(20)),
        ]);
        Self {
            min_image_duration_s: 3.0,
            max_image_duration_s: None,
            transition_overlap_s: 1.0,
            words_per_subtitle: 8,
            max_chars_per_line: 50,
            fade_in_s: 2.0,
            fade_out_s: 2.0,
            music_gain: 0.12,
            target_image_duration_s: 10.0,
            min_images: 3,
            languages,
        }
    }
}

/// Flattened parameters consumed by the planners.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlanParams {
    pub pacing: PacingRules,
    pub subtitles: SubtitleRules,
    pub mix: MixRules,
}

impl PlanConfig {
    pub fn from_path(path: &Path) -> GrimResult<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read plan config '{}'", path.display()))?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> GrimResult<Self> {
        let cfg: PlanConfig = serde_json::from_str(raw)
            .map_err(|e| GrimError::serde(format!("plan config json: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> GrimResult<()> {
        let secs = [
            ("min_image_duration_s", self.min_image_duration_s),
            ("transition_overlap_s", self.transition_overlap_s),
            ("fade_in_s", self.fade_in_s),
            ("fade_out_s", self.fade_out_s),
            ("target_image_duration_s", self.target_image_duration_s),
        ];
        for (name, v) in secs {
            if !v.is_finite() || v < 0.0 {
                return Err(GrimError::config(format!(
                    "{name} must be finite and >= 0, got {v}"
                )));
            }
        }
        if !self.music_gain.is_finite() || !(0.0..=1.0).contains(&self.music_gain) {
            return Err(GrimError::config(format!(
                "music_gain must be within [0, 1], got {}",
                self.music_gain
            )));
        }
        if self.words_per_subtitle == 0 {
            return Err(GrimError::config("words_per_subtitle must be >= 1"));
        }
        if self.max_chars_per_line == 0 {
            return Err(GrimError::config("max_chars_per_line must be >= 1"));
        }
        if self.target_image_duration_s <= 0.0 {
            return Err(GrimError::config("target_image_duration_s must be > 0"));
        }
        if self.min_image_duration_s > 0.0
            && self.transition_overlap_s >= self.min_image_duration_s
        {
            return Err(GrimError::config(format!(
                "transition_overlap_s ({}) must be shorter than min_image_duration_s ({})",
                self.transition_overlap_s, self.min_image_duration_s
            )));
        }
        if let Some(max) = self.max_image_duration_s {
            let lower = self.min_image_duration_s.max(self.transition_overlap_s);
            if !max.is_finite() || max <= lower {
                return Err(GrimError::config(format!(
                    "max_image_duration_s ({max}) must exceed {lower}"
                )));
            }
        }
        for (lang, o) in &self.languages {
            if o.words_per_subtitle == Some(0) || o.max_chars_per_line == Some(0) {
                return Err(GrimError::config(format!(
                    "language '{lang}' overrides must be >= 1 when set"
                )));
            }
        }
        Ok(())
    }

    /// Flatten into planner parameters for `language` (overrides applied when present).
    pub fn params(&self, language: &str) -> GrimResult<PlanParams> {
        self.validate()?;
        let overrides = self
            .languages
            .get(&language.trim().to_ascii_lowercase())
            .cloned()
            .unwrap_or_default();

        let to_ms = |name: &str, secs: f64| {
            Millis::from_secs_f64(secs).map_err(|e| GrimError::config(format!("{name}: {e}")))
        };

        let pacing = PacingRules {
            min_image_duration: to_ms("min_image_duration_s", self.min_image_duration_s)?,
            max_image_duration: match self.max_image_duration_s {
                Some(v) => Some(to_ms("max_image_duration_s", v)?),
                None => None,
            },
            transition_overlap: to_ms("transition_overlap_s", self.transition_overlap_s)?,
        };
        let subtitles = SubtitleRules {
            words_per_subtitle: overrides
                .words_per_subtitle
                .unwrap_or(self.words_per_subtitle),
            max_chars_per_line: overrides
                .max_chars_per_line
                .unwrap_or(self.max_chars_per_line),
        };
        let mix = MixRules {
            fade_in: to_ms("fade_in_s", self.fade_in_s)?,
            fade_out: to_ms("fade_out_s", self.fade_out_s)?,
            music_gain: self.music_gain,
        };
        Ok(PlanParams {
            pacing,
            subtitles,
            mix,
        })
    }

    /// How many images to ask the image collaborator for, given the narration length.
    pub fn requested_image_count(&self, narration: Millis) -> usize {
        let per_image = self.target_image_duration_s.max(f64::EPSILON);
        let by_length = (narration.as_secs_f64() / per_image).floor() as usize;
        by_length.max(self.min_images).max(1)
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
