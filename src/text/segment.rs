use crate::{
    foundation::core::{Millis, TimeSpan},
    foundation::error::{GrimError, GrimResult},
    foundation::math::proportional_ends,
    text::normalize::normalize_text,
};

/// Delimiter that rejoins cue texts into the normalized story text.
pub const CUE_DELIMITER: &str = " ";

/// Word and character budgets for one cue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubtitleRules {
    pub words_per_subtitle: usize,
    /// Counted in `char`s, so CJK budgets behave the same as Latin ones.
    pub max_chars_per_line: usize,
}

impl Default for SubtitleRules {
    fn default() -> Self {
        Self {
            words_per_subtitle: 8,
            max_chars_per_line: 50,
        }
    }
}

/// One timed subtitle line.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SubtitleCue {
    pub index: usize,
    pub start: Millis,
    pub end: Millis,
    pub text: String,
}

impl SubtitleCue {
    pub fn span(&self) -> TimeSpan {
        TimeSpan {
            start: self.start,
            end: self.end,
        }
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Split `text` into timed cues spanning exactly `[0, total]`.
///
/// Words are grouped greedily: a cue closes when it holds `words_per_subtitle` words or when the
/// next word would push it past `max_chars_per_line`. A single word longer than the budget
/// becomes its own cue. Each cue gets time proportional to its word count; boundaries come from
/// the cumulative word count so the last cue ends exactly at `total`.
///
/// Text without words yields no cues.
#[tracing::instrument(skip(text), fields(chars = text.len()))]
pub fn segment_subtitles(
    text: &str,
    total: Millis,
    rules: &SubtitleRules,
) -> GrimResult<Vec<SubtitleCue>> {
    if rules.words_per_subtitle == 0 || rules.max_chars_per_line == 0 {
        return Err(GrimError::config(
            "subtitle word and character budgets must be >= 1",
        ));
    }

    let normalized = normalize_text(text);
    let groups = group_words(&normalized, rules);
    if groups.is_empty() {
        return Ok(Vec::new());
    }

    let weights: Vec<u64> = groups.iter().map(|g| g.len() as u64).collect();
    let ends = proportional_ends(total.0, &weights);

    let mut cues = Vec::with_capacity(groups.len());
    let mut start = Millis::ZERO;
    for (index, (words, end)) in groups.iter().zip(ends).enumerate() {
        let end = Millis(end);
        if end <= start {
            return Err(GrimError::invalid_asset(format!(
                "narration of {total} is too short to give {} subtitle cues a visible duration (cue {index} would be empty)",
                groups.len()
            )));
        }
        cues.push(SubtitleCue {
            index,
            start,
            end,
            text: words.join(CUE_DELIMITER),
        });
        start = end;
    }

    tracing::debug!(cues = cues.len(), words = weights.iter().sum::<u64>(), "segmented subtitles");
    Ok(cues)
}

pub(crate) fn group_words<'a>(normalized: &'a str, rules: &SubtitleRules) -> Vec<Vec<&'a str>> {
    let mut groups = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_chars = 0usize;

    for word in normalized.split_whitespace() {
        let word_chars = word.chars().count();
        if !current.is_empty() {
            let full = current.len() >= rules.words_per_subtitle;
            let too_wide = current_chars + 1 + word_chars > rules.max_chars_per_line;
            if full || too_wide {
                groups.push(std::mem::take(&mut current));
                current_chars = 0;
            }
        }
        current_chars = if current.is_empty() {
            word_chars
        } else {
            current_chars + 1 + word_chars
        };
        current.push(word);
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}

#[cfg(test)]
#[path = "../../tests/unit/text/segment.rs"]
mod tests;
