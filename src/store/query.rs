use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::foundation::error::{GrimError, GrimResult};
use crate::store::record::{Stage, StoryRecord};

/// Counts over a story database.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub total: usize,
    /// Stories keyed by their last completed stage.
    pub by_stage: BTreeMap<Stage, usize>,
    /// Stories with no completed stage yet.
    pub not_started: usize,
    /// Stories whose most recent run failed.
    pub failed: usize,
    pub total_words: usize,
    pub earliest_update: Option<DateTime<Utc>>,
    pub latest_update: Option<DateTime<Utc>>,
}

impl StoreStats {
    pub fn from_records(records: &[StoryRecord]) -> Self {
        let mut stats = Self {
            total: records.len(),
            ..Self::default()
        };
        for r in records {
            match r.completed {
                Some(stage) => *stats.by_stage.entry(stage).or_default() += 1,
                None => stats.not_started += 1,
            }
            if r.failure.is_some() {
                stats.failed += 1;
            }
            stats.total_words += r.text.split_whitespace().count();
            stats.earliest_update = Some(
                stats
                    .earliest_update
                    .map_or(r.updated_at, |t| t.min(r.updated_at)),
            );
            stats.latest_update = Some(
                stats
                    .latest_update
                    .map_or(r.updated_at, |t| t.max(r.updated_at)),
            );
        }
        stats
    }

    pub fn at_stage(&self, stage: Stage) -> usize {
        self.by_stage.get(&stage).copied().unwrap_or(0)
    }

    pub fn average_words(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.total_words as f64 / self.total as f64
        }
    }
}

/// Comparison key for titles: lowercase, whitespace collapsed.
pub(crate) fn title_key(title: &str) -> String {
    title
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Records whose id, title or text contains `term`, ignoring case.
pub fn search_records<'a>(records: &'a [StoryRecord], term: &str) -> Vec<&'a StoryRecord> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    records
        .iter()
        .filter(|r| {
            r.id.to_lowercase().contains(&needle)
                || r.title.to_lowercase().contains(&needle)
                || r.text.to_lowercase().contains(&needle)
        })
        .collect()
}

/// Export document for `records`. Without `include_content` the story text and its
/// translation are left out.
pub fn export_records(
    records: &[StoryRecord],
    include_content: bool,
    source: &Path,
) -> GrimResult<serde_json::Value> {
    let stories = records
        .iter()
        .map(|r| {
            let mut value = serde_json::to_value(r)
                .map_err(|e| GrimError::serde(format!("export story '{}': {e}", r.id)))?;
            if !include_content && let Some(obj) = value.as_object_mut() {
                obj.remove("text");
                obj.remove("translated_text");
            }
            Ok(value)
        })
        .collect::<GrimResult<Vec<_>>>()?;

    Ok(serde_json::json!({
        "export_metadata": {
            "exported_at": Utc::now(),
            "total_stories": stories.len(),
            "content_included": include_content,
            "source_file": source.display().to_string(),
        },
        "stories": stories,
    }))
}

#[cfg(test)]
#[path = "../../tests/unit/store/query.rs"]
mod tests;
