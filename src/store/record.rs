use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::collab::provider::Narration;
use crate::foundation::error::GrimResult;
use crate::store::query::title_key;

/// Pipeline stages in execution order.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Fetched,
    Translated,
    Narrated,
    Illustrated,
    Rendered,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Fetched,
        Stage::Translated,
        Stage::Narrated,
        Stage::Illustrated,
        Stage::Rendered,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Fetched => "fetched",
            Stage::Translated => "translated",
            Stage::Narrated => "narrated",
            Stage::Illustrated => "illustrated",
            Stage::Rendered => "rendered",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a story stopped, and where.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StageFailure {
    /// Stage that was being attempted.
    pub stage: Stage,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Durable status of one story.
///
/// `completed` is the last stage that finished; a failed run leaves it untouched and records
/// `failure`, so the next run resumes from the stage after `completed`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StoryRecord {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translated_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narration: Option<Narration>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<PathBuf>,
    #[serde(default)]
    pub completed: Option<Stage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<StageFailure>,
    pub updated_at: DateTime<Utc>,
}

impl StoryRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            text: String::new(),
            language: String::new(),
            translated_text: None,
            narration: None,
            images: Vec::new(),
            video: None,
            completed: None,
            failure: None,
            updated_at: Utc::now(),
        }
    }

    pub fn has_completed(&self, stage: Stage) -> bool {
        self.completed.is_some_and(|done| done >= stage)
    }

    /// Mark `stage` done and clear any earlier failure.
    pub fn complete(&mut self, stage: Stage) {
        self.completed = Some(stage);
        self.failure = None;
        self.updated_at = Utc::now();
    }

    pub fn fail(&mut self, stage: Stage, message: impl Into<String>) {
        let at = Utc::now();
        self.failure = Some(StageFailure {
            stage,
            message: message.into(),
            at,
        });
        self.updated_at = at;
    }

    /// Text the narration is read from: the translation when one exists.
    pub fn narration_text(&self) -> &str {
        self.translated_text.as_deref().unwrap_or(&self.text)
    }
}

/// Durable key-value store of [`StoryRecord`]s keyed by story id.
///
/// `save` is atomic: after a crash a reader sees either the old or the new record, never a
/// partial one.
pub trait StoryStore: Send + Sync {
    fn load(&self, id: &str) -> GrimResult<Option<StoryRecord>>;
    fn save(&self, record: &StoryRecord) -> GrimResult<()>;
    /// All records sorted by id.
    fn list(&self) -> GrimResult<Vec<StoryRecord>>;

    /// Id of another story with the same title, ignoring case and spacing.
    fn duplicate_title(&self, id: &str, title: &str) -> GrimResult<Option<String>> {
        let wanted = title_key(title);
        if wanted.is_empty() {
            return Ok(None);
        }
        Ok(self
            .list()?
            .into_iter()
            .find(|r| r.id != id && title_key(&r.title) == wanted)
            .map(|r| r.id))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/store/record.rs"]
mod tests;
