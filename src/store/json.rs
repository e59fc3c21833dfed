use std::ffi::OsString;
use std::fs::File;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::foundation::error::{GrimError, GrimResult};
use crate::store::record::{StoryRecord, StoryStore};

const FORMAT_VERSION: &str = "1.0";

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct StoreMetadata {
    total_stories: usize,
    last_updated: DateTime<Utc>,
    format_version: String,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct StoreDocument {
    metadata: StoreMetadata,
    #[serde(default)]
    stories: Vec<StoryRecord>,
}

/// Story database kept in one JSON document.
///
/// Layout: `{"metadata": {...}, "stories": [...]}` with stories sorted by id. Every operation
/// holds one mutex, so there is a single writer per store. Saves write `<file>.tmp`, sync it and
/// rename it over the document. A missing file reads as an empty store.
#[derive(Debug)]
pub struct JsonStoryStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonStoryStore {
    pub fn open(path: impl Into<PathBuf>) -> GrimResult<Self> {
        let store = Self {
            path: path.into(),
            lock: Mutex::new(()),
        };
        // Surface a corrupt document at open rather than at the first save.
        store.read_all()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> GrimResult<Vec<StoryRecord>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(GrimError::storage(format!(
                    "read '{}': {e}",
                    self.path.display()
                )));
            }
        };
        let doc: StoreDocument = serde_json::from_str(&raw).map_err(|e| {
            GrimError::storage(format!("parse '{}': {e}", self.path.display()))
        })?;
        Ok(doc.stories)
    }

    fn write_all(&self, mut stories: Vec<StoryRecord>) -> GrimResult<()> {
        stories.sort_by(|a, b| a.id.cmp(&b.id));
        let doc = StoreDocument {
            metadata: StoreMetadata {
                total_stories: stories.len(),
                last_updated: Utc::now(),
                format_version: FORMAT_VERSION.to_string(),
            },
            stories,
        };
        let bytes = serde_json::to_vec_pretty(&doc)
            .map_err(|e| GrimError::serde(format!("story store json: {e}")))?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                GrimError::storage(format!("create '{}': {e}", parent.display()))
            })?;
        }

        let tmp = self.temp_path();
        let io = |what: &str, e: std::io::Error| {
            GrimError::storage(format!("{what} '{}': {e}", tmp.display()))
        };
        let mut file = File::create(&tmp).map_err(|e| io("create", e))?;
        file.write_all(&bytes).map_err(|e| io("write", e))?;
        file.sync_all().map_err(|e| io("sync", e))?;
        drop(file);
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            GrimError::storage(format!(
                "replace '{}' with '{}': {e}",
                self.path.display(),
                tmp.display()
            ))
        })
    }

    fn temp_path(&self) -> PathBuf {
        let mut name: OsString = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn locked<T>(&self, f: impl FnOnce() -> GrimResult<T>) -> GrimResult<T> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| GrimError::storage("story store lock poisoned"))?;
        f()
    }
}

impl StoryStore for JsonStoryStore {
    fn load(&self, id: &str) -> GrimResult<Option<StoryRecord>> {
        self.locked(|| Ok(self.read_all()?.into_iter().find(|r| r.id == id)))
    }

    #[tracing::instrument(skip_all, fields(story_id = %record.id))]
    fn save(&self, record: &StoryRecord) -> GrimResult<()> {
        self.locked(|| {
            let mut stories = self.read_all()?;
            match stories.iter_mut().find(|r| r.id == record.id) {
                Some(slot) => *slot = record.clone(),
                None => stories.push(record.clone()),
            }
            self.write_all(stories)?;
            tracing::debug!(completed = ?record.completed, "story saved");
            Ok(())
        })
    }

    fn list(&self) -> GrimResult<Vec<StoryRecord>> {
        self.locked(|| {
            let mut stories = self.read_all()?;
            stories.sort_by(|a, b| a.id.cmp(&b.id));
            Ok(stories)
        })
    }
}
