use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::foundation::error::{GrimError, GrimResult};
use crate::store::record::{StoryRecord, StoryStore};

/// Volatile store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStoryStore {
    records: Mutex<BTreeMap<String, StoryRecord>>,
}

impl MemoryStoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<T>(&self, f: impl FnOnce(&mut BTreeMap<String, StoryRecord>) -> T) -> GrimResult<T> {
        let mut guard = self
            .records
            .lock()
            .map_err(|_| GrimError::storage("story store lock poisoned"))?;
        Ok(f(&mut guard))
    }
}

impl StoryStore for MemoryStoryStore {
    fn load(&self, id: &str) -> GrimResult<Option<StoryRecord>> {
        self.with(|r| r.get(id).cloned())
    }

    fn save(&self, record: &StoryRecord) -> GrimResult<()> {
        self.with(|r| {
            r.insert(record.id.clone(), record.clone());
        })
    }

    fn list(&self) -> GrimResult<Vec<StoryRecord>> {
        self.with(|r| r.values().cloned().collect())
    }
}
