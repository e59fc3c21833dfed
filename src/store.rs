//! Story database: per-story processing status, shared by every pipeline worker.
//!
//! All writes go through one [`StoryStore`] and are serialized by it.

pub(crate) mod json;
pub(crate) mod memory;
pub(crate) mod query;
pub(crate) mod record;
