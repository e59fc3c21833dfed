//! External collaborators: content source, speech synthesis, translation, image synthesis.
//!
//! The core only sees resolved results; which provider served a call, and how often it was
//! retried, stays on this side of the boundary.

pub(crate) mod chain;
pub(crate) mod provider;
pub(crate) mod retry;
