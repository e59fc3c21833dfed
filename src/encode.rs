//! Render consumers.
//!
//! A consumer receives one validated [`RenderPlan`](crate::RenderPlan) plus the asset files it
//! refers to and realizes it exactly; it makes no timing decisions of its own.

/// `ffmpeg`-based consumer (MP4 output via system `ffmpeg`).
pub mod ffmpeg;
/// Consumer trait and built-in consumers.
pub mod sink;
/// SubRip cue files for subtitle burn-in.
pub mod srt;
