use std::fmt::Write as _;
use std::path::Path;

use anyhow::Context as _;

use crate::foundation::core::Millis;
use crate::foundation::error::GrimResult;
use crate::text::segment::SubtitleCue;

/// Render cues as SubRip text (1-based numbering, `HH:MM:SS,mmm` stamps).
pub fn write_srt(cues: &[SubtitleCue]) -> String {
    let mut out = String::new();
    for cue in cues {
        let _ = writeln!(out, "{}", cue.index + 1);
        let _ = writeln!(out, "{} --> {}", timestamp(cue.start), timestamp(cue.end));
        let _ = writeln!(out, "{}", cue.text);
        out.push('\n');
    }
    out
}

pub fn write_srt_file(cues: &[SubtitleCue], path: &Path) -> GrimResult<()> {
    crate::encode::ffmpeg::ensure_parent_dir(path)?;
    std::fs::write(path, write_srt(cues))
        .with_context(|| format!("write subtitle file '{}'", path.display()))?;
    Ok(())
}

fn timestamp(t: Millis) -> String {
    let ms = t.0 % 1000;
    let total_secs = t.0 / 1000;
    let (h, m, s) = (total_secs / 3600, (total_secs / 60) % 60, total_secs % 60);
    format!("{h:02}:{m:02}:{s:02},{ms:03}")
}

#[cfg(test)]
#[path = "../../tests/unit/encode/srt.rs"]
mod tests;
