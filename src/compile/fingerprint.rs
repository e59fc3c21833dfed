use std::fmt;

use xxhash_rust::xxh3::Xxh3;

use crate::{
    audio::mix::{GainEnvelope, MusicBed},
    compile::plan::RenderPlan,
    foundation::core::Millis,
    text::segment::SubtitleCue,
    timeline::allocate::ImageSegment,
};

const XXH3_SEED: u64 = 0x8b5ad4a0c7d8e9f1;

/// Stable 128-bit identity of a [`RenderPlan`].
///
/// Equal plans always fingerprint equally across runs and platforms, so the value can key
/// render caches and tie log lines to the exact plan that was rendered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PlanFingerprint {
    pub hi: u64,
    pub lo: u64,
}

impl PlanFingerprint {
    pub fn to_hex(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PlanFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}{:016x}", self.hi, self.lo)
    }
}

pub fn fingerprint_plan(plan: &RenderPlan) -> PlanFingerprint {
    let mut h = StableHasher::new();
    write_plan(&mut h, plan);
    h.finish()
}

struct StableHasher {
    inner: Xxh3,
}

impl StableHasher {
    fn new() -> Self {
        Self {
            inner: Xxh3::with_seed(XXH3_SEED),
        }
    }

    fn write_bytes(&mut self, b: &[u8]) {
        self.inner.update(b);
    }

    fn write_u8(&mut self, v: u8) {
        self.write_bytes(&[v]);
    }

    fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.write_bytes(&v.to_le_bytes());
    }

    fn write_f32(&mut self, v: f32) {
        self.write_u32(v.to_bits());
    }

    fn write_millis(&mut self, v: Millis) {
        self.write_u64(v.0);
    }

    fn write_len(&mut self, n: usize) {
        self.write_u64(n as u64);
    }

    /// Length-prefixed so adjacent strings cannot alias.
    fn write_str(&mut self, s: &str) {
        self.write_len(s.len());
        self.write_bytes(s.as_bytes());
    }

    fn finish(self) -> PlanFingerprint {
        let v = self.inner.digest128();
        PlanFingerprint {
            hi: (v >> 64) as u64,
            lo: v as u64,
        }
    }
}

fn write_plan(h: &mut StableHasher, plan: &RenderPlan) {
    h.write_str(&plan.narration_ref.story_id);
    h.write_str(&plan.narration_ref.handle);
    h.write_millis(plan.total_duration);

    h.write_len(plan.image_segments.len());
    for s in &plan.image_segments {
        write_segment(h, s);
    }

    h.write_len(plan.subtitle_cues.len());
    for c in &plan.subtitle_cues {
        write_cue(h, c);
    }

    write_envelope(h, &plan.gain_envelope);
    write_bed(h, &plan.music);
}

fn write_segment(h: &mut StableHasher, s: &ImageSegment) {
    h.write_len(s.index);
    h.write_len(s.image);
    h.write_millis(s.start);
    h.write_millis(s.end);
    h.write_millis(s.transition_in);
    h.write_millis(s.transition_out);
}

fn write_cue(h: &mut StableHasher, c: &SubtitleCue) {
    h.write_len(c.index);
    h.write_millis(c.start);
    h.write_millis(c.end);
    h.write_str(&c.text);
}

fn write_envelope(h: &mut StableHasher, e: &GainEnvelope) {
    h.write_len(e.points.len());
    for p in &e.points {
        h.write_millis(p.time);
        h.write_f32(p.gain);
    }
}

fn write_bed(h: &mut StableHasher, bed: &MusicBed) {
    match bed {
        MusicBed::Silent => h.write_u8(0),
        MusicBed::Trim { at } => {
            h.write_u8(1);
            h.write_millis(*at);
        }
        MusicBed::Loop {
            source_duration,
            full_passes,
            final_pass,
            repeat_points,
        } => {
            h.write_u8(2);
            h.write_millis(*source_duration);
            h.write_u64(*full_passes);
            h.write_millis(*final_pass);
            h.write_len(repeat_points.len());
            for p in repeat_points {
                h.write_millis(*p);
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compile/fingerprint.rs"]
mod tests;
